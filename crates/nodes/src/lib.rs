//! APIVerve node implementation.
//!
//! This crate provides [`ApiVerveNode`], which drives the per-item loop: read
//! the parameters for an item, resolve its request through
//! [`verve::dispatch`], hand it to the [`verve::AuthenticatedHttpClient`], and
//! record the result against the item's index. It also provides the
//! best-effort option lookups used to populate selection lists.
//!
//! ## Architectural Layer
//!
//! **Orchestration layer.** The node sequences calls between the dispatcher in
//! the [`verve`] crate and the transport port. It contains no request-shaping
//! rules of its own.

mod load_options;
mod node;

pub use node::{ApiVerveNode, ExecutionSettings};
