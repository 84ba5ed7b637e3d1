//! Newtype domain identifiers.
//!
//! Every value that names something on the APIVerve side (an upstream API, a
//! JSON Bin, a stored credential) or in the host run (an input item, a run) is
//! a distinct newtype. A [`BinId`] can never be passed where an [`ApiId`] is
//! expected even though both are strings under the hood.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Macro for String-wrapped newtypes.
// Generates: struct, new() returning Option<Self>, as_str(), Display.
// ---------------------------------------------------------------------------
macro_rules! string_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier, returning `None` if the value is empty
            /// or only whitespace.
            pub fn new(value: impl Into<String>) -> Option<Self> {
                let v = value.into();
                if v.trim().is_empty() { None } else { Some(Self(v)) }
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Identifiers — String-backed
// ---------------------------------------------------------------------------

string_id! {
    /// Identifies one upstream APIVerve API (e.g. `"email-validator"`).
    ///
    /// Interpolated unescaped after `/v1/`. Slashes or dot segments in the
    /// value change the request path; nothing here rejects them.
    ApiId
}

string_id! {
    /// Identifies a JSON Bin created in the APIVerve dashboard.
    ///
    /// Opaque to this crate; bins are created and deleted outside the node.
    /// Interpolated unescaped into the jsonbin paths, like [`ApiId`].
    BinId
}

string_id! {
    /// Names the stored credential the transport authenticates with.
    CredentialName
}

// ---------------------------------------------------------------------------
// Identifiers — index-backed
// ---------------------------------------------------------------------------

/// Zero-based position of an input item within one node run.
///
/// Output records carry the index of the item they derive from so the host can
/// reconstruct lineage across node boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemIndex(usize);

impl ItemIndex {
    /// The first item of a run. Node-level parameters are read against it.
    pub const FIRST: ItemIndex = ItemIndex(0);

    /// Creates an index from a raw position.
    pub fn new(value: usize) -> Self {
        Self(value)
    }

    /// Returns the underlying position.
    pub fn as_usize(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for ItemIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Identifiers — UUID-backed (internally generated)
// ---------------------------------------------------------------------------

/// Identifies a single node run (one invocation over a batch of items).
///
/// Generated fresh for every run and recorded on the root span so all
/// requests issued by that run can be correlated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(Uuid);

impl RunId {
    /// Generates a new random run identifier.
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying [`Uuid`].
    pub fn as_uuid(self) -> Uuid {
        self.0
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
