use lasso::{Spur, ThreadedRodeo};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::LazyLock;
use std::sync::atomic::{AtomicU64, Ordering};

/// Global string interner shared by node and edge ids.
static INTERNER: LazyLock<ThreadedRodeo> = LazyLock::new(ThreadedRodeo::default);

/// Counter behind generated ids (`node_0`, `edge_1`, ...).
static COUNTER: AtomicU64 = AtomicU64::new(0);

/// Id of the root sentinel every top-level node hangs off.
pub const ROOT_ID: &str = "root";

macro_rules! interned_id {
    ($(#[$meta:meta])* $name:ident, $sigil:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name(Spur);

        impl $name {
            /// Intern a string as an id, or return the existing one.
            pub fn intern(s: &str) -> Self {
                Self(INTERNER.get_or_intern(s))
            }

            /// Resolve back to a string slice.
            pub fn as_str(&self) -> &str {
                INTERNER.resolve(&self.0)
            }

            /// Generate a unique id with the given prefix (e.g. `node_3`).
            ///
            /// Skips candidates that were already interned by hand so a
            /// generated id never collides with an explicit one.
            pub fn with_prefix(prefix: &str) -> Self {
                loop {
                    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
                    let candidate = format!("{prefix}_{n}");
                    if INTERNER.get(&candidate).is_none() {
                        return Self::intern(&candidate);
                    }
                }
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}{}", $sigil, self.as_str())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self::intern(s)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                Ok(Self::intern(&s))
            }
        }
    };
}

interned_id!(
    /// Interned identifier of a node in the diagram.
    /// Internally a 4-byte `Spur` index, so comparisons and hashing are O(1).
    NodeId,
    "@"
);

interned_id!(
    /// Interned identifier of a visual edge between two nodes.
    EdgeId,
    "~"
);

impl NodeId {
    /// The root sentinel.
    pub fn root() -> Self {
        Self::intern(ROOT_ID)
    }

    pub fn is_root(&self) -> bool {
        *self == Self::root()
    }

    /// Generate a fresh node id (`node_N`).
    pub fn generate() -> Self {
        Self::with_prefix("node")
    }
}

impl EdgeId {
    /// Generate a fresh edge id (`edge_N`).
    pub fn generate() -> Self {
        Self::with_prefix("edge")
    }
}
