use lasso::{Spur, ThreadedRodeo};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::LazyLock;
use std::time::{SystemTime, UNIX_EPOCH};

/// Process-wide interner shared by every board.
static INTERNER: LazyLock<ThreadedRodeo> = LazyLock::new(ThreadedRodeo::default);

/// A lightweight, interned identifier for nodes and edges on the board.
/// Copying and comparing is a 4-byte `Spur` operation.
///
/// Ordering follows interning order, not string order. It only exists so
/// ids can key a `petgraph::graphmap`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(Spur);

impl NodeId {
    /// Intern a string as a NodeId, or return the existing one.
    pub fn intern(s: &str) -> Self {
        NodeId(INTERNER.get_or_intern(s))
    }

    /// Resolve back to a string slice. Interned strings live as long as the
    /// process, so the slice outlives the id.
    pub fn as_str(&self) -> &'static str {
        INTERNER.resolve(&self.0)
    }

    /// Derive a new id by appending a uniqueness token: `"{self}-{token}"`.
    ///
    /// Paste uses the same token for every node and edge of one paste, so
    /// internal references can be remapped with this same transform.
    pub fn with_token(&self, token: u64) -> Self {
        Self::intern(&format!("{}-{token}", self.as_str()))
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.as_str())
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self::intern(s)
    }
}

impl Serialize for NodeId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for NodeId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(NodeId::intern(&s))
    }
}

// ─── Token generation ────────────────────────────────────────────────────

/// Produces uniqueness tokens for generated ids.
///
/// Tokens look like millisecond timestamps (so ids keep the familiar
/// `node-3-1718000000000` shape) but are strictly increasing: two calls
/// within the same millisecond still yield distinct tokens.
#[derive(Debug, Clone)]
pub struct IdGenerator {
    /// Smallest token the next call may return.
    floor: u64,
    clock: Clock,
}

#[derive(Debug, Clone, Copy)]
enum Clock {
    System,
    /// Deterministic tokens for tests and replays.
    Fixed,
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdGenerator {
    /// Generator seeded from the system clock.
    pub fn new() -> Self {
        Self {
            floor: 0,
            clock: Clock::System,
        }
    }

    /// Generator that ignores the clock and counts up from `start`.
    pub fn starting_at(start: u64) -> Self {
        Self {
            floor: start,
            clock: Clock::Fixed,
        }
    }

    /// Next token. Strictly increasing for one generator until `u64::MAX`, which then repeats.
    pub fn next_token(&mut self) -> u64 {
        let now = match self.clock {
            Clock::System => SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis() as u64)
                .unwrap_or(0),
            Clock::Fixed => 0,
        };
        let token = now.max(self.floor);
        self.floor = token.saturating_add(1);
        token
    }
}
