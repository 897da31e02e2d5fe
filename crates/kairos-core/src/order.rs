//! Tree-structured deterministic event ordering.
//!
//! An [`EventOrder`] is a short path of integers. Root impacts get a
//! depth-1 path; an impact that produces further impacts while it runs
//! derives each child path from its own with [`EventOrder::spawn`]. The
//! resulting key totally orders every event produced in a tick, no
//! matter which worker thread produced it or when.
//!
//! Comparison is lexicographic. A proper prefix sorts before its
//! extensions, so a parent always runs before its children and the
//! children run before the parent's next sibling. The empty path is the
//! "unordered" key and sorts after every non-empty path.

use std::cmp::Ordering;
use std::fmt;

use crate::error::OrderError;

/// Fixed-capacity ordering path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct EventOrder {
    path: [u64; EventOrder::MAX_DEPTH],
    len: u8,
}

impl EventOrder {
    /// Maximum number of path elements.
    pub const MAX_DEPTH: usize = 8;

    /// Depth-1 order for a root event at `index`.
    pub fn root(index: u64) -> Self {
        let mut path = [0; Self::MAX_DEPTH];
        path[0] = index;
        Self { path, len: 1 }
    }

    /// Build an order from explicit path elements.
    ///
    /// Returns [`OrderError::DepthExceeded`] if `elements` is longer than
    /// [`MAX_DEPTH`](Self::MAX_DEPTH).
    pub fn from_path(elements: &[u64]) -> Result<Self, OrderError> {
        if elements.len() > Self::MAX_DEPTH {
            return Err(OrderError::DepthExceeded {
                depth: elements.len(),
            });
        }
        let mut path = [0; Self::MAX_DEPTH];
        path[..elements.len()].copy_from_slice(elements);
        Ok(Self {
            path,
            len: elements.len() as u8,
        })
    }

    /// Number of path elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.len as usize
    }

    /// Whether this is the unordered (empty) path.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// First path element, or 0 for the empty path.
    pub fn index(&self) -> u64 {
        self.path[0]
    }

    /// The populated path elements.
    pub fn as_slice(&self) -> &[u64] {
        &self.path[..self.len()]
    }

    /// Derive the next child order, post-incrementing `counter`.
    ///
    /// Overflowing the maximum depth yields the empty path, which sorts
    /// after everything; a warning is logged and `counter` is left as is.
    /// Use [`try_spawn`](Self::try_spawn) to treat overflow as an error.
    pub fn spawn(&self, counter: &mut u64) -> EventOrder {
        match self.try_spawn(counter) {
            Ok(child) => child,
            Err(err) => {
                tracing::warn!(parent = %self, %err, "eventorder overflow, child is unordered");
                EventOrder::default()
            }
        }
    }

    /// Derive the next child order, or fail when the parent is at the
    /// maximum depth.
    pub fn try_spawn(&self, counter: &mut u64) -> Result<EventOrder, OrderError> {
        let depth = self.len();
        if depth >= Self::MAX_DEPTH {
            return Err(OrderError::DepthExceeded { depth });
        }
        let mut child = *self;
        child.path[depth] = *counter;
        child.len += 1;
        *counter = counter.wrapping_add(1);
        Ok(child)
    }
}

impl Ord for EventOrder {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.is_empty(), other.is_empty()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => self.as_slice().cmp(other.as_slice()),
        }
    }
}

impl PartialOrd for EventOrder {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for EventOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "<unordered>");
        }
        for (i, v) in self.as_slice().iter().enumerate() {
            if i > 0 {
                write!(f, ".")?;
            }
            write!(f, "{v}")?;
        }
        Ok(())
    }
}
