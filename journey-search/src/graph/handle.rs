//! Transaction-scoped handles.
//!
//! A handle borrows (in type only) the transaction that produced it, so the
//! compiler rejects any use after the transaction is gone.

use std::fmt;
use std::marker::PhantomData;

/// A node handle valid for the lifetime of one transaction borrow.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId<'txn> {
    raw: u64,
    _txn: PhantomData<&'txn ()>,
}

impl NodeId<'_> {
    /// Mint a handle. Only graph backends should call this.
    pub fn from_raw(raw: u64) -> Self {
        Self {
            raw,
            _txn: PhantomData,
        }
    }

    /// The backend's raw index, for memoisation keys and diagnostics.
    pub fn index(&self) -> u64 {
        self.raw
    }
}

impl fmt::Debug for NodeId<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.raw)
    }
}

impl fmt::Display for NodeId<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.raw)
    }
}

/// A relationship handle valid for the lifetime of one transaction borrow.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RelationshipId<'txn> {
    raw: u64,
    _txn: PhantomData<&'txn ()>,
}

impl RelationshipId<'_> {
    /// Mint a handle. Only graph backends should call this.
    pub fn from_raw(raw: u64) -> Self {
        Self {
            raw,
            _txn: PhantomData,
        }
    }

    pub fn index(&self) -> u64 {
        self.raw
    }
}

impl fmt::Debug for RelationshipId<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RelationshipId({})", self.raw)
    }
}

impl fmt::Display for RelationshipId<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn equality_uses_raw_index() {
        let a = NodeId::from_raw(4);
        let b = NodeId::from_raw(4);
        assert_eq!(a, b);
        assert_eq!(a.index(), 4);

        let set: HashSet<NodeId<'_>> = [a, b, NodeId::from_raw(5)].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn display() {
        assert_eq!(NodeId::from_raw(12).to_string(), "n12");
        assert_eq!(RelationshipId::from_raw(3).to_string(), "r3");
        assert_eq!(format!("{:?}", NodeId::from_raw(1)), "NodeId(1)");
    }
}
