use serde::{Deserialize, Serialize};

/// One step while walking from a static base to a heap structure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hop {
    /// Added to the running pointer before any dereference.
    pub offset: i64,
    /// Follow the pointer at the current position.
    pub dereference: bool,
    /// Added after the dereference (node header skips and the like).
    pub post_add: i64,
}

/// A candidate route to a dynamically allocated table.
///
/// Several version-specific chains can coexist for one table kind; the
/// resolver tries them in declaration order and the first candidate that
/// survives the caller's plausibility probe wins.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PointerChain {
    /// Module-relative unless `absolute` is set.
    pub base: u64,
    pub absolute: bool,
    /// The base already addresses the table; skip the initial pointer read.
    pub direct: bool,
    pub hops: Vec<Hop>,
    /// Added once after the last hop.
    pub final_offset: i64,
}
