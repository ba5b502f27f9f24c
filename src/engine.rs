//! Capability shared by the two retrieval strategies.
//!
//! RAID-PIR (information-theoretic, across replicas) and SealPIR
//! (computational, inside one partition) both turn a selection into
//! queries and turn answers back into bytes. The hybrid client composes
//! them through this trait rather than through a common base type.

use crate::error::Result;

pub trait SubQueryEngine {
    /// Per-call input besides the selection, such as server-issued seeds
    type Context: ?Sized;
    /// What is sent for one selection
    type Query;
    /// What comes back and is needed to reconstruct
    type Answer: ?Sized;

    /// Build the query selecting `selection`
    fn build_query(&self, selection: usize, context: &Self::Context) -> Result<Self::Query>;

    /// Recover the selected bytes from the answer
    fn reconstruct(&self, selection: usize, answer: &Self::Answer) -> Result<Vec<u8>>;
}
