//! Result Assembler: cut the requested element out of a recovered sub-block.

use crate::error::{HybridPirError, Result};
use serde::{Deserialize, Serialize};

/// Final output of a retrieval
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievedElement {
    pub index: usize,
    /// Exactly `element_size` bytes
    pub bytes: Vec<u8>,
}

/// Slice element `offset_in_block` (counted in elements) out of `sub_block`
pub fn assemble(
    index: usize,
    element_size: usize,
    sub_block: &[u8],
    offset_in_block: usize,
) -> Result<RetrievedElement> {
    let start = offset_in_block * element_size;
    let end = start + element_size;
    if sub_block.len() < end {
        return Err(HybridPirError::Shape {
            expected: end,
            actual: sub_block.len(),
        });
    }
    Ok(RetrievedElement {
        index,
        bytes: sub_block[start..end].to_vec(),
    })
}
