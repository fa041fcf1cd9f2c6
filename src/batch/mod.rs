//! Batching of several graphs into one, and graph level readout.
//!
//! A batched graph is an ordinary [Graph](crate::graph::Graph), the disjoint union of its constituents,
//! which additionally records the number of nodes and edges of each constituent.
//! Constituent i owns a contiguous range of node ids and a contiguous range of edge ids,
//! so message passing on the batch never mixes constituents.

/// batch and unbatch
pub mod batched;

/// per constituent reductions and broadcasts
pub mod readout;

// [start, end) ranges of consecutive segments of the given sizes
pub(crate) fn segments(counts: &[usize]) -> Vec<(usize, usize)> {
    let mut ranges = Vec::<(usize, usize)>::with_capacity(counts.len());
    let mut start = 0;
    for count in counts {
        ranges.push((start, start + count));
        start += count;
    }
    ranges
} // end of segments

// end of mod tests
