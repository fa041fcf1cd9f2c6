//! degrees in and out of nodes


/// first component is in, second component is out!
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Degree {
    pub d_in: usize,
    pub d_out: usize,
}

impl Degree {
    pub(crate) fn new(d_in: usize, d_out: usize) -> Self {
        Degree { d_in, d_out }
    }
    /// get degree in
    pub fn degree_in(&self) -> usize {
        self.d_in
    }
    /// get degree out
    pub fn degree_out(&self) -> usize {
        self.d_out
    }
    /// true if the node is neither source nor destination of an edge
    pub fn is_isolated(&self) -> bool {
        self.d_in == 0 && self.d_out == 0
    }
} // end of impl Degree
