//! Parameters of engine calls

/// Parameters shared by update_all, send_and_recv, apply_edges and apply_nodes.
#[derive(Debug, Copy, Clone)]
pub struct PassParams {
    /// parallel mode. User functions are then called from rayon threads.
    pub parallel: bool,
} // end of PassParams

impl PassParams {
    pub fn new(parallel: bool) -> Self {
        PassParams { parallel }
    }

    ///
    pub fn get_parallel(&self) -> bool {
        self.parallel
    }
} // end of impl PassParams

/// serial by default
impl Default for PassParams {
    fn default() -> Self {
        PassParams { parallel: false }
    }
}
