//! The trait an external hydraulic/thermal solver implements.

use dh_network::{AssembledNetwork, SolverOutput};

use crate::error::SolverError;

/// External hydraulic/thermal solver.
///
/// Receives a fully parameterized network and returns per-element results
/// indexed by element slot. The call blocks until the run finishes.
pub trait Solver {
    fn name(&self) -> &str {
        "external"
    }

    fn solve(&mut self, net: &AssembledNetwork) -> Result<SolverOutput, SolverError>;
}

impl<S: Solver + ?Sized> Solver for Box<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn solve(&mut self, net: &AssembledNetwork) -> Result<SolverOutput, SolverError> {
        (**self).solve(net)
    }
}
