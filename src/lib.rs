//! Maximum flow over a capacity matrix with breadth-first augmenting paths.
//!
//! [`ResidualGraph`] owns the capacity, flow and residual matrices of one run,
//! and [`MaxFlowSolver`] drives search and augmentation until no source to sink
//! path is left in the residual graph.

pub mod error;
pub mod matrix;
pub mod network;
pub mod residual;
pub mod solver;

pub use error::{Error, InvalidInput, Result};
pub use matrix::Matrix;
pub use network::Network;
pub use residual::{ParentMap, ResidualGraph, ReverseEdgeRule};
pub use solver::{Augmentation, MaxFlowSolver, MinCut, Solution, SolverState, solve};
