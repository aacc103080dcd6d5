use std::{fs::File, path::Path};

use serde::Deserialize;

use crate::{
    error::Result,
    residual::{ResidualGraph, ReverseEdgeRule},
    solver::{self, Solution},
};

/// A max-flow problem instance as stored on disk.
#[derive(Deserialize, Debug, Clone)]
pub struct Network {
    pub capacity: Box<[Box<[isize]>]>,
    pub source: usize,
    pub sink: usize,
    #[serde(default)]
    pub reverse_rule: ReverseEdgeRule,
}

impl Network {
    pub fn load<S: AsRef<Path>>(x: S) -> anyhow::Result<Self> {
        let file = File::open(x)?;
        simd_json::from_reader(file).map_err(Into::into)
    }

    pub fn solve(&self) -> Result<Solution> {
        solver::solve(ResidualGraph::try_from(self)?, self.source, self.sink)
    }
}

impl TryFrom<&Network> for ResidualGraph {
    type Error = crate::error::Error;

    fn try_from(network: &Network) -> Result<Self> {
        Ok(ResidualGraph::new(&network.capacity)?.with_rule(network.reverse_rule))
    }
}
