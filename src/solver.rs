use serde::Serialize;
use tracing::{debug, info, trace};

use crate::{
    error::{Error, InvalidInput, Result},
    matrix::Matrix,
    residual::{ParentMap, ResidualGraph, ReverseEdgeRule},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverState {
    Searching,
    Augmenting,
    Terminated,
}

/// One committed augmenting path, source first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Augmentation {
    pub path: Vec<usize>,
    pub bottleneck: isize,
}

/// Ford-Fulkerson driver with breadth-first path discovery.
pub struct MaxFlowSolver<'a> {
    graph: &'a mut ResidualGraph,
    source: usize,
    sink: usize,
    /// flow pushed by this solver so far
    flow: isize,
    state: SolverState,
    parents: ParentMap,
    augmentations: Vec<Augmentation>,
}

impl<'a> MaxFlowSolver<'a> {
    pub fn new(graph: &'a mut ResidualGraph, source: usize, sink: usize) -> Result<Self> {
        graph.check_vertex(source)?;
        graph.check_vertex(sink)?;
        if source == sink {
            return Err(InvalidInput::SameSourceAndSink(source).into());
        }
        let parents = ParentMap::new(graph.size());
        Ok(MaxFlowSolver {
            graph,
            source,
            sink,
            flow: 0,
            state: SolverState::Searching,
            parents,
            augmentations: vec![],
        })
    }

    pub fn state(&self) -> SolverState {
        self.state
    }
    pub fn flow(&self) -> isize {
        self.flow
    }
    pub fn augmentations(&self) -> &[Augmentation] {
        &self.augmentations
    }
    pub fn into_augmentations(self) -> Vec<Augmentation> {
        self.augmentations
    }

    /// Performs one state transition and returns the new state.
    pub fn step(&mut self) -> Result<SolverState> {
        self.state = match self.state {
            SolverState::Searching => {
                if self.graph.search(self.source, self.sink, &mut self.parents) {
                    SolverState::Augmenting
                } else {
                    info!(
                        flow = self.flow,
                        augmentations = self.augmentations.len(),
                        "no augmenting path left"
                    );
                    SolverState::Terminated
                }
            }
            SolverState::Augmenting => {
                let bottleneck =
                    self.graph
                        .apply_augmentation(&self.parents, self.source, self.sink)?;
                self.flow += bottleneck;
                let path = self
                    .parents
                    .path(self.source, self.sink)
                    .ok_or(Error::NoPath {
                        from: self.source,
                        to: self.sink,
                    })?;
                debug!(?path, bottleneck, flow = self.flow, "augmented");
                trace!("flow matrix:\n{}", self.graph.flow());
                trace!("residual matrix:\n{}", self.graph.residual());
                self.augmentations.push(Augmentation { path, bottleneck });
                SolverState::Searching
            }
            SolverState::Terminated => SolverState::Terminated,
        };
        Ok(self.state)
    }

    /// Augments until no path remains and returns the flow pushed by this run.
    pub fn run(&mut self) -> Result<isize> {
        while self.step()? != SolverState::Terminated {}
        Ok(self.flow)
    }
}

/// Source side of a minimum cut and the capacity crossing it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MinCut {
    pub source_side: Vec<usize>,
    pub capacity: isize,
}

impl MinCut {
    /// Cut induced by the vertices reachable from `source` in the residual graph.
    pub fn from_residual(graph: &ResidualGraph, source: usize) -> Self {
        let reachable = graph.reachable_from(source);
        let capacity = graph
            .capacity()
            .entries()
            .filter(|&(u, v, _)| reachable[u] && !reachable[v])
            .map(|x| x.2)
            .sum();
        MinCut {
            source_side: (0..graph.size()).filter(|&v| reachable[v]).collect(),
            capacity,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Solution {
    pub flow: isize,
    pub source: usize,
    pub sink: usize,
    pub rule: ReverseEdgeRule,
    pub flow_matrix: Matrix,
    pub residual_matrix: Matrix,
    pub augmentations: Vec<Augmentation>,
    pub min_cut: MinCut,
}

/// Computes the maximum flow from `source` to `sink`, consuming the graph.
pub fn solve(mut graph: ResidualGraph, source: usize, sink: usize) -> Result<Solution> {
    let mut solver = MaxFlowSolver::new(&mut graph, source, sink)?;
    let flow = solver.run()?;
    let augmentations = solver.into_augmentations();
    let min_cut = MinCut::from_residual(&graph, source);
    let rule = graph.rule();
    let (_, flow_matrix, residual_matrix) = graph.into_parts();
    Ok(Solution {
        flow,
        source,
        sink,
        rule,
        flow_matrix,
        residual_matrix,
        augmentations,
        min_cut,
    })
}

#[cfg(test)]
mod test {
    use rand::{Rng, SeedableRng, rngs::StdRng};

    use super::*;

    fn example() -> Vec<Vec<isize>> {
        vec![
            vec![0, 2, 3, 0, 0, 0],
            vec![0, 0, 0, 3, 1, 0],
            vec![0, 0, 0, 1, 1, 0],
            vec![0, 0, 0, 0, 0, 2],
            vec![0, 0, 0, 0, 0, 3],
            vec![0, 0, 0, 0, 0, 0],
        ]
    }

    fn example_flow() -> Vec<Vec<isize>> {
        vec![
            vec![0, 2, 2, 0, 0, 0],
            vec![0, 0, 0, 1, 1, 0],
            vec![0, 0, 0, 1, 1, 0],
            vec![0, 0, 0, 0, 0, 2],
            vec![0, 0, 0, 0, 0, 2],
            vec![0, 0, 0, 0, 0, 0],
        ]
    }

    /// Minimum over all source/sink vertex partitions of the crossing capacity.
    fn brute_force_min_cut(capacity: &[Vec<isize>], source: usize, sink: usize) -> isize {
        let n = capacity.len();
        let mut best = isize::MAX;
        for mask in 0u32..(1 << n) {
            let inside = |v: usize| mask & (1 << v) != 0;
            if !inside(source) || inside(sink) {
                continue;
            }
            let mut cut = 0;
            for u in (0..n).filter(|&u| inside(u)) {
                for v in (0..n).filter(|&v| !inside(v)) {
                    cut += capacity[u][v];
                }
            }
            best = best.min(cut);
        }
        best
    }

    fn random_capacity(rng: &mut StdRng) -> Vec<Vec<isize>> {
        let n = rng.random_range(2..=7);
        let density = rng.random_range(0.1..0.9);
        (0..n)
            .map(|u| {
                (0..n)
                    .map(|v| {
                        if u != v && rng.random_bool(density) {
                            isize::from(rng.random_range(1..=5i8))
                        } else {
                            0
                        }
                    })
                    .collect()
            })
            .collect()
    }

    fn assert_feasible(capacity: &[Vec<isize>], solution: &Solution) {
        let n = capacity.len();
        let d = &solution.flow_matrix;
        for u in 0..n {
            for v in 0..n {
                assert!(d.get(u, v) >= 0);
                assert!(d.get(u, v) <= capacity[u][v], "{u} -> {v} over capacity");
            }
        }
        for v in (0..n).filter(|&v| v != solution.source && v != solution.sink) {
            let inflow: isize = (0..n).map(|u| d.get(u, v)).sum();
            let outflow: isize = (0..n).map(|w| d.get(v, w)).sum();
            assert_eq!(inflow, outflow, "flow not conserved at {v}");
        }
        let s = solution.source;
        let out: isize = (0..n).map(|v| d.get(s, v) - d.get(v, s)).sum();
        assert_eq!(out, solution.flow);
    }

    #[test]
    fn maxflow_example() {
        let graph = ResidualGraph::new(&example()).unwrap();
        let solution = solve(graph, 0, 5).unwrap();
        assert_eq!(solution.flow, 4);
        assert_eq!(solution.flow_matrix.to_rows(), example_flow());
        assert_eq!(
            solution.residual_matrix.to_rows(),
            vec![
                vec![0, 0, 1, 0, 0, 0],
                vec![2, 0, 0, 2, 0, 0],
                vec![2, 0, 0, 0, 0, 0],
                vec![0, 1, 1, 0, 0, 0],
                vec![0, 1, 1, 0, 0, 1],
                vec![0, 0, 0, 2, 2, 0],
            ]
        );
        assert_eq!(
            solution.augmentations,
            vec![
                Augmentation {
                    path: vec![0, 1, 3, 5],
                    bottleneck: 2
                },
                Augmentation {
                    path: vec![0, 2, 4, 5],
                    bottleneck: 1
                },
                Augmentation {
                    path: vec![0, 2, 3, 1, 4, 5],
                    bottleneck: 1
                },
            ]
        );
        assert_eq!(
            solution.min_cut,
            MinCut {
                source_side: vec![0, 2],
                capacity: 4
            }
        );
        assert_feasible(&example(), &solution);
    }

    #[test]
    fn mirror_rule_reproduces_legacy_matrices() {
        let graph = ResidualGraph::new(&example())
            .unwrap()
            .with_rule(ReverseEdgeRule::Mirror);
        let solution = solve(graph, 0, 5).unwrap();
        assert_eq!(solution.flow, 4);
        assert_eq!(solution.flow_matrix.to_rows(), example_flow());
        assert_eq!(
            solution.residual_matrix.to_rows(),
            vec![
                vec![0, 0, 1, 0, 0, 0],
                vec![2, 0, 0, 3, 0, 0],
                vec![2, 0, 0, 0, 0, 0],
                vec![0, 2, 1, 0, 0, 0],
                vec![0, 1, 1, 0, 0, 1],
                vec![0, 0, 0, 2, 2, 0],
            ]
        );
    }

    #[test]
    fn mirror_rule_overcounts_on_crossing_paths() {
        let capacity = vec![
            vec![0, 1, 5, 0, 0, 5],
            vec![0, 0, 0, 4, 2, 0],
            vec![0, 0, 0, 5, 0, 1],
            vec![0, 0, 0, 0, 0, 2],
            vec![0, 0, 0, 0, 0, 4],
            vec![0, 0, 0, 0, 0, 0],
        ];
        assert_eq!(brute_force_min_cut(&capacity, 0, 5), 9);
        let graph = ResidualGraph::new(&capacity).unwrap();
        assert_eq!(solve(graph.clone(), 0, 5).unwrap().flow, 9);
        let mirrored = graph.with_rule(ReverseEdgeRule::Mirror);
        assert_eq!(solve(mirrored, 0, 5).unwrap().flow, 10);
    }

    #[test]
    fn state_transitions() {
        let capacity: Vec<Vec<isize>> = vec![vec![0, 3], vec![0, 0]];
        let mut graph = ResidualGraph::new(&capacity).unwrap();
        let mut solver = MaxFlowSolver::new(&mut graph, 0, 1).unwrap();
        assert_eq!(solver.state(), SolverState::Searching);
        assert_eq!(solver.step(), Ok(SolverState::Augmenting));
        assert_eq!(solver.step(), Ok(SolverState::Searching));
        assert_eq!(solver.flow(), 3);
        assert_eq!(solver.step(), Ok(SolverState::Terminated));
        assert_eq!(solver.step(), Ok(SolverState::Terminated));
        assert_eq!(solver.augmentations().len(), 1);
    }

    #[test]
    fn second_run_on_drained_graph_adds_nothing() {
        let mut graph = ResidualGraph::new(&example()).unwrap();
        assert_eq!(MaxFlowSolver::new(&mut graph, 0, 5).unwrap().run(), Ok(4));
        let residual = graph.residual().clone();
        let mut again = MaxFlowSolver::new(&mut graph, 0, 5).unwrap();
        assert_eq!(again.run(), Ok(0));
        assert!(again.augmentations().is_empty());
        assert_eq!(graph.residual(), &residual);
    }

    #[test]
    fn no_edges_from_source() {
        let capacity: Vec<Vec<isize>> = vec![vec![0, 0, 0], vec![5, 0, 5], vec![0, 0, 0]];
        let mut graph = ResidualGraph::new(&capacity).unwrap();
        let mut solver = MaxFlowSolver::new(&mut graph, 0, 2).unwrap();
        assert_eq!(solver.step(), Ok(SolverState::Terminated));
        assert_eq!(solver.flow(), 0);
    }

    #[test]
    fn disconnected_sink_leaves_matrices_untouched() {
        let capacity: Vec<Vec<isize>> = vec![
            vec![0, 3, 2, 0],
            vec![0, 0, 4, 0],
            vec![0, 1, 0, 0],
            vec![6, 0, 0, 0],
        ];
        let graph = ResidualGraph::new(&capacity).unwrap();
        let solution = solve(graph, 0, 3).unwrap();
        assert_eq!(solution.flow, 0);
        assert_eq!(solution.residual_matrix.to_rows(), capacity);
        assert_eq!(solution.flow_matrix, Matrix::new(4, 0));
        assert_eq!(solution.min_cut.source_side, vec![0, 1, 2]);
        assert_eq!(solution.min_cut.capacity, 0);
    }

    #[test]
    fn invalid_endpoints() {
        let mut graph = ResidualGraph::new(&example()).unwrap();
        assert_eq!(
            MaxFlowSolver::new(&mut graph, 2, 2).err(),
            Some(Error::InvalidInput(InvalidInput::SameSourceAndSink(2)))
        );
        assert_eq!(
            MaxFlowSolver::new(&mut graph, 0, 6).err(),
            Some(Error::InvalidInput(InvalidInput::VertexOutOfRange {
                vertex: 6,
                size: 6
            }))
        );
        assert_eq!(graph.residual().to_rows(), example());
    }

    #[test]
    fn hand_built_min_cut() {
        // two disjoint routes sharing the bottleneck edge 3 -> 4
        let capacity: Vec<Vec<isize>> = vec![
            vec![0, 10, 10, 0, 0],
            vec![0, 0, 0, 4, 0],
            vec![0, 0, 0, 3, 0],
            vec![0, 0, 0, 0, 5],
            vec![0, 0, 0, 0, 0],
        ];
        let graph = ResidualGraph::new(&capacity).unwrap();
        let solution = solve(graph, 0, 4).unwrap();
        assert_eq!(solution.flow, 5);
        assert_eq!(solution.min_cut.source_side, vec![0, 1, 2, 3]);
        assert_eq!(solution.min_cut.capacity, 5);
        assert_feasible(&capacity, &solution);
    }

    #[test]
    fn capacity_summing_to_max_solves() {
        let capacity: Vec<Vec<isize>> = vec![
            vec![0, isize::MAX / 2, 0],
            vec![0, 0, isize::MAX / 2],
            vec![1, 0, 0],
        ];
        let graph = ResidualGraph::new(&capacity).unwrap();
        let solution = solve(graph, 0, 2).unwrap();
        assert_eq!(solution.flow, isize::MAX / 2);
        assert_eq!(solution.min_cut.capacity, isize::MAX / 2);
        assert_feasible(&capacity, &solution);
    }

    #[test]
    fn random_graphs_match_brute_force() {
        let mut rng = StdRng::seed_from_u64(0x6d61_7866);
        for _ in 0..500 {
            let capacity = random_capacity(&mut rng);
            let sink = capacity.len() - 1;
            let expected = brute_force_min_cut(&capacity, 0, sink);
            let graph = ResidualGraph::new(&capacity).unwrap();
            let solution = solve(graph, 0, sink).unwrap();
            assert_eq!(solution.flow, expected, "{capacity:?}");
            assert_eq!(solution.min_cut.capacity, expected);
            assert_feasible(&capacity, &solution);
        }
    }
}
