use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, InvalidInput, Result},
    matrix::Matrix,
};

const UNVISITED: usize = usize::MAX;

/// How the reverse residual slot of a path edge is updated on augmentation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReverseEdgeRule {
    /// `residual[v][u] += pushed`, with the flow pair kept normalised so at most
    /// one direction carries flow.
    #[default]
    Accumulate,
    /// `residual[v][u] = residual[u][v]` taken before the decrement. Reproduces
    /// the matrices of the legacy solver bit for bit, but may overstate reverse
    /// capacity on graphs where paths cross.
    Mirror,
}

/// Predecessor links of one breadth-first search.
#[derive(Clone, Debug)]
pub struct ParentMap {
    /// predecessor of each vertex, `UNVISITED` if not reached
    parent: Box<[usize]>,
    /// bfs queue, kept around to avoid reallocation
    queue: VecDeque<usize>,
}

impl ParentMap {
    pub fn new(size: usize) -> Self {
        ParentMap {
            parent: vec![UNVISITED; size].into_boxed_slice(),
            queue: VecDeque::with_capacity(size),
        }
    }

    fn reset(&mut self) {
        self.parent.fill(UNVISITED);
        self.queue.clear();
    }

    pub fn size(&self) -> usize {
        self.parent.len()
    }

    /// Predecessor of `v` in the search tree. The search root is its own parent.
    pub fn parent(&self, v: usize) -> Option<usize> {
        self.parent.get(v).copied().filter(|&u| u != UNVISITED)
    }

    pub fn reached(&self, v: usize) -> bool {
        self.parent(v).is_some()
    }

    /// Vertices from `source` to `sink` along the recorded links, source first.
    pub fn path(&self, source: usize, sink: usize) -> Option<Vec<usize>> {
        let mut path = vec![sink];
        let mut v = sink;
        while v != source {
            // a valid tree path never repeats a vertex
            if path.len() > self.parent.len() {
                return None;
            }
            let u = self.parent(v)?;
            if u == v {
                return None;
            }
            path.push(u);
            v = u;
        }
        path.reverse();
        Some(path)
    }
}

/// Capacity state of one max-flow run: the original capacities, the flow
/// assigned in the original network and the live residual capacities.
#[derive(Clone, Debug)]
pub struct ResidualGraph {
    capacity: Matrix,
    flow: Matrix,
    residual: Matrix,
    rule: ReverseEdgeRule,
}

impl ResidualGraph {
    pub fn new<R: AsRef<[isize]>>(capacity: &[R]) -> Result<Self> {
        Self::from_matrix(Matrix::from_rows(capacity)?)
    }

    pub fn from_matrix(capacity: Matrix) -> Result<Self> {
        if let Some((from, to, value)) = capacity.entries().find(|x| x.2 < 0) {
            return Err(InvalidInput::NegativeCapacity { from, to, value }.into());
        }
        // bounds every residual entry, the flow value and any cut sum
        capacity
            .entries()
            .try_fold(0isize, |total, x| total.checked_add(x.2))
            .ok_or(InvalidInput::CapacityOverflow)?;
        let size = capacity.dimension();
        if size == 0 {
            return Err(InvalidInput::Empty.into());
        }
        Ok(ResidualGraph {
            flow: Matrix::new(size, 0),
            residual: capacity.clone(),
            capacity,
            rule: ReverseEdgeRule::default(),
        })
    }

    pub fn with_rule(mut self, rule: ReverseEdgeRule) -> Self {
        self.rule = rule;
        self
    }

    pub fn rule(&self) -> ReverseEdgeRule {
        self.rule
    }
    pub fn size(&self) -> usize {
        self.capacity.dimension()
    }
    pub fn capacity(&self) -> &Matrix {
        &self.capacity
    }
    /// Flow assigned to each edge of the original network.
    pub fn flow(&self) -> &Matrix {
        &self.flow
    }
    pub fn residual(&self) -> &Matrix {
        &self.residual
    }
    pub fn residual_capacity(&self, u: usize, v: usize) -> isize {
        self.residual.get(u, v)
    }
    pub fn has_residual(&self, u: usize, v: usize) -> bool {
        u != v && self.residual.get(u, v) != 0
    }

    pub fn into_parts(self) -> (Matrix, Matrix, Matrix) {
        (self.capacity, self.flow, self.residual)
    }

    pub(crate) fn check_vertex(&self, vertex: usize) -> Result<()> {
        if vertex >= self.size() {
            return Err(InvalidInput::VertexOutOfRange {
                vertex,
                size: self.size(),
            }
            .into());
        }
        Ok(())
    }

    /// Breadth-first search from `source` over edges with residual capacity,
    /// writing predecessor links into `parents`. Neighbours are scanned in
    /// increasing index order and the first discovery of a vertex is kept.
    /// Returns whether `sink` was reached.
    pub fn search(&self, source: usize, sink: usize, parents: &mut ParentMap) -> bool {
        if parents.size() != self.size() {
            *parents = ParentMap::new(self.size());
        } else {
            parents.reset();
        }
        if source >= self.size() {
            return false;
        }
        parents.parent[source] = source;
        parents.queue.push_back(source);
        while let Some(u) = parents.queue.pop_front() {
            for (v, &space) in self.residual.row(u).iter().enumerate() {
                if space == 0 || u == v || parents.parent[v] != UNVISITED {
                    continue;
                }
                parents.parent[v] = u;
                parents.queue.push_back(v);
            }
        }
        parents.reached(sink)
    }

    pub fn find_augmenting_path(&self, source: usize, sink: usize) -> Option<ParentMap> {
        let mut parents = ParentMap::new(self.size());
        self.search(source, sink, &mut parents).then_some(parents)
    }

    /// Vertices reachable from `source` in the current residual graph.
    pub fn reachable_from(&self, source: usize) -> Vec<bool> {
        let mut parents = ParentMap::new(self.size());
        self.search(source, source, &mut parents);
        (0..self.size()).map(|v| parents.reached(v)).collect()
    }

    /// Pushes the bottleneck capacity along the path recorded in `parents`,
    /// updating both matrices edge by edge from the sink back to the source.
    pub fn apply_augmentation(
        &mut self,
        parents: &ParentMap,
        source: usize,
        sink: usize,
    ) -> Result<isize> {
        let no_path = Error::NoPath {
            from: source,
            to: sink,
        };
        if source >= self.size() || sink >= self.size() || parents.size() != self.size() {
            return Err(no_path);
        }
        let path = parents.path(source, sink).ok_or(no_path.clone())?;
        let bottleneck = path
            .windows(2)
            .map(|e| self.residual.get(e[0], e[1]))
            .min()
            .unwrap_or(0);
        if bottleneck <= 0 {
            return Err(no_path);
        }
        for edge in path.windows(2).rev() {
            let (u, v) = (edge[0], edge[1]);
            match self.rule {
                ReverseEdgeRule::Accumulate => {
                    self.residual.add(v, u, bottleneck);
                    self.residual.add(u, v, -bottleneck);
                    let net = self.flow.get(u, v) - self.flow.get(v, u) + bottleneck;
                    if net >= 0 {
                        self.flow.set(u, v, net);
                        self.flow.set(v, u, 0);
                    } else {
                        self.flow.set(v, u, -net);
                        self.flow.set(u, v, 0);
                    }
                }
                ReverseEdgeRule::Mirror => {
                    // mirror must read the forward residual before it is decremented
                    self.residual.set(v, u, self.residual.get(u, v));
                    self.residual.add(u, v, -bottleneck);
                    self.flow.add(u, v, bottleneck - self.flow.get(v, u));
                    let assigned = self.flow.get(u, v);
                    if assigned < 0 {
                        self.flow.set(v, u, -assigned);
                        self.flow.set(u, v, 0);
                    }
                }
            }
        }
        Ok(bottleneck)
    }
}
