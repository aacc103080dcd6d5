/// Reasons a capacity matrix or a source/sink pair is rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidInput {
    #[error("capacity matrix is empty")]
    Empty,
    #[error("row {row} has {len} entries, expected {expected}")]
    NotSquare {
        row: usize,
        len: usize,
        expected: usize,
    },
    #[error("negative capacity {value} on edge {from} -> {to}")]
    NegativeCapacity { from: usize, to: usize, value: isize },
    #[error("vertex {vertex} is out of range for a graph of {size} vertices")]
    VertexOutOfRange { vertex: usize, size: usize },
    #[error("total capacity does not fit in a machine integer")]
    CapacityOverflow,
    #[error("source and sink are both vertex {0}")]
    SameSourceAndSink(usize),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InvalidInput),
    /// The parent map handed to an augmentation does not lead from `from` to `to`.
    /// Only reachable by misuse of the search/augment primitives.
    #[error("parent map does not connect vertex {from} to vertex {to}")]
    NoPath { from: usize, to: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
