use std::fmt;

use serde::{Serialize, Serializer};

use crate::error::{InvalidInput, Result};

/// Dense row-major square matrix of integer capacities or flows.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Matrix {
    size: usize,
    data: Box<[isize]>,
}

impl Matrix {
    pub fn new(size: usize, initial: isize) -> Self {
        Matrix {
            size,
            data: vec![initial; size * size].into_boxed_slice(),
        }
    }

    /// Copies `rows` into a matrix, rejecting empty or ragged input.
    pub fn from_rows<R: AsRef<[isize]>>(rows: &[R]) -> Result<Self> {
        let size = rows.len();
        if size == 0 {
            return Err(InvalidInput::Empty.into());
        }
        let mut data = Vec::with_capacity(size * size);
        for (row, values) in rows.iter().enumerate() {
            let values = values.as_ref();
            if values.len() != size {
                return Err(InvalidInput::NotSquare {
                    row,
                    len: values.len(),
                    expected: size,
                }
                .into());
            }
            data.extend_from_slice(values);
        }
        Ok(Matrix {
            size,
            data: data.into_boxed_slice(),
        })
    }

    pub fn dimension(&self) -> usize {
        self.size
    }
    pub fn get(&self, u: usize, v: usize) -> isize {
        self.data[u * self.size + v]
    }
    pub fn set(&mut self, u: usize, v: usize, value: isize) {
        self.data[u * self.size + v] = value;
    }
    pub fn add(&mut self, u: usize, v: usize, value: isize) {
        self.data[u * self.size + v] += value;
    }

    pub fn row(&self, u: usize) -> &[isize] {
        &self.data[u * self.size..(u + 1) * self.size]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[isize]> + '_ {
        self.data.chunks(self.size.max(1))
    }

    pub fn to_rows(&self) -> Vec<Vec<isize>> {
        self.rows().map(<[isize]>::to_vec).collect()
    }

    /// Entries as `(u, v, value)`, skipping zeros.
    pub fn entries(&self) -> impl Iterator<Item = (usize, usize, isize)> + '_ {
        self.data.iter().enumerate().filter_map(|(i, &value)| {
            if value == 0 {
                return None;
            }
            Some((i / self.size, i % self.size, value))
        })
    }
}

impl Serialize for Matrix {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_seq(self.rows())
    }
}

impl fmt::Display for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .data
            .iter()
            .map(|x| x.to_string().len())
            .max()
            .unwrap_or(1);
        for row in self.rows() {
            for (j, value) in row.iter().enumerate() {
                if j > 0 {
                    write!(f, " ")?;
                }
                write!(f, "{value:>width$}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
