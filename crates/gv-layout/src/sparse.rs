//! Row-compressed sparse matrices for the layout kernel.
//!
//! Invariants: `ia[0] == 0`, `ia[m] == nnz`, every row's `ja` slice is
//! sorted by column. A matrix flagged symmetric stores both triangles
//! with equal values.

/// Entry storage. `Real` is the working type of the layout engines;
/// `Pattern` drops the values entirely.
#[derive(Debug, Clone, PartialEq)]
pub enum Values {
    Pattern,
    Real(Vec<f64>),
    Integer(Vec<i64>),
    Complex(Vec<[f64; 2]>),
}

impl Values {
    fn len_matches(&self, nnz: usize) -> bool {
        match self {
            Values::Pattern => true,
            Values::Real(v) => v.len() == nnz,
            Values::Integer(v) => v.len() == nnz,
            Values::Complex(v) => v.len() == nnz,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SparseMatrix {
    pub m: usize,
    pub n: usize,
    pub ia: Vec<usize>,
    pub ja: Vec<usize>,
    pub vals: Values,
}

impl SparseMatrix {
    pub fn nnz(&self) -> usize {
        self.ia[self.m]
    }

    pub fn row(&self, i: usize) -> &[usize] {
        &self.ja[self.ia[i]..self.ia[i + 1]]
    }

    pub fn row_values(&self, i: usize) -> &[f64] {
        match &self.vals {
            Values::Real(v) => &v[self.ia[i]..self.ia[i + 1]],
            _ => &[],
        }
    }

    pub fn degree(&self, i: usize) -> usize {
        self.ia[i + 1] - self.ia[i]
    }

    /// Build a real matrix from coordinate triples, summing duplicates.
    pub fn from_triples(m: usize, n: usize, triples: &[(usize, usize, f64)]) -> SparseMatrix {
        let mut sorted: Vec<(usize, usize, f64)> = triples
            .iter()
            .copied()
            .filter(|&(i, j, _)| i < m && j < n)
            .collect();
        sorted.sort_by_key(|&(i, j, _)| (i, j));
        let mut ia = vec![0usize; m + 1];
        let mut ja = Vec::with_capacity(sorted.len());
        let mut vals = Vec::with_capacity(sorted.len());
        let mut last: Option<(usize, usize)> = None;
        for (i, j, v) in sorted {
            if last == Some((i, j)) {
                *vals.last_mut().unwrap() += v;
            } else {
                ja.push(j);
                vals.push(v);
                last = Some((i, j));
            }
            ia[i + 1] = ja.len();
        }
        // close the row pointers of empty rows
        for i in 1..=m {
            ia[i] = ia[i].max(ia[i - 1]);
        }
        SparseMatrix {
            m,
            n,
            ia,
            ja,
            vals: Values::Real(vals),
        }
    }

    /// Pattern-only variant of `from_triples`.
    pub fn pattern_from_pairs(m: usize, n: usize, pairs: &[(usize, usize)]) -> SparseMatrix {
        let triples: Vec<(usize, usize, f64)> =
            pairs.iter().map(|&(i, j)| (i, j, 1.0)).collect();
        let mut a = SparseMatrix::from_triples(m, n, &triples);
        a.vals = Values::Pattern;
        a
    }

    pub fn transpose(&self) -> SparseMatrix {
        let nnz = self.nnz();
        let mut counts = vec![0usize; self.n + 1];
        for &j in &self.ja {
            counts[j + 1] += 1;
        }
        for j in 0..self.n {
            counts[j + 1] += counts[j];
        }
        let mut ia = counts.clone();
        let mut ja = vec![0usize; nnz];
        let mut vals = match &self.vals {
            Values::Real(_) => vec![0.0f64; nnz],
            _ => Vec::new(),
        };
        for i in 0..self.m {
            for k in self.ia[i]..self.ia[i + 1] {
                let j = self.ja[k];
                let at = ia[j];
                ja[at] = i;
                if let Values::Real(v) = &self.vals {
                    vals[at] = v[k];
                }
                ia[j] += 1;
            }
        }
        // shift back
        for j in (1..=self.n).rev() {
            ia[j] = ia[j - 1];
        }
        ia[0] = 0;
        SparseMatrix {
            m: self.n,
            n: self.m,
            ia,
            ja,
            vals: match &self.vals {
                Values::Real(_) => Values::Real(vals),
                other => other.clone(),
            },
        }
    }

    pub fn is_symmetric(&self) -> bool {
        if self.m != self.n {
            return false;
        }
        let t = self.transpose();
        self.ia == t.ia && self.ja == t.ja && {
            match (&self.vals, &t.vals) {
                (Values::Real(a), Values::Real(b)) => a
                    .iter()
                    .zip(b)
                    .all(|(x, y)| (x - y).abs() <= 1e-12 * x.abs().max(y.abs()).max(1.0)),
                _ => true,
            }
        }
    }

    /// Symmetrize. `pattern_union` makes `A ∪ Aᵀ` (entries present in
    /// either triangle, larger magnitude wins); otherwise `½(A + Aᵀ)`.
    pub fn symmetrize(&self, pattern_union: bool) -> SparseMatrix {
        assert_eq!(self.m, self.n, "symmetrize requires a square matrix");
        if pattern_union {
            let mut pairs: Vec<(usize, usize)> = Vec::with_capacity(2 * self.nnz());
            for i in 0..self.m {
                for &j in self.row(i) {
                    pairs.push((i, j));
                    pairs.push((j, i));
                }
            }
            pairs.sort_unstable();
            pairs.dedup();
            let triples: Vec<(usize, usize, f64)> = pairs
                .into_iter()
                .map(|(i, j)| (i, j, self.get(i, j).max(self.get(j, i))))
                .collect();
            let mut s = SparseMatrix::from_triples(self.m, self.n, &triples);
            if matches!(self.vals, Values::Pattern) {
                s.vals = Values::Pattern;
            }
            return s;
        }
        let t = self.transpose();
        let mut triples: Vec<(usize, usize, f64)> = Vec::with_capacity(2 * self.nnz());
        for src in [self, &t] {
            for i in 0..src.m {
                for k in src.ia[i]..src.ia[i + 1] {
                    let v = match &src.vals {
                        Values::Real(v) => v[k],
                        _ => 1.0,
                    };
                    triples.push((i, src.ja[k], v * 0.5));
                }
            }
        }
        SparseMatrix::from_triples(self.m, self.n, &triples)
    }

    /// Value at (i, j); zero when absent, 1 for pattern entries.
    pub fn get(&self, i: usize, j: usize) -> f64 {
        let row = self.row(i);
        match row.binary_search(&j) {
            Ok(pos) => match &self.vals {
                Values::Real(v) => v[self.ia[i] + pos],
                Values::Integer(v) => v[self.ia[i] + pos] as f64,
                _ => 1.0,
            },
            Err(_) => 0.0,
        }
    }

    pub fn has_diagonal(&self) -> bool {
        (0..self.m).any(|i| self.row(i).binary_search(&i).is_ok())
    }

    pub fn remove_diagonal(&self) -> SparseMatrix {
        let mut triples = Vec::with_capacity(self.nnz());
        for i in 0..self.m {
            for k in self.ia[i]..self.ia[i + 1] {
                let j = self.ja[k];
                if i == j {
                    continue;
                }
                let v = match &self.vals {
                    Values::Real(v) => v[k],
                    Values::Integer(v) => v[k] as f64,
                    _ => 1.0,
                };
                triples.push((i, j, v));
            }
        }
        let mut a = SparseMatrix::from_triples(self.m, self.n, &triples);
        if matches!(self.vals, Values::Pattern) {
            a.vals = Values::Pattern;
        }
        a
    }

    /// The real adjacency used by the layout engines: absolute values,
    /// symmetrized, diagonal-free.
    pub fn real_adjacency_symmetrized(&self) -> SparseMatrix {
        let mut triples = Vec::with_capacity(2 * self.nnz());
        for i in 0..self.m {
            for k in self.ia[i]..self.ia[i + 1] {
                let j = self.ja[k];
                if i == j {
                    continue;
                }
                let v = match &self.vals {
                    Values::Real(v) => v[k].abs(),
                    Values::Integer(v) => (v[k] as f64).abs(),
                    _ => 1.0,
                };
                triples.push((i, j, v));
                triples.push((j, i, v));
            }
        }
        SparseMatrix::from_triples(self.m, self.n, &triples)
    }

    /// Permute rows and columns by `p` (entry `(i, j)` moves to
    /// `(p[i], p[j])`).
    pub fn permute(&self, p: &[usize]) -> SparseMatrix {
        assert_eq!(p.len(), self.m);
        assert_eq!(self.m, self.n);
        let mut triples = Vec::with_capacity(self.nnz());
        for i in 0..self.m {
            for k in self.ia[i]..self.ia[i + 1] {
                let v = match &self.vals {
                    Values::Real(v) => v[k],
                    Values::Integer(v) => v[k] as f64,
                    _ => 1.0,
                };
                triples.push((p[i], p[self.ja[k]], v));
            }
        }
        SparseMatrix::from_triples(self.m, self.n, &triples)
    }

    /// Sparse × dense: `y[i*dim..] = Σ_j a_ij · x[j*dim..]`.
    pub fn mult_dense(&self, x: &[f64], dim: usize) -> Vec<f64> {
        assert_eq!(x.len(), self.n * dim);
        let mut y = vec![0.0; self.m * dim];
        for i in 0..self.m {
            for k in self.ia[i]..self.ia[i + 1] {
                let j = self.ja[k];
                let v = match &self.vals {
                    Values::Real(v) => v[k],
                    Values::Integer(v) => v[k] as f64,
                    _ => 1.0,
                };
                for d in 0..dim {
                    y[i * dim + d] += v * x[j * dim + d];
                }
            }
        }
        y
    }

    /// Consistency check of the CSR invariants.
    pub fn check(&self) -> bool {
        self.ia.len() == self.m + 1
            && self.ia[0] == 0
            && self.ia[self.m] == self.ja.len()
            && self.ia.windows(2).all(|w| w[0] <= w[1])
            && (0..self.m).all(|i| self.row(i).windows(2).all(|w| w[0] < w[1]))
            && self.ja.iter().all(|&j| j < self.n)
            && self.vals.len_matches(self.ja.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn path3() -> SparseMatrix {
        // 0-1, 1-2 directed
        SparseMatrix::from_triples(3, 3, &[(0, 1, 1.0), (1, 2, 1.0)])
    }

    #[test]
    fn csr_invariants_hold() {
        let a = path3();
        assert!(a.check());
        assert_eq!(a.ia, vec![0, 1, 2, 2]);
        assert_eq!(a.ja, vec![1, 2]);
    }

    #[test]
    fn duplicates_sum() {
        let a = SparseMatrix::from_triples(2, 2, &[(0, 1, 1.0), (0, 1, 2.5)]);
        assert_eq!(a.nnz(), 1);
        assert_eq!(a.get(0, 1), 3.5);
    }

    #[test]
    fn symmetrize_union_and_average() {
        let a = path3();
        let u = a.symmetrize(true);
        assert!(u.check());
        assert!(u.is_symmetric());
        assert_eq!(u.get(1, 0), 1.0);
        let avg = a.symmetrize(false);
        assert!(avg.is_symmetric());
        assert_eq!(avg.get(0, 1), 0.5);
        assert_eq!(avg.get(1, 0), 0.5);
    }

    #[test]
    fn diagonal_removal() {
        let a = SparseMatrix::from_triples(2, 2, &[(0, 0, 1.0), (0, 1, 1.0), (1, 1, 2.0)]);
        assert!(a.has_diagonal());
        let b = a.remove_diagonal();
        assert!(!b.has_diagonal());
        assert_eq!(b.nnz(), 1);
    }

    #[test]
    fn mult_dense_interleaved() {
        let a = path3().symmetrize(true);
        let x = vec![1.0, 10.0, 2.0, 20.0, 3.0, 30.0];
        let y = a.mult_dense(&x, 2);
        // row 1 touches columns 0 and 2
        assert_eq!(y[2], 4.0);
        assert_eq!(y[3], 40.0);
    }

    #[test]
    fn permutation_relabels() {
        let a = path3();
        let p = vec![2, 0, 1]; // 0→2, 1→0, 2→1
        let b = a.permute(&p);
        assert_eq!(b.get(2, 0), 1.0); // edge 0→1 became 2→0
        assert_eq!(b.get(0, 1), 1.0); // edge 1→2 became 0→1
    }

    #[test]
    fn real_adjacency_handles_parallel_edges() {
        let a = SparseMatrix::from_triples(2, 2, &[(0, 1, -2.0), (1, 0, 1.0)]);
        let s = a.real_adjacency_symmetrized();
        assert!(s.is_symmetric());
        assert!(s.get(0, 1) > 0.0);
    }
}
