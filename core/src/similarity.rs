use crate::vectorizer::TermVector;
use crate::{Error, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Dense, row-major pairwise cosine similarity over every document in the corpus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityMatrix {
    dim: usize,
    values: Vec<f32>,
}

impl SimilarityMatrix {
    /// Pairwise cosine similarity. Scores are accumulated through per-term postings so only
    /// documents sharing a term are touched. A zero vector scores 0 against everything,
    /// itself included.
    pub fn compute(vectors: &[TermVector]) -> Self {
        let dim = vectors.len();
        let norms: Vec<f32> = vectors.iter().map(TermVector::norm).collect();

        let num_terms = vectors
            .iter()
            .filter_map(|v| v.entries().last().map(|&(t, _)| t as usize + 1))
            .max()
            .unwrap_or(0);
        let mut postings: Vec<Vec<(usize, f32)>> = vec![Vec::new(); num_terms];
        for (doc, v) in vectors.iter().enumerate() {
            for &(term, weight) in v.entries() {
                postings[term as usize].push((doc, weight));
            }
        }

        let mut values = vec![0.0f32; dim * dim];
        // Terms are visited in ascending id for every row, so [i][j] and [j][i] sum the same
        // products in the same order and come out bit-identical.
        values.par_chunks_mut(dim.max(1)).enumerate().for_each(|(i, row)| {
            for &(term, w_i) in vectors[i].entries() {
                for &(j, w_j) in &postings[term as usize] {
                    row[j] += w_i * w_j;
                }
            }
            for (j, cell) in row.iter_mut().enumerate() {
                let denom = norms[i] * norms[j];
                *cell = if denom > 0.0 { (*cell / denom).clamp(0.0, 1.0) } else { 0.0 };
            }
            if norms[i] > 0.0 {
                row[i] = 1.0;
            }
        });

        tracing::debug!(dim, num_terms, "similarity matrix computed");
        Self { dim, values }
    }

    pub fn dim(&self) -> usize { self.dim }

    /// Checks the row-major buffer matches the declared dimension (deserialized input).
    pub fn validate(&self) -> Result<()> {
        if self.values.len() != self.dim * self.dim {
            return Err(Error::InvalidArgument(format!(
                "similarity buffer holds {} values, expected {}",
                self.values.len(),
                self.dim * self.dim
            )));
        }
        Ok(())
    }

    pub fn row(&self, row: usize) -> Result<&[f32]> {
        if row >= self.dim {
            return Err(Error::IndexOutOfRange { row, dim: self.dim });
        }
        Ok(&self.values[row * self.dim..(row + 1) * self.dim])
    }

    pub fn get(&self, i: usize, j: usize) -> Option<f32> {
        (i < self.dim && j < self.dim).then(|| self.values[i * self.dim + j])
    }

    /// The `n` most similar other documents of `row`, by descending score then ascending index.
    /// `row` itself is excluded by identity, so an exact duplicate still shows up.
    pub fn top_n(&self, row: usize, n: usize) -> Result<Vec<(usize, f32)>> {
        let scores = self.row(row)?;
        let mut ranked: Vec<(usize, f32)> = scores
            .iter()
            .copied()
            .enumerate()
            .filter(|&(j, _)| j != row)
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked.truncate(n);
        Ok(ranked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vec_of(entries: &[(u32, f32)]) -> TermVector {
        TermVector::from_entries(entries.to_vec())
    }

    fn sample() -> SimilarityMatrix {
        SimilarityMatrix::compute(&[
            vec_of(&[(0, 0.6), (1, 0.8)]),
            vec_of(&[(0, 0.6), (1, 0.8)]),
            vec_of(&[(1, 1.0)]),
            vec_of(&[]),
            vec_of(&[(2, 1.0)]),
        ])
    }

    #[test]
    fn diagonal_and_zero_vector() {
        let m = sample();
        for i in [0, 1, 2, 4] {
            assert_eq!(m.get(i, i), Some(1.0));
        }
        assert_eq!(m.get(3, 3), Some(0.0));
        assert_eq!(m.row(3).unwrap(), &[0.0; 5]);
    }

    #[test]
    fn symmetric_and_bounded() {
        let m = sample();
        for i in 0..m.dim() {
            for j in 0..m.dim() {
                let v = m.get(i, j).unwrap();
                assert_eq!(v, m.get(j, i).unwrap());
                assert!((0.0..=1.0).contains(&v));
            }
        }
        assert!((m.get(0, 2).unwrap() - 0.8).abs() < 1e-6);
    }

    #[test]
    fn top_n_keeps_duplicate_and_drops_self() {
        let m = sample();
        let top = m.top_n(1, 4).unwrap();
        let ids: Vec<usize> = top.iter().map(|&(j, _)| j).collect();
        assert_eq!(ids, vec![0, 2, 3, 4]);
        assert!((top[0].1 - 1.0).abs() < 1e-6);
    }

    #[test]
    fn top_n_orders_ties_by_index() {
        let m = sample();
        let top = m.top_n(4, 10).unwrap();
        assert_eq!(top.iter().map(|&(j, _)| j).collect::<Vec<_>>(), vec![0, 1, 2, 3]);
        assert!(top.windows(2).all(|w| w[0].1 >= w[1].1));
    }

    #[test]
    fn top_n_bounds() {
        let m = sample();
        assert!(m.top_n(0, 0).unwrap().is_empty());
        assert_eq!(m.top_n(0, 100).unwrap().len(), 4);
        assert!(matches!(m.top_n(5, 1), Err(Error::IndexOutOfRange { row: 5, dim: 5 })));
    }

    #[test]
    fn empty_input() {
        let m = SimilarityMatrix::compute(&[]);
        assert_eq!(m.dim(), 0);
        assert!(m.validate().is_ok());
        assert!(m.top_n(0, 1).is_err());
    }
}
