//! Brute-force cosine search over a contiguous vector pool.
//!
//! `O(n·d)` per query; the pool is small enough that no approximate index
//! is warranted.

use crate::types::EmbeddingRecord;
use rayon::prelude::*;
use tracing::warn;

#[derive(Debug, Default)]
pub struct VectorStore {
    ids: Vec<String>,
    /// Row-major pool, `dimensions` floats per ID.
    pool: Vec<f32>,
    dimensions: usize,
}

impl VectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the pool with the given embeddings. Records whose vector
    /// length disagrees with the first record are dropped.
    pub fn load(&mut self, embeddings: &[EmbeddingRecord]) {
        self.ids.clear();
        self.pool.clear();
        self.dimensions = embeddings.first().map(|e| e.vector.len()).unwrap_or(0);

        for record in embeddings {
            if record.vector.len() != self.dimensions {
                warn!(
                    id = %record.id,
                    got = record.vector.len(),
                    expected = self.dimensions,
                    "dropping embedding with mismatched dimensions"
                );
                continue;
            }
            self.ids.push(record.id.clone());
            self.pool.extend_from_slice(&record.vector);
        }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Cosine top-k: scores below `min_score` and NaN scores are
    /// discarded; results are sorted descending. A zero-norm query returns
    /// nothing.
    pub fn search(&self, query: &[f32], limit: usize, min_score: f64) -> Vec<(String, f64)> {
        if limit == 0 || self.is_empty() || query.len() != self.dimensions {
            return Vec::new();
        }
        let query_norm = norm(query);
        if query_norm == 0.0 {
            return Vec::new();
        }

        let mut scored: Vec<(usize, f64)> = self
            .pool
            .par_chunks(self.dimensions)
            .enumerate()
            .filter_map(|(index, vector)| {
                let score = dot(query, vector) / (query_norm * norm(vector));
                if score.is_nan() || score < min_score {
                    None
                } else {
                    Some((index, score))
                }
            })
            .collect();

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(limit);
        scored
            .into_iter()
            .map(|(index, score)| (self.ids[index].clone(), score))
            .collect()
    }
}

fn dot(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| f64::from(*x) * f64::from(*y))
        .sum()
}

fn norm(v: &[f32]) -> f64 {
    v.iter().map(|x| f64::from(*x) * f64::from(*x)).sum::<f64>().sqrt()
}
