use super::matrix::UserItemMatrix;
use crate::primitives::rank;
use crate::primitives::vector::cosine_with_norms;
use crate::types::UserId;

/// Dense symmetric cosine similarity between every pair of users.
///
/// Indexed by the row order of the [`UserItemMatrix`] it was built from.
/// The diagonal is exactly 1; a user without positive cells has similarity
/// 0 to everyone else.
#[derive(Debug, Clone, Default)]
pub struct UserSimilarityMatrix {
    users: Vec<UserId>,
    values: Vec<f64>,
}

/// Computes the [`UserSimilarityMatrix`] of a user-item matrix.
pub struct UserSimilarityEngine;

impl UserSimilarityEngine {
    /// Full pairwise computation; only the upper triangle is evaluated and
    /// mirrored.
    pub fn compute(matrix: &UserItemMatrix) -> UserSimilarityMatrix {
        let n = matrix.n_users();
        let norms: Vec<f64> = (0..n).map(|i| matrix.row_at(i).norm()).collect();
        let mut values = vec![0.0; n * n];
        for i in 0..n {
            values[i * n + i] = 1.0;
            for j in (i + 1)..n {
                let sim = cosine_with_norms(matrix.row_at(i), norms[i], matrix.row_at(j), norms[j])
                    .clamp(0.0, 1.0);
                values[i * n + j] = sim;
                values[j * n + i] = sim;
            }
        }
        UserSimilarityMatrix {
            users: matrix.users().to_vec(),
            values,
        }
    }
}

impl UserSimilarityMatrix {
    fn position(&self, user: UserId) -> Option<usize> {
        self.users.binary_search(&user).ok()
    }

    /// Number of users on each axis.
    pub fn len(&self) -> usize {
        self.users.len()
    }

    /// Whether the matrix has no users.
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Similarity of two users; `None` if either is unknown.
    pub fn similarity(&self, a: UserId, b: UserId) -> Option<f64> {
        let (i, j) = (self.position(a)?, self.position(b)?);
        Some(self.values[i * self.users.len() + j])
    }

    /// The `k` most similar other users, descending by similarity with ties
    /// on ascending user id. Unknown users have no neighbors.
    pub fn nearest_neighbors(&self, user: UserId, k: usize) -> Vec<(UserId, f64)> {
        let Some(i) = self.position(user) else {
            return Vec::new();
        };
        let n = self.users.len();
        let row = &self.values[i * n..(i + 1) * n];
        let neighbors: Vec<(UserId, f64)> = self
            .users
            .iter()
            .zip(row)
            .enumerate()
            .filter(|(j, _)| *j != i)
            .map(|(_, (other, sim))| (*other, *sim))
            .collect();
        rank::top_k(neighbors, k)
    }
}
