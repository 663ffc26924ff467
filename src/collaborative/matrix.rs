use std::collections::{BTreeMap, BTreeSet};

use rustc_hash::FxHashMap;

use crate::model::Interaction;
use crate::primitives::vector::SparseVector;
use crate::types::{ProductId, UserId};

/// Users × products matrix of folded interaction scores.
///
/// Rows and columns are sorted by id and hold exactly the ids seen at build
/// time. Each row is stored sparsely with strictly positive cells only; an
/// absent cell reads as zero.
#[derive(Debug, Clone, Default)]
pub struct UserItemMatrix {
    users: Vec<UserId>,
    products: Vec<ProductId>,
    user_index: FxHashMap<UserId, usize>,
    product_index: FxHashMap<ProductId, usize>,
    rows: Vec<SparseVector>,
}

/// Folds raw interactions into a [`UserItemMatrix`].
pub struct UserItemMatrixBuilder;

impl UserItemMatrixBuilder {
    /// Builds the matrix, keeping the highest score per (user, product).
    ///
    /// The result does not depend on input order or on repeated interactions.
    pub fn build(interactions: &[Interaction]) -> UserItemMatrix {
        let mut cells: BTreeMap<(UserId, ProductId), f64> = BTreeMap::new();
        let mut users = BTreeSet::new();
        let mut products = BTreeSet::new();
        for interaction in interactions {
            users.insert(interaction.user_id);
            products.insert(interaction.product_id);
            let score = interaction.score();
            cells
                .entry((interaction.user_id, interaction.product_id))
                .and_modify(|cell| *cell = cell.max(score))
                .or_insert(score);
        }

        let users: Vec<UserId> = users.into_iter().collect();
        let products: Vec<ProductId> = products.into_iter().collect();
        let user_index: FxHashMap<UserId, usize> =
            users.iter().enumerate().map(|(idx, id)| (*id, idx)).collect();
        let product_index: FxHashMap<ProductId, usize> =
            products.iter().enumerate().map(|(idx, id)| (*id, idx)).collect();

        let mut row_pairs: Vec<Vec<(u32, f64)>> = vec![Vec::new(); users.len()];
        for ((user, product), score) in cells {
            if score > 0.0 {
                row_pairs[user_index[&user]].push((product_index[&product] as u32, score));
            }
        }
        let rows = row_pairs.into_iter().map(SparseVector::from_pairs).collect();

        UserItemMatrix {
            users,
            products,
            user_index,
            product_index,
            rows,
        }
    }
}

impl UserItemMatrix {
    /// Row labels, ascending.
    pub fn users(&self) -> &[UserId] {
        &self.users
    }

    /// Column labels, ascending.
    pub fn products(&self) -> &[ProductId] {
        &self.products
    }

    /// Number of rows.
    pub fn n_users(&self) -> usize {
        self.users.len()
    }

    /// Number of columns.
    pub fn n_products(&self) -> usize {
        self.products.len()
    }

    /// Whether the user has a row.
    pub fn contains_user(&self, user: UserId) -> bool {
        self.user_index.contains_key(&user)
    }

    /// Row position of a user.
    pub fn user_position(&self, user: UserId) -> Option<usize> {
        self.user_index.get(&user).copied()
    }

    /// Row at a position.
    pub fn row_at(&self, position: usize) -> &SparseVector {
        &self.rows[position]
    }

    /// Row of a user.
    pub fn row(&self, user: UserId) -> Option<&SparseVector> {
        self.user_position(user).map(|pos| &self.rows[pos])
    }

    /// Cell value; zero when either label is unknown or nothing was scored.
    pub fn score(&self, user: UserId, product: ProductId) -> f64 {
        match (self.row(user), self.product_index.get(&product)) {
            (Some(row), Some(&col)) => row.get(col as u32),
            _ => 0.0,
        }
    }

    /// Products with a positive cell in the user's row, with their scores.
    pub fn interacted_products(&self, user: UserId) -> Vec<(ProductId, f64)> {
        self.row(user)
            .map(|row| {
                row.iter()
                    .map(|(col, score)| (self.products[col as usize], score))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of positive cells.
    pub fn nonzero_count(&self) -> usize {
        self.rows.iter().map(SparseVector::nnz).sum()
    }

    /// Total number of cells.
    pub fn cell_count(&self) -> usize {
        self.users.len() * self.products.len()
    }

    /// Fraction of empty cells, `1 - nonzero / total`; zero for an empty
    /// matrix.
    pub fn sparsity(&self) -> f64 {
        let total = self.cell_count();
        if total == 0 {
            0.0
        } else {
            1.0 - self.nonzero_count() as f64 / total as f64
        }
    }

    /// Number of columns with at least one positive cell.
    pub fn covered_products(&self) -> usize {
        let mut covered = vec![false; self.products.len()];
        for row in &self.rows {
            for (col, _) in row.iter() {
                covered[col as usize] = true;
            }
        }
        covered.into_iter().filter(|c| *c).count()
    }
}
