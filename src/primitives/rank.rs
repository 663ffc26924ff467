#![forbid(unsafe_code)]

use std::cmp::Ordering;

/// Descending by score, ascending by key on ties.
pub fn by_score_desc<K: Ord>(a: &(K, f64), b: &(K, f64)) -> Ordering {
    b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0))
}

/// Sorts scored keys descending by score, ascending by key on ties.
pub fn sort_desc<K: Ord>(items: &mut [(K, f64)]) {
    items.sort_by(by_score_desc);
}

/// The `k` best scored keys in [`sort_desc`] order.
pub fn top_k<K: Ord>(mut items: Vec<(K, f64)>, k: usize) -> Vec<(K, f64)> {
    sort_desc(&mut items);
    items.truncate(k);
    items
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ties_break_on_ascending_key() {
        let ranked = top_k(vec![(3, 0.5), (1, 0.5), (2, 0.9), (4, 0.1)], 3);
        assert_eq!(ranked, vec![(2, 0.9), (1, 0.5), (3, 0.5)]);
    }

    #[test]
    fn top_k_larger_than_input_keeps_everything() {
        let ranked = top_k(vec![(1, 1.0)], 10);
        assert_eq!(ranked.len(), 1);
    }
}
