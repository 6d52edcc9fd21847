//! Reproducible train/evaluation splits.
//!
//! Both functions return `(train, eval)` row indices in ascending order. The
//! same inputs and seed always give the same split.

use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_xoshiro::Xoshiro256PlusPlus;

use crate::model::ClassId;

fn eval_len(n: usize, eval_fraction: f64) -> usize {
    ((n as f64) * eval_fraction).round() as usize
}

/// Shuffle all rows and hold out `round(n * eval_fraction)` of them.
///
/// At least one row stays in the training split whenever `n > 0`.
pub fn split_indices(n: usize, eval_fraction: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut idx: Vec<usize> = (0..n).collect();
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    idx.shuffle(&mut rng);

    let n_eval = eval_len(n, eval_fraction).min(n.saturating_sub(1));
    let (eval, train) = idx.split_at(n_eval);
    let (mut train, mut eval) = (train.to_vec(), eval.to_vec());
    train.sort_unstable();
    eval.sort_unstable();
    (train, eval)
}

/// Split each class separately.
///
/// Class `c` with `n_c` rows contributes `round(n_c * eval_fraction)` rows to
/// the evaluation split, capped so that every class keeps at least one
/// training row. Classes are visited in id order with one shared generator.
pub fn stratified_split_indices(
    targets: &[ClassId],
    n_classes: usize,
    eval_fraction: f64,
    seed: u64,
) -> (Vec<usize>, Vec<usize>) {
    let mut by_class: Vec<Vec<usize>> = vec![Vec::new(); n_classes];
    for (row, target) in targets.iter().enumerate() {
        if let Some(rows) = by_class.get_mut(target.index()) {
            rows.push(row);
        }
    }

    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    let mut train = Vec::with_capacity(targets.len());
    let mut eval = Vec::new();
    for mut rows in by_class {
        rows.shuffle(&mut rng);
        let n_eval = eval_len(rows.len(), eval_fraction).min(rows.len().saturating_sub(1));
        eval.extend_from_slice(&rows[..n_eval]);
        train.extend_from_slice(&rows[n_eval..]);
    }
    train.sort_unstable();
    eval.sort_unstable();
    (train, eval)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(raw: &[u32]) -> Vec<ClassId> {
        raw.iter().copied().map(ClassId::new).collect()
    }

    #[test]
    fn split_sizes_and_disjointness() {
        let (train, eval) = split_indices(100, 0.2, 42);
        assert_eq!(train.len(), 80);
        assert_eq!(eval.len(), 20);

        let mut all: Vec<usize> = train.iter().chain(&eval).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn split_is_reproducible() {
        assert_eq!(split_indices(50, 0.2, 7), split_indices(50, 0.2, 7));
        assert_ne!(split_indices(50, 0.2, 7), split_indices(50, 0.2, 8));
    }

    #[test]
    fn split_keeps_a_training_row() {
        let (train, eval) = split_indices(1, 0.9, 0);
        assert_eq!(train, vec![0]);
        assert!(eval.is_empty());
        assert_eq!(split_indices(0, 0.2, 0), (vec![], vec![]));
    }

    #[test]
    fn stratified_preserves_class_mix() {
        let mut raw = vec![0u32; 50];
        raw.extend(vec![1u32; 30]);
        raw.extend(vec![2u32; 20]);
        let targets = ids(&raw);

        let (train, eval) = stratified_split_indices(&targets, 3, 0.2, 42);
        assert_eq!(eval.len(), 10 + 6 + 4);
        assert_eq!(train.len(), 80);

        let count = |rows: &[usize], c: u32| rows.iter().filter(|&&r| targets[r].get() == c).count();
        assert_eq!(count(&eval, 0), 10);
        assert_eq!(count(&eval, 1), 6);
        assert_eq!(count(&eval, 2), 4);
    }

    #[test]
    fn stratified_keeps_singleton_class_in_training() {
        let targets = ids(&[0, 0, 0, 0, 0, 1]);
        let (train, eval) = stratified_split_indices(&targets, 2, 0.5, 1);
        assert!(train.contains(&5));
        assert!(!eval.contains(&5));
    }

    #[test]
    fn stratified_is_reproducible() {
        let targets = ids(&[0, 1, 0, 1, 0, 1, 0, 1, 2, 2]);
        assert_eq!(
            stratified_split_indices(&targets, 3, 0.3, 9),
            stratified_split_indices(&targets, 3, 0.3, 9)
        );
    }
}
