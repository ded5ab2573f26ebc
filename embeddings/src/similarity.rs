//! Vector math shared by the index and its callers.

use ordered_float::OrderedFloat;

use crate::Embedding;

/// Euclidean length of a vector.
pub fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Scale a vector to unit length in place. Zero vectors are left untouched.
pub fn normalize(v: &mut [f32]) {
    let magnitude = l2_norm(v);
    if magnitude > 0.0 {
        for x in v.iter_mut() {
            *x /= magnitude;
        }
    }
}

/// Return a unit-length copy of `v`.
pub fn normalized(v: &[f32]) -> Embedding {
    let mut out = v.to_vec();
    normalize(&mut out);
    out
}

/// Inner product of two equal-length vectors.
///
/// Extra trailing components of the longer slice are ignored; callers are
/// expected to have checked dimensions already.
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Cosine similarity in `[-1.0, 1.0]`, or `None` when the lengths differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f32> {
    if a.len() != b.len() {
        return None;
    }

    let magnitude_a = l2_norm(a);
    let magnitude_b = l2_norm(b);
    if magnitude_a == 0.0 || magnitude_b == 0.0 {
        return Some(0.0);
    }

    Some(dot(a, b) / (magnitude_a * magnitude_b))
}

/// Keep the `k` best `(position, score)` pairs, highest score first.
///
/// Equal scores keep the lower position first so results are stable across
/// runs.
pub fn top_k(scores: impl IntoIterator<Item = (usize, f32)>, k: usize) -> Vec<(usize, f32)> {
    if k == 0 {
        return Vec::new();
    }

    let mut ranked: Vec<(usize, f32)> = scores.into_iter().collect();
    ranked.sort_by(|a, b| {
        OrderedFloat(b.1)
            .cmp(&OrderedFloat(a.1))
            .then_with(|| a.0.cmp(&b.0))
    });
    ranked.truncate(k);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_normalize() {
        let mut v = vec![3.0, 4.0];
        normalize(&mut v);
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_normalize_zero_vector_is_noop() {
        let mut v = vec![0.0, 0.0, 0.0];
        normalize(&mut v);
        assert_eq!(v, vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_cosine_similarity_orthogonal_and_opposite() {
        let a = [1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &[0.0, 1.0, 0.0]).unwrap()).abs() < 1e-6);
        assert!((cosine_similarity(&a, &[-2.0, 0.0, 0.0]).unwrap() + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_length_mismatch() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0, 0.0, 0.0]), None);
    }

    #[test]
    fn test_top_k_orders_and_clamps() {
        let scores = vec![(0, 0.1), (1, 0.9), (2, 0.5), (3, 0.9)];
        assert_eq!(top_k(scores.clone(), 2), vec![(1, 0.9), (3, 0.9)]);
        assert_eq!(top_k(scores, 10).len(), 4);
        assert!(top_k(vec![(0, 1.0)], 0).is_empty());
    }
}
