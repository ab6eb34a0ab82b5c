//! Vector similarity utilities

/// Calculate cosine similarity between two vectors.
///
/// Returns a value in [-1, 1]; mismatched dimensions and zero-magnitude
/// vectors yield 0.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let magnitude_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let magnitude_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if magnitude_a == 0.0 || magnitude_b == 0.0 {
        return 0.0;
    }

    dot / (magnitude_a * magnitude_b)
}

/// Cosine similarity normalized from [-1, 1] to [0, 1] for score fusion.
#[must_use]
pub fn cosine_similarity_01(a: &[f32], b: &[f32]) -> f32 {
    (cosine_similarity(a, b) + 1.0) / 2.0
}

/// Normalize a vector to unit length. Zero vectors are returned unchanged.
#[must_use]
pub fn normalize_vector(mut vector: Vec<f32>) -> Vec<f32> {
    let magnitude = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if magnitude > 0.0 {
        for x in &mut vector {
            *x /= magnitude;
        }
    }
    vector
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_vectors_have_similarity_one() {
        let v = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_orthogonal_vectors_have_similarity_zero() {
        let a = vec![1.0, 0.0];
        let b = vec![0.0, 1.0];
        assert!(cosine_similarity(&a, &b).abs() < 0.001);
        assert!((cosine_similarity_01(&a, &b) - 0.5).abs() < 0.001);
    }

    #[test]
    fn test_opposite_vectors_have_similarity_minus_one() {
        let a = vec![1.0, 2.0];
        let b = vec![-1.0, -2.0];
        assert!((cosine_similarity(&a, &b) + 1.0).abs() < 0.001);
        assert!(cosine_similarity_01(&a, &b).abs() < 0.001);
    }

    #[test]
    fn test_dimension_mismatch_yields_zero() {
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0, 2.0, 3.0]), 0.0);
    }

    #[test]
    fn test_normalize_vector_unit_magnitude() {
        let normalized = normalize_vector(vec![3.0, 4.0]);
        assert!((normalized[0] - 0.6).abs() < 0.001);
        assert!((normalized[1] - 0.8).abs() < 0.001);
    }

    #[test]
    fn test_normalize_zero_vector_unchanged() {
        assert_eq!(normalize_vector(vec![0.0, 0.0]), vec![0.0, 0.0]);
    }
}
