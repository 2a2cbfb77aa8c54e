use serde::{Deserialize, Serialize};

/// A dense embedding of one document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Vector {
    data: Vec<f32>,
}

impl Vector {
    #[inline]
    #[must_use]
    pub fn new(data: Vec<f32>) -> Self {
        Self { data }
    }

    /// Zero vector, the representation of an empty document
    #[inline]
    #[must_use]
    pub fn zeros(dim: usize) -> Self {
        Self {
            data: vec![0.0; dim],
        }
    }

    #[inline]
    #[must_use]
    pub fn dim(&self) -> usize {
        self.data.len()
    }

    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    #[inline]
    pub fn dot(&self, other: &Vector) -> f32 {
        crate::simd::dot_product_simd(&self.data, &other.data)
    }

    /// Normalize the vector to unit length
    #[inline]
    pub fn normalize(&mut self) {
        crate::simd::normalize_in_place(&mut self.data);
    }

    #[inline]
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.normalize();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dot_of_unit_vectors() {
        let v1 = Vector::new(vec![3.0, 4.0]).normalized();
        let v2 = Vector::new(vec![1.0, 0.0]);
        assert!((v1.dot(&v2) - 0.6).abs() < 1e-6);
        assert_eq!(Vector::new(vec![1.0, 0.0]).dot(&Vector::new(vec![0.0, 1.0])), 0.0);
    }

    #[test]
    fn test_zero_vector_stays_zero() {
        let zero = Vector::zeros(3);
        let v = Vector::new(vec![1.0, 2.0, 3.0]);
        assert_eq!(zero.dot(&v), 0.0);
        assert_eq!(zero.normalized(), Vector::zeros(3));
    }
}
