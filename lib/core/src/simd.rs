// Lane-chunked float kernels.
// Eight independent accumulators let LLVM emit packed AVX/NEON adds without
// intrinsics, and the fixed reduction order keeps results identical on every
// target (scores must be bit-reproducible across machines).

const LANES: usize = 8;

/// Inner product of two equal-length slices.
/// Returns 0.0 when lengths differ.
#[inline]
pub fn dot_product_simd(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let mut acc = [0.0f32; LANES];
    let chunks_a = a.chunks_exact(LANES);
    let chunks_b = b.chunks_exact(LANES);
    let tail_a = chunks_a.remainder();
    let tail_b = chunks_b.remainder();

    for (ca, cb) in chunks_a.zip(chunks_b) {
        for lane in 0..LANES {
            acc[lane] += ca[lane] * cb[lane];
        }
    }

    let mut dot = reduce(&acc);
    for (x, y) in tail_a.iter().zip(tail_b) {
        dot += x * y;
    }
    dot
}

/// Euclidean norm.
#[inline]
pub fn norm_simd(a: &[f32]) -> f32 {
    dot_product_simd(a, a).sqrt()
}

/// Scale `a` to unit length in place. Zero vectors are left untouched.
#[inline]
pub fn normalize_in_place(a: &mut [f32]) {
    let norm = norm_simd(a);
    if norm > f32::EPSILON {
        let inv = 1.0 / norm;
        for x in a.iter_mut() {
            *x *= inv;
        }
    }
}

// Pairwise tree reduction, fixed order.
#[inline(always)]
fn reduce(acc: &[f32; LANES]) -> f32 {
    let s0 = acc[0] + acc[4];
    let s1 = acc[1] + acc[5];
    let s2 = acc[2] + acc[6];
    let s3 = acc[3] + acc[7];
    (s0 + s2) + (s1 + s3)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn naive_dot(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[test]
    fn test_dot_product_matches_naive() {
        for dim in [1usize, 7, 8, 9, 31, 64, 300] {
            let a: Vec<f32> = (0..dim).map(|i| (i as f32 * 0.37).sin()).collect();
            let b: Vec<f32> = (0..dim).map(|i| (i as f32 * 0.11).cos()).collect();
            let fast = dot_product_simd(&a, &b);
            let slow = naive_dot(&a, &b);
            assert!((fast - slow).abs() < 1e-4, "dim {}: {} vs {}", dim, fast, slow);
        }
    }

    #[test]
    fn test_length_mismatch_is_zero() {
        assert_eq!(dot_product_simd(&[1.0, 2.0], &[1.0]), 0.0);
    }

    #[test]
    fn test_normalize() {
        let mut v = vec![3.0, 4.0];
        normalize_in_place(&mut v);
        assert!((norm_simd(&v) - 1.0).abs() < 1e-6);

        let mut zero = vec![0.0; 4];
        normalize_in_place(&mut zero);
        assert!(zero.iter().all(|x| *x == 0.0));
    }
}
