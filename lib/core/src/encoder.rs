//! Dense encoder interface for the embedding backend.
//!
//! Any model that maps text to a fixed-length vector can be plugged in by
//! implementing [`Encoder`]. Implementations must be deterministic and batch
//! independent: encoding a text inside a batch of any size must produce the
//! same vector as encoding it alone.

use crate::{Error, Result, Vector};
use std::fmt;

/// Compute device an encoder runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Device {
    Cpu,
    Cuda(usize),
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cpu => write!(f, "cpu"),
            Device::Cuda(ordinal) => write!(f, "cuda:{}", ordinal),
        }
    }
}

pub trait Encoder: Send + Sync {
    /// Output dimension
    fn dim(&self) -> usize;

    /// Model identifier. Cached vectors are only valid for the version that
    /// produced them; the engine does not check this.
    fn version(&self) -> &str;

    fn supports(&self, device: Device) -> bool {
        matches!(device, Device::Cpu)
    }

    /// Encode a batch of non-empty texts, one vector per text, in order.
    fn encode_batch(&self, texts: &[&str]) -> Result<Vec<Vector>>;

    fn encode(&self, text: &str) -> Result<Vector> {
        self.encode_batch(&[text])?
            .pop()
            .ok_or_else(|| Error::Encoder("encoder returned no vector".to_string()))
    }
}

/// Fails fast when `device` is not supported; there is no CPU fallback.
pub fn ensure_device(encoder: &dyn Encoder, device: Device) -> Result<()> {
    if encoder.supports(device) {
        Ok(())
    } else {
        Err(Error::DeviceUnavailable {
            device: device.to_string(),
            reason: format!("encoder '{}' does not support it", encoder.version()),
        })
    }
}

pub const DEFAULT_HASHING_DIM: usize = 256;

/// Feature-hashing encoder over words and character trigrams.
///
/// CPU only. Word features weigh twice as much as trigrams. Hashes come from
/// BLAKE3 so vectors are identical across platforms and releases.
#[derive(Debug, Clone)]
pub struct HashingEncoder {
    dim: usize,
    version: String,
}

impl HashingEncoder {
    pub fn new(dim: usize) -> Result<Self> {
        if dim == 0 {
            return Err(Error::InvalidConfig("embedding_dim must be positive".to_string()));
        }
        Ok(Self {
            dim,
            version: format!("hashing-v1-{}", dim),
        })
    }

    fn encode_one(&self, text: &str) -> Vector {
        let mut data = vec![0.0f32; self.dim];
        let normalized = text.to_lowercase();

        for word in normalized.split_whitespace() {
            self.accumulate(&mut data, word.as_bytes(), 2.0);
        }

        let chars: Vec<char> = normalized.chars().collect();
        let mut buf = String::with_capacity(12);
        for window in chars.windows(3) {
            buf.clear();
            buf.extend(window.iter());
            self.accumulate(&mut data, buf.as_bytes(), 1.0);
        }

        Vector::new(data).normalized()
    }

    #[inline]
    fn accumulate(&self, data: &mut [f32], feature: &[u8], weight: f32) {
        let hash = blake3::hash(feature);
        let bytes = hash.as_bytes();
        let mut slot = [0u8; 8];
        slot.copy_from_slice(&bytes[..8]);
        let pos = (u64::from_le_bytes(slot) % self.dim as u64) as usize;
        // Signed hashing keeps collisions from only ever adding up
        let sign = if bytes[8] & 1 == 0 { 1.0 } else { -1.0 };
        data[pos] += sign * weight;
    }
}

impl Default for HashingEncoder {
    fn default() -> Self {
        Self {
            dim: DEFAULT_HASHING_DIM,
            version: format!("hashing-v1-{}", DEFAULT_HASHING_DIM),
        }
    }
}

impl Encoder for HashingEncoder {
    fn dim(&self) -> usize {
        self.dim
    }

    fn version(&self) -> &str {
        &self.version
    }

    fn encode_batch(&self, texts: &[&str]) -> Result<Vec<Vector>> {
        Ok(texts.iter().map(|t| self.encode_one(t)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hashing_encoder_unit_norm() {
        let encoder = HashingEncoder::new(64).unwrap();
        let v = encoder.encode("Variational inference for topic models").unwrap();
        assert_eq!(v.dim(), 64);
        let norm = crate::simd::norm_simd(v.as_slice());
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_batch_independence() {
        let encoder = HashingEncoder::new(128).unwrap();
        let texts = ["reinforcement learning", "graph kernels", "causal discovery"];
        let batched = encoder.encode_batch(&texts).unwrap();
        for (text, from_batch) in texts.iter().zip(&batched) {
            let single = encoder.encode(text).unwrap();
            assert_eq!(single.as_slice(), from_batch.as_slice());
        }
    }

    #[test]
    fn test_similar_texts_are_close() {
        let encoder = HashingEncoder::default();
        let a = encoder.encode("deep reinforcement learning for robotics").unwrap();
        let b = encoder.encode("deep reinforcement learning for robot control").unwrap();
        let c = encoder.encode("medieval tax records of florence").unwrap();
        assert!(a.dot(&b) > a.dot(&c));
    }

    #[test]
    fn test_cuda_rejected() {
        let encoder = HashingEncoder::default();
        assert!(ensure_device(&encoder, Device::Cpu).is_ok());
        let err = ensure_device(&encoder, Device::Cuda(0)).unwrap_err();
        assert!(matches!(err, Error::DeviceUnavailable { .. }));
    }

    #[test]
    fn test_zero_dim_rejected() {
        assert!(HashingEncoder::new(0).is_err());
    }
}
