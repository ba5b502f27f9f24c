//! Randomness for key generation and encryption.
//!
//! One ChaCha20 stream feeds both the discrete Gaussian errors and the
//! uniform mask polynomials, so a seeded sampler makes a whole client
//! session reproducible in tests.

use rand::Rng;
use rand::RngCore;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

/// Discrete Gaussian sampler over a ChaCha20 stream
pub struct GaussianSampler {
    sigma: f64,
    rng: ChaCha20Rng,
}

impl GaussianSampler {
    /// Sampler seeded from OS entropy
    pub fn new(sigma: f64) -> Self {
        Self {
            sigma,
            rng: ChaCha20Rng::from_entropy(),
        }
    }

    /// Seeded sampler for reproducibility
    pub fn with_seed(sigma: f64, seed: u64) -> Self {
        Self {
            sigma,
            rng: ChaCha20Rng::seed_from_u64(seed),
        }
    }

    /// One rounded Box-Muller sample
    pub fn sample(&mut self) -> i64 {
        let u1: f64 = self.rng.gen_range(f64::MIN_POSITIVE..1.0);
        let u2: f64 = self.rng.gen_range(0.0..1.0);

        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        (z * self.sigma).round() as i64
    }

    /// `n` samples mapped into Z_q
    pub fn sample_vec_centered(&mut self, n: usize, q: u64) -> Vec<u64> {
        (0..n)
            .map(|_| {
                let sample = self.sample();
                if sample >= 0 {
                    (sample as u64) % q
                } else {
                    q - (sample.unsigned_abs() % q)
                }
            })
            .collect()
    }

    /// Uniform randomness from the same stream
    pub fn rng_mut(&mut self) -> &mut ChaCha20Rng {
        &mut self.rng
    }

    /// Fresh uniform u64, used for session ids
    pub fn next_u64(&mut self) -> u64 {
        self.rng.next_u64()
    }
}
