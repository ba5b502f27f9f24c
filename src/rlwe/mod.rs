//! RLWE encryption over R_q = Z_q[X]/(X^d + 1).
//!
//! This is the homomorphic primitive the SealPIR layer is built on:
//!
//! - encryption of scaled plaintexts (b = -a·s + e + Δ·m) and of raw Z_q values
//! - decryption with a measured noise budget
//! - addition, plaintext multiplication and monomial shifts
//! - Galois automorphisms τ_g(X) = X^g, completed by a key switch in [`crate::ks`]
//!
//! # Example
//!
//! ```
//! use hybrid_pir::math::{GaussianSampler, NttContext, Poly, DEFAULT_Q};
//! use hybrid_pir::rlwe::{RlweCiphertext, RlweSecretKey};
//!
//! let ctx = NttContext::new(1024, DEFAULT_Q);
//! let mut sampler = GaussianSampler::with_seed(3.2, 1);
//! let sk = RlweSecretKey::generate(1024, DEFAULT_Q, &mut sampler);
//!
//! let m = Poly::constant(7, 1024, DEFAULT_Q);
//! let ct = RlweCiphertext::encrypt(&sk, &m, DEFAULT_Q >> 12, &mut sampler, &ctx);
//! assert_eq!(ct.decrypt(&sk, 12, &ctx).coeff(0), 7);
//! ```

mod enc;
mod galois;
mod types;

pub use galois::{apply_automorphism, automorphism_ciphertext, expansion_element};
pub use types::{RlweCiphertext, RlweSecretKey};
