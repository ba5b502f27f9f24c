//! Mathematical primitives for the SealPIR layer.
//!
//! - **Modular arithmetic** over Z_q
//! - **Number-Theoretic Transform (NTT)** with Montgomery reduction
//! - **Polynomial operations** over R_q = Z_q[X]/(X^d + 1)
//! - **Discrete Gaussian sampling** for error terms
//!
//! All ciphertexts share one 60-bit NTT-friendly prime, [`DEFAULT_Q`], and a
//! ring dimension d between 1024 and 8192.

pub mod modular;
pub mod ntt;
pub mod poly;
pub mod sampler;

pub use modular::{ModQ, DEFAULT_Q};
pub use ntt::NttContext;
pub use poly::Poly;
pub use sampler::GaussianSampler;
