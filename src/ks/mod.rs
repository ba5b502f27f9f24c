//! Key switching for RLWE ciphertexts.
//!
//! A key-switching matrix from s to s' holds ℓ encryptions of s·z^i under
//! s'. To switch (a, b):
//!
//! 1. Decompose a with the gadget: g⁻¹(a) = [a₀, ..., a_{ℓ-1}]
//! 2. (a', b') = (0, b) + Σᵢ aᵢ · K[i]
//!
//! Galois keys are key-switching matrices from τ_g(s) to s; together with
//! [`crate::rlwe::automorphism_ciphertext`] they give the substitution
//! operation the SealPIR expansion is built on.

mod gadget;
mod setup;
mod switch;

pub use gadget::{gadget_decompose, GadgetVector};
pub use setup::{generate_automorphism_ks_matrix, generate_ks_matrix, GaloisKeys, KeySwitchingMatrix};
pub use switch::{key_switch, substitute};
