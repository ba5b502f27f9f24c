//! Scalar arithmetic over Z_q

/// Ciphertext modulus q = 2^60 - 2^14 + 1.
///
/// Prime with q - 1 = 2^14·(2^46 - 1), so q ≡ 1 (mod 2N) and negacyclic
/// NTTs exist for every ring dimension up to 2^13 = 8192.
pub const DEFAULT_Q: u64 = 1152921504606830593;

/// Modular arithmetic helpers over Z_q
pub struct ModQ;

impl ModQ {
    /// Add two values modulo q
    #[inline]
    pub fn add(a: u64, b: u64, q: u64) -> u64 {
        let sum = a + b;
        if sum >= q {
            sum - q
        } else {
            sum
        }
    }

    /// Subtract two values modulo q
    #[inline]
    pub fn sub(a: u64, b: u64, q: u64) -> u64 {
        if a >= b {
            a - b
        } else {
            q - (b - a)
        }
    }

    /// Multiply two values modulo q
    #[inline]
    pub fn mul(a: u64, b: u64, q: u64) -> u64 {
        ((a as u128 * b as u128) % q as u128) as u64
    }

    /// Negate a value modulo q
    #[inline]
    pub fn negate(a: u64, q: u64) -> u64 {
        if a == 0 {
            0
        } else {
            q - a
        }
    }

    /// Map a signed integer into Z_q
    #[inline]
    pub fn from_signed(val: i64, q: u64) -> u64 {
        if val >= 0 {
            (val as u64) % q
        } else {
            let abs = val.unsigned_abs() % q;
            if abs == 0 {
                0
            } else {
                q - abs
            }
        }
    }

    /// Square-and-multiply exponentiation
    pub fn pow(mut base: u64, mut exp: u64, q: u64) -> u64 {
        let mut result = 1u64 % q;
        base %= q;
        while exp > 0 {
            if exp & 1 == 1 {
                result = Self::mul(result, base, q);
            }
            base = Self::mul(base, base, q);
            exp >>= 1;
        }
        result
    }

    /// Multiplicative inverse modulo a prime q (Fermat)
    pub fn inverse(a: u64, q: u64) -> u64 {
        Self::pow(a, q - 2, q)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const Q: u64 = DEFAULT_Q;

    #[test]
    fn test_add_sub_wrap() {
        assert_eq!(ModQ::add(Q - 1, 2, Q), 1);
        assert_eq!(ModQ::sub(3, 10, Q), Q - 7);
        assert_eq!(ModQ::sub(10, 3, Q), 7);
    }

    #[test]
    fn test_modulus_two_adicity() {
        assert_eq!((Q - 1) >> 14, (1u64 << 46) - 1);
        assert_eq!((Q - 1) % (2 * 8192), 0);
        assert_ne!((Q - 1) % (2 * 16384), 0);
    }

    #[test]
    fn test_from_signed() {
        assert_eq!(ModQ::from_signed(-1, Q), Q - 1);
        assert_eq!(ModQ::from_signed(-1000, Q), Q - 1000);
        assert_eq!(ModQ::from_signed(0, Q), 0);
        assert_eq!(ModQ::from_signed(77, Q), 77);
    }

    #[test]
    fn test_inverse_of_power_of_two() {
        for l in 0..12u32 {
            let two_l = 1u64 << l;
            let inv = ModQ::inverse(two_l, Q);
            assert_eq!(ModQ::mul(two_l, inv, Q), 1, "2^{} has no inverse", l);
        }
    }

    #[test]
    fn test_pow() {
        assert_eq!(ModQ::pow(3, 0, Q), 1);
        assert_eq!(ModQ::pow(3, 5, Q), 243);
        // Fermat: a^(q-1) = 1 for prime q
        assert_eq!(ModQ::pow(123456789, Q - 1, Q), 1);
    }
}
