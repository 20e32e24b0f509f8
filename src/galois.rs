//! GF(2^8) arithmetic for Reed-Solomon coding
//!
//! The field has 256 elements over the irreducible polynomial 0x11D
//! (x⁸ + x⁴ + x³ + x² + 1) with generator 2. Addition is XOR; multiplication
//! and division go through log/exp tables built once on first use.
//!
//! The slice kernels at the bottom are the hot inner loops of the shard
//! coder. Each coefficient owns a 256-entry row of the full multiplication
//! table, so multiply-and-xor over a shard costs one lookup and one XOR per
//! byte. The scalar loop is the conformance baseline; the table layout is
//! the same 256x256 shape a byte-shuffle SIMD kernel would consume.
//!
//! # Note
//! This module is public for benchmarks and tests but not part of the stable
//! API. Use `ReedSolomon` from the crate root instead.

use std::sync::OnceLock;

/// Irreducible polynomial for GF(2^8): x⁸ + x⁴ + x³ + x² + 1
pub const FIELD_POLYNOMIAL: u16 = 0x11d;

const FIELD_SIZE: usize = 256;

/// Order of the multiplicative group
const FIELD_ORDER: usize = 255;

/// Lookup tables for fast field arithmetic
struct GaloisTables {
    log: [u8; FIELD_SIZE],
    /// Doubled period so `exp[log[a] + log[b]]` needs no reduction mod 255
    exp: [u8; 2 * FIELD_SIZE],
    /// `mul[a][b] == a * b`; row `c` feeds the slice kernels
    mul: Box<[[u8; FIELD_SIZE]; FIELD_SIZE]>,
}

impl GaloisTables {
    fn build() -> Self {
        let mut log = [0u8; FIELD_SIZE];
        let mut exp = [0u8; 2 * FIELD_SIZE];

        let mut b = 1u16;
        for l in 0..FIELD_ORDER {
            log[b as usize] = l as u8;
            exp[l] = b as u8;

            b <<= 1;
            if b & FIELD_SIZE as u16 != 0 {
                b ^= FIELD_POLYNOMIAL;
            }
        }
        for l in FIELD_ORDER..2 * FIELD_SIZE {
            exp[l] = exp[l - FIELD_ORDER];
        }

        let mut mul = Box::new([[0u8; FIELD_SIZE]; FIELD_SIZE]);
        for a in 1..FIELD_SIZE {
            for b in 1..FIELD_SIZE {
                mul[a][b] = exp[log[a] as usize + log[b] as usize];
            }
        }

        GaloisTables { log, exp, mul }
    }
}

fn tables() -> &'static GaloisTables {
    static TABLES: OnceLock<GaloisTables> = OnceLock::new();
    TABLES.get_or_init(GaloisTables::build)
}

/// Addition (XOR in GF(2^8))
#[inline]
pub fn gal_add(a: u8, b: u8) -> u8 {
    a ^ b
}

/// Subtraction is identical to addition in a characteristic-2 field
#[inline]
pub fn gal_sub(a: u8, b: u8) -> u8 {
    a ^ b
}

/// Multiplication using the log/exp tables
#[inline]
pub fn gal_multiply(a: u8, b: u8) -> u8 {
    if a == 0 || b == 0 {
        return 0;
    }
    let t = tables();
    t.exp[t.log[a as usize] as usize + t.log[b as usize] as usize]
}

/// Division
///
/// # Panics
/// Panics if `divisor` is zero.
#[inline]
pub fn gal_divide(a: u8, divisor: u8) -> u8 {
    if divisor == 0 {
        panic!("division by zero in GF(2^8)");
    }
    if a == 0 {
        return 0;
    }
    let t = tables();
    let log_diff = t.log[a as usize] as usize + FIELD_ORDER - t.log[divisor as usize] as usize;
    t.exp[log_diff % FIELD_ORDER]
}

/// Raise `a` to the power `n`
#[inline]
pub fn gal_exp(a: u8, n: usize) -> u8 {
    if n == 0 {
        return 1;
    }
    if a == 0 {
        return 0;
    }
    let t = tables();
    let log_result = (t.log[a as usize] as usize * n) % FIELD_ORDER;
    t.exp[log_result]
}

/// Multiplicative inverse
///
/// # Panics
/// Panics if `a` is zero.
#[inline]
pub fn gal_inverse(a: u8) -> u8 {
    gal_divide(1, a)
}

/// The 256-entry multiplication row for a fixed coefficient
#[inline]
pub fn mul_table_row(coefficient: u8) -> &'static [u8; FIELD_SIZE] {
    &tables().mul[coefficient as usize]
}

/// `output[i] = coefficient * input[i]` over the common prefix
pub fn gal_mul_slice(coefficient: u8, input: &[u8], output: &mut [u8]) {
    let len = input.len().min(output.len());
    match coefficient {
        0 => output[..len].fill(0),
        1 => output[..len].copy_from_slice(&input[..len]),
        c => {
            let row = mul_table_row(c);
            for (out, &inp) in output[..len].iter_mut().zip(input[..len].iter()) {
                *out = row[inp as usize];
            }
        }
    }
}

/// `output[i] ^= coefficient * input[i]` over the common prefix
pub fn gal_mul_slice_xor(coefficient: u8, input: &[u8], output: &mut [u8]) {
    let len = input.len().min(output.len());
    match coefficient {
        0 => {}
        1 => slice_xor(&input[..len], &mut output[..len]),
        c => {
            let row = mul_table_row(c);
            for (out, &inp) in output[..len].iter_mut().zip(input[..len].iter()) {
                *out ^= row[inp as usize];
            }
        }
    }
}

/// `output[i] ^= input[i]` over the common prefix
pub fn slice_xor(input: &[u8], output: &mut [u8]) {
    for (out, &inp) in output.iter_mut().zip(input.iter()) {
        *out ^= inp;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_is_xor() {
        assert_eq!(gal_add(0x12, 0x34), 0x12 ^ 0x34);
        assert_eq!(gal_add(0xff, 0xff), 0);
        assert_eq!(gal_sub(0x12, 0x34), gal_add(0x12, 0x34));
    }

    #[test]
    fn test_multiply_known_values() {
        assert_eq!(gal_multiply(2, 2), 4);
        assert_eq!(gal_multiply(3, 4), 12);
        assert_eq!(gal_multiply(7, 7), 21);
        // 2^8 wraps through the polynomial: 0x11d truncated to a byte
        assert_eq!(gal_exp(2, 8), 0x1d);
    }

    #[test]
    fn test_multiply_zero_and_one() {
        for a in 0..=255u8 {
            assert_eq!(gal_multiply(a, 0), 0);
            assert_eq!(gal_multiply(0, a), 0);
            assert_eq!(gal_multiply(a, 1), a);
            assert_eq!(gal_multiply(1, a), a);
        }
    }

    #[test]
    fn test_divide_inverts_multiply() {
        for a in 1..=255u8 {
            for b in 1..=255u8 {
                let product = gal_multiply(a, b);
                assert_eq!(gal_divide(product, b), a);
            }
        }
    }

    #[test]
    fn test_inverse() {
        for a in 1..=255u8 {
            assert_eq!(gal_multiply(a, gal_inverse(a)), 1);
        }
    }

    #[test]
    #[should_panic(expected = "division by zero")]
    fn test_divide_by_zero_panics() {
        gal_divide(5, 0);
    }

    #[test]
    fn test_exp_matches_repeated_multiply() {
        for a in [0u8, 1, 2, 5, 29, 200, 255] {
            let mut acc = 1u8;
            for n in 0..10 {
                assert_eq!(gal_exp(a, n), acc, "a={a} n={n}");
                acc = gal_multiply(acc, a);
            }
        }
    }

    #[test]
    fn test_mul_slice_matches_scalar() {
        let input: Vec<u8> = (0..=255u8).collect();
        for c in [0u8, 1, 2, 77, 255] {
            let mut direct = vec![0u8; input.len()];
            gal_mul_slice(c, &input, &mut direct);
            for (i, &b) in input.iter().enumerate() {
                assert_eq!(direct[i], gal_multiply(c, b));
            }

            let mut accum = direct.clone();
            gal_mul_slice_xor(c, &input, &mut accum);
            // xor-ing the same product twice cancels out
            assert!(accum.iter().all(|&b| b == 0));
        }
    }

    #[test]
    fn test_slice_xor() {
        let a = [1u8, 2, 3, 4];
        let mut b = [4u8, 3, 2, 1];
        slice_xor(&a, &mut b);
        assert_eq!(b, [5, 1, 1, 5]);
    }
}
