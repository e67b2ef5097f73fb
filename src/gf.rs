//! Arithmetic in GF(2^8) modulo the AES polynomial x^8 + x^4 + x^3 + x + 1.

/// Low byte of the reduction polynomial 0x11b.
const REDUCTION: u8 = 0x1b;

/// Carryless multiply of `a` and `b`, reduced modulo 0x11b.
pub const fn multiply(mut a: u8, mut b: u8) -> u8 {
    let mut result = 0u8;
    let mut bit = 0;
    while bit < 8 {
        if b & 0x01 != 0 {
            result ^= a;
        }
        let overflow = a & 0x80 != 0;
        a <<= 1;
        if overflow {
            a ^= REDUCTION;
        }
        b >>= 1;
        bit += 1;
    }
    result
}

const fn multiplication_table(factor: u8) -> [u8; 256] {
    let mut table = [0u8; 256];
    let mut i = 0;
    while i < 256 {
        table[i] = multiply(i as u8, factor);
        i += 1;
    }
    table
}

pub const MUL_BY_2: [u8; 256] = multiplication_table(0x02);
pub const MUL_BY_3: [u8; 256] = multiplication_table(0x03);

// Inverse column mixing coefficients.
pub const MUL_BY_9: [u8; 256] = multiplication_table(0x09);
pub const MUL_BY_11: [u8; 256] = multiplication_table(0x0b);
pub const MUL_BY_13: [u8; 256] = multiplication_table(0x0d);
pub const MUL_BY_14: [u8; 256] = multiplication_table(0x0e);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_products() {
        // FIPS-197 section 4.2
        assert_eq!(multiply(0x57, 0x83), 0xc1);
        assert_eq!(multiply(0x57, 0x13), 0xfe);
        assert_eq!(multiply(0x57, 0x02), 0xae);
        assert_eq!(multiply(0x57, 0x04), 0x47);
        assert_eq!(multiply(0x57, 0x08), 0x8e);
        assert_eq!(multiply(0x57, 0x10), 0x07);
    }

    #[test]
    fn identity_and_zero() {
        for a in 0..=255u8 {
            assert_eq!(multiply(a, 1), a);
            assert_eq!(multiply(a, 0), 0);
        }
    }

    #[test]
    fn multiply_is_commutative() {
        for a in 0..=255u8 {
            for b in 0..=255u8 {
                assert_eq!(multiply(a, b), multiply(b, a));
            }
        }
    }

    #[test]
    fn tables_agree_with_multiply() {
        for a in 0..=255u8 {
            let i = a as usize;
            assert_eq!(MUL_BY_2[i], multiply(a, 0x02));
            assert_eq!(MUL_BY_3[i], multiply(a, 0x03));
            assert_eq!(MUL_BY_3[i], MUL_BY_2[i] ^ a);
            assert_eq!(MUL_BY_9[i], multiply(0x09, a));
            assert_eq!(MUL_BY_11[i], multiply(0x0b, a));
            assert_eq!(MUL_BY_13[i], multiply(0x0d, a));
            assert_eq!(MUL_BY_14[i], multiply(0x0e, a));
        }
    }

    #[test]
    fn distributes_over_xor() {
        for a in (0..=255u8).step_by(7) {
            for b in (0..=255u8).step_by(5) {
                for c in (0..=255u8).step_by(11) {
                    assert_eq!(multiply(a, b ^ c), multiply(a, b) ^ multiply(a, c));
                }
            }
        }
    }
}
