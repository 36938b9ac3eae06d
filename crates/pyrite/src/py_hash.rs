//! Deterministic hash functions matching CPython under `PYTHONHASHSEED=0`.
//!
//! Every hashable runtime type funnels through these helpers so the
//! `a == b => hash(a) == hash(b)` contract holds across types: `1`, `1.0`
//! and `True` all hash through the Mersenne-prime integer path, and str/bytes
//! share the SipHash-1-3 byte path.
//!
//! Hashes are carried as `u64` (the bit pattern of CPython's signed `Py_hash_t`)
//! because that is what `hashbrown` tables consume. Use [`as_signed`] to show
//! a hash the way Python's `hash()` prints it.

/// Mersenne prime used by CPython for numeric hashing: `2^61 - 1`.
const MODULUS: u64 = (1 << 61) - 1;

/// Hash value CPython substitutes when a computation yields `-1`.
const MINUS_ONE_REPLACEMENT: i64 = -2;

/// Reinterprets a stored hash as the signed value Python's `hash()` returns.
#[must_use]
pub fn as_signed(hash: u64) -> i64 {
    i64::from_ne_bytes(hash.to_ne_bytes())
}

fn from_signed(hash: i64) -> u64 {
    let hash = if hash == -1 { MINUS_ONE_REPLACEMENT } else { hash };
    u64::from_ne_bytes(hash.to_ne_bytes())
}

/// Hashes raw bytes with SipHash-1-3 and a zero key.
///
/// Empty input hashes to `0`, matching CPython.
#[must_use]
pub fn hash_bytes(bytes: &[u8]) -> u64 {
    if bytes.is_empty() {
        return 0;
    }
    from_signed(as_signed(siphash13_zero_key(bytes)))
}

/// Hashes text content the way CPython hashes its compact string storage.
///
/// Text is hashed over one, two or four bytes per code point depending on the
/// widest character (Latin-1, UCS-2, UCS-4), so ASCII text hashes identically
/// to the equivalent bytes.
#[must_use]
pub fn hash_str(value: &str) -> u64 {
    if value.is_ascii() {
        return hash_bytes(value.as_bytes());
    }
    let widest = value.chars().map(u32::from).max().unwrap_or(0);
    let mut storage = Vec::with_capacity(value.len() * 2);
    for code in value.chars().map(u32::from) {
        let bytes = code.to_le_bytes();
        match widest {
            0..=0xff => storage.push(bytes[0]),
            0x100..=0xffff => storage.extend_from_slice(&bytes[..2]),
            _ => storage.extend_from_slice(&bytes),
        }
    }
    hash_bytes(&storage)
}

/// Hashes a signed 64-bit integer modulo `2^61 - 1`, sign preserving.
#[must_use]
pub fn hash_int(value: i64) -> u64 {
    from_signed(int_hash_signed(value))
}

fn int_hash_signed(value: i64) -> i64 {
    // i64::MIN has no positive counterpart, so reduce via its unsigned magnitude
    let remainder = (value.unsigned_abs() % MODULUS) as i64;
    if value < 0 { -remainder } else { remainder }
}

/// Hashes a float so that integral values agree with [`hash_int`].
///
/// `inf` hashes to `314159`, `-inf` to `-314159` and NaN to `0`.
#[must_use]
pub fn hash_float(value: f64) -> u64 {
    from_signed(float_hash_signed(value))
}

fn float_hash_signed(value: f64) -> i64 {
    if value.is_infinite() {
        return if value > 0.0 { 314_159 } else { -314_159 };
    }
    if value.is_nan() {
        return 0;
    }
    let integral = value.fract() == 0.0 && value >= i64::MIN as f64 && value < i64::MAX as f64;
    if integral {
        #[expect(clippy::cast_possible_truncation, reason = "range checked above")]
        let int_value = value as i64;
        return int_hash_signed(int_value);
    }

    let (mut mantissa, mut exponent) = frexp(value);
    let negative = mantissa < 0.0;
    if negative {
        mantissa = -mantissa;
    }

    // consume the mantissa 28 bits at a time, folding modulo 2^61 - 1
    let mut acc: u64 = 0;
    while mantissa > 0.0 {
        acc = ((acc << 28) & MODULUS) | (acc >> 33);
        mantissa *= 268_435_456.0;
        exponent -= 28;
        #[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss, reason = "mantissa is in [0, 2^28)")]
        let chunk = mantissa as u64;
        mantissa -= chunk as f64;
        acc += chunk;
        if acc >= MODULUS {
            acc -= MODULUS;
        }
    }

    let shift = exponent.rem_euclid(61).unsigned_abs();
    acc = ((acc << shift) & MODULUS) | (acc >> (61 - shift));

    #[expect(clippy::cast_possible_wrap, reason = "acc < 2^61")]
    let acc = acc as i64;
    if negative { -acc } else { acc }
}

/// Returns `(frac, exp)` such that `value == frac * 2^exp` with `0.5 <= |frac| < 1.0`.
fn frexp(value: f64) -> (f64, i32) {
    if value == 0.0 || !value.is_finite() {
        return (value, 0);
    }
    let bits = value.to_bits();
    #[expect(clippy::cast_possible_truncation, reason = "masked to 11 bits")]
    let biased = ((bits >> 52) & 0x7ff) as i32;
    if biased == 0 {
        // subnormal: scale into the normal range first
        let (frac, exp) = frexp(value * 18_446_744_073_709_551_616.0);
        return (frac, exp - 64);
    }
    let frac = f64::from_bits((bits & 0x800F_FFFF_FFFF_FFFF) | 0x3FE0_0000_0000_0000);
    (frac, biased - 1022)
}

/// Combines element hashes the way CPython's `tuplehash` does (xxHash based).
///
/// Order sensitive: `(1, 2)` and `(2, 1)` hash differently.
#[must_use]
pub fn hash_tuple(element_hashes: impl ExactSizeIterator<Item = u64>) -> u64 {
    const XXPRIME_1: u64 = 11_400_714_785_074_694_791;
    const XXPRIME_2: u64 = 14_029_467_366_897_019_727;
    const XXPRIME_5: u64 = 2_870_177_450_012_600_261;
    const TUPLE_HASH_SUFFIX: u64 = 3_527_539;

    let len = element_hashes.len() as u64;
    let mut acc = XXPRIME_5;
    for lane in element_hashes {
        acc = acc.wrapping_add(lane.wrapping_mul(XXPRIME_2));
        acc = acc.rotate_left(31);
        acc = acc.wrapping_mul(XXPRIME_1);
    }
    acc = acc.wrapping_add(len ^ (XXPRIME_5 ^ TUPLE_HASH_SUFFIX));
    if acc == u64::MAX {
        return 1_546_275_796;
    }
    acc
}

/// Identity hash for heap objects without a value hash, like CPython's pointer hash.
#[must_use]
pub fn hash_identity(slot: usize) -> u64 {
    (slot as u64).rotate_right(4)
}

/// Computes SipHash-1-3 with a zero key.
fn siphash13_zero_key(bytes: &[u8]) -> u64 {
    let mut state = [
        0x736f_6d65_7073_6575_u64,
        0x646f_7261_6e64_6f6d,
        0x6c79_6765_6e65_7261,
        0x7465_6462_7974_6573,
    ];

    let mut chunks = bytes.chunks_exact(8);
    for chunk in &mut chunks {
        let mut block = [0_u8; 8];
        block.copy_from_slice(chunk);
        compress(&mut state, u64::from_le_bytes(block));
    }

    let mut tail = (bytes.len() as u64) << 56;
    for (index, byte) in chunks.remainder().iter().enumerate() {
        tail |= u64::from(*byte) << (index * 8);
    }
    compress(&mut state, tail);

    state[2] ^= 0xff;
    for _ in 0..3 {
        sip_round(&mut state);
    }
    state[0] ^ state[1] ^ state[2] ^ state[3]
}

fn compress(state: &mut [u64; 4], message: u64) {
    state[3] ^= message;
    sip_round(state);
    state[0] ^= message;
}

fn sip_round(v: &mut [u64; 4]) {
    v[0] = v[0].wrapping_add(v[1]);
    v[1] = v[1].rotate_left(13) ^ v[0];
    v[0] = v[0].rotate_left(32);

    v[2] = v[2].wrapping_add(v[3]);
    v[3] = v[3].rotate_left(16) ^ v[2];

    v[0] = v[0].wrapping_add(v[3]);
    v[3] = v[3].rotate_left(21) ^ v[0];

    v[2] = v[2].wrapping_add(v[1]);
    v[1] = v[1].rotate_left(17) ^ v[2];
    v[2] = v[2].rotate_left(32);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_hashes_agree_across_types() {
        assert_eq!(hash_int(1), hash_float(1.0));
        assert_eq!(hash_int(0), hash_float(-0.0));
        assert_eq!(hash_int(-7), hash_float(-7.0));
        assert_eq!(as_signed(hash_int(-1)), -2);
        assert_eq!(as_signed(hash_int((1 << 61) - 1)), 0);
    }

    #[test]
    fn float_special_values() {
        assert_eq!(as_signed(hash_float(f64::INFINITY)), 314_159);
        assert_eq!(as_signed(hash_float(f64::NEG_INFINITY)), -314_159);
        assert_eq!(hash_float(f64::NAN), 0);
        // CPython: hash(0.5) == 1152921504606846976
        assert_eq!(as_signed(hash_float(0.5)), 1_152_921_504_606_846_976);
    }

    #[test]
    fn str_hash_matches_cpython_seed_zero() {
        assert_eq!(hash_str(""), 0);
        // PYTHONHASHSEED=0 python -c "print(hash('a'))"
        assert_eq!(as_signed(hash_str("a")), 4_644_417_185_603_328_019);
        assert_eq!(hash_str("abc"), hash_bytes(b"abc"));
    }

    #[test]
    fn non_ascii_str_hash_uses_compact_storage() {
        assert_eq!(as_signed(hash_str("é")), 6_047_309_291_227_476_195);
        assert_eq!(as_signed(hash_str("日本")), 6_243_316_497_235_261_705);
        assert_eq!(as_signed(hash_str("😀")), -3_536_540_696_076_613_844);
        assert_eq!(as_signed(hash_str("abcdefghij")), -829_746_140_550_000_655);
    }

    #[test]
    fn tuple_hash_is_order_sensitive() {
        let forward = hash_tuple([hash_int(1), hash_int(2)].into_iter());
        let backward = hash_tuple([hash_int(2), hash_int(1)].into_iter());
        assert_ne!(forward, backward);
        // CPython: hash((1, 2)) == -3550055125485641917
        assert_eq!(as_signed(forward), -3_550_055_125_485_641_917);
        // CPython: hash(()) == 5740354900026072187
        assert_eq!(as_signed(hash_tuple(std::iter::empty())), 5_740_354_900_026_072_187);
    }
}
