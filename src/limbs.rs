//! Word-array primitives used by the mantissa arithmetic. The routines operate
//! on little-endian slices of 64-bit limbs (index 0 is the least significant
//! word) and never allocate. Sizing the buffers is the caller's job.

use core::cmp::Ordering;

/// One word of a mantissa.
pub type Limb = u64;

/// Number of bits in a limb.
pub const LIMB_BITS: usize = Limb::BITS as usize;

/// Returns the number of limbs needed to hold `bits` bits.
pub fn limbs_for(bits: usize) -> usize {
    bits.div_ceil(LIMB_BITS)
}

/// Returns true if all of the limbs are zero.
pub fn is_zero(a: &[Limb]) -> bool {
    a.iter().all(|&x| x == 0)
}

/// Compare two numbers of the same length, from the MSB to the LSB.
pub fn cmp(a: &[Limb], b: &[Limb]) -> Ordering {
    debug_assert_eq!(a.len(), b.len());
    for i in (0..a.len()).rev() {
        match a[i].cmp(&b[i]) {
            Ordering::Equal => {}
            ord => return ord,
        }
    }
    Ordering::Equal
}

/// Computes `a += b`, where `b` may be shorter than `a`. Returns the carry
/// out of the most significant limb.
pub fn add_n(a: &mut [Limb], b: &[Limb]) -> bool {
    debug_assert!(b.len() <= a.len());
    let mut carry = false;
    for (x, &y) in a.iter_mut().zip(b.iter()) {
        let (s0, c0) = x.overflowing_add(y);
        let (s1, c1) = s0.overflowing_add(carry as Limb);
        *x = s1;
        carry = c0 || c1;
    }
    if carry {
        return add_1(&mut a[b.len()..], 1);
    }
    false
}

/// Computes `a -= b`, where `b` may be shorter than `a`. Returns the borrow
/// out of the most significant limb.
pub fn sub_n(a: &mut [Limb], b: &[Limb]) -> bool {
    debug_assert!(b.len() <= a.len());
    let mut borrow = false;
    for (x, &y) in a.iter_mut().zip(b.iter()) {
        let (d0, b0) = x.overflowing_sub(y);
        let (d1, b1) = d0.overflowing_sub(borrow as Limb);
        *x = d1;
        borrow = b0 || b1;
    }
    if borrow {
        return sub_1(&mut a[b.len()..], 1);
    }
    false
}

/// Adds the single word `v` to `a`. Returns the carry out.
pub fn add_1(a: &mut [Limb], v: Limb) -> bool {
    let mut carry = v;
    for x in a.iter_mut() {
        if carry == 0 {
            return false;
        }
        let (s, c) = x.overflowing_add(carry);
        *x = s;
        carry = c as Limb;
    }
    carry != 0
}

/// Subtracts the single word `v` from `a`. Returns the borrow out.
pub fn sub_1(a: &mut [Limb], v: Limb) -> bool {
    let mut borrow = v;
    for x in a.iter_mut() {
        if borrow == 0 {
            return false;
        }
        let (d, b) = x.overflowing_sub(borrow);
        *x = d;
        borrow = b as Limb;
    }
    borrow != 0
}

/// Shift `a` left by `bits` (less than a limb). Returns the bits that were
/// shifted out of the top limb, in the low part of the returned word.
pub fn shl(a: &mut [Limb], bits: usize) -> Limb {
    debug_assert!(bits < LIMB_BITS);
    if bits == 0 || a.is_empty() {
        return 0;
    }
    let out = a[a.len() - 1] >> (LIMB_BITS - bits);
    for i in (1..a.len()).rev() {
        a[i] = (a[i] << bits) | (a[i - 1] >> (LIMB_BITS - bits));
    }
    a[0] <<= bits;
    out
}

/// Shift `a` right by `bits` (less than a limb). Returns the bits that were
/// shifted out of the bottom limb, in the high part of the returned word.
pub fn shr(a: &mut [Limb], bits: usize) -> Limb {
    debug_assert!(bits < LIMB_BITS);
    if bits == 0 || a.is_empty() {
        return 0;
    }
    let out = a[0] << (LIMB_BITS - bits);
    for i in 0..a.len() - 1 {
        a[i] = (a[i] >> bits) | (a[i + 1] << (LIMB_BITS - bits));
    }
    let last = a.len() - 1;
    a[last] >>= bits;
    out
}

/// Returns the number of leading zero bits in the whole array.
pub fn leading_zeros(a: &[Limb]) -> usize {
    for i in (0..a.len()).rev() {
        if a[i] != 0 {
            return (a.len() - 1 - i) * LIMB_BITS + a[i].leading_zeros() as usize;
        }
    }
    a.len() * LIMB_BITS
}

/// Returns the position of the highest set bit, counting from one. Zero means
/// that no bits are set.
pub fn bit_len(a: &[Limb]) -> usize {
    a.len() * LIMB_BITS - leading_zeros(a)
}

/// Returns the value of bit `bit`.
pub fn test_bit(a: &[Limb], bit: usize) -> bool {
    let w = bit / LIMB_BITS;
    w < a.len() && (a[w] >> (bit % LIMB_BITS)) & 1 == 1
}

/// Clear the `bits` lowest bits.
pub fn mask_low(a: &mut [Limb], bits: usize) {
    let full = (bits / LIMB_BITS).min(a.len());
    for x in a[..full].iter_mut() {
        *x = 0;
    }
    let rem = bits % LIMB_BITS;
    if rem != 0 && full < a.len() {
        a[full] &= !((1 << rem) - 1);
    }
}

/// Returns true if any of the `bits` lowest bits is set.
pub fn low_bits_nonzero(a: &[Limb], bits: usize) -> bool {
    let full = (bits / LIMB_BITS).min(a.len());
    if !is_zero(&a[..full]) {
        return true;
    }
    let rem = bits % LIMB_BITS;
    rem != 0 && full < a.len() && a[full] & ((1 << rem) - 1) != 0
}

/// Returns true if any bit with an index in `lo..hi` is set.
pub fn range_nonzero(a: &[Limb], lo: usize, hi: usize) -> bool {
    if lo >= hi {
        return false;
    }
    let (wl, wh) = (lo / LIMB_BITS, (hi - 1) / LIMB_BITS);
    let (bl, bh) = (lo % LIMB_BITS, (hi - 1) % LIMB_BITS);
    let high_mask = |b: usize| -> Limb {
        if b == LIMB_BITS - 1 {
            Limb::MAX
        } else {
            (1 << (b + 1)) - 1
        }
    };
    if wl == wh {
        return a[wl] & (Limb::MAX << bl) & high_mask(bh) != 0;
    }
    a[wl] & (Limb::MAX << bl) != 0
        || !is_zero(&a[wl + 1..wh])
        || a[wh] & high_mask(bh) != 0
}

/// Reads 64 bits of a mantissa at an absolute bit position.
///
/// The mantissa `m` is interpreted as the binary fraction 0.m, scaled so that
/// its most significant bit sits just below the absolute position `top`
/// (that is, bit `k` of the integer `m` has weight 2^(top - len*64 + k)).
/// The returned word holds the bits of weight 2^pos .. 2^(pos+63).
pub fn aligned_limb(m: &[Limb], top: i64, pos: i64) -> Limb {
    let n = m.len() as i64 * LIMB_BITS as i64;
    let off = pos - (top - n);
    if off >= n || off <= -(LIMB_BITS as i64) {
        return 0;
    }
    if off < 0 {
        return m[0] << (-off) as u32;
    }
    let w = (off / LIMB_BITS as i64) as usize;
    let s = (off % LIMB_BITS as i64) as u32;
    let lo = m[w] >> s;
    let hi = if s > 0 && w + 1 < m.len() {
        m[w + 1] << (LIMB_BITS as u32 - s)
    } else {
        0
    };
    lo | hi
}

/// Returns true if the mantissa (placed as in `aligned_limb`) has a set bit
/// with a weight below 2^pos.
pub fn sticky_below(m: &[Limb], top: i64, pos: i64) -> bool {
    let n = m.len() as i64 * LIMB_BITS as i64;
    let off = pos - (top - n);
    if off <= 0 {
        return false;
    }
    if off >= n {
        return !is_zero(m);
    }
    low_bits_nonzero(m, off as usize)
}

/// Fill `dst` with the bits of the mantissa that have a weight of 2^lo and
/// above: `dst[i] = aligned_limb(m, top, lo + 64*i)`.
pub fn extract_window(dst: &mut [Limb], m: &[Limb], top: i64, lo: i64) {
    for (i, x) in dst.iter_mut().enumerate() {
        *x = aligned_limb(m, top, lo + (i * LIMB_BITS) as i64);
    }
}

#[test]
fn test_add_sub_carry() {
    let mut a = [u64::MAX, u64::MAX, 0];
    assert!(!add_n(&mut a, &[1]));
    assert_eq!(a, [0, 0, 1]);
    assert!(!sub_n(&mut a, &[1]));
    assert_eq!(a, [u64::MAX, u64::MAX, 0]);

    let mut b = [u64::MAX, u64::MAX];
    assert!(add_n(&mut b, &[1, 0]));
    assert_eq!(b, [0, 0]);
    assert!(sub_n(&mut b, &[1, 0]));
    assert_eq!(b, [u64::MAX, u64::MAX]);

    let mut c = [5, 7];
    assert!(!add_1(&mut c, u64::MAX));
    assert_eq!(c, [4, 8]);
    assert!(!sub_1(&mut c, 5));
    assert_eq!(c, [u64::MAX, 7]);
}

#[test]
fn test_shifts() {
    let mut a = [0x8000_0000_0000_0001, 0x1];
    let out = shl(&mut a, 4);
    assert_eq!(out, 0);
    assert_eq!(a, [0x10, 0x18]);
    let out = shr(&mut a, 5);
    assert_eq!(out, 0x8000_0000_0000_0000);
    assert_eq!(a, [0xc000_0000_0000_0000, 0]);

    let mut b = [0, 0xf000_0000_0000_0000];
    assert_eq!(shl(&mut b, 4), 0xf);
    assert_eq!(b, [0, 0]);
}

#[test]
fn test_bit_queries() {
    let a = [0, 0x10];
    assert_eq!(leading_zeros(&a), 59);
    assert_eq!(bit_len(&a), 69);
    assert!(test_bit(&a, 68));
    assert!(!test_bit(&a, 67));
    assert!(!test_bit(&a, 500));
    assert_eq!(bit_len(&[0, 0]), 0);
    assert_eq!(limbs_for(1), 1);
    assert_eq!(limbs_for(64), 1);
    assert_eq!(limbs_for(65), 2);

    let mut b = [u64::MAX, u64::MAX];
    mask_low(&mut b, 68);
    assert_eq!(b, [0, u64::MAX << 4]);
    assert!(!low_bits_nonzero(&b, 68));
    assert!(low_bits_nonzero(&b, 69));
}

#[test]
fn test_range_nonzero() {
    let a = [1 << 63, 0, 1];
    assert!(range_nonzero(&a, 63, 64));
    assert!(!range_nonzero(&a, 0, 63));
    assert!(!range_nonzero(&a, 64, 128));
    assert!(range_nonzero(&a, 64, 129));
    assert!(range_nonzero(&a, 10, 190));
    assert!(!range_nonzero(&a, 5, 5));
    assert!(range_nonzero(&[u64::MAX], 0, 64));
}

#[test]
fn test_aligned_access() {
    // The mantissa 0x8000..01 placed with its MSB just below 2^0.
    let m = [0x8000_0000_0000_0001];
    assert_eq!(aligned_limb(&m, 0, -64), m[0]);
    assert_eq!(aligned_limb(&m, 0, -63), 0x4000_0000_0000_0000);
    assert_eq!(aligned_limb(&m, 0, -65), 0x2);
    assert_eq!(aligned_limb(&m, 0, -200), 0);
    assert_eq!(aligned_limb(&m, 0, 0), 0);
    assert!(sticky_below(&m, 0, -63));
    assert!(!sticky_below(&m, 0, -64));
    assert!(sticky_below(&m, 0, 100));

    let two = [0x1234, 0x8000_0000_0000_0000];
    let mut w = [0u64; 3];
    extract_window(&mut w, &two, 10, 10 - 160);
    assert_eq!(w, [0x1234 << 32, 0, 0x8000_0000]);
}
