//! Magnitude comparison and cancellation analysis of two regular values.
//! Both routines read the operands in place, without aligning copies of the
//! mantissas.

use core::cmp::Ordering;

use crate::float::Float;
use crate::limbs::{self, LIMB_BITS};

/// Compare the magnitudes of `b` and `c`. Zero is below every normal value
/// and infinity above. The operands must not be NaN.
pub fn cmp_abs(b: &Float, c: &Float) -> Ordering {
    assert!(!b.is_nan() && !c.is_nan(), "can't compare NaN");
    let rank = |x: &Float| -> u8 {
        if x.is_zero() {
            0
        } else if x.is_inf() {
            2
        } else {
            1
        }
    };
    match rank(b).cmp(&rank(c)) {
        Ordering::Equal if b.is_normal() => {}
        ord => return ord,
    }
    match b.get_exp().cmp(&c.get_exp()) {
        Ordering::Equal => {}
        ord => return ord,
    }
    // Same exponent: compare the mantissas from the top down. The shorter
    // mantissa is extended with zeros.
    let (bm, cm) = (b.get_mantissa(), c.get_mantissa());
    let n = bm.len().max(cm.len());
    for i in 0..n {
        let x = if i < bm.len() { bm[bm.len() - 1 - i] } else { 0 };
        let y = if i < cm.len() { cm[cm.len() - 1 - i] } else { 0 };
        match x.cmp(&y) {
            Ordering::Equal => {}
            ord => return ord,
        }
    }
    Ordering::Equal
}

/// Compare the magnitudes of the regular values `b` and `c`, and count the
/// leading bits that cancel in the subtraction of the magnitudes.
///
/// Returns the ordering of `|b|` and `|c|`, and `max(EXP(b), EXP(c)) -
/// EXP(||b| - |c||)`, where `EXP(x)` is the exponent of `x` in the 0.1xxx
/// convention. When the magnitudes are equal the count is the precision of
/// `b`.
///
/// # Examples
///
/// ```
///    use mpround::{cmp2, Float};
///    use core::cmp::Ordering;
///
///    // 0.1001p+1 and 0.1000p+1 differ in the last bit.
///    let b = Float::from_raw_parts(4, false, 1, &[0b1001 << 60]);
///    let c = Float::from_raw_parts(4, false, 1, &[0b1000 << 60]);
///    assert_eq!(cmp2(&b, &c), (Ordering::Greater, 3));
/// ```
pub fn cmp2(b: &Float, c: &Float) -> (Ordering, usize) {
    assert!(b.is_normal() && c.is_normal(), "cmp2 needs regular values");
    let ord = cmp_abs(b, c);
    let (hi, lo) = match ord {
        Ordering::Equal => return (Ordering::Equal, b.get_prec()),
        Ordering::Greater => (b, c),
        Ordering::Less => (c, b),
    };
    let exp = diff_exponent(hi, lo);
    (ord, (hi.get_exp() - exp) as usize)
}

/// Returns the exponent of `|hi| - |lo|`, where `|hi| > |lo|`.
fn diff_exponent(hi: &Float, lo: &Float) -> i64 {
    let bm = hi.get_mantissa();
    let cm = lo.get_mantissa();
    let (eb, ec) = (hi.get_exp(), lo.get_exp());
    let nb = bm.len();
    // The lowest position of the window that the words of `hi` cover.
    let lb = eb - (nb * LIMB_BITS) as i64;

    // D = B - C_w - [lo has bits below the window] satisfies
    // D * 2^lb <= |hi| - |lo| < (D + 1) * 2^lb.
    if let Some(bits) = window_diff_bits(bm, cm, ec, lb) {
        return lb + bits as i64;
    }

    // The window difference is zero, so the result is 2^lb minus the bits of
    // `lo` below the window. Count the run of ones below the window.
    let mut pos = lb;
    let mut k: i64 = 0;
    loop {
        let w = limbs::aligned_limb(cm, ec, pos - LIMB_BITS as i64);
        let ones = w.leading_ones() as i64;
        k += ones;
        if ones < LIMB_BITS as i64 {
            break;
        }
        pos -= LIMB_BITS as i64;
    }
    // The bit at lb-k-1 is zero. If nothing is set below it the difference is
    // a power of two.
    if limbs::sticky_below(cm, ec, lb - k - 1) {
        lb - k
    } else {
        lb - k + 1
    }
}

/// Computes `D = B - C_w - [C has bits below the window]` over the window of
/// `B`, and returns the bit length of D, or None if D is zero.
fn window_diff_bits(bm: &[u64], cm: &[u64], ec: i64, lb: i64) -> Option<usize> {
    let nb = bm.len();
    // The aligned words of C are produced on the fly, from the bottom up.
    let mut borrow = limbs::sticky_below(cm, ec, lb);
    let mut top_nonzero: Option<(usize, u64)> = None;
    for i in 0..nb {
        let y = limbs::aligned_limb(cm, ec, lb + (i * LIMB_BITS) as i64);
        let (d0, b0) = bm[i].overflowing_sub(y);
        let (d1, b1) = d0.overflowing_sub(borrow as u64);
        borrow = b0 || b1;
        if d1 != 0 {
            top_nonzero = Some((i, d1));
        }
    }
    debug_assert!(!borrow, "the first operand must be larger");
    top_nonzero
        .map(|(i, w)| i * LIMB_BITS + (LIMB_BITS - w.leading_zeros() as usize))
}

#[cfg(test)]
use crate::bigint::BigInt;
#[cfg(test)]
use crate::utils::Lfsr;

/// Compute the exponent of ||b| - |c|| with exact big integers.
#[cfg(test)]
pub(crate) fn reference_cancel(b: &Float, c: &Float) -> usize {
    let lb = b.get_exp() - (b.get_mantissa().len() * LIMB_BITS) as i64;
    let lc = c.get_exp() - (c.get_mantissa().len() * LIMB_BITS) as i64;
    let l = lb.min(lc);
    let mut x = BigInt::from_limbs(b.get_mantissa());
    x.shift_left((lb - l) as usize);
    let mut y = BigInt::from_limbs(c.get_mantissa());
    y.shift_left((lc - l) as usize);
    let d = if x > y { &x - &y } else { &y - &x };
    let exp = l + d.msb_index() as i64;
    (b.get_exp().max(c.get_exp()) - exp) as usize
}

#[test]
fn test_cmp_abs() {
    let a = Float::from_raw_parts(4, false, 3, &[0b1011 << 60]);
    let b = Float::from_raw_parts(70, true, 3, &[1, 0b1011 << 60]);
    let c = Float::from_raw_parts(4, false, 4, &[0b1000 << 60]);
    assert_eq!(cmp_abs(&a, &b), Ordering::Less);
    assert_eq!(cmp_abs(&b, &a), Ordering::Greater);
    assert_eq!(cmp_abs(&a, &a), Ordering::Equal);
    assert_eq!(cmp_abs(&b, &c), Ordering::Less);
    assert_eq!(cmp_abs(&Float::zero(2, true), &a), Ordering::Less);
    assert_eq!(cmp_abs(&Float::inf(2, true), &c), Ordering::Greater);
    assert_eq!(cmp_abs(&Float::inf(2, true), &Float::inf(9, false)), Ordering::Equal);
    assert_eq!(cmp_abs(&Float::zero(2, true), &Float::zero(9, false)), Ordering::Equal);
}

#[test]
fn test_cmp2_last_bit() {
    // Values that differ only in the last bit cancel all other bits.
    for prec in [2, 3, 63, 64, 65, 127, 128, 129, 200] {
        let n = limbs::limbs_for(prec);
        let pad = n * LIMB_BITS - prec;
        let mut mc = alloc::vec![0; n];
        mc[n - 1] = 1 << 63;
        if prec > 3 {
            mc[n - 1] |= 1 << 60;
        }
        let mut mb = mc.clone();
        mb[pad / 64] |= 1 << (pad % 64);
        let b = Float::from_raw_parts(prec, false, 1, &mb);
        let c = Float::from_raw_parts(prec, true, 1, &mc);
        assert_eq!(cmp2(&b, &c), (Ordering::Greater, prec - 1));
        assert_eq!(cmp2(&c, &b), (Ordering::Less, prec - 1));
        assert_eq!(cmp2(&b, &b), (Ordering::Equal, prec));
    }
}

#[test]
fn test_cmp2_borrow_chain() {
    // 0.1p+1 - 0.111..1p+0 is a single unit of the lowest bit of c.
    for pc in [2, 64, 65, 130, 192] {
        let n = limbs::limbs_for(pc);
        let mut mc = alloc::vec![u64::MAX; n];
        limbs::mask_low(&mut mc, n * LIMB_BITS - pc);
        let c = Float::from_raw_parts(pc, false, 0, &mc);
        for pb in [2, 64, 100] {
            let mut mb = alloc::vec![0; limbs::limbs_for(pb)];
            let last = mb.len() - 1;
            mb[last] = 1 << 63;
            let b = Float::from_raw_parts(pb, false, 1, &mb);
            // The difference is 2^-pc, whose exponent is 1 - pc.
            assert_eq!(cmp2(&b, &c), (Ordering::Greater, pc));
            assert_eq!(reference_cancel(&b, &c), pc);
        }
    }

    // Far apart values cancel at most one bit.
    let b = Float::from_raw_parts(5, false, 100, &[1 << 63]);
    let c = Float::from_raw_parts(5, false, -100, &[0b11111 << 59]);
    assert_eq!(cmp2(&b, &c), (Ordering::Greater, 1));
    let b = Float::from_raw_parts(5, false, 100, &[0b11 << 62]);
    assert_eq!(cmp2(&b, &c), (Ordering::Greater, 0));
}

#[test]
fn test_cmp2_random() {
    let mut lfsr = Lfsr::new();
    for _ in 0..3000 {
        let b = lfsr.float(300, 3);
        // Derive `c` from `b`, so that there are long runs of equal bits.
        let pc = 2 + lfsr.below(300) as usize;
        let mut mc = alloc::vec![0; limbs::limbs_for(pc)];
        let src = b.get_mantissa();
        let k = mc.len().min(src.len());
        let nc = mc.len();
        mc[nc - k..].copy_from_slice(&src[src.len() - k..]);
        let other = lfsr.mantissa(pc);
        let split = lfsr.below(pc as u64) as usize;
        for i in 0..split.min(nc * LIMB_BITS) {
            // Replace the lowest `split` bits with bits from `other`.
            let bit = 1u64 << (i % 64);
            mc[i / 64] = (mc[i / 64] & !bit) | (other[i / 64] & bit);
        }
        mc[nc - 1] |= 1 << 63;
        limbs::mask_low(&mut mc, nc * LIMB_BITS - pc);
        let ec = b.get_exp() + lfsr.below(3) as i64 - 1;
        let c = Float::from_raw_parts(pc, false, ec, &mc);

        let (ord, cancel) = cmp2(&b, &c);
        assert_eq!(ord, cmp_abs(&b, &c));
        if ord == Ordering::Equal {
            assert_eq!(cancel, b.get_prec());
        } else {
            assert_eq!(cancel, reference_cancel(&b, &c), "{} {}", b, c);
        }
    }
}
