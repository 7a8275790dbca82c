//! The rounding kernel. Every operation in this crate computes an exact or a
//! bounded intermediate value and rounds it exactly once with `round_raw`.

extern crate alloc;

use alloc::vec;
use alloc::vec::Vec;
use core::cmp::Ordering;

use crate::bigint::BigInt;
use crate::context::{Context, Flags};
use crate::float::{Category, Direction, Float, RoundingMode};
use crate::limbs::{self, Limb, LIMB_BITS};

/// Convert a ternary value that describes the magnitude of a result into one
/// that describes the signed value (and back).
pub(crate) fn apply_sign(t: Ordering, neg: bool) -> Ordering {
    if neg {
        t.reverse()
    } else {
        t
    }
}

/// Round the mantissa `src` to `dst_prec` bits and store it in `dst`.
///
/// `src` is a normalized mantissa (the top bit of the last word is set) whose
/// significant bits are the `src_prec` highest bits; any bits below them are
/// ignored. `dst` must hold exactly `ceil(dst_prec / 64)` words. `neg` is the
/// sign of the value, which decides how the directed modes behave.
///
/// Returns a carry flag and the ternary value. The carry is set when rounding
/// up overflowed into a new leading bit: `dst` then holds 0.1000..0 and the
/// caller must increment the exponent. The ternary value is `Less` when the
/// stored value is below the exact value, `Greater` when above, and `Equal`
/// when no bits were lost.
///
/// # Examples
///
/// ```
///    use mpround::{round_raw, RoundingMode};
///    use core::cmp::Ordering;
///
///    let src = [0b1011 << 60];
///    let mut dst = [0];
///    let res = round_raw(&mut dst, &src, 4, false, 2, RoundingMode::Zero);
///    assert_eq!(res, (false, Ordering::Less));
///    assert_eq!(dst, [0b10 << 62]);
/// ```
pub fn round_raw(
    dst: &mut [Limb],
    src: &[Limb],
    src_prec: usize,
    neg: bool,
    dst_prec: usize,
    rm: RoundingMode,
) -> (bool, Ordering) {
    let dn = dst.len();
    let sn = src.len();
    assert_eq!(dn, limbs::limbs_for(dst_prec), "invalid destination size");
    assert!(src_prec > 0 && src_prec <= sn * LIMB_BITS, "invalid source size");
    debug_assert!(src[sn - 1] >> 63 == 1, "source is not normalized");

    if src_prec <= dst_prec {
        let k = sn.min(dn);
        for w in dst.iter_mut() {
            *w = 0;
        }
        dst[dn - k..].copy_from_slice(&src[sn - k..]);
        limbs::mask_low(dst, dn * LIMB_BITS - src_prec);
        return (false, Ordering::Equal);
    }

    // The source holds more bits than the destination, so it has at least as
    // many words.
    dst.copy_from_slice(&src[sn - dn..]);
    let ignored = sn * LIMB_BITS - src_prec;
    let cut = sn * LIMB_BITS - dst_prec;
    let guard = limbs::test_bit(src, cut - 1);
    let sticky = limbs::range_nonzero(src, ignored, cut - 1);
    let pad = dn * LIMB_BITS - dst_prec;
    limbs::mask_low(dst, pad);

    if !guard && !sticky {
        return (false, Ordering::Equal);
    }

    let lsb = limbs::test_bit(dst, pad);
    let inc = match rm.fold(neg) {
        Direction::Zero => false,
        Direction::Away => true,
        Direction::NearestEven => guard && (sticky || lsb),
        Direction::NearestAway => guard,
    };

    if !inc {
        return (false, apply_sign(Ordering::Less, neg));
    }

    let carry = limbs::add_1(dst, 1 << pad);
    if carry {
        dst[dn - 1] = 1 << 63;
    }
    (carry, apply_sign(Ordering::Greater, neg))
}

/// Round the value `(x + s) * 2^unit` to `prec` bits, where `x` is a nonzero
/// integer and `s` is zero when `sticky` is false, and some value in the open
/// interval (0, 1) otherwise. Returns the exponent, the mantissa and the
/// ternary value.
pub(crate) fn round_integer(
    x: &BigInt,
    sticky: bool,
    unit: i64,
    neg: bool,
    prec: usize,
    rm: RoundingMode,
) -> (i64, Vec<Limb>, Ordering) {
    debug_assert!(!x.is_zero());
    let mut v = x.clone();
    let mut unit = unit;
    if sticky {
        // Make room for a marker bit that sits below the guard bit.
        let bits = v.msb_index();
        let sh = (prec + 2).saturating_sub(bits).max(1);
        v.shift_left(sh);
        v.set_bit(0);
        unit -= sh as i64;
    }
    let bits = v.msb_index();
    let n = limbs::limbs_for(bits);
    v.shift_left(n * LIMB_BITS - bits);
    let src = v.to_limbs(n);

    let mut m = vec![0; limbs::limbs_for(prec)];
    let (carry, t) = round_raw(&mut m, &src, bits, neg, prec, rm);
    (unit + bits as i64 + carry as i64, m, t)
}

/// Build a float of precision `prec` from the output of `round_integer`, fit
/// it into the exponent range and return it with the final ternary value.
pub(crate) fn finish(
    prec: usize,
    neg: bool,
    rounded: (i64, Vec<Limb>, Ordering),
    rm: RoundingMode,
    ctx: &mut Context,
) -> (Float, Ordering) {
    let (exp, m, t) = rounded;
    let mut res = Float::from_rounded(prec, neg, exp, m);
    let t = ctx.check_range(&mut res, t, rm);
    (res, t)
}

/// Returns a copy of a singular value (NaN, Inf, Zero) at precision `prec`.
pub(crate) fn singular_like(prec: usize, x: &Float) -> Float {
    match x.get_category() {
        Category::NaN => Float::nan(prec),
        Category::Infinity => Float::inf(prec, x.get_sign()),
        Category::Zero => Float::zero(prec, x.get_sign()),
        Category::Normal => unreachable!("not a singular value"),
    }
}

impl Float {
    /// Round `src` into the precision of self and store it. Returns the
    /// ternary value.
    pub fn set(
        &mut self,
        src: &Float,
        rm: RoundingMode,
        ctx: &mut Context,
    ) -> Ordering {
        let (res, t) = Self::rounded_from(self.get_prec(), src, rm, ctx);
        self.commit(res);
        t
    }

    /// Compute `src` rounded to `prec` bits.
    pub(crate) fn rounded_from(
        prec: usize,
        src: &Float,
        rm: RoundingMode,
        ctx: &mut Context,
    ) -> (Float, Ordering) {
        if !src.is_normal() {
            if src.is_nan() {
                ctx.raise(Flags::NAN);
            }
            return (singular_like(prec, src), Ordering::Equal);
        }
        Self::rounded_with_sign(prec, src, src.get_sign(), rm, ctx)
    }

    /// Compute the magnitude of the normal value `src`, with the sign `neg`,
    /// rounded to `prec` bits.
    pub(crate) fn rounded_with_sign(
        prec: usize,
        src: &Float,
        neg: bool,
        rm: RoundingMode,
        ctx: &mut Context,
    ) -> (Float, Ordering) {
        debug_assert!(src.is_normal());
        let mut m = vec![0; limbs::limbs_for(prec)];
        let (carry, t) =
            round_raw(&mut m, src.get_mantissa(), src.get_prec(), neg, prec, rm);
        let exp = src.get_exp() + carry as i64;
        let mut res = Float::from_rounded(prec, neg, exp, m);
        let t = ctx.check_range(&mut res, t, rm);
        (res, t)
    }

    /// Change the precision of self to `prec` bits, rounding the value.
    /// Returns the ternary value.
    pub fn prec_round(
        &mut self,
        prec: usize,
        rm: RoundingMode,
        ctx: &mut Context,
    ) -> Ordering {
        let mut res = Float::new(prec);
        let t = res.set(self, rm, ctx);
        *self = res;
        t
    }
}

#[cfg(test)]
use crate::utils::Lfsr;

#[test]
fn test_round_raw_small() {
    use RoundingMode::*;
    let src = [0b1011 << 60];
    let mut dst = [0];

    let res = round_raw(&mut dst, &src, 4, false, 2, NearestTiesToEven);
    assert_eq!(res, (false, Ordering::Greater));
    assert_eq!(dst, [0b11 << 62]);
    let res = round_raw(&mut dst, &src, 4, false, 2, Positive);
    assert_eq!(res, (false, Ordering::Greater));
    let res = round_raw(&mut dst, &src, 4, true, 2, Positive);
    assert_eq!(res, (false, Ordering::Greater));
    assert_eq!(dst, [0b10 << 62]);
    let res = round_raw(&mut dst, &src, 4, true, 2, Away);
    assert_eq!(res, (false, Ordering::Less));
    assert_eq!(dst, [0b11 << 62]);

    // Bits below the source precision are ignored.
    let src = [(0b1000 << 60) | 1];
    let res = round_raw(&mut dst, &src, 4, false, 2, Away);
    assert_eq!(res, (false, Ordering::Equal));
    assert_eq!(dst, [0b10 << 62]);
}

#[test]
fn test_round_raw_ties() {
    use RoundingMode::*;
    let mut dst = [0];
    // 0b10.1 rounds to the even 0b10.
    let res = round_raw(&mut dst, &[0b101 << 61], 3, false, 2, NearestTiesToEven);
    assert_eq!(res, (false, Ordering::Less));
    assert_eq!(dst, [0b10 << 62]);
    let res = round_raw(&mut dst, &[0b101 << 61], 3, false, 2, NearestTiesToAway);
    assert_eq!(res, (false, Ordering::Greater));
    assert_eq!(dst, [0b11 << 62]);

    // 0b11.1 rounds to the even 0b100, which carries.
    let res = round_raw(&mut dst, &[0b111 << 61], 3, true, 2, NearestTiesToEven);
    assert_eq!(res, (true, Ordering::Less));
    assert_eq!(dst, [1 << 63]);
}

#[test]
fn test_round_raw_multi_limb() {
    use RoundingMode::*;
    // Round 128 bits of ones to 64 bits.
    let mut dst = [0];
    let res = round_raw(&mut dst, &[u64::MAX, u64::MAX], 128, false, 64, Zero);
    assert_eq!(res, (false, Ordering::Less));
    assert_eq!(dst, [u64::MAX]);
    let res =
        round_raw(&mut dst, &[u64::MAX, u64::MAX], 128, false, 64, NearestTiesToEven);
    assert_eq!(res, (true, Ordering::Greater));
    assert_eq!(dst, [1 << 63]);

    // The guard bit is the top bit of the low word.
    let src = [1 << 63, 1 << 63];
    let res = round_raw(&mut dst, &src, 128, false, 64, NearestTiesToEven);
    assert_eq!(res, (false, Ordering::Less));
    assert_eq!(dst, [1 << 63]);
    let src = [(1 << 63) | 1, 1 << 63];
    let res = round_raw(&mut dst, &src, 128, false, 64, NearestTiesToEven);
    assert_eq!(res, (false, Ordering::Greater));
    assert_eq!(dst, [(1 << 63) | 1]);

    // Extending a value clears the new low words.
    let mut wide = [7, 7, 7];
    let res = round_raw(&mut wide, &[u64::MAX], 64, false, 190, Zero);
    assert_eq!(res, (false, Ordering::Equal));
    assert_eq!(wide, [0, 0, u64::MAX]);
}

#[test]
fn test_round_idempotent() {
    use RoundingMode::*;
    let mut lfsr = Lfsr::new();
    for _ in 0..500 {
        let prec = 2 + lfsr.below(300) as usize;
        let m = lfsr.mantissa(prec);
        for rm in [NearestTiesToEven, NearestTiesToAway, Zero, Positive, Negative] {
            let mut dst = vec![0; m.len()];
            let res = round_raw(&mut dst, &m, prec, lfsr.get() & 1 == 1, prec, rm);
            assert_eq!(res, (false, Ordering::Equal));
            assert_eq!(dst, m);
        }
    }
}

/// Returns the rounded magnitude as (carry, mantissa) in a form where a
/// larger tuple means a larger value.
#[cfg(test)]
fn rounded_key(
    src: &[Limb],
    src_prec: usize,
    dst_prec: usize,
    rm: RoundingMode,
) -> (bool, Vec<Limb>, Ordering) {
    let mut dst = vec![0; limbs::limbs_for(dst_prec)];
    let (c, t) = round_raw(&mut dst, src, src_prec, false, dst_prec, rm);
    dst.reverse();
    (c, dst, t)
}

#[test]
fn test_round_monotonic_and_ordered() {
    use RoundingMode::*;
    let mut lfsr = Lfsr::new_with_seed(7);
    for _ in 0..1000 {
        let src_prec = 3 + lfsr.below(250) as usize;
        let dst_prec = 2 + lfsr.below(src_prec as u64 - 2) as usize;
        let a = lfsr.mantissa(src_prec);
        // The next representable mantissa after `a`, unless `a` is all ones.
        let mut b = a.clone();
        let pad = b.len() * LIMB_BITS - src_prec;
        if limbs::add_1(&mut b, 1 << pad) || b[b.len() - 1] >> 63 == 0 {
            continue;
        }

        for rm in [NearestTiesToEven, NearestTiesToAway, Zero, Away] {
            let (ca, ma, _) = rounded_key(&a, src_prec, dst_prec, rm);
            let (cb, mb, _) = rounded_key(&b, src_prec, dst_prec, rm);
            assert!((ca, &ma) <= (cb, &mb));
        }

        let (cz, mz, tz) = rounded_key(&a, src_prec, dst_prec, Zero);
        let (cn, mn, tn) = rounded_key(&a, src_prec, dst_prec, NearestTiesToEven);
        let (cu, mu, tu) = rounded_key(&a, src_prec, dst_prec, Away);
        assert!((cz, &mz) <= (cn, &mn));
        assert!((cn, &mn) <= (cu, &mu));
        assert_ne!(tz, Ordering::Greater);
        assert_ne!(tu, Ordering::Less);
        if tz == Ordering::Equal {
            assert_eq!(tn, Ordering::Equal);
            assert_eq!(tu, Ordering::Equal);
            assert_eq!(mz, mu);
        } else {
            // The two directed results are neighbors.
            assert_eq!(tu, Ordering::Greater);
            assert!((cz, &mz) < (cu, &mu));
            assert!(mn == mz || mn == mu);
        }
    }
}

#[test]
fn test_round_ties_to_even_random() {
    let mut lfsr = Lfsr::new_with_seed(3);
    for _ in 0..1000 {
        let dst_prec = 2 + lfsr.below(200) as usize;
        // Build a value that is exactly halfway: the kept bits, then a one.
        let src_prec = dst_prec + 1;
        let mut m = lfsr.mantissa(src_prec);
        let n = m.len();
        let half = n * LIMB_BITS - src_prec;
        m[half / LIMB_BITS] |= 1 << (half % LIMB_BITS);
        let mut dst = vec![0; limbs::limbs_for(dst_prec)];
        let (carry, t) = round_raw(
            &mut dst,
            &m,
            src_prec,
            false,
            dst_prec,
            RoundingMode::NearestTiesToEven,
        );
        assert_ne!(t, Ordering::Equal);
        let pad = dst.len() * LIMB_BITS - dst_prec;
        if !carry {
            assert!(!limbs::test_bit(&dst, pad));
        }
    }
}

#[test]
fn test_round_integer() {
    use RoundingMode::*;
    let three = BigInt::from_u64(3);
    let (e, m, t) = round_integer(&three, false, 0, false, 2, Zero);
    assert_eq!((e, m, t), (2, vec![0b11 << 62], Ordering::Equal));

    // 5 = 0b101 is halfway between 4 and 6.
    let five = BigInt::from_u64(5);
    let (e, m, t) = round_integer(&five, false, 0, false, 2, NearestTiesToEven);
    assert_eq!((e, m, t), (3, vec![1 << 63], Ordering::Less));
    // Anything above 5 goes to 6.
    let (e, m, t) = round_integer(&five, true, 0, false, 2, NearestTiesToEven);
    assert_eq!((e, m, t), (3, vec![0b11 << 62], Ordering::Greater));
    // 5 + s is exact at a high precision, except for the sticky part.
    let (e, m, t) = round_integer(&five, true, -4, true, 10, Zero);
    assert_eq!((e, m, t), (-1, vec![0b1010 << 60], Ordering::Greater));

    // 7 rounds up to 8 with a carry.
    let seven = BigInt::from_u64(7);
    let (e, m, t) = round_integer(&seven, false, 10, false, 2, Away);
    assert_eq!((e, m, t), (14, vec![1 << 63], Ordering::Greater));
}

#[test]
fn test_set_and_prec_round() {
    use RoundingMode::*;
    let mut ctx = Context::default();
    // 0.1011p+3 = 5.5
    let x = Float::from_raw_parts(4, true, 3, &[0b1011 << 60]);
    let mut y = Float::new(2);
    let t = y.set(&x, NearestTiesToEven, &mut ctx);
    assert_eq!(y.to_string(), "-0.11p+3");
    assert_eq!(t, Ordering::Less);
    assert!(ctx.is_inexact());

    let mut z = x.clone();
    ctx.clear_flags();
    let t = z.prec_round(100, Zero, &mut ctx);
    assert_eq!(t, Ordering::Equal);
    assert_eq!(z.get_prec(), 100);
    assert_eq!(z, x);
    assert!(ctx.flags().is_empty());

    let t = z.prec_round(3, Zero, &mut ctx);
    assert_eq!(t, Ordering::Greater);
    assert_eq!(z.to_string(), "-0.101p+3");

    let mut w = Float::new(3);
    w.set(&Float::nan(10), Zero, &mut ctx);
    assert!(w.is_nan() && ctx.is_nan());
    w.set(&Float::inf(10, true), Zero, &mut ctx);
    assert!(w.is_inf() && w.is_negative());
}
