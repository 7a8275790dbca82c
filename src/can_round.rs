//! The roundability oracle. An approximation with a known error bound can be
//! rounded correctly when the whole interval of possible exact values rounds
//! to the same result.

extern crate alloc;

use alloc::vec::Vec;
use core::cmp::Ordering;

use crate::bigint::BigInt;
use crate::float::{Direction, Float, RoundingMode};
use crate::limbs::{Limb, LIMB_BITS};
use crate::round::{apply_sign, round_integer};

/// Decide if the approximation `b` can be rounded correctly.
///
/// `mantissa` and `neg` describe an approximation `b = ±0.m * 2^e` of an
/// unknown exact value `x`, with `|b - x| <= 2^(e - err)`. The approximation
/// was computed with the rounding mode `rnd1`, which narrows the interval to
/// one side of `b` for the directed modes. Returns true if every value in the
/// interval rounds to the same value at `prec` bits with the mode `rnd2`. In
/// that case rounding `b` gives the correctly rounded `x`.
///
/// # Examples
///
/// ```
///    use mpround::{can_round_raw, RoundingMode};
///
///    let rm = RoundingMode::NearestTiesToEven;
///    // 0.1011 is close to the midpoint 0.101 between 0.10 and 0.11.
///    let b = [0b1011 << 60];
///    assert!(can_round_raw(&b, false, 10, rm, rm, 2));
///    assert!(!can_round_raw(&b, false, 4, rm, rm, 2));
/// ```
pub fn can_round_raw(
    mantissa: &[Limb],
    neg: bool,
    err: i64,
    rnd1: RoundingMode,
    rnd2: RoundingMode,
    prec: usize,
) -> bool {
    if err <= 0 {
        return false;
    }
    let n = mantissa.len() * LIMB_BITS;
    // Decision points of the target rounding are at multiples of
    // 2^(e-prec-1), and b is a multiple of 2^(e-n). An interval narrower than
    // both never crosses a decision point unless b sits on one, so larger
    // error bounds don't change the answer.
    let err = err.min(n.max(prec + 1) as i64 + 2) as usize;
    let k = n.max(err);

    let mut b = BigInt::from_limbs(mantissa);
    b.shift_left(k - n);
    let d = BigInt::one_hot(k - err);

    let (lo, hi) = match rnd1.fold(neg) {
        Direction::Zero => (b.clone(), &b + &d),
        Direction::Away => (&b - &d, b),
        _ => (&b - &d, &b + &d),
    };
    if lo.is_zero() {
        return false;
    }
    let (e0, m0, _) = round_integer(&lo, false, 0, neg, prec, rnd2);
    let (e1, m1, _) = round_integer(&hi, false, 0, neg, prec, rnd2);
    e0 == e1 && m0 == m1
}

impl Float {
    /// Decide if self, an approximation with the error bound
    /// `2^(EXP(self) - err)` computed with the mode `rnd1`, can be rounded
    /// correctly to `prec` bits with the mode `rnd2`. Singular values can't be
    /// rounded.
    pub fn can_round(
        &self,
        err: i64,
        rnd1: RoundingMode,
        rnd2: RoundingMode,
        prec: usize,
    ) -> bool {
        self.is_normal()
            && can_round_raw(
                self.get_mantissa(),
                self.get_sign(),
                err,
                rnd1,
                rnd2,
                prec,
            )
    }
}

/// Compare `a * 2^ea` and `b * 2^eb`.
fn cmp_scaled(a: &BigInt, ea: i64, b: &BigInt, eb: i64) -> Ordering {
    if ea >= eb {
        let mut a = a.clone();
        a.shift_left((ea - eb) as usize);
        a.cmp(b)
    } else {
        let mut b = b.clone();
        b.shift_left((eb - ea) as usize);
        a.cmp(&b)
    }
}

/// Round an exact value that is only known to lie strictly between
/// `lo * 2^unit` and `hi * 2^unit`. Returns the rounded value and its
/// ternary value if they are the same for every point of the interval.
pub(crate) fn round_bounds(
    lo: &BigInt,
    hi: &BigInt,
    unit: i64,
    neg: bool,
    prec: usize,
    rm: RoundingMode,
) -> Option<(i64, Vec<Limb>, Ordering)> {
    if lo.is_zero() {
        return None;
    }
    let (e0, m0, _) = round_integer(lo, false, unit, neg, prec, rm);
    let (e1, m1, _) = round_integer(hi, false, unit, neg, prec, rm);
    if e0 != e1 || m0 != m1 {
        return None;
    }
    let r = BigInt::from_limbs(&m0);
    let r_unit = e0 - (m0.len() * LIMB_BITS) as i64;
    let t = if cmp_scaled(&r, r_unit, hi, unit) != Ordering::Less {
        Ordering::Greater
    } else if cmp_scaled(&r, r_unit, lo, unit) != Ordering::Greater {
        Ordering::Less
    } else {
        return None;
    };
    Some((e0, m0, apply_sign(t, neg)))
}

#[cfg(test)]
use crate::limbs;
#[cfg(test)]
use crate::round::round_raw;
#[cfg(test)]
use crate::utils::Lfsr;

#[test]
fn test_can_round_simple() {
    use RoundingMode::*;
    let b = [0b1011 << 60];
    assert!(can_round_raw(&b, false, 10, Zero, NearestTiesToEven, 2));
    assert!(!can_round_raw(&b, false, 0, Zero, Zero, 2));
    assert!(!can_round_raw(&b, false, -5, Zero, Zero, 2));
    // Huge error bounds behave like tight ones.
    assert!(can_round_raw(&b, true, i64::MAX, Zero, Positive, 3));

    // b = 0.1 sits on a rounding point of every precision.
    let b = [1 << 63];
    assert!(!can_round_raw(&b, false, 100, NearestTiesToEven, Zero, 2));
    // The exact value is above b: truncation is safe, rounding up isn't.
    assert!(can_round_raw(&b, false, 100, Zero, Zero, 2));
    assert!(!can_round_raw(&b, false, 100, Zero, Away, 2));
    // For negative values rounding toward +inf truncates the magnitude.
    assert!(can_round_raw(&b, true, 100, Zero, Positive, 2));
    // The interval touches zero.
    assert!(!can_round_raw(&b, false, 1, NearestTiesToEven, Zero, 2));

    let x = Float::from_raw_parts(4, false, 7, &[0b1011 << 60]);
    assert!(x.can_round(10, Zero, NearestTiesToEven, 2));
    assert!(!Float::zero(4, false).can_round(10, Zero, Zero, 2));
}

#[test]
fn test_round_bounds() {
    use RoundingMode::*;
    let v = BigInt::from_u64;
    assert_eq!(round_bounds(&v(10), &v(12), 0, false, 2, NearestTiesToEven), None);
    assert_eq!(round_bounds(&v(13), &v(14), 0, false, 2, NearestTiesToEven), None);
    assert_eq!(
        round_bounds(&v(17), &v(19), 0, false, 2, NearestTiesToEven),
        Some((5, alloc::vec![1 << 63], Ordering::Less))
    );
    assert_eq!(
        round_bounds(&v(17), &v(19), 3, true, 2, NearestTiesToEven),
        Some((8, alloc::vec![1 << 63], Ordering::Greater))
    );
    assert_eq!(
        round_bounds(&v(22), &v(23), 0, false, 2, Away),
        Some((5, alloc::vec![0b11 << 62], Ordering::Greater))
    );
    // The rounded value is inside the interval, so the direction is unknown.
    assert_eq!(round_bounds(&v(15), &v(17), 0, false, 2, NearestTiesToEven), None);
}

/// Returns a random number in the range `0..2^bits`.
#[cfg(test)]
fn random_below_pow2(lfsr: &mut Lfsr, bits: usize) -> BigInt {
    let words = limbs::limbs_for(bits);
    let parts: Vec<u64> = lfsr.by_ref().take(words).collect();
    let mut r = BigInt::from_limbs(&parts);
    r.shift_right(words * LIMB_BITS - bits);
    r
}

#[test]
fn test_can_round_soundness() {
    use RoundingMode::*;
    let modes = [NearestTiesToEven, NearestTiesToAway, Zero, Positive, Negative];
    let mut lfsr = Lfsr::new_with_seed(11);
    let mut accepted = 0;
    for _ in 0..12000 {
        let pb = 2 + lfsr.below(256) as usize;
        let mant = lfsr.mantissa(pb);
        let n = mant.len() * LIMB_BITS;
        let neg = lfsr.get() & 1 == 1;
        let err = 1 + lfsr.below(n as u64 + 24) as i64;
        let rnd1 = modes[lfsr.below(5) as usize];
        let rnd2 = modes[lfsr.below(5) as usize];
        let prec = 2 + lfsr.below(pb as u64 + 8) as usize;
        if !can_round_raw(&mant, neg, err, rnd1, rnd2, prec) {
            continue;
        }
        accepted += 1;

        // Round b itself. Its exponent is zero.
        let mut m = alloc::vec![0; limbs::limbs_for(prec)];
        let (carry, _) = round_raw(&mut m, &mant, pb, neg, prec, rnd2);
        let expected = (carry as i64, m);

        // Build an exact value inside the error bound, at a finer scale.
        let k = n.max(err as usize) + 8;
        let width = k - err as usize;
        let mut x = BigInt::from_limbs(&mant);
        x.shift_left(k - n);
        let delta = match lfsr.below(4) {
            0 => BigInt::one_hot(width),
            1 => BigInt::zero(),
            _ => random_below_pow2(&mut lfsr, width),
        };
        let up = match rnd1.fold(neg) {
            Direction::Zero => true,
            Direction::Away => false,
            _ => lfsr.get() & 1 == 1,
        };
        let x = if up { &x + &delta } else { &x - &delta };
        let (e, m, _) = round_integer(&x, false, -(k as i64), neg, prec, rnd2);
        assert_eq!((e, m), expected);
    }
    assert!(accepted > 1000, "only {} trials were accepted", accepted);
}
