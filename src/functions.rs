//! Square root, sign manipulation and scaling by powers of two.

extern crate alloc;

use alloc::vec;
use core::cmp::Ordering;

use crate::arithmetic::{nan_result, truncate};
use crate::bigint::BigInt;
use crate::can_round::round_bounds;
use crate::context::Context;
use crate::float::{Category, Float, RoundingMode, EXP_MAX, EXP_MIN};
use crate::limbs;
use crate::round::{finish, round_integer, round_raw, singular_like};

impl Float {
    /// Computes sqrt(a) into a new float of precision `prec`.
    pub(crate) fn sqrt_value(
        prec: usize,
        a: &Float,
        rm: RoundingMode,
        ctx: &mut Context,
    ) -> (Float, Ordering) {
        match a.get_category() {
            Category::NaN => nan_result(prec, ctx),
            // sqrt(-0) is -0.
            Category::Zero => (Float::zero(prec, a.get_sign()), Ordering::Equal),
            _ if a.is_negative() => nan_result(prec, ctx),
            Category::Infinity => (Float::inf(prec, false), Ordering::Equal),
            Category::Normal => Self::sqrt_normal(prec, a, rm, ctx),
        }
    }

    /// Take the square root of a positive normal value. Wide operands are
    /// truncated to a window, as in the division, and the window grows until
    /// the root is decided or the whole operand is used.
    fn sqrt_normal(
        prec: usize,
        a: &Float,
        rm: RoundingMode,
        ctx: &mut Context,
    ) -> (Float, Ordering) {
        let one = BigInt::one();
        let mut w = prec + 128;
        loop {
            // The operand is in [lo, hi) * 2^unit, and hi is lo+1 unless the
            // truncation is exact.
            let (mut lo, mut unit, exact) = truncate(a, w);
            let mut hi = &lo + &one;

            // The root of 2^unit needs an even exponent.
            if unit % 2 != 0 {
                lo.shift_left(1);
                hi.shift_left(1);
                unit -= 1;
            }
            // Make the integer root at least prec+2 bits wide.
            let t = (2 * (prec + 2)).saturating_sub(lo.msb_index()).div_ceil(2);
            lo.shift_left(2 * t);
            hi.shift_left(2 * t);
            let unit = (unit - 2 * t as i64) / 2;

            if exact {
                let (s, r) = lo.sqrt_rem();
                let rounded = round_integer(&s, !r.is_zero(), unit, false, prec, rm);
                return finish(prec, false, rounded, rm, ctx);
            }

            let (q_lo, _) = lo.sqrt_rem();
            let (mut q_hi, _) = hi.sqrt_rem();
            q_hi.inplace_add(&one);
            if let Some(rounded) = round_bounds(&q_lo, &q_hi, unit, false, prec, rm)
            {
                return finish(prec, false, rounded, rm, ctx);
            }
            w *= 2;
        }
    }

    /// Set self to the square root of `a`. Returns the ternary value.
    pub fn set_sqrt(
        &mut self,
        a: &Float,
        rm: RoundingMode,
        ctx: &mut Context,
    ) -> Ordering {
        let (res, t) = Self::sqrt_value(self.get_prec(), a, rm, ctx);
        self.commit(res);
        t
    }

    /// Replace self with its square root.
    pub fn sqrt_assign(&mut self, rm: RoundingMode, ctx: &mut Context) -> Ordering {
        let (res, t) = Self::sqrt_value(self.get_prec(), self, rm, ctx);
        self.commit(res);
        t
    }

    /// Returns a copy of the number with the sign flipped.
    pub fn neg(&self) -> Self {
        let mut x = self.clone();
        x.neg_assign();
        x
    }

    /// Returns a copy of the number without the sign.
    pub fn abs(&self) -> Self {
        let mut x = self.clone();
        x.abs_assign();
        x
    }

    /// Store `src` with the sign `neg`, rounded to the precision of self.
    fn set_with_sign(
        &mut self,
        src: &Float,
        neg: bool,
        rm: RoundingMode,
        ctx: &mut Context,
    ) -> Ordering {
        let prec = self.get_prec();
        let (res, t) = match src.get_category() {
            Category::Normal => Float::rounded_with_sign(prec, src, neg, rm, ctx),
            Category::NaN => nan_result(prec, ctx),
            _ => {
                let mut x = singular_like(prec, src);
                x.set_sign(neg);
                (x, Ordering::Equal)
            }
        };
        self.commit(res);
        t
    }

    /// Set self to -src. Returns the ternary value.
    pub fn set_neg(
        &mut self,
        src: &Float,
        rm: RoundingMode,
        ctx: &mut Context,
    ) -> Ordering {
        self.set_with_sign(src, !src.get_sign(), rm, ctx)
    }

    /// Set self to |src|. Returns the ternary value.
    pub fn set_abs(
        &mut self,
        src: &Float,
        rm: RoundingMode,
        ctx: &mut Context,
    ) -> Ordering {
        self.set_with_sign(src, false, rm, ctx)
    }

    /// Computes src * 2^k into a new float of precision `prec`.
    fn scaled_value(
        prec: usize,
        src: &Float,
        k: i64,
        rm: RoundingMode,
        ctx: &mut Context,
    ) -> (Float, Ordering) {
        if !src.is_normal() {
            return Self::rounded_from(prec, src, rm, ctx);
        }
        let neg = src.get_sign();
        let mut m = vec![0; limbs::limbs_for(prec)];
        let (carry, t) =
            round_raw(&mut m, src.get_mantissa(), src.get_prec(), neg, prec, rm);
        // Anything outside of the exponent limits over- or underflows, so
        // the exponent can be saturated.
        let exp = src
            .get_exp()
            .saturating_add(k)
            .saturating_add(carry as i64)
            .clamp(2 * EXP_MIN, 2 * EXP_MAX);
        finish(prec, neg, (exp, m, t), rm, ctx)
    }

    /// Set self to src * 2^k. The scaling is exact; the value is only rounded
    /// if self is narrower than `src`. Returns the ternary value.
    pub fn mul_2si(
        &mut self,
        src: &Float,
        k: i64,
        rm: RoundingMode,
        ctx: &mut Context,
    ) -> Ordering {
        let (res, t) = Self::scaled_value(self.get_prec(), src, k, rm, ctx);
        self.commit(res);
        t
    }

    /// Multiply self by 2^k in place. Only the exponent range can make the
    /// result inexact.
    pub fn mul_2si_assign(
        &mut self,
        k: i64,
        rm: RoundingMode,
        ctx: &mut Context,
    ) -> Ordering {
        let (res, t) = Self::scaled_value(self.get_prec(), self, k, rm, ctx);
        self.commit(res);
        t
    }

    /// Flip the sign of self in place. NaN is left alone.
    pub fn neg_assign(&mut self) {
        if !self.is_nan() {
            self.set_sign(!self.get_sign());
        }
    }

    /// Clear the sign of self in place. NaN is left alone.
    pub fn abs_assign(&mut self) {
        if !self.is_nan() {
            self.set_sign(false);
        }
    }
}

#[cfg(test)]
use crate::arithmetic::same_bits;
#[cfg(test)]
use crate::utils::{get_special_test_values, Lfsr};

#[test]
fn test_sqrt_perfect_squares() {
    let mut ctx = Context::default();
    for prec in [3, 10, 53, 64, 65, 200] {
        let four = Float::from_u64(prec, 4);
        let mut r = Float::new(prec);
        let t = r.set_sqrt(&four, RoundingMode::NearestTiesToEven, &mut ctx);
        assert_eq!(t, Ordering::Equal);
        assert_eq!(r.as_f64(), 2.0);
    }
    for i in 0..256 {
        let x = Float::from_u64(64, i * i);
        let mut r = Float::new(20);
        let t = r.set_sqrt(&x, RoundingMode::Zero, &mut ctx);
        assert_eq!(t, Ordering::Equal);
        assert_eq!(r.as_f64(), i as f64);
    }
    assert!(!ctx.is_inexact());
}

#[test]
fn test_sqrt_special_values() {
    let mut ctx = Context::default();
    let rm = RoundingMode::NearestTiesToEven;
    // Test the category and value of the different special values (inf, zero,
    // correct sign, etc).
    for v in get_special_test_values() {
        let x = Float::from_f64(53, v);
        let mut r = Float::new(53);
        r.set_sqrt(&x, rm, &mut ctx);
        assert_eq!(r.is_inf(), v.sqrt().is_infinite());
        assert_eq!(r.is_nan(), v.sqrt().is_nan());
        if !r.is_nan() {
            assert_eq!(r.is_negative(), v.sqrt().is_sign_negative());
            assert_eq!(r.as_f64(), v.sqrt());
        }
    }
    assert!(ctx.is_nan());
}

#[test]
fn test_sqrt_vs_f64() {
    let mut ctx = Context::default();
    let mut lfsr = Lfsr::new();
    for _ in 0..5000 {
        let v = f64::from_bits(lfsr.get64() >> 1);
        if !v.is_normal() {
            continue;
        }
        let x = Float::from_f64(53, v);
        let mut r = Float::new(53);
        r.set_sqrt(&x, RoundingMode::NearestTiesToEven, &mut ctx);
        assert_eq!(r.as_f64(), v.sqrt(), "sqrt({})", v);
    }

    // Test precomputed values.
    fn check(inp: f64, res: f64) {
        let mut ctx = Context::default();
        let mut r = Float::new(53);
        r.set_sqrt(&Float::from_f64(53, inp), RoundingMode::NearestTiesToEven, &mut ctx);
        assert_eq!(r.as_f64(), res);
    }
    check(2.0, core::f64::consts::SQRT_2);
    check(6.25, 2.5);
    check(0.5625, 0.75);
    check(1048576.0, 1024.0);
}

/// Round the exact root of a positive normal value with big integers.
#[cfg(test)]
fn reference_sqrt(
    prec: usize,
    a: &Float,
    rm: RoundingMode,
) -> (i64, alloc::vec::Vec<u64>, Ordering) {
    let mut x = BigInt::from_limbs(a.get_mantissa());
    let mut unit = a.get_exp() - (a.get_mantissa().len() * 64) as i64;
    if unit % 2 != 0 {
        x.shift_left(1);
        unit -= 1;
    }
    let t = prec + 2;
    x.shift_left(2 * t);
    let (s, r) = x.sqrt_rem();
    round_integer(&s, !r.is_zero(), (unit - 2 * t as i64) / 2, false, prec, rm)
}

#[test]
fn test_sqrt_vs_exact() {
    use RoundingMode::*;
    let modes = [NearestTiesToEven, NearestTiesToAway, Zero, Positive, Negative];
    let mut lfsr = Lfsr::new_with_seed(31);
    let mut ctx = Context::default();
    for i in 0..1000 {
        let mut a = lfsr.float(700, 41).abs();
        let prec = 2 + lfsr.below(100) as usize;
        if i % 4 == 0 {
            // A wide perfect square.
            let mut sq = Float::new(2 * a.get_prec());
            sq.set_mul(&a, &a, Zero, &mut ctx);
            a = sq;
        }
        let rm = modes[lfsr.below(5) as usize];
        let mut r = Float::new(prec);
        let t = r.set_sqrt(&a, rm, &mut ctx);
        let (e, m, rt) = reference_sqrt(prec, &a, rm);
        assert_eq!(t, rt);
        assert_eq!(r.get_exp(), e);
        assert_eq!(r.get_mantissa(), &m[..]);
    }
}

#[test]
fn test_sqrt_aliasing() {
    let mut ctx = Context::default();
    let mut lfsr = Lfsr::new_with_seed(2);
    for _ in 0..300 {
        let x = lfsr.float(300, 20).abs();
        let mut expected = x.clone();
        let t0 = expected.set_sqrt(&x.clone(), RoundingMode::Negative, &mut ctx);
        let mut y = x.clone();
        let t1 = y.sqrt_assign(RoundingMode::Negative, &mut ctx);
        assert_eq!(t0, t1);
        assert!(same_bits(&expected, &y));
    }
}

#[test]
fn test_sign_helpers() {
    let mut ctx = Context::default();
    let x = Float::from_f64(53, -2.75);
    assert_eq!(x.neg().as_f64(), 2.75);
    assert_eq!(x.abs().as_f64(), 2.75);
    assert_eq!(x.neg().neg().as_f64(), -2.75);
    assert!(Float::nan(5).neg().is_nan());

    // -2.75 = -0.1011p+2. Rounding the negation to two bits.
    let mut r = Float::new(2);
    let t = r.set_neg(&x, RoundingMode::Positive, &mut ctx);
    assert_eq!(t, Ordering::Greater);
    assert_eq!(r.as_f64(), 3.0);
    let t = r.set_abs(&x, RoundingMode::Zero, &mut ctx);
    assert_eq!(t, Ordering::Less);
    assert_eq!(r.as_f64(), 2.0);
    r.set_neg(&Float::zero(5, false), RoundingMode::Zero, &mut ctx);
    assert!(r.is_zero() && r.is_negative());
    r.set_abs(&Float::inf(5, true), RoundingMode::Zero, &mut ctx);
    assert!(r.is_inf() && !r.is_negative());
}

#[test]
fn test_mul_2si() {
    use RoundingMode::*;
    let mut ctx = Context::default();
    let three = Float::from_u64(10, 3);
    let mut r = Float::new(10);
    assert_eq!(r.mul_2si(&three, 5, Zero, &mut ctx), Ordering::Equal);
    assert_eq!(r.as_f64(), 96.0);
    assert_eq!(r.mul_2si(&three, -3, Zero, &mut ctx), Ordering::Equal);
    assert_eq!(r.as_f64(), 0.375);
    assert!(ctx.flags().is_empty());

    // Narrowing rounds the value.
    let mut r = Float::new(2);
    let x = Float::from_u64(10, 7);
    assert_eq!(r.mul_2si(&x, 1, NearestTiesToEven, &mut ctx), Ordering::Greater);
    assert_eq!(r.as_f64(), 16.0);

    // Scaling out of the exponent range.
    ctx.set_exponent_range(-100, 100).unwrap();
    let mut r = Float::new(10);
    let t = r.mul_2si(&three, i64::MAX, NearestTiesToEven, &mut ctx);
    assert!(r.is_inf() && ctx.is_overflow());
    assert_eq!(t, Ordering::Greater);
    let t = r.mul_2si(&three.neg(), i64::MIN, NearestTiesToEven, &mut ctx);
    assert!(r.is_zero() && r.is_negative() && ctx.is_underflow());
    assert_eq!(t, Ordering::Greater);
    r.mul_2si(&Float::inf(3, true), 4, Zero, &mut ctx);
    assert!(r.is_inf() && r.is_negative());
}

#[test]
fn test_in_place_scaling_and_signs() {
    use RoundingMode::*;
    let modes = [NearestTiesToEven, NearestTiesToAway, Zero, Positive, Negative];
    let mut lfsr = Lfsr::new_with_seed(23);
    let mut ctx = Context::default();
    ctx.set_exponent_range(-300, 300).unwrap();
    let ks = [0, 1, -1, 64, -64, 250, -250, 1000, -1000, i64::MAX, i64::MIN];
    for i in 0..500 {
        let x = lfsr.float(200, 100);
        let k = ks[i % ks.len()];
        let rm = modes[i % modes.len()];

        let mut expected = Float::new(x.get_prec());
        let mut ctx1 = ctx.clone();
        let t1 = expected.mul_2si(&x, k, rm, &mut ctx1);
        let mut y = x.clone();
        let mut ctx2 = ctx.clone();
        let t2 = y.mul_2si_assign(k, rm, &mut ctx2);
        assert_eq!(t1, t2);
        assert!(same_bits(&y, &expected), "{} {}", x, k);
        assert_eq!(ctx1.flags(), ctx2.flags());

        let mut y = x.clone();
        y.neg_assign();
        assert!(same_bits(&y, &x.neg()));
        y.abs_assign();
        assert!(same_bits(&y, &x.abs()));
    }

    // Within the range the in-place scaling is exact.
    let mut x = Float::from_f64(53, -0.625);
    assert_eq!(x.mul_2si_assign(10, Zero, &mut ctx), Ordering::Equal);
    assert_eq!(x.as_f64(), -640.0);
    assert_eq!(x.get_prec(), 53);

    let mut n = Float::nan(7);
    n.neg_assign();
    n.abs_assign();
    assert!(n.is_nan());
    let mut z = Float::zero(7, false);
    z.neg_assign();
    assert!(z.is_zero() && z.is_negative());
    z.abs_assign();
    assert!(!z.is_negative());
}
