//! Conversions between floats and the native integer and floating point
//! types.

extern crate alloc;

use alloc::vec;
use core::cmp::Ordering;

use crate::context::Context;
use crate::float::{check_prec, Category, Float, RoundingMode};
use crate::limbs;
use crate::round::{finish, round_raw};

/// The number of explicit mantissa bits in an f64.
const F64_MANTISSA: u32 = 52;
/// The weight of the lowest bit of an f64 subnormal is 2^-1074.
const F64_MIN_UNIT: i64 = -1074;

impl Float {
    /// Round the value `±val * 2^unit` to `prec` bits.
    fn rounded_u64(
        prec: usize,
        neg: bool,
        val: u64,
        unit: i64,
        rm: RoundingMode,
        ctx: &mut Context,
    ) -> (Float, Ordering) {
        check_prec(prec);
        if val == 0 {
            return (Float::zero(prec, neg), Ordering::Equal);
        }
        let lz = val.leading_zeros();
        let bits = 64 - lz as i64;
        let src = [val << lz];
        let mut m = vec![0; limbs::limbs_for(prec)];
        let (carry, t) = round_raw(&mut m, &src, 64, neg, prec, rm);
        finish(prec, neg, (unit + bits + carry as i64, m, t), rm, ctx)
    }

    /// Load the integer `val` into a float of precision `prec`. The value is
    /// rounded to the nearest even if it does not fit.
    pub fn from_u64(prec: usize, val: u64) -> Self {
        let rm = RoundingMode::NearestTiesToEven;
        Self::rounded_u64(prec, false, val, 0, rm, &mut Context::default()).0
    }

    /// Load the integer `val` into a float of precision `prec`. The value is
    /// rounded to the nearest even if it does not fit.
    pub fn from_i64(prec: usize, val: i64) -> Self {
        let rm = RoundingMode::NearestTiesToEven;
        let ctx = &mut Context::default();
        Self::rounded_u64(prec, val < 0, val.unsigned_abs(), 0, rm, ctx).0
    }

    /// Set self to the integer `val`. Returns the ternary value.
    pub fn set_u64(
        &mut self,
        val: u64,
        rm: RoundingMode,
        ctx: &mut Context,
    ) -> Ordering {
        let (res, t) =
            Self::rounded_u64(self.get_prec(), false, val, 0, rm, ctx);
        self.commit(res);
        t
    }

    /// Set self to the integer `val`. Returns the ternary value.
    pub fn set_i64(
        &mut self,
        val: i64,
        rm: RoundingMode,
        ctx: &mut Context,
    ) -> Ordering {
        let neg = val < 0;
        let (res, t) = Self::rounded_u64(
            self.get_prec(),
            neg,
            val.unsigned_abs(),
            0,
            rm,
            ctx,
        );
        self.commit(res);
        t
    }

    /// Loads and converts a native fp64 value. The conversion is exact when
    /// `prec` is at least 53, and rounds to the nearest even otherwise.
    pub fn from_f64(prec: usize, float: f64) -> Self {
        let bits = float.to_bits();
        let sign = (bits >> 63) == 1;
        let biased_exp = ((bits >> F64_MANTISSA) & 0x7ff) as i64;
        let mut mantissa = bits & ((1 << F64_MANTISSA) - 1);

        if biased_exp == 0x7ff {
            if mantissa == 0 {
                return Self::inf(prec, sign);
            }
            return Self::nan(prec);
        }

        // Add the implicit bit for normal numbers. Subnormals share the
        // exponent of the smallest normal.
        let unit = if biased_exp != 0 {
            mantissa |= 1 << F64_MANTISSA;
            biased_exp - 1075
        } else {
            F64_MIN_UNIT
        };
        let rm = RoundingMode::NearestTiesToEven;
        let ctx = &mut Context::default();
        Self::rounded_u64(prec, sign, mantissa, unit, rm, ctx).0
    }

    /// Convert this float to fp64, rounding to the nearest even. Values that
    /// are too large become infinity and tiny values become subnormals or
    /// zero.
    pub fn as_f64(&self) -> f64 {
        let sign = self.get_sign();
        let signed = |x: f64| if sign { -x } else { x };
        let exp = match self.get_category() {
            Category::NaN => return f64::NAN,
            Category::Infinity => return signed(f64::INFINITY),
            Category::Zero => return signed(0.0),
            Category::Normal => self.get_exp(),
        };

        // The value is in [2^(exp-1), 2^exp).
        if exp > 1024 {
            return signed(f64::INFINITY);
        }
        // The number of bits above the lowest subnormal bit.
        let avail = exp - F64_MIN_UNIT;
        if avail < 0 {
            return signed(0.0);
        }
        if avail == 0 {
            // Between half of the smallest subnormal and the subnormal itself.
            // An exact half is a tie that goes to the even zero.
            if self.is_power_of_two() {
                return signed(0.0);
            }
            return signed(f64::from_bits(1));
        }

        let prec = avail.min(53) as usize;
        let mut m = [0];
        let (carry, _) = round_raw(
            &mut m,
            self.get_mantissa(),
            self.get_prec(),
            sign,
            prec,
            RoundingMode::NearestTiesToEven,
        );
        let exp = exp + carry as i64;
        if exp > 1024 {
            return signed(f64::INFINITY);
        }

        let w = m[0];
        let bits = if exp >= -1021 {
            // Normal: drop the implicit bit.
            let biased = (exp + 1022) as u64;
            (biased << F64_MANTISSA) | ((w << 1) >> 12)
        } else {
            w >> (-exp - 1010)
        };
        signed(f64::from_bits(bits))
    }
}

#[cfg(test)]
use crate::utils::{self, Lfsr};

#[test]
fn test_cast_from_integers() {
    let mut ctx = Context::default();
    let x = Float::from_u64(64, u64::MAX);
    assert_eq!((x.get_exp(), x.get_mantissa()), (64, &[u64::MAX][..]));
    assert!(Float::from_u64(10, 0).is_zero());
    assert_eq!(Float::from_i64(3, -6).as_f64(), -6.0);
    assert_eq!(Float::from_i64(64, i64::MIN).as_f64(), i64::MIN as f64);

    // Ties go to the even neighbour.
    assert_eq!(Float::from_u64(64, (1 << 53) + 1).as_f64(), (1u64 << 53) as f64);
    assert_eq!(Float::from_u64(2, 5).as_f64(), 4.0);
    assert_eq!(Float::from_u64(2, 7).as_f64(), 8.0);

    for i in -100..100 {
        let a = Float::from_i64(24, i);
        let b = Float::from_f64(24, i as f64);
        assert!(a == b);
    }

    let mut x = Float::new(2);
    assert_eq!(x.set_i64(-7, RoundingMode::Zero, &mut ctx), Ordering::Greater);
    assert_eq!(x.as_f64(), -6.0);
    assert_eq!(x.set_u64(7, RoundingMode::Positive, &mut ctx), Ordering::Greater);
    assert_eq!(x.as_f64(), 8.0);
    assert_eq!(x.set_u64(12, RoundingMode::Zero, &mut ctx), Ordering::Equal);
    assert_eq!(x.as_f64(), 12.0);
    assert!(ctx.is_inexact());

    // Integers can overflow a narrow exponent range.
    ctx.set_exponent_range(-10, 10).unwrap();
    ctx.clear_flags();
    let t = x.set_u64(1 << 20, RoundingMode::NearestTiesToEven, &mut ctx);
    assert_eq!(t, Ordering::Greater);
    assert!(x.is_inf() && ctx.is_overflow());
}

#[test]
fn test_cast_special_values() {
    // Test that the special values survive the round trip.
    for v in utils::get_special_test_values() {
        let x = Float::from_f64(53, v);
        assert_eq!(x.is_nan(), v.is_nan());
        assert_eq!(x.is_inf(), v.is_infinite());
        let res = x.as_f64();
        assert!(v.is_nan() || res.to_bits() == v.to_bits());
        assert_eq!(v.is_nan(), res.is_nan());
    }
    assert!(Float::nan(5).as_f64().is_nan());
    assert_eq!(Float::zero(5, true).as_f64().to_bits(), (-0.0f64).to_bits());
    assert_eq!(Float::inf(5, true).as_f64(), f64::NEG_INFINITY);
}

#[test]
fn test_cast_subnormals() {
    let mut ctx = Context::default();
    for bits in [1, 2, 3, 0x000f_ffff_ffff_ffff, 0x0010_0000_0000_0000] {
        let v = f64::from_bits(bits);
        let x = Float::from_f64(53, v);
        assert!(x.is_normal());
        assert_eq!(x.as_f64(), v);
        assert_eq!(x.neg().as_f64(), -v);
    }

    // 2^-1075 is a tie between zero and the smallest subnormal.
    let one = Float::from_u64(10, 1);
    let mut x = Float::new(10);
    x.mul_2si(&one, -1075, RoundingMode::Zero, &mut ctx);
    assert_eq!(x.as_f64(), 0.0);
    // 3 * 2^-1076 is above the tie.
    let three = Float::from_u64(10, 3);
    x.mul_2si(&three, -1076, RoundingMode::Zero, &mut ctx);
    assert_eq!(x.as_f64(), f64::from_bits(1));
    // 3 * 2^-1075 rounds to the even 2 * 2^-1074.
    x.mul_2si(&three, -1075, RoundingMode::Zero, &mut ctx);
    assert_eq!(x.as_f64(), f64::from_bits(2));
    x.mul_2si(&one, -2000, RoundingMode::Zero, &mut ctx);
    assert_eq!(x.as_f64(), 0.0);

    // The largest subnormal rounds up into the normal range.
    let mut m = Float::from_u64(64, (1 << 53) - 1);
    m.mul_2si_assign(-1074 - 1, RoundingMode::Zero, &mut ctx);
    assert_eq!(m.as_f64(), f64::MIN_POSITIVE);
}

#[test]
fn test_cast_overflow() {
    let mut ctx = Context::default();
    let one = Float::from_u64(10, 1);
    let mut x = Float::new(10);
    x.mul_2si(&one, 1024, RoundingMode::Zero, &mut ctx);
    assert_eq!(x.as_f64(), f64::INFINITY);
    x.mul_2si(&one.neg(), 1023, RoundingMode::Zero, &mut ctx);
    assert_eq!(x.as_f64(), -(2.0f64.powi(1023)));

    // The largest double plus half of its last unit is a tie that overflows.
    let mut x = Float::from_u64(64, (1 << 54) - 1);
    x.mul_2si_assign(1024 - 54, RoundingMode::Zero, &mut ctx);
    assert_eq!(x.as_f64(), f64::INFINITY);
    let mut x = Float::from_u64(64, (1 << 53) - 1);
    x.mul_2si_assign(1024 - 53, RoundingMode::Zero, &mut ctx);
    assert_eq!(x.as_f64(), f64::MAX);
}

#[test]
fn test_cast_down() {
    // Casting to 24 bits matches the hardware conversion to f32.
    let mut lfsr = Lfsr::new();
    for _ in 0..10000 {
        let v = f64::from_bits(lfsr.get64());
        if !v.is_normal() || v.abs() > 1e30 || v.abs() < 1e-30 {
            continue;
        }
        assert_eq!(Float::from_f64(53, v).as_f64().to_bits(), v.to_bits());
        let res = Float::from_f64(24, v).as_f64();
        assert_eq!(res, v as f32 as f64, "{}", v);
    }
}
