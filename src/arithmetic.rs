//! Correctly rounded addition, subtraction, multiplication and division.
//!
//! Every kernel reads its operands through shared references and builds the
//! result in a fresh float, which is committed to the destination at the end.
//! This makes calls like `x = x + x` safe, because the destination is never
//! written while an operand is still being read.

extern crate alloc;

use alloc::vec;
use core::cmp::Ordering;
use core::ops::{Add, Div, Mul, Neg, Sub};

use crate::bigint::BigInt;
use crate::can_round::round_bounds;
use crate::cmp2::cmp2;
use crate::context::{Context, Flags};
use crate::float::{Category, Float, RoundingMode};
use crate::limbs::{self, LIMB_BITS};
use crate::round::{finish, round_integer};

/// Selects an operand of [`Float::apply`]: either the destination itself, or
/// some other value.
#[derive(Debug, Clone, Copy)]
pub enum Operand<'a> {
    Dest,
    Value(&'a Float),
}

impl<'a> Operand<'a> {
    /// Returns the value that the operand refers to.
    pub(crate) fn resolve(self, dest: &'a Float) -> &'a Float {
        match self {
            Operand::Dest => dest,
            Operand::Value(v) => v,
        }
    }
}

/// The binary operations that [`Float::apply`] can perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

/// Returns a NaN of precision `prec` and records it in the flags.
pub(crate) fn nan_result(prec: usize, ctx: &mut Context) -> (Float, Ordering) {
    ctx.raise(Flags::NAN);
    (Float::nan(prec), Ordering::Equal)
}

/// Returns the bits of the normal value `x` with a weight of 2^lo and above,
/// as an integer. The exponent of `x` must not be above `top`.
fn window(x: &Float, lo: i64, top: i64) -> BigInt {
    debug_assert!(x.get_exp() <= top && lo < top);
    let mut w = vec![0; limbs::limbs_for((top - lo) as usize)];
    limbs::extract_window(&mut w, x.get_mantissa(), x.get_exp(), lo);
    BigInt::from_limbs(&w)
}

/// Returns the lowest position that the mantissa words of `x` cover.
fn low_end(x: &Float) -> i64 {
    x.get_exp() - (x.get_mantissa().len() * LIMB_BITS) as i64
}

/// Keep the `w` highest bits of the mantissa of `x`. Returns the truncated
/// integer, the weight of its lowest bit, and true if nothing was dropped.
pub(crate) fn truncate(x: &Float, w: usize) -> (BigInt, i64, bool) {
    let m = x.get_mantissa();
    let n = m.len() * LIMB_BITS;
    let mut t = BigInt::from_limbs(m);
    if n <= w {
        return (t, x.get_exp() - n as i64, true);
    }
    t.shift_right(n - w);
    (t, x.get_exp() - w as i64, !limbs::low_bits_nonzero(m, n - w))
}

impl Float {
    /// Computes a+b or a-b into a new float of precision `prec`.
    pub(crate) fn add_sub(
        prec: usize,
        a: &Float,
        b: &Float,
        subtract: bool,
        rm: RoundingMode,
        ctx: &mut Context,
    ) -> (Float, Ordering) {
        // The sign of b as it takes part in the sum.
        let b_neg = b.get_sign() ^ subtract;

        // Table 8.2: Specification of addition for positive floating-point
        // data. Pg 247.
        match (a.get_category(), b.get_category()) {
            (Category::NaN, _) | (_, Category::NaN) => nan_result(prec, ctx),

            (Category::Infinity, Category::Infinity) => {
                if a.get_sign() != b_neg {
                    return nan_result(prec, ctx);
                }
                (Float::inf(prec, b_neg), Ordering::Equal)
            }
            (Category::Infinity, _) => {
                (Float::inf(prec, a.get_sign()), Ordering::Equal)
            }
            (_, Category::Infinity) => (Float::inf(prec, b_neg), Ordering::Equal),

            (Category::Zero, Category::Zero) => {
                let sign = if a.get_sign() == b_neg {
                    b_neg
                } else {
                    rm == RoundingMode::Negative
                };
                (Float::zero(prec, sign), Ordering::Equal)
            }
            (Category::Zero, Category::Normal) => {
                Float::rounded_with_sign(prec, b, b_neg, rm, ctx)
            }
            (Category::Normal, Category::Zero) => {
                Float::rounded_with_sign(prec, a, a.get_sign(), rm, ctx)
            }

            (Category::Normal, Category::Normal) => {
                if a.get_sign() == b_neg {
                    Self::add_normals(prec, a, b, b_neg, rm, ctx)
                } else {
                    Self::sub_normals(prec, a, b, b_neg, rm, ctx)
                }
            }
        }
    }

    /// Add the magnitudes of two normal values, and give the sum the sign
    /// `neg`.
    fn add_normals(
        prec: usize,
        a: &Float,
        b: &Float,
        neg: bool,
        rm: RoundingMode,
        ctx: &mut Context,
    ) -> (Float, Ordering) {
        let (big, small) = if a.get_exp() >= b.get_exp() {
            (a, b)
        } else {
            (b, a)
        };
        // The sum has the exponent of `big` or one more, so the bits below
        // top-prec-2 only matter for the sticky bit. All of the bits of `big`
        // are inside the window, so only `small` can be cut.
        let top = big.get_exp();
        let lo = low_end(big).min(top - prec as i64 - 2);

        let mut sum = window(big, lo, top);
        sum.inplace_add(&window(small, lo, top));
        let sticky = limbs::sticky_below(small.get_mantissa(), small.get_exp(), lo);
        finish(prec, neg, round_integer(&sum, sticky, lo, neg, prec, rm), rm, ctx)
    }

    /// Subtract the magnitudes of two normal values with different signs.
    /// `b_neg` is the sign of b in the sum.
    fn sub_normals(
        prec: usize,
        a: &Float,
        b: &Float,
        b_neg: bool,
        rm: RoundingMode,
        ctx: &mut Context,
    ) -> (Float, Ordering) {
        let (ord, cancel) = cmp2(a, b);
        let (big, small, neg) = match ord {
            Ordering::Equal => {
                let zero = Float::zero(prec, rm == RoundingMode::Negative);
                return (zero, Ordering::Equal);
            }
            Ordering::Greater => (a, b, a.get_sign()),
            Ordering::Less => (b, a, b_neg),
        };

        // The difference has the exponent top-cancel. Bring in enough bits of
        // both operands for the guard bit and one more below it.
        let top = big.get_exp();
        let exp = top - cancel as i64;
        let lo = low_end(big).min(exp - prec as i64 - 2);

        let mut diff = window(big, lo, top);
        let borrow = limbs::sticky_below(small.get_mantissa(), small.get_exp(), lo);
        let b0 = diff.inplace_sub(&window(small, lo, top));
        // The bits of `small` below the window borrow one unit, and leave a
        // positive fraction behind.
        let b1 = borrow && diff.inplace_sub(&BigInt::one());
        debug_assert!(!b0 && !b1, "the larger operand was not larger");
        finish(prec, neg, round_integer(&diff, borrow, lo, neg, prec, rm), rm, ctx)
    }

    /// Computes a*b into a new float of precision `prec`.
    pub(crate) fn mul_values(
        prec: usize,
        a: &Float,
        b: &Float,
        rm: RoundingMode,
        ctx: &mut Context,
    ) -> (Float, Ordering) {
        let sign = a.get_sign() ^ b.get_sign();

        // Table 8.4: Specification of multiplication for floating-point data of
        // positive sign. Page 251.
        match (a.get_category(), b.get_category()) {
            (Category::NaN, _) | (_, Category::NaN) => nan_result(prec, ctx),
            (Category::Zero, Category::Infinity)
            | (Category::Infinity, Category::Zero) => nan_result(prec, ctx),
            (Category::Infinity, _) | (_, Category::Infinity) => {
                (Float::inf(prec, sign), Ordering::Equal)
            }
            (Category::Zero, _) | (_, Category::Zero) => {
                (Float::zero(prec, sign), Ordering::Equal)
            }
            (Category::Normal, Category::Normal) => {
                // The product of the mantissas is exact. Round it once.
                let am = BigInt::from_limbs(a.get_mantissa());
                let bm = BigInt::from_limbs(b.get_mantissa());
                let unit = low_end(a) + low_end(b);
                let rounded =
                    round_integer(&am.mul(&bm), false, unit, sign, prec, rm);
                finish(prec, sign, rounded, rm, ctx)
            }
        }
    }

    /// Computes a/b into a new float of precision `prec`.
    pub(crate) fn div_values(
        prec: usize,
        a: &Float,
        b: &Float,
        rm: RoundingMode,
        ctx: &mut Context,
    ) -> (Float, Ordering) {
        let sign = a.get_sign() ^ b.get_sign();

        // Table 8.5: Special values for x/y - Page 263.
        match (a.get_category(), b.get_category()) {
            (Category::NaN, _)
            | (_, Category::NaN)
            | (Category::Zero, Category::Zero)
            | (Category::Infinity, Category::Infinity) => nan_result(prec, ctx),

            (Category::Infinity, _) => (Float::inf(prec, sign), Ordering::Equal),
            (_, Category::Infinity) | (Category::Zero, _) => {
                (Float::zero(prec, sign), Ordering::Equal)
            }
            (Category::Normal, Category::Zero) => {
                ctx.raise(Flags::DIV_BY_ZERO);
                (Float::inf(prec, sign), Ordering::Equal)
            }
            (Category::Normal, Category::Normal) => {
                Self::div_normals(prec, a, b, sign, rm, ctx)
            }
        }
    }

    /// Divide two normal values. Operands that are much wider than the result
    /// are truncated to a window, and the quotient is rounded from the bounds
    /// that the truncation leaves. The window grows until the bounds decide
    /// the result or cover the operands.
    fn div_normals(
        prec: usize,
        a: &Float,
        b: &Float,
        neg: bool,
        rm: RoundingMode,
        ctx: &mut Context,
    ) -> (Float, Ordering) {
        let one = BigInt::one();
        let mut w = prec + 128;
        loop {
            let (at, ua, a_exact) = truncate(a, w);
            let (bt, ub, b_exact) = truncate(b, w);

            // Scale the dividend so that the quotient has at least prec+64
            // bits.
            let s = (prec + 66 + bt.msb_index()).saturating_sub(at.msb_index());
            let unit = ua - ub - s as i64;
            let mut num = at.clone();
            num.shift_left(s);

            if a_exact && b_exact {
                let (q, r) = num.div_rem(&bt);
                let rounded = round_integer(&q, !r.is_zero(), unit, neg, prec, rm);
                return finish(prec, neg, rounded, rm, ctx);
            }

            // The exact quotient is strictly between the quotients of the
            // smallest and the largest operands that truncate to at and bt.
            let den_hi = if b_exact { bt.clone() } else { &bt + &one };
            let (q_lo, _) = num.div_rem(&den_hi);
            let mut num_hi = if a_exact { at } else { &at + &one };
            num_hi.shift_left(s);
            let (mut q_hi, _) = num_hi.div_rem(&bt);
            q_hi.inplace_add(&one);

            if let Some(rounded) = round_bounds(&q_lo, &q_hi, unit, neg, prec, rm) {
                return finish(prec, neg, rounded, rm, ctx);
            }
            w *= 2;
        }
    }

    /// Computes the binary operation `op` on `a` and `b`.
    fn binary_values(
        op: BinaryOp,
        prec: usize,
        a: &Float,
        b: &Float,
        rm: RoundingMode,
        ctx: &mut Context,
    ) -> (Float, Ordering) {
        match op {
            BinaryOp::Add => Self::add_sub(prec, a, b, false, rm, ctx),
            BinaryOp::Sub => Self::add_sub(prec, a, b, true, rm, ctx),
            BinaryOp::Mul => Self::mul_values(prec, a, b, rm, ctx),
            BinaryOp::Div => Self::div_values(prec, a, b, rm, ctx),
        }
    }

    /// Compute `op(a, b)`, rounded with `rm` to the precision of self, and
    /// store it in self. Either operand may be the destination itself.
    /// Returns the ternary value.
    ///
    /// # Examples
    ///
    /// ```
    ///    use mpround::{BinaryOp, Context, Float, Operand, RoundingMode};
    ///
    ///    let mut ctx = Context::default();
    ///    let mut x = Float::from_u64(10, 3);
    ///    let rm = RoundingMode::NearestTiesToEven;
    ///    // x = x * x
    ///    x.apply(BinaryOp::Mul, Operand::Dest, Operand::Dest, rm, &mut ctx);
    ///    assert_eq!(x.as_f64(), 9.0);
    /// ```
    pub fn apply(
        &mut self,
        op: BinaryOp,
        a: Operand,
        b: Operand,
        rm: RoundingMode,
        ctx: &mut Context,
    ) -> Ordering {
        let prec = self.get_prec();
        let (res, t) = {
            let this: &Float = self;
            Self::binary_values(op, prec, a.resolve(this), b.resolve(this), rm, ctx)
        };
        self.commit(res);
        t
    }

    /// Set self to a+b. Returns the ternary value.
    pub fn set_add(
        &mut self,
        a: &Float,
        b: &Float,
        rm: RoundingMode,
        ctx: &mut Context,
    ) -> Ordering {
        let (res, t) = Self::add_sub(self.get_prec(), a, b, false, rm, ctx);
        self.commit(res);
        t
    }

    /// Set self to a-b. Returns the ternary value.
    pub fn set_sub(
        &mut self,
        a: &Float,
        b: &Float,
        rm: RoundingMode,
        ctx: &mut Context,
    ) -> Ordering {
        let (res, t) = Self::add_sub(self.get_prec(), a, b, true, rm, ctx);
        self.commit(res);
        t
    }

    /// Set self to a*b. Returns the ternary value.
    pub fn set_mul(
        &mut self,
        a: &Float,
        b: &Float,
        rm: RoundingMode,
        ctx: &mut Context,
    ) -> Ordering {
        let (res, t) = Self::mul_values(self.get_prec(), a, b, rm, ctx);
        self.commit(res);
        t
    }

    /// Set self to a/b. Returns the ternary value.
    pub fn set_div(
        &mut self,
        a: &Float,
        b: &Float,
        rm: RoundingMode,
        ctx: &mut Context,
    ) -> Ordering {
        let (res, t) = Self::div_values(self.get_prec(), a, b, rm, ctx);
        self.commit(res);
        t
    }

    /// Computes self += rhs.
    pub fn add_assign_rm(
        &mut self,
        rhs: &Float,
        rm: RoundingMode,
        ctx: &mut Context,
    ) -> Ordering {
        self.apply(BinaryOp::Add, Operand::Dest, Operand::Value(rhs), rm, ctx)
    }

    /// Computes self -= rhs.
    pub fn sub_assign_rm(
        &mut self,
        rhs: &Float,
        rm: RoundingMode,
        ctx: &mut Context,
    ) -> Ordering {
        self.apply(BinaryOp::Sub, Operand::Dest, Operand::Value(rhs), rm, ctx)
    }

    /// Computes self *= rhs.
    pub fn mul_assign_rm(
        &mut self,
        rhs: &Float,
        rm: RoundingMode,
        ctx: &mut Context,
    ) -> Ordering {
        self.apply(BinaryOp::Mul, Operand::Dest, Operand::Value(rhs), rm, ctx)
    }

    /// Computes self /= rhs.
    pub fn div_assign_rm(
        &mut self,
        rhs: &Float,
        rm: RoundingMode,
        ctx: &mut Context,
    ) -> Ordering {
        self.apply(BinaryOp::Div, Operand::Dest, Operand::Value(rhs), rm, ctx)
    }
}

/// The operators compute at the larger precision of the operands, round to
/// nearest-even and use the default exponent range.
macro_rules! declare_operator {
    ($trait_name:ident, $func_name:ident, $op:expr) => {
        impl $trait_name<&Float> for &Float {
            type Output = Float;

            fn $func_name(self, rhs: &Float) -> Float {
                let prec = self.get_prec().max(rhs.get_prec());
                let mut ctx = Context::default();
                let rm = RoundingMode::NearestTiesToEven;
                Float::binary_values($op, prec, self, rhs, rm, &mut ctx).0
            }
        }
    };
}

declare_operator!(Add, add, BinaryOp::Add);
declare_operator!(Sub, sub, BinaryOp::Sub);
declare_operator!(Mul, mul, BinaryOp::Mul);
declare_operator!(Div, div, BinaryOp::Div);

impl Neg for &Float {
    type Output = Float;

    fn neg(self) -> Float {
        Float::neg(self)
    }
}

#[cfg(test)]
use crate::cmp2::reference_cancel;
#[cfg(test)]
use crate::utils::{get_special_test_values, Lfsr};

/// Returns true if the two floats have the same representation.
#[cfg(test)]
pub(crate) fn same_bits(a: &Float, b: &Float) -> bool {
    if a.get_category() != b.get_category() || a.get_prec() != b.get_prec() {
        return false;
    }
    match a.get_category() {
        Category::NaN => true,
        Category::Normal => {
            a.get_sign() == b.get_sign()
                && a.get_exp() == b.get_exp()
                && a.get_mantissa() == b.get_mantissa()
        }
        _ => a.get_sign() == b.get_sign(),
    }
}

/// Returns a random f64 with a moderate exponent, so that sums and products
/// don't reach the subnormal range.
#[cfg(test)]
fn random_f64(lfsr: &mut Lfsr) -> f64 {
    let exp = 1023 - 100 + lfsr.below(200);
    let frac = lfsr.get64() & ((1 << 52) - 1);
    let sign = lfsr.get64() & (1 << 63);
    f64::from_bits(sign | (exp << 52) | frac)
}

#[cfg(test)]
fn f64_op(op: BinaryOp, a: f64, b: f64) -> f64 {
    match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div => a / b,
    }
}

#[cfg(test)]
fn float_op(op: BinaryOp, a: f64, b: f64) -> f64 {
    let mut ctx = Context::default();
    let a = Float::from_f64(53, a);
    let b = Float::from_f64(53, b);
    let mut r = Float::new(53);
    r.apply(
        op,
        Operand::Value(&a),
        Operand::Value(&b),
        RoundingMode::NearestTiesToEven,
        &mut ctx,
    );
    r.as_f64()
}

#[cfg(test)]
const OPS: [BinaryOp; 4] = [BinaryOp::Add, BinaryOp::Sub, BinaryOp::Mul, BinaryOp::Div];

#[test]
fn test_add_simple() {
    let mut ctx = Context::default();
    let rm = RoundingMode::NearestTiesToEven;
    let a = Float::from_u64(64, 1);
    let b = Float::from_u64(64, 2);
    let mut c = Float::new(64);
    assert_eq!(c.set_add(&a, &b, rm, &mut ctx), Ordering::Equal);
    assert_eq!(c.as_f64(), 3.0);
    assert_eq!(c.set_sub(&a, &b, rm, &mut ctx), Ordering::Equal);
    assert_eq!(c.as_f64(), -1.0);
    assert_eq!(c.set_sub(&b, &a, rm, &mut ctx), Ordering::Equal);
    assert_eq!(c.as_f64(), 1.0);
    assert!(ctx.flags().is_empty());

    // 255 + 1 = 256 carries into a new leading bit.
    let a = Float::from_u64(8, 255);
    let mut c = Float::new(8);
    assert_eq!(c.set_add(&a, &Float::one(2, false), rm, &mut ctx), Ordering::Equal);
    assert_eq!(c.as_f64(), 256.0);
    // 255 + 2 = 257 needs nine bits.
    let two = Float::from_u64(2, 2);
    assert_eq!(c.set_add(&a, &two, rm, &mut ctx), Ordering::Less);
    assert_eq!(c.as_f64(), 256.0);
    let t = c.set_add(&a, &two, RoundingMode::Positive, &mut ctx);
    assert_eq!(t, Ordering::Greater);
    assert_eq!(c.as_f64(), 258.0);
}

#[test]
fn test_tiny_addend_is_inexact() {
    let mut ctx = Context::default();
    let one = Float::from_u64(53, 1);
    let tiny = Float::from_f64(53, f64::from_bits(1)); // 2^-1074
    let mut r = Float::new(53);
    let t = r.set_add(&one, &tiny, RoundingMode::NearestTiesToEven, &mut ctx);
    assert_eq!(r.as_f64(), 1.0);
    assert_eq!(t, Ordering::Less);
    assert!(ctx.is_inexact());

    let t = r.set_add(&one, &tiny, RoundingMode::Positive, &mut ctx);
    assert_eq!(t, Ordering::Greater);
    assert_eq!(r.as_f64(), 1.0 + f64::EPSILON);
    let t = r.set_sub(&one, &tiny, RoundingMode::NearestTiesToEven, &mut ctx);
    assert_eq!(t, Ordering::Greater);
    assert_eq!(r.as_f64(), 1.0);
    let t = r.set_sub(&one, &tiny, RoundingMode::Zero, &mut ctx);
    assert_eq!(t, Ordering::Less);
    assert_eq!(r.as_f64(), 1.0 - f64::EPSILON / 2.0);
}

#[test]
fn test_signed_zeros() {
    use RoundingMode::*;
    let mut ctx = Context::default();
    let pz = Float::zero(10, false);
    let nz = Float::zero(10, true);
    let mut r = Float::new(10);
    for rm in [NearestTiesToEven, NearestTiesToAway, Zero, Positive, Negative] {
        r.set_add(&pz, &pz, rm, &mut ctx);
        assert!(r.is_zero() && !r.is_negative());
        r.set_add(&nz, &nz, rm, &mut ctx);
        assert!(r.is_zero() && r.is_negative());
        r.set_add(&pz, &nz, rm, &mut ctx);
        assert!(r.is_zero());
        assert_eq!(r.is_negative(), rm == Negative);
        r.set_sub(&nz, &nz, rm, &mut ctx);
        assert!(r.is_zero());
        assert_eq!(r.is_negative(), rm == Negative);
        r.set_sub(&pz, &nz, rm, &mut ctx);
        assert!(r.is_zero() && !r.is_negative());
    }

    // Exact cancellation.
    let x = Float::from_f64(80, 1.25);
    let y = Float::from_f64(30, -1.25);
    let t = r.set_add(&x, &y, Positive, &mut ctx);
    assert_eq!(t, Ordering::Equal);
    assert!(r.is_zero() && !r.is_negative());
    r.set_add(&x, &y, Negative, &mut ctx);
    assert!(r.is_zero() && r.is_negative());
    r.set_sub(&y, &y, NearestTiesToEven, &mut ctx);
    assert!(r.is_zero() && !r.is_negative());
    assert!(!ctx.is_inexact());
}

#[test]
fn test_add_special_values() {
    let mut ctx = Context::default();
    let rm = RoundingMode::NearestTiesToEven;
    let inf = Float::inf(10, false);
    let ninf = Float::inf(10, true);
    let one = Float::one(10, false);
    let mut r = Float::new(10);
    r.set_add(&inf, &one, rm, &mut ctx);
    assert!(r.is_inf() && !r.is_negative());
    r.set_sub(&one, &inf, rm, &mut ctx);
    assert!(r.is_inf() && r.is_negative());
    assert!(!ctx.is_nan());
    r.set_add(&inf, &ninf, rm, &mut ctx);
    assert!(r.is_nan());
    assert!(ctx.is_nan());
    r.set_sub(&ninf, &inf, rm, &mut ctx);
    assert!(r.is_inf() && r.is_negative());
    r.set_add(&Float::zero(3, true), &one, rm, &mut ctx);
    assert_eq!(r.as_f64(), 1.0);
    r.set_sub(&Float::zero(3, true), &one, rm, &mut ctx);
    assert_eq!(r.as_f64(), -1.0);
}

#[test]
fn test_special_values_vs_f64() {
    let values = get_special_test_values();
    for op in OPS {
        for a in values {
            for b in values {
                let expected = f64_op(op, a, b);
                let res = float_op(op, a, b);
                if expected.is_nan() {
                    assert!(res.is_nan());
                    continue;
                }
                // The hardware result went through the subnormal range.
                if expected.is_subnormal()
                    || (expected == 0.0 && a != 0.0 && b.is_finite())
                {
                    continue;
                }
                assert_eq!(res.to_bits(), expected.to_bits(), "{} {:?} {}", a, op, b);
            }
        }
    }
}

#[test]
fn test_random_vs_f64() {
    let mut lfsr = Lfsr::new();
    for _ in 0..5000 {
        let a = random_f64(&mut lfsr);
        let b = random_f64(&mut lfsr);
        for op in OPS {
            let expected = f64_op(op, a, b);
            if expected.is_subnormal() {
                continue;
            }
            let res = float_op(op, a, b);
            assert_eq!(res.to_bits(), expected.to_bits(), "{} {:?} {}", a, op, b);
        }
    }

    // Values that are close to each other cancel.
    for _ in 0..5000 {
        let a = random_f64(&mut lfsr);
        let b = f64::from_bits(a.to_bits() ^ (lfsr.get64() & 0xffff));
        for op in [BinaryOp::Add, BinaryOp::Sub] {
            let expected = f64_op(op, a, -b);
            let res = float_op(op, a, -b);
            assert_eq!(res.to_bits(), expected.to_bits(), "{} {:?} {}", a, op, b);
        }
    }
}

/// Round the exact sum of two normal values with big integers.
#[cfg(test)]
fn reference_add(
    prec: usize,
    a: &Float,
    b: &Float,
    rm: RoundingMode,
) -> Option<(bool, i64, alloc::vec::Vec<u64>, Ordering)> {
    let l = low_end(a).min(low_end(b));
    let mut x = BigInt::from_limbs(a.get_mantissa());
    x.shift_left((low_end(a) - l) as usize);
    let mut y = BigInt::from_limbs(b.get_mantissa());
    y.shift_left((low_end(b) - l) as usize);
    let (s, neg) = if a.get_sign() == b.get_sign() {
        (&x + &y, a.get_sign())
    } else if x > y {
        (&x - &y, a.get_sign())
    } else {
        (&y - &x, b.get_sign())
    };
    if s.is_zero() {
        return None;
    }
    let (e, m, t) = round_integer(&s, false, l, neg, prec, rm);
    Some((neg, e, m, t))
}

#[test]
fn test_add_sub_vs_exact() {
    use RoundingMode::*;
    let modes = [NearestTiesToEven, NearestTiesToAway, Zero, Positive, Negative];
    let mut lfsr = Lfsr::new_with_seed(5);
    let mut ctx = Context::default();
    for i in 0..3000 {
        let a = lfsr.float(400, 4);
        // Every other pair has close magnitudes and opposite signs.
        let b = if i % 2 == 0 {
            lfsr.float(400, 200)
        } else {
            let pb = 2 + lfsr.below(400) as usize;
            let mut m = alloc::vec![0; limbs::limbs_for(pb)];
            let n = m.len();
            let k = n.min(a.get_mantissa().len());
            let am = a.get_mantissa();
            m[n - k..].copy_from_slice(&am[am.len() - k..]);
            m[0] ^= lfsr.get64();
            m[n - 1] |= 1 << 63;
            limbs::mask_low(&mut m, n * LIMB_BITS - pb);
            let e = a.get_exp() + lfsr.below(3) as i64 - 1;
            Float::from_raw_parts(pb, !a.get_sign(), e, &m)
        };
        let prec = 2 + lfsr.below(300) as usize;
        let rm = modes[lfsr.below(5) as usize];
        let mut r = Float::new(prec);
        let t = r.set_add(&a, &b, rm, &mut ctx);
        match reference_add(prec, &a, &b, rm) {
            None => assert!(r.is_zero()),
            Some((neg, e, m, rt)) => {
                assert_eq!(t, rt);
                assert_eq!(r.get_sign(), neg);
                assert_eq!(r.get_exp(), e);
                assert_eq!(r.get_mantissa(), &m[..]);
            }
        }
    }
}

#[test]
fn test_add_sub_limb_boundaries() {
    use RoundingMode::*;
    let modes = [NearestTiesToEven, NearestTiesToAway, Zero, Positive, Negative];
    let a_precs = [64, 65, 129, 3000];
    let b_precs = [2, 63, 64, 65, 127, 128, 129, 192, 1000, 4000];
    let exp_diffs = [0, 1, -1, 63, 64, 65, -64, -65, 128];
    let precs = [2, 3, 7, 10, 53, 64, 65];
    let mut lfsr = Lfsr::new_with_seed(17);
    let mut ctx = Context::default();
    let mut step = 0;
    for pa in a_precs {
        for pb in b_precs {
            for d in exp_diffs {
                let a = lfsr.float_with_prec(pa, 0);
                // Cycle through an unrelated mantissa, one that shares the
                // top bits of `a` and differs in its low word, and one that
                // is a truncated copy of `a`.
                let style = step % 3;
                step += 1;
                let m = if style == 0 {
                    lfsr.mantissa(pb)
                } else {
                    let mut m = alloc::vec![0; limbs::limbs_for(pb)];
                    let n = m.len();
                    let am = a.get_mantissa();
                    let k = n.min(am.len());
                    m[n - k..].copy_from_slice(&am[am.len() - k..]);
                    if style == 1 {
                        m[0] ^= lfsr.get64();
                    }
                    m[n - 1] |= 1 << 63;
                    limbs::mask_low(&mut m, n * LIMB_BITS - pb);
                    m
                };
                let b = Float::from_raw_parts(pb, !a.get_sign(), d, &m);

                let (ord, cancel) = cmp2(&a, &b);
                if ord != Ordering::Equal {
                    assert_eq!(cancel, reference_cancel(&a, &b), "{} {}", a, b);
                }

                for prec in precs {
                    let rm = modes[step % modes.len()];
                    let mut r = Float::new(prec);
                    let t = r.set_add(&a, &b, rm, &mut ctx);
                    match reference_add(prec, &a, &b, rm) {
                        None => assert!(r.is_zero()),
                        Some((neg, e, m, rt)) => {
                            assert_eq!(t, rt, "{} + {} at {}", a, b, prec);
                            assert_eq!(r.get_sign(), neg);
                            assert_eq!(r.get_exp(), e);
                            assert_eq!(r.get_mantissa(), &m[..]);
                        }
                    }
                    let t = r.set_sub(&a, &b, rm, &mut ctx);
                    match reference_add(prec, &a, &b.neg(), rm) {
                        None => assert!(r.is_zero()),
                        Some((neg, e, m, rt)) => {
                            assert_eq!(t, rt, "{} - {} at {}", a, b, prec);
                            assert_eq!(r.get_sign(), neg);
                            assert_eq!(r.get_exp(), e);
                            assert_eq!(r.get_mantissa(), &m[..]);
                        }
                    }
                }
            }
        }
    }
}

#[test]
fn test_mul_exact_when_wide() {
    let mut lfsr = Lfsr::new_with_seed(9);
    let mut ctx = Context::default();
    for _ in 0..1000 {
        let a = lfsr.float(200, 50);
        let b = lfsr.float(200, 50);
        let prec = a.get_prec() + b.get_prec() + lfsr.below(10) as usize;
        let mut r = Float::new(prec);
        let t = r.set_mul(&a, &b, RoundingMode::Zero, &mut ctx);
        assert_eq!(t, Ordering::Equal);
        assert_eq!(r.is_negative(), a.is_negative() ^ b.is_negative());
    }
    assert!(!ctx.is_inexact());
}

#[test]
fn test_mul_special_values() {
    let mut ctx = Context::default();
    let rm = RoundingMode::NearestTiesToEven;
    let mut r = Float::new(5);
    r.set_mul(&Float::zero(5, true), &Float::inf(5, false), rm, &mut ctx);
    assert!(r.is_nan() && ctx.is_nan());
    r.set_mul(&Float::one(5, true), &Float::inf(5, true), rm, &mut ctx);
    assert!(r.is_inf() && !r.is_negative());
    r.set_mul(&Float::one(5, true), &Float::zero(5, false), rm, &mut ctx);
    assert!(r.is_zero() && r.is_negative());
}

#[test]
fn test_div_one_third() {
    let mut ctx = Context::default();
    let one = Float::from_u64(10, 1);
    let three = Float::from_u64(10, 3);
    let mut r = Float::new(4);
    let t = r.set_div(&one, &three, RoundingMode::Zero, &mut ctx);
    assert_eq!(t, Ordering::Less);
    assert_eq!(r.to_string(), "0.101p-1");
    assert!(r.as_f64() < 1.0 / 3.0);
    assert!(ctx.is_inexact());

    let t = r.set_div(&one, &three, RoundingMode::Positive, &mut ctx);
    assert_eq!(t, Ordering::Greater);
    assert!(r.as_f64() > 1.0 / 3.0);

    // An exact quotient.
    let t = r.set_div(&Float::from_u64(10, 12), &three, RoundingMode::Zero, &mut ctx);
    assert_eq!(t, Ordering::Equal);
    assert_eq!(r.as_f64(), 4.0);
}

#[test]
fn test_div_special_values() {
    let mut ctx = Context::default();
    let rm = RoundingMode::NearestTiesToEven;
    let mut r = Float::new(5);
    r.set_div(&Float::one(5, true), &Float::zero(5, false), rm, &mut ctx);
    assert!(r.is_inf() && r.is_negative());
    assert!(ctx.is_div_by_zero() && !ctx.is_nan());
    ctx.clear_flags();
    r.set_div(&Float::inf(5, true), &Float::zero(5, false), rm, &mut ctx);
    assert!(r.is_inf() && r.is_negative());
    assert!(!ctx.is_div_by_zero());
    r.set_div(&Float::zero(5, true), &Float::zero(5, false), rm, &mut ctx);
    assert!(r.is_nan() && ctx.is_nan());
    r.set_div(&Float::one(5, false), &Float::inf(5, true), rm, &mut ctx);
    assert!(r.is_zero() && r.is_negative());
}

/// Round the exact quotient of two normal values with big integers.
#[cfg(test)]
fn reference_div(
    prec: usize,
    a: &Float,
    b: &Float,
    rm: RoundingMode,
) -> (i64, alloc::vec::Vec<u64>, Ordering) {
    let x = BigInt::from_limbs(a.get_mantissa());
    let y = BigInt::from_limbs(b.get_mantissa());
    let s = prec + 2 + y.msb_index();
    let mut num = x.clone();
    num.shift_left(s);
    let (q, r) = num.div_rem(&y);
    let unit = low_end(a) - low_end(b) - s as i64;
    let neg = a.get_sign() ^ b.get_sign();
    round_integer(&q, !r.is_zero(), unit, neg, prec, rm)
}

#[test]
fn test_div_vs_exact() {
    use RoundingMode::*;
    let modes = [NearestTiesToEven, NearestTiesToAway, Zero, Positive, Negative];
    let mut lfsr = Lfsr::new_with_seed(17);
    let mut ctx = Context::default();
    for i in 0..1500 {
        // Wide operands and narrow results exercise the truncated path.
        let b = lfsr.float(900, 30);
        let a = if i % 3 == 0 {
            // Dividends that are exact multiples of the divisor.
            let q = lfsr.float(40, 3);
            let mut p = Float::new(b.get_prec() + q.get_prec());
            p.set_mul(&b, &q, Zero, &mut ctx);
            p
        } else {
            lfsr.float(900, 30)
        };
        let prec = 2 + lfsr.below(120) as usize;
        let rm = modes[lfsr.below(5) as usize];
        let mut r = Float::new(prec);
        let t = r.set_div(&a, &b, rm, &mut ctx);
        let (e, m, rt) = reference_div(prec, &a, &b, rm);
        assert_eq!(t, rt);
        assert_eq!(r.get_exp(), e);
        assert_eq!(r.get_mantissa(), &m[..]);
    }
}

#[test]
fn test_aliasing() {
    use RoundingMode::*;
    let mut lfsr = Lfsr::new_with_seed(23);
    let mut ctx = Context::default();
    for _ in 0..500 {
        let x = lfsr.float(300, 20);
        let y = lfsr.float(300, 20);
        let rm = [NearestTiesToEven, Zero, Positive][lfsr.below(3) as usize];
        for op in OPS {
            // f(x, x) with both operands aliased to the destination.
            let copy = x.clone();
            let mut expected = x.clone();
            let t0 = expected.apply(
                op,
                Operand::Value(&copy),
                Operand::Value(&copy),
                rm,
                &mut ctx,
            );
            let mut dest = x.clone();
            let t1 = dest.apply(op, Operand::Dest, Operand::Dest, rm, &mut ctx);
            assert_eq!(t0, t1);
            assert!(same_bits(&dest, &expected));

            // f(x, y) and f(y, x) with one aliased operand.
            let mut expected = x.clone();
            let t0 =
                expected.apply(op, Operand::Value(&copy), Operand::Value(&y), rm, &mut ctx);
            let mut dest = x.clone();
            let t1 = dest.apply(op, Operand::Dest, Operand::Value(&y), rm, &mut ctx);
            assert_eq!(t0, t1);
            assert!(same_bits(&dest, &expected));

            let mut expected = x.clone();
            let t0 =
                expected.apply(op, Operand::Value(&y), Operand::Value(&copy), rm, &mut ctx);
            let mut dest = x.clone();
            let t1 = dest.apply(op, Operand::Value(&y), Operand::Dest, rm, &mut ctx);
            assert_eq!(t0, t1);
            assert!(same_bits(&dest, &expected));
        }
    }
}

#[test]
fn test_assign_variants() {
    let mut ctx = Context::default();
    let rm = RoundingMode::NearestTiesToEven;
    let mut x = Float::from_u64(20, 6);
    let y = Float::from_u64(20, 4);
    x.add_assign_rm(&y, rm, &mut ctx);
    assert_eq!(x.as_f64(), 10.0);
    x.sub_assign_rm(&y, rm, &mut ctx);
    assert_eq!(x.as_f64(), 6.0);
    x.mul_assign_rm(&y, rm, &mut ctx);
    assert_eq!(x.as_f64(), 24.0);
    x.div_assign_rm(&y, rm, &mut ctx);
    assert_eq!(x.as_f64(), 6.0);
    assert_eq!(x.get_prec(), 20);
}

#[test]
fn test_operators() {
    let a = Float::from_f64(53, 8.0);
    let b = Float::from_f64(53, 2.0);
    assert_eq!((&a + &b).as_f64(), 10.0);
    assert_eq!((&a - &b).as_f64(), 6.0);
    assert_eq!((&a * &b).as_f64(), 16.0);
    assert_eq!((&a / &b).as_f64(), 4.0);
    assert_eq!((-&a).as_f64(), -8.0);

    // The result has the larger precision.
    let c = Float::from_u64(100, 1);
    let d = Float::from_u64(4, 3);
    assert_eq!((&c / &d).get_prec(), 100);
}

#[test]
fn test_famous_pentium4_bug() {
    // https://en.wikipedia.org/wiki/Pentium_FDIV_bug
    let a = Float::from_u64(128, 4_195_835);
    let b = Float::from_u64(128, 3_145_727);
    let res = &a / &b;
    assert_eq!(res.as_f64(), 4_195_835.0 / 3_145_727.0);
}
