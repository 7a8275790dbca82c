//! The exception flags and the exponent range that the arithmetic kernels
//! consult. There is no global state: every kernel receives the context
//! explicitly.

use core::cmp::Ordering;
use core::fmt;

use bitflags::bitflags;

use crate::float::{Direction, Float, RoundingMode, EXP_MAX, EXP_MIN};
use crate::round::apply_sign;

/// The lower bound of the default exponent range.
pub const EMIN_DEFAULT: i64 = 1 - (1 << 30);
/// The upper bound of the default exponent range.
pub const EMAX_DEFAULT: i64 = (1 << 30) - 1;

bitflags! {
    /// Sticky exception flags. Operations only ever set flags; they are
    /// cleared by the owner of the context.
    pub struct Flags: u32 {
        /// A nonzero result was rounded to zero or to the smallest value.
        const UNDERFLOW   = 1 << 0;
        /// A finite result was rounded to infinity or to the largest value.
        const OVERFLOW    = 1 << 1;
        /// An operation produced NaN.
        const NAN         = 1 << 2;
        /// A result differs from the exact value.
        const INEXACT     = 1 << 3;
        /// A finite nonzero value was divided by zero.
        const DIV_BY_ZERO = 1 << 4;
        /// A comparison involved NaN.
        const ERANGE      = 1 << 5;
    }
}

/// Returned when an exponent range can't be installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeError {
    /// The lower bound is above the upper bound.
    Empty { emin: i64, emax: i64 },
    /// A bound is outside of `[EXP_MIN, EXP_MAX]`.
    OutOfLimits(i64),
}

impl fmt::Display for RangeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RangeError::Empty { emin, emax } => {
                write!(f, "empty exponent range [{}, {}]", emin, emax)
            }
            RangeError::OutOfLimits(e) => {
                write!(f, "exponent {} is outside [{}, {}]", e, EXP_MIN, EXP_MAX)
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for RangeError {}

/// The environment of a sequence of operations: the exponent range of the
/// results and the accumulated exception flags.
#[derive(Debug, Clone)]
pub struct Context {
    emin: i64,
    emax: i64,
    flags: Flags,
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Context {
    /// Create a context with the default exponent range and no flags set.
    pub fn new() -> Self {
        Context {
            emin: EMIN_DEFAULT,
            emax: EMAX_DEFAULT,
            flags: Flags::empty(),
        }
    }

    pub fn get_emin(&self) -> i64 {
        self.emin
    }

    pub fn get_emax(&self) -> i64 {
        self.emax
    }

    /// Install the exponent range `[emin, emax]`. Normal results must satisfy
    /// `emin <= exp <= emax`.
    pub fn set_exponent_range(
        &mut self,
        emin: i64,
        emax: i64,
    ) -> Result<(), RangeError> {
        for e in [emin, emax] {
            if !(EXP_MIN..=EXP_MAX).contains(&e) {
                return Err(RangeError::OutOfLimits(e));
            }
        }
        if emin > emax {
            return Err(RangeError::Empty { emin, emax });
        }
        self.emin = emin;
        self.emax = emax;
        Ok(())
    }

    /// Returns the accumulated flags.
    pub fn flags(&self) -> Flags {
        self.flags
    }

    pub fn clear_flags(&mut self) {
        self.flags = Flags::empty();
    }

    /// Set the flags in `f`.
    pub fn raise(&mut self, f: Flags) {
        self.flags |= f;
    }

    pub fn is_underflow(&self) -> bool {
        self.flags.contains(Flags::UNDERFLOW)
    }

    pub fn is_overflow(&self) -> bool {
        self.flags.contains(Flags::OVERFLOW)
    }

    pub fn is_nan(&self) -> bool {
        self.flags.contains(Flags::NAN)
    }

    pub fn is_inexact(&self) -> bool {
        self.flags.contains(Flags::INEXACT)
    }

    pub fn is_div_by_zero(&self) -> bool {
        self.flags.contains(Flags::DIV_BY_ZERO)
    }

    pub fn is_erange(&self) -> bool {
        self.flags.contains(Flags::ERANGE)
    }

    /// Compare two floats. Comparisons with NaN are unordered and raise the
    /// ERANGE flag.
    pub fn compare(&mut self, a: &Float, b: &Float) -> Option<Ordering> {
        let res = a.partial_cmp(b);
        if res.is_none() {
            self.raise(Flags::ERANGE);
        }
        res
    }

    /// Fit a rounded result into the exponent range, and account for the
    /// rounding in the flags. `ternary` is the direction in which the stored
    /// value `x` differs from the exact value. Returns the direction in which
    /// the final value differs from the exact value.
    pub fn check_range(
        &mut self,
        x: &mut Float,
        ternary: Ordering,
        rm: RoundingMode,
    ) -> Ordering {
        if !x.is_normal() {
            if ternary != Ordering::Equal {
                self.raise(Flags::INEXACT);
            }
            return ternary;
        }
        let neg = x.get_sign();
        let dir = rm.fold(neg);
        let exp = x.get_exp();

        if exp > self.emax {
            self.raise(Flags::OVERFLOW | Flags::INEXACT);
            if dir == Direction::Zero {
                x.make_max(neg, self.emax);
                return apply_sign(Ordering::Less, neg);
            }
            x.make_inf(neg);
            return apply_sign(Ordering::Greater, neg);
        }

        if exp < self.emin {
            self.raise(Flags::UNDERFLOW | Flags::INEXACT);
            // Half of the smallest value is 0.1 * 2^(emin-1).
            let to_min = match dir {
                Direction::Zero => false,
                Direction::Away => true,
                _ if exp < self.emin - 1 => false,
                _ if !x.is_power_of_two() => true,
                _ => {
                    // The stored value is exactly half of the smallest value.
                    match apply_sign(ternary, neg) {
                        Ordering::Less => true,
                        Ordering::Greater => false,
                        Ordering::Equal => dir == Direction::NearestAway,
                    }
                }
            };
            if to_min {
                x.make_min(neg, self.emin);
                return apply_sign(Ordering::Greater, neg);
            }
            x.make_zero(neg);
            return apply_sign(Ordering::Less, neg);
        }

        if ternary != Ordering::Equal {
            self.raise(Flags::INEXACT);
        }
        ternary
    }
}

#[cfg(test)]
fn power_of_two(prec: usize, sign: bool, exp: i64) -> Float {
    let mut x = Float::new(prec);
    x.make_min(sign, exp);
    x
}

#[test]
fn test_exponent_range() {
    let mut ctx = Context::default();
    assert_eq!(ctx.get_emin(), EMIN_DEFAULT);
    assert_eq!(ctx.get_emax(), EMAX_DEFAULT);
    assert_eq!(
        ctx.set_exponent_range(10, 3),
        Err(RangeError::Empty { emin: 10, emax: 3 })
    );
    assert_eq!(
        ctx.set_exponent_range(EXP_MIN - 1, 3),
        Err(RangeError::OutOfLimits(EXP_MIN - 1))
    );
    assert!(ctx.set_exponent_range(EXP_MIN, EXP_MAX).is_ok());
    assert!(ctx.set_exponent_range(-7, -7).is_ok());
    assert_eq!(ctx.get_emin(), -7);
    assert_eq!(ctx.get_emax(), -7);
}

#[test]
fn test_flags() {
    let mut ctx = Context::new();
    assert!(ctx.flags().is_empty());
    ctx.raise(Flags::NAN | Flags::INEXACT);
    assert!(ctx.is_nan() && ctx.is_inexact());
    assert!(!ctx.is_overflow() && !ctx.is_underflow());
    ctx.clear_flags();
    assert!(ctx.flags().is_empty());

    let one = power_of_two(5, false, 1);
    assert_eq!(ctx.compare(&one, &Float::nan(5)), None);
    assert!(ctx.is_erange());
}

#[test]
fn test_overflow() {
    use RoundingMode::*;
    let mut ctx = Context::new();
    ctx.set_exponent_range(-10, 10).unwrap();

    let mut x = power_of_two(8, false, 11);
    let t = ctx.check_range(&mut x, Ordering::Equal, NearestTiesToEven);
    assert!(x.is_inf() && !x.is_negative());
    assert_eq!(t, Ordering::Greater);
    assert!(ctx.is_overflow() && ctx.is_inexact());

    let mut x = power_of_two(8, true, 11);
    let t = ctx.check_range(&mut x, Ordering::Equal, Negative);
    assert!(x.is_inf() && x.is_negative());
    assert_eq!(t, Ordering::Less);

    // Rounding toward zero saturates to the largest finite value.
    let mut x = power_of_two(8, true, 11);
    let t = ctx.check_range(&mut x, Ordering::Equal, Positive);
    assert!(x.is_normal());
    assert_eq!(x.get_exp(), 10);
    assert_eq!(x.get_mantissa(), &[0xff << 56]);
    assert_eq!(t, Ordering::Greater);
}

#[test]
fn test_underflow() {
    use RoundingMode::*;
    let mut ctx = Context::new();
    ctx.set_exponent_range(-10, 10).unwrap();

    // Far below the range.
    let mut x = power_of_two(8, false, -20);
    let t = ctx.check_range(&mut x, Ordering::Less, NearestTiesToEven);
    assert!(x.is_zero() && !x.is_negative());
    assert_eq!(t, Ordering::Less);
    assert!(ctx.is_underflow() && ctx.is_inexact());

    let mut x = power_of_two(8, true, -20);
    let t = ctx.check_range(&mut x, Ordering::Equal, Negative);
    assert!(x.is_normal() && x.is_negative());
    assert_eq!(x.get_exp(), -10);
    assert_eq!(t, Ordering::Less);

    // Exactly half of the smallest value: ties to even go to zero.
    let mut x = power_of_two(8, false, -11);
    ctx.check_range(&mut x, Ordering::Equal, NearestTiesToEven);
    assert!(x.is_zero());
    let mut x = power_of_two(8, false, -11);
    ctx.check_range(&mut x, Ordering::Equal, NearestTiesToAway);
    assert!(x.is_normal());

    // The exact value was above the half, and was rounded down to it.
    let mut x = power_of_two(8, true, -11);
    let t = ctx.check_range(&mut x, Ordering::Greater, NearestTiesToEven);
    assert!(x.is_normal() && x.is_negative());
    assert_eq!(t, Ordering::Less);

    // Above the half.
    let mut x = Float::from_raw_parts(8, false, -11, &[0xc0 << 56]);
    ctx.check_range(&mut x, Ordering::Equal, NearestTiesToEven);
    assert!(x.is_normal());
    assert_eq!(x.get_exp(), -10);
}

#[test]
fn test_in_range() {
    let mut ctx = Context::new();
    let mut x = power_of_two(8, false, 3);
    let t = ctx.check_range(&mut x, Ordering::Equal, RoundingMode::Zero);
    assert_eq!(t, Ordering::Equal);
    assert!(ctx.flags().is_empty());
    let t = ctx.check_range(&mut x, Ordering::Less, RoundingMode::Zero);
    assert_eq!(t, Ordering::Less);
    assert_eq!(ctx.flags(), Flags::INEXACT);
    assert_eq!(x.get_exp(), 3);
}
