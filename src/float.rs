extern crate alloc;

use alloc::vec;
use alloc::vec::Vec;
use core::cmp::Ordering;
use core::fmt;

use crate::cmp2::cmp_abs;
use crate::limbs::{self, Limb, LIMB_BITS};

/// The smallest precision that a float may have.
pub const PREC_MIN: usize = 2;
/// The largest precision that a float may have.
pub const PREC_MAX: usize = 1 << 40;

/// The smallest exponent that an exponent range may allow.
pub const EXP_MIN: i64 = 1 - (1 << 61);
/// The largest exponent that an exponent range may allow.
pub const EXP_MAX: i64 = (1 << 61) - 1;

/// Defines the supported rounding modes.
/// See IEEE754-2019 Section 4.3 Rounding-direction attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundingMode {
    NearestTiesToEven,
    NearestTiesToAway,
    Zero,
    Positive,
    Negative,
    Away,
}

/// The rounding direction after the sign of the value is known. Directed
/// modes collapse into toward-zero or away-from-zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Direction {
    Zero,
    Away,
    NearestEven,
    NearestAway,
}

impl RoundingMode {
    /// Fold the mode with the sign of the value (`neg` = negative).
    pub(crate) fn fold(&self, neg: bool) -> Direction {
        match self {
            RoundingMode::NearestTiesToEven => Direction::NearestEven,
            RoundingMode::NearestTiesToAway => Direction::NearestAway,
            RoundingMode::Zero => Direction::Zero,
            RoundingMode::Away => Direction::Away,
            RoundingMode::Positive if neg => Direction::Zero,
            RoundingMode::Positive => Direction::Away,
            RoundingMode::Negative if neg => Direction::Away,
            RoundingMode::Negative => Direction::Zero,
        }
    }

    /// Create a rounding mode from a string, if valid, or return none.
    pub fn from_string(s: &str) -> Option<Self> {
        let modes = [
            RoundingMode::NearestTiesToEven,
            RoundingMode::NearestTiesToAway,
            RoundingMode::Zero,
            RoundingMode::Positive,
            RoundingMode::Negative,
            RoundingMode::Away,
        ];
        modes.into_iter().find(|m| m.as_string() == s)
    }

    /// Return a string that represents the rounding mode.
    pub fn as_string(&self) -> &'static str {
        match self {
            RoundingMode::NearestTiesToEven => "NearestTiesToEven",
            RoundingMode::NearestTiesToAway => "NearestTiesToAway",
            RoundingMode::Zero => "Zero",
            RoundingMode::Positive => "Positive",
            RoundingMode::Negative => "Negative",
            RoundingMode::Away => "Away",
        }
    }
}

/// Declare the different categories of the floating point number. These
/// categories are internal to the float, and can be access by the acessors:
/// is_inf, is_zero, is_nan, is_normal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Infinity,
    NaN,
    Normal,
    Zero,
}

/// This is the main data structure of this library. It represents a binary
/// floating-point number with a fixed precision.
///
/// A normal value is `(-1)^sign * 0.m * 2^exp`, where `m` is the mantissa. The
/// mantissa holds `ceil(prec / 64)` words, least significant word first, and is
/// aligned to the left: the top bit of the last word is always set, and the
/// `64 * len - prec` lowest bits of the first word are always zero.
///
/// The precision is fixed when the float is created and is only changed by
/// [`Float::set_prec`] and [`Float::prec_round`]. Every arithmetic operation
/// rounds its result into the precision of the destination.
///
/// # Examples
///
/// ```
///    use mpround::{Context, Float, RoundingMode};
///    use core::cmp::Ordering;
///
///    let mut ctx = Context::default();
///    let one = Float::from_u64(10, 1);
///    let three = Float::from_u64(10, 3);
///    let mut x = Float::new(4);
///    let t = x.set_div(&one, &three, RoundingMode::Zero, &mut ctx);
///    assert_eq!(t, Ordering::Less);
///    assert!(ctx.is_inexact());
/// ```
#[derive(Debug, Clone)]
pub struct Float {
    // The number of significant bits in the mantissa.
    prec: usize,
    // The Sign bit. True means negative.
    sign: bool,
    // The Exponent, for the value 0.1xxx * 2^exp.
    exp: i64,
    // The significand, aligned to the left. Format [1xxxxxx000].
    mantissa: Vec<Limb>,
    // The kind of number this float represents.
    category: Category,
}

pub(crate) fn check_prec(prec: usize) {
    assert!(
        (PREC_MIN..=PREC_MAX).contains(&prec),
        "precision {} is out of range",
        prec
    );
}

impl Float {
    /// Allocate a new float with `prec` bits of precision. The value is NaN
    /// until something is stored into it.
    pub fn new(prec: usize) -> Self {
        check_prec(prec);
        Float {
            prec,
            sign: false,
            exp: 0,
            mantissa: vec![0; limbs::limbs_for(prec)],
            category: Category::NaN,
        }
    }

    fn singular(prec: usize, sign: bool, category: Category) -> Self {
        let mut x = Self::new(prec);
        x.sign = sign;
        x.category = category;
        x
    }

    /// Returns a new zero float.
    pub fn zero(prec: usize, sign: bool) -> Self {
        Self::singular(prec, sign, Category::Zero)
    }

    /// Returns a new infinity float.
    pub fn inf(prec: usize, sign: bool) -> Self {
        Self::singular(prec, sign, Category::Infinity)
    }

    /// Returns a new NaN float.
    pub fn nan(prec: usize) -> Self {
        Self::new(prec)
    }

    /// Returns a new float with the value one.
    pub fn one(prec: usize, sign: bool) -> Self {
        check_prec(prec);
        let mut m = vec![0; limbs::limbs_for(prec)];
        let last = m.len() - 1;
        m[last] = 1 << 63;
        Self::from_rounded(prec, sign, 1, m)
    }

    /// Create a normal float from its parts. The mantissa must have exactly
    /// `ceil(prec / 64)` words, the top bit set and the padding bits clear.
    pub fn from_raw_parts(
        prec: usize,
        sign: bool,
        exp: i64,
        mantissa: &[Limb],
    ) -> Self {
        let x = Self::from_rounded(prec, sign, exp, mantissa.to_vec());
        x.check_invariants();
        x
    }

    /// Wraps the output of the rounding kernel.
    pub(crate) fn from_rounded(
        prec: usize,
        sign: bool,
        exp: i64,
        mantissa: Vec<Limb>,
    ) -> Self {
        check_prec(prec);
        Float {
            prec,
            sign,
            exp,
            mantissa,
            category: Category::Normal,
        }
    }

    /// Change the precision of the float. The storage is reallocated and the
    /// previous value is discarded: the float becomes NaN. Use
    /// [`Float::prec_round`] to keep the value.
    pub fn set_prec(&mut self, prec: usize) {
        *self = Self::new(prec);
    }

    /// Returns the precision in bits.
    pub fn get_prec(&self) -> usize {
        self.prec
    }

    /// Returns true if the Float is negative
    pub fn is_negative(&self) -> bool {
        self.sign
    }

    /// Returns the sign of the float. True means negative.
    pub fn get_sign(&self) -> bool {
        self.sign
    }

    /// Update the sign of the float to `sign`. True means negative.
    pub fn set_sign(&mut self, sign: bool) {
        self.sign = sign
    }

    /// Returns the exponent of the float.
    pub fn get_exp(&self) -> i64 {
        self.exp
    }

    /// Returns the mantissa words of the float.
    pub fn get_mantissa(&self) -> &[Limb] {
        &self.mantissa
    }

    /// Returns the category of the float.
    pub fn get_category(&self) -> Category {
        self.category
    }

    /// Returns true if the Float is +-inf.
    pub fn is_inf(&self) -> bool {
        self.category == Category::Infinity
    }

    /// Returns true if the Float is a NaN.
    pub fn is_nan(&self) -> bool {
        self.category == Category::NaN
    }

    /// Returns true if the Float is a +- zero.
    pub fn is_zero(&self) -> bool {
        self.category == Category::Zero
    }

    /// Returns true if this number is normal (not Zero, Nan, Inf).
    pub fn is_normal(&self) -> bool {
        self.category == Category::Normal
    }

    /// Returns -1, 0 or 1 for negative, zero and positive values, and none
    /// for NaN.
    pub fn sgn(&self) -> Option<i32> {
        match self.category {
            Category::NaN => None,
            Category::Zero => Some(0),
            _ => Some(if self.sign { -1 } else { 1 }),
        }
    }

    pub(crate) fn make_zero(&mut self, sign: bool) {
        self.category = Category::Zero;
        self.sign = sign;
    }

    pub(crate) fn make_inf(&mut self, sign: bool) {
        self.category = Category::Infinity;
        self.sign = sign;
    }

    /// Store the largest finite magnitude 0.11..1 * 2^exp.
    pub(crate) fn make_max(&mut self, sign: bool, exp: i64) {
        for w in self.mantissa.iter_mut() {
            *w = u64::MAX;
        }
        let pad = self.mantissa.len() * LIMB_BITS - self.prec;
        limbs::mask_low(&mut self.mantissa, pad);
        self.category = Category::Normal;
        self.sign = sign;
        self.exp = exp;
    }

    /// Store the smallest positive magnitude 0.1 * 2^exp.
    pub(crate) fn make_min(&mut self, sign: bool, exp: i64) {
        for w in self.mantissa.iter_mut() {
            *w = 0;
        }
        let last = self.mantissa.len() - 1;
        self.mantissa[last] = 1 << 63;
        self.category = Category::Normal;
        self.sign = sign;
        self.exp = exp;
    }

    /// Returns true if the mantissa is 0.1000..0, a power of two.
    pub(crate) fn is_power_of_two(&self) -> bool {
        let last = self.mantissa.len() - 1;
        self.mantissa[last] == 1 << 63 && limbs::is_zero(&self.mantissa[..last])
    }

    /// Move the value of `res` into self, reusing the storage of self. Both
    /// floats must have the same precision.
    pub(crate) fn commit(&mut self, res: Float) {
        debug_assert_eq!(self.prec, res.prec, "destination precision changed");
        if res.is_normal() {
            self.mantissa.copy_from_slice(&res.mantissa);
        }
        self.sign = res.sign;
        self.exp = res.exp;
        self.category = res.category;
        #[cfg(debug_assertions)]
        self.check_invariants();
    }

    /// Verify the representation invariants, and panic if they are broken.
    pub fn check_invariants(&self) {
        assert!((PREC_MIN..=PREC_MAX).contains(&self.prec));
        assert_eq!(self.mantissa.len(), limbs::limbs_for(self.prec));
        if !self.is_normal() {
            return;
        }
        assert!(
            (EXP_MIN..=EXP_MAX).contains(&self.exp),
            "exponent {} is out of range",
            self.exp
        );
        let last = self.mantissa.len() - 1;
        assert!(self.mantissa[last] >> 63 == 1, "mantissa is not normalized");
        let pad = self.mantissa.len() * LIMB_BITS - self.prec;
        assert!(
            !limbs::low_bits_nonzero(&self.mantissa, pad),
            "padding bits are not clear"
        );
    }

    /// Prints the number using the internal representation.
    #[cfg(feature = "std")]
    pub fn dump(&self) {
        use std::println;
        println!("{}", self.as_internal_str());
    }

    /// Returns the internal representation as a string, for debugging.
    pub fn as_internal_str(&self) -> alloc::string::String {
        use alloc::format;
        let sign = if self.sign { "-" } else { "+" };
        match self.category {
            Category::NaN => format!("[{}NaN]", sign),
            Category::Infinity => format!("[{}Inf]", sign),
            Category::Zero => format!("[{}0.0]", sign),
            Category::Normal => {
                let mut m = alloc::string::String::new();
                for w in self.mantissa.iter().rev() {
                    m.push_str(&format!("{:064b}", w));
                }
                m.truncate(self.prec);
                format!("FP[{} E={:4} P={} M=0b{}]", sign, self.exp, self.prec, m)
            }
        }
    }
}

/// Prints the value in binary scientific notation, for example `-0.1011p+3`
/// for -5.5. Trailing zero bits are dropped.
impl fmt::Display for Float {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.sign { "-" } else { "" };
        match self.category {
            Category::NaN => write!(f, "nan"),
            Category::Infinity => write!(f, "{}inf", sign),
            Category::Zero => write!(f, "{}0", sign),
            Category::Normal => {
                write!(f, "{}0.", sign)?;
                let mut bits = alloc::string::String::new();
                for i in 0..self.prec {
                    let bit = self.mantissa.len() * LIMB_BITS - 1 - i;
                    bits.push(if limbs::test_bit(&self.mantissa, bit) {
                        '1'
                    } else {
                        '0'
                    });
                }
                write!(f, "{}p{:+}", bits.trim_end_matches('0'), self.exp)
            }
        }
    }
}

impl PartialEq for Float {
    fn eq(&self, other: &Self) -> bool {
        self.partial_cmp(other) == Some(Ordering::Equal)
    }
}

/// Page 66. Chapter 3. Floating-Point Formats and Environment
/// Table 3.8: Comparison predicates and the four relations.
/// The operands may have different precisions.
impl PartialOrd for Float {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        let bool_to_ord = |ord: bool| -> Option<Ordering> {
            if ord {
                Some(Ordering::Less)
            } else {
                Some(Ordering::Greater)
            }
        };

        match (self.category, other.category) {
            (Category::NaN, _) | (_, Category::NaN) => None,
            (Category::Zero, Category::Zero) => Some(Ordering::Equal),
            (Category::Infinity, Category::Infinity) => {
                if self.sign == other.sign {
                    Some(Ordering::Equal)
                } else {
                    bool_to_ord(self.sign)
                }
            }
            (Category::Infinity, _) | (Category::Normal, Category::Zero) => {
                bool_to_ord(self.sign)
            }
            (_, Category::Infinity) | (Category::Zero, Category::Normal) => {
                bool_to_ord(!other.sign)
            }
            (Category::Normal, Category::Normal) => {
                if self.sign != other.sign {
                    return bool_to_ord(self.sign);
                }
                let ord = cmp_abs(self, other);
                Some(if self.sign { ord.reverse() } else { ord })
            }
        }
    }
}

#[test]
fn test_rounding_mode_fold() {
    use RoundingMode::*;
    assert_eq!(Positive.fold(false), Direction::Away);
    assert_eq!(Positive.fold(true), Direction::Zero);
    assert_eq!(Negative.fold(false), Direction::Zero);
    assert_eq!(Negative.fold(true), Direction::Away);
    assert_eq!(Zero.fold(true), Direction::Zero);
    assert_eq!(Away.fold(false), Direction::Away);
    assert_eq!(NearestTiesToAway.fold(true), Direction::NearestAway);
    for rm in [NearestTiesToEven, NearestTiesToAway, Zero, Positive, Negative] {
        assert_eq!(RoundingMode::from_string(rm.as_string()), Some(rm));
    }
    assert_eq!(RoundingMode::from_string("Up"), None);
}

#[test]
fn test_constructors() {
    let x = Float::new(100);
    assert!(x.is_nan());
    assert_eq!(x.get_prec(), 100);
    assert_eq!(x.get_mantissa().len(), 2);

    let one = Float::one(65, true);
    one.check_invariants();
    assert_eq!(one.to_string(), "-0.1p+1");
    assert_eq!(one.sgn(), Some(-1));
    assert_eq!(Float::zero(2, true).to_string(), "-0");
    assert_eq!(Float::inf(2, false).to_string(), "inf");
    assert_eq!(Float::nan(2).sgn(), None);

    let mut y = Float::one(10, false);
    y.set_prec(200);
    assert!(y.is_nan());
    assert_eq!(y.get_mantissa().len(), 4);
}

#[test]
#[should_panic]
fn test_precision_one_is_rejected() {
    let _ = Float::new(1);
}

#[test]
#[should_panic]
fn test_one_rejects_precision_one() {
    let _ = Float::one(1, false);
}

#[test]
#[should_panic]
fn test_from_u64_rejects_precision_one() {
    let _ = Float::from_u64(1, 3);
}

#[test]
#[should_panic]
fn test_from_f64_rejects_precision_one() {
    let _ = Float::from_f64(1, 0.75);
}

#[test]
#[should_panic]
fn test_from_i64_rejects_huge_precision() {
    let _ = Float::from_i64(PREC_MAX + 1, -1);
}

#[test]
#[should_panic]
fn test_raw_parts_padding_is_checked() {
    // Five bits of precision, but the lowest bit of the word is set.
    let _ = Float::from_raw_parts(5, false, 0, &[(1 << 63) | 1]);
}

#[test]
fn test_internal_repr() {
    let x = Float::from_raw_parts(4, false, 3, &[0b1011 << 60]);
    assert_eq!(x.to_string(), "0.1011p+3");
    assert_eq!(x.as_internal_str(), "FP[+ E=   3 P=4 M=0b1011]");
    assert!(!x.is_power_of_two());
    let mut m = Float::new(70);
    m.make_max(false, 5);
    m.check_invariants();
    assert_eq!(m.get_mantissa(), &[u64::MAX << 58, u64::MAX]);
    m.make_min(true, -5);
    assert!(m.is_power_of_two());
}

#[test]
fn test_comparisons() {
    let a = Float::from_raw_parts(4, false, 3, &[0b1011 << 60]); // 5.5
    let b = Float::from_raw_parts(70, false, 3, &[0, 0b1011 << 60]); // 5.5
    let c = Float::from_raw_parts(4, true, 3, &[0b1011 << 60]); // -5.5
    assert_eq!(a, b);
    assert!(c < a);
    assert!(c < Float::zero(3, true));
    assert!(Float::inf(3, true) < c);
    assert!(Float::inf(3, false) > a);
    assert!(Float::zero(3, true) == Float::zero(9, false));
    assert!(Float::nan(3) != Float::nan(3));
    assert_eq!(Float::nan(3).partial_cmp(&a), None);
    let d = Float::from_raw_parts(4, true, 4, &[0b1000 << 60]); // -8
    assert!(d < c);
}
