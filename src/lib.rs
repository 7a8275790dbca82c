//! Correctly rounded multiple-precision binary floating point.
//!
//! Every operation computes the exact result, rounds it into the precision of
//! the destination and reports the direction of the rounding with a ternary
//! value. The exponent range and the exception flags live in an explicit
//! [`Context`].
//!
//! ```
//!    use mpround::{Context, Float, RoundingMode};
//!    use core::cmp::Ordering;
//!
//!    let mut ctx = Context::default();
//!    let two = Float::from_u64(53, 2);
//!    let mut x = Float::new(53);
//!    let t = x.set_sqrt(&two, RoundingMode::NearestTiesToEven, &mut ctx);
//!    assert_eq!(x.as_f64(), core::f64::consts::SQRT_2);
//!    assert_eq!(t, Ordering::Greater);
//! ```

extern crate alloc;

mod arithmetic;
mod bigint;
mod can_round;
mod cast;
mod cmp2;
mod context;
mod float;
mod functions;
pub mod limbs;
mod round;
mod utils;

#[cfg(feature = "python")]
mod py;

pub use self::arithmetic::{BinaryOp, Operand};
pub use self::bigint::BigInt;
pub use self::can_round::can_round_raw;
pub use self::cmp2::{cmp2, cmp_abs};
pub use self::context::{Context, Flags, RangeError, EMAX_DEFAULT, EMIN_DEFAULT};
pub use self::float::{
    Category, Float, RoundingMode, EXP_MAX, EXP_MIN, PREC_MAX, PREC_MIN,
};
pub use self::limbs::{Limb, LIMB_BITS};
pub use self::round::round_raw;
