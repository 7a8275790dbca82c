use crate::{BinaryOp, Context, Float, RoundingMode};
use core::cmp::Ordering;
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use std::format;
use std::string::{String, ToString};
use std::vec::Vec;

fn parse_rm(rm: &str) -> PyResult<RoundingMode> {
    RoundingMode::from_string(rm).ok_or_else(|| {
        PyValueError::new_err(format!("invalid rounding mode: {}", rm))
    })
}

fn ternary(t: Ordering) -> i32 {
    t as i32
}

/// The exponent range and the exception flags of a sequence of operations.
#[pyclass(name = "Context")]
struct PyContext {
    inner: Context,
}

#[pymethods]
impl PyContext {
    /// Create a context with the default exponent range.
    #[new]
    fn new() -> Self {
        PyContext {
            inner: Context::new(),
        }
    }
    /// Install the exponent range [emin, emax].
    fn set_exponent_range(&mut self, emin: i64, emax: i64) -> PyResult<()> {
        self.inner
            .set_exponent_range(emin, emax)
            .map_err(|e| PyValueError::new_err(e.to_string()))
    }
    fn get_emin(&self) -> i64 {
        self.inner.get_emin()
    }
    fn get_emax(&self) -> i64 {
        self.inner.get_emax()
    }
    /// Returns the raw bits of the exception flags.
    fn flags(&self) -> u32 {
        self.inner.flags().bits()
    }
    fn clear_flags(&mut self) {
        self.inner.clear_flags();
    }
    fn is_underflow(&self) -> bool {
        self.inner.is_underflow()
    }
    fn is_overflow(&self) -> bool {
        self.inner.is_overflow()
    }
    fn is_nan(&self) -> bool {
        self.inner.is_nan()
    }
    fn is_inexact(&self) -> bool {
        self.inner.is_inexact()
    }
    fn is_div_by_zero(&self) -> bool {
        self.inner.is_div_by_zero()
    }
    fn is_erange(&self) -> bool {
        self.inner.is_erange()
    }
    fn __repr__(&self) -> String {
        format!("{:?}", self.inner)
    }
}

/// A binary floating-point number with a fixed precision.
///
/// The `set_*` methods round the exact result into the precision of the
/// destination with the given rounding mode ("NearestTiesToEven",
/// "NearestTiesToAway", "Zero", "Positive", "Negative", "Away") and return
/// the ternary value: -1, 0 or 1 when the stored result is below, equal to
/// or above the exact result.
#[pyclass(name = "Float")]
#[derive(Clone)]
struct PyFloat {
    inner: Float,
}

impl PyFloat {
    fn binary(
        &mut self,
        op: BinaryOp,
        a: PyFloat,
        b: PyFloat,
        rm: &str,
        ctx: &mut PyContext,
    ) -> PyResult<i32> {
        let rm = parse_rm(rm)?;
        let t = match op {
            BinaryOp::Add => self.inner.set_add(&a.inner, &b.inner, rm, &mut ctx.inner),
            BinaryOp::Sub => self.inner.set_sub(&a.inner, &b.inner, rm, &mut ctx.inner),
            BinaryOp::Mul => self.inner.set_mul(&a.inner, &b.inner, rm, &mut ctx.inner),
            BinaryOp::Div => self.inner.set_div(&a.inner, &b.inner, rm, &mut ctx.inner),
        };
        Ok(ternary(t))
    }
}

#[pymethods]
impl PyFloat {
    /// Create a NaN with `prec` bits of precision.
    #[new]
    fn new(prec: usize) -> Self {
        PyFloat {
            inner: Float::new(prec),
        }
    }
    /// Returns a float with the value of the native float `val`.
    #[staticmethod]
    fn from_f64(prec: usize, val: f64) -> Self {
        PyFloat {
            inner: Float::from_f64(prec, val),
        }
    }
    /// Returns a float with the integer value `val`.
    #[staticmethod]
    fn from_i64(prec: usize, val: i64) -> Self {
        PyFloat {
            inner: Float::from_i64(prec, val),
        }
    }
    fn __str__(&self) -> String {
        self.inner.to_string()
    }
    fn __repr__(&self) -> String {
        self.inner.as_internal_str()
    }
    fn get_prec(&self) -> usize {
        self.inner.get_prec()
    }
    fn get_exponent(&self) -> i64 {
        self.inner.get_exp()
    }
    /// Returns the mantissa words, least significant first.
    fn get_mantissa(&self) -> Vec<u64> {
        self.inner.get_mantissa().to_vec()
    }
    fn get_category(&self) -> String {
        format!("{:?}", self.inner.get_category())
    }
    fn is_negative(&self) -> bool {
        self.inner.is_negative()
    }
    fn is_inf(&self) -> bool {
        self.inner.is_inf()
    }
    fn is_nan(&self) -> bool {
        self.inner.is_nan()
    }
    fn is_zero(&self) -> bool {
        self.inner.is_zero()
    }
    fn is_normal(&self) -> bool {
        self.inner.is_normal()
    }
    /// Round the value into `prec` bits.
    fn prec_round(
        &mut self,
        prec: usize,
        rm: &str,
        mut ctx: PyRefMut<'_, PyContext>,
    ) -> PyResult<i32> {
        let rm = parse_rm(rm)?;
        Ok(ternary(self.inner.prec_round(prec, rm, &mut ctx.inner)))
    }
    /// Store `src` rounded into the precision of this float.
    fn set(
        &mut self,
        src: PyFloat,
        rm: &str,
        mut ctx: PyRefMut<'_, PyContext>,
    ) -> PyResult<i32> {
        let rm = parse_rm(rm)?;
        Ok(ternary(self.inner.set(&src.inner, rm, &mut ctx.inner)))
    }
    fn set_add(
        &mut self,
        a: PyFloat,
        b: PyFloat,
        rm: &str,
        mut ctx: PyRefMut<'_, PyContext>,
    ) -> PyResult<i32> {
        self.binary(BinaryOp::Add, a, b, rm, &mut ctx)
    }
    fn set_sub(
        &mut self,
        a: PyFloat,
        b: PyFloat,
        rm: &str,
        mut ctx: PyRefMut<'_, PyContext>,
    ) -> PyResult<i32> {
        self.binary(BinaryOp::Sub, a, b, rm, &mut ctx)
    }
    fn set_mul(
        &mut self,
        a: PyFloat,
        b: PyFloat,
        rm: &str,
        mut ctx: PyRefMut<'_, PyContext>,
    ) -> PyResult<i32> {
        self.binary(BinaryOp::Mul, a, b, rm, &mut ctx)
    }
    fn set_div(
        &mut self,
        a: PyFloat,
        b: PyFloat,
        rm: &str,
        mut ctx: PyRefMut<'_, PyContext>,
    ) -> PyResult<i32> {
        self.binary(BinaryOp::Div, a, b, rm, &mut ctx)
    }
    fn set_sqrt(
        &mut self,
        a: PyFloat,
        rm: &str,
        mut ctx: PyRefMut<'_, PyContext>,
    ) -> PyResult<i32> {
        let rm = parse_rm(rm)?;
        Ok(ternary(self.inner.set_sqrt(&a.inner, rm, &mut ctx.inner)))
    }
    /// Store `src * 2^k` rounded into the precision of this float.
    fn mul_2si(
        &mut self,
        src: PyFloat,
        k: i64,
        rm: &str,
        mut ctx: PyRefMut<'_, PyContext>,
    ) -> PyResult<i32> {
        let rm = parse_rm(rm)?;
        Ok(ternary(self.inner.mul_2si(&src.inner, k, rm, &mut ctx.inner)))
    }
    /// Returns true if this approximation, with the error bound
    /// 2^(exp - err) and computed with `rnd1`, can be rounded correctly to
    /// `prec` bits with `rnd2`.
    fn can_round(
        &self,
        err: i64,
        rnd1: &str,
        rnd2: &str,
        prec: usize,
    ) -> PyResult<bool> {
        let (rnd1, rnd2) = (parse_rm(rnd1)?, parse_rm(rnd2)?);
        Ok(self.inner.can_round(err, rnd1, rnd2, prec))
    }
    fn __add__(&self, other: &PyFloat) -> PyFloat {
        PyFloat {
            inner: &self.inner + &other.inner,
        }
    }
    fn __sub__(&self, other: &PyFloat) -> PyFloat {
        PyFloat {
            inner: &self.inner - &other.inner,
        }
    }
    fn __mul__(&self, other: &PyFloat) -> PyFloat {
        PyFloat {
            inner: &self.inner * &other.inner,
        }
    }
    fn __truediv__(&self, other: &PyFloat) -> PyFloat {
        PyFloat {
            inner: &self.inner / &other.inner,
        }
    }
    fn __neg__(&self) -> PyFloat {
        PyFloat {
            inner: self.inner.neg(),
        }
    }
    fn __abs__(&self) -> PyFloat {
        PyFloat {
            inner: self.inner.abs(),
        }
    }
    fn __lt__(&self, other: &PyFloat) -> bool {
        self.inner < other.inner
    }
    fn __le__(&self, other: &PyFloat) -> bool {
        self.inner <= other.inner
    }
    fn __eq__(&self, other: &PyFloat) -> bool {
        self.inner == other.inner
    }
    fn __ne__(&self, other: &PyFloat) -> bool {
        self.inner != other.inner
    }
    fn __gt__(&self, other: &PyFloat) -> bool {
        self.inner > other.inner
    }
    fn __ge__(&self, other: &PyFloat) -> bool {
        self.inner >= other.inner
    }
    /// Convert to f64, rounding to the nearest even.
    fn to_float64(&self) -> f64 {
        self.inner.as_f64()
    }
    /// Prints the number using the internal representation.
    fn dump(&self) {
        self.inner.dump();
    }
} // impl PyFloat

#[pymodule]
fn _mpround(_py: Python, m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyFloat>()?;
    m.add_class::<PyContext>()?;
    Ok(())
}
