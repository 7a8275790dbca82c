//! This file contains simple helper functions and test helpers.

extern crate alloc;

#[cfg(test)]
use alloc::vec::Vec;

#[cfg(test)]
use crate::float::Float;
#[cfg(test)]
use crate::limbs::{self, Limb};

/// Returns list of interesting values that various tests use to catch edge
/// cases.
#[allow(dead_code)]
pub fn get_special_test_values() -> [f64; 20] {
    [
        -f64::NAN,
        f64::NAN,
        f64::INFINITY,
        f64::NEG_INFINITY,
        f64::EPSILON,
        -f64::EPSILON,
        0.000000000000000000000000000000000000001,
        f64::MIN,
        f64::MAX,
        core::f64::consts::PI,
        core::f64::consts::LN_2,
        core::f64::consts::SQRT_2,
        core::f64::consts::E,
        0.0,
        -0.0,
        10.,
        -10.,
        -0.00001,
        0.1,
        355. / 113.,
    ]
}

// Linear-feedback shift register. We use this as a random number generator for
// tests.
pub struct Lfsr {
    state: u32,
}

impl Default for Lfsr {
    fn default() -> Self {
        Self::new()
    }
}

impl Lfsr {
    /// Generate a new LFSR number generator.
    pub fn new() -> Lfsr {
        Lfsr { state: 0x13371337 }
    }

    /// Generate a new LFSR number generator that starts with a specific state.
    pub fn new_with_seed(seed: u32) -> Lfsr {
        Lfsr {
            state: 0x13371337 ^ seed,
        }
    }

    fn step(&mut self) {
        let a = (self.state >> 24) & 1;
        let b = (self.state >> 23) & 1;
        let c = (self.state >> 22) & 1;
        let d = (self.state >> 17) & 1;
        let n = a ^ b ^ c ^ d ^ 1;
        self.state <<= 1;
        self.state |= n;
    }

    pub fn get(&mut self) -> u32 {
        let mut res: u32 = 0;
        for _ in 0..32 {
            self.step();
            res <<= 1;
            res ^= self.state & 0x1;
        }
        res
    }

    pub fn get64(&mut self) -> u64 {
        ((self.get() as u64) << 32) | self.get() as u64
    }
}

#[cfg(test)]
impl Lfsr {
    /// Returns a number in the range `0..n`.
    pub fn below(&mut self, n: u64) -> u64 {
        self.get64() % n
    }

    /// Generate a random normal mantissa of `prec` bits: the top bit is set
    /// and the padding bits below the precision are clear. Every other
    /// call produces a mantissa with long runs of ones or zeros, which are the
    /// interesting cases for carries and cancellation.
    pub fn mantissa(&mut self, prec: usize) -> Vec<Limb> {
        let n = limbs::limbs_for(prec);
        let style = self.below(4);
        let mut m: Vec<Limb> = (0..n)
            .map(|_| match style {
                0 => u64::MAX,
                1 => 0,
                _ => self.get64(),
            })
            .collect();
        if style < 2 {
            // Sprinkle a single random bit.
            let bit = self.below(n as u64 * 64) as usize;
            m[bit / 64] ^= 1 << (bit % 64);
        }
        m[n - 1] |= 1 << 63;
        limbs::mask_low(&mut m, n * 64 - prec);
        m
    }

    /// Generate a random normal float with a precision in `2..=max_prec` and
    /// an exponent in `-exp_range..=exp_range`.
    pub fn float(&mut self, max_prec: usize, exp_range: i64) -> Float {
        let prec = 2 + self.below(max_prec as u64 - 1) as usize;
        self.float_with_prec(prec, exp_range)
    }

    /// Generate a random normal float with precision `prec`.
    pub fn float_with_prec(&mut self, prec: usize, exp_range: i64) -> Float {
        let m = self.mantissa(prec);
        let exp = self.below(2 * exp_range as u64 + 1) as i64 - exp_range;
        let sign = self.get() & 1 == 1;
        Float::from_raw_parts(prec, sign, exp, &m)
    }
}

// Implement `Iterator` for `Lfsr`.
impl Iterator for Lfsr {
    type Item = u64;
    fn next(&mut self) -> Option<Self::Item> {
        Some(self.get64())
    }
}

#[test]
fn test_lfsr_balance() {
    let mut lfsr = Lfsr::new();

    // Count the number of items, and the number of 1s.
    let mut items = 0;
    let mut ones = 0;

    for _ in 0..10000 {
        let mut u = lfsr.get();
        for _ in 0..32 {
            items += 1;
            ones += u & 1;
            u >>= 1;
        }
    }
    // Make sure that we have around 50% 1s and 50% zeros.
    assert!((ones as f64) < (0.55 * items as f64));
    assert!((ones as f64) > (0.45 * items as f64));
}

#[test]
fn test_random_floats_are_valid() {
    let mut lfsr = Lfsr::new();
    for _ in 0..1000 {
        let x = lfsr.float(300, 100);
        assert!(x.is_normal());
        x.check_invariants();
    }
}
