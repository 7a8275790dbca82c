//! This module contains the exact unsigned integer arithmetic that the
//! multiplication, division and square root kernels build on. The slice
//! primitives in `limbs` handle the fixed-size mantissa work; `BigInt` owns a
//! growable buffer for the wide intermediate products and quotients.

extern crate alloc;

use core::cmp::Ordering;
use core::ops::{Add, Mul, Sub};

use alloc::vec::Vec;

use crate::limbs::{self, Limb, LIMB_BITS};

/// An arbitrary-size unsigned integer backed by `Vec<u64>`. The words are
/// stored least-significant first. The vector may carry leading zero words.
///
/// # Examples
///
/// ```
///    use mpround::BigInt;
///
///    let x = BigInt::from_u64(1995);
///    let y = BigInt::from_u64(90210);
///    let (q, r) = (&x * &y).div_rem(&BigInt::from_u64(7));
///    assert_eq!(q.as_u64() * 7 + r.as_u64(), 1995 * 90210);
/// ```
#[derive(Debug, Clone)]
pub struct BigInt {
    parts: Vec<Limb>,
}

impl BigInt {
    /// Create a new zero big int number.
    pub fn zero() -> Self {
        BigInt::from_u64(0)
    }

    /// Create a new number with the value 1.
    pub fn one() -> Self {
        Self::from_u64(1)
    }

    /// Create a new number with a single '1' set at bit `bit`.
    pub fn one_hot(bit: usize) -> Self {
        let mut x = Self::zero();
        x.set_bit(bit);
        x
    }

    /// Create a number and set the lowest 64 bits to `val`.
    pub fn from_u64(val: u64) -> Self {
        BigInt { parts: Vec::from([val]) }
    }

    /// Construct a bigint from the words in `parts` (least significant first).
    pub fn from_limbs(parts: &[Limb]) -> Self {
        let mut parts = parts.to_vec();
        if parts.is_empty() {
            parts.push(0);
        }
        BigInt { parts }
    }

    /// Create a pseudorandom number with `parts` number of words. The random
    /// number generator is initialized with `seed`.
    pub fn pseudorandom(parts: usize, seed: u32) -> Self {
        use crate::utils::Lfsr;
        let ll = Lfsr::new_with_seed(seed);
        Self::from_limbs(&ll.take(parts).collect::<Vec<u64>>())
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Returns the lowest 64 bits.
    pub fn as_u64(&self) -> u64 {
        debug_assert!(self.parts[1..].iter().all(|&x| x == 0));
        self.parts[0]
    }

    /// Return true if the number is equal to zero.
    pub fn is_zero(&self) -> bool {
        limbs::is_zero(&self.parts)
    }

    /// Set the bit `bit_num` to one.
    pub fn set_bit(&mut self, bit_num: usize) {
        let which_word = bit_num / LIMB_BITS;
        self.grow(which_word + 1);
        self.parts[which_word] |= 1 << (bit_num % LIMB_BITS);
    }

    /// Returns the index of the most significant bit (the highest '1'),
    /// using 1-based counting (the first bit is 1, and zero means no bits are
    /// set).
    pub fn msb_index(&self) -> usize {
        limbs::bit_len(&self.parts)
    }

    /// Returns the word at idx `idx`, or zero past the end of the number.
    pub fn get_part(&self, idx: usize) -> u64 {
        self.parts.get(idx).copied().unwrap_or(0)
    }

    /// Ensure that there are at least `size` words in the bigint.
    pub fn grow(&mut self, size: usize) {
        if self.parts.len() < size {
            self.parts.resize(size, 0);
        }
    }

    /// Remove the leading zero words from the bigint.
    fn shrink(&mut self) {
        while self.len() > 1 && self.parts[self.len() - 1] == 0 {
            self.parts.pop();
        }
    }

    /// Returns the `n` lowest words, padded with zeros.
    pub fn to_limbs(&self, n: usize) -> Vec<Limb> {
        debug_assert!(self.parts[n.min(self.len())..].iter().all(|&x| x == 0));
        let mut v: Vec<Limb> = self.parts.iter().take(n).copied().collect();
        v.resize(n, 0);
        v
    }

    /// Add `rhs` to this number.
    pub fn inplace_add(&mut self, rhs: &Self) {
        self.grow(self.len().max(rhs.len()) + 1);
        let carry = limbs::add_n(&mut self.parts, &rhs.parts);
        debug_assert!(!carry);
        self.shrink();
    }

    /// Subtract `rhs` from self, and return true if the operation
    /// overflowed (borrow).
    #[must_use]
    pub fn inplace_sub(&mut self, rhs: &Self) -> bool {
        let mut rhs_len = rhs.len();
        while rhs_len > 1 && rhs.parts[rhs_len - 1] == 0 {
            rhs_len -= 1;
        }
        self.grow(rhs_len);
        let borrow = limbs::sub_n(&mut self.parts, &rhs.parts[..rhs_len]);
        self.shrink();
        borrow
    }

    /// Shift the bits in the numbers `bits` to the left.
    pub fn shift_left(&mut self, bits: usize) {
        let words = bits / LIMB_BITS;
        let rem = bits % LIMB_BITS;
        if words > 0 {
            self.parts.splice(0..0, core::iter::repeat(0).take(words));
        }
        let out = limbs::shl(&mut self.parts[words..], rem);
        if out != 0 {
            self.parts.push(out);
        }
    }

    /// Shift the bits in the numbers `bits` to the right.
    pub fn shift_right(&mut self, bits: usize) {
        let words = bits / LIMB_BITS;
        if words >= self.len() {
            *self = Self::zero();
            return;
        }
        self.parts.drain(0..words);
        limbs::shr(&mut self.parts, bits % LIMB_BITS);
        self.shrink();
    }

    /// Returns true if any of the `bits` lowest bits is set.
    pub fn low_bits_nonzero(&self, bits: usize) -> bool {
        limbs::low_bits_nonzero(&self.parts, bits)
    }

    /// Multiply two word sequences with the O(n^2) algorithm.
    fn mul_schoolbook(lhs: &[Limb], rhs: &[Limb]) -> BigInt {
        let mut parts = alloc::vec![0; lhs.len() + rhs.len()];
        for (i, &a) in lhs.iter().enumerate() {
            if a == 0 {
                continue;
            }
            let mut carry: u128 = 0;
            for (j, &b) in rhs.iter().enumerate() {
                let t = a as u128 * b as u128 + parts[i + j] as u128 + carry;
                parts[i + j] = t as u64;
                carry = t >> 64;
            }
            parts[i + rhs.len()] = carry as u64;
        }
        let mut res = BigInt { parts };
        res.shrink();
        res
    }

    fn mul_karatsuba(lhs: &[Limb], rhs: &[Limb]) -> BigInt {
        // Algorithm description:
        // https://en.wikipedia.org/wiki/Karatsuba_algorithm

        // Handle small numbers using the traditional O(n^2) algorithm.
        if lhs.len().min(rhs.len()) < KARATSUBA_SIZE_THRESHOLD {
            if lhs.is_empty() || rhs.is_empty() {
                return BigInt::zero();
            }
            return Self::mul_schoolbook(lhs, rhs);
        }

        // Split the big-int into two parts. One of the parts might be
        // zero-sized.
        let mid = lhs.len().max(rhs.len()) / 2;
        let (a, b) = lhs.split_at(mid.min(lhs.len()));
        let (c, d) = rhs.split_at(mid.min(rhs.len()));

        let ac = Self::mul_karatsuba(a, c);
        let mut bd = Self::mul_karatsuba(b, d);

        // Compute (a+b) * (c+d) - ac - bd.
        let mut a_b = BigInt::from_limbs(a);
        a_b.inplace_add(&BigInt::from_limbs(b));
        let mut c_d = BigInt::from_limbs(c);
        c_d.inplace_add(&BigInt::from_limbs(d));
        let mut ad_plus_bc = Self::mul_karatsuba(&a_b, &c_d);
        let borrow0 = ad_plus_bc.inplace_sub(&ac);
        let borrow1 = ad_plus_bc.inplace_sub(&bd);
        debug_assert!(!borrow0 && !borrow1);

        // Add the parts of the word together.
        bd.shift_left(LIMB_BITS * mid * 2);
        ad_plus_bc.shift_left(LIMB_BITS * mid);
        bd.inplace_add(&ad_plus_bc);
        bd.inplace_add(&ac);
        bd
    }

    /// Returns the exact product of self and `rhs`.
    pub fn mul(&self, rhs: &Self) -> Self {
        Self::mul_karatsuba(&self.parts, &rhs.parts)
    }

    /// Divide self by the single word `d`. Returns the quotient and reminder.
    fn div_rem_word(&self, d: Limb) -> (Self, Limb) {
        let mut q = alloc::vec![0; self.len()];
        let mut rem: u128 = 0;
        for i in (0..self.len()).rev() {
            let cur = (rem << 64) | self.parts[i] as u128;
            q[i] = (cur / d as u128) as u64;
            rem = cur % d as u128;
        }
        let mut q = BigInt { parts: q };
        q.shrink();
        (q, rem as u64)
    }

    /// Divide self by `divisor`, and return the quotient and the reminder.
    /// This is Knuth's Algorithm D (TAOCP vol. 2, 4.3.1).
    pub fn div_rem(&self, divisor: &Self) -> (Self, Self) {
        let mut v = divisor.clone();
        v.shrink();
        let mut u = self.clone();
        u.shrink();
        assert!(!v.is_zero(), "division by zero");

        if u < v {
            return (Self::zero(), u);
        }
        let n = v.len();
        if n == 1 {
            let (q, r) = u.div_rem_word(v.parts[0]);
            return (q, Self::from_u64(r));
        }
        let m = u.len() - n;

        // Normalize, so that the top bit of the divisor is set.
        let s = v.parts[n - 1].leading_zeros() as usize;
        limbs::shl(&mut v.parts, s);
        u.parts.push(0);
        limbs::shl(&mut u.parts, s);
        let vn = &v.parts;
        let un = &mut u.parts;
        let top = vn[n - 1] as u128;
        let second = vn[n - 2] as u128;

        let mut q = alloc::vec![0; m + 1];
        for j in (0..=m).rev() {
            let num = ((un[j + n] as u128) << 64) | un[j + n - 1] as u128;
            let mut qhat = num / top;
            let mut rhat = num % top;
            while qhat > u64::MAX as u128
                || qhat * second > ((rhat << 64) | un[j + n - 2] as u128)
            {
                qhat -= 1;
                rhat += top;
                if rhat > u64::MAX as u128 {
                    break;
                }
            }

            // Multiply and subtract.
            let mut carry: u128 = 0;
            let mut borrow = false;
            for i in 0..n {
                let p = qhat * vn[i] as u128 + carry;
                carry = p >> 64;
                let (d0, b0) = un[i + j].overflowing_sub(p as u64);
                let (d1, b1) = d0.overflowing_sub(borrow as u64);
                un[i + j] = d1;
                borrow = b0 || b1;
            }
            let (d0, b0) = un[j + n].overflowing_sub(carry as u64);
            let (d1, b1) = d0.overflowing_sub(borrow as u64);
            un[j + n] = d1;

            // The estimate was one too large; add the divisor back.
            if b0 || b1 {
                qhat -= 1;
                let c = limbs::add_n(&mut un[j..j + n], vn);
                un[j + n] = un[j + n].wrapping_add(c as u64);
            }
            q[j] = qhat as u64;
        }

        let mut rem = BigInt::from_limbs(&un[..n]);
        limbs::shr(&mut rem.parts, s);
        rem.shrink();
        let mut q = BigInt { parts: q };
        q.shrink();
        (q, rem)
    }

    /// Returns the integer square root `s = floor(sqrt(self))` and the
    /// remainder `self - s*s`.
    pub fn sqrt_rem(&self) -> (Self, Self) {
        if self.is_zero() {
            return (Self::zero(), Self::zero());
        }
        // Start above the root and use Newton's iteration, which decreases
        // monotonically until it reaches floor(sqrt(n)).
        let mut x = Self::one_hot(self.msb_index().div_ceil(2));
        loop {
            let (q, _) = self.div_rem(&x);
            let mut y = &x + &q;
            y.shift_right(1);
            if y >= x {
                break;
            }
            x = y;
        }
        let mut rem = self.clone();
        let borrow = rem.inplace_sub(&x.mul(&x));
        debug_assert!(!borrow);
        (x, rem)
    }
}

/// Bigint numbers above this size use the karatsuba algorithm for
/// multiplication. The number represents the number of words in the bigint.
const KARATSUBA_SIZE_THRESHOLD: usize = 64;

impl Default for BigInt {
    fn default() -> Self {
        Self::zero()
    }
}

impl Eq for BigInt {}

impl PartialEq for BigInt {
    fn eq(&self, other: &BigInt) -> bool {
        self.cmp(other).is_eq()
    }
}

impl PartialOrd for BigInt {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for BigInt {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.len().max(other.len());
        for i in (0..len).rev() {
            match self.get_part(i).cmp(&other.get_part(i)) {
                Ordering::Equal => {}
                ord => return ord,
            }
        }
        Ordering::Equal
    }
}

impl Add<&BigInt> for &BigInt {
    type Output = BigInt;

    fn add(self, rhs: &BigInt) -> BigInt {
        let mut n = self.clone();
        n.inplace_add(rhs);
        n
    }
}

impl Sub<&BigInt> for &BigInt {
    type Output = BigInt;

    fn sub(self, rhs: &BigInt) -> BigInt {
        let mut n = self.clone();
        let borrow = n.inplace_sub(rhs);
        debug_assert!(!borrow, "negative result");
        n
    }
}

impl Mul<&BigInt> for &BigInt {
    type Output = BigInt;

    fn mul(self, rhs: &BigInt) -> BigInt {
        BigInt::mul_karatsuba(self, rhs)
    }
}

use core::ops::Deref;

impl Deref for BigInt {
    type Target = [u64];

    fn deref(&self) -> &Self::Target {
        &self.parts[..]
    }
}

#[test]
fn test_shl_shr() {
    let mut x = BigInt::from_u64(0xff00ff);
    x.shift_left(17);
    assert_eq!(x.get_part(0), 0x1fe01fe0000);
    x.shift_left(17);
    assert_eq!(x.get_part(0), 0x3fc03fc00000000);
    x.shift_left(64);
    assert_eq!(x.get_part(1), 0x3fc03fc00000000);
    x.shift_right(64 + 34);
    assert_eq!(x.as_u64(), 0xff00ff);
    x.shift_right(1000);
    assert!(x.is_zero());
}

#[test]
fn test_msb_and_bits() {
    assert_eq!(BigInt::zero().msb_index(), 0);
    for i in 0..256 {
        let x = BigInt::one_hot(i);
        assert_eq!(x.msb_index(), i + 1);
        assert!(x.low_bits_nonzero(i + 1));
        assert!(!x.low_bits_nonzero(i));
    }
}

#[test]
fn test_mul_basic() {
    let x = BigInt::from_u64(0xffff_ffff_ffff_ffff);
    let y = BigInt::from_u64(25);
    let z = x.mul(&x).mul(&y);
    assert_eq!(z.get_part(0), 0x19);
    assert_eq!(z.get_part(1), 0xffff_ffff_ffff_ffce);
    assert_eq!(z.get_part(2), 0x18);
}

#[test]
fn test_mul_karatsuba() {
    use crate::utils::Lfsr;
    let mut ll = Lfsr::new();

    // Compare the multiplication of karatsuba to the direct multiplication on
    // two random numbers of lengths 'l' and 'r'.
    fn test_sizes(l: usize, r: usize, ll: &mut Lfsr) {
        let a: Vec<u64> = ll.by_ref().take(l).collect();
        let b: Vec<u64> = ll.by_ref().take(r).collect();
        let res = BigInt::mul_karatsuba(&a, &b);
        assert_eq!(res, BigInt::mul_schoolbook(&a, &b));
    }

    test_sizes(1, 1, &mut ll);
    test_sizes(100, 1, &mut ll);
    test_sizes(1, 100, &mut ll);
    test_sizes(100, 100, &mut ll);
    test_sizes(300, 301, &mut ll);
    for i in 64..70 {
        for j in 60..70 {
            test_sizes(i, j, &mut ll);
        }
    }
}

#[test]
fn test_div_basic() {
    let (q, r) = BigInt::from_u64(703).div_rem(&BigInt::from_u64(7));
    assert_eq!(q.as_u64(), 100);
    assert_eq!(r.as_u64(), 3);

    let (q, r) = BigInt::from_u64(3).div_rem(&BigInt::one_hot(70));
    assert!(q.is_zero());
    assert_eq!(r.as_u64(), 3);
}

#[test]
fn test_div_random() {
    use crate::utils::Lfsr;
    let mut ll = Lfsr::new();

    // Check that q*d + r == n and r < d for random multi-word operands,
    // including divisors whose top word is small.
    for i in 0..400 {
        let nl = 1 + i % 9;
        let dl = 1 + (i / 9) % 6;
        let n = BigInt::from_limbs(&ll.by_ref().take(nl).collect::<Vec<u64>>());
        let mut dv: Vec<u64> = ll.by_ref().take(dl).collect();
        let last = dv.len() - 1;
        dv[last] >>= i % 64;
        if dv.iter().all(|&x| x == 0) {
            dv[0] = 1;
        }
        let d = BigInt::from_limbs(&dv);
        let (q, r) = n.div_rem(&d);
        assert!(r < d);
        assert_eq!(&(&q * &d) + &r, n);
    }
}

#[test]
fn test_div_vs_u128() {
    use crate::utils::Lfsr;
    let mut ll = Lfsr::new();
    for _ in 0..5000 {
        let a = ((ll.get64() as u128) << 64) | ll.get64() as u128;
        let b = (((ll.get64() >> 20) as u128) << 64) | ll.get64() as u128;
        let x = BigInt::from_limbs(&[a as u64, (a >> 64) as u64]);
        let y = BigInt::from_limbs(&[b as u64, (b >> 64) as u64]);
        let (q, r) = x.div_rem(&y);
        let (eq, er) = (a / b, a % b);
        assert_eq!(q.get_part(0), eq as u64);
        assert_eq!(q.get_part(1), (eq >> 64) as u64);
        assert_eq!(r.get_part(0), er as u64);
        assert_eq!(r.get_part(1), (er >> 64) as u64);
    }
}

#[test]
fn test_sqrt_rem() {
    for i in 0..2000u64 {
        let (s, r) = BigInt::from_u64(i).sqrt_rem();
        let s = s.as_u64();
        assert!(s * s <= i && (s + 1) * (s + 1) > i);
        assert_eq!(r.as_u64(), i - s * s);
    }

    // A large perfect square.
    let x = BigInt::pseudorandom(20, 7);
    let (s, r) = x.mul(&x).sqrt_rem();
    assert_eq!(s, x);
    assert!(r.is_zero());

    // One less than a perfect square.
    let mut y = x.mul(&x);
    let borrow = y.inplace_sub(&BigInt::one());
    assert!(!borrow);
    let (s, r) = y.sqrt_rem();
    assert_eq!(&s + &BigInt::one(), x);
    assert_eq!(r, &(&x + &x) - &BigInt::from_u64(2));
}
