//! Circular-linear progressions over 32-bit machine words.
//!
//! A `Value` `(base, delta, mtimes)` denotes the set
//! `{ base + delta * i mod 2^32 | 0 <= i <= mtimes }`. A multiplicity of `UMAX`
//! stands for an unbounded progression.

use num_integer::Integer;
use serde::{Deserialize, Serialize, Serializer};
use std::cmp;
use std::fmt;

/// Multiplicity of an unbounded progression.
pub const UMAX: u32 = u32::MAX;
/// Greatest signed machine word.
pub const MAXN: i32 = i32::MAX;
/// Smallest signed machine word.
pub const MINN: i32 = i32::MIN;

const RING: u64 = 1 << 32;

/// Interpretation of the `(base, delta, mtimes)` triple of a `Value`.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum Kind {
    /// Bottom, no value at all.
    None,
    /// A register index, stored in `base`.
    Reg,
    /// A set of machine words.
    Val,
    /// Top, any machine word.
    All,
}

/// A circular-linear progression.
#[derive(Clone, Copy, Debug)]
pub struct Value {
    kind: Kind,
    base: i32,
    delta: i32,
    mtimes: u32,
}

/// Greatest common divisor of `a` and `b`.
///
/// The result is negative when both operands are negative or null, which keeps
/// the direction of two decreasing progressions.
pub fn gcd(a: i64, b: i64) -> i64 {
    let g = a.gcd(&b);
    if a <= 0 && b <= 0 {
        -g
    } else {
        g
    }
}

/// Least common multiple of `a` and `b`, always positive.
pub fn lcm(a: i64, b: i64) -> i64 {
    a.lcm(&b)
}

/// Smallest `j >= 0` such that `a * j = c (mod m)`, with `m > 0`.
fn solve_congruence(a: i64, c: i64, m: i64) -> Option<i64> {
    let egcd = a.rem_euclid(m).extended_gcd(&m);
    let g = egcd.gcd;
    if c.rem_euclid(g) != 0 {
        return None;
    }
    let m = m / g;
    let inverse = egcd.x.rem_euclid(m);
    Some(((c / g).rem_euclid(m) * inverse).rem_euclid(m))
}

impl Value {
    /// Top, any machine word.
    pub const ALL: Value = Value {
        kind: Kind::All,
        base: 0,
        delta: 1,
        mtimes: UMAX,
    };

    /// Bottom, no value.
    pub const NONE: Value = Value {
        kind: Kind::None,
        base: 0,
        delta: 0,
        mtimes: 0,
    };

    /// Create a new value. `All` and `None` kinds are canonicalized whatever
    /// the given triple.
    pub fn new(kind: Kind, base: i32, delta: i32, mtimes: u32) -> Value {
        match kind {
            Kind::All => Value::ALL,
            Kind::None => Value::NONE,
            Kind::Reg | Kind::Val => Value {
                kind,
                base,
                delta,
                mtimes,
            },
        }
    }

    /// A single machine word.
    pub fn constant(k: i32) -> Value {
        Value::new(Kind::Val, k, 0, 0)
    }

    /// The progression `{ base + delta * i | 0 <= i <= mtimes }`.
    pub fn clp(base: i32, delta: i32, mtimes: u32) -> Value {
        Value::new(Kind::Val, base, delta, mtimes)
    }

    /// The address of register `index`. Negative indices are temporaries.
    pub fn register(index: i32) -> Value {
        Value::new(Kind::Reg, index, 0, 0)
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn base(&self) -> i32 {
        self.base
    }

    pub fn delta(&self) -> i32 {
        self.delta
    }

    pub fn mtimes(&self) -> u32 {
        self.mtimes
    }

    pub fn is_all(&self) -> bool {
        self.kind == Kind::All
    }

    pub fn is_none(&self) -> bool {
        self.kind == Kind::None
    }

    /// True if this value denotes exactly one word or register.
    pub fn is_const(&self) -> bool {
        matches!(self.kind, Kind::Val | Kind::Reg) && (self.delta == 0 || self.mtimes == 0)
    }

    /// True if the multiplicity is unbounded.
    pub fn is_inf(&self) -> bool {
        self.mtimes == UMAX
    }

    /// True for increasing (or constant) progressions.
    pub fn direction(&self) -> bool {
        self.delta >= 0
    }

    /// Last element of the progression.
    pub fn upper(&self) -> i32 {
        self.base
            .wrapping_add(self.delta.wrapping_mul(self.mtimes as i32))
    }

    /// First element of the progression.
    pub fn lower(&self) -> i32 {
        self.base
    }

    /// Smallest element, assuming the progression does not wrap.
    pub fn start(&self) -> i32 {
        if self.delta < 0 {
            self.upper()
        } else {
            self.base
        }
    }

    /// Greatest element, assuming the progression does not wrap.
    pub fn stop(&self) -> i32 {
        if self.delta < 0 {
            self.base
        } else {
            self.upper()
        }
    }

    fn end_i128(&self, base: i128) -> i128 {
        base + self.delta as i128 * self.mtimes as i128
    }

    /// True if the progression crosses the signed overflow boundary.
    pub fn swrap(&self) -> bool {
        let end = self.end_i128(self.base as i128);
        if self.delta >= 0 {
            end > MAXN as i128
        } else {
            end < MINN as i128
        }
    }

    /// True if the progression crosses the unsigned overflow boundary.
    pub fn uwrap(&self) -> bool {
        let end = self.end_i128(self.base as u32 as i128);
        if self.delta >= 0 {
            end > UMAX as i128
        } else {
            end < 0
        }
    }

    /// Same set of words, walked from the other end.
    pub fn reverse(&self) -> Value {
        Value::new(
            self.kind,
            self.upper(),
            self.delta.wrapping_neg(),
            self.mtimes,
        )
    }

    /// Rewrite a single-element progression as `(base, 0, 0)`.
    pub fn canonical(&self) -> Value {
        if self.is_const() {
            Value::new(self.kind, self.base, 0, 0)
        } else {
            *self
        }
    }

    /// True if the progression walks more than once around the 32-bit ring.
    fn wraps_ring(&self) -> bool {
        self.delta.unsigned_abs() as u64 * self.mtimes as u64 >= RING
    }

    /// When the progression covers a whole congruence class of the ring,
    /// returns the modulus and the residue of this class.
    fn congruence(&self) -> Option<(u64, u64)> {
        if self.is_const() || !matches!(self.kind, Kind::Val | Kind::Reg) {
            return None;
        }
        let delta = self.delta.unsigned_abs() as u64;
        let modulus = 1u64 << delta.trailing_zeros();
        if self.mtimes as u64 + 1 >= RING / modulus {
            Some((modulus, self.base as u32 as u64 % modulus))
        } else {
            None
        }
    }

    /// True if the word `k` belongs to this non-constant progression.
    fn holds(&self, k: i32) -> bool {
        if let Some((modulus, residue)) = self.congruence() {
            return k as u32 as u64 % modulus == residue;
        }
        if self.delta == 0 {
            return k == self.base;
        }
        // smallest j with base + delta * j = k on the ring, whatever the
        // number of laps
        match solve_congruence(
            self.delta as i64,
            k as i64 - self.base as i64,
            RING as i64,
        ) {
            Some(j) => j <= self.mtimes as i64,
            None => false,
        }
    }

    /// Split an increasing progression wrapping once around the signed
    /// boundary into the part before the overflow and the part after it.
    /// A non-wrapping progression is returned as is with an empty second part.
    pub fn pq_split(&self) -> (Value, Value) {
        let l = self.base;
        let u = self.upper();
        if self.delta <= 0 || !self.swrap() || l <= u {
            return (*self, Value::NONE);
        }
        let delta = self.delta as i64;
        let max_pm = (MAXN as i64 - l as i64) / delta;
        let p = Value::clp(l, if max_pm == 0 { 0 } else { self.delta }, max_pm as u32);
        let min_qm = (u as i64 - MINN as i64) / delta;
        let q = Value::clp(
            (u as i64 - delta * min_qm) as i32,
            if min_qm == 0 { 0 } else { self.delta },
            min_qm as u32,
        );
        (p, q)
    }

    pub fn add(&self, other: &Value) -> Value {
        if self.is_none() || other.is_none() {
            return Value::NONE;
        }
        if self.is_all() || other.is_all() {
            return Value::ALL;
        }
        if self.delta == 0 && other.delta == 0 {
            return Value::new(self.kind, self.base.wrapping_add(other.base), 0, 0);
        }
        let infinite = self.is_inf() || other.is_inf();
        if self.direction() == other.direction() {
            return Value::merge_progressions(self, other, infinite);
        }
        if self.is_inf() && other.is_inf() {
            return Value::ALL;
        }
        let (lhs, rhs) = if self.is_inf() {
            (*self, other.reverse())
        } else if other.is_inf() {
            (self.reverse(), *other)
        } else if self.delta < 0 {
            (self.reverse(), *other)
        } else {
            (*self, other.reverse())
        };
        Value::merge_progressions(&lhs, &rhs, infinite)
    }

    /// Sum of two progressions walking in the same direction.
    fn merge_progressions(lhs: &Value, rhs: &Value, infinite: bool) -> Value {
        let g = gcd(lhs.delta as i64, rhs.delta as i64);
        let base = lhs.base.wrapping_add(rhs.base);
        if infinite || g == 0 {
            return Value::clp(base, g as i32, UMAX);
        }
        let steps = |v: &Value| v.mtimes as u64 * (v.delta.unsigned_abs() as u64 / g.unsigned_abs());
        let mtimes = steps(lhs)
            .checked_add(steps(rhs))
            .filter(|&m| m < UMAX as u64)
            .unwrap_or(UMAX as u64);
        Value::clp(base, g as i32, mtimes as u32)
    }

    pub fn sub(&self, other: &Value) -> Value {
        if self.is_none() || other.is_none() {
            return Value::NONE;
        }
        if self.is_all() || other.is_all() {
            return Value::ALL;
        }
        if self.delta == 0 && other.delta == 0 {
            return Value::new(self.kind, self.base.wrapping_sub(other.base), 0, 0);
        }
        self.add(&Value::clp(
            other.base.wrapping_neg(),
            other.delta.wrapping_neg(),
            other.mtimes,
        ))
    }

    pub fn mul(&self, other: &Value) -> Value {
        if self.is_none() && other.is_none() {
            return Value::NONE;
        }
        if self.is_const() && other.is_const() {
            return Value::constant(self.base.wrapping_mul(other.base));
        }
        Value::ALL
    }

    /// Upper word of the unsigned 64-bit product.
    pub fn mulh(&self, other: &Value) -> Value {
        if self.is_none() && other.is_none() {
            return Value::NONE;
        }
        if self.is_const() && other.is_const() {
            let product = self.base as u32 as u64 * other.base as u32 as u64;
            return Value::constant((product >> 32) as i32);
        }
        Value::ALL
    }

    /// Shift amount of a shift operation, if it is usable.
    fn shift_amount(&self) -> Option<u32> {
        if self.is_const() && self.kind == Kind::Val && self.base >= 0 {
            Some(self.base as u32)
        } else {
            None
        }
    }

    pub fn shl(&self, other: &Value) -> Value {
        let shift = match other.shift_amount() {
            Some(shift) => shift,
            None => return Value::ALL,
        };
        if self.is_all() || self.is_none() {
            return *self;
        }
        if shift >= 32 {
            return Value::constant(0);
        }
        if self.is_const() {
            return Value::constant(self.base.wrapping_shl(shift));
        }
        Value::clp(
            self.base.wrapping_shl(shift),
            self.delta.wrapping_shl(shift),
            self.mtimes,
        )
        .canonical()
    }

    /// Arithmetic right shift.
    ///
    /// When the shift does not divide the delta, the result is rounded to the
    /// enclosing progression of step one.
    pub fn asr(&self, other: &Value) -> Value {
        let shift = match other.shift_amount() {
            Some(shift) => cmp::min(shift, 31),
            None => return Value::ALL,
        };
        if self.is_all() || self.is_none() {
            return *self;
        }
        if self.is_const() {
            return Value::constant(self.base >> shift);
        }
        if self.swrap() {
            return Value::ALL;
        }
        Value::shift_progression(self.base >> shift, self, shift)
    }

    /// Logical right shift.
    pub fn shr(&self, other: &Value) -> Value {
        let shift = match other.shift_amount() {
            Some(shift) => shift,
            None => return Value::ALL,
        };
        if self.is_all() || self.is_none() {
            return *self;
        }
        if shift >= 32 {
            return Value::constant(0);
        }
        if self.is_const() {
            return Value::constant(((self.base as u32) >> shift) as i32);
        }
        if self.uwrap() {
            return Value::ALL;
        }
        Value::shift_progression(((self.base as u32) >> shift) as i32, self, shift)
    }

    fn shift_progression(base: i32, value: &Value, shift: u32) -> Value {
        let divisor = 1i64 << shift;
        let delta = value.delta as i64;
        if delta % divisor == 0 {
            return Value::clp(base, (delta >> shift) as i32, value.mtimes).canonical();
        }
        let mtimes = if value.is_inf() {
            UMAX
        } else {
            let span = (value.mtimes as u64 * delta.unsigned_abs()) >> shift;
            cmp::min(span + 1, UMAX as u64) as u32
        };
        Value::clp(base, if delta < 0 { -1 } else { 1 }, mtimes)
    }

    pub fn or(&self, other: &Value) -> Value {
        if self.is_all() || other.is_none() {
            return *self;
        }
        if other.is_all() || self.is_none() {
            return *other;
        }
        if self.is_const() && other.is_const() {
            return Value::constant(self.base | other.base);
        }
        Value::ALL
    }

    /// Bitwise and, bounded by the set bits of the constant operand.
    pub fn and(&self, other: &Value) -> Value {
        if self.is_all() && other.is_all() {
            return Value::ALL;
        }
        if self.is_none() || other.is_none() {
            return Value::NONE;
        }
        if self.is_const() && other.is_const() {
            return Value::constant(self.base & other.base);
        }
        let (k, v) = if self.is_const() {
            (self.base as u32, other)
        } else if other.is_const() {
            (other.base as u32, self)
        } else {
            return Value::ALL;
        };
        if k == 0 {
            return Value::constant(0);
        }

        let highest_bit = |w: u32| if w == 0 { 0 } else { 31 - w.leading_zeros() };
        let m_k = k.trailing_zeros();
        let n_k = highest_bit(k);
        let n_v = if v.is_all() || v.uwrap() {
            31
        } else {
            cmp::max(highest_bit(v.upper() as u32), highest_bit(v.lower() as u32))
        };
        if m_k > n_v {
            return Value::constant(0);
        }
        let n = cmp::min(n_v, n_k);
        Value::clp(
            0,
            (1u32 << m_k) as i32,
            ((1u64 << (n - m_k + 1)) - 1) as u32,
        )
    }

    /// Smallest progression holding both operands.
    pub fn join(&self, other: &Value) -> Value {
        if self == other {
            return *self;
        }
        if self.is_all() || other.is_all() {
            return Value::ALL;
        }
        if self.is_none() {
            return Value::clp(other.base, other.delta, other.mtimes);
        }
        if other.is_none() {
            return *self;
        }

        if self.is_const() && other.is_const() {
            let (low, high) = if other.base > self.base {
                (self.base, other.base)
            } else {
                (other.base, self.base)
            };
            return Value::clp(low, high.wrapping_sub(low), 1);
        }

        if self.is_const() || other.is_const() {
            let (k, v) = if self.is_const() {
                (self, other)
            } else {
                (other, self)
            };
            if v.holds(k.base) {
                return *v;
            }
        }

        if self.is_inf() && other.is_inf() {
            if self.direction() != other.direction() {
                return Value::ALL;
            }
            let g = Value::step_gcd(&[
                self.base as i64 - other.base as i64,
                self.delta as i64,
                other.delta as i64,
            ]);
            let base = if self.direction() {
                cmp::min(self.base, other.base)
            } else {
                cmp::max(self.base, other.base)
            };
            let delta = if self.direction() { g } else { -g };
            return Value::clp(base, delta as i32, UMAX);
        }

        if self.is_inf() || other.is_inf() {
            let (a, b) = if self.is_inf() {
                (*self, *other)
            } else {
                (*other, *self)
            };
            let b = if a.direction() != b.direction() {
                b.reverse()
            } else {
                b
            };
            let g = Value::step_gcd(&[
                a.base as i64 - b.base as i64,
                a.delta as i64,
                b.delta as i64,
            ]);
            let (base, delta) = if a.direction() {
                (cmp::min(a.base, b.base), g)
            } else {
                (cmp::max(a.base, b.base), -g)
            };
            return Value::clp(base, delta as i32, UMAX);
        }

        // The second arc is tried one lap below, in place and one lap above:
        // a wrapping operand is then joined as its part before the overflow
        // followed by its part after it, and the tightest result is kept.
        let (s1, e1) = self.arc();
        let (s2, e2) = other.arc();
        let delta = |v: &Value| v.delta.unsigned_abs() as i64;
        let mut best: Option<(i128, i64, i128)> = None;
        for lap in [0, -(RING as i128), RING as i128] {
            let (s2, e2) = (s2 + lap, e2 + lap);
            let g = Value::step_gcd(&[(s1 - s2) as i64, delta(self), delta(other)]) as i128;
            let low = cmp::min(s1, s2);
            let mtimes = (cmp::max(e1, e2) - low) / g;
            if best.map_or(true, |(_, _, m)| mtimes < m) {
                best = Some((low, g as i64, mtimes));
            }
        }
        match best {
            Some((low, g, mtimes)) => Value::clp(
                low.rem_euclid(RING as i128) as u32 as i32,
                g as i32,
                cmp::min(mtimes, UMAX as i128) as u32,
            ),
            None => Value::ALL,
        }
    }

    /// The progression as an increasing interval of the integers, from its
    /// smallest element as a signed word. Wrapping progressions go past
    /// `MAXN`.
    fn arc(&self) -> (i128, i128) {
        let v = if self.delta < 0 {
            self.reverse()
        } else {
            *self
        };
        let start = v.base as i128;
        (start, start + v.delta.unsigned_abs() as i128 * v.mtimes as i128)
    }

    /// Positive gcd of the magnitudes of `values`, at least one.
    fn step_gcd(values: &[i64]) -> i64 {
        let g = values.iter().fold(0i64, |g, v| g.gcd(&v.abs()));
        cmp::max(g, 1)
    }

    /// Widening of `self` by the next iterate `other`.
    ///
    /// Growing progressions are extrapolated to an unbounded multiplicity,
    /// anything that cannot be extrapolated in a single direction becomes ALL.
    pub fn widening(&self, other: &Value) -> Value {
        if self.is_none() && other.is_none() {
            return Value::NONE;
        }
        if self.is_all() || other.is_all() {
            return Value::ALL;
        }
        if self == other {
            return *self;
        }
        if self.is_none() {
            return *other;
        }
        if other.is_none() {
            return *self;
        }

        let result = match (self.is_const(), other.is_const()) {
            (true, true) => Value::clp(self.base, other.base.wrapping_sub(self.base), UMAX),
            (true, false) => {
                let k = self.base;
                let ahead = (other.delta > 0 && k <= other.base)
                    || (other.delta < 0 && k >= other.base);
                if ahead {
                    let g = Value::step_gcd(&[other.delta as i64, other.base as i64 - k as i64]);
                    let delta = if other.delta < 0 { -g } else { g };
                    Value::clp(k, delta as i32, UMAX)
                } else {
                    Value::ALL
                }
            }
            (false, true) => {
                let k = other.base;
                if self.holds(k) {
                    return *self;
                }
                let ahead =
                    (self.delta > 0 && k >= self.base) || (self.delta < 0 && k <= self.base);
                if ahead {
                    let g = Value::step_gcd(&[self.delta as i64, k as i64 - self.base as i64]);
                    let delta = if self.delta < 0 { -g } else { g };
                    Value::clp(self.base, delta as i32, UMAX)
                } else {
                    Value::ALL
                }
            }
            (false, false) => self.widen_progressions(other),
        };
        result.canonical()
    }

    fn widen_progressions(&self, other: &Value) -> Value {
        if self.is_inf() && other.is_inf() {
            if self.direction() != other.direction() {
                return Value::ALL;
            }
            let behind = (self.delta > 0 && other.base < self.base)
                || (self.delta < 0 && other.base > self.base);
            if behind {
                return Value::ALL;
            }
            let g = Value::step_gcd(&[
                self.delta as i64,
                other.delta as i64,
                other.base as i64 - self.base as i64,
            ]);
            let delta = if self.delta < 0 { -g } else { g };
            return Value::clp(self.base, delta as i32, UMAX);
        }
        if self.is_inf() || other.is_inf() {
            let joined = self.join(other);
            return if self.is_inf() && joined.base != self.base {
                Value::ALL
            } else {
                joined
            };
        }

        let (start, stop) = (self.start() as i64, self.stop() as i64);
        let (ostart, ostop) = (other.start() as i64, other.stop() as i64);
        if ostart >= start && ostop <= stop {
            return self.join(other);
        }
        let g = Value::step_gcd(&[
            self.delta as i64,
            other.delta as i64,
            start - ostart,
            stop - ostop,
        ]);
        if ostart <= start && ostop <= stop {
            Value::clp(stop as i32, -g as i32, UMAX)
        } else if ostart >= start && ostop >= stop {
            Value::clp(start as i32, g as i32, UMAX)
        } else {
            Value::ALL
        }
    }

    /// Widening using a known iteration bound of the enclosing loop.
    ///
    /// The progression started by `self` is extended to exactly `bound`
    /// steps instead of an unbounded multiplicity.
    pub fn ffwidening(&self, other: &Value, bound: u32) -> Value {
        if self.is_none() && other.is_none() {
            return Value::NONE;
        }
        if self.is_all() || other.is_all() {
            return Value::ALL;
        }
        if self == other {
            return *self;
        }
        if self.is_none() {
            return *other;
        }
        if other.is_none() {
            return *self;
        }

        let result = match (self.is_const(), other.is_const()) {
            (true, true) => {
                let (k1, k2) = (self.base, other.base);
                if k1 < k2 {
                    Value::clp(k1, k2.wrapping_sub(k1), bound)
                } else {
                    let step = k1.wrapping_sub(k2);
                    Value::clp(
                        k1.wrapping_sub((bound as i32).wrapping_mul(step)),
                        step,
                        bound,
                    )
                }
            }
            (true, false) => {
                let k = self.base as i64;
                let (base, last) = (other.base as i64, other.upper() as i64);
                let ahead =
                    (other.delta > 0 && k <= base) || (other.delta < 0 && k >= base);
                if !ahead || other.is_inf() || other.swrap() {
                    Value::ALL
                } else {
                    let step = Value::step_gcd(&[other.delta as i64, base - k]);
                    let needed = (last - k).abs() / step;
                    if needed <= bound as i64 {
                        let delta = if other.delta < 0 { -step } else { step };
                        Value::clp(self.base, delta as i32, bound)
                    } else {
                        Value::ALL
                    }
                }
            }
            (false, _) => {
                if &self.join(other) == self {
                    *self
                } else {
                    Value::ALL
                }
            }
        };
        result.canonical()
    }

    /// Intersection of two values.
    pub fn inter(&self, other: &Value) -> Value {
        if self.is_none() || other.is_none() {
            return Value::NONE;
        }
        if self == other {
            return *self;
        }
        if self.is_all() {
            return *other;
        }
        if other.is_all() {
            return *self;
        }
        match (self.is_const(), other.is_const()) {
            (true, true) => {
                if self.base == other.base {
                    self.canonical()
                } else {
                    Value::NONE
                }
            }
            (true, false) => {
                if other.holds(self.base) {
                    self.canonical()
                } else {
                    Value::NONE
                }
            }
            (false, true) => {
                if self.holds(other.base) {
                    other.canonical()
                } else {
                    Value::NONE
                }
            }
            (false, false) => self.inter_progressions(other),
        }
    }

    fn inter_progressions(&self, other: &Value) -> Value {
        match (self.congruence(), other.congruence()) {
            (Some((m1, r1)), Some((m2, r2))) => {
                let (modulus, residue) = if m1 >= m2 { (m1, r1) } else { (m2, r2) };
                let (small_modulus, small_residue) = if m1 >= m2 { (m2, r2) } else { (m1, r1) };
                if residue % small_modulus != small_residue {
                    return Value::NONE;
                }
                return Value::clp(
                    residue as u32 as i32,
                    modulus as u32 as i32,
                    (RING / modulus - 1) as u32,
                );
            }
            (Some((modulus, residue)), None) => return other.restrict_to_class(modulus, residue),
            (None, Some((modulus, residue))) => return self.restrict_to_class(modulus, residue),
            (None, None) => {}
        }
        if self.wraps_ring() {
            return *other;
        }
        if other.wraps_ring() {
            return *self;
        }

        let increasing = |v: &Value| if v.delta < 0 { v.reverse() } else { *v };
        let (v1, v2) = (increasing(self), increasing(other));
        if v1.swrap() || v2.swrap() {
            let (p1, q1) = v1.pq_split();
            let (p2, q2) = v2.pq_split();
            return p1
                .inter(&p2)
                .join(&p1.inter(&q2))
                .join(&q1.inter(&p2))
                .join(&q1.inter(&q2));
        }
        v1.inter_linear(&v2)
    }

    /// Elements of this progression congruent to `residue` modulo `modulus`.
    fn restrict_to_class(&self, modulus: u64, residue: u64) -> Value {
        let v = if self.delta < 0 {
            self.reverse()
        } else {
            *self
        };
        let m = modulus as i64;
        let delta = v.delta.unsigned_abs() as i64;
        let c = residue as i64 - v.base as u32 as i64;
        let first = match solve_congruence(delta, c, m) {
            Some(first) => first,
            None => return Value::NONE,
        };
        if first > v.mtimes as i64 {
            return Value::NONE;
        }
        let period = m / delta.gcd(&m);
        let mtimes = (v.mtimes as i64 - first) / period;
        Value::clp(
            v.base.wrapping_add((first * delta) as i32),
            (delta * period) as i32,
            mtimes as u32,
        )
        .canonical()
    }

    /// Intersection of two increasing progressions that do not wrap.
    fn inter_linear(&self, other: &Value) -> Value {
        let (large, small) = if self.base >= other.base {
            (self, other)
        } else {
            (other, self)
        };
        let (lb, ld) = (large.base as i64, large.delta as i64);
        let (sb, sd) = (small.base as i64, small.delta as i64);
        if (lb - sb) / sd > small.mtimes as i64 {
            return Value::NONE;
        }

        let j = match solve_congruence(ld, sb - lb, sd) {
            Some(j) => j,
            None => return Value::NONE,
        };
        let base = lb + j * ld;
        let top = cmp::min(
            lb + ld * large.mtimes as i64,
            sb + sd * small.mtimes as i64,
        );
        if base > top {
            return Value::NONE;
        }
        let step = lcm(ld, sd);
        let mtimes = (top - base) / step;
        if mtimes == 0 {
            Value::constant(base as i32)
        } else if step > MAXN as i64 {
            Value::constant(base as i32).join(&Value::constant((base + step) as i32))
        } else {
            Value::clp(base as i32, step as i32, mtimes as u32)
        }
    }

    /// Signed `>= k` restriction.
    ///
    /// A decreasing progression is assumed not to overflow: only its prefix
    /// down to the signed minimum is considered.
    pub fn ge(&self, k: i32) -> Value {
        match self.kind {
            Kind::All => return Value::clp(k, 1, (MAXN as i64 - k as i64) as u32),
            Kind::None => return Value::NONE,
            Kind::Reg | Kind::Val => {}
        }
        if self.is_const() {
            return if k > self.base { Value::NONE } else { *self };
        }
        if self.delta > 0 {
            return self.inter(&Value::clp(k, 1, (MAXN as i64 - k as i64) as u32));
        }
        if self.base < k {
            return Value::NONE;
        }
        let end = self.base as i64 + self.delta as i64 * self.mtimes as i64;
        if end >= k as i64 {
            return *self;
        }
        let mtimes = (self.base as i64 - k as i64) / self.delta.unsigned_abs() as i64;
        Value::new(self.kind, self.base, self.delta, mtimes as u32).canonical()
    }

    /// Signed `<= k` restriction.
    ///
    /// A progression overflowing the signed range is first cut to the part
    /// before the overflow.
    pub fn le(&self, k: i32) -> Value {
        match self.kind {
            Kind::All => return Value::clp(MINN, 1, (k as i64 - MINN as i64) as u32),
            Kind::None => return Value::NONE,
            Kind::Reg | Kind::Val => {}
        }
        if self.is_const() {
            return if k < self.base { Value::NONE } else { *self };
        }

        let base = self.base as i64;
        let delta = self.delta as i64;
        let mut mtimes = self.mtimes as i64;
        if self.swrap() {
            mtimes = if delta >= 0 {
                (MAXN as i64 - base) / delta
            } else {
                (base - MINN as i64) / -delta
            };
        }
        let end = base + delta * mtimes;
        let (start, stop) = if delta >= 0 { (base, end) } else { (end, base) };
        let k = k as i64;

        if start > k {
            return Value::NONE;
        }
        if stop <= k {
            return Value::new(self.kind, self.base, self.delta, mtimes as u32).canonical();
        }
        if delta >= 0 {
            let mtimes = (k - base) / delta;
            Value::new(self.kind, self.base, self.delta, mtimes as u32).canonical()
        } else {
            let skipped = (base - k - delta - 1) / -delta;
            Value::new(
                self.kind,
                (base + delta * skipped) as i32,
                self.delta,
                (mtimes - skipped) as u32,
            )
            .canonical()
        }
    }

    /// Unsigned `>= k` restriction.
    pub fn geu(&self, k: u32) -> Value {
        match self.kind {
            Kind::All => return Value::clp(k as i32, 1, UMAX - k),
            Kind::None => return Value::NONE,
            Kind::Reg | Kind::Val => {}
        }
        if self.is_const() {
            return if k > self.base as u32 {
                Value::NONE
            } else {
                *self
            };
        }
        if self.delta < 0 {
            let reversed = self.reverse().geu(k);
            return if reversed.is_const() || reversed.is_none() {
                reversed
            } else {
                reversed.reverse()
            };
        }
        if self.uwrap() {
            return self.inter(&Value::clp(k as i32, 1, UMAX - k));
        }

        let start = self.base as u32 as u64;
        let delta = self.delta as u64;
        let end = start + delta * self.mtimes as u64;
        let k = k as u64;
        if end < k {
            return Value::NONE;
        }
        let first = if k > start {
            start + (k - start + delta - 1) / delta * delta
        } else {
            start
        };
        let mtimes = (end - first) / delta;
        Value::new(self.kind, first as u32 as i32, self.delta, mtimes as u32).canonical()
    }

    /// Unsigned `<= k` restriction.
    pub fn leu(&self, k: u32) -> Value {
        match self.kind {
            Kind::All => return Value::clp(0, 1, k),
            Kind::None => return Value::NONE,
            Kind::Reg | Kind::Val => {}
        }
        if self.is_const() {
            return if k < self.base as u32 {
                Value::NONE
            } else {
                *self
            };
        }
        if self.delta < 0 || self.uwrap() {
            return self.inter(&Value::clp(0, 1, k));
        }

        let start = self.base as u32 as u64;
        let delta = self.delta as u64;
        let end = start + delta * self.mtimes as u64;
        let k = k as u64;
        if start > k {
            return Value::NONE;
        }
        if end <= k {
            return *self;
        }
        let mtimes = (k - start) / delta;
        Value::new(self.kind, self.base, self.delta, mtimes as u32).canonical()
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        let unit = |v: &Value| (v.delta == 1 || v.delta == -1) && v.mtimes == UMAX;
        (self.kind == other.kind
            && self.base == other.base
            && self.delta == other.delta
            && self.mtimes == other.mtimes)
            || (unit(self) && unit(other))
    }
}

impl Eq for Value {}

impl From<i32> for Value {
    fn from(k: i32) -> Value {
        Value::constant(k)
    }
}

impl Default for Value {
    fn default() -> Value {
        Value::ALL
    }
}

struct Signed(i32);

impl fmt::Display for Signed {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.0 < 0 {
            write!(f, "-0x{:x}", self.0.unsigned_abs())
        } else {
            write!(f, "0x{:x}", self.0)
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.kind {
            Kind::All => write!(f, "T"),
            Kind::None => write!(f, "_"),
            Kind::Reg | Kind::Val => {
                if self.delta == 0 && self.mtimes == 0 {
                    write!(f, "k(0x{:x})", self.base)
                } else if self.is_inf() {
                    write!(f, "({}, {}, inf)", Signed(self.base), Signed(self.delta))
                } else {
                    write!(
                        f,
                        "({}, {}, 0x{:x})",
                        Signed(self.base),
                        Signed(self.delta),
                        self.mtimes
                    )
                }
            }
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn val(base: i32, delta: i32, mtimes: u32) -> Value {
        Value::clp(base, delta, mtimes)
    }

    #[test]
    fn equality() {
        assert_eq!(Value::ALL, Value::ALL);
        assert_eq!(Value::NONE, Value::NONE);
        assert_ne!(Value::ALL, Value::NONE);
        let v1 = val(5, 3, 10);
        let v2 = val(3, 2, 10);
        assert_eq!(v1, v1);
        assert_ne!(v1, v2);
        assert_ne!(v1, Value::ALL);
        assert_ne!(v1, Value::NONE);
        assert_eq!(val(7, -1, UMAX), Value::ALL);
    }

    #[test]
    fn canonical_kinds() {
        assert_eq!(Value::new(Kind::All, 3, 4, 5).base(), 0);
        assert_eq!(Value::new(Kind::None, 3, 4, 5).mtimes(), 0);
        assert!(val(4, 0, 12).is_const());
        assert!(val(4, 7, 0).is_const());
        assert!(!Value::ALL.is_const());
    }

    #[test]
    fn wrap_predicates() {
        let v1 = val(10, 1, 100);
        let v2 = val(10, 1, UMAX);
        let v3 = val(10, 1, (MAXN - 10) as u32);
        let v4 = val(10, 1, MAXN as u32);
        let v5 = val(10, 1, UMAX - 10);
        assert!(!v1.swrap());
        assert!(v2.swrap());
        assert!(!v3.swrap());
        assert!(v4.swrap());
        assert!(v5.swrap());
        assert!(!v1.uwrap());
        assert!(v2.uwrap());
        assert!(!v3.uwrap());
        assert!(!v4.uwrap());
        assert!(!v5.uwrap());
    }

    #[test]
    fn gcd_keeps_direction() {
        assert_eq!(gcd(12, 8), 4);
        assert_eq!(gcd(-12, -8), -4);
        assert_eq!(gcd(-12, 8), 4);
        assert_eq!(gcd(0, -6), -6);
        assert_eq!(gcd(0, 0), 0);
    }

    #[test]
    fn reverse_twice() {
        let v = val(16, 4, 4);
        assert_eq!(v.reverse(), val(32, -4, 4));
        assert_eq!(v.reverse().reverse(), v);
    }

    #[test]
    fn display() {
        assert_eq!(Value::ALL.to_string(), "T");
        assert_eq!(Value::NONE.to_string(), "_");
        assert_eq!(Value::constant(0x10).to_string(), "k(0x10)");
        assert_eq!(val(-4, 2, 3).to_string(), "(-0x4, 0x2, 0x3)");
        assert_eq!(val(4, -2, UMAX).to_string(), "(0x4, -0x2, inf)");
    }

    #[test]
    fn addition() {
        assert_eq!(Value::constant(3).add(&Value::constant(4)), Value::constant(7));
        assert_eq!(val(0, 2, 3).add(&Value::constant(4)), val(4, 2, 3));
        assert_eq!(val(8, -4, UMAX).add(&val(0, 1, 1)), val(9, -1, UMAX));
        assert_eq!(Value::ALL.add(&Value::constant(1)), Value::ALL);
        assert_eq!(Value::NONE.add(&Value::NONE), Value::NONE);
    }

    #[test]
    fn subtraction() {
        assert_eq!(val(8, -1, UMAX).sub(&val(1, 0, 0)), val(7, -1, UMAX));
        assert_eq!(val(2, 3, 2).sub(&val(8, 1, UMAX)), val(0, -1, UMAX));
        assert_eq!(val(8, 1, UMAX).sub(&val(2, 3, 2)), val(0, 1, UMAX));
        assert_eq!(val(8, 1, 1).sub(&val(2, 3, 2)), val(0, 1, 7));
        assert_eq!(val(2, 3, UMAX).sub(&val(8, 1, UMAX)), Value::ALL);
        assert_eq!(val(8, -1, 1).sub(&val(2, -3, 2)), val(5, 1, 7));
        assert_eq!(val(7, 1, 1).sub(&val(-4, 3, 2)), val(5, 1, 7));
        assert_eq!(
            val(0, 1, 0xFFFF_FFFE).sub(&val(0, -2, 0x7FFF_FFFE)),
            val(0, 1, UMAX)
        );
    }

    #[test]
    fn multiplication() {
        assert_eq!(Value::constant(6).mul(&Value::constant(7)), Value::constant(42));
        assert_eq!(
            Value::constant(0x10000).mul(&Value::constant(0x10)),
            Value::constant(0x100000)
        );
        assert_eq!(val(0, 1, 4).mul(&Value::constant(2)), Value::ALL);
        assert_eq!(
            Value::constant(-1).mulh(&Value::constant(2)),
            Value::constant(1)
        );
    }

    #[test]
    fn shifts() {
        assert_eq!(Value::constant(3).shl(&Value::constant(4)), Value::constant(48));
        assert_eq!(val(1, 2, 3).shl(&Value::constant(2)), val(4, 8, 3));
        assert_eq!(val(1, 2, 3).shl(&val(0, 1, 2)), Value::ALL);
        assert_eq!(val(2, 2, 11).asr(&Value::constant(2)), val(0, 1, 6));
        assert_eq!(val(8, 4, 4).asr(&Value::constant(2)), val(2, 1, 4));
        assert_eq!(val(8, -1, UMAX).asr(&Value::constant(1)), val(4, -1, UMAX));
        assert_eq!(Value::constant(-8).asr(&Value::constant(1)), Value::constant(-4));
        assert_eq!(
            Value::constant(-8).shr(&Value::constant(28)),
            Value::constant(0xf)
        );
        assert_eq!(val(-8, 4, 4).shr(&Value::constant(1)), Value::ALL);
    }

    #[test]
    fn bitwise_and() {
        assert_eq!(val(0xa7, -1, 0x63).and(&Value::constant(0xc0000)), Value::constant(0));
        assert_eq!(val(7, -1, 3).and(&Value::constant(0xc0000)), Value::constant(0));
        assert_eq!(val(0, 1, 2).and(&Value::constant(0xa0000002u32 as i32)), val(0, 2, 1));
        assert_eq!(Value::constant(0xff).and(&val(-0xff, 1, 0x1fe)), val(0, 1, 0xff));
        assert_eq!(val(0, 1, 2).and(&val(0, 2, 2)), Value::ALL);
    }

    #[test]
    fn bitwise_or() {
        assert_eq!(Value::constant(0xf0).or(&Value::constant(0x0f)), Value::constant(0xff));
        assert_eq!(val(0, 1, 2).or(&Value::constant(1)), Value::ALL);
        assert_eq!(Value::NONE.or(&Value::constant(1)), Value::constant(1));
    }

    #[test]
    fn join_constants() {
        assert_eq!(Value::constant(4).join(&Value::constant(10)), val(4, 6, 1));
        assert_eq!(Value::constant(10).join(&Value::constant(4)), val(4, 6, 1));
    }

    #[test]
    fn join_cases() {
        assert_eq!(
            Value::constant(0x84c4).join(&val(0x84c4, -112, UMAX)),
            val(0x84c4, -112, UMAX)
        );
        assert_eq!(val(2, 1, UMAX).join(&val(0, 8, 1)), val(0, 1, UMAX));
        assert_eq!(
            val(0x20094c, 8, 1).join(&Value::constant(0x200944)),
            val(0x200944, 8, 2)
        );
        assert_eq!(val(0, 4, UMAX).join(&val(2, 4, UMAX)), val(0, 2, UMAX));
    }

    #[test]
    fn join_laws() {
        let values = [
            Value::constant(3),
            val(0, 4, 10),
            val(100, -3, 7),
            val(12, 2, UMAX),
            Value::ALL,
            Value::NONE,
        ];
        for v in &values {
            assert_eq!(v.join(v), *v);
            assert_eq!(v.join(&Value::NONE), *v);
            assert_eq!(v.join(&Value::ALL), Value::ALL);
            assert_eq!(v.inter(v), *v);
            assert_eq!(v.inter(&Value::NONE), Value::NONE);
            assert_eq!(v.inter(&Value::ALL), *v);
        }
    }

    #[test]
    fn join_encloses_operands() {
        let pairs = [
            (val(0, 4, 10), val(2, 6, 3)),
            (val(100, -3, 7), Value::constant(-5)),
            (val(-20, 5, 3), val(40, -10, 2)),
            (val(MAXN - 1, 1, 3), Value::constant(MINN + 5)),
            (val(MINN + 1, -1, 3), val(MAXN - 9, 3, 2)),
        ];
        for (a, b) in &pairs {
            let j = a.join(b);
            for v in [a, b] {
                for i in 0..=v.mtimes() {
                    let word = v.base().wrapping_add(v.delta().wrapping_mul(i as i32));
                    assert!(
                        Value::constant(word).inter(&j) != Value::NONE,
                        "{} misses {} of {}",
                        j,
                        word,
                        v
                    );
                }
            }
        }
    }

    #[test]
    fn join_across_overflow() {
        assert_eq!(
            val(MAXN - 1, 1, 3).join(&Value::constant(MINN + 5)),
            val(MAXN - 1, 1, 7)
        );
        assert_eq!(
            Value::constant(MINN + 5).join(&val(MAXN - 1, 1, 3)),
            val(MAXN - 1, 1, 7)
        );
        assert_eq!(
            val(MINN + 1, -1, 3).join(&Value::constant(MAXN - 4)),
            val(MAXN - 4, 1, 6)
        );
    }

    #[test]
    fn membership_over_several_laps() {
        // 3 * 1431655766 = 2 on the ring
        let increasing = val(0, 3, 1 << 31);
        assert_eq!(increasing.inter(&Value::constant(2)), Value::constant(2));
        assert_eq!(Value::constant(2).inter(&increasing), Value::constant(2));
        // reached only for j = 2863311531
        assert_eq!(increasing.inter(&Value::constant(1)), Value::NONE);

        let decreasing = val(-1, -3, 0x7fff_ffff);
        assert_eq!(decreasing.inter(&Value::constant(-1)), Value::constant(-1));
        assert_eq!(decreasing.inter(&Value::constant(0)), Value::constant(0));
        assert_eq!(val(0, 3, 10).inter(&Value::constant(2)), Value::NONE);
    }

    #[test]
    fn intersection() {
        assert_eq!(
            val(-10, 1, 20).inter(&val(10, 1, (MAXN - 10) as u32)),
            Value::constant(10)
        );
        assert_eq!(
            val(1, 1, 0x7FFF_FFFE).inter(&val(-1, -1, 0x7FFF_FFFE)),
            Value::NONE
        );
        assert_eq!(
            val(1, 1, 0x7FFF_FFFF).inter(&val(-1, -1, 0x7FFF_FFFF)),
            Value::constant(MINN)
        );
        assert_eq!(val(2, -1, UMAX).inter(&val(2, 1, 1)), val(2, 1, 1));
        assert_eq!(val(2, -2, UMAX).inter(&val(2, 1, 1)), Value::constant(2));
        assert_eq!(Value::constant(3).inter(&val(2, 2, 1000)), Value::NONE);
        assert_eq!(
            Value::constant(0x800004acu32 as i32).inter(&val(-0x7ffffb54, -0x1ffffee4, 1)),
            Value::constant(0x800004acu32 as i32)
        );
        assert_eq!(
            Value::constant(0x6784a1ea).inter(&val(-0x29d12fb8, 2, 0x48aae8d1)),
            Value::constant(0x6784a1ea)
        );
        assert_eq!(val(0, 4, 10).inter(&val(2, 6, 10)), val(8, 12, 2));
    }

    #[test]
    fn pq_split() {
        let (p, q) = val(MAXN - 1, 1, 3).pq_split();
        assert_eq!(p, val(MAXN - 1, 1, 1));
        assert_eq!(q, val(MINN, 1, 1));
        let (p, q) = val(0, 1, 3).pq_split();
        assert_eq!(p, val(0, 1, 3));
        assert_eq!(q, Value::NONE);
    }

    #[test]
    fn signed_ge() {
        assert_eq!(Value::ALL.ge(10), val(10, 1, 0x7FFF_FFF5));
        assert_eq!(Value::NONE.ge(10), Value::NONE);
        assert_eq!(Value::constant(15).ge(10), Value::constant(15));
        assert_eq!(Value::constant(5).ge(10), Value::NONE);
        assert_eq!(val(-10, 1, 15).ge(10), Value::NONE);
        assert_eq!(val(15, 1, 10).ge(10), val(15, 1, 10));
        assert_eq!(val(0, 1, 20).ge(10), val(10, 1, 10));
        assert_eq!(val(0, -1, 10).ge(10), Value::NONE);
        assert_eq!(val(25, -1, 10).ge(10), val(25, -1, 10));
        assert_eq!(val(15, -1, 10).ge(10), val(15, -1, 5));
    }

    #[test]
    fn signed_le() {
        assert_eq!(Value::ALL.le(10), val(MINN, 1, 0x8000_000a));
        assert_eq!(Value::NONE.le(10), Value::NONE);
        assert_eq!(Value::constant(5).le(10), Value::constant(5));
        assert_eq!(Value::constant(5).le(0), Value::NONE);
        assert_eq!(val(16, 4, 4).le(10), Value::NONE);
        assert_eq!(val(32, -4, 4).le(10), Value::NONE);
        assert_eq!(val(16, 4, 4).le(100), val(16, 4, 4));
        assert_eq!(val(32, -4, 4).le(100), val(32, -4, 4));
        assert_eq!(val(16, 4, 4).le(32), val(16, 4, 4));
        assert_eq!(val(32, -4, 4).le(32), val(32, -4, 4));
        assert_eq!(val(16, 4, 4).le(31), val(16, 4, 3));
        assert_eq!(val(32, -4, 4).le(31), val(28, -4, 3));
    }

    #[test]
    fn signed_le_overflowing() {
        assert_eq!(val(16, 4, UMAX).le(10), Value::NONE);
        assert_eq!(
            val(-32, -4, UMAX).le(0),
            val(-32, -4, ((MINN as i64 + 32) / -4) as u32)
        );
        assert_eq!(val(-32, 4, 0xFFFF_FFFE).le(0), val(-32, 4, 8));
        assert_eq!(val(32, -4, 0xFFFF_FFFE).le(0), val(0, -4, 0x2000_0000));
        assert_eq!(val(0, 1, UMAX).le(0xff), val(0, 1, 0xff));
        assert_eq!(
            val(0x7FFF_E775, -1, UMAX).le(0xffff_e775u32 as i32),
            val(-0x188b, -1, 0x7fff_e775)
        );
    }

    #[test]
    fn unsigned_geu() {
        assert_eq!(Value::NONE.geu(10), Value::NONE);
        assert_eq!(Value::constant(15).geu(10), Value::constant(15));
        assert_eq!(Value::constant(5).geu(10), Value::NONE);
        assert_eq!(val(0, 1, 5).geu(10), Value::NONE);
        assert_eq!(val(15, 1, 10).geu(10), val(15, 1, 10));
        assert_eq!(val(0, 1, 20).geu(10), val(10, 1, 10));
        assert_eq!(val(5, -1, 5).geu(10), Value::NONE);
        assert_eq!(val(25, -1, 10).geu(10), val(25, -1, 10));
        assert_eq!(val(15, -1, 10).geu(10), val(15, -1, 5));
        assert_eq!(val(0, 4, 10).geu(10), val(12, 4, 7));
    }

    #[test]
    fn unsigned_leu() {
        assert_eq!(Value::ALL.leu(10), val(0, 1, 10));
        assert_eq!(Value::NONE.leu(10), Value::NONE);
        assert_eq!(Value::constant(15).leu(20), Value::constant(15));
        assert_eq!(Value::constant(15).leu(10), Value::NONE);
        assert_eq!(val(15, 1, 5).leu(10), Value::NONE);
        assert_eq!(val(0, 1, 5).leu(10), val(0, 1, 5));
        assert_eq!(val(0, 1, 20).leu(10), val(0, 1, 10));
        assert_eq!(val(20, -1, 5).leu(10), Value::NONE);
        assert_eq!(val(5, -1, 5).leu(10), val(0, 1, 5));
        assert_eq!(val(15, -1, 10).leu(10), val(5, 1, 5));
        assert_eq!(val(-5, 1, 10).leu(10), val(0, 1, 5));
    }

    #[test]
    fn widening_cases() {
        assert_eq!(Value::constant(1).widening(&Value::constant(2)), val(1, 1, UMAX));
        assert_eq!(Value::constant(0).widening(&val(0, 1, UMAX)), val(0, 1, UMAX));
        assert_eq!(Value::constant(2).widening(&val(3, 1, UMAX)), val(2, 1, UMAX));
        assert_eq!(val(-1, -1, UMAX).widening(&val(0, -1, UMAX)), Value::ALL);
        assert_eq!(
            val(0x6000000C, 4, UMAX).widening(&Value::constant(0x6000004c)),
            val(0x6000000C, 4, UMAX)
        );
        assert_eq!(
            val(0x6000000C, 4, 0x20).widening(&Value::constant(0x6000004c)),
            val(0x6000000C, 4, 0x20)
        );
        assert_eq!(
            val(0x60000004, 8, UMAX).widening(&val(0x6000000C, 4, UMAX)),
            val(0x60000004, 4, UMAX)
        );
        assert_eq!(val(0, 4, 2).widening(&val(0, 4, 3)), val(0, 4, UMAX));
        assert_eq!(val(0, 4, 2).widening(&val(-4, 4, 3)), val(8, -4, UMAX));
        assert_eq!(val(0, 4, 2).widening(&val(-4, 4, 5)), Value::ALL);
    }

    #[test]
    fn widening_reaches_fixed_point() {
        for increment in [1, 3, 1024, 0x10000] {
            let mut current = Value::constant(0);
            let mut steps = 0;
            loop {
                let next = current.join(&current.add(&Value::constant(increment)));
                let widened = current.widening(&next);
                steps += 1;
                if widened == current {
                    break;
                }
                current = widened;
                assert!(steps < 8, "no fixed point for increment {}", increment);
            }
        }
    }

    #[test]
    fn bounded_widening() {
        assert_eq!(
            Value::constant(0).ffwidening(&Value::constant(1), 5),
            val(0, 1, 5)
        );
        assert_eq!(
            Value::constant(10).ffwidening(&Value::constant(8), 5),
            val(0, 2, 5)
        );
        assert_eq!(val(0, 1, 5).ffwidening(&val(0, 1, 4), 5), val(0, 1, 5));
        assert_eq!(val(0, 1, 5).ffwidening(&val(0, 1, 6), 5), Value::ALL);
        assert_eq!(Value::constant(0).ffwidening(&val(1, 1, 3), 5), val(0, 1, 5));
    }
}
