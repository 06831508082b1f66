//! Edge filters.
//!
//! A conditional branch gives, on each of its outgoing edges, a list of
//! comparisons known to hold when the edge is followed. The lists are in
//! disjunctive normal form: `Filter::Or` separates the conjunctions.

use crate::clp::value::{Kind, Value};
use serde::Serialize;
use std::fmt;

/// Comparison operators of a filter.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize)]
pub enum Comparison {
    Eq,
    Ne,
    Lt,
    Le,
    Ge,
    Gt,
    Ult,
    Ule,
    Uge,
    Ugt,
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            Comparison::Eq => "==",
            Comparison::Ne => "!=",
            Comparison::Lt => "<",
            Comparison::Le => "<=",
            Comparison::Ge => ">=",
            Comparison::Gt => ">",
            Comparison::Ult => "<u",
            Comparison::Ule => "<=u",
            Comparison::Uge => ">=u",
            Comparison::Ugt => ">u",
        };
        write!(f, "{}", s)
    }
}

/// One element of a filter list.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum Filter {
    /// `target op bound`, where `target` designates a register or a memory
    /// cell, in the way `State::get` expects it.
    Compare {
        op: Comparison,
        target: Value,
        bound: Value,
    },
    /// Start of another conjunction.
    Or,
    /// A comparison that could not be built, ignored.
    Skip,
}

impl Filter {
    pub fn compare(op: Comparison, target: Value, bound: Value) -> Filter {
        Filter::Compare { op, target, bound }
    }

    /// A comparison on register `index`.
    pub fn register(index: i32, op: Comparison, bound: Value) -> Filter {
        Filter::compare(op, Value::register(index), bound)
    }

    /// A comparison on the memory cell at `address`.
    pub fn memory(address: u32, op: Comparison, bound: Value) -> Filter {
        Filter::compare(op, Value::constant(address as i32), bound)
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Filter::Compare { op, target, bound } => match target.kind() {
                Kind::Reg => write!(f, "r{} {} {}", target.base(), op, bound),
                _ => write!(f, "[{}] {} {}", target, op, bound),
            },
            Filter::Or => write!(f, "or"),
            Filter::Skip => write!(f, "skip"),
        }
    }
}

fn unsigned_bounds(f: &Value) -> (u32, u32) {
    let (a, b) = (f.lower() as u32, f.upper() as u32);
    if f.direction() {
        (a, b)
    } else {
        (b, a)
    }
}

/// Restrict `v` to the words satisfying `v op f` for at least one word of `f`.
///
/// Bounds that wrap around the compared range, or that would overflow once
/// made strict, leave `v` unchanged. Disequality never narrows.
pub fn apply(v: &Value, op: Comparison, f: &Value) -> Value {
    if f.is_none() || v.is_none() {
        return *v;
    }
    let signed = !f.swrap();
    let unsigned = !f.uwrap();
    let result = match op {
        Comparison::Lt if signed => match f.stop().checked_sub(1) {
            Some(k) => v.le(k),
            None => *v,
        },
        Comparison::Le if signed => v.le(f.stop()),
        Comparison::Ge if signed => v.ge(f.start()),
        Comparison::Gt if signed => match f.start().checked_add(1) {
            Some(k) => v.ge(k),
            None => *v,
        },
        Comparison::Ult if unsigned => match unsigned_bounds(f).1.checked_sub(1) {
            Some(k) => v.leu(k),
            None => *v,
        },
        Comparison::Ule if unsigned => v.leu(unsigned_bounds(f).1),
        Comparison::Uge if unsigned => v.geu(unsigned_bounds(f).0),
        Comparison::Ugt if unsigned => match unsigned_bounds(f).0.checked_add(1) {
            Some(k) => v.geu(k),
            None => *v,
        },
        Comparison::Eq => v.inter(f),
        _ => *v,
    };
    result.canonical()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn k(n: i32) -> Value {
        Value::constant(n)
    }

    #[test]
    fn equality_on_multi_lap_progression() {
        let v = Value::clp(0, 3, 1 << 31);
        assert_eq!(apply(&v, Comparison::Eq, &k(2)), k(2));
        assert_eq!(apply(&Value::clp(-1, -3, 0x7fff_ffff), Comparison::Eq, &k(-1)), k(-1));
    }

    #[test]
    fn signed_bounds() {
        let v = Value::clp(0, 1, 19);
        assert_eq!(apply(&v, Comparison::Lt, &k(10)), Value::clp(0, 1, 9));
        assert_eq!(apply(&v, Comparison::Ge, &k(10)), Value::clp(10, 1, 9));
        assert_eq!(apply(&v, Comparison::Le, &k(10)), Value::clp(0, 1, 10));
        assert_eq!(apply(&v, Comparison::Gt, &k(10)), Value::clp(11, 1, 8));
        assert_eq!(apply(&v, Comparison::Gt, &k(19)), Value::NONE);
    }

    #[test]
    fn imprecise_bounds() {
        let v = Value::clp(0, 1, 19);
        assert_eq!(apply(&v, Comparison::Lt, &Value::clp(5, 5, 1)), Value::clp(0, 1, 9));
        assert_eq!(apply(&v, Comparison::Ge, &Value::clp(5, 5, 1)), Value::clp(5, 1, 14));
        assert_eq!(apply(&v, Comparison::Lt, &Value::ALL), v);
        assert_eq!(apply(&v, Comparison::Lt, &k(i32::MIN)), v);
        assert_eq!(apply(&v, Comparison::Lt, &Value::NONE), v);
    }

    #[test]
    fn unsigned_bounds_filter() {
        let v = Value::clp(0, 4, 10);
        assert_eq!(apply(&v, Comparison::Ult, &k(12)), Value::clp(0, 4, 2));
        assert_eq!(apply(&v, Comparison::Ule, &k(12)), Value::clp(0, 4, 3));
        assert_eq!(apply(&v, Comparison::Uge, &k(32)), Value::clp(32, 4, 2));
        assert_eq!(apply(&v, Comparison::Ugt, &k(32)), Value::clp(36, 4, 1));
        assert_eq!(apply(&v, Comparison::Ult, &k(0)), v);
    }

    #[test]
    fn equality() {
        let v = Value::clp(0, 1, 19);
        assert_eq!(apply(&v, Comparison::Eq, &k(7)), k(7));
        assert_eq!(apply(&v, Comparison::Eq, &k(20)), Value::NONE);
        assert_eq!(apply(&v, Comparison::Ne, &k(7)), v);
        assert_eq!(apply(&Value::ALL, Comparison::Eq, &k(7)), k(7));
    }

    #[test]
    fn display() {
        let filter = Filter::register(1, Comparison::Lt, k(10));
        assert_eq!(filter.to_string(), "r1 < k(0xa)");
        let filter = Filter::memory(0x100, Comparison::Uge, k(1));
        assert_eq!(filter.to_string(), "[k(0x100)] >=u k(0x1)");
    }
}
