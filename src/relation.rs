use serde::{Deserialize, Serialize};
use std::fmt;

/// Capture relations between a mover's value, a target's value, and an
/// optional helper value. All checks are pure; the justification string is
/// for UI and audit, never for control flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Relation {
    Equal,
    Multiple,
    Divisor,
    Sum,
    Diff,
    Product,
    Ratio,
}

impl Relation {
    pub fn requires_helper(&self) -> bool {
        matches!(
            self,
            Relation::Sum | Relation::Diff | Relation::Product | Relation::Ratio
        )
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Relation::Equal => "EQUAL",
            Relation::Multiple => "MULTIPLE",
            Relation::Divisor => "DIVISOR",
            Relation::Sum => "SUM",
            Relation::Diff => "DIFF",
            Relation::Product => "PRODUCT",
            Relation::Ratio => "RATIO",
        };
        write!(f, "{}", name)
    }
}

/// Outcome of a relation check: whether it holds, plus a human-readable
/// justification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationCheck {
    pub holds: bool,
    pub reason: String,
}

impl RelationCheck {
    fn ok(reason: String) -> Self {
        RelationCheck { holds: true, reason }
    }

    fn fail(reason: String) -> Self {
        RelationCheck { holds: false, reason }
    }
}

/// EQUAL(a, b): a = b.
pub fn equal(a: u32, b: u32) -> RelationCheck {
    if a == b {
        RelationCheck::ok(format!("{} equals {}", a, b))
    } else {
        RelationCheck::fail(format!("{} does not equal {}", a, b))
    }
}

/// MULTIPLE(a, b): a is a multiple of b.
pub fn multiple(a: u32, b: u32) -> RelationCheck {
    if b != 0 && a % b == 0 {
        RelationCheck::ok(format!("{} is a multiple of {}", a, b))
    } else {
        RelationCheck::fail(format!("{} is not a multiple of {}", a, b))
    }
}

/// DIVISOR(a, b): a divides b.
pub fn divisor(a: u32, b: u32) -> RelationCheck {
    if a != 0 && b % a == 0 {
        RelationCheck::ok(format!("{} divides {}", a, b))
    } else {
        RelationCheck::fail(format!("{} does not divide {}", a, b))
    }
}

/// SUM(a, b, h): a + h = b, or b + h = a.
pub fn sum(a: u32, b: u32, h: u32) -> RelationCheck {
    if a + h == b {
        RelationCheck::ok(format!("{} + {} = {}", a, h, b))
    } else if b + h == a {
        RelationCheck::ok(format!("{} + {} = {}", b, h, a))
    } else {
        RelationCheck::fail(format!("neither {} + {} = {} nor {} + {} = {}", a, h, b, b, h, a))
    }
}

/// DIFF(a, b, h): |a - h| = b, or |b - h| = a.
pub fn diff(a: u32, b: u32, h: u32) -> RelationCheck {
    let (a, b, h) = (a as i64, b as i64, h as i64);
    if (a - h).abs() == b {
        RelationCheck::ok(format!("|{} - {}| = {}", a, h, b))
    } else if (b - h).abs() == a {
        RelationCheck::ok(format!("|{} - {}| = {}", b, h, a))
    } else {
        RelationCheck::fail(format!(
            "neither |{} - {}| = {} nor |{} - {}| = {}",
            a, h, b, b, h, a
        ))
    }
}

/// PRODUCT(a, b, h): a * h = b, or b * h = a.
pub fn product(a: u32, b: u32, h: u32) -> RelationCheck {
    let (a64, b64, h64) = (a as u64, b as u64, h as u64);
    if a64 * h64 == b64 {
        RelationCheck::ok(format!("{} * {} = {}", a, h, b))
    } else if b64 * h64 == a64 {
        RelationCheck::ok(format!("{} * {} = {}", b, h, a))
    } else {
        RelationCheck::fail(format!(
            "neither {} * {} = {} nor {} * {} = {}",
            a, h, b, b, h, a
        ))
    }
}

/// RATIO(a, b, h): numerically the same formula as PRODUCT. Kept as a
/// distinct relation because rule configurations expose it separately;
/// do not collapse the two.
pub fn ratio(a: u32, b: u32, h: u32) -> RelationCheck {
    let (a64, b64, h64) = (a as u64, b as u64, h as u64);
    if h == 0 {
        return RelationCheck::fail("ratio with zero helper is undefined".to_string());
    }
    if a64 * h64 == b64 {
        RelationCheck::ok(format!("{} : {} is 1 : {}", a, b, h))
    } else if b64 * h64 == a64 {
        RelationCheck::ok(format!("{} : {} is {} : 1", a, b, h))
    } else {
        RelationCheck::fail(format!("{} and {} are not in ratio {}", a, b, h))
    }
}

/// Dispatch a named relation over mover/target values and an optional
/// helper. Helper-requiring relations fail (not error) without one.
pub fn check(relation: Relation, mover: u32, target: u32, helper: Option<u32>) -> RelationCheck {
    match (relation, helper) {
        (Relation::Equal, _) => equal(mover, target),
        (Relation::Multiple, _) => multiple(mover, target),
        (Relation::Divisor, _) => divisor(mover, target),
        (Relation::Sum, Some(h)) => sum(mover, target, h),
        (Relation::Diff, Some(h)) => diff(mover, target, h),
        (Relation::Product, Some(h)) => product(mover, target, h),
        (Relation::Ratio, Some(h)) => ratio(mover, target, h),
        (rel, None) => RelationCheck::fail(format!("{} requires a helper piece", rel)),
    }
}
