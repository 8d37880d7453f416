//! Parameter constraints and their evaluation.
//!
//! # Responsibilities
//! - Represent a declared constraint on one named path or query parameter
//! - Decide whether a raw string value satisfies it
//!
//! # Design Decisions
//! - Values are evaluated as raw strings; only numeric comparisons parse
//! - A value that fails to parse as a number does not match (never an error)
//! - Patterns are anchored at both ends and compiled when the constraint is built
//! - A declared constraint requires the parameter to be present: an absent
//!   parameter never satisfies anything, see [`satisfies_any`]

use std::fmt;

use regex::Regex;

use crate::error::ConfigurationError;

/// Comparison operator for [`ParameterConstraint::NumericCompare`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    fn apply(self, value: f64, threshold: f64) -> bool {
        match self {
            CompareOp::Lt => value < threshold,
            CompareOp::Le => value <= threshold,
            CompareOp::Gt => value > threshold,
            CompareOp::Ge => value >= threshold,
        }
    }

    fn symbol(self) -> &'static str {
        match self {
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        }
    }
}

/// An anchored regular expression that keeps its source text.
#[derive(Clone)]
pub struct Pattern {
    source: String,
    regex: Regex,
}

impl Pattern {
    /// Compile `source` so that it must match the whole value.
    pub fn new(source: impl Into<String>) -> Result<Self, ConfigurationError> {
        let source = source.into();
        let regex = Regex::new(&format!("^(?:{})$", source)).map_err(|e| {
            ConfigurationError::InvalidPattern {
                pattern: source.clone(),
                reason: e.to_string(),
            }
        })?;
        Ok(Self { source, regex })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn is_match(&self, value: &str) -> bool {
        self.regex.is_match(value)
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Pattern").field(&self.source).finish()
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

/// A constraint on a single named parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterConstraint {
    /// Exact string equality.
    Equals(String),
    /// Full-match regular expression.
    Pattern(Pattern),
    /// Parse as a number and compare against `threshold`.
    NumericCompare { op: CompareOp, threshold: f64 },
    /// Value parses as a signed integer.
    Integer,
    /// Any value, as long as the parameter is supplied.
    Present,
    /// Every member must hold.
    AllOf(Vec<ParameterConstraint>),
}

impl ParameterConstraint {
    pub fn equals(value: impl Into<String>) -> Self {
        ParameterConstraint::Equals(value.into())
    }

    pub fn pattern(source: impl Into<String>) -> Result<Self, ConfigurationError> {
        Ok(ParameterConstraint::Pattern(Pattern::new(source)?))
    }

    pub fn compare(op: CompareOp, threshold: f64) -> Result<Self, ConfigurationError> {
        if !threshold.is_finite() {
            return Err(ConfigurationError::InvalidThreshold(threshold));
        }
        Ok(ParameterConstraint::NumericCompare { op, threshold })
    }

    pub fn lt(threshold: f64) -> Result<Self, ConfigurationError> {
        Self::compare(CompareOp::Lt, threshold)
    }

    pub fn le(threshold: f64) -> Result<Self, ConfigurationError> {
        Self::compare(CompareOp::Le, threshold)
    }

    pub fn gt(threshold: f64) -> Result<Self, ConfigurationError> {
        Self::compare(CompareOp::Gt, threshold)
    }

    pub fn ge(threshold: f64) -> Result<Self, ConfigurationError> {
        Self::compare(CompareOp::Ge, threshold)
    }

    pub fn all_of(members: Vec<ParameterConstraint>) -> Result<Self, ConfigurationError> {
        if members.is_empty() {
            return Err(ConfigurationError::EmptyConstraintGroup);
        }
        Ok(ParameterConstraint::AllOf(members))
    }

    /// Whether `value` satisfies this constraint.
    pub fn is_satisfied_by(&self, value: &str) -> bool {
        satisfies(value, self)
    }
}

impl fmt::Display for ParameterConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterConstraint::Equals(v) => write!(f, "== {:?}", v),
            ParameterConstraint::Pattern(p) => write!(f, "~ /{}/", p.as_str()),
            ParameterConstraint::NumericCompare { op, threshold } => {
                write!(f, "{} {}", op.symbol(), threshold)
            }
            ParameterConstraint::Integer => f.write_str("integer"),
            ParameterConstraint::Present => f.write_str("present"),
            ParameterConstraint::AllOf(members) => {
                f.write_str("all(")?;
                for (i, m) in members.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", m)?;
                }
                f.write_str(")")
            }
        }
    }
}

/// Evaluate one present value against a constraint.
pub fn satisfies(value: &str, constraint: &ParameterConstraint) -> bool {
    match constraint {
        ParameterConstraint::Equals(expected) => value == expected,
        ParameterConstraint::Pattern(pattern) => pattern.is_match(value),
        ParameterConstraint::NumericCompare { op, threshold } => match value.parse::<f64>() {
            Ok(n) if n.is_finite() => op.apply(n, *threshold),
            _ => false,
        },
        ParameterConstraint::Integer => value.parse::<i64>().is_ok(),
        ParameterConstraint::Present => true,
        ParameterConstraint::AllOf(members) => members.iter().all(|m| satisfies(value, m)),
    }
}

/// Evaluate a possibly repeated, possibly absent parameter.
///
/// Holds iff at least one occurrence satisfies the constraint. No
/// occurrences at all means the constraint fails.
pub fn satisfies_any<'a, I>(values: I, constraint: &ParameterConstraint) -> bool
where
    I: IntoIterator<Item = &'a str>,
{
    values.into_iter().any(|v| satisfies(v, constraint))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equals() {
        let c = ParameterConstraint::equals("abc");
        assert!(c.is_satisfied_by("abc"));
        assert!(!c.is_satisfied_by("ABC"));
        assert!(!c.is_satisfied_by("abcd"));
    }

    #[test]
    fn test_pattern_alternation() {
        let c = ParameterConstraint::pattern("^(A|B)$").unwrap();
        assert!(c.is_satisfied_by("A"));
        assert!(c.is_satisfied_by("B"));
        assert!(!c.is_satisfied_by("C"));
    }

    #[test]
    fn test_pattern_is_anchored() {
        let c = ParameterConstraint::pattern("secret").unwrap();
        assert!(c.is_satisfied_by("secret"));
        assert!(!c.is_satisfied_by("top-secret"));
        assert!(!c.is_satisfied_by("secrets"));
    }

    #[test]
    fn test_invalid_pattern_fails_at_construction() {
        let err = ParameterConstraint::pattern("(unclosed").unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidPattern { .. }));
    }

    #[test]
    fn test_numeric_le() {
        let c = ParameterConstraint::le(10.0).unwrap();
        assert!(c.is_satisfied_by("10"));
        assert!(c.is_satisfied_by("5"));
        assert!(c.is_satisfied_by("-3.5"));
        assert!(!c.is_satisfied_by("11"));
        assert!(!c.is_satisfied_by("abc"));
        assert!(!c.is_satisfied_by(""));
    }

    #[test]
    fn test_numeric_strict_bounds() {
        assert!(!ParameterConstraint::lt(10.0).unwrap().is_satisfied_by("10"));
        assert!(!ParameterConstraint::gt(10.0).unwrap().is_satisfied_by("10"));
        assert!(ParameterConstraint::ge(10.0).unwrap().is_satisfied_by("10"));
        assert!(ParameterConstraint::gt(1.5).unwrap().is_satisfied_by("2"));
    }

    #[test]
    fn test_numeric_rejects_non_finite_input() {
        let c = ParameterConstraint::gt(0.0).unwrap();
        assert!(!c.is_satisfied_by("inf"));
        assert!(!c.is_satisfied_by("NaN"));
    }

    #[test]
    fn test_threshold_must_be_finite() {
        assert_eq!(
            ParameterConstraint::le(f64::NAN).unwrap_err().to_string(),
            "numeric threshold must be finite, got NaN"
        );
        assert!(ParameterConstraint::ge(f64::INFINITY).is_err());
    }

    #[test]
    fn test_integer_and_present() {
        assert!(ParameterConstraint::Integer.is_satisfied_by("42"));
        assert!(!ParameterConstraint::Integer.is_satisfied_by("4.2"));
        assert!(!ParameterConstraint::Integer.is_satisfied_by("bar"));
        assert!(ParameterConstraint::Present.is_satisfied_by(""));
    }

    #[test]
    fn test_all_of() {
        let c = ParameterConstraint::all_of(vec![
            ParameterConstraint::Integer,
            ParameterConstraint::ge(1.0).unwrap(),
            ParameterConstraint::le(100.0).unwrap(),
        ])
        .unwrap();
        assert!(c.is_satisfied_by("50"));
        assert!(!c.is_satisfied_by("0"));
        assert!(!c.is_satisfied_by("50.5"));
        assert!(ParameterConstraint::all_of(vec![]).is_err());
    }

    #[test]
    fn test_absent_parameter_never_satisfies() {
        assert!(!satisfies_any(std::iter::empty(), &ParameterConstraint::Present));
    }

    #[test]
    fn test_repeated_values_any_occurrence() {
        let c = ParameterConstraint::le(100.0).unwrap();
        assert!(satisfies_any(["999", "10"], &c));
        assert!(!satisfies_any(["999", "1000"], &c));
    }

    #[test]
    fn test_display() {
        assert_eq!(ParameterConstraint::le(10.0).unwrap().to_string(), "<= 10");
        assert_eq!(
            ParameterConstraint::pattern("a|b").unwrap().to_string(),
            "~ /a|b/"
        );
    }
}
