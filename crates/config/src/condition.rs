//! Math conditions of the form `<op> <number>`.

use serde::{Serialize, Serializer};
use std::fmt;

/// Comparison operator of a [`MathCondition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    /// `>`
    Greater,
    /// `>=`
    GreaterOrEqual,
    /// `<`
    Less,
    /// `<=`
    LessOrEqual,
    /// `==`
    Equal,
    /// `!=`
    NotEqual,
}

impl Comparison {
    // Two-character operators first so `>=` never parses as `>`.
    const ALL: [Self; 6] = [
        Self::GreaterOrEqual,
        Self::LessOrEqual,
        Self::Equal,
        Self::NotEqual,
        Self::Greater,
        Self::Less,
    ];

    /// Operator symbol.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Greater => ">",
            Self::GreaterOrEqual => ">=",
            Self::Less => "<",
            Self::LessOrEqual => "<=",
            Self::Equal => "==",
            Self::NotEqual => "!=",
        }
    }
}

/// Numeric predicate attached to a field, e.g. `> 0.0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MathCondition {
    comparison: Comparison,
    operand: f64,
}

impl MathCondition {
    /// Parse `<op> <number>`.
    pub fn parse(input: &str) -> Result<Self, ConditionParseError> {
        let trimmed = input.trim();
        let (comparison, rest) = Comparison::ALL
            .iter()
            .find_map(|comparison| {
                trimmed
                    .strip_prefix(comparison.symbol())
                    .map(|rest| (*comparison, rest))
            })
            .ok_or(ConditionParseError::MissingOperator)?;

        let operand = rest
            .trim()
            .parse::<f64>()
            .map_err(|_| ConditionParseError::InvalidOperand)?;
        if !operand.is_finite() {
            return Err(ConditionParseError::InvalidOperand);
        }

        Ok(Self {
            comparison,
            operand,
        })
    }

    /// Operator.
    #[must_use]
    pub const fn comparison(&self) -> Comparison {
        self.comparison
    }

    /// Right-hand side.
    #[must_use]
    pub const fn operand(&self) -> f64 {
        self.operand
    }

    /// Evaluate the condition for `value`.
    #[must_use]
    #[allow(
        clippy::float_cmp,
        reason = "conditions are written against exact literals such as `!= 0`"
    )]
    pub fn holds(&self, value: f64) -> bool {
        match self.comparison {
            Comparison::Greater => value > self.operand,
            Comparison::GreaterOrEqual => value >= self.operand,
            Comparison::Less => value < self.operand,
            Comparison::LessOrEqual => value <= self.operand,
            Comparison::Equal => value == self.operand,
            Comparison::NotEqual => value != self.operand,
        }
    }
}

impl fmt::Display for MathCondition {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{} {:?}", self.comparison.symbol(), self.operand)
    }
}

impl Serialize for MathCondition {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Reasons a math condition fails to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionParseError {
    /// No comparison operator at the start.
    MissingOperator,
    /// Operand is not a finite number.
    InvalidOperand,
}

impl ConditionParseError {
    /// Short reason for error messages.
    #[must_use]
    pub const fn reason(self) -> &'static str {
        match self {
            Self::MissingOperator => "expected one of >, >=, <, <=, ==, != followed by a number",
            Self::InvalidOperand => "operand must be a finite number",
        }
    }
}

impl fmt::Display for ConditionParseError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.reason())
    }
}

impl std::error::Error for ConditionParseError {}
