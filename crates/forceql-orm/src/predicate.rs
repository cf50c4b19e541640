//! Predicate tree and expression builders.
//!
//! Predicates are a closed set of variants; the translator matches them
//! exhaustively, so adding an operator is a compile-time-checked change
//! everywhere it must be handled.

use chrono::{DateTime, NaiveDate, Utc};

use crate::picklist::Picklist;

/// A literal value in a predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Boolean(bool),
    Int(i64),
    Number(f64),
    Text(String),
    Date(NaiveDate),
    DateTime(DateTime<Utc>),
    /// A single-select picklist member, compared by its remote label.
    PicklistLabel(String),
}

impl Literal {
    /// Literal for a picklist member (its remote label, never its ordinal).
    pub fn picklist<P: Picklist>(member: P) -> Self {
        Literal::PicklistLabel(member.label().to_string())
    }
}

impl From<bool> for Literal {
    fn from(value: bool) -> Self {
        Literal::Boolean(value)
    }
}

impl From<i32> for Literal {
    fn from(value: i32) -> Self {
        Literal::Int(value.into())
    }
}

impl From<i64> for Literal {
    fn from(value: i64) -> Self {
        Literal::Int(value)
    }
}

impl From<f64> for Literal {
    fn from(value: f64) -> Self {
        Literal::Number(value)
    }
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Literal::Text(value.to_string())
    }
}

impl From<String> for Literal {
    fn from(value: String) -> Self {
        Literal::Text(value)
    }
}

impl From<NaiveDate> for Literal {
    fn from(value: NaiveDate) -> Self {
        Literal::Date(value)
    }
}

impl From<DateTime<Utc>> for Literal {
    fn from(value: DateTime<Utc>) -> Self {
        Literal::DateTime(value)
    }
}

/// Comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    pub(crate) fn soql(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "!=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        }
    }
}

/// A filter predicate over entity fields.
///
/// Field names are resolved through entity metadata at translation time;
/// referencing an undeclared field fails there, not here.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// `field <op> literal`
    Compare {
        field: String,
        op: CompareOp,
        value: Literal,
    },
    /// Substring containment, translated to the dialect's pattern match.
    Contains { field: String, value: String },
    /// Prefix match, translated to the dialect's pattern match.
    StartsWith { field: String, value: String },
    /// Membership in a literal set.
    In { field: String, values: Vec<Literal> },
    /// Multi-select picklist membership (any of the given labels selected).
    Includes { field: String, labels: Vec<String> },
    /// Null test.
    IsNull { field: String, negated: bool },
    And(Box<Predicate>, Box<Predicate>),
    Or(Box<Predicate>, Box<Predicate>),
    Not(Box<Predicate>),
}

impl Predicate {
    /// Conjunction.
    pub fn and(self, other: Predicate) -> Predicate {
        Predicate::And(Box::new(self), Box::new(other))
    }

    /// Disjunction.
    pub fn or(self, other: Predicate) -> Predicate {
        Predicate::Or(Box::new(self), Box::new(other))
    }

    /// Negation.
    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Predicate {
        Predicate::Not(Box::new(self))
    }
}

/// Start building a predicate from a field reference.
///
/// ```rust
/// use forceql_orm::field;
///
/// let p = field("Name").contains("cool").and(field("NumberOfEmployees").ge(10));
/// ```
pub fn field(name: impl Into<String>) -> FieldExpr {
    FieldExpr { name: name.into() }
}

/// A field reference awaiting an operator.
#[derive(Debug, Clone)]
pub struct FieldExpr {
    name: String,
}

impl FieldExpr {
    fn compare(self, op: CompareOp, value: impl Into<Literal>) -> Predicate {
        Predicate::Compare {
            field: self.name,
            op,
            value: value.into(),
        }
    }

    pub fn eq(self, value: impl Into<Literal>) -> Predicate {
        self.compare(CompareOp::Eq, value)
    }

    pub fn ne(self, value: impl Into<Literal>) -> Predicate {
        self.compare(CompareOp::Ne, value)
    }

    pub fn lt(self, value: impl Into<Literal>) -> Predicate {
        self.compare(CompareOp::Lt, value)
    }

    pub fn le(self, value: impl Into<Literal>) -> Predicate {
        self.compare(CompareOp::Le, value)
    }

    pub fn gt(self, value: impl Into<Literal>) -> Predicate {
        self.compare(CompareOp::Gt, value)
    }

    pub fn ge(self, value: impl Into<Literal>) -> Predicate {
        self.compare(CompareOp::Ge, value)
    }

    /// Substring containment.
    pub fn contains(self, value: impl Into<String>) -> Predicate {
        Predicate::Contains {
            field: self.name,
            value: value.into(),
        }
    }

    /// Prefix match.
    pub fn starts_with(self, value: impl Into<String>) -> Predicate {
        Predicate::StartsWith {
            field: self.name,
            value: value.into(),
        }
    }

    /// Membership in a set of literals.
    pub fn is_in<L: Into<Literal>>(self, values: impl IntoIterator<Item = L>) -> Predicate {
        Predicate::In {
            field: self.name,
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Multi-select picklist membership.
    pub fn includes<P: Picklist>(self, members: impl IntoIterator<Item = P>) -> Predicate {
        Predicate::Includes {
            field: self.name,
            labels: members
                .into_iter()
                .map(|m| m.label().to_string())
                .collect(),
        }
    }

    pub fn is_null(self) -> Predicate {
        Predicate::IsNull {
            field: self.name,
            negated: false,
        }
    }

    pub fn is_not_null(self) -> Predicate {
        Predicate::IsNull {
            field: self.name,
            negated: true,
        }
    }
}
