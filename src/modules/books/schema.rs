//! Declarative payload rules for book writes.
//!
//! The rule table drives both create and update checks; [`validate`] reports
//! every violated rule rather than stopping at the first.

use std::fmt;

use serde_json::Value;

use bookshelf_http::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    Integer,
}

impl FieldType {
    fn matches(self, value: &Value) -> bool {
        match self {
            FieldType::String => value.is_string(),
            FieldType::Integer => value
                .as_i64()
                .is_some_and(|n| i32::try_from(n).is_ok()),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::String => f.write_str("a string"),
            FieldType::Integer => f.write_str("an integer"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Create,
    Update,
}

#[derive(Debug, Clone, Copy)]
pub struct FieldRule {
    pub name: &'static str,
    pub kind: FieldType,
    pub required_on_create: bool,
    pub required_on_update: bool,
}

impl FieldRule {
    const fn required(name: &'static str, kind: FieldType) -> Self {
        Self {
            name,
            kind,
            required_on_create: true,
            required_on_update: true,
        }
    }

    fn is_required(&self, mode: Mode) -> bool {
        match mode {
            Mode::Create => self.required_on_create,
            Mode::Update => self.required_on_update,
        }
    }
}

/// On update the isbn comes from the path, so a body isbn is optional.
pub const BOOK_RULES: &[FieldRule] = &[
    FieldRule {
        name: "isbn",
        kind: FieldType::String,
        required_on_create: true,
        required_on_update: false,
    },
    FieldRule::required("amazon_url", FieldType::String),
    FieldRule::required("author", FieldType::String),
    FieldRule::required("language", FieldType::String),
    FieldRule::required("pages", FieldType::Integer),
    FieldRule::required("publisher", FieldType::String),
    FieldRule::required("title", FieldType::String),
    FieldRule::required("year", FieldType::Integer),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    NotAnObject,
    Missing { field: &'static str },
    WrongType { field: &'static str, expected: FieldType },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::NotAnObject => f.write_str("payload must be a JSON object"),
            Violation::Missing { field } => write!(f, "\"{field}\" is required"),
            Violation::WrongType { field, expected } => {
                write!(f, "\"{field}\" must be {expected}")
            }
        }
    }
}

/// Every rule a payload broke, in rule-table order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationFailure {
    pub violations: Vec<Violation>,
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Invalid book payload: ")?;
        for (i, violation) in self.violations.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{violation}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationFailure {}

impl From<ValidationFailure> for AppError {
    fn from(failure: ValidationFailure) -> Self {
        let details = failure.violations.iter().map(ToString::to_string).collect();
        AppError::validation(details, failure.to_string())
    }
}

pub fn validate(payload: &Value, mode: Mode) -> Result<(), ValidationFailure> {
    validate_against(BOOK_RULES, payload, mode)
}

pub fn validate_against(
    rules: &[FieldRule],
    payload: &Value,
    mode: Mode,
) -> Result<(), ValidationFailure> {
    let Some(object) = payload.as_object() else {
        return Err(ValidationFailure {
            violations: vec![Violation::NotAnObject],
        });
    };

    let violations: Vec<Violation> = rules
        .iter()
        .filter_map(|rule| match object.get(rule.name) {
            None if rule.is_required(mode) => Some(Violation::Missing { field: rule.name }),
            None => None,
            Some(value) if rule.kind.matches(value) => None,
            Some(_) => Some(Violation::WrongType {
                field: rule.name,
                expected: rule.kind,
            }),
        })
        .collect();

    if violations.is_empty() {
        Ok(())
    } else {
        Err(ValidationFailure { violations })
    }
}
