//! Form validation.
//!
//! Checks a [`FormModel`] against the input constraints of the field catalogue. Validation
//! is advisory: it reports every problem it finds and leaves the decision to submit anyway
//! to the caller.

use crate::catalogue::{self, FieldKind};
use crate::form::{FieldValue, FormModel};
use crate::lab::{LabParameter, LabTestRow};
use chrono::NaiveDate;
use std::fmt;

const DATE_INPUT_FORMAT: &str = "%Y-%m-%d";
const PHONE_DIGITS: usize = 10;

/// One problem found in a form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationIssue {
    /// Field key, or `lab_tests[<row>].<parameter>` for lab cells.
    pub field: String,
    pub message: String,
}

impl ValidationIssue {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validates every catalogued field and every lab cell of `form`.
///
/// Returns an empty list when the form is acceptable.
pub fn validate(form: &FormModel) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    for spec in catalogue::fields() {
        let Some(value) = form.value(spec.key) else {
            continue;
        };

        if value.is_empty() {
            if spec.required {
                issues.push(ValidationIssue::new(spec.key, "is required"));
            }
            continue;
        }

        let problem = match (spec.kind, value) {
            (FieldKind::MultiSelect(options), FieldValue::MultiSelect(values)) => values
                .iter()
                .find(|v| !options.contains(&v.as_str()))
                .map(|v| format!("'{}' is not one of: {}", v, options.join(", "))),
            (kind, FieldValue::Scalar(text)) => check_scalar(kind, text.trim()),
            (_, FieldValue::MultiSelect(_)) => Some("expected a single value".to_string()),
        };

        if let Some(message) = problem {
            issues.push(ValidationIssue::new(spec.key, message));
        }
    }

    for (index, row) in form.lab_tests().iter().enumerate() {
        validate_lab_row(index, row, &mut issues);
    }

    issues
}

fn check_scalar(kind: FieldKind, text: &str) -> Option<String> {
    match kind {
        FieldKind::Text => None,
        FieldKind::Date => check_date(text),
        FieldKind::Phone => {
            let digits_only = text.bytes().all(|b| b.is_ascii_digit());
            if digits_only && text.len() == PHONE_DIGITS {
                None
            } else {
                Some(format!("must be exactly {} digits", PHONE_DIGITS))
            }
        }
        FieldKind::Number { whole, max } => check_number(text, whole, max),
        FieldKind::Choice(options) => {
            if options.contains(&text) {
                None
            } else {
                Some(format!("'{}' is not one of: {}", text, options.join(", ")))
            }
        }
        FieldKind::MultiSelect(_) => Some("expected a list of options".to_string()),
    }
}

fn check_date(text: &str) -> Option<String> {
    NaiveDate::parse_from_str(text, DATE_INPUT_FORMAT)
        .err()
        .map(|_| format!("'{}' is not a date (YYYY-MM-DD)", text))
}

fn check_number(text: &str, whole: bool, max: Option<f64>) -> Option<String> {
    let number = match text.parse::<f64>() {
        Ok(n) if n.is_finite() => n,
        _ => return Some(format!("'{}' is not a number", text)),
    };

    if number < 0.0 {
        return Some("must not be negative".to_string());
    }
    if whole && number.fract() != 0.0 {
        return Some("must be a whole number".to_string());
    }
    match max {
        Some(limit) if number > limit => Some(format!("must be at most {}", limit)),
        _ => None,
    }
}

fn validate_lab_row(index: usize, row: &LabTestRow, issues: &mut Vec<ValidationIssue>) {
    for param in LabParameter::ALL {
        let Some(text) = row.text(param) else {
            continue;
        };
        let text = text.trim();
        if text.is_empty() {
            continue;
        }

        let problem = if param.is_numeric() {
            check_number(text, false, None)
        } else {
            check_date(text)
        };

        if let Some(message) = problem {
            issues.push(ValidationIssue::new(
                format!("lab_tests[{}].{}", index, param.key()),
                message,
            ));
        }
    }
}
