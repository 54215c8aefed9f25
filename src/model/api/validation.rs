use std::collections::{BTreeMap, HashSet};
use std::fmt::{Display, Formatter};

use validator::{ValidationError, ValidationErrors, ValidationErrorsKind};

use crate::model::{api::tally::CandidateTally, common::CandidateId};

/// Structured per-field validation failures, keyed by the path of the
/// offending field (e.g. `results[1].votes`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    /// A single failure on a single field.
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = BTreeMap::new();
        errors.insert(field.into(), vec![message.into()]);
        Self(errors)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> BTreeMap<String, Vec<String>> {
        self.0
    }

    fn push(&mut self, field: String, message: String) {
        self.0.entry(field).or_default().push(message);
    }

    /// Flatten nested validator output into dotted/indexed field paths.
    fn collect(&mut self, prefix: Option<&str>, errors: &ValidationErrors) {
        for (field, kind) in errors.errors() {
            let path = match prefix {
                Some(prefix) => format!("{prefix}.{field}"),
                None => field.to_string(),
            };
            match kind {
                ValidationErrorsKind::Field(errors) => {
                    for error in errors {
                        self.push(path.clone(), describe(error));
                    }
                }
                ValidationErrorsKind::Struct(nested) => self.collect(Some(&path), nested),
                ValidationErrorsKind::List(items) => {
                    for (index, nested) in items {
                        self.collect(Some(&format!("{path}[{index}]")), nested);
                    }
                }
            }
        }
    }
}

impl From<ValidationErrors> for FieldErrors {
    fn from(errors: ValidationErrors) -> Self {
        let mut fields = Self::default();
        fields.collect(None, &errors);
        fields
    }
}

impl Display for FieldErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            if !first {
                write!(f, "; ")?;
            }
            first = false;
            write!(f, "{field}: {}", messages.join(", "))?;
        }
        Ok(())
    }
}

/// Human-readable message for one validator failure.
fn describe(error: &ValidationError) -> String {
    match &error.message {
        Some(message) => message.to_string(),
        None => error.code.to_string(),
    }
}

/// Reject tally lists that name the same candidate more than once.
pub fn unique_candidates(tallies: &[CandidateTally]) -> Result<(), ValidationError> {
    let mut seen: HashSet<CandidateId> = HashSet::new();
    for tally in tallies {
        if !seen.insert(tally.candidate_id) {
            let mut error = ValidationError::new("duplicate_candidate");
            error.message = Some(format!("candidate {} listed more than once", tally.candidate_id).into());
            return Err(error);
        }
    }
    Ok(())
}

/// Reject strings that are empty once surrounding whitespace is removed.
pub fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut error = ValidationError::new("blank");
        error.message = Some("must not be blank".into());
        return Err(error);
    }
    Ok(())
}
