//! Validation of mutation input before it reaches a mutation handler

use serde::Serialize;
use std::fmt;

/// Validates a deserialized mutation input
pub trait Validator<T>: Send + Sync {
    /// Record every problem with `target` in `errors`
    fn validate(&self, target: &T, errors: &mut ValidationErrors);
}

impl<T, F> Validator<T> for F
where
    F: Fn(&T, &mut ValidationErrors) + Send + Sync,
{
    fn validate(&self, target: &T, errors: &mut ValidationErrors) {
        self(target, errors)
    }
}

/// A single rejected value
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldError {
    /// `None` for errors about the object as a whole
    pub field: Option<String>,
    pub code: String,
    pub message: String,
}

/// Errors collected while validating one object
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationErrors {
    pub object_name: String,
    pub errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn new(object_name: impl Into<String>) -> Self {
        Self {
            object_name: object_name.into(),
            errors: Vec::new(),
        }
    }

    /// Reject the object as a whole
    pub fn reject(&mut self, code: impl Into<String>, message: impl Into<String>) {
        self.errors.push(FieldError {
            field: None,
            code: code.into(),
            message: message.into(),
        });
    }

    /// Reject the value of a single field
    pub fn reject_value(
        &mut self,
        field: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) {
        self.errors.push(FieldError {
            field: Some(field.into()),
            code: code.into(),
            message: message.into(),
        });
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn field_errors<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a FieldError> + 'a {
        self.errors
            .iter()
            .filter(move |e| e.field.as_deref() == Some(field))
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} is invalid", self.object_name)?;
        for (i, error) in self.errors.iter().enumerate() {
            f.write_str(if i == 0 { ": " } else { "; " })?;
            match &error.field {
                Some(field) => write!(f, "{field}: {}", error.message)?,
                None => f.write_str(&error.message)?,
            }
        }
        Ok(())
    }
}
