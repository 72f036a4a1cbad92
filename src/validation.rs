use chrono::{NaiveDate, Utc};

use crate::error::ApiError;

/// Request bodies that check themselves before reaching a service
pub trait Validate {
    fn validate(&self) -> Result<(), ApiError>;
}

/// Collects field errors in the order the checks run.
/// Only the first failure of each field is kept.
#[derive(Debug, Default)]
pub struct FieldErrors {
    errors: Vec<(String, String)>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: &str, message: impl Into<String>) -> &mut Self {
        if !self.errors.iter().any(|(f, _)| f == field) {
            self.errors.push((field.to_string(), message.into()));
        }
        self
    }

    pub fn not_blank(&mut self, field: &str, value: &str) -> &mut Self {
        if value.trim().is_empty() {
            self.push(field, "must not be blank");
        }
        self
    }

    pub fn email(&mut self, field: &str, value: &str) -> &mut Self {
        if !is_email(value) {
            self.push(field, "must be a valid email address");
        }
        self
    }

    pub fn optional_email(&mut self, field: &str, value: &str) -> &mut Self {
        if !value.is_empty() {
            self.email(field, value);
        }
        self
    }

    /// Digits with an optional leading `+`; empty is accepted
    pub fn phone(&mut self, field: &str, value: &str) -> &mut Self {
        if !value.is_empty() && !is_phone(value) {
            self.push(field, "must contain only digits");
        }
        self
    }

    pub fn digits(&mut self, field: &str, value: &str) -> &mut Self {
        if value.trim().is_empty() {
            self.push(field, "must not be blank");
        } else if !value.chars().all(|c| c.is_ascii_digit()) {
            self.push(field, "must contain only digits");
        }
        self
    }

    pub fn not_future(&mut self, field: &str, date: NaiveDate) -> &mut Self {
        if date > Utc::now().date_naive() {
            self.push(field, "must not be in the future");
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn finish(self) -> Result<(), ApiError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::validation_error(self.errors))
        }
    }
}

pub fn is_email(value: &str) -> bool {
    if value.chars().any(char::is_whitespace) {
        return false;
    }
    let mut parts = value.splitn(2, '@');
    let (Some(local), Some(domain)) = (parts.next(), parts.next()) else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

pub fn is_phone(value: &str) -> bool {
    let digits = value.strip_prefix('+').unwrap_or(value);
    !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
}
