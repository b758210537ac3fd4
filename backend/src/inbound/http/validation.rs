//! Shared validation helpers for inbound HTTP adapters.
//!
//! Every helper returns a `400 invalid_request` [`Error`] whose `details`
//! name the offending field and carry a machine-readable `code`, so the SPA
//! can highlight the right form control.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use pagination::{PageParams, PageParamsError, PageQuery};
use serde_json::json;

use crate::domain::{Branch, Email, Error, Semester};

/// Validation error codes for HTTP request failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ErrorCode {
    MissingField,
    InvalidId,
    InvalidValue,
    InvalidTimestamp,
    InvalidPagination,
}

impl ErrorCode {
    fn as_str(self) -> &'static str {
        match self {
            ErrorCode::MissingField => "missing_field",
            ErrorCode::InvalidId => "invalid_id",
            ErrorCode::InvalidValue => "invalid_value",
            ErrorCode::InvalidTimestamp => "invalid_timestamp",
            ErrorCode::InvalidPagination => "invalid_pagination",
        }
    }
}

/// Newtype wrapper for HTTP field names to provide type safety.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FieldName(&'static str);

impl FieldName {
    pub(crate) const fn new(name: &'static str) -> Self {
        Self(name)
    }

    fn as_str(&self) -> &str {
        self.0
    }
}

/// Builder for validation errors with field context.
struct ValidationError {
    field: String,
    message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }

    fn with_code(self, code: ErrorCode) -> Error {
        Error::invalid_request(self.message).with_details(json!({
            "field": self.field,
            "code": code.as_str(),
        }))
    }

    fn with_value(self, code: ErrorCode, value: impl Into<String>) -> Error {
        Error::invalid_request(self.message).with_details(json!({
            "field": self.field,
            "value": value.into(),
            "code": code.as_str(),
        }))
    }
}

pub(crate) fn missing_field_error(field: FieldName) -> Error {
    let field = field.as_str();
    ValidationError::new(field, format!("missing required field: {field}"))
        .with_code(ErrorCode::MissingField)
}

/// Wrap a domain validation failure, attributing it to `field`.
pub(crate) fn invalid_field(field: FieldName, message: impl std::fmt::Display) -> Error {
    ValidationError::new(field.as_str(), message.to_string()).with_code(ErrorCode::InvalidValue)
}

/// Require a non-blank text field.
pub(crate) fn require_text(value: Option<String>, field: FieldName) -> Result<String, Error> {
    value
        .filter(|raw| !raw.trim().is_empty())
        .ok_or_else(|| missing_field_error(field))
}

/// Parse a path or body identifier such as a `MaterialId`.
pub(crate) fn parse_id<T: FromStr>(value: &str, field: FieldName) -> Result<T, Error> {
    value.parse().map_err(|_| {
        let name = field.as_str();
        ValidationError::new(name, format!("{name} must be a 24 character hex identifier"))
            .with_value(ErrorCode::InvalidId, value)
    })
}

/// Parse one of a closed set of keywords; `allowed` is listed in the message.
pub(crate) fn parse_keyword<T: FromStr>(
    value: &str,
    field: FieldName,
    allowed: &str,
) -> Result<T, Error> {
    value.parse().map_err(|_| {
        let name = field.as_str();
        ValidationError::new(name, format!("{name} must be one of: {allowed}"))
            .with_value(ErrorCode::InvalidValue, value)
    })
}

pub(crate) fn parse_optional_keyword<T: FromStr>(
    value: Option<&str>,
    field: FieldName,
    allowed: &str,
) -> Result<Option<T>, Error> {
    value
        .map(str::trim)
        .filter(|raw| !raw.is_empty())
        .map(|raw| parse_keyword(raw, field, allowed))
        .transpose()
}

pub(crate) fn parse_email(value: &str, field: FieldName) -> Result<Email, Error> {
    Email::new(value).map_err(|err| invalid_field(field, err))
}

pub(crate) fn parse_branch(value: Option<&str>, field: FieldName) -> Result<Option<Branch>, Error> {
    value
        .map(str::trim)
        .filter(|raw| !raw.is_empty())
        .map(|raw| Branch::new(raw).map_err(|err| invalid_field(field, err)))
        .transpose()
}

pub(crate) fn parse_semester(value: Option<u8>, field: FieldName) -> Result<Option<Semester>, Error> {
    value
        .map(|raw| Semester::new(raw).map_err(|err| invalid_field(field, err)))
        .transpose()
}

/// Semester sent as text, as multipart forms do.
pub(crate) fn parse_semester_text(
    value: Option<&str>,
    field: FieldName,
) -> Result<Option<Semester>, Error> {
    let Some(raw) = value.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return Ok(None);
    };
    let number = raw
        .parse::<u8>()
        .map_err(|_| invalid_field(field, format!("{} must be a number", field.as_str())))?;
    parse_semester(Some(number), field)
}

/// Non-negative amount in paise sent as text.
pub(crate) fn parse_amount_text(value: Option<&str>, field: FieldName) -> Result<u64, Error> {
    match value.map(str::trim).filter(|raw| !raw.is_empty()) {
        None => Ok(0),
        Some(raw) => raw.parse::<u64>().map_err(|_| {
            invalid_field(
                field,
                format!("{} must be a whole number of paise", field.as_str()),
            )
        }),
    }
}

/// Lenient boolean used by multipart forms and query strings.
pub(crate) fn parse_flag(value: Option<&str>) -> bool {
    value.is_some_and(|raw| {
        matches!(
            raw.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    })
}

/// Validate `?page=&limit=`.
pub(crate) fn parse_page(query: PageQuery) -> Result<PageParams, Error> {
    query.validate().map_err(|err| {
        let field = match err {
            PageParamsError::PageOutOfRange => "page",
            PageParamsError::LimitOutOfRange { .. } => "limit",
        };
        ValidationError::new(field, err.to_string()).with_code(ErrorCode::InvalidPagination)
    })
}

pub(crate) fn invalid_timestamp_error(field: FieldName, value: &str) -> Error {
    let field = field.as_str();
    ValidationError::new(field, format!("{field} must be an RFC 3339 timestamp"))
        .with_value(ErrorCode::InvalidTimestamp, value)
}

pub(crate) fn parse_rfc3339_timestamp(
    value: &str,
    field: FieldName,
) -> Result<DateTime<Utc>, Error> {
    DateTime::parse_from_rfc3339(value)
        .map(|timestamp| timestamp.with_timezone(&Utc))
        .map_err(|_| invalid_timestamp_error(field, value))
}

pub(crate) fn parse_optional_rfc3339_timestamp(
    value: Option<&str>,
    field: FieldName,
) -> Result<Option<DateTime<Utc>>, Error> {
    value
        .map(str::trim)
        .filter(|raw| !raw.is_empty())
        .map(|raw| parse_rfc3339_timestamp(raw, field))
        .transpose()
}
