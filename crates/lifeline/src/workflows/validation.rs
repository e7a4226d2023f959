use crate::workflows::registry::domain::{BloodGroup, Coordinates, UnknownBloodGroup};

/// Request-shape failures surfaced to callers before any work is attempted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("invalid {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
    #[error(transparent)]
    BloodGroup(#[from] UnknownBloodGroup),
    #[error("at most {max} emergency contacts are allowed (received {received})")]
    TooManyContacts { max: usize, received: usize },
}

pub(crate) fn require<'a>(
    field: &'static str,
    value: Option<&'a str>,
) -> Result<&'a str, ValidationError> {
    match value.map(str::trim) {
        Some(raw) if !raw.is_empty() => Ok(raw),
        _ => Err(ValidationError::MissingField(field)),
    }
}

pub(crate) fn parse_number(field: &'static str, raw: &str) -> Result<f64, ValidationError> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| ValidationError::InvalidValue {
            field,
            reason: format!("'{raw}' is not a number"),
        })
}

pub(crate) fn parse_coordinates(
    lat: Option<&str>,
    lon: Option<&str>,
) -> Result<Coordinates, ValidationError> {
    let latitude = parse_number("lat", require("lat", lat)?)?;
    let longitude = parse_number("lon", require("lon", lon)?)?;
    Ok(Coordinates::new(latitude, longitude))
}

pub(crate) fn parse_blood_group(raw: Option<&str>) -> Result<BloodGroup, ValidationError> {
    Ok(require("blood_group", raw)?.parse()?)
}

pub(crate) fn parse_top_n(raw: Option<&str>, default: usize) -> Result<usize, ValidationError> {
    match raw.map(str::trim).filter(|value| !value.is_empty()) {
        None => Ok(default),
        Some(value) => value
            .parse::<usize>()
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| ValidationError::InvalidValue {
                field: "top_n",
                reason: format!("'{value}' is not a positive integer"),
            }),
    }
}
