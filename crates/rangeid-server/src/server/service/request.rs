//! Query parameters of `GET /next-tracking-number` and their validation.
//!
//! Validation runs in three stages, each short-circuiting the next:
//! 1. every parameter must be present,
//! 2. `weight` and `created_at` must parse,
//! 3. every field constraint is checked and all violations are reported
//!    together, joined with `. `.

use chrono::{DateTime, FixedOffset};
use serde::Deserialize;

use crate::server::error::ApiError;

/// The raw query string, before any validation.
#[derive(Deserialize, Debug, Default, Clone)]
pub struct TrackingQuery {
    pub origin_country_id: Option<String>,
    pub destination_country_id: Option<String>,
    pub weight: Option<String>,
    pub created_at: Option<String>,
    pub customer_id: Option<String>,
    pub customer_name: Option<String>,
    pub customer_slug: Option<String>,
}

/// A request that passed validation.
///
/// None of these fields influence the issued tracking number; they are kept
/// for logging.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackingRequest {
    pub origin_country_id: String,
    pub destination_country_id: String,
    pub weight: Weight,
    pub created_at: DateTime<FixedOffset>,
    pub customer_id: String,
    pub customer_name: String,
    pub customer_slug: String,
}

impl TryFrom<TrackingQuery> for TrackingRequest {
    type Error = ApiError;

    fn try_from(query: TrackingQuery) -> Result<Self, Self::Error> {
        let origin_country_id = required(query.origin_country_id, "origin_country_id")?;
        let destination_country_id =
            required(query.destination_country_id, "destination_country_id")?;
        let weight = required(query.weight, "weight")?;
        let created_at = required(query.created_at, "created_at")?;
        let customer_id = required(query.customer_id, "customer_id")?;
        let customer_name = required(query.customer_name, "customer_name")?;
        let customer_slug = required(query.customer_slug, "customer_slug")?;

        let weight = Weight::parse(&weight)
            .ok_or_else(|| ApiError::BadRequest("Invalid weight".to_owned()))?;
        let created_at = parse_created_at(&created_at)
            .ok_or_else(|| ApiError::BadRequest("Invalid created_at".to_owned()))?;

        let req = Self {
            origin_country_id,
            destination_country_id,
            weight,
            created_at,
            customer_id,
            customer_name,
            customer_slug,
        };

        let violations = req.violations();
        if violations.is_empty() {
            Ok(req)
        } else {
            Err(ApiError::BadRequest(violations.join(". ")))
        }
    }
}

impl TrackingRequest {
    /// Every constraint this request breaks, in field order.
    pub fn violations(&self) -> Vec<&'static str> {
        let mut out = Vec::new();

        if !is_country_code(&self.origin_country_id) {
            out.push("origin_country_id must be ISO 3166-1 uppercase alpha-2");
        }
        if !is_country_code(&self.destination_country_id) {
            out.push("destination_country_id must be ISO 3166-1 uppercase alpha-2");
        }
        if !self.weight.is_at_least_one_gram() {
            out.push("weight too low, must be at least 0.001");
        }
        if !self.weight.fits(10, 3) {
            out.push("weight can be up to 3 decimal places");
        }
        if self.customer_id.trim().is_empty() {
            out.push("customer_id is required");
        }
        if !is_uuid(&self.customer_id) {
            out.push("customer_id must be a valid UUID");
        }
        if self.customer_name.trim().is_empty() {
            out.push("customer_name is required");
        }
        if !is_kebab_case(&self.customer_slug) {
            out.push("customer_slug must be kebab-case");
        }

        out
    }
}

fn required(value: Option<String>, name: &str) -> Result<String, ApiError> {
    value.ok_or_else(|| {
        ApiError::BadRequest(format!("Required query parameter '{name}' is not present"))
    })
}

/// Offsets arrive URL-decoded, so a `+` sent unescaped shows up as a space.
fn parse_created_at(raw: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(&raw.replace(' ', "+")).ok()
}

/// A signed decimal kept as its digits, so range and precision checks
/// are exact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Weight {
    negative: bool,
    /// Integer digits without leading zeros.
    integer: String,
    /// Fraction digits without trailing zeros.
    fraction: String,
}

/// Largest exponent magnitude accepted in scientific notation.
const MAX_WEIGHT_EXPONENT: u64 = 1_000;

impl Weight {
    /// Parses `[+-]digits[.digits][(e|E)[+-]digits]`, where either side of
    /// the point may be empty but not both. Exponents beyond
    /// `MAX_WEIGHT_EXPONENT` in magnitude are rejected.
    pub fn parse(raw: &str) -> Option<Self> {
        let (negative, unsigned) = match raw.as_bytes().first()? {
            b'-' => (true, &raw[1..]),
            b'+' => (false, &raw[1..]),
            _ => (false, raw),
        };

        let (mantissa, exponent) = match unsigned.split_once(['e', 'E']) {
            Some((mantissa, exponent)) => (mantissa, parse_exponent(exponent)?),
            None => (unsigned, 0),
        };

        let (integer, fraction) = mantissa.split_once('.').unwrap_or((mantissa, ""));
        if integer.is_empty() && fraction.is_empty() {
            return None;
        }
        let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
        if !all_digits(integer) || !all_digits(fraction) {
            return None;
        }

        // Shift the decimal point by the exponent.
        let digits = format!("{integer}{fraction}");
        let point = integer.len() as i64 + exponent;
        let (integer, fraction) = if point <= 0 {
            (String::new(), format!("{}{digits}", "0".repeat(point.unsigned_abs() as usize)))
        } else if point as usize >= digits.len() {
            let zeros = "0".repeat(point as usize - digits.len());
            (format!("{digits}{zeros}"), String::new())
        } else {
            let (integer, fraction) = digits.split_at(point as usize);
            (integer.to_owned(), fraction.to_owned())
        };

        Some(Self {
            negative,
            integer: integer.trim_start_matches('0').to_owned(),
            fraction: fraction.trim_end_matches('0').to_owned(),
        })
    }

    fn is_zero(&self) -> bool {
        self.integer.is_empty() && self.fraction.is_empty()
    }

    /// `true` for values of at least `0.001`.
    pub fn is_at_least_one_gram(&self) -> bool {
        if self.negative && !self.is_zero() {
            return false;
        }
        !self.integer.is_empty() || self.fraction.bytes().take(3).any(|b| b != b'0')
    }

    /// `true` if the value needs at most `integer` integer digits and
    /// `fraction` fraction digits.
    pub fn fits(&self, integer: usize, fraction: usize) -> bool {
        self.integer.len() <= integer && self.fraction.len() <= fraction
    }
}

fn parse_exponent(raw: &str) -> Option<i64> {
    let unsigned = raw.strip_prefix(['+', '-']).unwrap_or(raw);
    if unsigned.is_empty() || !unsigned.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse::<i64>()
        .ok()
        .filter(|exponent| exponent.unsigned_abs() <= MAX_WEIGHT_EXPONENT)
}

fn is_country_code(s: &str) -> bool {
    s.len() == 2 && s.bytes().all(|b| b.is_ascii_uppercase())
}

fn is_uuid(s: &str) -> bool {
    let groups: Vec<&str> = s.split('-').collect();
    groups.len() == 5
        && groups
            .iter()
            .zip([8, 4, 4, 4, 12])
            .all(|(group, len)| group.len() == len && group.bytes().all(|b| b.is_ascii_hexdigit()))
}

fn is_kebab_case(s: &str) -> bool {
    !s.is_empty()
        && s.split('-').all(|part| {
            !part.is_empty()
                && part
                    .bytes()
                    .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit())
        })
}
