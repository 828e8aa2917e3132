//! App token loading and claim introspection.
//!
//! The token is a three-segment `header.payload.signature` string.  This
//! module only reads the payload so it can warn operators about upcoming
//! expiry.  The signature is **never** checked here: the robot-side services
//! validate it on every request.  Nothing in this module is an
//! authentication decision.

use std::path::Path;

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine as _;
use chrono::{DateTime, Duration, Utc};
use fleet_domain::config::expand_home;
use fleet_domain::error::{Error, Result};
use serde::Serialize;
use serde_json::{Map, Value};

/// Tokens expiring within this many days are logged as warnings.
pub const EXPIRY_WARNING_DAYS: i64 = 30;

/// Date format used in expiry log lines.
const EXPIRY_DATE_FORMAT: &str = "%Y/%m/%d";

/// base64url, padding optional on decode.
const BASE64_URL_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// AppToken
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A loaded app token and its decoded (unverified) claims.
#[derive(Clone)]
pub struct AppToken {
    raw: String,
    claims: Map<String, Value>,
}

impl AppToken {
    /// Decode `raw` into a token.  Fails if the payload cannot be decoded.
    pub fn parse(raw: impl Into<String>) -> Result<Self> {
        let raw = raw.into();
        let claims = decode_claims_unverified(&raw)?;
        Ok(Self { raw, claims })
    }

    /// The token string as presented to services.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn claims(&self) -> &Map<String, Value> {
        &self.claims
    }

    /// The `exp` claim in Unix seconds, if present and numeric.
    pub fn expires_at(&self) -> Option<i64> {
        self.claims.get("exp").and_then(numeric_seconds)
    }
}

// Manual Debug impl to avoid leaking the token.
impl std::fmt::Debug for AppToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&String> = self.claims.keys().collect();
        names.sort();
        f.debug_struct("AppToken")
            .field("raw_len", &self.raw.len())
            .field("claims", &names)
            .finish()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Loading & decoding
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Read an app token file and return its trimmed contents.
///
/// A leading `~` is expanded to the home directory.  An empty path is
/// [`Error::UnsetCredential`]; any read or UTF-8 failure is
/// [`Error::UnreadableCredential`].
pub fn load_credential(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    if path.as_os_str().is_empty() {
        return Err(Error::UnsetCredential);
    }

    let resolved = expand_home(path);
    let unreadable = |source: std::io::Error| {
        tracing::error!(
            path = %resolved.display(),
            error = %source,
            "unable to read app token"
        );
        Error::UnreadableCredential {
            path: path.to_path_buf(),
            source,
        }
    };

    let bytes = std::fs::read(&resolved).map_err(unreadable)?;
    let text = String::from_utf8(bytes)
        .map_err(|e| unreadable(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;
    Ok(text.trim().to_string())
}

/// Decode the claims of a token **without verifying its signature**.
///
/// Splits the token into its three segments and parses the base64url
/// payload as a JSON object.  Errors carry the decoder's message but never
/// the token itself.
pub fn decode_claims_unverified(raw: &str) -> Result<Map<String, Value>> {
    let segments: Vec<&str> = raw.split('.').collect();
    if segments.len() != 3 {
        return Err(Error::MalformedCredential(format!(
            "expected 3 dot-separated segments, found {}",
            segments.len()
        )));
    }

    let payload = BASE64_URL_LENIENT.decode(segments[1]).map_err(|e| {
        Error::MalformedCredential(format!("payload is not valid base64url: {e}"))
    })?;

    serde_json::from_slice::<Map<String, Value>>(&payload).map_err(|e| {
        Error::MalformedCredential(format!("payload is not a JSON object: {e}"))
    })
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Expiry
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// How close a token is to expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TokenExpiry {
    /// Already expired.  Logged at error level.
    Expired { expires_at: DateTime<Utc> },
    /// Expires within [`EXPIRY_WARNING_DAYS`].  Logged at warn level.
    ExpiringSoon {
        expires_at: DateTime<Utc>,
        days_remaining: i64,
    },
    /// Logged at info level.
    Valid { expires_at: DateTime<Utc> },
}

impl TokenExpiry {
    pub fn expires_at(&self) -> DateTime<Utc> {
        match *self {
            TokenExpiry::Expired { expires_at }
            | TokenExpiry::ExpiringSoon { expires_at, .. }
            | TokenExpiry::Valid { expires_at } => expires_at,
        }
    }

    pub fn is_expired(&self) -> bool {
        matches!(self, TokenExpiry::Expired { .. })
    }

    fn log(&self) {
        let date = self.expires_at().format(EXPIRY_DATE_FORMAT);
        match self {
            TokenExpiry::Expired { .. } => {
                tracing::error!(
                    expires_on = %date,
                    "application token has expired; contact your fleet administrator \
                     for a new token"
                );
            }
            TokenExpiry::ExpiringSoon { days_remaining, .. } => {
                tracing::warn!(
                    days_remaining,
                    expires_on = %date,
                    "application token expires in {days_remaining} days on {date}; request \
                     a new token before the current one expires"
                );
            }
            TokenExpiry::Valid { .. } => {
                tracing::info!(expires_on = %date, "application token expires on {date}");
            }
        }
    }
}

/// Classify and log how long the token in `claims` remains valid at `now`.
///
/// A missing or non-numeric `exp` claim is [`Error::MalformedCredential`].
/// The classification itself never fails.
pub fn check_expiry(claims: &Map<String, Value>, now: DateTime<Utc>) -> Result<TokenExpiry> {
    let exp = claims.get("exp").ok_or_else(|| {
        Error::MalformedCredential("unknown token expiration: missing \"exp\" claim".into())
    })?;
    let exp_secs = numeric_seconds(exp).ok_or_else(|| {
        Error::MalformedCredential(format!("\"exp\" claim is not a number: {exp}"))
    })?;
    let expires_at = DateTime::<Utc>::from_timestamp(exp_secs, 0).ok_or_else(|| {
        Error::MalformedCredential(format!("\"exp\" claim out of range: {exp_secs}"))
    })?;

    let remaining = expires_at - now;
    let expiry = if remaining < Duration::zero() {
        TokenExpiry::Expired { expires_at }
    } else if remaining <= Duration::days(EXPIRY_WARNING_DAYS) {
        TokenExpiry::ExpiringSoon {
            expires_at,
            days_remaining: remaining.num_days(),
        }
    } else {
        TokenExpiry::Valid { expires_at }
    };

    expiry.log();
    Ok(expiry)
}

fn numeric_seconds(v: &Value) -> Option<i64> {
    v.as_i64().or_else(|| v.as_f64().map(|f| f as i64))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
