use std::path::PathBuf;

/// Shared error type used across the fleet SDK crates.
///
/// Each credential failure mode has its own variant so callers can branch
/// (e.g. re-prompt for a path on `UnsetCredential`, surface a decode error on
/// `MalformedCredential`) without inspecting messages.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("app token path not set")]
    UnsetCredential,

    #[error("unable to read app token from \"{}\": {source}", .path.display())]
    UnreadableCredential {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed app token: {0}")]
    MalformedCredential(String),

    #[error("no certificate files matched \"{pattern}\"{}", reason_suffix(.reason))]
    CertificateNotFound {
        pattern: String,
        reason: Option<String>,
    },

    #[error("service registration: {0}")]
    Registration(String),

    #[error("unknown service: {0}")]
    UnknownService(String),
}

pub type Result<T> = std::result::Result<T, Error>;

fn reason_suffix(reason: &Option<String>) -> String {
    reason.as_deref().map(|r| format!(": {r}")).unwrap_or_default()
}
