//! Trust certificate bundle assembly.
//!
//! A bundle is either the PEM shipped with this crate or the concatenation
//! of every regular file matched by a glob, in lexicographic path order.

use std::path::PathBuf;
use std::sync::Arc;

use fleet_domain::error::{Error, Result};
use fleet_domain::trace::TraceEvent;

/// Root certificate shipped with the SDK.
static DEFAULT_ROBOT_CERT: &[u8] = include_bytes!("../resources/robot.pem");

/// Where a bundle's bytes came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BundleSource {
    /// The packaged default certificate.
    Default,
    /// Files matched by `pattern`, in the order they were concatenated.
    Glob { pattern: String, files: Vec<PathBuf> },
}

/// Immutable trust bundle.  Clones share the same bytes.
#[derive(Clone)]
pub struct CertificateBundle {
    bytes: Arc<[u8]>,
    source: BundleSource,
}

impl CertificateBundle {
    /// The packaged default certificate.
    pub fn load_default() -> Self {
        let bundle = Self {
            bytes: Arc::from(DEFAULT_ROBOT_CERT),
            source: BundleSource::Default,
        };
        bundle.trace();
        bundle
    }

    /// Concatenate every regular file matching `pattern`.
    ///
    /// Matches are sorted by their full path string, byte by byte, before
    /// reading so the result is stable for a fixed set of files.  Zero
    /// matches (or an unparseable pattern) is [`Error::CertificateNotFound`],
    /// never a fallback to the default.
    pub fn load_from_glob(pattern: &str) -> Result<Self> {
        let entries = glob::glob(pattern).map_err(|e| Error::CertificateNotFound {
            pattern: pattern.to_string(),
            reason: Some(e.to_string()),
        })?;

        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| match entry {
                Ok(path) => Some(path),
                Err(e) => {
                    tracing::warn!(
                        pattern,
                        error = %e,
                        "skipping unreadable certificate glob entry"
                    );
                    None
                }
            })
            .filter(|path| path.is_file())
            .collect();
        files.sort_by(|a, b| a.as_os_str().cmp(b.as_os_str()));

        if files.is_empty() {
            return Err(Error::CertificateNotFound {
                pattern: pattern.to_string(),
                reason: None,
            });
        }

        let mut bytes = Vec::new();
        for path in &files {
            bytes.extend_from_slice(&std::fs::read(path)?);
            tracing::debug!(path = %path.display(), "certificate file added to bundle");
        }

        let bundle = Self {
            bytes: Arc::from(bytes),
            source: BundleSource::Glob {
                pattern: pattern.to_string(),
                files,
            },
        };
        bundle.trace();
        Ok(bundle)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn source(&self) -> &BundleSource {
        &self.source
    }

    fn trace(&self) {
        let (source, files) = match &self.source {
            BundleSource::Default => ("default".to_string(), 1),
            BundleSource::Glob { pattern, files } => (pattern.clone(), files.len()),
        };
        TraceEvent::CertificateBundleLoaded {
            source,
            files,
            bytes: self.bytes.len(),
        }
        .emit();
    }
}

impl AsRef<[u8]> for CertificateBundle {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl std::fmt::Debug for CertificateBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CertificateBundle")
            .field("len", &self.bytes.len())
            .field("source", &self.source)
            .finish()
    }
}
