use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Environment variable that overrides the default resource root.
pub const RESOURCE_ROOT_ENV: &str = "FLEET_RESOURCE_ROOT";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// SDK config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Settings shared by every SDK context in a process.
///
/// The resource root is resolved once, when the config is constructed or
/// deserialized, and carried from there.  Nothing below the config layer
/// consults the environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SdkConfig {
    /// Prefix for the generated client name (e.g. `"fleet-ops-"`).
    #[serde(default)]
    pub client_name_prefix: String,
    /// Base directory for relative certificate globs and token paths.
    #[serde(default = "d_resource_root")]
    pub resource_root: PathBuf,
    /// Glob matching trust certificates.  `None` uses the packaged default.
    #[serde(default)]
    pub cert_glob: Option<String>,
    /// Path to the app token file.
    #[serde(default)]
    pub app_token_path: Option<PathBuf>,
}

impl Default for SdkConfig {
    fn default() -> Self {
        Self {
            client_name_prefix: String::new(),
            resource_root: d_resource_root(),
            cert_glob: None,
            app_token_path: None,
        }
    }
}

impl SdkConfig {
    /// Load configuration from a TOML file, falling back to defaults for missing keys.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: SdkConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load from file if it exists and parses, otherwise return defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::debug!(
                    path = %path.display(),
                    error = %e,
                    "SDK config not loaded, using defaults"
                );
                Self::default()
            }
        }
    }

    /// Replace the resource root.
    pub fn with_resource_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.resource_root = root.into();
        self
    }

    /// Expand `~` and anchor relative paths at the resource root.
    pub fn resolve_path(&self, path: impl AsRef<Path>) -> PathBuf {
        let expanded = expand_home(path.as_ref());
        if expanded.is_absolute() {
            expanded
        } else {
            expand_home(&self.resource_root).join(expanded)
        }
    }

    /// The configured certificate glob, resolved against the resource root.
    pub fn resolved_cert_glob(&self) -> Option<String> {
        self.cert_glob
            .as_deref()
            .map(|g| self.resolve_path(g).to_string_lossy().into_owned())
    }

    /// The configured app token path, resolved against the resource root.
    pub fn resolved_app_token_path(&self) -> Option<PathBuf> {
        self.app_token_path
            .as_deref()
            .filter(|p| !p.as_os_str().is_empty())
            .map(|p| self.resolve_path(p))
    }
}

/// Replace a leading `~` with the current user's home directory.
///
/// Paths that do not start with `~` (or `~/...`), and every path when the
/// home directory cannot be determined, are returned unchanged.
pub fn expand_home(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match dirs::home_dir() {
        Some(home) => home.join(rest),
        None => path.to_path_buf(),
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_resource_root() -> PathBuf {
    match std::env::var_os(RESOURCE_ROOT_ENV) {
        Some(root) if !root.is_empty() => PathBuf::from(root),
        _ => dirs::home_dir()
            .map(|h| h.join(".fleet"))
            .unwrap_or_else(|| PathBuf::from(".fleet")),
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_yields_defaults() {
        let cfg: SdkConfig = toml::from_str("").unwrap();
        assert!(cfg.client_name_prefix.is_empty());
        assert!(cfg.cert_glob.is_none());
        assert!(cfg.app_token_path.is_none());
        assert!(!cfg.resource_root.as_os_str().is_empty());
    }

    #[test]
    fn parses_all_fields() {
        let cfg: SdkConfig = toml::from_str(
            r#"
            client_name_prefix = "fleet-ops-"
            resource_root = "/etc/fleet"
            cert_glob = "certs/*.pem"
            app_token_path = "/etc/fleet/app_token"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.client_name_prefix, "fleet-ops-");
        assert_eq!(cfg.resource_root, PathBuf::from("/etc/fleet"));
        assert_eq!(cfg.resolved_cert_glob().as_deref(), Some("/etc/fleet/certs/*.pem"));
        assert_eq!(
            cfg.resolved_app_token_path(),
            Some(PathBuf::from("/etc/fleet/app_token"))
        );
    }

    #[test]
    fn absolute_paths_are_not_anchored() {
        let cfg = SdkConfig::default().with_resource_root("/srv/fleet");
        assert_eq!(cfg.resolve_path("/tmp/token"), PathBuf::from("/tmp/token"));
        assert_eq!(cfg.resolve_path("token"), PathBuf::from("/srv/fleet/token"));
    }

    #[test]
    fn empty_token_path_resolves_to_none() {
        let cfg = SdkConfig {
            app_token_path: Some(PathBuf::new()),
            ..SdkConfig::default()
        };
        assert!(cfg.resolved_app_token_path().is_none());
    }

    #[test]
    fn expand_home_only_touches_leading_tilde() {
        let plain = Path::new("/var/lib/token");
        assert_eq!(expand_home(plain), plain);
        let mid = Path::new("certs/~/x.pem");
        assert_eq!(expand_home(mid), mid);
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home(Path::new("~/.fleet/token")), home.join(".fleet/token"));
            assert_eq!(expand_home(Path::new("~")), home);
        }
    }

    #[test]
    fn load_reads_file_and_load_or_default_tolerates_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fleet.toml");
        std::fs::write(&path, "client_name_prefix = \"ops-\"\n").unwrap();
        assert_eq!(SdkConfig::load(&path).unwrap().client_name_prefix, "ops-");

        let missing = SdkConfig::load_or_default(dir.path().join("missing.toml"));
        assert!(missing.client_name_prefix.is_empty());
    }

    #[test]
    fn load_rejects_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "client_name_prefix = [").unwrap();
        assert!(matches!(SdkConfig::load(&path), Err(crate::error::Error::Toml(_))));
    }
}
