//! SDK context: settings shared by a developer or robot fleet, and the
//! address-keyed cache of device handles built from them.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use fleet_domain::config::SdkConfig;
use fleet_domain::error::{Error, Result};
use fleet_domain::trace::TraceEvent;
use parking_lot::RwLock;

use crate::certs::CertificateBundle;
use crate::credential::{self, AppToken, TokenExpiry};
use crate::device::{DeviceHandle, SdkSnapshot};
use crate::interceptor::RequestInterceptor;
use crate::registry::{ServiceClientFactory, ServiceRegistration, ServiceRegistry};

/// Default context name used in logs.
pub const DEFAULT_CONTEXT_NAME: &str = "fleet-sdk";

/// Repository for settings common to a developer or robot fleet.
///
/// Every [`DeviceHandle`] takes a snapshot of these settings when it is
/// created.  Registering services, appending interceptors or loading new
/// credentials afterwards only affects devices created later.
///
/// All methods take `&self`; share a context across threads with `Arc`.
pub struct SdkContext {
    name: String,
    config: SdkConfig,
    credential: RwLock<Option<AppToken>>,
    certificate: RwLock<Option<CertificateBundle>>,
    registry: RwLock<ServiceRegistry>,
    interceptors: RwLock<Vec<Arc<dyn RequestInterceptor>>>,
    devices: RwLock<HashMap<String, Arc<DeviceHandle>>>,
}

impl SdkContext {
    /// An empty context with default configuration.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_config(name, SdkConfig::default())
    }

    pub fn with_config(name: impl Into<String>, config: SdkConfig) -> Self {
        let name = name.into();
        let name = if name.is_empty() {
            DEFAULT_CONTEXT_NAME.to_string()
        } else {
            name
        };
        Self {
            name,
            config,
            credential: RwLock::new(None),
            certificate: RwLock::new(None),
            registry: RwLock::new(ServiceRegistry::new()),
            interceptors: RwLock::new(Vec::new()),
            devices: RwLock::new(HashMap::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &SdkConfig {
        &self.config
    }

    // ── Certificates ─────────────────────────────────────────────────

    /// Load the trust bundle: the packaged default when `glob` is `None`,
    /// otherwise every file the glob matches.
    ///
    /// The current bundle is cleared first, so a failed load leaves none.
    pub fn load_certificate(&self, glob: Option<&str>) -> Result<()> {
        let mut slot = self.certificate.write();
        *slot = None;
        let bundle = match glob {
            None => CertificateBundle::load_default(),
            Some(pattern) => CertificateBundle::load_from_glob(pattern)?,
        };
        *slot = Some(bundle);
        Ok(())
    }

    pub fn certificate(&self) -> Option<CertificateBundle> {
        self.certificate.read().clone()
    }

    // ── Credentials ──────────────────────────────────────────────────

    /// Load the app token at `path`, log its expiry and keep it.
    ///
    /// A token that cannot be read or decoded is not kept; a previously
    /// loaded token stays in place.
    pub fn load_credential(&self, path: impl AsRef<Path>) -> Result<TokenExpiry> {
        let path = path.as_ref();
        let raw = credential::load_credential(path)?;
        let token = AppToken::parse(raw)?;
        let expiry = self.store_credential(token)?;
        TraceEvent::CredentialLoaded {
            path: path.display().to_string(),
            expires_at: expiry.expires_at().timestamp(),
            remaining_secs: (expiry.expires_at() - Utc::now()).num_seconds(),
        }
        .emit();
        Ok(expiry)
    }

    /// Load the app token named by the configuration's `app_token_path`.
    pub fn load_credential_from_config(&self) -> Result<TokenExpiry> {
        let path = self
            .config
            .resolved_app_token_path()
            .ok_or(Error::UnsetCredential)?;
        self.load_credential(path)
    }

    /// Keep an already-parsed token, logging its expiry.
    pub fn set_credential(&self, token: AppToken) -> Result<TokenExpiry> {
        self.store_credential(token)
    }

    pub fn credential(&self) -> Option<AppToken> {
        self.credential.read().clone()
    }

    fn store_credential(&self, token: AppToken) -> Result<TokenExpiry> {
        let expiry = credential::check_expiry(token.claims(), Utc::now())?;
        *self.credential.write() = Some(token);
        Ok(expiry)
    }

    // ── Services & interceptors ──────────────────────────────────────

    /// Tell the context how to build a service client.  See
    /// [`ServiceRegistry::register`].
    pub fn register_service_client(
        &self,
        factory: Arc<dyn ServiceClientFactory>,
        service_type: Option<&str>,
        service_name: Option<&str>,
    ) -> Result<ServiceRegistration> {
        self.registry
            .write()
            .register(factory, service_type, service_name)
    }

    /// Append an interceptor; it runs after every one already present.
    pub fn append_interceptor(&self, interceptor: Arc<dyn RequestInterceptor>) {
        let mut chain = self.interceptors.write();
        TraceEvent::InterceptorAppended {
            interceptor: interceptor.name().to_string(),
            position: chain.len(),
        }
        .emit();
        chain.push(interceptor);
    }

    /// A copy of the current registry.
    pub fn registry(&self) -> ServiceRegistry {
        self.registry.read().clone()
    }

    /// Interceptor names in the order they run.
    pub fn interceptor_names(&self) -> Vec<String> {
        self.interceptors
            .read()
            .iter()
            .map(|i| i.name().to_string())
            .collect()
    }

    /// Copy the current registry, credential, certificate and interceptors.
    pub fn snapshot(&self) -> SdkSnapshot {
        SdkSnapshot {
            registry: self.registry.read().clone(),
            credential: self.credential.read().clone(),
            certificate: self.certificate.read().clone(),
            interceptors: self.interceptors.read().clone(),
        }
    }

    // ── Devices ──────────────────────────────────────────────────────

    /// Get the device at `address`, creating it if it does not exist yet.
    ///
    /// `name` defaults to the address and only applies on creation; later
    /// calls for the same address return the original handle unchanged.
    /// Requires a loaded credential.
    pub fn create_device(&self, address: &str, name: Option<&str>) -> Result<Arc<DeviceHandle>> {
        if self.credential.read().is_none() {
            return Err(Error::UnsetCredential);
        }

        if let Some(device) = self.devices.read().get(address) {
            return Ok(device.clone());
        }

        let mut devices = self.devices.write();
        if let Some(device) = devices.get(address) {
            return Ok(device.clone());
        }

        let name = name.filter(|n| !n.is_empty()).unwrap_or(address);
        let snapshot = self.snapshot();
        let services = snapshot.registry.len();
        let device = Arc::new(DeviceHandle::new(
            address.to_string(),
            name.to_string(),
            snapshot,
        ));
        devices.insert(address.to_string(), device.clone());

        TraceEvent::DeviceCreated {
            address: address.to_string(),
            name: name.to_string(),
            services,
        }
        .emit();

        Ok(device)
    }

    /// Look up an existing device without creating one.
    pub fn device(&self, address: &str) -> Option<Arc<DeviceHandle>> {
        self.devices.read().get(address).cloned()
    }

    /// Addresses of all devices created so far (sorted).
    pub fn device_addresses(&self) -> Vec<String> {
        let mut addrs: Vec<String> = self.devices.read().keys().cloned().collect();
        addrs.sort();
        addrs
    }

    pub fn device_count(&self) -> usize {
        self.devices.read().len()
    }
}

impl std::fmt::Debug for SdkContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Each lock is released before the next is taken; `create_device`
        // holds `devices` while reading the others.
        let credential_loaded = self.credential.read().is_some();
        let certificate = self.certificate();
        let registry = self.registry();
        let interceptors = self.interceptor_names();
        let devices = self.device_addresses();
        f.debug_struct("SdkContext")
            .field("name", &self.name)
            .field("credential_loaded", &credential_loaded)
            .field("certificate", &certificate)
            .field("registry", &registry)
            .field("interceptors", &interceptors)
            .field("devices", &devices)
            .finish()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
