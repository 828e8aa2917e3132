//! Device handles and the settings snapshot they are built from.

use std::collections::HashMap;
use std::sync::Arc;

use fleet_domain::error::Result;
use fleet_domain::trace::TraceEvent;
use parking_lot::RwLock;

use crate::certs::CertificateBundle;
use crate::credential::AppToken;
use crate::interceptor::RequestInterceptor;
use crate::registry::{ClientSettings, ServiceClient, ServiceRegistry};

/// Copy of an [`SdkContext`](crate::SdkContext)'s state at one point in time.
///
/// Later changes to the context never reach an existing snapshot.
#[derive(Clone, Default)]
pub struct SdkSnapshot {
    pub(crate) registry: ServiceRegistry,
    pub(crate) credential: Option<AppToken>,
    pub(crate) certificate: Option<CertificateBundle>,
    pub(crate) interceptors: Vec<Arc<dyn RequestInterceptor>>,
}

impl SdkSnapshot {
    pub fn registry(&self) -> &ServiceRegistry {
        &self.registry
    }

    pub fn credential(&self) -> Option<&AppToken> {
        self.credential.as_ref()
    }

    pub fn certificate(&self) -> Option<&CertificateBundle> {
        self.certificate.as_ref()
    }

    pub fn interceptors(&self) -> &[Arc<dyn RequestInterceptor>] {
        &self.interceptors
    }

    /// Interceptor names in the order they run.
    pub fn interceptor_names(&self) -> Vec<String> {
        self.interceptors.iter().map(|i| i.name().to_string()).collect()
    }
}

impl std::fmt::Debug for SdkSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SdkSnapshot")
            .field("registry", &self.registry)
            .field("credential", &self.credential)
            .field("certificate", &self.certificate)
            .field("interceptors", &self.interceptor_names())
            .finish()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// DeviceHandle
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// One robot endpoint, configured from the SDK context that created it.
///
/// Service clients are built on first use and reused afterwards.
pub struct DeviceHandle {
    address: String,
    name: String,
    settings: SdkSnapshot,
    clients: RwLock<HashMap<String, Arc<dyn ServiceClient>>>,
}

impl DeviceHandle {
    pub(crate) fn new(address: String, name: String, settings: SdkSnapshot) -> Self {
        Self {
            address,
            name,
            settings,
            clients: RwLock::new(HashMap::new()),
        }
    }

    /// Network address used as the cache key.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Display name given on first creation.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn settings(&self) -> &SdkSnapshot {
        &self.settings
    }

    /// Get the client for `service_name`, building it on first use.
    ///
    /// Fails with [`UnknownService`](fleet_domain::Error::UnknownService)
    /// if the name was not registered when this handle was created.
    pub fn ensure_client(&self, service_name: &str) -> Result<Arc<dyn ServiceClient>> {
        if let Some(client) = self.clients.read().get(service_name) {
            return Ok(client.clone());
        }

        let mut clients = self.clients.write();
        if let Some(client) = clients.get(service_name) {
            return Ok(client.clone());
        }

        let service_type = self.settings.registry.service_type_for(service_name)?;
        let factory = self.settings.registry.resolve(service_type)?;
        let client = factory.construct(self.client_settings(service_name, service_type))?;

        TraceEvent::ServiceClientCreated {
            address: self.address.clone(),
            service_name: service_name.to_string(),
            service_type: service_type.to_string(),
        }
        .emit();

        clients.insert(service_name.to_string(), client.clone());
        Ok(client)
    }

    /// Names of the clients built so far (sorted).
    pub fn client_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.clients.read().keys().cloned().collect();
        names.sort();
        names
    }

    fn client_settings(&self, service_name: &str, service_type: &str) -> ClientSettings {
        ClientSettings {
            address: self.address.clone(),
            service_name: service_name.to_string(),
            service_type: service_type.to_string(),
            credential: self.settings.credential.clone(),
            certificate: self.settings.certificate.clone(),
            interceptors: self.settings.interceptors.clone(),
        }
    }
}

impl std::fmt::Debug for DeviceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceHandle")
            .field("address", &self.address)
            .field("name", &self.name)
            .field("services", &self.settings.registry.len())
            .field("clients", &self.client_names())
            .finish()
    }
}
