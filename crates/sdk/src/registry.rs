//! Service registry: maps logical service names and types to client factories.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use fleet_domain::error::{Error, Result};
use fleet_domain::trace::TraceEvent;

use crate::certs::CertificateBundle;
use crate::credential::AppToken;
use crate::interceptor::{apply_interceptors, RequestHeader, RequestInterceptor};

/// A client for one robot service, built by a [`ServiceClientFactory`].
///
/// The SDK treats clients as opaque.  Callers that need the concrete type
/// downcast through [`as_any`](Self::as_any).
pub trait ServiceClient: Send + Sync + std::fmt::Debug + 'static {
    fn service_name(&self) -> &str;
    fn service_type(&self) -> &str;
    fn as_any(&self) -> &dyn Any;
}

/// Describes how to build a client for one service.
///
/// Factories may declare a default service name and type so they can be
/// registered without spelling either out.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use fleet_sdk::{ClientSettings, ServiceClient, ServiceClientFactory, ServiceRegistry};
///
/// struct ArmFactory;
///
/// impl ServiceClientFactory for ArmFactory {
///     fn default_service_name(&self) -> Option<&str> {
///         Some("arm")
///     }
///     fn service_type(&self) -> Option<&str> {
///         Some("acme.api.ArmService")
///     }
///     fn construct(
///         &self,
///         settings: ClientSettings,
///     ) -> fleet_sdk::Result<Arc<dyn ServiceClient>> {
///         unimplemented!("{settings:?}")
///     }
/// }
///
/// let mut reg = ServiceRegistry::new();
/// reg.register(Arc::new(ArmFactory), None, None).unwrap();
/// assert!(reg.resolve_by_name("arm").is_ok());
/// ```
pub trait ServiceClientFactory: Send + Sync + 'static {
    fn default_service_name(&self) -> Option<&str> {
        None
    }

    fn service_type(&self) -> Option<&str> {
        None
    }

    fn construct(&self, settings: ClientSettings) -> Result<Arc<dyn ServiceClient>>;
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// ClientSettings
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Everything a factory gets to build one client for one device.
#[derive(Clone)]
pub struct ClientSettings {
    pub address: String,
    pub service_name: String,
    pub service_type: String,
    pub credential: Option<AppToken>,
    pub certificate: Option<CertificateBundle>,
    pub interceptors: Vec<Arc<dyn RequestInterceptor>>,
}

impl ClientSettings {
    /// A fresh request header with every interceptor applied.
    pub fn request_header(&self) -> RequestHeader {
        let mut header = RequestHeader::default();
        apply_interceptors(&self.interceptors, &mut header);
        header
    }
}

impl std::fmt::Debug for ClientSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let interceptors: Vec<&str> = self.interceptors.iter().map(|i| i.name()).collect();
        f.debug_struct("ClientSettings")
            .field("address", &self.address)
            .field("service_name", &self.service_name)
            .field("service_type", &self.service_type)
            .field("credential", &self.credential)
            .field("certificate", &self.certificate)
            .field("interceptors", &interceptors)
            .finish()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// ServiceRegistry
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// The outcome of a [`ServiceRegistry::register`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceRegistration {
    pub service_name: String,
    pub service_type: String,
    /// Whether an earlier name or type mapping was overwritten.
    pub replaced: bool,
}

/// Name → type and type → factory mappings.
///
/// Registering an existing name or type overwrites it (last write wins).
/// There is no removal.
#[derive(Clone, Default)]
pub struct ServiceRegistry {
    type_by_name: HashMap<String, String>,
    factories_by_type: HashMap<String, Arc<dyn ServiceClientFactory>>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `factory` under `service_type` / `service_name`.
    ///
    /// Either value falls back to the factory's declared default when `None`
    /// or empty.  Fails with [`Error::Registration`] if neither is available.
    pub fn register(
        &mut self,
        factory: Arc<dyn ServiceClientFactory>,
        service_type: Option<&str>,
        service_name: Option<&str>,
    ) -> Result<ServiceRegistration> {
        let service_name = non_empty(service_name)
            .or_else(|| non_empty(factory.default_service_name()))
            .map(str::to_owned)
            .ok_or_else(|| {
                Error::Registration(
                    "no service name given and the factory declares no default".into(),
                )
            })?;
        let service_type = non_empty(service_type)
            .or_else(|| non_empty(factory.service_type()))
            .map(str::to_owned)
            .ok_or_else(|| {
                Error::Registration(format!(
                    "no service type given for '{service_name}' and the factory declares none"
                ))
            })?;

        let previous_type = self
            .type_by_name
            .insert(service_name.clone(), service_type.clone());
        let previous_factory = self
            .factories_by_type
            .insert(service_type.clone(), factory);
        let replaced = previous_type.is_some() || previous_factory.is_some();

        if replaced {
            tracing::debug!(
                service_name = %service_name,
                service_type = %service_type,
                previous_type = ?previous_type,
                "service registration replaced an existing entry"
            );
        }
        TraceEvent::ServiceRegistered {
            service_name: service_name.clone(),
            service_type: service_type.clone(),
            replaced,
        }
        .emit();

        Ok(ServiceRegistration {
            service_name,
            service_type,
            replaced,
        })
    }

    /// Look up a factory by service type.
    pub fn resolve(&self, service_type: &str) -> Result<Arc<dyn ServiceClientFactory>> {
        self.factories_by_type
            .get(service_type)
            .cloned()
            .ok_or_else(|| Error::UnknownService(format!("no factory for type '{service_type}'")))
    }

    /// Look up a factory by service name.
    pub fn resolve_by_name(&self, service_name: &str) -> Result<Arc<dyn ServiceClientFactory>> {
        let service_type = self.service_type_for(service_name)?;
        self.resolve(service_type)
    }

    /// The type registered for `service_name`.
    pub fn service_type_for(&self, service_name: &str) -> Result<&str> {
        self.type_by_name
            .get(service_name)
            .map(String::as_str)
            .ok_or_else(|| Error::UnknownService(format!("no service named '{service_name}'")))
    }

    pub fn contains_name(&self, service_name: &str) -> bool {
        self.type_by_name.contains_key(service_name)
    }

    /// All registered service names (sorted).
    pub fn service_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.type_by_name.keys().cloned().collect();
        names.sort();
        names
    }

    /// All registered service types (sorted).
    pub fn service_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.factories_by_type.keys().cloned().collect();
        types.sort();
        types
    }

    /// Number of registered service names.
    pub fn len(&self) -> usize {
        self.type_by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.type_by_name.is_empty()
    }
}

impl std::fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceRegistry")
            .field("services", &self.service_names())
            .finish()
    }
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.filter(|s| !s.is_empty())
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Dummy {
        settings: ClientSettings,
    }

    impl ServiceClient for Dummy {
        fn service_name(&self) -> &str {
            &self.settings.service_name
        }
        fn service_type(&self) -> &str {
            &self.settings.service_type
        }
        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    struct WithDefaults;

    impl ServiceClientFactory for WithDefaults {
        fn default_service_name(&self) -> Option<&str> {
            Some("lease")
        }
        fn service_type(&self) -> Option<&str> {
            Some("fleet.api.LeaseService")
        }
        fn construct(&self, settings: ClientSettings) -> Result<Arc<dyn ServiceClient>> {
            Ok(Arc::new(Dummy { settings }))
        }
    }

    struct Bare;

    impl ServiceClientFactory for Bare {
        fn construct(&self, settings: ClientSettings) -> Result<Arc<dyn ServiceClient>> {
            Ok(Arc::new(Dummy { settings }))
        }
    }

    #[test]
    fn defaults_resolve_by_type_and_name_to_same_factory() {
        let mut reg = ServiceRegistry::new();
        let factory: Arc<dyn ServiceClientFactory> = Arc::new(WithDefaults);
        let registration = reg.register(factory.clone(), None, None).unwrap();
        assert_eq!(registration.service_name, "lease");
        assert_eq!(registration.service_type, "fleet.api.LeaseService");
        assert!(!registration.replaced);

        let by_type = reg.resolve("fleet.api.LeaseService").unwrap();
        let by_name = reg.resolve_by_name("lease").unwrap();
        assert!(Arc::ptr_eq(&by_type, &by_name));
        assert!(Arc::ptr_eq(&by_type, &factory));
    }

    #[test]
    fn type_only_registration_keeps_default_name() {
        let mut reg = ServiceRegistry::new();
        let factory: Arc<dyn ServiceClientFactory> = Arc::new(WithDefaults);
        let r = reg
            .register(factory.clone(), Some("fleet.api.LeaseV2Service"), None)
            .unwrap();
        assert_eq!(r.service_name, "lease");
        assert_eq!(r.service_type, "fleet.api.LeaseV2Service");

        let by_type = reg.resolve("fleet.api.LeaseV2Service").unwrap();
        let by_name = reg.resolve_by_name("lease").unwrap();
        assert!(Arc::ptr_eq(&by_type, &by_name));
        assert!(Arc::ptr_eq(&by_name, &factory));
        assert!(reg.resolve("fleet.api.LeaseService").is_err());
    }

    #[test]
    fn explicit_values_override_defaults() {
        let mut reg = ServiceRegistry::new();
        reg.register(Arc::new(WithDefaults), Some("custom.Lease"), Some("lease-2"))
            .unwrap();
        assert!(reg.resolve_by_name("lease-2").is_ok());
        assert!(reg.resolve("custom.Lease").is_ok());
        assert!(!reg.contains_name("lease"));
    }

    #[test]
    fn empty_strings_fall_back_to_defaults() {
        let mut reg = ServiceRegistry::new();
        let r = reg.register(Arc::new(WithDefaults), Some(""), Some("")).unwrap();
        assert_eq!(r.service_name, "lease");
        assert_eq!(r.service_type, "fleet.api.LeaseService");
    }

    #[test]
    fn factory_without_defaults_needs_explicit_values() {
        let mut reg = ServiceRegistry::new();
        assert!(matches!(
            reg.register(Arc::new(Bare), None, None),
            Err(Error::Registration(_))
        ));
        assert!(matches!(
            reg.register(Arc::new(Bare), None, Some("bare")),
            Err(Error::Registration(_))
        ));
        assert!(reg.is_empty());

        reg.register(Arc::new(Bare), Some("fleet.api.Bare"), Some("bare"))
            .unwrap();
        assert!(reg.resolve_by_name("bare").is_ok());
    }

    #[test]
    fn duplicate_registration_is_last_write_wins() {
        let mut reg = ServiceRegistry::new();
        let first: Arc<dyn ServiceClientFactory> = Arc::new(WithDefaults);
        let second: Arc<dyn ServiceClientFactory> = Arc::new(WithDefaults);
        reg.register(first.clone(), None, None).unwrap();
        let r = reg.register(second.clone(), None, None).unwrap();
        assert!(r.replaced);
        assert_eq!(reg.len(), 1);
        assert!(Arc::ptr_eq(&reg.resolve_by_name("lease").unwrap(), &second));
    }

    #[test]
    fn unknown_lookups_fail() {
        let reg = ServiceRegistry::new();
        assert!(matches!(reg.resolve("nope"), Err(Error::UnknownService(_))));
        assert!(matches!(
            reg.resolve_by_name("nope"),
            Err(Error::UnknownService(_))
        ));
    }

    #[test]
    fn names_and_types_sorted() {
        let mut reg = ServiceRegistry::new();
        reg.register(Arc::new(Bare), Some("z.Type"), Some("zeta")).unwrap();
        reg.register(Arc::new(Bare), Some("a.Type"), Some("alpha")).unwrap();
        assert_eq!(reg.service_names(), vec!["alpha", "zeta"]);
        assert_eq!(reg.service_types(), vec!["a.Type", "z.Type"]);
    }

    #[test]
    fn construct_receives_settings() {
        let mut reg = ServiceRegistry::new();
        reg.register(Arc::new(WithDefaults), None, None).unwrap();
        let factory = reg.resolve_by_name("lease").unwrap();
        let client = factory
            .construct(ClientSettings {
                address: "10.0.0.1".into(),
                service_name: "lease".into(),
                service_type: "fleet.api.LeaseService".into(),
                credential: None,
                certificate: None,
                interceptors: Vec::new(),
            })
            .unwrap();
        assert_eq!(client.service_name(), "lease");
        let dummy = client.as_any().downcast_ref::<Dummy>().unwrap();
        assert_eq!(dummy.settings.address, "10.0.0.1");
    }
}
