//! Builder for an [`SdkContext`] with the standard configuration.

use std::sync::Arc;

use fleet_domain::config::SdkConfig;
use fleet_domain::error::Result;

use crate::context::SdkContext;
use crate::interceptor::AddRequestHeader;
use crate::naming::generate_client_name;
use crate::registry::ServiceClientFactory;
use crate::services::default_service_factories;

/// Fluent builder for the common [`SdkContext`] setup.
///
/// `build` loads the trust bundle, stamps every request with a generated
/// client name, and registers the default services followed by any extra
/// ones (so an extra service with a default name replaces the built-in).
///
/// # Example
///
/// ```rust,no_run
/// # use fleet_sdk::SdkBuilder;
/// let sdk = SdkBuilder::new("fleet-ops-")
///     .cert_glob("/etc/fleet/certs/*.pem")
///     .build()
///     .unwrap();
/// sdk.load_credential("~/.fleet/app_token").unwrap();
/// let robot = sdk.create_device("192.168.80.3", Some("Robot-A")).unwrap();
/// let lease = robot.ensure_client("lease").unwrap();
/// ```
pub struct SdkBuilder {
    config: SdkConfig,
    cert_glob: Option<String>,
    service_clients: Vec<Arc<dyn ServiceClientFactory>>,
}

impl SdkBuilder {
    pub fn new(client_name_prefix: impl Into<String>) -> Self {
        Self {
            config: SdkConfig {
                client_name_prefix: client_name_prefix.into(),
                ..SdkConfig::default()
            },
            cert_glob: None,
            service_clients: Vec::new(),
        }
    }

    /// Start from a loaded [`SdkConfig`].  Its `cert_glob` is resolved
    /// against its resource root.
    pub fn from_config(config: SdkConfig) -> Self {
        Self {
            config,
            cert_glob: None,
            service_clients: Vec::new(),
        }
    }

    /// Glob matching the trust certificates, used as given.  Overrides the
    /// config's `cert_glob`.
    pub fn cert_glob(mut self, glob: impl Into<String>) -> Self {
        self.cert_glob = Some(glob.into());
        self
    }

    /// Register an extra service after the defaults.
    pub fn service_client(mut self, factory: Arc<dyn ServiceClientFactory>) -> Self {
        self.service_clients.push(factory);
        self
    }

    pub fn service_clients(
        mut self,
        factories: impl IntoIterator<Item = Arc<dyn ServiceClientFactory>>,
    ) -> Self {
        self.service_clients.extend(factories);
        self
    }

    pub fn build(self) -> Result<SdkContext> {
        let cert_glob = self
            .cert_glob
            .clone()
            .or_else(|| self.config.resolved_cert_glob());
        tracing::debug!(
            prefix = %self.config.client_name_prefix,
            cert_glob = ?cert_glob,
            "creating standard SDK context"
        );

        let client_name = generate_client_name(&self.config.client_name_prefix);
        let ctx = SdkContext::with_config(self.config.client_name_prefix.clone(), self.config);
        ctx.load_certificate(cert_glob.as_deref())?;
        ctx.append_interceptor(Arc::new(AddRequestHeader::fixed(client_name.clone())));

        for factory in default_service_factories()
            .into_iter()
            .chain(self.service_clients)
        {
            ctx.register_service_client(factory, None, None)?;
        }

        tracing::info!(
            sdk = %ctx.name(),
            client_name = %client_name,
            services = ctx.registry().len(),
            "SDK context ready"
        );
        Ok(ctx)
    }
}

/// An [`SdkContext`] with the most common configuration.
///
/// * `client_name_prefix`: prefix for [`generate_client_name`]
/// * `service_clients`: services to register in addition to the defaults
/// * `cert_glob`: glob matching the trust certificates; `None` uses the
///   packaged default
pub fn create_standard_sdk(
    client_name_prefix: &str,
    service_clients: Vec<Arc<dyn ServiceClientFactory>>,
    cert_glob: Option<&str>,
) -> Result<SdkContext> {
    let mut builder = SdkBuilder::new(client_name_prefix).service_clients(service_clients);
    if let Some(glob) = cert_glob {
        builder = builder.cert_glob(glob);
    }
    builder.build()
}
