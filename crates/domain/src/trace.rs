use serde::Serialize;

/// Structured trace events emitted across the fleet SDK crates.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    CredentialLoaded {
        path: String,
        expires_at: i64,
        remaining_secs: i64,
    },
    CertificateBundleLoaded {
        source: String,
        files: usize,
        bytes: usize,
    },
    ServiceRegistered {
        service_name: String,
        service_type: String,
        replaced: bool,
    },
    InterceptorAppended {
        interceptor: String,
        position: usize,
    },
    DeviceCreated {
        address: String,
        name: String,
        services: usize,
    },
    ServiceClientCreated {
        address: String,
        service_name: String,
        service_type: String,
    },
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(trace_event = %json, "fleet_event");
    }
}
