//! Default robot service descriptors.
//!
//! Each descriptor knows its default name and type and builds a
//! [`StandardClient`] bound to one device.  The service protocols live
//! elsewhere; a `StandardClient` only carries the settings a transport needs.

use std::any::Any;
use std::sync::Arc;

use fleet_domain::error::Result;

use crate::interceptor::RequestHeader;
use crate::registry::{ClientSettings, ServiceClient, ServiceClientFactory};

/// A built-in service: default name, type, and a [`StandardClient`] factory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StandardService {
    pub name: &'static str,
    pub service_type: &'static str,
}

impl StandardService {
    pub const fn new(name: &'static str, service_type: &'static str) -> Self {
        Self { name, service_type }
    }
}

impl ServiceClientFactory for StandardService {
    fn default_service_name(&self) -> Option<&str> {
        Some(self.name)
    }

    fn service_type(&self) -> Option<&str> {
        Some(self.service_type)
    }

    fn construct(&self, settings: ClientSettings) -> Result<Arc<dyn ServiceClient>> {
        Ok(Arc::new(StandardClient { settings }))
    }
}

pub const AUTH: StandardService = StandardService::new("auth", "fleet.api.AuthService");
pub const DIRECTORY: StandardService =
    StandardService::new("directory", "fleet.api.DirectoryService");
pub const ESTOP: StandardService = StandardService::new("estop", "fleet.api.EstopService");
pub const IMAGE: StandardService = StandardService::new("image", "fleet.api.ImageService");
pub const LEASE: StandardService = StandardService::new("lease", "fleet.api.LeaseService");
pub const LOG_ANNOTATION: StandardService =
    StandardService::new("log-annotation", "fleet.api.LogAnnotationService");
pub const PAYLOAD: StandardService = StandardService::new("payload", "fleet.api.PayloadService");
pub const POWER: StandardService = StandardService::new("power", "fleet.api.PowerService");
pub const ROBOT_COMMAND: StandardService =
    StandardService::new("robot-command", "fleet.api.RobotCommandService");
pub const ROBOT_ID: StandardService = StandardService::new("robot-id", "fleet.api.RobotIdService");
pub const ROBOT_STATE: StandardService =
    StandardService::new("robot-state", "fleet.api.RobotStateService");
pub const SPOT_CHECK: StandardService =
    StandardService::new("spot-check", "fleet.api.SpotCheckService");
pub const TIME_SYNC: StandardService = StandardService::new("time-sync", "fleet.api.TimeSyncService");

/// Services registered by [`SdkBuilder`](crate::SdkBuilder) unless extended.
pub const DEFAULT_SERVICES: [StandardService; 13] = [
    AUTH,
    DIRECTORY,
    ESTOP,
    IMAGE,
    LEASE,
    LOG_ANNOTATION,
    PAYLOAD,
    POWER,
    ROBOT_COMMAND,
    ROBOT_ID,
    ROBOT_STATE,
    SPOT_CHECK,
    TIME_SYNC,
];

/// The default services as registrable factories.
pub fn default_service_factories() -> Vec<Arc<dyn ServiceClientFactory>> {
    DEFAULT_SERVICES
        .iter()
        .map(|s| Arc::new(*s) as Arc<dyn ServiceClientFactory>)
        .collect()
}

/// Client handle for a built-in service on one device.
#[derive(Debug)]
pub struct StandardClient {
    settings: ClientSettings,
}

impl StandardClient {
    pub fn address(&self) -> &str {
        &self.settings.address
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    /// A request header with the device's interceptors applied.
    pub fn request_header(&self) -> RequestHeader {
        self.settings.request_header()
    }
}

impl ServiceClient for StandardClient {
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
