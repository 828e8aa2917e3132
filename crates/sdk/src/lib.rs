//! `fleet-sdk`: settings and registry layer of the robot fleet client SDK.
//!
//! An [`SdkContext`] holds what is common to a developer or a fleet: the app
//! token, the trust certificate bundle, the registry of service client
//! factories, and the request interceptor chain.  Robots are reached through
//! [`DeviceHandle`]s, created once per address from a snapshot of that state.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  let sdk = SdkBuilder::new("fleet-ops-").build()?;           │
//! │  sdk.load_credential("~/.fleet/app_token")?;                 │
//! │                                                              │
//! │  SdkContext                                                  │
//! │   ├── AppToken           (claims decoded, never verified)    │
//! │   ├── CertificateBundle  (packaged PEM or glob concat)       │
//! │   ├── ServiceRegistry    (name → type → factory)             │
//! │   ├── interceptors       (run in append order)               │
//! │   └── devices            (address → Arc<DeviceHandle>)       │
//! │                                                              │
//! │  let robot = sdk.create_device("192.168.80.3", None)?;       │
//! │  let lease = robot.ensure_client("lease")?;                  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Snapshot rule
//!
//! A device keeps the registry, credential, certificate and interceptors
//! that were current when it was first created.  Later changes to the
//! context only affect devices created afterwards.

pub mod builder;
pub mod certs;
pub mod context;
pub mod credential;
pub mod device;
pub mod interceptor;
pub mod naming;
pub mod registry;
pub mod services;

// ── Re-exports for ergonomic imports ─────────────────────────────────

pub use builder::{create_standard_sdk, SdkBuilder};
pub use certs::{BundleSource, CertificateBundle};
pub use context::SdkContext;
pub use credential::{check_expiry, decode_claims_unverified, load_credential, AppToken, TokenExpiry};
pub use device::{DeviceHandle, SdkSnapshot};
pub use interceptor::{AddRequestHeader, RequestHeader, RequestInterceptor};
pub use naming::generate_client_name;
pub use registry::{
    ClientSettings, ServiceClient, ServiceClientFactory, ServiceRegistration, ServiceRegistry,
};
pub use services::{StandardClient, StandardService, DEFAULT_SERVICES};

pub use fleet_domain::config::SdkConfig;
pub use fleet_domain::error::{Error, Result};
