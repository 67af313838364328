//! hostforge-api: Shared wire types and request validation
//!
//! Contains the client request envelope, the engine-to-client event record,
//! and the field-level validators used before any request reaches the engine.

pub mod events;
pub mod requests;
pub mod validate;

pub use events::{StatusPayload, WsEvent};
pub use requests::{ClientRequest, DeployRequest, DhcpConfig, HostData, HostDescriptor};
pub use validate::FieldError;
