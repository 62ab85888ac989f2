//! lwgw-core - Core types and collaborator traits for the LwM2M gateway
//!
//! This crate holds the pieces shared by the association engine, the HTTP
//! collaborators and the daemon: the attribute model parsed from a logical
//! device document, resource paths, association records, and the traits the
//! engine uses to reach the protocol engine, the device directory, the image
//! manager, the credential store and the attribute publisher.

pub mod backend;
pub mod error;
pub mod models;
pub mod path;

pub use backend::{
    AttributePublisher, CredentialStore, DeviceDirectory, ImageRepository, ProtocolEngine,
    TokenProvider,
};
pub use error::{DeviceError, ErrorCategory, GatewayError, GatewayResult};
pub use models::*;
pub use path::{PathError, ResourcePath};

// Re-export the wire value types used across trait signatures
pub use lwgw_conv::{TaggedValue, WireValue};
