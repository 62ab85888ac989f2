//! lwgw-client - HTTP collaborators for the LwM2M gateway
//!
//! Implementations of the `lwgw-core` collaborator traits on top of reqwest:
//!
//! - [`HttpDeviceDirectory`] - device manager and tenant listing
//! - [`LocalTokenProvider`] - per-tenant bearer tokens
//! - [`HttpImageRepository`] - image manager lookup and download
//! - [`HttpProtocolEngine`] - protocol engine REST bridge
//! - [`HttpAttributePublisher`] - attribute publication

pub mod auth;
pub mod directory;
pub mod engine;
pub mod error;
pub mod http;
pub mod images;
pub mod publisher;
pub mod testing;

pub use auth::LocalTokenProvider;
pub use directory::HttpDeviceDirectory;
pub use engine::HttpProtocolEngine;
pub use error::{ClientError, Result};
pub use http::RestClient;
pub use images::{FileServer, HttpImageRepository, ImageEntry};
pub use publisher::HttpAttributePublisher;
