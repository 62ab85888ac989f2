//! lwgw-gateway - The association engine of the LwM2M gateway
//!
//! [`GatewayEngine`] receives northbound lifecycle/command events and
//! southbound registration/observation callbacks, keeps the endpoint
//! associations in an [`AssociationRegistry`], provisions pre-shared keys
//! through a [`SecurityProvisioner`] and drives firmware updates with the
//! [`FirmwareUpdateOrchestrator`].
//!
//! All external systems are reached through the traits in `lwgw-core`.

pub mod engine;
pub mod firmware;
pub mod registry;
pub mod security;
pub mod settings;

pub use engine::{Collaborators, GatewayEngine};
pub use firmware::{FirmwareOutcome, FirmwareState, FirmwareUpdateOrchestrator, UpdateResult};
pub use registry::AssociationRegistry;
pub use security::{MemoryCredentialStore, SecurityProvisioner};
pub use settings::GatewaySettings;
