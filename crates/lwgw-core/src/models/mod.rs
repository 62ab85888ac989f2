//! Data model shared by the gateway crates

pub mod association;
pub mod attribute;
pub mod device;
pub mod event;
pub mod security;
pub mod session;

pub use association::{AssociationRecord, AssociationState, NorthboundIdentity};
pub use attribute::{
    AttributeDescriptor, AttributeKind, FirmwareRole, Operations, FIRMWARE_UPDATE_PREFIX,
    OPERATIONS_METADATA, PATH_METADATA,
};
pub use device::{
    Device, PskPair, CLIENT_ENDPOINT_LABEL, PSK_IDENTITY_PATH, PSK_IDENTITY_VALUE_TYPE,
    PSK_KEY_PATH, PSK_VALUE_TYPE,
};
pub use event::{CommandPayload, EventKind, EventMeta, NorthboundEvent, ResourceContent};
pub use security::SecurityInfo;
pub use session::{Observation, SessionHandle};
