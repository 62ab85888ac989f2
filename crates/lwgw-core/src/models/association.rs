//! Association records tracked per endpoint

use serde::{Deserialize, Serialize};

use super::session::SessionHandle;

/// Logical identity bound on the northbound side
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NorthboundIdentity {
    pub device_id: String,
    pub tenant: String,
}

/// Derived association state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssociationState {
    Unbound,
    NorthOnly,
    SouthOnly,
    Bound,
}

impl std::fmt::Display for AssociationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AssociationState::Unbound => "unbound",
            AssociationState::NorthOnly => "north_only",
            AssociationState::SouthOnly => "south_only",
            AssociationState::Bound => "bound",
        };
        f.write_str(s)
    }
}

/// Snapshot of one endpoint's association
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssociationRecord {
    pub endpoint: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub northbound: Option<NorthboundIdentity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub southbound: Option<SessionHandle>,
}

impl AssociationRecord {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            northbound: None,
            southbound: None,
        }
    }

    pub fn state(&self) -> AssociationState {
        match (&self.northbound, &self.southbound) {
            (None, None) => AssociationState::Unbound,
            (Some(_), None) => AssociationState::NorthOnly,
            (None, Some(_)) => AssociationState::SouthOnly,
            (Some(_), Some(_)) => AssociationState::Bound,
        }
    }

    pub fn is_bound(&self) -> bool {
        self.state() == AssociationState::Bound
    }

    /// Both sides, when bound
    pub fn bound_pair(&self) -> Option<(&NorthboundIdentity, &SessionHandle)> {
        self.northbound.as_ref().zip(self.southbound.as_ref())
    }
}
