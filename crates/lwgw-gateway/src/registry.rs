//! Association registry - the single source of truth for endpoint bindings
//!
//! One record per endpoint, created lazily by the first bind from either side
//! and removed once both sides are gone. Every transition is one
//! read-modify-write under the registry lock, so concurrent northbound and
//! southbound events for the same endpoint are applied one at a time. The
//! lock is never held across an await point; callers only ever get copies.

use std::collections::HashMap;

use parking_lot::RwLock;
use tracing::debug;

use lwgw_core::{AssociationRecord, AssociationState, NorthboundIdentity, SessionHandle};

#[derive(Debug, Default)]
pub struct AssociationRegistry {
    records: RwLock<HashMap<String, AssociationRecord>>,
}

impl AssociationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set (or overwrite) the northbound identity for an endpoint
    pub fn bind_northbound(&self, endpoint: &str, device_id: &str, tenant: &str) -> AssociationRecord {
        let mut records = self.records.write();
        let record = records
            .entry(endpoint.to_string())
            .or_insert_with(|| AssociationRecord::new(endpoint));
        record.northbound = Some(NorthboundIdentity {
            device_id: device_id.to_string(),
            tenant: tenant.to_string(),
        });
        debug!(endpoint = %endpoint, device_id = %device_id, state = %record.state(), "Bound northbound");
        record.clone()
    }

    /// Set (or refresh) the southbound session for an endpoint
    pub fn bind_southbound(&self, endpoint: &str, session: SessionHandle) -> AssociationRecord {
        let mut records = self.records.write();
        let record = records
            .entry(endpoint.to_string())
            .or_insert_with(|| AssociationRecord::new(endpoint));
        debug!(
            endpoint = %endpoint,
            registration_id = %session.registration_id,
            "Binding southbound"
        );
        record.southbound = Some(session);
        record.clone()
    }

    /// Clear the northbound side, returning the resulting state
    pub fn unbind_northbound(&self, endpoint: &str) -> AssociationState {
        self.update(endpoint, |record| {
            record.northbound = None;
        })
    }

    /// Clear the southbound side, returning the resulting state
    pub fn unbind_southbound(&self, endpoint: &str) -> AssociationState {
        self.update(endpoint, |record| {
            record.southbound = None;
        })
    }

    /// Clear the southbound side only if it still holds `registration_id`.
    ///
    /// Returns the resulting state, or `None` when the registration was
    /// already superseded (or never bound) and nothing changed.
    pub fn unbind_southbound_session(
        &self,
        endpoint: &str,
        registration_id: &str,
    ) -> Option<AssociationState> {
        let held = self
            .records
            .read()
            .get(endpoint)
            .and_then(|r| r.southbound.as_ref())
            .map(|s| s.registration_id.clone());
        if held.as_deref() != Some(registration_id) {
            debug!(
                endpoint = %endpoint,
                registration_id = %registration_id,
                current = ?held,
                "Ignoring unbind for superseded registration"
            );
            return None;
        }

        let mut cleared = false;
        let state = self.update(endpoint, |record| {
            // Re-checked under the write lock
            if record.southbound.as_ref().map(|s| s.registration_id.as_str()) == Some(registration_id) {
                record.southbound = None;
                cleared = true;
            }
        });
        cleared.then_some(state)
    }

    /// Read-only snapshot of an endpoint's record
    pub fn lookup(&self, endpoint: &str) -> Option<AssociationRecord> {
        self.records.read().get(endpoint).cloned()
    }

    pub fn state(&self, endpoint: &str) -> AssociationState {
        self.records
            .read()
            .get(endpoint)
            .map(AssociationRecord::state)
            .unwrap_or(AssociationState::Unbound)
    }

    /// All records, ordered by endpoint
    pub fn snapshot_all(&self) -> Vec<AssociationRecord> {
        let mut all: Vec<_> = self.records.read().values().cloned().collect();
        all.sort_by(|a, b| a.endpoint.cmp(&b.endpoint));
        all
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    fn update(&self, endpoint: &str, apply: impl FnOnce(&mut AssociationRecord)) -> AssociationState {
        let mut records = self.records.write();
        let Some(record) = records.get_mut(endpoint) else {
            return AssociationState::Unbound;
        };
        apply(record);
        let state = record.state();
        if state == AssociationState::Unbound {
            records.remove(endpoint);
            debug!(endpoint = %endpoint, "Association removed");
        }
        state
    }
}
