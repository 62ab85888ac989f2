//! Ingress routes
//!
//! The platform's event stream and the protocol engine's callbacks both
//! arrive here as JSON posts and are handed to the [`GatewayEngine`].
//!
//! [`GatewayEngine`]: lwgw_gateway::GatewayEngine

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use lwgw_core::{
    AssociationRecord, GatewayError, NorthboundEvent, Observation, ResourceContent, ResourcePath,
    SessionHandle, TaggedValue, WireValue,
};

use crate::error::ApiError;
use crate::state::AppState;

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(|| async { "OK" }))
        // Platform
        .route("/v1/northbound/events", post(northbound_event))
        // Protocol engine callbacks
        .route("/v1/southbound/registered", post(registered))
        .route("/v1/southbound/updated", post(updated))
        .route("/v1/southbound/unregistered", post(unregistered))
        .route("/v1/southbound/notifications", post(notification))
        .route("/v1/southbound/observation-errors", post(observation_error))
        .route("/v1/southbound/new-observation", post(new_observation))
        .route("/v1/southbound/observation-cancelled", post(observation_cancelled))
        // Introspection
        .route("/v1/associations", get(list_associations))
        .route("/v1/associations/{endpoint}", get(get_association))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct RegistrationEvent {
    pub session: SessionHandle,
    #[serde(default)]
    pub previous: Option<SessionHandle>,
}

#[derive(Debug, Deserialize)]
pub struct UnregistrationEvent {
    pub session: SessionHandle,
    #[serde(default)]
    pub expired: bool,
    #[serde(default)]
    pub replacement: Option<SessionHandle>,
}

#[derive(Debug, Deserialize)]
pub struct NotificationEvent {
    pub path: ResourcePath,
    pub session: SessionHandle,
    /// Absent when the response carried no content
    #[serde(default)]
    pub value: Option<TaggedValue>,
    /// Response was an object, instance or multi-instance node
    #[serde(default)]
    pub multiple: bool,
}

impl NotificationEvent {
    fn content(&self) -> Result<Option<ResourceContent>, GatewayError> {
        if self.multiple {
            return Ok(Some(ResourceContent::Multiple));
        }
        match &self.value {
            Some(tagged) => Ok(Some(ResourceContent::Single(WireValue::from_tagged(tagged)?))),
            None => Ok(None),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ObservationErrorEvent {
    pub path: ResourcePath,
    pub session: SessionHandle,
    pub error: String,
}

#[derive(Debug, Deserialize)]
pub struct NewObservationEvent {
    pub path: ResourcePath,
    pub session: SessionHandle,
}

#[derive(Debug, Deserialize)]
pub struct ObservationCancelledEvent {
    pub path: ResourcePath,
    pub registration_id: String,
}

async fn northbound_event(
    State(state): State<AppState>,
    Json(event): Json<NorthboundEvent>,
) -> Result<StatusCode, ApiError> {
    state.engine().handle_northbound(&event).await?;
    Ok(StatusCode::ACCEPTED)
}

async fn registered(
    State(state): State<AppState>,
    Json(event): Json<RegistrationEvent>,
) -> Result<StatusCode, ApiError> {
    state
        .engine()
        .on_registered(event.session, event.previous)
        .await?;
    Ok(StatusCode::ACCEPTED)
}

async fn updated(
    State(state): State<AppState>,
    Json(event): Json<RegistrationEvent>,
) -> Result<StatusCode, ApiError> {
    state.engine().on_updated(event.session, event.previous).await?;
    Ok(StatusCode::ACCEPTED)
}

async fn unregistered(
    State(state): State<AppState>,
    Json(event): Json<UnregistrationEvent>,
) -> Result<StatusCode, ApiError> {
    state
        .engine()
        .on_unregistered(event.session, event.expired, event.replacement)
        .await?;
    Ok(StatusCode::ACCEPTED)
}

async fn notification(
    State(state): State<AppState>,
    Json(event): Json<NotificationEvent>,
) -> Result<StatusCode, ApiError> {
    let content = event.content().inspect_err(GatewayError::report)?;
    let observation = Observation {
        registration_id: event.session.registration_id.clone(),
        path: event.path,
    };
    state
        .engine()
        .on_notification(&observation, &event.session, content)
        .await?;
    Ok(StatusCode::ACCEPTED)
}

async fn observation_error(
    State(state): State<AppState>,
    Json(event): Json<ObservationErrorEvent>,
) -> StatusCode {
    let observation = Observation {
        registration_id: event.session.registration_id.clone(),
        path: event.path,
    };
    state
        .engine()
        .on_observation_error(&observation, &event.session, &event.error);
    StatusCode::ACCEPTED
}

async fn new_observation(
    State(state): State<AppState>,
    Json(event): Json<NewObservationEvent>,
) -> StatusCode {
    let observation = Observation {
        registration_id: event.session.registration_id.clone(),
        path: event.path,
    };
    state.engine().on_new_observation(&observation, &event.session);
    StatusCode::ACCEPTED
}

async fn observation_cancelled(
    State(state): State<AppState>,
    Json(event): Json<ObservationCancelledEvent>,
) -> StatusCode {
    let observation = Observation {
        registration_id: event.registration_id,
        path: event.path,
    };
    state.engine().on_observation_cancelled(&observation);
    StatusCode::ACCEPTED
}

#[derive(Debug, serde::Serialize)]
pub struct AssociationView {
    #[serde(flatten)]
    pub record: AssociationRecord,
    pub state: lwgw_core::AssociationState,
}

impl From<AssociationRecord> for AssociationView {
    fn from(record: AssociationRecord) -> Self {
        let state = record.state();
        Self { record, state }
    }
}

async fn list_associations(State(state): State<AppState>) -> Json<Vec<AssociationView>> {
    let records = state.engine().registry().snapshot_all();
    Json(records.into_iter().map(AssociationView::from).collect())
}

async fn get_association(
    State(state): State<AppState>,
    Path(endpoint): Path<String>,
) -> Result<Json<AssociationView>, ApiError> {
    state
        .engine()
        .registry()
        .lookup(&endpoint)
        .map(|record| Json(record.into()))
        .ok_or_else(|| ApiError::NotFound(format!("no association for endpoint {}", endpoint)))
}
