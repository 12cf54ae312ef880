use crate::modules::registrations::controller::{create_registration, list_registrations};
use crate::state::AppState;
use axum::{Router, routing::post};

/// Mounted under `/api/events/{id}/registrations`.
pub fn init_registrations_router() -> Router<AppState> {
    Router::new().route("/", post(create_registration).get(list_registrations))
}
