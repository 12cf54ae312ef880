use crate::modules::cache::service::CacheService;
use crate::modules::registrations::service::{RegistrationOutcome, RegistrationService};
use crate::state::AppState;
use crate::validator::ValidatedJson;
use axum::{
    Json,
    extract::{Path, State},
    http::{StatusCode, header},
};
use eventboard_core::AppError;
use eventboard_models::{CreateRegistrationDto, Registration};
use eventboard_observability::track_registration;
use tracing::instrument;
use uuid::Uuid;

/// Answers 201 for a new registration and 200 when the email was already
/// registered, so a replayed submission is harmless.
#[instrument(skip(state, dto))]
pub async fn create_registration(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<CreateRegistrationDto>,
) -> Result<(StatusCode, Json<Registration>), AppError> {
    let outcome = match RegistrationService::register(&state.db, event_id, dto).await {
        Ok(outcome) => outcome,
        Err(e) => {
            if e.status == StatusCode::CONFLICT {
                track_registration("rejected");
            }
            return Err(e);
        }
    };

    let status = match &outcome {
        RegistrationOutcome::Created(_) => {
            CacheService::invalidate_events(&state.cache).await;
            track_registration("created");
            StatusCode::CREATED
        }
        RegistrationOutcome::Existing(_) => {
            track_registration("existing");
            StatusCode::OK
        }
    };

    Ok((status, Json(outcome.into_inner())))
}

/// Attendee lists carry email addresses and are never stored by shared caches.
#[instrument(skip(state))]
pub async fn list_registrations(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
) -> Result<([(header::HeaderName, &'static str); 1], Json<Vec<Registration>>), AppError> {
    let registrations = RegistrationService::list_registrations(&state.db, event_id).await?;
    Ok((
        [(header::CACHE_CONTROL, "private, no-store")],
        Json(registrations),
    ))
}
