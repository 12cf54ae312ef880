use crate::modules::cache::service::CacheService;
use crate::modules::events::service::EventService;
use crate::state::AppState;
use crate::validator::ValidatedJson;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use eventboard_core::{AppError, PaginationMeta};
use eventboard_models::{
    CreateEventDto, Event, EventFilterParams, EventSearchParams, PaginatedEventsResponse,
    UpdateEventDto,
};
use eventboard_observability::track_event_mutation;
use tracing::{info, instrument};
use uuid::Uuid;

#[instrument(skip(state))]
pub async fn list_events(
    State(state): State<AppState>,
    Query(params): Query<EventFilterParams>,
) -> Result<Json<PaginatedEventsResponse>, AppError> {
    let (events, total) = EventService::list_events(&state.db, &params).await?;

    Ok(Json(PaginatedEventsResponse {
        data: events,
        meta: PaginationMeta::new(total, &params.pagination),
    }))
}

#[instrument(skip(state))]
pub async fn search_events(
    State(state): State<AppState>,
    Query(params): Query<EventSearchParams>,
) -> Result<Json<PaginatedEventsResponse>, AppError> {
    let (events, total) = EventService::search_events(&state.db, &params).await?;

    Ok(Json(PaginatedEventsResponse {
        data: events,
        meta: PaginationMeta::new(total, &params.pagination),
    }))
}

#[instrument(skip(state))]
pub async fn get_event(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Event>, AppError> {
    let event = EventService::get_event(&state.db, id).await?;
    Ok(Json(event))
}

#[instrument(skip(state, dto))]
pub async fn create_event(
    State(state): State<AppState>,
    ValidatedJson(dto): ValidatedJson<CreateEventDto>,
) -> Result<(StatusCode, Json<Event>), AppError> {
    let event = EventService::create_event(&state.db, dto).await?;

    CacheService::invalidate_events(&state.cache).await;
    track_event_mutation("create");
    info!(event.id = %event.id, "Event created");

    Ok((StatusCode::CREATED, Json(event)))
}

#[instrument(skip(state, dto))]
pub async fn update_event(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<UpdateEventDto>,
) -> Result<Json<Event>, AppError> {
    let event = EventService::update_event(&state.db, id, dto).await?;

    CacheService::invalidate_events(&state.cache).await;
    track_event_mutation("update");

    Ok(Json(event))
}

#[instrument(skip(state))]
pub async fn delete_event(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    EventService::delete_event(&state.db, id).await?;

    CacheService::invalidate_events(&state.cache).await;
    track_event_mutation("delete");
    info!(event.id = %id, "Event deleted");

    Ok(StatusCode::NO_CONTENT)
}
