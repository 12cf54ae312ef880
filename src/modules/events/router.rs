use crate::modules::events::controller::{
    create_event, delete_event, get_event, list_events, search_events, update_event,
};
use crate::modules::registrations::router::init_registrations_router;
use crate::state::AppState;
use axum::{
    Router,
    routing::{get, post},
};

pub fn init_events_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_event).get(list_events))
        .route("/search", get(search_events))
        .route(
            "/{id}",
            get(get_event).put(update_event).delete(delete_event),
        )
        .nest("/{id}/registrations", init_registrations_router())
}
