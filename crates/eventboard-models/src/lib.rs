//! # Event Board Models
//!
//! Database rows, request DTOs and response envelopes for the Event Board API.
//!
//! - [`events`]: Community events and their search/list filters
//! - [`registrations`]: Attendee registrations for an event

pub mod events;
pub mod registrations;

pub use events::{
    CreateEventDto, Event, EventFilterParams, EventSearchParams, PaginatedEventsResponse,
    UpdateEventDto,
};
pub use registrations::{CreateRegistrationDto, Registration};
