pub mod cache;
pub mod events;
pub mod health;
pub mod registrations;
