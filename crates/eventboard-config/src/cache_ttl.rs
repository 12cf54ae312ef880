//! Per-route response cache lifetimes for the events API.

use std::env;
use std::time::Duration;

/// How long each events endpoint stays cached.
///
/// # Environment Variables
///
/// - `CACHE_TTL_EVENTS_SEARCH`: `GET /api/events/search` (default: `60`)
/// - `CACHE_TTL_EVENTS_LIST`: `GET /api/events` (default: `120`)
/// - `CACHE_TTL_EVENTS_DETAIL`: `GET /api/events/{id}` and below (default: `300`)
///
/// A value of `0` disables caching for that route.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EventCacheTtls {
    pub search_secs: u64,
    pub list_secs: u64,
    pub detail_secs: u64,
}

impl Default for EventCacheTtls {
    fn default() -> Self {
        Self {
            search_secs: 60,
            list_secs: 120,
            detail_secs: 300,
        }
    }
}

impl EventCacheTtls {
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            search_secs: secs_from_env("CACHE_TTL_EVENTS_SEARCH", defaults.search_secs),
            list_secs: secs_from_env("CACHE_TTL_EVENTS_LIST", defaults.list_secs),
            detail_secs: secs_from_env("CACHE_TTL_EVENTS_DETAIL", defaults.detail_secs),
        }
    }

    pub fn search(&self) -> Duration {
        Duration::from_secs(self.search_secs)
    }

    pub fn list(&self) -> Duration {
        Duration::from_secs(self.list_secs)
    }

    pub fn detail(&self) -> Duration {
        Duration::from_secs(self.detail_secs)
    }
}

fn secs_from_env(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
