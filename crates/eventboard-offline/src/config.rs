//! Offline controller configuration.

use std::env;
use url::Url;

use crate::error::OfflineError;

const DEFAULT_PRECACHE_MANIFEST: &[&str] = &[
    "/",
    "/index.html",
    "/offline.html",
    "/manifest.json",
    "/static/css/main.css",
    "/static/js/main.js",
    "/icons/icon-192.png",
];

/// Offline controller configuration.
///
/// # Environment Variables
///
/// - `OFFLINE_ORIGIN`: Origin the controller serves (default: `http://localhost:3000`)
/// - `OFFLINE_CACHE_NAME`: Bucket name stem (default: `eventboard`)
/// - `OFFLINE_CACHE_VERSION`: Deployment version baked into bucket names (default: `v1`)
/// - `OFFLINE_API_PREFIX`: Path prefix of network-first routes (default: `/api/`)
/// - `OFFLINE_DOCUMENT`: Page served to navigations while offline (default: `/offline.html`)
/// - `OFFLINE_PRECACHE`: Comma-separated precache manifest
/// - `OFFLINE_SYNC_TAG`: Background sync tag (default: `sync-pending-actions`)
/// - `OFFLINE_STORE_URL`: SQLite database for buckets and the action queue
///   (default: `sqlite://storage/offline.db`)
#[derive(Clone, Debug)]
pub struct OfflineConfig {
    pub origin: Url,
    pub cache_name: String,
    pub version: String,
    pub api_prefix: String,
    pub offline_document: String,
    pub precache_manifest: Vec<String>,
    pub sync_tag: String,
    pub store_url: String,
}

impl OfflineConfig {
    pub fn new(origin: Url) -> Self {
        Self {
            origin,
            cache_name: "eventboard".into(),
            version: "v1".into(),
            api_prefix: "/api/".into(),
            offline_document: "/offline.html".into(),
            precache_manifest: DEFAULT_PRECACHE_MANIFEST
                .iter()
                .map(|p| p.to_string())
                .collect(),
            sync_tag: "sync-pending-actions".into(),
            store_url: "sqlite://storage/offline.db".into(),
        }
    }

    pub fn from_env() -> Result<Self, OfflineError> {
        let origin =
            env::var("OFFLINE_ORIGIN").unwrap_or_else(|_| "http://localhost:3000".to_string());
        let mut config = Self::new(Url::parse(&origin)?);

        if let Ok(name) = env::var("OFFLINE_CACHE_NAME") {
            config.cache_name = name;
        }
        if let Ok(version) = env::var("OFFLINE_CACHE_VERSION") {
            config.version = version;
        }
        if let Ok(prefix) = env::var("OFFLINE_API_PREFIX") {
            config.api_prefix = prefix;
        }
        if let Ok(document) = env::var("OFFLINE_DOCUMENT") {
            config.offline_document = document;
        }
        if let Ok(manifest) = env::var("OFFLINE_PRECACHE") {
            config.precache_manifest = parse_manifest(&manifest);
        }
        if let Ok(tag) = env::var("OFFLINE_SYNC_TAG") {
            config.sync_tag = tag;
        }
        if let Ok(store_url) = env::var("OFFLINE_STORE_URL") {
            config.store_url = store_url;
        }

        Ok(config)
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_precache(mut self, manifest: &[&str]) -> Self {
        self.precache_manifest = manifest.iter().map(|p| p.to_string()).collect();
        self
    }

    /// Bucket holding the fixed manifest for this version.
    pub fn precache_bucket(&self) -> String {
        format!("{}-precache-{}", self.cache_name, self.version)
    }

    /// Bucket filled by live traffic for this version.
    pub fn runtime_bucket(&self) -> String {
        format!("{}-runtime-{}", self.cache_name, self.version)
    }

    /// Buckets that survive activation, in lookup order.
    pub fn current_buckets(&self) -> [String; 2] {
        [self.precache_bucket(), self.runtime_bucket()]
    }
}

fn parse_manifest(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .map(String::from)
        .collect()
}
