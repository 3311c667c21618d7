//! Component health and usage counters.
//!
//! [`HealthRegistry`] holds named component checks (provider, cache) that
//! drive the `/api/health` response. [`UsageMetrics`] are lock-free counters
//! bumped by the content pipeline.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use serde_json::{json, Map, Value};
use tracing::info;

// ============================================================================
// HealthStatus
// ============================================================================

/// The status of a single named health component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    /// Component is operating normally.
    Ok,
    /// Component is partially degraded but still functional.
    Degraded,
    /// Component is fully unavailable.
    Down,
}

impl HealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Ok => "ok",
            HealthStatus::Degraded => "degraded",
            HealthStatus::Down => "down",
        }
    }
}

// ============================================================================
// HealthCheck
// ============================================================================

/// A named health check entry managed by [`HealthRegistry`].
#[derive(Debug, Clone)]
pub struct HealthCheck {
    /// Unique name for this check (e.g. "provider", "cache").
    pub name: String,
    pub status: HealthStatus,
    /// Optional human-readable status message.
    pub message: Option<String>,
}

impl HealthCheck {
    pub fn new(name: &str, status: HealthStatus, message: Option<String>) -> Self {
        Self {
            name: name.to_string(),
            status,
            message,
        }
    }
}

// ============================================================================
// HealthRegistry
// ============================================================================

/// Registry of named component health checks.
///
/// ```
/// use better_bible::health::{HealthCheck, HealthRegistry, HealthStatus};
/// let registry = HealthRegistry::new();
/// registry.register(HealthCheck::new("cache", HealthStatus::Ok, None));
/// assert!(registry.is_ready());
/// ```
#[derive(Clone)]
pub struct HealthRegistry {
    checks: Arc<RwLock<HashMap<String, HealthCheck>>>,
    start_time: Instant,
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self {
            checks: Arc::new(RwLock::new(HashMap::new())),
            start_time: Instant::now(),
        }
    }

    /// Register a check. Replaces any existing check with the same name.
    pub fn register(&self, check: HealthCheck) {
        if let Ok(mut checks) = self.checks.write() {
            checks.insert(check.name.clone(), check);
        }
    }

    /// Update an existing check. No-op if `name` is not registered.
    pub fn update(&self, name: &str, status: HealthStatus, message: Option<String>) {
        if let Ok(mut checks) = self.checks.write() {
            if let Some(check) = checks.get_mut(name) {
                check.status = status;
                check.message = message;
            }
        }
    }

    /// True when no registered check is [`HealthStatus::Down`]. Empty is ready.
    pub fn is_ready(&self) -> bool {
        self.checks
            .read()
            .map(|checks| checks.values().all(|c| c.status != HealthStatus::Down))
            .unwrap_or(false)
    }

    pub fn all_checks(&self) -> Vec<HealthCheck> {
        self.checks
            .read()
            .map(|checks| checks.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Elapsed time since the registry was created (proxy for process uptime).
    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Health document: status, version, uptime, optional usage, checks.
    pub fn render(&self, usage: Option<&UsageMetrics>) -> Value {
        let mut checks = Map::new();
        for check in self.all_checks() {
            let mut entry = json!({ "status": check.status.as_str() });
            if let Some(msg) = check.message {
                entry["message"] = json!(msg);
            }
            checks.insert(check.name, entry);
        }

        let mut doc = json!({
            "status": if self.is_ready() { "ok" } else { "degraded" },
            "version": env!("CARGO_PKG_VERSION"),
            "uptime_secs": self.uptime().as_secs(),
            "checks": Value::Object(checks),
        });
        if let Some(usage) = usage {
            doc["usage"] = usage.snapshot();
        }
        doc
    }
}

impl Default for HealthRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// UsageMetrics
// ============================================================================

/// Lock-free counters for the content pipeline.
#[derive(Debug, Default)]
pub struct UsageMetrics {
    /// Generation requests that passed validation.
    pub requests: AtomicU64,
    pub cache_hits: AtomicU64,
    pub cache_misses: AtomicU64,
    /// Requests answered with placeholder content after a provider failure.
    pub fallbacks: AtomicU64,
    /// Provider responses with no recoverable JSON object.
    pub degraded_parses: AtomicU64,
    /// Cache reads or writes that failed and were skipped.
    pub persistence_errors: AtomicU64,
    pub input_tokens: AtomicU64,
    pub output_tokens: AtomicU64,
}

impl UsageMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_request(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fallback(&self) {
        self.fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_degraded_parse(&self) {
        self.degraded_parses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_persistence_error(&self) {
        self.persistence_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Record token usage from an LLM response.
    pub fn record_tokens(&self, input: u64, output: u64) {
        self.input_tokens.fetch_add(input, Ordering::Relaxed);
        self.output_tokens.fetch_add(output, Ordering::Relaxed);
    }

    /// Current counters as a JSON object.
    pub fn snapshot(&self) -> Value {
        json!({
            "requests": self.requests.load(Ordering::Relaxed),
            "cache_hits": self.cache_hits.load(Ordering::Relaxed),
            "cache_misses": self.cache_misses.load(Ordering::Relaxed),
            "fallbacks": self.fallbacks.load(Ordering::Relaxed),
            "degraded_parses": self.degraded_parses.load(Ordering::Relaxed),
            "persistence_errors": self.persistence_errors.load(Ordering::Relaxed),
            "input_tokens": self.input_tokens.load(Ordering::Relaxed),
            "output_tokens": self.output_tokens.load(Ordering::Relaxed),
        })
    }

    /// Emit current counters as a structured log line.
    pub fn emit_usage(&self, reason: &str) {
        info!(
            event = "usage_summary",
            reason = reason,
            requests = self.requests.load(Ordering::Relaxed),
            cache_hits = self.cache_hits.load(Ordering::Relaxed),
            cache_misses = self.cache_misses.load(Ordering::Relaxed),
            fallbacks = self.fallbacks.load(Ordering::Relaxed),
            input_tokens = self.input_tokens.load(Ordering::Relaxed),
            output_tokens = self.output_tokens.load(Ordering::Relaxed),
        );
    }
}
