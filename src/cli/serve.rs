//! `better-bible serve`: run the HTTP server.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::{debug, info, warn};

use better_bible::api::{start_server, AppState};
use better_bible::cache::ContentStore;
use better_bible::config::Config;
use better_bible::health::{HealthCheck, HealthRegistry, HealthStatus};

use super::common::build_pipeline;

const CACHE_CHECK: &str = "cache";

pub(crate) async fn cmd_serve(
    mut config: Config,
    bind: Option<String>,
    port: Option<u16>,
    public_dir: Option<PathBuf>,
) -> Result<()> {
    if let Some(bind) = bind {
        config.server.bind = bind;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    if let Some(dir) = public_dir {
        config.server.public_dir = dir;
    }

    let pipeline = build_pipeline(&config).await?;

    let health = Arc::new(HealthRegistry::new());
    health.register(HealthCheck::new(
        "provider",
        HealthStatus::Ok,
        Some(format!(
            "{} ({})",
            pipeline.provider.name(),
            pipeline.provider.default_model()
        )),
    ));
    let cache_status = if pipeline.store.backend() == config.cache.backend.as_str() {
        HealthStatus::Ok
    } else {
        HealthStatus::Degraded
    };
    health.register(HealthCheck::new(
        CACHE_CHECK,
        cache_status,
        Some(pipeline.store.backend().to_string()),
    ));

    if config.cache.sweep_interval_secs > 0 {
        spawn_sweeper(
            pipeline.store.clone(),
            health.clone(),
            cache_status,
            config.cache.max_age(),
            Duration::from_secs(config.cache.sweep_interval_secs),
        );
    }

    println!("Better Bible: http://{}", config.listen_addr());
    println!("Press Ctrl+C to stop.");

    let state = AppState::new(
        pipeline.generator,
        config.server.public_dir.clone(),
        health,
        pipeline.metrics,
    );
    start_server(&config.server, state)
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {e}"))?;
    Ok(())
}

/// Periodically remove entries older than `max_age`.
fn spawn_sweeper(
    store: Arc<dyn ContentStore>,
    health: Arc<HealthRegistry>,
    healthy: HealthStatus,
    max_age: chrono::Duration,
    every: Duration,
) {
    info!(
        interval_secs = every.as_secs(),
        max_age_days = max_age.num_days(),
        "Content cache sweep enabled"
    );
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        // The first tick fires immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            sweep_once(store.as_ref(), &health, healthy, max_age).await;
        }
    });
}

/// One sweep pass. A failure marks the cache check degraded until the next
/// successful pass restores `healthy`.
async fn sweep_once(
    store: &dyn ContentStore,
    health: &HealthRegistry,
    healthy: HealthStatus,
    max_age: chrono::Duration,
) {
    let backend = store.backend().to_string();
    match store.purge_older_than(max_age).await {
        Ok(removed) => {
            if removed == 0 {
                debug!("Cache sweep found nothing to remove");
            } else {
                info!(removed, "Cache sweep removed stale entries");
            }
            health.update(CACHE_CHECK, healthy, Some(backend));
        }
        Err(e) => {
            warn!(error = %e, "Cache sweep failed");
            health.update(
                CACHE_CHECK,
                HealthStatus::Degraded,
                Some(format!("{}: sweep failed: {}", backend, e)),
            );
        }
    }
}
