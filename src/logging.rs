use tracing_subscriber::EnvFilter;

/// Install the global `fmt` subscriber. `RUST_LOG` wins over `default_filter`.
///
/// `.env` is loaded first so a `RUST_LOG` set there takes effect.
/// Returns an error if a global subscriber is already set.
pub fn init_logging(default_filter: &str) -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let env_filter = env_filter(|name| std::env::var(name).ok(), default_filter);
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))
}

/// Filter from `RUST_LOG` as seen through `lookup`, else `default_filter`.
pub fn env_filter<F>(lookup: F, default_filter: &str) -> EnvFilter
where
    F: Fn(&str) -> Option<String>,
{
    lookup(EnvFilter::DEFAULT_ENV)
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(default_filter))
}
