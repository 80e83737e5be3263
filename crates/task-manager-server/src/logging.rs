//! Tracing subscriber setup.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::Environment;

/// Filter used when `RUST_LOG` is not set.
pub fn default_directive(env: Environment) -> &'static str {
    match env {
        Environment::Prod => "info",
        Environment::Dev | Environment::Local => "debug",
    }
}

/// Install the global subscriber.
///
/// `prod` logs JSON lines, `dev` a compact human format and `local` the
/// default format. `RUST_LOG` overrides the level in every environment.
pub fn init_tracing(env: Environment) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(env)));
    let registry = tracing_subscriber::registry().with(filter);

    match env {
        Environment::Prod => registry
            .with(fmt::layer().json().with_current_span(false))
            .try_init()?,
        Environment::Dev => registry.with(fmt::layer().compact()).try_init()?,
        Environment::Local => registry.with(fmt::layer()).try_init()?,
    }
    Ok(())
}
