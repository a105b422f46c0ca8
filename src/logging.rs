// Logging setup
// tracing to stderr so stdout stays clean for command output
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "melodeck=info,warn";

/// Install the global subscriber. `RUST_LOG` overrides the default filter;
/// `verbose` raises melodeck's own level to debug.
pub fn init_logging(verbose: bool) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("melodeck=debug,warn")
        } else {
            EnvFilter::new(DEFAULT_FILTER)
        }
    });

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact();

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}
