use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Pick the crate log level from the CLI verbosity flags.
pub fn level_from_flags(verbose: bool, debug: bool) -> tracing::Level {
    if debug {
        tracing::Level::DEBUG
    } else if verbose {
        tracing::Level::INFO
    } else {
        tracing::Level::WARN
    }
}

/// Install a compact stderr subscriber. `RUST_LOG` directives are honored on top of `level`.
/// HTTP stack crates stay at `warn` so debug runs are not flooded.
pub fn init(level: tracing::Level) -> Result<()> {
    let filter = EnvFilter::from_default_env()
        .add_directive(format!("dir_scan_rs={level}").parse()?)
        .add_directive("reqwest=warn".parse()?)
        .add_directive("hyper_util=warn".parse()?)
        .add_directive(level.into());

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_wins_over_verbose() {
        assert_eq!(level_from_flags(true, true), tracing::Level::DEBUG);
        assert_eq!(level_from_flags(true, false), tracing::Level::INFO);
        assert_eq!(level_from_flags(false, false), tracing::Level::WARN);
    }
}
