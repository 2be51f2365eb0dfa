//! Logging initialisation.

use crate::args::LogArgs;
use eyre::{Result, WrapErr};
use tracing_subscriber::EnvFilter;

/// Builds the log filter from command line arguments.
///
/// The filter is built with the following precedence:
/// 1. If `--quiet` is set, only errors are shown
/// 2. Otherwise `RUST_LOG` if set, or the level selected by `-v` flags
/// 3. Directives from `--log.filter` are added on top
pub fn build_filter(args: &LogArgs) -> Result<EnvFilter> {
    let mut filter = if args.quiet {
        EnvFilter::new(args.level())
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(args.level()))
    };

    if let Some(custom_filter) = &args.filter {
        for directive in custom_filter.split(',').filter(|d| !d.trim().is_empty()) {
            let directive = directive
                .trim()
                .parse()
                .wrap_err_with(|| format!("invalid log directive: {directive}"))?;
            filter = filter.add_directive(directive);
        }
    }

    Ok(filter)
}

/// Installs the global tracing subscriber. Logs go to stderr so command
/// output on stdout stays pipeable.
pub fn init_logging(args: &LogArgs) -> Result<()> {
    let filter = build_filter(args)?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(args.verbosity > 1);

    let installed = if args.json {
        builder.json().try_init()
    } else {
        builder.without_time().try_init()
    };
    installed.map_err(|e| eyre::eyre!(e)).wrap_err("failed to initialise logging")
}
