use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is unset: this crate at info, or at debug on top of info for
/// everything else when verbose.
fn default_directives(verbose: bool) -> String {
    let target = env!("CARGO_PKG_NAME");
    if verbose {
        format!("{}=debug,info", target)
    } else {
        format!("{}=info", target)
    }
}

fn env_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives(verbose)))
}

/// Compact human readable log lines on stderr, leaving stdout to command output.
pub fn init_cli_logger(verbose: bool) {
    tracing_subscriber::registry()
        .with(env_filter(verbose))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr)
                .compact(),
        )
        .init();
}

/// One JSON object per line on stderr, for CI log collectors.
pub fn init_json_logger() {
    tracing_subscriber::registry()
        .with(env_filter(false))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .json(),
        )
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directives_target_this_crate() {
        assert_eq!(default_directives(false), "sapper=info");
        assert_eq!(default_directives(true), "sapper=debug,info");
    }
}
