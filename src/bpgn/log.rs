use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter, e.g. `BPGN_LOG=debug`.
pub const LOG_ENV: &str = "BPGN_LOG";

const DEFAULT_FILTER: &str = "warn";

fn filter_from(raw: Option<&str>) -> EnvFilter {
    raw.and_then(|s| EnvFilter::try_new(s.trim()).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER))
}

/// Install the stderr subscriber. Calling it more than once is harmless.
pub fn init() {
    let raw = std::env::var(LOG_ENV).ok();
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter_from(raw.as_deref()))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::level_filters::LevelFilter;

    #[test]
    fn test_filter_defaults_to_warn() {
        assert_eq!(filter_from(None).max_level_hint(), Some(LevelFilter::WARN));
    }

    #[test]
    fn test_filter_uses_given_directive() {
        assert_eq!(
            filter_from(Some(" debug ")).max_level_hint(),
            Some(LevelFilter::DEBUG)
        );
    }

    #[test]
    fn test_filter_falls_back_on_unknown_level() {
        assert_eq!(
            filter_from(Some("bughouse_pgn=loud")).max_level_hint(),
            Some(LevelFilter::WARN)
        );
    }

    #[test]
    fn test_init_twice_is_harmless() {
        init();
        init();
    }
}
