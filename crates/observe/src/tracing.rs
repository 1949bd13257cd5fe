use {
    std::sync::Once,
    tracing::level_filters::LevelFilter,
    tracing_subscriber::{EnvFilter, fmt::time::UtcTime},
};

/// Initializes the tracing setup shared by the tests. Can be called multiple
/// times in a row; later calls are ignored.
///
/// `env_filter` has similar syntax to env_logger. It is documented at
/// https://docs.rs/tracing-subscriber/0.3.19/tracing_subscriber/filter/struct.EnvFilter.html
pub fn initialize_reentrant(env_filter: &str) {
    // The tracing subscriber below is global object so initializing it again
    // in the same process by a different thread would fail.
    static ONCE: Once = Once::new();
    ONCE.call_once(|| set_tracing_subscriber(env_filter));
}

fn set_tracing_subscriber(env_filter: &str) {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .parse_lossy(env_filter);

    let result = tracing_subscriber::fmt()
        .with_timer(UtcTime::rfc_3339())
        .with_ansi(atty::is(atty::Stream::Stdout))
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();

    if let Err(err) = result {
        // Another subscriber was installed first (e.g. by a test harness).
        tracing::debug!(?err, "tracing subscriber already initialized");
    }
}
