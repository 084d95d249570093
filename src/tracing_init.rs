//! Tracing setup for the decode binaries and tests.

/// Initialise tracing with environment-based filtering.
///
/// `RUST_LOG` controls output as usual, for example
/// `RUST_LOG=rustyspot=debug` or `RUST_LOG=rustyspot::window=trace`.
/// Defaults to `rustyspot=info`. Events go to stderr so decoded spot
/// lines on stdout stay machine-readable.
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("rustyspot=info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

/// Initialise tracing for tests; safe to call from every test.
#[cfg(test)]
pub fn init_test_tracing() {
    use once_cell::sync::Lazy;

    static TRACING: Lazy<()> = Lazy::new(|| {
        use tracing_subscriber::{fmt, EnvFilter};

        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("rustyspot=warn"));

        fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_test_writer()
            .init();
    });

    Lazy::force(&TRACING);
}
