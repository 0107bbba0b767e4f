#[macro_export]
macro_rules! debug {
    ( $arg:expr $( , $extra:expr )* ) => {
        #[cfg(feature = "telemetry")]
        tracing::debug!($arg $( , $extra )*);
    };
}

pub use debug;

#[macro_export]
macro_rules! info {
    ( $arg:expr $( , $extra:expr )* ) => {
        #[cfg(feature = "telemetry")]
        tracing::info!($arg $( , $extra )*);
    };
}

pub use info;

#[macro_export]
macro_rules! error {
    ( $arg:expr $( , $extra:expr )* ) => {
        #[cfg(feature = "telemetry")]
        tracing::error!($arg $( , $extra )*);
    };
}

pub use error;

/// Installs the global subscriber. `RUST_LOG` overrides the default `info`
/// level.
#[cfg(feature = "telemetry")]
pub fn init() {
    use tracing_subscriber::{
        layer::{Layer, SubscriberExt},
        util::SubscriberInitExt,
        EnvFilter,
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_span_events(tracing_subscriber::fmt::format::FmtSpan::CLOSE)
                .with_target(false)
                .with_filter(filter),
        )
        .init();
}

#[cfg(not(feature = "telemetry"))]
pub fn init() {}
