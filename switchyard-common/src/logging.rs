use std::str::FromStr;

use tracing::metadata::LevelFilter;
use tracing_subscriber::{
    Layer, filter::FilterFn, prelude::__tracing_subscriber_SubscriberExt, util::SubscriberInitExt,
};

#[macro_export]
macro_rules! log {
    ($level:expr, $span:expr, $($msg:expr),*) => {{
        let span = $crate::tracing::span!($level, $span);
        let _enter = span.enter();

        $crate::tracing::event!($level, $($msg),*)
    }};
}

/// Events about a message being handed to, or rejected by, a channel.
#[macro_export]
macro_rules! dispatch {
    (level = $level:ident, $($msg:expr),*) => {
        $crate::log!($crate::tracing::Level::$level, "dispatch", $($msg),*)
    };

    ($($msg:expr),*) => {
        $crate::dispatch!(level = TRACE, $($msg),*)
    };
}

/// Events about channel plumbing: construction, resolution, connection state.
#[macro_export]
macro_rules! internal {
    (level = $level:ident, $($msg:expr),*) => {
        $crate::log!($crate::tracing::Level::$level, "internal", $($msg),*)
    };

    ($($msg:expr),*) => {
        $crate::internal!(level = TRACE, $($msg),*)
    };
}

fn level() -> LevelFilter {
    let default = if cfg!(debug_assertions) {
        LevelFilter::TRACE
    } else {
        LevelFilter::INFO
    };

    std::env::var("LOG_LEVEL").map_or(default, |level| {
        LevelFilter::from_str(level.as_str()).unwrap_or_else(|_| {
            eprintln!("Invalid log level specified {level}, defaulting to {default}");
            default
        })
    })
}

fn layer<S>() -> impl Layer<S>
where
    S: tracing::Subscriber + for<'span> tracing_subscriber::registry::LookupSpan<'span>,
{
    tracing_subscriber::fmt::layer()
        .with_file(false)
        .with_line_number(false)
        .compact()
        .with_ansi(true)
        .with_timer(tracing_subscriber::fmt::time::ChronoUtc::rfc_3339())
        .with_filter(level())
        .with_filter(FilterFn::new(|metadata| {
            metadata.target().starts_with("switchyard")
        }))
}

/// Install the global subscriber.
///
/// # Panics
/// If a global subscriber has already been installed.
pub fn init() {
    tracing_subscriber::Registry::default().with(layer()).init();
}

/// Install the global subscriber unless one is already present.
///
/// Returns `false` when another subscriber was installed first.
pub fn try_init() -> bool {
    tracing_subscriber::Registry::default()
        .with(layer())
        .try_init()
        .is_ok()
}
