//! Tracing subscriber setup for perch applications.
//!
//! Installs a formatted layer with file names, line numbers, levels and span-close
//! events. The level defaults to `DEBUG` and can be changed before initialization.

use std::sync::{PoisonError, RwLock};

use tracing_subscriber::{
    Layer, fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt,
};

pub use tracing::level_filters::LevelFilter;

static TRACING_LEVEL: RwLock<LevelFilter> = RwLock::new(LevelFilter::DEBUG);

/// Sets the level used by the next [`init_tracing`] call.
pub fn set_tracing_level(level: LevelFilter) {
    *TRACING_LEVEL.write().unwrap_or_else(PoisonError::into_inner) = level;
}

pub fn tracing_level() -> LevelFilter {
    *TRACING_LEVEL.read().unwrap_or_else(PoisonError::into_inner)
}

/// Initializes the global tracing subscriber. Does nothing if one is already set.
pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_span_events(FmtSpan::CLOSE)
                .with_file(true)
                .with_line_number(true)
                .with_level(true)
                .with_filter(tracing_level()),
        )
        .try_init();
}
