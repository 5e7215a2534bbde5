//! Tracing setup for embedders of the schema generator.
//!
//! Schema generation logs through `tracing`; applications that do not install
//! their own subscriber call [`init_tracing`] once at startup. The filter stays
//! adjustable through [`apply_logging_level`].

use std::sync::OnceLock;

use tracing_subscriber::{EnvFilter, fmt, prelude::*, reload};

static FILTER_HANDLE: OnceLock<reload::Handle<EnvFilter, tracing_subscriber::Registry>> =
    OnceLock::new();

/// Installs the global subscriber at `info` (or `RUST_LOG` when set).
pub fn init_tracing() {
    init_tracing_with_level("info");
}

/// Installs the global subscriber.
///
/// `RUST_LOG` takes precedence over `level`. Calling this more than once is a
/// no-op.
pub fn init_tracing_with_level(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let (reload_layer, handle) = reload::Layer::new(filter);
    if FILTER_HANDLE.set(handle).is_err() {
        return;
    }

    let _ = tracing_subscriber::registry()
        .with(reload_layer)
        .with(fmt::layer())
        .try_init();
}

/// Applies a new logging filter at runtime.
///
/// Returns `false` when tracing was never initialized through this module or
/// the filter could not be swapped.
pub fn apply_logging_level(level: &str) -> bool {
    match FILTER_HANDLE.get() {
        Some(handle) => handle
            .modify(|filter| {
                *filter = EnvFilter::new(level);
            })
            .is_ok(),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent_and_reloadable() {
        init_tracing_with_level("warn");
        init_tracing_with_level("debug");
        assert!(apply_logging_level("autoql_graphql=trace"));
        tracing::trace!("trace output after reload");
    }
}
