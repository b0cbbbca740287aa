#![deny(clippy::all)]

pub mod common;
pub mod config;
pub mod csharp;
pub mod diagnostics;
pub mod emit;
pub mod error;
pub mod generator;
pub mod scene;
pub mod validate;
pub mod walker;

use napi_derive::napi;

// Re-export main types
pub use common::*;
pub use config::GeneratorConfig;
pub use error::{GeneratorError, Result};
pub use generator::{write_sources, NodeGetterGenerator};
pub use scene::SceneMap;

/// Get the version of the native module
#[napi]
pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Check if the native module is available
#[napi]
pub fn is_native_available() -> bool {
    true
}

/// Route `log` output to stderr.
///
/// `filter` uses env_logger syntax (e.g. `"debug"`, `"node_getter_tools=info"`);
/// without one, `RUST_LOG` is honored and defaults to `error`. Returns false
/// when a logger was already installed.
#[napi]
pub fn init_logging(filter: Option<String>) -> bool {
    let env = env_logger::Env::default().default_filter_or("error");
    let mut builder = env_logger::Builder::from_env(env);
    if let Some(filter) = filter {
        builder.parse_filters(&filter);
    }
    builder.try_init().is_ok()
}
