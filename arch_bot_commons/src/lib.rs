//! This create houses common for me functions, because some things
//! are just boilerplate and aaAAAAAAAAA

use std::future::Future;

/// Retrying of flaky connections with exponential backoff.
pub mod retry;

/// Extension traits for [`teloxide::Bot`].
pub mod useful_methods;

/// Initialize logging and run the `closure` to completion in an async runtime,
/// returning whatever it returns.
///
/// Logging is enabled by default on level `info` unless overridden
/// by environment variable `RUST_LOG`. This uses the crate
/// [pretty_env_logger][] internally, see its documentation for more details.
///
/// # Panics
///
/// Panics if the tokio runtime could not be built.
///
/// [pretty_env_logger]: https://docs.rs/pretty_env_logger
pub fn start_everything<T>(closure: impl Future<Output = T>) -> T {
    let log_level = std::env::var_os("RUST_LOG")
        .unwrap_or_else(|| std::ffi::OsString::from("info"))
        .into_string()
        .unwrap_or_else(|_| String::from("info"));

    // journald stamps lines by itself.
    let running_as_systemd_service = std::env::var_os("JOURNAL_STREAM").is_some();

    let mut builder = match running_as_systemd_service {
        true => pretty_env_logger::formatted_builder(),
        false => pretty_env_logger::formatted_timed_builder(),
    };

    builder.parse_filters(&log_level);

    if builder.try_init().is_err() {
        log::error!("Tried to init logger twice!");
    }

    log::info!("hi");

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("Could not build the tokio runtime!")
        .block_on(closure)
}
