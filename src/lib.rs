pub mod config;
pub mod auth;
pub mod models;
pub mod db;
pub mod pipeline;
pub mod review; // Draft editing for the review screen
pub mod persister;
pub mod search;
pub mod home; // Records overview for the home/profile header
pub mod session;

use tracing_subscriber::EnvFilter;

/// Install the global `tracing` subscriber.
///
/// `RUST_LOG` wins when set; otherwise `config::default_log_filter()`.
/// Calling it twice is harmless: the second install is ignored.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .try_init();

    tracing::info!("{} core v{}", config::APP_NAME, config::APP_VERSION);
}
