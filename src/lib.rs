//! Kion command-line credential broker.
//!
//! The binary wires [`cli::Cli`] to [`commands`] through a layered
//! [`config::Config`]; the credential lifecycle itself lives in the
//! `kion-client` crate.

pub mod cli;
pub mod commands;
pub mod config;
pub mod output;
pub mod prompt;
pub mod remediation;

use tracing_subscriber::EnvFilter;

use crate::config::Config;

/// Initialise logging to stderr. `RUST_LOG` wins over the config; `verbose`
/// forces debug for this tool's own targets.
pub fn init_tracing(config: &Config, verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = if verbose {
            "debug".to_string()
        } else {
            config.log_level()
        };
        EnvFilter::new(format!("kion={level},kion_client={level},warn"))
    });

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    if config.log_json() {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}
