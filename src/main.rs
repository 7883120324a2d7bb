//! kion: temporary AWS credentials and console access through Kion.

use std::process::ExitCode;

use clap::Parser;

use kion::cli::Cli;
use kion::commands::{self, Context};
use kion::config::Config;
use kion::{init_tracing, remediation};

fn main() -> ExitCode {
    let Cli { command, global } = Cli::parse();

    let result = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(anyhow::Error::from)
        .and_then(|runtime| {
            runtime.block_on(async {
                let mut config = Config::load(global.config.as_deref())?;
                global.apply(&mut config);
                command.apply(&mut config);
                init_tracing(&config, global.verbose);

                tracing::debug!(
                    version = env!("CARGO_PKG_VERSION"),
                    overrides = ?config.env_overrides.all().keys().collect::<Vec<_>>(),
                    "Starting kion"
                );
                let ctx = Context::new(config)?;
                commands::run(command, &ctx).await
            })
        });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::debug!(error = ?err, "Command failed");
            eprintln!("error: {}", remediation::message(&err));
            ExitCode::FAILURE
        }
    }
}
