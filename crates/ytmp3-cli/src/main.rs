mod args;
mod commands;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use ytmp3_core::YtMp3Error;

use args::{Cli, Commands};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let filter = match cli.verbose {
        0 => "ytmp3=warn,ytmp3_core=warn",
        1 => "ytmp3=info,ytmp3_core=info",
        2 => "ytmp3=debug,ytmp3_core=debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).without_time())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    if let Err(err) = run(cli).await {
        eprintln!("Error: {err:#}");
        std::process::exit(exit_code_for(&err));
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.clone();

    match cli.command {
        Some(Commands::Download { ref url, ref options }) => {
            commands::download::run(url, options, config_path.as_deref()).await
        }
        Some(Commands::Batch { ref input, ref options }) => {
            commands::batch::run(input, options, config_path.as_deref()).await
        }
        Some(Commands::Playlist { ref url, ref options }) => {
            commands::playlist::run(url, options, config_path.as_deref()).await
        }
        Some(Commands::Doctor) => commands::doctor::run(config_path.as_deref()).await,
        Some(Commands::Config { init }) => {
            commands::config::run(init, config_path.as_deref()).await
        }
        None => {
            // Bare URL is shorthand for the download command.
            if let Some(url) = cli.url.clone() {
                let options = cli.shorthand_options();
                commands::download::run(&url, &options, config_path.as_deref()).await
            } else {
                use clap::CommandFactory;
                Cli::command().print_help()?;
                println!();
                Ok(())
            }
        }
    }
}

/// Map a failure to its stable exit code; anything that is not part of the
/// documented taxonomy exits 1.
fn exit_code_for(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<YtMp3Error>()
        .map(YtMp3Error::exit_code)
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ytmp3_core::error::{DependencyError, UrlError};

    #[test]
    fn taxonomy_errors_keep_their_exit_codes_through_anyhow() {
        let err = anyhow::Error::new(YtMp3Error::from(UrlError::MissingHost));
        assert_eq!(exit_code_for(&err), 2);

        let err = anyhow::Error::new(YtMp3Error::from(DependencyError::NotFound {
            tool: "ffmpeg",
        }));
        assert_eq!(exit_code_for(&err), 4);

        let err = anyhow::Error::new(YtMp3Error::SizeLimitExceeded { limit_mb: 500 });
        assert_eq!(exit_code_for(&err), 7);
    }

    #[test]
    fn other_errors_exit_one() {
        let err = anyhow::anyhow!("something else entirely");
        assert_eq!(exit_code_for(&err), 1);
    }
}
