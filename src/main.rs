use std::path::PathBuf;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use convo_cli::cli::{self, args::{Cli, Commands, ConfigAction, ThreadAction}};
use convo_cli::config::settings::Settings;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config_path = cli.runtime.config.as_ref().map(PathBuf::from);
    let mut settings = Settings::load(config_path.as_deref())?;

    match &cli.command {
        Some(Commands::Interactive) => {
            cli::commands::handle_interactive(&settings, &cli.runtime, &cli.io).await?
        }
        Some(Commands::Chat { prompt }) => {
            let prompt = if !prompt.is_empty() {
                Some(prompt.join(" "))
            } else {
                None
            };
            cli::commands::handle_chat(&settings, prompt, &cli.runtime, &cli.io).await?
        }
        Some(Commands::History { name }) => {
            cli::commands::handle_history(&settings, &cli.runtime, &cli.io, name.as_deref()).await?
        }
        Some(Commands::Thread { action }) => match action {
            ThreadAction::List => cli::commands::handle_thread_list(&settings, &cli.runtime).await?,
            ThreadAction::Delete { name } => {
                cli::commands::handle_thread_delete(&settings, name).await?
            }
        },
        Some(Commands::Config { action }) => match action {
            ConfigAction::Init { force, scope } => {
                cli::commands::handle_config_init(*force, scope.as_deref()).await?
            }
            ConfigAction::List => cli::commands::handle_config_list(&settings).await?,
            ConfigAction::Set { key, value } => {
                cli::commands::handle_config_set(&mut settings, key, value, config_path.as_deref()).await?
            }
        },
        None => {
            if !cli.prompt.is_empty() || cli.io.input_file.is_some() {
                let prompt = Some(cli.prompt.join(" "));
                cli::commands::handle_chat(&settings, prompt, &cli.runtime, &cli.io).await?
            } else {
                // No command and no prompt: show help
                Cli::command().print_help()?;
                println!();
            }
        }
    }

    Ok(())
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();
}
