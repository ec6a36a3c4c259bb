use anyhow::{Context, Result};
use colored::Colorize;

use crate::{
    app::{get_data_dir, load_config, Config, Credentials},
    cli::{handle_command, Cli},
    session::{ChatSession, ResponseMode},
    tui::{run_ui, App},
    utils::init_file_logger,
};

/// Load configuration and apply command-line overrides
///
/// An explicit `--config` file must load; otherwise a broken configuration
/// falls back to defaults with a warning.
pub fn resolve_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => load_config(Some(path.as_path()))
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => match load_config(None) {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("⚠️  Failed to load config: {:#}. Using defaults.", e);
                Config::default()
            }
        },
    };

    if let Some(split) = cli.split_override() {
        config.decomposition.enabled = split;
    }
    if let Some(max_tokens) = cli.max_tokens {
        config.default_model.max_tokens = max_tokens;
    }
    config.validate()?;

    Ok(config)
}

/// Model to use: command line first, then configuration
pub fn resolve_model_id(cli: &Cli, config: &Config) -> String {
    cli.model
        .clone()
        .unwrap_or_else(|| config.default_model.id.clone())
}

/// Main runtime orchestrator
pub struct Orchestrator {
    cli: Cli,
    config: Config,
    credentials: Credentials,
}

impl Orchestrator {
    /// Create a new orchestrator from CLI args
    pub fn new(cli: Cli) -> Result<Self> {
        let config = resolve_config(&cli)?;
        let credentials = Credentials::from_env(&config);
        tracing::debug!("Credentials: {:?}", credentials);

        Ok(Self {
            cli,
            config,
            credentials,
        })
    }

    /// Run the orchestrator
    pub async fn run(self) -> Result<()> {
        // Handle subcommands
        if let Some(command) = &self.cli.command {
            if handle_command(command, &self.config, &self.credentials).await? {
                return Ok(()); // Command handled, exit
            }
            // Continue to chat for Commands::Chat
        }

        // Log to a file so log lines don't tear the terminal UI
        match get_data_dir() {
            Ok(dir) => {
                let log_path = dir.join("chainchat.log");
                if let Err(e) = init_file_logger(&log_path, self.cli.verbose) {
                    eprintln!("⚠️  Failed to open log file {}: {}", log_path.display(), e);
                }
            }
            Err(e) => eprintln!("⚠️  No data directory for logs: {}", e),
        }

        let model_id = resolve_model_id(&self.cli, &self.config);
        let mode = ResponseMode::from_enabled(self.config.decomposition.enabled);
        println!(
            "Starting chainchat with model: {} ({})",
            model_id.green(),
            mode.display_name()
        );

        let ui_config = self.config.ui.clone();
        let session = ChatSession::new(self.config, self.credentials, &model_id);
        if let Some(err) = session.config_error() {
            tracing::warn!("Starting without a usable model: {}", err);
        }

        let app = App::new(session, &ui_config);
        run_ui(app).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_cli_overrides_config() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[default_model]\nid = \"groq/llama-3.1-8b-instant\"\nmax_tokens = 300\n\n[decomposition]\nenabled = false"
        )
        .unwrap();
        let path = file.path().to_string_lossy().to_string();

        let cli = Cli::parse_from(["chainchat", "--config", path.as_str(), "--split", "--max-tokens", "900"]);
        let config = resolve_config(&cli).unwrap();
        assert!(config.decomposition.enabled);
        assert_eq!(config.default_model.max_tokens, 900);
        assert_eq!(resolve_model_id(&cli, &config), "groq/llama-3.1-8b-instant");

        let cli = Cli::parse_from(["chainchat", "--config", path.as_str(), "-m", "ollama/llama3"]);
        let config = resolve_config(&cli).unwrap();
        assert!(!config.decomposition.enabled);
        assert_eq!(resolve_model_id(&cli, &config), "ollama/llama3");
    }

    #[test]
    fn test_missing_explicit_config_is_an_error() {
        let cli = Cli::parse_from(["chainchat", "--config", "/nonexistent/chainchat.toml"]);
        assert!(resolve_config(&cli).is_err());
    }
}
