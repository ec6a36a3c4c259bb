use anyhow::Result;
use colored::Colorize;
use std::path::PathBuf;

use crate::{
    app::{get_config_dir, init_config, Config, Credentials},
    models::{ModelFactory, Provider},
    proxy::is_proxy_running,
};

use super::Commands;

/// Handle CLI subcommands
///
/// Returns `Ok(false)` when the caller should continue into the chat interface.
pub async fn handle_command(
    command: &Commands,
    config: &Config,
    credentials: &Credentials,
) -> Result<bool> {
    match command {
        Commands::Init => {
            println!("Initializing chainchat configuration...");
            let created = init_config()?;
            if created.is_empty() {
                println!("Configuration already present, nothing to do.");
            }
            for path in created {
                println!("  • created {}", path.display().to_string().green());
            }
            Ok(true)
        }
        Commands::Models => {
            list_models(credentials).await?;
            Ok(true)
        }
        Commands::Version => {
            show_version();
            Ok(true)
        }
        Commands::Status => {
            show_status(config, credentials).await?;
            Ok(true)
        }
        Commands::Chat => Ok(false), // Continue to chat interface
    }
}

/// List available models
pub async fn list_models(credentials: &Credentials) -> Result<()> {
    println!("Available models:");
    let models = ModelFactory::list_available(credentials).await;
    for model in models {
        println!("  • {}", model.green());
    }
    Ok(())
}

/// Show version information
pub fn show_version() {
    println!("chainchat v{}", env!("CARGO_PKG_VERSION"));
    println!("   Terminal chat with smart splitting of complex questions");
}

/// Report configuration, credentials and proxy reachability
async fn show_status(config: &Config, credentials: &Credentials) -> Result<()> {
    println!("chainchat Status:");
    println!();

    match get_config_dir().map(|dir| dir.join("config.toml")) {
        Ok(path) if path.exists() => {
            println!("  [OK] Configuration: {}", path.display());
        }
        _ => println!("  [WARNING] Configuration: Not found (using defaults)"),
    }
    let local = PathBuf::from(".chainchat/config.toml");
    if local.exists() {
        println!("  [OK] Project configuration: {}", local.display());
    }

    println!("  Default model: {}", config.default_model.id.cyan());
    println!(
        "  Smart split: {} (up to {} sub-queries)",
        if config.decomposition.enabled { "on" } else { "off" },
        config.decomposition.max_sub_queries
    );

    println!("\n  Providers:");
    for provider in Provider::ALL {
        let ready = match provider {
            Provider::Ollama => true,
            Provider::Azure => {
                credentials.has_api_key(provider) && credentials.azure_endpoint().is_some()
            }
            _ => credentials.has_api_key(provider),
        };
        let mark = if ready { "[OK]".green() } else { "[MISSING]".yellow() };
        let note = match provider {
            Provider::Ollama => format!("local at {}:{}", config.ollama.host, config.ollama.port),
            _ if ready => "credentials set".to_string(),
            _ => "no credentials".to_string(),
        };
        println!("    {} {}: {}", mark, provider.display_name(), note);
    }

    if let Some(url) = credentials.proxy_url() {
        if is_proxy_running(url, credentials.proxy_master_key()).await {
            println!("\n  [OK] LiteLLM Proxy: Running at {}", url);
        } else {
            println!("\n  [ERROR] LiteLLM Proxy: Not reachable at {}", url);
        }
    }

    println!();
    Ok(())
}
