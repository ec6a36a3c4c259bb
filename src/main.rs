use anyhow::Result;
use clap::Parser;

use chainchat::{
    cli::{Cli, Commands},
    runtime::{resolve_config, resolve_model_id, NonInteractiveRunner, Orchestrator},
    app::Credentials,
    utils::init_logger,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Keys may live in a local .env file
    let _ = dotenvy::dotenv();

    // Parse CLI arguments
    let cli = Cli::parse();

    // The chat UI logs to a file; everything else logs to stderr
    let interactive = cli.prompt.is_none()
        && matches!(cli.command, None | Some(Commands::Chat));
    if !interactive {
        init_logger(cli.verbose);
    }

    // Check if running in non-interactive mode
    if let Some(prompt) = cli.prompt.clone() {
        run_non_interactive(cli, prompt).await
    } else {
        // Create and run the orchestrator for interactive mode
        let orchestrator = Orchestrator::new(cli)?;
        orchestrator.run().await
    }
}

/// Run in non-interactive mode
async fn run_non_interactive(cli: Cli, prompt: String) -> Result<()> {
    let config = resolve_config(&cli)?;
    let credentials = Credentials::from_env(&config);
    let model_id = resolve_model_id(&cli, &config);

    let mut runner = NonInteractiveRunner::new(config, credentials, &model_id);

    // Execute the prompt
    let result = runner.execute(prompt).await?;

    // Format and output the result
    let formatted = runner.format_result(&result, cli.output_format);
    println!("{}", formatted);

    // Exit with appropriate code
    if !result.errors.is_empty() {
        std::process::exit(1);
    }

    Ok(())
}
