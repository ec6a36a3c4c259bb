use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "chainchat")]
#[command(version)]
#[command(about = "Terminal chat with optional smart splitting of complex questions", long_about = None)]
pub struct Cli {
    /// Model to use (e.g., openai/gpt-4o-mini, anthropic/claude-3-5-haiku-latest, ollama/llama3)
    #[arg(short, long)]
    pub model: Option<String>,

    /// Path to configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Start with smart splitting enabled
    #[arg(long, conflicts_with = "no_split")]
    pub split: bool,

    /// Start with smart splitting disabled
    #[arg(long)]
    pub no_split: bool,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Non-interactive prompt to execute
    #[arg(short, long)]
    pub prompt: Option<String>,

    /// Output format for non-interactive mode
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, requires = "prompt")]
    pub output_format: OutputFormat,

    /// Maximum tokens to generate per model call
    #[arg(long)]
    pub max_tokens: Option<usize>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Splitting override from the command line, if any
    pub fn split_override(&self) -> Option<bool> {
        match (self.split, self.no_split) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize configuration
    Init,
    /// List available models
    Models,
    /// Start a chat session (default)
    Chat,
    /// Show version information
    Version,
    /// Check configuration and provider credentials
    Status,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Plain text output
    Text,
    /// JSON structured output
    Json,
    /// Markdown formatted output
    Markdown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_flags() {
        let cli = Cli::parse_from(["chainchat", "--split"]);
        assert_eq!(cli.split_override(), Some(true));

        let cli = Cli::parse_from(["chainchat", "--no-split"]);
        assert_eq!(cli.split_override(), Some(false));

        let cli = Cli::parse_from(["chainchat"]);
        assert_eq!(cli.split_override(), None);

        assert!(Cli::try_parse_from(["chainchat", "--split", "--no-split"]).is_err());
    }

    #[test]
    fn test_output_format_requires_prompt() {
        assert!(Cli::try_parse_from(["chainchat", "--output-format", "json"]).is_err());

        let cli = Cli::parse_from(["chainchat", "-p", "hi", "--output-format", "json"]);
        assert_eq!(cli.output_format, OutputFormat::Json);
        assert_eq!(cli.prompt.as_deref(), Some("hi"));
    }

    #[test]
    fn test_subcommand() {
        let cli = Cli::parse_from(["chainchat", "models"]);
        assert!(matches!(cli.command, Some(Commands::Models)));
    }
}
