/// Constants module to avoid magic numbers in the codebase

// Model defaults
pub const DEFAULT_MODEL_ID: &str = "gpt-4o-mini";
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_MAX_TOKENS: usize = 500;

// Decomposition
pub const DEFAULT_MAX_SUB_QUERIES: usize = 8;
pub const DEFAULT_HISTORY_TURNS: usize = 10;
pub const PART_SEPARATOR: &str = "\n\n---\n\n";

// Provider endpoints
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com/v1";
pub const DEFAULT_GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_AZURE_API_VERSION: &str = "2024-06-01";
pub const DEFAULT_OLLAMA_HOST: &str = "localhost";
pub const DEFAULT_OLLAMA_PORT: u16 = 11434;

// Timeouts
pub const HTTP_REQUEST_TIMEOUT_SECS: u64 = 120;
pub const PROXY_HEALTH_TIMEOUT_MS: u64 = 500;

// UI Configuration
pub const UI_REFRESH_INTERVAL_MS: u64 = 50;
pub const UI_SCROLL_LINES: u16 = 3;
pub const UI_PAGE_LINES: u16 = 10;
pub const UI_SIDEBAR_PERCENT: u16 = 28;
pub const TURN_EVENT_BUFFER: usize = 100;

pub const SPINNER_FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
