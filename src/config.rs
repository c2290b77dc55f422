use anyhow::{Context, Result};
use clap::Parser;
use dialoguer::{Confirm, Input, Password};
use std::io::Write;
use std::path::PathBuf;

/// Prompt Transformer - prompt engineering service
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Server host address
    #[arg(short = 'H', long, env = "SERVER_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Server port
    #[arg(short, long, env = "SERVER_PORT", default_value = "8000")]
    pub port: u16,

    /// API key clients must present to use the service
    #[arg(short = 'k', long, env = "PROXY_API_KEY")]
    pub api_key: Option<String>,

    /// Path to the SQLite database holding history, keys and instructions
    #[arg(short = 'd', long, env = "DATABASE_FILE")]
    pub db_file: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// OpenRouter key used for every openrouter/* model
    #[arg(long, env = "OPENROUTER_API_KEY", hide_env_values = true)]
    pub openrouter_key: Option<String>,

    /// Google key used for gemini models when the user has none stored
    #[arg(long, env = "GOOGLE_API_KEY", hide_env_values = true)]
    pub google_key: Option<String>,

    /// Max tokens requested from the provider
    #[arg(long, env = "MAX_TOKENS", default_value = "1000")]
    pub max_tokens: u32,

    /// Sampling temperature
    #[arg(long, env = "TEMPERATURE", default_value = "0.7")]
    pub temperature: f32,

    /// HTTP request timeout in seconds
    #[arg(long, env = "HTTP_REQUEST_TIMEOUT", default_value = "120")]
    pub http_timeout: u64,
}

/// Base URLs of the upstream APIs
#[derive(Clone, Debug, PartialEq)]
pub struct ProviderEndpoints {
    pub openai: String,
    pub anthropic: String,
    pub google: String,
    pub openrouter: String,
}

impl Default for ProviderEndpoints {
    fn default() -> Self {
        Self {
            openai: "https://api.openai.com".to_string(),
            anthropic: "https://api.anthropic.com".to_string(),
            google: "https://generativelanguage.googleapis.com".to_string(),
            openrouter: "https://openrouter.ai/api".to_string(),
        }
    }
}

impl ProviderEndpoints {
    /// Apply `*_BASE_URL` environment overrides
    fn from_env() -> Self {
        let defaults = Self::default();
        let pick = |var: &str, default: String| {
            std::env::var(var)
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(|s| s.trim_end_matches('/').to_string())
                .unwrap_or(default)
        };
        Self {
            openai: pick("OPENAI_BASE_URL", defaults.openai),
            anthropic: pick("ANTHROPIC_BASE_URL", defaults.anthropic),
            google: pick("GOOGLE_BASE_URL", defaults.google),
            openrouter: pick("OPENROUTER_BASE_URL", defaults.openrouter),
        }
    }
}

/// Credentials supplied by the deployment rather than by users
#[derive(Clone, Default, PartialEq)]
pub struct DeploymentKeys {
    pub openrouter: Option<String>,
    pub google: Option<String>,
}

impl std::fmt::Debug for DeploymentKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeploymentKeys")
            .field("openrouter", &self.openrouter.as_ref().map(|_| "***"))
            .field("google", &self.google.as_ref().map(|_| "***"))
            .finish()
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    // Server settings
    pub server_host: String,
    pub server_port: u16,

    // Authentication
    pub proxy_api_key: String,

    // Storage
    pub database_file: PathBuf,

    // HTTP client
    pub http_connect_timeout: u64,
    pub http_request_timeout: u64,

    // Generation
    pub max_tokens: u32,
    pub temperature: f32,

    // Providers
    pub endpoints: ProviderEndpoints,
    pub deployment_keys: DeploymentKeys,
    pub openrouter_referer: String,
    pub openrouter_title: String,

    pub log_level: String,
}

impl Config {
    /// Load configuration from all sources with priority: CLI > ENV > defaults
    pub fn load() -> Result<Self> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        let args = CliArgs::parse();

        let config = Config {
            server_host: args.host,
            server_port: args.port,

            proxy_api_key: args
                .api_key
                .or_else(|| std::env::var("PROXY_API_KEY").ok())
                .context("PROXY_API_KEY is required (use -k or set PROXY_API_KEY env var)")?,

            database_file: args
                .db_file
                .map(|s| expand_tilde(&s))
                .unwrap_or_else(default_database_file),

            http_connect_timeout: std::env::var("HTTP_CONNECT_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),

            http_request_timeout: args.http_timeout,

            max_tokens: args.max_tokens,
            temperature: args.temperature,

            endpoints: ProviderEndpoints::from_env(),

            deployment_keys: DeploymentKeys {
                openrouter: non_blank(args.openrouter_key),
                google: non_blank(args.google_key),
            },

            openrouter_referer: std::env::var("OPENROUTER_REFERER")
                .unwrap_or_else(|_| "https://prompt-transformer.local".to_string()),

            openrouter_title: std::env::var("OPENROUTER_TITLE")
                .unwrap_or_else(|_| "Prompt Transformer Service".to_string()),

            log_level: args.log_level,
        };

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.proxy_api_key.trim().is_empty() {
            anyhow::bail!("PROXY_API_KEY cannot be empty");
        }
        if self.max_tokens == 0 {
            anyhow::bail!("MAX_TOKENS must be greater than zero");
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            anyhow::bail!(
                "TEMPERATURE must be between 0.0 and 2.0 (got {})",
                self.temperature
            );
        }
        if self.deployment_keys.openrouter.is_none() {
            tracing::warn!("OPENROUTER_API_KEY is not set; openrouter/* models will be unavailable");
        }

        Ok(())
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

/// `<data dir>/prompt-transformer/prompts.sqlite3`, or the working directory
fn default_database_file() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("prompt-transformer"))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("prompts.sqlite3")
}

/// Expand tilde (~) in file paths to user's home directory
fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}


// === Interactive Setup ===

/// Check if interactive setup is needed (no .env file and no proxy key)
pub fn needs_interactive_setup() -> bool {
    let env_file_exists = std::path::Path::new(".env").exists();
    let has_proxy_key = std::env::var("PROXY_API_KEY").is_ok();

    !env_file_exists && !has_proxy_key
}

/// Run interactive setup to collect required configuration
pub fn run_interactive_setup() -> Result<InteractiveConfig> {
    println!();
    println!("Prompt Transformer - First Time Setup");
    println!();
    println!("No configuration found. Let's set up the service.");
    println!();

    let proxy_api_key: String = Password::new()
        .with_prompt("Enter a password to protect the service (PROXY_API_KEY)")
        .interact()
        .context("Failed to read PROXY_API_KEY")?;

    if proxy_api_key.is_empty() {
        anyhow::bail!("PROXY_API_KEY cannot be empty");
    }

    println!();
    let openrouter_api_key: String = Password::new()
        .with_prompt("OpenRouter API key (leave empty to skip)")
        .allow_empty_password(true)
        .interact()
        .context("Failed to read OPENROUTER_API_KEY")?;

    println!();
    let server_port: String = Input::new()
        .with_prompt("Server port")
        .default("8000".to_string())
        .interact_text()
        .context("Failed to read server port")?;

    let config = InteractiveConfig {
        proxy_api_key,
        openrouter_api_key,
        server_port,
    };

    println!();
    let save_to_env = Confirm::new()
        .with_prompt("Save configuration to .env file?")
        .default(true)
        .interact()
        .context("Failed to read save confirmation")?;

    if save_to_env {
        save_env_file(&config)?;
        println!();
        println!("Configuration saved to .env file");
    }

    println!();
    println!("Setup complete! Starting service...");
    println!();

    Ok(config)
}

/// Configuration collected from interactive setup
#[derive(Debug, Clone)]
pub struct InteractiveConfig {
    pub proxy_api_key: String,
    pub openrouter_api_key: String,
    pub server_port: String,
}

/// Save configuration to .env file
fn save_env_file(config: &InteractiveConfig) -> Result<()> {
    let env_content = format!(
        r#"# Prompt Transformer Configuration
# Generated by interactive setup

# Password clients must send (required)
PROXY_API_KEY={}

# Deployment key for openrouter/* models
OPENROUTER_API_KEY={}

# Server settings
SERVER_HOST=0.0.0.0
SERVER_PORT={}

# Logging (trace, debug, info, warn, error)
LOG_LEVEL=info
"#,
        config.proxy_api_key, config.openrouter_api_key, config.server_port,
    );

    let mut file = std::fs::File::create(".env").context("Failed to create .env file")?;
    file.write_all(env_content.as_bytes())
        .context("Failed to write .env file")?;

    Ok(())
}
