use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Mirim Auth - command line client for the Mirim OAuth service
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Base URL of the Mirim API server
    #[arg(short = 'u', long, env = "MIRIM_API_URL", default_value = "http://127.0.0.1:3000")]
    pub api_url: String,

    /// Path to the credential file
    #[arg(short = 'c', long, env = "MIRIM_CREDENTIALS_FILE")]
    pub credentials_file: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// HTTP connect timeout in seconds
    #[arg(long, env = "HTTP_CONNECT_TIMEOUT", default_value = "10")]
    pub connect_timeout: u64,

    /// HTTP request timeout in seconds
    #[arg(long, env = "HTTP_REQUEST_TIMEOUT", default_value = "30")]
    pub http_timeout: u64,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Log in and store the issued tokens
    Login {
        nickname: String,

        /// Password; prompted for when omitted
        #[arg(short, long)]
        password: Option<String>,
    },
    /// Discard stored credentials and end the server session
    Logout,
    /// Show the logged-in user
    Whoami,
    /// List your OAuth clients
    Clients,
    /// List notices
    Notices {
        /// Include inactive notices (admins only)
        #[arg(long)]
        all: bool,
    },
}

#[derive(Clone, Debug)]
pub struct Config {
    pub api_url: String,
    pub credentials_file: PathBuf,
    pub log_level: String,

    // HTTP client
    pub http_connect_timeout: u64,
    pub http_request_timeout: u64,
}

impl Config {
    /// Load configuration with priority: CLI > ENV > defaults
    pub fn load() -> Result<(Self, Command)> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        let args = CliArgs::parse();
        let command = args.command.clone();
        let config = Self::from_args(args)?;

        Ok((config, command))
    }

    /// Build a config from parsed arguments
    pub fn from_args(args: CliArgs) -> Result<Self> {
        let credentials_file = match args.credentials_file {
            Some(path) => expand_tilde(&path),
            None => default_credentials_file()?,
        };

        Ok(Config {
            api_url: args.api_url.trim_end_matches('/').to_string(),
            credentials_file,
            log_level: args.log_level,
            http_connect_timeout: args.connect_timeout,
            http_request_timeout: args.http_timeout,
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.api_url.is_empty() {
            anyhow::bail!("MIRIM_API_URL cannot be empty");
        }
        if !self.api_url.starts_with("http://") && !self.api_url.starts_with("https://") {
            anyhow::bail!(
                "MIRIM_API_URL must start with http:// or https://: {}",
                self.api_url
            );
        }
        if self.http_connect_timeout == 0 || self.http_request_timeout == 0 {
            anyhow::bail!("HTTP timeouts must be greater than zero");
        }

        Ok(())
    }
}

fn default_credentials_file() -> Result<PathBuf> {
    let dir = dirs::config_dir()
        .context("Cannot determine config directory (set MIRIM_CREDENTIALS_FILE)")?;
    Ok(dir.join("mirim-auth").join("credentials.json"))
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

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config {
            api_url: "https://auth.e-mirim.hs.kr".to_string(),
            credentials_file: PathBuf::from("/tmp/credentials.json"),
            log_level: "info".to_string(),
            http_connect_timeout: 10,
            http_request_timeout: 30,
        }
    }

    #[test]
    fn test_expand_tilde() {
        let path = expand_tilde("~/test/file.txt");
        assert!(path.to_string_lossy().contains("test/file.txt"));
        assert!(!path.to_string_lossy().starts_with("~"));

        let path = expand_tilde("/absolute/path");
        assert_eq!(path, PathBuf::from("/absolute/path"));
    }

    #[test]
    fn test_expand_tilde_just_tilde() {
        // Just "~" without slash should not expand
        let path = expand_tilde("~");
        assert_eq!(path, PathBuf::from("~"));
    }

    #[test]
    fn test_validate_accepts_http_and_https() {
        assert!(config().validate().is_ok());

        let mut local = config();
        local.api_url = "http://localhost:3000".to_string();
        assert!(local.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_url() {
        let mut empty = config();
        empty.api_url = String::new();
        assert!(empty.validate().is_err());

        let mut scheme = config();
        scheme.api_url = "ftp://auth.e-mirim.hs.kr".to_string();
        assert!(scheme.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_timeouts() {
        let mut c = config();
        c.http_connect_timeout = 0;
        assert!(c.validate().is_err());

        let mut c = config();
        c.http_request_timeout = 0;
        assert!(c.validate().is_err());
    }

    #[test]
    fn test_from_args_explicit_values() {
        let args = CliArgs::try_parse_from([
            "mirim-auth",
            "--api-url",
            "https://auth.e-mirim.hs.kr/",
            "--credentials-file",
            "/tmp/mirim.json",
            "--connect-timeout",
            "3",
            "--http-timeout",
            "7",
            "notices",
            "--all",
        ])
        .unwrap();

        assert_eq!(args.command, Command::Notices { all: true });

        let config = Config::from_args(args).unwrap();
        assert_eq!(config.api_url, "https://auth.e-mirim.hs.kr");
        assert_eq!(config.credentials_file, PathBuf::from("/tmp/mirim.json"));
        assert_eq!(config.http_connect_timeout, 3);
        assert_eq!(config.http_request_timeout, 7);
    }

    #[test]
    fn test_login_command_password_is_optional() {
        let args = CliArgs::try_parse_from(["mirim-auth", "login", "student"]).unwrap();
        assert_eq!(
            args.command,
            Command::Login {
                nickname: "student".to_string(),
                password: None
            }
        );
    }

    #[test]
    fn test_subcommand_required() {
        assert!(CliArgs::try_parse_from(["mirim-auth"]).is_err());
    }
}
