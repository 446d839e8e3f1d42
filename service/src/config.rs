use clap::builder::TypedValueParser as _;
use clap::Parser;
use dotenvy::dotenv;
use log::LevelFilter;
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Debug, PartialEq)]
pub enum RustEnv {
    Development,
    Production,
    Staging,
}

#[derive(Debug, PartialEq, Eq)]
pub struct RustEnvParseError;

impl FromStr for RustEnv {
    type Err = RustEnvParseError;
    fn from_str(level: &str) -> Result<RustEnv, Self::Err> {
        match level.to_lowercase().as_str() {
            "development" => Ok(RustEnv::Development),
            "production" => Ok(RustEnv::Production),
            "staging" => Ok(RustEnv::Staging),
            _ => Err(RustEnvParseError),
        }
    }
}

impl fmt::Display for RustEnv {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RustEnv::Development => write!(f, "development"),
            RustEnv::Production => write!(f, "production"),
            RustEnv::Staging => write!(f, "staging"),
        }
    }
}

#[derive(Clone, Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// A list of full CORS origin URLs that allowed to receive server responses.
    #[arg(
        long,
        env,
        value_delimiter = ',',
        use_value_delimiter = true,
        default_value = "http://localhost:3000,https://localhost:3000"
    )]
    pub allowed_origins: Vec<String>,

    /// Okta application client ID
    #[arg(long, env)]
    oauth_okta_client_id: Option<String>,

    /// Okta application client secret
    #[arg(long, env, hide_env_values = true)]
    oauth_okta_client_secret: Option<String>,

    /// Okta org domain, e.g. dev-123456.okta.com
    #[arg(long, env)]
    oauth_okta_domain: Option<String>,

    /// Okta custom authorization server ID (e.g. "default")
    #[arg(long, env)]
    oauth_okta_auth_server_id: Option<String>,

    /// Audience to request from the Okta authorization server
    #[arg(long, env)]
    oauth_okta_audience: Option<String>,

    /// Redirect URL registered with Okta, if it differs from the request URL
    #[arg(long, env)]
    oauth_okta_redirect_url: Option<String>,

    /// Google OAuth client ID
    #[arg(long, env)]
    oauth_google_client_id: Option<String>,

    /// Google OAuth client secret
    #[arg(long, env, hide_env_values = true)]
    oauth_google_client_secret: Option<String>,

    /// Redirect URL registered with Google, if it differs from the request URL
    #[arg(long, env)]
    oauth_google_redirect_url: Option<String>,

    /// WebAuthn relying party ID (the effective domain of the site)
    #[arg(long, env, default_value = "localhost")]
    pub webauthn_rp_id: String,

    /// WebAuthn relying party name shown by authenticators
    #[arg(long, env, default_value = "Auth Utils")]
    pub webauthn_rp_name: String,

    /// Origin browsers report during WebAuthn ceremonies
    #[arg(long, env, default_value = "http://localhost:4000")]
    pub webauthn_origin: String,

    /// The host interface to listen for incoming connections
    #[arg(short, long, env, default_value = "127.0.0.1")]
    pub interface: Option<String>,

    /// The host TCP port to listen for incoming connections
    #[arg(short, long, env, default_value_t = 4000)]
    pub port: u16,

    /// Set the log level verbosity threshold (level) to control what gets displayed on console output
    #[arg(
        short,
        long,
        env,
        default_value_t = LevelFilter::Info,
        value_parser = clap::builder::PossibleValuesParser::new(["OFF", "ERROR", "WARN", "INFO", "DEBUG", "TRACE"])
            .map(|s| s.parse::<LevelFilter>().unwrap()),
        )]
    pub log_level_filter: LevelFilter,

    /// Set the Rust runtime environment to use.
    #[arg(
    short,
    long,
    env,
    default_value_t = RustEnv::Development,
    value_parser = clap::builder::PossibleValuesParser::new([
        "DEVELOPMENT", "PRODUCTION", "STAGING",
        "development", "production", "staging"
    ])
        .map(|s| s.parse::<RustEnv>().unwrap()),
    )]
    pub runtime_env: RustEnv,

    /// Session expiry duration in seconds (default: 24 hours = 86400 seconds)
    #[arg(long, env, default_value_t = 86400)]
    pub session_expiry_seconds: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        // Load .env file first
        dotenv().ok();
        // Then parse the command line parameters and flags
        Config::parse()
    }

    pub fn oauth_okta_client_id(&self) -> Option<String> {
        self.oauth_okta_client_id.clone()
    }

    pub fn oauth_okta_client_secret(&self) -> Option<String> {
        self.oauth_okta_client_secret.clone()
    }

    pub fn oauth_okta_domain(&self) -> Option<String> {
        self.oauth_okta_domain.clone()
    }

    pub fn oauth_okta_auth_server_id(&self) -> Option<String> {
        self.oauth_okta_auth_server_id.clone()
    }

    pub fn oauth_okta_audience(&self) -> Option<String> {
        self.oauth_okta_audience.clone()
    }

    pub fn oauth_okta_redirect_url(&self) -> Option<String> {
        self.oauth_okta_redirect_url.clone()
    }

    pub fn oauth_google_client_id(&self) -> Option<String> {
        self.oauth_google_client_id.clone()
    }

    pub fn oauth_google_client_secret(&self) -> Option<String> {
        self.oauth_google_client_secret.clone()
    }

    pub fn oauth_google_redirect_url(&self) -> Option<String> {
        self.oauth_google_redirect_url.clone()
    }

    pub fn runtime_env(&self) -> RustEnv {
        self.runtime_env.clone()
    }

    pub fn is_production(&self) -> bool {
        self.runtime_env() == RustEnv::Production
    }
}
