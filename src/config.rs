use serde::{Deserialize, Serialize};

use std::{env, fs, path::Path, path::PathBuf, time::Duration};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub database_dsn: String,
    #[serde(default = "default_upload_dir")]
    pub upload_dir: PathBuf,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
    /// strftime pattern used when showing note timestamps
    #[serde(default = "default_date_format")]
    pub date_format: String,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub reconcile: ReconcileConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Header carrying the authenticated user id, set by the auth proxy
    pub identity_header: String,
    pub name_header: String,
    pub login_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum StorageConfig {
    Filesystem {
        root: PathBuf,
    },
    Http {
        base_url: String,
        bucket: String,
        #[serde(default)]
        auth_bearer: Option<String>,
    },
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileConfig {
    pub enabled: bool,
    #[serde(with = "humantime_serde")]
    pub interval: Duration,
    /// Unreferenced blobs younger than this are left alone
    #[serde(with = "humantime_serde")]
    pub grace: Duration,
}

const fn default_port() -> u16 {
    8000
}

fn default_upload_dir() -> PathBuf {
    env::temp_dir().join("notes-board-uploads")
}

const fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_date_format() -> String {
    "%B %-d %Y, %-I:%M:%S %P".to_string()
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            identity_header: "x-auth-request-user".to_string(),
            name_header: "x-auth-request-preferred-username".to_string(),
            login_url: "/oauth2/start".to_string(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::Filesystem {
            root: PathBuf::from("data/blobs"),
        }
    }
}

impl StorageConfig {
    /// Loggable summary; never includes credentials.
    pub fn describe(&self) -> String {
        match self {
            Self::Filesystem { root } => format!("filesystem at {}", root.display()),
            Self::Http {
                base_url, bucket, ..
            } => format!("object gateway {base_url}, bucket '{bucket}'"),
            Self::Memory => "in-memory (not persistent)".to_string(),
        }
    }
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: Duration::from_secs(60 * 60),
            grace: Duration::from_secs(15 * 60),
        }
    }
}

impl Config {
    /// Settings for running without a config file.
    pub fn with_database_dsn(database_dsn: String) -> Self {
        Self {
            port: default_port(),
            database_dsn,
            upload_dir: default_upload_dir(),
            max_upload_bytes: default_max_upload_bytes(),
            date_format: default_date_format(),
            auth: AuthConfig::default(),
            storage: StorageConfig::default(),
            reconcile: ReconcileConfig::default(),
        }
    }
}

fn parse_config(contents: &str) -> Result<Config, Box<dyn std::error::Error>> {
    let mut config: Config = serde_yaml::from_str(contents)?;

    if let Ok(dsn) = env::var("PG_DSN") {
        config.database_dsn = dsn;
    }

    if config.database_dsn.is_empty() {
        return Err("database dsn must be set in the config file or as PG_DSN".into());
    }

    Ok(config)
}

fn load_from_env() -> Result<Config, Box<dyn std::error::Error>> {
    let database_dsn =
        env::var("PG_DSN").map_err(|_| "PG_DSN environment variable is required")?;

    let mut config = Config::with_database_dsn(database_dsn);

    if let Ok(port) = env::var("PORT") {
        config.port = port
            .parse::<u16>()
            .map_err(|e| format!("Failed to parse PORT: {e}"))?;
    }

    if let Ok(root) = env::var("BLOB_ROOT") {
        config.storage = StorageConfig::Filesystem {
            root: PathBuf::from(root),
        };
    }

    Ok(config)
}

pub fn load_config() -> Result<Config, Box<dyn std::error::Error>> {
    // Retrieve env variable
    let config_path =
        env::var("NOTES_BOARD_CONFIG").unwrap_or_else(|_| "config.yaml".to_string());

    // Try env path
    if Path::new(&config_path).exists() {
        let contents = fs::read_to_string(&config_path)?;
        return parse_config(&contents);
    }

    // Fallback to config.yaml
    if Path::new("config.yaml").exists() {
        tracing::warn!(
            "Config file '{}' not found, falling back to 'config.yaml'",
            config_path
        );
        let contents = fs::read_to_string("config.yaml")?;
        return parse_config(&contents);
    }

    // Fallback to config.example.yaml
    if Path::new("config.example.yaml").exists() {
        tracing::warn!(
            "Config file '{}' and 'config.yaml' not found, falling back to 'config.example.yaml'",
            config_path
        );
        let contents = fs::read_to_string("config.example.yaml")?;
        return parse_config(&contents);
    }

    // Fallback to environment variables
    tracing::info!(
        "No config file found, attempting to load configuration from environment variables"
    );
    load_from_env().map_err(|e| {
        format!(
            "Config file not found and environment variables are incomplete. \
             Tried: '{config_path}', 'config.yaml', 'config.example.yaml', and environment variables. \
             Error: {e}"
        )
        .into()
    })
}
