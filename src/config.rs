// Application configuration
//
// Load order (later sources override earlier ones):
// 1. built-in defaults
// 2. config/default.toml, or the file named by VAHAN_CONFIG
// 3. environment variables, VAHAN_ prefix with "__" between sections
//    (VAHAN_SERVER__PORT=8080 -> server.port)

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
pub struct DataConfig {
    pub csv_path: PathBuf,
    pub db_path: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            csv_path: PathBuf::from("vehicle_data.csv"),
            db_path: PathBuf::from("registrations.db"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeneratorSettings {
    pub years: i32,
    pub seed: Option<u64>,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            years: crate::generator::DEFAULT_YEARS,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    pub level: String,
    /// "pretty" (human readable) or "json" (structured)
    pub format: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    pub data: DataConfig,
    pub generator: GeneratorSettings,
    pub server: ServerConfig,
    pub log: LogConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let file = std::env::var("VAHAN_CONFIG").unwrap_or_else(|_| "config/default.toml".to_string());
        Self::load_from(&file)
    }

    pub fn load_from(file: &str) -> Result<Self, ConfigError> {
        let defaults = AppConfig::default();

        Config::builder()
            .set_default("data.csv_path", defaults.data.csv_path.to_string_lossy().to_string())?
            .set_default("data.db_path", defaults.data.db_path.to_string_lossy().to_string())?
            .set_default("generator.years", defaults.generator.years as i64)?
            .set_default("server.host", defaults.server.host)?
            .set_default("server.port", defaults.server.port as i64)?
            .set_default("log.level", defaults.log.level)?
            .set_default("log.format", defaults.log.format)?
            .add_source(File::from(Path::new(file)).required(false))
            .add_source(
                Environment::with_prefix("VAHAN")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
