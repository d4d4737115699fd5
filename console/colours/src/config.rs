use anyhow::Context;
use serde::Deserialize;
use std::{
    env,
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
    time::Duration,
};

const DEFAULT_ENV: &str = "dev";
const CONFIG_ENV_VAR: &str = "COLOURS_ENV";
const CONFIG_PATH_VAR: &str = "COLOURS_CONFIG";

#[derive(Debug, Deserialize, Clone)]
pub struct ConsoleConfig {
    /// Base URL of the backend. The GraphQL endpoint lives at `<endpoint>/graphql`.
    pub endpoint: String,
    pub storage_path: PathBuf,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default)]
    pub notifications: NotificationConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

impl ConsoleConfig {
    pub fn graphql_url(&self) -> String {
        format!("{}/graphql", self.endpoint.trim_end_matches('/'))
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct NotificationConfig {
    pub expiry_secs: u64,
}

impl NotificationConfig {
    pub fn expiry(&self) -> Duration {
        Duration::from_secs(self.expiry_secs)
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self { expiry_secs: 15 }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SessionConfig {
    /// How long a session-ending failure stays readable before the session is cleared.
    pub sign_out_delay_secs: u64,
    pub avatar_size: u32,
}

impl SessionConfig {
    pub fn sign_out_delay(&self) -> Duration {
        Duration::from_secs(self.sign_out_delay_secs)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            sign_out_delay_secs: 5,
            avatar_size: 256,
        }
    }
}

fn default_user_agent() -> String {
    format!("colours-console/{}", env!("CARGO_PKG_VERSION"))
}

/// Loads the console config from a JSON file.
pub fn load_config(path: &Path) -> anyhow::Result<ConsoleConfig> {
    let file = File::open(path).with_context(|| format!("Cannot open JSON config at {:?}", path))?;
    let reader = BufReader::new(file);
    simd_json::serde::from_reader(reader)
        .with_context(|| format!("Cannot parse JSON config at {:?}", path))
}

/// Resolves the config file. `COLOURS_CONFIG` wins, otherwise
/// `/etc/colours/<COLOURS_ENV>`.
pub fn get_config_path() -> Box<Path> {
    if let Ok(path) = env::var(CONFIG_PATH_VAR) {
        return PathBuf::from(path).into_boxed_path();
    }
    let mut buffer: PathBuf = ["/etc", "colours"].iter().collect();
    buffer.push(get_environment());
    buffer.into_boxed_path()
}

fn get_environment() -> String {
    env::var(CONFIG_ENV_VAR)
        .unwrap_or_else(|_| String::from(DEFAULT_ENV))
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_missing_sections() {
        let mut json = br#"{"endpoint": "https://api.example.com/", "storage_path": "/tmp/s.json"}"#.to_vec();
        let config: ConsoleConfig = simd_json::serde::from_slice(&mut json).unwrap();
        assert_eq!(config.graphql_url(), "https://api.example.com/graphql");
        assert_eq!(config.notifications.expiry(), Duration::from_secs(15));
        assert_eq!(config.session.sign_out_delay(), Duration::from_secs(5));
        assert_eq!(config.session.avatar_size, 256);
        assert!(config.user_agent.starts_with("colours-console/"));
    }

    #[test]
    fn test_overrides() {
        let mut json = br#"{
            "endpoint": "http://localhost:8000",
            "storage_path": "s.json",
            "notifications": {"expiry_secs": 3},
            "session": {"sign_out_delay_secs": 0, "avatar_size": 64}
        }"#
        .to_vec();
        let config: ConsoleConfig = simd_json::serde::from_slice(&mut json).unwrap();
        assert_eq!(config.notifications.expiry(), Duration::from_secs(3));
        assert_eq!(config.session.sign_out_delay(), Duration::ZERO);
        assert_eq!(config.session.avatar_size, 64);
    }
}
