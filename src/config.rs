use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Clone)]
pub struct BackendConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_db_path")]
    pub database_path: PathBuf,
    /// 64 hex characters (32 bytes). Usually supplied via BOTVAULT_MASTER_KEY.
    pub master_key: Option<String>,
    #[serde(default = "default_login_timeout")]
    pub login_timeout_secs: u64,
    #[serde(default = "default_discord_api")]
    pub discord_api_base: String,
    #[serde(default = "default_groq_api")]
    pub groq_api_base: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_system_preamble")]
    pub system_preamble: String,
}

// Default functions
fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_port() -> u16 {
    3000
}
fn default_db_path() -> PathBuf {
    PathBuf::from("data/botvault.db")
}
fn default_login_timeout() -> u64 {
    30
}
fn default_discord_api() -> String {
    "https://discord.com/api/v10".into()
}
fn default_groq_api() -> String {
    "https://api.groq.com/openai".into()
}
fn default_model() -> String {
    "llama-3.3-70b-versatile".into()
}
fn default_system_preamble() -> String {
    "You are a helpful Discord assistant. Keep answers short enough to fit in one message.".into()
}

impl BackendConfig {
    /// Decode and validate the master key. The process must not come up
    /// without a usable key, so callers treat any error here as fatal.
    pub fn master_key_bytes(&self) -> anyhow::Result<[u8; 32]> {
        let hex_key = self
            .master_key
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("master_key is not set (config or BOTVAULT_MASTER_KEY)"))?;
        let bytes = hex::decode(hex_key.trim())
            .map_err(|_| anyhow::anyhow!("master_key is not valid hex"))?;
        if bytes.len() != 32 {
            anyhow::bail!(
                "master_key must be exactly 32 bytes (64 hex characters), got {}",
                bytes.len()
            );
        }
        let mut key = [0u8; 32];
        key.copy_from_slice(&bytes);
        Ok(key)
    }
}

/// Load config from TOML file with env var overrides.
pub fn load(path: &str) -> anyhow::Result<BackendConfig> {
    let content = if std::path::Path::new(path).exists() {
        std::fs::read_to_string(path)?
    } else {
        tracing::warn!("Config file not found at {}, using defaults", path);
        String::new()
    };

    let mut config: BackendConfig = toml::from_str(&content)?;

    // Env var overrides
    if let Ok(v) = std::env::var("BOTVAULT_HOST") {
        config.host = v;
    }
    if let Ok(v) = std::env::var("BOTVAULT_PORT") {
        config.port = v.parse()?;
    }
    if let Ok(v) = std::env::var("BOTVAULT_DB_PATH") {
        config.database_path = PathBuf::from(v);
    }
    if let Ok(v) = std::env::var("BOTVAULT_MASTER_KEY") {
        config.master_key = Some(v);
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_applied_on_empty_toml() {
        let cfg: BackendConfig = toml::from_str("").expect("empty toml should parse");
        assert_eq!(cfg.host, "127.0.0.1");
        assert_eq!(cfg.port, 3000);
        assert_eq!(cfg.login_timeout_secs, 30);
        assert_eq!(cfg.model, "llama-3.3-70b-versatile");
        assert!(cfg.master_key.is_none());
    }

    #[test]
    fn partial_toml_overrides_only_set_fields() {
        let toml_str = r#"
host = "0.0.0.0"
port = 9090
master_key = "aa"
"#;
        let cfg: BackendConfig = toml::from_str(toml_str).expect("valid toml");
        assert_eq!(cfg.host, "0.0.0.0");
        assert_eq!(cfg.port, 9090);
        assert_eq!(cfg.master_key.as_deref(), Some("aa"));
        // defaults preserved for unset fields
        assert_eq!(cfg.discord_api_base, "https://discord.com/api/v10");
    }

    #[test]
    fn master_key_absent_is_fatal() {
        let cfg: BackendConfig = toml::from_str("").unwrap();
        assert!(cfg.master_key_bytes().is_err());
    }

    #[test]
    fn master_key_wrong_length_is_fatal() {
        let cfg: BackendConfig = toml::from_str(r#"master_key = "aabbcc""#).unwrap();
        assert!(cfg.master_key_bytes().is_err());
    }

    #[test]
    fn master_key_bad_hex_is_fatal() {
        let key = "zz".repeat(32);
        let cfg: BackendConfig =
            toml::from_str(&format!(r#"master_key = "{key}""#)).unwrap();
        assert!(cfg.master_key_bytes().is_err());
    }

    #[test]
    fn master_key_valid_hex_roundtrips() {
        let key = "ab".repeat(32);
        let cfg: BackendConfig =
            toml::from_str(&format!(r#"master_key = "{key}""#)).unwrap();
        let bytes = cfg.master_key_bytes().unwrap();
        assert_eq!(bytes, [0xab; 32]);
    }
}
