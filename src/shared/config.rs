use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub remote: RemoteConfig,
    pub sync: SyncConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    pub base_url: String,
    /// Seconds before an individual request is abandoned as retryable.
    pub request_timeout: u64,
    #[serde(default)]
    pub auth_token: Option<String>,
    /// Seconds between reachability checks that drive the online flag; 0 disables them.
    #[serde(default)]
    pub probe_interval: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    pub auto_sync: bool,
    /// Seconds between periodic passes.
    pub sync_interval: u64,
    /// Seconds between background pulls of server changes; 0 disables them.
    #[serde(default)]
    pub refresh_interval: u64,
    pub retention_days: i64,
    /// Whether the manager starts in the online state.
    pub start_online: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite:data/clinic_sync.db?mode=rwc".to_string(),
                max_connections: 5,
            },
            remote: RemoteConfig {
                base_url: "http://localhost:3000".to_string(),
                request_timeout: 30,
                auth_token: None,
                probe_interval: 30,
            },
            sync: SyncConfig::default(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            auto_sync: true,
            sync_interval: 180, // 3 minutes
            refresh_interval: 900,
            retention_days: 7,
            start_online: true,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(v) = std::env::var("CLINIC_SYNC_DATABASE_URL") {
            if !v.trim().is_empty() {
                cfg.database.url = v.trim().to_string();
            }
        }
        if let Some(value) = env_u64("CLINIC_SYNC_DATABASE_MAX_CONNECTIONS") {
            cfg.database.max_connections = value.clamp(1, u64::from(u32::MAX)) as u32;
        }

        if let Ok(v) = std::env::var("CLINIC_SYNC_API_BASE_URL") {
            if !v.trim().is_empty() {
                cfg.remote.base_url = v.trim().trim_end_matches('/').to_string();
            }
        }
        if let Some(value) = env_u64("CLINIC_SYNC_REQUEST_TIMEOUT_SECS") {
            cfg.remote.request_timeout = value.max(1);
        }
        if let Some(value) = env_u64("CLINIC_SYNC_PROBE_INTERVAL_SECS") {
            cfg.remote.probe_interval = value;
        }
        if let Ok(v) = std::env::var("CLINIC_SYNC_API_TOKEN") {
            cfg.remote.auth_token = Some(v).filter(|token| !token.trim().is_empty());
        }

        if let Ok(v) = std::env::var("CLINIC_SYNC_AUTO_SYNC") {
            cfg.sync.auto_sync = parse_bool(&v, cfg.sync.auto_sync);
        }
        if let Some(value) = env_u64("CLINIC_SYNC_INTERVAL_SECS") {
            cfg.sync.sync_interval = value.max(1);
        }
        if let Some(value) = env_u64("CLINIC_SYNC_REFRESH_INTERVAL_SECS") {
            cfg.sync.refresh_interval = value;
        }
        if let Some(value) = env_u64("CLINIC_SYNC_RETENTION_DAYS") {
            cfg.sync.retention_days = value.clamp(1, 365) as i64;
        }
        if let Ok(v) = std::env::var("CLINIC_SYNC_START_ONLINE") {
            cfg.sync.start_online = parse_bool(&v, cfg.sync.start_online);
        }

        cfg
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.database.max_connections == 0 {
            return Err("Database max_connections must be greater than 0".to_string());
        }
        if !(self.remote.base_url.starts_with("http://")
            || self.remote.base_url.starts_with("https://"))
        {
            return Err(format!(
                "Remote base_url must be an http(s) URL: {}",
                self.remote.base_url
            ));
        }
        if self.remote.request_timeout == 0 {
            return Err("Remote request_timeout must be greater than 0".to_string());
        }
        if self.sync.sync_interval == 0 {
            return Err("Sync sync_interval must be greater than 0".to_string());
        }
        if !(1..=365).contains(&self.sync.retention_days) {
            return Err("Sync retention_days must be between 1 and 365".to_string());
        }
        Ok(())
    }
}

fn env_u64(name: &str) -> Option<u64> {
    std::env::var(name).ok().and_then(|v| parse_u64(&v))
}

fn parse_bool(s: &str, default: bool) -> bool {
    match s.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}

fn parse_u64(value: &str) -> Option<u64> {
    value.trim().parse::<u64>().ok()
}
