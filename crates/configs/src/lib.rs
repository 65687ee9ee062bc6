use anyhow::{anyhow, Result};
use models::audit::MAX_PAGE_SIZE as MAX_AUDIT_PAGE_SIZE;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub record_store: RecordStoreConfig,
    #[serde(default)]
    pub cloud_proxy: CloudProxyConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub worker_threads: Option<usize>,
}

impl ServerConfig {
    fn with_port(port: u16) -> Self {
        Self { host: "127.0.0.1".into(), port, worker_threads: Some(4) }
    }

    pub fn bind_addr(&self) -> Result<std::net::SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecordStoreConfig {
    #[serde(flatten)]
    pub server: ServerConfig,
    /// Directory holding `user_<id>.json` files.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

impl Default for RecordStoreConfig {
    fn default() -> Self {
        Self { server: ServerConfig::with_port(8080), data_dir: default_data_dir() }
    }
}

/// How upstream failures are framed in HTTP responses.
#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ErrorFraming {
    /// Non-2xx status with a JSON error object.
    #[default]
    Structured,
    /// `200 OK` with an `"Error: ..."` string body.
    Legacy,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CloudProxyConfig {
    #[serde(flatten)]
    pub server: ServerConfig,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub profile: Option<String>,
    #[serde(default = "default_audit_page_size")]
    pub audit_page_size: i32,
    #[serde(default)]
    pub error_framing: ErrorFraming,
}

impl Default for CloudProxyConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::with_port(8081),
            region: None,
            profile: None,
            audit_page_size: default_audit_page_size(),
            error_framing: ErrorFraming::default(),
        }
    }
}

fn default_data_dir() -> String { ".".into() }
fn default_audit_page_size() -> i32 { MAX_AUDIT_PAGE_SIZE }

pub fn load_default() -> Result<AppConfig> {
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    load_from_file(&path)
}

pub fn load_from_file(path: &str) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    parse(&content)
}

pub fn parse(content: &str) -> Result<AppConfig> {
    let cfg: AppConfig = toml::from_str(content)?;
    Ok(cfg)
}

impl AppConfig {
    /// Load `config.toml`; when it is missing fall back to defaults overlaid
    /// with environment variables. A present but invalid file is an error.
    pub fn load_and_validate() -> Result<Self> {
        let mut cfg = match load_default() {
            Ok(cfg) => cfg,
            Err(e) if is_not_found(&e) => {
                let mut cfg = AppConfig::default();
                cfg.apply_env();
                cfg
            }
            Err(e) => return Err(e),
        };
        cfg.normalize_and_validate()?;
        Ok(cfg)
    }

    pub fn normalize_and_validate(&mut self) -> Result<()> {
        self.record_store.server.normalize("record_store")?;
        self.cloud_proxy.server.normalize("cloud_proxy")?;
        if self.record_store.data_dir.trim().is_empty() {
            self.record_store.data_dir = default_data_dir();
        }
        self.cloud_proxy.normalize_from_env();
        self.cloud_proxy.validate()?;
        Ok(())
    }

    fn apply_env(&mut self) {
        let env = |k: &str| std::env::var(k).ok().filter(|v| !v.trim().is_empty());
        let port = |k: &str| env(k).and_then(|p| p.parse::<u16>().ok());
        let threads = env("TOKIO_WORKER_THREADS").and_then(|v| v.parse::<usize>().ok());

        if let Some(h) = env("RECORD_STORE_HOST") { self.record_store.server.host = h; }
        if let Some(p) = port("RECORD_STORE_PORT") { self.record_store.server.port = p; }
        if let Some(d) = env("RECORD_STORE_DATA_DIR") { self.record_store.data_dir = d; }
        if let Some(h) = env("CLOUD_PROXY_HOST") { self.cloud_proxy.server.host = h; }
        if let Some(p) = port("CLOUD_PROXY_PORT") { self.cloud_proxy.server.port = p; }
        if threads.is_some() {
            self.record_store.server.worker_threads = threads;
            self.cloud_proxy.server.worker_threads = threads;
        }
    }
}

fn is_not_found(e: &anyhow::Error) -> bool {
    e.downcast_ref::<std::io::Error>()
        .map(|io| io.kind() == std::io::ErrorKind::NotFound)
        .unwrap_or(false)
}

impl ServerConfig {
    fn normalize(&mut self, section: &str) -> Result<()> {
        if self.host.trim().is_empty() {
            self.host = "127.0.0.1".to_string();
        }
        if self.port == 0 {
            return Err(anyhow!("{section}.port must be in 1..=65535"));
        }
        match self.worker_threads {
            Some(0) | None => self.worker_threads = Some(4),
            Some(_) => {}
        }
        Ok(())
    }
}

impl CloudProxyConfig {
    pub fn normalize_from_env(&mut self) {
        // The AWS SDK reads AWS_REGION on its own; mirror it here so it is logged.
        if self.region.as_deref().map_or(true, |r| r.trim().is_empty()) {
            self.region = std::env::var("AWS_REGION").ok().filter(|r| !r.trim().is_empty());
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_AUDIT_PAGE_SIZE).contains(&self.audit_page_size) {
            return Err(anyhow!("cloud_proxy.audit_page_size must be in 1..={MAX_AUDIT_PAGE_SIZE}"));
        }
        Ok(())
    }
}
