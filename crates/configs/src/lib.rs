use anyhow::Result;
use serde::Deserialize;
use anyhow::anyhow;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub registration: RegistrationConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub password: PasswordConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub worker_threads: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "127.0.0.1".into(), port: 8080, worker_threads: Some(4) }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
    #[serde(default = "default_max_lifetime")]
    pub max_lifetime_secs: u64,
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_secs: u64,
    #[serde(default)]
    pub sqlx_logging: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connect_timeout_secs: default_connect_timeout(),
            idle_timeout_secs: default_idle_timeout(),
            max_lifetime_secs: default_max_lifetime(),
            acquire_timeout_secs: default_acquire_timeout(),
            sqlx_logging: false,
        }
    }
}

fn default_max_connections() -> u32 { 10 }
fn default_min_connections() -> u32 { 2 }
fn default_connect_timeout() -> u64 { 30 }
fn default_idle_timeout() -> u64 { 600 }
fn default_max_lifetime() -> u64 { 3600 }
fn default_acquire_timeout() -> u64 { 30 }

/// Reseller onboarding settings: fee, subdomain policy and client redirects.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RegistrationConfig {
    /// Registration fee in whole currency units.
    pub fee: i64,
    pub currency: String,
    pub max_subdomain_attempts: u32,
    pub subdomain_max_len: usize,
    /// Hash the password before it is staged in the pending payment.
    pub hash_eagerly: bool,
    pub success_redirect: String,
    pub wallet_success_redirect: String,
    pub error_redirect: String,
    pub store_base_domain: String,
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        Self {
            fee: 1000,
            currency: "BDT".into(),
            max_subdomain_attempts: 1000,
            subdomain_max_len: 20,
            hash_eagerly: true,
            success_redirect: "/auth/reseller/register/success".into(),
            wallet_success_redirect: "/reseller/wallet?status=success".into(),
            error_redirect: "/orders/error".into(),
            store_base_domain: "yourdomain.com".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub base_url: String,
    pub app_key: String,
    pub app_secret: String,
    pub callback_url: String,
    /// Shared secret expected in `x-gateway-signature` on outcome callbacks.
    pub callback_secret: Option<String>,
    pub timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: "https://tokenized.sandbox.bka.sh/v1.2.0-beta/tokenized".into(),
            app_key: String::new(),
            app_secret: String::new(),
            callback_url: "http://127.0.0.1:8080/payments/callback".into(),
            callback_secret: None,
            timeout_secs: 15,
        }
    }
}

/// Argon2id cost parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PasswordConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self { memory_kib: 19 * 1024, iterations: 2, parallelism: 1 }
    }
}

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
    pub fn load_and_validate() -> Result<Self> {
        let mut cfg = load_default()?;
        cfg.normalize_and_validate()?;
        Ok(cfg)
    }

    /// Config file when present, otherwise defaults filled from the environment.
    pub fn load_or_env() -> Result<Self> {
        let mut cfg = load_default().unwrap_or_default();
        cfg.server.apply_env();
        cfg.gateway.apply_env();
        cfg.normalize_and_validate()?;
        Ok(cfg)
    }

    pub fn normalize_and_validate(&mut self) -> Result<()> {
        self.server.normalize()?;
        self.database.normalize_from_env();
        self.database.validate()?;
        self.registration.validate()?;
        self.password.validate()?;
        Ok(())
    }
}

impl ServerConfig {
    fn apply_env(&mut self) {
        if let Ok(host) = std::env::var("SERVER_HOST") {
            self.host = host;
        }
        if let Some(port) = std::env::var("SERVER_PORT").ok().and_then(|p| p.parse::<u16>().ok()) {
            self.port = port;
        }
    }

    fn normalize(&mut self) -> Result<()> {
        if self.host.trim().is_empty() {
            self.host = "127.0.0.1".to_string();
        }
        if self.port == 0 {
            return Err(anyhow!("server.port must be in 1..=65535"));
        }
        if let Some(w) = self.worker_threads {
            if w == 0 { self.worker_threads = Some(4); }
        } else {
            self.worker_threads = Some(4);
        }
        Ok(())
    }
}

impl DatabaseConfig {
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        cfg.normalize_from_env();
        cfg
    }

    pub fn normalize_from_env(&mut self) {
        if self.url.trim().is_empty() {
            if let Ok(url) = std::env::var("DATABASE_URL") {
                self.url = url;
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(anyhow!("database.url is empty; set it in config.toml or DATABASE_URL"));
        }
        let lower = self.url.to_lowercase();
        if !(lower.starts_with("postgresql://") || lower.starts_with("postgres://")) {
            return Err(anyhow!("database.url must start with postgresql:// or postgres://"));
        }
        if self.min_connections == 0 {
            return Err(anyhow!("database.min_connections must be >= 1"));
        }
        if self.max_connections < self.min_connections {
            return Err(anyhow!("database.max_connections must be >= min_connections"));
        }
        if self.connect_timeout_secs == 0 || self.acquire_timeout_secs == 0 {
            return Err(anyhow!("database timeouts must be positive seconds"));
        }
        Ok(())
    }
}

impl RegistrationConfig {
    pub fn validate(&self) -> Result<()> {
        if self.fee <= 0 {
            return Err(anyhow!("registration.fee must be positive"));
        }
        if self.currency.trim().is_empty() {
            return Err(anyhow!("registration.currency is empty"));
        }
        if self.max_subdomain_attempts == 0 {
            return Err(anyhow!("registration.max_subdomain_attempts must be >= 1"));
        }
        if self.subdomain_max_len == 0 || self.subdomain_max_len > 63 {
            return Err(anyhow!("registration.subdomain_max_len must be in 1..=63"));
        }
        Ok(())
    }
}

impl GatewayConfig {
    fn apply_env(&mut self) {
        if let Ok(v) = std::env::var("GATEWAY_BASE_URL") { self.base_url = v; }
        if let Ok(v) = std::env::var("GATEWAY_APP_KEY") { self.app_key = v; }
        if let Ok(v) = std::env::var("GATEWAY_APP_SECRET") { self.app_secret = v; }
        if let Ok(v) = std::env::var("GATEWAY_CALLBACK_URL") { self.callback_url = v; }
        if let Ok(v) = std::env::var("GATEWAY_CALLBACK_SECRET") { self.callback_secret = Some(v); }
    }
}

impl PasswordConfig {
    pub fn validate(&self) -> Result<()> {
        if self.iterations == 0 || self.parallelism == 0 {
            return Err(anyhow!("password.iterations and password.parallelism must be >= 1"));
        }
        if self.memory_kib < 8 * self.parallelism {
            return Err(anyhow!("password.memory_kib must be at least 8 * parallelism"));
        }
        Ok(())
    }
}
