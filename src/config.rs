use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::services::registry::InstanceEntry;

const DEFAULT_CONFIG_PATH: &str = "config.toml";
const CONFIG_PATH_ENV: &str = "BRIDGE_CONFIG";
const ENV_PREFIX: &str = "BRIDGE_";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse TOML config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("failed to read environment overrides: {0}")]
    Env(#[from] envy::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub poller: PollerConfig,
    pub query: QueryConfig,
    pub logging: LoggingConfig,
    pub backend: BackendConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8500)),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PollerConfig {
    /// 轮询间隔（秒）
    pub interval_secs: u64,
    /// 同一轮中并发查询实例的服务数上限
    pub lookup_concurrency: usize,
    /// 单个服务实例查询的超时（秒）
    pub lookup_timeout_secs: u64,
}

impl PollerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_secs(self.lookup_timeout_secs)
    }
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval_secs: 10,
            lookup_concurrency: 8,
            lookup_timeout_secs: 5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// 请求未携带 wait 时的等待时长（秒）
    pub default_wait_secs: u64,
    /// wait 的上限（秒）
    pub max_wait_secs: u64,
    /// false 时忽略 index/wait，每次都立即返回
    pub blocking: bool,
}

impl QueryConfig {
    pub fn default_wait(&self) -> Duration {
        Duration::from_secs(self.default_wait_secs)
    }

    pub fn max_wait(&self) -> Duration {
        Duration::from_secs(self.max_wait_secs)
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        // 与 Consul 一致：默认 5 分钟，最长 10 分钟
        Self {
            default_wait_secs: 300,
            max_wait_secs: 600,
            blocking: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackendConfig {
    /// 进程内注册表，可选地用静态服务列表初始化
    Memory {
        #[serde(default)]
        services: BTreeMap<String, Vec<InstanceEntry>>,
    },
    /// 每轮重新读取的 TOML 注册表文件
    File { path: PathBuf },
}

impl Default for BackendConfig {
    fn default() -> Self {
        BackendConfig::Memory {
            services: BTreeMap::new(),
        }
    }
}

// BRIDGE_* 环境变量覆盖
#[derive(Debug, Default, Deserialize)]
struct EnvOverrides {
    listen_addr: Option<SocketAddr>,
    poll_interval_secs: Option<u64>,
    lookup_concurrency: Option<usize>,
    lookup_timeout_secs: Option<u64>,
    default_wait_secs: Option<u64>,
    max_wait_secs: Option<u64>,
    blocking: Option<bool>,
    log_level: Option<String>,
    registry_file: Option<PathBuf>,
}

/// 配置的来源，日志系统初始化后由调用方记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    /// 隐式的 `config.toml` 不存在，使用默认值
    Defaults { missing: PathBuf },
}

impl Config {
    /// 读取 `BRIDGE_CONFIG` 指向的文件（未设置时读取 `config.toml`），
    /// 再叠加 `BRIDGE_*` 环境变量
    pub fn load() -> Result<(Self, ConfigSource), ConfigError> {
        let explicit = std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from);
        let (mut config, source) = Self::resolve(explicit, Path::new(DEFAULT_CONFIG_PATH))?;

        let overrides = envy::prefixed(ENV_PREFIX).from_env::<EnvOverrides>()?;
        config.apply(overrides);
        config.validate()?;
        Ok((config, source))
    }

    /// 显式给出的路径必须存在；只有隐式的 `fallback` 缺失时才退回默认值
    pub fn resolve(
        explicit: Option<PathBuf>,
        fallback: &Path,
    ) -> Result<(Self, ConfigSource), ConfigError> {
        match explicit {
            Some(path) => Ok((Self::from_file(&path)?, ConfigSource::File(path))),
            None if fallback.exists() => Ok((
                Self::from_file(fallback)?,
                ConfigSource::File(fallback.to_path_buf()),
            )),
            None => Ok((
                Self::default(),
                ConfigSource::Defaults {
                    missing: fallback.to_path_buf(),
                },
            )),
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let p = path.as_ref();
        let config_str = fs::read_to_string(p).map_err(|source| ConfigError::Io {
            path: p.display().to_string(),
            source,
        })?;
        Self::from_toml(&config_str)
    }

    pub fn from_toml(config_str: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(config_str)?;
        config.validate()?;
        Ok(config)
    }

    fn apply(&mut self, overrides: EnvOverrides) {
        if let Some(addr) = overrides.listen_addr {
            self.server.listen_addr = addr;
        }
        if let Some(secs) = overrides.poll_interval_secs {
            self.poller.interval_secs = secs;
        }
        if let Some(n) = overrides.lookup_concurrency {
            self.poller.lookup_concurrency = n;
        }
        if let Some(secs) = overrides.lookup_timeout_secs {
            self.poller.lookup_timeout_secs = secs;
        }
        if let Some(secs) = overrides.default_wait_secs {
            self.query.default_wait_secs = secs;
        }
        if let Some(secs) = overrides.max_wait_secs {
            self.query.max_wait_secs = secs;
        }
        if let Some(blocking) = overrides.blocking {
            self.query.blocking = blocking;
        }
        if let Some(level) = overrides.log_level {
            self.logging.level = level;
        }
        if let Some(path) = overrides.registry_file {
            self.backend = BackendConfig::File { path };
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poller.interval_secs == 0 {
            return Err(ConfigError::Invalid("poller.interval_secs must be > 0".into()));
        }
        if self.poller.lookup_concurrency == 0 {
            return Err(ConfigError::Invalid("poller.lookup_concurrency must be > 0".into()));
        }
        if self.poller.lookup_timeout_secs == 0 {
            return Err(ConfigError::Invalid("poller.lookup_timeout_secs must be > 0".into()));
        }
        if self.query.default_wait_secs > self.query.max_wait_secs {
            return Err(ConfigError::Invalid(format!(
                "query.default_wait_secs ({}) exceeds query.max_wait_secs ({})",
                self.query.default_wait_secs, self.query.max_wait_secs
            )));
        }
        Ok(())
    }
}
