use crate::encode::DEFAULT_SEPARATOR;
use crate::error::{BasediffError, Result};
use crate::store::lark::DEFAULT_BASE_URL;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "basediff.toml";
pub const DEFAULT_PAGE_SIZE: usize = 100;
pub const DEFAULT_BATCH_SIZE: usize = 50;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfigToml,
    #[serde(default)]
    pub compare: CompareConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompareConfig {
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_separator")]
    pub separator: String,
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_separator() -> String {
    DEFAULT_SEPARATOR.to_string()
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            batch_size: DEFAULT_BATCH_SIZE,
            separator: DEFAULT_SEPARATOR.to_string(),
        }
    }
}

impl CompareConfig {
    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(BasediffError::config("compare.page_size must be greater than zero"));
        }
        if self.batch_size == 0 {
            return Err(BasediffError::config("compare.batch_size must be greater than zero"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Local,
    Lark,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalStoreConfig {
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LarkStoreConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    pub app_token: String,
    pub app_id: String,
    /// Environment variable containing the app secret
    #[serde(default = "default_app_secret_env")]
    pub app_secret_env: String,
    /// Table reported as the current selection
    pub default_table: Option<String>,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_app_secret_env() -> String {
    "LARK_APP_SECRET".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfigToml {
    #[serde(default)]
    pub backend: StoreBackend,
    #[serde(default)]
    pub local: Option<LocalStoreConfig>,
    #[serde(default)]
    pub lark: Option<LarkStoreConfig>,
}

// Runtime config, with the secret pulled from the environment
#[derive(Debug, Clone)]
pub enum StoreConfig {
    Local {
        path: PathBuf,
    },
    Lark {
        base_url: String,
        app_token: String,
        app_id: String,
        app_secret: Option<String>,
        default_table: Option<String>,
    },
}

impl Default for LocalStoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("base.json"),
        }
    }
}

impl Default for StoreConfigToml {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            local: Some(LocalStoreConfig::default()),
            lark: None,
        }
    }
}

impl StoreConfigToml {
    pub fn to_runtime(&self) -> Result<StoreConfig> {
        match self.backend {
            StoreBackend::Local => {
                let default_local = LocalStoreConfig::default();
                let local = self.local.as_ref().unwrap_or(&default_local);
                Ok(StoreConfig::Local {
                    path: local.path.clone(),
                })
            }
            StoreBackend::Lark => {
                let lark = self.lark.as_ref().ok_or_else(|| {
                    BasediffError::config(
                        "store.backend is \"lark\" but there is no [store.lark] section",
                    )
                })?;
                Ok(StoreConfig::Lark {
                    base_url: lark.base_url.clone(),
                    app_token: lark.app_token.clone(),
                    app_id: lark.app_id.clone(),
                    app_secret: env::var(&lark.app_secret_env).ok(),
                    default_table: lark.default_table.clone(),
                })
            }
        }
    }
}

/// Where the effective configuration came from
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigSource {
    EnvironmentVariable(PathBuf),
    CurrentDirectory(PathBuf),
    Global(PathBuf),
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EnvironmentVariable(p) => write!(f, "BASEDIFF_CONFIG ({})", p.display()),
            Self::CurrentDirectory(p) => write!(f, "current directory ({})", p.display()),
            Self::Global(p) => write!(f, "global ({})", p.display()),
            Self::Default => write!(f, "built-in defaults"),
        }
    }
}

pub fn global_config_path() -> PathBuf {
    let config_dir = if let Some(home_dir) = dirs::home_dir() {
        home_dir.join(".basediff")
    } else {
        PathBuf::from(".basediff")
    };
    config_dir.join("global.toml")
}

pub fn load_config_file(path: &Path) -> Result<Config> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str::<Config>(&content)?)
}

pub fn get_config() -> Result<Config> {
    Ok(get_config_with_source()?.0)
}

/// Resolve configuration. Priority (highest first):
/// 1. File named by BASEDIFF_CONFIG
/// 2. basediff.toml in the current directory
/// 3. ~/.basediff/global.toml
/// 4. Built-in defaults
pub fn get_config_with_source() -> Result<(Config, ConfigSource)> {
    let (mut config, source) = if let Ok(config_path) = env::var("BASEDIFF_CONFIG") {
        let path = PathBuf::from(config_path);
        (load_config_file(&path)?, ConfigSource::EnvironmentVariable(path))
    } else {
        let local_path = env::current_dir()?.join(CONFIG_FILE_NAME);
        let global_path = global_config_path();
        if local_path.exists() {
            (load_config_file(&local_path)?, ConfigSource::CurrentDirectory(local_path))
        } else if global_path.exists() {
            (load_config_file(&global_path)?, ConfigSource::Global(global_path))
        } else {
            (Config::default(), ConfigSource::Default)
        }
    };

    apply_env_overrides(&mut config.compare)?;
    config.compare.validate()?;
    log::debug!("Configuration loaded from {source}");
    Ok((config, source))
}

fn apply_env_overrides(compare: &mut CompareConfig) -> Result<()> {
    if let Ok(value) = env::var("BASEDIFF_PAGE_SIZE") {
        compare.page_size = value
            .parse()
            .map_err(|_| {
                BasediffError::config(format!("BASEDIFF_PAGE_SIZE is not a number: {value}"))
            })?;
    }
    if let Ok(value) = env::var("BASEDIFF_BATCH_SIZE") {
        compare.batch_size = value
            .parse()
            .map_err(|_| {
                BasediffError::config(format!("BASEDIFF_BATCH_SIZE is not a number: {value}"))
            })?;
    }
    Ok(())
}

pub fn save_config_to(config: &Config, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let content = toml::to_string_pretty(config)?;
    fs::write(path, content)?;
    Ok(())
}

/// Replace the store section of the workspace (or global) config file, keeping the rest
pub fn save_store_config(store: StoreConfigToml, global: bool) -> Result<PathBuf> {
    let path = if global {
        global_config_path()
    } else {
        env::current_dir()?.join(CONFIG_FILE_NAME)
    };
    let mut config = if path.exists() {
        load_config_file(&path)?
    } else {
        Config::default()
    };
    config.store = store;
    save_config_to(&config, &path)?;
    Ok(path)
}
