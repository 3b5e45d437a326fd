//! Configuration loader using figment.
//!
//! # Feature Flags
//!
//! - `toml-config` *(default)*: enables TOML configuration files (`mortar.toml`)
//! - `yaml-config`: enables YAML configuration files (`mortar.yaml`, `mortar.yml`)
//!
//! # Configuration Priority (lowest to highest)
//!
//! 1. Built-in defaults
//! 2. Programmatic overrides ([`ConfigLoader::merge`])
//! 3. Main config file (`mortar.toml` / `mortar.yaml`)
//! 4. Mode-specific config file (`mortar.{mode}.toml` / `mortar.{mode}.yaml`)
//! 5. `HOST` and `PORT`
//! 6. Environment variables (`MORTAR_*`)
//!
//! # Environment Variable Mapping
//!
//! Environment variables use the `MORTAR_` prefix with `__` as separator:
//!
//! - `MORTAR_ENV=production` → `env = "production"`
//! - `MORTAR_SERVER__PORT=8080` → `server.port = 8080`
//! - `MORTAR_LOGGING__FILTERS__MORTAR_FRAMEWORK=debug` → `logging.filters.mortar_framework = "debug"`
//!
//! # Example
//!
//! ```rust,ignore
//! use mortar_runtime::config::ConfigLoader;
//!
//! let config = ConfigLoader::new()
//!     .file("./config/mortar.toml")
//!     .mode(Mode::Production)
//!     .load()?;
//! ```

use std::path::{Path, PathBuf};

use figment::Figment;
#[cfg(any(feature = "yaml-config", feature = "toml-config"))]
use figment::providers::Format;
#[cfg(feature = "toml-config")]
use figment::providers::Toml;
#[cfg(feature = "yaml-config")]
use figment::providers::Yaml;
use figment::providers::{Env, Serialized};
use mortar_core::Mode;
use tracing::{debug, info, trace, warn};

use super::error::{ConfigError, ConfigResult};
use super::schema::MortarConfig;
use super::validation::validate_config;

/// Variables read without the `MORTAR_` prefix.
const PLAIN_ENV_KEYS: [&str; 2] = ["HOST", "PORT"];

/// Configuration loader with figment-based multi-source support.
pub struct ConfigLoader {
    figment: Figment,
    /// Explicit mode; `MORTAR_ENV` is used when unset.
    mode: Option<Mode>,
    search_paths: Vec<PathBuf>,
    load_env: bool,
    /// Specific config file to load (overrides search).
    config_file: Option<PathBuf>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            figment: Figment::new(),
            mode: None,
            search_paths: Vec::new(),
            load_env: true,
            config_file: None,
        }
    }

    /// Forces the mode, ignoring `MORTAR_ENV`.
    pub fn mode(mut self, mode: Mode) -> Self {
        self.mode = Some(mode);
        self
    }

    /// Adds a search path for configuration files.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.search_paths.push(path.as_ref().to_path_buf());
        self
    }

    /// Adds current directory to search paths.
    pub fn with_current_dir(self) -> Self {
        if let Ok(cwd) = std::env::current_dir() {
            self.search_path(cwd)
        } else {
            self
        }
    }

    /// Adds user config directory to search paths.
    pub fn with_user_config_dir(self) -> Self {
        if let Some(config_dir) = dirs::config_dir() {
            self.search_path(config_dir.join("mortar"))
        } else {
            self
        }
    }

    /// Sets a specific configuration file to load.
    pub fn file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Enables loading environment variables (default: true).
    pub fn with_env(mut self) -> Self {
        self.load_env = true;
        self
    }

    /// Disables loading environment variables.
    pub fn without_env(mut self) -> Self {
        self.load_env = false;
        self
    }

    /// Merges additional configuration programmatically.
    pub fn merge(mut self, config: MortarConfig) -> Self {
        self.figment = self.figment.merge(Serialized::defaults(config));
        self
    }

    /// Loads, validates and returns the configuration.
    pub fn load(self) -> ConfigResult<MortarConfig> {
        let explicit = self.mode;
        let mode = self.resolve_mode();
        let figment = self.build_figment(mode)?;

        let mut config: MortarConfig = figment.extract().map_err(|e| {
            ConfigError::ParseError(format!("Failed to extract configuration: {e}"))
        })?;
        if let Some(mode) = explicit {
            config.env = mode;
        }
        validate_config(&config)?;

        debug!(
            mode = %config.env,
            addr = %config.server.bind_addr(),
            logging_level = %config.logging.level,
            "Configuration loaded successfully"
        );

        Ok(config)
    }

    fn resolve_mode(&self) -> Mode {
        match self.mode {
            Some(mode) => mode,
            None if self.load_env => Mode::from_env(),
            None => Mode::default(),
        }
    }

    /// Builds the figment instance with all sources.
    fn build_figment(mut self, mode: Mode) -> ConfigResult<Figment> {
        let defaults = MortarConfig {
            env: mode,
            ..MortarConfig::default()
        };
        let mut figment = Figment::from(Serialized::defaults(defaults));

        let user_figment = std::mem::take(&mut self.figment);
        figment = figment.merge(user_figment);

        if let Some(path) = self.config_file.take() {
            if path.exists() {
                info!(path = %path.display(), "Loading configuration file");
                figment = Self::merge_config_file(figment, &path)?;
            } else {
                return Err(ConfigError::FileNotFound(path));
            }
        } else {
            figment = self.load_config_files(figment, mode);
        }

        if self.load_env {
            trace!("Loading HOST, PORT and MORTAR_ environment variables");
            figment = figment
                .merge(
                    Env::raw()
                        .only(&PLAIN_ENV_KEYS)
                        .map(|key| format!("server.{}", key.as_str().to_ascii_lowercase()).into()),
                )
                .merge(Env::prefixed("MORTAR_").split("__"));
        }

        Ok(figment)
    }

    /// Merges a single config file into the figment, dispatching on file extension.
    ///
    /// Only extensions enabled via feature flags are accepted.
    fn merge_config_file(figment: Figment, path: &Path) -> ConfigResult<Figment> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        match ext {
            #[cfg(feature = "toml-config")]
            "toml" => Ok(figment.merge(Toml::file(path))),
            #[cfg(feature = "yaml-config")]
            "yaml" | "yml" => Ok(figment.merge(Yaml::file(path))),
            _ => Err(ConfigError::ParseError(format!(
                "Unsupported or disabled configuration file format: .{ext}"
            ))),
        }
    }

    fn resolve_search_paths(&self) -> Vec<PathBuf> {
        if self.search_paths.is_empty() {
            let mut paths = Vec::new();
            if let Ok(cwd) = std::env::current_dir() {
                paths.push(cwd);
            }
            if let Some(config_dir) = dirs::config_dir() {
                paths.push(config_dir.join("mortar"));
            }
            paths
        } else {
            self.search_paths.clone()
        }
    }

    /// Searches one file format.
    ///
    /// The first search path holding a base file wins; its mode-specific
    /// variant, if present, is merged on top of it.
    #[cfg(any(feature = "toml-config", feature = "yaml-config"))]
    fn load_format_files<F>(
        mut figment: Figment,
        search_paths: &[PathBuf],
        extensions: &[&str],
        mode: Mode,
        merge_fn: F,
    ) -> (Figment, bool)
    where
        F: Fn(Figment, &Path) -> Figment,
    {
        for search_path in search_paths {
            for ext in extensions {
                let base_path = search_path.join(format!("mortar.{ext}"));
                if !base_path.exists() {
                    continue;
                }
                info!(path = %base_path.display(), "Loading configuration file");
                figment = merge_fn(figment, &base_path);

                let mode_path = search_path.join(format!("mortar.{}.{ext}", mode.as_str()));
                if mode_path.exists() {
                    debug!(path = %mode_path.display(), "Loading mode-specific config");
                    figment = merge_fn(figment, &mode_path);
                }
                return (figment, true);
            }
        }
        (figment, false)
    }

    /// Searches for and loads configuration files from search paths.
    fn load_config_files(&self, figment: Figment, mode: Mode) -> Figment {
        #[allow(unused_mut)]
        let mut figment = figment;
        #[allow(unused_mut)]
        let mut found = false;

        #[cfg(any(feature = "toml-config", feature = "yaml-config"))]
        let search_paths = self.resolve_search_paths();

        #[cfg(feature = "toml-config")]
        {
            let (f, ok) = Self::load_format_files(figment, &search_paths, &["toml"], mode, |fig, path| {
                fig.merge(Toml::file(path))
            });
            figment = f;
            found |= ok;
        }

        #[cfg(feature = "yaml-config")]
        {
            let (f, ok) =
                Self::load_format_files(figment, &search_paths, &["yaml", "yml"], mode, |fig, path| {
                    fig.merge(Yaml::file(path))
                });
            figment = f;
            found |= ok;
        }

        if !found {
            warn!(%mode, "No configuration file found, using defaults");
        }
        figment
    }
}

/// Loads configuration from the current directory and the environment.
pub fn load_config() -> ConfigResult<MortarConfig> {
    ConfigLoader::new().with_current_dir().load()
}

/// Loads configuration from `path` and the environment.
pub fn load_config_from_file<P: AsRef<Path>>(path: P) -> ConfigResult<MortarConfig> {
    ConfigLoader::new().file(path).load()
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogLevel;
    use figment::Jail;

    #[test]
    fn test_default_config() {
        Jail::expect_with(|jail| {
            let config = ConfigLoader::new()
                .search_path(jail.directory())
                .without_env()
                .load()
                .unwrap();

            assert_eq!(config, MortarConfig::default());
            Ok(())
        });
    }

    #[test]
    fn test_env_overrides_defaults() {
        Jail::expect_with(|jail| {
            jail.set_env("MORTAR_ENV", "production");
            jail.set_env("MORTAR_SERVER__HOST", "127.0.0.1");
            jail.set_env("PORT", "8080");

            let config = ConfigLoader::new()
                .search_path(jail.directory())
                .load()
                .unwrap();

            assert_eq!(config.env, Mode::Production);
            assert_eq!(config.server.bind_addr(), "127.0.0.1:8080");
            Ok(())
        });
    }

    #[test]
    fn test_prefixed_port_wins_over_plain_port() {
        Jail::expect_with(|jail| {
            jail.set_env("PORT", "8080");
            jail.set_env("MORTAR_SERVER__PORT", "9090");

            let config = ConfigLoader::new()
                .search_path(jail.directory())
                .load()
                .unwrap();

            assert_eq!(config.server.port, 9090);
            Ok(())
        });
    }

    #[test]
    fn test_explicit_mode_ignores_env() {
        Jail::expect_with(|jail| {
            jail.set_env("MORTAR_ENV", "production");

            let config = ConfigLoader::new()
                .search_path(jail.directory())
                .mode(Mode::Test)
                .load()
                .unwrap();

            assert_eq!(config.env, Mode::Test);
            Ok(())
        });
    }

    #[cfg(feature = "toml-config")]
    #[test]
    fn test_mode_file_layers_over_base_file() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "mortar.toml",
                r#"
                static_dir = "assets"

                [server]
                port = 5000

                [logging]
                level = "debug"
                "#,
            )?;
            jail.create_file(
                "mortar.production.toml",
                r#"
                [server]
                port = 80
                "#,
            )?;
            jail.set_env("MORTAR_ENV", "production");

            let config = ConfigLoader::new()
                .search_path(jail.directory())
                .load()
                .unwrap();

            assert_eq!(config.server.port, 80);
            assert_eq!(config.static_dir, PathBuf::from("assets"));
            assert_eq!(config.logging.level, LogLevel::Debug);
            Ok(())
        });
    }

    #[cfg(feature = "toml-config")]
    #[test]
    fn test_explicit_file() {
        Jail::expect_with(|jail| {
            jail.create_file("custom.toml", "root = \"/srv/app\"")?;

            let config = ConfigLoader::new()
                .file(jail.directory().join("custom.toml"))
                .without_env()
                .load()
                .unwrap();

            assert_eq!(config.static_path(), PathBuf::from("/srv/app/public"));
            Ok(())
        });
    }

    #[test]
    fn test_missing_file() {
        let result = ConfigLoader::new()
            .file("/definitely/not/here/mortar.toml")
            .without_env()
            .load();
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        Jail::expect_with(|jail| {
            jail.set_env("MORTAR_SERVER__PORT", "0");

            let result = ConfigLoader::new().search_path(jail.directory()).load();
            assert!(matches!(result, Err(ConfigError::InvalidPort(0))));
            Ok(())
        });
    }
}
