//! Application bootstrap.
//!
//! ```rust,ignore
//! use mortar_runtime::Runtime;
//!
//! // Loads mortar.toml from the current directory plus MORTAR_* variables
//! let runtime = Runtime::new();
//!
//! // Or pick the sources explicitly
//! let runtime = Runtime::builder()
//!     .config_file("config/mortar.toml")
//!     .mode(Mode::Production)
//!     .build()?;
//!
//! let mut app = runtime.classic();
//! app.router().get("/", chain![index])?;
//! ```

use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::{ConfigLoader, ConfigResult, MortarConfig};
use crate::logging;
use mortar_core::Mode;
use mortar_framework::Application;

/// Loaded configuration plus initialized logging.
#[derive(Debug, Clone)]
pub struct Runtime {
    config: MortarConfig,
}

impl Runtime {
    /// Creates a runtime from the current directory and the environment.
    ///
    /// Falls back to default settings if the configuration cannot be loaded.
    pub fn new() -> Self {
        let config = ConfigLoader::new()
            .with_current_dir()
            .load()
            .unwrap_or_else(|e| {
                eprintln!("Warning: Failed to load config ({e}), using defaults");
                MortarConfig::default()
            });

        Self::from_config(config)
    }

    /// Creates a runtime builder for custom configuration.
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Creates a runtime from an already loaded configuration and
    /// initializes logging from it.
    pub fn from_config(config: MortarConfig) -> Self {
        logging::init_from_config(&config.logging);
        info!(
            mode = %config.env,
            addr = %config.server.bind_addr(),
            "Runtime initialized"
        );
        Self { config }
    }

    pub fn config(&self) -> &MortarConfig {
        &self.config
    }

    pub fn mode(&self) -> Mode {
        self.config.env
    }

    /// `host:port` the transport should listen on.
    pub fn bind_addr(&self) -> String {
        self.config.server.bind_addr()
    }

    /// A bare application with the configuration and mode bound.
    pub fn application(&self) -> Application {
        let mut app = Application::new();
        self.bind_config(&mut app);
        app
    }

    /// A classic application serving static files from the configured
    /// directory, with the configuration and mode bound.
    pub fn classic(&self) -> Application {
        let mut app = Application::classic_with_static(self.config.static_path());
        self.bind_config(&mut app);
        app
    }

    fn bind_config(&self, app: &mut Application) {
        app.bind(self.config.clone()).bind(self.config.env);
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder for creating a [`Runtime`] with custom configuration.
pub struct RuntimeBuilder {
    config_loader: ConfigLoader,
}

impl RuntimeBuilder {
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new().with_current_dir(),
        }
    }

    /// Sets a specific configuration file to load.
    pub fn config_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    /// Forces the mode instead of reading `MORTAR_ENV`.
    pub fn mode(mut self, mode: Mode) -> Self {
        self.config_loader = self.config_loader.mode(mode);
        self
    }

    /// Adds a search path for configuration files.
    pub fn search_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.search_path(path.into());
        self
    }

    /// Enables loading environment variables (enabled by default).
    pub fn with_env(mut self) -> Self {
        self.config_loader = self.config_loader.with_env();
        self
    }

    /// Disables loading environment variables.
    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    /// Merges additional configuration programmatically.
    pub fn merge(mut self, config: MortarConfig) -> Self {
        self.config_loader = self.config_loader.merge(config);
        self
    }

    /// Loads and validates the configuration, then builds the runtime.
    pub fn build(self) -> ConfigResult<Runtime> {
        let config = self.config_loader.load()?;
        Ok(Runtime::from_config(config))
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use mortar_core::{BufferedResponse, Dep, Request};
    use mortar_framework::chain;

    #[test]
    fn test_application_binds_config_and_mode() {
        Jail::expect_with(|jail| {
            let runtime = Runtime::builder()
                .search_path(jail.directory())
                .mode(Mode::Test)
                .without_env()
                .build()
                .unwrap();
            assert_eq!(runtime.mode(), Mode::Test);
            assert_eq!(runtime.bind_addr(), "0.0.0.0:4000");

            let app = runtime.application();
            let (mode, port) = app
                .invoke(|mode: Dep<Mode>, config: Dep<MortarConfig>| (*mode, config.server.port))
                .unwrap();
            assert_eq!(mode, Mode::Test);
            assert_eq!(port, 4000);
            Ok(())
        });
    }

    #[test]
    fn test_build_rejects_invalid_config() {
        let mut config = MortarConfig::default();
        config.server.port = 0;
        let result = Runtime::builder().without_env().merge(config).build();
        assert!(result.is_err());
    }

    #[test]
    fn test_classic_serves_configured_static_dir() {
        Jail::expect_with(|jail| {
            std::fs::create_dir_all(jail.directory().join("site").join("assets"))
                .map_err(|e| e.to_string())?;
            std::fs::write(
                jail.directory().join("site").join("assets").join("hello.txt"),
                "static hello",
            )
            .map_err(|e| e.to_string())?;

            let mut config = MortarConfig::default();
            config.root = jail.directory().join("site");
            config.static_dir = PathBuf::from("assets");
            let runtime = Runtime::builder()
                .search_path(jail.directory())
                .without_env()
                .merge(config)
                .build()
                .unwrap();

            let mut app = runtime.classic();
            app.router()
                .get("/dynamic", chain![|mode: Dep<Mode>| async move { mode.as_str() }])
                .unwrap();

            let file = BufferedResponse::new();
            let dynamic = BufferedResponse::new();
            tokio_test::block_on(async {
                app.serve(Request::get("/hello.txt"), file.clone()).await?;
                app.serve(Request::get("/dynamic"), dynamic.clone()).await
            })
            .unwrap();

            assert_eq!(file.body_text(), "static hello");
            assert_eq!(
                file.header("Content-Type").as_deref(),
                Some("text/plain; charset=utf-8")
            );
            assert_eq!(dynamic.body_text(), "development");
            Ok(())
        });
    }
}
