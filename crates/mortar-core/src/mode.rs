//! Operating mode of an application.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Environment variable that selects the [`Mode`].
pub const MODE_ENV_VAR: &str = "MORTAR_ENV";

/// The mode an application runs in.
///
/// The mode is read once at startup and bound into the application registry.
/// The core never branches on it; collaborators such as the recovery
/// middleware use it to decide how much detail to expose.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Local development (default).
    #[default]
    #[serde(alias = "dev")]
    Development,
    /// Production deployment.
    #[serde(alias = "prod")]
    Production,
    /// Automated tests.
    Test,
}

impl Mode {
    /// Returns the canonical name of this mode.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Test => "test",
        }
    }

    /// Reads the mode from `MORTAR_ENV`, falling back to development.
    pub fn from_env() -> Self {
        std::env::var(MODE_ENV_VAR)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or_default()
    }

    /// Returns `true` in development mode.
    pub fn is_development(self) -> bool {
        self == Self::Development
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            "test" => Ok(Self::Test),
            other => Err(format!("unknown mode: {other}")),
        }
    }
}
