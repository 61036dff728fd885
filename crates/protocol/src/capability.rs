use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Requested execution path, as written in configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum BackendPreference {
    /// Use the circuit simulator when it is compiled in.
    #[default]
    Auto,
    Simulator,
    Classical,
}

/// Execution path resolved once at startup and handed to every component that
/// needs it.
///
/// `Classical` is what an unavailable backend degrades to; it is a normal
/// value, never an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum BackendCapability {
    Simulator,
    Classical,
}

impl BackendCapability {
    #[must_use]
    pub fn resolve(preference: BackendPreference, simulator_available: bool) -> Self {
        match preference {
            BackendPreference::Classical => Self::Classical,
            BackendPreference::Auto if simulator_available => Self::Simulator,
            BackendPreference::Auto => Self::Classical,
            BackendPreference::Simulator if simulator_available => Self::Simulator,
            BackendPreference::Simulator => {
                log::warn!("Circuit simulator requested but not compiled in; using classical path");
                Self::Classical
            }
        }
    }

    #[must_use]
    pub const fn is_simulator(self) -> bool {
        matches!(self, Self::Simulator)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Simulator => "simulator",
            Self::Classical => "classical",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_follows_availability() {
        assert_eq!(
            BackendCapability::resolve(BackendPreference::Auto, true),
            BackendCapability::Simulator
        );
        assert_eq!(
            BackendCapability::resolve(BackendPreference::Auto, false),
            BackendCapability::Classical
        );
    }

    #[test]
    fn missing_simulator_degrades_silently() {
        assert_eq!(
            BackendCapability::resolve(BackendPreference::Simulator, false),
            BackendCapability::Classical
        );
        assert_eq!(
            BackendCapability::resolve(BackendPreference::Classical, true),
            BackendCapability::Classical
        );
    }
}
