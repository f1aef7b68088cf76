//! Structured logging setup for the engine.
//!
//! Producers log through `tracing`; this module turns a [`LoggingConfig`]
//! into subscriber filter directives and installs the global subscriber for
//! the binary. Library embedders install their own subscriber instead.

use crate::config::{LogFormat, LoggingConfig};

/// Build filter directives string from LoggingConfig.
///
/// Constructs a tracing filter string that includes the base log level and
/// any component-specific levels, e.g. "info,proofpop::rotator=debug".
pub fn build_filter_directives(config: &LoggingConfig) -> String {
    let mut filter_str = config.level.clone();

    if let Some(component_levels) = &config.component_levels {
        for (component, level) in component_levels {
            filter_str.push_str(&format!(",proofpop::{}={}", component, level));
        }
    }

    filter_str
}

/// Install the global tracing subscriber per the logging configuration.
///
/// Returns an error string if a subscriber is already set.
pub fn init(config: &LoggingConfig) -> Result<(), String> {
    let filter = tracing_subscriber::EnvFilter::try_new(build_filter_directives(config))
        .map_err(|e| format!("invalid log filter: {e}"))?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let result = match config.format {
        LogFormat::Pretty => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };

    result.map_err(|e| format!("failed to install subscriber: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn base_level_only() {
        let config = LoggingConfig::default();
        assert_eq!(build_filter_directives(&config), "info");
    }

    #[test]
    fn component_levels_are_appended() {
        let mut component_levels = HashMap::new();
        component_levels.insert("rotator".to_string(), "debug".to_string());

        let config = LoggingConfig {
            level: "warn".to_string(),
            component_levels: Some(component_levels),
            ..Default::default()
        };

        assert_eq!(
            build_filter_directives(&config),
            "warn,proofpop::rotator=debug"
        );
    }
}
