//! Configuration validation utilities.

use super::error::{ConfigError, ConfigResult};
use super::schema::{AlyxConfig, BotConfig, LogOutput, LoggingConfig, ShutdownConfig};

/// Validates the entire configuration.
pub fn validate_config(config: &AlyxConfig) -> ConfigResult<()> {
    validate_bot_config(&config.bot)?;
    validate_shutdown_config(&config.shutdown)?;
    validate_logging_config(&config.logging)?;
    Ok(())
}

fn validate_bot_config(bot: &BotConfig) -> ConfigResult<()> {
    if bot.command_prefix.trim().is_empty() {
        return Err(ConfigError::validation("Command prefix must not be empty"));
    }

    Ok(())
}

fn validate_shutdown_config(shutdown: &ShutdownConfig) -> ConfigResult<()> {
    if shutdown.plugin_timeout_secs == 0 {
        return Err(ConfigError::validation(
            "Plugin shutdown timeout must be greater than 0",
        ));
    }

    if shutdown.waiter_timeout_secs == 0 {
        return Err(ConfigError::validation(
            "Event waiter shutdown timeout must be greater than 0",
        ));
    }

    Ok(())
}

fn validate_logging_config(logging: &LoggingConfig) -> ConfigResult<()> {
    if logging.output == LogOutput::File && logging.file_path.is_none() {
        return Err(ConfigError::validation(
            "logging.file_path is required when logging.output is \"file\"",
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(validate_config(&AlyxConfig::default()).is_ok());
    }

    #[test]
    fn test_rejects_empty_prefix() {
        let mut config = AlyxConfig::default();
        config.bot.command_prefix = "  ".into();
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError { .. }));
    }

    #[test]
    fn test_rejects_zero_timeouts() {
        let mut config = AlyxConfig::default();
        config.shutdown.plugin_timeout_secs = 0;
        assert!(validate_config(&config).is_err());

        let mut config = AlyxConfig::default();
        config.shutdown.waiter_timeout_secs = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_file_output_needs_path() {
        let mut config = AlyxConfig::default();
        config.logging.output = LogOutput::File;
        assert!(validate_config(&config).is_err());

        config.logging.file_path = Some("alyx.log".into());
        assert!(validate_config(&config).is_ok());
    }
}
