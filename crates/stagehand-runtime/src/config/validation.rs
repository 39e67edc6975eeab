//! Configuration validation utilities.

use stagehand_framework::{SessionBackendKind, SessionConfig};

use super::error::{ConfigError, ConfigResult};
use super::schema::{BotConfig, LogOutput, LoggingConfig, StagehandConfig};

/// Validates the entire configuration.
pub fn validate_config(config: &StagehandConfig) -> ConfigResult<()> {
    validate_bot_config(&config.bot)?;
    if let Some(session) = &config.session {
        validate_session_config(session)?;
    }
    validate_logging_config(&config.logging)?;
    Ok(())
}

fn validate_bot_config(bot: &BotConfig) -> ConfigResult<()> {
    if bot.token.trim().is_empty() {
        return Err(ConfigError::missing_field("bot.token"));
    }
    if bot.token.chars().any(char::is_whitespace) {
        return Err(ConfigError::validation("Bot token cannot contain whitespace"));
    }
    Ok(())
}

fn validate_session_config(session: &SessionConfig) -> ConfigResult<()> {
    if session.backend == SessionBackendKind::InMemory {
        return Ok(());
    }
    if session.host.is_empty() {
        return Err(ConfigError::missing_field("session.host"));
    }
    if session.port == 0 {
        return Err(ConfigError::InvalidPort(session.port));
    }
    Ok(())
}

fn validate_logging_config(logging: &LoggingConfig) -> ConfigResult<()> {
    if logging.output == LogOutput::File && logging.file_path.is_none() {
        return Err(ConfigError::missing_field("logging.file_path"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> StagehandConfig {
        let mut config = StagehandConfig::default();
        config.bot.token = "123:abc".to_string();
        config
    }

    #[test]
    fn test_validate_minimal_config() {
        assert!(validate_config(&valid()).is_ok());
    }

    #[test]
    fn test_validate_empty_token() {
        let mut config = valid();
        config.bot.token = "  ".to_string();
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::MissingField { .. })
        ));
    }

    #[test]
    fn test_validate_port_zero() {
        let mut config = valid();
        config.session = Some(SessionConfig {
            port: 0,
            ..SessionConfig::default()
        });
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::InvalidPort(0))
        ));
    }

    #[test]
    fn test_in_memory_ignores_address() {
        let mut config = valid();
        config.session = Some(SessionConfig {
            port: 0,
            ..SessionConfig::in_memory()
        });
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_file_output_requires_path() {
        let mut config = valid();
        config.logging.output = LogOutput::File;
        let err = validate_config(&config).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Missing required configuration field: logging.file_path"
        );
    }
}
