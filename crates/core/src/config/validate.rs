use super::{types::Config, ConfigError};

const MAX_LOOKBACK_DAYS: i64 = 3650;

/// Validate configuration
/// Currently validates:
/// - Required sections exist (enforced by serde)
/// - Service URLs are present
/// - Dispatch limits allow at least one launch and one poll
/// - The operational timezone offset is a real offset
/// - The lookback is between zero and ten years
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let urls = [
        ("tracker.url", &config.tracker.url),
        ("resolver.study_url", &config.resolver.study_url),
        ("resolver.account_url", &config.resolver.account_url),
        ("query_service.url", &config.query_service.url),
    ];
    for (name, value) in urls {
        if value.trim().is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "{} cannot be empty",
                name
            )));
        }
    }

    if config.dispatch.max_launch_attempts == 0 {
        return Err(ConfigError::ValidationError(
            "dispatch.max_launch_attempts must be at least 1".to_string(),
        ));
    }
    if config.dispatch.max_poll_iterations == 0 {
        return Err(ConfigError::ValidationError(
            "dispatch.max_poll_iterations must be at least 1".to_string(),
        ));
    }
    if config.dispatch.poll_interval_ms == 0 {
        return Err(ConfigError::ValidationError(
            "dispatch.poll_interval_ms cannot be 0".to_string(),
        ));
    }

    if !(-23..=23).contains(&config.schedule.timezone_offset_hours) {
        return Err(ConfigError::ValidationError(format!(
            "schedule.timezone_offset_hours out of range: {}",
            config.schedule.timezone_offset_hours
        )));
    }

    if !(0..=MAX_LOOKBACK_DAYS).contains(&config.schedule.lookback_days) {
        return Err(ConfigError::ValidationError(format!(
            "schedule.lookback_days out of range: {}",
            config.schedule.lookback_days
        )));
    }

    if config.email.to.trim().is_empty() || config.email.from.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "email.to and email.from are required".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_config_from_str;
    use crate::config::types::tests::MINIMAL;

    fn minimal() -> Config {
        load_config_from_str(MINIMAL).unwrap()
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(validate_config(&minimal()).is_ok());
    }

    #[test]
    fn test_validate_zero_launch_attempts_fails() {
        let mut config = minimal();
        config.dispatch.max_launch_attempts = 0;
        let result = validate_config(&config);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_validate_empty_url_fails() {
        let mut config = minimal();
        config.query_service.url = "  ".to_string();
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("query_service.url"));
    }

    #[test]
    fn test_validate_offset_out_of_range_fails() {
        let mut config = minimal();
        config.schedule.timezone_offset_hours = 30;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_lookback_out_of_range_fails() {
        let mut config = minimal();
        config.schedule.lookback_days = -1;
        assert!(validate_config(&config).is_err());

        config.schedule.lookback_days = i64::MAX;
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("schedule.lookback_days"));

        config.schedule.lookback_days = 3650;
        assert!(validate_config(&config).is_ok());
    }
}
