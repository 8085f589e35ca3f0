use std::collections::HashSet;

use super::{AppConfig, ConfigError};

/// Validate the full application config, returning an error if any rule is violated.
///
/// # Errors
///
/// Returns [`ConfigError::Validation`] when any configuration invariant is violated.
pub fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    validate_server_config(config)?;
    validate_endpoints(config)?;
    validate_sources(config)?;
    validate_health(config)?;
    validate_features(config)?;
    Ok(())
}

fn validation_err(msg: impl Into<String>) -> ConfigError {
    ConfigError::Validation(msg.into())
}

fn validate_server_config(config: &AppConfig) -> Result<(), ConfigError> {
    let server = &config.server;
    if server.http_pool_max_idle_per_host == 0 {
        return Err(validation_err(
            "server.http_pool_max_idle_per_host must be greater than 0",
        ));
    }
    if let Some(worker_threads) = server.runtime_worker_threads {
        if worker_threads == 0 {
            return Err(validation_err(
                "server.runtime_worker_threads must be greater than 0 when set",
            ));
        }
    }
    if let Some(listener_count) = server.tcp_reuse_port_listener_count {
        if listener_count == 0 {
            return Err(validation_err(
                "server.tcp_reuse_port_listener_count must be greater than 0 when set",
            ));
        }
    }
    Ok(())
}

fn validate_endpoints(config: &AppConfig) -> Result<(), ConfigError> {
    if config.endpoints.is_empty() {
        return Err(validation_err("endpoints cannot be empty"));
    }

    let mut names = HashSet::new();
    let mut prefixes = HashSet::new();
    for endpoint in &config.endpoints {
        if endpoint.name.trim().is_empty() {
            return Err(validation_err("endpoint name cannot be empty"));
        }
        if !names.insert(endpoint.name.as_str()) {
            return Err(validation_err(format!(
                "duplicate endpoint name '{}'",
                endpoint.name
            )));
        }

        let prefix = endpoint.path_prefix.as_str();
        if !prefix.starts_with('/') || prefix.len() < 2 {
            return Err(validation_err(format!(
                "Endpoint '{}': path_prefix must start with '/' and not be bare",
                endpoint.name
            )));
        }
        if prefix.ends_with('/') {
            return Err(validation_err(format!(
                "Endpoint '{}': path_prefix must not end with '/'",
                endpoint.name
            )));
        }
        if !prefixes.insert(prefix) {
            return Err(validation_err(format!(
                "duplicate endpoint path_prefix '{prefix}'"
            )));
        }
        if prefix == "/v1" {
            return Err(validation_err(format!(
                "Endpoint '{}': path_prefix '/v1' shadows the API paths",
                endpoint.name
            )));
        }
    }
    Ok(())
}

fn validate_sources(config: &AppConfig) -> Result<(), ConfigError> {
    if config.sources.is_empty() {
        return Err(validation_err("sources cannot be empty"));
    }

    let mut names = HashSet::new();
    for source in &config.sources {
        if source.name.trim().is_empty() {
            return Err(validation_err("source name cannot be empty"));
        }
        if !names.insert(source.name.as_str()) {
            return Err(validation_err(format!(
                "duplicate source name '{}'",
                source.name
            )));
        }
        if !source.base_url.starts_with("http://") && !source.base_url.starts_with("https://") {
            return Err(validation_err(format!(
                "Source '{}': base_url must start with http:// or https://",
                source.name
            )));
        }
        if url::Url::parse(&source.base_url).is_err() {
            return Err(validation_err(format!(
                "Source '{}': base_url is not a valid URL",
                source.name
            )));
        }
    }
    Ok(())
}

fn validate_health(config: &AppConfig) -> Result<(), ConfigError> {
    if config.health.cooldown_secs == 0 {
        return Err(validation_err("health.cooldown_secs must be greater than 0"));
    }
    if config.health.failure_threshold == 0 {
        return Err(validation_err(
            "health.failure_threshold must be greater than 0",
        ));
    }
    Ok(())
}

fn validate_features(config: &AppConfig) -> Result<(), ConfigError> {
    let valid_levels = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL", "DISABLED"];
    if !valid_levels.contains(&config.features.log_level.to_uppercase().as_str()) {
        return Err(validation_err(format!(
            "log_level must be one of {valid_levels:?}"
        )));
    }
    if config.features.default_model.trim().is_empty() {
        return Err(validation_err("features.default_model cannot be empty"));
    }
    Ok(())
}
