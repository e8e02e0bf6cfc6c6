use anyhow::Result;
use regex::Regex;
use std::env;
use tracing::{debug, warn};

const ENV_VAR_PATTERN: &str = r"\$\{(\w+)\}|\$(\w+)";

/// Substitute environment variables in the format ${VAR_NAME} or $VAR_NAME
pub fn substitute_env_vars(content: &str) -> Result<String> {
    let re = Regex::new(ENV_VAR_PATTERN)?;
    let mut missing_vars = Vec::new();

    let result = re.replace_all(content, |caps: &regex::Captures<'_>| {
        let placeholder = caps.get(0).map_or("", |m| m.as_str());
        let Some(var_name) = caps.get(1).or_else(|| caps.get(2)).map(|m| m.as_str()) else {
            return placeholder.to_string();
        };

        match env::var(var_name) {
            Ok(value) => {
                debug!("Substituting environment variable: {}", var_name);
                value
            }
            Err(_) => {
                warn!("Environment variable '{}' not set", var_name);
                missing_vars.push(var_name.to_string());
                // Left in place for the validator to report
                placeholder.to_string()
            }
        }
    });

    if !missing_vars.is_empty() {
        debug!(
            "Environment variables not set (may use defaults or fail validation): {:?}",
            missing_vars
        );
    }

    Ok(result.into_owned())
}

/// Get environment variable with a default value
pub fn get_env_or_default(var_name: &str, default: &str) -> String {
    match env::var(var_name) {
        Ok(value) => value,
        Err(_) => {
            debug!(
                "Environment variable '{}' not set, using default: \"{}\"",
                var_name, default
            );
            default.to_string()
        }
    }
}

/// Check if a string contains unresolved environment variable placeholders
pub fn has_unresolved_env_vars(content: &str) -> bool {
    Regex::new(ENV_VAR_PATTERN)
        .map(|re| re.is_match(content))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_substitutes_set_variables() {
        env::set_var("FOODHALL_TEST_DB_HOST", "db.internal");
        let out = substitute_env_vars("url: postgres://${FOODHALL_TEST_DB_HOST}/foodhall").unwrap();
        assert_eq!(out, "url: postgres://db.internal/foodhall");
    }

    #[test]
    fn test_keeps_missing_placeholders() {
        let out = substitute_env_vars("url: ${FOODHALL_TEST_SURELY_UNSET}").unwrap();
        assert_eq!(out, "url: ${FOODHALL_TEST_SURELY_UNSET}");
        assert!(has_unresolved_env_vars(&out));
        assert!(!has_unresolved_env_vars("url: postgres://localhost/foodhall"));
    }

    #[test]
    fn test_get_env_or_default() {
        assert_eq!(get_env_or_default("FOODHALL_TEST_SURELY_UNSET", "fallback"), "fallback");
    }
}
