use std::{fmt, time::Duration};

use arch_bot_commons::retry::RetryPolicy;

pub const DEFAULT_PORT: u16 = 8080;

/// Which flavor of the `/` page to serve.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StatusPageStyle {
    /// Styled page with live counters and a list of endpoints.
    #[default]
    Full,
    /// Just a line of text.
    Minimal,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("TELEGRAM_TOKEN is not set. Put your token from @BotFather in there.")]
    MissingToken,
    #[error("{var} has an invalid value {value:?}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Clone)]
pub struct Config {
    pub token: String,
    pub port: u16,
    pub retry: RetryPolicy,
    pub status_page: StatusPageStyle,
    pub drop_pending_updates: bool,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("token", &format_args!("{}...", self.token_preview()))
            .field("port", &self.port)
            .field("retry", &self.retry)
            .field("status_page", &self.status_page)
            .field("drop_pending_updates", &self.drop_pending_updates)
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Result<Config, ConfigError> {
        Config::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build the config out of whatever `lookup` says the variables are.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Config, ConfigError> {
        // Blank values count as unset.
        let get = |var: &str| lookup(var).filter(|x| !x.trim().is_empty());

        let token = get("TELEGRAM_TOKEN")
            .map(|x| x.trim().to_string())
            .ok_or(ConfigError::MissingToken)?;

        let port = parse_or("PORT", get("PORT"), DEFAULT_PORT)?;

        let defaults = RetryPolicy::default();
        let retry = RetryPolicy {
            max_attempts: parse_or(
                "CONNECT_MAX_ATTEMPTS",
                get("CONNECT_MAX_ATTEMPTS"),
                defaults.max_attempts,
            )?,
            initial_wait: Duration::from_secs(parse_or(
                "CONNECT_INITIAL_WAIT_SECS",
                get("CONNECT_INITIAL_WAIT_SECS"),
                defaults.initial_wait.as_secs(),
            )?),
        };

        let status_page = match get("STATUS_PAGE") {
            None => StatusPageStyle::default(),
            Some(x) => match x.trim().to_ascii_lowercase().as_str() {
                "full" => StatusPageStyle::Full,
                "minimal" => StatusPageStyle::Minimal,
                _ => {
                    return Err(ConfigError::Invalid {
                        var: "STATUS_PAGE",
                        value: x,
                        reason: "expected \"full\" or \"minimal\"".to_string(),
                    })
                }
            },
        };

        let drop_pending_updates = match get("DROP_PENDING_UPDATES") {
            None => true,
            Some(x) => match x.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" => false,
                _ => {
                    return Err(ConfigError::Invalid {
                        var: "DROP_PENDING_UPDATES",
                        value: x,
                        reason: "expected a boolean".to_string(),
                    })
                }
            },
        };

        Ok(Config {
            token,
            port,
            retry,
            status_page,
            drop_pending_updates,
        })
    }

    /// First few characters of the token, enough to tell which bot it is.
    pub fn token_preview(&self) -> String {
        self.token.chars().take(10).collect()
    }
}

fn parse_or<T>(var: &'static str, value: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: fmt::Display,
{
    let Some(value) = value else {
        return Ok(default);
    };
    value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        var,
        reason: e.to_string(),
        value,
    })
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, time::Duration};

    use super::*;

    fn config_from(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|var| vars.get(var).cloned())
    }

    #[test]
    fn missing_token() {
        assert_eq!(config_from(&[]).unwrap_err(), ConfigError::MissingToken);
        assert_eq!(
            config_from(&[("TELEGRAM_TOKEN", "  ")]).unwrap_err(),
            ConfigError::MissingToken
        );
    }

    #[test]
    fn defaults() {
        let config = config_from(&[("TELEGRAM_TOKEN", "123456:ABCDEFGHIJKLMNOP")]).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.initial_wait, Duration::from_secs(5));
        assert_eq!(config.status_page, StatusPageStyle::Full);
        assert!(config.drop_pending_updates);
        assert_eq!(config.token_preview(), "123456:ABC");
    }

    #[test]
    fn overrides() {
        let config = config_from(&[
            ("TELEGRAM_TOKEN", "tok"),
            ("PORT", "9000"),
            ("CONNECT_MAX_ATTEMPTS", "2"),
            ("CONNECT_INITIAL_WAIT_SECS", "1"),
            ("STATUS_PAGE", "Minimal"),
            ("DROP_PENDING_UPDATES", "no"),
        ])
        .unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.retry.max_attempts, 2);
        assert_eq!(config.retry.initial_wait, Duration::from_secs(1));
        assert_eq!(config.status_page, StatusPageStyle::Minimal);
        assert!(!config.drop_pending_updates);
    }

    #[test]
    fn bad_values() {
        let err = config_from(&[("TELEGRAM_TOKEN", "tok"), ("PORT", "eighty")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "PORT", .. }));

        let err = config_from(&[("TELEGRAM_TOKEN", "tok"), ("PORT", "70000")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "PORT", .. }));

        let err = config_from(&[("TELEGRAM_TOKEN", "tok"), ("STATUS_PAGE", "fancy")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "STATUS_PAGE", .. }));
    }

    #[test]
    fn debug_hides_token() {
        let config = config_from(&[("TELEGRAM_TOKEN", "123456:SUPERSECRETSTUFF")]).unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("SUPERSECRETSTUFF"));
        assert!(debug.contains("123456:SUP..."));
    }
}
