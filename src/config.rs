use std::fmt;

pub const DEFAULT_BASE_URL: &str = "http://localhost:3001/api/v1";
pub const BASE_URL_VAR: &str = "BASE_URL";
pub const API_KEY_VAR: &str = "CHAVE_API";

/// Connection settings shared by every outbound request.
///
/// The two fields always travel together: the settings form replaces the
/// whole value, never one field at a time.
#[derive(Clone, PartialEq, Eq)]
pub struct Config {
    pub base_url: String,
    pub api_key: String,
}

impl Config {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    /// Seed from `BASE_URL` / `CHAVE_API`, falling back to the local default
    /// endpoint and an empty key.
    pub fn from_env() -> Self {
        let base_url = std::env::var(BASE_URL_VAR).unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let api_key = std::env::var(API_KEY_VAR).unwrap_or_default();
        Self { base_url, api_key }
    }

    /// Command-line flags win over whatever came from the environment.
    pub fn with_overrides(mut self, base_url: Option<String>, api_key: Option<String>) -> Self {
        if let Some(url) = base_url {
            self.base_url = url;
        }
        if let Some(key) = api_key {
            self.api_key = key;
        }
        self
    }

    /// Key masked with asterisks, last four characters visible
    pub fn masked_api_key(&self) -> String {
        mask_secret(&self.api_key)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL, "")
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("base_url", &self.base_url)
            .field("api_key", &self.masked_api_key())
            .finish()
    }
}

pub fn mask_secret(secret: &str) -> String {
    let char_count = secret.chars().count();
    if char_count == 0 {
        String::new()
    } else if char_count <= 4 {
        "*".repeat(char_count)
    } else {
        let masked_len = char_count - 4;
        let last_four: String = secret.chars().skip(masked_len).collect();
        format!("{}{}", "*".repeat(masked_len.min(20)), last_four)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_env_uses_defaults_when_unset() {
        temp_env::with_vars_unset([BASE_URL_VAR, API_KEY_VAR], || {
            let config = Config::from_env();
            assert_eq!(config.base_url, "http://localhost:3001/api/v1");
            assert_eq!(config.api_key, "");
        });
    }

    #[test]
    fn from_env_reads_both_variables() {
        temp_env::with_vars(
            [
                (BASE_URL_VAR, Some("https://llm.example.com/api/v1")),
                (API_KEY_VAR, Some("secret-token")),
            ],
            || {
                let config = Config::from_env();
                assert_eq!(config.base_url, "https://llm.example.com/api/v1");
                assert_eq!(config.api_key, "secret-token");
            },
        );
    }

    #[test]
    fn from_env_accepts_any_string() {
        temp_env::with_vars([(BASE_URL_VAR, Some("not a url"))], || {
            assert_eq!(Config::from_env().base_url, "not a url");
        });
    }

    #[test]
    fn overrides_replace_only_given_fields() {
        let config = Config::new("http://a", "k1").with_overrides(Some("http://b".into()), None);
        assert_eq!(config, Config::new("http://b", "k1"));

        let config = config.with_overrides(None, Some("k2".into()));
        assert_eq!(config, Config::new("http://b", "k2"));
    }

    #[test]
    fn debug_never_prints_raw_key() {
        let config = Config::new("http://localhost", "abcdefgh1234");
        let debug = format!("{:?}", config);
        assert!(!debug.contains("abcdefgh1234"));
        assert!(debug.contains("********1234"));
    }

    #[test]
    fn mask_secret_short_and_empty() {
        assert_eq!(mask_secret(""), "");
        assert_eq!(mask_secret("abc"), "***");
        assert_eq!(mask_secret("abcde"), "*bcde");
    }
}
