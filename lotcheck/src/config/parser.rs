//! INI parsing logic for converting `Ini` → `ConfigFile`.
//!
//! This is the single place where INI key names are mapped to struct fields.

use ini::{Ini, Properties};
use std::path::PathBuf;
use std::str::FromStr;

use super::file::ConfigFileError;
use super::settings::ConfigFile;

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found in the INI.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [upstream] section
    if let Some(section) = ini.section(Some("upstream")) {
        if let Some(v) = non_empty(section, "login_url") {
            config.upstream.login_url = validate_url("login_url", v)?;
        }
        if let Some(v) = non_empty(section, "simulate_url") {
            config.upstream.simulate_url = validate_url("simulate_url", v)?;
        }
        if let Some(v) = non_empty(section, "username") {
            config.upstream.username = v.to_string();
        }
        if let Some(v) = section.get("password") {
            config.upstream.password = v.to_string();
        }
        let u = &mut config.upstream;
        number(section, "upstream", "token_ttl_secs", &mut u.token_ttl_secs)?;
        number(
            section,
            "upstream",
            "token_safety_margin_secs",
            &mut u.token_safety_margin_secs,
        )?;
        positive(section, "upstream", "login_timeout_secs", &mut u.login_timeout_secs)?;
        positive(section, "upstream", "request_timeout_secs", &mut u.request_timeout_secs)?;
        positive(section, "upstream", "retry_timeout_secs", &mut u.retry_timeout_secs)?;
    }

    // [pacing] section
    if let Some(section) = ini.section(Some("pacing")) {
        let p = &mut config.pacing;
        number(section, "pacing", "min_delay_ms", &mut p.min_delay_ms)?;
        number(section, "pacing", "cooldown_every", &mut p.cooldown_every)?;
        number(section, "pacing", "cooldown_ms", &mut p.cooldown_ms)?;
        positive(section, "pacing", "pause_poll_ms", &mut p.pause_poll_ms)?;
    }

    // [retry] section
    if let Some(section) = ini.section(Some("retry")) {
        number(section, "retry", "max_rounds", &mut config.retry.max_rounds)?;
        number(section, "retry", "delay_secs", &mut config.retry.delay_secs)?;
        if let Some(v) = section.get("rate_limit_patterns") {
            let patterns: Vec<String> = v
                .split(',')
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty())
                .collect();
            if patterns.is_empty() {
                return Err(invalid(
                    "retry",
                    "rate_limit_patterns",
                    v,
                    "must list at least one phrase (comma-separated)",
                ));
            }
            config.retry.rate_limit_patterns = patterns;
        }
    }

    // [lots] section
    if let Some(section) = ini.section(Some("lots")) {
        positive(section, "lots", "subject_width", &mut config.lots.subject_width)?;
        if let Some(v) = non_empty(section, "results_dir") {
            config.lots.results_dir = expand_tilde(v);
        }
        if let Some(v) = non_empty(section, "quota_file") {
            config.lots.quota_file = expand_tilde(v);
        }
    }

    // [server] section
    if let Some(section) = ini.section(Some("server")) {
        if let Some(v) = non_empty(section, "bind") {
            if v.parse::<std::net::SocketAddr>().is_err() {
                return Err(invalid(
                    "server",
                    "bind",
                    v,
                    "must be a socket address like 127.0.0.1:8890",
                ));
            }
            config.server.bind = v.to_string();
        }
    }

    // [logging] section
    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = non_empty(section, "file") {
            config.logging.file = expand_tilde(v);
        }
    }

    Ok(config)
}

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn non_empty<'a>(section: &'a Properties, key: &str) -> Option<&'a str> {
    section.get(key).map(str::trim).filter(|v| !v.is_empty())
}

/// Overwrites `target` with the parsed key when present.
fn number<T: FromStr>(
    section: &Properties,
    section_name: &str,
    key: &str,
    target: &mut T,
) -> Result<(), ConfigFileError> {
    if let Some(v) = non_empty(section, key) {
        *target = v
            .parse()
            .map_err(|_| invalid(section_name, key, v, "must be a non-negative integer"))?;
    }
    Ok(())
}

/// Like [`number`] but rejects zero.
fn positive<T: FromStr + Default + PartialEq>(
    section: &Properties,
    section_name: &str,
    key: &str,
    target: &mut T,
) -> Result<(), ConfigFileError> {
    if let Some(v) = non_empty(section, key) {
        let parsed: T = v
            .parse()
            .map_err(|_| invalid(section_name, key, v, "must be a positive integer"))?;
        if parsed == T::default() {
            return Err(invalid(section_name, key, v, "must be a positive integer"));
        }
        *target = parsed;
    }
    Ok(())
}

fn validate_url(key: &str, value: &str) -> Result<String, ConfigFileError> {
    if value.starts_with("http://") || value.starts_with("https://") {
        Ok(value.to_string())
    } else {
        Err(invalid(
            "upstream",
            key,
            value,
            "must be an http:// or https:// URL",
        ))
    }
}

/// Expands a leading `~/` to the home directory.
pub(super) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::defaults::*;
    use tempfile::TempDir;

    fn load(content: &str) -> Result<ConfigFile, ConfigFileError> {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.ini");
        std::fs::write(&config_path, content).unwrap();
        ConfigFile::load_from(&config_path)
    }

    #[test]
    fn test_overlay_upstream_section() {
        let config = load(
            r#"
[upstream]
login_url = https://api.example.com/login
simulate_url = https://api.example.com/simulate
username = operator
password = hunter2
request_timeout_secs = 45
"#,
        )
        .unwrap();

        assert_eq!(config.upstream.login_url, "https://api.example.com/login");
        assert_eq!(config.upstream.username, "operator");
        assert_eq!(config.upstream.password, "hunter2");
        assert_eq!(config.upstream.request_timeout_secs, 45);
        assert_eq!(config.upstream.retry_timeout_secs, DEFAULT_RETRY_TIMEOUT_SECS);
    }

    #[test]
    fn test_invalid_url() {
        let err = load("[upstream]\nlogin_url = ftp://nope\n").unwrap_err();
        assert!(err.to_string().contains("upstream.login_url"));
    }

    #[test]
    fn test_invalid_number() {
        let err = load("[pacing]\nmin_delay_ms = fast\n").unwrap_err();
        match err {
            ConfigFileError::InvalidValue { section, key, .. } => {
                assert_eq!(section, "pacing");
                assert_eq!(key, "min_delay_ms");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_zero_timeout_rejected() {
        assert!(load("[upstream]\nrequest_timeout_secs = 0\n").is_err());
    }

    #[test]
    fn test_zero_cooldown_every_allowed() {
        let config = load("[pacing]\ncooldown_every = 0\n").unwrap();
        assert_eq!(config.pacing.cooldown_every, 0);
    }

    #[test]
    fn test_rate_limit_patterns_split() {
        let config = load("[retry]\nrate_limit_patterns = too many requests , slow down,\n").unwrap();
        assert_eq!(
            config.retry.rate_limit_patterns,
            vec!["too many requests".to_string(), "slow down".to_string()]
        );
    }

    #[test]
    fn test_empty_rate_limit_patterns_rejected() {
        assert!(load("[retry]\nrate_limit_patterns = , ,\n").is_err());
    }

    #[test]
    fn test_invalid_bind() {
        assert!(load("[server]\nbind = localhost\n").is_err());
    }

    #[test]
    fn test_expand_tilde() {
        let home = dirs::home_dir().unwrap_or_default();
        assert_eq!(expand_tilde("~/results"), home.join("results"));
        assert_eq!(expand_tilde("/var/lotcheck"), PathBuf::from("/var/lotcheck"));
    }
}
