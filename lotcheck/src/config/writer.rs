//! INI serialization logic for converting `ConfigFile` → INI string.
//!
//! Produces the commented representation written to `config.ini`.

use std::path::Path;

use super::settings::ConfigFile;

/// Convert a `ConfigFile` to a commented INI string for saving.
pub(super) fn to_config_string(config: &ConfigFile) -> String {
    let u = &config.upstream;
    let p = &config.pacing;
    let r = &config.retry;
    let l = &config.lots;

    format!(
        r#"[upstream]
; Login exchange endpoint (POST {{username, password}})
login_url = {}
; Evaluation endpoint (POST {{cpf, parcelas, convenio, produto}})
simulate_url = {}
username = {}
password = {}
; Token lifetime used when the login response has no expires_in
token_ttl_secs = {}
; Seconds subtracted from the token lifetime before it is refreshed
token_safety_margin_secs = {}
login_timeout_secs = {}
; Timeout for a primary evaluation request
request_timeout_secs = {}
; Timeout for an escalation retry request
retry_timeout_secs = {}

[pacing]
; Minimum delay before every upstream call, shared by all lots
min_delay_ms = {}
; Extra pause after this many completed results (0 disables)
cooldown_every = {}
cooldown_ms = {}
; How often a paused lot checks whether it was resumed
pause_poll_ms = {}

[retry]
; Rounds attempted for a throttled subject before recording an error
max_rounds = {}
; Delay before each round
delay_secs = {}
; Comma-separated phrases that identify a throttling response (case-insensitive)
rate_limit_patterns = {}

[lots]
; Width subject IDs are zero-padded to
subject_width = {}
; One snapshot file per lot is written here
results_dir = {}
; Daily request counter
quota_file = {}

[server]
; Address for `lotcheck serve`
bind = {}

[logging]
file = {}
"#,
        u.login_url,
        u.simulate_url,
        u.username,
        u.password,
        u.token_ttl_secs,
        u.token_safety_margin_secs,
        u.login_timeout_secs,
        u.request_timeout_secs,
        u.retry_timeout_secs,
        p.min_delay_ms,
        p.cooldown_every,
        p.cooldown_ms,
        p.pause_poll_ms,
        r.max_rounds,
        r.delay_secs,
        r.rate_limit_patterns.join(", "),
        l.subject_width,
        path_to_string(&l.results_dir),
        path_to_string(&l.quota_file),
        config.server.bind,
        path_to_string(&config.logging.file),
    )
}

/// Writes paths under the home directory with a `~/` prefix.
fn path_to_string(path: &Path) -> String {
    if let Some(home) = dirs::home_dir() {
        if let Ok(stripped) = path.strip_prefix(&home) {
            return format!("~/{}", stripped.display());
        }
    }
    path.display().to_string()
}
