use std::env;
use std::path::PathBuf;

pub const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:5000";

/// Process-level configuration, read once at startup. The sidecar has no
/// command-line surface; the host application configures it via environment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_base_url: String,
    pub state_dir: PathBuf,
    pub allow_role_override: bool,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let api_base_url = env::var("CAMPUSD_API_BASE_URL")
            .ok()
            .map(|raw| normalize_base_url(&raw))
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());
        let state_dir = env::var("CAMPUSD_STATE_DIR")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(default_state_dir);
        let allow_role_override = env::var("CAMPUSD_ALLOW_ROLE_OVERRIDE")
            .map(|v| is_truthy(&v))
            .unwrap_or(false);

        Self {
            api_base_url,
            state_dir,
            allow_role_override,
        }
    }
}

pub fn normalize_base_url(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_string()
}

fn is_truthy(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn default_state_dir() -> PathBuf {
    env::var("HOME")
        .ok()
        .filter(|v| !v.is_empty())
        .map(|home| PathBuf::from(home).join(".campusd"))
        .unwrap_or_else(|| PathBuf::from(".campusd"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_loses_trailing_slashes() {
        assert_eq!(
            normalize_base_url("https://lms.example.edu/api//"),
            "https://lms.example.edu/api"
        );
        assert_eq!(normalize_base_url("  http://127.0.0.1:5000 "), "http://127.0.0.1:5000");
    }

    #[test]
    fn truthy_values() {
        assert!(is_truthy("1"));
        assert!(is_truthy("TRUE"));
        assert!(is_truthy(" yes "));
        assert!(!is_truthy("0"));
        assert!(!is_truthy(""));
        assert!(!is_truthy("off"));
    }
}
