use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::gateway::{ApiError, ApiGateway};
use crate::normalize;
use crate::session::{SessionStore, TOKEN_KEYS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Dean,
    Teacher,
    Student,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Dean => "dean",
            Self::Teacher => "teacher",
            Self::Student => "student",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "dean" => Some(Self::Dean),
            "teacher" => Some(Self::Teacher),
            "student" => Some(Self::Student),
            _ => None,
        }
    }
}

/// The authenticated identity: exactly one authoritative role plus the
/// profile payload its probe returned.
#[derive(Debug, Clone)]
pub struct ActiveSession {
    pub role: Role,
    pub profile: Value,
}

/// Sign-in response reduced to what the session store needs.
#[derive(Debug, Clone, PartialEq)]
pub struct SignIn {
    pub token: String,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Probe order is the role-priority contract: dean outranks teacher
/// outranks student, and probing stops at the first success. The sequencing
/// also bounds worst-case latency, but the order itself is correctness.
const PROBES: [(Role, &str, [&str; 3]); 3] = [
    (Role::Dean, "/api/deans/profile", ["deanProfile", "profile", "data"]),
    (
        Role::Teacher,
        "/api/teachers/profile",
        ["teacherProfile", "profile", "data"],
    ),
    (
        Role::Student,
        "/api/students/profile",
        ["studentProfile", "profile", "data"],
    ),
];

pub async fn sign_in(
    gw: &dyn ApiGateway,
    email: &str,
    password: &str,
) -> Result<SignIn, ApiError> {
    let payload = gw
        .post_json(
            "/api/auth/login",
            json!({ "email": email, "password": password }),
        )
        .await?;
    let Some(token) = token_from_payload(&payload) else {
        return Err(ApiError::Parse(
            "sign-in response carried no token".to_string(),
        ));
    };
    Ok(SignIn {
        token,
        expires_at: expiry_from_payload(&payload),
    })
}

pub async fn resolve_role(gw: &dyn ApiGateway) -> Result<ActiveSession, ApiError> {
    let mut last_err: Option<ApiError> = None;
    for (role, path, keys) in PROBES {
        match gw.get_json(path, &[]).await {
            Ok(payload) => {
                let profile = normalize::unwrap_entity(&payload, &keys).clone();
                log::info!("resolved role: {}", role.as_str());
                return Ok(ActiveSession { role, profile });
            }
            Err(e) => {
                log::debug!("{} probe failed: {}", role.as_str(), e);
                last_err = Some(e);
            }
        }
    }
    Err(last_err.unwrap_or_else(|| ApiError::Network("no role probe ran".to_string())))
}

/// Role resolution that owns the session invariant: a session whose token
/// satisfies none of the probes is invalid, so the stored token is cleared
/// before the failure is reported. Never retried here.
pub async fn establish(gw: &dyn ApiGateway, store: &SessionStore) -> Result<ActiveSession, ApiError> {
    match resolve_role(gw).await {
        Ok(active) => Ok(active),
        Err(e) => {
            if let Err(clear_err) = store.clear() {
                log::warn!("failed to clear invalid session: {}", clear_err);
            }
            Err(e)
        }
    }
}

/// The token may sit at the top level or one envelope down, under any of the
/// accepted key names.
pub fn token_from_payload(payload: &Value) -> Option<String> {
    for node in [payload, normalize::unwrap_entity(payload, &normalize::ENTITY_KEYS)] {
        for key in TOKEN_KEYS {
            if let Some(token) = node.get(key).and_then(|v| v.as_str()) {
                if !token.is_empty() {
                    return Some(token.to_string());
                }
            }
        }
    }
    None
}

fn expiry_from_payload(payload: &Value) -> Option<DateTime<Utc>> {
    let node = normalize::unwrap_entity(payload, &normalize::ENTITY_KEYS);
    for source in [payload, node] {
        if let Some(raw) = source.get("expiresAt").and_then(|v| v.as_str()) {
            if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
                return Some(dt.with_timezone(&Utc));
            }
        }
        if let Some(secs) = source.get("expiresIn").and_then(|v| v.as_i64()) {
            return Some(Utc::now() + Duration::seconds(secs));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::fake::FakeGateway;
    use crate::gateway::HttpMethod;

    #[tokio::test]
    async fn dean_probe_short_circuits() {
        let gw = FakeGateway::new();
        gw.enqueue_json(
            HttpMethod::Get,
            "/api/deans/profile",
            json!({"deanProfile": {"name": "D. Dean"}}),
        );

        let active = resolve_role(&gw).await.expect("resolve");
        assert_eq!(active.role, Role::Dean);
        assert_eq!(active.profile["name"], "D. Dean");
        assert_eq!(gw.calls(), vec!["GET /api/deans/profile"]);
    }

    #[tokio::test]
    async fn probes_run_in_fixed_order_until_first_success() {
        let gw = FakeGateway::new();
        gw.enqueue_http_error(HttpMethod::Get, "/api/deans/profile", 403);
        gw.enqueue_json(
            HttpMethod::Get,
            "/api/teachers/profile",
            json!({"teacherProfile": {"name": "T. Teacher"}}),
        );

        let active = resolve_role(&gw).await.expect("resolve");
        assert_eq!(active.role, Role::Teacher);
        assert_eq!(
            gw.calls(),
            vec!["GET /api/deans/profile", "GET /api/teachers/profile"]
        );
    }

    #[tokio::test]
    async fn all_probes_failing_clears_the_session() {
        let gw = FakeGateway::new();
        gw.enqueue_http_error(HttpMethod::Get, "/api/deans/profile", 401);
        gw.enqueue_http_error(HttpMethod::Get, "/api/teachers/profile", 401);
        gw.enqueue_http_error(HttpMethod::Get, "/api/students/profile", 401);

        let store = SessionStore::open_in_memory().expect("store");
        store.set("doomed-token", None).expect("seed token");

        let result = establish(&gw, &store).await;
        assert!(result.is_err());
        assert_eq!(store.token(), None);
    }

    #[tokio::test]
    async fn network_failure_on_every_probe_also_clears() {
        let gw = FakeGateway::new();
        for path in [
            "/api/deans/profile",
            "/api/teachers/profile",
            "/api/students/profile",
        ] {
            gw.enqueue(
                HttpMethod::Get,
                path,
                Err(ApiError::Network("connection refused".to_string())),
            );
        }

        let store = SessionStore::open_in_memory().expect("store");
        store.set("doomed-token", None).expect("seed token");

        let result = establish(&gw, &store).await;
        assert!(matches!(result, Err(ApiError::Network(_))));
        assert_eq!(store.token(), None);
    }

    #[tokio::test]
    async fn sign_in_extracts_token_and_expiry() {
        let gw = FakeGateway::new();
        gw.enqueue_json(
            HttpMethod::Post,
            "/api/auth/login",
            json!({"data": {"accessToken": "tok-1", "expiresAt": "2026-09-01T12:00:00Z"}}),
        );

        let signed = sign_in(&gw, "a@uni.edu", "pw").await.expect("sign in");
        assert_eq!(signed.token, "tok-1");
        assert!(signed.expires_at.is_some());
    }

    #[tokio::test]
    async fn sign_in_without_token_is_a_parse_error() {
        let gw = FakeGateway::new();
        gw.enqueue_json(HttpMethod::Post, "/api/auth/login", json!({"ok": true}));
        assert!(matches!(
            sign_in(&gw, "a@uni.edu", "pw").await,
            Err(ApiError::Parse(_))
        ));
    }

    #[test]
    fn token_payload_key_priority() {
        assert_eq!(
            token_from_payload(&json!({"jwt": "j", "token": "t", "accessToken": "a"})).as_deref(),
            Some("a")
        );
        assert_eq!(
            token_from_payload(&json!({"result": {"jwt": "nested"}})).as_deref(),
            Some("nested")
        );
        assert_eq!(token_from_payload(&json!({"user": "no token"})), None);
    }
}
