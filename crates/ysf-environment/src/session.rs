//! Visitor sessions and the cookies they ask the host to send.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::Result;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "ysf_session";

/// Lifetime of a fresh session cookie, about four years.
pub const COOKIE_LIFETIME_SECS: i64 = 126_147_624;

/// Session data stored as JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionData {
    /// Client address each environment was logged into from.
    #[serde(default)]
    pub environments: HashMap<String, String>,
    /// Additional session data.
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// A cookie the host should send with the response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    /// Cookie name.
    pub name: String,
    /// Cookie value.
    pub value: String,
    /// Expiry; a past date deletes the cookie.
    pub expires: DateTime<Utc>,
}

impl Cookie {
    /// Returns whether the cookie deletes itself.
    pub fn is_expired(&self) -> bool {
        self.expires <= Utc::now()
    }

    /// Renders a `Set-Cookie` header value.
    pub fn to_header(&self) -> String {
        format!(
            "{}={}; Expires={}; Path=/",
            self.name,
            self.value,
            self.expires.format("%a, %d %b %Y %H:%M:%S GMT")
        )
    }
}

/// A visitor session.
#[derive(Debug, Clone)]
pub struct Session {
    /// Unique session key (64 character hex string).
    pub session_key: String,
    data: SessionData,
    cookies: Vec<Cookie>,
}

impl Session {
    /// Creates an empty session with a fresh key.
    pub fn new() -> Self {
        Self::with_data(generate_session_key(), SessionData::default())
    }

    /// Restores a session.
    pub fn with_data(session_key: impl Into<String>, data: SessionData) -> Self {
        Self {
            session_key: session_key.into(),
            data,
            cookies: Vec::new(),
        }
    }

    /// Restores a session from stored JSON.
    pub fn from_json(session_key: impl Into<String>, json: &str) -> Result<Self> {
        Ok(Self::with_data(session_key, serde_json::from_str(json)?))
    }

    /// Encodes the session data for storage.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.data)?)
    }

    /// Returns the session data.
    pub fn data(&self) -> &SessionData {
        &self.data
    }

    /// Gets a value from the session data.
    pub fn get<T: for<'de> Deserialize<'de>>(&self, key: &str) -> Option<T> {
        self.data
            .extra
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Sets a value in the session data.
    pub fn set<T: Serialize>(&mut self, key: &str, value: T) -> Result<()> {
        self.data
            .extra
            .insert(key.to_string(), serde_json::to_value(value)?);
        Ok(())
    }

    /// Removes a value from the session data.
    pub fn remove(&mut self, key: &str) {
        self.data.extra.remove(key);
    }

    /// The address `env` was logged into from.
    pub fn login_address(&self, env: &str) -> Option<&str> {
        self.data
            .environments
            .get(env)
            .map(String::as_str)
            .filter(|addr| !addr.is_empty())
    }

    pub(crate) fn grant(&mut self, env: &str, remote_addr: &str) {
        self.data
            .environments
            .insert(env.to_string(), remote_addr.to_string());
    }

    pub(crate) fn revoke(&mut self, env: &str) {
        self.data.environments.remove(env);
    }

    pub(crate) fn revoke_all(&mut self) {
        self.data.environments.clear();
    }

    /// Replaces the session key, queueing a cookie that deletes the old
    /// one and a long-lived cookie carrying the new one.
    pub fn regenerate(&mut self) {
        let now = Utc::now();
        self.session_key = generate_session_key();
        self.cookies.push(Cookie {
            name: SESSION_COOKIE.to_string(),
            value: String::new(),
            expires: now - Duration::hours(1),
        });
        self.cookies.push(Cookie {
            name: SESSION_COOKIE.to_string(),
            value: self.session_key.clone(),
            expires: now + Duration::seconds(COOKIE_LIFETIME_SECS),
        });
    }

    /// Cookies queued so far.
    pub fn cookies(&self) -> &[Cookie] {
        &self.cookies
    }

    /// Takes the queued cookies.
    pub fn take_cookies(&mut self) -> Vec<Cookie> {
        std::mem::take(&mut self.cookies)
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Generates a cryptographically secure session key.
fn generate_session_key() -> String {
    use rand::RngExt;
    let mut rng = rand::rng();
    let mut bytes = [0u8; 32];
    rng.fill(&mut bytes);
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_key_generation() {
        let key1 = generate_session_key();
        let key2 = generate_session_key();

        assert_eq!(key1.len(), 64);
        assert_ne!(key1, key2);
    }

    #[test]
    fn test_session_data() {
        let mut session = Session::new();

        session.set("theme", "dark").unwrap();
        let value: Option<String> = session.get("theme");
        assert_eq!(value, Some("dark".to_string()));

        session.remove("theme");
        let value: Option<String> = session.get("theme");
        assert_eq!(value, None);
    }

    #[test]
    fn test_json_round_trip_keeps_logins() {
        let mut session = Session::new();
        session.grant("admin", "10.0.0.1");
        session.set("lang", "nl").unwrap();

        let restored = Session::from_json("key", &session.to_json().unwrap()).unwrap();
        assert_eq!(restored.login_address("admin"), Some("10.0.0.1"));
        assert_eq!(restored.get::<String>("lang"), Some("nl".to_string()));
    }

    #[test]
    fn test_regenerate_queues_cookies() {
        let mut session = Session::new();
        let old_key = session.session_key.clone();
        session.regenerate();

        assert_ne!(session.session_key, old_key);
        let cookies = session.take_cookies();
        assert_eq!(cookies.len(), 2);
        assert!(cookies[0].is_expired());
        assert_eq!(cookies[1].value, session.session_key);
        assert!(cookies[1].to_header().starts_with("ysf_session="));
        assert!(session.cookies().is_empty());
    }
}
