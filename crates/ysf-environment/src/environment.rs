//! Route-to-environment resolution and the login gate.

use tracing::{debug, info, warn};

use crate::config::{EnvironmentConfig, EnvironmentSettings};
use crate::error::{EnvironmentError, Result};
use crate::session::Session;

/// Resolves which environment a request belongs to.
#[derive(Debug, Clone)]
pub struct Environment {
    config: EnvironmentConfig,
    route: Vec<String>,
    current: Option<String>,
}

impl Environment {
    /// Creates a resolver without a route.
    pub fn new(config: EnvironmentConfig) -> Self {
        Self {
            config,
            route: Vec::new(),
            current: None,
        }
    }

    /// Sets the parsed route and resolves the current environment.
    ///
    /// The first enabled environment whose trigger equals the first route
    /// segment, ignoring case, wins.
    pub fn set_route<I, S>(&mut self, segments: I) -> Option<&str>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.route = segments.into_iter().map(Into::into).collect();
        let first = self.route.first().map(String::as_str).unwrap_or("");
        self.current = self
            .config
            .iter()
            .find(|(_, settings)| settings.enabled && settings.trigger.eq_ignore_ascii_case(first))
            .map(|(name, _)| name.to_string());
        debug!(route = ?self.route, environment = ?self.current, "resolved environment");
        self.current.as_deref()
    }

    /// The route last passed to [`set_route`](Self::set_route).
    pub fn route(&self) -> &[String] {
        &self.route
    }

    /// Name of the current environment.
    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// Settings of the current environment.
    pub fn settings(&self) -> Option<&EnvironmentSettings> {
        self.current.as_deref().and_then(|name| self.config.get(name))
    }

    /// Returns the configured environments.
    pub fn config(&self) -> &EnvironmentConfig {
        &self.config
    }

    /// Whether `env` requires a login. Unknown environments do.
    pub fn requires_login(&self, env: &str) -> bool {
        self.config.get(env).is_none_or(|settings| settings.login)
    }

    fn target<'a>(&'a self, env: Option<&'a str>) -> Result<&'a str> {
        env.or(self.current.as_deref())
            .ok_or(EnvironmentError::NoEnvironment)
    }

    /// Logs the session into `env`, or the current environment.
    pub fn login(&self, session: &mut Session, env: Option<&str>, remote_addr: &str) -> Result<()> {
        let env = self.target(env)?;
        session.grant(env, remote_addr);
        info!(environment = env, remote_addr, "logged in");
        Ok(())
    }

    /// Logs the session out of `env`, or the current environment.
    pub fn logout(&self, session: &mut Session, env: Option<&str>) -> Result<()> {
        let env = self.target(env)?;
        session.revoke(env);
        info!(environment = env, "logged out");
        Ok(())
    }

    /// Checks whether the session may enter `env`, or the current
    /// environment.
    ///
    /// A login recorded from another address revokes every login of the
    /// session and regenerates its key.
    pub fn logged_in(&self, session: &mut Session, env: Option<&str>, remote_addr: &str) -> bool {
        let Ok(env) = self.target(env) else {
            return false;
        };
        if !self.requires_login(env) {
            return true;
        }
        match session.login_address(env).map(|addr| addr == remote_addr) {
            None => false,
            Some(true) => true,
            Some(false) => {
                warn!(environment = env, remote_addr, "session address mismatch");
                session.revoke_all();
                session.regenerate();
                false
            }
        }
    }
}
