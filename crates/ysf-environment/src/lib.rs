//! # ysf-environment
//!
//! Picks the environment ("admin", "public", ...) a request belongs to from
//! its route, and gates environments that require a login on a session.
//!
//! ```rust
//! use ysf_environment::{Environment, EnvironmentConfig, Session};
//!
//! let config = EnvironmentConfig::from_json(r#"{
//!     "environment": {
//!         "admin": { "enabled": true, "trigger": "admin", "login": true }
//!     }
//! }"#)?;
//! let mut env = Environment::new(config);
//! env.set_route(["admin", "dashboard"]);
//!
//! let mut session = Session::new();
//! assert!(!env.logged_in(&mut session, None, "127.0.0.1"));
//! env.login(&mut session, None, "127.0.0.1")?;
//! assert!(env.logged_in(&mut session, None, "127.0.0.1"));
//! # Ok::<(), ysf_environment::EnvironmentError>(())
//! ```

pub mod config;
pub mod environment;
pub mod error;
pub mod session;

pub use config::{EnvironmentConfig, EnvironmentSettings};
pub use environment::Environment;
pub use error::{EnvironmentError, Result};
pub use session::{Cookie, Session, SessionData, COOKIE_LIFETIME_SECS, SESSION_COOKIE};
