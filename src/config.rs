//! Resource server configuration.
//!
//! The configuration is the JSON document a deployment already ships for the
//! resource server. Only the values the handlers depend on are modelled;
//! unknown keys are ignored.
//!
//! ```rust
//! use uma_resource_server::config::{ServerConfig, substitute_owner};
//!
//! let config = ServerConfig::from_json_str(r#"{
//!     "rs": { "id": "UMA-Resource-Server" },
//!     "as": {
//!         "connect": { "base_url": "https://as.example.com/openam" },
//!         "cookie": "iPlanetDirectoryPro",
//!         "uma": {
//!             "resource_set": { "path": "uma/realms/root/resource_set" },
//!             "policies": { "path": "json/realms/root/users/{owner}/uma/policies" },
//!             "sharedwithme": {
//!                 "path": "json/realms/root/users/{owner}/oauth2/resources/sets",
//!                 "accept": "protocol=1.0,resource=1.0",
//!                 "sortkeys": "name",
//!                 "queryfilter": "! resourceOwnerId eq \"{owner}\""
//!             }
//!         },
//!         "admin": { "user": "amadmin", "password": "secret", "authenticate_path": "json/realms/root/authenticate" }
//!     }
//! }"#).unwrap();
//!
//! assert!(config.validate().is_ok());
//! assert_eq!(
//!     substitute_owner(config.sharedwithme_path().unwrap(), "aadams"),
//!     "json/realms/root/users/aadams/oauth2/resources/sets"
//! );
//! ```

use crate::error::{BuildError, BuildResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Substitution token used in path and filter templates.
pub const OWNER_TOKEN: &str = "{owner}";

/// Replace every `{owner}` token in `template`.
pub fn substitute_owner(template: &str, owner: &str) -> String {
    template.replace(OWNER_TOKEN, owner)
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub rs: ResourceServerSection,
    #[serde(default, rename = "as")]
    pub authz: AuthzServerSection,
}

/// `rs` section: settings about this deployment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceServerSection {
    /// Identifier the Authorization Server records as `resourceServer`
    pub id: Option<String>,
}

/// `as` section: the Authorization Server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthzServerSection {
    pub connect: Option<ConnectSettings>,
    /// Name of the SSO session header/cookie
    pub cookie: Option<String>,
    #[serde(default)]
    pub uma: UmaSection,
    pub admin: Option<AdminSettings>,
}

/// Connection settings for a REST backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectSettings {
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl ConnectSettings {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UmaSection {
    pub resource_set: Option<PathSettings>,
    pub policies: Option<PathSettings>,
    pub sharedwithme: Option<SharedWithMeSettings>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathSettings {
    #[serde(default)]
    pub path: String,
}

/// Settings for the "shared with me" search on the Authorization Server.
///
/// `accept` and `sortkeys` are optional; an empty value is not sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SharedWithMeSettings {
    /// Path template containing `{owner}`
    pub path: String,
    /// Value of the `Accept-API-Version` header
    pub accept: String,
    pub sortkeys: String,
    /// Query filter template containing `{owner}`
    pub queryfilter: String,
}

/// Proxy-admin credentials used to obtain a privileged session.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminSettings {
    pub user: String,
    pub password: String,
    pub authenticate_path: String,
}

impl std::fmt::Debug for AdminSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminSettings")
            .field("user", &self.user)
            .field("password", &"***")
            .field("authenticate_path", &self.authenticate_path)
            .finish()
    }
}

impl ServerConfig {
    /// Parse a configuration document.
    pub fn from_json_str(source: &str) -> BuildResult<Self> {
        serde_json::from_str(source).map_err(|e| BuildError::InvalidConfiguration {
            message: e.to_string(),
        })
    }

    /// Parse an already-loaded configuration value.
    pub fn from_value(value: Value) -> BuildResult<Self> {
        serde_json::from_value(value).map_err(|e| BuildError::InvalidConfiguration {
            message: e.to_string(),
        })
    }

    /// Check that every value the default handlers need is present.
    ///
    /// Individual handlers only check their own keys; this is the
    /// all-or-nothing check for deployments that want to fail at startup.
    pub fn validate(&self) -> BuildResult<()> {
        self.rs_id()?;
        self.connect()?;
        self.cookie_name()?;
        self.resource_set_path()?;
        self.policies_path()?;
        self.sharedwithme()?;
        self.admin()?;
        Ok(())
    }

    pub fn rs_id(&self) -> BuildResult<&str> {
        non_empty(self.rs.id.as_deref(), "rs.id")
    }

    pub fn connect(&self) -> BuildResult<&ConnectSettings> {
        match &self.authz.connect {
            Some(connect) if !connect.base_url.trim().is_empty() => Ok(connect),
            _ => Err(BuildError::missing("as.connect.base_url")),
        }
    }

    pub fn cookie_name(&self) -> BuildResult<&str> {
        non_empty(self.authz.cookie.as_deref(), "as.cookie")
    }

    pub fn resource_set_path(&self) -> BuildResult<&str> {
        non_empty(
            self.authz.uma.resource_set.as_ref().map(|p| p.path.as_str()),
            "as.uma.resource_set.path",
        )
    }

    pub fn policies_path(&self) -> BuildResult<&str> {
        non_empty(
            self.authz.uma.policies.as_ref().map(|p| p.path.as_str()),
            "as.uma.policies.path",
        )
    }

    pub fn sharedwithme(&self) -> BuildResult<&SharedWithMeSettings> {
        let settings = self
            .authz
            .uma
            .sharedwithme
            .as_ref()
            .ok_or_else(|| BuildError::missing("as.uma.sharedwithme"))?;
        non_empty(Some(settings.path.as_str()), "as.uma.sharedwithme.path")?;
        non_empty(Some(settings.queryfilter.as_str()), "as.uma.sharedwithme.queryfilter")?;
        Ok(settings)
    }

    pub fn sharedwithme_path(&self) -> BuildResult<&str> {
        self.sharedwithme().map(|s| s.path.as_str())
    }

    pub fn admin(&self) -> BuildResult<&AdminSettings> {
        let admin = self
            .authz
            .admin
            .as_ref()
            .ok_or_else(|| BuildError::missing("as.admin"))?;
        non_empty(Some(admin.user.as_str()), "as.admin.user")?;
        non_empty(Some(admin.password.as_str()), "as.admin.password")?;
        non_empty(Some(admin.authenticate_path.as_str()), "as.admin.authenticate_path")?;
        Ok(admin)
    }
}

fn non_empty<'a>(value: Option<&'a str>, key: &str) -> BuildResult<&'a str> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(BuildError::missing(key)),
    }
}
