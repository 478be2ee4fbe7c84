use std::time::Duration;

use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::ClusterError;

/// Factory-default credentials of an uninitialized Couchbase node. Used
/// only for probing; a stored password equal to these is rejected.
pub const DEFAULT_ADMIN_USERNAME: &str = "admin";
pub const DEFAULT_ADMIN_PASSWORD: &str = "password";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminCredentials {
    pub username: String,
    pub password: String,
}

impl AdminCredentials {
    pub fn factory_default() -> Self {
        Self {
            username: DEFAULT_ADMIN_USERNAME.to_string(),
            password: DEFAULT_ADMIN_PASSWORD.to_string(),
        }
    }

    pub fn is_factory_default(&self) -> bool {
        self.username == DEFAULT_ADMIN_USERNAME && self.password == DEFAULT_ADMIN_PASSWORD
    }

    /// Parse the `user:pass` form stored in the coordination store.
    pub fn parse(userpass: &str) -> Result<Self, ClusterError> {
        let (username, password) = userpass.split_once(':').ok_or_else(|| {
            ClusterError::Config(format!("invalid user:pass string: {}", userpass))
        })?;
        let creds = Self {
            username: username.to_string(),
            password: password.to_string(),
        };
        if creds.is_factory_default() {
            return Err(ClusterError::Config(format!(
                "using the factory default {}/{} as cluster credentials is not allowed",
                DEFAULT_ADMIN_USERNAME, DEFAULT_ADMIN_PASSWORD
            )));
        }
        Ok(creds)
    }
}

/// Which credential set a POST tries first. The other set is tried once on
/// failure, which absorbs the race where the cluster password has just
/// been (or is just being) set and either set may be the valid one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialOrder {
    TryDefaultFirst,
    TryStoredFirst,
}

/// Client for the Couchbase admin REST surface.
///
/// Cheaply cloneable. The generous request timeout is deliberate: the
/// rebalance and addNode controllers can block for a while before
/// answering.
#[derive(Clone)]
pub struct AdminClient {
    http: reqwest::Client,
    stored: AdminCredentials,
}

impl AdminClient {
    pub fn new(stored: AdminCredentials) -> Self {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(60))
            .build()
            .expect("failed to build admin HTTP client");
        Self { http, stored }
    }

    pub fn stored_credentials(&self) -> &AdminCredentials {
        &self.stored
    }

    /// Authenticated JSON GET with the stored credentials.
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, ClusterError> {
        let resp = self
            .http
            .get(url)
            .basic_auth(&self.stored.username, Some(&self.stored.password))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ClusterError::RemoteStatus {
                url: url.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        let body = resp.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            ClusterError::RemoteContract(format!("GET {}: {} (body: {})", url, e, body))
        })
    }

    /// Form-encoded POST under the dual-credential policy. When the first
    /// credential set fails the other is tried once; the error of the last
    /// attempt is what surfaces.
    pub async fn post_form(
        &self,
        order: CredentialOrder,
        url: &str,
        form: &[(&str, &str)],
    ) -> Result<(), ClusterError> {
        let (first, second) = match order {
            CredentialOrder::TryDefaultFirst => (AdminCredentials::factory_default(), self.stored.clone()),
            CredentialOrder::TryStoredFirst => (self.stored.clone(), AdminCredentials::factory_default()),
        };

        match self.post_with_creds(&first, url, form).await {
            Ok(()) => Ok(()),
            Err(e) => {
                debug!(
                    "admin: POST {} failed as {}: {}, retrying with the other credentials",
                    url, first.username, e
                );
                self.post_with_creds(&second, url, form).await
            }
        }
    }

    async fn post_with_creds(
        &self,
        creds: &AdminCredentials,
        url: &str,
        form: &[(&str, &str)],
    ) -> Result<(), ClusterError> {
        let resp = self
            .http
            .post(url)
            .basic_auth(&creds.username, Some(&creds.password))
            .form(form)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ClusterError::RemoteStatus {
                url: url.to_string(),
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }

    /// Probe whether the cluster password has already been set: the
    /// password-settings endpoint answering 401 to the factory defaults is
    /// the positive signal that initialization already happened.
    pub async fn is_password_set(&self, base_url: &str) -> Result<bool, ClusterError> {
        let url = format!("{}/settings/web", base_url);
        let resp = self
            .http
            .get(&url)
            .basic_auth(DEFAULT_ADMIN_USERNAME, Some(DEFAULT_ADMIN_PASSWORD))
            .send()
            .await?;
        Ok(resp.status().as_u16() == 401)
    }

    /// Unauthenticated liveness probe of a node's REST root.
    pub async fn verify_rest_endpoint(&self, ip: &str, port: u16) -> bool {
        let url = format!("http://{}:{}/", ip, port);
        match self
            .http
            .get(&url)
            .timeout(Duration::from_secs(5))
            .send()
            .await
        {
            Ok(resp) => resp.status().as_u16() == 200,
            Err(e) => {
                warn!("admin: REST probe of {} failed: {}", url, e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_userpass() {
        let creds = AdminCredentials::parse("bob:secret").unwrap();
        assert_eq!(creds.username, "bob");
        assert_eq!(creds.password, "secret");
    }

    #[test]
    fn rejects_missing_delimiter() {
        assert!(matches!(
            AdminCredentials::parse("bobsecret"),
            Err(ClusterError::Config(_))
        ));
    }

    #[test]
    fn rejects_factory_default() {
        assert!(matches!(
            AdminCredentials::parse("admin:password"),
            Err(ClusterError::Config(_))
        ));
    }

    #[test]
    fn password_may_contain_colons() {
        let creds = AdminCredentials::parse("bob:se:cr:et").unwrap();
        assert_eq!(creds.password, "se:cr:et");
    }
}
