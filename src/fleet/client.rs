use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::ClusterError;
use crate::fleet::unit::UnitOption;

/// Where fleet's HTTP API lives when tunnelled to the local machine.
pub const DEFAULT_FLEET_API: &str = "http://127.0.0.1:49153/fleet/v1";

/// `GET /machines` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct Machine {
    pub id: String,
    #[serde(rename = "primaryIP", default)]
    pub primary_ip: String,
}

#[derive(Debug, Deserialize)]
struct MachinesResponse {
    #[serde(default)]
    machines: Vec<Machine>,
}

/// Body of a unit submission: the deserialized unit file plus the state
/// the scheduler should drive it to.
#[derive(Debug, Clone, Serialize)]
pub struct UnitSubmission {
    #[serde(rename = "desiredState")]
    pub desired_state: String,
    pub options: Vec<UnitOption>,
}

/// `GET /units` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct UnitState {
    pub name: String,
    #[serde(rename = "desiredState", default)]
    pub desired_state: String,
    #[serde(rename = "currentState", default)]
    pub current_state: String,
}

#[derive(Debug, Deserialize)]
struct UnitsPage {
    #[serde(default)]
    units: Vec<UnitState>,
    #[serde(rename = "nextPageToken")]
    next_page_token: Option<String>,
}

/// Client for the fleet unit-scheduling HTTP API.
#[derive(Clone)]
pub struct FleetClient {
    http: reqwest::Client,
    base_url: String,
}

impl FleetClient {
    pub fn new(base_url: &str) -> Self {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(10))
            .build()
            .expect("failed to build fleet HTTP client");
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The machines currently in the fleet cluster. Also doubles as the
    /// API availability probe.
    pub async fn machines(&self) -> Result<Vec<Machine>, ClusterError> {
        let url = format!("{}/machines", self.base_url);
        let resp = self.http.get(&url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ClusterError::RemoteStatus {
                url,
                status: status.as_u16(),
                body,
            });
        }
        let body = resp.text().await?;
        let parsed: MachinesResponse = serde_json::from_str(&body).map_err(|e| {
            ClusterError::RemoteContract(format!("GET {}: {} (body: {})", url, e, body))
        })?;
        Ok(parsed.machines)
    }

    /// Submit a unit and set its desired state in one call.
    pub async fn submit_unit(
        &self,
        name: &str,
        submission: &UnitSubmission,
    ) -> Result<(), ClusterError> {
        debug!("fleet: submitting unit {}", name);
        self.put_unit(name, submission).await
    }

    /// Drive an already-submitted unit to a new desired state.
    pub async fn set_desired_state(&self, name: &str, state: &str) -> Result<(), ClusterError> {
        self.put_unit(name, &serde_json::json!({ "desiredState": state }))
            .await
    }

    async fn put_unit(
        &self,
        name: &str,
        body: &impl Serialize,
    ) -> Result<(), ClusterError> {
        let url = format!("{}/units/{}", self.base_url, name);
        let resp = self.http.put(&url).json(body).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ClusterError::RemoteStatus {
                url,
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }

    /// Delete a unit. An unknown unit is not an error; the goal state
    /// (unit gone) already holds.
    pub async fn destroy_unit(&self, name: &str) -> Result<(), ClusterError> {
        let url = format!("{}/units/{}", self.base_url, name);
        let resp = self.http.delete(&url).send().await?;
        let status = resp.status();
        if status.as_u16() == 404 {
            info!("fleet: unit {} already gone", name);
            return Ok(());
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ClusterError::RemoteStatus {
                url,
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }

    /// All units, following the `nextPageToken` cursor.
    pub async fn list_units(&self) -> Result<Vec<UnitState>, ClusterError> {
        let mut units = Vec::new();
        let mut token: Option<String> = None;

        loop {
            let url = match &token {
                Some(t) => format!("{}/units?nextPageToken={}", self.base_url, t),
                None => format!("{}/units", self.base_url),
            };
            let resp = self.http.get(&url).send().await?;
            let status = resp.status();
            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                return Err(ClusterError::RemoteStatus {
                    url,
                    status: status.as_u16(),
                    body,
                });
            }
            let body = resp.text().await?;
            let page: UnitsPage = serde_json::from_str(&body).map_err(|e| {
                ClusterError::RemoteContract(format!("GET {}: {} (body: {})", url, e, body))
            })?;

            units.extend(page.units);
            match page.next_page_token {
                Some(t) if !t.is_empty() => token = Some(t),
                _ => break,
            }
        }

        Ok(units)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_submission_uses_fleet_field_names() {
        let submission = UnitSubmission {
            desired_state: "launched".to_string(),
            options: vec![UnitOption {
                section: "Service".to_string(),
                name: "ExecStart".to_string(),
                value: "/usr/bin/true".to_string(),
            }],
        };
        let json = serde_json::to_value(&submission).unwrap();
        assert_eq!(json["desiredState"], "launched");
        assert_eq!(json["options"][0]["section"], "Service");
        assert_eq!(json["options"][0]["name"], "ExecStart");
    }

    #[test]
    fn decodes_units_page() {
        let body = r#"{
            "units": [
                {"name": "couchbase_node@1.service",
                 "desiredState": "launched",
                 "currentState": "launched",
                 "machineID": "a91c394439734375aa256d7da1410132"}
            ],
            "nextPageToken": "abc123"
        }"#;
        let page: UnitsPage = serde_json::from_str(body).unwrap();
        assert_eq!(page.units.len(), 1);
        assert_eq!(page.units[0].name, "couchbase_node@1.service");
        assert_eq!(page.next_page_token.as_deref(), Some("abc123"));
    }

    #[test]
    fn decodes_machines() {
        let body = r#"{"machines":[{"id":"a91c394439734375aa256d7da1410132","primaryIP":"172.17.8.101"}]}"#;
        let parsed: MachinesResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.machines.len(), 1);
        assert_eq!(parsed.machines[0].primary_ip, "172.17.8.101");
    }
}
