//! Cluster RAM quota sizing.
//!
//! Couchbase wants an explicit memory quota on 3.x clusters. We give it
//! 75% of the machine's total RAM as reported by `free -m`; when that
//! cannot be determined the caller falls back to a conservative default.

use regex::Regex;

use crate::error::ClusterError;

/// RAM quota to hand to the cluster: 75% of machine total.
pub async fn cluster_ram_mb() -> Result<u32, ClusterError> {
    let total = total_ram_mb().await?;
    tracing::info!("ram: total machine RAM {} MB", total);
    Ok(cluster_ram_mb_from(total))
}

pub fn cluster_ram_mb_from(total_mb: u32) -> u32 {
    total_mb * 75 / 100
}

async fn total_ram_mb() -> Result<u32, ClusterError> {
    let output = tokio::process::Command::new("free")
        .arg("-m")
        .output()
        .await
        .map_err(|e| ClusterError::Config(format!("failed to run free -m: {}", e)))?;
    parse_mem_total_mb(&String::from_utf8_lossy(&output.stdout))
}

/// Extract the `Mem:` total column from `free -m` output.
pub fn parse_mem_total_mb(free_output: &str) -> Result<u32, ClusterError> {
    let re = Regex::new(r"Mem:\s*([0-9]+)").expect("static regex");
    let caps = re.captures(free_output).ok_or_else(|| {
        ClusterError::Config(format!(
            "could not extract Mem total from free output: {:?}",
            free_output
        ))
    })?;
    caps[1]
        .parse::<u32>()
        .map_err(|e| ClusterError::Config(format!("bad Mem total: {}", e)))
}
