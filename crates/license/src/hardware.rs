//! Machine fingerprinting for hardware-bound licenses.
//!
//! The fingerprint only uses properties that survive a reboot (no uptime, no
//! load, no clock speeds). Anything that cannot be read falls back to a fixed
//! placeholder so the id stays stable on the same machine.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sysinfo::{Networks, System};

use crate::document::canonical_json;

const UNKNOWN: &str = "unknown";
const ZERO_MAC: &str = "00:00:00:00:00:00";

/// Stable facts about the current machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemInfo {
    pub os_name: String,
    pub os_version: String,
    pub kernel_version: String,
    pub hostname: String,
    pub arch: String,
    pub cpu_count: usize,
    pub cpu_brand: String,
    pub total_memory: u64,
    pub mac_address: String,
}

impl SystemInfo {
    /// Read the current machine's properties.
    pub fn collect() -> Self {
        let mut sys = System::new();
        sys.refresh_memory();
        sys.refresh_cpu_all();

        let cpu_brand = sys
            .cpus()
            .first()
            .map(|c| c.brand().trim().to_string())
            .filter(|b| !b.is_empty())
            .unwrap_or_else(|| UNKNOWN.to_string());

        Self {
            os_name: System::name().unwrap_or_else(|| UNKNOWN.to_string()),
            os_version: System::os_version().unwrap_or_else(|| UNKNOWN.to_string()),
            kernel_version: System::kernel_version().unwrap_or_else(|| UNKNOWN.to_string()),
            hostname: System::host_name().unwrap_or_else(|| UNKNOWN.to_string()),
            arch: std::env::consts::ARCH.to_string(),
            cpu_count: sys.cpus().len(),
            cpu_brand,
            total_memory: sys.total_memory(),
            mac_address: primary_mac_address(),
        }
    }
}

/// MAC of the first non-loopback interface, by interface name.
fn primary_mac_address() -> String {
    let networks = Networks::new_with_refreshed_list();
    let mut candidates: Vec<(String, String)> = networks
        .iter()
        .map(|(name, data)| (name.to_string(), data.mac_address().to_string().to_lowercase()))
        .filter(|(name, mac)| name != "lo" && mac != ZERO_MAC)
        .collect();
    candidates.sort();

    candidates
        .into_iter()
        .next()
        .map(|(_, mac)| mac)
        .unwrap_or_else(|| ZERO_MAC.to_string())
}

fn sha256_hex(input: &str) -> String {
    hex::encode(Sha256::digest(input.as_bytes()))
}

/// Hardware id for `info`.
///
/// The detailed form hashes the whole [`SystemInfo`] as canonical JSON; the
/// compact form only hashes MAC address and hostname, which tolerates OS
/// upgrades.
pub fn hardware_id(info: &SystemInfo, detailed: bool) -> String {
    if detailed {
        let value = serde_json::to_value(info).unwrap_or(serde_json::Value::Null);
        sha256_hex(&canonical_json(&value))
    } else {
        sha256_hex(&format!("{}:{}", info.mac_address, info.hostname))
    }
}

/// Hardware id of the running machine (detailed form).
pub fn current_hardware_id() -> String {
    hardware_id(&SystemInfo::collect(), true)
}

/// Signature stored in a license to bind it to a machine.
pub fn hardware_signature(hardware_id: &str) -> String {
    sha256_hex(hardware_id)
}

/// Whether `hardware_id` was produced on this machine.
pub fn validate_hardware_id(hardware_id: &str) -> bool {
    !hardware_id.is_empty() && hardware_id == current_hardware_id()
}
