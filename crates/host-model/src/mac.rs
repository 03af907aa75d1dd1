//! MAC address normalization
//!
//! Lease-table keys and boot endpoints are keyed by MAC address, so every
//! MAC entering the system goes through `normalize_mac` first. The
//! canonical form is lowercase, colon-separated octets.

use crate::error::HostModelError;

/// Normalize a MAC address to lowercase `aa:bb:cc:dd:ee:ff` form.
///
/// Accepts colon- or dash-separated octets in either case. Anything else
/// is rejected.
pub fn normalize_mac(mac: &str) -> Result<String, HostModelError> {
    let parts: Vec<&str> = mac.split([':', '-']).collect();
    if parts.len() != 6 {
        return Err(HostModelError::InvalidMac(mac.to_string()));
    }

    let mut octets = Vec::with_capacity(6);
    for part in parts {
        if part.len() != 2 || !part.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(HostModelError::InvalidMac(mac.to_string()));
        }
        octets.push(part.to_ascii_lowercase());
    }

    Ok(octets.join(":"))
}

/// Normalize a MAC address supplied as raw bytes (e.g. the DHCP `chaddr`
/// field). Returns `None` for anything that is not exactly six octets.
pub fn mac_from_bytes(bytes: &[u8]) -> Option<String> {
    if bytes.len() != 6 {
        return None;
    }
    Some(
        bytes
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect::<Vec<_>>()
            .join(":"),
    )
}
