//! Hardware fingerprinting for license binding.
//!
//! The fingerprint is a SHA-256 digest over whatever stable machine
//! identifiers the platform exposes, hex-encoded to 64 characters. Raw
//! identifiers never leave the machine.

use sha2::{Digest, Sha256};

#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "macos")]
mod macos;
#[cfg(target_os = "windows")]
mod windows;

/// Returns the hardware fingerprint of the current machine.
pub fn get_hardware_id() -> String {
    fingerprint_from_components(&machine_components())
}

/// Hash identifier components into a fingerprint.
///
/// Components are length-prefixed so `["ab", "c"]` and `["a", "bc"]` differ.
pub fn fingerprint_from_components<S: AsRef<str>>(components: &[S]) -> String {
    let mut hasher = Sha256::new();
    for component in components {
        let bytes = component.as_ref().as_bytes();
        hasher.update((bytes.len() as u64).to_le_bytes());
        hasher.update(bytes);
    }
    hex::encode(hasher.finalize())
}

/// Platform identifiers plus OS and architecture.
fn machine_components() -> Vec<String> {
    let mut components = vec![
        std::env::consts::OS.to_string(),
        std::env::consts::ARCH.to_string(),
    ];

    #[cfg(target_os = "linux")]
    components.extend(linux::machine_identifiers());
    #[cfg(target_os = "macos")]
    components.extend(macos::machine_identifiers());
    #[cfg(target_os = "windows")]
    components.extend(windows::machine_identifiers());

    components
}
