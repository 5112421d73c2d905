use std::process::Command;

/// Read a quoted property from `ioreg -rd1 -c IOPlatformExpertDevice`.
fn platform_property(output: &str, key: &str) -> Option<String> {
    output
        .lines()
        .find(|line| line.contains(key))
        .and_then(|line| line.split('=').nth(1))
        .map(|value| value.trim().trim_matches('"').to_string())
        .filter(|value| !value.is_empty())
}

/// Platform UUID and serial number.
pub fn machine_identifiers() -> Vec<String> {
    let Ok(output) = Command::new("ioreg")
        .args(["-rd1", "-c", "IOPlatformExpertDevice"])
        .output()
    else {
        return Vec::new();
    };
    let text = String::from_utf8_lossy(&output.stdout);

    ["IOPlatformUUID", "IOPlatformSerialNumber"]
        .iter()
        .filter_map(|key| platform_property(&text, key))
        .collect()
}
