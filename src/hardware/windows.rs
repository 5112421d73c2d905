use std::process::Command;

/// `MachineGuid` from the registry.
fn machine_guid() -> Option<String> {
    let output = Command::new("reg")
        .args([
            "query",
            r"HKLM\SOFTWARE\Microsoft\Cryptography",
            "/v",
            "MachineGuid",
        ])
        .output()
        .ok()?;
    let text = String::from_utf8_lossy(&output.stdout);
    text.lines()
        .find(|line| line.contains("MachineGuid"))
        .and_then(|line| line.split_whitespace().last())
        .map(str::to_string)
}

/// Baseboard serial number via `wmic`.
fn board_serial() -> Option<String> {
    let output = Command::new("wmic")
        .args(["baseboard", "get", "SerialNumber"])
        .output()
        .ok()?;
    let text = String::from_utf8_lossy(&output.stdout);
    text.lines()
        .nth(1)
        .map(|line| line.trim().to_string())
        .filter(|value| !value.is_empty())
}

pub fn machine_identifiers() -> Vec<String> {
    [machine_guid(), board_serial()]
        .into_iter()
        .flatten()
        .collect()
}
