use std::fs;

/// Files that hold stable per-machine identifiers. Missing or unreadable
/// files are skipped (board serials usually need root).
const ID_FILES: &[&str] = &[
    "/etc/machine-id",
    "/var/lib/dbus/machine-id",
    "/sys/devices/virtual/dmi/id/product_uuid",
    "/sys/devices/virtual/dmi/id/board_serial",
];

pub fn machine_identifiers() -> Vec<String> {
    ID_FILES
        .iter()
        .filter_map(|path| fs::read_to_string(path).ok())
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .collect()
}
