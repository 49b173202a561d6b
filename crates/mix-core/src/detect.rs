use mix_schema::{ConfigEntry, LockConfigEntry, LockEntry, Package};

/// Whether a manifest config entry differs from what was last applied at its path.
///
/// No recorded entry, a different kind, or a different fingerprint all count
/// as a change. Raw payloads compare by digest, structured payloads by their
/// canonical serialization, so key order and whitespace never matter.
pub fn config_changed(entry: &ConfigEntry, recorded: Option<&LockConfigEntry>) -> bool {
    let Some(recorded) = recorded else {
        return true;
    };
    if entry.kind() != recorded.kind {
        return true;
    }
    LockConfigEntry::record(entry).data != recorded.data
}

/// Whether any configuration surface of `pkg` needs to be re-applied.
///
/// A surface recorded in the lock but no longer declared also counts, so the
/// lock sheds it on the next reconfigure.
pub fn package_reconfigured(pkg: &Package, recorded: &LockEntry) -> bool {
    pkg.config
        .iter()
        .any(|entry| config_changed(entry, recorded.config_entry(&entry.path)))
        || recorded
            .config
            .iter()
            .any(|old| !pkg.config.iter().any(|entry| entry.path == old.path))
}
