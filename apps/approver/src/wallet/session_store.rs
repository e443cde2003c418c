//! JSON file holding the last settled WalletConnect session.

use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;
use walletconnect::Session;

/// Returns the stored session unless it is missing, unreadable as a session, or expired.
/// Corrupt and expired files are removed.
pub(super) fn load(path: &Path, now_secs: u64) -> Result<Option<Session>> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(e).with_context(|| format!("read session file {}", path.display()));
        }
    };
    let session: Session = match serde_json::from_str(&raw) {
        Ok(session) => session,
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "discarding unreadable WalletConnect session file"
            );
            clear(path)?;
            return Ok(None);
        }
    };
    if session.is_expired(now_secs) {
        tracing::info!(topic = %session.topic, "stored WalletConnect session expired");
        clear(path)?;
        return Ok(None);
    }
    Ok(Some(session))
}

pub(super) fn save(path: &Path, session: &Session) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(session).context("serialize session")?;
    let mut file = private_file(path)
        .with_context(|| format!("open session file {}", path.display()))?;
    file.write_all(json.as_bytes())
        .with_context(|| format!("write session file {}", path.display()))
}

/// The file holds the session key, so it is readable by the owner only.
#[cfg(unix)]
fn private_file(path: &Path) -> std::io::Result<std::fs::File> {
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    // `mode` only applies on creation.
    file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    Ok(file)
}

#[cfg(not(unix))]
fn private_file(path: &Path) -> std::io::Result<std::fs::File> {
    std::fs::File::create(path)
}

pub(super) fn clear(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).with_context(|| format!("remove session file {}", path.display())),
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::{session, temp_path};
    use super::*;

    const ADDR: &str = "TR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj6t";

    #[test]
    fn missing_file_is_none() {
        assert!(load(&temp_path("missing.json"), 0).unwrap().is_none());
    }

    #[test]
    fn save_then_load_keeps_session() {
        let path = temp_path("store/roundtrip.json");
        let s = session("tron:0x2b6653dc", ADDR, "TronLink", 2_000);
        save(&path, &s).unwrap();

        let loaded = load(&path, 1_000).unwrap().unwrap();
        assert_eq!(loaded.topic, s.topic);
        assert_eq!(loaded.peer.name, "TronLink");
        assert_eq!(loaded.account_on("tron:0x2b6653dc").unwrap().address, ADDR);
        clear(&path).unwrap();
    }

    #[test]
    fn expired_session_is_dropped_and_file_removed() {
        let path = temp_path("expired.json");
        save(&path, &session("tron:0x2b6653dc", ADDR, "TronLink", 100)).unwrap();

        assert!(load(&path, 100).unwrap().is_none());
        assert!(!path.exists());
    }

    #[test]
    fn corrupt_file_is_discarded() {
        let path = temp_path("corrupt.json");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{ not json").unwrap();

        assert!(load(&path, 0).unwrap().is_none());
        assert!(!path.exists());
    }

    #[cfg(unix)]
    #[test]
    fn saved_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let path = temp_path("private.json");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "old").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

        save(&path, &session("tron:0x2b6653dc", ADDR, "TronLink", 2_000)).unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert!(load(&path, 1_000).unwrap().is_some());
        clear(&path).unwrap();
    }
}
