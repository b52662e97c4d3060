//! Security-daemon config files: load, diff, classify, write back.

pub mod apply;
pub mod classify;
pub mod setters;
pub mod store;
pub mod supplicant;

use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use crate::error::CoreError;

pub use apply::apply_action;
pub use classify::{Action, ParamChange, classify, classify_sections, diff};
pub use store::{ConfigStore, Section, SectionKey, SectionKind};
pub use supplicant::SupplicantConfig;

/// Write `contents` to a temp file beside `path`, then rename over it.
/// On any failure the temp file is discarded and `path` is left as it was.
pub(crate) fn atomic_write(path: &Path, contents: &[u8]) -> Result<(), CoreError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| CoreError::io(dir, e))?;
    tmp.write_all(contents).map_err(|e| CoreError::io(tmp.path(), e))?;
    tmp.as_file().sync_all().map_err(|e| CoreError::io(tmp.path(), e))?;
    tmp.persist(path).map_err(|e| CoreError::io(path, e.error))?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn atomic_write_replaces_contents() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("hostapd.conf");
        std::fs::write(&path, "old\n").unwrap();

        atomic_write(&path, b"new\n").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "new\n");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn failed_write_leaves_destination_untouched() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("hostapd.conf");
        std::fs::write(&path, "interface=wlan0\n").unwrap();

        let mut store = ConfigStore::load(&path).unwrap();
        // Bypass `set` validation to force a render failure.
        store.add_bss("wlan0.1").params.insert("ssid".into(), "a\nb".into());

        assert!(store.write(&path).is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "interface=wlan0\n");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn write_to_missing_directory_is_io_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("missing").join("hostapd.conf");
        let err = ConfigStore::new().write(&path).unwrap_err();
        assert!(matches!(err, CoreError::Io { .. }));
    }
}
