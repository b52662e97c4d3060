use wifid_ctrl::{CtrlClient, command};

use super::classify::Action;
use crate::driver::Driver;
use crate::error::CoreError;
use crate::model::RadioRecord;

/// Execute the command sequence `action` implies for one interface.
pub async fn apply_action(action: Action, ctrl: &CtrlClient, driver: &dyn Driver, radio: &RadioRecord) -> Result<(), CoreError> {
    tracing::debug!(iface = ctrl.name(), radio = %radio.name, %action, "applying config action");
    match action {
        Action::None => Ok(()),
        Action::UpdateBeacon => request_ok(ctrl, command::UPDATE_BEACON).await,
        Action::ReloadSecretKey => {
            request_ok(ctrl, command::RELOAD_WPA_PSK).await?;
            request_ok(ctrl, command::UPDATE_BEACON).await
        }
        Action::Toggle => {
            request_ok(ctrl, command::DISABLE).await?;
            request_ok(ctrl, command::ENABLE).await
        }
        Action::SigHup => driver.reload_security_daemon(radio),
        Action::Restart => driver.restart_security_daemon(radio),
    }
}

async fn request_ok(ctrl: &CtrlClient, cmd: &str) -> Result<(), CoreError> {
    ctrl.request_ok(cmd).await.map_err(|e| match e {
        wifid_ctrl::Error::NotReady => CoreError::NotReady {
            iface: ctrl.name().to_owned(),
        },
        other => other.into(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::path::Path;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use tempfile::TempDir;
    use tokio::net::UnixDatagram;
    use wifid_ctrl::CtrlConfig;

    use super::*;
    use crate::driver::NullDriver;
    use crate::model::{Band, Bandwidth, ChannelSpec};

    /// Minimal daemon: OK to everything, records commands.
    fn spawn_daemon(dir: &Path) -> Arc<Mutex<Vec<String>>> {
        let socket = UnixDatagram::bind(dir.join("wlan0")).unwrap();
        let log = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&log);
        tokio::spawn(async move {
            let mut buf = [0u8; 512];
            while let Ok((len, addr)) = socket.recv_from(&mut buf).await {
                seen.lock().unwrap().push(String::from_utf8_lossy(&buf[..len]).into_owned());
                if let Some(peer) = addr.as_pathname() {
                    let _ = socket.send_to(b"OK\n", peer).await;
                }
            }
        });
        log
    }

    async fn open_client(dir: &Path) -> CtrlClient {
        let config = CtrlConfig {
            ctrl_path: dir.join("wlan0"),
            local_dir: dir.to_path_buf(),
            reply_timeout: Duration::from_millis(500),
            buffer_size: 1024,
        };
        let mut client = CtrlClient::new("wlan0", config);
        client.open().await.unwrap();
        client
    }

    fn radio() -> RadioRecord {
        RadioRecord::new("wifi0", ChannelSpec::new(Band::Ghz5, 36, Bandwidth::Mhz80))
    }

    #[tokio::test]
    async fn reload_secret_key_sends_psk_reload_then_beacon() {
        let dir = TempDir::new().unwrap();
        let log = spawn_daemon(dir.path());
        let ctrl = open_client(dir.path()).await;

        apply_action(Action::ReloadSecretKey, &ctrl, &NullDriver, &radio()).await.unwrap();

        assert_eq!(*log.lock().unwrap(), vec!["ATTACH", "RELOAD_WPA_PSK", "UPDATE_BEACON"]);
    }

    #[tokio::test]
    async fn toggle_disables_then_enables() {
        let dir = TempDir::new().unwrap();
        let log = spawn_daemon(dir.path());
        let ctrl = open_client(dir.path()).await;

        apply_action(Action::Toggle, &ctrl, &NullDriver, &radio()).await.unwrap();

        assert_eq!(*log.lock().unwrap(), vec!["ATTACH", "DISABLE", "ENABLE"]);
    }

    #[tokio::test]
    async fn none_sends_nothing() {
        let dir = TempDir::new().unwrap();
        let log = spawn_daemon(dir.path());
        let ctrl = open_client(dir.path()).await;

        apply_action(Action::None, &ctrl, &NullDriver, &radio()).await.unwrap();

        assert_eq!(*log.lock().unwrap(), vec!["ATTACH"]);
    }

    #[tokio::test]
    async fn restart_goes_to_driver() {
        let dir = TempDir::new().unwrap();
        let ctrl = CtrlClient::new("wlan0", CtrlConfig::for_interface(dir.path(), "wlan0"));

        let err = apply_action(Action::Restart, &ctrl, &NullDriver, &radio()).await.unwrap_err();

        assert!(err.is_not_implemented());
    }

    #[tokio::test]
    async fn unopened_link_is_not_ready_with_iface() {
        let dir = TempDir::new().unwrap();
        let ctrl = CtrlClient::new("wlan0", CtrlConfig::for_interface(dir.path(), "wlan0"));

        let err = apply_action(Action::UpdateBeacon, &ctrl, &NullDriver, &radio()).await.unwrap_err();

        assert!(matches!(err, CoreError::NotReady { iface } if iface == "wlan0"));
    }
}
