// Copyright 2024 RustFS Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.


use atomic_enum::atomic_enum;
use erasurefs_config::{DEFAULT_SYSTEMD_NOTIFY, ENV_SYSTEMD_NOTIFY};
use erasurefs_utils::get_env_bool;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tracing::{error, info};

#[cfg(target_os = "linux")]
fn notify_systemd(state: ServiceState) {
    use libsystemd::daemon::{NotifyState, notify};
    use tracing::debug;

    let notify_state = match state {
        ServiceState::Starting => NotifyState::Status("Starting...".to_string()),
        ServiceState::Ready => NotifyState::Ready,
        ServiceState::Stopping => NotifyState::Stopping,
        ServiceState::Stopped => NotifyState::Status("Stopped".to_string()),
    };

    match notify(false, &[notify_state]) {
        Ok(true) => debug!("notified systemd: {:?}", state),
        Ok(false) => debug!("systemd notification socket not set, skipping {:?}", state),
        Err(e) => error!("failed to notify systemd of {:?}: {}", state, e),
    }
}

#[cfg(not(target_os = "linux"))]
fn notify_systemd(state: ServiceState) {
    tracing::debug!("systemd notifications are not available on this platform (state: {:?})", state);
}

#[derive(Debug)]
pub enum ShutdownSignal {
    CtrlC,
    #[cfg(unix)]
    Sigterm,
}

#[atomic_enum]
#[derive(PartialEq)]
pub(crate) enum ServiceState {
    Starting,
    Ready,
    Stopping,
    Stopped,
}

#[cfg(unix)]
pub(crate) async fn wait_for_shutdown() -> ShutdownSignal {
    use tokio::signal::unix::{SignalKind, signal};

    let sigterm = async {
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("received Ctrl-C signal");
            ShutdownSignal::CtrlC
        }
        _ = sigterm => {
            info!("received SIGTERM signal");
            ShutdownSignal::Sigterm
        }
    }
}

#[cfg(not(unix))]
pub(crate) async fn wait_for_shutdown() -> ShutdownSignal {
    let _ = tokio::signal::ctrl_c().await;
    info!("received Ctrl-C signal");
    ShutdownSignal::CtrlC
}

/// Tracks the lifecycle of this process and mirrors it to systemd.
#[derive(Clone)]
pub(crate) struct ServiceStateManager {
    state: Arc<AtomicServiceState>,
    systemd: bool,
}

impl ServiceStateManager {
    pub fn new() -> Self {
        Self {
            state: Arc::new(AtomicServiceState::new(ServiceState::Starting)),
            systemd: get_env_bool(ENV_SYSTEMD_NOTIFY, DEFAULT_SYSTEMD_NOTIFY),
        }
    }

    pub fn update(&self, new_state: ServiceState) {
        self.state.store(new_state, Ordering::SeqCst);
        info!(target: "erasurefs::service", "service state: {:?}", new_state);
        if self.systemd {
            notify_systemd(new_state);
        }
    }

    pub fn current_state(&self) -> ServiceState {
        self.state.load(Ordering::SeqCst)
    }
}

impl Default for ServiceStateManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_state_manager() {
        temp_env::with_var(ENV_SYSTEMD_NOTIFY, Some("false"), || {
            let manager = ServiceStateManager::new();
            assert_eq!(manager.current_state(), ServiceState::Starting);

            let shared = manager.clone();
            for state in [ServiceState::Ready, ServiceState::Stopping, ServiceState::Stopped] {
                manager.update(state);
                assert_eq!(shared.current_state(), state);
            }
        });
    }
}
