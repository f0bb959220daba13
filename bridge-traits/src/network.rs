//! Network Monitoring Abstraction
//!
//! Provides the connectivity signal consumed by backend selection: when the
//! host reports no network, playback falls through to the local speech engine.

use crate::{error::Result, platform::PlatformSendSync};

/// Network connection status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkStatus {
    /// Connected to network
    Connected,
    /// Not connected to any network
    Disconnected,
    /// Connection status unknown or indeterminate
    Indeterminate,
}

/// Network monitor trait
///
/// # Platform Support
///
/// - **Desktop**: System network APIs (NetworkManager, SystemConfiguration, Windows Network List Manager)
/// - **Web**: `navigator.onLine`
/// - **Mobile**: Reachability / ConnectivityManager
///
/// # Example
///
/// ```ignore
/// use bridge_traits::network::NetworkMonitor;
///
/// async fn can_use_cloud(monitor: &dyn NetworkMonitor) -> bool {
///     monitor.is_connected().await
/// }
/// ```
#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
pub trait NetworkMonitor: PlatformSendSync {
    /// Get current network status
    async fn status(&self) -> Result<NetworkStatus>;

    /// Check if currently connected to any network.
    ///
    /// An `Indeterminate` status is treated as connected; the cloud request
    /// itself is the authoritative failure signal in that case.
    async fn is_connected(&self) -> bool {
        !matches!(self.status().await, Ok(NetworkStatus::Disconnected))
    }
}

/// Fixed-status monitor for tests, demos, and hosts without a real signal.
#[derive(Debug, Clone)]
pub struct StaticNetworkMonitor {
    status: NetworkStatus,
}

impl StaticNetworkMonitor {
    pub fn new(status: NetworkStatus) -> Self {
        Self { status }
    }

    pub fn online() -> Self {
        Self::new(NetworkStatus::Connected)
    }

    pub fn offline() -> Self {
        Self::new(NetworkStatus::Disconnected)
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
impl NetworkMonitor for StaticNetworkMonitor {
    async fn status(&self) -> Result<NetworkStatus> {
        Ok(self.status)
    }
}
