//! NetworkManager main interface proxy.

use zbus::{Result, proxy};
use zvariant::OwnedObjectPath;

/// Proxy for the parts of NetworkManager used to read traffic counters.
#[proxy(
    interface = "org.freedesktop.NetworkManager",
    default_service = "org.freedesktop.NetworkManager",
    default_path = "/org/freedesktop/NetworkManager"
)]
pub trait NM {
    /// Resolves a network interface name to its device object.
    fn get_device_by_ip_iface(&self, iface: &str) -> Result<OwnedObjectPath>;
}
