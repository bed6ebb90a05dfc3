//! ModemManager main interface proxy.

use zbus::{Result, proxy};

/// Proxy for the main ModemManager interface.
///
/// Modems themselves are discovered through the standard
/// `org.freedesktop.DBus.ObjectManager` interface on the same path.
#[proxy(
    interface = "org.freedesktop.ModemManager1",
    default_service = "org.freedesktop.ModemManager1",
    default_path = "/org/freedesktop/ModemManager1"
)]
pub trait MM {
    /// Asks ModemManager to scan for new devices.
    fn scan_devices(&self) -> Result<()>;

    /// ModemManager daemon version, e.g. "1.22.0".
    #[zbus(property)]
    fn version(&self) -> Result<String>;
}
