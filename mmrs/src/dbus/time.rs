//! ModemManager network time proxy.

use zbus::{Result, proxy};

#[proxy(
    interface = "org.freedesktop.ModemManager1.Modem.Time",
    default_service = "org.freedesktop.ModemManager1"
)]
pub trait MMTime {
    /// Network time as an ISO 8601 string.
    fn get_network_time(&self) -> Result<String>;
}
