//! NetworkManager device statistics proxy.

use zbus::{Result, proxy};

/// Proxy for `Device.Statistics`.
///
/// Counters are only refreshed while `RefreshRateMs` is non-zero.
#[proxy(
    interface = "org.freedesktop.NetworkManager.Device.Statistics",
    default_service = "org.freedesktop.NetworkManager"
)]
pub trait NMDeviceStatistics {
    #[zbus(property)]
    fn refresh_rate_ms(&self) -> Result<u32>;

    #[zbus(property)]
    fn set_refresh_rate_ms(&self, rate: u32) -> Result<()>;

    #[zbus(property)]
    fn rx_bytes(&self) -> Result<u64>;

    #[zbus(property)]
    fn tx_bytes(&self) -> Result<u64>;
}
