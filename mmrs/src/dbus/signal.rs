//! ModemManager extended signal quality proxy.

use std::collections::HashMap;
use zbus::{Result, proxy};
use zvariant::OwnedValue;

/// Proxy for `Modem.Signal`.
///
/// Values are only reported after `setup()` was called with a non-zero rate.
#[proxy(
    interface = "org.freedesktop.ModemManager1.Modem.Signal",
    default_service = "org.freedesktop.ModemManager1"
)]
pub trait MMSignal {
    /// Sets the refresh rate in seconds; 0 disables reporting.
    fn setup(&self, rate: u32) -> Result<()>;

    #[zbus(property)]
    fn rate(&self) -> Result<u32>;

    /// LTE values (`rsrp`, `rsrq`, `rssi`, `snr`).
    #[zbus(property)]
    fn lte(&self) -> Result<HashMap<String, OwnedValue>>;

    /// 5G NR values (`rsrp`, `rsrq`, `snr`).
    #[zbus(property)]
    fn nr5g(&self) -> Result<HashMap<String, OwnedValue>>;
}
