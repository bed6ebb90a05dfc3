//! ModemManager location proxy.

use std::collections::HashMap;
use zbus::{Result, proxy};
use zvariant::OwnedValue;

/// Proxy for `Modem.Location`.
///
/// Location dictionaries are keyed by `MMModemLocationSource`.
#[proxy(
    interface = "org.freedesktop.ModemManager1.Modem.Location",
    default_service = "org.freedesktop.ModemManager1"
)]
pub trait MMLocation {
    /// Enables the given sources and, if `signal_location` is set, the
    /// `Location` property.
    fn setup(&self, sources: u32, signal_location: bool) -> Result<()>;

    fn get_location(&self) -> Result<HashMap<u32, OwnedValue>>;

    #[zbus(property)]
    fn location(&self) -> Result<HashMap<u32, OwnedValue>>;
}
