//! ModemManager 3GPP modem proxy.

use zbus::{Result, proxy};

#[proxy(
    interface = "org.freedesktop.ModemManager1.Modem.Modem3gpp",
    default_service = "org.freedesktop.ModemManager1"
)]
pub trait MMModem3gpp {
    #[zbus(property)]
    fn imei(&self) -> Result<String>;

    /// MCC and MNC of the registered network.
    #[zbus(property)]
    fn operator_code(&self) -> Result<String>;

    #[zbus(property)]
    fn operator_name(&self) -> Result<String>;
}
