//! ModemManager SIM proxy.

use zbus::{Result, proxy};

#[proxy(
    interface = "org.freedesktop.ModemManager1.Sim",
    default_service = "org.freedesktop.ModemManager1"
)]
pub trait MMSim {
    fn send_pin(&self, pin: &str) -> Result<()>;

    /// Unblocks the SIM with the PUK and sets a new PIN.
    fn send_puk(&self, puk: &str, pin: &str) -> Result<()>;

    #[zbus(property)]
    fn active(&self) -> Result<bool>;

    #[zbus(property)]
    fn imsi(&self) -> Result<String>;

    /// ICCID.
    #[zbus(property)]
    fn sim_identifier(&self) -> Result<String>;

    /// MCC and MNC of the home network.
    #[zbus(property)]
    fn operator_identifier(&self) -> Result<String>;

    #[zbus(property)]
    fn operator_name(&self) -> Result<String>;
}
