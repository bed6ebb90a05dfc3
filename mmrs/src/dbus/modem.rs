//! ModemManager Modem proxy.

use std::collections::HashMap;
use zbus::{Result, proxy};
use zvariant::{OwnedObjectPath, OwnedValue, Value};

/// Proxy for the generic modem interface.
///
/// # Signals
///
/// `StateChanged` is emitted whenever the modem state changes. Use
/// `receive_modem_state_changed()` to get a stream of transitions:
///
/// ```ignore
/// let mut stream = modem.receive_modem_state_changed().await?;
/// while let Some(signal) = stream.next().await {
///     let args = signal.args()?;
///     println!("{} -> {}", args.old_state, args.new_state);
/// }
/// ```
#[proxy(
    interface = "org.freedesktop.ModemManager1.Modem",
    default_service = "org.freedesktop.ModemManager1"
)]
pub trait MMModem {
    /// Enables or disables the modem.
    fn enable(&self, enable: bool) -> Result<()>;

    /// Clears non-persistent configuration and restarts the device.
    fn reset(&self) -> Result<()>;

    /// Sets the power state; only allowed while the modem is disabled.
    fn set_power_state(&self, state: u32) -> Result<()>;

    /// Creates a new packet data bearer.
    fn create_bearer(&self, properties: HashMap<&str, Value<'_>>) -> Result<OwnedObjectPath>;

    /// Serving and neighbouring cell information.
    fn get_cell_info(&self) -> Result<Vec<HashMap<String, OwnedValue>>>;

    /// Emitted when the modem state changes.
    #[zbus(signal, name = "StateChanged")]
    fn modem_state_changed(&self, old_state: i32, new_state: i32, reason: u32) -> Result<()>;

    #[zbus(property)]
    fn manufacturer(&self) -> Result<String>;

    #[zbus(property)]
    fn model(&self) -> Result<String>;

    /// Firmware revision.
    #[zbus(property)]
    fn revision(&self) -> Result<String>;

    /// IMEI, ESN or MEID depending on the device.
    #[zbus(property)]
    fn equipment_identifier(&self) -> Result<String>;

    #[zbus(property)]
    fn own_numbers(&self) -> Result<Vec<String>>;

    /// `MMModemPowerState` value.
    #[zbus(property)]
    fn power_state(&self) -> Result<u32>;

    /// `MMModemState` value.
    #[zbus(property)]
    fn state(&self) -> Result<i32>;

    /// `MMModemLock` value.
    #[zbus(property)]
    fn unlock_required(&self) -> Result<u32>;

    /// Active SIM, or "/" if there is none.
    #[zbus(property)]
    fn sim(&self) -> Result<OwnedObjectPath>;

    #[zbus(property)]
    fn bearers(&self) -> Result<Vec<OwnedObjectPath>>;

    /// `MMModemAccessTechnology` bitmask.
    #[zbus(property)]
    fn access_technologies(&self) -> Result<u32>;
}
