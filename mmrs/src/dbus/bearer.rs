//! ModemManager bearer proxy.

use std::collections::HashMap;
use zbus::{Result, proxy};
use zvariant::OwnedValue;

/// Proxy for a packet data bearer.
#[proxy(
    interface = "org.freedesktop.ModemManager1.Bearer",
    default_service = "org.freedesktop.ModemManager1"
)]
pub trait MMBearer {
    fn connect(&self) -> Result<()>;

    fn disconnect(&self) -> Result<()>;

    #[zbus(property)]
    fn connected(&self) -> Result<bool>;

    /// Network interface of the data connection, e.g. "wwan0".
    #[zbus(property)]
    fn interface(&self) -> Result<String>;

    /// Settings the bearer was created with (`apn`, `ip-type`, ...).
    #[zbus(property, name = "Properties")]
    fn bearer_properties(&self) -> Result<HashMap<String, OwnedValue>>;

    #[zbus(property)]
    fn ip4_config(&self) -> Result<HashMap<String, OwnedValue>>;

    #[zbus(property)]
    fn ip6_config(&self) -> Result<HashMap<String, OwnedValue>>;
}
