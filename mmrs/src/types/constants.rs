//! Constants for ModemManager D-Bus interface values.
//!
//! These constants correspond to the bus names, object paths, interface
//! names and numeric codes used by ModemManager's D-Bus API.

/// Well-known bus names and object paths.
pub mod bus {
    pub const MM_SERVICE: &str = "org.freedesktop.ModemManager1";
    pub const MM_PATH: &str = "/org/freedesktop/ModemManager1";
    /// Prefix shared by all modem object paths.
    pub const MM_MODEM_PATH_PREFIX: &str = "/org/freedesktop/ModemManager1/Modem/";
    /// Object path ModemManager uses to mean "no object".
    pub const NO_OBJECT: &str = "/";
    /// NetworkManager, which counts the traffic of bearer interfaces.
    pub const NM_SERVICE: &str = "org.freedesktop.NetworkManager";
}

/// ModemManager interface names.
pub mod interface {
    pub const MODEM: &str = "org.freedesktop.ModemManager1.Modem";
    pub const MODEM_3GPP: &str = "org.freedesktop.ModemManager1.Modem.Modem3gpp";
    pub const SIGNAL: &str = "org.freedesktop.ModemManager1.Modem.Signal";
    pub const LOCATION: &str = "org.freedesktop.ModemManager1.Modem.Location";
    pub const NM_DEVICE_STATISTICS: &str = "org.freedesktop.NetworkManager.Device.Statistics";
}

/// ModemManager D-Bus error names that carry meaning for SIM unlocking.
pub mod error_name {
    pub const INCORRECT_PASSWORD: &str =
        "org.freedesktop.ModemManager1.Error.MobileEquipment.IncorrectPassword";
    pub const INCORRECT_PARAMETERS: &str =
        "org.freedesktop.ModemManager1.Error.MobileEquipment.IncorrectParameters";
}

/// `MMModemAccessTechnology` bits.
pub mod access_technology {
    pub const GSM: u32 = 1 << 1;
    pub const GSM_COMPACT: u32 = 1 << 2;
    pub const GPRS: u32 = 1 << 3;
    pub const EDGE: u32 = 1 << 4;
    pub const UMTS: u32 = 1 << 5;
    pub const HSDPA: u32 = 1 << 6;
    pub const HSUPA: u32 = 1 << 7;
    pub const HSPA: u32 = 1 << 8;
    pub const HSPA_PLUS: u32 = 1 << 9;
    pub const LTE: u32 = 1 << 14;
    pub const NR5G: u32 = 1 << 15;

    pub const GENERATION_2G: u32 = GSM | GSM_COMPACT | GPRS | EDGE;
    pub const GENERATION_3G: u32 = UMTS | HSDPA | HSUPA | HSPA | HSPA_PLUS;
}

/// `MMCellType` values reported in the `cell-type` key of `GetCellInfo()`.
pub mod cell_type {
    pub const LTE: u32 = 5;
    pub const NR5G: u32 = 6;
}

/// `MMModemLocationSource` bits.
pub mod location_source {
    /// 3GPP location area code / cell id, reported as a comma separated string.
    pub const LAC_CI_3GPP: u32 = 1 << 0;
}

/// Timeout constants.
pub mod timeouts {
    use std::time::Duration;

    /// Default refresh rate for extended signal reporting (5 seconds).
    const SIGNAL_REFRESH_SECS: u64 = 5;

    /// Returns the default extended signal refresh rate.
    pub fn signal_refresh_rate() -> Duration {
        Duration::from_secs(SIGNAL_REFRESH_SECS)
    }
}
