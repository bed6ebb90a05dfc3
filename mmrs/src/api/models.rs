use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::time::Duration;
use thiserror::Error;

use crate::types::constants::{access_technology, timeouts};
use crate::types::property_bag::ValueKind;

/// General state of a modem.
///
/// The variants are ordered by capability, so comparisons such as
/// `state >= ModemState::Registered` express "at least registered".
/// `Failed` and `Unknown` sit below every operational state.
///
/// See the ModemManager modem state machine documentation for details.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum ModemState {
    /// The modem failed to initialize.
    Failed,
    /// State is unknown.
    Unknown,
    /// The modem is starting up.
    Initializing,
    /// The modem is locked; see [`LockState`] for the reason.
    Locked,
    /// The modem is disabled (low power mode).
    Disabled,
    /// The modem is about to be disabled.
    Disabling,
    /// The modem is about to be enabled.
    Enabling,
    /// The modem is enabled.
    Enabled,
    /// The modem is searching for a network to register with.
    Searching,
    /// The modem is registered with a network.
    Registered,
    /// The modem is disconnecting packet service.
    Disconnecting,
    /// The modem is connecting packet service.
    Connecting,
    /// Packet service is active.
    Connected,
}

impl From<i32> for ModemState {
    fn from(code: i32) -> Self {
        match code {
            -1 => Self::Failed,
            1 => Self::Initializing,
            2 => Self::Locked,
            3 => Self::Disabled,
            4 => Self::Disabling,
            5 => Self::Enabling,
            6 => Self::Enabled,
            7 => Self::Searching,
            8 => Self::Registered,
            9 => Self::Disconnecting,
            10 => Self::Connecting,
            11 => Self::Connected,
            _ => Self::Unknown,
        }
    }
}

impl Display for ModemState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Failed => write!(f, "failed"),
            Self::Unknown => write!(f, "unknown"),
            Self::Initializing => write!(f, "initializing"),
            Self::Locked => write!(f, "locked"),
            Self::Disabled => write!(f, "disabled"),
            Self::Disabling => write!(f, "disabling"),
            Self::Enabling => write!(f, "enabling"),
            Self::Enabled => write!(f, "enabled"),
            Self::Searching => write!(f, "searching"),
            Self::Registered => write!(f, "registered"),
            Self::Disconnecting => write!(f, "disconnecting"),
            Self::Connecting => write!(f, "connecting"),
            Self::Connected => write!(f, "connected"),
        }
    }
}

/// A state guard checked before issuing a command to a modem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateRequirement {
    /// The modem must be in this state or any state ordered above it.
    AtLeast(ModemState),
    /// The modem must be in exactly this state.
    Exactly(ModemState),
}

impl StateRequirement {
    /// The state named by this requirement.
    pub fn state(&self) -> ModemState {
        match self {
            Self::AtLeast(s) | Self::Exactly(s) => *s,
        }
    }

    /// Returns `true` if `actual` satisfies the requirement.
    pub fn is_met_by(&self, actual: ModemState) -> bool {
        match self {
            Self::AtLeast(required) => actual >= *required,
            Self::Exactly(required) => actual == *required,
        }
    }

    /// Checks `actual` against the requirement for the named operation.
    ///
    /// # Errors
    ///
    /// Returns `ModemError::PreconditionNotMet` naming the required and
    /// actual state when the requirement is not met.
    pub fn check(&self, operation: &str, actual: ModemState) -> crate::Result<()> {
        if self.is_met_by(actual) {
            Ok(())
        } else {
            Err(ModemError::PreconditionNotMet {
                operation: operation.to_string(),
                required: *self,
                actual,
            })
        }
    }
}

impl Display for StateRequirement {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AtLeast(s) => write!(f, "at least {s}"),
            Self::Exactly(s) => write!(f, "{s}"),
        }
    }
}

/// Power state of a modem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PowerState {
    /// Unknown power state.
    Unknown,
    /// The modem is powered off.
    Off,
    /// Low power state (standby, radio off).
    Low,
    /// Fully powered on.
    On,
}

impl PowerState {
    /// The raw `MMModemPowerState` value.
    pub fn code(self) -> u32 {
        match self {
            Self::Unknown => 0,
            Self::Off => 1,
            Self::Low => 2,
            Self::On => 3,
        }
    }
}

impl From<u32> for PowerState {
    fn from(code: u32) -> Self {
        match code {
            1 => Self::Off,
            2 => Self::Low,
            3 => Self::On,
            _ => Self::Unknown,
        }
    }
}

impl Display for PowerState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unknown => write!(f, "unknown"),
            Self::Off => write!(f, "off"),
            Self::Low => write!(f, "low"),
            Self::On => write!(f, "on"),
        }
    }
}

/// Why a modem is in [`ModemState::Locked`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LockState {
    /// Lock state unknown; the modem might not be ready yet.
    Unknown,
    /// No lock; the modem can be used.
    Unlocked,
    /// SIM PIN required.
    SimPin,
    /// SIM PIN2 might be needed for some features; the modem is usable.
    SimPin2,
    /// SIM PUK required.
    SimPuk,
    /// SIM PUK2 required.
    SimPuk2,
    /// Any other `MMModemLock` code.
    Other(u32),
}

impl From<u32> for LockState {
    fn from(code: u32) -> Self {
        match code {
            0 => Self::Unknown,
            1 => Self::Unlocked,
            2 => Self::SimPin,
            3 => Self::SimPin2,
            4 => Self::SimPuk,
            5 => Self::SimPuk2,
            v => Self::Other(v),
        }
    }
}

impl LockState {
    /// Returns `true` if the lock prevents normal use of the modem.
    pub fn is_locked(self) -> bool {
        !matches!(self, Self::Unlocked | Self::SimPin2)
    }
}

impl Display for LockState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unknown => write!(f, "unknown"),
            Self::Unlocked => write!(f, "unlocked"),
            Self::SimPin => write!(f, "SIM PIN"),
            Self::SimPin2 => write!(f, "SIM PIN2"),
            Self::SimPuk => write!(f, "SIM PUK"),
            Self::SimPuk2 => write!(f, "SIM PUK2"),
            Self::Other(v) => write!(f, "other lock ({v})"),
        }
    }
}

bitflags! {
    /// Radio technology generation.
    ///
    /// Generations are independent bits so that combinations (e.g. LTE
    /// anchored 5G NSA) can be expressed. Decoding of technology specific
    /// records only handles a single generation at a time.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Technology: u32 {
        /// 2G (GSM, GPRS, EDGE).
        const GSM = 1 << 0;
        /// 3G (UMTS, HSPA).
        const UMTS = 1 << 1;
        /// 4G (LTE).
        const LTE = 1 << 2;
        /// 5G (NR).
        const NR5G = 1 << 3;
    }
}

impl Technology {
    /// No known technology.
    pub const UNKNOWN: Self = Self::empty();

    /// Maps a ModemManager access technology bitmask to generations.
    pub fn from_access_technologies(bits: u32) -> Self {
        let mut tech = Self::UNKNOWN;
        if bits & access_technology::GENERATION_2G != 0 {
            tech |= Self::GSM;
        }
        if bits & access_technology::GENERATION_3G != 0 {
            tech |= Self::UMTS;
        }
        if bits & access_technology::LTE != 0 {
            tech |= Self::LTE;
        }
        if bits & access_technology::NR5G != 0 {
            tech |= Self::NR5G;
        }
        tech
    }

    /// Returns `true` if exactly one generation is set.
    pub fn is_single(self) -> bool {
        self.bits().count_ones() == 1
    }
}

impl Display for Technology {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            return write!(f, "UNKNOWN");
        }
        let names: Vec<&str> = [
            (Self::GSM, "GSM"),
            (Self::UMTS, "UMTS"),
            (Self::LTE, "LTE"),
            (Self::NR5G, "NR5G"),
        ]
        .into_iter()
        .filter(|(flag, _)| self.contains(*flag))
        .map(|(_, name)| name)
        .collect();
        write!(f, "{}", names.join("+"))
    }
}

/// IP family of a bearer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum IpType {
    /// No or unknown family.
    Unknown,
    /// IPv4 only.
    Ipv4,
    /// IPv6 only.
    Ipv6,
    /// Dual stack.
    #[default]
    Ipv4AndIpv6,
}

impl IpType {
    /// The raw `MMBearerIpFamily` value.
    pub fn code(self) -> u32 {
        match self {
            Self::Unknown => 0,
            Self::Ipv4 => 1,
            Self::Ipv6 => 2,
            Self::Ipv4AndIpv6 => 4,
        }
    }
}

impl From<u32> for IpType {
    fn from(code: u32) -> Self {
        match code {
            1 => Self::Ipv4,
            2 => Self::Ipv6,
            4 => Self::Ipv4AndIpv6,
            _ => Self::Unknown,
        }
    }
}

impl Display for IpType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unknown => write!(f, "unknown"),
            Self::Ipv4 => write!(f, "IPv4"),
            Self::Ipv6 => write!(f, "IPv6"),
            Self::Ipv4AndIpv6 => write!(f, "IPv4+IPv6"),
        }
    }
}

/// IP configuration of an active bearer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpConfig {
    /// `IpType::Ipv4` or `IpType::Ipv6`.
    pub ip_type: IpType,
    /// The address, without prefix.
    pub address: String,
    /// Prefix length (CIDR).
    pub prefix: u32,
    /// Gateway address, if reported.
    pub gateway: Option<String>,
    /// Primary DNS server, if reported.
    pub dns1: Option<String>,
    /// Secondary DNS server, if reported.
    pub dns2: Option<String>,
}

/// Byte counters of a network interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TrafficStats {
    /// Received bytes.
    pub rx_bytes: u64,
    /// Transmitted bytes.
    pub tx_bytes: u64,
}

/// Selects which modem an await request is waiting for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ModemFilter {
    /// The next modem to appear, whatever its identity.
    Any,
    /// The modem with exactly this IMEI. Modems without an identity never
    /// match, even when the IMEI is empty.
    Imei(String),
}

impl ModemFilter {
    /// Returns `true` if an object with `identity` satisfies the filter.
    pub fn matches(&self, identity: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Imei(imei) => !identity.is_empty() && imei == identity,
        }
    }
}

impl Display for ModemFilter {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Any => write!(f, "any modem"),
            Self::Imei(imei) => write!(f, "IMEI {imei}"),
        }
    }
}

/// Runtime configuration for [`crate::ModemManager`].
///
/// # Example
///
/// ```
/// use mmrs::ModemManagerConfig;
/// use std::time::Duration;
///
/// let config = ModemManagerConfig::new()
///     .with_signal_refresh_rate(Duration::from_secs(10))
///     .with_reset_timeout(Duration::from_secs(90));
/// assert_eq!(config.reset_timeout, Some(Duration::from_secs(90)));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModemManagerConfig {
    /// Refresh rate used to turn on extended signal reporting when it is off.
    pub signal_refresh_rate: Duration,
    /// Upper bound for `reset_modem`; `None` waits until the modem reappears.
    pub reset_timeout: Option<Duration>,
}

impl Default for ModemManagerConfig {
    fn default() -> Self {
        Self {
            signal_refresh_rate: timeouts::signal_refresh_rate(),
            reset_timeout: None,
        }
    }
}

impl ModemManagerConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the extended signal refresh rate.
    #[must_use]
    pub fn with_signal_refresh_rate(mut self, rate: Duration) -> Self {
        self.signal_refresh_rate = rate;
        self
    }

    /// Bounds the time `reset_modem` waits for the modem to reappear.
    #[must_use]
    pub fn with_reset_timeout(mut self, timeout: Duration) -> Self {
        self.reset_timeout = Some(timeout);
        self
    }
}

/// Errors that can occur while talking to ModemManager.
#[derive(Debug, Error)]
pub enum ModemError {
    /// A D-Bus communication error occurred.
    #[error("D-Bus error: {0}")]
    Dbus(#[from] zbus::Error),

    /// A D-Bus operation failed, with context about what was attempted.
    #[error("{context}: {source}")]
    DbusOperation {
        context: String,
        #[source]
        source: zbus::Error,
    },

    /// The bus or the ModemManager service could not be reached.
    #[error("failed to connect to ModemManager: {0}")]
    ConnectionFailed(String),

    /// The modem is not in a state that allows the operation.
    #[error("cannot {operation}: modem is {actual}, requires {required}")]
    PreconditionNotMet {
        operation: String,
        required: StateRequirement,
        actual: ModemState,
    },

    /// The radio technology has no typed decoding.
    #[error("technology {0} is not supported")]
    UnsupportedTechnology(Technology),

    /// A property was not reported.
    #[error("property '{0}' not present")]
    KeyNotFound(String),

    /// A property was reported with an unexpected type.
    #[error("property '{key}' is a {found}, expected {expected}")]
    TypeMismatch {
        key: String,
        expected: &'static str,
        found: ValueKind,
    },

    /// A hex-encoded field could not be parsed.
    #[error("invalid hex value '{value}' for '{field}'")]
    InvalidHex { field: String, value: String },

    /// An await request was superseded by a newer one.
    #[error("cancelled: a newer await request replaced this one")]
    Cancelled,

    /// The operation did not finish within the configured timeout.
    #[error("operation timed out")]
    Timeout,

    /// The modem reported no IMEI, so it cannot be recognised when it
    /// reappears.
    #[error("modem {0} has no identity")]
    UnidentifiedModem(String),

    /// The manager owning the bus connection no longer exists.
    #[error("the ModemManager connection has been dropped")]
    ManagerDropped,

    /// The SIM rejected the PIN.
    #[error("incorrect PIN")]
    IncorrectPin,

    /// The SIM rejected the PUK.
    #[error("incorrect PUK")]
    IncorrectPuk,

    /// The PIN or PUK was malformed.
    #[error("invalid PIN or PUK format")]
    InvalidCredentialFormat,

    /// Unlocking failed for another reason.
    #[error("SIM unlock failed: {0}")]
    SimUnlockFailed(String),

    /// The network time string could not be parsed.
    #[error("invalid network time '{0}'")]
    InvalidNetworkTime(String),
}

impl From<zbus::fdo::Error> for ModemError {
    fn from(e: zbus::fdo::Error) -> Self {
        Self::Dbus(e.into())
    }
}
