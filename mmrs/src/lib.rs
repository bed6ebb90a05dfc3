//! A Rust library for cellular modems via ModemManager.
//!
//! This crate provides a high-level async API over ModemManager's D-Bus
//! interface:
//!
//! - Tracking modems as they are plugged in, removed or reset
//! - Enabling, powering and resetting modems
//! - Unlocking SIM cards
//! - Opening data connections (bearers) and reading their IP configuration
//! - Reading signal quality, serving cell location and neighbour cell info
//!   for LTE and 5G NR
//!
//! # Example
//!
//! ```no_run
//! use mmrs::{IpType, ModemManager, ModemState};
//!
//! # async fn example() -> mmrs::Result<()> {
//! let mm = ModemManager::new().await?;
//!
//! for modem in mm.available_modems() {
//!     println!("{} {} ({})", modem.manufacturer().await?, modem.model().await?, modem.imei().await?);
//! }
//!
//! if let Some(modem) = mm.any_modem() {
//!     if modem.state().await? == ModemState::Disabled {
//!         modem.enable(true).await?;
//!     }
//!     let bearer = modem.connect("internet", IpType::Ipv4AndIpv6).await?;
//!     println!("Connected on {}", bearer.interface().await?);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Modem Discovery
//!
//! [`ModemManager`] keeps a live list of modems. It subscribes to
//! ModemManager's object-added and object-removed signals before listing the
//! modems already present, so no modem slips through. To wait for a modem
//! that is not there yet, use [`ModemManager::await_modem`]; only one such
//! request can be pending at a time and a newer one cancels the older.
//!
//! # Technology Variants
//!
//! Signal, location and cell-info reports differ between LTE and 5G NR.
//! They are decoded into [`Signal`], [`Location`] and [`CellInfo`] enums
//! with one variant per technology. Fields the hardware did not report are
//! left out: their accessors fail with [`ModemError::KeyNotFound`]. Other
//! technologies fail with [`ModemError::UnsupportedTechnology`].
//!
//! # Error Handling
//!
//! All operations return `Result<T, ModemError>`. The error type provides
//! specific variants for unmet state preconditions, SIM credential
//! failures, cancelled await requests and property decoding problems.
//!
//! # Logging
//!
//! This crate uses the [`log`](https://docs.rs/log) facade for logging. To see
//! log output, add a logging implementation like `env_logger`. For example:
//!
//! ```no_run,ignore
//! env_logger::init();
//! // ...
//! ```

// Internal implementation modules
mod core;
mod dbus;
mod types;
mod util;

// Public API modules
pub mod api;
pub mod monitoring;

// Re-exported public API
pub use api::bearer::Bearer;
pub use api::models::{
    IpConfig, IpType, LockState, ModemError, ModemFilter, ModemManagerConfig, ModemState,
    PowerState, StateRequirement, Technology, TrafficStats,
};
pub use api::modem::Modem;
pub use api::modem_manager::ModemManager;
pub use api::radio::{
    CellInfo, CellLocation, Location, LteCellInfo, LteSignal, Nr5gCellInfo, Nr5gSignal, Signal,
};
pub use api::sim::Sim;
pub use crate::core::registry::PendingObject;
pub use monitoring::traffic::{NetworkManagerStats, NetworkStatsProvider};
pub use types::property_bag::{PropertyBag, PropertyType, PropertyValue, ValueKind};

/// A specialized `Result` type for modem operations.
pub type Result<T> = std::result::Result<T, ModemError>;
