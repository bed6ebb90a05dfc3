//! D-Bus proxy interfaces for ModemManager.
//!
//! This module contains low-level D-Bus proxy definitions for communicating
//! with ModemManager (and, for traffic counters, NetworkManager) over the
//! system bus.

mod bearer;
mod device_statistics;
mod location;
mod main_mm;
mod main_nm;
mod modem;
mod modem_3gpp;
mod signal;
mod sim;
mod time;

pub(crate) use bearer::MMBearerProxy;
pub(crate) use device_statistics::NMDeviceStatisticsProxy;
pub(crate) use location::MMLocationProxy;
pub(crate) use main_mm::MMProxy;
pub(crate) use main_nm::NMProxy;
pub(crate) use modem::MMModemProxy;
pub(crate) use modem_3gpp::MMModem3gppProxy;
pub(crate) use signal::MMSignalProxy;
pub(crate) use sim::MMSimProxy;
pub(crate) use time::MMTimeProxy;
