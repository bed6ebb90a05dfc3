//! Type definitions and constants.
//!
//! This module contains ModemManager constants and the property bag used to
//! carry partially-populated hardware reports.

pub(crate) mod constants;
pub mod property_bag;
