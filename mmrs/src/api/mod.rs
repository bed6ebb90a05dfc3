//! Public API module.
//!
//! This module contains the high-level user-facing API for the `mmrs` crate:
//! the manager, the modem/SIM/bearer handles and the decoded radio records.

pub mod bearer;
pub mod models;
pub mod modem;
pub mod modem_manager;
pub mod radio;
pub mod sim;
