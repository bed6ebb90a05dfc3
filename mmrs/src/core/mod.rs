//! Core internal logic for modem tracking.
//!
//! This module contains the modem registry, the task keeping it in sync
//! with ModemManager, and field-level decoding helpers.

pub(crate) mod decode;
pub(crate) mod object_tracker;
pub(crate) mod registry;
