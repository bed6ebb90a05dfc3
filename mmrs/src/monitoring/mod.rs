//! Real-time monitoring of modem and bearer changes.
//!
//! This module provides the background observer tasks behind the
//! `observe_*` methods and the traffic counter sources.

pub(crate) mod observer;
pub mod traffic;
