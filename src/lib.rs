//! This library crate contains the event-streaming backbone for wildfire sensor readings.
//!
//! Submodules have been introduced to split responsibilities. Each module has a specific focus
//! and they together form a chain of dependencies from the low-level [`library`], over the sensor
//! [`domain`] specific logic, through the executable [`harness`], up to the high-level [`modules`](module)
//! which ingest, store, and analyze readings.

#![deny(missing_docs)]

pub mod constants;
pub mod domain;
pub mod harness;
pub mod library;
pub mod module;
