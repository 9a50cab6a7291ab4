// SPDX-License-Identifier: MPL-2.0
//! `toast_bus` is the ephemeral notification subsystem of the console.
//!
//! It publishes short-lived status messages, retires them automatically once
//! their lifetime elapses, and lets callers dismiss them early. Rendering is
//! left to whichever presentation layer subscribes.

#![doc(html_root_url = "https://docs.rs/toast_bus/0.3.0")]

pub mod config;
pub mod error;
pub mod notifications;

pub use error::{Error, Result};
pub use notifications::{NotificationBus, NotificationId, PublishOptions, Severity};
