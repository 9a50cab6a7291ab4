// SPDX-License-Identifier: MPL-2.0
//! Toast notification system for user feedback.
//!
//! This module provides a non-intrusive notification bus following
//! toast/snackbar UX patterns. Notifications are published from anywhere in
//! the application, shown by whatever presentation layer subscribes, and
//! retired either when their lifetime elapses or when they are dismissed.
//!
//! # Components
//!
//! - [`id`] - `IdGenerator` issuing unique `NotificationId`s
//! - [`notification`] - Core `Notification` record, `Severity` and `PublishOptions`
//! - [`store`] - Insertion-ordered `Store` broadcasting snapshots to subscribers
//! - [`scheduler`] - `Scheduler` trait with tokio and virtual-clock timers
//! - [`bus`] - `NotificationBus` façade coordinating the above
//!
//! # Usage
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//! use toast_bus::config::Config;
//! use toast_bus::notifications::{ManualScheduler, NotificationBus, PublishOptions};
//!
//! let scheduler = Arc::new(ManualScheduler::new());
//! let bus = NotificationBus::new(Config::default(), scheduler.clone());
//!
//! let subscription = bus.subscribe(|toasts| println!("{} visible", toasts.len()));
//! let saved = bus.success("Member saved", None);
//! bus.publish(PublishOptions::new("Sync paused").kind("warning").persistent());
//!
//! scheduler.advance(Duration::from_secs(3));
//! assert!(bus.get(saved).is_none());
//! assert_eq!(bus.len(), 1);
//!
//! subscription.unsubscribe();
//! bus.teardown();
//! ```
//!
//! # Lifetimes
//!
//! - ~3s for success, info and warning; ~5s for errors (configurable)
//! - `duration_ms <= 0`: persistent, removed only by `dismiss`

pub mod bus;
pub mod id;
pub mod notification;
pub mod scheduler;
pub mod store;

pub use bus::{NotificationBus, Subscription};
pub use id::{IdGenerator, NotificationId};
pub use notification::{Notification, PublishOptions, Severity, Status};
pub use scheduler::{ManualScheduler, OnFire, Scheduler, TimerHandle, TokioScheduler};
pub use store::{Store, SubscriberFn};
