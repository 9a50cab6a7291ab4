// SPDX-License-Identifier: MPL-2.0
//! Centralized default values for all configuration constants.
//!
//! This module serves as the single source of truth for default values
//! used across the crate. Constants are organized by category.
//!
//! # Categories
//!
//! - **Durations**: Per-severity notification lifetimes
//! - **Identity**: Notification id formatting

// ==========================================================================
// Duration Defaults
// ==========================================================================

/// Default lifetime of success, info and warning notifications (in milliseconds).
pub const DEFAULT_DURATION_MS: u64 = 3_000;

/// Default lifetime of error notifications (in milliseconds).
///
/// Errors stay on screen longer because they usually need more reading time.
pub const DEFAULT_ERROR_DURATION_MS: u64 = 5_000;

/// A configured duration of zero means "persistent": no automatic retirement.
pub const PERSISTENT_DURATION_MS: u64 = 0;

// ==========================================================================
// Identity Defaults
// ==========================================================================

/// Separator between the components of a rendered notification id.
pub const ID_SEPARATOR: char = '-';

// ==========================================================================
// Compile-time Validation
// ==========================================================================

const _: () = {
    assert!(DEFAULT_DURATION_MS > PERSISTENT_DURATION_MS);
    assert!(DEFAULT_ERROR_DURATION_MS > DEFAULT_DURATION_MS);
};
