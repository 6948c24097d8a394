// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire-level constants and default timings
//!
//! The two flag values tag a KV entry as a lock key or a semaphore entry.
//! They are an agreement between every client of a coordination service, not
//! local configuration: all participants must use the same values, and
//! applications must not use them in the flags field of ordinary keys.

use std::time::Duration;

/// Flags value marking a key as a lock
pub const LOCK_FLAG_VALUE: u64 = 0x2ddc_cbc0_58a5_0c18;

/// Flags value marking a semaphore coordination record or contender entry
pub const SEMAPHORE_FLAG_VALUE: u64 = 0xe0f6_9a2b_aa41_4de0;

/// Name of the coordination record under a semaphore prefix
pub const SEMAPHORE_RECORD_KEY: &str = ".lock";

/// Session name used when a lock creates its own session
pub const DEFAULT_LOCK_SESSION_NAME: &str = "kvlock lock";

/// Session name used when a semaphore creates its own session
pub const DEFAULT_SEMAPHORE_SESSION_NAME: &str = "kvlock semaphore";

/// TTL of sessions created by a lock or semaphore
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(15);

/// Upper bound for a single blocking query while waiting to acquire
pub const DEFAULT_WAIT_TIME: Duration = Duration::from_secs(15);

/// Sleep between claim attempts while a lock-delay is in effect
pub const DEFAULT_LOCK_RETRY_TIME: Duration = Duration::from_secs(5);

/// Pause between monitor reads after a transient failure
pub const DEFAULT_MONITOR_RETRY_TIME: Duration = Duration::from_secs(2);

/// Pause before retrying a session renewal that failed transiently
pub const SESSION_RENEW_RETRY_INTERVAL: Duration = Duration::from_secs(1);
