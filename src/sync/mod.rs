// Copyright 2025 The Hartlock Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Mutual exclusion primitives
//!
//! This module provides the two lock layers of the crate:
//!
//! - **RawSpinlock / SpinMutex**: busy-wait mutual exclusion over a single
//!   shared word, no ownership tracking
//! - **HartMutex**: recursion-aware mutex that the owning hart may re-acquire
//!   without deadlocking itself
//!
//! # Design
//!
//! All waits are unbounded: the only failure mode of a contended lock is
//! indefinite blocking, never an error value. There is no fairness
//! discipline; waiting harts race for the lock each time it is released.
//! Both properties are deliberate simplicity/latency tradeoffs for small
//! hart counts.

pub mod spinlock;
pub mod mutex;

// Re-exports
pub use spinlock::{RawSpinlock, SpinMutex, SpinMutexGuard, LOCKED, UNLOCKED};
pub use mutex::HartMutex;
