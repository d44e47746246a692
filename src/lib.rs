// Copyright 2025 The Hartlock Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! # Hartlock - SMP Mutual Exclusion for Non-Coherent Multi-Hart Systems
//!
//! Hartlock provides the mutual-exclusion core for bare-metal, shared-memory
//! multiprocessors whose harts (hardware threads) share memory but have no
//! guaranteed cache coherency:
//!
//! - **Spinlock**: busy-wait mutual exclusion over a single shared word
//! - **Recursive mutex**: ownership and recursion tracking on top of the spinlock
//! - **IPI doorbells**: the per-hart signal convention used to start secondary
//!   harts and deliver asynchronous notifications
//!
//! ## Architecture
//!
//! The crate is organized with clear separation between platform-specific
//! and platform-independent code:
//!
//! ```text
//! src/
//! ├── traits.rs          # Platform capability and IPI controller traits
//! ├── arch/              # Platform-specific backends
//! │   └── riscv64/       # RISC-V AMO primitives + CLINT doorbells
//! ├── sync/              # Spinlock and recursive mutex
//! ├── smp.rs             # Hart bring-up state machine and wake convention
//! └── lib.rs             # This file
//! ```
//!
//! ## Platform Abstraction
//!
//! Every lock-word access goes through the [`Platform`] trait: an atomic swap
//! with full ordering and a cache-bypassing store. On targets with private,
//! non-coherent data caches an ordinary load or store of the lock word may
//! observe stale cache contents; the backend must use primitives (such as
//! RISC-V AMO instructions) that take the globally visible path.
//!
//! ## Using the primitives
//!
//! ```ignore
//! use hartlock::{HartMutex, arch::riscv64::RiscvPlatform};
//!
//! static MUTEX: HartMutex<RiscvPlatform> = HartMutex::new();
//!
//! MUTEX.take();
//! // ... exclusive section, re-entrant on the same hart ...
//! MUTEX.give();
//! ```

#![no_std]

#[cfg(test)]
extern crate std;

// Core traits and types
pub mod traits;

// Platform-specific modules
pub mod arch;

// Synchronization primitives
pub mod sync;

// Hart bring-up and IPI convention
pub mod smp;

// Testing infrastructure (simulated platform and doorbells)
#[cfg(test)]
pub mod testing;

// Re-export commonly used types
pub use traits::{
    HartId,
    IpiController,
    Platform,
};

// Re-export synchronization types
pub use sync::{
    RawSpinlock,
    SpinMutex, SpinMutexGuard,
    HartMutex,
    LOCKED, UNLOCKED,
};

// Re-export SMP types
pub use smp::{
    HartMask,
    HartState,
    HartTable,
    SmpContext,
    MAX_HARTS,
};

// Re-export platform backends
pub use arch::Clint;

#[cfg(any(target_arch = "riscv32", target_arch = "riscv64"))]
pub use arch::RiscvPlatform;

// Integration tests (only compiled in test mode)
#[cfg(test)]
mod tests;
