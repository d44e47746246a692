// Copyright 2025 The Hartlock Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! RISC-V platform backend
//!
//! Implements the platform capability trait with the A-extension AMO
//! instructions and provides the CLINT software-interrupt doorbells.
//!
//! On cores with private, non-coherent data caches (the targets this crate
//! is written for) a plain load or store of a shared word may never leave
//! the local cache. AMO instructions execute directly against the bus, so
//! both the swap and the release store go through them.

pub mod clint;

#[cfg(any(target_arch = "riscv32", target_arch = "riscv64"))]
mod platform;

#[cfg(any(target_arch = "riscv32", target_arch = "riscv64"))]
pub use platform::RiscvPlatform;
