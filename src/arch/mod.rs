// Copyright 2025 The Hartlock Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Platform-specific modules
//!
//! This module provides organization for platform-specific code. Each
//! target architecture has its own subdirectory implementing the traits
//! from [`crate::traits`].

pub mod riscv64;

// Re-export the doorbell controller (address math is target-independent)
pub use riscv64::clint::Clint;

#[cfg(any(target_arch = "riscv32", target_arch = "riscv64"))]
pub use riscv64::RiscvPlatform;
