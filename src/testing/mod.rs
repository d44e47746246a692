// Copyright 2025 The Hartlock Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Testing infrastructure
//!
//! Provides simulated platform primitives so the lock algorithms can be
//! exercised on a development host, with test threads standing in for
//! harts.

pub mod sim;

pub use sim::{SimIpi, SimPlatform};
