// Copyright 2025 The Hartlock Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Recursive Mutex Implementation
//!
//! This module provides a recursion-aware mutex built on the raw spinlock.
//! The mutex tracks which hart owns it and how many times the owner has
//! re-acquired it, so a hart never deadlocks against itself.
//!
//! # Design
//!
//! The owner and recursion counter are only ever read or written while the
//! embedded spinlock is held. A waiting hart does NOT hold the spinlock
//! across the wait: it releases and re-acquires it between ownership checks.
//! Holding it continuously would deadlock, because no other hart could ever
//! enter the critical section to release ownership.
//!
//! There is no queue discipline: waiting harts race for ownership each time
//! it is released, so acquisition order is unspecified.

use core::cell::UnsafeCell;

use crate::sync::spinlock::RawSpinlock;
use crate::traits::{HartId, Platform};

/// Owner and recursion counter, guarded by the embedded spinlock
struct MutexState {
    /// Hart currently holding the mutex, or `HartId::NONE`
    owner: HartId,

    /// Un-matched re-acquisitions by `owner` beyond the first take
    recursion: u32,
}

/// A recursive mutex tracking hart ownership
///
/// A hart that has taken the mutex may take it again without blocking; it
/// must give it back once per take before another hart can claim ownership
/// (strictly nested, LIFO per hart).
///
/// Statically initializable:
///
/// ```ignore
/// static MUTEX: HartMutex<RiscvPlatform> = HartMutex::new();
/// ```
///
/// Invariant: `owner == HartId::NONE` implies `recursion == 0`.
pub struct HartMutex<P: Platform> {
    /// Spinlock guarding `state`
    lock: RawSpinlock<P>,

    /// Owner and recursion counter
    state: UnsafeCell<MutexState>,
}

unsafe impl<P: Platform> Send for HartMutex<P> {}
unsafe impl<P: Platform> Sync for HartMutex<P> {}

impl<P: Platform> HartMutex<P> {
    /// Create a new free mutex
    pub const fn new() -> Self {
        Self {
            lock: RawSpinlock::new(),
            state: UnsafeCell::new(MutexState {
                owner: HartId::NONE,
                recursion: 0,
            }),
        }
    }

    /// Acquire the mutex, spinning until the calling hart owns it
    ///
    /// If the calling hart already owns the mutex the recursion counter is
    /// incremented and the call returns immediately. Otherwise the hart
    /// waits for the owner to become `NONE` and claims it.
    ///
    /// The wait is unbounded. A caller layering its own timeout must only
    /// abandon the attempt between iterations, never while the embedded
    /// spinlock is held.
    pub fn take(&self) {
        let me = P::hart_id();

        loop {
            self.lock.lock();
            // SAFETY: state is only touched under self.lock, which we hold.
            let state = unsafe { &mut *self.state.get() };

            if state.owner == me {
                // Already ours; no waiting needed.
                state.recursion += 1;
                self.lock.unlock();
                return;
            }

            if state.owner == HartId::NONE {
                state.owner = me;
                state.recursion = 0;
                self.lock.unlock();
                return;
            }

            // Another hart owns the mutex. Release the spinlock so that
            // hart can get in to give ownership back, then recheck.
            self.lock.unlock();
            P::relax();
        }
    }

    /// Release the mutex
    ///
    /// Undoes one `take` by the owning hart: decrements the recursion
    /// counter if positive, otherwise sets the owner back to `NONE`. A call
    /// from a hart that does not own the mutex is a silent no-op; misuse is
    /// a caller contract, not a runtime-checked error.
    pub fn give(&self) {
        let me = P::hart_id();

        self.lock.lock();
        // SAFETY: state is only touched under self.lock, which we hold.
        let state = unsafe { &mut *self.state.get() };

        if state.owner == me {
            if state.recursion > 0 {
                state.recursion -= 1;
            } else {
                state.owner = HartId::NONE;
            }
        }
        self.lock.unlock();
    }

    /// Hart currently holding the mutex, or `HartId::NONE`
    ///
    /// Snapshot taken under the embedded spinlock; by the time the caller
    /// looks at it, ownership may already have changed.
    pub fn holder(&self) -> HartId {
        self.lock.lock();
        // SAFETY: state is only touched under self.lock, which we hold.
        let owner = unsafe { (*self.state.get()).owner };
        self.lock.unlock();
        owner
    }

    /// Current recursion depth of the owning hart
    ///
    /// Zero both when the mutex is free and when it is held exactly once.
    pub fn recursion_depth(&self) -> u32 {
        self.lock.lock();
        // SAFETY: state is only touched under self.lock, which we hold.
        let recursion = unsafe { (*self.state.get()).recursion };
        self.lock.unlock();
        recursion
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::SimPlatform;

    #[test]
    fn test_take_give_roundtrip() {
        SimPlatform::set_hart_id(0);
        let mutex: HartMutex<SimPlatform> = HartMutex::new();

        assert_eq!(mutex.holder(), HartId::NONE);
        mutex.take();
        assert_eq!(mutex.holder(), HartId::new(0));
        assert_eq!(mutex.recursion_depth(), 0);
        mutex.give();
        assert_eq!(mutex.holder(), HartId::NONE);
    }

    #[test]
    fn test_recursive_take() {
        SimPlatform::set_hart_id(0);
        let mutex: HartMutex<SimPlatform> = HartMutex::new();

        // k takes followed by k gives leave the mutex free.
        mutex.take();
        mutex.take();
        mutex.take();
        assert_eq!(mutex.recursion_depth(), 2);

        mutex.give();
        assert_eq!(mutex.recursion_depth(), 1);
        mutex.give();
        assert_eq!(mutex.recursion_depth(), 0);
        assert_eq!(mutex.holder(), HartId::new(0));

        mutex.give();
        assert_eq!(mutex.holder(), HartId::NONE);
        assert_eq!(mutex.recursion_depth(), 0);
    }

    #[test]
    fn test_fewer_gives_than_takes_keeps_owner() {
        SimPlatform::set_hart_id(3);
        let mutex: HartMutex<SimPlatform> = HartMutex::new();

        mutex.take();
        mutex.take();
        mutex.give();
        assert_eq!(mutex.holder(), HartId::new(3));
    }

    #[test]
    fn test_non_owner_give_is_noop() {
        SimPlatform::set_hart_id(0);
        let mutex: HartMutex<SimPlatform> = HartMutex::new();

        mutex.take();
        mutex.take();

        // A different hart giving must alter neither owner nor recursion.
        SimPlatform::set_hart_id(1);
        mutex.give();
        assert_eq!(mutex.holder(), HartId::new(0));
        assert_eq!(mutex.recursion_depth(), 1);

        SimPlatform::set_hart_id(0);
        mutex.give();
        mutex.give();
        assert_eq!(mutex.holder(), HartId::NONE);
    }

    #[test]
    fn test_give_on_free_mutex_is_noop() {
        SimPlatform::set_hart_id(2);
        let mutex: HartMutex<SimPlatform> = HartMutex::new();

        mutex.give();
        assert_eq!(mutex.holder(), HartId::NONE);
        assert_eq!(mutex.recursion_depth(), 0);
    }

    #[test]
    fn test_reacquire_after_release() {
        let mutex: HartMutex<SimPlatform> = HartMutex::new();

        SimPlatform::set_hart_id(0);
        mutex.take();
        mutex.give();

        // A different hart can claim the freed mutex.
        SimPlatform::set_hart_id(1);
        mutex.take();
        assert_eq!(mutex.holder(), HartId::new(1));
        mutex.give();
    }
}
