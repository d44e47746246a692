// Copyright 2025 The Hartlock Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Spinlock Implementation
//!
//! This module provides the lowest-level mutual exclusion primitive: a
//! single shared word that harts acquire by atomic swap and release by a
//! cache-bypassing store.
//!
//! The word is the sole piece of shared state. There is no owner field and
//! no recursion counter; a hart that re-locks a spinlock it already holds
//! deadlocks itself. Layers that need ownership tracking build on top of
//! this (see [`crate::sync::mutex::HartMutex`]).

use core::cell::UnsafeCell;
use core::marker::PhantomData;
use core::ops::{Deref, DerefMut};

use crate::traits::Platform;

/// Lock-word value: the lock is free
pub const UNLOCKED: u32 = 0;

/// Lock-word value: the lock is held
pub const LOCKED: u32 = 1;

/// A raw busy-wait spinlock over a single shared word
///
/// The word starts `UNLOCKED` and lives as long as the resource it protects;
/// it is never destroyed, only reinitialized at system reset. At most one
/// hart observes the `UNLOCKED -> LOCKED` transition under its own swap; all
/// other contenders retry.
///
/// `unlock` performs no owner check: releasing a spinlock another hart holds
/// is a caller contract violation that must be prevented structurally, not a
/// condition this type detects.
pub struct RawSpinlock<P: Platform> {
    word: UnsafeCell<u32>,
    _platform: PhantomData<P>,
}

unsafe impl<P: Platform> Send for RawSpinlock<P> {}
unsafe impl<P: Platform> Sync for RawSpinlock<P> {}

impl<P: Platform> RawSpinlock<P> {
    /// Create a new unlocked spinlock
    pub const fn new() -> Self {
        Self {
            word: UnsafeCell::new(UNLOCKED),
            _platform: PhantomData,
        }
    }

    /// Acquire the lock, spinning until it becomes available
    ///
    /// Repeatedly swaps `LOCKED` into the word. If the previous value was
    /// `LOCKED` another hart holds the lock and the swap changed nothing;
    /// relax the bus and retry. If it was `UNLOCKED` the caller now holds
    /// the lock.
    ///
    /// There is no iteration bound and no timeout: starvation under
    /// contention is an accepted property of this primitive.
    pub fn lock(&self) {
        // SAFETY: the word lives inside self and is aligned for u32.
        while unsafe { P::atomic_swap(self.word.get(), LOCKED) } == LOCKED {
            P::relax();
        }
    }

    /// Try to acquire the lock without spinning
    ///
    /// A single swap attempt. On failure the swap rewrote `LOCKED` into a
    /// word that already held `LOCKED`, which changes nothing.
    pub fn try_lock(&self) -> bool {
        // SAFETY: as in lock().
        unsafe { P::atomic_swap(self.word.get(), LOCKED) == UNLOCKED }
    }

    /// Release the lock
    ///
    /// Unconditionally writes `UNLOCKED` back through the platform's
    /// cache-bypassing store, so the release is visible to harts whose
    /// private caches are not coherent with ours. The caller must hold the
    /// lock; this is not checked.
    pub fn unlock(&self) {
        // SAFETY: as in lock().
        unsafe { P::uncached_store(self.word.get(), UNLOCKED) }
    }
}

/// A spinlock protecting a value of type `T`
///
/// The data-carrying wrapper around [`RawSpinlock`]: acquiring the lock
/// returns an RAII guard with exclusive access to the data, and dropping the
/// guard releases the lock. Use this wherever the protected state can be
/// expressed as a value; use `RawSpinlock` directly only where the critical
/// section has no single owner value.
pub struct SpinMutex<T, P: Platform> {
    lock: RawSpinlock<P>,
    data: UnsafeCell<T>,
}

unsafe impl<T: Send, P: Platform> Send for SpinMutex<T, P> {}
unsafe impl<T: Send, P: Platform> Sync for SpinMutex<T, P> {}

impl<T, P: Platform> SpinMutex<T, P> {
    /// Create a new spinlock wrapping the given value
    pub const fn new(data: T) -> Self {
        Self {
            lock: RawSpinlock::new(),
            data: UnsafeCell::new(data),
        }
    }

    /// Acquire the lock, spinning until it becomes available
    pub fn lock(&self) -> SpinMutexGuard<'_, T, P> {
        self.lock.lock();
        SpinMutexGuard { mutex: self }
    }

    /// Try to acquire the lock without spinning
    pub fn try_lock(&self) -> Option<SpinMutexGuard<'_, T, P>> {
        if self.lock.try_lock() {
            Some(SpinMutexGuard { mutex: self })
        } else {
            None
        }
    }

    /// Get a mutable reference to the inner data
    ///
    /// `&mut self` guarantees exclusive access at compile time, so no
    /// locking is needed. Useful during single-hart initialization.
    pub fn get_mut(&mut self) -> &mut T {
        self.data.get_mut()
    }
}

/// RAII guard for a SpinMutex
pub struct SpinMutexGuard<'a, T, P: Platform> {
    mutex: &'a SpinMutex<T, P>,
}

impl<'a, T, P: Platform> Drop for SpinMutexGuard<'a, T, P> {
    fn drop(&mut self) {
        self.mutex.lock.unlock();
    }
}

impl<'a, T, P: Platform> Deref for SpinMutexGuard<'a, T, P> {
    type Target = T;
    fn deref(&self) -> &T {
        // SAFETY: the guard exists, so this hart holds the lock.
        unsafe { &*self.mutex.data.get() }
    }
}

impl<'a, T, P: Platform> DerefMut for SpinMutexGuard<'a, T, P> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: the guard exists, so this hart holds the lock.
        unsafe { &mut *self.mutex.data.get() }
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
    fn test_swap_semantics() {
        // First swap on a fresh word returns UNLOCKED and leaves the word
        // LOCKED; a second swap returns LOCKED (already held).
        let mut word: u32 = UNLOCKED;
        unsafe {
            assert_eq!(SimPlatform::atomic_swap(&mut word, LOCKED), UNLOCKED);
            assert_eq!(SimPlatform::atomic_swap(&mut word, LOCKED), LOCKED);
            SimPlatform::uncached_store(&mut word, UNLOCKED);
            assert_eq!(SimPlatform::atomic_swap(&mut word, LOCKED), UNLOCKED);
        }
    }

    #[test]
    fn test_raw_lock_unlock() {
        let lock: RawSpinlock<SimPlatform> = RawSpinlock::new();

        lock.lock();
        assert!(!lock.try_lock());
        lock.unlock();
        assert!(lock.try_lock());
        lock.unlock();
    }

    #[test]
    fn test_raw_try_lock_failure_changes_nothing() {
        let lock: RawSpinlock<SimPlatform> = RawSpinlock::new();

        lock.lock();
        // Failed attempts must leave the lock held, not corrupt it.
        assert!(!lock.try_lock());
        assert!(!lock.try_lock());
        lock.unlock();
        assert!(lock.try_lock());
    }

    #[test]
    fn test_spin_mutex_basic() {
        let mutex: SpinMutex<u32, SimPlatform> = SpinMutex::new(42);
        {
            let mut guard = mutex.lock();
            assert_eq!(*guard, 42);
            *guard = 100;
        }
        assert_eq!(*mutex.lock(), 100);
    }

    #[test]
    fn test_spin_mutex_try_lock() {
        let mutex: SpinMutex<u32, SimPlatform> = SpinMutex::new(42);

        {
            let _guard = mutex.lock();
            // Lock is held, try_lock should fail
            assert!(mutex.try_lock().is_none());
        }
        // Lock is released, try_lock should succeed
        assert!(mutex.try_lock().is_some());
    }

    #[test]
    fn test_spin_mutex_get_mut() {
        let mut mutex: SpinMutex<u32, SimPlatform> = SpinMutex::new(1);
        *mutex.get_mut() = 7;
        assert_eq!(*mutex.lock(), 7);
    }
}
