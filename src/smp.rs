// Copyright 2025 The Hartlock Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Hart bring-up and doorbell convention
//!
//! After system reset only the primary hart (id 0) executes; the secondary
//! harts are held in a reset/wait state by hardware. Once the primary hart
//! has initialized, it rings each secondary's doorbell, which fires that
//! hart's wake vector. Inside its trap entry the woken hart must read and
//! clear its own doorbell before resuming, else the notification stays
//! pending and may refire.
//!
//! Per-hart state machine:
//!
//! ```text
//! RESET --(doorbell written)--> WOKEN --(doorbell cleared)--> RUNNING
//! ```
//!
//! `RUNNING` is terminal for this crate; what the hart executes afterwards
//! is the caller's concern.

use core::sync::atomic::{AtomicU8, Ordering};

use spin::Once;

use crate::traits::{HartId, IpiController, Platform};

/// Maximum number of harts supported
///
/// The hart count is a compile-time constant; there is no dynamic topology.
pub const MAX_HARTS: usize = 8;

bitflags::bitflags! {
    /// Selection of harts for a bulk wake operation
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct HartMask: u32 {
        const HART0 = 1 << 0;
        const HART1 = 1 << 1;
        const HART2 = 1 << 2;
        const HART3 = 1 << 3;
        const HART4 = 1 << 4;
        const HART5 = 1 << 5;
        const HART6 = 1 << 6;
        const HART7 = 1 << 7;

        /// Every hart the crate is configured for
        const ALL = (1 << MAX_HARTS) - 1;

        /// Every hart except the primary
        const SECONDARIES = ((1 << MAX_HARTS) - 1) & !1;
    }
}

impl HartMask {
    /// Mask selecting a single hart, or empty if the id is out of range
    pub const fn single(hart: HartId) -> Self {
        if hart.is_valid() {
            Self::from_bits_truncate(1 << hart.into_inner())
        } else {
            Self::empty()
        }
    }

    /// Check whether the mask selects `hart`
    pub fn contains_hart(self, hart: HartId) -> bool {
        self.intersects(Self::single(hart))
    }
}

/// Bring-up state of one hart
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HartState {
    /// Held in reset/wait by hardware, doorbell not yet written
    Reset = 0,
    /// Doorbell written, wake vector fired or about to fire
    Woken = 1,
    /// Doorbell cleared, hart executing normally
    Running = 2,
}

impl HartState {
    fn from_raw(raw: u8) -> Self {
        match raw {
            1 => Self::Woken,
            2 => Self::Running,
            _ => Self::Reset,
        }
    }
}

/// Per-hart bring-up state table
///
/// An explicitly owned singleton: callers keep a handle (normally a static)
/// and pass it to the wake and acknowledge operations together with the
/// doorbell controller.
pub struct HartTable {
    states: [AtomicU8; MAX_HARTS],
}

impl HartTable {
    /// Create a table with every hart in `Reset`
    pub const fn new() -> Self {
        const RESET: AtomicU8 = AtomicU8::new(HartState::Reset as u8);
        Self {
            states: [RESET; MAX_HARTS],
        }
    }

    /// Bring-up state of `hart`
    ///
    /// Out-of-range ids report `Reset`.
    pub fn state(&self, hart: HartId) -> HartState {
        match self.states.get(hart.into_inner() as usize) {
            Some(state) => HartState::from_raw(state.load(Ordering::Acquire)),
            None => HartState::Reset,
        }
    }

    /// Record that the primary hart is executing
    ///
    /// Hart 0 is the only hart running after system reset; it is never woken
    /// by doorbell. Call this once from its early init.
    pub fn mark_primary_online(&self) {
        self.states[0].store(HartState::Running as u8, Ordering::Release);
        log::info!("smp: hart 0 online (primary)");
    }

    /// Wake one secondary hart by ringing its doorbell
    ///
    /// Marks the hart `Woken` before the ring so its trap path observes the
    /// transition. Ringing a hart that is already woken or running collapses
    /// into the still-pending doorbell (level-triggered, no queueing).
    pub fn wake<C: IpiController + ?Sized>(&self, ipi: &C, hart: HartId) -> Result<(), &'static str> {
        if !hart.is_valid() {
            return Err("hart id out of range");
        }
        if hart.into_inner() == 0 {
            return Err("primary hart runs from reset, not from a doorbell");
        }

        let _ = self.states[hart.into_inner() as usize].compare_exchange(
            HartState::Reset as u8,
            HartState::Woken as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
        ipi.ring(hart);
        log::debug!("smp: rang doorbell for hart {}", hart.into_inner());
        Ok(())
    }

    /// Wake every secondary hart selected by `mask`
    ///
    /// The mask must not include the primary hart.
    pub fn wake_mask<C: IpiController + ?Sized>(&self, ipi: &C, mask: HartMask) -> Result<(), &'static str> {
        if mask.contains(HartMask::HART0) {
            return Err("primary hart runs from reset, not from a doorbell");
        }

        let mut woken = 0;
        for id in 1..MAX_HARTS as u32 {
            let hart = HartId::new(id);
            if mask.contains_hart(hart) {
                self.wake(ipi, hart)?;
                woken += 1;
            }
        }
        log::info!("smp: woke {} secondary harts", woken);
        Ok(())
    }

    /// Consume the calling hart's doorbell from its trap entry
    ///
    /// Reads and clears the doorbell, returning whether a signal was
    /// pending. The first acknowledgement after a wake moves the hart to
    /// `Running`; later rings are plain notifications and leave the state
    /// alone.
    pub fn acknowledge_wake<P: Platform, C: IpiController + ?Sized>(&self, ipi: &C) -> bool {
        let me = P::hart_id();
        if !me.is_valid() {
            return false;
        }

        let pending = ipi.read_and_clear(me);
        if pending {
            let became_running = self.states[me.into_inner() as usize]
                .compare_exchange(
                    HartState::Woken as u8,
                    HartState::Running as u8,
                    Ordering::AcqRel,
                    Ordering::Acquire,
                )
                .is_ok();
            if became_running {
                log::info!("smp: hart {} online", me.into_inner());
            }
        }
        pending
    }

    /// Number of harts currently in `Running`
    pub fn online_count(&self) -> usize {
        self.states
            .iter()
            .filter(|state| HartState::from_raw(state.load(Ordering::Acquire)) == HartState::Running)
            .count()
    }
}

// ============================================================================
// Registered SMP context
// ============================================================================

/// The hart table and doorbell controller a trap handler operates on
///
/// Trap entries receive no arguments, so the pair is registered once at boot
/// and looked up by [`handle_wake_interrupt`].
pub struct SmpContext {
    /// Bring-up state table
    pub harts: &'static HartTable,

    /// Doorbell controller
    pub ipi: &'static (dyn IpiController + Sync),
}

static CONTEXT: Once<SmpContext> = Once::new();

/// Register the SMP context
///
/// Must be called once by the primary hart before any secondary is woken.
/// A second registration is rejected.
pub fn init(ctx: SmpContext) -> Result<(), &'static str> {
    if CONTEXT.is_completed() {
        return Err("smp context already registered");
    }
    CONTEXT.call_once(|| ctx);
    log::info!("smp: context registered");
    Ok(())
}

/// The registered SMP context, if any
pub fn context() -> Option<&'static SmpContext> {
    CONTEXT.get()
}

/// Trap-entry hook: consume the calling hart's doorbell
///
/// Returns whether a signal was pending. Returns `false` when no context has
/// been registered, since there is no doorbell to consume.
pub fn handle_wake_interrupt<P: Platform>() -> bool {
    match CONTEXT.get() {
        Some(ctx) => ctx.harts.acknowledge_wake::<P, _>(ctx.ipi),
        None => false,
    }
}

// ============================================================================
// Tests
// ============================================================================
