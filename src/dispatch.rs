// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The control-transfer dispatch loop.
//!
//! This is the whole of the enumeration image's runtime behavior: spin on
//! USBIRQ until SUDAV is set, stamp a marker, run the engine's setup handler
//! once, stamp the other marker, repeat forever. The "interrupt" is only ever
//! observed by polling the status register -- there is no vector dispatch and
//! no preemption, so the loop body runs to completion every time and nothing
//! here needs locking.
//!
//! The loop deliberately does not clear SUDAV. Clearing it is a documented
//! side effect of the engine's handler; if the engine ever fails to, the loop
//! re-runs the handler on the same condition forever. That livelock is an
//! accepted failure mode for a single-purpose polling firmware -- recovery is
//! a device reset, not code here.

use crate::descriptor::{DescriptorSet, UsbSetupPacket};
use crate::regs::{Reg8, SUDAV};

/// The external control-transfer engine the loop hands off to.
///
/// One call per observed SUDAV condition. The handler is expected to read the
/// pending SETUP packet out of hardware, answer standard requests from the
/// descriptor set, forward anything it doesn't recognize to the firmware's
/// [`RequestHook`], and clear SUDAV before returning.
pub trait SetupEngine {
    fn handle_setup(&mut self, descriptors: &DescriptorSet<'_>);
}

/// What a [`RequestHook`] did with a request the engine couldn't.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RequestOutcome {
    /// The hook answered the request itself.
    Handled,
    /// The hook wants nothing to do with it; the engine STALLs the transfer.
    Declined,
}

/// Firmware-author hook for SETUP requests outside the standard set.
pub trait RequestHook {
    fn on_unhandled_request(&mut self, req: &UsbSetupPacket) -> RequestOutcome;
}

/// The policy this firmware ships: standard requests are the engine's
/// business, everything else gets STALLed.
pub struct DeclineAll;

impl RequestHook for DeclineAll {
    fn on_unhandled_request(&mut self, _req: &UsbSetupPacket) -> RequestOutcome {
        RequestOutcome::Declined
    }
}

/// The register handles the dispatch loop needs.
pub struct DispatchRegs<R> {
    /// USB interrupt status; only the SUDAV bit is tested, and only read.
    pub usbirq: R,
    /// Scratch cell whose value gets copied into the markers.
    pub scratch: R,
    /// Marker stamped when SUDAV is observed, before the handler runs.
    pub mark_seen: R,
    /// Marker stamped after the handler returns.
    pub mark_done: R,
}

/// The dispatch loop itself: registers, engine, and the immutable descriptor
/// set it forwards on every handoff.
pub struct ControlLoop<'a, R, E> {
    regs: DispatchRegs<R>,
    engine: E,
    descriptors: &'a DescriptorSet<'a>,
}

impl<'a, R: Reg8, E: SetupEngine> ControlLoop<'a, R, E> {
    pub fn new(regs: DispatchRegs<R>, engine: E, descriptors: &'a DescriptorSet<'a>) -> Self {
        ControlLoop {
            regs,
            engine,
            descriptors,
        }
    }

    /// Blocks until SUDAV is pending, then runs the engine's handler once.
    ///
    /// This is one turn of [`run`](Self::run), split out so tests can drive
    /// the loop a bounded number of times.
    pub fn dispatch_one(&mut self) {
        // Wait for the interrupt condition. One volatile read per poll, no
        // timeout, no yield: blocking is the intended steady state.
        while self.regs.usbirq.read() & SUDAV == 0 {
            core::hint::spin_loop();
        }

        // Stamp "interrupt observed" where the simulation can see it.
        self.regs.mark_seen.write(self.regs.scratch.read());

        // Hand off. Clearing SUDAV is the engine's side effect, not ours.
        self.engine.handle_setup(self.descriptors);

        // Stamp "handler done".
        self.regs.mark_done.write(self.regs.scratch.read());
    }

    /// Runs the dispatch loop for the life of the device.
    pub fn run(mut self) -> ! {
        loop {
            self.dispatch_one();
        }
    }
}
