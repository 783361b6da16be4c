// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Enumeration firmware image for the simulated FX2 SoC.
//!
//! All this image does is wire the control-dispatch loop to the live CSR
//! addresses and the static descriptor set, then run forever. The loop's
//! marker writes at 0xe001/0xe002 are what the simulation's waveform tooling
//! keys on to timestamp "interrupt observed" and "handler done".

use fx2usb::descriptor::DescriptorSet;
use fx2usb::dispatch::{ControlLoop, DispatchRegs, SetupEngine};
use fx2usb::regs::{self, Mmio8, Reg8};
use fx2usb::sim_device;

/// Stand-in for the control-transfer engine this image is linked against.
///
/// The full engine reads SETUPDAT, answers the standard requests out of the
/// descriptor set, forwards anything else to the request hook, and retires
/// the interrupt condition on its way out. Only that last side effect lives
/// here; without it the dispatch loop would spin forever on a condition
/// nobody retires.
struct AckSudav {
    usbirq: Mmio8,
}

impl SetupEngine for AckSudav {
    fn handle_setup(&mut self, _descriptors: &DescriptorSet<'_>) {
        // SUDAV is write-one-to-clear.
        self.usbirq.write(regs::SUDAV);
    }
}

fn main() {
    // Safety: these are CSR and scratch-RAM addresses of the simulated FX2,
    // valid for byte access and referenced nowhere else in this image.
    let usbirq = unsafe { Mmio8::new(regs::USBIRQ) };
    let dispatch_regs = DispatchRegs {
        usbirq,
        scratch: unsafe { Mmio8::new(regs::SCRATCH_SRC) },
        mark_seen: unsafe { Mmio8::new(regs::MARK_SETUP_SEEN) },
        mark_done: unsafe { Mmio8::new(regs::MARK_SETUP_DONE) },
    };

    ControlLoop::new(dispatch_regs, AckSudav { usbirq }, &sim_device::DESCRIPTOR_SET).run()
}
