// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Clock-divider firmware image: cycles CPUCS.CLKSPD forever.
//!
//! Never linked with the enumeration image; this is the alternate payload
//! used to watch clock-speed changes in the simulation waveform.

use fx2usb::clkspd::ClkSpdCycler;
use fx2usb::regs::{self, Mmio8};

fn main() {
    // Safety: CPUCS is the clock control CSR of the simulated FX2, valid for
    // byte access and referenced nowhere else in this image.
    let cpucs = unsafe { Mmio8::new(regs::CPUCS) };

    ClkSpdCycler::new(cpucs).run()
}
