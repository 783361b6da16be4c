// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The clock-divider image: cycle CPUCS.CLKSPD through its three settings.
//!
//! Hardware is the authoritative state here. The divider setting lives in the
//! CPUCS register, not in a firmware variable, so every transition is a
//! read-modify-write against the live register: read once, compute the
//! successor from what was actually there, write back with every non-CLKSPD
//! bit preserved.

use num_derive::FromPrimitive;
use num_traits::FromPrimitive;

use crate::regs::{Reg8, CLKSPD_MASK, CLKSPD_OFFSET};

/// CPU clock divider settings, as encoded in the 2-bit CLKSPD field.
///
/// `0b11` is reserved and is not a state; see [`ClkSpd::from_field`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, FromPrimitive)]
pub enum ClkSpd {
    Div1 = 0b00,
    Div2 = 0b01,
    Div4 = 0b10,
}

impl ClkSpd {
    /// The next divider in the fixed round-robin.
    pub fn next(self) -> Self {
        match self {
            ClkSpd::Div1 => ClkSpd::Div2,
            ClkSpd::Div2 => ClkSpd::Div4,
            ClkSpd::Div4 => ClkSpd::Div1,
        }
    }

    /// Decodes a read-back CLKSPD field value. Returns `None` for the
    /// reserved `0b11`, which this firmware never writes.
    pub fn from_field(raw: u8) -> Option<Self> {
        Self::from_u8(raw & 0b11)
    }
}

/// Iterations of the busy-wait between transitions. A decrement count, not a
/// calibrated time unit.
pub const DELAY_ITERS: u32 = 10;

/// The cycling state machine, bound to a CPUCS register handle.
pub struct ClkSpdCycler<R> {
    cpucs: R,
}

impl<R: Reg8> ClkSpdCycler<R> {
    pub fn new(cpucs: R) -> Self {
        ClkSpdCycler { cpucs }
    }

    /// Advances CLKSPD to the next divider.
    ///
    /// One read, one write. The other CPUCS bits (8051 reset, clock output
    /// enable, ...) pass through unmodified. If the register somehow holds
    /// the reserved `0b11`, the increment wraps past `Div4` and the cycle
    /// resumes at `Div1`.
    pub fn step(&self) {
        let cur = self.cpucs.read();
        let next = match ClkSpd::from_field((cur & CLKSPD_MASK) >> CLKSPD_OFFSET) {
            Some(spd) => spd.next(),
            None => ClkSpd::Div1,
        };
        self.cpucs.write((cur & !CLKSPD_MASK) | ((next as u8) << CLKSPD_OFFSET));
    }

    /// Cycles the divider for the life of the device: delay, step, repeat.
    pub fn run(self) -> ! {
        loop {
            delay(DELAY_ITERS);
            self.step();
        }
    }
}

/// Busy-waits for `iters` decrement iterations.
#[inline(never)]
pub fn delay(iters: u32) {
    for _ in 0..iters {
        core::hint::spin_loop();
    }
}
