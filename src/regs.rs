// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Register access for the simulated FX2 CSR bank.
//!
//! The FX2's control registers are single bytes at fixed XDATA addresses, and
//! nobody has published a PAC for them, so this module models exactly what
//! the two firmware images need: an 8-bit register handle trait, the live
//! memory-mapped implementation of it, and the addresses involved.

/// An 8-bit device register.
///
/// Every hardware access in this crate goes through this trait, which is how
/// the tests substitute scripted registers for the real CSR bank. A `read`
/// must observe the register at the moment of the call; implementations may
/// not cache or coalesce accesses.
pub trait Reg8 {
    fn read(&self) -> u8;
    fn write(&self, value: u8);
}

/// A live memory-mapped 8-bit register at a fixed address.
#[derive(Clone, Copy)]
pub struct Mmio8 {
    addr: *mut u8,
}

impl Mmio8 {
    /// Creates a handle for the register at `addr`.
    ///
    /// # Safety
    ///
    /// `addr` must be mapped and valid for single-byte volatile reads and
    /// writes for as long as the handle lives, and no Rust reference may
    /// alias that byte.
    pub const unsafe fn new(addr: usize) -> Self {
        Mmio8 { addr: addr as *mut u8 }
    }
}

impl Reg8 for Mmio8 {
    fn read(&self) -> u8 {
        // Safety: guaranteed by the contract on `new`.
        unsafe { core::ptr::read_volatile(self.addr) }
    }

    fn write(&self, value: u8) {
        // Safety: as above.
        unsafe { core::ptr::write_volatile(self.addr, value) }
    }
}

/// USB interrupt request register.
pub const USBIRQ: usize = 0xe65d;

/// SUDAV bit in `USBIRQ`: a SETUP packet has arrived and is ready to be read
/// out of SETUPDAT. Write-one-to-clear; the dispatch loop never clears it
/// itself, that is the control-transfer engine's job.
pub const SUDAV: u8 = 1 << 0;

/// CPU control and status register.
pub const CPUCS: usize = 0xe600;

/// Bit offset of the 2-bit CLKSPD clock-divider field within `CPUCS`.
pub const CLKSPD_OFFSET: u8 = 3;

/// Mask of the CLKSPD field within `CPUCS`.
pub const CLKSPD_MASK: u8 = 0b11 << CLKSPD_OFFSET;

// Scratch RAM starts at 0xe000. The dispatch loop copies the first cell into
// the two below it so that external instrumentation, watching writes to these
// addresses in the simulation waveform, can timestamp the loop phases.

/// Source cell whose value is copied into the marker cells.
pub const SCRATCH_SRC: usize = 0xe000;

/// Marker written right after SUDAV is observed, before the engine runs.
pub const MARK_SETUP_SEEN: usize = 0xe001;

/// Marker written right after the engine's setup handler returns.
pub const MARK_SETUP_DONE: usize = 0xe002;
