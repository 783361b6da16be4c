// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! USB device-side firmware for the simulated EZ-USB FX2 SoC.
//!
//! This crate contains the logic of two small, mutually exclusive firmware
//! images, plus the descriptor data model they are built on:
//!
//! - [`dispatch`] -- the enumeration image's control-transfer dispatch loop.
//!   It busy-waits on the SUDAV ("setup data available") bit of the USB
//!   interrupt status register, stamps a pair of scratch-RAM markers that the
//!   simulator's waveform instrumentation watches for, and hands the
//!   descriptor set to the external control-transfer engine. That's it. No
//!   interrupt vectors, no callbacks: the firmware has exactly one job, so it
//!   blocks until there is work and then runs to completion.
//!
//! - [`clkspd`] -- the other image: a three-state round-robin over the 2-bit
//!   CLKSPD clock-divider field in CPUCS, with a short busy-wait between
//!   transitions. Structurally unrelated to USB, but it exercises the same
//!   register-access discipline, so it lives here too.
//!
//! - [`descriptor`] -- the standard USB descriptor structures (device,
//!   configuration, interface, endpoint, string table) and the root
//!   [`descriptor::DescriptorSet`] aggregate handed to the engine. The
//!   structures serialize with `zerocopy`, so the byte layout on the wire is
//!   exactly the in-memory layout, checked by tests rather than by hand.
//!
//! The SETUP-packet parsing, data-toggle handling and autopointer descriptor
//! copying all belong to the external engine (libfx2 in the original C
//! firmware); this crate only defines the seam it plugs into, as the
//! [`dispatch::SetupEngine`] and [`dispatch::RequestHook`] traits.
//!
//! There is no peripheral access crate for the FX2's CSR bank, so [`regs`]
//! models the handful of 8-bit registers the images touch directly. All
//! hardware access goes through the [`regs::Reg8`] trait, which is what lets
//! the tests run the loops against scripted registers on the host.

#![cfg_attr(not(test), no_std)]

pub mod clkspd;
pub mod descriptor;
pub mod dispatch;
pub mod regs;
pub mod sim_device;
