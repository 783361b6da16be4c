// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Descriptor identity of the simulation example device.
//!
//! The whole hierarchy is `static`: assembled at build time, read-only for
//! the life of the image. The single configuration claims no interfaces --
//! nothing past enumeration is implemented -- which is a perfectly legal
//! thing for a device to tell the host.

use zerocopy::U16;

use crate::descriptor::{
    Configuration, DescriptorSet, UsbConfigurationDescriptor, UsbDescType, UsbDeviceDescriptor,
};

/// Max packet size on endpoint 0. The FX2 serial engine negotiates 64-byte
/// control packets; declaring anything else breaks enumeration.
pub const EP0_MAX_PACKET: u8 = 64;

pub static DEVICE: UsbDeviceDescriptor = UsbDeviceDescriptor {
    length: core::mem::size_of::<UsbDeviceDescriptor>() as u8,
    descriptor_type: UsbDescType::Device,
    bcd_usb: U16::from_bytes(u16::to_le_bytes(0x0200)),
    // Class/subclass/protocol 0: defer to the interfaces.
    device_class: 0,
    device_subclass: 0,
    device_protocol: 0,
    max_packet_size0: EP0_MAX_PACKET,
    // Cypress's default VID/PID for an unconfigured FX2.
    vendor: U16::from_bytes(u16::to_le_bytes(0x04b4)),
    product: U16::from_bytes(u16::to_le_bytes(0x8613)),
    bcd_device: U16::from_bytes(u16::to_le_bytes(0x0000)),
    manufacturer_s: 1,
    product_s: 2,
    serial_s: 0,
    num_configurations: 1,
};

pub static CONFIGS: [Configuration<'static>; 1] = [Configuration {
    descriptor: UsbConfigurationDescriptor {
        length: core::mem::size_of::<UsbConfigurationDescriptor>() as u8,
        descriptor_type: UsbDescType::Config,
        // Header only; there are no sub-descriptors to add.
        total_length: U16::from_bytes(u16::to_le_bytes(
            core::mem::size_of::<UsbConfigurationDescriptor>() as u16,
        )),
        num_interfaces: 0,
        configuration_value: 1,
        configuration_s: 0,
        // Bus powered; bit 7 is reserved-must-be-set.
        attributes: 0x80,
        // 100 mA, in 2 mA units.
        max_power: 50,
    },
    interfaces: &[],
}];

pub static STRINGS: [&str; 2] = ["Antmicro", "FX2 simulation example firmware"];

/// The handle the enumeration image passes to the control-transfer engine.
pub static DESCRIPTOR_SET: DescriptorSet<'static> = DescriptorSet {
    device: &DEVICE,
    configs: &CONFIGS,
    strings: &STRINGS,
};
