// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Standard USB descriptor structures and the root descriptor set.
//!
//! Every struct here is `#[repr(C)]` with `zerocopy::AsBytes`, so its wire
//! serialization is just its in-memory representation -- multi-byte fields
//! are `U16<LittleEndian>` to keep the layout right on any host. The
//! descriptor set is assembled once, as `static` data, and never mutated; the
//! control-transfer engine only ever reads it.
//!
//! Counts that the USB spec makes the device declare (`bNumConfigurations`,
//! `bNumInterfaces`, `bNumEndpoints`, `wTotalLength`) are kept as plain
//! declared fields rather than being derived from the slice lengths. A
//! mismatch between a declared count and the actual sequence is a real bug
//! class -- the host sees a configuration that disagrees with itself -- and
//! keeping both representable lets [`DescriptorSet::validate`] catch it in
//! tests instead of shipping it.

use byteorder::LittleEndian;
use zerocopy::{AsBytes, FromBytes, LayoutVerified, Unaligned, U16};

use num_derive::FromPrimitive;
use num_traits::FromPrimitive;

/// USB deals in two transfer directions, OUT (host-to-device) and IN
/// (device-to-host), encoded in the top bit of addresses and request types.
#[derive(Copy, Clone, Debug, PartialEq, Eq, FromPrimitive)]
pub enum UsbDir {
    Out = 0,
    In = 0x80,
}

impl UsbDir {
    pub const fn endpoint(self, num: u8) -> u8 {
        num | self as u8
    }

    pub const fn of_endpoint_addr(addr: u8) -> Self {
        if addr & Self::In as u8 != 0 {
            Self::In
        } else {
            Self::Out
        }
    }
}

/// Layout of an 8-byte USB SETUP packet, as it arrives in SETUPDAT.
#[repr(C)]
#[derive(Debug, AsBytes, FromBytes, Unaligned)]
pub struct UsbSetupPacket {
    /// Direction, type, and recipient bits.
    pub request_type: u8,
    /// Request code. The standard ones are in [`UsbSetupRequest`]; devices
    /// may define more as long as they don't collide.
    pub request: u8,
    /// 16-bit argument, meaning specific to the request.
    pub value: U16<LittleEndian>,
    /// Second argument, often an interface or endpoint index.
    pub index: U16<LittleEndian>,
    /// Number of bytes (OUT) or maximum number of bytes (IN) in the data
    /// stage that follows, if any.
    pub length: U16<LittleEndian>,
}

impl UsbSetupPacket {
    /// Reinterprets the raw 8 SETUPDAT bytes as a setup packet.
    ///
    /// Returns `None` if `raw` is not exactly 8 bytes.
    pub fn parse(raw: &[u8]) -> Option<&Self> {
        Some(LayoutVerified::<_, UsbSetupPacket>::new(raw)?.into_ref())
    }

    /// The transfer direction encoded in the top bit of `request_type`.
    pub fn direction(&self) -> UsbDir {
        UsbDir::of_endpoint_addr(self.request_type)
    }

    /// The standard request this packet carries, if it is one we know.
    pub fn standard_request(&self) -> Option<UsbSetupRequest> {
        UsbSetupRequest::from_u8(self.request)
    }
}

/// The standard SETUP requests the control-transfer engine answers from the
/// descriptor set. Anything that doesn't decode to one of these falls through
/// to the firmware's request hook.
#[derive(Copy, Clone, Debug, PartialEq, Eq, FromPrimitive)]
pub enum UsbSetupRequest {
    /// Asks the device to send a descriptor back to the host. Always IN.
    GetDescriptor = 0x06,
    /// Moves the device to a new bus address. Always OUT.
    SetAddress = 0x05,
    /// Selects one of the configurations listed in the descriptors. OUT.
    SetConfiguration = 0x09,
}

/// Types of USB descriptor.
#[derive(Copy, Clone, Debug, FromPrimitive, AsBytes)]
#[repr(u8)]
pub enum UsbDescType {
    Device = 0x01,
    Config = 0x02,
    String = 0x03,
    Interface = 0x04,
    Endpoint = 0x05,
}

/// The 18-byte device descriptor, the first thing the host asks for.
#[repr(C)]
#[derive(Debug, AsBytes)]
pub struct UsbDeviceDescriptor {
    /// Length of this structure, must be 18.
    pub length: u8,
    /// Must be `Device`.
    pub descriptor_type: UsbDescType,
    /// USB protocol release in binary-coded decimal, e.g. `0x0200` for 2.0.
    pub bcd_usb: U16<LittleEndian>,
    /// Device class; 0 defers classing to the interfaces.
    pub device_class: u8,
    pub device_subclass: u8,
    pub device_protocol: u8,
    /// Maximum packet size on the default control endpoint. Must match what
    /// the silicon negotiates -- 64 on the FX2.
    pub max_packet_size0: u8,
    pub vendor: U16<LittleEndian>,
    pub product: U16<LittleEndian>,
    /// Device release number, BCD again.
    pub bcd_device: U16<LittleEndian>,
    /// 1-based index of the manufacturer name in the string table, 0 = none.
    pub manufacturer_s: u8,
    /// 1-based index of the product name, 0 = none.
    pub product_s: u8,
    /// 1-based index of the serial number, 0 = none.
    pub serial_s: u8,
    /// Number of configurations; must match the configuration sequence.
    pub num_configurations: u8,
}

/// The 9-byte configuration descriptor header. On the wire it is followed by
/// the configuration's interface and endpoint descriptors, concatenated.
#[repr(C)]
#[derive(Debug, AsBytes)]
pub struct UsbConfigurationDescriptor {
    /// Length of this structure, must be 9.
    pub length: u8,
    /// Must be `Config`.
    pub descriptor_type: UsbDescType,
    /// Total serialized length of this header plus every sub-descriptor.
    pub total_length: U16<LittleEndian>,
    /// Declared number of interfaces; must match the interface sequence.
    pub num_interfaces: u8,
    /// 1-based value the host passes to `SetConfiguration` to pick this one.
    pub configuration_value: u8,
    /// 1-based string index for this configuration's name, 0 = none.
    pub configuration_s: u8,
    /// Attribute bits: bit 7 reserved-must-be-set (USB 1.0 "bus powered"),
    /// bit 6 self-powered, bit 5 remote wakeup.
    pub attributes: u8,
    /// Maximum draw in 2 mA units.
    pub max_power: u8,
}

/// Interface descriptor, 9 bytes.
#[repr(C)]
#[derive(Debug, AsBytes)]
pub struct UsbInterfaceDescriptor {
    pub length: u8,
    /// Must be `Interface`.
    pub descriptor_type: UsbDescType,
    pub interface_number: u8,
    pub alternate_setting: u8,
    /// Declared number of endpoints; must match the endpoint sequence.
    pub num_endpoints: u8,
    pub interface_class: u8,
    pub interface_subclass: u8,
    pub interface_protocol: u8,
    /// 1-based string index for this interface's name, 0 = none.
    pub interface_s: u8,
}

/// Endpoint descriptor, 7 bytes.
#[repr(C)]
#[derive(Debug, AsBytes)]
pub struct UsbEndpointDescriptor {
    pub length: u8,
    /// Must be `Endpoint`.
    pub descriptor_type: UsbDescType,
    /// Endpoint number in the low 4 bits, direction in the top bit.
    pub endpoint_address: u8,
    /// Transfer type in the low 2 bits (0 control, 2 bulk, ...).
    pub attributes: u8,
    pub max_packet_size: U16<LittleEndian>,
    /// Polling interval for interrupt/isochronous endpoints, in ms.
    pub interval: u8,
}

/// One interface and its ordered endpoint descriptors.
pub struct Interface<'a> {
    pub descriptor: UsbInterfaceDescriptor,
    pub endpoints: &'a [UsbEndpointDescriptor],
}

/// One configuration: the 9-byte header plus its ordered interfaces.
///
/// An empty interface sequence is a valid state -- "no interface claimed
/// yet" -- which is exactly what the simulation example device ships.
pub struct Configuration<'a> {
    pub descriptor: UsbConfigurationDescriptor,
    pub interfaces: &'a [Interface<'a>],
}

impl Configuration<'_> {
    /// Serialized length of the header plus every sub-descriptor, i.e. what
    /// `total_length` should declare.
    pub fn serialized_len(&self) -> usize {
        let mut len = core::mem::size_of::<UsbConfigurationDescriptor>();
        for itf in self.interfaces {
            len += core::mem::size_of::<UsbInterfaceDescriptor>();
            len += itf.endpoints.len() * core::mem::size_of::<UsbEndpointDescriptor>();
        }
        len
    }
}

/// The root aggregate handed to the control-transfer engine: one device
/// descriptor, the ordered configurations, and the string table.
///
/// String indices are 1-based; index 0 is reserved and means "no string".
/// The strings are plain ASCII -- the engine is responsible for the UTF-16LE
/// encoding the wire format wants.
///
/// A descriptor set is built once as `static` data and owns nothing mutable;
/// it lives, unchanged, for the life of the firmware.
pub struct DescriptorSet<'a> {
    pub device: &'a UsbDeviceDescriptor,
    pub configs: &'a [Configuration<'a>],
    pub strings: &'a [&'a str],
}

/// A consistency violation found by [`DescriptorSet::validate`].
///
/// None of these are detected at runtime on the device -- there is no
/// recovery path there anyway. They exist so the build's test suite refuses
/// descriptor sets the host would see as self-contradictory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptorError {
    /// A descriptor references a string the table doesn't have.
    StringIndexOutOfRange { index: u8, count: usize },
    /// `bNumConfigurations` disagrees with the configuration sequence.
    ConfigCountMismatch { declared: u8, actual: usize },
    /// A configuration's `bNumInterfaces` disagrees with its interfaces.
    InterfaceCountMismatch { config: u8, declared: u8, actual: usize },
    /// An interface's `bNumEndpoints` disagrees with its endpoints.
    EndpointCountMismatch { interface: u8, declared: u8, actual: usize },
    /// A configuration's `wTotalLength` disagrees with its serialized size.
    TotalLengthMismatch { config: u8, declared: u16, actual: u16 },
}

impl core::fmt::Display for DescriptorError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match *self {
            DescriptorError::StringIndexOutOfRange { index, count } => {
                write!(f, "string index {} out of range (table has {})", index, count)
            }
            DescriptorError::ConfigCountMismatch { declared, actual } => {
                write!(f, "bNumConfigurations is {} but {} configs present", declared, actual)
            }
            DescriptorError::InterfaceCountMismatch { config, declared, actual } => {
                write!(
                    f,
                    "config {}: bNumInterfaces is {} but {} interfaces present",
                    config, declared, actual
                )
            }
            DescriptorError::EndpointCountMismatch { interface, declared, actual } => {
                write!(
                    f,
                    "interface {}: bNumEndpoints is {} but {} endpoints present",
                    interface, declared, actual
                )
            }
            DescriptorError::TotalLengthMismatch { config, declared, actual } => {
                write!(
                    f,
                    "config {}: wTotalLength is {} but serializes to {}",
                    config, declared, actual
                )
            }
        }
    }
}

impl<'a> DescriptorSet<'a> {
    /// Checks every declared count and index against the sequences actually
    /// present. Run from tests; the device itself never calls this.
    pub fn validate(&self) -> Result<(), DescriptorError> {
        self.check_string(self.device.manufacturer_s)?;
        self.check_string(self.device.product_s)?;
        self.check_string(self.device.serial_s)?;

        if usize::from(self.device.num_configurations) != self.configs.len() {
            return Err(DescriptorError::ConfigCountMismatch {
                declared: self.device.num_configurations,
                actual: self.configs.len(),
            });
        }

        for cfg in self.configs {
            self.check_string(cfg.descriptor.configuration_s)?;

            if usize::from(cfg.descriptor.num_interfaces) != cfg.interfaces.len() {
                return Err(DescriptorError::InterfaceCountMismatch {
                    config: cfg.descriptor.configuration_value,
                    declared: cfg.descriptor.num_interfaces,
                    actual: cfg.interfaces.len(),
                });
            }

            for itf in cfg.interfaces {
                self.check_string(itf.descriptor.interface_s)?;

                if usize::from(itf.descriptor.num_endpoints) != itf.endpoints.len() {
                    return Err(DescriptorError::EndpointCountMismatch {
                        interface: itf.descriptor.interface_number,
                        declared: itf.descriptor.num_endpoints,
                        actual: itf.endpoints.len(),
                    });
                }
            }

            let actual = cfg.serialized_len() as u16;
            if cfg.descriptor.total_length.get() != actual {
                return Err(DescriptorError::TotalLengthMismatch {
                    config: cfg.descriptor.configuration_value,
                    declared: cfg.descriptor.total_length.get(),
                    actual,
                });
            }
        }

        Ok(())
    }

    /// Looks up the ASCII string behind a 1-based descriptor index.
    pub fn string(&self, index: u8) -> Option<&'a str> {
        if index == 0 {
            None
        } else {
            self.strings.get(usize::from(index) - 1).copied()
        }
    }

    // Valid references are 0 ("no string") or 1..=len.
    fn check_string(&self, index: u8) -> Result<(), DescriptorError> {
        if index == 0 || usize::from(index) <= self.strings.len() {
            Ok(())
        } else {
            Err(DescriptorError::StringIndexOutOfRange {
                index,
                count: self.strings.len(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(num_configurations: u8) -> UsbDeviceDescriptor {
        UsbDeviceDescriptor {
            length: core::mem::size_of::<UsbDeviceDescriptor>() as u8,
            descriptor_type: UsbDescType::Device,
            bcd_usb: U16::from_bytes(u16::to_le_bytes(0x0200)),
            device_class: 0,
            device_subclass: 0,
            device_protocol: 0,
            max_packet_size0: 64,
            vendor: U16::from_bytes(u16::to_le_bytes(0x04b4)),
            product: U16::from_bytes(u16::to_le_bytes(0x8613)),
            bcd_device: U16::from_bytes(u16::to_le_bytes(0)),
            manufacturer_s: 1,
            product_s: 2,
            serial_s: 0,
            num_configurations,
        }
    }

    fn config(num_interfaces: u8, total_length: u16) -> UsbConfigurationDescriptor {
        UsbConfigurationDescriptor {
            length: core::mem::size_of::<UsbConfigurationDescriptor>() as u8,
            descriptor_type: UsbDescType::Config,
            total_length: U16::from_bytes(u16::to_le_bytes(total_length)),
            num_interfaces,
            configuration_value: 1,
            configuration_s: 0,
            attributes: 0x80,
            max_power: 50,
        }
    }

    const STRINGS: [&str; 2] = ["Maker", "Gadget"];

    #[test]
    fn consistent_set_validates() {
        let set = DescriptorSet {
            device: &device(1),
            configs: &[Configuration {
                descriptor: config(0, 9),
                interfaces: &[],
            }],
            strings: &STRINGS,
        };
        assert_eq!(set.validate(), Ok(()));
    }

    #[test]
    fn string_index_may_equal_table_length() {
        // product_s is 2 and the table has exactly two entries; with 1-based
        // indexing that's the last valid reference, not an overflow.
        let set = DescriptorSet {
            device: &device(1),
            configs: &[Configuration {
                descriptor: config(0, 9),
                interfaces: &[],
            }],
            strings: &STRINGS,
        };
        assert_eq!(set.validate(), Ok(()));
        assert_eq!(set.string(2), Some("Gadget"));
        assert_eq!(set.string(0), None);
        assert_eq!(set.string(3), None);
    }

    #[test]
    fn dangling_string_index_is_rejected() {
        let mut dev = device(1);
        dev.serial_s = 3;
        let set = DescriptorSet {
            device: &dev,
            configs: &[Configuration {
                descriptor: config(0, 9),
                interfaces: &[],
            }],
            strings: &STRINGS,
        };
        assert_eq!(
            set.validate(),
            Err(DescriptorError::StringIndexOutOfRange { index: 3, count: 2 })
        );
    }

    #[test]
    fn interface_count_mismatch_is_rejected() {
        // Claiming one interface while appending none: the shape of the bug
        // observed in the original sample firmware.
        let set = DescriptorSet {
            device: &device(1),
            configs: &[Configuration {
                descriptor: config(1, 9),
                interfaces: &[],
            }],
            strings: &STRINGS,
        };
        assert_eq!(
            set.validate(),
            Err(DescriptorError::InterfaceCountMismatch {
                config: 1,
                declared: 1,
                actual: 0,
            })
        );
    }

    #[test]
    fn config_count_mismatch_is_rejected() {
        let set = DescriptorSet {
            device: &device(2),
            configs: &[Configuration {
                descriptor: config(0, 9),
                interfaces: &[],
            }],
            strings: &STRINGS,
        };
        assert_eq!(
            set.validate(),
            Err(DescriptorError::ConfigCountMismatch { declared: 2, actual: 1 })
        );
    }

    #[test]
    fn total_length_covers_sub_descriptors() {
        let endpoints = [UsbEndpointDescriptor {
            length: core::mem::size_of::<UsbEndpointDescriptor>() as u8,
            descriptor_type: UsbDescType::Endpoint,
            endpoint_address: UsbDir::In.endpoint(2),
            attributes: 2, // bulk
            max_packet_size: U16::from_bytes(u16::to_le_bytes(64)),
            interval: 0,
        }];
        let interfaces = [Interface {
            descriptor: UsbInterfaceDescriptor {
                length: core::mem::size_of::<UsbInterfaceDescriptor>() as u8,
                descriptor_type: UsbDescType::Interface,
                interface_number: 0,
                alternate_setting: 0,
                num_endpoints: 1,
                interface_class: 0xff,
                interface_subclass: 0,
                interface_protocol: 0,
                interface_s: 0,
            },
            endpoints: &endpoints,
        }];

        // 9 (config) + 9 (interface) + 7 (endpoint).
        let good = DescriptorSet {
            device: &device(1),
            configs: &[Configuration {
                descriptor: config(1, 25),
                interfaces: &interfaces,
            }],
            strings: &STRINGS,
        };
        assert_eq!(good.validate(), Ok(()));

        let bad = DescriptorSet {
            device: &device(1),
            configs: &[Configuration {
                descriptor: config(1, 9),
                interfaces: &interfaces,
            }],
            strings: &STRINGS,
        };
        assert_eq!(
            bad.validate(),
            Err(DescriptorError::TotalLengthMismatch {
                config: 1,
                declared: 9,
                actual: 25,
            })
        );
    }

    #[test]
    fn endpoint_count_mismatch_is_rejected() {
        let interfaces = [Interface {
            descriptor: UsbInterfaceDescriptor {
                length: core::mem::size_of::<UsbInterfaceDescriptor>() as u8,
                descriptor_type: UsbDescType::Interface,
                interface_number: 0,
                alternate_setting: 0,
                num_endpoints: 2,
                interface_class: 0xff,
                interface_subclass: 0,
                interface_protocol: 0,
                interface_s: 0,
            },
            endpoints: &[],
        }];
        let set = DescriptorSet {
            device: &device(1),
            configs: &[Configuration {
                descriptor: config(1, 18),
                interfaces: &interfaces,
            }],
            strings: &STRINGS,
        };
        assert_eq!(
            set.validate(),
            Err(DescriptorError::EndpointCountMismatch {
                interface: 0,
                declared: 2,
                actual: 0,
            })
        );
    }

    #[test]
    fn setup_packet_decodes_from_raw_bytes() {
        // GET_DESCRIPTOR(Device), wLength = 64: the first request every host
        // sends during enumeration.
        let raw = [0x80, 0x06, 0x00, 0x01, 0x00, 0x00, 0x40, 0x00];
        let setup = UsbSetupPacket::parse(&raw).unwrap();
        assert_eq!(setup.direction(), UsbDir::In);
        assert_eq!(setup.standard_request(), Some(UsbSetupRequest::GetDescriptor));
        assert_eq!(setup.value.get(), 0x0100);
        assert_eq!(setup.index.get(), 0);
        assert_eq!(setup.length.get(), 64);
    }

    #[test]
    fn setup_packet_parse_rejects_wrong_length() {
        assert!(UsbSetupPacket::parse(&[0u8; 7]).is_none());
        assert!(UsbSetupPacket::parse(&[0u8; 9]).is_none());
    }

    #[test]
    fn vendor_request_is_not_standard() {
        let raw = [0x40, 0x42, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00];
        let setup = UsbSetupPacket::parse(&raw).unwrap();
        assert_eq!(setup.direction(), UsbDir::Out);
        assert_eq!(setup.standard_request(), None);
    }
}
