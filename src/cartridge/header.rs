use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::error::GbError;

/// Minimum size of a ROM image: large enough to contain the header
/// at 0x0100-0x014F.
pub const MIN_ROM_SIZE: usize = 0x0150;

/// Cartridge Type (header byte 0x0147).
/// https://gbdev.io/pandocs/The_Cartridge_Header.html#0147--cartridge-type
#[derive(Debug, Clone, Copy, Eq, PartialEq, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum CartridgeType {
    RomOnly = 0x00,
    Mbc1 = 0x01,
    Mbc1Ram = 0x02,
    Mbc1RamBattery = 0x03,
    Mbc2 = 0x05,
    Mbc2Battery = 0x06,
    RomRam = 0x08,
    RomRamBattery = 0x09,
    Mmm01 = 0x0B,
    Mmm01Ram = 0x0C,
    Mmm01RamBattery = 0x0D,
    Mbc3TimerBattery = 0x0F,
    Mbc3TimerRamBattery = 0x10,
    Mbc3 = 0x11,
    Mbc3Ram = 0x12,
    Mbc3RamBattery = 0x13,
    Mbc5 = 0x19,
    Mbc5Ram = 0x1A,
    Mbc5RamBattery = 0x1B,
    Mbc5Rumble = 0x1C,
    Mbc5RumbleRam = 0x1D,
    Mbc5RumbleRamBattery = 0x1E,
    Mbc6 = 0x20,
    Mbc7SensorRumbleRamBattery = 0x22,
    PocketCamera = 0xFC,
    BandaiTama5 = 0xFD,
    HuC3 = 0xFE,
    HuC1RamBattery = 0xFF,
}

impl CartridgeType {
    fn has_battery(self) -> bool {
        matches!(
            self,
            CartridgeType::Mbc1RamBattery
                | CartridgeType::Mbc2Battery
                | CartridgeType::RomRamBattery
                | CartridgeType::Mmm01RamBattery
                | CartridgeType::Mbc3TimerBattery
                | CartridgeType::Mbc3TimerRamBattery
                | CartridgeType::Mbc3RamBattery
                | CartridgeType::Mbc5RamBattery
                | CartridgeType::Mbc5RumbleRamBattery
                | CartridgeType::Mbc7SensorRumbleRamBattery
                | CartridgeType::HuC1RamBattery
        )
    }
}

/// Mapper family actually emulated. MBC1 is faithful; everything else
/// recognized degrades to "always bank 1, no RAM" (spec §4.2).
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum MapperFamily {
    RomOnly,
    Mbc1,
    Degraded,
}

impl From<CartridgeType> for MapperFamily {
    fn from(ty: CartridgeType) -> Self {
        match ty {
            CartridgeType::RomOnly | CartridgeType::RomRam | CartridgeType::RomRamBattery => {
                MapperFamily::RomOnly
            }
            CartridgeType::Mbc1 | CartridgeType::Mbc1Ram | CartridgeType::Mbc1RamBattery => {
                MapperFamily::Mbc1
            }
            _ => MapperFamily::Degraded,
        }
    }
}

/// Parsed fields from the cartridge header (0x0100-0x014F).
#[derive(Debug, Clone)]
pub struct CartridgeHeader {
    pub title: String,
    pub cartridge_type_byte: u8,
    pub mapper: MapperFamily,
    pub rom_banks: usize,
    pub ram_banks: usize,
    pub has_battery: bool,
}

impl CartridgeHeader {
    /// Parses the header out of a full ROM image. Fails if the buffer
    /// is too short to contain one, or if the declared ROM size
    /// disagrees with the buffer length.
    pub fn parse(rom: &[u8]) -> Result<Self, GbError> {
        if rom.len() < MIN_ROM_SIZE {
            return Err(GbError::InvalidRom(format!(
                "ROM is {} bytes, need at least {MIN_ROM_SIZE}",
                rom.len()
            )));
        }

        let title_bytes = &rom[0x0134..0x0144];
        let title_end = title_bytes
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(title_bytes.len());
        let title = String::from_utf8_lossy(&title_bytes[..title_end])
            .trim()
            .to_string();

        let type_byte = rom[0x0147];
        let (mapper, has_battery) = match CartridgeType::try_from(type_byte) {
            Ok(ty) => (MapperFamily::from(ty), ty.has_battery()),
            Err(_) => {
                log::warn!("unrecognized cartridge type byte {type_byte:#04x}, degrading to ROM_ONLY semantics");
                (MapperFamily::Degraded, false)
            }
        };

        let rom_banks = 2usize << rom[0x0148];
        let declared_rom_size = rom_banks * 0x4000;
        if rom.len() < declared_rom_size {
            return Err(GbError::InvalidRom(format!(
                "header declares {declared_rom_size} bytes of ROM ({rom_banks} banks), buffer has {}",
                rom.len()
            )));
        }

        let ram_banks = match rom[0x0149] {
            0x00 => 0,
            0x01 => 1, // 2 KiB: a single sub-8KiB bank
            0x02 => 1,
            0x03 => 4,
            0x04 => 16,
            0x05 => 8,
            _ => 0,
        };

        Ok(Self {
            title,
            cartridge_type_byte: type_byte,
            mapper,
            rom_banks,
            ram_banks,
            has_battery,
        })
    }
}
