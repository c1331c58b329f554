//! Cartridge: owned by the Bus, parses the header, holds ROM bytes
//! and optional battery-backed RAM, and implements bank-switching for
//! its detected mapper family.

pub mod header;
pub mod mbc;

use header::{CartridgeHeader, MapperFamily};
use mbc::{Degraded, Mbc, Mbc1, RomOnly};

use crate::error::GbError;

const RAM_BANK_SIZE: usize = 0x2000;

pub struct Cartridge {
    header: CartridgeHeader,
    mbc: Box<dyn Mbc>,
}

impl Cartridge {
    /// Parses the header and constructs the mapper-appropriate backing
    /// store. Fails if the ROM is too short to contain a header.
    pub fn new(rom: Vec<u8>) -> Result<Self, GbError> {
        let header = CartridgeHeader::parse(&rom)?;
        let ram_size = header.ram_banks * RAM_BANK_SIZE;

        let mbc: Box<dyn Mbc> = match header.mapper {
            MapperFamily::RomOnly => Box::new(RomOnly::new(rom, ram_size)),
            MapperFamily::Mbc1 => Box::new(Mbc1::new(rom, ram_size)),
            MapperFamily::Degraded => {
                log::warn!(
                    "cartridge type {:#04x} is not fully emulated, degrading to fixed bank 1",
                    header.cartridge_type_byte
                );
                Box::new(Degraded::new(rom))
            }
        };

        Ok(Self { header, mbc })
    }

    pub fn read(&self, addr: u16) -> u8 {
        self.mbc.read(addr)
    }

    pub fn write(&mut self, addr: u16, value: u8) {
        self.mbc.write(addr, value);
    }

    pub fn title(&self) -> &str {
        &self.header.title
    }

    pub fn mapper(&self) -> MapperFamily {
        self.header.mapper
    }

    pub fn rom_banks(&self) -> usize {
        self.header.rom_banks
    }

    pub fn ram_banks(&self) -> usize {
        self.header.ram_banks
    }

    pub fn has_battery(&self) -> bool {
        self.header.has_battery
    }

    /// Exports battery-backed RAM contents for host-side persistence.
    /// Empty if the cartridge has no battery-backed RAM.
    pub fn export_ram(&self) -> &[u8] {
        if self.header.has_battery {
            self.mbc.ram()
        } else {
            &[]
        }
    }

    /// Restores previously exported battery-backed RAM contents.
    pub fn import_ram(&mut self, data: &[u8]) {
        if self.header.has_battery {
            self.mbc.load_ram(data);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_rom(type_byte: u8, rom_size_byte: u8, ram_size_byte: u8) -> Vec<u8> {
        let banks = 2usize << rom_size_byte;
        let mut rom = vec![0u8; banks * 0x4000];
        rom[0x0147] = type_byte;
        rom[0x0148] = rom_size_byte;
        rom[0x0149] = ram_size_byte;
        rom
    }

    #[test]
    fn rejects_short_rom() {
        let rom = vec![0u8; 0x100];
        assert!(Cartridge::new(rom).is_err());
    }

    #[test]
    fn rom_only_ignores_control_writes() {
        let rom = test_rom(0x00, 0x01, 0x00);
        let mut cart = Cartridge::new(rom).unwrap();
        cart.write(0x2000, 0xFF);
        assert_eq!(cart.read(0x4000), 0x00);
    }

    #[test]
    fn unknown_type_degrades_instead_of_erroring() {
        let rom = test_rom(0x7F, 0x01, 0x00);
        let cart = Cartridge::new(rom).unwrap();
        assert_eq!(cart.mapper(), MapperFamily::Degraded);
    }
}
