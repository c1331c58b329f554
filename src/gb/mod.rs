//! The Game Boy system aggregate: owns CPU, PPU, and Bus as plain
//! fields (spec §9 — no hidden globals, no `Rc<RefCell<_>>` sharing)
//! and exposes the external core API (spec §6).

use log::info;

use crate::boot::BootRom;
use crate::cartridge::Cartridge;
use crate::cpu::Cpu;
use crate::error::GbError;
use crate::joypad::Button;
use crate::mmu::Bus;
use crate::ppu::Ppu;

/// Cycles in one full frame: 154 scanlines x 456 cycles/line.
pub const CYCLES_PER_FRAME: u32 = 70_224;

pub struct GameBoy {
    cpu: Cpu,
    bus: Bus,
    ppu: Ppu,
    boot_rom_image: Option<[u8; crate::boot::BOOT_ROM_SIZE]>,
}

impl GameBoy {
    /// Powers on with no cartridge inserted (a 32 KiB blank ROM_ONLY
    /// stand-in) and, optionally, a boot ROM image to overlay.
    pub fn power_on(boot_rom_image: Option<[u8; crate::boot::BOOT_ROM_SIZE]>) -> Self {
        let blank = vec![0u8; 0x8000];
        let cartridge = Cartridge::new(blank).expect("32 KiB blank ROM always parses");
        let boot = Self::make_boot_rom(boot_rom_image);
        let mut cpu = Cpu::new();
        let bus = Bus::new(cartridge, boot);
        if !bus.boot.is_enabled() {
            cpu.set_post_boot_state();
        } else {
            cpu.set_boot_entry_state();
        }
        Self {
            cpu,
            bus,
            ppu: Ppu::new(),
            boot_rom_image,
        }
    }

    fn make_boot_rom(image: Option<[u8; crate::boot::BOOT_ROM_SIZE]>) -> BootRom {
        match image {
            Some(data) => BootRom::with_image(data),
            None => BootRom::disabled(),
        }
    }

    /// Replaces the cartridge and performs a full reset (spec §6).
    pub fn load_rom(&mut self, bytes: Vec<u8>) -> Result<(), GbError> {
        let cartridge = Cartridge::new(bytes)?;
        info!(
            "loaded cartridge \"{}\" ({:?}, {} ROM bank(s), {} RAM bank(s))",
            cartridge.title(),
            cartridge.mapper(),
            cartridge.rom_banks(),
            cartridge.ram_banks(),
        );
        self.bus.cartridge = cartridge;
        self.reset();
        Ok(())
    }

    /// Re-initializes CPU, PPU, and Bus register state; restores the
    /// boot-ROM overlay if one was supplied at power-on.
    pub fn reset(&mut self) {
        self.bus.boot = Self::make_boot_rom(self.boot_rom_image);
        self.ppu = Ppu::new();
        if self.bus.boot.is_enabled() {
            self.cpu.set_boot_entry_state();
        } else {
            self.cpu.set_post_boot_state();
        }
    }

    /// Advances the CPU by one instruction (servicing any pending
    /// interrupt first) and steps the PPU by the same cycle delta.
    pub fn step_instruction(&mut self) -> u32 {
        let cycles = self.cpu.step(&mut self.bus);
        self.bus.step(cycles);
        self.ppu.step(&mut self.bus, cycles);
        cycles
    }

    /// Runs until at least one frame's worth of cycles has elapsed.
    pub fn run_frame(&mut self) {
        let mut elapsed = 0u32;
        while elapsed < CYCLES_PER_FRAME {
            elapsed += self.step_instruction();
        }
    }

    pub fn frame_buffer(&self) -> &[u8] {
        self.ppu.frame_buffer()
    }

    pub fn set_button(&mut self, button: Button, pressed: bool) {
        self.bus.joypad.set_button(button, pressed);
    }

    /// Battery-backed RAM contents, for host-side persistence. Empty
    /// if the cartridge has no battery.
    pub fn export_ram(&self) -> &[u8] {
        self.bus.cartridge.export_ram()
    }

    pub fn import_ram(&mut self, data: &[u8]) {
        self.bus.cartridge.import_ram(data);
    }

    pub fn cartridge_title(&self) -> &str {
        self.bus.cartridge.title()
    }
}

impl Default for GameBoy {
    fn default() -> Self {
        Self::power_on(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_with_no_rom_loaded_matches_dmg_post_boot_state() {
        let gb = GameBoy::power_on(None);
        let reg = gb.cpu.registers();
        assert_eq!(reg.read16(crate::cpu::registers::Reg16::AF), 0x01B0);
        assert_eq!(reg.read16(crate::cpu::registers::Reg16::BC), 0x0013);
        assert_eq!(reg.read16(crate::cpu::registers::Reg16::DE), 0x00D8);
        assert_eq!(reg.read16(crate::cpu::registers::Reg16::HL), 0x014D);
        assert_eq!(reg.sp(), 0xFFFE);
        assert_eq!(reg.pc(), 0x0100);
    }

    #[test]
    fn run_frame_consumes_at_least_one_frames_worth_of_cycles() {
        let mut rom = vec![0u8; 0x8000];
        rom[0x0100] = 0x00; // NOP
        rom[0x0101] = 0xC3; // JP 0x0100
        rom[0x0102] = 0x00;
        rom[0x0103] = 0x01;

        let mut gb = GameBoy::power_on(None);
        gb.load_rom(rom).unwrap();
        gb.run_frame();
        assert!(gb.cpu.cycles() >= CYCLES_PER_FRAME);
    }

    #[test]
    fn frame_buffer_bytes_are_always_valid_shades() {
        let mut gb = GameBoy::power_on(None);
        gb.run_frame();
        assert!(gb.frame_buffer().iter().all(|&shade| shade <= 3));
    }
}
