//! The DMG-01 had a Sharp LR35902 CPU (speculated to be a SM83 core),
//! a hybrid of the Z80 and the 8080.
//! https://gbdev.io/gb-opcodes/optables/errata

mod alu;
mod cb_ops;
pub mod interrupts;
mod ops;
pub mod registers;

use crate::mmu::Bus;
use registers::{Reg16, Registers};

pub struct Cpu {
    reg: Registers,
    cycles: u32,
    ime: bool,
    /// Countdown latch for EI's one-instruction-delayed enable: 2 right
    /// after EI executes, 1 one step later (still disabled), 0 means
    /// IME flips true at the top of the step that finds it at 1.
    ime_delay: u8,
    halted: bool,
    stopped: bool,
}

impl Cpu {
    pub fn new() -> Self {
        Self {
            reg: Registers::new(),
            cycles: 0,
            ime: false,
            ime_delay: 0,
            halted: false,
            stopped: false,
        }
    }

    /// Sets the DMG post-boot register state (spec §3), used when the
    /// boot ROM overlay is disabled at reset.
    pub fn set_post_boot_state(&mut self) {
        self.reg.write16(Reg16::AF, 0x01B0);
        self.reg.write16(Reg16::BC, 0x0013);
        self.reg.write16(Reg16::DE, 0x00D8);
        self.reg.write16(Reg16::HL, 0x014D);
        self.reg.set_sp(0xFFFE);
        self.reg.set_pc(0x0100);
        self.ime = false;
        self.ime_delay = 0;
        self.halted = false;
        self.stopped = false;
    }

    /// Boot ROM overlay enabled: PC starts at 0x0000, everything else
    /// stays zeroed until the boot ROM code itself initializes it.
    pub fn set_boot_entry_state(&mut self) {
        self.reg = Registers::new();
        self.reg.set_pc(0x0000);
        self.ime = false;
        self.ime_delay = 0;
        self.halted = false;
        self.stopped = false;
    }

    pub fn registers(&self) -> &Registers {
        &self.reg
    }

    pub fn cycles(&self) -> u32 {
        self.cycles
    }

    pub fn ime(&self) -> bool {
        self.ime
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// Executes one instruction (servicing a pending interrupt first,
    /// if any), returning the number of cycles it consumed.
    pub fn step(&mut self, bus: &mut Bus) -> u32 {
        self.tick_ime_latch();

        if let Some(cycles) = self.service_interrupts(bus) {
            self.cycles = self.cycles.wrapping_add(cycles);
            return cycles;
        }

        if self.halted {
            if bus.if_.any_pending(bus.ie()) {
                self.halted = false;
            } else {
                self.cycles = self.cycles.wrapping_add(4);
                return 4;
            }
        }

        if self.stopped {
            if bus.joypad.any_pressed() {
                self.stopped = false;
            } else {
                self.cycles = self.cycles.wrapping_add(4);
                return 4;
            }
        }

        let opcode = self.fetch8(bus);
        let cycles = if opcode == 0xCB {
            let cb_opcode = self.fetch8(bus);
            cb_ops::execute(self, bus, cb_opcode)
        } else {
            ops::execute(self, bus, opcode)
        };

        self.cycles = self.cycles.wrapping_add(cycles);
        cycles
    }

    fn tick_ime_latch(&mut self) {
        if self.ime_delay > 0 {
            self.ime_delay -= 1;
            if self.ime_delay == 0 {
                self.ime = true;
            }
        }
    }

    fn service_interrupts(&mut self, bus: &mut Bus) -> Option<u32> {
        if !self.ime {
            return None;
        }
        let kind = bus.if_.highest_priority_pending(bus.ie())?;

        self.halted = false;
        bus.if_.acknowledge(kind);
        self.ime = false;
        self.push16(bus, self.reg.pc());
        self.reg.set_pc(kind.vector());
        Some(20)
    }

    fn enable_interrupts_after_next_instruction(&mut self) {
        self.ime_delay = 2;
    }

    fn disable_interrupts(&mut self) {
        self.ime = false;
        self.ime_delay = 0;
    }

    fn enter_halt(&mut self) {
        self.halted = true;
    }

    fn enter_stop(&mut self) {
        self.stopped = true;
    }

    fn fetch8(&mut self, bus: &Bus) -> u8 {
        let pc = self.reg.pc();
        let value = bus.read(pc);
        self.reg.set_pc(pc.wrapping_add(1));
        value
    }

    fn fetch16(&mut self, bus: &Bus) -> u16 {
        let lo = self.fetch8(bus);
        let hi = self.fetch8(bus);
        u16::from_le_bytes([lo, hi])
    }

    fn push16(&mut self, bus: &mut Bus, value: u16) {
        let sp = self.reg.sp().wrapping_sub(2);
        self.reg.set_sp(sp);
        bus.write(sp.wrapping_add(1), (value >> 8) as u8);
        bus.write(sp, value as u8);
    }

    fn pop16(&mut self, bus: &Bus) -> u16 {
        let sp = self.reg.sp();
        let lo = bus.read(sp);
        let hi = bus.read(sp.wrapping_add(1));
        self.reg.set_sp(sp.wrapping_add(2));
        u16::from_le_bytes([lo, hi])
    }
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boot::BootRom;
    use crate::cartridge::Cartridge;
    use registers::Reg16;

    fn bus_with_rom(bytes: &[u8]) -> Bus {
        let mut rom = vec![0u8; 0x8000];
        rom[0x0100..0x0100 + bytes.len()].copy_from_slice(bytes);
        Bus::new(Cartridge::new(rom).unwrap(), BootRom::disabled())
    }

    #[test]
    fn xor_a_zeroes_a_and_sets_only_zero_flag() {
        let mut bus = bus_with_rom(&[0xAF]); // XOR A
        let mut cpu = Cpu::new();
        cpu.set_post_boot_state();
        let cycles = cpu.step(&mut bus);

        assert_eq!(cpu.reg.read8(registers::Reg8::A), 0);
        assert_eq!(cpu.reg.flags().bits(), 0x80);
        assert_eq!(cpu.reg.pc(), 0x0101);
        assert_eq!(cycles, 4);
    }

    #[test]
    fn nop_loop_advances_pc_and_cycles_as_expected() {
        // NOP; NOP; NOP; JP 0x0100
        let mut bus = bus_with_rom(&[0x00, 0x00, 0x00, 0xC3, 0x00, 0x01]);
        let mut cpu = Cpu::new();
        cpu.set_post_boot_state();

        let mut total = 0u32;
        for _ in 0..16 {
            total += cpu.step(&mut bus);
        }
        assert_eq!(cpu.reg.pc(), 0x0100);
        assert_eq!(total, (3 * 4 + 16) * 4);
    }

    #[test]
    fn ld_bc_d16_then_bit_7_h() {
        let mut bus = bus_with_rom(&[0x01, 0x34, 0x12, 0xCB, 0x7C]);
        let mut cpu = Cpu::new();
        cpu.set_post_boot_state();

        cpu.step(&mut bus);
        cpu.step(&mut bus);

        assert_eq!(cpu.reg.read16(Reg16::BC), 0x1234);
        assert!(cpu.reg.flag(registers::Flags::ZERO));
        assert!(!cpu.reg.flag(registers::Flags::SUBTRACT));
        assert!(cpu.reg.flag(registers::Flags::HALF_CARRY));
    }

    #[test]
    fn push_then_pop_restores_value_and_sp() {
        let mut bus = bus_with_rom(&[0x00]);
        let mut cpu = Cpu::new();
        cpu.set_post_boot_state();
        let sp_before = cpu.reg.sp();

        cpu.reg.write16(Reg16::BC, 0xBEEF);
        cpu.push16(&mut bus, cpu.reg.read16(Reg16::BC));
        let popped = cpu.pop16(&bus);

        assert_eq!(popped, 0xBEEF);
        assert_eq!(cpu.reg.sp(), sp_before);
    }

    #[test]
    fn ei_takes_effect_after_the_following_instruction() {
        // EI; NOP; NOP
        let mut bus = bus_with_rom(&[0xFB, 0x00, 0x00]);
        let mut cpu = Cpu::new();
        cpu.set_post_boot_state();

        cpu.step(&mut bus); // EI executes, IME not yet true
        assert!(!cpu.ime());
        cpu.step(&mut bus); // instruction following EI: still not true
        assert!(!cpu.ime());
        cpu.step(&mut bus); // now true
        assert!(cpu.ime());
    }
}
