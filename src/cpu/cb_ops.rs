//! CB-prefixed opcode dispatch: rotates/shifts, BIT/RES/SET on r8/(HL).

use super::alu;
use super::registers::{Flags, Reg16, Reg8};
use super::Cpu;
use crate::mmu::Bus;

const R8: [Reg8; 8] = [
    Reg8::B,
    Reg8::C,
    Reg8::D,
    Reg8::E,
    Reg8::H,
    Reg8::L,
    Reg8::A, // placeholder, index 6 is (HL) and handled specially
    Reg8::A,
];

fn get_r8(cpu: &Cpu, bus: &Bus, idx: u8) -> u8 {
    if idx == 6 {
        bus.read(cpu.reg.read16(Reg16::HL))
    } else {
        cpu.reg.read8(R8[idx as usize])
    }
}

fn set_r8(cpu: &mut Cpu, bus: &mut Bus, idx: u8, value: u8) {
    if idx == 6 {
        bus.write(cpu.reg.read16(Reg16::HL), value);
    } else {
        cpu.reg.write8(R8[idx as usize], value);
    }
}

/// Executes one CB-prefixed opcode, returning the cycles it consumed.
pub(super) fn execute(cpu: &mut Cpu, bus: &mut Bus, opcode: u8) -> u32 {
    let idx = opcode & 0x07;
    let group = (opcode >> 3) & 0x07;
    let is_hl = idx == 6;

    match opcode {
        0x00..=0x3F => {
            let value = get_r8(cpu, bus, idx);
            let mut flags = cpu.reg.flags();
            let carry_in = flags.contains(Flags::CARRY);
            let result = match group {
                0 => alu::rlc(value, &mut flags),
                1 => alu::rrc(value, &mut flags),
                2 => alu::rl(value, carry_in, &mut flags),
                3 => alu::rr(value, carry_in, &mut flags),
                4 => alu::sla(value, &mut flags),
                5 => alu::sra(value, &mut flags),
                6 => alu::swap(value, &mut flags),
                7 => alu::srl(value, &mut flags),
                _ => unreachable!(),
            };
            set_r8(cpu, bus, idx, result);
            cpu.reg.set_flags(flags);
            if is_hl {
                16
            } else {
                8
            }
        }

        0x40..=0x7F => {
            let value = get_r8(cpu, bus, idx);
            let mut flags = cpu.reg.flags();
            alu::bit(value, group, &mut flags);
            cpu.reg.set_flags(flags);
            if is_hl {
                12
            } else {
                8
            }
        }

        0x80..=0xBF => {
            let value = get_r8(cpu, bus, idx);
            let result = alu::res(value, group);
            set_r8(cpu, bus, idx, result);
            if is_hl {
                16
            } else {
                8
            }
        }

        0xC0..=0xFF => {
            let value = get_r8(cpu, bus, idx);
            let result = alu::set(value, group);
            set_r8(cpu, bus, idx, result);
            if is_hl {
                16
            } else {
                8
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boot::BootRom;
    use crate::cartridge::Cartridge;

    fn bus_with_rom(bytes: &[u8]) -> Bus {
        let mut rom = vec![0u8; 0x8000];
        rom[0x0100..0x0100 + bytes.len()].copy_from_slice(bytes);
        Bus::new(Cartridge::new(rom).unwrap(), BootRom::disabled())
    }

    #[test]
    fn swap_on_hl_memory_operand_costs_16_cycles() {
        // LD HL,0xC000; SWAP (HL)
        let mut bus = bus_with_rom(&[0x21, 0x00, 0xC0, 0xCB, 0x36]);
        bus.write(0xC000, 0xA5);
        let mut cpu = Cpu::new();
        cpu.set_post_boot_state();
        cpu.step(&mut bus); // LD HL,d16
        let cycles = cpu.step(&mut bus); // SWAP (HL)
        assert_eq!(cycles, 16);
        assert_eq!(bus.read(0xC000), 0x5A);
    }

    #[test]
    fn res_and_set_do_not_touch_flags() {
        // RES 0,B ; SET 0,B
        let mut bus = bus_with_rom(&[0xCB, 0x80, 0xCB, 0xC0]);
        let mut cpu = Cpu::new();
        cpu.set_post_boot_state();
        cpu.reg.write8(Reg8::B, 0x01);
        cpu.reg.set_flags(Flags::CARRY | Flags::ZERO);
        cpu.step(&mut bus);
        assert_eq!(cpu.reg.read8(Reg8::B), 0x00);
        assert_eq!(cpu.reg.flags(), Flags::CARRY | Flags::ZERO);
        cpu.step(&mut bus);
        assert_eq!(cpu.reg.read8(Reg8::B), 0x01);
        assert_eq!(cpu.reg.flags(), Flags::CARRY | Flags::ZERO);
    }
}
