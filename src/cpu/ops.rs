//! Unprefixed opcode dispatch: the primary 256-entry table.
//! https://gbdev.io/gb-opcodes/optables/

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

const R16_GROUP1: [Reg16; 4] = [Reg16::BC, Reg16::DE, Reg16::HL, Reg16::SP];

fn condition_met(cpu: &Cpu, cc: u8) -> bool {
    match cc {
        0 => !cpu.reg.flag(Flags::ZERO),
        1 => cpu.reg.flag(Flags::ZERO),
        2 => !cpu.reg.flag(Flags::CARRY),
        3 => cpu.reg.flag(Flags::CARRY),
        _ => unreachable!(),
    }
}

/// Executes one unprefixed opcode, returning the cycles it consumed.
pub(super) fn execute(cpu: &mut Cpu, bus: &mut Bus, opcode: u8) -> u32 {
    match opcode {
        0x00 => 4, // NOP

        0x01 | 0x11 | 0x21 | 0x31 => {
            let value = cpu.fetch16(bus);
            let reg = R16_GROUP1[(opcode >> 4) as usize];
            cpu.reg.write16(reg, value);
            12
        }

        0x02 => {
            bus.write(cpu.reg.read16(Reg16::BC), cpu.reg.read8(Reg8::A));
            8
        }
        0x12 => {
            bus.write(cpu.reg.read16(Reg16::DE), cpu.reg.read8(Reg8::A));
            8
        }
        0x22 => {
            let hl = cpu.reg.read16(Reg16::HL);
            bus.write(hl, cpu.reg.read8(Reg8::A));
            cpu.reg.write16(Reg16::HL, hl.wrapping_add(1));
            8
        }
        0x32 => {
            let hl = cpu.reg.read16(Reg16::HL);
            bus.write(hl, cpu.reg.read8(Reg8::A));
            cpu.reg.write16(Reg16::HL, hl.wrapping_sub(1));
            8
        }

        0x03 | 0x13 | 0x23 | 0x33 => {
            let reg = R16_GROUP1[(opcode >> 4) as usize];
            let value = cpu.reg.read16(reg).wrapping_add(1);
            cpu.reg.write16(reg, value);
            8
        }
        0x0B | 0x1B | 0x2B | 0x3B => {
            let reg = R16_GROUP1[(opcode >> 4) as usize];
            let value = cpu.reg.read16(reg).wrapping_sub(1);
            cpu.reg.write16(reg, value);
            8
        }

        0x04 | 0x0C | 0x14 | 0x1C | 0x24 | 0x2C | 0x34 | 0x3C => {
            let idx = (opcode >> 3) & 0x07;
            let mut flags = cpu.reg.flags();
            let value = alu::inc8(get_r8(cpu, bus, idx), &mut flags);
            set_r8(cpu, bus, idx, value);
            cpu.reg.set_flags(flags);
            if idx == 6 {
                12
            } else {
                4
            }
        }
        0x05 | 0x0D | 0x15 | 0x1D | 0x25 | 0x2D | 0x35 | 0x3D => {
            let idx = (opcode >> 3) & 0x07;
            let mut flags = cpu.reg.flags();
            let value = alu::dec8(get_r8(cpu, bus, idx), &mut flags);
            set_r8(cpu, bus, idx, value);
            cpu.reg.set_flags(flags);
            if idx == 6 {
                12
            } else {
                4
            }
        }

        0x06 | 0x0E | 0x16 | 0x1E | 0x26 | 0x2E | 0x36 | 0x3E => {
            let idx = (opcode >> 3) & 0x07;
            let value = cpu.fetch8(bus);
            set_r8(cpu, bus, idx, value);
            if idx == 6 {
                12
            } else {
                8
            }
        }

        0x07 => {
            let mut flags = cpu.reg.flags();
            let value = alu::rlc(cpu.reg.read8(Reg8::A), &mut flags);
            cpu.reg.write8(Reg8::A, value);
            flags.set(Flags::ZERO, false);
            cpu.reg.set_flags(flags);
            4
        }
        0x0F => {
            let mut flags = cpu.reg.flags();
            let value = alu::rrc(cpu.reg.read8(Reg8::A), &mut flags);
            cpu.reg.write8(Reg8::A, value);
            flags.set(Flags::ZERO, false);
            cpu.reg.set_flags(flags);
            4
        }
        0x17 => {
            let mut flags = cpu.reg.flags();
            let carry_in = flags.contains(Flags::CARRY);
            let value = alu::rl(cpu.reg.read8(Reg8::A), carry_in, &mut flags);
            cpu.reg.write8(Reg8::A, value);
            flags.set(Flags::ZERO, false);
            cpu.reg.set_flags(flags);
            4
        }
        0x1F => {
            let mut flags = cpu.reg.flags();
            let carry_in = flags.contains(Flags::CARRY);
            let value = alu::rr(cpu.reg.read8(Reg8::A), carry_in, &mut flags);
            cpu.reg.write8(Reg8::A, value);
            flags.set(Flags::ZERO, false);
            cpu.reg.set_flags(flags);
            4
        }

        0x08 => {
            let addr = cpu.fetch16(bus);
            bus.write16(addr, cpu.reg.sp());
            20
        }

        0x09 | 0x19 | 0x29 | 0x39 => {
            let reg = R16_GROUP1[(opcode >> 4) as usize];
            let mut flags = cpu.reg.flags();
            let hl = cpu.reg.read16(Reg16::HL);
            let rhs = cpu.reg.read16(reg);
            let result = alu::add16(hl, rhs, &mut flags);
            cpu.reg.write16(Reg16::HL, result);
            cpu.reg.set_flags(flags);
            8
        }

        0x0A => {
            let value = bus.read(cpu.reg.read16(Reg16::BC));
            cpu.reg.write8(Reg8::A, value);
            8
        }
        0x1A => {
            let value = bus.read(cpu.reg.read16(Reg16::DE));
            cpu.reg.write8(Reg8::A, value);
            8
        }
        0x2A => {
            let hl = cpu.reg.read16(Reg16::HL);
            cpu.reg.write8(Reg8::A, bus.read(hl));
            cpu.reg.write16(Reg16::HL, hl.wrapping_add(1));
            8
        }
        0x3A => {
            let hl = cpu.reg.read16(Reg16::HL);
            cpu.reg.write8(Reg8::A, bus.read(hl));
            cpu.reg.write16(Reg16::HL, hl.wrapping_sub(1));
            8
        }

        0x10 => {
            cpu.fetch8(bus); // the (unused) second STOP byte
            cpu.enter_stop();
            4
        }

        0x18 => {
            let offset = cpu.fetch8(bus) as i8;
            cpu.reg.set_pc(cpu.reg.pc().wrapping_add(offset as i16 as u16));
            12
        }
        0x20 | 0x28 | 0x30 | 0x38 => {
            let cc = (opcode >> 3) & 0x03;
            let offset = cpu.fetch8(bus) as i8;
            if condition_met(cpu, cc) {
                cpu.reg.set_pc(cpu.reg.pc().wrapping_add(offset as i16 as u16));
                12
            } else {
                8
            }
        }

        0x27 => {
            let mut flags = cpu.reg.flags();
            let value = alu::daa(cpu.reg.read8(Reg8::A), &mut flags);
            cpu.reg.write8(Reg8::A, value);
            cpu.reg.set_flags(flags);
            4
        }
        0x2F => {
            let value = !cpu.reg.read8(Reg8::A);
            cpu.reg.write8(Reg8::A, value);
            let mut flags = cpu.reg.flags();
            flags.set(Flags::SUBTRACT, true);
            flags.set(Flags::HALF_CARRY, true);
            cpu.reg.set_flags(flags);
            4
        }
        0x37 => {
            let mut flags = cpu.reg.flags();
            flags.set(Flags::SUBTRACT, false);
            flags.set(Flags::HALF_CARRY, false);
            flags.set(Flags::CARRY, true);
            cpu.reg.set_flags(flags);
            4
        }
        0x3F => {
            let mut flags = cpu.reg.flags();
            let carry = flags.contains(Flags::CARRY);
            flags.set(Flags::SUBTRACT, false);
            flags.set(Flags::HALF_CARRY, false);
            flags.set(Flags::CARRY, !carry);
            cpu.reg.set_flags(flags);
            4
        }

        0x76 => {
            cpu.enter_halt();
            4
        }
        0x40..=0x7F => {
            let dst = (opcode >> 3) & 0x07;
            let src = opcode & 0x07;
            let value = get_r8(cpu, bus, src);
            set_r8(cpu, bus, dst, value);
            if dst == 6 || src == 6 {
                8
            } else {
                4
            }
        }

        0x80..=0xBF => {
            let src = opcode & 0x07;
            let value = get_r8(cpu, bus, src);
            let mut flags = cpu.reg.flags();
            let a = cpu.reg.read8(Reg8::A);
            let result = match (opcode >> 3) & 0x07 {
                0 => alu::add8(a, value, &mut flags),
                1 => alu::adc8(a, value, flags.contains(Flags::CARRY), &mut flags),
                2 => alu::sub8(a, value, &mut flags),
                3 => alu::sbc8(a, value, flags.contains(Flags::CARRY), &mut flags),
                4 => alu::and8(a, value, &mut flags),
                5 => alu::xor8(a, value, &mut flags),
                6 => alu::or8(a, value, &mut flags),
                7 => {
                    alu::cp8(a, value, &mut flags);
                    a
                }
                _ => unreachable!(),
            };
            cpu.reg.write8(Reg8::A, result);
            cpu.reg.set_flags(flags);
            if src == 6 {
                8
            } else {
                4
            }
        }

        0xC6 | 0xCE | 0xD6 | 0xDE | 0xE6 | 0xEE | 0xF6 | 0xFE => {
            let value = cpu.fetch8(bus);
            let mut flags = cpu.reg.flags();
            let a = cpu.reg.read8(Reg8::A);
            let result = match (opcode >> 3) & 0x07 {
                0 => alu::add8(a, value, &mut flags),
                1 => alu::adc8(a, value, flags.contains(Flags::CARRY), &mut flags),
                2 => alu::sub8(a, value, &mut flags),
                3 => alu::sbc8(a, value, flags.contains(Flags::CARRY), &mut flags),
                4 => alu::and8(a, value, &mut flags),
                5 => alu::xor8(a, value, &mut flags),
                6 => alu::or8(a, value, &mut flags),
                7 => {
                    alu::cp8(a, value, &mut flags);
                    a
                }
                _ => unreachable!(),
            };
            cpu.reg.write8(Reg8::A, result);
            cpu.reg.set_flags(flags);
            8
        }

        0xC0 | 0xD0 | 0xC8 | 0xD8 => {
            let cc = (opcode >> 3) & 0x03;
            if condition_met(cpu, cc) {
                let addr = cpu.pop16(bus);
                cpu.reg.set_pc(addr);
                20
            } else {
                8
            }
        }
        0xC9 => {
            let addr = cpu.pop16(bus);
            cpu.reg.set_pc(addr);
            16
        }
        0xD9 => {
            let addr = cpu.pop16(bus);
            cpu.reg.set_pc(addr);
            cpu.ime = true;
            cpu.ime_delay = 0;
            16
        }

        0xC1 | 0xD1 | 0xE1 | 0xF1 => {
            let value = cpu.pop16(bus);
            match (opcode >> 4) & 0x03 {
                0 => cpu.reg.write16(Reg16::BC, value),
                1 => cpu.reg.write16(Reg16::DE, value),
                2 => cpu.reg.write16(Reg16::HL, value),
                3 => cpu.reg.write16(Reg16::AF, value),
                _ => unreachable!(),
            }
            12
        }
        0xC5 | 0xD5 | 0xE5 | 0xF5 => {
            let value = match (opcode >> 4) & 0x03 {
                0 => cpu.reg.read16(Reg16::BC),
                1 => cpu.reg.read16(Reg16::DE),
                2 => cpu.reg.read16(Reg16::HL),
                3 => cpu.reg.read16(Reg16::AF),
                _ => unreachable!(),
            };
            cpu.push16(bus, value);
            16
        }

        0xC2 | 0xD2 | 0xCA | 0xDA => {
            let cc = (opcode >> 3) & 0x03;
            let addr = cpu.fetch16(bus);
            if condition_met(cpu, cc) {
                cpu.reg.set_pc(addr);
                16
            } else {
                12
            }
        }
        0xC3 => {
            let addr = cpu.fetch16(bus);
            cpu.reg.set_pc(addr);
            16
        }
        0xE9 => {
            cpu.reg.set_pc(cpu.reg.read16(Reg16::HL));
            4
        }

        0xC4 | 0xD4 | 0xCC | 0xDC => {
            let cc = (opcode >> 3) & 0x03;
            let addr = cpu.fetch16(bus);
            if condition_met(cpu, cc) {
                cpu.push16(bus, cpu.reg.pc());
                cpu.reg.set_pc(addr);
                24
            } else {
                12
            }
        }
        0xCD => {
            let addr = cpu.fetch16(bus);
            cpu.push16(bus, cpu.reg.pc());
            cpu.reg.set_pc(addr);
            24
        }

        0xC7 | 0xCF | 0xD7 | 0xDF | 0xE7 | 0xEF | 0xF7 | 0xFF => {
            let vector = (opcode & 0x38) as u16;
            cpu.push16(bus, cpu.reg.pc());
            cpu.reg.set_pc(vector);
            16
        }

        0xE0 => {
            let offset = cpu.fetch8(bus);
            bus.write(0xFF00 + offset as u16, cpu.reg.read8(Reg8::A));
            12
        }
        0xF0 => {
            let offset = cpu.fetch8(bus);
            let value = bus.read(0xFF00 + offset as u16);
            cpu.reg.write8(Reg8::A, value);
            12
        }
        0xE2 => {
            let addr = 0xFF00 + cpu.reg.read8(Reg8::C) as u16;
            bus.write(addr, cpu.reg.read8(Reg8::A));
            8
        }
        0xF2 => {
            let addr = 0xFF00 + cpu.reg.read8(Reg8::C) as u16;
            let value = bus.read(addr);
            cpu.reg.write8(Reg8::A, value);
            8
        }
        0xEA => {
            let addr = cpu.fetch16(bus);
            bus.write(addr, cpu.reg.read8(Reg8::A));
            16
        }
        0xFA => {
            let addr = cpu.fetch16(bus);
            let value = bus.read(addr);
            cpu.reg.write8(Reg8::A, value);
            16
        }

        0xE8 => {
            let offset = cpu.fetch8(bus) as i8;
            let mut flags = cpu.reg.flags();
            let result = alu::add_sp_signed8(cpu.reg.sp(), offset, &mut flags);
            cpu.reg.set_sp(result);
            cpu.reg.set_flags(flags);
            16
        }
        0xF8 => {
            let offset = cpu.fetch8(bus) as i8;
            let mut flags = cpu.reg.flags();
            let result = alu::add_sp_signed8(cpu.reg.sp(), offset, &mut flags);
            cpu.reg.write16(Reg16::HL, result);
            cpu.reg.set_flags(flags);
            12
        }
        0xF9 => {
            cpu.reg.set_sp(cpu.reg.read16(Reg16::HL));
            8
        }

        0xF3 => {
            cpu.disable_interrupts();
            4
        }
        0xFB => {
            cpu.enable_interrupts_after_next_instruction();
            4
        }

        // Undefined opcodes: NOP-like stubs, matching real hardware's
        // defined-but-unimplemented encodings (spec 7).
        0xD3 | 0xDB | 0xDD | 0xE3 | 0xE4 | 0xEB | 0xEC | 0xED | 0xF4 | 0xFC | 0xFD => 4,

        // Dispatched by Cpu::step before reaching here.
        0xCB => unreachable!("CB prefix is dispatched separately by Cpu::step"),
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
    fn jr_cc_taken_vs_not_taken_cycle_delta_is_4() {
        // JR NZ,+2 with Z clear (taken) vs Z set (not taken).
        let mut bus = bus_with_rom(&[0x20, 0x02]);
        let mut cpu = Cpu::new();
        cpu.set_post_boot_state();
        cpu.reg.set_flags(Flags::empty());
        let taken = cpu.step(&mut bus);

        let mut bus2 = bus_with_rom(&[0x20, 0x02]);
        let mut cpu2 = Cpu::new();
        cpu2.set_post_boot_state();
        cpu2.reg.set_flags(Flags::ZERO);
        let not_taken = cpu2.step(&mut bus2);

        assert_eq!(taken - not_taken, 4);
    }

    #[test]
    fn call_then_ret_round_trips_pc() {
        // CALL 0x0200; at 0x0200: RET
        let mut rom = vec![0u8; 0x8000];
        rom[0x0100] = 0xCD;
        rom[0x0101] = 0x00;
        rom[0x0102] = 0x02;
        rom[0x0200] = 0xC9;
        let mut bus = Bus::new(Cartridge::new(rom).unwrap(), BootRom::disabled());
        let mut cpu = Cpu::new();
        cpu.set_post_boot_state();
        cpu.step(&mut bus); // CALL
        assert_eq!(cpu.registers().pc(), 0x0200);
        cpu.step(&mut bus); // RET
        assert_eq!(cpu.registers().pc(), 0x0103);
    }

    #[test]
    fn ld_a16_a_then_ld_a_a16_round_trips_through_memory() {
        // LD (0xC100),A ; LD A,(0xC100)
        let mut bus = bus_with_rom(&[0xEA, 0x00, 0xC1, 0x3E, 0x00, 0xFA, 0x00, 0xC1]);
        let mut cpu = Cpu::new();
        cpu.set_post_boot_state();
        cpu.reg.write8(Reg8::A, 0x7A);
        cpu.step(&mut bus); // LD (a16),A
        cpu.step(&mut bus); // LD A,d8 (clobber A)
        cpu.step(&mut bus); // LD A,(a16)
        assert_eq!(cpu.reg.read8(Reg8::A), 0x7A);
    }

    #[test]
    fn undefined_opcode_behaves_as_four_cycle_nop() {
        let mut bus = bus_with_rom(&[0xD3]);
        let mut cpu = Cpu::new();
        cpu.set_post_boot_state();
        let cycles = cpu.step(&mut bus);
        assert_eq!(cycles, 4);
        assert_eq!(cpu.registers().pc(), 0x0101);
    }
}
