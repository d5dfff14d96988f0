// Contract between the emulation core and the Z80 interpreter.
// The interpreter itself lives outside this crate; anything implementing
// `Cpu` can be plugged into a `Machine`.

use std::fmt;

/// Memory and port access lent to the CPU while it executes an instruction.
pub trait CpuBus {
    fn mem_read(&mut self, address: u16) -> u8;
    fn mem_write(&mut self, address: u16, value: u8);
    fn io_read(&mut self, port: u16) -> u8;
    fn io_write(&mut self, port: u16, value: u8);
}

pub trait Cpu {
    fn reset(&mut self);

    /// Executes one instruction against `bus` and returns the T-states it took.
    fn run_instruction(&mut self, bus: &mut dyn CpuBus) -> u32;

    fn is_halted(&self) -> bool;

    /// Raises an interrupt. `data` is the byte placed on the data bus (IM 2).
    fn interrupt(&mut self, nmi: bool, data: u8);

    fn state(&self) -> Registers;

    fn set_state(&mut self, registers: &Registers);
}

impl<T: Cpu + ?Sized> Cpu for Box<T> {
    fn reset(&mut self) {
        (**self).reset();
    }

    fn run_instruction(&mut self, bus: &mut dyn CpuBus) -> u32 {
        (**self).run_instruction(bus)
    }

    fn is_halted(&self) -> bool {
        (**self).is_halted()
    }

    fn interrupt(&mut self, nmi: bool, data: u8) {
        (**self).interrupt(nmi, data);
    }

    fn state(&self) -> Registers {
        (**self).state()
    }

    fn set_state(&mut self, registers: &Registers) {
        (**self).set_state(registers);
    }
}

/// Full Z80 register file as exchanged through `Cpu::state`/`Cpu::set_state`.
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct Registers {
    pub a: u8,
    pub f: u8,
    pub b: u8,
    pub c: u8,
    pub d: u8,
    pub e: u8,
    pub h: u8,
    pub l: u8,

    // alternate set
    pub a_alt: u8,
    pub f_alt: u8,
    pub b_alt: u8,
    pub c_alt: u8,
    pub d_alt: u8,
    pub e_alt: u8,
    pub h_alt: u8,
    pub l_alt: u8,

    pub ix: u16,
    pub iy: u16,
    pub sp: u16,
    pub pc: u16,

    pub i: u8,
    pub r: u8,
    pub iff1: bool,
    pub iff2: bool,
    pub im: u8,
}

impl Registers {
    pub fn bc(&self) -> u16 {
        u16::from_le_bytes([self.c, self.b])
    }

    pub fn de(&self) -> u16 {
        u16::from_le_bytes([self.e, self.d])
    }

    pub fn hl(&self) -> u16 {
        u16::from_le_bytes([self.l, self.h])
    }

    pub fn af(&self) -> u16 {
        u16::from_le_bytes([self.f, self.a])
    }
}

impl fmt::Debug for Registers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registers")
            .field("pc", &format_args!("{:04X}", self.pc))
            .field("sp", &format_args!("{:04X}", self.sp))
            .field("af", &format_args!("{:04X}", self.af()))
            .field("bc", &format_args!("{:04X}", self.bc()))
            .field("de", &format_args!("{:04X}", self.de()))
            .field("hl", &format_args!("{:04X}", self.hl()))
            .field("ix", &format_args!("{:04X}", self.ix))
            .field("iy", &format_args!("{:04X}", self.iy))
            .field("i", &self.i)
            .field("r", &self.r)
            .field("iff1", &self.iff1)
            .field("iff2", &self.iff2)
            .field("im", &self.im)
            .finish()
    }
}
