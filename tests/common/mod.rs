#![allow(dead_code)]

use wasmzx::{Cpu, CpuBus, Registers};

pub const NOP_CYCLES: u32 = 4;

/// What `ScriptCpu` does for one instruction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Op {
    Nop,
    Read(u16),
    Write(u16, u8),
    In(u16),
    Out(u16, u8),
    Halt,
}

/// Stand-in Z80 that runs a fixed script, one `Op` per instruction at 4
/// T-states each, then NOPs (or repeats the script when `looping`).
#[derive(Debug, Default)]
pub struct ScriptCpu {
    pub script: Vec<Op>,
    pub looping: bool,
    pub position: usize,
    pub registers: Registers,
    pub halted: bool,
    pub instructions: usize,
    pub interrupts: usize,
    pub inputs: Vec<u8>,
    pub reads: Vec<u8>,
}

impl ScriptCpu {
    pub fn new(script: Vec<Op>) -> Self {
        Self {
            script,
            ..Default::default()
        }
    }

    pub fn looping(script: Vec<Op>) -> Self {
        Self {
            script,
            looping: true,
            ..Default::default()
        }
    }

    fn next_op(&mut self) -> Op {
        if self.looping && !self.script.is_empty() {
            let op = self.script[self.position % self.script.len()];
            self.position += 1;
            return op;
        }
        let op = self.script.get(self.position).copied().unwrap_or(Op::Nop);
        self.position += 1;
        op
    }
}

impl Cpu for ScriptCpu {
    fn reset(&mut self) {
        self.registers = Registers::default();
        self.position = 0;
        self.halted = false;
    }

    fn run_instruction(&mut self, bus: &mut dyn CpuBus) -> u32 {
        self.instructions += 1;
        if self.halted {
            return NOP_CYCLES;
        }

        match self.next_op() {
            Op::Nop => {}
            Op::Read(address) => {
                let value = bus.mem_read(address);
                self.reads.push(value);
            }
            Op::Write(address, value) => bus.mem_write(address, value),
            Op::In(port) => {
                let value = bus.io_read(port);
                self.inputs.push(value);
            }
            Op::Out(port, value) => bus.io_write(port, value),
            Op::Halt => self.halted = true,
        }
        NOP_CYCLES
    }

    fn is_halted(&self) -> bool {
        self.halted
    }

    fn interrupt(&mut self, _nmi: bool, _data: u8) {
        self.interrupts += 1;
        self.halted = false;
    }

    fn state(&self) -> Registers {
        self.registers
    }

    fn set_state(&mut self, registers: &Registers) {
        self.registers = *registers;
    }
}

pub fn rom() -> Vec<u8> {
    vec![0; 0x4000]
}
