use crate::{
    config::Config,
    cpu::CpuBus,
    memory::Memory,
    sound::BeeperHandle,
    ula::Ula,
};

/// Everything the CPU can see: the 64K address space and the ULA ports.
///
/// Contended accesses are charged to a per-instruction counter that the
/// machine folds into its cycle count once the instruction retires. Speaker
/// writes are timestamped with the instruction's start time plus whatever
/// contention it has accrued so far.
#[derive(Debug, Clone)]
pub struct Bus {
    pub memory: Memory,
    pub ula: Ula,

    contention: u32,
    instruction_start_ms: f64,
    cycles_per_ms: f64,
}

impl Bus {
    pub fn new(config: &Config, beeper: BeeperHandle) -> Self {
        Self {
            memory: Memory::new(config.contention_penalty),
            ula: Ula::new(beeper, config.initial_border),
            contention: 0,
            instruction_start_ms: 0.0,
            cycles_per_ms: config.cpu_frequency_khz as f64,
        }
    }

    /// Marks the start of an instruction executing at emulated time `now_ms`.
    pub fn begin_instruction(&mut self, now_ms: f64) {
        self.instruction_start_ms = now_ms;
        self.contention = 0;
    }

    /// Contention cycles accrued since `begin_instruction`, resetting the count.
    pub fn take_contention(&mut self) -> u32 {
        std::mem::take(&mut self.contention)
    }

    pub fn now_ms(&self) -> f64 {
        self.instruction_start_ms + self.contention as f64 / self.cycles_per_ms
    }

    pub fn screen(&self) -> &[u8] {
        self.memory.screen()
    }

    pub fn border(&self) -> u8 {
        self.ula.border()
    }
}

impl CpuBus for Bus {
    fn mem_read(&mut self, address: u16) -> u8 {
        self.contention += self.memory.contention(address);
        self.memory.read_byte(address)
    }

    fn mem_write(&mut self, address: u16, value: u8) {
        self.contention += self.memory.contention(address);
        self.memory.write_byte(address, value);
    }

    fn io_read(&mut self, port: u16) -> u8 {
        self.ula.read(port)
    }

    fn io_write(&mut self, port: u16, value: u8) {
        let now = self.now_ms();
        self.ula.write(port, value, now);
    }
}
