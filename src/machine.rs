use tracing::{debug, info, trace, warn};

use crate::{
    bus::Bus,
    clock::{Clock, ClockEvent},
    config::Config,
    cpu::Cpu,
    error::CoreError,
    memory::{RAM_START, ROM_SIZE},
    renderer::Renderer,
    snapshot::Snapshot,
    sound::{beeper, AudioOutput, BeeperSource},
    utils::hexdump,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MachineState {
    Uninitialized,
    Loading,
    Running,
    Paused,
}

/// A 48K Spectrum around an externally supplied Z80.
pub struct Machine<C: Cpu> {
    pub bus: Bus,
    pub cpu: C,
    pub clock: Clock,
    renderer: Renderer,
    audio: BeeperSource,
    state: MachineState,
    config: Config,
}

impl<C: Cpu> Machine<C> {
    /// Builds a machine from `config`, which is validated first.
    pub fn new(config: Config, cpu: C) -> Result<Self, CoreError> {
        config
            .validate()
            .map_err(|err| CoreError::InvalidConfig(format!("{:#}", err)))?;

        info!(
            "Initializing Spectrum 48K at {}kHz, {}ms frames",
            config.cpu_frequency_khz, config.frame_time_ms
        );
        let (handle, audio) = beeper(&config);

        Ok(Self {
            bus: Bus::new(&config, handle),
            cpu,
            clock: Clock::new(&config),
            renderer: Renderer::new(&config),
            audio,
            state: MachineState::Uninitialized,
            config,
        })
    }

    pub fn state(&self) -> MachineState {
        self.state
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn set_state(&mut self, state: MachineState) {
        if self.state != state {
            info!("Machine {:?} -> {:?}", self.state, state);
            self.state = state;
        }
    }

    fn rom_loaded(&self) -> bool {
        matches!(self.state, MachineState::Running | MachineState::Paused)
    }

    /// Installs a 16K ROM image and starts the machine from it.
    pub fn load_rom(&mut self, rom: &[u8]) -> Result<(), CoreError> {
        if rom.len() != ROM_SIZE {
            warn!(
                "Refusing ROM image of {} bytes, expected {}",
                rom.len(),
                ROM_SIZE
            );
            return Err(CoreError::RomLoadFailure {
                expected: ROM_SIZE,
                actual: rom.len(),
            });
        }

        self.set_state(MachineState::Loading);
        info!("Loading ROM ({} bytes)", rom.len());
        self.bus.memory.load_rom(rom);
        self.cpu.reset();
        self.clock.reset_baseline();
        self.set_state(MachineState::Running);

        Ok(())
    }

    /// Restores a 48K SNA snapshot over the running machine.
    pub fn load_sna(&mut self, data: &[u8]) -> Result<(), CoreError> {
        if !self.rom_loaded() {
            return Err(CoreError::InvalidState {
                operation: "load a snapshot",
                state: self.state,
            });
        }

        let snapshot = Snapshot::parse(data);
        info!(
            "[SNA] Loading snapshot ({} bytes), SP={:04X} border={}",
            data.len(),
            snapshot.registers.sp,
            snapshot.border
        );

        self.cpu.set_state(&snapshot.registers);
        self.bus.memory.load_ram(RAM_START, &snapshot.ram);
        self.bus.ula.set_border(snapshot.border);

        Ok(())
    }

    /// Advances the machine by `elapsed_ms` of host time and returns how many
    /// frames were emulated.
    pub fn tick(&mut self, elapsed_ms: f64) -> Result<usize, CoreError> {
        match self.state {
            MachineState::Running => {
                self.clock.elapse(elapsed_ms);
                Ok(self.run_due_frames())
            }
            MachineState::Paused => Ok(0),
            state => Err(CoreError::InvalidState {
                operation: "tick",
                state,
            }),
        }
    }

    /// Like `tick`, but takes a host timestamp and works out the delta from
    /// the previous one. The first call after start or resume runs nothing.
    pub fn tick_at(&mut self, timestamp_ms: f64) -> Result<usize, CoreError> {
        match self.state {
            MachineState::Running => {
                self.clock.elapse_to(timestamp_ms);
                Ok(self.run_due_frames())
            }
            MachineState::Paused => Ok(0),
            state => Err(CoreError::InvalidState {
                operation: "tick",
                state,
            }),
        }
    }

    fn run_due_frames(&mut self) -> usize {
        let mut frames = 0;
        while self.clock.frame_due() {
            self.step_frame();
            frames += 1;
        }
        frames
    }

    /// Runs one frame worth of cycles, then redraws and raises the frame
    /// interrupt.
    pub fn step_frame(&mut self) {
        while !self.clock.budget_exhausted() {
            self.bus.begin_instruction(self.clock.now_ms());
            let cycles = self.cpu.run_instruction(&mut self.bus);
            let contention = self.bus.take_contention();
            self.clock.add_cycles(cycles + contention);

            if self.cpu.is_halted() {
                self.clock.idle_to_frame_end();
                break;
            }
        }

        let events = self.clock.end_frame();
        self.handle_clock_events(events);

        if let Err(err) = self.renderer.draw(
            self.bus.screen(),
            self.bus.border(),
            self.clock.is_flash_inverted(),
        ) {
            warn!("Skipping redraw: {}", err);
        }

        self.cpu.interrupt(false, 0);
    }

    fn handle_clock_events(&mut self, events: Vec<ClockEvent>) {
        for event in events {
            match event {
                ClockEvent::FlashToggled(inverted) => {
                    debug!("Flash phase inverted={}", inverted);
                }
                ClockEvent::FrameEnd(frame) => {
                    trace!(
                        "Frame {} completed, total cycles: {}",
                        frame,
                        self.clock.total_cycles()
                    );
                }
            }
        }
    }

    pub fn pause(&mut self) -> Result<(), CoreError> {
        match self.state {
            MachineState::Running | MachineState::Paused => {
                self.set_state(MachineState::Paused);
                Ok(())
            }
            state => Err(CoreError::InvalidState {
                operation: "pause",
                state,
            }),
        }
    }

    /// Resumes a paused machine. Host time that passed while paused is not
    /// caught up on.
    pub fn resume(&mut self) -> Result<(), CoreError> {
        match self.state {
            MachineState::Paused => {
                self.clock.reset_baseline();
                self.set_state(MachineState::Running);
                Ok(())
            }
            MachineState::Running => Ok(()),
            state => Err(CoreError::InvalidState {
                operation: "resume",
                state,
            }),
        }
    }

    /// Resets the CPU. Memory, ROM and the frame counters are kept.
    pub fn reset(&mut self) {
        info!("Resetting CPU");
        self.cpu.reset();
    }

    pub fn key_down(&mut self, code: u32) -> bool {
        self.bus.ula.keyboard.key_down(code)
    }

    pub fn key_up(&mut self, code: u32) -> bool {
        self.bus.ula.keyboard.key_up(code)
    }

    /// RGBA pixels of the last completed frame, border included.
    pub fn frame_buffer(&self) -> &[u8] {
        &self.renderer.screen_buffer
    }

    pub fn frame_width(&self) -> usize {
        self.renderer.width()
    }

    pub fn frame_height(&self) -> usize {
        self.renderer.height()
    }

    pub fn frame_count(&self) -> u64 {
        self.clock.frame_count()
    }

    pub fn total_cycles(&self) -> u64 {
        self.clock.total_cycles()
    }

    pub fn flash_state(&self) -> bool {
        self.clock.is_flash_inverted()
    }

    pub fn border(&self) -> u8 {
        self.bus.border()
    }

    pub fn audio_source(&self) -> BeeperSource {
        self.audio.clone()
    }

    /// Starts `output` on this machine's beeper. Returns false when the
    /// device could not be opened; the machine keeps running without sound.
    pub fn attach_audio(&mut self, output: &mut dyn AudioOutput) -> bool {
        match output.start(self.audio.clone()) {
            Ok(()) => {
                info!("[BEEPER] Audio output attached");
                true
            }
            Err(err) => {
                warn!("[BEEPER] {}, continuing without sound", err);
                false
            }
        }
    }

    pub fn memory_dump(&self, start: u16, end: u16) -> String {
        hexdump(self.bus.memory.data(), start, end)
    }
}

#[derive(Default)]
pub struct MachineBuilder {
    config: Config,
    rom: Option<Vec<u8>>,
}

impl MachineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(&mut self, config: Config) -> &mut Self {
        self.config = config;
        self
    }

    pub fn rom(&mut self, data: &[u8]) -> &mut Self {
        self.rom = Some(data.to_vec());
        self
    }

    pub fn build<C: Cpu>(&self, cpu: C) -> Result<Machine<C>, CoreError> {
        let mut machine = Machine::new(self.config.clone(), cpu)?;
        if let Some(rom) = &self.rom {
            machine.load_rom(rom)?;
        }
        Ok(machine)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::{CpuBus, Registers};

    /// Executes 4-cycle NOPs and counts what the machine asks of it.
    #[derive(Default)]
    struct NopCpu {
        registers: Registers,
        instructions: usize,
        interrupts: usize,
        resets: usize,
        halt_after: Option<usize>,
    }

    impl Cpu for NopCpu {
        fn reset(&mut self) {
            self.registers = Registers::default();
            self.resets += 1;
        }

        fn run_instruction(&mut self, _bus: &mut dyn CpuBus) -> u32 {
            self.instructions += 1;
            4
        }

        fn is_halted(&self) -> bool {
            self.halt_after
                .map_or(false, |limit| self.instructions >= limit)
        }

        fn interrupt(&mut self, _nmi: bool, _data: u8) {
            self.interrupts += 1;
        }

        fn state(&self) -> Registers {
            self.registers
        }

        fn set_state(&mut self, registers: &Registers) {
            self.registers = *registers;
        }
    }

    fn running() -> Machine<NopCpu> {
        let mut machine = Machine::new(Config::default(), NopCpu::default()).unwrap();
        machine.load_rom(&[0; ROM_SIZE]).unwrap();
        machine
    }

    #[test]
    fn test_rom_size_is_checked() {
        let mut machine = Machine::new(Config::default(), NopCpu::default()).unwrap();
        assert_eq!(
            machine.load_rom(&[0; 100]),
            Err(CoreError::RomLoadFailure {
                expected: ROM_SIZE,
                actual: 100
            })
        );
        assert_eq!(machine.state(), MachineState::Uninitialized);

        machine.load_rom(&[0; ROM_SIZE]).unwrap();
        assert_eq!(machine.state(), MachineState::Running);
        assert_eq!(machine.cpu.resets, 1);
    }

    #[test]
    fn test_tick_needs_rom() {
        let mut machine = Machine::new(Config::default(), NopCpu::default()).unwrap();
        assert_eq!(
            machine.tick(20.0),
            Err(CoreError::InvalidState {
                operation: "tick",
                state: MachineState::Uninitialized
            })
        );
        assert!(machine.load_sna(&[]).is_err());
    }

    #[test]
    fn test_frame_runs_budget_then_interrupts() {
        let mut machine = running();
        assert_eq!(machine.tick(20.0).unwrap(), 1);
        assert_eq!(machine.cpu.instructions, 17_500);
        assert_eq!(machine.cpu.interrupts, 1);
        assert_eq!(machine.total_cycles(), 70_000);
    }

    #[test]
    fn test_halt_idles_rest_of_frame() {
        let mut machine = Machine::new(
            Config::default(),
            NopCpu {
                halt_after: Some(10),
                ..Default::default()
            },
        )
        .unwrap();
        machine.load_rom(&[0; ROM_SIZE]).unwrap();

        assert_eq!(machine.tick(40.0).unwrap(), 2);
        // one instruction per frame once halted
        assert_eq!(machine.cpu.instructions, 11);
        assert_eq!(machine.total_cycles(), 140_000);
        assert_eq!(machine.clock.cycle_count(), 0);
    }

    #[test]
    fn test_pause_and_resume() {
        let mut machine = running();
        machine.pause().unwrap();
        assert_eq!(machine.tick(100.0).unwrap(), 0);
        assert_eq!(machine.frame_count(), 0);

        machine.resume().unwrap();
        assert_eq!(machine.state(), MachineState::Running);
        assert_eq!(machine.tick(20.0).unwrap(), 1);
    }

    #[test]
    fn test_resume_drops_paused_time() {
        let mut machine = running();
        assert_eq!(machine.tick_at(0.0).unwrap(), 0);
        assert_eq!(machine.tick_at(20.0).unwrap(), 1);
        machine.pause().unwrap();
        machine.resume().unwrap();
        assert_eq!(machine.tick_at(400.0).unwrap(), 0);
        assert_eq!(machine.tick_at(420.0).unwrap(), 1);
    }

    #[test]
    fn test_pause_needs_rom() {
        let mut machine = Machine::new(Config::default(), NopCpu::default()).unwrap();
        assert!(machine.pause().is_err());
        assert!(machine.resume().is_err());
    }

    #[test]
    fn test_reset_keeps_memory() {
        let mut machine = running();
        machine.bus.memory.write_byte(0x8000, 0x42);
        machine.reset();
        assert_eq!(machine.cpu.resets, 2);
        assert_eq!(machine.bus.memory.read_byte(0x8000), 0x42);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        for config in [
            Config {
                supersample_factor: 0,
                ..Default::default()
            },
            Config {
                frame_time_ms: 0.0,
                ..Default::default()
            },
        ] {
            let result = Machine::new(config, NopCpu::default());
            assert!(matches!(result, Err(CoreError::InvalidConfig(_))));
        }
    }

    #[test]
    fn test_memory_dump() {
        let mut machine = running();
        machine.bus.memory.write_byte(0x4000, 0x41);
        let dump = machine.memory_dump(0x4000, 0x400F);
        assert!(dump.starts_with("4000: 41 00"));
        assert!(dump.contains('A'));
    }
}
