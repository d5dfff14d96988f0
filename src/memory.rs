use derivative::Derivative;
use tracing::trace;

pub const MEMORY_SIZE: usize = 0x10000;
pub const ROM_SIZE: usize = 0x4000;
pub const RAM_START: u16 = 0x4000;
pub const SCREEN_START: usize = 0x4000;
pub const SCREEN_SIZE: usize = 6912;

/// Lower 16K of RAM shares its bus with the ULA video fetches.
const CONTENDED: std::ops::Range<u16> = 0x4000..0x8000;

// +---------------+----------------------------------------+
// | Range         | Description                            |
// +---------------+----------------------------------------+
// | 0x0000-0x3FFF | ROM (read-only to the running program) |
// | 0x4000-0x57FF | Screen bitmap                          |
// | 0x5800-0x5AFF | Screen attributes                      |
// | 0x5B00-0x7FFF | Contended RAM                          |
// | 0x8000-0xFFFF | Uncontended RAM                        |
// +---------------+----------------------------------------+

#[derive(Derivative)]
#[derivative(Clone, Debug, PartialEq)]
pub struct Memory {
    #[derivative(Debug = "ignore")]
    data: Vec<u8>,
    contention_penalty: u32,
}

impl Memory {
    pub fn new(contention_penalty: u32) -> Self {
        Memory {
            data: vec![0; MEMORY_SIZE],
            contention_penalty,
        }
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn read_byte(&self, address: u16) -> u8 {
        self.data[address as usize]
    }

    /// Writes `value` unless `address` falls in ROM. Returns whether the
    /// write landed.
    pub fn write_byte(&mut self, address: u16, value: u8) -> bool {
        if address < RAM_START {
            trace!(
                "Ignoring write to ROM - ${:04X} = ${:02X}",
                address,
                value
            );
            return false;
        }
        self.data[address as usize] = value;
        true
    }

    /// Cycle surcharge for one access at `address`.
    pub fn contention(&self, address: u16) -> u32 {
        if CONTENDED.contains(&address) {
            self.contention_penalty
        } else {
            0
        }
    }

    /// Copies `rom` into the ROM region, bypassing write protection.
    pub fn load_rom(&mut self, rom: &[u8]) {
        let len = rom.len().min(ROM_SIZE);
        self.data[..len].copy_from_slice(&rom[..len]);
    }

    /// Copies `data` into RAM starting at `start`, truncating at the top of
    /// the address space.
    pub fn load_ram(&mut self, start: u16, data: &[u8]) {
        let start = (start as usize).max(RAM_START as usize);
        let end = (start + data.len()).min(MEMORY_SIZE);
        self.data[start..end].copy_from_slice(&data[..end - start]);
    }

    /// The 6912 bytes of bitmap and attribute memory.
    pub fn screen(&self) -> &[u8] {
        &self.data[SCREEN_START..SCREEN_START + SCREEN_SIZE]
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rom_is_write_protected() {
        let mut memory = Memory::new(8000);
        memory.load_rom(&[0xF3, 0xAF]);
        assert!(!memory.write_byte(0x0000, 0x00));
        assert!(!memory.write_byte(0x3FFF, 0x12));
        assert_eq!(memory.read_byte(0x0000), 0xF3);
        assert_eq!(memory.read_byte(0x3FFF), 0x00);

        assert!(memory.write_byte(0x4000, 0x55));
        assert_eq!(memory.read_byte(0x4000), 0x55);
    }

    #[test]
    fn test_contention_region() {
        let memory = Memory::new(8000);
        assert_eq!(memory.contention(0x3FFF), 0);
        assert_eq!(memory.contention(0x4000), 8000);
        assert_eq!(memory.contention(0x7FFF), 8000);
        assert_eq!(memory.contention(0x8000), 0);
        assert_eq!(memory.contention(0xFFFF), 0);
    }

    #[test]
    fn test_load_ram_truncates() {
        let mut memory = Memory::new(0);
        memory.load_ram(0xFFFE, &[1, 2, 3, 4]);
        assert_eq!(memory.read_byte(0xFFFE), 1);
        assert_eq!(memory.read_byte(0xFFFF), 2);
        assert_eq!(memory.size(), MEMORY_SIZE);
    }

    #[test]
    fn test_screen_slice() {
        let mut memory = Memory::new(0);
        memory.write_byte(0x4000, 0xAA);
        memory.write_byte(0x5AFF, 0x47);
        let screen = memory.screen();
        assert_eq!(screen.len(), SCREEN_SIZE);
        assert_eq!(screen[0], 0xAA);
        assert_eq!(screen[SCREEN_SIZE - 1], 0x47);
    }
}
