//! 48K SNA snapshot parsing.
//!
//! Layout (49,179 bytes): a 27-byte register header followed by the 48K of
//! RAM from $4000 to $FFFF. PC is not part of the header; execution resumes
//! at the RETN in ROM at $0072, which pops it from the snapshot's stack.
//!
//! | Offset | Size | Field                      |
//! |--------|------|----------------------------|
//! | $00    | 1    | I                          |
//! | $01    | 8    | L' H' E' D' C' B' F' A'    |
//! | $09    | 6    | L H E D C B                |
//! | $0F    | 2    | IY                         |
//! | $11    | 2    | IX                         |
//! | $13    | 1    | IFF2 (bit 2)               |
//! | $14    | 1    | R                          |
//! | $15    | 1    | F                          |
//! | $16    | 1    | A                          |
//! | $17    | 2    | SP                         |
//! | $19    | 1    | Interrupt mode             |
//! | $1A    | 1    | Border colour              |

use tracing::warn;

use crate::{cpu::Registers, error::CoreError};

pub const SNA_SIZE: usize = 49_179;
pub const HEADER_SIZE: usize = 27;
pub const RAM_SIZE: usize = 0xC000;
pub const RAM_START: u16 = 0x4000;

/// Where the 48K ROM's RETN lives.
pub const RESUME_PC: u16 = 0x0072;

#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub registers: Registers,
    pub border: u8,
    pub ram: Vec<u8>,
}

impl Snapshot {
    /// Parses `data` as a 48K SNA.
    ///
    /// A file of the wrong length is still loaded: missing bytes read as
    /// zero and anything past the end of RAM is ignored.
    pub fn parse(data: &[u8]) -> Snapshot {
        if let Err(err) = Self::check_size(data) {
            warn!("[SNA] {}, loading anyway", err);
        }

        let byte = |offset: usize| data.get(offset).copied().unwrap_or(0);
        let word = |offset: usize| u16::from_le_bytes([byte(offset), byte(offset + 1)]);

        let iff2 = byte(0x13) & 0x04 != 0;
        let registers = Registers {
            i: byte(0x00),
            l_alt: byte(0x01),
            h_alt: byte(0x02),
            e_alt: byte(0x03),
            d_alt: byte(0x04),
            c_alt: byte(0x05),
            b_alt: byte(0x06),
            f_alt: byte(0x07),
            a_alt: byte(0x08),
            l: byte(0x09),
            h: byte(0x0A),
            e: byte(0x0B),
            d: byte(0x0C),
            c: byte(0x0D),
            b: byte(0x0E),
            iy: word(0x0F),
            ix: word(0x11),
            iff1: iff2,
            iff2,
            r: byte(0x14),
            f: byte(0x15),
            a: byte(0x16),
            sp: word(0x17),
            im: byte(0x19),
            pc: RESUME_PC,
        };

        let mut ram = vec![0; RAM_SIZE];
        if data.len() > HEADER_SIZE {
            let available = &data[HEADER_SIZE..data.len().min(HEADER_SIZE + RAM_SIZE)];
            ram[..available.len()].copy_from_slice(available);
        }

        Snapshot {
            registers,
            border: byte(0x1A) & 0x07,
            ram,
        }
    }

    pub fn check_size(data: &[u8]) -> Result<(), CoreError> {
        if data.len() != SNA_SIZE {
            return Err(CoreError::MalformedSnapshot {
                expected: SNA_SIZE,
                actual: data.len(),
            });
        }
        Ok(())
    }
}
