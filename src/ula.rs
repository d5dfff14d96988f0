use tracing::trace;

use crate::{keyboard::Keyboard, sound::BeeperHandle};

const BORDER_MASK: u8 = 0x07;
const SPEAKER_BIT: u8 = 0x10;

/// I/O side of the ULA: keyboard reads, border and speaker writes.
///
/// The ULA decodes only A0, so it answers on every even port.
#[derive(Debug, Clone)]
pub struct Ula {
    pub keyboard: Keyboard,
    border: u8,
    speaker: bool,
    beeper: BeeperHandle,
}

impl Ula {
    pub fn new(beeper: BeeperHandle, border: u8) -> Self {
        Ula {
            keyboard: Keyboard::new(),
            border: border & BORDER_MASK,
            speaker: false,
            beeper,
        }
    }

    pub fn read(&self, port: u16) -> u8 {
        if port & 1 == 0 {
            self.keyboard.query(port)
        } else {
            // Real hardware would float the bus (usually 0xFF); 0 is what the
            // emulator has always returned for odd ports.
            0
        }
    }

    /// Handles an OUT to `port`. `now_ms` is the emulated time of the write,
    /// used to timestamp speaker transitions.
    pub fn write(&mut self, port: u16, value: u8, now_ms: f64) {
        if port & 1 != 0 {
            return;
        }

        let border = value & BORDER_MASK;
        if border != self.border {
            trace!("[ULA] Border {} -> {}", self.border, border);
            self.border = border;
        }

        let speaker = value & SPEAKER_BIT != 0;
        if speaker != self.speaker {
            trace!("[ULA] Speaker {} at {:.3}ms", speaker as u8, now_ms);
            self.speaker = speaker;
            self.beeper.notify_transition(now_ms);
        }
    }

    pub fn border(&self) -> u8 {
        self.border
    }

    pub fn set_border(&mut self, border: u8) {
        self.border = border & BORDER_MASK;
    }

    pub fn speaker(&self) -> bool {
        self.speaker
    }
}
