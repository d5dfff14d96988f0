use std::collections::HashMap;

/// Port addresses of the eight half-rows, in hardware order. Bit `n` of the
/// high byte is low for half-row `n`.
pub const HALF_ROW_PORTS: [u16; 8] = [
    0xFEFE, // Shift Z X C V
    0xFDFE, // A S D F G
    0xFBFE, // Q W E R T
    0xF7FE, // 1 2 3 4 5
    0xEFFE, // 0 9 8 7 6
    0xDFFE, // P O I U Y
    0xBFFE, // Enter L K J H
    0x7FFE, // Space SymbolShift M N B
];

/// The 8x5 key matrix read through the ULA.
///
/// Each half-row register is active low: a cleared bit is a key held down.
/// Host keys reach the matrix through a table of `Mapping`s keyed by host
/// key code.
#[derive(Debug, Clone)]
pub struct Keyboard {
    rows: [u8; 8],
    mappings: HashMap<u32, Mapping>,
}

impl Keyboard {
    pub fn new() -> Self {
        Keyboard::default()
    }

    pub fn with_mappings(mappings: &[Mapping]) -> Self {
        Keyboard {
            rows: [0xFF; 8],
            mappings: mappings.iter().map(|m| (m.code, m.clone())).collect(),
        }
    }

    /// Returns `false` when `code` is not mapped, so the host can keep its
    /// default handling for the key.
    pub fn key_down(&mut self, code: u32) -> bool {
        self.set_host_key(code, true)
    }

    pub fn key_up(&mut self, code: u32) -> bool {
        self.set_host_key(code, false)
    }

    fn set_host_key(&mut self, code: u32, down: bool) -> bool {
        match self.mappings.get(&code) {
            Some(mapping) => {
                let key = mapping.key;
                self.set_key(key, down);
                true
            }
            None => false,
        }
    }

    pub fn set_key(&mut self, key: Key, down: bool) {
        let (row, bit) = key.position();
        let mask = 1u8 << bit;
        if down {
            self.rows[row] &= !mask;
        } else {
            self.rows[row] |= mask;
        }
    }

    /// Value read from ULA `port`.
    ///
    /// Every half-row whose address line is low in the high byte of `port`
    /// is scanned. Keys are active low, so combining rows is an AND.
    pub fn query(&self, port: u16) -> u8 {
        HALF_ROW_PORTS
            .iter()
            .zip(self.rows.iter())
            .filter(|(row_port, _)| !(**row_port | port) & 0xFF00 != 0)
            .fold(0xFF, |value, (_, &row)| value & row)
    }

    /// Raw register for half-row `row` (0-7).
    pub fn row(&self, row: usize) -> u8 {
        self.rows[row]
    }

    pub fn release_all(&mut self) {
        self.rows = [0xFF; 8];
    }
}

impl Default for Keyboard {
    fn default() -> Self {
        Keyboard::with_mappings(&default_mapping())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    CapsShift,
    Z,
    X,
    C,
    V,
    A,
    S,
    D,
    F,
    G,
    Q,
    W,
    E,
    R,
    T,
    D1,
    D2,
    D3,
    D4,
    D5,
    D0,
    D9,
    D8,
    D7,
    D6,
    P,
    O,
    I,
    U,
    Y,
    Enter,
    L,
    K,
    J,
    H,
    Space,
    SymbolShift,
    M,
    N,
    B,
}

impl Key {
    /// Half-row index and bit of this key in the matrix.
    pub fn position(self) -> (usize, u8) {
        let index = self as usize;
        (index / 5, (index % 5) as u8)
    }

    pub fn port(self) -> u16 {
        HALF_ROW_PORTS[self.position().0]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mapping {
    pub code: u32,
    pub key: Key,
}

impl Mapping {
    pub fn new(code: u32, key: Key) -> Self {
        Mapping { code, key }
    }
}

/// Browser `keyCode` values for each matrix key. Shift maps to Caps Shift
/// and Ctrl to Symbol Shift.
pub fn default_mapping() -> [Mapping; 40] {
    [
        Mapping::new(16, Key::CapsShift),
        Mapping::new(90, Key::Z),
        Mapping::new(88, Key::X),
        Mapping::new(67, Key::C),
        Mapping::new(86, Key::V),
        Mapping::new(65, Key::A),
        Mapping::new(83, Key::S),
        Mapping::new(68, Key::D),
        Mapping::new(70, Key::F),
        Mapping::new(71, Key::G),
        Mapping::new(81, Key::Q),
        Mapping::new(87, Key::W),
        Mapping::new(69, Key::E),
        Mapping::new(82, Key::R),
        Mapping::new(84, Key::T),
        Mapping::new(49, Key::D1),
        Mapping::new(50, Key::D2),
        Mapping::new(51, Key::D3),
        Mapping::new(52, Key::D4),
        Mapping::new(53, Key::D5),
        Mapping::new(48, Key::D0),
        Mapping::new(57, Key::D9),
        Mapping::new(56, Key::D8),
        Mapping::new(55, Key::D7),
        Mapping::new(54, Key::D6),
        Mapping::new(80, Key::P),
        Mapping::new(79, Key::O),
        Mapping::new(73, Key::I),
        Mapping::new(85, Key::U),
        Mapping::new(89, Key::Y),
        Mapping::new(13, Key::Enter),
        Mapping::new(76, Key::L),
        Mapping::new(75, Key::K),
        Mapping::new(74, Key::J),
        Mapping::new(72, Key::H),
        Mapping::new(32, Key::Space),
        Mapping::new(17, Key::SymbolShift),
        Mapping::new(77, Key::M),
        Mapping::new(78, Key::N),
        Mapping::new(66, Key::B),
    ]
}
