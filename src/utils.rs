/// Classic 16-bytes-per-line dump of `buffer[start..=end]`, with an ASCII
/// column. `end` is inclusive and clamped to the buffer.
pub fn hexdump(buffer: &[u8], start: u16, end: u16) -> String {
    let start = start as usize;
    let end = (end as usize + 1).min(buffer.len());
    if start >= end {
        return String::new();
    }

    let mut str = String::new();
    for (i, line) in buffer[start..end].chunks(16).enumerate() {
        let mut bytes = format!("{:04x}: ", start + i * 16);
        let mut chars = String::new();
        for &byte in line {
            bytes.push_str(&format!("{:02x} ", byte));
            let c = byte as char;
            chars.push(if c.is_ascii_graphic() || c == ' ' {
                c
            } else {
                '.'
            });
        }
        str.push_str(&format!("{:<54} {}\n", bytes, chars));
    }

    str
}
