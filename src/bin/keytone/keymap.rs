//! Computer keyboard to voice index.
//!
//! Two rows laid out like a piano: the letter row plays the white keys and
//! the number row above it the black keys, starting from voice 0.

use crossterm::event::KeyCode;

/// Key for each voice, lowest pitch first.
pub const NOTE_KEYS: [char; 13] = [
    'Q', '2', 'W', '3', 'E', 'R', '5', 'T', '6', 'Y', '7', 'U', 'I',
];

pub fn voice_for_key(code: KeyCode) -> Option<usize> {
    match code {
        KeyCode::Char(c) => {
            let c = c.to_ascii_uppercase();
            NOTE_KEYS.iter().position(|&k| k == c)
        }
        _ => None,
    }
}

pub fn label(index: usize) -> char {
    NOTE_KEYS.get(index).copied().unwrap_or(' ')
}
