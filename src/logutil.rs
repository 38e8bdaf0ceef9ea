//! Display wrapper for text typed by players (item names, biome names,
//! record ids) so it can be put into log lines and error messages safely.

use std::fmt;

/// Characters kept from one player-supplied value.
const MAX_CHARS: usize = 64;

/// Player-typed text rendered on a single line and capped at `MAX_CHARS`.
///
/// Control characters are written with Rust's debug escapes (`\n`, `\u{7}`),
/// everything else passes through unchanged.
#[derive(Debug, Clone, Copy)]
pub struct PlayerText<'a>(&'a str);

/// Wrap `s` for logging; nothing is allocated until it is formatted.
pub fn player_text(s: &str) -> PlayerText<'_> {
    PlayerText(s)
}

impl fmt::Display for PlayerText<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut chars = self.0.chars();
        for ch in chars.by_ref().take(MAX_CHARS) {
            if ch.is_control() {
                write!(f, "{}", ch.escape_debug())?;
            } else {
                f.write_str(ch.encode_utf8(&mut [0; 4]))?;
            }
        }
        if chars.next().is_some() {
            f.write_str("…")?;
        }
        Ok(())
    }
}
