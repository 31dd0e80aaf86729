//! ANSI escape sequences and the fixed severity to color table.

use crate::entry::Level;

/// Foreground red.
pub const RED: &str = "\x1b[31m";
/// Foreground green.
pub const GREEN: &str = "\x1b[32m";
/// Foreground yellow.
pub const YELLOW: &str = "\x1b[33m";
/// Foreground cyan.
pub const CYAN: &str = "\x1b[36m";
/// Foreground white, used to highlight field keys.
pub const WHITE: &str = "\x1b[37m";
/// Resets all attributes.
pub const CLEAR: &str = "\x1b[0m";

/// Color used for levels missing from the table.
pub const UNKNOWN_LEVEL_COLOR: &str = RED;

/// Returns the escape sequence the level tag is rendered in.
///
/// Levels outside the known set fall back to [`UNKNOWN_LEVEL_COLOR`].
pub fn color_for(level: Level) -> &'static str {
    match level {
        Level::DEBUG => GREEN,
        Level::INFO => CYAN,
        Level::WARN => YELLOW,
        Level::ERROR | Level::DPANIC | Level::PANIC | Level::FATAL => RED,
        _ => UNKNOWN_LEVEL_COLOR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_levels_have_distinct_colors() {
        assert_eq!(color_for(Level::DEBUG), GREEN);
        assert_eq!(color_for(Level::INFO), CYAN);
        assert_eq!(color_for(Level::WARN), YELLOW);
        assert_eq!(color_for(Level::ERROR), RED);
        assert_eq!(color_for(Level::DPANIC), RED);
        assert_eq!(color_for(Level::PANIC), RED);
        assert_eq!(color_for(Level::FATAL), RED);
    }

    #[test]
    fn unknown_level_falls_back_to_red() {
        assert_eq!(color_for(Level::from_i8(42)), UNKNOWN_LEVEL_COLOR);
        assert_eq!(color_for(Level::from_i8(-9)), RED);
    }
}
