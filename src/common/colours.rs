//! Embed colour palette used for replies and devlog messages.

pub const BRIGHT_GREEN: u32 = 0x01D277;
pub const LIGHT_BLUE: u32 = 0x68A4FF;
pub const ORANGE: u32 = 0xE67E22;
pub const RED: u32 = 0xFF0000;
pub const SOFT_RED: u32 = 0xCD6D6D;
pub const GOLD: u32 = 0xE6C200;
