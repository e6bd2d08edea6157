/// Hours in a calendar day. Valid hours are `0..HOURS_PER_DAY`.
pub const HOURS_PER_DAY: u8 = 24;

/// Last valid hour of a day (inclusive).
pub const MAX_HOUR: u8 = HOURS_PER_DAY - 1;

/// Longest accepted front-end command line, in bytes.
pub const MAX_COMMAND_LEN: usize = 1024;

/// Most hover steps accepted in a single `drag` command.
pub const MAX_DRAG_STEPS: usize = 64;
