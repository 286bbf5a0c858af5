//! Fixed bounds shared by configuration and the core

/// Exclusive upper bound on the number of chargers in a pool
pub const MAX_SLOTS: usize = 32;

/// Shortest reservation accepted, in minutes
pub const MIN_MINUTES: u32 = 15;

/// Longest reservation accepted, in minutes
pub const MAX_MINUTES: u32 = 240;
