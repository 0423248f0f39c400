pub mod aliases;
pub mod classify;
pub mod coords;
pub mod error;
