pub mod character;
pub mod config;
pub mod roi;
pub mod roster;
