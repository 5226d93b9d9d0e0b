#![doc = include_str!("../README.md")]

pub mod driver;
pub mod transport;
pub mod verify;
