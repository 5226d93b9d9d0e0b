#![doc = include_str!("../README.md")]

mod common;
pub use common::*;
// Public re-export so downstream crates can access `ordino` via
// `ordino_tonic_core::ordino`
pub use ordino;

pub mod proto {
    tonic::include_proto!("ordino");

    /// Encoded file descriptor set, served over gRPC reflection.
    pub const FILE_DESCRIPTOR_SET: &[u8] =
        tonic::include_file_descriptor_set!("ordino_descriptor");
}
