//! Builds the gRPC client and server bindings for `proto/ordino.proto`.
//!
//! The `packed_values` field of `BlockChunk` is overridden to the `Bytes`
//! type so chunk payloads deserialize without an intermediate `Vec<u8>`
//! copy. The file descriptor set is emitted alongside the bindings for
//! gRPC server reflection.

use std::env;
use std::path::PathBuf;

fn main() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    let descriptor_path = out_dir.join("ordino_descriptor.bin");

    let mut config = tonic_prost_build::Config::new();

    config
        .bytes([".ordino.BlockChunk.packed_values"])
        .file_descriptor_set_path(&descriptor_path);

    tonic_prost_build::configure()
        .compile_with_config(config, &["proto/ordino.proto"], &["proto"])
        .unwrap();
}
