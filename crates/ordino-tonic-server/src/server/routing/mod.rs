//! Partition-aware request routing.
//!
//! An allocation request travels from the gRPC handler to the worker
//! owning the sequence's partition and back as a stream of packed chunks:
//!
//! - [`request`] - the work messages workers process.
//! - [`dispatcher`] - routes a request by its sequence name and flattens
//!   the owner's chunks into the response stream.
//! - [`processor`] - executes the allocation and packs the block.

pub mod dispatcher;
pub mod processor;
pub mod request;
