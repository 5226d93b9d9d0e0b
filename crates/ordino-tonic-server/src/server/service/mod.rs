//! gRPC service implementation and partition-worker coordination logic.
//!
//! This module contains the core logic for handling client-facing gRPC
//! requests and delegating allocations to the partition-owner workers. It
//! implements the gRPC service and manages request routing, error
//! handling, and shutdown coordination.
//!
//! ## Structure
//!
//! - [`handler`] - gRPC service entry point (`SequenceService`).

pub mod handler;

use ordino::{BlockAllocator, ClusterContext, LocalLockCoordinator, MemoryStore};

/// Cluster wiring used by this node: the in-process store and lock
/// coordinator stand in for the external cluster services.
pub type NodeContext = ClusterContext<MemoryStore, LocalLockCoordinator>;

/// Allocator handed to each partition-owner worker.
pub type Allocator = BlockAllocator<MemoryStore, LocalLockCoordinator>;
