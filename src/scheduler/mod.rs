//! Bounded execution of blocking external work.
//!
//! This module provides the lanes that every download and metadata lookup runs
//! on:
//!
//! - **SequentialQueue**: one FIFO lane, one task in flight at a time
//! - **WorkerPool**: a fixed set of lanes with least-busy dispatch
//!
//! # Architecture
//!
//! ```text
//!                      ┌──────────────┐
//!                      │    Caller    │
//!                      │ (CLI / bot)  │
//!                      └──────┬───────┘
//!                             │ submit(task)
//!                      ┌──────▼───────┐
//!                      │  WorkerPool  │  picks min active_count
//!                      └──────┬───────┘
//!                             │
//!         ┌───────────────────┼───────────────────┐
//!         │                   │                   │
//!         ▼                   ▼                   ▼
//!    ┌─────────┐         ┌─────────┐         ┌─────────┐
//!    │ Lane 0  │         │ Lane 1  │         │ Lane N  │
//!    │ (FIFO)  │         │ (FIFO)  │         │ (FIFO)  │
//!    └─────────┘         └─────────┘         └─────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use podcastify::panic_bus::PanicBus;
//! use podcastify::scheduler::{WorkerPool, WorkerPoolConfig};
//!
//! let pool = WorkerPool::new(&WorkerPoolConfig::new(4), PanicBus::new());
//! let title = pool.submit(|| async { lookup_title().await }).await?;
//! ```

pub mod queue;
pub mod worker_pool;

pub use queue::SequentialQueue;
pub use worker_pool::{PoolStats, WorkerPool, WorkerPoolConfig};
