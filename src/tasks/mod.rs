//! Background Tasks Module
//!
//! Contains background tasks started by the store.
//!
//! # Tasks
//! - Warm-up: primes every joined community's publications with bounded fan-out

mod warmup;

pub use warmup::spawn_warmup_task;
