//! Common infrastructure for the mirror manager daemon.
//!
//! This crate provides the shared building blocks used by the mirror
//! daemon crates:
//!
//! - [`Transient`]: classification trait for errors that may succeed on retry
//! - [`RetryPolicy`] / [`retry_transient`]: bounded retry with randomized
//!   jitter, applied only to transient failures

mod retry;

pub use retry::{retry_transient, RetryPolicy, Transient};
