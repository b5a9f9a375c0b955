//! Synchronization primitives for in-process communication.
//!
//! This module provides thread-safe queues for handing values between
//! threads within the same process.

pub mod bounded;
