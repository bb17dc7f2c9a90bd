//! Recall - durable per-user memory for chat applications
//!
//! This crate provides a daemon that extracts long-term facts about users
//! from free-text messages and consolidates them into a per-user snapshot
//! that can be rendered back into prompt context.

pub mod config;
pub mod error;
pub mod memory;
pub mod oracle;
pub mod server;
pub mod storage;
pub mod testing;

pub use error::RecallError;
