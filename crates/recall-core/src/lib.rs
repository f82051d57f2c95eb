//! Spaced-repetition scheduling core for the Recall flashcard service.
//!
//! This crate is deliberately free of HTTP and database dependencies. The
//! grading and classification functions are pure; everything that touches
//! storage goes through the traits in [`store`].

// Trait futures carry explicit `Send` bounds where it matters.
#![allow(async_fn_in_trait)]

pub mod access;
pub mod catalog;
pub mod classify;
pub mod error;
pub mod grade;
pub mod memory;
pub mod progress;
pub mod queue;
pub mod session;
pub mod store;

pub use error::{Error, Result};
pub use grade::grade;
pub use progress::{ProgressRecord, Quality, Version};
