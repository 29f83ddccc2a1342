//! Upload Queue Module
//!
//! Client-side sequencing of uploads:
//! - duplicate suppression by name and size
//! - FIFO dispatch, one submission in flight
//! - cooperative pause and resume
//! - bulk remote fetch for files already on the server side
//!
//! Flow:
//! 1. Caller adds items; each admitted item is announced with its index
//! 2. Caller starts the queue
//! 3. Items are submitted oldest first, each settlement reported
//! 4. The run ends when the queue is empty or paused, firing `complete`

mod bulk;
pub mod dispatcher;
pub mod observer;
pub mod store;
pub mod types;

pub use dispatcher::UploadQueue;
pub use observer::{OptionsUpdate, UploadOptions};
pub use store::QueueStore;
pub use types::*;
