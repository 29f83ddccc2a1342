//! Upload Queue
//!
//! Sequences file uploads on the client: admit a batch, drop duplicates, then
//! submit one item at a time while reporting each step to caller-supplied
//! hooks. Items already on the server's FTP side can be sent together as a
//! single remote fetch.
//!
//! # Modules
//!
//! - `queue`: store, dispatcher and observer hooks
//! - `transport`: payload building and the HTTP collaborators
//! - `config`: environment configuration
//!
//! ```rust,ignore
//! use upload_queue::{Collaborators, Config, OptionsUpdate, UploadItem, UploadQueue};
//!
//! let config = Config::from_env()?;
//! let queue = UploadQueue::new(
//!     Collaborators::http(&config)?,
//!     OptionsUpdate::new()
//!         .history_id("f2db41e1fa331b3e")
//!         .on_success(|index, _| println!("{index} done")),
//! );
//!
//! queue.add(vec![UploadItem::local("reads.fastq", 1024, "/data/reads.fastq")]);
//! queue.start(false).await;
//! ```

pub mod config;
pub mod error;
pub mod queue;
pub mod transport;

pub use config::Config;
pub use error::{Result, UploadError};
pub use queue::{
    DispatchState, FileMode, ItemStatus, OptionsUpdate, QueueIndex, UploadItem, UploadOptions,
    UploadQueue,
};
pub use transport::Collaborators;
