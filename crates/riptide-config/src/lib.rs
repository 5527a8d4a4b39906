#![forbid(unsafe_code)]
#![warn(
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    missing_docs
)]

//! Typed configuration for the torrent orchestration layer.
//!
//! Layout: `model.rs` (configuration and proxy types), `defaults.rs`
//! (default values), `validate.rs` (hard checks plus guard-rail warnings),
//! `loader.rs` (JSON documents on disk), `watch.rs` (live snapshot channel).

pub mod defaults;
pub mod error;
pub mod loader;
pub mod model;
pub mod validate;
pub mod watch;

pub use error::{ConfigError, ConfigResult};
pub use model::{Configuration, EncryptionPolicy, ProxySettings, ProxyType};
pub use validate::Validated;
pub use watch::{ConfigReceiver, ConfigSender, config_channel};
