//! A prelude designed to be bulk imported for ease of use.
//!
//! ```
//! # #[allow(unused_imports)]
//! use veil::prelude::*;
//! ```

#[doc(inline)]
pub use super::{
    config::{Config, ConfigError},
    files::Files,
    handler::{Handler, HandlerFn},
    mw::Logged,
    reply::{self, Reply},
    vfs::{DirEntry, DiskStore, FileStore, HiddenFilter, Marker, ReadDir},
    App, Body, Response,
};
