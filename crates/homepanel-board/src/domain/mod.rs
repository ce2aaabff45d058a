//! Domain layer for homepanel-board.
//!
//! Pure configuration types with no I/O.  Reading them from disk, the
//! environment or the command line is the job of the infrastructure layer
//! and `main.rs`.

pub mod config;

pub use config::{CsrfSource, PanelConfig};
