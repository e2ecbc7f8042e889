//! ffmatrix - empirical codec/container compatibility for ffmpeg
//!
//! This library crate exposes the presentation helpers for integration
//! testing; the heavy lifting lives in `fm-av` and `fm-resolve`.

pub mod compare;
pub mod table;
