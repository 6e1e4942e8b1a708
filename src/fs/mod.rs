//! Filesystem utilities for conduit.
//!
//! Generated command files are replaced atomically so IDEs watching their
//! command directories never read a partial file.

pub mod atomic;

pub use atomic::atomic_write_file;
