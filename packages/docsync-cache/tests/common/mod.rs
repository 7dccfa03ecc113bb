//! Common test utilities for docsync-cache
//!
//! A temporary document tree plus helpers for waiting on the watcher thread.

#![allow(dead_code)]

mod fixtures;

pub use fixtures::*;
