// SPDX-FileCopyrightText: 2026 Pressfeed Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage backends for pressfeed release archives.
//!
//! [`LocalStorage`] keeps archives under a single cache directory. Every key
//! is validated before any filesystem access, writes land through a staged
//! rename, and [`FileLock`] coordinates builders across processes.

pub mod local;
pub mod lock;

pub use local::LocalStorage;
pub use lock::FileLock;
