// SPDX-FileCopyrightText: 2026 Pressfeed Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait definitions at the seams between pressfeed components.
//!
//! Every trait uses `#[async_trait]` so implementations can be held as
//! `Arc<dyn Trait>` and composed by explicit wrapping.

pub mod repository;
pub mod storage;

pub use repository::Repository;
pub use storage::{Storage, StorageLock};
