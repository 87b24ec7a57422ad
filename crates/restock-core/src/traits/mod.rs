// SPDX-FileCopyrightText: 2026 Restock Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait seams between the pipeline and its collaborators.
//!
//! All traits use `#[async_trait]` for dynamic dispatch compatibility, so the
//! worker pool can hold them as `Arc<dyn Trait>`.

pub mod automation;
pub mod notifier;
pub mod queue;
pub mod sessions;

pub use automation::MoveAutomation;
pub use notifier::Notifier;
pub use queue::TaskQueue;
pub use sessions::SessionStore;
