// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
// Enable coverage(off) attribute for excluding test infrastructure
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Adapters for external I/O: VCS worktrees, child processes, resource
//! sampling, and message delivery.

pub mod delivery;
pub mod process;
pub mod resource;
pub mod subprocess;
pub mod vcs;

pub use delivery::{DeliveryOutcome, DeliverySubscriber};
pub use process::{
    ExitStatus, NativeProcessAdapter, OutputLine, ProcessAdapter, ProcessError, ProcessSpawnConfig,
};
pub use resource::{ProcFsSampler, ResourceSampler, Sample, SampleError};
pub use vcs::{DiffHunk, ExportOutcome, FileDiff, GitVcsAdapter, VcsAdapter, VcsError, WorktreeInfo};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use delivery::{DeliveryCall, FakeDeliverySubscriber};
#[cfg(any(test, feature = "test-support"))]
pub use process::{FakeProcessAdapter, ProcessCall};
#[cfg(any(test, feature = "test-support"))]
pub use resource::FakeResourceSampler;
#[cfg(any(test, feature = "test-support"))]
pub use vcs::{FakeVcsAdapter, VcsCall};
