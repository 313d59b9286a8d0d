//! gitomatic - Automatic Git Sync
//!
//! A daemon that keeps a working tree and its remote in step: it commits
//! whatever changed locally, pulls what changed remotely and pushes the
//! result, on a fixed interval, forever.
//!
//! # Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                           gitomatic                             │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────────────┐  │
//! │  │    CLI      │  │   Config    │  │     Credential          │  │
//! │  │  (clap)     │─▶│ (immutable) │  │ (basic auth / ssh key)  │  │
//! │  └─────────────┘  └──────┬──────┘  └───────────┬─────────────┘  │
//! │                          │                     │                │
//! │                          ▼                     ▼                │
//! │  ┌─────────────────────────────────────────────────────────────┐│
//! │  │                       Sync Loop                             ││
//! │  │  Pull → Detect → Stage → Commit → Push → Sleep              ││
//! │  └──────────────┬──────────────────────────────┬───────────────┘│
//! │                 │                              │                │
//! │                 ▼                              ▼                │
//! │  ┌─────────────────────────────┐  ┌───────────────────────────┐ │
//! │  │  Repository (git2)          │  │  Clock / Scheduler        │ │
//! │  │  status, index, fetch, push │  │  (chrono, tokio)          │ │
//! │  └─────────────────────────────┘  └───────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod auth;
pub mod changes;
pub mod cli;
pub mod config;
pub mod error;
pub mod git;
pub mod schedule;
pub mod sync;

pub use auth::Credential;
pub use changes::{ChangeKind, ChangeSet, WorktreeState};
pub use config::{Config, Identity};
pub use error::{Error, Result};
pub use git::{GitRepository, PullOutcome, Repository};
pub use sync::{CycleOutcome, CycleReport, Stage, SyncLoop};
