#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `plan` decides what to transfer before any bytes move. It inventories
//! snapshots on both sides, verifies that the shared parent snapshot really
//! finished transferring, and produces ordered transfer plans:
//!
//! - [`subvolume`] parses `btrfs subvolume show` output and checks that a
//!   remote parent carries the local parent's UUID as its Received UUID.
//! - [`remote`] picks the one mounted remote out of the configured
//!   candidates.
//! - [`sendplan`] orders the btrfs snapshots still missing from the remote.
//! - [`zfs`] inventories ZFS snapshots by pool and filesystem.
//! - [`year_month`] picks one source snapshot per `YYYY-MM` for the mirror
//!   flow.
//!
//! All external tool invocations go through [`pipeline::run`], so every
//! command is logged before it runs.

pub mod error;
pub mod remote;
pub mod sendplan;
pub mod subvolume;
pub mod year_month;
pub mod zfs;

pub use error::PlanError;
