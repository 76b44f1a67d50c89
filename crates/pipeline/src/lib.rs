#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `pipeline` spawns and supervises the two cooperating native processes
//! that move a snapshot: `btrfs send` producing a change stream on stdout,
//! piped into `btrfs receive` consuming it. The rest of the toolkit sees
//! only two narrow interfaces: a readable line sequence (when the consumer
//! runs in dump mode) and a joinable combined completion status.
//!
//! # Design
//!
//! The producer's stdout handle is moved into the consumer's stdin during
//! wiring, so the consumer holds the only copy of the pipe's read end.
//! That matters for shutdown: when the consumer exits first, the
//! producer receives SIGPIPE instead of blocking forever on a full pipe.
//!
//! The producer is sometimes observed to die from that SIGPIPE even on
//! successful transfers - an unresolved shutdown race in `btrfs send`, not
//! a failure of the transfer. [`PipelineStatus::success`] therefore accepts
//! a SIGPIPE-terminated producer as long as the consumer exited cleanly.
//!
//! The crate also carries [`run`], a thin command runner that logs each
//! argv before execution, used by the planning layer to drive `btrfs
//! subvolume show`, `zfs`, `rsync` and friends.

pub mod error;
pub mod run;
pub mod send;

pub use error::PipelineError;
pub use send::{PipelineStatus, ReceiveMode, SendPipeline};
