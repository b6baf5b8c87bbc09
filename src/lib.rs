//! # What is This?
//!
//! `kiln` is the resource-lifetime core of a real-time application. It loads,
//! shares and hot-reloads decoded media files ("assets") and rectangular
//! sub-views carved out of them ("sprites"), while a background poller watches
//! the backing files for edits and schedules safe reloads.
//!
//! The crate is built from three pieces:
//!
//! - `watch::Watcher` polls registered file paths on a background thread and
//!   reports modifications through per-scope callbacks.
//! - `assets::AssetSystem` owns two reference-counted slot tables (assets and
//!   sprites), the manifest-derived lookup tables describing how to load and
//!   derive each resource, and a thread-safe inbox of pending file changes
//!   fed by one watch scope.
//! - `video::Device` is the seam towards the GPU/decoder collaborator. A
//!   headless implementation ships for tests and CI.
//!
//! The concurrency contract is deliberately narrow: the poll thread only ever
//! *pushes* paths into the inbox, and all cache mutation happens on the
//! owning thread when it calls `AssetSystem::drain_reloads` once per frame.

#[macro_use]
extern crate failure;
#[macro_use]
extern crate log;
#[macro_use]
extern crate serde;

#[macro_use]
pub mod utils;
pub mod errors;
pub mod video;
pub mod watch;
pub mod assets;

pub mod prelude;
