// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! mc-core: Shared types for the motioncam capture node.
//!
//! This crate holds the data model and the durability primitives that the
//! `motioncam` node is built on: the capture artifact, the resolved endpoint,
//! the retained-memory state tier, the wall clock seam and the wire protocol
//! spoken with the backend.

pub mod artifact;
pub mod clock;
pub mod endpoint;
pub mod error;
pub mod protocol;
pub mod retained;

pub use artifact::Artifact;
pub use clock::{FixedClock, SystemWallClock, WallClock};
pub use endpoint::Endpoint;
pub use error::{Error, Result};
pub use protocol::{LoginRequest, LoginResponse, UploadResponse};
pub use retained::{
    FileRetained, MemoryRetained, RetainedMemory, RetainedState, MAX_RETAINED_TOKEN_LEN,
};
