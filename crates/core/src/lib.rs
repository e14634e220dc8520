// SPDX-License-Identifier: MIT

//! Core types of the committee governance state machine
//!
//! Focused on the data model, its validation, encoding and conversions.
//! Nothing here touches the database; the logic operating on these types
//! lives in the modules.

pub mod account;
pub mod bincode;
pub mod block;
pub mod citem;
pub mod committee;
pub mod content;
pub mod module;
pub mod permission;
pub mod proposal;
pub mod ratio;

/// Voting power, in units of bonded stake
pub type Weight = u64;
