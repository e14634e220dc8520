// SPDX-License-Identifier: MIT

//! Committee governance module
//!
//! Committees are groups with bounded authority: they can pass proposals,
//! but only for content their permissions allow. Proposals are voted on
//! until their deadline, then tallied and, if passed and still permitted,
//! executed through the [`ProposalRouter`](comgov_module::router::ProposalRouter).

pub mod citem;
pub mod effects;
pub mod error;
pub mod genesis;
pub mod handlers;
pub mod module;
pub mod tally;

mod resolve;
mod tables;

pub use self::module::*;

use comgov_core::module::ModuleKind;

pub const KIND: ModuleKind = ModuleKind::new(0);

const LOG_TARGET: &str = "comgov::committee";

#[cfg(test)]
mod tests;
