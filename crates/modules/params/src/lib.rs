// SPDX-License-Identifier: MIT

//! Parameter store
//!
//! Holds the tunable parameters of the other modules, as `(module, key)`
//! pairs. Parameters are only ever changed by passed `ParamChange`
//! proposals, through [`ParamChangeHandler`](handler::ParamChangeHandler).

pub mod genesis;
pub mod handler;
pub mod module;

mod tables;

pub use self::module::*;

use comgov_core::module::ModuleKind;

pub const KIND: ModuleKind = ModuleKind::new(1);

const LOG_TARGET: &str = "comgov::params";
