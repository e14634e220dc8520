// SPDX-License-Identifier: MIT

//! Interface between the host application and the modules of the state
//! machine

pub mod effect;
pub mod module;
pub mod router;
pub mod stake;
