// src/exec/mod.rs

//! Work execution layer.
//!
//! - [`work`] defines the [`Work`] trait the scheduler invokes, implemented
//!   for plain closures.
//! - [`command`] provides [`CommandWork`], which runs a shell command, used
//!   for tasks declared in a config file.

pub mod command;
pub mod work;

pub use command::CommandWork;
pub use work::{SharedWork, Work};
