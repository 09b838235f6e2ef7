#![warn(unreachable_pub)]

pub mod atom;
pub mod config;
pub mod dep;
mod error;
pub(crate) mod files;
mod macros;
pub mod match_engine;
pub mod tree;
pub(crate) mod types;
pub mod utils;

pub use self::error::{Error, Result};
