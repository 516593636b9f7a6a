#![forbid(unsafe_code)]

pub mod check;
pub mod cli;
pub mod error;
pub mod rules;
pub mod show;
pub mod source_args;
pub mod util;

pub use cli::run_from_env;
pub use error::{DoctorError, Result};
