// Core infrastructure shared by the compiler and the task engine

pub mod errors;

pub use errors::{CalcError, Result};
