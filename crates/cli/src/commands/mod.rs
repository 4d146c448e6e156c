//! Command implementations.

mod run;
mod validate;

pub use run::run_broadcast;
pub use validate::run_validate;
