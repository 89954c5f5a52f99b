//! Command implementations.

mod run;
mod validate;

pub use run::run_session;
pub use validate::run_validate;
