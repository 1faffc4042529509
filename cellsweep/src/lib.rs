pub mod cli;
pub mod lattice;
mod logging;
pub mod sweep;
pub mod tag;
