#![deny(clippy::dbg_macro)]
#![deny(clippy::print_stderr)]
#![deny(clippy::print_stdout)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]

pub mod cli;
pub mod error;
pub mod lookup;
pub mod mapping;

mod sources;
mod utils;

pub use error::MappingError;
pub use lookup::{LoadReport, LoadStatus, LookupService, TableLocation};
pub use mapping::{Category, ForwardEntry, ForwardTable, ReverseEntry, ReverseTable};
