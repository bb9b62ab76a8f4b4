pub mod config;
pub mod instruments;
pub mod ledger;
pub mod orders;
pub mod portfolio;

pub use config::*;
pub use instruments::*;
pub use ledger::*;
pub use orders::*;
pub use portfolio::*;

#[cfg(test)]
mod tests;
