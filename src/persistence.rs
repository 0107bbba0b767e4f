pub mod database;
#[cfg(test)]
pub mod memory;
mod repository;

pub use repository::{Error, Repository};
