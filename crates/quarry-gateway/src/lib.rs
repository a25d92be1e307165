#![doc = include_str!("../README.md")]

pub mod gateway;
pub mod record;
pub mod validate;

pub use gateway::Gateway;
pub use record::DocumentRecord;
pub use validate::validate;
