pub mod codec;
pub mod core;
pub mod errors;
pub mod exchange;
pub mod types;


pub use errors::*;
