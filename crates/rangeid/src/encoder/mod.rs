mod error;
mod sqids;

pub use error::*;
pub use sqids::*;
