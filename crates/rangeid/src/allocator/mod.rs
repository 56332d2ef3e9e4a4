mod atomic;
mod config;
mod status;
#[cfg(all(test, feature = "async-tokio"))]
mod tests;

pub use atomic::*;
pub use config::*;
pub use status::*;
