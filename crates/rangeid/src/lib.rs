#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]

mod allocator;
mod encoder;
mod error;
mod futures;
mod issuer;
mod store;

pub use crate::allocator::*;
pub use crate::encoder::*;
pub use crate::error::*;
pub use crate::futures::*;
pub use crate::issuer::*;
pub use crate::store::*;
