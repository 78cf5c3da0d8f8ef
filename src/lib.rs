#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![no_std]

pub use vg_cfg as cfg;
pub use vg_ptr as ptr;

pub use vg_ptr::{ObserverPtr, OwningPtr};
