#![allow(missing_docs)]

pub mod error;
pub mod model;
pub mod preset;
