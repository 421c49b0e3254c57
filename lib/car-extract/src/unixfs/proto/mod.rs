// Automatically generated mod.rs
pub mod unixfs;
