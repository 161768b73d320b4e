//! Terminal interface, output command buffer and key decoding.

pub mod keys;
pub mod output;
pub mod terminal;
