//! ckdctl library - exposes modules for testing

pub mod commands;
pub mod input;
pub mod output;
