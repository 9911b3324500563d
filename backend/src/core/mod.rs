//! Core timing primitives

pub mod time;
