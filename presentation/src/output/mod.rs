//! Terminal output

pub mod console;
