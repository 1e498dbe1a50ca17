#![forbid(unsafe_code)]

//! Core: markup text model, display events, `%spec` substitution, and the
//! key=value option-line tokenizer shared by display drivers and the
//! configuration reader.

pub mod event;
pub mod format;
pub mod markup;
pub mod options;
