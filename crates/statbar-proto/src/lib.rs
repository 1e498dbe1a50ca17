#![forbid(unsafe_code)]

//! Wire protocol decoders for inbound click events.
//!
//! Both decoders are byte-at-a-time state machines with O(1) state: they
//! tolerate input split arbitrarily across reads (including a read returning
//! `WouldBlock` mid-token) and emit at most one event per completed token.
//! Feed bytes as they arrive; any partially decoded state is carried to the
//! next call.

pub mod bar;
pub mod line;

pub use bar::BarDecoder;
pub use line::LineDecoder;
