#![forbid(unsafe_code)]

//! Status line items.
//!
//! An item is one independently scheduled segment of the status line: a text
//! buffer plus a driver that refreshes it. The [`Registry`] owns the items in
//! display order, runs the accumulated-delay update engine, and routes display
//! events to the item they address. Built-in drivers: clock, cpu, memory,
//! network, command.

pub mod clock;
pub mod command;
pub mod cpu;
pub mod item;
pub mod memory;
pub mod network;
pub mod registry;
pub mod wallclock;

pub use item::{Driver, Item, ItemBody, ItemError, UpdateContext, create};
pub use registry::Registry;
pub use wallclock::WallClock;
