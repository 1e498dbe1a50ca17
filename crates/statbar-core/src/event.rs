#![forbid(unsafe_code)]

//! Display events delivered from a display driver back to the items.

/// Sentinel for a click position the wire format cannot report.
pub const POSITION_UNSUPPORTED: i32 = -1;

/// A pointer click on one item of the rendered line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Click {
    /// Index of the clicked item, as addressed by the display order.
    pub index: i32,
    /// Button number, 1-3 for left/middle/right.
    pub button: i32,
    /// Character position inside the item text, or [`POSITION_UNSUPPORTED`].
    pub position: i32,
}

/// Event produced by a display driver's poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayEvent {
    /// An item was clicked.
    Click(Click),
    /// The display asks for an immediate redraw. The loop redraws every
    /// iteration anyway, so this carries no payload.
    Refresh,
}

impl DisplayEvent {
    /// The item index this event addresses, if any.
    #[must_use]
    pub fn item_index(&self) -> Option<i32> {
        match self {
            Self::Click(click) => Some(click.index),
            Self::Refresh => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn click_addresses_item() {
        let ev = DisplayEvent::Click(Click { index: 2, button: 1, position: POSITION_UNSUPPORTED });
        assert_eq!(ev.item_index(), Some(2));
        assert_eq!(DisplayEvent::Refresh.item_index(), None);
    }
}
