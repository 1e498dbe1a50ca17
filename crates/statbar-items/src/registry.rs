//! Item ownership and the update pass.

use std::time::Duration;

use statbar_core::event::DisplayEvent;
use statbar_process::RunContext;
use tracing::warn;

use crate::item::Item;
use crate::wallclock::WallClock;

/// The items of the status line in display order. The order is fixed for the
/// run; an item's position doubles as its event address.
pub struct Registry {
    items: Vec<Item>,
    cycle: u64,
    clock: WallClock,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        // Cycle 0 is spent by the seeding update in `create`; passes here
        // continue above it so drivers see a strictly increasing counter.
        Self { items: Vec::new(), cycle: 1, clock: WallClock::now() }
    }

    pub fn add(&mut self, item: Item) {
        self.items.push(item);
    }

    #[must_use]
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Advance the shared clock and run every due item. Returns the delay
    /// until the earliest timed wake, or `None` when every item is
    /// demand-driven and the loop should block until fd readiness.
    pub fn update_all(&mut self, elapsed_ms: u64, run: &mut RunContext) -> Option<Duration> {
        self.clock.advance(elapsed_ms);

        let clock = &self.clock;
        let cycle = self.cycle;
        let mut earliest: Option<u64> = None;
        for item in &mut self.items {
            if let Some(wake) = item.tick(elapsed_ms, cycle, clock, run) {
                earliest = Some(earliest.map_or(wake, |e| e.min(wake)));
            }
        }
        self.cycle += 1;

        earliest.map(Duration::from_millis)
    }

    /// Route an event to the item it addresses; refreshes and out-of-range
    /// indices are dropped.
    pub fn dispatch(&mut self, event: &DisplayEvent, run: &mut RunContext) {
        let Some(index) = event.item_index() else { return };
        let Ok(index) = usize::try_from(index) else {
            warn!(index, "event addresses a negative item index");
            return;
        };
        match self.items.get_mut(index) {
            Some(item) => item.dispatch(event, run),
            None => warn!(index, "event addresses an item that does not exist"),
        }
    }

    pub fn finish_all(&mut self, run: &mut RunContext) {
        for item in &mut self.items {
            item.finish(run);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::{Driver, ItemBody, ItemError, UpdateContext};
    use statbar_core::event::{Click, POSITION_UNSUPPORTED};
    use statbar_process::StopFlag;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Ticker {
        log: Rc<RefCell<Vec<&'static str>>>,
        tag: &'static str,
        next: Option<Duration>,
    }

    impl Driver for Ticker {
        fn update(
            &mut self,
            _body: &mut ItemBody,
            _cx: &mut UpdateContext<'_>,
        ) -> Result<Option<Duration>, ItemError> {
            self.log.borrow_mut().push(self.tag);
            Ok(self.next)
        }
        fn on_event(
            &mut self,
            body: &mut ItemBody,
            _event: &DisplayEvent,
        ) -> Result<(), ItemError> {
            body.text.push_str("clicked");
            Ok(())
        }
    }

    fn registry_of(drivers: Vec<(&'static str, Option<Duration>)>) -> (Registry, Rc<RefCell<Vec<&'static str>>>) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut registry = Registry::new();
        for (tag, next) in drivers {
            registry.add(Item::new(Box::new(Ticker { log: Rc::clone(&log), tag, next })));
        }
        (registry, log)
    }

    #[test]
    fn earliest_deadline_wins() {
        let (mut registry, _log) = registry_of(vec![
            ("a", Some(Duration::from_millis(500))),
            ("b", Some(Duration::from_millis(200))),
            ("c", None),
        ]);
        let mut run = RunContext::new(StopFlag);
        assert_eq!(
            registry.update_all(0, &mut run),
            Some(Duration::from_millis(200))
        );
    }

    #[test]
    fn all_demand_driven_items_yield_no_deadline() {
        let (mut registry, log) = registry_of(vec![("a", None), ("b", None)]);
        let mut run = RunContext::new(StopFlag);
        assert_eq!(registry.update_all(0, &mut run), None);
        assert_eq!(registry.update_all(50, &mut run), None);
        assert_eq!(*log.borrow(), vec!["a", "b", "a", "b"]);
    }

    #[test]
    fn cycle_values_continue_above_the_seeding_update() {
        struct CycleLog(Rc<RefCell<Vec<u64>>>);
        impl Driver for CycleLog {
            fn update(
                &mut self,
                _body: &mut ItemBody,
                cx: &mut UpdateContext<'_>,
            ) -> Result<Option<Duration>, ItemError> {
                self.0.borrow_mut().push(cx.cycle);
                Ok(None)
            }
        }

        let cycles = Rc::new(RefCell::new(Vec::new()));
        let mut registry = Registry::new();
        registry.add(Item::new(Box::new(CycleLog(Rc::clone(&cycles)))));
        let mut run = RunContext::new(StopFlag);

        registry.update_all(0, &mut run);
        registry.update_all(10, &mut run);
        // Item creation runs its own update at cycle 0; registry passes must
        // never repeat it.
        assert_eq!(*cycles.borrow(), vec![1, 2]);
    }

    #[test]
    fn dispatch_reaches_only_the_addressed_item() {
        let (mut registry, _log) = registry_of(vec![("a", None), ("b", None)]);
        let mut run = RunContext::new(StopFlag);
        let event = DisplayEvent::Click(Click {
            index: 1,
            button: 1,
            position: POSITION_UNSUPPORTED,
        });
        registry.dispatch(&event, &mut run);
        assert_eq!(registry.items()[0].text(), "");
        assert_eq!(registry.items()[1].text(), "clicked");
    }

    #[test]
    fn out_of_range_events_are_dropped() {
        let (mut registry, _log) = registry_of(vec![("a", None)]);
        let mut run = RunContext::new(StopFlag);
        for index in [-3, 7] {
            let event = DisplayEvent::Click(Click {
                index,
                button: 1,
                position: POSITION_UNSUPPORTED,
            });
            registry.dispatch(&event, &mut run);
        }
        assert_eq!(registry.items()[0].text(), "");
    }
}
