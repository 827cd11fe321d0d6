//! Component B: the event bus and debounce coordinator (spec §4.B).

use std::sync::atomic::{AtomicU64, Ordering};

type HandlerId = u64;

/// A simple pub/sub event. Handlers run in subscription order;
/// unsubscription removes by identity token, not by index, so concurrent
/// unsubscribes never race against each other the way an index-based
/// splice would (spec §9 "Unsubscribe token correctness").
pub struct Event<T> {
    handlers: Vec<(HandlerId, Box<dyn FnMut(&T) + Send>)>,
    next_id: AtomicU64,
}

/// An opaque handle returned by [`Event::subscribe`]; pass it to
/// [`Event::unsubscribe`] to remove the handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subscription(HandlerId);

impl<T> Default for Event<T> {
    fn default() -> Self {
        Event { handlers: Vec::new(), next_id: AtomicU64::new(1) }
    }
}

impl<T> Event<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, handler: impl FnMut(&T) + Send + 'static) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.handlers.push((id, Box::new(handler)));
        Subscription(id)
    }

    pub fn unsubscribe(&mut self, token: Subscription) {
        self.handlers.retain(|(id, _)| *id != token.0);
    }

    /// Invoke every handler, in subscription order, with `arg`.
    ///
    /// Re-entrant `trigger` calls during a handler are permitted — the
    /// snapshot of handler ids taken at the start of this call means a
    /// handler newly subscribed by a nested `trigger` won't fire for the
    /// in-flight one, matching spec's re-entrancy rule.
    pub fn trigger(&mut self, arg: &T) {
        let ids: Vec<HandlerId> = self.handlers.iter().map(|(id, _)| *id).collect();
        for id in ids {
            if let Some((_, handler)) = self.handlers.iter_mut().find(|(hid, _)| *hid == id) {
                handler(arg);
            }
        }
    }
}

/// Component B: per-key debounced dispatch.
///
/// `handle` records an event and (re)schedules `handler` to fire after
/// `wait` of quiescence; any prior pending fire is cancelled. This crate
/// is single-threaded cooperative (spec §5), so "scheduling" is modeled
/// as a pending-event slot plus a deadline that the debounce coordinator
/// (component J) polls — there is no background timer thread, matching
/// spec's note that the pending event is owned directly rather than
/// captured ambiguously through `this`.
pub struct Debounce<T> {
    handler: Box<dyn FnMut(&T) + Send>,
    wait: std::time::Duration,
    pending: Option<(T, std::time::Instant)>,
}

impl<T> Debounce<T> {
    pub fn new(handler: impl FnMut(&T) + Send + 'static, wait: std::time::Duration) -> Self {
        Debounce { handler: Box::new(handler), wait, pending: None }
    }

    /// Record `event`, pushing the fire deadline `wait` into the future.
    pub fn handle(&mut self, event: T) {
        let deadline = std::time::Instant::now() + self.wait;
        self.pending = Some((event, deadline));
    }

    /// Update the debounce interval; takes effect on the next `handle`.
    pub fn set_wait(&mut self, wait: std::time::Duration) {
        self.wait = wait;
    }

    /// True when a pending event's deadline has passed.
    pub fn is_due(&self, now: std::time::Instant) -> bool {
        matches!(&self.pending, Some((_, deadline)) if now >= *deadline)
    }

    /// Fire the pending event immediately, if any, clearing it.
    pub fn flush(&mut self) {
        if let Some((event, _)) = self.pending.take() {
            (self.handler)(&event);
        }
    }

    /// Fire only if the deadline has passed; no-op otherwise.
    pub fn tick(&mut self, now: std::time::Instant) {
        if self.is_due(now) {
            self.flush();
        }
    }

    /// Cancel any pending event without firing it.
    pub fn clear(&mut self) {
        self.pending = None;
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn handlers_fire_in_subscription_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut ev: Event<i32> = Event::new();
        let log1 = log.clone();
        ev.subscribe(move |v| log1.lock().unwrap().push(("a", *v)));
        let log2 = log.clone();
        ev.subscribe(move |v| log2.lock().unwrap().push(("b", *v)));
        ev.trigger(&1);
        assert_eq!(*log.lock().unwrap(), vec![("a", 1), ("b", 1)]);
    }

    #[test]
    fn unsubscribe_removes_by_identity() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut ev: Event<i32> = Event::new();
        let log1 = log.clone();
        let tok_a = ev.subscribe(move |v| log1.lock().unwrap().push(("a", *v)));
        let log2 = log.clone();
        ev.subscribe(move |v| log2.lock().unwrap().push(("b", *v)));
        ev.unsubscribe(tok_a);
        ev.trigger(&1);
        assert_eq!(*log.lock().unwrap(), vec![("b", 1)]);
    }

    #[test]
    fn debounce_fires_latest_after_quiescence() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let log1 = log.clone();
        let mut d = Debounce::new(move |v: &i32| log1.lock().unwrap().push(*v), std::time::Duration::from_millis(50));
        d.handle(1);
        d.handle(2);
        d.handle(3);
        assert!(!d.is_due(std::time::Instant::now()));
        d.flush();
        assert_eq!(*log.lock().unwrap(), vec![3]);
    }

    #[test]
    fn clear_cancels_without_firing() {
        let mut fired = false;
        let mut d = Debounce::new(|_: &i32| {}, std::time::Duration::from_millis(10));
        d.handle(1);
        d.clear();
        d.flush();
        let _ = &mut fired;
        assert!(!d.has_pending());
    }
}
