// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;

#[test]
fn handlers_run_in_subscription_order() {
    let subscribers = Subscribers::<u32>::new();
    let seen = Arc::new(Mutex::new(Vec::new()));

    for tag in ["a", "b"] {
        let seen = Arc::clone(&seen);
        subscribers.subscribe(move |n: &u32| seen.lock().unwrap().push(format!("{tag}{n}")));
    }
    subscribers.emit(&1);
    subscribers.emit(&2);

    assert_eq!(*seen.lock().unwrap(), ["a1", "b1", "a2", "b2"]);
}

#[test]
fn unsubscribe_stops_delivery() {
    let subscribers = Subscribers::<()>::new();
    let count = Arc::new(AtomicU64::new(0));
    let c = Arc::clone(&count);
    let id = subscribers.subscribe(move |_| {
        c.fetch_add(1, Ordering::SeqCst);
    });

    subscribers.emit(&());
    assert!(subscribers.unsubscribe(id));
    assert!(!subscribers.unsubscribe(id));
    subscribers.emit(&());

    assert_eq!(count.load(Ordering::SeqCst), 1);
    assert!(subscribers.is_empty());
}

#[test]
fn handler_may_subscribe_during_dispatch() {
    let subscribers = Arc::new(Subscribers::<()>::new());
    let inner = Arc::clone(&subscribers);
    subscribers.subscribe(move |_| {
        inner.subscribe(|_| {});
    });

    subscribers.emit(&());
    assert_eq!(subscribers.len(), 2);
}
