//! Execution order across registration orders and threads.

use std::sync::Arc;
use std::thread;

use hookloop::hooks::{HookRegistry, NotificationReaction};

mod common;
use common::{entries, new_log, recording_callback, RecordingSink};

const WEIGHTS: [u16; 6] = [3, 900, 0, 42, u16::MAX, 17];

/// Deterministic reorderings of `WEIGHTS`: every rotation, forwards and
/// backwards.
fn registration_orders() -> Vec<Vec<u16>> {
    let mut orders = Vec::new();
    for shift in 0..WEIGHTS.len() {
        let mut order = WEIGHTS.to_vec();
        order.rotate_left(shift);
        orders.push(order.clone());
        order.reverse();
        orders.push(order);
    }
    orders
}

fn expected() -> Vec<String> {
    let mut sorted = WEIGHTS.to_vec();
    sorted.sort_by(|a, b| b.cmp(a));
    let notifications = sorted.iter().map(|w| format!("n{w}"));
    let callbacks = sorted.iter().map(|w| format!("c{w}"));
    notifications.chain(callbacks).collect()
}

#[test]
fn test_descending_weight_for_any_registration_order() {
    for order in registration_orders() {
        let registry = HookRegistry::new("ordering", "");
        let log = new_log();

        for &weight in &order {
            registry
                .register_callback(recording_callback(&format!("c{weight}"), weight, &log))
                .unwrap();
            registry
                .register_notification(
                    NotificationReaction::builder()
                        .name(format!("n{weight}"))
                        .sink(RecordingSink {
                            tag: format!("n{weight}"),
                            log: log.clone(),
                        })
                        .weight(weight)
                        .build()
                        .unwrap(),
                )
                .unwrap();
        }

        registry.execute();
        assert_eq!(entries(&log), expected(), "registration order {order:?}");
    }
}

#[test]
fn test_repeated_execution_is_stable() {
    let registry = HookRegistry::new("repeat", "");
    let log = new_log();
    for &weight in &WEIGHTS {
        registry
            .register_callback(recording_callback(&format!("c{weight}"), weight, &log))
            .unwrap();
    }

    registry.execute();
    let first = entries(&log);
    log.lock().unwrap().clear();
    registry.execute();

    assert_eq!(first, entries(&log));
}

#[test]
fn test_concurrent_registration() {
    let registry = Arc::new(HookRegistry::new("threads", ""));
    let log = new_log();

    let workers: Vec<_> = (0..8u16)
        .map(|worker| {
            let registry = registry.clone();
            let log = log.clone();
            thread::spawn(move || {
                for i in 0..25u16 {
                    let weight = worker * 100 + i + 1;
                    registry
                        .register_callback(recording_callback(&format!("{weight}"), weight, &log))
                        .unwrap();
                }
                // Everyone also races for one shared name; exactly one wins.
                let _ = registry.register_callback(recording_callback("shared", 0, &log));
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    assert_eq!(registry.callback_count(), 8 * 25 + 1);

    registry.execute();
    let ran = entries(&log);
    let weights: Vec<u16> = ran.iter().filter_map(|name| name.parse().ok()).collect();
    assert!(weights.windows(2).all(|w| w[0] > w[1]));
    assert_eq!(ran.last().map(String::as_str), Some("shared"));
}
