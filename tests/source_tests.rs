use pullstream::*;
use rand::Rng;
use std::time::Duration;
use tokio::time::{sleep, timeout};

/// Let spawned pull loops run until they block
async fn settle() {
    sleep(Duration::from_millis(10)).await;
}

#[tokio::test]
async fn test_from_event_registers_lazily() {
    let emitter: EventEmitter<u32> = EventEmitter::new();
    let mut clicks = from_event(emitter.clone(), "click");
    assert_eq!(emitter.listener_count("click"), 0);
    assert_eq!(emitter.emit("click", 1).accepted, 0);

    clicks.start().unwrap();
    assert_eq!(emitter.listener_count("click"), 1);
    assert_eq!(emitter.emit("click", 2).accepted, 1);
    assert_eq!(emitter.emit("other", 3).accepted, 0);
    assert_eq!(clicks.read().await, Ok(Some(2)));

    clicks.cancel();
    assert_eq!(emitter.listener_count("click"), 0);
    assert_eq!(emitter.emit("click", 4).accepted, 0);
    assert_eq!(clicks.read().await, Ok(None));
}

#[tokio::test]
async fn test_from_event_read_waits_for_event() {
    let emitter: EventEmitter<u32> = EventEmitter::new();
    let mut clicks = from_event(emitter.clone(), "click");

    let pending = timeout(Duration::from_millis(20), clicks.read()).await;
    assert!(pending.is_err(), "read should wait for an event");
    assert_eq!(emitter.listener_count("click"), 1);

    let producer = tokio::spawn({
        let emitter = emitter.clone();
        async move {
            sleep(Duration::from_millis(5)).await;
            emitter.emit("click", 9).accepted
        }
    });
    assert_eq!(clicks.read().await, Ok(Some(9)));
    assert_eq!(producer.await.unwrap(), 1);
}

#[tokio::test]
async fn test_from_event_hands_back_events_when_full() {
    let emitter = EventEmitter::new();
    let mut ticks = from_event(emitter.clone(), "tick").with_high_water_mark(4);
    ticks.start().unwrap();

    let accepted: usize = (0..10).map(|i| emitter.emit("tick", i).accepted).sum();
    assert_eq!(accepted, 4);
    assert_eq!(ticks.stats().length, 4);
    assert_eq!(ticks.desired_size(), 0);

    assert_eq!(ticks.read().await, Ok(Some(0)));
    assert_eq!(ticks.read().await, Ok(Some(1)));
    assert_eq!(emitter.emit("tick", 10).accepted, 1);
    assert_eq!(emitter.emit("tick", 11).accepted, 1);
    assert_eq!(emitter.emit("tick", 12).accepted, 0);

    let mut rest = Vec::new();
    for _ in 0..4 {
        rest.push(ticks.read().await.unwrap().unwrap());
    }
    assert_eq!(rest, vec![2, 3, 10, 11]);
}

#[tokio::test]
async fn test_slow_consumer_loses_nothing() {
    let capacity = 4;
    let emitter = EventEmitter::new();
    let mut ticks = from_event(emitter.clone(), "tick").with_high_water_mark(capacity);
    ticks.start().unwrap();

    let producer = tokio::spawn({
        let emitter = emitter.clone();
        async move {
            let mut refusals = 0;
            for i in 0..100u32 {
                // A well-behaved emitter holds the event until there is room
                while emitter.emit("tick", i).accepted == 0 {
                    refusals += 1;
                    tokio::task::yield_now().await;
                }
            }
            refusals
        }
    });

    let mut received = Vec::new();
    while received.len() < 100 {
        assert!(ticks.stats().length <= capacity);
        let value = ticks.read().await.unwrap().unwrap();
        received.push(value);
        let pause = rand::thread_rng().gen_range(0..3);
        sleep(Duration::from_micros(pause * 500)).await;
    }

    assert_eq!(received, (0..100).collect::<Vec<_>>());
    assert!(producer.await.unwrap() > 0, "producer should have been throttled");
}

#[tokio::test]
async fn test_full_listener_hands_event_back() {
    let emitter = EventEmitter::new();
    let mut slow = from_event(emitter.clone(), "tick").with_high_water_mark(1);
    let mut fast = from_event(emitter.clone(), "tick").with_high_water_mark(8);
    slow.start().unwrap();
    fast.start().unwrap();

    assert!(emitter.emit("tick", 0u32).is_complete());
    let emitted = emitter.emit("tick", 1);
    assert_eq!(emitted.accepted, 1);
    assert_eq!(emitted.rejected.len(), 1);
    let (id, value) = emitted.rejected.into_iter().next().unwrap();
    assert_eq!(value, 1);

    // Still full until the slow stream is read
    let value = match emitter.emit_to(id, value) {
        Delivery::Full(value) => value,
        other => panic!("expected the event back, got {:?}", other),
    };
    assert_eq!(slow.read().await, Ok(Some(0)));
    assert_eq!(emitter.emit_to(id, value), Delivery::Accepted);
    assert_eq!(slow.read().await, Ok(Some(1)));
    assert_eq!(fast.stats().length, 2);

    drop(slow);
    assert!(matches!(emitter.emit_to(id, 2), Delivery::Closed(2)));
}

#[tokio::test]
async fn test_listeners_of_different_capacity_lose_nothing() {
    let emitter = EventEmitter::new();
    let mut slow = from_event(emitter.clone(), "tick").with_high_water_mark(1);
    let mut fast = from_event(emitter.clone(), "tick").with_high_water_mark(8);
    slow.start().unwrap();
    fast.start().unwrap();

    let producer = tokio::spawn({
        let emitter = emitter.clone();
        async move {
            for i in 0..5u32 {
                let mut pending = emitter.emit("tick", i).rejected;
                // Retry only the listeners that handed the event back
                while !pending.is_empty() {
                    tokio::task::yield_now().await;
                    pending = pending
                        .into_iter()
                        .filter_map(|(id, value)| match emitter.emit_to(id, value) {
                            Delivery::Full(value) => Some((id, value)),
                            _ => None,
                        })
                        .collect();
                }
            }
        }
    });

    let mut from_slow = Vec::new();
    for _ in 0..5 {
        from_slow.push(slow.read().await.unwrap().unwrap());
    }
    producer.await.unwrap();
    let mut from_fast = Vec::new();
    for _ in 0..5 {
        from_fast.push(fast.read().await.unwrap().unwrap());
    }

    assert_eq!(from_slow, vec![0, 1, 2, 3, 4]);
    assert_eq!(from_fast, vec![0, 1, 2, 3, 4]);
}

#[tokio::test]
async fn test_listener_limit_is_registration_failure() {
    let emitter: EventEmitter<u32> = EventEmitter::new().with_max_listeners(1);
    let mut first = from_event(emitter.clone(), "click");
    first.start().unwrap();

    let mut second = from_event(emitter.clone(), "click");
    let result = second.read().await;
    assert!(matches!(result, Err(StreamError::Registration { .. })));
    assert_eq!(second.state(), StreamState::Errored);
    assert_eq!(emitter.listener_count("click"), 1);

    // Other event names have their own limit
    let mut other = from_event(emitter.clone(), "keydown");
    assert!(other.start().is_ok());
}

#[tokio::test]
async fn test_each_stream_owns_one_listener() {
    let emitter: EventEmitter<u32> = EventEmitter::new();
    let mut a = from_event(emitter.clone(), "click");
    let mut b = from_event(emitter.clone(), "click");
    a.start().unwrap();
    b.start().unwrap();
    assert_eq!(emitter.listener_count("click"), 2);
    assert_eq!(emitter.emit("click", 1).accepted, 2);

    drop(a);
    assert_eq!(emitter.listener_count("click"), 1);
    assert_eq!(b.read().await, Ok(Some(1)));
}

#[tokio::test(start_paused = true)]
async fn test_interval_emits_and_stops_at_capacity() {
    let mut ticks = interval(Duration::from_millis(10)).with_high_water_mark(2);

    let first = ticks.read().await.unwrap();
    assert!(first.is_some());

    // Nobody reads for a while: the timer must park on the full queue
    sleep(Duration::from_millis(200)).await;
    assert_eq!(ticks.stats().length, 2);

    let second = ticks.read().await.unwrap().unwrap();
    let third = ticks.read().await.unwrap().unwrap();
    assert!(second <= third);

    ticks.cancel();
    assert_eq!(ticks.state(), StreamState::Cancelled);
    assert_eq!(ticks.read().await, Ok(None));
}

#[tokio::test]
async fn test_interval_rejects_zero_period() {
    let mut ticks = interval(Duration::ZERO);
    let result = ticks.read().await;
    assert!(matches!(result, Err(StreamError::Registration { .. })));
}

#[test]
fn test_interval_needs_runtime() {
    let mut ticks = interval(Duration::from_secs(1));
    assert!(matches!(ticks.start(), Err(StreamError::Registration { .. })));
}

#[tokio::test]
async fn test_from_iter_respects_capacity() {
    let mut numbers = from_iter(0..50).with_high_water_mark(3);
    numbers.start().unwrap();
    settle().await;
    assert_eq!(numbers.stats().length, 3);

    let mut all = Vec::new();
    while let Some(value) = numbers.read().await.unwrap() {
        assert!(numbers.stats().length <= 3);
        all.push(value);
    }
    assert_eq!(all, (0..50).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_from_stream_adapts_futures_streams() {
    let source = futures_util::stream::iter(vec!["a", "b"]);
    assert_eq!(from_stream(source).collect().await, Ok(vec!["a", "b"]));
}
