use async_trait::async_trait;
use pullstream::*;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::sleep;

/// Sink recording everything that happens to it
#[derive(Clone, Default)]
struct Recorder {
    written: Arc<Mutex<Vec<i32>>>,
    closed: Arc<Mutex<bool>>,
    aborted: Arc<Mutex<Option<StreamError>>>,
    fail_on: Option<i32>,
}

#[async_trait]
impl WritableSink<i32> for Recorder {
    async fn write(&mut self, value: i32) -> StreamResult<()> {
        if self.fail_on == Some(value) {
            return Err(StreamError::Sink(format!("cannot write {}", value)));
        }
        self.written.lock().unwrap().push(value);
        Ok(())
    }

    async fn close(&mut self) -> StreamResult<()> {
        *self.closed.lock().unwrap() = true;
        Ok(())
    }

    async fn abort(&mut self, reason: &StreamError) {
        *self.aborted.lock().unwrap() = Some(reason.clone());
    }
}

#[tokio::test]
async fn test_pipe_to_writes_everything_and_closes() {
    let sink = Recorder::default();
    let summary = from_iter(vec![1, 2, 3]).pipe_to(sink.clone()).await.unwrap();

    assert_eq!(summary, PipeSummary { items_written: 3 });
    assert_eq!(*sink.written.lock().unwrap(), vec![1, 2, 3]);
    assert!(*sink.closed.lock().unwrap());
    assert!(sink.aborted.lock().unwrap().is_none());
}

#[tokio::test]
async fn test_sink_failure_cancels_source() {
    let emitter = EventEmitter::new();
    let sink = Recorder {
        fail_on: Some(2),
        ..Recorder::default()
    };

    let pipe = tokio::spawn(from_event(emitter.clone(), "value").pipe_to(sink.clone()));
    sleep(Duration::from_millis(10)).await;
    assert_eq!(emitter.listener_count("value"), 1);

    emitter.emit("value", 1);
    emitter.emit("value", 2);
    let result = pipe.await.unwrap();

    assert_eq!(result, Err(StreamError::Sink("cannot write 2".to_string())));
    assert_eq!(emitter.listener_count("value"), 0);
    assert_eq!(*sink.written.lock().unwrap(), vec![1]);
    assert_eq!(
        *sink.aborted.lock().unwrap(),
        Some(StreamError::Sink("cannot write 2".to_string()))
    );
    assert!(!*sink.closed.lock().unwrap());
}

#[tokio::test]
async fn test_stream_error_aborts_sink() {
    let sink = Recorder::default();
    let result = from_iter(vec!["4", "five"])
        .try_map(|s| s.parse::<i32>())
        .pipe_to(sink.clone())
        .await;

    assert!(matches!(result, Err(StreamError::Transform { stage: "map", .. })));
    assert!(matches!(
        *sink.aborted.lock().unwrap(),
        Some(StreamError::Transform { stage: "map", .. })
    ));
    assert!(!*sink.closed.lock().unwrap());
}

#[tokio::test]
async fn test_sink_fn_and_for_each() {
    let mut total = 0;
    let summary = from_iter(1..=4)
        .pipe_to(sink_fn(|x: i32| {
            total += x;
            Ok(())
        }))
        .await
        .unwrap();
    assert_eq!(summary.items_written, 4);
    assert_eq!(total, 10);

    let seen = Arc::new(Mutex::new(Vec::new()));
    let summary = from_iter(vec!['a', 'b'])
        .for_each(|c| {
            let seen = seen.clone();
            async move { seen.lock().unwrap().push(c) }
        })
        .await
        .unwrap();
    assert_eq!(summary.items_written, 2);
    assert_eq!(*seen.lock().unwrap(), vec!['a', 'b']);
}

#[tokio::test]
async fn test_pipe_buffers_only_up_to_capacity() {
    let emitter = EventEmitter::new();
    let stream = from_event(emitter.clone(), "value").with_high_water_mark(2);

    let pipe = tokio::spawn(stream.pipe_to(sink_fn(|_: i32| Ok(()))));
    sleep(Duration::from_millis(10)).await;

    // The pipe task gets no turn between emits, so only the queue fills up
    let accepted: usize = (0..10).map(|i| emitter.emit("value", i).accepted).sum();
    assert_eq!(accepted, 2);
    pipe.abort();
}
