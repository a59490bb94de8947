//! Event sources: adapt a push-based emitter into a pull stream

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::{StreamError, StreamResult};
use crate::pull_stream::{PullStream, Source};
use crate::queue::{Controller, TryEnqueueError};

/// What a listener did with an event it was offered
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery<E> {
    /// The event was queued
    Accepted,
    /// The stream is at capacity; the event is handed back so the emitter
    /// can retry later instead of losing it
    Full(E),
    /// The stream no longer accepts events
    Closed(E),
}

/// Callback registered with an [`EventTarget`]
pub type Listener<E> = Arc<dyn Fn(E) -> Delivery<E> + Send + Sync>;

/// A push-based emitter with named events, in the manner of a DOM event target
pub trait EventTarget: Send + Sync + 'static {
    type Event: Send + 'static;
    /// Handle identifying one registered listener
    type Registration: Send + 'static;

    fn add_event_listener(
        &self,
        event: &str,
        listener: Listener<Self::Event>,
    ) -> StreamResult<Self::Registration>;

    fn remove_event_listener(&self, registration: Self::Registration);
}

struct EventSource<T>
where
    T: EventTarget,
{
    target: T,
    event: String,
    registration: Option<T::Registration>,
}

impl<T> Source<T::Event> for EventSource<T>
where
    T: EventTarget,
{
    fn start(&mut self, controller: Controller<T::Event>) -> StreamResult<()> {
        let listener: Listener<T::Event> =
            Arc::new(move |event| match controller.try_enqueue(event) {
                Ok(()) => Delivery::Accepted,
                Err(TryEnqueueError::Full(event)) => Delivery::Full(event),
                Err(TryEnqueueError::Closed(event)) => Delivery::Closed(event),
            });
        let registration = self.target.add_event_listener(&self.event, listener)?;
        log::debug!("from_event: listening for {:?}", self.event);
        self.registration = Some(registration);
        Ok(())
    }

    fn cancel(&mut self) {
        if let Some(registration) = self.registration.take() {
            self.target.remove_event_listener(registration);
            log::debug!("from_event: stopped listening for {:?}", self.event);
        }
    }
}

/// Stream of every `event` emitted by `target`.
///
/// Nothing is registered until the stream is first read; the single listener
/// is removed when the stream is cancelled or dropped.
pub fn from_event<T>(target: T, event: impl Into<String>) -> PullStream<T::Event>
where
    T: EventTarget,
{
    let event = event.into();
    PullStream::new(EventSource {
        target,
        event: event.clone(),
        registration: None,
    })
    .with_label(format!("from_event({})", event))
}

/// Outcome of [`EventEmitter::emit`]
#[derive(Debug)]
pub struct Emitted<E> {
    /// Number of listeners that queued the event
    pub accepted: usize,
    /// Listeners at capacity, each with its copy of the event
    pub rejected: Vec<(ListenerId, E)>,
}

impl<E> Emitted<E> {
    /// Every listener queued the event
    pub fn is_complete(&self) -> bool {
        self.rejected.is_empty()
    }
}

/// Identifies a listener registered with an [`EventEmitter`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

struct Registered<E> {
    id: ListenerId,
    event: String,
    listener: Listener<E>,
}

struct EmitterInner<E> {
    next_id: u64,
    listeners: Vec<Registered<E>>,
    max_listeners: Option<usize>,
}

/// In-process [`EventTarget`]; clones share the same listener table
pub struct EventEmitter<E> {
    inner: Arc<Mutex<EmitterInner<E>>>,
}

impl<E> Clone for EventEmitter<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E> Default for EventEmitter<E>
where
    E: Clone + Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<E> EventEmitter<E>
where
    E: Clone + Send + 'static,
{
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(EmitterInner {
                next_id: 0,
                listeners: Vec::new(),
                max_listeners: None,
            })),
        }
    }

    /// Reject registrations beyond `max` listeners per event name
    pub fn with_max_listeners(self, max: usize) -> Self {
        self.lock().max_listeners = Some(max);
        self
    }

    fn lock(&self) -> MutexGuard<'_, EmitterInner<E>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Offer `value` to every listener of `event`.
    ///
    /// Listeners at capacity hand their copy back in [`Emitted::rejected`];
    /// retry those with [`emit_to`](Self::emit_to) once their streams drain.
    pub fn emit(&self, event: &str, value: E) -> Emitted<E> {
        let listeners: Vec<(ListenerId, Listener<E>)> = self
            .lock()
            .listeners
            .iter()
            .filter(|registered| registered.event == event)
            .map(|registered| (registered.id, Arc::clone(&registered.listener)))
            .collect();

        let mut emitted = Emitted {
            accepted: 0,
            rejected: Vec::new(),
        };
        for (id, listener) in listeners {
            match listener(value.clone()) {
                Delivery::Accepted => emitted.accepted += 1,
                Delivery::Full(value) => emitted.rejected.push((id, value)),
                // The stream is going away along with its listener
                Delivery::Closed(_) => {}
            }
        }
        emitted
    }

    /// Offer `value` to one listener, typically to retry a rejected delivery.
    /// A listener that is no longer registered reports `Closed`.
    pub fn emit_to(&self, id: ListenerId, value: E) -> Delivery<E> {
        let listener = self
            .lock()
            .listeners
            .iter()
            .find(|registered| registered.id == id)
            .map(|registered| Arc::clone(&registered.listener));
        match listener {
            Some(listener) => listener(value),
            None => Delivery::Closed(value),
        }
    }

    pub fn listener_count(&self, event: &str) -> usize {
        self.lock()
            .listeners
            .iter()
            .filter(|registered| registered.event == event)
            .count()
    }
}

impl<E> EventTarget for EventEmitter<E>
where
    E: Clone + Send + 'static,
{
    type Event = E;
    type Registration = ListenerId;

    fn add_event_listener(&self, event: &str, listener: Listener<E>) -> StreamResult<ListenerId> {
        let mut inner = self.lock();
        if let Some(max) = inner.max_listeners {
            let registered = inner
                .listeners
                .iter()
                .filter(|registered| registered.event == event)
                .count();
            if registered >= max {
                return Err(StreamError::registration(
                    format!("listener for {:?}", event),
                    format!("limit of {} listeners reached", max),
                ));
            }
        }
        let id = ListenerId(inner.next_id);
        inner.next_id += 1;
        inner.listeners.push(Registered {
            id,
            event: event.to_string(),
            listener,
        });
        Ok(id)
    }

    fn remove_event_listener(&self, registration: ListenerId) {
        self.lock()
            .listeners
            .retain(|registered| registered.id != registration);
    }
}

impl<E> fmt::Debug for EventEmitter<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("EventEmitter")
            .field("listeners", &inner.listeners.len())
            .field("max_listeners", &inner.max_listeners)
            .finish()
    }
}
