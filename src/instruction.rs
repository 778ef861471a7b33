//! The router instruction stream
//!
//! Turns a stream of location changes into a shared stream of [`Match`]es:
//!
//! 1. consecutive changes with the same path are dropped
//! 2. router hooks run on the location changes
//! 3. each change is traversed, and a newer change cancels the traversal in
//!    flight
//! 4. "no match" results and errors are dropped, so the last instruction stays
//! 5. instruction hooks run on the matches
//! 6. the result is published to every subscriber, replaying the latest one
//!
//! Production starts with the first subscriber and stops when the last one is
//! dropped.

use crate::error::RouterError;
use crate::hooks::{BoxedHook, ComposedHook, HookStream};
use crate::location::{LocationChange, LocationSource};
use crate::params::{QueryParams, RouteParams};
use crate::traverser::{Match, RouteTraverser};
use crate::{debug_log, error_log, trace_log};
use futures::future::{self, BoxFuture, Either};
use futures::stream::{self, BoxStream, Fuse};
use futures::{Stream, StreamExt};
use parking_lot::Mutex;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Builds [`RouterInstruction`]s over a shared traverser
#[derive(Clone)]
pub struct RouterInstructionFactory {
    traverser: Arc<RouteTraverser>,
    router_hooks: ComposedHook<LocationChange>,
    instruction_hooks: ComposedHook<Match>,
}

impl RouterInstructionFactory {
    /// Create a factory with no router or instruction hooks
    pub fn new(traverser: Arc<RouteTraverser>) -> Self {
        Self {
            traverser,
            router_hooks: ComposedHook::default(),
            instruction_hooks: ComposedHook::default(),
        }
    }

    /// Hooks applied to location changes before traversal
    pub fn with_router_hooks(mut self, hooks: Vec<BoxedHook<LocationChange>>) -> Self {
        self.router_hooks = ComposedHook::new(hooks);
        self
    }

    /// Hooks applied to matches before they are published
    pub fn with_instruction_hooks(mut self, hooks: Vec<BoxedHook<Match>>) -> Self {
        self.instruction_hooks = ComposedHook::new(hooks);
        self
    }

    /// The traverser every instruction resolves against
    pub fn traverser(&self) -> &Arc<RouteTraverser> {
        &self.traverser
    }

    /// Create an instruction fed by `source`
    ///
    /// Nothing is read from `source` until the instruction is subscribed.
    pub fn create<S: LocationSource>(&self, source: S) -> RouterInstruction {
        let factory = self.clone();
        let source = Arc::new(source);

        RouterInstruction::new(Box::new(move || factory.pipeline(source.changes())))
    }

    fn pipeline(&self, changes: BoxStream<'static, LocationChange>) -> BoxStream<'static, Arc<Match>> {
        let distinct = changes
            .scan(None::<String>, |last, change| {
                let repeated = last.as_deref() == Some(change.path.as_str());
                if repeated {
                    debug_log!("dropping repeated location '{}'", change.path);
                } else {
                    *last = Some(change.path.clone());
                }
                future::ready(Some((!repeated).then_some(change)))
            })
            .filter_map(future::ready)
            .map(Ok)
            .boxed();

        let changes = self.router_hooks.apply(distinct);
        let matches = switch_traverse(changes, Arc::clone(&self.traverser))
            .filter_map(|result| {
                future::ready(match result {
                    Ok(Some(found)) => Some(Ok(found)),
                    Ok(None) => {
                        debug_log!("no route matched, keeping the previous instruction");
                        None
                    }
                    Err(err) => Some(Err(err)),
                })
            })
            .boxed();

        self.instruction_hooks
            .apply(matches)
            .filter_map(|result| {
                future::ready(match result {
                    Ok(found) => Some(Arc::new(found)),
                    Err(err) => {
                        error_log!("Error resolving route instruction: {}", err);
                        None
                    }
                })
            })
            .boxed()
    }
}

impl std::fmt::Debug for RouterInstructionFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouterInstructionFactory")
            .field("traverser", &self.traverser)
            .field("router_hooks", &self.router_hooks.names())
            .field("instruction_hooks", &self.instruction_hooks.names())
            .finish()
    }
}

// ============================================================================
// Switching traversal
// ============================================================================

type Traversal = BoxFuture<'static, Result<Option<Match>, RouterError>>;

struct SwitchState {
    changes: Fuse<HookStream<LocationChange>>,
    pending: Option<Traversal>,
    traverser: Arc<RouteTraverser>,
}

enum Step {
    Change(Option<Result<LocationChange, RouterError>>, Traversal),
    Resolved(Result<Option<Match>, RouterError>),
}

/// Traverse every change, dropping the traversal in flight when a newer
/// change arrives
fn switch_traverse(
    changes: HookStream<LocationChange>,
    traverser: Arc<RouteTraverser>,
) -> HookStream<Option<Match>> {
    let state = SwitchState {
        changes: changes.fuse(),
        pending: None,
        traverser,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            let Some(pending) = state.pending.take() else {
                match state.changes.next().await? {
                    Ok(change) => {
                        trace_log!("traversing '{}'", change.path);
                        state.pending = Some(Arc::clone(&state.traverser).find_owned(change));
                        continue;
                    }
                    Err(err) => return Some((Err(err), state)),
                }
            };

            let step = match future::select(state.changes.next(), pending).await {
                Either::Left((change, pending)) => Step::Change(change, pending),
                Either::Right((result, _)) => Step::Resolved(result),
            };

            match step {
                Step::Resolved(result) => return Some((result, state)),
                Step::Change(Some(Ok(change)), _superseded) => {
                    debug_log!("'{}' supersedes the traversal in flight", change.path);
                    state.pending = Some(Arc::clone(&state.traverser).find_owned(change));
                }
                Step::Change(Some(Err(err)), pending) => {
                    state.pending = Some(pending);
                    return Some((Err(err), state));
                }
                Step::Change(None, pending) => {
                    let result = pending.await;
                    return Some((result, state));
                }
            }
        }
    })
    .boxed()
}

// ============================================================================
// Shared instruction
// ============================================================================

type Producer = Box<dyn Fn() -> BoxStream<'static, Arc<Match>> + Send + Sync>;

struct Connection {
    subscribers: usize,
    driver: Option<JoinHandle<()>>,
}

struct Shared {
    latest: Arc<watch::Sender<Option<Arc<Match>>>>,
    connection: Mutex<Connection>,
    produce: Producer,
}

/// The latest resolved [`Match`], shared by every subscriber
///
/// Cloning is cheap; clones share subscribers and the cached value.
#[derive(Clone)]
pub struct RouterInstruction {
    shared: Arc<Shared>,
}

impl RouterInstruction {
    fn new(produce: Producer) -> Self {
        let (latest, _) = watch::channel(None);
        Self {
            shared: Arc::new(Shared {
                latest: Arc::new(latest),
                connection: Mutex::new(Connection {
                    subscribers: 0,
                    driver: None,
                }),
                produce,
            }),
        }
    }

    /// Subscribe to matches, starting with the current one if any
    ///
    /// The first subscriber starts production on the current tokio runtime.
    /// Outside a runtime nothing is produced: the error is logged, the stream
    /// only sees the cached match, and the next subscription tries again.
    pub fn subscribe(&self) -> InstructionStream {
        self.connect();

        let mut receiver = self.shared.latest.subscribe();
        receiver.mark_changed();
        let inner = stream::unfold(receiver, |mut receiver| async move {
            loop {
                receiver.changed().await.ok()?;
                let current = receiver.borrow_and_update().clone();
                if let Some(current) = current {
                    return Some((current, receiver));
                }
            }
        })
        .boxed();

        InstructionStream {
            inner,
            _subscription: Subscription {
                shared: Arc::clone(&self.shared),
            },
        }
    }

    /// The most recently published match
    pub fn current(&self) -> Option<Arc<Match>> {
        self.shared.latest.borrow().clone()
    }

    /// Number of live subscriptions
    pub fn subscriber_count(&self) -> usize {
        self.shared.connection.lock().subscribers
    }

    /// Route params of every published match
    pub fn route_params(&self) -> BoxStream<'static, RouteParams> {
        self.subscribe()
            .map(|found| found.route_params.clone())
            .boxed()
    }

    /// Query params of every published match
    pub fn query_params(&self) -> BoxStream<'static, QueryParams> {
        self.subscribe()
            .map(|found| found.query_params.clone())
            .boxed()
    }

    fn connect(&self) {
        let mut connection = self.shared.connection.lock();
        connection.subscribers += 1;
        if connection.driver.is_some() {
            return;
        }

        let runtime = match Handle::try_current() {
            Ok(runtime) => runtime,
            Err(err) => {
                error_log!("Cannot start route resolution: {}", err);
                return;
            }
        };

        debug_log!("first subscriber, starting route resolution");
        let mut matches = (self.shared.produce)();
        let latest = Arc::clone(&self.shared.latest);
        connection.driver = Some(runtime.spawn(async move {
            while let Some(found) = matches.next().await {
                trace_log!("publishing instruction for '{}'", found.location_change.path);
                latest.send_replace(Some(found));
            }
        }));
    }
}

impl std::fmt::Debug for RouterInstruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouterInstruction")
            .field("subscribers", &self.subscriber_count())
            .field("current", &self.current())
            .finish()
    }
}

struct Subscription {
    shared: Arc<Shared>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let mut connection = self.shared.connection.lock();
        connection.subscribers -= 1;
        if connection.subscribers == 0 {
            if let Some(driver) = connection.driver.take() {
                debug_log!("last subscriber gone, stopping route resolution");
                driver.abort();
            }
        }
    }
}

/// A subscription to a [`RouterInstruction`]
///
/// Dropping it unsubscribes.
pub struct InstructionStream {
    inner: BoxStream<'static, Arc<Match>>,
    _subscription: Subscription,
}

impl Stream for InstructionStream {
    type Item = Arc<Match>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.poll_next_unpin(cx)
    }
}

impl std::fmt::Debug for InstructionStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstructionStream").finish_non_exhaustive()
    }
}
