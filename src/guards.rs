//! Route guards
//!
//! Guards decide whether a candidate route may be traversed. They run as a
//! traversal hook: every guard a route names is resolved from the
//! [`GuardRegistry`], all of them are checked concurrently, and the candidate
//! survives only if every check passes. A failed check rejects the candidate
//! (its `route` is cleared) and traversal moves on to the next sibling.

use crate::error::RouterError;
use crate::hooks::{Hook, HookStream};
use crate::route::GuardId;
use crate::traverser::TraversalCandidate;
use crate::{debug_log, trace_log, warn_log};
use futures::future::{self, BoxFuture};
use futures::{FutureExt, StreamExt};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

/// Trait for route guards
///
/// # Example
///
/// ```
/// use futures::future::BoxFuture;
/// use futures::FutureExt;
/// use route_traverser::{Guard, TraversalCandidate};
///
/// struct RequireQueryToken;
///
/// impl Guard for RequireQueryToken {
///     fn protect_route(&self, candidate: &TraversalCandidate) -> BoxFuture<'static, bool> {
///         let allowed = candidate.query_params.contains("token");
///         async move { allowed }.boxed()
///     }
///
///     fn name(&self) -> &str {
///         "RequireQueryToken"
///     }
/// }
/// ```
pub trait Guard: Send + Sync + 'static {
    /// Decide whether `candidate` may be traversed
    ///
    /// The future must not borrow the candidate; copy what the check needs.
    fn protect_route(&self, candidate: &TraversalCandidate) -> BoxFuture<'static, bool>;

    /// Guard name (for debugging and error messages)
    fn name(&self) -> &str {
        "Guard"
    }
}

/// Shared guard handle
pub type SharedGuard = Arc<dyn Guard>;

/// Produces a fresh guard instance per resolution
pub type GuardFactory = Arc<dyn Fn() -> SharedGuard + Send + Sync>;

/// Create a guard from a closure returning a future
///
/// # Example
///
/// ```
/// use route_traverser::guard_fn;
///
/// let admin_only = guard_fn(|candidate| {
///     let is_admin = candidate.route_params.get("role") == Some("admin");
///     async move { is_admin }
/// });
/// ```
pub fn guard_fn<F, Fut>(f: F) -> FnGuard<F>
where
    F: Fn(&TraversalCandidate) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = bool> + Send + 'static,
{
    FnGuard { f }
}

/// Guard created from a function or closure
pub struct FnGuard<F> {
    f: F,
}

impl<F, Fut> Guard for FnGuard<F>
where
    F: Fn(&TraversalCandidate) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = bool> + Send + 'static,
{
    fn protect_route(&self, candidate: &TraversalCandidate) -> BoxFuture<'static, bool> {
        (self.f)(candidate).boxed()
    }
}

/// Inverts a guard
///
/// Useful for routes that only make sense when a condition does NOT hold,
/// like a login page for users who are not signed in.
pub struct NotGuard {
    guard: SharedGuard,
}

impl NotGuard {
    /// Create a new NOT guard
    pub fn new<G: Guard>(guard: G) -> Self {
        Self {
            guard: Arc::new(guard),
        }
    }

    /// Create from a shared guard
    pub fn from_shared(guard: SharedGuard) -> Self {
        Self { guard }
    }
}

impl Guard for NotGuard {
    fn protect_route(&self, candidate: &TraversalCandidate) -> BoxFuture<'static, bool> {
        self.guard.protect_route(candidate).map(|allowed| !allowed).boxed()
    }

    fn name(&self) -> &str {
        "NotGuard"
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Maps guard identifiers to guard instances
///
/// A singleton registration is shared by every resolution. Otherwise a
/// registered factory builds a fresh instance each time. An identifier with
/// neither is a configuration error.
#[derive(Clone, Default)]
pub struct GuardRegistry {
    singletons: HashMap<GuardId, SharedGuard>,
    factories: HashMap<GuardId, GuardFactory>,
}

impl GuardRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a shared instance
    pub fn register_singleton<G: Guard>(&mut self, id: impl Into<GuardId>, guard: G) {
        self.singletons.insert(id.into(), Arc::new(guard));
    }

    /// Register a factory producing a fresh instance per resolution
    pub fn register_factory<G, F>(&mut self, id: impl Into<GuardId>, factory: F)
    where
        G: Guard,
        F: Fn() -> G + Send + Sync + 'static,
    {
        self.factories.insert(
            id.into(),
            Arc::new(move || Arc::new(factory()) as SharedGuard),
        );
    }

    /// Resolve an identifier: singleton first, then factory
    pub fn resolve(&self, id: &GuardId) -> Result<SharedGuard, RouterError> {
        if let Some(guard) = self.singletons.get(id) {
            return Ok(Arc::clone(guard));
        }

        match self.factories.get(id) {
            Some(factory) => Ok(factory()),
            None => Err(RouterError::GuardNotRegistered { id: id.clone() }),
        }
    }

    /// Whether `id` can be resolved
    pub fn contains(&self, id: &GuardId) -> bool {
        self.singletons.contains_key(id) || self.factories.contains_key(id)
    }

    /// Number of registered identifiers
    pub fn len(&self) -> usize {
        self.singletons.len()
            + self
                .factories
                .keys()
                .filter(|id| !self.singletons.contains_key(*id))
                .count()
    }

    /// Whether nothing is registered
    pub fn is_empty(&self) -> bool {
        self.singletons.is_empty() && self.factories.is_empty()
    }
}

impl std::fmt::Debug for GuardRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuardRegistry")
            .field("singletons", &self.singletons.keys().collect::<Vec<_>>())
            .field("factories", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

// ============================================================================
// GuardHook
// ============================================================================

/// Traversal hook that enforces the guards each candidate's route names
#[derive(Debug, Clone)]
pub struct GuardHook {
    registry: Arc<GuardRegistry>,
}

impl GuardHook {
    /// Create a hook resolving guards from `registry`
    pub fn new(registry: Arc<GuardRegistry>) -> Self {
        Self { registry }
    }

    /// Check one candidate
    ///
    /// Resolution happens before any guard runs, so an unknown identifier
    /// fails the candidate without invoking the others.
    pub async fn evaluate(
        &self,
        candidate: TraversalCandidate,
    ) -> Result<TraversalCandidate, RouterError> {
        evaluate_guards(&self.registry, candidate).await
    }
}

async fn evaluate_guards(
    registry: &GuardRegistry,
    candidate: TraversalCandidate,
) -> Result<TraversalCandidate, RouterError> {
    let Some(route) = candidate.route.as_ref() else {
        return Ok(candidate);
    };

    if route.guards.is_empty() {
        return Ok(candidate);
    }

    let guards = route
        .guards
        .iter()
        .map(|id| registry.resolve(id))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| {
            warn_log!("route '{}' names an unknown guard: {}", route.path, err);
            err
        })?;

    trace_log!(
        "checking {} guard(s) for route '{}'",
        guards.len(),
        route.path
    );

    // Every check runs to completion; there is no short-circuit on the first `false`.
    let outcomes =
        future::join_all(guards.iter().map(|guard| guard.protect_route(&candidate))).await;

    if outcomes.iter().all(|allowed| *allowed) {
        Ok(candidate)
    } else {
        debug_log!("guard rejected route '{}'", route.path);
        Ok(candidate.reject())
    }
}

impl Hook<TraversalCandidate> for GuardHook {
    fn apply(&self, input: HookStream<TraversalCandidate>) -> HookStream<TraversalCandidate> {
        let registry = Arc::clone(&self.registry);
        input
            .then(move |candidate| {
                let registry = Arc::clone(&registry);
                async move { evaluate_guards(&registry, candidate?).await }
            })
            .boxed()
    }

    fn name(&self) -> &str {
        "GuardHook"
    }
}
