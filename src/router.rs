//! Router assembly
//!
//! [`RouterBuilder`] collects the route configuration, guards and hooks, and
//! wires them into a [`Router`]: the guard hook always runs first among the
//! traversal hooks, followed by the user's hooks in registration order.

#[cfg(feature = "guard")]
use crate::guards::{Guard, GuardHook, GuardRegistry};
use crate::error::RouterError;
use crate::hooks::BoxedHook;
use crate::instruction::{RouterInstruction, RouterInstructionFactory};
use crate::location::{LocationChange, LocationSource};
#[cfg(feature = "guard")]
use crate::route::GuardId;
use crate::route::{Component, RouteNode, RouteRef, Routes};
use crate::traverser::{Match, RouteTraverser, TraversalCandidate};
use crate::{debug_log, info_log};
use std::sync::Arc;

/// Configures a [`Router`]
#[derive(Default)]
pub struct RouterBuilder {
    routes: Routes,
    #[cfg(feature = "guard")]
    guards: GuardRegistry,
    router_hooks: Vec<BoxedHook<LocationChange>>,
    traversal_hooks: Vec<BoxedHook<TraversalCandidate>>,
    instruction_hooks: Vec<BoxedHook<Match>>,
}

impl RouterBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Append top-level routes
    pub fn routes(mut self, routes: Routes) -> Self {
        self.routes.extend(routes);
        self
    }

    /// Append one top-level route
    pub fn route(mut self, route: impl Into<RouteRef>) -> Self {
        self.routes.push(route.into());
        self
    }

    /// Register a guard instance shared by every route naming `id`
    #[cfg(feature = "guard")]
    pub fn guard_singleton<G: Guard>(mut self, id: impl Into<GuardId>, guard: G) -> Self {
        self.guards.register_singleton(id, guard);
        self
    }

    /// Register a factory building a fresh guard per check of `id`
    #[cfg(feature = "guard")]
    pub fn guard_factory<G, F>(mut self, id: impl Into<GuardId>, factory: F) -> Self
    where
        G: Guard,
        F: Fn() -> G + Send + Sync + 'static,
    {
        self.guards.register_factory(id, factory);
        self
    }

    /// Add a hook over location changes, run before traversal
    pub fn router_hook(mut self, hook: BoxedHook<LocationChange>) -> Self {
        self.router_hooks.push(hook);
        self
    }

    /// Add a hook over traversal candidates, run after the guards
    pub fn traversal_hook(mut self, hook: BoxedHook<TraversalCandidate>) -> Self {
        self.traversal_hooks.push(hook);
        self
    }

    /// Add a hook over resolved matches, run before publishing
    pub fn instruction_hook(mut self, hook: BoxedHook<Match>) -> Self {
        self.instruction_hooks.push(hook);
        self
    }

    /// Build the router
    pub fn build(self) -> Router {
        let mut traversal_hooks: Vec<BoxedHook<TraversalCandidate>> = Vec::new();

        #[cfg(feature = "guard")]
        let guards = {
            let registry = Arc::new(self.guards);
            traversal_hooks.push(Arc::new(GuardHook::new(Arc::clone(&registry))));
            registry
        };
        traversal_hooks.extend(self.traversal_hooks);

        info_log!(
            "router built with {} top-level route(s) and {} traversal hook(s)",
            self.routes.len(),
            traversal_hooks.len()
        );

        let traverser = Arc::new(RouteTraverser::new(self.routes).with_hooks(traversal_hooks));
        let instructions = RouterInstructionFactory::new(Arc::clone(&traverser))
            .with_router_hooks(self.router_hooks)
            .with_instruction_hooks(self.instruction_hooks);

        Router {
            traverser,
            instructions,
            #[cfg(feature = "guard")]
            guards,
        }
    }
}

impl std::fmt::Debug for RouterBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouterBuilder")
            .field("routes", &self.routes.len())
            .field("router_hooks", &self.router_hooks.len())
            .field("traversal_hooks", &self.traversal_hooks.len())
            .field("instruction_hooks", &self.instruction_hooks.len())
            .finish_non_exhaustive()
    }
}

/// A configured router
///
/// # Example
///
/// ```
/// use route_traverser::{guard_fn, LocationChange, RouteNode, Router};
///
/// let router = Router::builder()
///     .route(RouteNode::new("/"))
///     .route(RouteNode::new("/admin").guard("staff"))
///     .guard_singleton("staff", guard_fn(|_| async { false }))
///     .build();
///
/// let found = pollster::block_on(router.find(&LocationChange::new("/admin"))).unwrap();
/// assert!(found.is_none());
/// ```
#[derive(Debug, Clone)]
pub struct Router {
    traverser: Arc<RouteTraverser>,
    instructions: RouterInstructionFactory,
    #[cfg(feature = "guard")]
    guards: Arc<GuardRegistry>,
}

impl Router {
    /// Start configuring a router
    pub fn builder() -> RouterBuilder {
        RouterBuilder::new()
    }

    /// Configure and build a router in one call
    ///
    /// ```
    /// use route_traverser::{RouteNode, Router};
    ///
    /// let router = Router::init(|router| {
    ///     router
    ///         .route(RouteNode::new("/"))
    ///         .route(RouteNode::new("/about"))
    /// });
    /// assert_eq!(router.traverser().routes().len(), 2);
    /// ```
    pub fn init<F>(configure: F) -> Self
    where
        F: FnOnce(RouterBuilder) -> RouterBuilder,
    {
        configure(RouterBuilder::new()).build()
    }

    /// The traverser backing this router
    pub fn traverser(&self) -> &Arc<RouteTraverser> {
        &self.traverser
    }

    /// The registered guards
    #[cfg(feature = "guard")]
    pub fn guards(&self) -> &GuardRegistry {
        &self.guards
    }

    /// Resolve a single location without hooks on either side
    pub async fn find(&self, change: &LocationChange) -> Result<Option<Match>, RouterError> {
        self.traverser.find(change).await
    }

    /// Load a matched route's default (`None`) or named payload
    pub async fn load_component(
        &self,
        route: &RouteNode,
        name: Option<&str>,
    ) -> Result<Option<Component>, RouterError> {
        self.traverser.load_component(route, name).await
    }

    /// The factory building instructions for this router
    pub fn instruction_factory(&self) -> &RouterInstructionFactory {
        &self.instructions
    }

    /// Create an instruction stream fed by `source`
    pub fn instruction<S: LocationSource>(&self, source: S) -> RouterInstruction {
        debug_log!("creating router instruction");
        self.instructions.create(source)
    }
}
