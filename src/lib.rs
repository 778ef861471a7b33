//! # Route Traverser
//!
//! Asynchronous resolution of navigation locations against a nested route
//! tree, with support for:
//!
//! - **Nested Routing** - Depth-first matching with ordered backtracking across siblings
//! - **Lazy Loading** - Children, index nodes and payloads supplied by async factories
//! - **Route Guards** - Identifier-based guards resolved from a registry, checked concurrently
//! - **Hooks** - Stream transforms before traversal, per candidate node and after matching
//! - **Instructions** - A deduplicated, cancel-on-supersede stream of matches shared by all subscribers
//!
//! # Quick Start
//!
//! ```
//! use route_traverser::{LocationChange, RouteNode, Router};
//!
//! let router = Router::builder()
//!     .route(
//!         RouteNode::new("/")
//!             .component("Layout")
//!             .index(RouteNode::pathless().component("Home").into())
//!             .children(vec![
//!                 RouteNode::new("users/:id").component("UserDetail").into(),
//!             ]),
//!     )
//!     .build();
//!
//! let found = pollster::block_on(router.find(&LocationChange::new("/users/42?tab=posts")))
//!     .unwrap()
//!     .unwrap();
//!
//! assert_eq!(found.paths(), vec!["/", "users/:id"]);
//! assert_eq!(found.route_params.get("id"), Some("42"));
//! assert_eq!(found.query_params.get("tab"), Some("posts"));
//! ```
//!
//! # Instructions
//!
//! A [`RouterInstruction`] follows a [`LocationSource`] and publishes the
//! latest [`Match`]. Every subscriber sees the same value:
//!
//! ```no_run
//! use futures::StreamExt;
//! use route_traverser::{LocationChannel, RouteNode, Router};
//!
//! # async fn run() {
//! let router = Router::builder().route(RouteNode::new("/inbox")).build();
//! let location = LocationChannel::new("/inbox");
//! let instruction = router.instruction(location.clone());
//!
//! let mut matches = instruction.subscribe();
//! while let Some(found) = matches.next().await {
//!     println!("render {:?}", found.paths());
//! }
//! # }
//! ```
//!
//! # Route Guards
//!
//! Routes name guards by identifier; the router resolves them when traversal
//! reaches the route:
//!
//! ```
//! use route_traverser::{guard_fn, LocationChange, RouteNode, Router};
//!
//! let router = Router::builder()
//!     .route(RouteNode::new("/admin").guard("auth"))
//!     .route(RouteNode::new("/:page"))
//!     .guard_singleton("auth", guard_fn(|_| async { false }))
//!     .build();
//!
//! // the guarded route is skipped and its sibling matches instead
//! let found = pollster::block_on(router.find(&LocationChange::new("/admin")))
//!     .unwrap()
//!     .unwrap();
//! assert_eq!(found.route_params.get("page"), Some("admin"));
//! ```
//!
//! # Feature Flags
//!
//! - `log` (default) - Uses the standard `log` crate for logging
//! - `tracing` - Uses the `tracing` crate for structured logging (mutually exclusive with `log`)
//! - `guard` (default) - Route guards and the guard traversal hook

#![doc(html_root_url = "https://docs.rs/route-traverser/0.1.0")]
#![cfg_attr(docsrs, feature(doc_cfg))]
// Lints are configured in Cargo.toml [lints] section

// Logging abstraction
pub mod logging;

// Core routing modules
pub mod loader;
pub mod matcher;
pub mod params;
pub mod route;
pub mod traverser;

// Error handling
pub mod error;

// Hooks
pub mod hooks;

// Guards
#[cfg(feature = "guard")]
pub mod guards;

// Location changes and the instruction stream
pub mod instruction;
pub mod location;
pub mod router;

// Re-export main types for convenient access
pub use error::{LoadError, RouterError};
#[cfg(feature = "guard")]
pub use guards::{guard_fn, FnGuard, Guard, GuardHook, GuardRegistry, NotGuard, SharedGuard};
pub use hooks::{
    and_then_hook, compose_hooks, filter_hook, hook_fn, BoxedHook, ComposedHook, Hook,
    HookStream, Identity,
};
pub use instruction::{InstructionStream, RouterInstruction, RouterInstructionFactory};
pub use loader::ResourceLoader;
pub use location::{LocationChange, LocationChannel, LocationSource, NavigationDirection};
pub use matcher::{make_params, match_pattern, PatternMatch, SPLAT_PARAM};
pub use params::{QueryParams, RouteParams};
pub use route::{
    async_factory, validate_route_path, Component, GuardId, Loadable, RouteNode, RouteRef, Routes,
};
pub use router::{Router, RouterBuilder};
pub use traverser::{Match, RouteTraverser, TraversalCandidate};
