//! Asynchronous route tree traversal
//!
//! Matches a location against a route trie, loading child routes and index
//! nodes on demand and passing every candidate node through the traversal
//! hooks (where guards run). Siblings are tried in declaration order; a
//! sibling is only considered after every earlier one has failed, so only the
//! sibling under consideration ever triggers a load.

use crate::error::RouterError;
use crate::hooks::{BoxedHook, ComposedHook};
use crate::loader::ResourceLoader;
use crate::location::LocationChange;
use crate::matcher::{make_params, match_pattern};
use crate::params::{QueryParams, RouteParams};
use crate::route::{Component, RouteNode, RouteRef, Routes};
use crate::{debug_log, error_log, trace_log};
use futures::future::BoxFuture;
use futures::{FutureExt, StreamExt};
use std::sync::Arc;

/// A node under consideration, as seen by traversal hooks
///
/// Hooks reject a candidate by clearing `route` (see [`reject`](Self::reject)).
#[derive(Debug, Clone)]
pub struct TraversalCandidate {
    /// The route being considered, `None` once rejected
    pub route: Option<RouteRef>,
    /// Params accumulated from the root down to this node
    pub route_params: RouteParams,
    /// Params parsed from the query string
    pub query_params: QueryParams,
    /// The location being resolved
    pub location_change: LocationChange,
    /// Whether this node consumes the rest of the path
    pub is_terminal: bool,
}

impl TraversalCandidate {
    /// Reject the candidate, keeping every other field
    pub fn reject(mut self) -> Self {
        self.route = None;
        self
    }

    /// Whether a hook rejected this candidate
    pub fn is_rejected(&self) -> bool {
        self.route.is_none()
    }
}

/// Successful resolution of a location
#[derive(Debug, Clone)]
pub struct Match {
    /// Matched routes, root to leaf, index node last when present
    pub routes: Routes,
    /// Params merged across all matched levels
    pub route_params: RouteParams,
    /// Params parsed from the query string
    pub query_params: QueryParams,
    /// The location that was resolved
    pub location_change: LocationChange,
}

impl Match {
    /// The match as seen one level down the tree
    ///
    /// A nested outlet renders `routes[0]` and hands `child()` to its own
    /// outlet.
    pub fn child(&self) -> Match {
        Match {
            routes: self.routes.iter().skip(1).cloned().collect(),
            route_params: self.route_params.clone(),
            query_params: self.query_params.clone(),
            location_change: self.location_change.clone(),
        }
    }

    /// The deepest matched route
    pub fn leaf(&self) -> Option<&RouteRef> {
        self.routes.last()
    }

    /// Matched route paths, root to leaf
    pub fn paths(&self) -> Vec<&str> {
        self.routes.iter().map(|route| route.path.as_str()).collect()
    }
}

/// State shared by every level of one `find` call
struct Traversal {
    query_params: QueryParams,
    location_change: LocationChange,
}

/// Resolves locations against a route configuration
pub struct RouteTraverser {
    routes: Routes,
    loader: ResourceLoader,
    hooks: ComposedHook<TraversalCandidate>,
}

impl RouteTraverser {
    /// Create a traverser over top-level `routes` with no traversal hooks
    pub fn new(routes: Routes) -> Self {
        Self {
            routes,
            loader: ResourceLoader::new(),
            hooks: ComposedHook::default(),
        }
    }

    /// Set the traversal hooks, applied in order to every candidate
    pub fn with_hooks(mut self, hooks: Vec<BoxedHook<TraversalCandidate>>) -> Self {
        self.hooks = ComposedHook::new(hooks);
        self
    }

    /// Replace the resource loader
    pub fn with_loader(mut self, loader: ResourceLoader) -> Self {
        self.loader = loader;
        self
    }

    /// Top-level routes
    pub fn routes(&self) -> &Routes {
        &self.routes
    }

    /// Names of the composed traversal hooks
    pub fn hook_names(&self) -> Vec<&str> {
        self.hooks.names()
    }

    /// Asynchronously match `change` against the route tree
    ///
    /// Returns `Ok(None)` when nothing matches. Only configuration errors
    /// (an unregistered guard) are returned as `Err`; load and hook failures
    /// are logged and the affected branch counts as a mismatch.
    pub async fn find(&self, change: &LocationChange) -> Result<Option<Match>, RouterError> {
        let traversal = Traversal {
            query_params: QueryParams::from_query_string(change.query()),
            location_change: change.clone(),
        };

        debug_log!("traversing for '{}'", change.path);
        self.match_routes(&traversal, change.pathname(), &self.routes, &[], &[])
            .await
    }

    /// Owned variant of [`find`](Self::find) for spawning and cancellation
    pub fn find_owned(
        self: Arc<Self>,
        change: LocationChange,
    ) -> BoxFuture<'static, Result<Option<Match>, RouterError>> {
        async move { self.find(&change).await }.boxed()
    }

    /// Load a matched route's default (`None`) or named payload
    pub async fn load_component(
        &self,
        route: &RouteNode,
        name: Option<&str>,
    ) -> Result<Option<Component>, RouterError> {
        self.loader.load_component(route, name).await
    }

    fn match_routes<'a>(
        &'a self,
        traversal: &'a Traversal,
        remaining: &'a str,
        routes: &'a [RouteRef],
        param_names: &'a [String],
        param_values: &'a [String],
    ) -> BoxFuture<'a, Result<Option<Match>, RouterError>> {
        async move {
            for route in routes {
                match self
                    .match_route_deep(traversal, route, remaining, param_names, param_values)
                    .await
                {
                    Ok(Some(found)) => return Ok(Some(found)),
                    Ok(None) => continue,
                    Err(err) if err.is_fatal() => return Err(err),
                    Err(err) => {
                        error_log!("Error during traversal of '{}': {}", route.path, err);
                    }
                }
            }

            Ok(None)
        }
        .boxed()
    }

    async fn match_route_deep(
        &self,
        traversal: &Traversal,
        route: &RouteRef,
        remaining: &str,
        param_names: &[String],
        param_values: &[String],
    ) -> Result<Option<Match>, RouterError> {
        let matched = match_pattern(&route.path, remaining);
        let Some(rest) = matched.remaining_pathname else {
            trace_log!("'{}' does not match '{}'", route.path, remaining);
            return Ok(None);
        };

        let names: Vec<String> = param_names.iter().cloned().chain(matched.param_names).collect();
        let values: Vec<String> = param_values
            .iter()
            .cloned()
            .chain(matched.param_values)
            .collect();

        let candidate = TraversalCandidate {
            route: Some(Arc::clone(route)),
            route_params: make_params(&names, &values),
            query_params: traversal.query_params.clone(),
            location_change: traversal.location_change.clone(),
            is_terminal: rest.is_empty() && !route.path.is_empty(),
        };
        trace_log!(
            "'{}' matched, remaining '{}', terminal: {}",
            route.path,
            rest,
            candidate.is_terminal
        );

        let mut candidates = self.hooks.apply_one(candidate);
        while let Some(candidate) = candidates.next().await {
            let candidate = candidate?;
            let Some(accepted) = candidate.route else {
                trace_log!("'{}' rejected by traversal hooks", route.path);
                continue;
            };

            if candidate.is_terminal {
                let index = self.loader.load_index(&accepted).await?;
                let mut routes = vec![accepted];
                routes.extend(index);

                return Ok(Some(Match {
                    routes,
                    route_params: candidate.route_params,
                    query_params: candidate.query_params,
                    location_change: traversal.location_change.clone(),
                }));
            }

            let children = self.loader.load_children(&accepted).await?;
            if let Some(mut found) = self
                .match_routes(traversal, &rest, &children, &names, &values)
                .await?
            {
                found.routes.insert(0, accepted);
                return Ok(Some(found));
            }
        }

        Ok(None)
    }
}

impl std::fmt::Debug for RouteTraverser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteTraverser")
            .field("routes", &self.routes.len())
            .field("hooks", &self.hooks.names())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LoadError;
    use crate::hooks::{filter_hook, hook_fn, HookStream};
    use futures::future;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn find(traverser: &RouteTraverser, path: &str) -> Option<Match> {
        pollster::block_on(traverser.find(&LocationChange::new(path))).unwrap()
    }

    fn user_routes() -> Routes {
        vec![
            RouteNode::new("/")
                .component("root")
                .index(RouteNode::pathless().component("home").into())
                .children(vec![
                    RouteNode::new("users")
                        .component("users")
                        .children(vec![RouteNode::new(":id").component("user").into()])
                        .into(),
                    RouteNode::new("about").component("about").into(),
                ])
                .into(),
        ]
    }

    #[test]
    fn test_nested_match() {
        let traverser = RouteTraverser::new(user_routes());
        let found = find(&traverser, "/users/42").unwrap();

        assert_eq!(found.paths(), vec!["/", "users", ":id"]);
        assert_eq!(found.route_params.get("id"), Some("42"));
        assert_eq!(found.location_change.path, "/users/42");
    }

    #[test]
    fn test_root_index_appended() {
        let traverser = RouteTraverser::new(user_routes());
        let found = find(&traverser, "/").unwrap();

        assert_eq!(found.routes.len(), 2);
        assert_eq!(found.paths(), vec!["/", ""]);
        assert!(found.leaf().unwrap().has_payload());
    }

    #[test]
    fn test_root_matches_empty_path() {
        let traverser = RouteTraverser::new(user_routes());
        let found = find(&traverser, "").unwrap();

        assert_eq!(found.paths(), vec!["/", ""]);
    }

    #[test]
    fn test_index_appended_after_terminal_child() {
        let routes = vec![RouteNode::new("/docs")
            .children(vec![RouteNode::new("guide")
                .index(RouteNode::pathless().component("intro").into())
                .into()])
            .into()];
        let found = find(&RouteTraverser::new(routes), "/docs/guide").unwrap();

        // depth 2 + index
        assert_eq!(found.routes.len(), 3);
        assert_eq!(found.paths(), vec!["/docs", "guide", ""]);
    }

    #[test]
    fn test_param_accumulation_across_levels() {
        let routes = vec![RouteNode::new("/a/:x")
            .children(vec![RouteNode::new("/:y").into()])
            .into()];
        let found = find(&RouteTraverser::new(routes), "/a/1/2").unwrap();

        assert_eq!(found.route_params.get("x"), Some("1"));
        assert_eq!(found.route_params.get("y"), Some("2"));
        assert_eq!(found.route_params.len(), 2);
    }

    #[test]
    fn test_deeper_param_overwrites_parent() {
        let routes = vec![RouteNode::new("/:id")
            .children(vec![RouteNode::new(":id").into()])
            .into()];
        let found = find(&RouteTraverser::new(routes), "/outer/inner").unwrap();

        assert_eq!(found.route_params.get("id"), Some("inner"));
    }

    #[test]
    fn test_sibling_declaration_order_wins() {
        let routes = vec![
            RouteNode::new("/x").component("literal").into(),
            RouteNode::new("/:id").component("dynamic").into(),
        ];
        let found = find(&RouteTraverser::new(routes), "/x").unwrap();

        assert_eq!(found.paths(), vec!["/x"]);
        assert!(found.route_params.is_empty());
    }

    #[test]
    fn test_backtracks_when_children_do_not_match() {
        let routes = vec![
            RouteNode::new("/shop")
                .children(vec![RouteNode::new("cart").into()])
                .into(),
            RouteNode::new("/shop/:item").into(),
        ];
        let found = find(&RouteTraverser::new(routes), "/shop/lamp").unwrap();

        assert_eq!(found.paths(), vec!["/shop/:item"]);
        assert_eq!(found.route_params.get("item"), Some("lamp"));
    }

    #[test]
    fn test_pathless_layout_is_never_terminal() {
        let routes = vec![RouteNode::pathless()
            .children(vec![RouteNode::new("/inbox").into()])
            .into()];
        let traverser = RouteTraverser::new(routes);

        let found = find(&traverser, "/inbox").unwrap();
        assert_eq!(found.paths(), vec!["", "/inbox"]);
        assert!(find(&traverser, "/").is_none());
    }

    #[test]
    fn test_no_match() {
        let traverser = RouteTraverser::new(user_routes());
        assert!(find(&traverser, "/nowhere").is_none());
        assert!(find(&traverser, "/users/1/extra").is_none());
    }

    #[test]
    fn test_query_params_split_from_path() {
        let traverser = RouteTraverser::new(user_routes());
        let found = find(&traverser, "/users/7?tab=posts&tag=a&tag=b").unwrap();

        assert_eq!(found.route_params.get("id"), Some("7"));
        assert_eq!(found.query_params.get("tab"), Some("posts"));
        assert_eq!(found.query_params.get_all("tag").map(<[String]>::len), Some(2));
        assert_eq!(found.location_change.path, "/users/7?tab=posts&tag=a&tag=b");
    }

    #[test]
    fn test_lazy_children_and_index() {
        let routes = vec![RouteNode::new("/lazy")
            .load_children(|| async {
                Ok(vec![RouteNode::new("page")
                    .load_index(|| async { Ok(Arc::new(RouteNode::pathless())) })
                    .into()])
            })
            .into()];
        let found = find(&RouteTraverser::new(routes), "/lazy/page").unwrap();

        assert_eq!(found.paths(), vec!["/lazy", "page", ""]);
    }

    #[test]
    fn test_only_attempted_siblings_load() {
        let loads = Arc::new(AtomicUsize::new(0));
        let first = Arc::clone(&loads);
        let second = Arc::clone(&loads);

        let routes = vec![
            RouteNode::new("/a")
                .load_children(move || {
                    first.fetch_add(1, Ordering::SeqCst);
                    async { Ok(vec![RouteNode::new("b").into()]) }
                })
                .into(),
            RouteNode::new("/a")
                .load_children(move || {
                    second.fetch_add(100, Ordering::SeqCst);
                    async { Ok(Vec::new()) }
                })
                .into(),
        ];
        let found = find(&RouteTraverser::new(routes), "/a/b");

        assert!(found.is_some());
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_loader_failure_counts_as_mismatch() {
        let routes = vec![
            RouteNode::new("/a")
                .load_children(|| async { Err::<Routes, LoadError>("network down".into()) })
                .into(),
            RouteNode::new("/a")
                .children(vec![RouteNode::new("b").into()])
                .into(),
        ];
        let found = find(&RouteTraverser::new(routes), "/a/b").unwrap();

        assert_eq!(found.paths(), vec!["/a", "b"]);
        assert!(found.routes[0].children.sync_value().is_some());
    }

    #[test]
    fn test_failure_everywhere_is_no_match() {
        let routes = vec![RouteNode::new("/a")
            .load_index(|| async { Err::<RouteRef, LoadError>("gone".into()) })
            .into()];
        let result = pollster::block_on(RouteTraverser::new(routes).find(&LocationChange::new("/a")));

        assert!(matches!(result, Ok(None)));
    }

    #[test]
    fn test_hook_rejection_backtracks() {
        let reject_first: BoxedHook<TraversalCandidate> =
            Arc::new(hook_fn(|input: HookStream<TraversalCandidate>| {
                input
                    .map(|candidate| {
                        candidate.map(|candidate| {
                            let deny = candidate
                                .route
                                .as_ref()
                                .is_some_and(|route| route.meta.contains_key("deny"));
                            if deny {
                                candidate.reject()
                            } else {
                                candidate
                            }
                        })
                    })
                    .boxed()
            }));

        let routes = vec![
            RouteNode::new("/a").meta("deny", "yes").into(),
            RouteNode::new("/a").meta("name", "second").into(),
        ];
        let traverser = RouteTraverser::new(routes).with_hooks(vec![reject_first]);
        let found = find(&traverser, "/a").unwrap();

        assert_eq!(
            found.routes[0].meta.get("name").map(String::as_str),
            Some("second")
        );
    }

    #[test]
    fn test_filtered_candidate_backtracks() {
        let only_terminal: BoxedHook<TraversalCandidate> = Arc::new(filter_hook(
            |candidate: &TraversalCandidate| future::ready(candidate.is_terminal),
        ));

        let routes = vec![
            RouteNode::new("/a")
                .children(vec![RouteNode::new("b").into()])
                .into(),
            RouteNode::new("/a/b").into(),
        ];
        let traverser = RouteTraverser::new(routes).with_hooks(vec![only_terminal]);
        let found = find(&traverser, "/a/b").unwrap();

        assert_eq!(found.paths(), vec!["/a/b"]);
    }

    #[test]
    fn test_hooks_see_candidates_in_traversal_order() {
        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let recorder = Arc::clone(&seen);
        let record: BoxedHook<TraversalCandidate> =
            Arc::new(hook_fn(move |input: HookStream<TraversalCandidate>| {
                let recorder = Arc::clone(&recorder);
                input
                    .inspect(move |candidate| {
                        if let Ok(TraversalCandidate {
                            route: Some(route), ..
                        }) = candidate
                        {
                            recorder.lock().push(route.path.clone());
                        }
                    })
                    .boxed()
            }));

        let traverser = RouteTraverser::new(user_routes()).with_hooks(vec![record]);
        find(&traverser, "/about").unwrap();

        // "users" fails its pattern before reaching the hooks
        assert_eq!(*seen.lock(), vec!["/", "about"]);
    }

    #[test]
    fn test_load_component() {
        let route = RouteNode::new("/page").load_component(|| async {
            Ok(Arc::new("lazy page") as Component)
        });
        let traverser = RouteTraverser::new(Vec::new());

        let component = pollster::block_on(traverser.load_component(&route, None))
            .unwrap()
            .unwrap();
        assert_eq!(component.downcast_ref::<&str>(), Some(&"lazy page"));
    }

    #[test]
    fn test_match_child_projection() {
        let found = find(&RouteTraverser::new(user_routes()), "/users/3").unwrap();
        let child = found.child();

        assert_eq!(child.paths(), vec!["users", ":id"]);
        assert_eq!(child.route_params.get("id"), Some("3"));
        assert_eq!(child.child().child().routes.len(), 0);
    }
}
