//! Route definition and configuration

use crate::error::{LoadError, RouterError};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::any::Any;
use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Shared route handle.
///
/// Route trees are shared between the traverser, lazily loaded subtrees and
/// every published `Match`, so nodes are always passed around as `Arc`.
pub type RouteRef = Arc<RouteNode>;

/// An ordered list of sibling routes. Order is matching priority.
pub type Routes = Vec<RouteRef>;

/// Opaque route payload (a component, a handler, anything the renderer wants).
///
/// The core never looks inside; consumers downcast it.
pub type Component = Arc<dyn Any + Send + Sync>;

/// Asynchronous producer of a lazily loaded value
pub type AsyncFactory<T> =
    Arc<dyn Fn() -> BoxFuture<'static, Result<T, LoadError>> + Send + Sync>;

/// Box a closure returning a future into an [`AsyncFactory`].
pub fn async_factory<T, F, Fut>(factory: F) -> AsyncFactory<T>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, LoadError>> + Send + 'static,
{
    Arc::new(move || factory().boxed())
}

// ============================================================================
// GuardId
// ============================================================================

/// Identifier a route uses to name a guard registered with the router
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GuardId(Cow<'static, str>);

impl GuardId {
    /// Get the identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&'static str> for GuardId {
    fn from(id: &'static str) -> Self {
        Self(Cow::Borrowed(id))
    }
}

impl From<String> for GuardId {
    fn from(id: String) -> Self {
        Self(Cow::Owned(id))
    }
}

impl fmt::Display for GuardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Loadable
// ============================================================================

/// A route field supplied either up front or by an async factory
///
/// Only one form is expected. If both are set the sync value wins; if neither
/// is set the loader falls back to the caller's default.
pub struct Loadable<T> {
    value: Option<T>,
    factory: Option<AsyncFactory<T>>,
}

impl<T> Loadable<T> {
    /// Neither form supplied
    pub fn none() -> Self {
        Self {
            value: None,
            factory: None,
        }
    }

    /// Supplied synchronously
    pub fn value(value: T) -> Self {
        Self {
            value: Some(value),
            factory: None,
        }
    }

    /// Supplied by an async factory
    pub fn factory(factory: AsyncFactory<T>) -> Self {
        Self {
            value: None,
            factory: Some(factory),
        }
    }

    /// The synchronous value, if any
    pub fn sync_value(&self) -> Option<&T> {
        self.value.as_ref()
    }

    /// The async factory, if any
    pub fn async_factory(&self) -> Option<&AsyncFactory<T>> {
        self.factory.as_ref()
    }

    /// Whether either form is present
    pub fn is_present(&self) -> bool {
        self.value.is_some() || self.factory.is_some()
    }
}

impl<T: Clone> Clone for Loadable<T> {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
            factory: self.factory.clone(),
        }
    }
}

impl<T> Default for Loadable<T> {
    fn default() -> Self {
        Self::none()
    }
}

impl<T> fmt::Debug for Loadable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let form = match (&self.value, &self.factory) {
            (Some(_), _) => "value",
            (None, Some(_)) => "factory",
            (None, None) => "none",
        };
        f.debug_tuple("Loadable").field(&form).finish()
    }
}

// ============================================================================
// Route Validation
// ============================================================================

/// Validate a route path pattern
///
/// Returns an error message if the path is invalid.
///
/// # Validation Rules
///
/// - Path can be empty (for index and layout nodes)
/// - No consecutive slashes ('//')
/// - Trailing slashes are allowed (normalized during matching)
/// - Parameter names must be alphanumeric/underscore and not empty
/// - No duplicate parameter names
/// - `*` may only be used as a whole segment
pub fn validate_route_path(path: &str) -> Result<(), String> {
    if path.is_empty() {
        return Ok(());
    }

    if path.contains("//") {
        return Err("Route path cannot contain consecutive slashes".to_string());
    }

    let mut param_names = HashSet::new();
    for segment in path.split('/') {
        if segment != "*" && segment.contains('*') {
            return Err(format!(
                "Wildcard must be a whole segment, found '{}'",
                segment
            ));
        }

        if let Some(param) = segment.strip_prefix(':') {
            if param.is_empty() {
                return Err("Route parameter name cannot be empty".to_string());
            }

            if !param.chars().all(|c| c.is_alphanumeric() || c == '_') {
                return Err(format!(
                    "Route parameter '{}' must contain only alphanumeric characters and underscores",
                    param
                ));
            }

            if !param_names.insert(param) {
                return Err(format!("Duplicate route parameter: '{}'", param));
            }
        }
    }

    Ok(())
}

// ============================================================================
// RouteNode
// ============================================================================

/// One node of the route configuration tree
///
/// # Example
///
/// ```
/// use route_traverser::RouteNode;
///
/// let routes = vec![
///     RouteNode::new("/users")
///         .component("UsersLayout")
///         .index(RouteNode::pathless().component("UserList").into())
///         .children(vec![
///             RouteNode::new(":id").guard("auth").component("UserDetail").into(),
///         ])
///         .into(),
/// ];
/// # let _: route_traverser::Routes = routes;
/// ```
pub struct RouteNode {
    /// Path pattern, empty for index and pathless layout nodes
    pub path: String,
    /// Guards evaluated, in order, before this node is accepted
    pub guards: Vec<GuardId>,
    /// Child routes
    pub children: Loadable<Routes>,
    /// Path-less node appended when this node is terminal
    pub index: Loadable<RouteRef>,
    /// Default payload
    pub component: Loadable<Component>,
    /// Named payloads, keyed by outlet name
    pub components: HashMap<String, Loadable<Component>>,
    /// Redirect target, stored for consumers
    pub redirect_to: Option<String>,
    /// Free-form metadata (titles, analytics keys, ...)
    pub meta: HashMap<String, String>,
}

impl RouteNode {
    /// Create a route with a path pattern
    ///
    /// # Panics
    ///
    /// Panics if the path is invalid. Use `try_new` for non-panicking validation.
    pub fn new(path: impl Into<String>) -> Self {
        let path = path.into();
        if let Err(e) = validate_route_path(&path) {
            panic!("Invalid route path '{}': {}", path, e);
        }
        Self::with_path(path)
    }

    /// Create a route with validation, returning Result
    pub fn try_new(path: impl Into<String>) -> Result<Self, RouterError> {
        let path = path.into();
        validate_route_path(&path).map_err(|reason| RouterError::InvalidPath {
            path: path.clone(),
            reason,
        })?;
        Ok(Self::with_path(path))
    }

    /// Create a node without a path (index nodes, pathless layouts)
    pub fn pathless() -> Self {
        Self::with_path(String::new())
    }

    fn with_path(path: String) -> Self {
        Self {
            path,
            guards: Vec::new(),
            children: Loadable::none(),
            index: Loadable::none(),
            component: Loadable::none(),
            components: HashMap::new(),
            redirect_to: None,
            meta: HashMap::new(),
        }
    }

    /// Add a guard by identifier
    pub fn guard(mut self, id: impl Into<GuardId>) -> Self {
        self.guards.push(id.into());
        self
    }

    /// Add several guards at once
    pub fn guards<I>(mut self, ids: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<GuardId>,
    {
        self.guards.extend(ids.into_iter().map(Into::into));
        self
    }

    /// Set child routes
    pub fn children(mut self, children: Routes) -> Self {
        self.children = Loadable::value(children);
        self
    }

    /// Add a single child route
    ///
    /// Replaces a lazy children factory if one was set.
    pub fn child(mut self, child: RouteRef) -> Self {
        let mut children = self.children.value.take().unwrap_or_default();
        children.push(child);
        self.children = Loadable::value(children);
        self
    }

    /// Load child routes lazily, the first time traversal descends here
    pub fn load_children<F, Fut>(mut self, factory: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Routes, LoadError>> + Send + 'static,
    {
        self.children = Loadable::factory(async_factory(factory));
        self
    }

    /// Set the index node
    pub fn index(mut self, index: RouteRef) -> Self {
        self.index = Loadable::value(index);
        self
    }

    /// Load the index node lazily
    pub fn load_index<F, Fut>(mut self, factory: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<RouteRef, LoadError>> + Send + 'static,
    {
        self.index = Loadable::factory(async_factory(factory));
        self
    }

    /// Set the default payload
    pub fn component<C>(mut self, component: C) -> Self
    where
        C: Any + Send + Sync,
    {
        self.component = Loadable::value(Arc::new(component));
        self
    }

    /// Load the default payload lazily
    pub fn load_component<F, Fut>(mut self, factory: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Component, LoadError>> + Send + 'static,
    {
        self.component = Loadable::factory(async_factory(factory));
        self
    }

    /// Set a payload for a named outlet
    pub fn named_component<C>(mut self, name: impl Into<String>, component: C) -> Self
    where
        C: Any + Send + Sync,
    {
        self.components
            .insert(name.into(), Loadable::value(Arc::new(component)));
        self
    }

    /// Load a named payload lazily
    pub fn load_named_component<F, Fut>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Component, LoadError>> + Send + 'static,
    {
        self.components
            .insert(name.into(), Loadable::factory(async_factory(factory)));
        self
    }

    /// Record a redirect target
    pub fn redirect_to(mut self, path: impl Into<String>) -> Self {
        self.redirect_to = Some(path.into());
        self
    }

    /// Add metadata to the route
    pub fn meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }

    /// Payload for the default outlet (`None`) or a named one
    ///
    /// Unknown names yield an empty `Loadable`.
    pub fn components_for(&self, name: Option<&str>) -> Loadable<Component> {
        match name {
            None => self.component.clone(),
            Some(name) => self.components.get(name).cloned().unwrap_or_default(),
        }
    }

    /// Whether any payload (default or named) is configured
    pub fn has_payload(&self) -> bool {
        self.component.is_present() || self.components.values().any(Loadable::is_present)
    }
}

impl fmt::Debug for RouteNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteNode")
            .field("path", &self.path)
            .field("guards", &self.guards)
            .field("children", &self.children)
            .field("index", &self.index)
            .field("component", &self.component)
            .field("components", &self.components.keys().collect::<Vec<_>>())
            .field("redirect_to", &self.redirect_to)
            .finish_non_exhaustive()
    }
}
