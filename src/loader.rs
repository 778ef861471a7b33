//! Lazy resource loading
//!
//! Every loadable route field goes through the same precedence: a sync value
//! if present, else the awaited async factory, else the caller's default.

use crate::error::{LoadError, RouterError};
use crate::route::{Component, RouteNode, RouteRef, Routes};
use crate::trace_log;
use std::future::Future;

/// Resolves sync-or-async route fields
#[derive(Debug, Clone, Copy, Default)]
pub struct ResourceLoader;

impl ResourceLoader {
    /// Create a loader
    pub fn new() -> Self {
        Self
    }

    /// Resolve `sync`, else `factory()`, else `default`, in exactly that order.
    ///
    /// # Example
    ///
    /// ```
    /// use route_traverser::ResourceLoader;
    ///
    /// let loader = ResourceLoader::new();
    /// let value = pollster::block_on(loader.load(
    ///     None,
    ///     Some(|| async { Ok::<_, route_traverser::LoadError>(7) }),
    ///     0,
    /// ));
    /// assert_eq!(value.unwrap(), 7);
    /// ```
    pub async fn load<T, F, Fut>(
        &self,
        sync: Option<T>,
        factory: Option<F>,
        default: T,
    ) -> Result<T, LoadError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, LoadError>>,
    {
        if let Some(value) = sync {
            return Ok(value);
        }

        if let Some(factory) = factory {
            return factory().await;
        }

        Ok(default)
    }

    /// Load a route's children, defaulting to none
    pub async fn load_children(&self, route: &RouteNode) -> Result<Routes, RouterError> {
        trace_log!("loading children of '{}'", route.path);
        self.load(
            route.children.sync_value().cloned(),
            route.children.async_factory().map(|factory| move || factory()),
            Vec::new(),
        )
        .await
        .map_err(|source| RouterError::Load {
            resource: "children",
            source,
        })
    }

    /// Load a route's index node, defaulting to `None`
    pub async fn load_index(&self, route: &RouteNode) -> Result<Option<RouteRef>, RouterError> {
        trace_log!("loading index of '{}'", route.path);
        self.load(
            route.index.sync_value().cloned().map(Some),
            route.index.async_factory().map(|factory| {
                move || {
                    let pending = factory();
                    async move { pending.await.map(Some) }
                }
            }),
            None,
        )
        .await
        .map_err(|source| RouterError::Load {
            resource: "index",
            source,
        })
    }

    /// Load the default (`None`) or a named payload, defaulting to `None`
    pub async fn load_component(
        &self,
        route: &RouteNode,
        name: Option<&str>,
    ) -> Result<Option<Component>, RouterError> {
        let components = route.components_for(name);
        self.load(
            components.sync_value().cloned().map(Some),
            components.async_factory().map(|factory| {
                move || {
                    let pending = factory();
                    async move { pending.await.map(Some) }
                }
            }),
            None,
        )
        .await
        .map_err(|source| RouterError::Load {
            resource: "component",
            source,
        })
    }
}
