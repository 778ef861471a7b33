//! Hook trait and composition
//!
//! Hooks intercept the pipeline at three points: router hooks see raw
//! location changes, traversal hooks see every candidate node (guards live
//! here), and instruction hooks see each finished `Match`.
//!
//! A hook transforms a stream. It may drop items or fail them, but must not
//! reorder the items it lets through.
//!
//! # Example
//!
//! ```
//! use futures::StreamExt;
//! use route_traverser::{compose_hooks, filter_hook, hook_fn, BoxedHook, HookStream};
//! use std::sync::Arc;
//!
//! let hooks: Vec<BoxedHook<u32>> = vec![
//!     Arc::new(hook_fn(|input: HookStream<u32>| {
//!         input.map(|item| item.map(|n| n * 10)).boxed()
//!     })),
//!     Arc::new(filter_hook(|n: &u32| futures::future::ready(*n > 10))),
//! ];
//! let composed = compose_hooks(&hooks);
//!
//! let output: Vec<u32> = pollster::block_on(
//!     composed
//!         .apply(futures::stream::iter([Ok(1), Ok(2), Ok(3)]).boxed())
//!         .filter_map(|item| futures::future::ready(item.ok()))
//!         .collect(),
//! );
//! assert_eq!(output, vec![20, 30]);
//! ```

use crate::error::RouterError;
use futures::future::{self, BoxFuture};
use futures::stream::{self, BoxStream};
use futures::{FutureExt, StreamExt, TryStreamExt};
use std::future::Future;
use std::sync::Arc;

/// Stream a hook consumes and produces. `Err` items carry failures downstream.
pub type HookStream<T> = BoxStream<'static, Result<T, RouterError>>;

/// A pluggable stream transform
///
/// # Example
///
/// ```
/// use futures::StreamExt;
/// use route_traverser::{Hook, HookStream, LocationChange};
///
/// /// Strips a trailing slash so `/users/` and `/users` resolve alike
/// struct TrimTrailingSlash;
///
/// impl Hook<LocationChange> for TrimTrailingSlash {
///     fn apply(&self, input: HookStream<LocationChange>) -> HookStream<LocationChange> {
///         input
///             .map(|change| {
///                 change.map(|mut change| {
///                     if change.path.len() > 1 && change.path.ends_with('/') {
///                         change.path.pop();
///                     }
///                     change
///                 })
///             })
///             .boxed()
///     }
///
///     fn name(&self) -> &str {
///         "TrimTrailingSlash"
///     }
/// }
/// ```
pub trait Hook<T>: Send + Sync + 'static {
    /// Transform the stream
    fn apply(&self, input: HookStream<T>) -> HookStream<T>;

    /// Hook name for debugging
    fn name(&self) -> &str {
        "Hook"
    }
}

/// Type-erased hook for dynamic dispatch
pub type BoxedHook<T> = Arc<dyn Hook<T>>;

/// The neutral hook
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl<T: Send + 'static> Hook<T> for Identity {
    fn apply(&self, input: HookStream<T>) -> HookStream<T> {
        input
    }

    fn name(&self) -> &str {
        "Identity"
    }
}

// ============================================================================
// Hook helpers
// ============================================================================

/// Create a hook from a stream transform closure
pub fn hook_fn<T, F>(f: F) -> FnHook<F>
where
    F: Fn(HookStream<T>) -> HookStream<T> + Send + Sync + 'static,
{
    FnHook { f }
}

/// Hook created from a closure
pub struct FnHook<F> {
    f: F,
}

impl<T, F> Hook<T> for FnHook<F>
where
    F: Fn(HookStream<T>) -> HookStream<T> + Send + Sync + 'static,
{
    fn apply(&self, input: HookStream<T>) -> HookStream<T> {
        (self.f)(input)
    }
}

/// Create a hook that keeps items for which an async predicate holds
pub fn filter_hook<T, F, Fut>(predicate: F) -> FilterHook<T>
where
    T: Send + 'static,
    F: Fn(&T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = bool> + Send + 'static,
{
    FilterHook {
        predicate: Arc::new(move |item: &T| predicate(item).boxed()),
    }
}

/// Hook created by [`filter_hook`]
pub struct FilterHook<T> {
    predicate: Arc<dyn Fn(&T) -> BoxFuture<'static, bool> + Send + Sync>,
}

impl<T: Send + 'static> Hook<T> for FilterHook<T> {
    fn apply(&self, input: HookStream<T>) -> HookStream<T> {
        let predicate = Arc::clone(&self.predicate);
        input.try_filter(move |item| predicate(item)).boxed()
    }

    fn name(&self) -> &str {
        "FilterHook"
    }
}

/// Create a hook that runs an async step on every item, in order
///
/// Useful for resolving data before a candidate or match moves on. An `Err`
/// from the step is passed downstream in place of the item.
pub fn and_then_hook<T, F, Fut>(step: F) -> AndThenHook<T>
where
    T: Send + 'static,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, RouterError>> + Send + 'static,
{
    AndThenHook {
        step: Arc::new(move |item: T| step(item).boxed()),
    }
}

/// Hook created by [`and_then_hook`]
pub struct AndThenHook<T> {
    step: Arc<dyn Fn(T) -> BoxFuture<'static, Result<T, RouterError>> + Send + Sync>,
}

impl<T: Send + 'static> Hook<T> for AndThenHook<T> {
    fn apply(&self, input: HookStream<T>) -> HookStream<T> {
        let step = Arc::clone(&self.step);
        input.and_then(move |item| step(item)).boxed()
    }

    fn name(&self) -> &str {
        "AndThenHook"
    }
}

// ============================================================================
// Composition
// ============================================================================

/// Hooks applied left to right, identity first
pub struct ComposedHook<T> {
    hooks: Vec<BoxedHook<T>>,
}

impl<T: Send + 'static> ComposedHook<T> {
    /// Compose hooks in the given order
    pub fn new<I>(hooks: I) -> Self
    where
        I: IntoIterator<Item = BoxedHook<T>>,
    {
        let identity: BoxedHook<T> = Arc::new(Identity);
        Self {
            hooks: std::iter::once(identity).chain(hooks).collect(),
        }
    }

    /// Run the whole chain over `input`
    pub fn apply(&self, input: HookStream<T>) -> HookStream<T> {
        self.hooks
            .iter()
            .fold(input, |stream, hook| hook.apply(stream))
    }

    /// Run the whole chain over a single item
    pub fn apply_one(&self, item: T) -> HookStream<T> {
        self.apply(stream::once(future::ready(Ok(item))).boxed())
    }

    /// Names of the composed hooks, identity included
    pub fn names(&self) -> Vec<&str> {
        self.hooks.iter().map(|hook| hook.name()).collect()
    }
}

impl<T: Send + 'static> Default for ComposedHook<T> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl<T> Clone for ComposedHook<T> {
    fn clone(&self) -> Self {
        Self {
            hooks: self.hooks.clone(),
        }
    }
}

impl<T: Send + 'static> Hook<T> for ComposedHook<T> {
    fn apply(&self, input: HookStream<T>) -> HookStream<T> {
        ComposedHook::apply(self, input)
    }

    fn name(&self) -> &str {
        "ComposedHook"
    }
}

/// Compose `hooks` into a single transform
pub fn compose_hooks<T: Send + 'static>(hooks: &[BoxedHook<T>]) -> ComposedHook<T> {
    ComposedHook::new(hooks.iter().cloned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    fn collect<T: Send + 'static>(stream: HookStream<T>) -> Vec<Result<T, RouterError>> {
        pollster::block_on(stream.collect())
    }

    fn source(items: Vec<u32>) -> HookStream<u32> {
        stream::iter(items.into_iter().map(Ok)).boxed()
    }

    #[test]
    fn test_empty_composition_is_identity() {
        let composed = ComposedHook::<u32>::default();
        let output: Vec<u32> = collect(composed.apply(source(vec![3, 1, 2])))
            .into_iter()
            .map(Result::unwrap)
            .collect();

        assert_eq!(output, vec![3, 1, 2]);
        assert_eq!(composed.names(), vec!["Identity"]);
    }

    #[test]
    fn test_hooks_apply_left_to_right() {
        let add_one: BoxedHook<u32> =
            Arc::new(hook_fn(|input: HookStream<u32>| input.map_ok(|n| n + 1).boxed()));
        let double: BoxedHook<u32> =
            Arc::new(hook_fn(|input: HookStream<u32>| input.map_ok(|n| n * 2).boxed()));

        let output: Vec<u32> = collect(compose_hooks(&[add_one, double]).apply(source(vec![1, 5])))
            .into_iter()
            .map(Result::unwrap)
            .collect();

        // (n + 1) * 2, not n * 2 + 1
        assert_eq!(output, vec![4, 12]);
    }

    #[test]
    fn test_later_hook_observes_earlier_filter() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let recorder = Arc::clone(&seen);

        let hooks: Vec<BoxedHook<u32>> = vec![
            Arc::new(filter_hook(|n: &u32| future::ready(n % 2 == 0))),
            Arc::new(hook_fn(move |input: HookStream<u32>| {
                let recorder = Arc::clone(&recorder);
                input
                    .inspect_ok(move |n| recorder.lock().push(*n))
                    .boxed()
            })),
        ];

        let output = collect(compose_hooks(&hooks).apply(source(vec![1, 2, 3, 4])));
        assert_eq!(output.len(), 2);
        assert_eq!(*seen.lock(), vec![2, 4]);
    }

    #[test]
    fn test_and_then_hook_propagates_errors() {
        let hooks: Vec<BoxedHook<u32>> = vec![Arc::new(and_then_hook(|n: u32| async move {
            if n == 2 {
                Err(RouterError::hook("two is not allowed"))
            } else {
                Ok(n)
            }
        }))];

        let output = collect(compose_hooks(&hooks).apply(source(vec![1, 2, 3])));
        assert!(matches!(output[0], Ok(1)));
        assert!(matches!(output[1], Err(RouterError::Hook { .. })));
        assert!(matches!(output[2], Ok(3)));
    }

    #[test]
    fn test_apply_one() {
        let composed = ComposedHook::new(vec![
            Arc::new(filter_hook(|n: &u32| future::ready(*n > 1))) as BoxedHook<u32>
        ]);

        assert!(collect(composed.apply_one(1)).is_empty());
        assert_eq!(collect(composed.apply_one(2)).len(), 1);
        assert_eq!(composed.names(), vec!["Identity", "FilterHook"]);
    }
}
