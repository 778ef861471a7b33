//! Location changes and their sources
//!
//! The router does not own navigation history. Something outside it (a
//! browser shim, a test, a CLI) produces [`LocationChange`]s and the router
//! consumes them through a [`LocationSource`].

use futures::stream::{self, BoxStream};
use futures::StreamExt;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::watch;

/// How the location was reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum NavigationDirection {
    /// Navigating forward to a new location
    #[default]
    Forward,
    /// Navigating back in history
    Back,
    /// Replacing the current location
    Replace,
}

/// A navigation event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationChange {
    /// The full path, `"/pathname?query"`
    pub path: String,
    /// How the location was reached
    pub direction: NavigationDirection,
    /// Opaque state attached by whoever navigated
    pub state: HashMap<String, String>,
}

impl LocationChange {
    /// A forward navigation to `path`
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            direction: NavigationDirection::Forward,
            state: HashMap::new(),
        }
    }

    /// Set the navigation direction
    pub fn with_direction(mut self, direction: NavigationDirection) -> Self {
        self.direction = direction;
        self
    }

    /// Attach a state entry
    pub fn with_state(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.state.insert(key.into(), value.into());
        self
    }

    /// The path before the first `?`
    pub fn pathname(&self) -> &str {
        self.path
            .split_once('?')
            .map_or(self.path.as_str(), |(pathname, _)| pathname)
    }

    /// The text after the first `?`, empty if there is none
    pub fn query(&self) -> &str {
        self.path.split_once('?').map_or("", |(_, query)| query)
    }
}

impl From<&str> for LocationChange {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

impl From<String> for LocationChange {
    fn from(path: String) -> Self {
        Self::new(path)
    }
}

/// Something that emits location changes
///
/// `changes` is called each time the router (re)starts consuming, so it must
/// return a fresh stream every time.
pub trait LocationSource: Send + Sync + 'static {
    /// A new stream of location changes
    fn changes(&self) -> BoxStream<'static, LocationChange>;
}

impl<F> LocationSource for F
where
    F: Fn() -> BoxStream<'static, LocationChange> + Send + Sync + 'static,
{
    fn changes(&self) -> BoxStream<'static, LocationChange> {
        self()
    }
}

/// A location source fed by explicit navigation calls
///
/// Streams start with the current location, then see every later navigation.
/// A slow consumer only observes the most recent location.
///
/// # Example
///
/// ```
/// use futures::StreamExt;
/// use route_traverser::{LocationChannel, LocationSource};
///
/// let location = LocationChannel::new("/");
/// let mut changes = location.changes();
///
/// location.push("/users");
/// let first = pollster::block_on(changes.next()).unwrap();
/// assert_eq!(first.path, "/users");
/// ```
#[derive(Debug, Clone)]
pub struct LocationChannel {
    sender: Arc<watch::Sender<LocationChange>>,
}

impl LocationChannel {
    /// Create a channel positioned at `initial`
    pub fn new(initial: impl Into<LocationChange>) -> Self {
        let (sender, _) = watch::channel(initial.into());
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Emit `change`
    pub fn navigate(&self, change: LocationChange) {
        self.sender.send_replace(change);
    }

    /// Navigate forward to `path`
    pub fn push(&self, path: impl Into<String>) {
        self.navigate(LocationChange::new(path));
    }

    /// Replace the current location with `path`
    pub fn replace(&self, path: impl Into<String>) {
        self.navigate(LocationChange::new(path).with_direction(NavigationDirection::Replace));
    }

    /// The current location
    pub fn current(&self) -> LocationChange {
        self.sender.borrow().clone()
    }
}

impl LocationSource for LocationChannel {
    fn changes(&self) -> BoxStream<'static, LocationChange> {
        let mut receiver = self.sender.subscribe();
        receiver.mark_changed();

        stream::unfold(receiver, |mut receiver| async move {
            receiver.changed().await.ok()?;
            let change = receiver.borrow_and_update().clone();
            Some((change, receiver))
        })
        .boxed()
    }
}
