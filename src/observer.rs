//! Diagnostic observers for bean resolution.
//!
//! Observers are told when a recipe starts resolving, when it finished and how
//! long it took, and when it failed. Calls are made synchronously from inside
//! the resolution pass, so implementations should stay cheap.

use std::sync::Arc;
use std::time::Duration;

use crate::error::DiError;
use crate::recipe::Recipe;

/// Observer of resolution events.
///
/// # Examples
///
/// ```
/// use beanwire::{BuildUnit, DiObserver, Recipe};
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// #[derive(Default)]
/// struct Counting(AtomicUsize);
///
/// impl DiObserver for Counting {
///     fn resolving(&self, _recipe: &Recipe) {}
///
///     fn resolved(&self, _recipe: &Recipe, _duration: Duration) {
///         self.0.fetch_add(1, Ordering::SeqCst);
///     }
/// }
///
/// let observer = Arc::new(Counting::default());
/// let mut unit = BuildUnit::new();
/// unit.add_singleton_fn("answer", vec![], |_| Ok(42u32)).unwrap();
/// unit.add_observer(observer.clone());
///
/// let ctx = unit.build().bean_context();
/// ctx.get("answer").unwrap();
/// assert_eq!(observer.0.load(Ordering::SeqCst), 1);
/// ```
pub trait DiObserver: Send + Sync {
    /// Called before the recipe's creator runs.
    fn resolving(&self, recipe: &Recipe);

    /// Called once the bean is created, initialized and announced. For a
    /// bean whose initialization was postponed this happens at the end of
    /// the pass, and `duration` includes the wait.
    fn resolved(&self, recipe: &Recipe, duration: Duration);

    /// Called when creating or initializing the bean failed.
    fn resolution_failed(&self, recipe: &Recipe, error: &DiError) {
        let _ = (recipe, error);
    }
}

/// Registered observers of one engine.
#[derive(Default, Clone)]
pub(crate) struct Observers {
    observers: Vec<Arc<dyn DiObserver>>,
}

impl Observers {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add(&mut self, observer: Arc<dyn DiObserver>) {
        self.observers.push(observer);
    }

    #[inline]
    pub(crate) fn has_observers(&self) -> bool {
        !self.observers.is_empty()
    }

    #[inline]
    pub(crate) fn resolving(&self, recipe: &Recipe) {
        for observer in &self.observers {
            observer.resolving(recipe);
        }
    }

    #[inline]
    pub(crate) fn resolved(&self, recipe: &Recipe, duration: Duration) {
        for observer in &self.observers {
            observer.resolved(recipe, duration);
        }
    }

    #[inline]
    pub(crate) fn failed(&self, recipe: &Recipe, error: &DiError) {
        for observer in &self.observers {
            observer.resolution_failed(recipe, error);
        }
    }
}

/// Observer forwarding every event to `tracing`.
///
/// ```
/// use beanwire::{BuildUnit, LoggingObserver};
/// use std::sync::Arc;
///
/// let mut unit = BuildUnit::new();
/// unit.add_observer(Arc::new(LoggingObserver::new()));
/// let result = unit.build();
/// ```
pub struct LoggingObserver {
    prefix: String,
}

impl LoggingObserver {
    pub fn new() -> Self {
        Self {
            prefix: "beanwire".to_string(),
        }
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl Default for LoggingObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl DiObserver for LoggingObserver {
    fn resolving(&self, recipe: &Recipe) {
        tracing::debug!(prefix = %self.prefix, bean = %recipe.display_name(), "resolving");
    }

    fn resolved(&self, recipe: &Recipe, duration: Duration) {
        tracing::debug!(
            prefix = %self.prefix,
            bean = %recipe.display_name(),
            ?duration,
            "resolved"
        );
    }

    fn resolution_failed(&self, recipe: &Recipe, error: &DiError) {
        tracing::warn!(
            prefix = %self.prefix,
            bean = %recipe.display_name(),
            %error,
            "resolution failed"
        );
    }
}
