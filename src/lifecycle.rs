//! Bean lifecycle: creation hooks and the release-time shutdown sweep.
//!
//! Every bean produced by a recipe passes two hooks once it is fully
//! initialized: beans declared as [`BeanContextClient`]s receive a weak
//! handle to the requesting context, then the creation listeners run in
//! registration order. Teardown happens when a build is released: each live
//! recipe's [`Shutdown`](crate::Shutdown) strategy runs exactly once.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::bean::Bean;
use crate::bean_context::{BeanContext, WeakBeanContext};
use crate::error::{BoxError, DiResult, ShutdownErrors, ShutdownFailure};
use crate::provider::{Engine, RestrictedResolver};
use crate::recipe::{Recipe, RecipeId};
use crate::store::{same_store, BeanStore};

/// Notification that a bean finished construction.
pub struct BeanCreationEvent<'a> {
    /// The fully initialized bean
    pub bean: &'a Bean,
    /// Recipe that produced it
    pub recipe: &'a Recipe,
    /// Name the bean was requested under
    pub name: &'a str,
    /// Context the request was made on
    pub context: &'a BeanContext,
}

/// Observer of bean creation.
///
/// An error aborts the resolution that produced the bean.
///
/// ```
/// use beanwire::{BeanCreationEvent, BoxError, BuildUnit};
/// use std::sync::{Arc, Mutex};
///
/// let seen = Arc::new(Mutex::new(Vec::new()));
/// let log = seen.clone();
/// let mut unit = BuildUnit::new();
/// unit.add_singleton_fn("service", vec![], |_| Ok(String::from("up"))).unwrap();
/// unit.add_listener(Arc::new(move |event: &BeanCreationEvent<'_>| -> Result<(), BoxError> {
///     log.lock().unwrap().push(event.name.to_string());
///     Ok(())
/// }));
///
/// let ctx = unit.build().bean_context();
/// ctx.get("service").unwrap();
/// ctx.get("service").unwrap();
/// assert_eq!(*seen.lock().unwrap(), vec!["service".to_string()]);
/// ```
pub trait BeanCreationListener: Send + Sync {
    fn bean_created(&self, event: &BeanCreationEvent<'_>) -> Result<(), BoxError>;
}

impl<F> BeanCreationListener for F
where
    F: Fn(&BeanCreationEvent<'_>) -> Result<(), BoxError> + Send + Sync,
{
    fn bean_created(&self, event: &BeanCreationEvent<'_>) -> Result<(), BoxError> {
        self(event)
    }
}

/// Ordered set of creation listeners.
///
/// The set is itself a listener, which is how a derived context hooks its own
/// listeners into its parent.
#[derive(Default)]
pub struct CreationListeners {
    listeners: RwLock<Vec<Arc<dyn BeanCreationListener>>>,
}

impl CreationListeners {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, listener: Arc<dyn BeanCreationListener>) {
        self.listeners.write().push(listener);
    }

    /// Removes `listener`, compared by identity. Returns `false` if it was
    /// not registered.
    pub fn remove(&self, listener: &Arc<dyn BeanCreationListener>) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|l| !std::ptr::addr_eq(Arc::as_ptr(l), Arc::as_ptr(listener)));
        listeners.len() != before
    }

    pub fn len(&self) -> usize {
        self.listeners.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Notifies every listener in order, stopping at the first failure.
    ///
    /// Listeners are snapshotted first, so a listener may register or remove
    /// listeners without deadlocking.
    pub fn fire(&self, event: &BeanCreationEvent<'_>) -> Result<(), BoxError> {
        let snapshot = self.listeners.read().clone();
        for listener in snapshot {
            listener.bean_created(event)?;
        }
        Ok(())
    }
}

impl BeanCreationListener for CreationListeners {
    fn bean_created(&self, event: &BeanCreationEvent<'_>) -> Result<(), BoxError> {
        self.fire(event)
    }
}

/// Bean that wants to know the context it was created for.
///
/// The handle is weak: a bean must not keep its own context alive.
///
/// ```
/// use beanwire::{BeanContextClient, BuildUnit, Recipe, WeakBeanContext};
/// use std::sync::Mutex;
///
/// #[derive(Default)]
/// struct Lookup {
///     context: Mutex<Option<WeakBeanContext>>,
/// }
///
/// impl BeanContextClient for Lookup {
///     fn set_bean_context(&self, context: WeakBeanContext) {
///         *self.context.lock().unwrap() = Some(context);
///     }
/// }
///
/// let mut unit = BuildUnit::new();
/// unit.add_singleton("answer", 42u32).unwrap();
/// unit.add_recipe(
///     None,
///     "lookup",
///     Recipe::from_fn(vec![], |_| Ok(Lookup::default()))
///         .context_client::<Lookup>()
///         .build(),
/// )
/// .unwrap();
///
/// let result = unit.build();
/// let lookup = result.bean_context().get_as::<Lookup>("lookup").unwrap();
/// let ctx = lookup.context.lock().unwrap().as_ref().unwrap().upgrade().unwrap();
/// assert_eq!(*ctx.get_as::<u32>("answer").unwrap(), 42);
/// ```
pub trait BeanContextClient: Send + Sync + 'static {
    fn set_bean_context(&self, context: WeakBeanContext);
}

/// Runs the shutdown strategy of every live recipe reachable from `stores`.
///
/// Stores are deduplicated by identity and recipes by [`RecipeId`], so a
/// store registered under two names, or a recipe registered twice, is shut
/// down once. Live means: constant recipes always, singleton recipes only if
/// their instance is cached (the instance is taken out of the cache), factory
/// recipes never. Failures are collected; every other shutdown still runs.
pub(crate) fn release_stores(
    stores: &[Arc<dyn BeanStore>],
    engine: &Engine,
) -> Result<(), ShutdownErrors> {
    let mut unique: Vec<&Arc<dyn BeanStore>> = Vec::new();
    for store in stores {
        if !unique.iter().any(|s| same_store(s, store)) {
            unique.push(store);
        }
    }

    let mut resolver = RestrictedResolver::new(engine);
    let mut visited: HashSet<RecipeId> = HashSet::new();
    let mut failures = Vec::new();

    for store in unique {
        for (name, recipe) in store.recipes() {
            if !visited.insert(recipe.id()) {
                continue;
            }
            let bean = match live_instance(&recipe, engine, &mut resolver) {
                Ok(Some(bean)) => bean,
                Ok(None) => continue,
                Err(error) => {
                    warn!(bean = %name, %error, "cannot obtain bean for shutdown");
                    failures.push(ShutdownFailure { bean: name, error });
                    continue;
                }
            };
            if !recipe.has_shutdown() {
                continue;
            }
            debug!(bean = %name, store = store.name(), "shutting down");
            if let Err(error) = recipe.run_shutdown(&bean, &mut resolver) {
                let error = error.attach_bean(&name);
                warn!(bean = %name, %error, "shutdown failed");
                failures.push(ShutdownFailure { bean: name, error });
            }
        }
    }

    if failures.is_empty() {
        Ok(())
    } else {
        Err(ShutdownErrors { failures })
    }
}

fn live_instance(
    recipe: &Recipe,
    engine: &Engine,
    resolver: &mut RestrictedResolver<'_>,
) -> DiResult<Option<Bean>> {
    if let Some(bean) = engine.take_singleton(recipe.id()) {
        return Ok(Some(bean));
    }
    if recipe.creator().is_constant() && recipe.has_shutdown() {
        return recipe.create(resolver).map(Some);
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Recorder {
        tag: &'static str,
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    impl BeanCreationListener for Recorder {
        fn bean_created(&self, _event: &BeanCreationEvent<'_>) -> Result<(), BoxError> {
            self.log.lock().unwrap().push(self.tag);
            Ok(())
        }
    }

    #[test]
    fn listeners_are_removed_by_identity() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let listeners = CreationListeners::new();
        let a: Arc<dyn BeanCreationListener> = Arc::new(Recorder { tag: "a", log: log.clone() });
        let b: Arc<dyn BeanCreationListener> = Arc::new(Recorder { tag: "b", log });
        listeners.add(a.clone());
        listeners.add(b);

        assert!(listeners.remove(&a));
        assert!(!listeners.remove(&a));
        assert_eq!(listeners.len(), 1);
    }
}
