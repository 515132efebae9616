//! Client-facing bean context.

use std::any::Any;
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use tracing::{debug, warn};

use crate::bean::{downcast, Bean};
use crate::descriptors::RecipeDescriptor;
use crate::error::{DiError, DiResult};
use crate::key::{Dependency, TypeKey};
use crate::lifecycle::{BeanCreationListener, CreationListeners};
use crate::provider::{Engine, Phase, ResolutionContext};
use crate::recipe::Recipe;
use crate::store::{chain_names, find_recipe, find_recipe_by_type, store_chain, BeanStore};
use crate::traits::ResolverCore;
use crate::types::{ConversionHelper, TypeLoader};

/// Access point for beans.
///
/// A context resolves names and types against its default store and the
/// store's parents. Every request runs a fresh resolution pass; singletons
/// are cached in the engine the context shares with its derived contexts.
/// Cloning is cheap and yields a handle to the same context.
///
/// # Examples
///
/// ```
/// use beanwire::{BuildUnit, Dependency};
/// use std::sync::Arc;
///
/// struct Database {
///     url: String,
/// }
///
/// struct Repository {
///     db: Arc<Database>,
/// }
///
/// let mut unit = BuildUnit::new();
/// unit.add_singleton("url", "postgres://localhost".to_string()).unwrap();
/// unit.add_singleton_fn("db", vec![Dependency::name("url")], |args| {
///     Ok(Database { url: args.value::<String>(0)? })
/// })
/// .unwrap();
/// unit.add_factory_fn("repo", vec![Dependency::of_type::<Database>()], |args| {
///     Ok(Repository { db: args.get::<Database>(0)? })
/// })
/// .unwrap();
///
/// let ctx = unit.build().bean_context();
/// let repo = ctx.get_as::<Repository>("repo").unwrap();
/// assert_eq!(repo.db.url, "postgres://localhost");
/// assert!(Arc::ptr_eq(&repo.db, &ctx.get_by_type::<Database>().unwrap()));
/// ```
#[derive(Clone)]
pub struct BeanContext {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    store: Arc<dyn BeanStore>,
    engine: Arc<Engine>,
    listeners: Arc<CreationListeners>,
    parent: Option<BeanContext>,
    closed: AtomicBool,
}

/// Non-owning handle to a [`BeanContext`].
#[derive(Clone)]
pub struct WeakBeanContext {
    inner: Weak<ContextInner>,
}

impl WeakBeanContext {
    /// The context, if it is still alive.
    pub fn upgrade(&self) -> Option<BeanContext> {
        self.inner.upgrade().map(|inner| BeanContext { inner })
    }
}

impl fmt::Debug for WeakBeanContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakBeanContext")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}

impl BeanContext {
    pub(crate) fn root(store: Arc<dyn BeanStore>, engine: Arc<Engine>) -> Self {
        let listeners = engine.listeners().clone();
        BeanContext {
            inner: Arc::new(ContextInner {
                store,
                engine,
                listeners,
                parent: None,
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Nested context over `store`, sharing this context's engine.
    ///
    /// The derived context has its own creation listeners; they are hooked
    /// into this context's listeners so they see every bean the shared engine
    /// builds, until the derived context is closed. `store` is used as the
    /// default store as is; chain it to this context's store to make the
    /// parent's beans visible.
    pub fn derive(&self, store: Arc<dyn BeanStore>) -> BeanContext {
        let listeners = Arc::new(CreationListeners::new());
        self.inner.listeners.add(listeners.clone());
        debug!(store = store.name(), "derived bean context");
        BeanContext {
            inner: Arc::new(ContextInner {
                store,
                engine: self.inner.engine.clone(),
                listeners,
                parent: Some(self.clone()),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Resolves the bean named `name`.
    pub fn get(&self, name: &str) -> DiResult<Bean> {
        self.get_dependency(&Dependency::name(name))
    }

    /// Resolves the bean named `name`, starting the lookup at `store`
    /// instead of the default store.
    ///
    /// Singletons are still shared with every other lookup on this context.
    ///
    /// ```
    /// use beanwire::BuildUnit;
    ///
    /// let mut unit = BuildUnit::new();
    /// unit.add_store("child", None).unwrap();
    /// unit.add_singleton("answer", 42u8).unwrap();
    ///
    /// let result = unit.build();
    /// let child = result.store("child").unwrap();
    /// let ctx = result.bean_context();
    /// assert_eq!(*ctx.get_as_in::<u8>("answer", &child).unwrap(), 42);
    /// ```
    pub fn get_in(&self, name: &str, store: &Arc<dyn BeanStore>) -> DiResult<Bean> {
        self.get_dependency_in(&Dependency::name(name), store)
    }

    /// Resolves the bean named `name` and downcasts it to `T`.
    pub fn get_as<T: Any + Send + Sync>(&self, name: &str) -> DiResult<Arc<T>> {
        self.get_as_in(name, &self.inner.store)
    }

    /// [`get_as`](Self::get_as) starting at `store`.
    pub fn get_as_in<T: Any + Send + Sync>(
        &self,
        name: &str,
        store: &Arc<dyn BeanStore>,
    ) -> DiResult<Arc<T>> {
        let bean = self.get_in(name, store)?;
        downcast::<T>(&bean).ok_or_else(|| DiError::TypeMismatch {
            bean: name.to_string(),
            expected: std::any::type_name::<T>(),
        })
    }

    /// Resolves the bean whose recipe produces `T`.
    pub fn get_by_type<T: Any + Send + Sync>(&self) -> DiResult<Arc<T>> {
        self.get_by_type_in(&self.inner.store)
    }

    /// [`get_by_type`](Self::get_by_type) starting at `store`.
    pub fn get_by_type_in<T: Any + Send + Sync>(&self, store: &Arc<dyn BeanStore>) -> DiResult<Arc<T>> {
        let bean = self.get_dependency_in(&Dependency::of_type::<T>(), store)?;
        downcast::<T>(&bean).ok_or_else(|| DiError::TypeMismatch {
            bean: std::any::type_name::<T>().to_string(),
            expected: std::any::type_name::<T>(),
        })
    }

    /// Resolves an arbitrary dependency in a fresh pass.
    pub fn get_dependency(&self, dependency: &Dependency) -> DiResult<Bean> {
        self.get_dependency_in(dependency, &self.inner.store)
    }

    /// Resolves an arbitrary dependency in a fresh pass that looks names and
    /// types up from `store`.
    pub fn get_dependency_in(
        &self,
        dependency: &Dependency,
        store: &Arc<dyn BeanStore>,
    ) -> DiResult<Bean> {
        self.ensure_open()?;
        let engine = self.inner.engine.as_ref();
        let _pass = engine.lock_pass();
        let mut pass = ResolutionContext::new(self, engine, store.clone());
        let bean = pass.resolve_dependency(dependency)?;
        pass.finish()?;
        Ok(bean)
    }

    /// `true` if a recipe named `name` is visible from the default store.
    pub fn contains_bean(&self, name: &str) -> bool {
        self.contains_bean_in(name, &self.inner.store)
    }

    /// `true` if a recipe named `name` is visible from `store`.
    pub fn contains_bean_in(&self, name: &str, store: &Arc<dyn BeanStore>) -> bool {
        find_recipe(store, name).is_some()
    }

    /// `true` if a visible recipe produces `T`. No bean is created.
    pub fn contains_type<T: ?Sized + 'static>(&self) -> bool {
        self.contains_type_in::<T>(&self.inner.store)
    }

    /// [`contains_type`](Self::contains_type) starting at `store`.
    pub fn contains_type_in<T: ?Sized + 'static>(&self, store: &Arc<dyn BeanStore>) -> bool {
        find_recipe_by_type(store, TypeKey::of::<T>(), Some(self.inner.engine.type_loader()))
            .is_some()
    }

    /// Every name visible from the default store.
    pub fn bean_names(&self) -> BTreeSet<String> {
        chain_names(&self.inner.store)
    }

    /// Every name visible from `store`, including its parents' names.
    pub fn bean_names_in(&self, store: &Arc<dyn BeanStore>) -> BTreeSet<String> {
        chain_names(store)
    }

    /// Name under which `recipe` is registered along the store chain.
    pub fn bean_name_for(&self, recipe: &Recipe) -> Option<String> {
        self.bean_name_for_in(recipe, &self.inner.store)
    }

    /// Name under which `recipe` is registered along the chain of `store`.
    pub fn bean_name_for_in(&self, recipe: &Recipe, store: &Arc<dyn BeanStore>) -> Option<String> {
        store_chain(store).iter().find_map(|store| {
            store
                .recipes()
                .into_iter()
                .find(|(_, r)| r.id() == recipe.id())
                .map(|(name, _)| name)
        })
    }

    /// Types produced by the visible recipes. Recipes whose type cannot be
    /// told without running them are left out.
    pub fn bean_classes(&self) -> HashSet<TypeKey> {
        self.bean_classes_in(&self.inner.store)
    }

    /// [`bean_classes`](Self::bean_classes) for the recipes visible from
    /// `store`.
    pub fn bean_classes_in(&self, store: &Arc<dyn BeanStore>) -> HashSet<TypeKey> {
        let loader = self.inner.engine.type_loader();
        visible_recipes(store)
            .into_iter()
            .filter_map(|(_, _, recipe)| recipe.bean_type(Some(loader)))
            .collect()
    }

    /// Descriptors of the visible recipes; shadowed names appear once.
    pub fn descriptors(&self) -> Vec<RecipeDescriptor> {
        let loader = self.inner.engine.type_loader();
        visible_recipes(&self.inner.store)
            .into_iter()
            .map(|(name, store, recipe)| {
                let bean_type = recipe.bean_type(Some(loader));
                RecipeDescriptor::new(name, store.name(), &recipe, bean_type)
            })
            .collect()
    }

    /// Phase of the cached singleton behind `name`, if one was created.
    pub fn singleton_phase(&self, name: &str) -> Option<Phase> {
        let recipe = find_recipe(&self.inner.store, name)?;
        self.inner.engine.phase(recipe.id())
    }

    /// Registers a listener for every bean this context's engine creates
    /// from now on, until this context is closed.
    pub fn add_creation_listener(&self, listener: Arc<dyn BeanCreationListener>) {
        self.inner.listeners.add(listener);
    }

    /// Removes a listener by identity; `false` if it was not registered here.
    pub fn remove_creation_listener(&self, listener: &Arc<dyn BeanCreationListener>) -> bool {
        self.inner.listeners.remove(listener)
    }

    /// Marks the context unusable. Shutdown is not run; that is the job of
    /// [`BuildResult::release`](crate::BuildResult::release).
    pub fn close(&self) {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(parent) = &self.inner.parent {
            let listeners: Arc<dyn BeanCreationListener> = self.inner.listeners.clone();
            parent.remove_creation_listener(&listeners);
        }
        debug!(store = self.inner.store.name(), "bean context closed");
    }

    /// `true` if this context or one of its ancestors was closed.
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
            || self.inner.parent.as_ref().is_some_and(|p| p.is_closed())
    }

    fn ensure_open(&self) -> DiResult<()> {
        if self.is_closed() {
            warn!(store = self.inner.store.name(), "access to a closed bean context");
            return Err(DiError::ContextClosed);
        }
        Ok(())
    }

    /// The context this one was derived from.
    pub fn parent(&self) -> Option<&BeanContext> {
        self.inner.parent.as_ref()
    }

    /// Store where lookups without an explicit store start.
    pub fn default_store(&self) -> &Arc<dyn BeanStore> {
        &self.inner.store
    }

    /// Type loader shared with the engine.
    pub fn type_loader(&self) -> Arc<dyn TypeLoader> {
        self.inner.engine.type_loader_arc().clone()
    }

    /// Engine-wide conversion helper. A store may override it for passes
    /// starting there.
    pub fn conversion_helper(&self) -> Arc<ConversionHelper> {
        self.inner.engine.conversion_arc().clone()
    }

    /// Handle that does not keep the context alive, as handed to context
    /// clients.
    pub fn downgrade(&self) -> WeakBeanContext {
        WeakBeanContext {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// `true` if both handles refer to the same context.
    pub fn same_context(&self, other: &BeanContext) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn engine(&self) -> &Arc<Engine> {
        &self.inner.engine
    }

    /// Human-readable dump of the visible recipes and the singleton cache.
    #[cfg(feature = "diagnostics")]
    pub fn to_debug_string(&self) -> String {
        use std::fmt::Write;

        let mut out = String::new();
        let _ = writeln!(out, "BeanContext (store: {})", self.inner.store.name());
        let _ = writeln!(out, "  closed: {}", self.is_closed());
        let _ = writeln!(out, "  cached singletons: {}", self.inner.engine.singleton_count());
        let _ = writeln!(out, "  listeners: {}", self.inner.listeners.len());
        for descriptor in self.descriptors() {
            let _ = writeln!(
                out,
                "  {} [{:?}] in {}: {}{}",
                descriptor.name,
                descriptor.scope,
                descriptor.store,
                descriptor.type_name().unwrap_or("?"),
                if descriptor.has_shutdown { " (shutdown)" } else { "" }
            );
        }
        out
    }
}

/// Recipes visible from `store` with their names and owning stores, nearest
/// store first. Shadowed names appear once.
fn visible_recipes(store: &Arc<dyn BeanStore>) -> Vec<(String, Arc<dyn BeanStore>, Arc<Recipe>)> {
    let mut seen = BTreeSet::new();
    let mut visible = Vec::new();
    for store in store_chain(store) {
        for name in store.provider_names() {
            if !seen.insert(name.clone()) {
                continue;
            }
            if let Some(recipe) = store.recipe(&name) {
                visible.push((name, store.clone(), recipe));
            }
        }
    }
    visible
}

impl fmt::Debug for BeanContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeanContext")
            .field("store", &self.inner.store.name())
            .field("derived", &self.inner.parent.is_some())
            .field("closed", &self.is_closed())
            .finish()
    }
}
