//! Per-request resolution pass.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, trace};

use crate::bean::Bean;
use crate::bean_context::BeanContext;
use crate::error::{DiError, DiResult};
use crate::key::Dependency;
use crate::lifecycle::BeanCreationEvent;
use crate::recipe::Recipe;
use crate::store::{fetch_conversion_helper, find_recipe, find_recipe_by_type, BeanStore};
use crate::traits::ResolverCore;
use crate::types::{ConversionHelper, TypeLoader};

use super::{Engine, InFlight, State};

/// Bean whose initialization waits for the end of the pass.
struct Pending {
    recipe: Arc<Recipe>,
    bean: Bean,
    name: String,
    started: Option<Instant>,
}

/// Coordinator of one resolution pass.
///
/// Singleton instances are recorded in the pass frame as soon as they exist,
/// so a cycle through initialization steps sees the bare instance instead of
/// recursing. A recipe reached again while its creator is still running has
/// nothing to hand out and fails the pass with
/// [`DiError::CyclicDependency`]. Frames and the resolution stack live in the
/// [`Engine`], which lets a pass nested inside a callback reuse the instances
/// of the pass around it. Singletons leave the pass only from
/// [`finish`](Self::finish); a pass dropped without finishing leaves no trace.
pub(crate) struct ResolutionContext<'a> {
    context: &'a BeanContext,
    engine: &'a Engine,
    store: Arc<dyn BeanStore>,
    conversion: Arc<ConversionHelper>,
    level: usize,
    depth: usize,
    deferred: VecDeque<Pending>,
    finished: bool,
}

impl<'a> ResolutionContext<'a> {
    /// Opens a pass. The caller must hold the engine's pass lock.
    pub(crate) fn new(context: &'a BeanContext, engine: &'a Engine, store: Arc<dyn BeanStore>) -> Self {
        let conversion =
            fetch_conversion_helper(&store).unwrap_or_else(|| engine.conversion_arc().clone());
        let (level, depth) = engine.begin_pass();
        if level > 0 {
            trace!(level, depth, "nested resolution pass");
        }
        ResolutionContext {
            context,
            engine,
            store,
            conversion,
            level,
            depth,
            deferred: VecDeque::new(),
            finished: false,
        }
    }

    /// Resolves `recipe`, requested under `name`.
    pub(crate) fn resolve_recipe(&mut self, recipe: &Arc<Recipe>, name: &str) -> DiResult<Bean> {
        let id = recipe.id();
        let busy = match self.engine.in_flight(id) {
            Some(InFlight::Instance(bean)) => return Ok(bean),
            Some(InFlight::Busy) => true,
            None => false,
        };
        if recipe.scope().is_singleton() {
            if let Some(bean) = self.engine.cached(id) {
                return Ok(bean);
            }
        }
        if is_plain_constant(recipe) {
            return recipe.create(self);
        }
        if busy {
            let path = self.engine.cycle_path(id, name);
            debug!(path = ?path, "unresolvable cycle");
            return Err(DiError::CyclicDependency(path));
        }

        self.engine.enter(id, name)?;
        let observed = self.engine.observers().has_observers();
        let started = observed.then(Instant::now);
        if observed {
            self.engine.observers().resolving(recipe);
        }

        let result = self.build(recipe, name, started);
        self.engine.exit(id);

        match result {
            Ok((bean, postponed)) => {
                if observed && !postponed {
                    self.engine.observers().resolved(recipe, elapsed(started));
                }
                Ok(bean)
            }
            Err(error) => {
                if observed {
                    self.engine.observers().failed(recipe, &error);
                }
                self.engine.discard(self.level, id);
                Err(error)
            }
        }
    }

    /// Creates the bean and either initializes it or postpones that; the
    /// flag tells which.
    fn build(&mut self, recipe: &Arc<Recipe>, name: &str, started: Option<Instant>) -> DiResult<(Bean, bool)> {
        let id = recipe.id();
        self.engine.set_state(self.level, id, Some(State::Creating));
        trace!(bean = name, "creating");
        let bean = recipe.create(self).map_err(|e| e.attach_bean(name))?;

        if recipe.scope().is_singleton() {
            self.engine.allocate(self.level, id, bean.clone());
        }
        self.engine.set_state(self.level, id, Some(State::Initializing));

        if self.engine.config().defer_initialization && self.initialization_blocked(recipe) {
            trace!(bean = name, "initialization postponed");
            self.engine.set_state(self.level, id, None);
            self.deferred.push_back(Pending {
                recipe: recipe.clone(),
                bean: bean.clone(),
                name: name.to_string(),
                started,
            });
            return Ok((bean, true));
        }

        self.complete(recipe, &bean, name)?;
        Ok((bean, false))
    }

    /// Runs initialization and the creation hooks.
    fn complete(&mut self, recipe: &Arc<Recipe>, bean: &Bean, name: &str) -> DiResult<()> {
        let id = recipe.id();
        self.engine.set_state(self.level, id, Some(State::Initializing));
        trace!(bean = name, "initializing");
        recipe
            .initialize(bean, self)
            .map_err(|e| e.attach_bean(name))?;
        self.engine.mark_populated(self.level, id);

        recipe
            .inject_context(bean, self.context.downgrade())
            .map_err(|e| e.attach_bean(name))?;
        let event = BeanCreationEvent {
            bean,
            recipe: recipe.as_ref(),
            name,
            context: self.context,
        };
        self.engine
            .listeners()
            .fire(&event)
            .map_err(|source| DiError::ListenerFailure {
                bean: name.to_string(),
                source: Arc::from(source),
            })?;

        self.engine.set_state(self.level, id, None);
        trace!(bean = name, "populated");
        Ok(())
    }

    /// `true` if an initialization dependency is a recipe whose creator is
    /// still running.
    fn initialization_blocked(&self, recipe: &Recipe) -> bool {
        recipe.init_dependencies().into_iter().any(|dependency| {
            self.target_recipe(dependency)
                .is_some_and(|target| self.engine.is_creating(target.id()))
        })
    }

    fn target_recipe(&self, dependency: &Dependency) -> Option<Arc<Recipe>> {
        match dependency {
            Dependency::Name(name) => find_recipe(&self.store, name),
            Dependency::Type(key) => {
                find_recipe_by_type(&self.store, *key, Some(self.engine.type_loader()))
                    .map(|(_, recipe)| recipe)
            }
            Dependency::Recipe(recipe) => Some(recipe.clone()),
            Dependency::Value(_) | Dependency::Variable(_) => None,
        }
    }

    /// Runs postponed initializations, then publishes the pass.
    ///
    /// Every postponed initializer runs even if an earlier one failed; the
    /// first error is reported and nothing is published.
    pub(crate) fn finish(mut self) -> DiResult<()> {
        let observed = self.engine.observers().has_observers();
        let mut first_error = None;
        while let Some(pending) = self.deferred.pop_front() {
            match self.complete(&pending.recipe, &pending.bean, &pending.name) {
                Ok(()) if observed => {
                    self.engine.observers().resolved(&pending.recipe, elapsed(pending.started));
                }
                Ok(()) => {}
                Err(error) => {
                    if observed {
                        self.engine.observers().failed(&pending.recipe, &error);
                    }
                    first_error.get_or_insert(error);
                }
            }
        }
        if let Some(error) = first_error {
            return Err(error);
        }
        self.engine.end_pass(self.level);
        self.finished = true;
        Ok(())
    }
}

impl Drop for ResolutionContext<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.engine.abandon_pass(self.level, self.depth);
        }
    }
}

fn elapsed(started: Option<Instant>) -> Duration {
    started.map(|s| s.elapsed()).unwrap_or_default()
}

/// Constants without any initialization are their own cache.
fn is_plain_constant(recipe: &Recipe) -> bool {
    recipe.creator().is_constant() && recipe.init_steps().is_empty() && !recipe.is_context_client()
}

impl ResolverCore for ResolutionContext<'_> {
    fn resolve_dependency(&mut self, dependency: &Dependency) -> DiResult<Bean> {
        match dependency {
            Dependency::Name(name) => {
                let recipe = find_recipe(&self.store, name)
                    .ok_or_else(|| DiError::NotFound(name.clone()))?;
                self.resolve_recipe(&recipe, name)
            }
            Dependency::Type(key) => {
                let (name, recipe) =
                    find_recipe_by_type(&self.store, *key, Some(self.engine.type_loader()))
                        .ok_or_else(|| DiError::NotFound(format!("type {}", key)))?;
                self.resolve_recipe(&recipe, &name)
            }
            Dependency::Value(constant) => constant.resolve(&self.conversion),
            Dependency::Recipe(recipe) => {
                let name = recipe.display_name();
                self.resolve_recipe(recipe, &name)
            }
            Dependency::Variable(variable) => Err(DiError::InvalidRecipe(format!(
                "chain variable ${} used outside an initialization chain",
                variable
            ))),
        }
    }

    fn type_loader(&self) -> &dyn TypeLoader {
        self.engine.type_loader()
    }

    fn conversion(&self) -> &ConversionHelper {
        &self.conversion
    }
}
