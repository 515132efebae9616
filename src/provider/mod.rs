//! Resolution engine shared by a root bean context and its derived contexts.
//!
//! The [`Engine`] owns everything that outlives a single request: the
//! context-lifetime singleton cache, the pass lock serializing requests, the
//! root creation listeners and the type services. Each request runs in its
//! own [`ResolutionContext`]; only a pass that completes without error
//! publishes its singletons into the cache.
//!
//! A constructor or listener may issue a request while a pass is running on
//! the same thread. The nested pass sees the in-flight instances of the
//! passes enclosing it and hands its own singletons to the enclosing pass
//! instead of publishing them, so a singleton has one instance per engine no
//! matter how deeply requests nest.

mod context;
mod restricted;

pub(crate) use context::ResolutionContext;
pub(crate) use restricted::RestrictedResolver;

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, ReentrantMutex, ReentrantMutexGuard};
use tracing::trace;

use crate::bean::Bean;
use crate::config::EngineConfig;
use crate::error::DiResult;
use crate::internal::ResolutionStack;
use crate::lifecycle::CreationListeners;
use crate::observer::Observers;
use crate::recipe::RecipeId;
use crate::types::{ConversionHelper, TypeLoader};

/// Lifecycle phase of a bean instance tracked by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Created but not yet initialized; only visible to the running passes
    Allocated,
    /// Initialized and announced
    Populated,
    /// Handed to the shutdown sweep
    Released,
}

/// A bean instance with its phase.
#[derive(Clone)]
pub(crate) struct Slot {
    pub(crate) bean: Bean,
    pub(crate) phase: Phase,
}

impl Slot {
    pub(crate) fn allocated(bean: Bean) -> Self {
        Slot {
            bean,
            phase: Phase::Allocated,
        }
    }
}

/// Progress of a recipe that is on the way to a finished bean.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum State {
    /// Creator running; no instance exists yet
    Creating,
    /// Instance exists, initialization steps running
    Initializing,
}

/// What the running passes know about a recipe.
pub(crate) enum InFlight {
    /// An instance exists; bare while its initialization is pending
    Instance(Bean),
    /// Under construction with nothing to hand out yet
    Busy,
}

/// Bookkeeping of one running pass.
#[derive(Default)]
struct PassFrame {
    slots: HashMap<RecipeId, Slot>,
    states: HashMap<RecipeId, State>,
}

/// Passes running on the thread that holds the pass lock, outermost first.
struct ActivePasses {
    frames: Vec<PassFrame>,
    stack: ResolutionStack,
}

pub(crate) struct Engine {
    singletons: Mutex<HashMap<RecipeId, Slot>>,
    pass_lock: ReentrantMutex<()>,
    active: Mutex<ActivePasses>,
    listeners: Arc<CreationListeners>,
    observers: Observers,
    type_loader: Arc<dyn TypeLoader>,
    conversion: Arc<ConversionHelper>,
    config: EngineConfig,
}

impl Engine {
    pub(crate) fn new(
        type_loader: Arc<dyn TypeLoader>,
        conversion: Arc<ConversionHelper>,
        listeners: Arc<CreationListeners>,
        observers: Observers,
        config: EngineConfig,
    ) -> Self {
        Engine {
            singletons: Mutex::new(HashMap::new()),
            pass_lock: ReentrantMutex::new(()),
            active: Mutex::new(ActivePasses {
                frames: Vec::new(),
                stack: ResolutionStack::new(config.max_depth),
            }),
            listeners,
            observers,
            type_loader,
            conversion,
            config,
        }
    }

    /// Serializes resolution passes. Re-entrant, so a constructor or
    /// listener may issue a nested request on the same thread.
    pub(crate) fn lock_pass(&self) -> ReentrantMutexGuard<'_, ()> {
        self.pass_lock.lock()
    }

    /// Opens a pass frame and returns its level with the stack depth the
    /// pass starts at. The caller must hold the pass lock.
    pub(crate) fn begin_pass(&self) -> (usize, usize) {
        let mut active = self.active.lock();
        active.frames.push(PassFrame::default());
        (active.frames.len() - 1, active.stack.depth())
    }

    /// Closes the frame at `level`. A nested pass hands its populated slots
    /// to the enclosing frame; the outermost pass publishes them.
    pub(crate) fn end_pass(&self, level: usize) {
        let mut active = self.active.lock();
        if active.frames.len() != level + 1 {
            return;
        }
        let Some(frame) = active.frames.pop() else {
            return;
        };
        let populated = frame
            .slots
            .into_iter()
            .filter(|(_, slot)| slot.phase == Phase::Populated);
        match active.frames.last_mut() {
            Some(enclosing) => {
                for (id, slot) in populated {
                    enclosing.slots.entry(id).or_insert(slot);
                }
            }
            None => {
                drop(active);
                self.publish(populated);
            }
        }
    }

    /// Discards the frames from `level` up and the stack above `depth`,
    /// without publishing anything.
    pub(crate) fn abandon_pass(&self, level: usize, depth: usize) {
        let mut active = self.active.lock();
        active.frames.truncate(level);
        active.stack.truncate(depth);
    }

    /// Looks `id` up in the running passes, innermost first.
    pub(crate) fn in_flight(&self, id: RecipeId) -> Option<InFlight> {
        let active = self.active.lock();
        for frame in active.frames.iter().rev() {
            if let Some(slot) = frame.slots.get(&id) {
                return Some(InFlight::Instance(slot.bean.clone()));
            }
        }
        active
            .frames
            .iter()
            .any(|frame| frame.states.contains_key(&id))
            .then_some(InFlight::Busy)
    }

    /// `true` if a running pass is still executing the creator of `id`.
    pub(crate) fn is_creating(&self, id: RecipeId) -> bool {
        self.active
            .lock()
            .frames
            .iter()
            .any(|frame| frame.states.get(&id) == Some(&State::Creating))
    }

    pub(crate) fn set_state(&self, level: usize, id: RecipeId, state: Option<State>) {
        let mut active = self.active.lock();
        if let Some(frame) = active.frames.get_mut(level) {
            match state {
                Some(state) => {
                    frame.states.insert(id, state);
                }
                None => {
                    frame.states.remove(&id);
                }
            }
        }
    }

    pub(crate) fn allocate(&self, level: usize, id: RecipeId, bean: Bean) {
        if let Some(frame) = self.active.lock().frames.get_mut(level) {
            frame.slots.insert(id, Slot::allocated(bean));
        }
    }

    pub(crate) fn mark_populated(&self, level: usize, id: RecipeId) {
        if let Some(slot) = self
            .active
            .lock()
            .frames
            .get_mut(level)
            .and_then(|frame| frame.slots.get_mut(&id))
        {
            slot.phase = Phase::Populated;
        }
    }

    /// Forgets everything the pass at `level` recorded for `id`.
    pub(crate) fn discard(&self, level: usize, id: RecipeId) {
        if let Some(frame) = self.active.lock().frames.get_mut(level) {
            frame.states.remove(&id);
            frame.slots.remove(&id);
        }
    }

    pub(crate) fn enter(&self, id: RecipeId, name: &str) -> DiResult<()> {
        self.active.lock().stack.enter(id, name.to_string())
    }

    pub(crate) fn exit(&self, id: RecipeId) {
        self.active.lock().stack.exit(id);
    }

    pub(crate) fn cycle_path(&self, id: RecipeId, name: &str) -> Vec<String> {
        self.active.lock().stack.cycle_path(id, name)
    }

    /// Cached instance of a populated singleton.
    pub(crate) fn cached(&self, id: RecipeId) -> Option<Bean> {
        self.singletons
            .lock()
            .get(&id)
            .filter(|slot| slot.phase == Phase::Populated)
            .map(|slot| slot.bean.clone())
    }

    pub(crate) fn phase(&self, id: RecipeId) -> Option<Phase> {
        self.singletons.lock().get(&id).map(|slot| slot.phase)
    }

    /// Publishes the populated singletons of a completed outermost pass.
    pub(crate) fn publish(&self, slots: impl IntoIterator<Item = (RecipeId, Slot)>) {
        let mut singletons = self.singletons.lock();
        for (id, slot) in slots {
            if slot.phase == Phase::Populated {
                trace!(recipe = %id, "publishing singleton");
                singletons.entry(id).or_insert(slot);
            }
        }
    }

    /// Takes a populated singleton out of service for shutdown. Returns the
    /// instance once; the slot stays behind as `Released`.
    pub(crate) fn take_singleton(&self, id: RecipeId) -> Option<Bean> {
        let mut singletons = self.singletons.lock();
        let slot = singletons.get_mut(&id)?;
        if slot.phase != Phase::Populated {
            return None;
        }
        slot.phase = Phase::Released;
        Some(slot.bean.clone())
    }

    #[cfg(any(test, feature = "diagnostics"))]
    pub(crate) fn singleton_count(&self) -> usize {
        self.singletons
            .lock()
            .values()
            .filter(|slot| slot.phase == Phase::Populated)
            .count()
    }

    pub(crate) fn listeners(&self) -> &Arc<CreationListeners> {
        &self.listeners
    }

    pub(crate) fn observers(&self) -> &Observers {
        &self.observers
    }

    pub(crate) fn type_loader(&self) -> &dyn TypeLoader {
        self.type_loader.as_ref()
    }

    pub(crate) fn type_loader_arc(&self) -> &Arc<dyn TypeLoader> {
        &self.type_loader
    }

    pub(crate) fn conversion(&self) -> &ConversionHelper {
        &self.conversion
    }

    pub(crate) fn conversion_arc(&self) -> &Arc<ConversionHelper> {
        &self.conversion
    }

    pub(crate) fn config(&self) -> &EngineConfig {
        &self.config
    }
}
