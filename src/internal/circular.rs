//! Cycle and depth tracking for the resolution passes of an engine.

use crate::error::{DiError, DiResult};
use crate::recipe::RecipeId;

/// Stack of the recipes currently being resolved.
///
/// The stack belongs to the engine and is only touched by the thread holding
/// the pass lock. A nested pass started from a constructor or listener pushes
/// onto the frames of the pass that encloses it, so the depth limit and the
/// cycle paths span nested passes.
pub(crate) struct ResolutionStack {
    frames: Vec<(RecipeId, String)>,
    max_depth: usize,
}

impl ResolutionStack {
    pub(crate) fn new(max_depth: usize) -> Self {
        ResolutionStack {
            frames: Vec::new(),
            max_depth,
        }
    }

    /// Pushes a frame; fails when the depth limit is reached.
    pub(crate) fn enter(&mut self, id: RecipeId, name: String) -> DiResult<()> {
        if self.frames.len() >= self.max_depth {
            return Err(DiError::DepthExceeded(self.max_depth));
        }
        self.frames.push((id, name));
        Ok(())
    }

    pub(crate) fn exit(&mut self, id: RecipeId) {
        if let Some((last, _)) = self.frames.pop() {
            debug_assert_eq!(last, id);
        }
    }

    /// Path from the first frame of `id` to the top of the stack, closed with
    /// `name` again.
    pub(crate) fn cycle_path(&self, id: RecipeId, name: &str) -> Vec<String> {
        let start = self
            .frames
            .iter()
            .position(|(frame, _)| *frame == id)
            .unwrap_or(0);
        let mut path: Vec<String> = self.frames[start..]
            .iter()
            .map(|(_, n)| n.clone())
            .collect();
        path.push(name.to_string());
        path
    }

    pub(crate) fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Drops the frames above `depth`, left behind by a pass that unwound.
    pub(crate) fn truncate(&mut self, depth: usize) {
        self.frames.truncate(depth);
    }
}
