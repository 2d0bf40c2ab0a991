//! Undo/Redo command stack.
//!
//! History is snapshot-based: each step stores the serialized canvas before
//! and after, and undo/redo reload the matching snapshot. Nothing here
//! knows how individual mutations work.
//!
//! Gestures (a drag, a slider scrub) use **batching**: the text is captured
//! when the outermost batch opens and again when it closes, so the whole
//! gesture is one undo step.

use crate::canvas::{Canvas, CanvasMutation};
use pb_core::DocumentError;

/// One undoable step.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub text_before: String,
    pub text_after: String,
    pub description: String,
}

/// Manages undo/redo stacks with batch grouping for gestures.
#[derive(Debug)]
pub struct CommandStack {
    undo_stack: Vec<Command>,
    redo_stack: Vec<Command>,
    /// Maximum undo depth.
    max_depth: usize,
    /// Batch nesting depth (0 = not batching).
    batch_depth: usize,
    /// Text captured at the start of a batch, with its description.
    batch_snapshot: Option<(String, String)>,
    /// Whether any document mutation occurred during the current batch.
    batch_dirty: bool,
}

impl CommandStack {
    pub fn new(max_depth: usize) -> Self {
        Self {
            undo_stack: Vec::with_capacity(max_depth.min(64)),
            redo_stack: Vec::new(),
            max_depth,
            batch_depth: 0,
            batch_snapshot: None,
            batch_dirty: false,
        }
    }

    /// Start a batch group. Mutations until the matching `end_batch()` are
    /// applied live but recorded as one undo step.
    pub fn begin_batch(&mut self, canvas: &Canvas, description: &str) {
        if self.batch_depth == 0 {
            self.batch_snapshot = Some((canvas.serialize(), description.to_string()));
            self.batch_dirty = false;
        }
        self.batch_depth += 1;
    }

    /// End a batch group. When the outermost batch closes and the document
    /// changed, one command is pushed.
    pub fn end_batch(&mut self, canvas: &Canvas) {
        if self.batch_depth == 0 {
            return;
        }
        self.batch_depth -= 1;
        if self.batch_depth > 0 {
            return;
        }
        if let Some((text_before, description)) = self.batch_snapshot.take()
            && self.batch_dirty
        {
            let text_after = canvas.serialize();
            if text_before != text_after {
                self.push(Command {
                    text_before,
                    text_after,
                    description,
                });
            }
        }
        self.batch_dirty = false;
    }

    pub fn in_batch(&self) -> bool {
        self.batch_depth > 0
    }

    /// Apply a mutation to the canvas and record it.
    ///
    /// Presentation-flag mutations are applied but never recorded.
    pub fn execute(
        &mut self,
        canvas: &mut Canvas,
        mutation: CanvasMutation,
        description: &str,
    ) -> Result<(), DocumentError> {
        if !mutation.affects_document() {
            return canvas.apply_mutation(mutation);
        }
        if self.batch_depth > 0 {
            // The snapshot at end_batch() captures the cumulative effect.
            canvas.apply_mutation(mutation)?;
            self.batch_dirty = true;
            return Ok(());
        }

        let text_before = canvas.serialize();
        canvas.apply_mutation(mutation)?;
        let text_after = canvas.serialize();
        if text_before != text_after {
            self.push(Command {
                text_before,
                text_after,
                description: description.to_string(),
            });
        }
        Ok(())
    }

    /// Undo the last step. Returns its description.
    pub fn undo(&mut self, canvas: &mut Canvas) -> Option<String> {
        let cmd = self.undo_stack.pop()?;
        if let Err(err) = canvas.restore(&cmd.text_before) {
            // Snapshots come from `serialize`, so this only trips on a bug.
            log::error!("undo snapshot failed to load: {err}");
            return None;
        }
        let desc = cmd.description.clone();
        self.redo_stack.push(cmd);
        Some(desc)
    }

    /// Redo the last undone step. Returns its description.
    pub fn redo(&mut self, canvas: &mut Canvas) -> Option<String> {
        let cmd = self.redo_stack.pop()?;
        if let Err(err) = canvas.restore(&cmd.text_after) {
            log::error!("redo snapshot failed to load: {err}");
            return None;
        }
        let desc = cmd.description.clone();
        self.undo_stack.push(cmd);
        Some(desc)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    /// Forget all history (page change, bulk load).
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.batch_depth = 0;
        self.batch_snapshot = None;
        self.batch_dirty = false;
    }

    fn push(&mut self, cmd: Command) {
        self.undo_stack.push(cmd);
        if self.undo_stack.len() > self.max_depth {
            self.undo_stack.remove(0);
        }
        // A new action invalidates the redo branch.
        self.redo_stack.clear();
    }
}

impl Default for CommandStack {
    fn default() -> Self {
        Self::new(100)
    }
}
