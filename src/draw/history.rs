use crate::draw::model::Command;

/// Committed commands plus two undo layers that share the same visible list.
///
/// Command-level undo/redo always wins while `committed` is non-empty. The
/// snapshot layer only comes into play for "clear all": an undo on an empty
/// list restores the last cleared snapshot, a redo on an exhausted command
/// redo stack clears again. `snapshot_redo` carries no data, only a count.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DrawHistory {
    committed: Vec<Command>,
    redo_stack: Vec<Command>,
    snapshot_undo: Vec<Vec<Command>>,
    snapshot_redo: usize,
    revision: u64,
}

impl DrawHistory {
    pub fn commit(&mut self, command: Command) -> bool {
        if !command.is_committable() {
            return false;
        }
        self.committed.push(command);
        self.redo_stack.clear();
        self.bump();
        true
    }

    pub fn undo(&mut self) -> bool {
        if let Some(command) = self.committed.pop() {
            self.redo_stack.push(command);
            self.bump();
            return true;
        }
        if let Some(snapshot) = self.snapshot_undo.pop() {
            self.committed = snapshot;
            self.snapshot_redo += 1;
            self.bump();
            return true;
        }
        false
    }

    pub fn redo(&mut self) -> bool {
        if let Some(command) = self.redo_stack.pop() {
            self.committed.push(command);
            self.bump();
            return true;
        }
        if self.snapshot_redo > 0 {
            self.snapshot_redo -= 1;
            self.snapshot_undo.push(std::mem::take(&mut self.committed));
            self.bump();
            return true;
        }
        false
    }

    /// Clears the canvas as a single undoable action.
    pub fn clear_all(&mut self) {
        if !self.committed.is_empty() {
            self.snapshot_undo.push(std::mem::take(&mut self.committed));
            self.snapshot_redo = 0;
        }
        self.redo_stack.clear();
        self.bump();
    }

    /// Forces the next composition to rebuild the content layer.
    pub fn invalidate(&mut self) {
        self.bump();
    }

    pub fn committed(&self) -> &[Command] {
        &self.committed
    }

    pub fn redo_stack(&self) -> &[Command] {
        &self.redo_stack
    }

    pub fn undo_len(&self) -> usize {
        self.committed.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn snapshot_undo_len(&self) -> usize {
        self.snapshot_undo.len()
    }

    pub fn snapshot_redo_len(&self) -> usize {
        self.snapshot_redo
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn bump(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }
}
