use crate::message::StrokeOp;

/// Authoritative, append-only drawing log of a room plus the redo buffer.
///
/// Undo and redo act on the room as a whole, not per author: anyone's undo
/// removes the most recent stroke regardless of who drew it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StrokeLog {
    strokes: Vec<StrokeOp>,
    redo: Vec<StrokeOp>,
}

impl StrokeLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Any new draw invalidates prior redo history.
    pub fn append(&mut self, op: StrokeOp) {
        self.strokes.push(op);
        self.redo.clear();
    }

    /// Returns `false` when there was nothing to undo.
    pub fn undo(&mut self) -> bool {
        match self.strokes.pop() {
            Some(op) => {
                self.redo.push(op);
                true
            }
            None => false,
        }
    }

    /// Returns `false` when the redo buffer was empty.
    pub fn redo(&mut self) -> bool {
        match self.redo.pop() {
            Some(op) => {
                self.strokes.push(op);
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.strokes.clear();
        self.redo.clear();
    }

    /// Replaces the log with a stored board. Redo history does not survive.
    pub fn replace(&mut self, strokes: Vec<StrokeOp>) {
        self.strokes = strokes;
        self.redo.clear();
    }

    /// Full ordered sequence, for resync.
    pub fn snapshot(&self) -> Vec<StrokeOp> {
        self.strokes.clone()
    }

    pub fn strokes(&self) -> &[StrokeOp] {
        &self.strokes
    }

    pub fn len(&self) -> usize {
        self.strokes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strokes.is_empty()
    }

    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }
}
