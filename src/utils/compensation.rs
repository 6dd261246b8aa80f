use tracing::warn;

use crate::types::error::DatabaseError;

type UndoAction<'a, C> = Box<dyn FnOnce(&mut C) -> Result<(), DatabaseError> + 'a>;

/// Best-effort rollback for operations that touch several structures.
///
/// Each completed step registers an undo action. If a later step fails the
/// undo actions run newest first against the same context. This is not
/// atomic: when an undo action itself fails, the caller gets
/// [`DatabaseError::CompensationFailed`] carrying both the original error and
/// every secondary failure, and partial state may remain.
pub struct Compensation<'a, C> {
    undo: Vec<(&'static str, UndoAction<'a, C>)>,
}

impl<'a, C> Compensation<'a, C> {
    pub fn new() -> Self {
        Self { undo: Vec::new() }
    }

    /// Run `body`; on failure, undo whatever it registered.
    pub fn run<T, F>(ctx: &mut C, body: F) -> Result<T, DatabaseError>
    where
        F: FnOnce(&mut C, &mut Compensation<'a, C>) -> Result<T, DatabaseError>,
    {
        let mut compensation = Compensation::new();
        match body(ctx, &mut compensation) {
            Ok(value) => {
                compensation.commit();
                Ok(value)
            }
            Err(err) => Err(compensation.rollback(ctx, err)),
        }
    }

    /// Register the action that reverses a step that just succeeded.
    pub fn on_failure<F>(&mut self, label: &'static str, undo: F)
    where
        F: FnOnce(&mut C) -> Result<(), DatabaseError> + 'a,
    {
        self.undo.push((label, Box::new(undo)));
    }

    pub fn len(&self) -> usize {
        self.undo.len()
    }

    pub fn is_empty(&self) -> bool {
        self.undo.is_empty()
    }

    /// Forget every registered undo action.
    pub fn commit(self) {}

    /// Undo every registered step in reverse order and return the error the
    /// caller should see.
    pub fn rollback(self, ctx: &mut C, original: DatabaseError) -> DatabaseError {
        let mut failures = Vec::new();
        for (label, undo) in self.undo.into_iter().rev() {
            if let Err(err) = undo(ctx) {
                warn!(step = label, error = %err, "compensation step failed");
                failures.push(err);
            }
        }

        if failures.is_empty() {
            original
        } else {
            DatabaseError::CompensationFailed {
                original: Box::new(original),
                failures,
            }
        }
    }
}

impl<C> Default for Compensation<'_, C> {
    fn default() -> Self {
        Self::new()
    }
}
