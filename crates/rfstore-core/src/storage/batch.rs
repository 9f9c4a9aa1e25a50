//! Batch Transaction Controller
//!
//! A [`Batch`] is one open write transaction. It borrows the store mutably,
//! so a second batch cannot be opened while one is alive, and statements
//! cannot outlive the transaction they were prepared for.

use std::collections::HashSet;

use rusqlite::{params, Connection, TransactionBehavior};

use super::sqlite::{self, Result, StoreError, DROP_SQL, INSERT_SQL, UPDATE_SQL};
use crate::emitter::{BoundingBox, EmitterRecord, EmitterType, RfIdentification};

/// An open, atomic sequence of mutations
///
/// [`end`](Batch::end) commits only when something was written. Dropping a
/// batch without ending it discards every change.
pub struct Batch<'s> {
    tx: rusqlite::Transaction<'s>,
    updates_made: bool,
}

impl<'s> Batch<'s> {
    pub(super) fn begin(conn: &'s mut Connection) -> Result<Self> {
        if !conn.is_autocommit() {
            tracing::debug!("beginTransaction() - already in a transaction");
            return Err(StoreError::TransactionMisuse(
                "connection is already inside a transaction".to_string(),
            ));
        }

        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        // compile the statements this batch is likely to run
        for sql in [INSERT_SQL, UPDATE_SQL, DROP_SQL] {
            tx.prepare_cached(sql)?;
        }

        Ok(Self {
            tx,
            updates_made: false,
        })
    }

    /// Whether any mutation ran since the batch began
    pub fn updates_made(&self) -> bool {
        self.updates_made
    }

    /// Insert a new emitter
    ///
    /// Fails with `ConstraintViolation` if its storage key is already taken.
    pub fn insert(&mut self, emitter: &EmitterRecord) -> Result<()> {
        tracing::debug!("Inserting {} into db", emitter.log_string());
        let key = emitter.storage_key();
        let mut stmt = self.tx.prepare_cached(INSERT_SQL)?;
        stmt.execute(params![
            key,
            emitter.rf_type().ordinal(),
            emitter.trust,
            emitter.latitude,
            emitter.longitude,
            emitter.radius_ns as f64,
            emitter.radius_ew as f64,
            emitter.note,
        ])
        .map_err(|e| StoreError::from_insert(e, &key))?;
        self.updates_made = true;
        Ok(())
    }

    /// Overwrite trust, position, radii and note of a stored emitter
    ///
    /// Returns the number of rows changed: 0 when the emitter is not stored
    /// under this type.
    pub fn update(&mut self, emitter: &EmitterRecord) -> Result<usize> {
        tracing::debug!("Updating {}", emitter.log_string());
        let mut stmt = self.tx.prepare_cached(UPDATE_SQL)?;
        let changed = stmt.execute(params![
            emitter.trust,
            emitter.latitude,
            emitter.longitude,
            emitter.radius_ns as f64,
            emitter.radius_ew as f64,
            emitter.note,
            emitter.storage_key(),
            emitter.rf_type().ordinal(),
        ])?;
        self.updates_made = true;
        Ok(changed)
    }

    /// Delete an emitter, a no-op when it is not stored under this type
    pub fn drop_emitter(&mut self, id: &RfIdentification) -> Result<usize> {
        tracing::debug!("Dropping {} from db", id.log_string());
        let mut stmt = self.tx.prepare_cached(DROP_SQL)?;
        let changed = stmt.execute(params![id.storage_key(), id.rf_type.ordinal()])?;
        self.updates_made = true;
        Ok(changed)
    }

    /// Finish the batch, committing if any mutation ran
    ///
    /// Returns whether the batch was committed.
    pub fn end(self) -> Result<bool> {
        if self.updates_made {
            tracing::debug!("endTransaction() - committing");
            self.tx.commit()?;
        } else {
            tracing::debug!("endTransaction() - nothing to commit");
            self.tx.rollback()?;
        }
        Ok(self.updates_made)
    }

    /// Throw away every change made in this batch
    pub fn discard(self) -> Result<()> {
        tracing::debug!("Discarding transaction");
        self.tx.rollback()?;
        Ok(())
    }

    // ========== Reads, seeing this batch's own writes ==========

    pub fn get_emitter(&self, id: &RfIdentification) -> Result<Option<EmitterRecord>> {
        sqlite::query_emitter(&self.tx, id)
    }

    pub fn get_emitters<'a, I>(&self, ids: I) -> Result<Vec<EmitterRecord>>
    where
        I: IntoIterator<Item = &'a RfIdentification>,
    {
        sqlite::query_emitters(&self.tx, ids)
    }

    pub fn get_ids(&self, rf_type: EmitterType, bb: &BoundingBox) -> Result<HashSet<RfIdentification>> {
        sqlite::query_ids(&self.tx, rf_type, bb)
    }

    pub fn get_emitters_in_box(
        &self,
        rf_types: &[EmitterType],
        bb: &BoundingBox,
    ) -> Result<Vec<EmitterRecord>> {
        sqlite::query_emitters_in_box(&self.tx, rf_types, bb)
    }
}
