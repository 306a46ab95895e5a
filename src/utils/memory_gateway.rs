//! In-memory gateway implementation for testing

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockWriteGuard};

use crate::traits::*;
use crate::types::*;

/// Kinds of gateway call, for fault injection and call counting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GatewayOp {
    Select,
    Insert,
    Update,
    Delete,
}

#[derive(Debug, Default)]
struct MemoryState {
    tables: HashMap<Table, Vec<Value>>,
    faults: Vec<(Table, GatewayOp)>,
    calls: HashMap<(Table, GatewayOp), usize>,
}

impl MemoryState {
    /// Count the call and consume a matching injected fault, if any
    fn enter(&mut self, table: Table, op: GatewayOp) -> LedgerResult<()> {
        *self.calls.entry((table, op)).or_default() += 1;

        if let Some(pos) = self.faults.iter().position(|f| *f == (table, op)) {
            self.faults.remove(pos);
            return Err(LedgerError::Gateway(format!(
                "{:?} on {} failed",
                op, table
            )));
        }

        Ok(())
    }

    /// Position of the row with this id, if it belongs to the business
    fn position<R: Record>(&self, business_id: &str, id: &str) -> LedgerResult<Option<usize>> {
        let Some(rows) = self.tables.get(&R::TABLE) else {
            return Ok(None);
        };

        for (pos, row) in rows.iter().enumerate() {
            if row.get("id").and_then(Value::as_str) != Some(id) {
                continue;
            }
            let record: R = serde_json::from_value(row.clone())?;
            if record.business_id() == business_id {
                return Ok(Some(pos));
            }
        }

        Ok(None)
    }
}

/// In-memory gateway for tests and local development
///
/// Rows are kept as JSON values per table, the way a hosted backend hands
/// back decoded rows. Clones share the same state.
#[derive(Debug, Clone, Default)]
pub struct MemoryGateway {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryGateway {
    /// Create an empty gateway
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> RwLockWriteGuard<'_, MemoryState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Clear all data, injected faults and call counts
    pub fn clear(&self) {
        let mut state = self.state();
        state.tables.clear();
        state.faults.clear();
        state.calls.clear();
    }

    /// Make the next `op` against `table` fail with a gateway error
    pub fn fail_on(&self, table: Table, op: GatewayOp) {
        self.state().faults.push((table, op));
    }

    /// Number of `op` calls made against `table` so far
    pub fn call_count(&self, table: Table, op: GatewayOp) -> usize {
        self.state().calls.get(&(table, op)).copied().unwrap_or(0)
    }

    /// Number of rows in `table` across all businesses
    pub fn row_count(&self, table: Table) -> usize {
        self.state().tables.get(&table).map_or(0, Vec::len)
    }
}

#[async_trait]
impl PersistenceGateway for MemoryGateway {
    async fn get<R: Record>(&self, business_id: &str, id: &str) -> LedgerResult<Option<R>> {
        let mut state = self.state();
        state.enter(R::TABLE, GatewayOp::Select)?;

        match state.position::<R>(business_id, id)? {
            Some(pos) => Ok(Some(serde_json::from_value(
                state.tables[&R::TABLE][pos].clone(),
            )?)),
            None => Ok(None),
        }
    }

    async fn select<R: Record>(
        &self,
        business_id: &str,
        filter: &Filter,
    ) -> LedgerResult<Vec<R>> {
        let mut state = self.state();
        state.enter(R::TABLE, GatewayOp::Select)?;

        let mut records = Vec::new();
        for row in state.tables.get(&R::TABLE).into_iter().flatten() {
            if !filter.matches(row) {
                continue;
            }
            let record: R = serde_json::from_value(row.clone())?;
            if record.business_id() == business_id {
                records.push(record);
            }
        }

        Ok(records)
    }

    async fn insert<R: Record>(&mut self, record: &R) -> LedgerResult<R> {
        let mut state = self.state();
        state.enter(R::TABLE, GatewayOp::Insert)?;

        let row = serde_json::to_value(record)?;
        let rows = state.tables.entry(R::TABLE).or_default();
        if rows
            .iter()
            .any(|r| r.get("id").and_then(Value::as_str) == Some(record.id()))
        {
            return Err(LedgerError::Gateway(format!(
                "duplicate key in {}: {}",
                R::TABLE,
                record.id()
            )));
        }

        rows.push(row.clone());
        Ok(serde_json::from_value(row)?)
    }

    async fn update<R: Record>(&mut self, record: &R) -> LedgerResult<R> {
        let mut state = self.state();
        state.enter(R::TABLE, GatewayOp::Update)?;

        let pos = state
            .position::<R>(record.business_id(), record.id())?
            .ok_or_else(|| {
                LedgerError::Gateway(format!("no row in {} with id {}", R::TABLE, record.id()))
            })?;

        let row = serde_json::to_value(record)?;
        if let Some(rows) = state.tables.get_mut(&R::TABLE) {
            rows[pos] = row.clone();
        }
        Ok(serde_json::from_value(row)?)
    }

    async fn delete<R: Record>(&mut self, business_id: &str, id: &str) -> LedgerResult<()> {
        let mut state = self.state();
        state.enter(R::TABLE, GatewayOp::Delete)?;

        let pos = state.position::<R>(business_id, id)?.ok_or_else(|| {
            LedgerError::Gateway(format!("no row in {} with id {}", R::TABLE, id))
        })?;

        if let Some(rows) = state.tables.get_mut(&R::TABLE) {
            rows.remove(pos);
        }
        Ok(())
    }
}
