use anyhow::Result;
use tracing::debug;

use crate::database_ops::{Column, Record, Store, Table};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Inserted,
    Updated,
}

/// Writes one row keyed by `key`: updates `values` when the key is already present,
/// inserts `key + values` otherwise. Issues exactly one write.
pub async fn reconcile(
    store: &dyn Store,
    table: Table,
    key: &[Column],
    values: &[Column],
) -> Result<Outcome> {
    if store.exists(table, key).await? {
        store.update(table, key, values).await?;
        debug!(%table, "row updated");
        return Ok(Outcome::Updated);
    }
    let mut columns = key.to_vec();
    columns.extend_from_slice(values);
    store.insert(table, &columns).await?;
    debug!(%table, "row inserted");
    Ok(Outcome::Inserted)
}

pub async fn reconcile_record<R>(store: &dyn Store, record: &R) -> Result<Outcome>
where
    R: Record + Sync + ?Sized,
{
    reconcile(store, record.table(), &record.key(), &record.values()).await
}
