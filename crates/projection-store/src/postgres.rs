use std::str::FromStr;

use async_trait::async_trait;
use common::{BlockHash, OutputRef, ParseHashError, Slot, TxHash};
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow};

use crate::{
    OrderRecord, OrderStatus, OrderTerms, ProjectionCheckpoint, RecordKey, Result, StoreError,
    UtxoRecord, UtxoStatus,
    store::{ProjectionStore, UnitOfWork},
};

const UTXO_COLUMNS: &str =
    "slot, tx_hash, output_index, owner, status, spent_slot, raw_output, datum, amount";

// `quantity` is NUMERIC(20,0) so the full u64 range fits; it crosses the
// wire as text.
const ORDER_COLUMNS: &str = "slot, tx_hash, output_index, owner, policy_id, asset_name, \
     quantity::text AS quantity, status, spent_slot, buyer, spending_tx, raw_output, datum";

/// PostgreSQL-backed projection store.
///
/// Each unit of work is one database transaction; dropping it uncommitted
/// rolls the transaction back.
#[derive(Clone)]
pub struct PostgresProjectionStore {
    pool: PgPool,
}

impl PostgresProjectionStore {
    /// Creates a new PostgreSQL projection store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects to `database_url` and returns a store over the new pool.
    pub async fn connect(database_url: &str) -> Result<Self> {
        Ok(Self::new(PgPool::connect(database_url).await?))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn to_db(value: u64, column: &str) -> Result<i64> {
    i64::try_from(value)
        .map_err(|_| StoreError::CorruptRecord(format!("{column} {value} does not fit BIGINT")))
}

fn from_db(value: i64, column: &str) -> Result<u64> {
    u64::try_from(value)
        .map_err(|_| StoreError::CorruptRecord(format!("negative {column} {value}")))
}

fn quantity_from_db(value: &str) -> Result<u64> {
    value
        .parse()
        .map_err(|_| StoreError::CorruptRecord(format!("quantity {value} out of range")))
}

fn slot_from_db(value: i64) -> Result<Slot> {
    from_db(value, "slot").map(Slot::new)
}

fn hash_from_db<H: FromStr<Err = ParseHashError>>(value: &str) -> Result<H> {
    value
        .parse()
        .map_err(|e: ParseHashError| StoreError::CorruptRecord(e.to_string()))
}

fn hex_from_db(value: &str, column: &str) -> Result<Vec<u8>> {
    hex::decode(value).map_err(|e| StoreError::CorruptRecord(format!("{column}: {e}")))
}

fn index_from_db(value: i64) -> Result<u32> {
    u32::try_from(value)
        .map_err(|_| StoreError::CorruptRecord(format!("output index {value} out of range")))
}

fn key_from_row(row: &PgRow) -> Result<RecordKey> {
    Ok(RecordKey {
        slot: slot_from_db(row.try_get("slot")?)?,
        tx_hash: hash_from_db(row.try_get::<&str, _>("tx_hash")?)?,
        index: index_from_db(row.try_get("output_index")?)?,
    })
}

fn row_to_utxo(row: PgRow) -> Result<UtxoRecord> {
    let spent_slot: Option<i64> = row.try_get("spent_slot")?;
    UtxoRecord::restore(
        key_from_row(&row)?,
        row.try_get("owner")?,
        UtxoStatus::parse(row.try_get("status")?)?,
        spent_slot.map(slot_from_db).transpose()?,
        row.try_get("raw_output")?,
        row.try_get("datum")?,
        row.try_get("amount")?,
    )
}

fn row_to_order(row: PgRow) -> Result<OrderRecord> {
    let spent_slot: Option<i64> = row.try_get("spent_slot")?;
    let spending_tx: Option<&str> = row.try_get("spending_tx")?;
    let terms = OrderTerms {
        policy_id: hex_from_db(row.try_get("policy_id")?, "policy_id")?,
        asset_name: hex_from_db(row.try_get("asset_name")?, "asset_name")?,
        quantity: quantity_from_db(row.try_get("quantity")?)?,
    };
    OrderRecord::restore(
        key_from_row(&row)?,
        row.try_get("owner")?,
        terms,
        OrderStatus::parse(row.try_get("status")?)?,
        spent_slot.map(slot_from_db).transpose()?,
        row.try_get("buyer")?,
        spending_tx.map(hash_from_db::<TxHash>).transpose()?,
        row.try_get("raw_output")?,
        row.try_get("datum")?,
    )
}

fn row_to_checkpoint(row: PgRow) -> Result<ProjectionCheckpoint> {
    Ok(ProjectionCheckpoint {
        projection: row.try_get("projection")?,
        slot: slot_from_db(row.try_get("slot")?)?,
        block_hash: hash_from_db::<BlockHash>(row.try_get("block_hash")?)?,
        applied_at: row.try_get("applied_at")?,
    })
}

/// Splits output references into the parallel arrays `UNNEST` takes.
fn ref_arrays(refs: &[OutputRef]) -> (Vec<String>, Vec<i64>) {
    refs.iter()
        .map(|r| (r.tx_hash.to_hex(), i64::from(r.index)))
        .unzip()
}

#[async_trait]
impl ProjectionStore for PostgresProjectionStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PostgresUnitOfWork { tx }))
    }

    async fn latest_checkpoint(&self, projection: &str) -> Result<Option<ProjectionCheckpoint>> {
        let row = sqlx::query(
            r#"
            SELECT projection, slot, block_hash, applied_at
            FROM projection_checkpoints
            WHERE projection = $1
            ORDER BY slot DESC
            LIMIT 1
            "#,
        )
        .bind(projection)
        .fetch_optional(&self.pool)
        .await?;

        row.map(row_to_checkpoint).transpose()
    }

    async fn list_utxos(&self) -> Result<Vec<UtxoRecord>> {
        let rows = sqlx::query(&format!(
            "SELECT {UTXO_COLUMNS} FROM utxos ORDER BY slot, tx_hash, output_index"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_utxo).collect()
    }

    async fn list_orders(&self) -> Result<Vec<OrderRecord>> {
        let rows = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders ORDER BY slot, tx_hash, output_index"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_order).collect()
    }
}

struct PostgresUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl UnitOfWork for PostgresUnitOfWork {
    async fn put_utxos(&mut self, records: &[UtxoRecord]) -> Result<()> {
        for record in records {
            let key = record.key();
            sqlx::query(
                r#"
                INSERT INTO utxos (slot, tx_hash, output_index, owner, status, spent_slot, raw_output, datum, amount)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                ON CONFLICT (slot, tx_hash, output_index)
                DO UPDATE SET status = EXCLUDED.status, spent_slot = EXCLUDED.spent_slot
                "#,
            )
            .bind(to_db(key.slot.as_u64(), "slot")?)
            .bind(key.tx_hash.to_hex())
            .bind(i64::from(key.index))
            .bind(record.owner())
            .bind(record.status().as_str())
            .bind(
                record
                    .spent_slot()
                    .map(|s| to_db(s.as_u64(), "spent_slot"))
                    .transpose()?,
            )
            .bind(record.raw_output())
            .bind(record.datum())
            .bind(record.amount())
            .execute(&mut *self.tx)
            .await?;
        }
        Ok(())
    }

    async fn find_utxos(&mut self, refs: &[OutputRef]) -> Result<Vec<UtxoRecord>> {
        if refs.is_empty() {
            return Ok(Vec::new());
        }
        let (hashes, indices) = ref_arrays(refs);
        let rows = sqlx::query(&format!(
            r#"
            SELECT {UTXO_COLUMNS} FROM utxos
            WHERE (tx_hash, output_index) IN (SELECT * FROM UNNEST($1::text[], $2::bigint[]))
            ORDER BY slot, tx_hash, output_index
            "#
        ))
        .bind(hashes)
        .bind(indices)
        .fetch_all(&mut *self.tx)
        .await?;

        rows.into_iter().map(row_to_utxo).collect()
    }

    async fn utxos_spent_since(&mut self, slot: Slot) -> Result<Vec<UtxoRecord>> {
        let rows = sqlx::query(&format!(
            "SELECT {UTXO_COLUMNS} FROM utxos WHERE spent_slot >= $1 ORDER BY slot, tx_hash, output_index"
        ))
        .bind(to_db(slot.as_u64(), "slot")?)
        .fetch_all(&mut *self.tx)
        .await?;

        rows.into_iter().map(row_to_utxo).collect()
    }

    async fn delete_utxos_since(&mut self, slot: Slot) -> Result<u64> {
        let result = sqlx::query("DELETE FROM utxos WHERE slot >= $1")
            .bind(to_db(slot.as_u64(), "slot")?)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected())
    }

    async fn put_orders(&mut self, records: &[OrderRecord]) -> Result<()> {
        for record in records {
            let key = record.key();
            let terms = record.terms();
            sqlx::query(
                r#"
                INSERT INTO orders (slot, tx_hash, output_index, owner, policy_id, asset_name, quantity,
                                    status, spent_slot, buyer, spending_tx, raw_output, datum)
                VALUES ($1, $2, $3, $4, $5, $6, $7::numeric, $8, $9, $10, $11, $12, $13)
                ON CONFLICT (slot, tx_hash, output_index)
                DO UPDATE SET status = EXCLUDED.status,
                              spent_slot = EXCLUDED.spent_slot,
                              buyer = EXCLUDED.buyer,
                              spending_tx = EXCLUDED.spending_tx
                "#,
            )
            .bind(to_db(key.slot.as_u64(), "slot")?)
            .bind(key.tx_hash.to_hex())
            .bind(i64::from(key.index))
            .bind(record.owner())
            .bind(hex::encode(&terms.policy_id))
            .bind(hex::encode(&terms.asset_name))
            .bind(terms.quantity.to_string())
            .bind(record.status().as_str())
            .bind(
                record
                    .spent_slot()
                    .map(|s| to_db(s.as_u64(), "spent_slot"))
                    .transpose()?,
            )
            .bind(record.buyer())
            .bind(record.spending_tx().map(|h| h.to_hex()))
            .bind(record.raw_output())
            .bind(record.datum())
            .execute(&mut *self.tx)
            .await?;
        }
        Ok(())
    }

    async fn find_orders(&mut self, refs: &[OutputRef]) -> Result<Vec<OrderRecord>> {
        if refs.is_empty() {
            return Ok(Vec::new());
        }
        let (hashes, indices) = ref_arrays(refs);
        let rows = sqlx::query(&format!(
            r#"
            SELECT {ORDER_COLUMNS} FROM orders
            WHERE (tx_hash, output_index) IN (SELECT * FROM UNNEST($1::text[], $2::bigint[]))
            ORDER BY slot, tx_hash, output_index
            "#
        ))
        .bind(hashes)
        .bind(indices)
        .fetch_all(&mut *self.tx)
        .await?;

        rows.into_iter().map(row_to_order).collect()
    }

    async fn orders_spent_since(&mut self, slot: Slot) -> Result<Vec<OrderRecord>> {
        let rows = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE spent_slot >= $1 ORDER BY slot, tx_hash, output_index"
        ))
        .bind(to_db(slot.as_u64(), "slot")?)
        .fetch_all(&mut *self.tx)
        .await?;

        rows.into_iter().map(row_to_order).collect()
    }

    async fn delete_orders_since(&mut self, slot: Slot) -> Result<u64> {
        let result = sqlx::query("DELETE FROM orders WHERE slot >= $1")
            .bind(to_db(slot.as_u64(), "slot")?)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected())
    }

    async fn put_checkpoint(&mut self, checkpoint: &ProjectionCheckpoint) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO projection_checkpoints (projection, slot, block_hash, applied_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (projection, slot)
            DO UPDATE SET block_hash = EXCLUDED.block_hash, applied_at = EXCLUDED.applied_at
            "#,
        )
        .bind(&checkpoint.projection)
        .bind(to_db(checkpoint.slot.as_u64(), "slot")?)
        .bind(checkpoint.block_hash.to_hex())
        .bind(checkpoint.applied_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn delete_checkpoints_since(&mut self, projection: &str, slot: Slot) -> Result<u64> {
        let result =
            sqlx::query("DELETE FROM projection_checkpoints WHERE projection = $1 AND slot >= $2")
                .bind(projection)
                .bind(to_db(slot.as_u64(), "slot")?)
                .execute(&mut *self.tx)
                .await?;
        Ok(result.rows_affected())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantity_covers_the_full_u64_range() {
        assert_eq!(quantity_from_db(&u64::MAX.to_string()).unwrap(), u64::MAX);
        assert_eq!(quantity_from_db("0").unwrap(), 0);
    }

    #[test]
    fn quantity_outside_u64_is_corrupt() {
        assert!(matches!(
            quantity_from_db("18446744073709551616"),
            Err(StoreError::CorruptRecord(_))
        ));
        assert!(matches!(
            quantity_from_db("-1"),
            Err(StoreError::CorruptRecord(_))
        ));
    }

    #[test]
    fn slots_beyond_bigint_are_rejected() {
        assert_eq!(to_db(42, "slot").unwrap(), 42);
        assert!(to_db(u64::MAX, "slot").is_err());
    }
}
