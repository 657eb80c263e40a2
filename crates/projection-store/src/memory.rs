use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use common::{OutputRef, Slot, TxHash};
use tokio::sync::RwLock;

use crate::{
    OrderRecord, ProjectionCheckpoint, RecordKey, Result, UtxoRecord,
    store::{ProjectionStore, UnitOfWork},
};

/// A record the tables can index by output reference and spend slot.
trait Row: Clone {
    fn key(&self) -> &RecordKey;
    fn spent_slot(&self) -> Option<Slot>;
}

impl Row for UtxoRecord {
    fn key(&self) -> &RecordKey {
        UtxoRecord::key(self)
    }

    fn spent_slot(&self) -> Option<Slot> {
        UtxoRecord::spent_slot(self)
    }
}

impl Row for OrderRecord {
    fn key(&self) -> &RecordKey {
        OrderRecord::key(self)
    }

    fn spent_slot(&self) -> Option<Slot> {
        OrderRecord::spent_slot(self)
    }
}

/// Smallest key created at `slot`.
fn first_key(slot: Slot) -> RecordKey {
    RecordKey::new(slot, TxHash::new([0; 32]), 0)
}

/// Committed rows plus the indexes rollback and spend lookups go through.
#[derive(Debug)]
struct Table<R> {
    rows: BTreeMap<RecordKey, R>,
    by_ref: HashMap<OutputRef, BTreeSet<RecordKey>>,
    by_spent: BTreeSet<(Slot, RecordKey)>,
}

impl<R> Default for Table<R> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            by_ref: HashMap::new(),
            by_spent: BTreeSet::new(),
        }
    }
}

impl<R: Row> Table<R> {
    fn insert(&mut self, row: R) {
        let key = *row.key();
        self.remove(&key);
        self.by_ref.entry(key.output_ref()).or_default().insert(key);
        if let Some(spent) = row.spent_slot() {
            self.by_spent.insert((spent, key));
        }
        self.rows.insert(key, row);
    }

    fn remove(&mut self, key: &RecordKey) {
        let Some(row) = self.rows.remove(key) else {
            return;
        };
        if let Some(spent) = row.spent_slot() {
            self.by_spent.remove(&(spent, *key));
        }
        let out_ref = key.output_ref();
        if let Some(keys) = self.by_ref.get_mut(&out_ref) {
            keys.remove(key);
            if keys.is_empty() {
                self.by_ref.remove(&out_ref);
            }
        }
    }

    fn keys_for(&self, refs: &[OutputRef]) -> impl Iterator<Item = RecordKey> {
        refs.iter()
            .filter_map(|out_ref| self.by_ref.get(out_ref))
            .flatten()
            .copied()
    }

    fn keys_spent_since(&self, slot: Slot) -> impl Iterator<Item = RecordKey> + '_ {
        self.by_spent
            .range((slot, first_key(Slot::new(0)))..)
            .map(|(_, key)| *key)
    }

    fn keys_created_since(&self, slot: Slot) -> impl Iterator<Item = RecordKey> + '_ {
        self.rows.range(first_key(slot)..).map(|(key, _)| *key)
    }
}

#[derive(Debug, Default)]
struct Tables {
    utxos: Table<UtxoRecord>,
    orders: Table<OrderRecord>,
    checkpoints: HashMap<String, BTreeMap<Slot, ProjectionCheckpoint>>,
}

/// In-memory projection store for tests and database-less runs.
///
/// A unit of work keeps its writes and deletions per key and applies only
/// those on commit, so its cost follows the rows a block touches rather than
/// the size of the tables. Reads merge the staged rows over the committed
/// ones. Units of work that write disjoint keys can run side by side.
#[derive(Clone, Default)]
pub struct InMemoryProjectionStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryProjectionStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProjectionStore for InMemoryProjectionStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>> {
        Ok(Box::new(InMemoryUnitOfWork {
            tables: Arc::clone(&self.tables),
            utxos: BTreeMap::new(),
            orders: BTreeMap::new(),
            checkpoints: HashMap::new(),
        }))
    }

    async fn latest_checkpoint(&self, projection: &str) -> Result<Option<ProjectionCheckpoint>> {
        let tables = self.tables.read().await;
        Ok(tables
            .checkpoints
            .get(projection)
            .and_then(|rows| rows.values().next_back())
            .cloned())
    }

    async fn list_utxos(&self) -> Result<Vec<UtxoRecord>> {
        Ok(self.tables.read().await.utxos.rows.values().cloned().collect())
    }

    async fn list_orders(&self) -> Result<Vec<OrderRecord>> {
        Ok(self.tables.read().await.orders.rows.values().cloned().collect())
    }
}

/// Pending row writes; `None` marks a deletion.
type Staged<R> = BTreeMap<RecordKey, Option<R>>;

struct InMemoryUnitOfWork {
    tables: Arc<RwLock<Tables>>,
    utxos: Staged<UtxoRecord>,
    orders: Staged<OrderRecord>,
    checkpoints: HashMap<String, BTreeMap<Slot, Option<ProjectionCheckpoint>>>,
}

fn visible<R: Row>(table: &Table<R>, staged: &Staged<R>, key: &RecordKey) -> Option<R> {
    match staged.get(key) {
        Some(write) => write.clone(),
        None => table.rows.get(key).cloned(),
    }
}

fn is_live<R: Row>(table: &Table<R>, staged: &Staged<R>, key: &RecordKey) -> bool {
    match staged.get(key) {
        Some(write) => write.is_some(),
        None => table.rows.contains_key(key),
    }
}

fn find<R: Row>(table: &Table<R>, staged: &Staged<R>, refs: &[OutputRef]) -> Vec<R> {
    let wanted: HashSet<&OutputRef> = refs.iter().collect();
    let mut keys: BTreeSet<RecordKey> = table.keys_for(refs).collect();
    keys.extend(
        staged
            .keys()
            .filter(|key| wanted.contains(&key.output_ref())),
    );
    keys.iter()
        .filter_map(|key| visible(table, staged, key))
        .collect()
}

fn spent_since<R: Row>(table: &Table<R>, staged: &Staged<R>, slot: Slot) -> Vec<R> {
    let mut keys: BTreeSet<RecordKey> = table.keys_spent_since(slot).collect();
    keys.extend(staged.keys().copied());
    keys.iter()
        .filter_map(|key| visible(table, staged, key))
        .filter(|row| row.spent_slot().is_some_and(|spent| spent >= slot))
        .collect()
}

fn delete_since<R: Row>(table: &Table<R>, staged: &mut Staged<R>, slot: Slot) -> u64 {
    let mut keys: BTreeSet<RecordKey> = table.keys_created_since(slot).collect();
    keys.extend(staged.range(first_key(slot)..).map(|(key, _)| *key));

    let mut removed = 0;
    for key in keys {
        if is_live(table, staged, &key) {
            removed += 1;
        }
        staged.insert(key, None);
    }
    removed
}

fn apply<R: Row>(table: &mut Table<R>, staged: Staged<R>) {
    for (key, write) in staged {
        match write {
            Some(row) => table.insert(row),
            None => table.remove(&key),
        }
    }
}

#[async_trait]
impl UnitOfWork for InMemoryUnitOfWork {
    async fn put_utxos(&mut self, records: &[UtxoRecord]) -> Result<()> {
        for record in records {
            self.utxos.insert(*record.key(), Some(record.clone()));
        }
        Ok(())
    }

    async fn find_utxos(&mut self, refs: &[OutputRef]) -> Result<Vec<UtxoRecord>> {
        let tables = self.tables.read().await;
        Ok(find(&tables.utxos, &self.utxos, refs))
    }

    async fn utxos_spent_since(&mut self, slot: Slot) -> Result<Vec<UtxoRecord>> {
        let tables = self.tables.read().await;
        Ok(spent_since(&tables.utxos, &self.utxos, slot))
    }

    async fn delete_utxos_since(&mut self, slot: Slot) -> Result<u64> {
        let tables = self.tables.read().await;
        Ok(delete_since(&tables.utxos, &mut self.utxos, slot))
    }

    async fn put_orders(&mut self, records: &[OrderRecord]) -> Result<()> {
        for record in records {
            self.orders.insert(*record.key(), Some(record.clone()));
        }
        Ok(())
    }

    async fn find_orders(&mut self, refs: &[OutputRef]) -> Result<Vec<OrderRecord>> {
        let tables = self.tables.read().await;
        Ok(find(&tables.orders, &self.orders, refs))
    }

    async fn orders_spent_since(&mut self, slot: Slot) -> Result<Vec<OrderRecord>> {
        let tables = self.tables.read().await;
        Ok(spent_since(&tables.orders, &self.orders, slot))
    }

    async fn delete_orders_since(&mut self, slot: Slot) -> Result<u64> {
        let tables = self.tables.read().await;
        Ok(delete_since(&tables.orders, &mut self.orders, slot))
    }

    async fn put_checkpoint(&mut self, checkpoint: &ProjectionCheckpoint) -> Result<()> {
        self.checkpoints
            .entry(checkpoint.projection.clone())
            .or_default()
            .insert(checkpoint.slot, Some(checkpoint.clone()));
        Ok(())
    }

    async fn delete_checkpoints_since(&mut self, projection: &str, slot: Slot) -> Result<u64> {
        let tables = self.tables.read().await;
        let committed = tables.checkpoints.get(projection);
        let staged = self.checkpoints.entry(projection.to_string()).or_default();

        let mut slots: BTreeSet<Slot> = committed
            .map(|rows| rows.range(slot..).map(|(s, _)| *s).collect())
            .unwrap_or_default();
        slots.extend(staged.range(slot..).map(|(s, _)| *s));

        let mut removed = 0;
        for s in slots {
            let live = match staged.get(&s) {
                Some(write) => write.is_some(),
                None => committed.is_some_and(|rows| rows.contains_key(&s)),
            };
            if live {
                removed += 1;
            }
            staged.insert(s, None);
        }
        Ok(removed)
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let this = *self;
        let mut tables = this.tables.write().await;
        apply(&mut tables.utxos, this.utxos);
        apply(&mut tables.orders, this.orders);
        for (projection, writes) in this.checkpoints {
            let rows = tables.checkpoints.entry(projection).or_default();
            for (slot, write) in writes {
                match write {
                    Some(checkpoint) => {
                        rows.insert(slot, checkpoint);
                    }
                    None => {
                        rows.remove(&slot);
                    }
                }
            }
        }
        Ok(())
    }
}
