use crate::shared::AppError;
use chrono::Utc;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::watch;
use tracing::debug;
use uuid::Uuid;

/// Field value that the store resolves to a server-assigned millisecond
/// timestamp at commit time. When a merge-upsert hits an existing field the
/// sentinel keeps the existing value instead, which is what lets both sides
/// of a pair merge-write the same conversation without clobbering its
/// `createdAt`.
pub const SERVER_TIMESTAMP: &str = "__server_timestamp__";

/// A stored document. `seq` is the insertion sequence, stable across merges
/// and updates, and breaks ordering ties in query results.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub seq: u64,
    pub data: Value,
}

#[derive(Debug, Clone)]
enum Filter {
    Eq(String, Value),
    ArrayContains(String, Value),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDir {
    Asc,
    Desc,
}

/// Declarative read: one collection, conjunctive filters, at most one sort
/// field. Results always tie-break on insertion sequence so snapshot order is
/// deterministic.
#[derive(Debug, Clone)]
pub struct Query {
    collection: String,
    filters: Vec<Filter>,
    order_by: Option<(String, SortDir)>,
}

impl Query {
    pub fn collection(name: impl Into<String>) -> Self {
        Self {
            collection: name.into(),
            filters: Vec::new(),
            order_by: None,
        }
    }

    pub fn filter_eq(mut self, field: impl Into<String>, value: Value) -> Self {
        self.filters.push(Filter::Eq(field.into(), value));
        self
    }

    pub fn filter_array_contains(mut self, field: impl Into<String>, value: Value) -> Self {
        self.filters.push(Filter::ArrayContains(field.into(), value));
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, dir: SortDir) -> Self {
        self.order_by = Some((field.into(), dir));
        self
    }

    fn matches(&self, doc: &Document) -> bool {
        self.filters.iter().all(|filter| match filter {
            Filter::Eq(field, value) => doc.data.get(field) == Some(value),
            Filter::ArrayContains(field, value) => doc
                .data
                .get(field)
                .and_then(Value::as_array)
                .is_some_and(|items| items.contains(value)),
        })
    }
}

/// One write inside a batch. `data` must be a JSON object.
#[derive(Debug, Clone)]
pub enum WriteOp {
    /// New document under a store-assigned id.
    Create { collection: String, data: Value },
    /// Creates the document at `id`, or silently leaves an existing one
    /// untouched. Backs idempotent message appends.
    Insert {
        collection: String,
        id: String,
        data: Value,
    },
    /// Creates the document at `id`, or merges the given fields into it.
    Upsert {
        collection: String,
        id: String,
        data: Value,
    },
    /// Merges the given fields into an existing document. Fails the whole
    /// batch with `NotFound` when the document is absent.
    Update {
        collection: String,
        id: String,
        data: Value,
    },
}

impl WriteOp {
    fn collection(&self) -> &str {
        match self {
            WriteOp::Create { collection, .. }
            | WriteOp::Insert { collection, .. }
            | WriteOp::Upsert { collection, .. }
            | WriteOp::Update { collection, .. } => collection,
        }
    }

    fn data(&self) -> &Value {
        match self {
            WriteOp::Create { data, .. }
            | WriteOp::Insert { data, .. }
            | WriteOp::Upsert { data, .. }
            | WriteOp::Update { data, .. } => data,
        }
    }
}

struct Watcher {
    query: Query,
    tx: watch::Sender<Vec<Document>>,
}

struct Inner {
    collections: HashMap<String, HashMap<String, Document>>,
    watchers: Vec<Watcher>,
    next_seq: u64,
    last_ts_millis: i64,
    offline: bool,
}

/// In-memory document store with the semantics the engine depends on:
/// all-or-nothing batches, merge-upserts, server timestamps from a monotonic
/// clock, and live query subscriptions that deliver a fresh snapshot after
/// every commit touching their collection.
pub struct MemoryDocumentStore {
    inner: Mutex<Inner>,
}

impl Default for MemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                collections: HashMap::new(),
                watchers: Vec::new(),
                next_seq: 0,
                last_ts_millis: 0,
                offline: false,
            }),
        }
    }

    /// Fault injection for tests: while offline, every write and every new
    /// subscription fails with `StoreUnavailable`. Existing subscriptions
    /// keep their last snapshot.
    pub fn set_offline(&self, offline: bool) {
        self.lock().offline = offline;
    }

    pub async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, AppError> {
        let inner = self.lock();
        if inner.offline {
            return Err(offline_error());
        }
        Ok(inner
            .collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .cloned())
    }

    pub async fn query(&self, query: &Query) -> Result<Vec<Document>, AppError> {
        let inner = self.lock();
        if inner.offline {
            return Err(offline_error());
        }
        Ok(evaluate(&inner, query))
    }

    /// Opens a live subscription. The receiver starts at the current snapshot
    /// and gets a fresh one after every commit that touches the collection.
    pub async fn subscribe(&self, query: Query) -> Result<watch::Receiver<Vec<Document>>, AppError> {
        let mut inner = self.lock();
        if inner.offline {
            return Err(offline_error());
        }
        let initial = evaluate(&inner, &query);
        let (tx, rx) = watch::channel(initial);
        inner.watchers.push(Watcher { query, tx });
        Ok(rx)
    }

    /// Applies a batch of writes atomically. Every op is validated against the
    /// current state before any is applied; on error the store is untouched.
    /// Returns the target document id of each op, in op order.
    pub async fn commit(&self, ops: Vec<WriteOp>) -> Result<Vec<String>, AppError> {
        let mut inner = self.lock();
        if inner.offline {
            return Err(offline_error());
        }

        // Validation pass. Nothing is mutated until every op checks out.
        for op in &ops {
            if !op.data().is_object() {
                return Err(AppError::Internal(format!(
                    "write to {} is not a JSON object",
                    op.collection()
                )));
            }
            if let WriteOp::Update { collection, id, .. } = op {
                let exists = inner
                    .collections
                    .get(collection)
                    .is_some_and(|docs| docs.contains_key(id));
                if !exists {
                    return Err(AppError::NotFound(format!("{collection}/{id}")));
                }
            }
        }

        let ts = next_timestamp(&mut inner);
        let mut touched: Vec<String> = Vec::new();
        let mut ids = Vec::with_capacity(ops.len());

        for op in ops {
            touched.push(op.collection().to_string());
            match op {
                WriteOp::Create { collection, data } => {
                    let id = Uuid::new_v4().to_string();
                    insert_fresh(&mut inner, &collection, &id, data, ts);
                    ids.push(id);
                }
                WriteOp::Insert { collection, id, data } => {
                    let exists = inner
                        .collections
                        .get(&collection)
                        .is_some_and(|docs| docs.contains_key(&id));
                    if exists {
                        debug!(collection = %collection, id = %id, "insert hit an existing document, keeping it");
                    } else {
                        insert_fresh(&mut inner, &collection, &id, data, ts);
                    }
                    ids.push(id);
                }
                WriteOp::Upsert { collection, id, data } => {
                    let exists = inner
                        .collections
                        .get(&collection)
                        .is_some_and(|docs| docs.contains_key(&id));
                    if exists {
                        merge_into(&mut inner, &collection, &id, data, ts, true);
                    } else {
                        insert_fresh(&mut inner, &collection, &id, data, ts);
                    }
                    ids.push(id);
                }
                WriteOp::Update { collection, id, data } => {
                    merge_into(&mut inner, &collection, &id, data, ts, false);
                    ids.push(id);
                }
            }
        }

        notify(&mut inner, &touched);
        Ok(ids)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // Lock poisoning only happens after a panic elsewhere; propagating it
        // as a second panic is acceptable for an in-memory test double.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn offline_error() -> AppError {
    AppError::StoreUnavailable("store is offline".into())
}

/// Commit timestamps strictly increase even when the wall clock does not.
fn next_timestamp(inner: &mut Inner) -> i64 {
    let ts = Utc::now().timestamp_millis().max(inner.last_ts_millis + 1);
    inner.last_ts_millis = ts;
    ts
}

fn insert_fresh(inner: &mut Inner, collection: &str, id: &str, data: Value, ts: i64) {
    let seq = inner.next_seq;
    inner.next_seq += 1;
    let data = resolve_sentinels(data, ts);
    inner
        .collections
        .entry(collection.to_string())
        .or_default()
        .insert(
            id.to_string(),
            Document {
                id: id.to_string(),
                seq,
                data,
            },
        );
}

fn merge_into(
    inner: &mut Inner,
    collection: &str,
    id: &str,
    data: Value,
    ts: i64,
    keep_existing_on_sentinel: bool,
) {
    let doc = inner
        .collections
        .entry(collection.to_string())
        .or_default()
        .get_mut(id)
        .expect("validated before apply");
    let target = doc
        .data
        .as_object_mut()
        .expect("documents are always objects");
    let fields = match data {
        Value::Object(fields) => fields,
        _ => unreachable!("validated before apply"),
    };
    for (field, value) in fields {
        if is_sentinel(&value) {
            if keep_existing_on_sentinel && target.contains_key(&field) {
                continue;
            }
            target.insert(field, Value::from(ts));
        } else {
            target.insert(field, value);
        }
    }
}

fn resolve_sentinels(data: Value, ts: i64) -> Value {
    match data {
        Value::Object(fields) => {
            let resolved: Map<String, Value> = fields
                .into_iter()
                .map(|(field, value)| {
                    if is_sentinel(&value) {
                        (field, Value::from(ts))
                    } else {
                        (field, value)
                    }
                })
                .collect();
            Value::Object(resolved)
        }
        other => other,
    }
}

fn is_sentinel(value: &Value) -> bool {
    value.as_str() == Some(SERVER_TIMESTAMP)
}

fn evaluate(inner: &Inner, query: &Query) -> Vec<Document> {
    let mut results: Vec<Document> = inner
        .collections
        .get(&query.collection)
        .map(|docs| docs.values().filter(|d| query.matches(d)).cloned().collect())
        .unwrap_or_default();

    match &query.order_by {
        Some((field, dir)) => {
            results.sort_by(|a, b| {
                let ordering = compare_field(&a.data, &b.data, field).then(a.seq.cmp(&b.seq));
                match dir {
                    SortDir::Asc => ordering,
                    SortDir::Desc => ordering.reverse(),
                }
            });
        }
        None => results.sort_by_key(|d| d.seq),
    }
    results
}

fn compare_field(a: &Value, b: &Value, field: &str) -> std::cmp::Ordering {
    let a = a.get(field);
    let b = b.get(field);
    match (a.and_then(Value::as_i64), b.and_then(Value::as_i64)) {
        (Some(a), Some(b)) => a.cmp(&b),
        _ => {
            let a = a.and_then(Value::as_str).unwrap_or_default();
            let b = b.and_then(Value::as_str).unwrap_or_default();
            a.cmp(b)
        }
    }
}

/// Re-evaluates every watcher over a touched collection and drops watchers
/// whose receivers are gone.
fn notify(inner: &mut Inner, touched: &[String]) {
    let queries: Vec<Option<Query>> = inner
        .watchers
        .iter()
        .map(|watcher| {
            touched
                .contains(&watcher.query.collection)
                .then(|| watcher.query.clone())
        })
        .collect();
    let snapshots: Vec<Option<Vec<Document>>> = queries
        .into_iter()
        .map(|query| query.map(|query| evaluate(inner, &query)))
        .collect();

    for (watcher, snapshot) in inner.watchers.iter().zip(snapshots) {
        if let Some(snapshot) = snapshot {
            watcher.tx.send_if_modified(|current| {
                if *current != snapshot {
                    *current = snapshot;
                    true
                } else {
                    false
                }
            });
        }
    }
    inner.watchers.retain(|watcher| !watcher.tx.is_closed());
}
