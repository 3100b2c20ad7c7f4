use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;
use sqlx::postgres::PgListener;
use staffhub_application::{DocumentStore, ListenTarget, SnapshotFeed, StoreSnapshot, WriteBatch};
use staffhub_core::{AppError, AppResult};
use staffhub_domain::{CollectionId, CollectionQuery, DocumentId, StoredDocument};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::change_feed::{ChangeNotifier, snapshot_feed};

/// Postgres channel carrying the name of each changed collection.
const CHANGE_CHANNEL: &str = "staffhub_documents";

struct ListenerTask(JoinHandle<()>);

impl Drop for ListenerTask {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// PostgreSQL-backed document store. Commits run in one transaction with
/// per-document advisory locks; change feeds ride on `LISTEN/NOTIFY`.
#[derive(Clone)]
pub struct PostgresDocumentStore {
    pool: PgPool,
    notifier: ChangeNotifier,
    _listener: Arc<ListenerTask>,
}

impl PostgresDocumentStore {
    /// Connects the change listener and returns the store.
    pub async fn connect(pool: PgPool) -> AppResult<Self> {
        let mut listener = PgListener::connect_with(&pool).await.map_err(|error| {
            AppError::Persistence(format!("failed to connect change listener: {error}"))
        })?;
        listener.listen(CHANGE_CHANNEL).await.map_err(|error| {
            AppError::Persistence(format!("failed to listen on '{CHANGE_CHANNEL}': {error}"))
        })?;

        let notifier = ChangeNotifier::default();
        let task = tokio::spawn(forward_notifications(listener, notifier.clone()));
        info!(channel = CHANGE_CHANNEL, "document change listener started");

        Ok(Self {
            pool,
            notifier,
            _listener: Arc::new(ListenerTask(task)),
        })
    }
}

async fn forward_notifications(mut listener: PgListener, notifier: ChangeNotifier) {
    loop {
        match listener.try_recv().await {
            Ok(Some(notification)) => match notification.payload().parse::<CollectionId>() {
                Ok(collection) => notifier.notify(collection),
                Err(error) => warn!(
                    payload = notification.payload(),
                    error = %error,
                    "ignoring unknown change notice"
                ),
            },
            Ok(None) => {
                warn!("change listener reconnected, refreshing every feed");
                notifier.notify_all();
            }
            Err(error) => {
                warn!(error = %error, "change listener failed, retrying");
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
        }
    }
}

fn lock_key(collection: CollectionId, id: &str) -> String {
    format!("{collection}/{id}")
}

fn to_documents(rows: Vec<(String, Value)>) -> AppResult<Vec<StoredDocument>> {
    rows.into_iter()
        .map(|(id, data)| StoredDocument::new(DocumentId::new(id)?, data))
        .collect()
}

/// Reads the documents of a query, letting Postgres evaluate what it can.
///
/// Containment filters and, when safe, the limit run in SQL; the rest of the
/// query is applied to the returned rows.
async fn load_matching(pool: &PgPool, query: &CollectionQuery) -> AppResult<Vec<StoredDocument>> {
    let collection = query.collection();
    let limit = query
        .id_ordered_limit()
        .and_then(|limit| i64::try_from(limit).ok());
    let rows = sqlx::query_as::<_, (String, Value)>(
        r#"
        SELECT id, data
        FROM documents
        WHERE collection = $1 AND data @> ALL($2::jsonb[])
        ORDER BY id COLLATE "C"
        LIMIT $3
        "#,
    )
    .bind(collection.as_str())
    .bind(query.containments())
    .bind(limit)
    .fetch_all(pool)
    .await
    .map_err(|error| {
        AppError::Persistence(format!("failed to query collection '{collection}': {error}"))
    })?;

    Ok(query.apply(to_documents(rows)?))
}

async fn load_document(
    pool: &PgPool,
    collection: CollectionId,
    id: &DocumentId,
) -> AppResult<Option<StoredDocument>> {
    let data = sqlx::query_scalar::<_, Value>(
        r#"
        SELECT data
        FROM documents
        WHERE collection = $1 AND id = $2
        "#,
    )
    .bind(collection.as_str())
    .bind(id.as_str())
    .fetch_optional(pool)
    .await
    .map_err(|error| {
        AppError::Persistence(format!("failed to read document '{collection}/{id}': {error}"))
    })?;

    data.map(|data| StoredDocument::new(id.clone(), data))
        .transpose()
}

async fn load_target(pool: &PgPool, target: &ListenTarget) -> AppResult<StoreSnapshot> {
    let documents = match target {
        ListenTarget::Query(query) => load_matching(pool, query).await?,
        ListenTarget::Document { collection, id } => load_document(pool, *collection, id)
            .await?
            .into_iter()
            .collect(),
    };

    Ok(StoreSnapshot { documents })
}

#[async_trait]
impl DocumentStore for PostgresDocumentStore {
    async fn server_time(&self) -> AppResult<DateTime<Utc>> {
        sqlx::query_scalar::<_, DateTime<Utc>>("SELECT clock_timestamp()")
            .fetch_one(&self.pool)
            .await
            .map_err(|error| AppError::Persistence(format!("failed to read server time: {error}")))
    }

    fn allocate_id(&self, _collection: CollectionId) -> AppResult<DocumentId> {
        DocumentId::new(Uuid::new_v4().simple().to_string())
    }

    async fn get(
        &self,
        collection: CollectionId,
        id: &DocumentId,
    ) -> AppResult<Option<StoredDocument>> {
        load_document(&self.pool, collection, id).await
    }

    async fn query(&self, query: &CollectionQuery) -> AppResult<Vec<StoredDocument>> {
        load_matching(&self.pool, query).await
    }

    async fn commit(&self, batch: WriteBatch) -> AppResult<()> {
        if batch.is_empty() {
            return Ok(());
        }

        let mut transaction = self.pool.begin().await.map_err(|error| {
            AppError::Persistence(format!("failed to begin transaction: {error}"))
        })?;

        // Locks are taken in key order so concurrent batches cannot deadlock.
        let targets = batch
            .ops()
            .iter()
            .map(|op| {
                let (collection, id) = op.target();
                (collection, id.as_str().to_owned())
            })
            .collect::<BTreeSet<_>>();

        let mut staged: BTreeMap<(CollectionId, String), Option<Value>> = BTreeMap::new();
        for (collection, id) in &targets {
            sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
                .bind(lock_key(*collection, id))
                .execute(&mut *transaction)
                .await
                .map_err(|error| {
                    AppError::Persistence(format!(
                        "failed to lock document '{collection}/{id}': {error}"
                    ))
                })?;

            let current = sqlx::query_scalar::<_, Value>(
                r#"
                SELECT data
                FROM documents
                WHERE collection = $1 AND id = $2
                "#,
            )
            .bind(collection.as_str())
            .bind(id.as_str())
            .fetch_optional(&mut *transaction)
            .await
            .map_err(|error| {
                AppError::Persistence(format!(
                    "failed to read document '{collection}/{id}': {error}"
                ))
            })?;
            staged.insert((*collection, id.clone()), current);
        }

        let mut changed = BTreeSet::new();
        for op in batch.ops() {
            let (collection, id) = op.target();
            let key = (collection, id.as_str().to_owned());
            let current = staged.get(&key).cloned().flatten();
            let next = op.apply_to(current)?;
            if op.writes() {
                staged.insert(key.clone(), next);
                changed.insert(key);
            }
        }

        for key in &changed {
            let (collection, id) = key;
            let result = match staged.get(key).cloned().flatten() {
                Some(data) => {
                    sqlx::query(
                        r#"
                        INSERT INTO documents (collection, id, data, updated_at)
                        VALUES ($1, $2, $3, now())
                        ON CONFLICT (collection, id)
                        DO UPDATE SET data = EXCLUDED.data, updated_at = EXCLUDED.updated_at
                        "#,
                    )
                    .bind(collection.as_str())
                    .bind(id.as_str())
                    .bind(data)
                    .execute(&mut *transaction)
                    .await
                }
                None => {
                    sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
                        .bind(collection.as_str())
                        .bind(id.as_str())
                        .execute(&mut *transaction)
                        .await
                }
            };
            result.map_err(|error| {
                AppError::Persistence(format!(
                    "failed to write document '{collection}/{id}': {error}"
                ))
            })?;
        }

        let collections = changed
            .iter()
            .map(|(collection, _)| *collection)
            .collect::<BTreeSet<_>>();
        for collection in &collections {
            sqlx::query("SELECT pg_notify($1, $2)")
                .bind(CHANGE_CHANNEL)
                .bind(collection.as_str())
                .execute(&mut *transaction)
                .await
                .map_err(|error| {
                    AppError::Persistence(format!("failed to publish change notice: {error}"))
                })?;
        }

        transaction.commit().await.map_err(|error| {
            AppError::Persistence(format!("failed to commit transaction: {error}"))
        })?;

        debug!(
            operations = batch.ops().len(),
            collections = collections.len(),
            "batch committed"
        );
        Ok(())
    }

    async fn listen(&self, target: ListenTarget) -> AppResult<SnapshotFeed> {
        let receiver = self.notifier.subscribe();
        let initial = load_target(&self.pool, &target).await?;
        let pool = self.pool.clone();

        Ok(snapshot_feed(target, receiver, initial, move |target| {
            let pool = pool.clone();
            async move { load_target(&pool, &target).await }
        }))
    }
}
