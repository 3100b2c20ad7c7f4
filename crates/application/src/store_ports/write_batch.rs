use serde_json::Value;
use staffhub_core::{AppError, AppResult};
use staffhub_domain::{
    CollectionId, DocumentId, FieldPath, FieldTransform, apply_transform, read_path,
};

/// One write inside an atomic batch.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    /// Creates a document; fails if it already exists.
    Create {
        /// Target collection.
        collection: CollectionId,
        /// Target id.
        id: DocumentId,
        /// Document body.
        data: Value,
    },
    /// Sets the given paths on an existing document, leaving other fields intact.
    Merge {
        /// Target collection.
        collection: CollectionId,
        /// Target id.
        id: DocumentId,
        /// Paths and their new values.
        values: Vec<(FieldPath, Value)>,
    },
    /// Applies a field transform.
    Transform {
        /// Target collection.
        collection: CollectionId,
        /// Target id.
        id: DocumentId,
        /// Transformed path.
        path: FieldPath,
        /// Transform to apply.
        transform: FieldTransform,
        /// Whether a missing document is created empty first.
        create_missing: bool,
    },
    /// Deletes an existing document.
    Delete {
        /// Target collection.
        collection: CollectionId,
        /// Target id.
        id: DocumentId,
    },
    /// Fails the whole batch with a conflict unless `path` still holds `value`.
    /// A missing path compares as `null`.
    Expect {
        /// Target collection.
        collection: CollectionId,
        /// Target id.
        id: DocumentId,
        /// Checked path.
        path: FieldPath,
        /// Value read before the batch was built.
        value: Value,
    },
}

impl WriteOp {
    /// Returns the targeted document.
    #[must_use]
    pub fn target(&self) -> (CollectionId, &DocumentId) {
        match self {
            Self::Create { collection, id, .. }
            | Self::Merge { collection, id, .. }
            | Self::Transform { collection, id, .. }
            | Self::Delete { collection, id }
            | Self::Expect { collection, id, .. } => (*collection, id),
        }
    }

    /// Returns whether the op changes the document. Expectations only read it.
    #[must_use]
    pub fn writes(&self) -> bool {
        !matches!(self, Self::Expect { .. })
    }

    /// Computes the document body after this write. `None` means absent.
    ///
    /// Store adapters evaluate every write through this function.
    pub fn apply_to(&self, current: Option<Value>) -> AppResult<Option<Value>> {
        let (collection, id) = self.target();
        match (self, current) {
            (Self::Create { data, .. }, None) => {
                if !data.is_object() {
                    return Err(AppError::Validation(format!(
                        "document '{collection}/{id}' body must be a JSON object"
                    )));
                }
                Ok(Some(data.clone()))
            }
            (Self::Create { .. }, Some(_)) => Err(AppError::Conflict(format!(
                "document '{collection}/{id}' already exists"
            ))),
            (Self::Merge { values, .. }, Some(mut document)) => {
                for (path, value) in values {
                    apply_transform(&mut document, path, &FieldTransform::Set(value.clone()))?;
                }
                Ok(Some(document))
            }
            (
                Self::Transform {
                    path, transform, ..
                },
                Some(mut document),
            ) => {
                apply_transform(&mut document, path, transform)?;
                Ok(Some(document))
            }
            (
                Self::Transform {
                    path,
                    transform,
                    create_missing: true,
                    ..
                },
                None,
            ) => {
                let mut document = Value::Object(serde_json::Map::new());
                apply_transform(&mut document, path, transform)?;
                Ok(Some(document))
            }
            (Self::Delete { .. }, Some(_)) => Ok(None),
            (Self::Expect { path, value, .. }, Some(document)) => {
                let actual = read_path(&document, path).unwrap_or(&Value::Null);
                if actual != value {
                    return Err(AppError::Conflict(format!(
                        "document '{collection}/{id}' changed at '{path}' since it was read"
                    )));
                }
                Ok(Some(document))
            }
            (
                Self::Merge { .. }
                | Self::Transform { .. }
                | Self::Delete { .. }
                | Self::Expect { .. },
                None,
            ) => Err(
                AppError::NotFound(format!("document '{collection}/{id}' does not exist")),
            ),
        }
    }
}

/// Ordered list of writes committed atomically.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    /// Creates an empty batch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a create.
    pub fn create(&mut self, collection: CollectionId, id: DocumentId, data: Value) -> &mut Self {
        self.ops.push(WriteOp::Create {
            collection,
            id,
            data,
        });
        self
    }

    /// Adds a merge of top-level or nested paths.
    pub fn merge(
        &mut self,
        collection: CollectionId,
        id: DocumentId,
        values: Vec<(FieldPath, Value)>,
    ) -> &mut Self {
        self.ops.push(WriteOp::Merge {
            collection,
            id,
            values,
        });
        self
    }

    /// Adds a transform on an existing document.
    pub fn transform(
        &mut self,
        collection: CollectionId,
        id: DocumentId,
        path: FieldPath,
        transform: FieldTransform,
    ) -> &mut Self {
        self.ops.push(WriteOp::Transform {
            collection,
            id,
            path,
            transform,
            create_missing: false,
        });
        self
    }

    /// Adds a transform that creates the document when missing.
    pub fn upsert_transform(
        &mut self,
        collection: CollectionId,
        id: DocumentId,
        path: FieldPath,
        transform: FieldTransform,
    ) -> &mut Self {
        self.ops.push(WriteOp::Transform {
            collection,
            id,
            path,
            transform,
            create_missing: true,
        });
        self
    }

    /// Adds a delete.
    pub fn delete(&mut self, collection: CollectionId, id: DocumentId) -> &mut Self {
        self.ops.push(WriteOp::Delete { collection, id });
        self
    }

    /// Adds a precondition checked inside the commit.
    pub fn expect(
        &mut self,
        collection: CollectionId,
        id: DocumentId,
        path: FieldPath,
        value: Value,
    ) -> &mut Self {
        self.ops.push(WriteOp::Expect {
            collection,
            id,
            path,
            value,
        });
        self
    }

    /// Returns operations in order.
    #[must_use]
    pub fn ops(&self) -> &[WriteOp] {
        self.ops.as_slice()
    }

    /// Returns whether the batch is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Returns the collections touched by the batch.
    #[must_use]
    pub fn collections(&self) -> Vec<CollectionId> {
        let mut collections = self
            .ops
            .iter()
            .map(|op| op.target().0)
            .collect::<Vec<_>>();
        collections.sort();
        collections.dedup();
        collections
    }

    /// Consumes the batch into its operations.
    #[must_use]
    pub fn into_ops(self) -> Vec<WriteOp> {
        self.ops
    }
}
