use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use staffhub_core::{AppError, AppResult};

/// Store-assigned document identifier, unique within its collection.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    /// Creates a validated document identifier.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(AppError::Validation(
                "document id must not be empty".to_owned(),
            ));
        }

        if trimmed.contains('/') {
            return Err(AppError::Validation(format!(
                "document id '{trimmed}' must not contain '/'"
            )));
        }

        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the underlying identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for DocumentId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.0.as_str())
    }
}

/// Raw document as held by the store: an id plus a JSON object body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredDocument {
    id: DocumentId,
    data: Value,
}

impl StoredDocument {
    /// Creates a stored document. The body must be a JSON object.
    pub fn new(id: DocumentId, data: Value) -> AppResult<Self> {
        if !data.is_object() {
            return Err(AppError::Validation(format!(
                "document '{id}' body must be a JSON object"
            )));
        }

        Ok(Self { id, data })
    }

    /// Returns document id.
    #[must_use]
    pub fn id(&self) -> &DocumentId {
        &self.id
    }

    /// Returns document body.
    #[must_use]
    pub fn data(&self) -> &Value {
        &self.data
    }

    /// Splits the document into id and body.
    #[must_use]
    pub fn into_parts(self) -> (DocumentId, Value) {
        (self.id, self.data)
    }
}

/// One step of a [`FieldPath`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum PathSegment {
    /// Object key.
    Field {
        /// Key name.
        name: String,
    },
    /// Array element whose string property `key` equals `equals`.
    Where {
        /// Property inspected on each element.
        key: String,
        /// Required property value.
        equals: String,
    },
}

/// Path to a nested value, possibly addressing array elements by a property.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldPath(Vec<PathSegment>);

impl FieldPath {
    /// Creates a single-segment path.
    #[must_use]
    pub fn field(name: impl Into<String>) -> Self {
        Self(vec![PathSegment::Field { name: name.into() }])
    }

    /// Parses a dotted path such as `metadata.updatedAt`.
    pub fn parse(dotted: &str) -> AppResult<Self> {
        let segments = dotted
            .split('.')
            .map(|part| {
                let part = part.trim();
                if part.is_empty() {
                    return Err(AppError::Validation(format!(
                        "field path '{dotted}' has an empty segment"
                    )));
                }

                Ok(PathSegment::Field {
                    name: part.to_owned(),
                })
            })
            .collect::<AppResult<Vec<_>>>()?;

        Ok(Self(segments))
    }

    /// Appends an object key segment.
    #[must_use]
    pub fn then_field(mut self, name: impl Into<String>) -> Self {
        self.0.push(PathSegment::Field { name: name.into() });
        self
    }

    /// Appends an array-element selector segment.
    #[must_use]
    pub fn then_where(mut self, key: impl Into<String>, equals: impl Into<String>) -> Self {
        self.0.push(PathSegment::Where {
            key: key.into(),
            equals: equals.into(),
        });
        self
    }

    /// Returns path segments.
    #[must_use]
    pub fn segments(&self) -> &[PathSegment] {
        self.0.as_slice()
    }

    /// Returns the first key when the path starts with an object key.
    #[must_use]
    pub fn top_level(&self) -> Option<&str> {
        match self.0.first() {
            Some(PathSegment::Field { name }) => Some(name.as_str()),
            _ => None,
        }
    }
}

impl Display for FieldPath {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        for (index, segment) in self.0.iter().enumerate() {
            match segment {
                PathSegment::Field { name } => {
                    if index > 0 {
                        formatter.write_str(".")?;
                    }
                    formatter.write_str(name)?;
                }
                PathSegment::Where { key, equals } => write!(formatter, "[{key}={equals}]")?,
            }
        }

        Ok(())
    }
}

/// Store-side field operation applied atomically within a commit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "op", content = "value")]
pub enum FieldTransform {
    /// Replaces the value.
    Set(Value),
    /// Adds to an integer value; a missing value counts as zero.
    Increment(i64),
    /// Appends each element not already present.
    ArrayUnion(Vec<Value>),
    /// Removes every element equal to one of the given values.
    ArrayRemove(Vec<Value>),
}

/// Applies a field transform to a document body in place.
pub fn apply_transform(
    document: &mut Value,
    path: &FieldPath,
    transform: &FieldTransform,
) -> AppResult<()> {
    if path.segments().is_empty() {
        return Err(AppError::Validation(
            "field path must have at least one segment".to_owned(),
        ));
    }

    if let FieldTransform::ArrayRemove(values) = transform {
        let Some(slot) = slot_mut(document, path, false)? else {
            return Ok(());
        };

        return match slot {
            Value::Array(items) => {
                items.retain(|item| !values.contains(item));
                Ok(())
            }
            Value::Null => Ok(()),
            _ => Err(AppError::Validation(format!(
                "array remove target '{path}' is not an array"
            ))),
        };
    }

    let slot = slot_mut(document, path, true)?
        .ok_or_else(|| AppError::Internal(format!("field path '{path}' was not created")))?;

    match transform {
        FieldTransform::Set(value) => *slot = value.clone(),
        FieldTransform::Increment(delta) => {
            let current = match slot {
                Value::Null => 0,
                Value::Number(number) => number.as_i64().ok_or_else(|| {
                    AppError::Validation(format!("increment target '{path}' is not an integer"))
                })?,
                _ => {
                    return Err(AppError::Validation(format!(
                        "increment target '{path}' is not a number"
                    )));
                }
            };
            *slot = Value::from(current.saturating_add(*delta));
        }
        FieldTransform::ArrayUnion(values) => {
            if slot.is_null() {
                *slot = Value::Array(Vec::new());
            }
            let Value::Array(items) = slot else {
                return Err(AppError::Validation(format!(
                    "array union target '{path}' is not an array"
                )));
            };
            for value in values {
                if !items.contains(value) {
                    items.push(value.clone());
                }
            }
        }
        FieldTransform::ArrayRemove(_) => {}
    }

    Ok(())
}

/// Reads the value at `path`. `None` when any segment is missing.
#[must_use]
pub fn read_path<'a>(document: &'a Value, path: &FieldPath) -> Option<&'a Value> {
    path.segments()
        .iter()
        .try_fold(document, |current, segment| match segment {
            PathSegment::Field { name } => current.get(name),
            PathSegment::Where { key, equals } => current
                .as_array()?
                .iter()
                .find(|item| item.get(key).and_then(Value::as_str) == Some(equals.as_str())),
        })
}

fn slot_mut<'a>(
    root: &'a mut Value,
    path: &FieldPath,
    create: bool,
) -> AppResult<Option<&'a mut Value>> {
    let mut current = root;
    for segment in path.segments() {
        current = match segment {
            PathSegment::Field { name } => {
                if create && current.is_null() {
                    *current = Value::Object(Map::new());
                }
                let Some(object) = current.as_object_mut() else {
                    return Err(AppError::Validation(format!(
                        "field path '{path}' traverses a non-object value at '{name}'"
                    )));
                };
                if !object.contains_key(name) {
                    if !create {
                        return Ok(None);
                    }
                    object.insert(name.clone(), Value::Null);
                }
                match object.get_mut(name) {
                    Some(value) => value,
                    None => return Ok(None),
                }
            }
            PathSegment::Where { key, equals } => {
                if !create && current.is_null() {
                    return Ok(None);
                }
                let Some(items) = current.as_array_mut() else {
                    return Err(AppError::Validation(format!(
                        "field path '{path}' selects from a non-array value"
                    )));
                };
                let matching = items
                    .iter_mut()
                    .find(|item| item.get(key).and_then(Value::as_str) == Some(equals.as_str()));
                match matching {
                    Some(item) => item,
                    None => {
                        return Err(AppError::NotFound(format!(
                            "no element with {key}={equals} at '{path}'"
                        )));
                    }
                }
            }
        };
    }

    Ok(Some(current))
}
