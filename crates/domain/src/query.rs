use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use staffhub_core::{AppError, AppResult};

use crate::{CollectionId, StoredDocument};

/// Sort direction for collection queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    /// Ascending order.
    Asc,
    /// Descending order.
    Desc,
}

/// Ordering clause on a dotted field path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    /// Dotted field path.
    pub field: String,
    /// Sort direction.
    pub direction: SortDirection,
}

impl OrderBy {
    /// Ascending order on the given field.
    #[must_use]
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Asc,
        }
    }

    /// Descending order on the given field.
    #[must_use]
    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Desc,
        }
    }
}

/// Filter operator supported by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOp {
    /// Field equals the value.
    Equals,
    /// Field is an array containing the value.
    ArrayContains,
}

/// Single field filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldFilter {
    /// Dotted field path.
    pub field: String,
    /// Operator.
    pub op: FilterOp,
    /// Compared value.
    pub value: Value,
}

impl FieldFilter {
    /// Equality filter.
    #[must_use]
    pub fn equals(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            op: FilterOp::Equals,
            value: value.into(),
        }
    }

    /// Array membership filter.
    #[must_use]
    pub fn array_contains(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            op: FilterOp::ArrayContains,
            value: value.into(),
        }
    }

    /// Returns whether a document body satisfies the filter.
    #[must_use]
    pub fn matches(&self, data: &Value) -> bool {
        let Some(actual) = lookup_field(data, self.field.as_str()) else {
            return false;
        };

        match self.op {
            FilterOp::Equals => match (actual, &self.value) {
                (Value::String(_), Value::String(_)) => {
                    compare_values(Some(actual), Some(&self.value)) == Ordering::Equal
                }
                _ => actual == &self.value,
            },
            FilterOp::ArrayContains => actual
                .as_array()
                .is_some_and(|items| items.contains(&self.value)),
        }
    }

    /// JSON containment document selecting exactly the bodies the filter matches.
    ///
    /// `None` for values whose store comparison differs from containment:
    /// numbers, arrays, objects and timestamp strings.
    #[must_use]
    pub fn containment(&self) -> Option<Value> {
        let exact = match &self.value {
            Value::String(text) => parse_timestamp(text).is_none(),
            Value::Null | Value::Bool(_) => true,
            Value::Number(_) | Value::Array(_) | Value::Object(_) => false,
        };
        if !exact {
            return None;
        }

        let leaf = match self.op {
            FilterOp::Equals => self.value.clone(),
            FilterOp::ArrayContains => Value::Array(vec![self.value.clone()]),
        };
        Some(self.field.rsplit('.').fold(leaf, |inner, segment| {
            let mut object = Map::new();
            object.insert(segment.to_owned(), inner);
            Value::Object(object)
        }))
    }
}

/// Half-open time window `[from, until)` on a timestamp field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    field: String,
    from: DateTime<Utc>,
    until: DateTime<Utc>,
}

impl TimeWindow {
    /// Creates a validated window. `until` must be later than `from`.
    pub fn new(
        field: impl Into<String>,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> AppResult<Self> {
        if until <= from {
            return Err(AppError::Validation(
                "time window end must be later than its start".to_owned(),
            ));
        }

        Ok(Self {
            field: field.into(),
            from,
            until,
        })
    }

    /// Returns the windowed field.
    #[must_use]
    pub fn field(&self) -> &str {
        self.field.as_str()
    }

    /// Returns the inclusive lower bound.
    #[must_use]
    pub fn from(&self) -> DateTime<Utc> {
        self.from
    }

    /// Returns the exclusive upper bound.
    #[must_use]
    pub fn until(&self) -> DateTime<Utc> {
        self.until
    }

    /// Returns whether the document's field falls inside the window.
    #[must_use]
    pub fn contains(&self, data: &Value) -> bool {
        lookup_field(data, self.field.as_str())
            .and_then(Value::as_str)
            .and_then(parse_timestamp)
            .is_some_and(|at| at >= self.from && at < self.until)
    }
}

/// Query over one collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionQuery {
    collection: CollectionId,
    filters: Vec<FieldFilter>,
    window: Option<TimeWindow>,
    order_by: Option<OrderBy>,
    limit: Option<usize>,
}

impl CollectionQuery {
    /// Query matching every document of a collection.
    #[must_use]
    pub fn all(collection: CollectionId) -> Self {
        Self {
            collection,
            filters: Vec::new(),
            window: None,
            order_by: None,
            limit: None,
        }
    }

    /// Adds a filter.
    #[must_use]
    pub fn filter(mut self, filter: FieldFilter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Restricts the query to a time window.
    #[must_use]
    pub fn window(mut self, window: TimeWindow) -> Self {
        self.window = Some(window);
        self
    }

    /// Sets the ordering.
    #[must_use]
    pub fn order_by(mut self, order_by: OrderBy) -> Self {
        self.order_by = Some(order_by);
        self
    }

    /// Caps the number of returned documents.
    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Returns queried collection.
    #[must_use]
    pub fn collection(&self) -> CollectionId {
        self.collection
    }

    /// Returns filters.
    #[must_use]
    pub fn filters(&self) -> &[FieldFilter] {
        self.filters.as_slice()
    }

    /// Returns the time window, if any.
    #[must_use]
    pub fn time_window(&self) -> Option<&TimeWindow> {
        self.window.as_ref()
    }

    /// Returns ordering, if any.
    #[must_use]
    pub fn ordering(&self) -> Option<&OrderBy> {
        self.order_by.as_ref()
    }

    /// Returns limit, if any.
    #[must_use]
    pub fn max_results(&self) -> Option<usize> {
        self.limit
    }

    /// Returns whether a document body satisfies filters and window.
    #[must_use]
    pub fn matches(&self, data: &Value) -> bool {
        self.filters.iter().all(|filter| filter.matches(data))
            && self
                .window
                .as_ref()
                .is_none_or(|window| window.contains(data))
    }

    /// Containment documents a store can evaluate before [`Self::apply`].
    #[must_use]
    pub fn containments(&self) -> Vec<Value> {
        self.filters
            .iter()
            .filter_map(FieldFilter::containment)
            .collect()
    }

    /// Limit a store may apply in id order ahead of [`Self::apply`].
    ///
    /// Only set when containment alone decides the result set and no
    /// ordering or window is involved.
    #[must_use]
    pub fn id_ordered_limit(&self) -> Option<usize> {
        let exact = self.window.is_none()
            && self.order_by.is_none()
            && self
                .filters
                .iter()
                .all(|filter| filter.containment().is_some());
        self.limit.filter(|_| exact)
    }

    /// Filters, orders and limits documents the way the store would.
    #[must_use]
    pub fn apply(&self, documents: impl IntoIterator<Item = StoredDocument>) -> Vec<StoredDocument> {
        let mut selected = documents
            .into_iter()
            .filter(|document| self.matches(document.data()))
            .collect::<Vec<_>>();
        sort_documents(&mut selected, self.order_by.as_ref());
        if let Some(limit) = self.limit {
            selected.truncate(limit);
        }

        selected
    }
}

/// Sorts documents by a field; ties and unordered queries fall back to id order.
pub fn sort_documents(documents: &mut [StoredDocument], order_by: Option<&OrderBy>) {
    documents.sort_by(|left, right| {
        let by_field = order_by.map_or(Ordering::Equal, |order_by| {
            let ordering = compare_values(
                lookup_field(left.data(), order_by.field.as_str()),
                lookup_field(right.data(), order_by.field.as_str()),
            );
            match order_by.direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            }
        });

        by_field.then_with(|| left.id().cmp(right.id()))
    });
}

/// Looks up a dotted path inside a JSON object.
#[must_use]
pub fn lookup_field<'a>(data: &'a Value, dotted: &str) -> Option<&'a Value> {
    dotted
        .split('.')
        .try_fold(data, |current, segment| current.get(segment))
}

/// Total order over JSON values: missing, null, bool, number, string, array, object.
///
/// Strings that both parse as RFC 3339 timestamps compare chronologically.
#[must_use]
pub fn compare_values(left: Option<&Value>, right: Option<&Value>) -> Ordering {
    match (left, right) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(left), Some(right)) => match (left, right) {
            (Value::Bool(left), Value::Bool(right)) => left.cmp(right),
            (Value::Number(left), Value::Number(right)) => {
                match (left.as_i64(), right.as_i64()) {
                    (Some(left), Some(right)) => left.cmp(&right),
                    _ => left
                        .as_f64()
                        .partial_cmp(&right.as_f64())
                        .unwrap_or(Ordering::Equal),
                }
            }
            (Value::String(left), Value::String(right)) => {
                match (parse_timestamp(left), parse_timestamp(right)) {
                    (Some(left), Some(right)) => left.cmp(&right),
                    _ => left.cmp(right),
                }
            }
            (Value::Array(left), Value::Array(right)) => {
                for (left, right) in left.iter().zip(right.iter()) {
                    let ordering = compare_values(Some(left), Some(right));
                    if ordering != Ordering::Equal {
                        return ordering;
                    }
                }
                left.len().cmp(&right.len())
            }
            _ => type_rank(left).cmp(&type_rank(right)),
        },
    }
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Parses an RFC 3339 timestamp into UTC.
#[must_use]
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|at| at.with_timezone(&Utc))
}
