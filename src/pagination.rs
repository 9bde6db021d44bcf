//! Relay-style cursor pagination
//!
//! Cursors are opaque offsets: base64 of `simple-cursor` followed by the
//! decimal position of the element in the full result set.

use async_graphql::dynamic::ObjectAccessor;
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use serde::Serialize;
use std::ops::Range;

const CURSOR_PREFIX: &str = "simple-cursor";

/// Page size used when neither `first` nor `last` is given
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Upper bound for `first` and `last`
pub const MAX_PAGE_SIZE: i64 = 100;

/// Page information
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub has_next_page: bool,
    pub has_previous_page: bool,
    pub start_cursor: Option<String>,
    pub end_cursor: Option<String>,
    /// Size of the full result set the page was cut from
    pub total_count: usize,
}

/// Edge in a connection
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Edge<T> {
    pub cursor: String,
    pub node: T,
}

/// Connection (paginated result)
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection<T> {
    pub edges: Vec<Edge<T>>,
    pub page_info: PageInfo,
}

/// Connection whose nodes are serialized domain values, the shape the
/// generated connection types resolve against
pub type JsonConnection = Connection<serde_json::Value>;

impl<T> Connection<T> {
    /// Build a page out of `items`, the elements found at `start..` of a
    /// result set holding `total_count` elements
    pub fn build(items: impl IntoIterator<Item = T>, start: usize, total_count: usize) -> Self {
        let edges: Vec<Edge<T>> = items
            .into_iter()
            .enumerate()
            .map(|(idx, node)| Edge {
                cursor: create_cursor(start + idx),
                node,
            })
            .collect();

        let start_cursor = edges.first().map(|e| e.cursor.clone());
        let end_cursor = edges.last().map(|e| e.cursor.clone());
        let has_previous_page = start > 0 && total_count > 0;
        let has_next_page = start + edges.len() < total_count;

        Self {
            edges,
            page_info: PageInfo {
                has_next_page,
                has_previous_page,
                start_cursor,
                end_cursor,
                total_count,
            },
        }
    }

    /// Create empty connection
    pub fn empty() -> Self {
        Self {
            edges: Vec::new(),
            page_info: PageInfo {
                has_next_page: false,
                has_previous_page: false,
                start_cursor: None,
                end_cursor: None,
                total_count: 0,
            },
        }
    }

    /// Serialize every node, keeping cursors and page info
    pub fn into_json(self) -> crate::Result<JsonConnection>
    where
        T: Serialize,
    {
        let edges = self
            .edges
            .into_iter()
            .map(|edge| {
                Ok(Edge {
                    cursor: edge.cursor,
                    node: serde_json::to_value(edge.node)?,
                })
            })
            .collect::<crate::Result<Vec<_>>>()?;
        Ok(Connection {
            edges,
            page_info: self.page_info,
        })
    }
}

/// Opaque cursor for the element at `offset`
pub fn create_cursor(offset: usize) -> String {
    CursorCodec::encode(&format!("{CURSOR_PREFIX}{offset}"))
}

/// Offset carried by `cursor`, or `default` when there is no cursor
pub fn offset_from_cursor(cursor: Option<&str>, default: usize) -> crate::Result<usize> {
    let Some(cursor) = cursor else {
        return Ok(default);
    };
    let decoded = CursorCodec::decode(cursor)?;
    let offset = decoded
        .strip_prefix(CURSOR_PREFIX)
        .ok_or_else(|| crate::GraphQLError::InvalidCursor(cursor.to_string()))?;
    offset
        .parse::<usize>()
        .map_err(|e| crate::GraphQLError::InvalidCursor(format!("{cursor}: {e}")))
}

/// Cursor encoding/decoding
pub struct CursorCodec;

impl CursorCodec {
    /// Encode cursor to base64
    pub fn encode(value: &str) -> String {
        BASE64.encode(value.as_bytes())
    }

    /// Decode cursor from base64
    pub fn decode(cursor: &str) -> crate::Result<String> {
        let bytes = BASE64
            .decode(cursor.as_bytes())
            .map_err(|e| crate::GraphQLError::InvalidCursor(e.to_string()))?;
        String::from_utf8(bytes)
            .map_err(|e| crate::GraphQLError::InvalidCursor(e.to_string()))
    }
}

/// Pagination arguments of a connection field
///
/// Follows the Relay Cursor Connections Specification:
/// https://relay.dev/graphql/connections.htm
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PaginationInput {
    /// Number of items to return (forward pagination)
    pub first: Option<i64>,

    /// Cursor to start from (forward pagination)
    pub after: Option<String>,

    /// Number of items to return (backward pagination)
    pub last: Option<i64>,

    /// Cursor to start from (backward pagination)
    pub before: Option<String>,
}

impl PaginationInput {
    /// Read `first`, `after`, `last` and `before` from field arguments
    pub fn from_args(args: &ObjectAccessor<'_>) -> crate::Result<Self> {
        let int = |name: &str| -> crate::Result<Option<i64>> {
            match args.get(name).filter(|v| !v.is_null()) {
                Some(v) => v
                    .i64()
                    .map(Some)
                    .map_err(|e| crate::GraphQLError::PaginationError(e.message)),
                None => Ok(None),
            }
        };
        let string = |name: &str| -> crate::Result<Option<String>> {
            match args.get(name).filter(|v| !v.is_null()) {
                Some(v) => v
                    .string()
                    .map(|s| Some(s.to_string()))
                    .map_err(|e| crate::GraphQLError::PaginationError(e.message)),
                None => Ok(None),
            }
        };

        Ok(Self {
            first: int("first")?,
            after: string("after")?,
            last: int("last")?,
            before: string("before")?,
        })
    }

    /// Validate pagination input
    pub fn validate(&self) -> crate::Result<()> {
        if self.first.is_some() && self.last.is_some() {
            return Err(crate::GraphQLError::PaginationError(
                "Cannot specify both 'first' and 'last'".to_string(),
            ));
        }

        for (name, value) in [("first", self.first), ("last", self.last)] {
            if let Some(value) = value {
                if value < 0 {
                    return Err(crate::GraphQLError::PaginationError(format!(
                        "'{name}' must be non-negative"
                    )));
                }
                if value > MAX_PAGE_SIZE {
                    return Err(crate::GraphQLError::PaginationError(format!(
                        "'{name}' cannot exceed {MAX_PAGE_SIZE}"
                    )));
                }
            }
        }

        Ok(())
    }

    /// Offsets of the requested page within a result set of `total` elements
    pub fn window(&self, total: usize) -> crate::Result<Range<usize>> {
        self.validate()?;

        let mut start = match self.after.as_deref() {
            Some(after) => offset_from_cursor(Some(after), 0)?.saturating_add(1),
            None => 0,
        }
        .min(total);
        let mut end = offset_from_cursor(self.before.as_deref(), total)?.min(total).max(start);

        // validate() guarantees both counts fit in 0..=MAX_PAGE_SIZE
        match (self.first, self.last) {
            (Some(first), _) => end = end.min(start + first as usize),
            (None, Some(last)) => start = start.max(end.saturating_sub(last as usize)),
            (None, None) => end = end.min(start + DEFAULT_PAGE_SIZE),
        }

        Ok(start..end)
    }

    /// Check if forward pagination
    pub fn is_forward(&self) -> bool {
        self.first.is_some() || self.after.is_some()
    }

    /// Check if backward pagination
    pub fn is_backward(&self) -> bool {
        self.last.is_some() || self.before.is_some()
    }
}
