//! Paginated Query Runner
//!
//! Wraps store range queries and assembles a logical result set.
//!
//! ## Modes
//! - **paginated**: exactly one page; the caller continues with the
//!   returned cursor
//! - **non-paginated**: pages are followed internally until the store
//!   reports no further cursor or the page safety cap is hit
//!
//! `limit` bounds each underlying page, never the accumulated total.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use tracing::{debug, warn};

use crate::error::{ParkError, Result};
use crate::item::{Item, Key};
use crate::store::{QueryRequest, Store};

/// Opaque continuation cursor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor(Key);

impl Cursor {
    pub fn from_key(key: Key) -> Self {
        Self(key)
    }

    pub fn key(&self) -> &Key {
        &self.0
    }

    pub fn into_key(self) -> Key {
        self.0
    }

    /// URL-safe token for handing to clients
    pub fn encode(&self) -> Result<String> {
        let bytes = bincode::serialize(&self.0)?;
        Ok(URL_SAFE_NO_PAD.encode(bytes))
    }

    /// Parse a token produced by [`Cursor::encode`]
    pub fn decode(token: &str) -> Result<Self> {
        let bytes = URL_SAFE_NO_PAD
            .decode(token)
            .map_err(|e| ParkError::InvalidCursor(e.to_string()))?;
        let key: Key =
            bincode::deserialize(&bytes).map_err(|e| ParkError::InvalidCursor(e.to_string()))?;
        Ok(Self(key))
    }
}

/// How to run a query
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    /// Resume after this cursor
    pub cursor: Option<Cursor>,

    /// Return a single page instead of following cursors
    pub paginated: bool,
}

impl QueryOptions {
    /// Follow every page
    pub fn all() -> Self {
        Self::default()
    }

    /// One page starting at `cursor`
    pub fn page(cursor: Option<Cursor>) -> Self {
        Self {
            cursor,
            paginated: true,
        }
    }
}

/// Result of a query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    pub items: Vec<Item>,

    /// Continue from here; `None` when the result set is exhausted
    pub last_evaluated_key: Option<Cursor>,

    /// Underlying page requests issued
    pub pages: usize,

    /// Stopped early because the page safety cap was hit
    pub truncated: bool,
}

/// Runs range queries against a store
pub struct QueryRunner<'a> {
    store: &'a dyn Store,
    max_pages: Option<usize>,
}

impl<'a> QueryRunner<'a> {
    pub fn new(store: &'a dyn Store, max_pages: Option<usize>) -> Self {
        Self { store, max_pages }
    }

    /// Execute a query
    pub fn run(&self, table: &str, mut request: QueryRequest, options: QueryOptions) -> Result<QueryResult> {
        if request.partition_key.is_empty() {
            return Err(ParkError::MissingKey {
                detail: "query requires a partition key".to_string(),
            });
        }

        // Step 1: Resume point, which must belong to the queried partition
        if let Some(cursor) = options.cursor {
            if cursor.key().pk != request.partition_key {
                return Err(ParkError::InvalidCursor(format!(
                    "cursor for partition '{}' used on partition '{}'",
                    cursor.key().pk,
                    request.partition_key
                )));
            }
            request.exclusive_start_key = Some(cursor.into_key());
        }

        // Step 2: Single page
        if options.paginated {
            let page = self.store.query(table, &request)?;
            return Ok(QueryResult {
                items: page.items,
                last_evaluated_key: page.last_evaluated_key.map(Cursor::from_key),
                pages: 1,
                truncated: false,
            });
        }

        // Step 3: Follow cursors until exhausted or capped
        let mut result = QueryResult::default();
        loop {
            let page = self.store.query(table, &request)?;
            result.pages += 1;
            result.items.extend(page.items);

            let Some(next) = page.last_evaluated_key else {
                break;
            };
            if self.max_pages.map_or(false, |cap| result.pages >= cap) {
                warn!(
                    table,
                    partition = %request.partition_key,
                    pages = result.pages,
                    "query page cap reached, returning partial result"
                );
                result.truncated = true;
                result.last_evaluated_key = Some(Cursor::from_key(next));
                break;
            }
            request.exclusive_start_key = Some(next);
        }

        debug!(
            table,
            partition = %request.partition_key,
            items = result.items.len(),
            pages = result.pages,
            "query complete"
        );
        Ok(result)
    }
}
