//! Common test utilities for framefetch integration tests.
//!
//! Most tests run against [`TableTransport`], an in-memory data source that
//! serves a fixed table through the same cursor protocol a server uses:
//! execute returns the first `prefetch_rows` rows and a handle, fetch pages
//! through the rest. It can cap page sizes, reject statements and fail a
//! chosen fetch, and it records every call it receives.
//!
//! Tests marked `#[ignore]` talk to a real server configured through the
//! `FRAMEFETCH_*` environment variables (see `ConnectionParams::from_env`):
//!
//! ```bash
//! FRAMEFETCH_HOST=localhost FRAMEFETCH_USER=sys FRAMEFETCH_PASSWORD=secret \
//!   cargo test --test fetch_tests -- --ignored
//! ```

#![allow(dead_code)]

use async_trait::async_trait;
use framefetch::error::TransportError;
use framefetch::transport::{
    ColumnInfo, Credentials, DataType, Endpoint, QueryResult, ResultData, ResultSetHandle,
    SessionInfo, TransportProtocol,
};
use framefetch::{Connection, ConnectionParams};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// One call received by a [`TableTransport`].
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Connect,
    Authenticate,
    Execute {
        sql: String,
        parameters: Vec<Value>,
        prefetch_rows: usize,
    },
    Fetch {
        handle: i32,
        num_rows: usize,
    },
    CloseCursor {
        handle: i32,
    },
    Close,
}

/// Shared view of the calls a transport received, usable after the
/// transport has moved into a `Connection`.
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<Call>>>);

impl CallLog {
    fn record(&self, call: Call) {
        self.0.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.0.lock().unwrap().clone()
    }

    pub fn fetch_sizes(&self) -> Vec<usize> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Fetch { num_rows, .. } => Some(num_rows),
                _ => None,
            })
            .collect()
    }

    pub fn executes(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|call| matches!(call, Call::Execute { .. }))
            .collect()
    }

    pub fn closed_cursors(&self) -> Vec<i32> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::CloseCursor { handle } => Some(handle),
                _ => None,
            })
            .collect()
    }

    /// True if anything beyond connect and authenticate reached the source.
    pub fn has_statement_traffic(&self) -> bool {
        self.calls()
            .iter()
            .any(|call| !matches!(call, Call::Connect | Call::Authenticate))
    }
}

struct OpenCursor {
    position: usize,
}

/// In-memory data source serving one table for every query.
pub struct TableTransport {
    columns: Vec<ColumnInfo>,
    rows: Vec<Vec<Value>>,
    /// Server-side page cap, regardless of how many rows were asked for
    max_page: Option<usize>,
    /// 1-based index of the fetch call that fails
    fail_on_fetch: Option<usize>,
    /// 1-based index of the fetch call that never completes
    stall_on_fetch: Option<usize>,
    /// Statements containing this text are rejected
    reject_containing: Option<String>,
    connected: bool,
    next_handle: i32,
    fetch_count: usize,
    cursors: HashMap<i32, OpenCursor>,
    log: CallLog,
}

impl TableTransport {
    pub fn new(columns: Vec<ColumnInfo>, rows: Vec<Vec<Value>>) -> Self {
        Self {
            columns,
            rows,
            max_page: None,
            fail_on_fetch: None,
            stall_on_fetch: None,
            reject_containing: None,
            connected: false,
            next_handle: 1,
            fetch_count: 0,
            cursors: HashMap::new(),
            log: CallLog::default(),
        }
    }

    /// Return at most `rows` rows per page.
    pub fn with_max_page(mut self, rows: usize) -> Self {
        self.max_page = Some(rows);
        self
    }

    /// Fail the `n`th fetch call (1-based) with a connectivity error.
    pub fn failing_on_fetch(mut self, n: usize) -> Self {
        self.fail_on_fetch = Some(n);
        self
    }

    /// Never answer the `n`th fetch call (1-based).
    pub fn stalling_on_fetch(mut self, n: usize) -> Self {
        self.stall_on_fetch = Some(n);
        self
    }

    /// Reject statements containing `text`.
    pub fn rejecting(mut self, text: &str) -> Self {
        self.reject_containing = Some(text.to_string());
        self
    }

    pub fn log(&self) -> CallLog {
        self.log.clone()
    }

    fn page_len(&self, requested: usize, remaining: usize) -> usize {
        let capped = self.max_page.map_or(requested, |cap| requested.min(cap));
        capped.min(remaining)
    }
}

#[async_trait]
impl TransportProtocol for TableTransport {
    async fn connect(&mut self, _endpoint: &Endpoint) -> Result<(), TransportError> {
        self.log.record(Call::Connect);
        self.connected = true;
        Ok(())
    }

    async fn authenticate(
        &mut self,
        _credentials: &Credentials,
    ) -> Result<SessionInfo, TransportError> {
        self.log.record(Call::Authenticate);
        Ok(SessionInfo {
            session_id: "1".to_string(),
            protocol_version: 1,
            release_version: "test".to_string(),
            database_name: "MEMORY".to_string(),
            product_name: "TableTransport".to_string(),
        })
    }

    async fn execute(
        &mut self,
        sql: &str,
        parameters: &[Value],
        prefetch_rows: usize,
    ) -> Result<QueryResult, TransportError> {
        self.log.record(Call::Execute {
            sql: sql.to_string(),
            parameters: parameters.to_vec(),
            prefetch_rows,
        });

        if let Some(text) = &self.reject_containing {
            if sql.contains(text.as_str()) {
                return Err(TransportError::Rejected {
                    sql_code: Some("42000".to_string()),
                    message: format!("object {} not found", text),
                });
            }
        }

        let len = self.page_len(prefetch_rows, self.rows.len());
        let more_rows = len < self.rows.len();
        let handle = self.next_handle;
        self.next_handle += 1;
        self.cursors.insert(handle, OpenCursor { position: len });

        Ok(QueryResult::result_set(
            Some(ResultSetHandle::new(handle)),
            ResultData {
                columns: self.columns.clone(),
                rows: self.rows[..len].to_vec(),
                more_rows,
            },
        ))
    }

    async fn fetch(
        &mut self,
        handle: ResultSetHandle,
        num_rows: usize,
    ) -> Result<ResultData, TransportError> {
        self.log.record(Call::Fetch {
            handle: handle.as_i32(),
            num_rows,
        });
        self.fetch_count += 1;

        if self.fail_on_fetch == Some(self.fetch_count) {
            return Err(TransportError::ReceiveError(
                "connection reset by peer".to_string(),
            ));
        }
        if self.stall_on_fetch == Some(self.fetch_count) {
            std::future::pending::<()>().await;
        }

        let total = self.rows.len();
        let position = self
            .cursors
            .get(&handle.as_i32())
            .map(|cursor| cursor.position)
            .ok_or_else(|| TransportError::Rejected {
                sql_code: None,
                message: format!("unknown result set handle {}", handle.as_i32()),
            })?;

        let len = self.page_len(num_rows, total - position);
        let end = position + len;
        if let Some(cursor) = self.cursors.get_mut(&handle.as_i32()) {
            cursor.position = end;
        }

        Ok(ResultData {
            columns: vec![],
            rows: self.rows[position..end].to_vec(),
            more_rows: end < total,
        })
    }

    async fn close_cursor(&mut self, handle: ResultSetHandle) -> Result<(), TransportError> {
        self.log.record(Call::CloseCursor {
            handle: handle.as_i32(),
        });
        self.cursors.remove(&handle.as_i32());
        Ok(())
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.log.record(Call::Close);
        self.connected = false;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

/// `id` (integer) and `name` (text) columns.
pub fn employee_columns() -> Vec<ColumnInfo> {
    vec![
        ColumnInfo::new("id", DataType::decimal(18, 0)),
        ColumnInfo::new("name", DataType::varchar(100)),
    ]
}

/// Rows `1..=n` ordered by id.
pub fn employee_rows(n: usize) -> Vec<Vec<Value>> {
    (1..=n)
        .map(|i| vec![json!(i), json!(format!("employee {}", i))])
        .collect()
}

pub fn employees(n: usize) -> TableTransport {
    TableTransport::new(employee_columns(), employee_rows(n))
}

pub fn test_params() -> ConnectionParams {
    ConnectionParams::builder()
        .host("memory")
        .username("scott")
        .password("tiger")
        .build()
        .unwrap()
}

/// Connect over `transport`, returning the connection and its call log.
pub async fn connect(transport: TableTransport) -> (Connection, CallLog) {
    let log = transport.log();
    let conn = Connection::from_transport(transport, test_params())
        .await
        .unwrap();
    (conn, log)
}

/// Parameters for a real server, if the environment names one.
pub fn live_params() -> Option<ConnectionParams> {
    ConnectionParams::from_env().ok()
}

/// Skip a test when no server is configured.
#[macro_export]
macro_rules! skip_if_no_server {
    () => {
        match $crate::common::live_params() {
            Some(params) => params,
            None => {
                eprintln!("Skipping test: FRAMEFETCH_HOST / FRAMEFETCH_CONNECT_STRING not set");
                return;
            }
        }
    };
}
