//! Transport protocol abstraction trait.
//!
//! [`TransportProtocol`] is the seam between the fetch machinery and the
//! network. `Connection` only ever talks to a `dyn TransportProtocol`, so any
//! data source that can execute a statement and page through a cursor can
//! back it.

use crate::error::TransportError;
use async_trait::async_trait;
use serde_json::Value;

use super::messages::{ResultData, ResultSetHandle, SessionInfo};

/// Network endpoint of the data source.
#[derive(Debug, Clone)]
pub struct Endpoint {
    /// Database host
    pub host: String,
    /// Database port
    pub port: u16,
    /// Use TLS/SSL
    pub use_tls: bool,
    /// Connection timeout in milliseconds
    pub timeout_ms: u64,
}

impl Endpoint {
    /// Create a new endpoint.
    pub fn new(host: String, port: u16) -> Self {
        Self {
            host,
            port,
            use_tls: true,
            timeout_ms: 30_000,
        }
    }

    /// Set whether to use TLS.
    pub fn with_tls(mut self, use_tls: bool) -> Self {
        self.use_tls = use_tls;
        self
    }

    /// Set connection timeout.
    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Build the WebSocket URL.
    pub fn to_websocket_url(&self) -> String {
        let scheme = if self.use_tls { "wss" } else { "ws" };
        format!("{}://{}:{}", scheme, self.host, self.port)
    }
}

/// User credentials for authentication.
#[derive(Clone)]
pub struct Credentials {
    /// Username
    pub username: String,
    /// Password (cleared on drop)
    pub password: String,
    /// Client name reported to the server
    pub client_name: String,
}

impl Credentials {
    /// Create new credentials.
    pub fn new(username: String, password: String) -> Self {
        Self {
            username,
            password,
            client_name: crate::DEFAULT_CLIENT_NAME.to_string(),
        }
    }

    /// Set the client name.
    pub fn with_client_name(mut self, client_name: String) -> Self {
        self.client_name = client_name;
        self
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("client_name", &self.client_name)
            .finish()
    }
}

impl Drop for Credentials {
    fn drop(&mut self) {
        self.password.clear();
    }
}

/// Transport protocol trait for database communication.
///
/// Implementations are driven by one logical operation at a time; the
/// connection serializes access behind a mutex.
#[async_trait]
pub trait TransportProtocol: Send + Sync {
    /// Connect to the database server.
    async fn connect(&mut self, endpoint: &Endpoint) -> Result<(), TransportError>;

    /// Authenticate with the database and open a session.
    async fn authenticate(&mut self, credentials: &Credentials)
        -> Result<SessionInfo, TransportError>;

    /// Execute a SQL statement.
    ///
    /// `parameters` are positional bind values. For queries, up to
    /// `prefetch_rows` rows are returned together with the column metadata.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::Rejected` if the server refuses the
    /// statement, or another variant if the exchange itself fails.
    async fn execute(
        &mut self,
        sql: &str,
        parameters: &[Value],
        prefetch_rows: usize,
    ) -> Result<QueryResult, TransportError>;

    /// Fetch up to `num_rows` further rows from an open cursor.
    ///
    /// The returned page never carries column metadata.
    async fn fetch(
        &mut self,
        handle: ResultSetHandle,
        num_rows: usize,
    ) -> Result<ResultData, TransportError>;

    /// Close a server cursor.
    async fn close_cursor(&mut self, handle: ResultSetHandle) -> Result<(), TransportError>;

    /// Close the connection.
    async fn close(&mut self) -> Result<(), TransportError>;

    /// Check if the connection is still active.
    fn is_connected(&self) -> bool;
}

/// Result of a statement execution.
#[derive(Debug, Clone)]
pub enum QueryResult {
    /// Result set from a query
    ResultSet {
        /// Cursor for fetching further rows; `None` if `data` holds every row
        handle: Option<ResultSetHandle>,
        /// Column metadata and prefetched rows
        data: ResultData,
    },
    /// Row count from a DML statement
    RowCount {
        /// Number of affected rows
        count: i64,
    },
}

impl QueryResult {
    /// Create a result set query result.
    pub fn result_set(handle: Option<ResultSetHandle>, data: ResultData) -> Self {
        Self::ResultSet { handle, data }
    }

    /// Create a row count query result.
    pub fn row_count(count: i64) -> Self {
        Self::RowCount { count }
    }

    /// Check if this is a result set.
    pub fn is_result_set(&self) -> bool {
        matches!(self, Self::ResultSet { .. })
    }
}
