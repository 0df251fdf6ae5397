//! WebSocket message types.
//!
//! Every request is a JSON object carrying a `command` field; every response
//! carries `status` (`"ok"` or `"error"`), optional `responseData` and an
//! optional `exception`. Result rows travel row-major: `data[row][column]`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Wire protocol version sent on login.
pub const PROTOCOL_VERSION: i32 = 1;

/// Login request message.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    /// Command name
    pub command: String,
    /// Protocol version
    pub protocol_version: i32,
    /// Username
    pub username: String,
    /// Password
    pub password: String,
    /// Client name reported to the server
    pub client_name: String,
}

impl LoginRequest {
    /// Create a new login request.
    pub fn new(username: String, password: String, client_name: String) -> Self {
        Self {
            command: "login".to_string(),
            protocol_version: PROTOCOL_VERSION,
            username,
            password,
            client_name,
        }
    }
}

/// Login response message.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    /// Status of the response
    pub status: String,
    /// Response data
    pub response_data: Option<LoginResponseData>,
    /// Exception information if failed
    pub exception: Option<ExceptionInfo>,
}

/// Login response data.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponseData {
    /// Session ID
    pub session_id: String,
    /// Protocol version accepted
    pub protocol_version: i32,
    /// Release version
    #[serde(default)]
    pub release_version: String,
    /// Database name
    #[serde(default)]
    pub database_name: String,
    /// Product name
    #[serde(default)]
    pub product_name: String,
}

/// Execute SQL statement request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteRequest {
    /// Command name
    pub command: String,
    /// SQL text to execute
    pub sql_text: String,
    /// Positional bind values
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Value>,
    /// Rows to return together with the execute response
    pub prefetch_rows: u64,
}

impl ExecuteRequest {
    /// Create a new execute request.
    pub fn new(sql: String, parameters: Vec<Value>, prefetch_rows: usize) -> Self {
        Self {
            command: "execute".to_string(),
            sql_text: sql,
            parameters,
            prefetch_rows: prefetch_rows as u64,
        }
    }
}

/// Execute response message.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteResponse {
    /// Status of the response
    pub status: String,
    /// Response data
    pub response_data: Option<ExecuteResponseData>,
    /// Exception information if failed
    pub exception: Option<ExceptionInfo>,
}

/// Execute response data.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteResponseData {
    /// Results, one per statement
    pub results: Vec<ResultInfo>,
}

/// Outcome of one executed statement.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultInfo {
    /// `"resultSet"` or `"rowCount"`
    pub result_type: String,
    /// Row count (for non-SELECT statements)
    pub row_count: Option<i64>,
    /// Result set payload (for SELECT statements)
    pub result_set: Option<ResultSetPayload>,
}

/// Result set description plus the prefetched rows.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultSetPayload {
    /// Server cursor handle; absent when the prefetch held every row
    pub result_set_handle: Option<i32>,
    /// Column information
    pub columns: Vec<ColumnInfo>,
    /// Prefetched rows
    #[serde(default)]
    pub data: Vec<Vec<Value>>,
    /// Whether the cursor has rows beyond `data`
    #[serde(default)]
    pub more_rows: bool,
}

/// Column metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnInfo {
    /// Column name
    pub name: String,
    /// Data type
    pub data_type: DataType,
}

impl ColumnInfo {
    /// Create column metadata.
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

/// Column data type as reported by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataType {
    /// Type name
    #[serde(rename = "type")]
    pub type_name: String,
    /// Precision (for numeric types)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precision: Option<i32>,
    /// Scale (for decimal types)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<i32>,
    /// Size (for string types)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<i64>,
    /// With local time zone (for timestamp types)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub with_local_time_zone: Option<bool>,
}

impl DataType {
    /// A type with only a name.
    pub fn named(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            precision: None,
            scale: None,
            size: None,
            with_local_time_zone: None,
        }
    }

    /// DECIMAL(precision, scale).
    pub fn decimal(precision: i32, scale: i32) -> Self {
        Self {
            precision: Some(precision),
            scale: Some(scale),
            ..Self::named("DECIMAL")
        }
    }

    /// VARCHAR(size).
    pub fn varchar(size: i64) -> Self {
        Self {
            size: Some(size),
            ..Self::named("VARCHAR")
        }
    }
}

/// Fetch request to retrieve more rows from an open cursor.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchRequest {
    /// Command name
    pub command: String,
    /// Result set handle
    pub result_set_handle: i32,
    /// Maximum number of rows to return
    pub num_rows: u64,
}

impl FetchRequest {
    /// Create a new fetch request.
    pub fn new(result_set_handle: i32, num_rows: usize) -> Self {
        Self {
            command: "fetch".to_string(),
            result_set_handle,
            num_rows: num_rows as u64,
        }
    }
}

/// Fetch response message.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchResponse {
    /// Status of the response
    pub status: String,
    /// Response data
    pub response_data: Option<FetchResponseData>,
    /// Exception information if failed
    pub exception: Option<ExceptionInfo>,
}

/// Fetch response data.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchResponseData {
    /// Data rows
    #[serde(default)]
    pub data: Vec<Vec<Value>>,
    /// Whether the cursor has rows beyond this message
    #[serde(default)]
    pub more_rows: bool,
}

/// Close result set request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CloseResultSetRequest {
    /// Command name
    pub command: String,
    /// Result set handles to close
    pub result_set_handles: Vec<i32>,
}

impl CloseResultSetRequest {
    /// Create a new close result set request.
    pub fn new(handles: Vec<i32>) -> Self {
        Self {
            command: "closeResultSet".to_string(),
            result_set_handles: handles,
        }
    }
}

/// Disconnect request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisconnectRequest {
    /// Command name
    pub command: String,
}

impl Default for DisconnectRequest {
    fn default() -> Self {
        Self {
            command: "disconnect".to_string(),
        }
    }
}

/// Response to requests that carry no data (close, disconnect).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    /// Status of the response
    pub status: String,
    /// Exception information if failed
    pub exception: Option<ExceptionInfo>,
}

/// Exception information from the server.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExceptionInfo {
    /// SQL code
    pub sql_code: Option<String>,
    /// Error message
    pub text: String,
}

/// Session information returned after successful login.
#[derive(Debug, Clone)]
pub struct SessionInfo {
    /// Session ID
    pub session_id: String,
    /// Protocol version
    pub protocol_version: i32,
    /// Database release version
    pub release_version: String,
    /// Database name
    pub database_name: String,
    /// Product name
    pub product_name: String,
}

impl From<LoginResponseData> for SessionInfo {
    fn from(data: LoginResponseData) -> Self {
        Self {
            session_id: data.session_id,
            protocol_version: data.protocol_version,
            release_version: data.release_version,
            database_name: data.database_name,
            product_name: data.product_name,
        }
    }
}

/// Server cursor handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResultSetHandle(pub i32);

impl ResultSetHandle {
    /// Create a new result set handle.
    pub fn new(handle: i32) -> Self {
        Self(handle)
    }

    /// Get the raw handle value.
    pub fn as_i32(&self) -> i32 {
        self.0
    }
}

/// One page of result rows.
#[derive(Debug, Clone, Default)]
pub struct ResultData {
    /// Column metadata; only populated on the execute response
    pub columns: Vec<ColumnInfo>,
    /// Data rows
    pub rows: Vec<Vec<Value>>,
    /// Whether the cursor has rows beyond this page
    pub more_rows: bool,
}
