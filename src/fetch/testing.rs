//! Shared fixtures for unit tests that mock the transport.

use crate::error::TransportError;
use crate::frame::Frame;
use crate::transport::messages::{ColumnInfo, DataType, ResultData, ResultSetHandle, SessionInfo};
use crate::transport::{Credentials, Endpoint, QueryResult, TransportProtocol};
use arrow::array::Int64Array;
use async_trait::async_trait;
use mockall::mock;
use serde_json::{json, Value};

mock! {
    pub Transport {}

    #[async_trait]
    impl TransportProtocol for Transport {
        async fn connect(&mut self, endpoint: &Endpoint) -> Result<(), TransportError>;
        async fn authenticate(&mut self, credentials: &Credentials) -> Result<SessionInfo, TransportError>;
        async fn execute(&mut self, sql: &str, parameters: &[Value], prefetch_rows: usize) -> Result<QueryResult, TransportError>;
        async fn fetch(&mut self, handle: ResultSetHandle, num_rows: usize) -> Result<ResultData, TransportError>;
        async fn close_cursor(&mut self, handle: ResultSetHandle) -> Result<(), TransportError>;
        async fn close(&mut self) -> Result<(), TransportError>;
        fn is_connected(&self) -> bool;
    }
}

pub fn id_rows(range: std::ops::RangeInclusive<i64>) -> Vec<Vec<Value>> {
    range.map(|i| vec![json!(i)]).collect()
}

/// Execute response for a single `id` column, cursor handle 7.
pub fn first_page(rows: Vec<Vec<Value>>, more_rows: bool) -> QueryResult {
    QueryResult::result_set(
        Some(ResultSetHandle::new(7)),
        ResultData {
            columns: vec![ColumnInfo::new("id", DataType::decimal(18, 0))],
            rows,
            more_rows,
        },
    )
}

pub fn page(rows: Vec<Vec<Value>>, more_rows: bool) -> ResultData {
    ResultData {
        columns: vec![],
        rows,
        more_rows,
    }
}

pub fn ids(frame: &Frame) -> Vec<i64> {
    frame
        .column("id")
        .unwrap()
        .as_any()
        .downcast_ref::<Int64Array>()
        .unwrap()
        .values()
        .to_vec()
}
