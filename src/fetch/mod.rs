//! The two fetch paths.
//!
//! - [`bulk`]: one call, one frame holding every row.
//! - [`batches`]: a [`BatchCursor`] yielding bounded-size frames.
//!
//! Both start the same way: execute the statement with `arraysize` rows
//! prefetched, then page through the server cursor `arraysize` rows at a
//! time. Concatenating the chunks of a batch fetch therefore reproduces the
//! bulk result exactly.

pub mod batches;
pub mod bulk;
pub mod options;

#[cfg(test)]
pub(crate) mod testing;

pub use batches::BatchCursor;
pub use options::{FetchOptions, Parameter};

use crate::arrow_conversion::ArrowConverter;
use crate::error::{FetchError, QueryError, TransportError};
use crate::transport::{QueryResult, ResultSetHandle, TransportProtocol};
use serde_json::Value;
use tracing::debug;

/// A freshly executed statement: its converter, the server cursor, and the
/// rows that came back with the execute response.
pub(crate) struct OpenResult {
    pub converter: ArrowConverter,
    pub handle: Option<ResultSetHandle>,
    pub rows: Vec<Vec<Value>>,
    pub more_rows: bool,
}

/// Execute a query and check that it produced a result set.
pub(crate) async fn open_result(
    transport: &mut dyn TransportProtocol,
    sql: &str,
    parameters: &[Value],
    arraysize: usize,
) -> Result<OpenResult, FetchError> {
    let result = transport.execute(sql, parameters, arraysize).await?;

    let QueryResult::ResultSet { handle, data } = result else {
        return Err(QueryError::NoResultSet(
            "statement returned a row count instead of rows".to_string(),
        )
        .into());
    };

    if data.more_rows && handle.is_none() {
        return Err(TransportError::InvalidResponse(
            "more rows reported without a result set handle".to_string(),
        )
        .into());
    }

    let converter = match ArrowConverter::new(&data.columns) {
        Ok(converter) => converter,
        Err(e) => {
            close_quietly(transport, handle).await;
            return Err(e.into());
        }
    };

    debug!(
        columns = data.columns.len(),
        prefetched = data.rows.len(),
        more_rows = data.more_rows,
        "Statement executed"
    );

    Ok(OpenResult {
        converter,
        handle,
        rows: data.rows,
        more_rows: data.more_rows,
    })
}

/// Fetch the next page of a cursor.
pub(crate) async fn fetch_page(
    transport: &mut dyn TransportProtocol,
    handle: Option<ResultSetHandle>,
    num_rows: usize,
) -> Result<(Vec<Vec<Value>>, bool), FetchError> {
    let handle = handle.ok_or(QueryError::CursorClosed)?;
    let page = transport.fetch(handle, num_rows).await?;

    if page.rows.is_empty() && page.more_rows {
        return Err(TransportError::ProtocolError(
            "empty page while more rows were reported".to_string(),
        )
        .into());
    }

    debug!(
        handle = handle.as_i32(),
        rows = page.rows.len(),
        more_rows = page.more_rows,
        "Fetched page"
    );
    Ok((page.rows, page.more_rows))
}

/// Close a server cursor after an earlier failure, logging instead of
/// replacing that failure.
pub(crate) async fn close_quietly(
    transport: &mut dyn TransportProtocol,
    handle: Option<ResultSetHandle>,
) {
    if let Some(handle) = handle {
        if let Err(e) = transport.close_cursor(handle).await {
            tracing::warn!(handle = handle.as_i32(), error = %e, "Failed to close result set");
        }
    }
}
