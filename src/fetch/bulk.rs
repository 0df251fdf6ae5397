//! Bulk fetch: the whole result set as one frame.

use crate::error::FetchError;
use crate::frame::Frame;
use crate::transport::TransportProtocol;
use serde_json::Value;
use tracing::{debug, instrument};

use super::{close_quietly, fetch_page, open_result};

/// Execute `sql` and materialize every row into one [`Frame`].
///
/// Rows travel `arraysize` per round trip until the source reports the cursor
/// exhausted. The server cursor is closed before returning, whether the
/// fetch succeeded or not; no partial frame is ever returned.
#[instrument(skip(transport, parameters), fields(parameters = parameters.len()))]
pub async fn fetch_all(
    transport: &mut dyn TransportProtocol,
    sql: &str,
    parameters: &[Value],
    arraysize: usize,
) -> Result<Frame, FetchError> {
    let open = open_result(transport, sql, parameters, arraysize).await?;
    let handle = open.handle;

    let mut rows = open.rows;
    let mut more_rows = open.more_rows;
    while more_rows {
        match fetch_page(transport, handle, arraysize).await {
            Ok((page, more)) => {
                rows.extend(page);
                more_rows = more;
            }
            Err(e) => {
                close_quietly(transport, handle).await;
                return Err(e);
            }
        }
    }

    let batch = match open.converter.convert(&rows) {
        Ok(batch) => batch,
        Err(e) => {
            close_quietly(transport, handle).await;
            return Err(e.into());
        }
    };

    if let Some(handle) = handle {
        transport.close_cursor(handle).await?;
    }

    debug!(rows = batch.num_rows(), "Bulk fetch complete");
    Ok(Frame::new(batch))
}
