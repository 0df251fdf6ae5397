//! Batch fetch: a lazy, single-pass sequence of bounded-size frames.

use crate::arrow_conversion::ArrowConverter;
use crate::error::{FetchError, QueryError};
use crate::frame::{Frame, FrameAccumulator};
use crate::transport::{ResultSetHandle, TransportProtocol};
use arrow::datatypes::SchemaRef;
use futures_util::stream::{self, Stream};
use serde_json::Value;
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, warn};

use super::{fetch_page, open_result};

/// Server cursors left open by dropped [`BatchCursor`]s.
///
/// `Drop` cannot await, so a dropped cursor queues its handle here and the
/// owning connection closes it before its next statement.
#[derive(Debug, Clone, Default)]
pub(crate) struct PendingCloses(Arc<StdMutex<Vec<ResultSetHandle>>>);

impl PendingCloses {
    pub fn push(&self, handle: ResultSetHandle) {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(handle);
    }

    pub fn take(&self) -> Vec<ResultSetHandle> {
        std::mem::take(&mut *self.0.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Close every queued cursor. Failures are logged and dropped; the
    /// statement that left them behind has already finished.
    pub async fn close_all(&self, transport: &mut dyn TransportProtocol) {
        for handle in self.take() {
            match transport.close_cursor(handle).await {
                Ok(()) => debug!(handle = handle.as_i32(), "Closed abandoned result set"),
                Err(e) => warn!(
                    handle = handle.as_i32(),
                    error = %e,
                    "Failed to close abandoned result set"
                ),
            }
        }
    }
}

/// A lazy sequence of [`Frame`] chunks over one executed statement.
///
/// Every chunk has exactly `batch_size` rows except the last, which has
/// between one and `batch_size`. A statement yielding no rows yields no
/// chunks. Without a batch size the whole result arrives as a single chunk,
/// which may be empty.
///
/// The cursor owns its connection's transport until it is exhausted, fails,
/// is closed, or is dropped; other statements on that connection fail with
/// [`ErrorKind::ConcurrentUse`](crate::ErrorKind::ConcurrentUse) meanwhile.
///
/// # Example
///
/// ```no_run
/// # use framefetch::{Connection, FetchOptions, FrameAccumulator};
/// # async fn example(conn: &Connection) -> Result<(), framefetch::FetchError> {
/// let mut cursor = conn
///     .fetch_batches("SELECT id, name FROM t ORDER BY id", FetchOptions::new().batch_size(10))
///     .await?;
///
/// let mut acc = FrameAccumulator::with_schema(cursor.schema());
/// while let Some(chunk) = cursor.next_batch().await? {
///     println!("{} rows", chunk.num_rows());
///     acc.push(chunk)?;
/// }
/// let frame = acc.finish()?;
/// # Ok(())
/// # }
/// ```
pub struct BatchCursor {
    /// `None` once the cursor has terminated
    transport: Option<OwnedMutexGuard<dyn TransportProtocol>>,
    pending_closes: PendingCloses,
    converter: ArrowConverter,
    /// Open server cursor, if any
    handle: Option<ResultSetHandle>,
    /// Rows received but not yet emitted
    buffer: VecDeque<Vec<Value>>,
    more_rows: bool,
    arraysize: usize,
    batch_size: Option<usize>,
    rows_emitted: usize,
    chunks_emitted: usize,
    /// Server close failure, reported once the buffered rows are emitted
    close_error: Option<FetchError>,
}

impl BatchCursor {
    /// Execute `sql` on an already acquired transport.
    pub(crate) async fn open(
        mut transport: OwnedMutexGuard<dyn TransportProtocol>,
        pending_closes: PendingCloses,
        sql: &str,
        parameters: &[Value],
        arraysize: usize,
        batch_size: Option<usize>,
    ) -> Result<Self, FetchError> {
        let open = open_result(&mut *transport, sql, parameters, arraysize).await?;

        Ok(Self {
            transport: Some(transport),
            pending_closes,
            converter: open.converter,
            handle: open.handle,
            buffer: open.rows.into(),
            more_rows: open.more_rows,
            arraysize,
            batch_size,
            rows_emitted: 0,
            chunks_emitted: 0,
            close_error: None,
        })
    }

    /// Column names and types of every chunk, known even for empty results.
    pub fn schema(&self) -> SchemaRef {
        self.converter.schema()
    }

    /// Rows emitted so far.
    pub fn rows_emitted(&self) -> usize {
        self.rows_emitted
    }

    /// Chunks emitted so far.
    pub fn chunks_emitted(&self) -> usize {
        self.chunks_emitted
    }

    /// True once the sequence has ended, by exhaustion or failure.
    pub fn is_terminated(&self) -> bool {
        self.transport.is_none()
    }

    /// Produce the next chunk.
    ///
    /// Returns `Ok(None)` once the result is exhausted. An error terminates
    /// the sequence: chunks already returned stay valid, and every later call
    /// returns `Ok(None)`. If closing the server cursor after the last page
    /// fails, the rows already received are still emitted and the error
    /// takes the place of the final `Ok(None)`.
    pub async fn next_batch(&mut self) -> Result<Option<Frame>, FetchError> {
        if self.transport.is_none() {
            return Ok(None);
        }

        match self.advance().await {
            Ok(Some(frame)) => {
                self.rows_emitted += frame.num_rows();
                self.chunks_emitted += 1;
                debug!(
                    chunk = self.chunks_emitted,
                    rows = frame.num_rows(),
                    total_rows = self.rows_emitted,
                    "Emitted chunk"
                );
                Ok(Some(frame))
            }
            Ok(None) => {
                debug!(
                    chunks = self.chunks_emitted,
                    rows = self.rows_emitted,
                    "Batch fetch exhausted"
                );
                self.terminate();
                Ok(None)
            }
            Err(e) => {
                debug!(error = %e, "Batch fetch failed");
                self.terminate();
                Err(e)
            }
        }
    }

    async fn advance(&mut self) -> Result<Option<Frame>, FetchError> {
        let target = self.batch_size.unwrap_or(usize::MAX);

        while self.buffer.len() < target && self.more_rows {
            // One round trip per chunk unless the source returns short pages
            let wanted = match self.batch_size {
                Some(size) => self.arraysize.max(size - self.buffer.len()),
                None => self.arraysize,
            };
            let transport = self
                .transport
                .as_deref_mut()
                .ok_or(QueryError::CursorClosed)?;
            let (rows, more_rows) = fetch_page(transport, self.handle, wanted).await?;
            self.buffer.extend(rows);
            self.more_rows = more_rows;
        }

        if !self.more_rows {
            if let Err(e) = self.close_server_cursor().await {
                if self.buffer.is_empty() {
                    return Err(e);
                }
                warn!(error = %e, "Failed to close result set, emitting buffered rows first");
                self.close_error = Some(e);
            }
        }

        if self.buffer.is_empty() {
            if let Some(e) = self.close_error.take() {
                return Err(e);
            }
            if self.batch_size.is_none() && self.chunks_emitted == 0 {
                return Ok(Some(Frame::empty(self.schema())));
            }
            return Ok(None);
        }

        let take = target.min(self.buffer.len());
        let rows: Vec<Vec<Value>> = self.buffer.drain(..take).collect();
        Ok(Some(Frame::new(self.converter.convert(&rows)?)))
    }

    async fn close_server_cursor(&mut self) -> Result<(), FetchError> {
        if let Some(handle) = self.handle.take() {
            let transport = self
                .transport
                .as_deref_mut()
                .ok_or(QueryError::CursorClosed)?;
            transport.close_cursor(handle).await?;
            debug!(handle = handle.as_i32(), "Closed result set");
        }
        Ok(())
    }

    /// End the sequence and give the transport back to the connection.
    fn terminate(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.pending_closes.push(handle);
        }
        self.buffer.clear();
        self.more_rows = false;
        self.transport = None;
    }

    /// Close the server cursor now and release the connection.
    pub async fn close(mut self) -> Result<(), FetchError> {
        let result = if self.transport.is_some() {
            self.close_server_cursor().await
        } else {
            Ok(())
        };
        self.terminate();
        result
    }

    /// Drive the cursor to exhaustion and concatenate every chunk.
    pub async fn collect_frame(mut self) -> Result<Frame, FetchError> {
        let mut acc = FrameAccumulator::with_schema(self.schema());
        while let Some(chunk) = self.next_batch().await? {
            acc.push(chunk)?;
        }
        Ok(acc.finish()?)
    }

    /// View the cursor as a [`Stream`] of chunks. The stream ends after the
    /// last chunk or right after the first error.
    pub fn into_stream(self) -> impl Stream<Item = Result<Frame, FetchError>> + Send {
        stream::unfold(self, |mut cursor| async move {
            match cursor.next_batch().await {
                Ok(Some(frame)) => Some((Ok(frame), cursor)),
                Ok(None) => None,
                Err(e) => Some((Err(e), cursor)),
            }
        })
    }
}

impl Drop for BatchCursor {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            debug!(handle = handle.as_i32(), "Cursor dropped while open, deferring close");
            self.pending_closes.push(handle);
        }
    }
}

impl fmt::Debug for BatchCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchCursor")
            .field("handle", &self.handle)
            .field("buffered_rows", &self.buffer.len())
            .field("more_rows", &self.more_rows)
            .field("arraysize", &self.arraysize)
            .field("batch_size", &self.batch_size)
            .field("rows_emitted", &self.rows_emitted)
            .field("terminated", &self.is_terminated())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, TransportError};
    use crate::fetch::testing::{first_page, id_rows, ids, page, MockTransport};
    use futures_util::StreamExt;
    use mockall::predicate::eq;
    use tokio::sync::Mutex;

    async fn open_cursor(
        mock: MockTransport,
        arraysize: usize,
        batch_size: Option<usize>,
    ) -> (BatchCursor, Arc<Mutex<dyn TransportProtocol>>, PendingCloses) {
        let transport: Arc<Mutex<dyn TransportProtocol>> = Arc::new(Mutex::new(mock));
        let guard = Arc::clone(&transport).try_lock_owned().unwrap();
        let pending = PendingCloses::default();
        let cursor = BatchCursor::open(
            guard,
            pending.clone(),
            "SELECT id FROM t ORDER BY id",
            &[],
            arraysize,
            batch_size,
        )
        .await
        .unwrap();
        (cursor, transport, pending)
    }

    #[tokio::test]
    async fn test_chunks_of_ten_from_twenty_five_rows() {
        let mut mock = MockTransport::new();
        mock.expect_execute()
            .withf(|_, _, prefetch| *prefetch == 10)
            .returning(|_, _, _| Ok(first_page(id_rows(1..=10), true)));

        let mut seq = mockall::Sequence::new();
        mock.expect_fetch()
            .with(eq(ResultSetHandle::new(7)), eq(10))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(page(id_rows(11..=20), true)));
        mock.expect_fetch()
            .with(eq(ResultSetHandle::new(7)), eq(10))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(page(id_rows(21..=25), false)));
        mock.expect_close_cursor()
            .with(eq(ResultSetHandle::new(7)))
            .times(1)
            .returning(|_| Ok(()));

        let (mut cursor, transport, pending) = open_cursor(mock, 10, Some(10)).await;

        let mut sizes = Vec::new();
        let mut all_ids = Vec::new();
        while let Some(chunk) = cursor.next_batch().await.unwrap() {
            sizes.push(chunk.num_rows());
            all_ids.extend(ids(&chunk));
        }

        assert_eq!(sizes, vec![10, 10, 5]);
        assert_eq!(all_ids, (1..=25).collect::<Vec<_>>());
        assert_eq!(cursor.rows_emitted(), 25);
        assert!(cursor.is_terminated());
        assert!(cursor.next_batch().await.unwrap().is_none());

        // Connection released after exhaustion
        assert!(transport.try_lock().is_ok());
        assert!(pending.take().is_empty());
    }

    #[tokio::test]
    async fn test_rechunks_short_server_pages() {
        let mut mock = MockTransport::new();
        mock.expect_execute()
            .returning(|_, _, _| Ok(first_page(id_rows(1..=3), true)));

        let mut seq = mockall::Sequence::new();
        for (range, more) in [(4..=6, true), (7..=9, true), (10..=11, false)] {
            mock.expect_fetch()
                .times(1)
                .in_sequence(&mut seq)
                .returning(move |_, _| Ok(page(id_rows(range.clone()), more)));
        }
        mock.expect_close_cursor().times(1).returning(|_| Ok(()));

        let (cursor, _transport, _pending) = open_cursor(mock, 3, Some(5)).await;
        let chunks: Vec<Frame> = cursor
            .into_stream()
            .map(|chunk| chunk.unwrap())
            .collect()
            .await;

        let sizes: Vec<usize> = chunks.iter().map(Frame::num_rows).collect();
        assert_eq!(sizes, vec![5, 5, 1]);
    }

    #[tokio::test]
    async fn test_zero_rows_yields_no_chunks() {
        let mut mock = MockTransport::new();
        mock.expect_execute()
            .returning(|_, _, _| Ok(first_page(vec![], false)));
        mock.expect_fetch().never();
        mock.expect_close_cursor().times(1).returning(|_| Ok(()));

        let (mut cursor, _transport, _pending) = open_cursor(mock, 10, Some(10)).await;
        assert_eq!(cursor.schema().field(0).name(), "id");
        assert!(cursor.next_batch().await.unwrap().is_none());
        assert_eq!(cursor.chunks_emitted(), 0);
    }

    #[tokio::test]
    async fn test_without_batch_size_yields_single_chunk() {
        let mut mock = MockTransport::new();
        mock.expect_execute()
            .returning(|_, _, _| Ok(first_page(vec![], false)));
        mock.expect_close_cursor().returning(|_| Ok(()));

        let (cursor, _transport, _pending) = open_cursor(mock, 10, None).await;
        let chunks: Vec<_> = cursor.into_stream().collect().await;

        assert_eq!(chunks.len(), 1);
        let chunk = chunks.into_iter().next().unwrap().unwrap();
        assert_eq!(chunk.shape(), (0, 1));
    }

    #[tokio::test]
    async fn test_mid_sequence_error_terminates() {
        let mut mock = MockTransport::new();
        mock.expect_execute()
            .returning(|_, _, _| Ok(first_page(id_rows(1..=10), true)));
        mock.expect_fetch()
            .times(1)
            .returning(|_, _| Err(TransportError::ReceiveError("connection reset".to_string())));
        mock.expect_close_cursor().never();

        let (mut cursor, transport, pending) = open_cursor(mock, 10, Some(10)).await;

        let first = cursor.next_batch().await.unwrap().unwrap();
        assert_eq!(first.num_rows(), 10);

        let err = cursor.next_batch().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Connectivity);

        assert!(cursor.next_batch().await.unwrap().is_none());
        assert_eq!(ids(&first), (1..=10).collect::<Vec<_>>());
        assert!(transport.try_lock().is_ok());
        assert_eq!(pending.take(), vec![ResultSetHandle::new(7)]);
    }

    #[tokio::test]
    async fn test_close_failure_on_last_page_reported_after_its_rows() {
        let mut mock = MockTransport::new();
        mock.expect_execute()
            .returning(|_, _, _| Ok(first_page(id_rows(1..=10), true)));

        let mut seq = mockall::Sequence::new();
        mock.expect_fetch()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(page(id_rows(11..=20), true)));
        mock.expect_fetch()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(page(id_rows(21..=25), false)));
        mock.expect_close_cursor()
            .times(1)
            .returning(|_| Err(TransportError::ReceiveError("connection reset".to_string())));

        let (mut cursor, transport, _pending) = open_cursor(mock, 10, Some(10)).await;

        let mut all_ids = Vec::new();
        for _ in 0..3 {
            let chunk = cursor.next_batch().await.unwrap().unwrap();
            all_ids.extend(ids(&chunk));
        }
        assert_eq!(all_ids, (1..=25).collect::<Vec<_>>());

        let err = cursor.next_batch().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Connectivity);
        assert!(cursor.next_batch().await.unwrap().is_none());
        assert!(transport.try_lock().is_ok());
    }

    #[tokio::test]
    async fn test_drop_defers_server_close() {
        let mut mock = MockTransport::new();
        mock.expect_execute()
            .returning(|_, _, _| Ok(first_page(id_rows(1..=10), true)));
        mock.expect_close_cursor().never();

        let (mut cursor, transport, pending) = open_cursor(mock, 10, Some(4)).await;
        assert_eq!(cursor.next_batch().await.unwrap().unwrap().num_rows(), 4);
        assert!(transport.try_lock().is_err());

        drop(cursor);

        assert!(transport.try_lock().is_ok());
        assert_eq!(pending.take(), vec![ResultSetHandle::new(7)]);
    }

    #[tokio::test]
    async fn test_close_releases_server_cursor() {
        let mut mock = MockTransport::new();
        mock.expect_execute()
            .returning(|_, _, _| Ok(first_page(id_rows(1..=10), true)));
        mock.expect_close_cursor()
            .with(eq(ResultSetHandle::new(7)))
            .times(1)
            .returning(|_| Ok(()));

        let (cursor, transport, pending) = open_cursor(mock, 10, Some(4)).await;
        cursor.close().await.unwrap();

        assert!(transport.try_lock().is_ok());
        assert!(pending.take().is_empty());
    }

    #[tokio::test]
    async fn test_collect_frame() {
        let mut mock = MockTransport::new();
        mock.expect_execute()
            .returning(|_, _, _| Ok(first_page(id_rows(1..=7), false)));
        mock.expect_close_cursor().returning(|_| Ok(()));

        let (cursor, _transport, _pending) = open_cursor(mock, 10, Some(3)).await;
        let frame = cursor.collect_frame().await.unwrap();
        assert_eq!(ids(&frame), (1..=7).collect::<Vec<_>>());
    }
}
