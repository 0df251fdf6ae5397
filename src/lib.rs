//! # framefetch
//!
//! Fetch SQL query results into Apache Arrow backed frames.
//!
//! Two ways to get rows out of a [`Connection`]:
//!
//! - [`Connection::fetch_all`] materializes the whole result set as one
//!   [`Frame`].
//! - [`Connection::fetch_batches`] returns a [`BatchCursor`] that yields
//!   frames of at most `batch_size` rows. Concatenated in order
//!   (see [`FrameAccumulator`]), they equal the bulk result.
//!
//! The `arraysize` option only controls how many rows travel per round trip;
//! it never changes what is returned.
//!
//! ## Example
//!
//! ```no_run
//! # use framefetch::*;
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let params = ConnectionParams::from_env()?;
//! let conn = Connection::connect(params).await?;
//!
//! let sql = "SELECT id, name FROM employees ORDER BY id";
//!
//! let all = conn.fetch_all(sql, FetchOptions::new().arraysize(50)).await?;
//! println!("{}", all);
//!
//! let mut cursor = conn
//!     .fetch_batches(sql, FetchOptions::new().batch_size(10))
//!     .await?;
//! let mut acc = FrameAccumulator::with_schema(cursor.schema());
//! while let Some(chunk) = cursor.next_batch().await? {
//!     acc.push(chunk)?;
//! }
//! assert_eq!(acc.finish()?, all);
//!
//! conn.close().await?;
//! # Ok(())
//! # }
//! ```

// Module declarations
pub mod arrow_conversion;
pub mod connection;
pub mod error;
pub mod fetch;
pub mod frame;
pub mod transport;
pub mod types;

/// Client name reported to the server unless overridden.
pub const DEFAULT_CLIENT_NAME: &str = "framefetch";

// Re-export public API
pub use arrow_conversion::ArrowConverter;
pub use connection::{Connection, ConnectionBuilder, ConnectionParams};
pub use error::{
    ConnectionError, ConversionError, ErrorKind, FetchError, QueryError, TransportError,
    ValidationError,
};
pub use fetch::{BatchCursor, FetchOptions, Parameter};
pub use frame::{Frame, FrameAccumulator, ToTabular};
pub use types::{SqlType, TypeMapper};
