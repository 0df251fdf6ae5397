//! Transport layer for database communication.
//!
//! - `protocol` - the [`TransportProtocol`] trait every data source implements
//! - `messages` - JSON message types of the WebSocket protocol
//! - `websocket` - the default WebSocket transport
//!
//! # Example
//!
//! ```no_run
//! use framefetch::transport::{Credentials, Endpoint, TransportProtocol, WebSocketTransport};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut transport = WebSocketTransport::new();
//! transport
//!     .connect(&Endpoint::new("localhost".to_string(), 8563))
//!     .await?;
//!
//! let credentials = Credentials::new("scott".to_string(), "tiger".to_string());
//! let session = transport.authenticate(&credentials).await?;
//! println!("Connected to: {}", session.database_name);
//!
//! transport.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod messages;
pub mod protocol;
pub mod websocket;

pub use messages::{ColumnInfo, DataType, ResultData, ResultSetHandle, SessionInfo};
pub use protocol::{Credentials, Endpoint, QueryResult, TransportProtocol};
pub use websocket::WebSocketTransport;
