//! WebSocket transport implementation.
//!
//! Sends one JSON request per text frame and reads exactly one JSON response
//! back, so the exchange is strictly sequential.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, instrument};

use crate::error::TransportError;

use super::messages::{
    CloseResultSetRequest, DisconnectRequest, ExceptionInfo, ExecuteRequest, ExecuteResponse,
    FetchRequest, FetchResponse, LoginRequest, LoginResponse, ResultData, ResultSetHandle,
    SessionInfo, StatusResponse,
};
use super::protocol::{Credentials, Endpoint, QueryResult, TransportProtocol};

/// WebSocket transport implementation.
pub struct WebSocketTransport {
    /// WebSocket connection (None if not connected)
    ws_stream: Option<WebSocketStream<MaybeTlsStream<TcpStream>>>,
    /// Current session information (None if not authenticated)
    session_info: Option<SessionInfo>,
    /// Connection state
    state: ConnectionState,
    /// Set while a response is owed. A request future dropped before its
    /// reply arrived leaves this set, and the stream is then out of step.
    in_flight: bool,
}

/// Connection state tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConnectionState {
    Disconnected,
    Connected,
    Authenticated,
    Closed,
}

impl WebSocketTransport {
    /// Create a new WebSocket transport.
    pub fn new() -> Self {
        Self {
            ws_stream: None,
            session_info: None,
            state: ConnectionState::Disconnected,
            in_flight: false,
        }
    }

    /// Session established by the last successful login.
    pub fn session_info(&self) -> Option<&SessionInfo> {
        self.session_info.as_ref()
    }

    /// Send a message and receive a response.
    async fn send_receive<T, R>(&mut self, request: &T) -> Result<R, TransportError>
    where
        T: serde::Serialize,
        R: serde::de::DeserializeOwned,
    {
        if self.in_flight {
            return Err(TransportError::ProtocolError(
                "A previous request was interrupted before its response arrived".to_string(),
            ));
        }

        let request_json = serde_json::to_string(request)?;

        let ws_stream = self
            .ws_stream
            .as_mut()
            .ok_or_else(|| TransportError::ProtocolError("Not connected".to_string()))?;

        self.in_flight = true;
        ws_stream
            .send(Message::Text(request_json))
            .await
            .map_err(|e| TransportError::SendError(e.to_string()))?;

        // Skip control frames until the data frame arrives.
        loop {
            let response_msg = ws_stream
                .next()
                .await
                .ok_or_else(|| TransportError::ReceiveError("Connection closed".to_string()))?
                .map_err(|e| TransportError::ReceiveError(e.to_string()))?;

            match response_msg {
                Message::Text(text) => {
                    self.in_flight = false;
                    return Ok(serde_json::from_str(&text)?);
                }
                Message::Binary(bytes) => {
                    self.in_flight = false;
                    return Ok(serde_json::from_slice(&bytes)?);
                }
                Message::Close(_) => {
                    return Err(TransportError::ReceiveError(
                        "Server closed the connection".to_string(),
                    ))
                }
                _ => continue,
            }
        }
    }

    /// Require a given state before sending a request.
    fn require_authenticated(&self, action: &str) -> Result<(), TransportError> {
        if self.state != ConnectionState::Authenticated {
            return Err(TransportError::ProtocolError(format!(
                "Must authenticate before {}",
                action
            )));
        }
        Ok(())
    }
}

/// Turn a non-ok response status into `TransportError::Rejected`.
pub(crate) fn check_status(
    status: &str,
    exception: &Option<ExceptionInfo>,
) -> Result<(), TransportError> {
    if status == "ok" {
        return Ok(());
    }
    match exception {
        Some(e) => Err(TransportError::Rejected {
            sql_code: e.sql_code.clone(),
            message: e.text.clone(),
        }),
        None => Err(TransportError::InvalidResponse(format!(
            "status '{}' without exception details",
            status
        ))),
    }
}

impl Default for WebSocketTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TransportProtocol for WebSocketTransport {
    #[instrument(skip(self), fields(url = %endpoint.to_websocket_url()))]
    async fn connect(&mut self, endpoint: &Endpoint) -> Result<(), TransportError> {
        if self.state != ConnectionState::Disconnected {
            return Err(TransportError::ProtocolError(
                "Already connected".to_string(),
            ));
        }

        let url = endpoint.to_websocket_url();
        let (ws_stream, _) = tokio::time::timeout(
            tokio::time::Duration::from_millis(endpoint.timeout_ms),
            connect_async(&url),
        )
        .await
        .map_err(|_| {
            TransportError::IoError(format!(
                "Connection timeout after {}ms",
                endpoint.timeout_ms
            ))
        })??;

        self.ws_stream = Some(ws_stream);
        self.state = ConnectionState::Connected;
        debug!("websocket established");

        Ok(())
    }

    async fn authenticate(
        &mut self,
        credentials: &Credentials,
    ) -> Result<SessionInfo, TransportError> {
        if self.state != ConnectionState::Connected {
            return Err(TransportError::ProtocolError(
                "Must connect before authenticating".to_string(),
            ));
        }

        let request = LoginRequest::new(
            credentials.username.clone(),
            credentials.password.clone(),
            credentials.client_name.clone(),
        );
        let response: LoginResponse = self.send_receive(&request).await?;
        check_status(&response.status, &response.exception)?;

        let session_info: SessionInfo = response
            .response_data
            .ok_or_else(|| TransportError::InvalidResponse("Missing response data".to_string()))?
            .into();

        self.session_info = Some(session_info.clone());
        self.state = ConnectionState::Authenticated;

        Ok(session_info)
    }

    async fn execute(
        &mut self,
        sql: &str,
        parameters: &[Value],
        prefetch_rows: usize,
    ) -> Result<QueryResult, TransportError> {
        self.require_authenticated("executing statements")?;

        let request = ExecuteRequest::new(sql.to_string(), parameters.to_vec(), prefetch_rows);
        let response: ExecuteResponse = self.send_receive(&request).await?;
        check_status(&response.status, &response.exception)?;

        let response_data = response
            .response_data
            .ok_or_else(|| TransportError::InvalidResponse("Missing response data".to_string()))?;

        // Only the first result of a multi-statement batch is used.
        let result = response_data
            .results
            .into_iter()
            .next()
            .ok_or_else(|| TransportError::InvalidResponse("No results returned".to_string()))?;

        match result.result_type.as_str() {
            "resultSet" => {
                let payload = result.result_set.ok_or_else(|| {
                    TransportError::InvalidResponse("Missing result set".to_string())
                })?;

                let data = ResultData {
                    columns: payload.columns,
                    rows: payload.data,
                    more_rows: payload.more_rows,
                };

                Ok(QueryResult::result_set(
                    payload.result_set_handle.map(ResultSetHandle::new),
                    data,
                ))
            }
            "rowCount" => Ok(QueryResult::row_count(result.row_count.unwrap_or(0))),
            other => Err(TransportError::InvalidResponse(format!(
                "Unknown result type: {}",
                other
            ))),
        }
    }

    async fn fetch(
        &mut self,
        handle: ResultSetHandle,
        num_rows: usize,
    ) -> Result<ResultData, TransportError> {
        self.require_authenticated("fetching results")?;

        let request = FetchRequest::new(handle.as_i32(), num_rows);
        let response: FetchResponse = self.send_receive(&request).await?;
        check_status(&response.status, &response.exception)?;

        let fetch_data = response
            .response_data
            .ok_or_else(|| TransportError::InvalidResponse("Missing response data".to_string()))?;

        Ok(ResultData {
            columns: vec![],
            rows: fetch_data.data,
            more_rows: fetch_data.more_rows,
        })
    }

    async fn close_cursor(&mut self, handle: ResultSetHandle) -> Result<(), TransportError> {
        self.require_authenticated("closing result sets")?;

        let request = CloseResultSetRequest::new(vec![handle.as_i32()]);
        let response: StatusResponse = self.send_receive(&request).await?;
        check_status(&response.status, &response.exception)
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        if self.state == ConnectionState::Disconnected || self.state == ConnectionState::Closed {
            return Ok(());
        }

        if self.state == ConnectionState::Authenticated && !self.in_flight {
            let response: StatusResponse = self.send_receive(&DisconnectRequest::default()).await?;
            check_status(&response.status, &response.exception)?;
        }

        if let Some(mut ws_stream) = self.ws_stream.take() {
            if let Err(e) = ws_stream.close(None).await {
                debug!(error = %e, "websocket close handshake failed");
            }
        }

        self.state = ConnectionState::Closed;
        self.session_info = None;
        self.in_flight = false;

        Ok(())
    }

    fn is_connected(&self) -> bool {
        !self.in_flight
            && matches!(
                self.state,
                ConnectionState::Connected | ConnectionState::Authenticated
            )
    }
}
