//! Harness-side bridge client for driving the app host

use serde_json::Value;
use tokio::io::{ReadHalf, WriteHalf};

use crate::common::{error::WireError, Error, Result};
use crate::runner::WaitOptions;

use super::protocol::{Call, Request, Response, StatusResult};
use super::transport::{self, Stream};

/// Client for the remote-call bridge
pub struct BridgeClient {
    reader: ReadHalf<Stream>,
    writer: WriteHalf<Stream>,
    next_id: u64,
}

impl BridgeClient {
    /// Connect to the running host on the default socket
    pub async fn connect() -> Result<Self> {
        let stream = transport::connect().await.map_err(map_connect_error)?;
        Ok(Self::from_stream(stream))
    }

    /// Connect to a host on an explicit socket name
    pub async fn connect_to(name: &str) -> Result<Self> {
        let stream = transport::connect_to(name).await.map_err(map_connect_error)?;
        Ok(Self::from_stream(stream))
    }

    fn from_stream(stream: Stream) -> Self {
        let (reader, writer) = tokio::io::split(stream);
        Self {
            reader,
            writer,
            next_id: 1,
        }
    }

    /// Send a call and wait for the matching response
    pub async fn send_call(&mut self, call: Call) -> Result<Value> {
        let id = self.next_id;
        self.next_id += 1;

        let request = Request { id, call };
        let json = serde_json::to_vec(&request)?;

        transport::send_message(&mut self.writer, &json)
            .await
            .map_err(|e| Error::BridgeCommunication(e.to_string()))?;

        let response_data = transport::recv_message(&mut self.reader)
            .await
            .map_err(|e| Error::BridgeCommunication(e.to_string()))?;

        let response: Response = serde_json::from_slice(&response_data)?;

        if response.id != id {
            return Err(Error::Protocol(format!(
                "Response ID mismatch: expected {}, got {}",
                id, response.id
            )));
        }

        if response.success {
            Ok(response.result.unwrap_or(Value::Null))
        } else {
            let error = response.error.unwrap_or_else(|| WireError {
                code: "UNKNOWN".to_string(),
                message: "Unknown error".to_string(),
            });
            Err(error.into())
        }
    }

    /// Invoke a named operation inside the app
    pub async fn invoke(&mut self, name: &str, args: Vec<Value>) -> Result<Value> {
        self.send_call(Call::Invoke {
            name: name.to_string(),
            args,
        })
        .await
    }

    /// Deliver a control message to the host
    pub async fn send_message(&mut self, name: &str, payload: Value) -> Result<Value> {
        self.send_call(Call::Message {
            name: name.to_string(),
            payload,
        })
        .await
    }

    /// Probe host liveness and app state
    pub async fn status(&mut self) -> Result<StatusResult> {
        let value = self.send_call(Call::Status).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Shut the host down
    pub async fn shutdown(&mut self) -> Result<()> {
        self.send_call(Call::Shutdown).await.map(|_| ())
    }

    /// Check if the host is responding
    pub async fn ping(&mut self) -> Result<bool> {
        match self.status().await {
            Ok(_) => Ok(true),
            Err(Error::HostNotRunning) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Invoke `name` repeatedly until `satisfied` accepts its result.
    ///
    /// Same polling semantics as [`crate::runner::wait_for`]: the first
    /// invocation happens immediately, call errors propagate without further
    /// polling, and once the deadline is reached the result gets one final
    /// check before the wait fails with a timeout.
    pub async fn wait_until<P>(
        &mut self,
        name: &str,
        args: Vec<Value>,
        options: &WaitOptions,
        satisfied: P,
    ) -> Result<Value>
    where
        P: Fn(&Value) -> bool + Send,
    {
        let started = tokio::time::Instant::now();
        let deadline = started + options.timeout;
        let mut attempts: u32 = 0;

        loop {
            attempts += 1;
            let value = self.invoke(name, args.clone()).await?;
            if satisfied(&value) {
                return Ok(value);
            }

            let now = tokio::time::Instant::now();
            let exhausted = options.max_attempts.is_some_and(|max| attempts >= max);
            if exhausted || now >= deadline {
                return Err(Error::WaitTimeout {
                    waited_ms: started.elapsed().as_millis() as u64,
                    last: format!("result of '{}' was {}", name, value),
                });
            }
            tokio::time::sleep(options.interval.min(deadline - now)).await;
        }
    }
}

fn map_connect_error(e: std::io::Error) -> Error {
    if e.kind() == std::io::ErrorKind::NotFound
        || e.kind() == std::io::ErrorKind::ConnectionRefused
    {
        Error::HostNotRunning
    } else {
        Error::HostConnectionFailed(e)
    }
}
