//! App host - bridge listener and main event loop

use std::sync::Arc;
use std::time::{Duration, Instant};

use interprocess::local_socket::traits::tokio::Listener as ListenerTrait;
use serde_json::{json, Value};
use tokio::io::BufReader;
use tokio::sync::Mutex;

use crate::bridge::protocol::{Call, Request, Response, StatusResult};
use crate::bridge::transport;
use crate::common::{config::Config, error::WireError, paths, Error, Result};

use super::app::AppModel;

/// Main host process serving the bridge protocol
pub struct Host {
    /// Configuration
    config: Config,
    /// The hosted application model
    app: Arc<Mutex<AppModel>>,
    /// Last activity timestamp for idle timeout
    last_activity: Instant,
    /// Whether shutdown was requested
    shutdown_requested: bool,
}

/// Run the host on the default socket until shutdown
pub async fn run() -> Result<()> {
    Host::new()?.run().await
}

impl Host {
    /// Create a new host instance
    pub fn new() -> Result<Self> {
        let config = Config::load()?;

        Ok(Self {
            config,
            app: Arc::new(Mutex::new(AppModel::new())),
            last_activity: Instant::now(),
            shutdown_requested: false,
        })
    }

    /// Host with an explicit configuration (integration tests)
    pub fn with_config(config: Config) -> Self {
        Self {
            config,
            app: Arc::new(Mutex::new(AppModel::new())),
            last_activity: Instant::now(),
            shutdown_requested: false,
        }
    }

    /// Run the host main loop on the default socket
    pub async fn run(&mut self) -> Result<()> {
        let listener = transport::create_listener().await?;
        tracing::info!("Host listening on {}", paths::socket_name());
        self.schedule_startup();

        let idle_timeout = Duration::from_secs(self.config.host.idle_timeout_minutes * 60);

        loop {
            if self.shutdown_requested {
                tracing::info!("Shutdown requested, exiting");
                break;
            }

            if self.last_activity.elapsed() > idle_timeout {
                tracing::info!("Idle timeout reached, shutting down host");
                break;
            }

            if self.run_select_loop(&listener).await? {
                break;
            }
        }

        paths::remove_socket()?;
        tracing::info!("Host shutdown complete");

        Ok(())
    }

    /// Run the host on an explicit socket name until shutdown
    ///
    /// Used by integration tests to serve the bridge in-process on a
    /// private socket.
    pub async fn run_at(&mut self, socket: &str) -> Result<()> {
        let listener = transport::create_listener_at(socket).await?;
        tracing::info!("Host listening on {}", socket);
        self.schedule_startup();

        loop {
            if self.shutdown_requested {
                break;
            }

            match listener.accept().await {
                Ok(stream) => {
                    self.last_activity = Instant::now();
                    if let Err(e) = self.handle_client(stream).await {
                        tracing::error!("Error handling client: {}", e);
                    }
                }
                Err(e) => {
                    tracing::error!("Accept error: {}", e);
                }
            }
        }

        Ok(())
    }

    /// Mark the app loaded after the configured startup delay
    fn schedule_startup(&self) {
        let app = self.app.clone();
        let delay = Duration::from_millis(self.config.host.startup_delay_ms);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            app.lock().await.mark_loaded();
            tracing::debug!("App model marked loaded");
        });
    }

    /// Run one iteration of the select loop, returns true if should break
    #[cfg(unix)]
    async fn run_select_loop(&mut self, listener: &transport::platform::Listener) -> Result<bool> {
        use tokio::signal::unix::{signal, SignalKind};

        // Set up signal handlers (recreated each iteration to avoid lifetime issues)
        let mut sigterm =
            signal(SignalKind::terminate()).expect("Failed to create SIGTERM handler");
        let mut sigint = signal(SignalKind::interrupt()).expect("Failed to create SIGINT handler");

        tokio::select! {
            // Handle SIGTERM (graceful shutdown)
            _ = sigterm.recv() => {
                tracing::info!("Received SIGTERM, shutting down gracefully");
                Ok(true)
            }
            // Handle SIGINT (Ctrl+C)
            _ = sigint.recv() => {
                tracing::info!("Received SIGINT (Ctrl+C), shutting down gracefully");
                Ok(true)
            }
            accept_result = listener.accept() => {
                match accept_result {
                    Ok(stream) => {
                        self.last_activity = Instant::now();
                        if let Err(e) = self.handle_client(stream).await {
                            tracing::error!("Error handling client: {}", e);
                        }
                    }
                    Err(e) => {
                        tracing::error!("Accept error: {}", e);
                    }
                }
                Ok(false)
            }
            _ = tokio::time::sleep(Duration::from_secs(1)) => {
                // Periodic wakeup to check idle timeout
                Ok(false)
            }
        }
    }

    /// Run one iteration of the select loop (Windows version)
    #[cfg(not(unix))]
    async fn run_select_loop(&mut self, listener: &transport::platform::Listener) -> Result<bool> {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok(stream) => {
                        self.last_activity = Instant::now();
                        if let Err(e) = self.handle_client(stream).await {
                            tracing::error!("Error handling client: {}", e);
                        }
                    }
                    Err(e) => {
                        tracing::error!("Accept error: {}", e);
                    }
                }
                Ok(false)
            }
            _ = tokio::time::sleep(Duration::from_secs(1)) => {
                // Periodic wakeup to check idle timeout
                Ok(false)
            }
        }
    }

    /// Handle a single client connection
    async fn handle_client(&mut self, stream: transport::platform::Stream) -> Result<()> {
        let (reader, mut writer) = tokio::io::split(stream);
        let mut reader = BufReader::new(reader);

        // Read and process calls until the client disconnects
        loop {
            let request_data = tokio::select! {
                result = transport::recv_message(&mut reader) => {
                    match result {
                        Ok(data) => data,
                        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                            // Client disconnected
                            tracing::debug!("Client disconnected");
                            break;
                        }
                        Err(e) => {
                            tracing::error!("Error reading request: {}", e);
                            break;
                        }
                    }
                }
                _ = tokio::time::sleep(Duration::from_secs(300)) => {
                    // Client timeout
                    tracing::debug!("Client timeout");
                    break;
                }
            };

            // Parse request
            let request: Request = match serde_json::from_slice(&request_data) {
                Ok(req) => req,
                Err(e) => {
                    tracing::error!("Invalid request: {}", e);
                    let response = Response::error(
                        0,
                        WireError {
                            code: "INVALID_REQUEST".to_string(),
                            message: e.to_string(),
                        },
                    );
                    let json = serde_json::to_vec(&response)?;
                    transport::send_message(&mut writer, &json).await?;
                    continue;
                }
            };

            tracing::debug!("Received call: {:?}", request.call);

            // Check for shutdown
            if matches!(request.call, Call::Shutdown) {
                self.shutdown_requested = true;
                let response = Response::ok(request.id);
                let json = serde_json::to_vec(&response)?;
                transport::send_message(&mut writer, &json).await?;
                break;
            }

            // Handle call
            let response = self.handle_call(request.id, request.call).await;

            // Send response
            let json = serde_json::to_vec(&response)?;
            transport::send_message(&mut writer, &json).await?;

            self.last_activity = Instant::now();
        }

        Ok(())
    }

    /// Dispatch a single call against the app model
    async fn handle_call(&mut self, id: u64, call: Call) -> Response {
        match call {
            Call::Invoke { name, args } => {
                let mut app = self.app.lock().await;
                match app.invoke(&name, &args) {
                    Ok(value) => Response::success(id, value),
                    Err(e) => Response::error(id, WireError::from(&e)),
                }
            }

            Call::Message { name, payload } => match self.apply_message(&name, payload).await {
                Ok(value) => Response::success(id, value),
                Err(e) => Response::error(id, WireError::from(&e)),
            },

            Call::Status => {
                let app = self.app.lock().await;
                let status = StatusResult {
                    app_loaded: app.is_loaded(),
                    volume_count: app.volume_count(),
                    recorded_calls: app.recorded().len(),
                };
                match serde_json::to_value(&status) {
                    Ok(value) => Response::success(id, value),
                    Err(e) => Response::error(
                        id,
                        WireError {
                            code: "INTERNAL_ERROR".to_string(),
                            message: e.to_string(),
                        },
                    ),
                }
            }

            // Handled by the caller before dispatch
            Call::Shutdown => Response::ok(id),
        }
    }

    /// Apply a control message to the app model.
    ///
    /// A `delay_ms` field in the payload defers the mutation to a background
    /// task; scenarios then poll for the effect.
    async fn apply_message(&mut self, name: &str, payload: Value) -> Result<Value> {
        let delay = payload
            .get("delay_ms")
            .and_then(Value::as_u64)
            .map(Duration::from_millis);

        match name {
            "mountVolume" => {
                let volume = required_str(&payload, "name", "mountVolume")?.to_string();
                let files = string_list(payload.get("files"));
                self.mutate(delay, move |app| {
                    app.record(format!("message mountVolume {}", volume));
                    app.add_volume(&volume, files);
                })
                .await;
                Ok(json!(true))
            }

            "unmountAllVolumes" => {
                self.mutate(delay, |app| {
                    app.record("message unmountAllVolumes".to_string());
                    app.remove_all_volumes();
                })
                .await;
                Ok(json!(true))
            }

            "addEntries" => {
                let volume = required_str(&payload, "volume", "addEntries")?.to_string();
                let files = string_list(payload.get("files"));
                self.mutate(delay, move |app| {
                    app.record(format!("message addEntries {}", volume));
                    if !app.add_entries(&volume, files) {
                        tracing::warn!("addEntries: volume '{}' is not mounted", volume);
                    }
                })
                .await;
                Ok(json!(true))
            }

            _ => Err(Error::UnknownOperation(name.to_string())),
        }
    }

    /// Run a mutation now, or on a background task after `delay`
    async fn mutate<F>(&self, delay: Option<Duration>, f: F)
    where
        F: FnOnce(&mut AppModel) + Send + 'static,
    {
        match delay {
            Some(d) => {
                let app = self.app.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(d).await;
                    f(&mut *app.lock().await);
                });
            }
            None => f(&mut *self.app.lock().await),
        }
    }
}

fn required_str<'a>(payload: &'a Value, field: &str, message: &str) -> Result<&'a str> {
    payload.get(field).and_then(Value::as_str).ok_or_else(|| {
        Error::Protocol(format!("message '{}' requires a '{}' field", message, field))
    })
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}
