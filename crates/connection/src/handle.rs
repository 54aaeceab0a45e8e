//! Connection lifecycle: execution context, worker thread, client handle.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use cluster::operations::ClusterDescribeRequest;
use cluster::{
    location, ClusterClient, ClusterOrigin, ClusterResponse, ConnectionId, CoreError, CoreResult,
    ErrorCode,
};
use serde_json::Value;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

use crate::bridge::RequestBridge;

/// Name given to every connection's worker thread.
pub const WORKER_THREAD_NAME: &str = "cluster-io";

/// One logical connection to a cluster.
///
/// Owns a single-threaded execution context driven by a dedicated worker
/// thread, and the client that schedules its I/O on it. Every method blocks
/// the calling thread until the client reports completion.
///
/// # Teardown
///
/// [`close`](Connection::close) and `Drop` run the same sequence, once:
/// close the client and wait for it, stop the execution context, join the
/// worker, release the client. A connection dropped on its own worker thread
/// cannot wait for any of that; it stops the loop and leaves the thread
/// detached.
pub struct Connection {
    pub(crate) id: ConnectionId,
    pub(crate) origin: ClusterOrigin,
    pub(crate) client: Arc<dyn ClusterClient>,
    pub(crate) bridge: RequestBridge,
    stop: Option<oneshot::Sender<()>>,
    worker: Option<JoinHandle<()>>,
}

impl Connection {
    /// Starts the worker thread and attaches a client to its execution context.
    ///
    /// `connect` receives the runtime handle the client must schedule on. The
    /// connection is not opened yet; see [`open`](Connection::open).
    ///
    /// # Errors
    ///
    /// `execution_context_unavailable` when the runtime or its thread cannot
    /// be created.
    pub fn start<C>(origin: ClusterOrigin, connect: C) -> CoreResult<Self>
    where
        C: FnOnce(Handle) -> Arc<dyn ClusterClient>,
    {
        let id = ConnectionId::new_random();
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .map_err(|err| {
                CoreError::with_message(
                    ErrorCode::ExecutionContextUnavailable,
                    location!(),
                    format!("unable to build execution context: {err}"),
                )
            })?;
        let handle = runtime.handle().clone();

        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let worker = thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_owned())
            .spawn(move || {
                // Completions run here until the stop signal, or until its
                // sender is dropped.
                runtime.block_on(async move {
                    let _ = stop_rx.await;
                });
            })
            .map_err(|err| {
                CoreError::with_message(
                    ErrorCode::ExecutionContextUnavailable,
                    location!(),
                    format!("unable to spawn worker thread: {err}"),
                )
            })?;

        let bridge = RequestBridge::new(worker.thread().id());
        let client = connect(handle);

        info!(
            connection_id = %id,
            connection_string = %origin.connection_string,
            "Connection started"
        );
        Ok(Self {
            id,
            origin,
            client,
            bridge,
            stop: Some(stop_tx),
            worker: Some(worker),
        })
    }

    /// Builds the origin from host inputs, starts the connection and opens it.
    ///
    /// A connection whose open fails is torn down before the error is
    /// returned.
    pub fn create<C>(connection_string: &str, options: &Value, connect: C) -> CoreResult<Self>
    where
        C: FnOnce(Handle) -> Arc<dyn ClusterClient>,
    {
        let origin = options::cluster_origin(connection_string, options)?;
        let connection = Self::start(origin, connect)?;
        connection.open()?;
        Ok(connection)
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn origin(&self) -> &ClusterOrigin {
        &self.origin
    }

    /// Bootstraps the client against the origin.
    ///
    /// A failed open leaves the connection started; the caller may retry.
    pub fn open(&self) -> CoreResult<()> {
        let origin = self.origin.clone();
        let outcome = self.bridge.execute(|done| self.client.open(origin, done))?;
        match outcome {
            None => {
                info!(connection_id = %self.id, "Connection opened");
                Ok(())
            }
            Some(code) => {
                warn!(
                    connection_id = %self.id,
                    error_code = code.value(),
                    "Unable to open connection"
                );
                Err(CoreError::with_message(
                    code,
                    location!(),
                    format!("unable to open connection: {}, {}", code.value(), code),
                ))
            }
        }
    }

    pub fn bucket_open(&self, name: &str) -> CoreResult<()> {
        let outcome = self
            .bridge
            .execute(|done| self.client.open_bucket(name.to_owned(), done))?;
        match outcome {
            None => {
                info!(connection_id = %self.id, bucket = name, "Bucket opened");
                Ok(())
            }
            Some(code) => Err(CoreError::with_message(
                code,
                location!(),
                format!(r#"unable to open bucket "{name}": {}, {}"#, code.value(), code),
            )),
        }
    }

    pub fn bucket_close(&self, name: &str) -> CoreResult<()> {
        let outcome = self
            .bridge
            .execute(|done| self.client.close_bucket(name.to_owned(), done))?;
        match outcome {
            None => {
                info!(connection_id = %self.id, bucket = name, "Bucket closed");
                Ok(())
            }
            Some(code) => Err(CoreError::with_message(
                code,
                location!(),
                format!(r#"unable to close bucket "{name}": {}, {}"#, code.value(), code),
            )),
        }
    }

    /// Version of the first cluster node, or an empty string.
    ///
    /// When the cluster cannot describe itself before a bucket is open and
    /// `bucket_name` is not empty, the bucket is opened and the probe is
    /// repeated once. Every other failure yields an empty string.
    pub fn cluster_version(&self, bucket_name: &str) -> String {
        let response = match self
            .bridge
            .dispatch(self.client.as_ref(), ClusterDescribeRequest::default())
        {
            Ok(response) => response,
            Err(err) => {
                debug!(connection_id = %self.id, error = %err, "Cluster version probe failed");
                return String::new();
            }
        };

        match response.error_code() {
            None => response.first_node_version().unwrap_or_default().to_owned(),
            Some(ErrorCode::ServiceNotAvailable) if !bucket_name.is_empty() => {
                if let Err(err) = self.bucket_open(bucket_name) {
                    debug!(connection_id = %self.id, error = %err, "Cluster version probe failed");
                    return String::new();
                }
                self.cluster_version("")
            }
            Some(code) => {
                debug!(
                    connection_id = %self.id,
                    error_code = code.value(),
                    "Cluster version probe failed"
                );
                String::new()
            }
        }
    }

    /// Tears the connection down and reports how that went.
    ///
    /// # Errors
    ///
    /// - `worker_panicked` when the worker thread terminated by panicking.
    /// - `blocking_call_on_worker` when called on the worker thread.
    pub fn close(mut self) -> CoreResult<()> {
        self.teardown()
    }

    fn teardown(&mut self) -> CoreResult<()> {
        let Some(worker) = self.worker.take() else {
            return Ok(());
        };

        if self.bridge.on_worker() {
            if let Some(stop) = self.stop.take() {
                let _ = stop.send(());
            }
            return Err(CoreError::with_message(
                ErrorCode::BlockingCallOnWorker,
                location!(),
                "connection released on its own worker thread, leaving it detached",
            ));
        }

        info!(connection_id = %self.id, "Closing connection");
        let client = Arc::clone(&self.client);
        if let Err(err) = self.bridge.execute(|done| client.close(done)) {
            warn!(connection_id = %self.id, error = %err, "Cluster client did not confirm close");
        }

        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if worker.join().is_err() {
            error!(connection_id = %self.id, "Worker thread panicked");
            return Err(CoreError::with_message(
                ErrorCode::WorkerPanicked,
                location!(),
                "connection worker thread panicked",
            ));
        }

        info!(connection_id = %self.id, "Connection closed");
        Ok(())
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if let Err(err) = self.teardown() {
            error!(connection_id = %self.id, error = %err, "Connection teardown failed");
        }
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("connection_string", &self.origin.connection_string.input)
            .field("running", &self.worker.is_some())
            .finish()
    }
}
