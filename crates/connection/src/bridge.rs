//! Submit once, block until the one completion arrives.

use std::thread::{self, ThreadId};

use cluster::{
    location, ClusterClient, ClusterRequest, Completion, CoreError, CoreResult, ErrorCode,
};
use tokio::sync::oneshot;
use tracing::debug;

/// Blocking bridge over a client's completion-based entry points.
///
/// Each call gets its own single-slot channel: the completion is the only
/// writer, the blocked caller the only reader. The bridge knows the worker
/// thread of its connection and refuses to block on it, since the completion
/// could never be delivered.
#[derive(Debug, Clone, Copy)]
pub struct RequestBridge {
    worker: ThreadId,
}

impl RequestBridge {
    pub fn new(worker: ThreadId) -> Self {
        Self { worker }
    }

    /// Returns `true` when the calling thread is the connection's worker.
    pub fn on_worker(&self) -> bool {
        thread::current().id() == self.worker
    }

    /// Hands a [`Completion`] to `submit` and waits for its value.
    ///
    /// `submit` must pass the completion to the client exactly once. If the
    /// client drops it instead, the wait ends with `request_canceled`.
    ///
    /// # Errors
    ///
    /// - `blocking_call_on_worker` when called from the worker thread or from
    ///   inside any async execution context.
    /// - `request_canceled` when the completion was dropped without a value.
    pub fn execute<T, F>(&self, submit: F) -> CoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(Completion<T>),
    {
        if self.on_worker() {
            return Err(CoreError::with_message(
                ErrorCode::BlockingCallOnWorker,
                location!(),
                "blocking call issued from the connection worker thread",
            ));
        }
        if tokio::runtime::Handle::try_current().is_ok() {
            return Err(CoreError::with_message(
                ErrorCode::BlockingCallOnWorker,
                location!(),
                "blocking call issued from inside an async execution context",
            ));
        }

        let (tx, rx) = oneshot::channel();
        submit(Completion::new(move |value| {
            // The receiver is gone only if the caller's thread unwound.
            let _ = tx.send(value);
        }));

        rx.blocking_recv().map_err(|_| {
            CoreError::with_message(
                ErrorCode::RequestCanceled,
                location!(),
                "request was abandoned by the cluster client before it completed",
            )
        })
    }

    /// Submits a typed request and waits for its response.
    ///
    /// The response is returned as is, even when it embeds an error code:
    /// translating that code is up to the caller.
    pub fn dispatch<R: ClusterRequest>(
        &self,
        client: &dyn ClusterClient,
        request: R,
    ) -> CoreResult<R::Response> {
        debug!(operation = R::NAME, "Submitting request");
        let response =
            self.execute(|completion| client.execute(request.into_operation(completion)))?;
        debug!(operation = R::NAME, "Request completed");
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bridge_for_other_thread() -> RequestBridge {
        // A thread id that is never the caller's.
        let worker = thread::spawn(|| thread::current().id()).join().unwrap();
        RequestBridge::new(worker)
    }

    #[test]
    fn returns_value_delivered_from_another_thread() {
        let bridge = bridge_for_other_thread();
        let value = bridge
            .execute(|completion: Completion<u32>| {
                thread::spawn(move || completion.complete(42));
            })
            .unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn dropped_completion_is_request_canceled() {
        let bridge = bridge_for_other_thread();
        let err = bridge
            .execute(|completion: Completion<u32>| drop(completion))
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::RequestCanceled);
        assert!(err.context.is_none());
    }

    #[test]
    fn refuses_to_block_on_the_worker_thread() {
        let bridge = RequestBridge::new(thread::current().id());
        let mut submitted = false;
        let err = bridge
            .execute(|_completion: Completion<()>| submitted = true)
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::BlockingCallOnWorker);
        assert!(!submitted);
    }

    #[test]
    fn refuses_to_block_inside_a_runtime() {
        let bridge = bridge_for_other_thread();
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let err = runtime
            .block_on(async {
                bridge.execute(|completion: Completion<()>| completion.complete(()))
            })
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::BlockingCallOnWorker);
    }
}
