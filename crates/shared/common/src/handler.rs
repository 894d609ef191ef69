//! Failure propagation for request-handling operations.
//!
//! [`guard`] wraps an operation so that every way it can fail ends up in one
//! place: an `Err` from its future, a panic while the future runs, or a panic
//! before the future is even built. All three are delivered to the
//! [`ErrorSink`] exactly once, and the caller gets `Handled(None)`.
//!
//! Successful outcomes pass through untouched. The wrapper does no logging
//! and no retrying; observing failures is the sink's job.
//!
//! Guarded operations compose. An operation may itself return `Handled<T>`
//! (typically because it awaits another guarded call); an inner `Handled(None)`
//! means the failure was already delivered, so the outer guard does not
//! report it again.

use std::any::Any;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};

use futures::FutureExt;
use tokio::sync::mpsc;

use crate::error::AppError;

/// Destination for failures raised by guarded operations.
pub trait ErrorSink {
    fn report(&self, error: AppError);
}

impl<F> ErrorSink for F
where
    F: Fn(AppError),
{
    fn report(&self, error: AppError) {
        self(error)
    }
}

/// Sink that forwards every failure into an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<AppError>,
}

impl ErrorSink for ChannelSink {
    fn report(&self, error: AppError) {
        // Receiver gone means nobody is observing anymore
        let _ = self.tx.send(error);
    }
}

/// Create a channel-backed sink and the receiver that observes it.
pub fn error_channel() -> (ChannelSink, mpsc::UnboundedReceiver<AppError>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ChannelSink { tx }, rx)
}

/// Result of a guarded call. `None` means the failure went to the sink.
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handled<T>(pub Option<T>);

impl<T> Handled<T> {
    pub fn into_inner(self) -> Option<T> {
        self.0
    }

    pub fn is_handled_failure(&self) -> bool {
        self.0.is_none()
    }
}

/// What a guarded operation produced, before the sink is involved.
#[derive(Debug)]
pub enum Outcome<T> {
    Success(T),
    Failure(AppError),
    /// Failed, and the failure has already been delivered.
    Reported,
}

/// Values a guarded operation may resolve to.
pub trait IntoOutcome {
    type Value;

    fn into_outcome(self) -> Outcome<Self::Value>;
}

impl<T, E> IntoOutcome for Result<T, E>
where
    E: Into<AppError>,
{
    type Value = T;

    fn into_outcome(self) -> Outcome<T> {
        match self {
            Ok(value) => Outcome::Success(value),
            Err(error) => Outcome::Failure(error.into()),
        }
    }
}

impl<T> IntoOutcome for Handled<T> {
    type Value = T;

    fn into_outcome(self) -> Outcome<T> {
        match self.0 {
            Some(value) => Outcome::Success(value),
            None => Outcome::Reported,
        }
    }
}

/// An operation bound to the sink that receives its failures.
pub struct Guarded<F, S> {
    op: F,
    sink: S,
}

/// Wrap `op` so its failures are delivered to `sink`.
pub fn guard<F, S>(op: F, sink: S) -> Guarded<F, S>
where
    S: ErrorSink,
{
    Guarded { op, sink }
}

impl<F, S> Guarded<F, S>
where
    S: ErrorSink,
{
    /// Invoke the operation with `input`.
    pub async fn call<I, Fut>(&self, input: I) -> Handled<<Fut::Output as IntoOutcome>::Value>
    where
        F: Fn(I) -> Fut,
        Fut: Future,
        Fut::Output: IntoOutcome,
    {
        let outcome = match panic::catch_unwind(AssertUnwindSafe(|| (self.op)(input))) {
            Ok(future) => match AssertUnwindSafe(future).catch_unwind().await {
                Ok(output) => output.into_outcome(),
                Err(payload) => Outcome::Failure(panic_error(payload)),
            },
            Err(payload) => Outcome::Failure(panic_error(payload)),
        };

        match outcome {
            Outcome::Success(value) => Handled(Some(value)),
            Outcome::Failure(error) => {
                self.sink.report(error);
                Handled(None)
            }
            Outcome::Reported => Handled(None),
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }
}

fn panic_error(payload: Box<dyn Any + Send>) -> AppError {
    let detail = if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_string()
    };
    AppError::internal(format!("operation panicked: {}", detail))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct RecordingSink(Arc<Mutex<Vec<AppError>>>);

    impl ErrorSink for RecordingSink {
        fn report(&self, error: AppError) {
            self.0.lock().unwrap().push(error);
        }
    }

    impl RecordingSink {
        fn kinds(&self) -> Vec<ErrorKind> {
            self.0.lock().unwrap().iter().map(AppError::kind).collect()
        }
    }

    #[tokio::test]
    async fn test_success_passes_through() {
        let sink = RecordingSink::default();
        let op = guard(|n: u32| async move { Ok::<_, AppError>(n * 2) }, sink.clone());

        assert_eq!(op.call(21).await, Handled(Some(42)));
        assert!(sink.kinds().is_empty());
    }

    #[tokio::test]
    async fn test_async_rejection_reaches_sink() {
        let sink = RecordingSink::default();
        let op = guard(
            |_: ()| async { Err::<(), _>(AppError::validation("No file provided")) },
            sink.clone(),
        );

        assert!(op.call(()).await.is_handled_failure());
        assert_eq!(sink.kinds(), vec![ErrorKind::Validation]);
    }

    #[tokio::test]
    async fn test_sync_panic_reaches_same_sink() {
        let sink = RecordingSink::default();
        let op = guard(
            |fail: bool| {
                if fail {
                    panic!("boom before the future");
                }
                async { Ok::<(), AppError>(()) }
            },
            sink.clone(),
        );

        assert_eq!(op.call(true).await, Handled(None));
        assert_eq!(op.call(false).await, Handled(Some(())));

        let errors = sink.0.lock().unwrap();
        assert_eq!(errors.len(), 1);
        assert!(matches!(&errors[0], AppError::Internal(msg) if msg.contains("boom before the future")));
    }

    #[tokio::test]
    async fn test_panic_inside_future_reaches_sink() {
        let sink = RecordingSink::default();
        let op = guard(
            |_: ()| async {
                tokio::task::yield_now().await;
                if true {
                    panic!("{}", String::from("late failure"));
                }
                Ok::<(), AppError>(())
            },
            sink.clone(),
        );

        assert_eq!(op.call(()).await, Handled(None));
        assert_eq!(sink.kinds(), vec![ErrorKind::Internal]);
    }

    #[tokio::test]
    async fn test_domain_errors_are_converted() {
        let sink = RecordingSink::default();
        let op = guard(
            |_: ()| async { Err::<(), _>(domain::DomainError::InvalidCredentials) },
            sink.clone(),
        );

        let _ = op.call(()).await;
        assert_eq!(sink.kinds(), vec![ErrorKind::Auth]);
    }

    #[tokio::test]
    async fn test_nested_guard_reports_once() {
        let sink = RecordingSink::default();
        let inner = Arc::new(guard(
            |_: ()| async { Err::<u8, _>(AppError::conflict("Username")) },
            sink.clone(),
        ));
        let outer = guard(
            move |input: ()| {
                let inner = Arc::clone(&inner);
                async move { inner.call(input).await }
            },
            sink.clone(),
        );

        assert_eq!(outer.call(()).await, Handled(None));
        assert_eq!(sink.kinds(), vec![ErrorKind::Conflict]);
    }

    #[tokio::test]
    async fn test_nested_success_unwraps() {
        let sink = RecordingSink::default();
        let inner = Arc::new(guard(|n: u8| async move { Ok::<_, AppError>(n + 1) }, sink.clone()));
        let outer = guard(
            move |n: u8| {
                let inner = Arc::clone(&inner);
                async move { inner.call(n).await }
            },
            sink.clone(),
        );

        assert_eq!(outer.call(1).await, Handled(Some(2)));
        assert!(sink.kinds().is_empty());
    }

    #[tokio::test]
    async fn test_channel_sink_observes_failures() {
        let (sink, mut rx) = error_channel();
        let op = guard(
            |_: ()| async { Err::<(), _>(AppError::transfer("remote down")) },
            sink,
        );

        let _ = op.call(()).await;
        let received = rx.recv().await.unwrap();
        assert_eq!(received.kind(), ErrorKind::Transfer);
    }

    #[tokio::test]
    async fn test_closure_sink() {
        let seen = Arc::new(Mutex::new(0usize));
        let counter = Arc::clone(&seen);
        let op = guard(
            |_: ()| async { Err::<(), _>(AppError::Unauthorized) },
            move |_: AppError| *counter.lock().unwrap() += 1,
        );

        let _ = op.call(()).await;
        let _ = op.call(()).await;
        assert_eq!(*seen.lock().unwrap(), 2);
    }
}
