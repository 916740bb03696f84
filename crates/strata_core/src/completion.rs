//! Single-assignment promises feeding resolved values into outputs.
//!
//! The registration pipeline writes each resource field exactly once:
//! a [`Promise`] is the writer half of that contract, and the connected
//! [`Output`] is the reader half. A second resolution attempt is a protocol
//! violation, so the panicking variants fail fast; the `try_` variants
//! report whether the caller won the single assignment and back the
//! failure and finalization sweeps, which settle only what is still
//! pending.

use crate::output::{Output, OutputData, OutputError};
use crate::resource::DependencySet;
use tokio::sync::watch;

/// Payload written into the slot exactly once.
type Settled<T> = Result<(T, bool, bool), OutputError>;

/// The writer half of a resolve-once value.
///
/// Dropping an unresolved promise fails the connected output with
/// [`OutputError::Dropped`] instead of leaving awaiters hanging.
pub struct Promise<T> {
    tx: watch::Sender<Option<Settled<T>>>,
    output: Output<T>,
}

impl<T> Promise<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Creates a promise with no contributing resources.
    #[must_use]
    pub fn new() -> Self {
        Self::with_dependencies(DependencySet::new())
    }

    /// Creates a promise whose resolved data carries `dependencies` as the
    /// contributing-resource set.
    #[must_use]
    pub fn with_dependencies(dependencies: DependencySet) -> Self {
        let (tx, mut rx) = watch::channel(None::<Settled<T>>);
        let output = Output::from_future(async move {
            let settled = match rx.wait_for(Option::is_some).await {
                Ok(slot) => slot.clone(),
                Err(_) => return Err(OutputError::Dropped),
            };
            let Some(settled) = settled else {
                return Err(OutputError::Dropped);
            };
            let (value, known, secret) = settled?;
            Ok(OutputData::new(dependencies, value, known, secret))
        });
        Self { tx, output }
    }

    /// The reader half. Clones share the same resolution.
    #[must_use]
    pub fn output(&self) -> Output<T> {
        self.output.clone()
    }

    /// Resolves the value.
    ///
    /// # Panics
    ///
    /// Panics if the promise was already settled.
    pub fn resolve(&self, value: T, known: bool, secret: bool) {
        assert!(
            self.try_resolve(value, known, secret),
            "promise resolved twice"
        );
    }

    /// Fails the value with `cause`.
    ///
    /// # Panics
    ///
    /// Panics if the promise was already settled.
    pub fn fail(&self, cause: OutputError) {
        assert!(self.try_fail(cause), "promise resolved twice");
    }

    /// Attempts to resolve; returns whether this call won the single
    /// assignment.
    pub fn try_resolve(&self, value: T, known: bool, secret: bool) -> bool {
        self.settle(Ok((value, known, secret)))
    }

    /// Attempts to fail the value with `cause`; returns whether this call
    /// won the single assignment.
    pub fn try_fail(&self, cause: OutputError) -> bool {
        self.settle(Err(cause))
    }

    /// Whether the promise has been settled.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.tx.borrow().is_some()
    }

    fn settle(&self, payload: Settled<T>) -> bool {
        self.tx.send_if_modified(|slot| {
            if slot.is_some() {
                return false;
            }
            *slot = Some(payload);
            true
        })
    }
}

impl<T> Promise<T>
where
    T: Clone + Default + Send + Sync + 'static,
{
    /// Attempts to settle to the type's default value, non-secret.
    ///
    /// This is the finalization primitive: fields never resolved through a
    /// response are forced to a default so nothing awaiting them hangs.
    /// During a dry run the default is unknown (`known = false`); in a real
    /// run it is known-but-empty.
    pub fn try_resolve_default(&self, known: bool) -> bool {
        self.try_resolve(T::default(), known, false)
    }
}

impl<T> Default for Promise<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> core::fmt::Debug for Promise<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Promise")
            .field("settled", &self.tx.borrow().is_some())
            .finish_non_exhaustive()
    }
}

// ─────────────────────
// Uniform sweeps
// ─────────────────────

/// Uniform view over promises of different value types.
///
/// The pipeline's failure and finalization paths sweep a resource's fields
/// without caring about each field's concrete type.
pub trait PendingOutput: Send + Sync {
    /// Attempts to fail the field with `cause`.
    fn fail_pending(&self, cause: &OutputError) -> bool;

    /// Attempts to settle the field to its default value.
    fn settle_default(&self, known: bool) -> bool;
}

impl<T> PendingOutput for Promise<T>
where
    T: Clone + Default + Send + Sync + 'static,
{
    fn fail_pending(&self, cause: &OutputError) -> bool {
        self.try_fail(cause.clone())
    }

    fn settle_default(&self, known: bool) -> bool {
        self.try_resolve_default(known)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolves_exactly_once() {
        let promise = Promise::new();
        let output = promise.output();

        assert!(promise.try_resolve(7_i64, true, false));
        assert!(!promise.try_resolve(9, true, false));

        let data = output.data().await.unwrap();
        assert_eq!(data.value, 7);
        assert!(data.known);
    }

    #[tokio::test]
    #[should_panic(expected = "promise resolved twice")]
    async fn double_resolution_panics() {
        let promise = Promise::new();
        promise.resolve(1_i64, true, false);
        promise.resolve(2, true, false);
    }

    #[tokio::test]
    async fn failure_reaches_every_reader() {
        let promise: Promise<String> = Promise::new();
        let first = promise.output();
        let second = promise.output();

        let cause = OutputError::Registration {
            label: "db[test:core:Leaf]".to_string(),
            reason: "rejected".to_string(),
        };
        promise.fail(cause.clone());

        assert_eq!(first.data().await.unwrap_err(), cause);
        assert_eq!(second.data().await.unwrap_err(), cause);
    }

    #[tokio::test]
    async fn dropping_unresolved_fails_with_dropped() {
        let promise: Promise<i64> = Promise::new();
        let output = promise.output();
        drop(promise);

        assert_eq!(output.data().await.unwrap_err(), OutputError::Dropped);
    }

    #[tokio::test]
    async fn dropping_after_resolution_keeps_the_value() {
        let promise = Promise::new();
        let output = promise.output();
        promise.resolve("kept".to_string(), true, false);
        drop(promise);

        assert_eq!(output.value().await.unwrap(), "kept");
    }

    #[tokio::test]
    async fn default_settlement_tracks_dry_run() {
        let preview: Promise<String> = Promise::new();
        assert!(preview.try_resolve_default(false));
        let data = preview.output().data().await.unwrap();
        assert_eq!(data.value, "");
        assert!(!data.known);
        assert!(!data.secret);

        let real: Promise<String> = Promise::new();
        assert!(real.try_resolve_default(true));
        let data = real.output().data().await.unwrap();
        assert!(data.known);
    }

    #[tokio::test]
    async fn settle_default_loses_to_earlier_resolution() {
        let promise = Promise::new();
        promise.resolve(42_i64, true, false);
        assert!(!promise.settle_default(true));
        assert_eq!(promise.output().value().await.unwrap(), 42);
    }
}
