//! Asynchronous values with unknown/secret taint and dependency tracking.
//!
//! [`Output<T>`] is the unit of dataflow in a Strata program: a future-like
//! container whose eventual [`OutputData`] carries the concrete value, two
//! taint flags, and the set of resources that contributed to it. Taint is
//! combined monotonically across every combinator: once any constituent is
//! unknown the derived value is unknown, and once any constituent is secret
//! the derived value is secret. Dependency sets are unioned, never
//! intersected.
//!
//! # Example
//!
//! ```
//! use strata_core::Output;
//!
//! futures::executor::block_on(async {
//!     let region = Output::new("eu-west-1".to_string());
//!     let name = region.map(|r| format!("logs-{r}"));
//!     let data = name.data().await.unwrap();
//!     assert_eq!(data.value, "logs-eu-west-1");
//!     assert!(data.known);
//!     assert!(!data.secret);
//! });
//! ```

use crate::resource::DependencySet;
use core::fmt;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use thiserror::Error;

// ─────────────────────
// Errors
// ─────────────────────

/// Failure cause delivered through a value future.
///
/// Causes are cloneable so every future derived from the same failed source
/// observes the identical cause.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OutputError {
    /// The writer half was dropped before the value was settled.
    #[error("value was dropped before it was resolved")]
    Dropped,
    /// Registration of the producing resource failed.
    #[error("registration of {label} failed: {reason}")]
    Registration {
        /// Display label of the resource whose registration failed.
        label: String,
        /// Human-readable failure cause.
        reason: String,
    },
}

// ─────────────────────
// OutputData
// ─────────────────────

/// A resolved value together with its taint flags and contributing
/// resources.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputData<T> {
    /// Resources that contributed to this value.
    pub resources: DependencySet,
    /// The concrete value. When `known` is false this is a placeholder
    /// (typically the type's default) and must not be treated as real.
    pub value: T,
    /// Whether the value's content has been determined yet.
    pub known: bool,
    /// Whether the value is sensitive.
    pub secret: bool,
}

impl<T> OutputData<T> {
    /// Creates data with explicit taint and dependencies.
    #[must_use]
    pub fn new(resources: DependencySet, value: T, known: bool, secret: bool) -> Self {
        Self {
            resources,
            value,
            known,
            secret,
        }
    }

    /// Creates known, non-secret data with no dependencies.
    #[must_use]
    pub fn known(value: T) -> Self {
        Self::new(DependencySet::new(), value, true, false)
    }

    /// Creates known, secret data with no dependencies.
    #[must_use]
    pub fn secret(value: T) -> Self {
        Self::new(DependencySet::new(), value, true, true)
    }

    /// Creates unknown data carrying `value` as the placeholder.
    #[must_use]
    pub fn unknown(value: T) -> Self {
        Self::new(DependencySet::new(), value, false, false)
    }

    /// Maps the value, keeping taint and dependencies unchanged.
    #[must_use]
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> OutputData<U> {
        OutputData {
            resources: self.resources,
            value: f(self.value),
            known: self.known,
            secret: self.secret,
        }
    }

    /// Pairs this data with another, combining taint and dependencies.
    ///
    /// `known` combines with AND, `secret` with OR, and the dependency
    /// sets are unioned.
    #[must_use]
    pub fn combine<U>(self, other: OutputData<U>) -> OutputData<(T, U)> {
        let mut resources = self.resources;
        resources.extend(other.resources);
        OutputData {
            resources,
            value: (self.value, other.value),
            known: self.known && other.known,
            secret: self.secret || other.secret,
        }
    }
}

// ─────────────────────
// Output
// ─────────────────────

type SharedData<T> = Shared<BoxFuture<'static, Result<OutputData<T>, OutputError>>>;

/// A value that may not be known yet, may be secret, and remembers which
/// resources it came from.
///
/// `Output` is cheap to clone; all clones observe the same resolution.
/// Awaiting never blocks a thread, only the calling task.
pub struct Output<T> {
    inner: SharedData<T>,
}

impl<T> Clone for Output<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> fmt::Debug for Output<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Output").finish_non_exhaustive()
    }
}

impl<T> Output<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Wraps already-resolved data.
    #[must_use]
    pub fn from_data(data: OutputData<T>) -> Self {
        Self {
            inner: futures::future::ready(Ok(data)).boxed().shared(),
        }
    }

    /// Creates an already-known, non-secret value with no dependencies.
    #[must_use]
    pub fn new(value: T) -> Self {
        Self::from_data(OutputData::known(value))
    }

    /// Creates an already-known value marked secret.
    #[must_use]
    pub fn secret(value: T) -> Self {
        Self::from_data(OutputData::secret(value))
    }

    /// Builds an output from a future producing resolved data.
    pub(crate) fn from_future<F>(fut: F) -> Self
    where
        F: Future<Output = Result<OutputData<T>, OutputError>> + Send + 'static,
    {
        Self {
            inner: fut.boxed().shared(),
        }
    }

    /// Awaits the resolved data: value, taint flags, and dependency set.
    ///
    /// # Errors
    ///
    /// Returns the failure cause if the producing side failed.
    pub async fn data(&self) -> Result<OutputData<T>, OutputError> {
        self.inner.clone().await
    }

    /// Awaits the resolved value, discarding taint and dependencies.
    ///
    /// # Errors
    ///
    /// Returns the failure cause if the producing side failed.
    pub async fn value(&self) -> Result<T, OutputError> {
        Ok(self.data().await?.value)
    }

    /// Derives a new value by applying `f`.
    ///
    /// The result keeps this value's knownness, secrecy, and dependency
    /// set. `f` runs even while the value is unknown; it then sees the
    /// placeholder value and the result stays unknown.
    #[must_use]
    pub fn map<U, F>(&self, f: F) -> Output<U>
    where
        U: Clone + Send + Sync + 'static,
        F: FnOnce(T) -> U + Send + 'static,
    {
        let data = self.inner.clone();
        Output::from_future(async move { Ok(data.await?.map(f)) })
    }

    /// Derives a new value from a function that itself returns an
    /// [`Output`].
    ///
    /// Knownness, secrecy, and dependency sets combine across the source
    /// and the inner result. If either constituent future fails, the
    /// composed future fails with that same cause; no partially-resolved
    /// composite is observable.
    #[must_use]
    pub fn and_then<U, F>(&self, f: F) -> Output<U>
    where
        U: Clone + Send + Sync + 'static,
        F: FnOnce(T) -> Output<U> + Send + 'static,
    {
        let data = self.inner.clone();
        Output::from_future(async move {
            let OutputData {
                resources: mut deps,
                value,
                known,
                secret,
            } = data.await?;
            let inner = f(value).data().await?;
            deps.extend(inner.resources);
            Ok(OutputData {
                resources: deps,
                value: inner.value,
                known: known && inner.known,
                secret: secret || inner.secret,
            })
        })
    }

    /// Joins many values of the same type into one.
    ///
    /// Waits for every constituent; knownness combines with AND, secrecy
    /// with OR, dependency sets with union, and element order is kept. An
    /// empty input yields a known, non-secret empty vector. Fails with the
    /// first constituent's cause if any constituent fails.
    #[must_use]
    pub fn all<I>(values: I) -> Output<Vec<T>>
    where
        I: IntoIterator<Item = Output<T>>,
    {
        let parts: Vec<SharedData<T>> = values.into_iter().map(|o| o.inner).collect();
        Output::from_future(async move {
            let datas = futures::future::try_join_all(parts).await?;
            let mut resources = DependencySet::new();
            let mut known = true;
            let mut secret = false;
            let mut items = Vec::with_capacity(datas.len());
            for data in datas {
                resources.extend(data.resources);
                known &= data.known;
                secret |= data.secret;
                items.push(data.value);
            }
            Ok(OutputData::new(resources, items, known, secret))
        })
    }

    /// Joins this value with one of a different type.
    #[must_use]
    pub fn zip<U>(&self, other: &Output<U>) -> Output<(T, U)>
    where
        U: Clone + Send + Sync + 'static,
    {
        let a = self.inner.clone();
        let b = other.inner.clone();
        Output::from_future(async move {
            let (da, db) = futures::try_join!(a, b)?;
            Ok(da.combine(db))
        })
    }

    /// Joins this value with two others of different types.
    #[must_use]
    pub fn zip3<U, V>(&self, second: &Output<U>, third: &Output<V>) -> Output<(T, U, V)>
    where
        U: Clone + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
    {
        let a = self.inner.clone();
        let b = second.inner.clone();
        let c = third.inner.clone();
        Output::from_future(async move {
            let (da, db, dc) = futures::try_join!(a, b, c)?;
            Ok(da.combine(db).combine(dc).map(|((t, u), v)| (t, u, v)))
        })
    }
}

// ─────────────────────
// Formatting
// ─────────────────────

/// One renderable piece of a [`format_output!`] interpolation.
///
/// Implemented for displayable literals and for [`Output`]s and
/// [`Input`](crate::input::Input)s of them, so format arguments mix freely.
pub trait FormatArgument {
    /// Converts into the rendered piece, preserving taint and dependencies.
    fn into_rendered(self) -> Output<String>;
}

impl<T> FormatArgument for Output<T>
where
    T: fmt::Display + Clone + Send + Sync + 'static,
{
    fn into_rendered(self) -> Output<String> {
        self.map(|value| value.to_string())
    }
}

impl<T> FormatArgument for crate::input::Input<T>
where
    T: fmt::Display + Clone + Send + Sync + 'static,
{
    fn into_rendered(self) -> Output<String> {
        self.into_output().into_rendered()
    }
}

impl FormatArgument for String {
    fn into_rendered(self) -> Output<String> {
        Output::new(self)
    }
}

impl FormatArgument for &str {
    fn into_rendered(self) -> Output<String> {
        Output::new(self.to_string())
    }
}

macro_rules! impl_format_argument {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl FormatArgument for $ty {
                fn into_rendered(self) -> Output<String> {
                    Output::new(self.to_string())
                }
            }
        )+
    };
}

impl_format_argument!(
    bool, char, f32, f64, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize,
);

/// Builds an [`Output<String>`] by interpolating values into a format
/// string.
///
/// Arguments are anything implementing [`FormatArgument`]: displayable
/// literals, [`Output`]s, or [`Input`](crate::input::Input)s of them.
/// Arguments are joined before formatting, so unknown-ness, secrecy, and
/// dependency sets all propagate into the result. Placeholders are
/// positional `{}`.
///
/// # Example
///
/// ```
/// use strata_core::{Output, format_output};
///
/// futures::executor::block_on(async {
///     let host = Output::new("internal.example".to_string());
///     let url = format_output!("https://{}:{}", host, 8443_u16);
///     assert_eq!(url.value().await.unwrap(), "https://internal.example:8443");
/// });
/// ```
#[macro_export]
macro_rules! format_output {
    ($fmt:literal $(,)?) => {
        $crate::output::Output::<::std::string::String>::new(::std::format!($fmt))
    };
    ($fmt:literal, $($arg:expr),+ $(,)?) => {{
        let rendered: ::std::vec::Vec<$crate::output::Output<::std::string::String>> = ::std::vec![
            $( $crate::output::FormatArgument::into_rendered($arg) ),+
        ];
        $crate::output::Output::all(rendered).map(|parts| {
            let mut parts = parts.into_iter();
            ::std::format!($fmt $(, { let _ = stringify!($arg); parts.next().unwrap_or_default() })+)
        })
    }};
}
