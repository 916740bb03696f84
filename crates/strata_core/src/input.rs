//! Normalization of literals and asynchronous values into inputs.
//!
//! Declaration sites accept an [`Input`]: either an immediately available
//! literal or an [`Output`] still being resolved (resource-derived values
//! arrive this way). Every consumer converts to [`Output`] before use, so
//! taint and dependency tracking behave identically for both forms.

use crate::output::Output;
use crate::property::PropertyValue;
use std::collections::BTreeMap;

/// A value a declaration site may supply literally or asynchronously.
#[derive(Debug, Clone)]
pub enum Input<T> {
    /// An immediately available literal.
    Literal(T),
    /// A value that resolves asynchronously.
    Value(Output<T>),
}

impl<T> Input<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Creates a secret literal input.
    #[must_use]
    pub fn secret(value: T) -> Self {
        Self::Value(Output::secret(value))
    }

    /// Converts to the asynchronous form.
    #[must_use]
    pub fn into_output(self) -> Output<T> {
        match self {
            Self::Literal(value) => Output::new(value),
            Self::Value(output) => output,
        }
    }
}

impl<T> From<T> for Input<T> {
    fn from(value: T) -> Self {
        Self::Literal(value)
    }
}

impl<T> From<Output<T>> for Input<T> {
    fn from(output: Output<T>) -> Self {
        Self::Value(output)
    }
}

impl From<&str> for Input<String> {
    fn from(value: &str) -> Self {
        Self::Literal(value.to_string())
    }
}

impl From<&str> for Input<PropertyValue> {
    fn from(value: &str) -> Self {
        Self::Literal(PropertyValue::from(value))
    }
}

impl From<bool> for Input<PropertyValue> {
    fn from(value: bool) -> Self {
        Self::Literal(PropertyValue::from(value))
    }
}

impl From<i64> for Input<PropertyValue> {
    fn from(value: i64) -> Self {
        Self::Literal(PropertyValue::from(value))
    }
}

impl From<f64> for Input<PropertyValue> {
    fn from(value: f64) -> Self {
        Self::Literal(PropertyValue::from(value))
    }
}

impl From<Output<String>> for Input<PropertyValue> {
    fn from(output: Output<String>) -> Self {
        Self::Value(output.map(PropertyValue::String))
    }
}

// ─────────────────────
// Containers
// ─────────────────────

/// Ordered list whose elements are each supplied as inputs.
#[derive(Debug, Clone)]
pub struct InputList<T>(Vec<Input<T>>);

impl<T> InputList<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Creates an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Appends one element.
    pub fn push(&mut self, item: impl Into<Input<T>>) {
        self.0.push(item.into());
    }

    /// Number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the list has no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Joins every element into one list value.
    #[must_use]
    pub fn into_output(self) -> Output<Vec<T>> {
        Output::all(self.0.into_iter().map(Input::into_output))
    }
}

impl<T> Default for InputList<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, I> From<Vec<I>> for InputList<T>
where
    I: Into<Input<T>>,
{
    fn from(items: Vec<I>) -> Self {
        Self(items.into_iter().map(Into::into).collect())
    }
}

impl<T> IntoIterator for InputList<T> {
    type Item = Input<T>;
    type IntoIter = std::vec::IntoIter<Input<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// String-keyed map whose values are each supplied as inputs.
#[derive(Debug, Clone)]
pub struct InputMap<T>(BTreeMap<String, Input<T>>);

impl<T> InputMap<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Inserts one entry, replacing any previous value under `key`.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Input<T>>) {
        self.0.insert(key.into(), value.into());
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the map has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Joins every entry into one map value, keys kept in sorted order.
    #[must_use]
    pub fn into_output(self) -> Output<BTreeMap<String, T>> {
        let (keys, values): (Vec<_>, Vec<_>) = self.0.into_iter().unzip();
        Output::all(values.into_iter().map(Input::into_output))
            .map(move |resolved| keys.into_iter().zip(resolved).collect())
    }
}

impl<T> Default for InputMap<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, I> From<BTreeMap<String, I>> for InputMap<T>
where
    I: Into<Input<T>>,
{
    fn from(entries: BTreeMap<String, I>) -> Self {
        Self(
            entries
                .into_iter()
                .map(|(key, value)| (key, value.into()))
                .collect(),
        )
    }
}

impl<T> IntoIterator for InputMap<T> {
    type Item = (String, Input<T>);
    type IntoIter = std::collections::btree_map::IntoIter<String, Input<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Property bag carried by every resource declaration.
pub type PropertyMap = InputMap<PropertyValue>;

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn literals_normalize_to_known_values() {
        let input: Input<i64> = 5_i64.into();
        let data = input.into_output().data().await.unwrap();
        assert_eq!(data.value, 5);
        assert!(data.known);
        assert!(!data.secret);
    }

    #[tokio::test]
    async fn outputs_pass_through_unchanged() {
        let source = Output::secret("token".to_string());
        let input: Input<String> = source.into();
        let data = input.into_output().data().await.unwrap();
        assert!(data.secret);
    }

    #[tokio::test]
    async fn secret_literals_are_tainted() {
        let input = Input::secret(9_i64);
        let data = input.into_output().data().await.unwrap();
        assert!(data.secret);
    }

    #[tokio::test]
    async fn list_joins_elements_in_order() {
        let mut list: InputList<i64> = InputList::new();
        list.push(1_i64);
        list.push(Output::new(2_i64));
        list.push(Input::Literal(3_i64));

        let data = list.into_output().data().await.unwrap();
        assert_eq!(data.value, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn map_joins_entries_with_sorted_keys() {
        let mut map = InputMap::new();
        map.insert("b", 2_i64);
        map.insert("a", Output::new(1_i64));

        let data = map.into_output().data().await.unwrap();
        let entries: Vec<(String, i64)> = data.value.into_iter().collect();
        assert_eq!(
            entries,
            vec![("a".to_string(), 1), ("b".to_string(), 2)]
        );
    }

    #[tokio::test]
    async fn property_map_accepts_mixed_shapes() {
        let mut props = PropertyMap::new();
        props.insert("name", "logs");
        props.insert("replicas", 3_i64);
        props.insert("public", false);
        props.insert(
            "endpoint",
            Output::new("https://logs.acme.test".to_string()),
        );

        let data = props.into_output().data().await.unwrap();
        assert_eq!(data.value.len(), 4);
        assert_eq!(
            data.value.get("replicas"),
            Some(&PropertyValue::Number(3.0))
        );
    }
}
