//! Input bundles

use super::BundleId;
use crate::error::{Error, Result};
use crate::numeric::Numeric;
use crate::table::{IntoSharedTable, NumericTable};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Caller-supplied tables keyed by input id
///
/// Tables are shared read-only; kernels never mutate them.
#[derive(Debug, Clone)]
pub struct InputBundle<T: Numeric> {
    entries: BTreeMap<u32, (&'static str, Arc<NumericTable<T>>)>,
}

impl<T: Numeric> Default for InputBundle<T> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<T: Numeric> InputBundle<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `table` to `id`, replacing any earlier binding
    pub fn set<K: BundleId>(&mut self, id: K, table: impl IntoSharedTable<T>) {
        self.entries.insert(id.code(), (id.name(), table.into_shared()));
    }

    /// Table bound to `id`, or [`Error::MissingArgument`]
    pub fn get<K: BundleId>(&self, id: K) -> Result<&NumericTable<T>> {
        self.entries
            .get(&id.code())
            .map(|(_, t)| t.as_ref())
            .ok_or_else(|| Error::missing(id.name()))
    }

    /// Shared handle of the table bound to `id`
    pub fn get_shared<K: BundleId>(&self, id: K) -> Result<Arc<NumericTable<T>>> {
        self.entries
            .get(&id.code())
            .map(|(_, t)| Arc::clone(t))
            .ok_or_else(|| Error::missing(id.name()))
    }

    pub fn contains<K: BundleId>(&self, id: K) -> bool {
        self.entries.contains_key(&id.code())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::DenseTable;

    crate::bundle_ids! {
        enum Input {
            Data = 0 => "data",
            Labels = 1 => "labels",
        }
    }

    #[test]
    fn test_set_and_get_share_the_table() {
        let table: Arc<NumericTable<f64>> =
            Arc::new(DenseTable::from_rows(&[[1.0, 2.0]]).unwrap().into());
        let mut inputs = InputBundle::new();
        inputs.set(Input::Data, Arc::clone(&table));

        assert_eq!(inputs.len(), 1);
        assert_eq!(inputs.get(Input::Data).unwrap().cols(), 2);
        assert!(Arc::ptr_eq(&inputs.get_shared(Input::Data).unwrap(), &table));
        assert!(matches!(
            inputs.get(Input::Labels),
            Err(Error::MissingArgument(name)) if name == "labels"
        ));
    }
}
