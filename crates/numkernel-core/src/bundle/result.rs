//! Result bundles and their layouts

use super::BundleId;
use crate::error::{Error, Result};
use crate::numeric::Numeric;
use crate::table::DenseTable;
use std::borrow::Cow;
use std::collections::BTreeMap;

/// Declared shape of one result entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultSlot {
    pub code: u32,
    pub name: Cow<'static, str>,
    pub rows: usize,
    pub cols: usize,
}

/// Shapes of every entry a kernel writes
///
/// A layout is a pure function of the input dimensions and the parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultLayout {
    slots: Vec<ResultSlot>,
}

impl ResultLayout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a `rows x cols` entry for `id`
    pub fn with<K: BundleId>(mut self, id: K, rows: usize, cols: usize) -> Self {
        self.slots.retain(|s| s.code != id.code());
        self.slots.push(ResultSlot {
            code: id.code(),
            name: Cow::Borrowed(id.name()),
            rows,
            cols,
        });
        self
    }

    pub fn slots(&self) -> &[ResultSlot] {
        &self.slots
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Entry<T: Numeric> {
    name: Cow<'static, str>,
    table: DenseTable<T>,
    populated: bool,
}

/// Owned output tables of one computation
///
/// The bundle is allocated once per input configuration. Readers only see it
/// after every declared entry has been written and the bundle was sealed.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultBundle<T: Numeric> {
    layout: Option<ResultLayout>,
    entries: BTreeMap<u32, Entry<T>>,
    valid: bool,
}

impl<T: Numeric> Default for ResultBundle<T> {
    fn default() -> Self {
        Self {
            layout: None,
            entries: BTreeMap::new(),
            valid: false,
        }
    }
}

impl<T: Numeric> ResultBundle<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate storage for `layout`
    ///
    /// Returns `Ok(false)` without touching storage if the bundle already
    /// holds exactly this layout. A different layout while allocated is an
    /// [`Error::InvalidState`]; call [`ResultBundle::reset`] first.
    pub fn allocate(&mut self, layout: &ResultLayout) -> Result<bool> {
        match &self.layout {
            Some(current) if current == layout => return Ok(false),
            Some(_) => {
                return Err(Error::InvalidState {
                    operation: "allocate a different result layout",
                    state: "allocated",
                })
            }
            None => {}
        }
        let mut entries = BTreeMap::new();
        for slot in layout.slots() {
            entries.insert(
                slot.code,
                Entry {
                    name: slot.name.clone(),
                    table: DenseTable::new(slot.rows, slot.cols)?,
                    populated: false,
                },
            );
        }
        self.entries = entries;
        self.layout = Some(layout.clone());
        self.valid = false;
        Ok(true)
    }

    pub fn is_allocated(&self) -> bool {
        self.layout.is_some()
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn layout(&self) -> Option<&ResultLayout> {
        self.layout.as_ref()
    }

    /// Writable table for `id`
    ///
    /// Marks the entry populated and the bundle invalid until the next seal.
    pub fn table_mut<K: BundleId>(&mut self, id: K) -> Result<&mut DenseTable<T>> {
        let entry = self
            .entries
            .get_mut(&id.code())
            .ok_or_else(|| Error::missing(id.name()))?;
        entry.populated = true;
        self.valid = false;
        Ok(&mut entry.table)
    }

    /// Output table for `id`
    ///
    /// Fails with [`Error::MissingArgument`] unless the bundle is valid and the
    /// entry was populated.
    pub fn get<K: BundleId>(&self, id: K) -> Result<&DenseTable<T>> {
        self.get_code(id.code()).ok_or_else(|| Error::missing(id.name()))
    }

    /// Output table by raw code
    pub fn get_code(&self, code: u32) -> Option<&DenseTable<T>> {
        if !self.valid {
            return None;
        }
        self.entries
            .get(&code)
            .filter(|e| e.populated)
            .map(|e| &e.table)
    }

    /// Single element of a 1x1 entry
    pub fn get_scalar<K: BundleId>(&self, id: K) -> Result<T> {
        let table = self.get(id)?;
        if table.shape() != (1, 1) {
            return Err(Error::type_mismatch(
                format!("1x1 table for {}", id.name()),
                format!("{}x{} table", table.rows(), table.cols()),
            ));
        }
        Ok(table.get(0, 0))
    }

    /// Mark the bundle valid once every declared entry was written
    pub fn seal(&mut self) -> Result<()> {
        if let Some(entry) = self.entries.values().find(|e| !e.populated) {
            self.valid = false;
            return Err(Error::missing(&entry.name));
        }
        if self.layout.is_none() {
            return Err(Error::InvalidState {
                operation: "seal results",
                state: "unallocated",
            });
        }
        self.valid = true;
        Ok(())
    }

    /// Hide the contents after a failed computation
    pub fn invalidate(&mut self) {
        self.valid = false;
        for entry in self.entries.values_mut() {
            entry.populated = false;
        }
    }

    /// Release the allocation
    pub fn reset(&mut self) {
        self.layout = None;
        self.entries.clear();
        self.valid = false;
    }

    /// (code, name, table) for every entry, in code order
    pub fn iter(&self) -> impl Iterator<Item = (u32, &str, &DenseTable<T>)> + '_ {
        self.entries.iter().map(|(code, e)| (*code, e.name.as_ref(), &e.table))
    }

    /// Entries in layout order with their populated flags
    pub(crate) fn raw_entries(&self) -> Vec<(&ResultSlot, bool, &DenseTable<T>)> {
        let Some(layout) = &self.layout else {
            return Vec::new();
        };
        layout
            .slots
            .iter()
            .filter_map(|slot| {
                self.entries
                    .get(&slot.code)
                    .map(|e| (slot, e.populated, &e.table))
            })
            .collect()
    }

    /// Rebuild an allocated bundle from decoded parts
    pub(crate) fn from_raw(
        valid: bool,
        parts: Vec<(ResultSlot, bool, DenseTable<T>)>,
    ) -> Result<Self> {
        let mut layout = ResultLayout::new();
        let mut entries = BTreeMap::new();
        for (slot, populated, table) in parts {
            if table.shape() != (slot.rows, slot.cols) {
                return Err(Error::CorruptStream(format!(
                    "result entry {} declared {}x{}, payload is {}x{}",
                    slot.code,
                    slot.rows,
                    slot.cols,
                    table.rows(),
                    table.cols()
                )));
            }
            if valid && !populated {
                return Err(Error::CorruptStream(format!(
                    "valid result bundle with unpopulated entry {}",
                    slot.code
                )));
            }
            let previous = entries.insert(
                slot.code,
                Entry {
                    name: slot.name.clone(),
                    table,
                    populated,
                },
            );
            if previous.is_some() {
                return Err(Error::CorruptStream(format!(
                    "duplicate result entry {}",
                    slot.code
                )));
            }
            layout.slots.push(slot);
        }
        Ok(Self {
            layout: Some(layout),
            entries,
            valid,
        })
    }
}
