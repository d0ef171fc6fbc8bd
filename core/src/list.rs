//! Growable homogeneous list storage for list-valued arguments.

use crate::value::{FromValue, Value, ValueKind};

/// Capacity of a list after its first append.
pub const LIST_INIT_CAPACITY: usize = 8;

/// A typed, growable sequence bound to a list-valued argument.
///
/// The configured element byte size must equal the size implied by the
/// governing [`ValueKind`]; [`TypedList::push_checked`] verifies this before
/// anything is written. Capacity starts at [`LIST_INIT_CAPACITY`] and doubles,
/// it never shrinks until [`TypedList::release`].
///
/// # Examples
///
/// ```
/// use argwright_core::{TypedList, Value, ValueKind};
///
/// let mut list = TypedList::of(ValueKind::Int32);
/// assert!(list.push_checked(ValueKind::Int32, Value::Int32(4)));
/// assert_eq!(list.count(), 1);
/// assert_eq!(list.capacity(), 8);
/// assert_eq!(list.values::<i32>(), vec![4]);
///
/// list.release();
/// assert_eq!((list.count(), list.capacity()), (0, 0));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct TypedList {
    items: Vec<Value>,
    item_size: usize,
    capacity: usize,
}

impl TypedList {
    /// Creates an empty list sized for `kind`.
    ///
    /// Kinds without a fixed size get the pointer size, matching a list of
    /// string-like custom values.
    pub fn of(kind: ValueKind) -> Self {
        Self::with_item_size(kind.item_size().unwrap_or(std::mem::size_of::<usize>()))
    }

    /// Creates an empty list with an explicit element byte size.
    pub fn with_item_size(item_size: usize) -> Self {
        Self {
            items: Vec::new(),
            item_size,
            capacity: 0,
        }
    }

    /// Configured element byte size.
    pub fn item_size(&self) -> usize {
        self.item_size
    }

    /// Number of stored elements.
    pub fn count(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if the list has no elements.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Logical capacity (0, 8, 16, 32, ...).
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns `true` if this list may hold elements of `kind`.
    pub fn fits(&self, kind: ValueKind) -> bool {
        kind.item_size().is_none_or(|size| size == self.item_size)
    }

    /// Appends `value` if the list's element size fits `kind`.
    ///
    /// Returns `false` without touching the list on a size mismatch.
    pub fn push_checked(&mut self, kind: ValueKind, value: Value) -> bool {
        if !self.fits(kind) {
            return false;
        }
        self.push(value);
        true
    }

    fn push(&mut self, value: Value) {
        if self.items.len() == self.capacity {
            let new_capacity = if self.capacity == 0 {
                LIST_INIT_CAPACITY
            } else {
                self.capacity * 2
            };
            self.items.reserve_exact(new_capacity - self.items.len());
            self.capacity = new_capacity;
        }
        self.items.push(value);
    }

    /// Element at `index`.
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.items.get(index)
    }

    /// All elements in insertion order.
    pub fn items(&self) -> &[Value] {
        &self.items
    }

    /// Iterates over the elements.
    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.items.iter()
    }

    /// Elements converted to `T`, skipping any that do not convert.
    pub fn values<T: FromValue>(&self) -> Vec<T> {
        self.items.iter().filter_map(T::from_value).collect()
    }

    /// Releases the storage and resets count and capacity to zero.
    ///
    /// Safe to call repeatedly. Strings duplicated into a schema's ledger are
    /// not affected.
    pub fn release(&mut self) {
        self.items = Vec::new();
        self.capacity = 0;
    }
}

impl<'a> IntoIterator for &'a TypedList {
    type Item = &'a Value;
    type IntoIter = std::slice::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
