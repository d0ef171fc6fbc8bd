//! Storage slots written by a parse.
//!
//! A [`Binding`] is a cheap, clonable handle to one slot. Every argument
//! spec holds one; when the caller keeps a clone the slot is effectively
//! externally owned and can be shared between specs, for instance a single
//! `--verbose` counter declared on every subcommand.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::list::TypedList;
use crate::tree::SchemaId;
use crate::value::{FromValue, Value, ValueKind};

/// Contents of a binding.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Slot {
    /// Nothing bound yet and no default.
    #[default]
    Unset,
    /// A single converted value (possibly the declared default).
    Value(Value),
    /// Accumulated values of a list argument.
    List(TypedList),
    /// Boolean flag state.
    Switch(bool),
    /// Occurrence counter of a count flag.
    Count(u64),
    /// Schema in which a capture flag fired.
    Capture(Option<SchemaId>),
}

impl Slot {
    pub(crate) fn shape(&self) -> SlotShape {
        match self {
            Self::Unset | Self::Value(_) => SlotShape::Value,
            Self::List(_) => SlotShape::List,
            Self::Switch(_) => SlotShape::Switch,
            Self::Count(_) => SlotShape::Count,
            Self::Capture(_) => SlotShape::Capture,
        }
    }
}

/// Structural shape of a slot, used by schema validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SlotShape {
    Value,
    List,
    Switch,
    Count,
    Capture,
}

impl SlotShape {
    pub(crate) fn name(self) -> &'static str {
        match self {
            Self::Value => "value",
            Self::List => "list",
            Self::Switch => "switch",
            Self::Count => "count",
            Self::Capture => "capture",
        }
    }
}

/// Shared handle to a storage slot.
///
/// # Examples
///
/// ```
/// use argwright_core::{Binding, Value};
///
/// let output = Binding::with_default("a.out");
/// let handle = output.clone();
/// handle.set(Value::from("b.out"));
/// assert_eq!(output.get::<String>().as_deref(), Some("b.out"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Binding {
    slot: Arc<Mutex<Slot>>,
}

impl Binding {
    /// Creates an unset value slot.
    pub fn new() -> Self {
        Self::from_slot(Slot::Unset)
    }

    /// Creates a value slot holding `default` until a token overwrites it.
    pub fn with_default(default: impl Into<Value>) -> Self {
        Self::from_slot(Slot::Value(default.into()))
    }

    /// Creates an empty list slot sized for `kind`.
    pub fn list(kind: ValueKind) -> Self {
        Self::from_slot(Slot::List(TypedList::of(kind)))
    }

    /// Creates an empty list slot with an explicit element byte size.
    pub fn list_with_item_size(item_size: usize) -> Self {
        Self::from_slot(Slot::List(TypedList::with_item_size(item_size)))
    }

    /// Creates a boolean flag slot, initially `false`.
    pub fn switch() -> Self {
        Self::from_slot(Slot::Switch(false))
    }

    /// Creates a counter slot, initially zero.
    pub fn counter() -> Self {
        Self::from_slot(Slot::Count(0))
    }

    /// Creates a capture slot, initially empty.
    pub fn capture() -> Self {
        Self::from_slot(Slot::Capture(None))
    }

    fn from_slot(slot: Slot) -> Self {
        Self {
            slot: Arc::new(Mutex::new(slot)),
        }
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns `true` if both handles refer to the same slot.
    pub fn same_slot(&self, other: &Binding) -> bool {
        Arc::ptr_eq(&self.slot, &other.slot)
    }

    /// Snapshot of the slot contents.
    pub fn slot(&self) -> Slot {
        self.lock().clone()
    }

    /// The single bound value, if any.
    pub fn value(&self) -> Option<Value> {
        match &*self.lock() {
            Slot::Value(v) => Some(v.clone()),
            _ => None,
        }
    }

    /// The single bound value converted to `T`.
    pub fn get<T: FromValue>(&self) -> Option<T> {
        match &*self.lock() {
            Slot::Value(v) => T::from_value(v),
            _ => None,
        }
    }

    /// Overwrites the slot with a single value.
    pub fn set(&self, value: impl Into<Value>) {
        *self.lock() = Slot::Value(value.into());
    }

    /// Snapshot of the bound list.
    pub fn list_snapshot(&self) -> Option<TypedList> {
        match &*self.lock() {
            Slot::List(list) => Some(list.clone()),
            _ => None,
        }
    }

    /// Elements of the bound list converted to `T`; empty if not a list.
    pub fn values<T: FromValue>(&self) -> Vec<T> {
        match &*self.lock() {
            Slot::List(list) => list.values(),
            _ => Vec::new(),
        }
    }

    /// Number of list elements; zero if not a list.
    pub fn len(&self) -> usize {
        match &*self.lock() {
            Slot::List(list) => list.count(),
            _ => 0,
        }
    }

    /// Returns `true` if the slot is not a list or the list is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Boolean flag state; `false` for other shapes.
    pub fn is_set(&self) -> bool {
        matches!(&*self.lock(), Slot::Switch(true))
    }

    /// Count flag occurrences; zero for other shapes.
    pub fn count(&self) -> u64 {
        match &*self.lock() {
            Slot::Count(n) => *n,
            _ => 0,
        }
    }

    /// Schema captured by a capture flag.
    pub fn captured(&self) -> Option<SchemaId> {
        match &*self.lock() {
            Slot::Capture(id) => *id,
            _ => None,
        }
    }

    /// Releases the bound list's storage; no-op for other shapes.
    pub fn release_list(&self) {
        if let Slot::List(list) = &mut *self.lock() {
            list.release();
        }
    }
}
