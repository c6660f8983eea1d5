//! Attribute database implementation for ATT server
//!
//! Handles index a dense table, so lookups by handle are O(1). A secondary index maps
//! each attribute type to its handles in ascending order, split by short and long UUIDs,
//! which keeps type-filtered range queries away from a full table scan.

use super::constants::*;
use super::error::{AttError, AttResult};
use super::types::CharacteristicProperties;
use crate::uuid::Uuid;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// An attribute in the database
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Attribute handle
    pub handle: u16,
    /// Attribute type (UUID)
    pub type_: Uuid,
    /// Attribute value
    pub value: Vec<u8>,
    /// Last handle of the group this attribute opens, `handle` for plain attributes
    pub end_handle: u16,
    /// Access mask
    pub permissions: CharacteristicProperties,
}

impl Attribute {
    /// Create a new attribute that is not a group
    pub fn new(
        handle: u16,
        type_: Uuid,
        value: Vec<u8>,
        permissions: CharacteristicProperties,
    ) -> Self {
        Self {
            handle,
            type_,
            value,
            end_handle: handle,
            permissions,
        }
    }

    /// Marks this attribute as opening a group that ends at `end_handle`
    pub fn with_end_handle(mut self, end_handle: u16) -> Self {
        self.end_handle = end_handle;
        self
    }

    /// Fails with `ReadNotPermitted` unless the Read bit is set
    pub fn check_read(&self) -> AttResult<()> {
        if self.permissions.can_read() {
            Ok(())
        } else {
            Err(AttError::ReadNotPermitted(self.handle))
        }
    }
}

/// Value-changed observer: receives the handle and the freshly stored value
pub type ValueListener = Arc<dyn Fn(u16, &[u8]) + Send + Sync>;

/// Registration token returned by [`AttributeDatabase::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

#[derive(Default)]
struct TypeIndex {
    short: HashMap<u16, Vec<u16>>,
    long: HashMap<Uuid, Vec<u16>>,
}

impl TypeIndex {
    fn insert(&mut self, type_: Uuid, handle: u16) {
        let handles = match type_.as_u16() {
            Some(short) => self.short.entry(short).or_default(),
            None => self.long.entry(type_).or_default(),
        };
        if let Err(pos) = handles.binary_search(&handle) {
            handles.insert(pos, handle);
        }
    }

    fn handles(&self, type_: &Uuid) -> &[u16] {
        let handles = match type_.as_u16() {
            Some(short) => self.short.get(&short),
            None => self.long.get(type_),
        };
        handles.map(Vec::as_slice).unwrap_or(&[])
    }
}

#[derive(Default)]
struct Tables {
    /// Slot 0 is never occupied
    slots: Vec<Option<Attribute>>,
    by_type: TypeIndex,
    len: usize,
}

impl Tables {
    fn get(&self, handle: u16) -> Option<&Attribute> {
        self.slots.get(handle as usize).and_then(Option::as_ref)
    }
}

/// Attribute database
#[derive(Default)]
pub struct AttributeDatabase {
    tables: RwLock<Tables>,
    listeners: Mutex<HashMap<u16, Vec<(ListenerId, ValueListener)>>>,
    next_listener_id: AtomicU64,
}

impl AttributeDatabase {
    /// Create a new empty attribute database
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an attribute at `handle`
    pub fn allocate(
        &self,
        handle: u16,
        type_: Uuid,
        value: Vec<u8>,
        end_handle: u16,
        permissions: CharacteristicProperties,
    ) -> AttResult<()> {
        self.insert(Attribute::new(handle, type_, value, permissions).with_end_handle(end_handle))
    }

    /// Add a fully built attribute
    pub fn insert(&self, attribute: Attribute) -> AttResult<()> {
        let handle = attribute.handle;
        if handle == 0 {
            return Err(AttError::InvalidHandle(handle));
        }
        if attribute.end_handle < handle {
            return Err(AttError::InvalidParameter(format!(
                "end handle 0x{:04x} precedes handle 0x{:04x}",
                attribute.end_handle, handle
            )));
        }

        let mut tables = self.tables.write();
        if tables.get(handle).is_some() {
            return Err(AttError::HandleInUse(handle));
        }

        let index = handle as usize;
        if tables.slots.len() <= index {
            tables.slots.resize(index + 1, None);
        }
        tables.by_type.insert(attribute.type_, handle);
        tables.slots[index] = Some(attribute);
        tables.len += 1;

        Ok(())
    }

    /// Look up an attribute by handle
    pub fn get(&self, handle: u16) -> Option<Attribute> {
        self.tables.read().get(handle).cloned()
    }

    /// Number of occupied handles
    pub fn len(&self) -> usize {
        self.tables.read().len
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of every attribute in handle order
    pub fn attributes(&self) -> Vec<Attribute> {
        self.tables.read().slots.iter().flatten().cloned().collect()
    }

    /// All attributes with `start <= handle <= end`, optionally restricted to a type
    /// and/or an exact value, in ascending handle order.
    pub fn find_range(
        &self,
        start: u16,
        end: u16,
        type_: Option<&Uuid>,
        value: Option<&[u8]>,
    ) -> Vec<Attribute> {
        if start == 0 || start > end {
            return Vec::new();
        }

        let tables = self.tables.read();
        let value_matches = |attr: &Attribute| value.map_or(true, |v| attr.value == v);

        match type_ {
            Some(type_) => {
                let handles = tables.by_type.handles(type_);
                let first = handles.partition_point(|&h| h < start);
                handles[first..]
                    .iter()
                    .take_while(|&&h| h <= end)
                    .filter_map(|&h| tables.get(h))
                    .filter(|attr| value_matches(attr))
                    .cloned()
                    .collect()
            }
            None => {
                let last = (end as usize).min(tables.slots.len().saturating_sub(1));
                let first = start as usize;
                if first > last {
                    return Vec::new();
                }
                tables.slots[first..=last]
                    .iter()
                    .flatten()
                    .filter(|attr| value_matches(attr))
                    .cloned()
                    .collect()
            }
        }
    }

    /// Replace the value stored at `handle` and notify its observers.
    ///
    /// Observers run after the table lock is released, so they may read the database.
    pub fn write_value(&self, handle: u16, value: Vec<u8>) -> AttResult<()> {
        {
            let mut tables = self.tables.write();
            let slot = tables
                .slots
                .get_mut(handle as usize)
                .and_then(Option::as_mut)
                .ok_or(AttError::InvalidHandle(handle))?;
            slot.value = value.clone();
        }

        let listeners: Vec<ValueListener> = self
            .listeners
            .lock()
            .get(&handle)
            .map(|entries| entries.iter().map(|(_, l)| Arc::clone(l)).collect())
            .unwrap_or_default();

        for listener in listeners {
            listener(handle, &value);
        }

        Ok(())
    }

    /// Register an observer for value changes on `handle`
    pub fn subscribe(&self, handle: u16, listener: ValueListener) -> AttResult<ListenerId> {
        if self.tables.read().get(handle).is_none() {
            return Err(AttError::InvalidHandle(handle));
        }

        let id = ListenerId(self.next_listener_id.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .lock()
            .entry(handle)
            .or_default()
            .push((id, listener));
        Ok(id)
    }

    /// Remove an observer; returns false if it was not registered
    pub fn unsubscribe(&self, handle: u16, id: ListenerId) -> bool {
        let mut listeners = self.listeners.lock();
        let Some(entries) = listeners.get_mut(&handle) else {
            return false;
        };
        let before = entries.len();
        entries.retain(|(existing, _)| *existing != id);
        let removed = entries.len() != before;
        if entries.is_empty() {
            listeners.remove(&handle);
        }
        removed
    }

    /// Number of observers registered on `handle`
    pub fn listener_count(&self, handle: u16) -> usize {
        self.listeners.lock().get(&handle).map_or(0, Vec::len)
    }

    /// Value handle of the characteristic that owns the descriptor at `descriptor_handle`.
    ///
    /// Walks backwards to the nearest characteristic declaration, stopping at a service
    /// boundary.
    pub fn characteristic_value_handle_for(&self, descriptor_handle: u16) -> Option<u16> {
        let tables = self.tables.read();
        let characteristic = Uuid::from_u16(CHARACTERISTIC_UUID);
        let primary = Uuid::from_u16(PRIMARY_SERVICE_UUID);
        let secondary = Uuid::from_u16(SECONDARY_SERVICE_UUID);

        for handle in (ATT_HANDLE_MIN..descriptor_handle).rev() {
            let Some(attr) = tables.get(handle) else {
                continue;
            };
            if attr.type_ == primary || attr.type_ == secondary {
                return None;
            }
            if attr.type_ == characteristic {
                if attr.value.len() < 3 {
                    return None;
                }
                let value_handle = u16::from_le_bytes([attr.value[1], attr.value[2]]);
                return (value_handle < descriptor_handle).then_some(value_handle);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn read_only() -> CharacteristicProperties {
        CharacteristicProperties::READ
    }

    fn sample_db() -> AttributeDatabase {
        let db = AttributeDatabase::new();
        let custom = Uuid::of("6e400001-b5a3-f393-e0a9-e50e24dcca9e").unwrap();
        let service = Uuid::from_u16(PRIMARY_SERVICE_UUID);
        let declaration = Uuid::from_u16(CHARACTERISTIC_UUID);
        let name_decl = vec![0x02, 0x03, 0x00, 0x00, 0x2A];

        db.allocate(1, service, vec![0x00, 0x18], 3, read_only()).unwrap();
        db.allocate(2, declaration, name_decl, 2, read_only()).unwrap();
        db.allocate(3, Uuid::from_u16(0x2A00), b"dev".to_vec(), 3, read_only())
            .unwrap();
        db.allocate(4, service, custom.to_bytes(), 6, read_only()).unwrap();
        db.allocate(5, declaration, vec![0x12, 0x06, 0x00], 5, read_only())
            .unwrap();
        db.allocate(6, custom, vec![1], 6, read_only()).unwrap();
        db.allocate(7, Uuid::from_u16(CLIENT_CHAR_CONFIG_UUID), vec![0, 0], 7, read_only())
            .unwrap();
        db
    }

    #[test]
    fn test_allocate_rejects_occupied_handle() {
        let db = sample_db();
        let err = db
            .allocate(3, Uuid::from_u16(0x2A01), vec![], 3, read_only())
            .unwrap_err();
        assert!(matches!(err, AttError::HandleInUse(3)));
        assert!(matches!(
            db.allocate(0, Uuid::from_u16(0x2A01), vec![], 0, read_only()),
            Err(AttError::InvalidHandle(0))
        ));
        assert_eq!(db.len(), 7);
    }

    #[test]
    fn test_get() {
        let db = sample_db();
        assert_eq!(db.get(3).unwrap().value, b"dev".to_vec());
        assert!(db.get(8).is_none());
        assert!(db.get(0).is_none());
    }

    #[test]
    fn test_find_range_by_type_is_inclusive_and_ordered() {
        let db = sample_db();
        let services = db.find_range(1, 4, Some(&Uuid::from_u16(PRIMARY_SERVICE_UUID)), None);
        let handles: Vec<u16> = services.iter().map(|a| a.handle).collect();
        assert_eq!(handles, vec![1, 4]);
        assert_eq!(services[0].end_handle, 3);
    }

    #[test]
    fn test_find_range_long_type_and_value() {
        let db = sample_db();
        let custom = Uuid::of("6e400001-b5a3-f393-e0a9-e50e24dcca9e").unwrap();
        assert_eq!(db.find_range(1, 0xFFFF, Some(&custom), None).len(), 1);

        let by_value = db.find_range(
            1,
            0xFFFF,
            Some(&Uuid::from_u16(PRIMARY_SERVICE_UUID)),
            Some(&[0x00, 0x18]),
        );
        assert_eq!(by_value.len(), 1);
        assert_eq!(by_value[0].handle, 1);
    }

    #[test]
    fn test_find_range_without_type() {
        let db = sample_db();
        let all = db.find_range(2, 0xFFFF, None, None);
        assert_eq!(all.first().map(|a| a.handle), Some(2));
        assert_eq!(all.len(), 6);
        assert!(db.find_range(0, 5, None, None).is_empty());
        assert!(db.find_range(5, 4, None, None).is_empty());
        assert!(db.find_range(100, 200, None, None).is_empty());
    }

    #[test]
    fn test_write_value_notifies_listeners() {
        let db = sample_db();
        let hits = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&hits);
        let id = db
            .subscribe(
                6,
                Arc::new(move |handle, value| {
                    assert_eq!(handle, 6);
                    assert_eq!(value, &[9, 9]);
                    seen.fetch_add(1, Ordering::SeqCst);
                }),
            )
            .unwrap();

        db.write_value(6, vec![9, 9]).unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(db.get(6).unwrap().value, vec![9, 9]);

        assert!(db.unsubscribe(6, id));
        assert!(!db.unsubscribe(6, id));
        db.write_value(6, vec![9, 9]).unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        assert!(matches!(db.write_value(40, vec![]), Err(AttError::InvalidHandle(40))));
        assert!(db.subscribe(40, Arc::new(|_, _| {})).is_err());
    }

    #[test]
    fn test_characteristic_value_handle_for_descriptor() {
        let db = sample_db();
        assert_eq!(db.characteristic_value_handle_for(7), Some(6));
        assert_eq!(db.characteristic_value_handle_for(4), Some(3));
        // Hits the service declaration first
        assert_eq!(db.characteristic_value_handle_for(2), None);
    }
}
