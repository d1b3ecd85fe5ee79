//! Specialized collection types

use slotmap::new_key_type;

pub use slotmap::SlotMap;

new_key_type! {
    /// Stable id of one pooled instance
    ///
    /// This is the numeric pool key: lookups go straight to the slot
    /// instead of scanning the owning pool.
    pub struct InstanceId;

    /// Id of one asynchronous scene operation issued by a backend
    pub struct OperationId;
}

/// Handle-based map using slot map for stable references
pub type HandleMap<K, T> = SlotMap<K, T>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_removed_ids_do_not_alias_new_entries() {
        let mut map: HandleMap<InstanceId, &str> = HandleMap::with_key();
        let first = map.insert("first");
        map.remove(first);
        let second = map.insert("second");

        assert_ne!(first, second);
        assert!(map.get(first).is_none());
        assert_eq!(map.get(second), Some(&"second"));
    }
}
