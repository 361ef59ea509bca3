//! Fixed-size registry of plugin slots.
//!
//! The relay thread walks the slots every cycle while plugins are added and
//! removed from other threads. Slots are `ArcSwapOption`s: a reader either
//! sees a fully constructed entry or nothing, and an entry it has loaded
//! stays alive until the reader drops it.

use crate::instance::PluginInstance;
use crate::remote::RemoteLink;
use arc_swap::ArcSwapOption;
use parking_lot::Mutex;
use std::sync::Arc;

pub const MAX_PLUGINS: usize = 99;

struct SlotEntry {
    plugin: Arc<dyn PluginInstance>,
}

pub struct PluginRegistry {
    slots: Box<[ArcSwapOption<SlotEntry>]>,
    /// Serializes writers; readers never take it.
    write_lock: Mutex<()>,
    meter_listener: RemoteLink,
}

impl PluginRegistry {
    pub fn new(max_plugins: usize) -> Self {
        Self {
            slots: (0..max_plugins).map(|_| ArcSwapOption::empty()).collect(),
            write_lock: Mutex::new(()),
            meter_listener: RemoteLink::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Place `plugin` in the first empty slot. Returns `None` when full.
    pub fn add(&self, plugin: Arc<dyn PluginInstance>) -> Option<usize> {
        let _guard = self.write_lock.lock();
        let index = self.slots.iter().position(|slot| slot.load().is_none())?;
        self.slots[index].store(Some(Arc::new(SlotEntry { plugin })));
        tracing::debug!("Plugin added to slot {}", index);
        Some(index)
    }

    pub fn remove(&self, index: usize) -> Option<Arc<dyn PluginInstance>> {
        let _guard = self.write_lock.lock();
        let entry = self.slots.get(index)?.swap(None)?;
        tracing::debug!("Plugin removed from slot {}", index);
        Some(Arc::clone(&entry.plugin))
    }

    /// Plugin in `index`, skipping empty slots and entries with a negative id.
    pub fn get(&self, index: usize) -> Option<Arc<dyn PluginInstance>> {
        let entry = self.slots.get(index)?.load_full()?;
        (entry.plugin.id() >= 0).then(|| Arc::clone(&entry.plugin))
    }

    pub fn find(&self, plugin_id: i32) -> Option<Arc<dyn PluginInstance>> {
        if plugin_id < 0 {
            return None;
        }
        self.occupied()
            .find(|(_, plugin)| plugin.id() == plugin_id)
            .map(|(_, plugin)| plugin)
    }

    /// Occupied slots in index order.
    pub fn occupied(&self) -> impl Iterator<Item = (usize, Arc<dyn PluginInstance>)> + '_ {
        (0..self.slots.len()).filter_map(move |index| self.get(index).map(|p| (index, p)))
    }

    pub fn len(&self) -> usize {
        self.occupied().count()
    }

    pub fn is_empty(&self) -> bool {
        self.occupied().next().is_none()
    }

    /// Global listener receiving peak meters for every plugin.
    pub fn meter_listener(&self) -> &RemoteLink {
        &self.meter_listener
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::new(MAX_PLUGINS)
    }
}
