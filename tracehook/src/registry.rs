//! The classified tracer registry.
//!
//! Records live in six insertion-ordered collections, one per
//! (granularity, scope) pair. A record never moves once appended, so an id
//! maps to a fixed `(collection, index)` location for the life of the
//! registry.

use log::{debug, trace};
use parking_lot::Mutex;
use tracehook_interfaces::{ExecutionContext, TraceCallback, TraceOutput};

use crate::config::truncate_label;
use crate::default_callback::default_callback;
use crate::listing::Listing;
use crate::record::{
    Collection, Granularity, Scope, Tracer, TracerId, TracerRecord, TracerSummary,
};
use crate::{RegistryConfig, TracerError};

#[derive(Debug, Clone, Copy)]
struct Location {
    slot: usize,
    index: usize,
}

#[derive(Default)]
struct State {
    collections: [Vec<TracerRecord>; Collection::COUNT],
    /// `locations[id - 1]` is where tracer `id` lives.
    locations: Vec<Location>,
    last_id: u32,
    last_error: Option<TracerError>,
}

impl State {
    fn fail<T>(&mut self, err: TracerError) -> Result<T, TracerError> {
        self.last_error = Some(err);
        Err(err)
    }

    fn location(&self, id: TracerId) -> Option<Location> {
        let index = usize::try_from(id.get()).ok()?.checked_sub(1)?;
        self.locations.get(index).copied()
    }

    fn record(&self, id: TracerId) -> Option<&TracerRecord> {
        let loc = self.location(id)?;
        self.collections[loc.slot].get(loc.index)
    }

    fn record_mut(&mut self, id: TracerId) -> Option<&mut TracerRecord> {
        let loc = self.location(id)?;
        self.collections[loc.slot].get_mut(loc.index)
    }

    fn enabled_in(&self, collection: Collection) -> impl Iterator<Item = &TracerRecord> + '_ {
        self.collections[collection.slot()].iter().filter(|rec| rec.enabled)
    }
}

/// Bookkeeping for every instruction and block tracer.
///
/// All state sits behind one lock. The lock is never held while a callback
/// runs, so callbacks may register or toggle tracers themselves.
pub struct Registry {
    config: RegistryConfig,
    default_callback: TraceCallback,
    state: Mutex<State>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::with_config(RegistryConfig::default())
    }
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            default_callback: default_callback(config.default_disassembly_count),
            config,
            state: Mutex::new(State::default()),
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Registers a tracer from a raw granularity code.
    ///
    /// A missing callback is replaced by the default one. The new tracer
    /// starts disabled. An unknown granularity fails without using up an id.
    pub fn register(
        &self,
        address_space_id: u64,
        label: &str,
        is_kernel: bool,
        granularity: u32,
        callback: Option<TraceCallback>,
    ) -> Result<TracerId, TracerError> {
        let mut state = self.state.lock();
        let granularity = match Granularity::try_from(granularity) {
            Ok(granularity) => granularity,
            Err(err) => return state.fail(err),
        };

        let (callback, is_default_callback) = match callback {
            Some(cb) => (cb, false),
            None => (self.default_callback.clone(), true),
        };

        state.last_id += 1;
        let id = TracerId::from_raw(state.last_id);
        let collection = Collection::classify(address_space_id, is_kernel, granularity);
        let slot = collection.slot();
        let index = state.collections[slot].len();

        state.collections[slot].push(TracerRecord {
            id,
            label: truncate_label(label, self.config.max_label_len),
            address_space_id,
            is_kernel,
            granularity,
            enabled: false,
            callback,
            is_default_callback,
        });
        state.locations.push(Location { slot, index });

        debug!(
            "added {:?} tracer {} ({:?}, cr3 {:#x})",
            granularity, id, collection.scope, address_space_id
        );
        Ok(id)
    }

    /// Registers a per-instruction tracer.
    pub fn add_inst_tracer(
        &self,
        address_space_id: u64,
        label: &str,
        is_kernel: bool,
        callback: Option<TraceCallback>,
    ) -> Result<TracerId, TracerError> {
        self.register(
            address_space_id,
            label,
            is_kernel,
            Granularity::Instruction.code(),
            callback,
        )
    }

    /// Registers a per-block tracer.
    pub fn add_block_tracer(
        &self,
        address_space_id: u64,
        label: &str,
        is_kernel: bool,
        callback: Option<TraceCallback>,
    ) -> Result<TracerId, TracerError> {
        self.register(
            address_space_id,
            label,
            is_kernel,
            Granularity::CodeBlock.code(),
            callback,
        )
    }

    pub fn enable(&self, id: TracerId) -> Result<(), TracerError> {
        self.set_enabled(id, true)
    }

    pub fn disable(&self, id: TracerId) -> Result<(), TracerError> {
        self.set_enabled(id, false)
    }

    fn set_enabled(&self, id: TracerId, enabled: bool) -> Result<(), TracerError> {
        let mut state = self.state.lock();
        match state.record_mut(id) {
            Some(rec) => {
                rec.enabled = enabled;
                trace!("tracer {id} enabled={enabled}");
                Ok(())
            }
            None => state.fail(TracerError::InvalidId),
        }
    }

    /// Current enabled flag of `id`. Does not touch the error slot.
    pub fn is_enabled(&self, id: TracerId) -> Result<bool, TracerError> {
        self.state
            .lock()
            .record(id)
            .map(|rec| rec.enabled)
            .ok_or(TracerError::InvalidId)
    }

    pub fn get(&self, id: TracerId) -> Option<TracerSummary> {
        self.state.lock().record(id).map(TracerRecord::summary)
    }

    pub fn len(&self) -> usize {
        self.state.lock().locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of every tracer: instruction collections first, then block
    /// collections, each as process, universal user, universal kernel.
    pub fn list_all(&self) -> impl Iterator<Item = TracerSummary> {
        let state = self.state.lock();
        let summaries: Vec<_> = Collection::LISTING_ORDER
            .iter()
            .flat_map(|c| state.collections[c.slot()].iter().map(TracerRecord::summary))
            .collect();
        summaries.into_iter()
    }

    /// Snapshot of a single collection in insertion order.
    pub fn collection(&self, collection: Collection) -> Vec<TracerSummary> {
        self.state.lock().collections[collection.slot()]
            .iter()
            .map(TracerRecord::summary)
            .collect()
    }

    /// Human readable dump of every tracer.
    pub fn listing(&self) -> Listing {
        Listing::new(self.list_all().collect())
    }

    /// Enabled tracers that fire for an event of `granularity` in the given
    /// address space and privilege level.
    ///
    /// Process tracers bound to `address_space_id` come first, then the
    /// universal tracers for the current mode.
    pub fn matching(
        &self,
        granularity: Granularity,
        address_space_id: u64,
        is_kernel_mode: bool,
    ) -> Vec<Tracer> {
        let state = self.state.lock();
        let universal = if is_kernel_mode {
            Scope::UniversalKernel
        } else {
            Scope::UniversalUser
        };

        let process = state
            .enabled_in(Collection::new(granularity, Scope::Process))
            .filter(|rec| rec.address_space_id == address_space_id);
        let universal = state.enabled_in(Collection::new(granularity, universal));

        process
            .chain(universal)
            .map(|rec| Tracer {
                id: rec.id,
                callback: rec.callback.clone(),
            })
            .collect()
    }

    /// Runs every matching tracer for one trace event and collects what the
    /// callbacks returned.
    pub fn dispatch(
        &self,
        ctx: &mut dyn ExecutionContext,
        start: u64,
        end: u64,
        granularity: Granularity,
    ) -> Vec<(TracerId, TraceOutput)> {
        let tracers = self.matching(granularity, ctx.address_space_id(), ctx.is_kernel_mode());
        let mut outputs = Vec::with_capacity(tracers.len());
        for tracer in tracers {
            outputs.push((tracer.id, (tracer.callback)(ctx, start, end)));
        }
        outputs
    }

    /// The most recent failure, if any call has failed yet.
    pub fn last_error(&self) -> Option<TracerError> {
        self.state.lock().last_error
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracehook_interfaces::callback;

    fn noop() -> TraceCallback {
        callback(|_, _, _| None)
    }

    #[test]
    fn ids_start_at_one_and_increase() {
        let registry = Registry::new();
        let a = registry.add_inst_tracer(0, "a", false, None).unwrap();
        let b = registry.add_block_tracer(0x1000, "b", true, None).unwrap();
        let c = registry.add_inst_tracer(0, "c", true, Some(noop())).unwrap();
        assert_eq!(a.get(), 1);
        assert!(a < b && b < c);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn bad_granularity_consumes_no_id() {
        let registry = Registry::new();
        assert_eq!(
            registry.register(0, "bad", false, 7, None),
            Err(TracerError::InvalidGranularity)
        );
        assert!(registry.is_empty());
        assert_eq!(registry.last_error(), Some(TracerError::InvalidGranularity));

        let id = registry.add_inst_tracer(0, "good", false, None).unwrap();
        assert_eq!(id.get(), 1);
    }

    #[test]
    fn locations_stay_valid_across_collections() {
        let registry = Registry::new();
        let ids: Vec<_> = (0..6u64)
            .map(|i| {
                registry
                    .register(i % 2, "t", i % 3 == 0, (i % 2) as u32, None)
                    .unwrap()
            })
            .collect();
        for id in ids {
            assert_eq!(registry.get(id).unwrap().id, id);
        }
    }

    #[test]
    fn label_is_truncated_to_configured_bound() {
        let registry = Registry::with_config(RegistryConfig::new().with_max_label_len(4));
        let id = registry.add_inst_tracer(0, "overlong", false, None).unwrap();
        assert_eq!(registry.get(id).unwrap().label, "over");
    }

    #[test]
    fn default_callback_is_shared() {
        let registry = Registry::new();
        let a = registry.add_inst_tracer(0, "a", false, None).unwrap();
        let b = registry.add_block_tracer(0, "b", false, None).unwrap();
        let c = registry.add_block_tracer(0, "c", false, Some(noop())).unwrap();
        let (a, b, c) = (
            registry.get(a).unwrap(),
            registry.get(b).unwrap(),
            registry.get(c).unwrap(),
        );
        assert!(a.is_default_callback && b.is_default_callback);
        assert!(!c.is_default_callback);
        assert_eq!(a.callback_addr, b.callback_addr);
        assert_ne!(a.callback_addr, c.callback_addr);
    }

    #[test]
    fn is_enabled_leaves_error_slot_alone() {
        let registry = Registry::new();
        assert_eq!(
            registry.is_enabled(TracerId::from_raw(3)),
            Err(TracerError::InvalidId)
        );
        assert_eq!(registry.last_error(), None);
    }

    #[test]
    fn zero_id_is_never_valid() {
        let registry = Registry::new();
        registry.add_inst_tracer(0, "a", false, None).unwrap();
        assert_eq!(
            registry.enable(TracerId::from_raw(0)),
            Err(TracerError::InvalidId)
        );
    }
}
