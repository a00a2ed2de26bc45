//! Handle/state table
//!
//! Maps each (device handle, technology) pair to its lifecycle state, the
//! last narrowed payload accepted for it, and the transition currently in
//! flight, if any. The table does no locking of its own; the facade owns it
//! behind a single mutex and never holds that mutex across a driver call.

use netif_core::{DeviceHandle, InterfaceState, NetifError, NetworkConfig, Result, Technology};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::watch;

/// Outcome of an in-flight transition as seen by callers that joined it
pub(crate) type Outcome = Option<Result<()>>;

/// A driver call currently running for a pair
#[derive(Debug)]
pub(crate) struct InFlight {
    pub(crate) target: InterfaceState,
    pub(crate) outcome: watch::Receiver<Outcome>,
}

#[derive(Debug)]
struct Entry {
    state: InterfaceState,
    config: NetworkConfig,
    in_flight: Option<InFlight>,
}

type Key = (DeviceHandle, Technology);

/// Lifecycle state for every attached (handle, technology) pair
#[derive(Debug)]
pub struct StateTable {
    generation: u64,
    entries: HashMap<Key, Entry>,
}

impl StateTable {
    /// Create an empty table.
    ///
    /// `generation` distinguishes this table from earlier ones so that a
    /// driver call started before a deinit cannot commit into a later table.
    pub fn new(generation: u64) -> Self {
        Self {
            generation,
            entries: HashMap::new(),
        }
    }

    /// Generation this table was created with
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Number of attached pairs
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no pair is attached
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// State of a pair, or `None` if it has no entry
    pub fn lookup(&self, handle: DeviceHandle, technology: Technology) -> Option<InterfaceState> {
        self.entries
            .get(&(handle, technology))
            .map(|entry| entry.state)
    }

    /// Narrowed payload last accepted for a pair
    pub fn config(&self, handle: DeviceHandle, technology: Technology) -> Option<&NetworkConfig> {
        self.entries
            .get(&(handle, technology))
            .map(|entry| &entry.config)
    }

    /// Create a `ConfiguredDown` entry: the `Absent -> ConfiguredDown` edge.
    ///
    /// # Errors
    ///
    /// `AlreadyAttached` if the pair has an entry.
    pub fn insert(
        &mut self,
        handle: DeviceHandle,
        technology: Technology,
        config: NetworkConfig,
    ) -> Result<()> {
        let key = (handle, technology);
        if self.entries.contains_key(&key) {
            return Err(NetifError::AlreadyAttached { handle, technology });
        }
        self.entries.insert(
            key,
            Entry {
                state: InterfaceState::ConfiguredDown,
                config,
                in_flight: None,
            },
        );
        Ok(())
    }

    /// Move a pair to `to`.
    ///
    /// Requesting the state the pair is already in succeeds without change.
    /// `ConfiguredDown -> Absent` removes the entry. Entries are only created
    /// through [`StateTable::insert`], which carries the payload.
    ///
    /// # Errors
    ///
    /// - `NotAttached` if the pair has no entry and `to` is not `Absent`
    /// - `InvalidTransition` for any other request that is not a lifecycle
    ///   edge
    pub fn transition(
        &mut self,
        handle: DeviceHandle,
        technology: Technology,
        to: InterfaceState,
    ) -> Result<()> {
        let key = (handle, technology);
        let from = self.lookup(handle, technology).unwrap_or_default();
        if from == to {
            return Ok(());
        }
        if from == InterfaceState::Absent {
            return Err(NetifError::NotAttached { handle, technology });
        }
        if !from.can_transition_to(to) {
            return Err(NetifError::InvalidTransition { from, to });
        }

        if to == InterfaceState::Absent {
            self.entries.remove(&key);
        } else if let Some(entry) = self.entries.get_mut(&key) {
            entry.state = to;
        }
        Ok(())
    }

    /// Replace the payload remembered for a pair
    pub(crate) fn set_config(
        &mut self,
        handle: DeviceHandle,
        technology: Technology,
        config: NetworkConfig,
    ) {
        if let Some(entry) = self.entries.get_mut(&(handle, technology)) {
            entry.config = config;
        }
    }

    /// Drop an entry regardless of state
    pub(crate) fn remove(&mut self, handle: DeviceHandle, technology: Technology) {
        self.entries.remove(&(handle, technology));
    }

    pub(crate) fn in_flight(
        &self,
        handle: DeviceHandle,
        technology: Technology,
    ) -> Option<&InFlight> {
        self.entries
            .get(&(handle, technology))
            .and_then(|entry| entry.in_flight.as_ref())
    }

    pub(crate) fn set_in_flight(
        &mut self,
        handle: DeviceHandle,
        technology: Technology,
        in_flight: InFlight,
    ) {
        if let Some(entry) = self.entries.get_mut(&(handle, technology)) {
            entry.in_flight = Some(in_flight);
        }
    }

    pub(crate) fn clear_in_flight(&mut self, handle: DeviceHandle, technology: Technology) {
        if let Some(entry) = self.entries.get_mut(&(handle, technology)) {
            entry.in_flight = None;
        }
    }

    /// Point-in-time copy of every entry, ordered by handle then technology
    pub fn snapshot(&self) -> TableSnapshot {
        let mut entries: Vec<_> = self
            .entries
            .iter()
            .map(|(&(handle, technology), entry)| EntrySnapshot {
                handle,
                technology,
                state: entry.state,
                in_flight: entry.in_flight.as_ref().map(|in_flight| in_flight.target),
            })
            .collect();
        entries.sort_by_key(|entry| (entry.handle, entry.technology));
        TableSnapshot { entries }
    }
}

/// Observable copy of one table entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntrySnapshot {
    /// Device handle
    pub handle: DeviceHandle,
    /// Technology
    pub technology: Technology,
    /// Committed state
    pub state: InterfaceState,
    /// Target of the transition in flight, if any
    pub in_flight: Option<InterfaceState>,
}

/// Observable copy of the whole table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSnapshot {
    /// Entries ordered by handle then technology
    pub entries: Vec<EntrySnapshot>,
}

impl TableSnapshot {
    /// Whether the table holds no entry
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries belonging to one handle
    pub fn for_handle(&self, handle: DeviceHandle) -> impl Iterator<Item = &EntrySnapshot> {
        self.entries
            .iter()
            .filter(move |entry| entry.handle == handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netif_core::{CellConfig, GnssConfig};

    const HANDLE: DeviceHandle = DeviceHandle::from_raw(1);

    fn cell() -> NetworkConfig {
        CellConfig::default().into()
    }

    #[test]
    fn test_attach_and_lookup() {
        let mut table = StateTable::new(1);
        assert_eq!(table.lookup(HANDLE, Technology::Cell), None);

        table.insert(HANDLE, Technology::Cell, cell()).unwrap();
        assert_eq!(
            table.lookup(HANDLE, Technology::Cell),
            Some(InterfaceState::ConfiguredDown)
        );

        let err = table.insert(HANDLE, Technology::Cell, cell()).unwrap_err();
        assert_eq!(
            err,
            NetifError::AlreadyAttached {
                handle: HANDLE,
                technology: Technology::Cell
            }
        );
    }

    #[test]
    fn test_several_technologies_per_handle() {
        let mut table = StateTable::new(1);
        table.insert(HANDLE, Technology::Cell, cell()).unwrap();
        table
            .insert(HANDLE, Technology::Gnss, GnssConfig::default().into())
            .unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.snapshot().for_handle(HANDLE).count(), 2);
    }

    #[test]
    fn test_full_cycle() {
        let mut table = StateTable::new(1);
        table.insert(HANDLE, Technology::Cell, cell()).unwrap();

        table
            .transition(HANDLE, Technology::Cell, InterfaceState::Up)
            .unwrap();
        table
            .transition(HANDLE, Technology::Cell, InterfaceState::ConfiguredDown)
            .unwrap();
        table
            .transition(HANDLE, Technology::Cell, InterfaceState::Absent)
            .unwrap();

        assert!(table.is_empty());
    }

    #[test]
    fn test_same_state_is_noop() {
        let mut table = StateTable::new(1);
        table.insert(HANDLE, Technology::Cell, cell()).unwrap();
        table
            .transition(HANDLE, Technology::Cell, InterfaceState::Up)
            .unwrap();

        assert!(table
            .transition(HANDLE, Technology::Cell, InterfaceState::Up)
            .is_ok());
        assert!(table
            .transition(HANDLE, Technology::Wifi, InterfaceState::Absent)
            .is_ok());
        assert_eq!(
            table.lookup(HANDLE, Technology::Cell),
            Some(InterfaceState::Up)
        );
    }

    #[test]
    fn test_invalid_edges() {
        let mut table = StateTable::new(1);
        table.insert(HANDLE, Technology::Cell, cell()).unwrap();
        table
            .transition(HANDLE, Technology::Cell, InterfaceState::Up)
            .unwrap();

        assert_eq!(
            table.transition(HANDLE, Technology::Cell, InterfaceState::Absent),
            Err(NetifError::InvalidTransition {
                from: InterfaceState::Up,
                to: InterfaceState::Absent,
            })
        );
        assert_eq!(
            table.lookup(HANDLE, Technology::Cell),
            Some(InterfaceState::Up)
        );
    }

    #[test]
    fn test_transition_without_entry_is_not_attached() {
        let mut table = StateTable::new(1);
        let not_attached = Err(NetifError::NotAttached {
            handle: HANDLE,
            technology: Technology::Wifi,
        });

        // The attach edge needs a payload, so only insert may take it
        assert_eq!(
            table.transition(HANDLE, Technology::Wifi, InterfaceState::ConfiguredDown),
            not_attached
        );
        assert_eq!(
            table.transition(HANDLE, Technology::Wifi, InterfaceState::Up),
            not_attached
        );
        assert!(table.is_empty());
    }

    #[test]
    fn test_in_flight_visible_in_snapshot() {
        let mut table = StateTable::new(1);
        table.insert(HANDLE, Technology::Cell, cell()).unwrap();

        let (_tx, rx) = watch::channel(None);
        table.set_in_flight(
            HANDLE,
            Technology::Cell,
            InFlight {
                target: InterfaceState::Up,
                outcome: rx,
            },
        );

        let snapshot = table.snapshot();
        assert_eq!(snapshot.entries[0].in_flight, Some(InterfaceState::Up));

        table.clear_in_flight(HANDLE, Technology::Cell);
        assert!(table.in_flight(HANDLE, Technology::Cell).is_none());
    }
}
