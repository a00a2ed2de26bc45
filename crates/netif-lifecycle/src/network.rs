//! Lifecycle facade: ready, steady, go ... off
//!
//! ```text
//! Network::init()            READY   state table allocated
//! (device layer opens)       STEADY  module powered, handle issued
//! attach()                           pair configured, still down
//! interface_up()             GO      driver brings the interface up
//! interface_down()           OFF     driver takes it down
//! detach()                           pair forgotten
//! (device layer closes)
//! Network::deinit()                  state table dropped
//! ```
//!
//! ## Lock usage
//!
//! The table sits behind one `parking_lot::Mutex`. Each driver call follows
//! lock, validate, mark in flight, unlock, call the driver, lock, commit,
//! unlock. The lock is never held across `.await`, so a slow modem on one
//! handle does not stall any other pair. The in-flight marker keeps at most
//! one driver call running per pair; later callers join it or are rejected
//! according to [`InFlightPolicy`].

use crate::driver::{DriverCall, DriverRegistry};
use crate::settings::{InFlightPolicy, LifecycleSettings};
use crate::table::{InFlight, Outcome, StateTable, TableSnapshot};
use netif_core::{
    narrow, DeviceHandle, InterfaceState, NetifError, NetworkConfig, Result, Technology,
};
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Work decided while holding the table lock
enum Step<'a> {
    /// Target state already holds
    Done,
    /// Wait for the driver call another caller started
    Join(watch::Receiver<Outcome>),
    /// This caller makes the driver call
    Run(InFlightGuard<'a>),
}

/// Everything needed to commit or abandon one driver call
struct Ticket {
    generation: u64,
    handle: DeviceHandle,
    technology: Technology,
    target: InterfaceState,
    config: Option<NetworkConfig>,
    attached_implicitly: bool,
    outcome: watch::Sender<Outcome>,
}

impl Ticket {
    fn call(&self) -> DriverCall<'_> {
        match &self.config {
            Some(config) => DriverCall::Up(config),
            None => DriverCall::Down,
        }
    }
}

/// Releases the in-flight marker if the caller's future is dropped before
/// the driver call completes
struct InFlightGuard<'a> {
    network: &'a Network,
    ticket: Ticket,
    finished: bool,
}

impl InFlightGuard<'_> {
    fn finish(mut self, result: Result<()>) -> Result<()> {
        self.finished = true;
        self.network.commit(&self.ticket, result)
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.network.abandon(&self.ticket);
        }
    }
}

/// The lifecycle context for every interface of every device handle.
///
/// Share it between tasks behind an `Arc`; all operations take `&self`.
pub struct Network {
    drivers: DriverRegistry,
    settings: LifecycleSettings,
    table: Mutex<Option<StateTable>>,
    generations: AtomicU64,
}

impl fmt::Debug for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Network")
            .field("drivers", &self.drivers)
            .field("settings", &self.settings)
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

impl Network {
    /// Create the context. Call [`Network::init`] before any other operation.
    pub fn new(drivers: DriverRegistry, settings: LifecycleSettings) -> Self {
        Self {
            drivers,
            settings,
            table: Mutex::new(None),
            generations: AtomicU64::new(0),
        }
    }

    /// Allocate the state table. Calling it again while initialised does
    /// nothing.
    pub fn init(&self) {
        let mut table = self.table.lock();
        if table.is_some() {
            debug!("network layer already initialized");
            return;
        }
        let generation = self.generations.fetch_add(1, Ordering::Relaxed) + 1;
        *table = Some(StateTable::new(generation));
        info!(
            generation,
            drivers = ?self.drivers.registered_technologies(),
            "network layer initialized"
        );
    }

    /// Drop the state table.
    ///
    /// Interfaces that are still attached or up are NOT taken down and no
    /// device is closed; doing so before deinit is the caller's job. Driver
    /// calls still in flight finish with `NotInitialized` and record nothing.
    pub fn deinit(&self) {
        let table = self.table.lock().take();
        if let Some(table) = table {
            if !table.is_empty() {
                warn!(
                    attached = table.len(),
                    "network layer deinitialized with interfaces still attached"
                );
            }
            info!(generation = table.generation(), "network layer deinitialized");
        }
    }

    /// Whether [`Network::init`] has run and [`Network::deinit`] has not
    pub fn is_initialized(&self) -> bool {
        self.table.lock().is_some()
    }

    /// Registered drivers
    pub fn drivers(&self) -> &DriverRegistry {
        &self.drivers
    }

    /// Active settings
    pub fn settings(&self) -> &LifecycleSettings {
        &self.settings
    }

    /// Attach an interface to a handle with its payload, leaving it down.
    ///
    /// # Errors
    ///
    /// `InvalidArgument`, `TagMismatch`, `UnsupportedVersion`,
    /// `NoDriverRegistered`, `NotInitialized`, `AlreadyAttached`. No entry is
    /// created on failure.
    pub fn attach(
        &self,
        handle: DeviceHandle,
        technology: Technology,
        config: &NetworkConfig,
    ) -> Result<()> {
        check_target(handle, technology)?;
        let narrowed = narrow(config, technology)?;
        self.drivers.ensure_registered(technology)?;

        let mut guard = self.table.lock();
        let table = guard.as_mut().ok_or(NetifError::NotInitialized)?;
        table.insert(handle, technology, narrowed)?;
        info!(
            %handle,
            %technology,
            version = config.version().get(),
            "interface attached"
        );
        Ok(())
    }

    /// Forget an interface that is down. Detaching a pair with no entry
    /// succeeds.
    ///
    /// # Errors
    ///
    /// `InterfaceStillUp` if the interface is up, `TransitionInProgress` if a
    /// driver call is running for the pair.
    pub fn detach(&self, handle: DeviceHandle, technology: Technology) -> Result<()> {
        check_target(handle, technology)?;

        let mut guard = self.table.lock();
        let table = guard.as_mut().ok_or(NetifError::NotInitialized)?;
        let state = match table.lookup(handle, technology) {
            Some(state) => state,
            None => {
                debug!(%handle, %technology, "detach: nothing attached");
                return Ok(());
            }
        };
        if let Some(in_flight) = table.in_flight(handle, technology) {
            return Err(NetifError::TransitionInProgress {
                handle,
                technology,
                target: in_flight.target,
            });
        }
        if state == InterfaceState::Up {
            return Err(NetifError::InterfaceStillUp { handle, technology });
        }

        table.transition(handle, technology, InterfaceState::Absent)?;
        info!(%handle, %technology, "interface detached");
        Ok(())
    }

    /// Bring an interface up.
    ///
    /// `config` may be `None` to reuse the payload from `attach` or the last
    /// successful bring-up. If the interface is already up this returns
    /// success without calling the driver. A failed driver call leaves the
    /// state as it was, so the call can simply be retried.
    ///
    /// # Errors
    ///
    /// `NotAttached` if the pair has no entry (unless implicit attach is
    /// enabled and a payload is given), payload errors as for
    /// [`Network::attach`], `TransitionInProgress`, or the driver's
    /// `DriverFailure`.
    pub async fn interface_up(
        &self,
        handle: DeviceHandle,
        technology: Technology,
        config: Option<&NetworkConfig>,
    ) -> Result<()> {
        check_target(handle, technology)?;
        let narrowed = config.map(|config| narrow(config, technology)).transpose()?;
        self.drivers.ensure_registered(technology)?;

        let step = self.begin_up(handle, technology, narrowed)?;
        self.drive(handle, technology, step).await
    }

    /// Take an interface down. If it is already down this returns success
    /// without calling the driver.
    ///
    /// # Errors
    ///
    /// `NotAttached`, `TransitionInProgress`, or the driver's `DriverFailure`;
    /// the interface stays up on failure.
    pub async fn interface_down(&self, handle: DeviceHandle, technology: Technology) -> Result<()> {
        check_target(handle, technology)?;

        let step = self.begin_down(handle, technology)?;
        self.drive(handle, technology, step).await
    }

    /// Current state of a pair; `Absent` when it has no entry
    pub fn state(&self, handle: DeviceHandle, technology: Technology) -> Result<InterfaceState> {
        let guard = self.table.lock();
        let table = guard.as_ref().ok_or(NetifError::NotInitialized)?;
        Ok(table.lookup(handle, technology).unwrap_or_default())
    }

    /// Copy of the whole table, for diagnostics and leak checks
    pub fn snapshot(&self) -> Result<TableSnapshot> {
        let guard = self.table.lock();
        let table = guard.as_ref().ok_or(NetifError::NotInitialized)?;
        Ok(table.snapshot())
    }

    /// Number of attached pairs; zero when not initialised
    pub fn entry_count(&self) -> usize {
        self.table.lock().as_ref().map_or(0, StateTable::len)
    }

    fn begin_up(
        &self,
        handle: DeviceHandle,
        technology: Technology,
        config: Option<NetworkConfig>,
    ) -> Result<Step<'_>> {
        let mut guard = self.table.lock();
        let table = guard.as_mut().ok_or(NetifError::NotInitialized)?;

        let mut attached_implicitly = false;
        if table.lookup(handle, technology).is_none() {
            match &config {
                Some(config) if self.settings.implicit_attach => {
                    table.insert(handle, technology, config.clone())?;
                    attached_implicitly = true;
                    debug!(%handle, %technology, "attached implicitly by interface_up");
                }
                _ => return Err(NetifError::NotAttached { handle, technology }),
            }
        }

        if let Some(step) = self.arbitrate(table, handle, technology, InterfaceState::Up)? {
            return Ok(step);
        }
        if table.lookup(handle, technology) == Some(InterfaceState::Up) {
            debug!(%handle, %technology, "interface already up");
            return Ok(Step::Done);
        }

        let config = match config {
            Some(config) => config,
            None => table
                .config(handle, technology)
                .cloned()
                .ok_or(NetifError::NotAttached { handle, technology })?,
        };
        Ok(Step::Run(self.launch(
            table,
            handle,
            technology,
            InterfaceState::Up,
            Some(config),
            attached_implicitly,
        )))
    }

    fn begin_down(&self, handle: DeviceHandle, technology: Technology) -> Result<Step<'_>> {
        let mut guard = self.table.lock();
        let table = guard.as_mut().ok_or(NetifError::NotInitialized)?;

        let state = table
            .lookup(handle, technology)
            .ok_or(NetifError::NotAttached { handle, technology })?;
        if let Some(step) =
            self.arbitrate(table, handle, technology, InterfaceState::ConfiguredDown)?
        {
            return Ok(step);
        }
        if state == InterfaceState::ConfiguredDown {
            debug!(%handle, %technology, "interface already down");
            return Ok(Step::Done);
        }

        Ok(Step::Run(self.launch(
            table,
            handle,
            technology,
            InterfaceState::ConfiguredDown,
            None,
            false,
        )))
    }

    /// Decide what a caller does when a driver call is already running for
    /// the pair. `None` means nothing is in flight.
    fn arbitrate(
        &self,
        table: &StateTable,
        handle: DeviceHandle,
        technology: Technology,
        target: InterfaceState,
    ) -> Result<Option<Step<'_>>> {
        let in_flight = match table.in_flight(handle, technology) {
            Some(in_flight) => in_flight,
            None => return Ok(None),
        };

        if in_flight.target == target && self.settings.in_flight_policy == InFlightPolicy::Join {
            debug!(%handle, %technology, %target, "joining in-flight transition");
            return Ok(Some(Step::Join(in_flight.outcome.clone())));
        }

        debug!(
            %handle,
            %technology,
            requested = %target,
            in_flight = %in_flight.target,
            "rejecting transition while another is in flight"
        );
        Err(NetifError::TransitionInProgress {
            handle,
            technology,
            target: in_flight.target,
        })
    }

    fn launch(
        &self,
        table: &mut StateTable,
        handle: DeviceHandle,
        technology: Technology,
        target: InterfaceState,
        config: Option<NetworkConfig>,
        attached_implicitly: bool,
    ) -> InFlightGuard<'_> {
        let (outcome, receiver) = watch::channel(None);
        table.set_in_flight(
            handle,
            technology,
            InFlight {
                target,
                outcome: receiver,
            },
        );
        InFlightGuard {
            network: self,
            ticket: Ticket {
                generation: table.generation(),
                handle,
                technology,
                target,
                config,
                attached_implicitly,
                outcome,
            },
            finished: false,
        }
    }

    async fn drive(
        &self,
        handle: DeviceHandle,
        technology: Technology,
        step: Step<'_>,
    ) -> Result<()> {
        match step {
            Step::Done => Ok(()),
            Step::Join(outcome) => self.join(handle, technology, outcome).await,
            Step::Run(guard) => {
                let result = self
                    .drivers
                    .route(handle, technology, guard.ticket.call())
                    .await;
                guard.finish(result)
            }
        }
    }

    async fn join(
        &self,
        handle: DeviceHandle,
        technology: Technology,
        mut outcome: watch::Receiver<Outcome>,
    ) -> Result<()> {
        let result = match outcome.wait_for(Option::is_some).await {
            Ok(settled) => (*settled)
                .clone()
                .unwrap_or(Err(NetifError::Interrupted { handle, technology })),
            Err(_) => Err(NetifError::Interrupted { handle, technology }),
        };
        result
    }

    fn commit(&self, ticket: &Ticket, result: Result<()>) -> Result<()> {
        let Ticket {
            generation,
            handle,
            technology,
            target,
            ..
        } = *ticket;

        let outcome = {
            let mut guard = self.table.lock();
            match guard.as_mut() {
                Some(table) if table.generation() == generation => {
                    table.clear_in_flight(handle, technology);
                    match result {
                        Ok(()) => {
                            let committed = table.transition(handle, technology, target);
                            if committed.is_ok() {
                                if let Some(config) = &ticket.config {
                                    table.set_config(handle, technology, config.clone());
                                }
                                info!(
                                    %handle,
                                    %technology,
                                    state = %target,
                                    "interface transition committed"
                                );
                            }
                            committed
                        }
                        Err(err) => {
                            if ticket.attached_implicitly {
                                table.remove(handle, technology);
                            }
                            Err(err)
                        }
                    }
                }
                _ => {
                    warn!(
                        %handle,
                        %technology,
                        "network layer deinitialized during driver call; transition not recorded"
                    );
                    Err(NetifError::NotInitialized)
                }
            }
        };

        ticket.outcome.send_replace(Some(outcome.clone()));
        outcome
    }

    fn abandon(&self, ticket: &Ticket) {
        let (handle, technology) = (ticket.handle, ticket.technology);
        {
            let mut guard = self.table.lock();
            if let Some(table) = guard
                .as_mut()
                .filter(|table| table.generation() == ticket.generation)
            {
                table.clear_in_flight(handle, technology);
                if ticket.attached_implicitly {
                    table.remove(handle, technology);
                }
            }
        }
        warn!(
            %handle,
            %technology,
            target = %ticket.target,
            "driver call abandoned before completing; state unchanged"
        );
        ticket
            .outcome
            .send_replace(Some(Err(NetifError::Interrupted { handle, technology })));
    }
}

fn check_target(handle: DeviceHandle, technology: Technology) -> Result<()> {
    if handle.is_null() {
        return Err(NetifError::invalid("null device handle"));
    }
    if !technology.is_interface() {
        return Err(NetifError::invalid("technology none is not an interface"));
    }
    Ok(())
}
