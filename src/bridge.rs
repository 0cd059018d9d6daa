use std::time::{Duration, Instant};

use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::device::{AutelisClient, DeviceClient};
use crate::logger::MessageLogger;
use crate::registry::{
    CONTROLLER_ADDRESS, ControllerNode, EquipmentNode, Node, NodeKind, NodeRegistry, Report,
    TempControlNode,
};
use crate::status::decode_status;
use crate::types::{Command, Driver, PoolStatus, ZoneId};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(20);
pub const DEFAULT_PERSIST_INTERVAL: Duration = Duration::from_secs(30);

type ReportCallback = Box<dyn Fn(&Report) + Send + Sync>;
type PersistCallback = Box<dyn Fn(&NodeRegistry) + Send + Sync>;

pub struct AutelisBridgeBuilder {
    host: String,
    username: String,
    password: String,
    poll_interval: Duration,
    persist_interval: Duration,
    ignore_solar: bool,
    report_callbacks: Vec<ReportCallback>,
    persist_callbacks: Vec<PersistCallback>,
    log_path: Option<String>,
}

impl AutelisBridgeBuilder {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            username: String::new(),
            password: String::new(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            persist_interval: DEFAULT_PERSIST_INTERVAL,
            ignore_solar: false,
            report_callbacks: Vec::new(),
            persist_callbacks: Vec::new(),
            log_path: None,
        }
    }

    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn persist_interval(mut self, interval: Duration) -> Self {
        self.persist_interval = interval;
        self
    }

    pub fn ignore_solar(mut self, ignore: bool) -> Self {
        self.ignore_solar = ignore;
        self
    }

    /// Host-notification hook; fired for every reported driver value.
    pub fn on_report(mut self, f: impl Fn(&Report) + Send + Sync + 'static) -> Self {
        self.report_callbacks.push(Box::new(f));
        self
    }

    /// Persistence hook; handed the registry whenever the long-interval
    /// step finds newly discovered nodes.
    pub fn on_persist(mut self, f: impl Fn(&NodeRegistry) + Send + Sync + 'static) -> Self {
        self.persist_callbacks.push(Box::new(f));
        self
    }

    pub fn message_log(mut self, path: impl Into<String>) -> Self {
        self.log_path = Some(path.into());
        self
    }

    pub fn build(self) -> AutelisBridge<AutelisClient> {
        let client = AutelisClient::new(&self.host, &self.username, &self.password);
        self.build_with_client(client)
    }

    pub fn build_with_client<C: DeviceClient>(self, client: C) -> AutelisBridge<C> {
        let mut registry = NodeRegistry::new();
        for cb in self.report_callbacks {
            registry.push_callback(cb);
        }

        let logger = self
            .log_path
            .map(|path| MessageLogger::new(&path).expect("failed to open message log"));

        AutelisBridge {
            client,
            registry,
            poll_interval: self.poll_interval,
            persist_interval: self.persist_interval,
            ignore_solar: self.ignore_solar,
            persist_callbacks: self.persist_callbacks,
            logger,
            temp_units: "F".to_string(),
            last_sync: None,
        }
    }
}

/// State-synchronization and command-dispatch engine for one controller.
///
/// `&mut self` on every entry point makes the single-stream-of-control
/// assumption explicit; a concurrent host must wrap the bridge in its own
/// mutex.
pub struct AutelisBridge<C: DeviceClient = AutelisClient> {
    client: C,
    registry: NodeRegistry,
    poll_interval: Duration,
    persist_interval: Duration,
    ignore_solar: bool,
    persist_callbacks: Vec<PersistCallback>,
    logger: Option<MessageLogger>,
    temp_units: String,
    last_sync: Option<Instant>,
}

impl AutelisBridge<AutelisClient> {
    pub fn builder(host: impl Into<String>) -> AutelisBridgeBuilder {
        AutelisBridgeBuilder::new(host)
    }
}

impl<C: DeviceClient> AutelisBridge<C> {
    pub fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    /// Unit reported by the controller (`F` until the first sync says
    /// otherwise). Metadata only; values are never converted.
    pub fn temp_units(&self) -> &str {
        &self.temp_units
    }

    pub fn last_sync(&self) -> Option<Instant> {
        self.last_sync
    }

    /// One fetch-decode-reconcile pass. A failed fetch or decode logs,
    /// returns false, and leaves every node untouched. `notify` controls
    /// whether updates to existing nodes are reported to the host; newly
    /// created nodes always report their initial values.
    pub async fn sync(&mut self, notify: bool) -> bool {
        self.last_sync = Some(Instant::now());

        let payload = match self.client.fetch_status().await {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, "status fetch failed");
                if let Some(ref mut logger) = self.logger {
                    logger.log_poll(false, Some(&e.to_string()));
                }
                return false;
            }
        };

        let status = match decode_status(&payload) {
            Ok(status) => status,
            Err(e) => {
                warn!(error = %e, "status decode failed");
                if let Some(ref mut logger) = self.logger {
                    logger.log_poll(false, Some(&e.to_string()));
                }
                return false;
            }
        };

        if let Some(ref mut logger) = self.logger {
            logger.log_poll(true, None);
        }

        self.reconcile(&status, notify);
        true
    }

    fn reconcile(&mut self, status: &PoolStatus, notify: bool) {
        self.temp_units = status.temp_units.clone();

        if self.registry.exists(CONTROLLER_ADDRESS) {
            for (driver, value) in status.controller.drivers() {
                self.registry
                    .set_driver(CONTROLLER_ADDRESS, driver, value, notify);
            }
        } else {
            self.registry.insert(
                CONTROLLER_ADDRESS,
                Node::Controller(ControllerNode {
                    status: status.controller,
                    children: Vec::new(),
                }),
            );
        }

        for reading in &status.zones {
            let address = reading.zone.address();
            if self.registry.exists(address) {
                self.registry
                    .set_driver(address, Driver::Status, reading.status.as_index(), notify);
                self.registry
                    .set_driver(address, Driver::HeatMode, reading.mode, notify);
                self.registry
                    .set_driver(address, Driver::Setpoint, reading.setpoint, notify);
                self.registry
                    .set_driver(address, Driver::CurrentTemp, reading.current_temp, notify);
            } else {
                self.registry.insert(
                    address,
                    Node::TempControl(TempControlNode {
                        zone: reading.zone,
                        status: reading.status,
                        mode: reading.mode,
                        setpoint: reading.setpoint,
                        current_temp: reading.current_temp,
                    }),
                );
                self.registry.add_child(CONTROLLER_ADDRESS, address);
            }
        }

        for (name, &state) in &status.equipment {
            if self.registry.exists(name) {
                self.registry.set_driver(name, Driver::Status, state, notify);
            } else {
                self.registry
                    .insert(name.clone(), Node::Equipment(EquipmentNode { state }));
                self.registry.add_child(CONTROLLER_ADDRESS, name);
            }
        }
    }

    /// Dispatch a host command to the node at `address`, checking the
    /// command against the node kind first.
    pub async fn dispatch(&mut self, address: &str, command: Command) -> bool {
        let kind = self.registry.get(address).map(Node::kind);
        match (command, kind) {
            (Command::Query, Some(_)) => self.query(address).await,
            (Command::On, Some(NodeKind::Equipment)) => self.turn_on(address).await,
            (Command::Off, Some(NodeKind::Equipment)) => self.turn_off(address).await,
            (Command::SetMode(mode), Some(NodeKind::TempControl)) => {
                self.set_zone_mode(address, mode).await
            }
            (Command::SetTemp(temp), Some(NodeKind::TempControl)) => {
                self.set_zone_setpoint(address, temp).await
            }
            (command, Some(kind)) => {
                warn!(address, ?command, kind = kind.as_str(), "command not supported by node");
                false
            }
            (command, None) => {
                warn!(address, ?command, "command for unknown node");
                false
            }
        }
    }

    /// Turn an equipment relay on. The next poll confirms the change.
    pub async fn turn_on(&mut self, address: &str) -> bool {
        self.set_equipment(address, 1).await
    }

    /// Turn an equipment relay off. The next poll confirms the change.
    pub async fn turn_off(&mut self, address: &str) -> bool {
        self.set_equipment(address, 0).await
    }

    async fn set_equipment(&mut self, address: &str, state: i32) -> bool {
        let action = if state == 1 { "on" } else { "off" };
        let result = if state == 1 {
            self.client.set_on(address).await
        } else {
            self.client.set_off(address).await
        };

        match result {
            Ok(()) => {
                if let Some(ref mut logger) = self.logger {
                    logger.log_command(action, address, address, state);
                }
                self.registry.set_driver(address, Driver::Status, state, true);
                true
            }
            Err(e) => {
                warn!(address, action, error = %e, "equipment command failed");
                false
            }
        }
    }

    /// Set a zone's heat mode (device-defined small integer).
    pub async fn set_zone_mode(&mut self, address: &str, mode: i32) -> bool {
        let Some(zone) = ZoneId::from_address(address) else {
            warn!(address, "no heat mode for node, SET_MODE ignored");
            return false;
        };

        match self.client.set_heat_mode(zone, mode).await {
            Ok(()) => {
                if let Some(ref mut logger) = self.logger {
                    logger.log_command("set_mode", address, zone.address(), mode);
                }
                self.registry.set_driver(address, Driver::HeatMode, mode, true);
                true
            }
            Err(e) => {
                warn!(address, error = %e, "SET_MODE command failed");
                false
            }
        }
    }

    /// Set a zone's setpoint. Only the two zone addresses resolve to a
    /// setpoint element; anything else fails before any device call.
    pub async fn set_zone_setpoint(&mut self, address: &str, temp: i32) -> bool {
        let Some(zone) = ZoneId::from_address(address) else {
            warn!(address, "no setpoint for node, SET_TEMP ignored");
            return false;
        };

        match self.client.set_temp(zone.setpoint_field(), temp).await {
            Ok(()) => {
                if let Some(ref mut logger) = self.logger {
                    logger.log_command("set_temp", address, zone.setpoint_field(), temp);
                }
                self.registry.set_driver(address, Driver::Setpoint, temp, true);
                true
            }
            Err(e) => {
                warn!(address, error = %e, "SET_TEMP command failed");
                false
            }
        }
    }

    /// Refresh every node without re-reporting, then report the target's
    /// drivers; the controller also reports all of its children.
    pub async fn query(&mut self, address: &str) -> bool {
        self.sync(false).await;

        match self.registry.get(address) {
            Some(Node::Controller(controller)) => {
                let children = controller.children.clone();
                self.registry.report_node(address);
                for child in &children {
                    self.registry.report_node(child);
                }
                true
            }
            Some(_) => {
                self.registry.report_node(address);
                true
            }
            None => {
                warn!(address, "query for unknown node");
                false
            }
        }
    }

    /// Run the persistence hooks if any node was created since the last
    /// persist step.
    pub fn persist(&mut self) {
        if self.registry.take_dirty() {
            debug!("persisting node roster");
            for cb in &self.persist_callbacks {
                cb(&self.registry);
            }
        }
    }

    /// Drive the engine: a sync pass every poll interval and a persist
    /// step on its own longer interval, forever. Both fire immediately on
    /// startup so the registry is populated and persisted before the
    /// first full wait.
    pub async fn run(&mut self) {
        debug!(
            poll_secs = self.poll_interval.as_secs(),
            persist_secs = self.persist_interval.as_secs(),
            ignore_solar = self.ignore_solar,
            "starting poll scheduler"
        );

        let mut poll = tokio::time::interval(self.poll_interval);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut persist = tokio::time::interval(self.persist_interval);
        persist.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = poll.tick() => {
                    debug!("running scheduled sync");
                    self.sync(true).await;
                }
                _ = persist.tick() => {
                    self.persist();
                }
            }
        }
    }
}
