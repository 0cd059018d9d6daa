use std::collections::BTreeMap;

use tracing::warn;

use crate::types::{ControllerStatus, Driver, ZoneId, ZoneStatus};

/// Fixed address of the singleton controller node.
pub const CONTROLLER_ADDRESS: &str = "controller";

type ReportCallback = Box<dyn Fn(&Report) + Send + Sync>;

/// One driver value pushed to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub address: String,
    pub driver: Driver,
    pub value: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Controller,
    TempControl,
    Equipment,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Controller => "CONTROLLER",
            NodeKind::TempControl => "TEMP_CONTROL",
            NodeKind::Equipment => "EQUIPMENT",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ControllerNode {
    pub status: ControllerStatus,
    /// Addresses of the nodes parented to this controller, in creation
    /// order. Owned list, not live references.
    pub children: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct TempControlNode {
    pub zone: ZoneId,
    pub status: ZoneStatus,
    pub mode: i32,
    pub setpoint: i32,
    pub current_temp: i32,
}

#[derive(Debug, Clone)]
pub struct EquipmentNode {
    pub state: i32,
}

/// Mirrored host node, keyed in the registry by its address.
#[derive(Debug, Clone)]
pub enum Node {
    Controller(ControllerNode),
    TempControl(TempControlNode),
    Equipment(EquipmentNode),
}

impl Node {
    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Controller(_) => NodeKind::Controller,
            Node::TempControl(_) => NodeKind::TempControl,
            Node::Equipment(_) => NodeKind::Equipment,
        }
    }

    /// Every driver this node exposes, with its current value.
    pub fn drivers(&self) -> Vec<(Driver, i32)> {
        match self {
            Node::Controller(n) => n.status.drivers().to_vec(),
            Node::TempControl(n) => vec![
                (Driver::Status, n.status.as_index()),
                (Driver::HeatMode, n.mode),
                (Driver::Setpoint, n.setpoint),
                (Driver::CurrentTemp, n.current_temp),
            ],
            Node::Equipment(n) => vec![(Driver::Status, n.state)],
        }
    }

    /// Returns false when the driver does not belong to this node kind or
    /// the value is out of range for it.
    pub(crate) fn set_driver(&mut self, driver: Driver, value: i32) -> bool {
        match (self, driver) {
            (Node::Controller(n), Driver::RunState) => n.status.runstate = value,
            (Node::Controller(n), Driver::OpMode) => n.status.opmode = value,
            (Node::Controller(n), Driver::Freeze) => n.status.freeze = value,
            (Node::Controller(n), Driver::WaterSensor) => n.status.water_sensor = value,
            (Node::Controller(n), Driver::SolarSensor) => n.status.solar_sensor = value,
            (Node::Controller(n), Driver::AirSensor) => n.status.air_sensor = value,
            (Node::Controller(n), Driver::AirTemp) => n.status.air_temp = value,
            (Node::Controller(n), Driver::SolarTemp) => n.status.solar_temp = value,
            (Node::TempControl(n), Driver::Status) => match ZoneStatus::from_index(value) {
                Some(status) => n.status = status,
                None => return false,
            },
            (Node::TempControl(n), Driver::HeatMode) => n.mode = value,
            (Node::TempControl(n), Driver::Setpoint) => n.setpoint = value,
            (Node::TempControl(n), Driver::CurrentTemp) => n.current_temp = value,
            (Node::Equipment(n), Driver::Status) => n.state = value,
            _ => return false,
        }
        true
    }
}

/// Address-keyed mirror of the host's node table. Create-if-absent,
/// update-in-place; nodes are never removed during normal operation.
#[derive(Default)]
pub struct NodeRegistry {
    nodes: BTreeMap<String, Node>,
    callbacks: Vec<ReportCallback>,
    dirty: bool,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a host-notification callback, fired for every reported
    /// driver value.
    pub fn on_report(&mut self, f: impl Fn(&Report) + Send + Sync + 'static) {
        self.callbacks.push(Box::new(f));
    }

    pub(crate) fn push_callback(&mut self, cb: ReportCallback) {
        self.callbacks.push(cb);
    }

    pub fn exists(&self, address: &str) -> bool {
        self.nodes.contains_key(address)
    }

    pub fn get(&self, address: &str) -> Option<&Node> {
        self.nodes.get(address)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Node)> {
        self.nodes.iter()
    }

    /// Create a node. New nodes always report all of their drivers (the
    /// host needs initial values) and mark the registry dirty for the
    /// next persist step.
    pub fn insert(&mut self, address: impl Into<String>, node: Node) {
        let address = address.into();
        self.nodes.insert(address.clone(), node);
        self.dirty = true;
        self.report_node(&address);
    }

    /// Update one driver value on an existing node, reporting it to the
    /// host when `notify` is set.
    pub fn set_driver(&mut self, address: &str, driver: Driver, value: i32, notify: bool) {
        match self.nodes.get_mut(address) {
            Some(node) => {
                if !node.set_driver(driver, value) {
                    warn!(address, ?driver, value, "driver update rejected");
                    return;
                }
            }
            None => {
                warn!(address, ?driver, "set_driver on unknown node");
                return;
            }
        }
        if notify {
            self.emit(&Report {
                address: address.to_string(),
                driver,
                value,
            });
        }
    }

    /// Report every driver of a node to the host.
    pub fn report_node(&self, address: &str) {
        let Some(node) = self.nodes.get(address) else {
            warn!(address, "report for unknown node");
            return;
        };
        for (driver, value) in node.drivers() {
            self.emit(&Report {
                address: address.to_string(),
                driver,
                value,
            });
        }
    }

    /// Append a child address to a controller's ownership list.
    pub fn add_child(&mut self, parent: &str, child: &str) {
        if let Some(Node::Controller(controller)) = self.nodes.get_mut(parent) {
            if !controller.children.iter().any(|c| c == child) {
                controller.children.push(child.to_string());
            }
        } else {
            warn!(parent, child, "add_child on a non-controller node");
        }
    }

    /// True once since the last call if any node was created in between.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    fn emit(&self, report: &Report) {
        for cb in &self.callbacks {
            cb(report);
        }
    }
}
