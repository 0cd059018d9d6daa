mod bridge;
mod config;
mod device;
mod error;
mod logger;
mod registry;
mod status;
mod types;

pub use bridge::{
    AutelisBridge, AutelisBridgeBuilder, DEFAULT_PERSIST_INTERVAL, DEFAULT_POLL_INTERVAL,
};
pub use config::{Config, ControllerConfig, Settings};
pub use device::{AutelisClient, DeviceClient};
pub use error::{Error, Result};
pub use registry::{
    CONTROLLER_ADDRESS, ControllerNode, EquipmentNode, Node, NodeKind, NodeRegistry, Report,
    TempControlNode,
};
pub use status::{decode_status, resolve_zone_status};
pub use types::*;
