//! Device discovery: the MAC-keyed registry plus the passive and active
//! populators that feed it.

pub mod active;
pub mod device;
pub mod passive;

pub use active::ActiveDiscovery;
pub use device::{Device, DeviceRegistry, DiscoverySource};
pub use passive::PassiveDiscovery;
