// ABOUTME: Type-safe identifiers and validated domain types.
// ABOUTME: Engine ids, app/service names, image references, network aliases.

mod id;
mod image_ref;
mod network_alias;
mod service_name;

pub use id::{ContainerId, Id, ImageId};
pub use image_ref::{ImageRef, ParseImageRefError};
pub use network_alias::{NetworkAlias, NetworkAliasError};
pub use service_name::{AppName, NameError, ServiceName};
