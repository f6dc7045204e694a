//! `stockroom-auth`: pure authorization boundary.
//!
//! Permission evaluation is an external concern; this crate only models the
//! actor, names the permissions the stock workflows consult, and exposes the
//! `can(actor, permission)` capability check as a trait.

pub mod actor;
pub mod authorize;
pub mod permissions;
pub mod roles;

pub use actor::Actor;
pub use authorize::{AuthzError, Capabilities, DirectGrants, RolePolicy, authorize, ensure_division};
pub use permissions::Permission;
pub use roles::Role;
