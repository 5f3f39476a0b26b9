//! # Resources
//!
//! The services mounted by [`app`](crate::app), declared as route tables.

pub mod books;
pub mod errors;

use crate::registry::{RegistryError, RouteTable};

/// Route table with every built-in service.
///
/// # Errors
///
/// `RegistryError` if two services claim the same verb and path.
pub fn route_table() -> Result<RouteTable, RegistryError> {
    books::services()
        .into_iter()
        .chain(errors::services())
        .try_fold(RouteTable::new(), RouteTable::service)
}
