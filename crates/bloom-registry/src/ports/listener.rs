//! Registry observer port

use std::sync::Arc;

use crate::error::ListenerError;

use super::filter::Filter;

/// Observer of filter lifecycle events.
///
/// Called synchronously on the thread performing the registry operation,
/// after the map mutation is visible. An error aborts the dispatch and is
/// returned to the caller of that operation.
pub trait RegistryListener: Send + Sync {
    fn on_filter_created(&self, name: &str, filter: &Arc<dyn Filter>) -> Result<(), ListenerError>;

    fn on_filter_removed(&self, name: &str, filter: &Arc<dyn Filter>) -> Result<(), ListenerError>;
}
