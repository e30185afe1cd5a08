//! The host platform port.
//!
//! Object builders never talk to the content database, catalog or workflow
//! tool directly; they go through this narrow trait. The real adapter lives
//! with the platform integration; [`memory::MemoryPlatform`] is a complete
//! in-process implementation used by tests.

pub mod memory;

use chrono::{DateTime, Utc};
use fixturekit_types::content::{ContentRef, CreateRequest, DateField, FieldSpec};
use fixturekit_types::error::PlatformError;

/// Abstraction over the content-management platform.
pub trait Platform: Send + Sync {
    /// The current site, used as the default container.
    fn site(&self) -> ContentRef;

    /// Create an object inside `request.container` and return a reference to it.
    fn create_content(&self, request: &CreateRequest) -> Result<ContentRef, PlatformError>;

    /// Writable and read-only schema fields of a content type, in order.
    fn schema_fields(&self, portal_type: &str) -> Vec<FieldSpec>;

    /// Ask the registered default-value providers for a field default.
    ///
    /// Consulted before the field's own default.
    fn default_value(&self, container: &ContentRef, field: &FieldSpec) -> Option<serde_json::Value>;

    /// Ids of the workflows bound to an object.
    fn workflow_chain(&self, obj: &ContentRef) -> Vec<String>;

    /// Force the review state of `obj` within `workflow`.
    fn set_review_state(
        &self,
        workflow: &str,
        obj: &ContentRef,
        review_state: &str,
    ) -> Result<(), PlatformError>;

    /// Recompute the security settings `workflow` applies to `obj`.
    fn update_role_mappings(&self, workflow: &str, obj: &ContentRef) -> Result<(), PlatformError>;

    /// Attach marker interfaces to an object.
    fn provide_interfaces(&self, obj: &ContentRef, interfaces: &[String]) -> Result<(), PlatformError>;

    fn set_date(
        &self,
        obj: &ContentRef,
        field: DateField,
        value: DateTime<Utc>,
    ) -> Result<(), PlatformError>;

    /// Refresh the given catalog indexes for an object.
    fn reindex(&self, obj: &ContentRef, indexes: &[&str]) -> Result<(), PlatformError>;

    /// Durably commit the current unit of work.
    fn commit(&self) -> Result<(), PlatformError>;
}
