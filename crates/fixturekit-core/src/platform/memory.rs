//! In-process implementation of the [`Platform`] port.
//!
//! Keeps every created object, its arguments, workflow state, dates and the
//! catalog reindex log in memory so tests can assert on what the builders did.
//! Values are cloned on read; no lock is held across calls.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use fixturekit_types::content::{
    Arguments, ContentRef, CreateRequest, DateField, FieldSpec, FilePayload,
};
use fixturekit_types::error::PlatformError;

use super::Platform;
use crate::clock::VirtualClock;

const SITE_PATH: &str = "/plone";
const SITE_TYPE: &str = "Plone Site";

/// An object as stored by the memory platform.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredObject {
    pub content: ContentRef,
    pub arguments: Arguments,
    pub payload: Option<(String, FilePayload)>,
    pub interfaces: Vec<String>,
    pub review_state: Option<String>,
    pub dates: HashMap<DateField, DateTime<Utc>>,
    /// Workflows whose role mappings were recomputed, in call order.
    pub role_mappings_updated: Vec<String>,
}

impl StoredObject {
    pub fn title(&self) -> Option<&str> {
        self.arguments.get("title").and_then(|v| v.as_str())
    }
}

#[derive(Default)]
struct State {
    objects: BTreeMap<String, StoredObject>,
    schemas: HashMap<String, Vec<FieldSpec>>,
    default_providers: HashMap<String, serde_json::Value>,
    workflow_chains: HashMap<String, Vec<String>>,
    allowed_types: HashMap<String, Vec<String>>,
    reindexed: Vec<(String, Vec<String>)>,
    commits: usize,
}

/// Memory-backed platform.
pub struct MemoryPlatform {
    site: ContentRef,
    clock: Option<VirtualClock>,
    state: Mutex<State>,
}

impl MemoryPlatform {
    pub fn new() -> Self {
        Self {
            site: ContentRef::new(SITE_PATH, SITE_TYPE),
            clock: None,
            state: Mutex::new(State::default()),
        }
    }

    /// Stamp creation dates from `clock` instead of the wall clock.
    pub fn with_clock(mut self, clock: VirtualClock) -> Self {
        self.clock = Some(clock);
        self
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().expect("memory platform lock poisoned")
    }

    /// Declare the schema of a content type.
    pub fn set_schema(&self, portal_type: &str, fields: Vec<FieldSpec>) {
        self.state().schemas.insert(portal_type.to_string(), fields);
    }

    /// Register a default-value provider answer for a field name.
    pub fn set_default_provider(&self, field: &str, value: impl Into<serde_json::Value>) {
        self.state()
            .default_providers
            .insert(field.to_string(), value.into());
    }

    pub fn set_workflow_chain(&self, portal_type: &str, chain: &[&str]) {
        self.state().workflow_chains.insert(
            portal_type.to_string(),
            chain.iter().map(|s| s.to_string()).collect(),
        );
    }

    /// Restrict which types may be added to containers of `container_type`.
    ///
    /// Only enforced for requests with `check_constraints`.
    pub fn allow_types(&self, container_type: &str, types: &[&str]) {
        self.state().allowed_types.insert(
            container_type.to_string(),
            types.iter().map(|s| s.to_string()).collect(),
        );
    }

    pub fn object(&self, obj: &ContentRef) -> Option<StoredObject> {
        self.state().objects.get(&obj.path).cloned()
    }

    pub fn objects(&self) -> Vec<StoredObject> {
        self.state().objects.values().cloned().collect()
    }

    /// Index names reindexed for `obj`, flattened in call order.
    pub fn reindexed(&self, obj: &ContentRef) -> Vec<String> {
        self.state()
            .reindexed
            .iter()
            .filter(|(path, _)| *path == obj.path)
            .flat_map(|(_, indexes)| indexes.iter().cloned())
            .collect()
    }

    pub fn commits(&self) -> usize {
        self.state().commits
    }

    fn with_object<T>(
        &self,
        obj: &ContentRef,
        f: impl FnOnce(&mut StoredObject) -> T,
    ) -> Result<T, PlatformError> {
        let mut state = self.state();
        let stored = state
            .objects
            .get_mut(&obj.path)
            .ok_or_else(|| PlatformError::ObjectNotFound(obj.path.clone()))?;
        Ok(f(stored))
    }
}

impl Default for MemoryPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl Platform for MemoryPlatform {
    fn site(&self) -> ContentRef {
        self.site.clone()
    }

    fn create_content(&self, request: &CreateRequest) -> Result<ContentRef, PlatformError> {
        let mut state = self.state();

        let container = &request.container;
        if container.path != self.site.path && !state.objects.contains_key(&container.path) {
            return Err(PlatformError::ContainerNotFound(container.path.clone()));
        }

        if request.check_constraints {
            if let Some(allowed) = state.allowed_types.get(&container.portal_type) {
                if !allowed.contains(&request.portal_type) {
                    return Err(PlatformError::ConstraintViolation {
                        portal_type: request.portal_type.clone(),
                        container: container.path.clone(),
                    });
                }
            }
        }

        // Same id in the same container gets a numeric suffix.
        let mut path = container.child_path(&request.id);
        let mut suffix = 1;
        while state.objects.contains_key(&path) {
            path = container.child_path(&format!("{}-{suffix}", request.id));
            suffix += 1;
        }

        let content = ContentRef::new(path.clone(), request.portal_type.clone());
        let created = request
            .created
            .or_else(|| self.clock.as_ref().map(VirtualClock::now))
            .unwrap_or_else(Utc::now);

        let mut dates = HashMap::new();
        dates.insert(DateField::Creation, created);
        dates.insert(DateField::Modification, created);

        state.objects.insert(
            path,
            StoredObject {
                content: content.clone(),
                arguments: request.arguments.clone(),
                payload: request.payload.clone(),
                interfaces: Vec::new(),
                review_state: None,
                dates,
                role_mappings_updated: Vec::new(),
            },
        );
        Ok(content)
    }

    fn schema_fields(&self, portal_type: &str) -> Vec<FieldSpec> {
        self.state()
            .schemas
            .get(portal_type)
            .cloned()
            .unwrap_or_default()
    }

    fn default_value(&self, _container: &ContentRef, field: &FieldSpec) -> Option<serde_json::Value> {
        self.state().default_providers.get(&field.name).cloned()
    }

    fn workflow_chain(&self, obj: &ContentRef) -> Vec<String> {
        self.state()
            .workflow_chains
            .get(&obj.portal_type)
            .cloned()
            .unwrap_or_default()
    }

    fn set_review_state(
        &self,
        workflow: &str,
        obj: &ContentRef,
        review_state: &str,
    ) -> Result<(), PlatformError> {
        if !self.workflow_chain(obj).iter().any(|w| w == workflow) {
            return Err(PlatformError::UnknownWorkflow(workflow.to_string()));
        }
        self.with_object(obj, |stored| {
            stored.review_state = Some(review_state.to_string());
        })
    }

    fn update_role_mappings(&self, workflow: &str, obj: &ContentRef) -> Result<(), PlatformError> {
        self.with_object(obj, |stored| {
            stored.role_mappings_updated.push(workflow.to_string());
        })
    }

    fn provide_interfaces(&self, obj: &ContentRef, interfaces: &[String]) -> Result<(), PlatformError> {
        self.with_object(obj, |stored| {
            for interface in interfaces {
                if !stored.interfaces.contains(interface) {
                    stored.interfaces.push(interface.clone());
                }
            }
        })
    }

    fn set_date(
        &self,
        obj: &ContentRef,
        field: DateField,
        value: DateTime<Utc>,
    ) -> Result<(), PlatformError> {
        self.with_object(obj, |stored| {
            stored.dates.insert(field, value);
        })
    }

    fn reindex(&self, obj: &ContentRef, indexes: &[&str]) -> Result<(), PlatformError> {
        let mut state = self.state();
        if !state.objects.contains_key(&obj.path) {
            return Err(PlatformError::ObjectNotFound(obj.path.clone()));
        }
        state.reindexed.push((
            obj.path.clone(),
            indexes.iter().map(|s| s.to_string()).collect(),
        ));
        Ok(())
    }

    fn commit(&self) -> Result<(), PlatformError> {
        self.state().commits += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(container: ContentRef, portal_type: &str, id: &str) -> CreateRequest {
        CreateRequest {
            container,
            portal_type: portal_type.to_string(),
            id: id.to_string(),
            arguments: Arguments::new(),
            payload: None,
            check_constraints: false,
            created: None,
        }
    }

    #[test]
    fn test_create_in_site() {
        let platform = MemoryPlatform::new();
        let obj = platform
            .create_content(&request(platform.site(), "Folder", "folder"))
            .unwrap();
        assert_eq!(obj.path, "/plone/folder");
        assert!(platform.object(&obj).is_some());
    }

    #[test]
    fn test_duplicate_ids_get_suffix() {
        let platform = MemoryPlatform::new();
        let first = platform
            .create_content(&request(platform.site(), "Folder", "folder"))
            .unwrap();
        let second = platform
            .create_content(&request(platform.site(), "Folder", "folder"))
            .unwrap();
        assert_eq!(first.id(), "folder");
        assert_eq!(second.id(), "folder-1");
    }

    #[test]
    fn test_unknown_container() {
        let platform = MemoryPlatform::new();
        let missing = ContentRef::new("/plone/nope", "Folder");
        let err = platform
            .create_content(&request(missing, "Document", "doc"))
            .unwrap_err();
        assert!(matches!(err, PlatformError::ContainerNotFound(_)));
    }

    #[test]
    fn test_constraints_only_when_requested() {
        let platform = MemoryPlatform::new();
        platform.allow_types(SITE_TYPE, &["Folder"]);

        let mut constrained = request(platform.site(), "Document", "doc");
        constrained.check_constraints = true;
        assert!(matches!(
            platform.create_content(&constrained),
            Err(PlatformError::ConstraintViolation { .. })
        ));

        assert!(platform
            .create_content(&request(platform.site(), "Document", "doc"))
            .is_ok());
    }

    #[test]
    fn test_review_state_requires_bound_workflow() {
        let platform = MemoryPlatform::new();
        let obj = platform
            .create_content(&request(platform.site(), "Folder", "folder"))
            .unwrap();
        assert!(platform.set_review_state("simple", &obj, "published").is_err());

        platform.set_workflow_chain("Folder", &["simple"]);
        platform.set_review_state("simple", &obj, "published").unwrap();
        assert_eq!(
            platform.object(&obj).unwrap().review_state.as_deref(),
            Some("published")
        );
    }
}
