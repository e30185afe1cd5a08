//! The generic content object builder.
//!
//! `ObjectBuilder` is what `FixtureContext::builder(name)` returns: the
//! registered [`BuilderKind`] supplies the type-specific behaviour, while this
//! module owns the configuration every content object shares and the
//! `after_create` steps (marker interfaces, workflow state, dates, commit).

use std::sync::Arc;

use chrono::{DateTime, Utc};
use fixturekit_types::content::{
    Arguments, ContentRef, CreateRequest, DateField, FilePayload,
};
use fixturekit_types::error::BuilderError;
use fixturekit_types::naming::slugify;

use super::Builder;
use super::kind::BuilderKind;
use crate::context::FixtureContext;
use crate::platform::Platform;
use crate::session::BuilderSession;

/// Configuration accumulated by an [`ObjectBuilder`].
#[derive(Debug, Clone)]
pub struct ObjectSettings {
    /// Target container; the site when unset.
    pub container: Option<ContentRef>,
    pub arguments: Arguments,
    pub review_state: Option<String>,
    pub interfaces: Vec<String>,
    pub effective_date: Option<DateTime<Utc>>,
    pub expiration_date: Option<DateTime<Utc>>,
    pub creation_date: Option<DateTime<Utc>>,
    pub modification_date: Option<DateTime<Utc>>,
    pub payload: Option<FilePayload>,
    /// Fill absent schema fields with their defaults.
    pub set_default_values: bool,
    /// Let the platform enforce allowed-type constraints.
    pub check_constraints: bool,
}

impl Default for ObjectSettings {
    fn default() -> Self {
        Self {
            container: None,
            arguments: Arguments::new(),
            review_state: None,
            interfaces: Vec::new(),
            effective_date: None,
            expiration_date: None,
            creation_date: None,
            modification_date: None,
            payload: None,
            set_default_values: true,
            check_constraints: false,
        }
    }
}

impl ObjectSettings {
    /// The explicit `id` argument, if it is a string.
    pub fn id(&self) -> Option<&str> {
        self.arguments.get("id").and_then(|v| v.as_str())
    }

    pub fn title(&self) -> Option<&str> {
        self.arguments.get("title").and_then(|v| v.as_str())
    }

    /// Make sure an `id` argument exists, derived from the title or the type.
    /// An `id` given by the caller is kept whatever its value.
    pub fn ensure_id(&mut self, portal_type: &str) {
        if self.arguments.contains_key("id") {
            return;
        }
        let id = match self.title() {
            Some(title) if !slugify(title).is_empty() => slugify(title),
            _ => slugify(portal_type),
        };
        self.arguments.insert("id".to_string(), id.into());
    }

    /// Dates to apply after creation. Modification comes last because every
    /// other change touches it.
    fn dates(&self) -> Vec<(DateField, DateTime<Utc>)> {
        [
            (DateField::Effective, self.effective_date),
            (DateField::Expiration, self.expiration_date),
            (DateField::Creation, self.creation_date),
            (DateField::Modification, self.modification_date),
        ]
        .into_iter()
        .filter_map(|(field, value)| value.map(|v| (field, v)))
        .collect()
    }
}

/// Builder for one content object of a registered kind.
pub struct ObjectBuilder {
    session: Arc<BuilderSession>,
    kind: Arc<dyn BuilderKind>,
    settings: ObjectSettings,
}

impl ObjectBuilder {
    pub fn new(session: Arc<BuilderSession>, kind: Arc<dyn BuilderKind>) -> Self {
        Self {
            session,
            kind,
            settings: ObjectSettings::default(),
        }
    }

    pub fn session(&self) -> &Arc<BuilderSession> {
        &self.session
    }

    pub fn kind(&self) -> &dyn BuilderKind {
        self.kind.as_ref()
    }

    pub fn settings(&self) -> &ObjectSettings {
        &self.settings
    }

    pub fn arguments(&self) -> &Arguments {
        &self.settings.arguments
    }

    /// Create the object inside `container` instead of the site.
    pub fn within(mut self, container: ContentRef) -> Self {
        self.settings.container = Some(container);
        self
    }

    /// Set one argument. Later calls for the same key win.
    pub fn having(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.settings.arguments.insert(key.into(), value.into());
        self
    }

    /// Merge several arguments at once.
    pub fn having_all<K, V>(mut self, arguments: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<serde_json::Value>,
    {
        for (key, value) in arguments {
            self.settings.arguments.insert(key.into(), value.into());
        }
        self
    }

    pub fn titled(self, title: impl Into<String>) -> Self {
        self.having("title", title.into())
    }

    /// Put the created object into `review_state` of its workflow.
    pub fn in_state(mut self, review_state: impl Into<String>) -> Self {
        self.settings.review_state = Some(review_state.into());
        self
    }

    /// Attach a marker interface (dotted name) after creation.
    pub fn providing(mut self, interface: impl Into<String>) -> Self {
        let interface = interface.into();
        if !self.settings.interfaces.contains(&interface) {
            self.settings.interfaces.push(interface);
        }
        self
    }

    pub fn with_effective_date(mut self, date: DateTime<Utc>) -> Self {
        self.settings.effective_date = Some(date);
        self
    }

    pub fn with_expiration_date(mut self, date: DateTime<Utc>) -> Self {
        self.settings.expiration_date = Some(date);
        self
    }

    pub fn with_creation_date(mut self, date: DateTime<Utc>) -> Self {
        self.settings.creation_date = Some(date);
        self
    }

    pub fn with_modification_date(mut self, date: DateTime<Utc>) -> Self {
        self.settings.modification_date = Some(date);
        self
    }

    /// Attach a file payload.
    pub fn attach(mut self, payload: FilePayload) -> Self {
        self.settings.payload = Some(payload);
        self
    }

    /// Attach `content` under the kind's default filename.
    pub fn attach_file_containing(self, content: impl Into<Vec<u8>>) -> Self {
        let filename = self.kind.default_filename().to_string();
        self.attach_file_named(content, filename)
    }

    pub fn attach_file_named(self, content: impl Into<Vec<u8>>, filename: impl Into<String>) -> Self {
        self.attach(FilePayload {
            filename: filename.into(),
            data: content.into(),
        })
    }

    /// Attach the kind's placeholder content.
    pub fn with_dummy_content(self) -> Self {
        let content = self.kind.dummy_content().to_vec();
        self.attach_file_containing(content)
    }

    /// Leave absent schema fields empty instead of filling their defaults.
    pub fn without_defaults(mut self) -> Self {
        self.settings.set_default_values = false;
        self
    }

    /// Let the platform reject types not allowed in the container.
    pub fn with_constraints(mut self) -> Self {
        self.settings.check_constraints = true;
        self
    }

    /// Fill absent, writable schema fields.
    ///
    /// The platform's default providers are asked first, the field's own
    /// default second; the first non-null answer wins.
    fn insert_field_default_values(&mut self, platform: &dyn Platform, container: &ContentRef) {
        for field in platform.schema_fields(self.kind.portal_type()) {
            if field.readonly || self.settings.arguments.contains_key(&field.name) {
                continue;
            }
            let value = platform
                .default_value(container, &field)
                .filter(|v| !v.is_null())
                .or_else(|| field.default.clone().filter(|v| !v.is_null()));
            if let Some(value) = value {
                self.settings.arguments.insert(field.name.clone(), value);
            }
        }
    }

    fn change_workflow_state(&self, platform: &dyn Platform, obj: &ContentRef) -> Result<(), BuilderError> {
        let Some(review_state) = &self.settings.review_state else {
            return Ok(());
        };

        // Multi-workflow chains have no single state to set.
        let chain = platform.workflow_chain(obj);
        if chain.len() != 1 {
            return Err(BuilderError::WorkflowConfiguration {
                type_name: obj.portal_type.clone(),
                chain,
            });
        }

        platform.set_review_state(&chain[0], obj, review_state)?;
        for workflow in &chain {
            platform.update_role_mappings(workflow, obj)?;
        }
        platform.reindex(obj, &["review_state", "allowedRolesAndUsers"])?;
        tracing::debug!(object = %obj.path, review_state = %review_state, "workflow state changed");
        Ok(())
    }
}

impl Builder for ObjectBuilder {
    type Output = ContentRef;

    fn before_create(&mut self, _ctx: &FixtureContext) -> Result<(), BuilderError> {
        self.kind.before_create(&mut self.settings)
    }

    fn create_object(&mut self, ctx: &FixtureContext) -> Result<ContentRef, BuilderError> {
        let platform = ctx.platform();
        let container = self
            .settings
            .container
            .clone()
            .unwrap_or_else(|| platform.site());

        if self.settings.set_default_values {
            self.insert_field_default_values(platform, &container);
        }

        let id = self
            .settings
            .id()
            .map(str::to_string)
            .unwrap_or_else(|| slugify(self.kind.portal_type()));

        let payload = self.settings.payload.clone().map(|payload| {
            let field = self.kind.payload_field().unwrap_or("file").to_string();
            (field, payload)
        });

        let request = CreateRequest {
            container,
            portal_type: self.kind.portal_type().to_string(),
            id,
            arguments: self.settings.arguments.clone(),
            payload,
            check_constraints: self.settings.check_constraints,
            created: None,
        };

        let obj = self.kind.create_object(&request, platform)?;
        tracing::debug!(object = %obj.path, portal_type = %obj.portal_type, "content object created");
        Ok(obj)
    }

    fn after_create(&mut self, ctx: &FixtureContext, obj: &ContentRef) -> Result<(), BuilderError> {
        let platform = ctx.platform();

        if !self.settings.interfaces.is_empty() {
            platform.provide_interfaces(obj, &self.settings.interfaces)?;
            platform.reindex(obj, &["object_provides"])?;
        }

        self.change_workflow_state(platform, obj)?;

        for (field, value) in self.settings.dates() {
            platform.set_date(obj, field, value)?;
            platform.reindex(obj, field.indexes())?;
        }

        if self.session.auto_commit() {
            platform.commit()?;
        }
        Ok(())
    }

    fn type_name(&self) -> String {
        self.kind.portal_type().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::kind::ContentKind;
    use crate::platform::memory::MemoryPlatform;
    use chrono::TimeZone;
    use fixturekit_types::content::FieldSpec;

    fn setup() -> (FixtureContext, Arc<MemoryPlatform>) {
        let platform = Arc::new(MemoryPlatform::new());
        let ctx = FixtureContext::new(platform.clone());
        ctx.registry().register("folder", ContentKind::new("Folder"), false).unwrap();
        ctx.registry().register("file", ContentKind::file("File"), false).unwrap();
        ctx.sessions().begin();
        (ctx, platform)
    }

    #[test]
    fn test_default_container_is_site_and_id_is_type() {
        let (ctx, platform) = setup();
        let folder = ctx.create(ctx.builder("folder").unwrap()).unwrap();

        assert_eq!(folder.path, "/plone/folder");
        assert!(platform.object(&folder).is_some());
    }

    #[test]
    fn test_id_derived_from_title() {
        let (ctx, _platform) = setup();
        let folder = ctx
            .create(ctx.builder("folder").unwrap().titled("The Folder"))
            .unwrap();
        assert_eq!(folder.id(), "the-folder");
    }

    #[test]
    fn test_explicit_id_wins() {
        let (ctx, _platform) = setup();
        let folder = ctx
            .create(ctx.builder("folder").unwrap().titled("The Folder").having("id", "custom"))
            .unwrap();
        assert_eq!(folder.id(), "custom");
    }

    #[test]
    fn test_non_string_id_is_not_replaced() {
        let mut settings = ObjectSettings::default();
        settings.arguments.insert("title".to_string(), "The Folder".into());
        settings.arguments.insert("id".to_string(), 42.into());

        settings.ensure_id("Folder");
        assert_eq!(settings.arguments["id"], 42);
        assert_eq!(settings.id(), None);

        let mut fresh = ObjectSettings::default();
        fresh.ensure_id("Folder");
        assert_eq!(fresh.id(), Some("folder"));
    }

    #[test]
    fn test_last_having_wins() {
        let (ctx, platform) = setup();
        let builder = ctx
            .builder("folder")
            .unwrap()
            .having("title", "Foo")
            .having("title", "Bar");
        assert_eq!(builder.arguments()["title"], "Bar");

        let folder = ctx.create(builder).unwrap();
        assert_eq!(platform.object(&folder).unwrap().title(), Some("Bar"));
    }

    #[test]
    fn test_within_container() {
        let (ctx, _platform) = setup();
        let parent = ctx.create(ctx.builder("folder").unwrap().titled("Parent")).unwrap();
        let child = ctx
            .create(ctx.builder("folder").unwrap().titled("Child").within(parent.clone()))
            .unwrap();
        assert_eq!(child.path, "/plone/parent/child");
    }

    #[test]
    fn test_changing_workflow_state() {
        let (ctx, platform) = setup();
        platform.set_workflow_chain("Folder", &["simple_publication_workflow"]);

        let folder = ctx
            .create(ctx.builder("folder").unwrap().in_state("published"))
            .unwrap();
        let stored = platform.object(&folder).unwrap();
        assert_eq!(stored.review_state.as_deref(), Some("published"));
        assert_eq!(stored.role_mappings_updated, vec!["simple_publication_workflow"]);
        assert!(platform.reindexed(&folder).contains(&"allowedRolesAndUsers".to_string()));
    }

    #[test]
    fn test_workflow_state_without_workflow_fails() {
        let (ctx, _platform) = setup();
        let err = ctx
            .create(ctx.builder("folder").unwrap().in_state("published"))
            .unwrap_err();
        match err {
            BuilderError::WorkflowConfiguration { type_name, chain } => {
                assert_eq!(type_name, "Folder");
                assert!(chain.is_empty());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_workflow_state_with_two_workflows_fails() {
        let (ctx, platform) = setup();
        platform.set_workflow_chain("Folder", &["one", "two"]);
        let err = ctx
            .create(ctx.builder("folder").unwrap().in_state("published"))
            .unwrap_err();
        assert!(err.to_string().contains("\"Folder\""));
    }

    #[test]
    fn test_dates_are_set_and_reindexed() {
        let (ctx, platform) = setup();
        let modified = Utc.with_ymd_and_hms(2013, 1, 1, 0, 0, 0).unwrap();
        let effective = Utc.with_ymd_and_hms(2012, 6, 1, 12, 0, 0).unwrap();

        let folder = ctx
            .create(
                ctx.builder("folder")
                    .unwrap()
                    .with_modification_date(modified)
                    .with_effective_date(effective),
            )
            .unwrap();

        let stored = platform.object(&folder).unwrap();
        assert_eq!(stored.dates[&DateField::Modification], modified);
        assert_eq!(stored.dates[&DateField::Effective], effective);

        let reindexed = platform.reindexed(&folder);
        assert_eq!(reindexed.last().map(String::as_str), Some("modified"));
    }

    #[test]
    fn test_providing_interfaces() {
        let (ctx, platform) = setup();
        let folder = ctx
            .create(
                ctx.builder("folder")
                    .unwrap()
                    .providing("my.package.interfaces.IMarker")
                    .providing("my.package.interfaces.IMarker"),
            )
            .unwrap();
        let stored = platform.object(&folder).unwrap();
        assert_eq!(stored.interfaces, vec!["my.package.interfaces.IMarker"]);
        assert!(platform.reindexed(&folder).contains(&"object_provides".to_string()));
    }

    #[test]
    fn test_auto_commit() {
        let (ctx, platform) = setup();
        ctx.create(ctx.builder("folder").unwrap()).unwrap();
        assert_eq!(platform.commits(), 0);

        ctx.session().unwrap().set_auto_commit(true);
        ctx.create(ctx.builder("folder").unwrap()).unwrap();
        assert_eq!(platform.commits(), 1);
    }

    #[test]
    fn test_default_values_precedence() {
        let (ctx, platform) = setup();
        platform.set_schema(
            "Folder",
            vec![
                FieldSpec::new("language").with_default("en"),
                FieldSpec::new("subject").with_default("field"),
                FieldSpec::new("uid").with_default("readonly").readonly(),
                FieldSpec::new("description"),
            ],
        );
        platform.set_default_provider("subject", "provider");

        let folder = ctx.create(ctx.builder("folder").unwrap()).unwrap();
        let arguments = platform.object(&folder).unwrap().arguments;
        assert_eq!(arguments["language"], "en");
        assert_eq!(arguments["subject"], "provider");
        assert!(!arguments.contains_key("uid"));
        assert!(!arguments.contains_key("description"));
    }

    #[test]
    fn test_without_defaults() {
        let (ctx, platform) = setup();
        platform.set_schema("Folder", vec![FieldSpec::new("language").with_default("en")]);

        let folder = ctx.create(ctx.builder("folder").unwrap().without_defaults()).unwrap();
        assert!(!platform.object(&folder).unwrap().arguments.contains_key("language"));
    }

    #[test]
    fn test_file_payload() {
        let (ctx, platform) = setup();
        let file = ctx
            .create(ctx.builder("file").unwrap().with_dummy_content())
            .unwrap();
        let (field, payload) = platform.object(&file).unwrap().payload.unwrap();
        assert_eq!(field, "file");
        assert_eq!(payload.filename, "test.doc");
        assert_eq!(payload.data, b"Test data");
    }

    #[test]
    fn test_constraints() {
        let (ctx, platform) = setup();
        platform.allow_types("Plone Site", &["Document"]);

        assert!(ctx.create(ctx.builder("folder").unwrap()).is_ok());
        let err = ctx
            .create(ctx.builder("folder").unwrap().with_constraints())
            .unwrap_err();
        assert!(matches!(err, BuilderError::Platform(_)));
    }
}
