//! Content kinds: the per-type strategy behind [`ObjectBuilder`].
//!
//! The registry maps builder names to kinds. A kind decides the platform type,
//! how the id is derived and how the object is handed to the platform; the
//! shared configuration (arguments, workflow state, dates, interfaces) lives in
//! the object builder.
//!
//! [`ObjectBuilder`]: super::ObjectBuilder

use fixturekit_types::content::{ContentRef, CreateRequest};
use fixturekit_types::error::BuilderError;

use super::object::ObjectSettings;
use crate::platform::Platform;
use crate::registry::BuilderRegistry;

/// Smallest valid GIF, used as dummy image data.
const DUMMY_GIF: &[u8] = b"GIF89a\x01\x00\x01\x00\x80\x00\x00\x00\x00\x00\x00\x00\x00!\xf9\x04\x04\x00\x00\x00\x00,\x00\x00\x00\x00\x01\x00\x01\x00\x00\x02\x02D\x01\x00;";

/// Strategy for one kind of content object.
pub trait BuilderKind: Send + Sync {
    /// Platform type created by this kind.
    fn portal_type(&self) -> &str;

    /// Type identity reported by the registry.
    fn type_name(&self) -> String {
        std::any::type_name::<Self>().to_string()
    }

    /// Field holding attached files, for file-like kinds.
    fn payload_field(&self) -> Option<&str> {
        None
    }

    /// Filename used when a payload is attached without one.
    fn default_filename(&self) -> &str {
        "test.doc"
    }

    /// Content attached by `with_dummy_content`.
    fn dummy_content(&self) -> &[u8] {
        b"Test data"
    }

    /// Derive defaults before creation. Picks the id by default.
    fn before_create(&self, settings: &mut ObjectSettings) -> Result<(), BuilderError> {
        settings.ensure_id(self.portal_type());
        Ok(())
    }

    /// Hand the prepared request to the platform.
    fn create_object(
        &self,
        request: &CreateRequest,
        platform: &dyn Platform,
    ) -> Result<ContentRef, BuilderError> {
        Ok(platform.create_content(request)?)
    }
}

/// A plain content kind, configured by value.
#[derive(Debug, Clone)]
pub struct ContentKind {
    portal_type: String,
    payload_field: Option<String>,
    default_filename: String,
    dummy_content: Vec<u8>,
}

impl ContentKind {
    pub fn new(portal_type: impl Into<String>) -> Self {
        Self {
            portal_type: portal_type.into(),
            payload_field: None,
            default_filename: "test.doc".to_string(),
            dummy_content: b"Test data".to_vec(),
        }
    }

    /// A file-like kind storing payloads in `file`.
    pub fn file(portal_type: impl Into<String>) -> Self {
        Self {
            payload_field: Some("file".to_string()),
            ..Self::new(portal_type)
        }
    }

    /// An image kind storing payloads in `image`.
    pub fn image(portal_type: impl Into<String>) -> Self {
        Self {
            payload_field: Some("image".to_string()),
            default_filename: "image.gif".to_string(),
            dummy_content: DUMMY_GIF.to_vec(),
            ..Self::new(portal_type)
        }
    }
}

impl BuilderKind for ContentKind {
    fn portal_type(&self) -> &str {
        &self.portal_type
    }

    fn type_name(&self) -> String {
        format!("ContentKind({})", self.portal_type)
    }

    fn payload_field(&self) -> Option<&str> {
        self.payload_field.as_deref()
    }

    fn default_filename(&self) -> &str {
        &self.default_filename
    }

    fn dummy_content(&self) -> &[u8] {
        &self.dummy_content
    }
}

/// Register the standard content builders.
///
/// `page` and `document` share the `Document` kind, `collection` and `topic`
/// share `Collection`. Pass `force` to replace existing registrations, e.g.
/// inside [`BuilderRegistry::scoped`].
pub fn register_content_builders(registry: &BuilderRegistry, force: bool) -> Result<(), BuilderError> {
    registry.register("folder", ContentKind::new("Folder"), force)?;
    registry.register("page", ContentKind::new("Document"), force)?;
    registry.register("document", ContentKind::new("Document"), force)?;
    registry.register("file", ContentKind::file("File"), force)?;
    registry.register("image", ContentKind::image("Image"), force)?;
    registry.register("collection", ContentKind::new("Collection"), force)?;
    registry.register("topic", ContentKind::new("Collection"), force)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_content_builders() {
        let registry = BuilderRegistry::new();
        register_content_builders(&registry, false).unwrap();

        assert_eq!(registry.get("page").unwrap().portal_type(), "Document");
        assert_eq!(registry.get("topic").unwrap().portal_type(), "Collection");
        assert_eq!(registry.get("image").unwrap().payload_field(), Some("image"));
        assert_eq!(registry.names().len(), 7);

        // A second registration without force collides.
        assert!(register_content_builders(&registry, false).is_err());
        register_content_builders(&registry, true).unwrap();
    }

    #[test]
    fn test_content_kind_identity() {
        assert_eq!(ContentKind::new("Folder").type_name(), "ContentKind(Folder)");
    }

    #[test]
    fn test_image_defaults() {
        let kind = ContentKind::image("Image");
        assert_eq!(kind.default_filename(), "image.gif");
        assert!(kind.dummy_content().starts_with(b"GIF89a"));
    }
}
