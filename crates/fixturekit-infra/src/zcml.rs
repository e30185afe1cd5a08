//! Builder for ZCML configuration files.
//!
//! A [`ZcmlBuilder`] is a shared handle: clones edit the same document, which
//! lets a package hand its `configure.zcml` to profiles and upgrade steps
//! before the file location is known. Includes and lazy nodes are resolved
//! only when the document is generated, so an included builder may receive
//! its path after the include was declared.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex};

use fixturekit_core::{Builder, FixtureContext};
use fixturekit_types::error::BuilderError;

use crate::filesystem;
use crate::xml::Element;

/// Default namespace of every ZCML document.
pub const ZOPE_NAMESPACE: &str = "http://namespaces.zope.org/zope";

/// Namespace prefixes usable in tag names such as `genericsetup:registerProfile`.
pub const KNOWN_NAMESPACES: &[(&str, &str)] = &[
    ("browser", "http://namespaces.zope.org/browser"),
    ("five", "http://namespaces.zope.org/five"),
    ("genericsetup", "http://namespaces.zope.org/genericsetup"),
    ("grok", "http://namespaces.zope.org/grok"),
    ("i18n", "http://namespaces.zope.org/i18n"),
    ("inflator", "http://namespaces.zope.org/inflator"),
    ("lawgiver", "http://namespaces.zope.org/lawgiver"),
    ("meta", "http://namespaces.zope.org/meta"),
    ("monkey", "http://namespaces.plone.org/monkey"),
    ("plone", "http://namespaces.plone.org/plone"),
    ("profilehook", "http://namespaces.zope.org/profilehook"),
    ("transmogrifier", "http://namespaces.plone.org/transmogrifier"),
    ("upgrade-step", "http://namespaces.zope.org/ftw.upgrade"),
    ("zcml", "http://namespaces.zope.org/zcml"),
];

fn namespace_url(prefix: &str) -> Option<&'static str> {
    KNOWN_NAMESPACES
        .iter()
        .find(|(known, _)| *known == prefix)
        .map(|(_, url)| *url)
}

/// Prefix for a namespace URL: the known one, else the last path segment.
fn namespace_prefix(url: &str) -> String {
    let trimmed = url.trim_end_matches('/');
    KNOWN_NAMESPACES
        .iter()
        .find(|(_, known)| *known == url || known.trim_end_matches('/') == trimmed)
        .map(|(prefix, _)| prefix.to_string())
        .unwrap_or_else(|| trimmed.rsplit('/').next().unwrap_or(trimmed).to_string())
}

/// Handle of a node, usable as parent for further nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// Target of an `<include>`.
#[derive(Clone)]
pub enum Include {
    /// A package by dotted name; `"."` means the current package.
    Package(String),
    /// A file of the current package.
    File(String),
    PackageFile { package: String, file: String },
    /// Another ZCML builder, located relative to this one at generate time.
    Builder(ZcmlBuilder),
}

impl Include {
    pub fn file(file: impl Into<String>) -> Self {
        Include::File(file.into())
    }

    pub fn package_file(package: impl Into<String>, file: impl Into<String>) -> Self {
        Include::PackageFile {
            package: package.into(),
            file: file.into(),
        }
    }
}

impl From<&str> for Include {
    fn from(package: &str) -> Self {
        Include::Package(package.to_string())
    }
}

impl From<String> for Include {
    fn from(package: String) -> Self {
        Include::Package(package)
    }
}

impl From<ZcmlBuilder> for Include {
    fn from(builder: ZcmlBuilder) -> Self {
        Include::Builder(builder)
    }
}

impl From<&ZcmlBuilder> for Include {
    fn from(builder: &ZcmlBuilder) -> Self {
        Include::Builder(builder.clone())
    }
}

impl fmt::Debug for Include {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Include::Package(package) => f.debug_tuple("Package").field(package).finish(),
            Include::File(file) => f.debug_tuple("File").field(file).finish(),
            Include::PackageFile { package, file } => f
                .debug_struct("PackageFile")
                .field("package", package)
                .field("file", file)
                .finish(),
            Include::Builder(builder) => f.debug_tuple("Builder").field(&builder.path()).finish(),
        }
    }
}

/// Tag name and attributes produced by a lazy node.
pub type LazyNode = (String, Vec<(String, String)>);

type LazyNodeFn = Arc<dyn Fn() -> Result<LazyNode, BuilderError> + Send + Sync>;

#[derive(Debug, Clone)]
struct QName {
    prefix: Option<String>,
    local: String,
}

impl QName {
    fn render(&self) -> String {
        match &self.prefix {
            Some(prefix) => format!("{prefix}:{}", self.local),
            None => self.local.clone(),
        }
    }
}

enum NodeKind {
    Element {
        tag: QName,
        attributes: BTreeMap<String, String>,
    },
    Include(Include),
    Lazy(LazyNodeFn),
}

struct Node {
    kind: NodeKind,
    children: Vec<NodeId>,
}

/// Resolved form of a deferred node.
enum Pending {
    Include(Include),
    Lazy(LazyNodeFn),
}

#[derive(Default)]
struct Document {
    path: Option<PathBuf>,
    namespaces: BTreeMap<String, String>,
    root_attributes: BTreeMap<String, String>,
    nodes: Vec<Node>,
    root_children: Vec<NodeId>,
    /// First declaration problem, reported by `generate`.
    invalid: Option<String>,
}

impl Document {
    fn load_namespace(&mut self, prefix: &str, url: &str) {
        match self.namespaces.get(prefix) {
            Some(existing) if existing != url => {
                self.invalid.get_or_insert_with(|| {
                    format!(
                        "invalid prefix \"{prefix}\" for url \"{url}\": already bound to \"{existing}\""
                    )
                });
            }
            Some(_) => {}
            None => {
                self.namespaces.insert(prefix.to_string(), url.to_string());
            }
        }
    }

    /// Split a tag into prefix and local name, loading its namespace.
    ///
    /// Accepts `name`, `prefix:name` for known prefixes and `{url}name`.
    fn resolve_tag(&mut self, tag: &str) -> QName {
        if let Some(rest) = tag.strip_prefix('{') {
            if let Some((url, local)) = rest.split_once('}') {
                if url == ZOPE_NAMESPACE {
                    return QName {
                        prefix: None,
                        local: local.to_string(),
                    };
                }
                let prefix = namespace_prefix(url);
                self.load_namespace(&prefix, url);
                return QName {
                    prefix: Some(prefix),
                    local: local.to_string(),
                };
            }
        }

        if let Some((prefix, local)) = tag.split_once(':') {
            match namespace_url(prefix) {
                Some(url) => self.load_namespace(prefix, url),
                None => {
                    self.invalid
                        .get_or_insert_with(|| format!("unknown namespace prefix \"{prefix}\""));
                }
            }
            return QName {
                prefix: Some(prefix.to_string()),
                local: local.to_string(),
            };
        }

        QName {
            prefix: None,
            local: tag.to_string(),
        }
    }

    fn add(&mut self, kind: NodeKind, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            kind,
            children: Vec::new(),
        });
        match parent.and_then(|parent| self.nodes.get_mut(parent.0)) {
            Some(parent) => parent.children.push(id),
            None => self.root_children.push(id),
        }
        id
    }

    fn pending(&self) -> Vec<(NodeId, Pending)> {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(index, node)| match &node.kind {
                NodeKind::Include(include) => Some((NodeId(index), Pending::Include(include.clone()))),
                NodeKind::Lazy(callback) => Some((NodeId(index), Pending::Lazy(Arc::clone(callback)))),
                NodeKind::Element { .. } => None,
            })
            .collect()
    }

    fn element(&self, id: NodeId, resolved: &BTreeMap<NodeId, (QName, BTreeMap<String, String>)>) -> Element {
        let node = &self.nodes[id.0];
        let (tag, attributes) = match &node.kind {
            NodeKind::Element { tag, attributes } => (tag, attributes),
            NodeKind::Include(_) | NodeKind::Lazy(_) => {
                let (tag, attributes) = &resolved[&id];
                (tag, attributes)
            }
        };

        let mut element = Element::new(tag.render());
        for (name, value) in attributes {
            element = element.with_attribute(name.clone(), value.clone());
        }
        for child in &node.children {
            element.push(self.element(*child, resolved));
        }
        element
    }
}

/// Builds one ZCML file.
#[derive(Clone, Default)]
pub struct ZcmlBuilder {
    document: Arc<Mutex<Document>>,
}

impl ZcmlBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn document(&self) -> std::sync::MutexGuard<'_, Document> {
        self.document.lock().expect("zcml document lock poisoned")
    }

    /// Whether both handles edit the same document.
    pub fn is_same(&self, other: &ZcmlBuilder) -> bool {
        Arc::ptr_eq(&self.document, &other.document)
    }

    pub fn at_path(self, path: impl Into<PathBuf>) -> Self {
        self.set_path(path);
        self
    }

    pub fn set_path(&self, path: impl Into<PathBuf>) {
        self.document().path = Some(path.into());
    }

    pub fn path(&self) -> Option<PathBuf> {
        self.document().path.clone()
    }

    /// Set the `i18n_domain` of the root element.
    pub fn with_i18n_domain(self, domain: impl Into<String>) -> Self {
        self.set_i18n_domain(domain);
        self
    }

    pub fn set_i18n_domain(&self, domain: impl Into<String>) {
        let mut document = self.document();
        document.load_namespace("i18n", namespace_url("i18n").unwrap_or_default());
        document
            .root_attributes
            .insert("i18n_domain".to_string(), domain.into());
    }

    /// Declare a namespace on the root element. Without `url` the prefix
    /// must be a known one.
    pub fn load_namespace(&self, prefix: &str, url: Option<&str>) {
        let mut document = self.document();
        match url.or_else(|| namespace_url(prefix)) {
            Some(url) => document.load_namespace(prefix, url),
            None => {
                document
                    .invalid
                    .get_or_insert_with(|| format!("unknown namespace prefix \"{prefix}\""));
            }
        }
    }

    /// Add a node and return its handle. Without `parent` it is appended to
    /// the root element.
    pub fn create_node(&self, tag: &str, parent: Option<NodeId>, attributes: &[(&str, &str)]) -> NodeId {
        let mut document = self.document();
        let tag = document.resolve_tag(tag);
        let attributes = attributes
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();
        document.add(NodeKind::Element { tag, attributes }, parent)
    }

    pub fn with_node(self, tag: &str, attributes: &[(&str, &str)]) -> Self {
        self.create_node(tag, None, attributes);
        self
    }

    pub fn with_node_in(self, parent: NodeId, tag: &str, attributes: &[(&str, &str)]) -> Self {
        self.create_node(tag, Some(parent), attributes);
        self
    }

    /// Add a placeholder whose tag and attributes come from `callback` when
    /// the document is generated.
    pub fn add_lazy_node(
        &self,
        callback: impl Fn() -> Result<LazyNode, BuilderError> + Send + Sync + 'static,
        parent: Option<NodeId>,
    ) -> NodeId {
        self.document().add(NodeKind::Lazy(Arc::new(callback)), parent)
    }

    pub fn with_lazy_node(
        self,
        callback: impl Fn() -> Result<LazyNode, BuilderError> + Send + Sync + 'static,
        parent: Option<NodeId>,
    ) -> Self {
        self.add_lazy_node(callback, parent);
        self
    }

    pub fn add_include(&self, include: impl Into<Include>, parent: Option<NodeId>) -> NodeId {
        self.document().add(NodeKind::Include(include.into()), parent)
    }

    pub fn include(self, include: impl Into<Include>) -> Self {
        self.add_include(include, None);
        self
    }

    pub fn include_in(self, parent: NodeId, include: impl Into<Include>) -> Self {
        self.add_include(include, Some(parent));
        self
    }

    /// Dotted name of `path` relative to the directory of this file, with
    /// `postfix` segments appended. A trailing `.py` is dropped, e.g.
    /// `browser/views.py` + `EditView` gives `.browser.views.EditView`.
    pub fn get_relative_dottedname(&self, path: &Path, postfix: &[&str]) -> Result<String, BuilderError> {
        let base = self.path();
        relative_dottedname(base.as_deref(), path, postfix)
    }

    /// Render the document.
    pub fn generate(&self) -> Result<String, BuilderError> {
        let (base, pending) = {
            let document = self.document();
            (document.path.clone(), document.pending())
        };

        // Callbacks and included builders run without our lock held.
        let mut evaluated = Vec::with_capacity(pending.len());
        for (id, pending) in pending {
            let (tag, attributes) = match pending {
                Pending::Include(include) => ("include".to_string(), include_attributes(base.as_deref(), &include)?),
                Pending::Lazy(callback) => callback()?,
            };
            evaluated.push((id, tag, attributes));
        }

        let mut document = self.document();
        let mut resolved = BTreeMap::new();
        for (id, tag, attributes) in evaluated {
            let tag = document.resolve_tag(&tag);
            resolved.insert(id, (tag, attributes.into_iter().collect()));
        }

        if let Some(problem) = &document.invalid {
            return Err(BuilderError::InvalidDeclaration(problem.clone()));
        }

        let mut root = Element::new("configure").with_namespace(None, ZOPE_NAMESPACE);
        for (prefix, url) in &document.namespaces {
            root = root.with_namespace(Some(prefix), url.clone());
        }
        for (name, value) in &document.root_attributes {
            root = root.with_attribute(name.clone(), value.clone());
        }
        for child in &document.root_children {
            root.push(document.element(*child, &resolved));
        }
        Ok(root.render())
    }
}

fn include_attributes(base: Option<&Path>, include: &Include) -> Result<Vec<(String, String)>, BuilderError> {
    let mut attributes = Vec::new();
    match include {
        Include::Package(package) => {
            if package != "." {
                attributes.push(("package".to_string(), package.clone()));
            }
        }
        Include::File(file) => attributes.push(("file".to_string(), file.clone())),
        Include::PackageFile { package, file } => {
            attributes.push(("package".to_string(), package.clone()));
            attributes.push(("file".to_string(), file.clone()));
        }
        Include::Builder(builder) => {
            let path = builder.path().ok_or_else(|| {
                BuilderError::MissingConfiguration(
                    "included zcml builder has no path; use at_path()".to_string(),
                )
            })?;
            let directory = path.parent().unwrap_or(Path::new(""));
            let package = relative_dottedname(base, directory, &[])?;
            if package != "." {
                attributes.push(("package".to_string(), package));
            }
            let filename = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            if filename != "configure.zcml" {
                attributes.push(("file".to_string(), filename));
            }
        }
    }
    Ok(attributes)
}

fn relative_dottedname(zcml_path: Option<&Path>, path: &Path, postfix: &[&str]) -> Result<String, BuilderError> {
    let base = zcml_path.and_then(Path::parent).ok_or_else(|| {
        BuilderError::MissingConfiguration("zcml builder has no path; use at_path()".to_string())
    })?;
    let relative = path.strip_prefix(base).map_err(|_| {
        BuilderError::InvalidDeclaration(format!(
            "{} is not within {}",
            path.display(),
            base.display()
        ))
    })?;

    let mut segments: Vec<String> = relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(segment) => Some(segment.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();

    if let Some(last) = segments.last_mut() {
        if let Some(stem) = last.strip_suffix(".py") {
            *last = stem.to_string();
        }
        if last.contains('.') {
            return Err(BuilderError::InvalidDeclaration(format!(
                "unsupported filename extension: {last}"
            )));
        }
    }

    segments.extend(postfix.iter().map(|segment| segment.to_string()));
    if segments.is_empty() {
        Ok(".".to_string())
    } else {
        Ok(format!(".{}", segments.join(".")))
    }
}

impl Builder for ZcmlBuilder {
    type Output = PathBuf;

    fn before_create(&mut self, _ctx: &FixtureContext) -> Result<(), BuilderError> {
        if self.path().is_none() {
            return Err(BuilderError::MissingConfiguration(
                "zcml builder requires a path; use at_path()".to_string(),
            ));
        }
        Ok(())
    }

    fn create_object(&mut self, _ctx: &FixtureContext) -> Result<PathBuf, BuilderError> {
        let path = self.path().ok_or_else(|| {
            BuilderError::MissingConfiguration("zcml builder requires a path; use at_path()".to_string())
        })?;
        let zcml = self.generate()?;
        if let Some(parent) = path.parent() {
            filesystem::create_dir_all(parent)?;
        }
        filesystem::write_file(&path, zcml)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn lines(lines: &[&str]) -> String {
        format!("{}\n", lines.join("\n"))
    }

    #[test]
    fn test_build_zcml_file_at_path() {
        fixturekit_observe::tracing_setup::init_test_tracing();
        let tmp = TempDir::new().unwrap();
        let ctx = FixtureContext::in_memory();
        let path = tmp.path().join("fancy.zcml");

        let created = ctx.create(ZcmlBuilder::new().at_path(&path)).unwrap();
        assert_eq!(created, path);
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "<configure xmlns=\"http://namespaces.zope.org/zope\"/>\n"
        );
    }

    #[test]
    fn test_create_requires_path() {
        let ctx = FixtureContext::in_memory();
        let err = ctx.create(ZcmlBuilder::new()).unwrap_err();
        assert!(matches!(err, BuilderError::MissingConfiguration(_)));
    }

    #[test]
    fn test_add_node() {
        let builder = ZcmlBuilder::new().with_node("include", &[("package", "foo.bar")]);
        assert_eq!(
            builder.generate().unwrap(),
            lines(&[
                "<configure xmlns=\"http://namespaces.zope.org/zope\">",
                "  <include package=\"foo.bar\"/>",
                "</configure>",
            ])
        );
    }

    #[test]
    fn test_known_namespace_by_prefix() {
        let builder = ZcmlBuilder::new()
            .with_node("include", &[("package", "foo.bar")])
            .with_node("genericsetup:registerProfile", &[("name", "default")]);
        assert_eq!(
            builder.generate().unwrap(),
            lines(&[
                "<configure xmlns=\"http://namespaces.zope.org/zope\" xmlns:genericsetup=\"http://namespaces.zope.org/genericsetup\">",
                "  <include package=\"foo.bar\"/>",
                "  <genericsetup:registerProfile name=\"default\"/>",
                "</configure>",
            ])
        );
    }

    #[test]
    fn test_unknown_namespace_by_url() {
        let builder = ZcmlBuilder::new().with_node("{http://namespaces.zope.org/foobar}doit", &[]);
        assert_eq!(
            builder.generate().unwrap(),
            lines(&[
                "<configure xmlns=\"http://namespaces.zope.org/zope\" xmlns:foobar=\"http://namespaces.zope.org/foobar\">",
                "  <foobar:doit/>",
                "</configure>",
            ])
        );
    }

    #[test]
    fn test_namespace_url_with_trailing_slash() {
        assert_eq!(namespace_prefix("http://namespaces.example.org/widgets/"), "widgets");
        let builder = ZcmlBuilder::new().with_node("{http://namespaces.zope.org/foobar/}doit", &[]);
        let zcml = builder.generate().unwrap();
        assert!(zcml.contains("xmlns:foobar=\"http://namespaces.zope.org/foobar/\""));
        assert!(zcml.contains("<foobar:doit/>"));
        assert!(!zcml.contains("xmlns:="));
    }

    #[test]
    fn test_unknown_prefix_is_reported_on_generate() {
        let builder = ZcmlBuilder::new().with_node("nope:thing", &[]);
        assert!(matches!(
            builder.generate(),
            Err(BuilderError::InvalidDeclaration(_))
        ));
    }

    #[test]
    fn test_conflicting_prefix_is_reported() {
        let builder = ZcmlBuilder::new();
        builder.load_namespace("browser", Some("http://example.com/browser"));
        let builder = builder.with_node("browser:page", &[]);
        let err = builder.generate().unwrap_err();
        assert!(err.to_string().contains("\"browser\""));
    }

    #[test]
    fn test_include_package() {
        let builder = ZcmlBuilder::new()
            .include(Include::package_file("Products.GenericSetup", "meta.zcml"))
            .include("Products.CMFPlone")
            .include(Include::file("profiles.zcml"));
        assert_eq!(
            builder.generate().unwrap(),
            lines(&[
                "<configure xmlns=\"http://namespaces.zope.org/zope\">",
                "  <include file=\"meta.zcml\" package=\"Products.GenericSetup\"/>",
                "  <include package=\"Products.CMFPlone\"/>",
                "  <include file=\"profiles.zcml\"/>",
                "</configure>",
            ])
        );
    }

    #[test]
    fn test_include_builder_in_same_directory() {
        let tmp = TempDir::new().unwrap();
        let configure = ZcmlBuilder::new()
            .at_path(tmp.path().join("configure.zcml"))
            .include(ZcmlBuilder::new().at_path(tmp.path().join("profiles.zcml")));
        assert_eq!(
            configure.generate().unwrap(),
            lines(&[
                "<configure xmlns=\"http://namespaces.zope.org/zope\">",
                "  <include file=\"profiles.zcml\"/>",
                "</configure>",
            ])
        );
    }

    #[test]
    fn test_include_builder_in_sub_package() {
        let tmp = TempDir::new().unwrap();
        let configure = ZcmlBuilder::new()
            .at_path(tmp.path().join("configure.zcml"))
            .include(ZcmlBuilder::new().at_path(tmp.path().join("browser").join("configure.zcml")))
            .include(ZcmlBuilder::new().at_path(tmp.path().join("zcml").join("meta.zcml")));
        assert_eq!(
            configure.generate().unwrap(),
            lines(&[
                "<configure xmlns=\"http://namespaces.zope.org/zope\">",
                "  <include package=\".browser\"/>",
                "  <include file=\"meta.zcml\" package=\".zcml\"/>",
                "</configure>",
            ])
        );
    }

    #[test]
    fn test_inclusion_does_not_use_path_too_early() {
        let tmp = TempDir::new().unwrap();
        let main = ZcmlBuilder::new();
        let sub = ZcmlBuilder::new();
        main.add_include(&sub, None);

        main.set_path(tmp.path().join("configure.zcml"));
        sub.set_path(tmp.path().join("browser").join("configure.zcml"));

        assert_eq!(
            main.generate().unwrap(),
            lines(&[
                "<configure xmlns=\"http://namespaces.zope.org/zope\">",
                "  <include package=\".browser\"/>",
                "</configure>",
            ])
        );
    }

    #[test]
    fn test_get_relative_dottedname() {
        let tmp = TempDir::new().unwrap();
        let builder = ZcmlBuilder::new().at_path(tmp.path().join("configure.zcml"));
        assert_eq!(
            builder
                .get_relative_dottedname(&tmp.path().join("browser").join("views.py"), &["EditView"])
                .unwrap(),
            ".browser.views.EditView"
        );
        assert!(matches!(
            builder.get_relative_dottedname(&tmp.path().join("style.css"), &[]),
            Err(BuilderError::InvalidDeclaration(_))
        ));
    }

    #[test]
    fn test_i18n_domain() {
        let builder = ZcmlBuilder::new().with_i18n_domain("my.package");
        assert_eq!(
            builder.generate().unwrap(),
            "<configure xmlns=\"http://namespaces.zope.org/zope\" xmlns:i18n=\"http://namespaces.zope.org/i18n\" i18n_domain=\"my.package\"/>\n"
        );
    }

    #[test]
    fn test_nested_structures() {
        let builder = ZcmlBuilder::new();
        let condition = builder.create_node("configure", None, &[("condition", "installed foobar")]);
        builder.add_include("foobar", Some(condition));
        builder.create_node("something", Some(condition), &[]);

        assert_eq!(
            builder.generate().unwrap(),
            lines(&[
                "<configure xmlns=\"http://namespaces.zope.org/zope\">",
                "  <configure condition=\"installed foobar\">",
                "    <include package=\"foobar\"/>",
                "    <something/>",
                "  </configure>",
                "</configure>",
            ])
        );
    }

    #[test]
    fn test_lazy_node() {
        let builder = ZcmlBuilder::new().with_lazy_node(
            || Ok(("five:registerPackage".to_string(), vec![("package".to_string(), ".".to_string())])),
            None,
        );
        assert_eq!(
            builder.generate().unwrap(),
            lines(&[
                "<configure xmlns=\"http://namespaces.zope.org/zope\" xmlns:five=\"http://namespaces.zope.org/five\">",
                "  <five:registerPackage package=\".\"/>",
                "</configure>",
            ])
        );
    }
}
