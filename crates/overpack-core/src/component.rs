use overpack_mdl::{parse, to_mdl_string, Document, MdlError, Node};
use overpack_schema::{Checksum, EntryDescriptor, EntryKind, EntryPath};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Declared identity of a component: its type plus its name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ComponentId {
    pub component_type: String,
    pub name: String,
}

impl ComponentId {
    pub fn new(component_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            component_type: component_type.into(),
            name: name.into(),
        }
    }

    /// Parse `Type.name`, splitting at the first dot.
    pub fn parse(s: &str) -> Option<Self> {
        let (component_type, name) = s.split_once('.')?;
        if component_type.is_empty() || name.is_empty() {
            return None;
        }
        Some(Self::new(component_type, name))
    }

    pub fn of(descriptor: &EntryDescriptor) -> Self {
        Self::new(&descriptor.entry_type, &descriptor.name)
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.component_type, self.name)
    }
}

#[derive(Debug, Error)]
#[error("failed to load component {id} from '{path}': {cause}")]
pub struct ComponentLoadError {
    pub id: ComponentId,
    pub path: String,
    #[source]
    pub cause: ComponentLoadCause,
}

#[derive(Debug, Error)]
pub enum ComponentLoadCause {
    #[error("payload is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("{0}")]
    Mdl(#[from] MdlError),
    #[error("entry kind '{0}' does not describe a component")]
    NotAComponent(EntryKind),
}

/// A component whose payload is MDL text. The tree is authoritative; the
/// hash of the loaded bytes is kept only to detect drift.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigurationComponent {
    pub path: EntryPath,
    pub name: String,
    pub component_type: String,
    pub document: Document,
    source_hash: Checksum,
}

impl ConfigurationComponent {
    pub fn new(component_type: &str, name: &str, document: Document) -> Self {
        let source_hash = Checksum::of(to_mdl_string(&document).as_bytes());
        Self {
            path: default_path(component_type, name, "mdl"),
            name: name.to_owned(),
            component_type: component_type.to_owned(),
            document,
            source_hash,
        }
    }

    /// Parse `source` and remember its hash.
    pub fn parse(component_type: &str, name: &str, source: &str) -> Result<Self, MdlError> {
        let mut component = Self::new(component_type, name, parse(source)?);
        component.source_hash = Checksum::of(source.as_bytes());
        Ok(component)
    }

    #[must_use]
    pub fn with_path(mut self, path: impl Into<EntryPath>) -> Self {
        self.path = path.into();
        self
    }

    pub fn id(&self) -> ComponentId {
        ComponentId::new(&self.component_type, &self.name)
    }

    /// Slash-separated structural lookup, e.g. `fields/Status__c/label`.
    pub fn lookup(&self, path: &str) -> Option<Node<'_>> {
        self.document.lookup_path(path)
    }

    pub fn to_mdl(&self) -> String {
        to_mdl_string(&self.document)
    }

    pub fn source_hash(&self) -> &Checksum {
        &self.source_hash
    }

    /// Whether the canonical rendering of the tree differs from the loaded bytes.
    pub fn has_drift(&self) -> bool {
        Checksum::of(self.to_mdl().as_bytes()) != self.source_hash
    }
}

/// A component carried as opaque bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataComponent {
    pub path: EntryPath,
    pub name: String,
    pub component_type: String,
    pub payload: Vec<u8>,
}

impl DataComponent {
    pub fn new(component_type: &str, name: &str, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            path: default_path(component_type, name, "dat"),
            name: name.to_owned(),
            component_type: component_type.to_owned(),
            payload: payload.into(),
        }
    }

    #[must_use]
    pub fn with_path(mut self, path: impl Into<EntryPath>) -> Self {
        self.path = path.into();
        self
    }

    pub fn id(&self) -> ComponentId {
        ComponentId::new(&self.component_type, &self.name)
    }

    pub fn checksum(&self) -> Checksum {
        Checksum::of(&self.payload)
    }
}

fn default_path(component_type: &str, name: &str, extension: &str) -> EntryPath {
    EntryPath::new(format!("components/{component_type}.{name}.{extension}"))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Component {
    Configuration(ConfigurationComponent),
    Data(DataComponent),
}

impl Component {
    /// Build a component from a manifest descriptor and its payload.
    ///
    /// Routing uses only `descriptor.kind`; the path's extension is ignored.
    pub fn from_entry(
        descriptor: &EntryDescriptor,
        bytes: &[u8],
    ) -> Result<Self, ComponentLoadError> {
        let fail = |cause: ComponentLoadCause| ComponentLoadError {
            id: ComponentId::of(descriptor),
            path: descriptor.path.to_string(),
            cause,
        };
        match descriptor.kind {
            EntryKind::Configuration => {
                let source = std::str::from_utf8(bytes).map_err(|e| fail(e.into()))?;
                let component =
                    ConfigurationComponent::parse(&descriptor.entry_type, &descriptor.name, source)
                        .map_err(|e| fail(e.into()))?;
                Ok(Self::Configuration(
                    component.with_path(descriptor.path.clone()),
                ))
            }
            EntryKind::Data => Ok(Self::Data(
                DataComponent::new(&descriptor.entry_type, &descriptor.name, bytes)
                    .with_path(descriptor.path.clone()),
            )),
            EntryKind::Code => Err(fail(ComponentLoadCause::NotAComponent(descriptor.kind))),
        }
    }

    /// Payload bytes as they are written to the archive.
    pub fn to_entry(&self) -> Vec<u8> {
        match self {
            Self::Configuration(c) => c.to_mdl().into_bytes(),
            Self::Data(d) => d.payload.clone(),
        }
    }

    /// Fresh descriptor for the current state; the index is assigned by the manifest.
    pub fn descriptor(&self) -> EntryDescriptor {
        EntryDescriptor::for_payload(
            self.path().clone(),
            self.kind(),
            self.component_type(),
            self.name(),
            &self.to_entry(),
        )
    }

    pub fn id(&self) -> ComponentId {
        ComponentId::new(self.component_type(), self.name())
    }

    pub fn kind(&self) -> EntryKind {
        match self {
            Self::Configuration(_) => EntryKind::Configuration,
            Self::Data(_) => EntryKind::Data,
        }
    }

    pub fn path(&self) -> &EntryPath {
        match self {
            Self::Configuration(c) => &c.path,
            Self::Data(d) => &d.path,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Configuration(c) => &c.name,
            Self::Data(d) => &d.name,
        }
    }

    pub fn component_type(&self) -> &str {
        match self {
            Self::Configuration(c) => &c.component_type,
            Self::Data(d) => &d.component_type,
        }
    }

    pub fn document(&self) -> Option<&Document> {
        match self {
            Self::Configuration(c) => Some(&c.document),
            Self::Data(_) => None,
        }
    }

    pub fn as_configuration(&self) -> Option<&ConfigurationComponent> {
        match self {
            Self::Configuration(c) => Some(c),
            Self::Data(_) => None,
        }
    }

    pub fn as_configuration_mut(&mut self) -> Option<&mut ConfigurationComponent> {
        match self {
            Self::Configuration(c) => Some(c),
            Self::Data(_) => None,
        }
    }

    pub fn as_data(&self) -> Option<&DataComponent> {
        match self {
            Self::Data(d) => Some(d),
            Self::Configuration(_) => None,
        }
    }
}

impl From<ConfigurationComponent> for Component {
    fn from(c: ConfigurationComponent) -> Self {
        Self::Configuration(c)
    }
}

impl From<DataComponent> for Component {
    fn from(d: DataComponent) -> Self {
        Self::Data(d)
    }
}
