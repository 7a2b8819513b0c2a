use overpack_schema::{Checksum, EntryDescriptor, EntryKind, EntryPath};

/// A bundled code artifact. The payload is never interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeEntry {
    pub name: String,
    pub path: EntryPath,
    /// Free-form code kind such as `java` or `jar`.
    pub kind: String,
    pub payload: Vec<u8>,
}

impl CodeEntry {
    pub fn new(name: &str, kind: &str, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.to_owned(),
            path: EntryPath::new(format!("code/{name}")),
            kind: kind.to_owned(),
            payload: payload.into(),
        }
    }

    #[must_use]
    pub fn with_path(mut self, path: impl Into<EntryPath>) -> Self {
        self.path = path.into();
        self
    }

    pub fn from_entry(descriptor: &EntryDescriptor, bytes: &[u8]) -> Self {
        Self {
            name: descriptor.name.clone(),
            path: descriptor.path.clone(),
            kind: descriptor.entry_type.clone(),
            payload: bytes.to_vec(),
        }
    }

    pub fn descriptor(&self) -> EntryDescriptor {
        EntryDescriptor::for_payload(
            self.path.clone(),
            EntryKind::Code,
            &self.kind,
            &self.name,
            &self.payload,
        )
    }

    pub fn checksum(&self) -> Checksum {
        Checksum::of(&self.payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_reflects_payload() {
        let code = CodeEntry::new("Main.java", "java", "class Main {}");
        let desc = code.descriptor();
        assert_eq!(desc.path, "code/Main.java");
        assert_eq!(desc.kind, EntryKind::Code);
        assert_eq!(desc.entry_type, "java");
        assert_eq!(desc.size, 13);
        assert!(desc.matches(&code.payload));

        let back = CodeEntry::from_entry(&desc, &code.payload);
        assert_eq!(back, code);
    }
}
