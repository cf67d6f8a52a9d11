//! Qualified names: namespace-scoped identifiers for schema and data nodes.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

/// Identity of one schema module: a namespace URI plus an optional revision
/// date. All qualified names declared by a module share one `ModuleId`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ModuleId {
    namespace: Arc<str>,
    revision: Option<Arc<str>>,
}

impl ModuleId {
    pub fn new(namespace: impl Into<Arc<str>>, revision: Option<&str>) -> Self {
        Self {
            namespace: namespace.into(),
            revision: revision.map(Arc::from),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn revision(&self) -> Option<&str> {
        self.revision.as_deref()
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.revision {
            Some(rev) => write!(f, "{}?revision={rev}", self.namespace),
            None => write!(f, "{}", self.namespace),
        }
    }
}

impl fmt::Debug for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// A qualified name: module identity plus a local name.
///
/// `QName` is the universal key for schema children, generic tree labels and
/// path segments. Cloning is cheap (`Arc` components).
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct QName {
    module: ModuleId,
    local: Arc<str>,
}

impl QName {
    pub fn new(module: ModuleId, local: impl Into<Arc<str>>) -> Self {
        Self {
            module,
            local: local.into(),
        }
    }

    pub fn module(&self) -> &ModuleId {
        &self.module
    }

    pub fn namespace(&self) -> &str {
        self.module.namespace()
    }

    pub fn local(&self) -> &str {
        &self.local
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}){}", self.module, self.local)
    }
}

impl fmt::Debug for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_revision() {
        let module = ModuleId::new("urn:test", Some("2024-01-15"));
        let qname = QName::new(module, "leaf-a");
        assert_eq!(qname.to_string(), "(urn:test?revision=2024-01-15)leaf-a");
    }

    #[test]
    fn qnames_compare_by_value() {
        let module = ModuleId::new("urn:test", None);
        assert_eq!(
            QName::new(module.clone(), "x"),
            QName::new(module.clone(), "x")
        );
        assert_ne!(QName::new(module.clone(), "x"), QName::new(module, "y"));
    }
}
