//! Base-Type Registry — schema type name → shape.
//!
//! Loaded once per process and read-only afterwards. Parsing NXDL XML is
//! someone else's job; this layer takes already-parsed shapes, either
//! built in Rust or deserialized from JSON.

use std::sync::{Arc, OnceLock};

use hashbrown::HashMap;
use tracing::info;

use super::{catalog, Dim, TypeShape};
use crate::{Error, Result};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BaseTypeRegistry {
    types: HashMap<String, Arc<TypeShape>>,
}

impl BaseTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a shape. Only meaningful before the registry is shared.
    pub fn insert(&mut self, shape: TypeShape) -> Option<Arc<TypeShape>> {
        self.types.insert(shape.name.clone(), Arc::new(shape))
    }

    pub fn with(mut self, shape: TypeShape) -> Self {
        self.insert(shape);
        self
    }

    /// Build and check a registry in one go.
    pub fn from_shapes(shapes: impl IntoIterator<Item = TypeShape>) -> Result<Self> {
        let mut registry = Self::new();
        for shape in shapes {
            registry.insert(shape);
        }
        registry.validate()?;
        Ok(registry)
    }

    /// Parse a JSON array of shapes.
    pub fn from_json(json: &str) -> Result<Self> {
        let shapes: Vec<TypeShape> = serde_json::from_str(json)?;
        Self::from_shapes(shapes)
    }

    /// The shape for `type_name`, or `UnknownType`.
    pub fn lookup(&self, type_name: &str) -> Result<&Arc<TypeShape>> {
        self.types
            .get(type_name)
            .ok_or_else(|| Error::UnknownType(type_name.to_owned()))
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.types.contains_key(type_name)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Type names, sorted.
    pub fn type_names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.types.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Cross-checks: every child type resolves, every dimension symbol is
    /// declared by its shape, enumerations are non-empty.
    pub fn validate(&self) -> Result<()> {
        for shape in self.types.values() {
            for group in &shape.groups {
                if !self.contains(&group.child_type) {
                    return Err(Error::UnknownType(format!(
                        "{} (declared as a child of {})",
                        group.child_type, shape.name
                    )));
                }
            }
            for field in &shape.fields {
                let symbols = field.dimensions.iter().flatten().filter_map(|d| match d {
                    Dim::Symbol(s) => Some(s),
                    _ => None,
                });
                for symbol in symbols {
                    if !shape.declares_symbol(symbol) {
                        return Err(Error::Schema(format!(
                            "{}/{} uses undeclared dimension symbol '{symbol}'",
                            shape.name, field.name
                        )));
                    }
                }
                let mut enums = field
                    .enumeration
                    .iter()
                    .chain(field.attributes.iter().filter_map(|a| a.enumeration.as_ref()));
                if enums.any(Vec::is_empty) {
                    return Err(Error::Schema(format!(
                        "{}/{} declares an empty enumeration",
                        shape.name, field.name
                    )));
                }
            }
        }
        Ok(())
    }
}

// ============================================================================
// Process-wide instance
// ============================================================================

static GLOBAL: OnceLock<Arc<BaseTypeRegistry>> = OnceLock::new();

/// Install the process-wide registry. Fails with `RegistryInitialized` if
/// one is already installed, or if `global()` was already consulted.
pub fn install(registry: BaseTypeRegistry) -> Result<()> {
    registry.validate()?;
    let count = registry.len();
    GLOBAL
        .set(Arc::new(registry))
        .map_err(|_| Error::RegistryInitialized)?;
    info!(types = count, "Base-type registry installed");
    Ok(())
}

/// The process-wide registry; the built-in catalog unless `install` ran first.
pub fn global() -> &'static Arc<BaseTypeRegistry> {
    GLOBAL.get_or_init(|| Arc::new(catalog::builtin()))
}

/// Read-only lookup against the process-wide registry.
pub fn lookup(type_name: &str) -> Result<Arc<TypeShape>> {
    global().lookup(type_name).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PrimitiveType;
    use crate::schema::{ChildDecl, FieldDecl};

    #[test]
    fn test_lookup_unknown() {
        let reg = BaseTypeRegistry::new().with(TypeShape::new("NXnote"));
        assert!(reg.lookup("NXnote").is_ok());
        assert!(matches!(reg.lookup("NXflipper"), Err(Error::UnknownType(t)) if t == "NXflipper"));
    }

    #[test]
    fn test_validate_dangling_child_type() {
        let err = BaseTypeRegistry::from_shapes([
            TypeShape::new("NXentry").group(ChildDecl::new("NXsample")),
        ])
        .unwrap_err();
        assert!(matches!(err, Error::UnknownType(_)));
    }

    #[test]
    fn test_validate_undeclared_symbol() {
        let err = BaseTypeRegistry::from_shapes([TypeShape::new("NXlog")
            .field(FieldDecl::new("value", PrimitiveType::Float64).dims([Dim::symbol("n")]))])
        .unwrap_err();
        assert!(matches!(err, Error::Schema(_)));
    }

    #[test]
    fn test_from_json() {
        let reg = BaseTypeRegistry::from_json(
            r#"[
                { "name": "NXroot", "groups": [{ "type": "NXentry", "required": true }] },
                { "name": "NXentry", "fields": [{ "name": "title", "type": "NX_CHAR" }] }
            ]"#,
        )
        .unwrap();
        assert_eq!(reg.type_names(), vec!["NXentry", "NXroot"]);
        assert!(reg.lookup("NXroot").unwrap().groups[0].required);
    }

    #[test]
    fn test_global_defaults_to_builtin() {
        assert!(lookup("NXaberration").is_ok());
        assert!(global().contains("NXroot"));
    }
}
