//! Type shapes: the already-parsed form of one NXDL class definition.

use serde::{Deserialize, Serialize};

use crate::model::{PrimitiveType, UnitCategory};

/// One declared array dimension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dim {
    Fixed(usize),
    /// Named size shared across fields, e.g. `n_points`.
    Symbol(String),
    Any,
}

impl Dim {
    pub fn symbol(name: impl Into<String>) -> Self {
        Dim::Symbol(name.into())
    }
}

/// Where a class definition comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassCategory {
    #[default]
    Base,
    Application,
    Contributed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeDecl {
    pub name: String,
    #[serde(rename = "type")]
    pub primitive: PrimitiveType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enumeration: Option<Vec<String>>,
    #[serde(default)]
    pub required: bool,
}

impl AttributeDecl {
    pub fn new(name: impl Into<String>, primitive: PrimitiveType) -> Self {
        Self { name: name.into(), primitive, enumeration: None, required: false }
    }

    pub fn enumeration<I, S>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.enumeration = Some(items.into_iter().map(Into::into).collect());
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDecl {
    pub name: String,
    #[serde(rename = "type")]
    pub primitive: PrimitiveType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units: Option<UnitCategory>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enumeration: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<Vec<Dim>>,
    #[serde(default)]
    pub required: bool,
    /// Name is a placeholder (`DATA`, `AXISNAME`) matching any otherwise
    /// undeclared field name.
    #[serde(default)]
    pub template: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<AttributeDecl>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deprecated: Option<String>,
}

impl FieldDecl {
    pub fn new(name: impl Into<String>, primitive: PrimitiveType) -> Self {
        Self {
            name: name.into(),
            primitive,
            units: None,
            enumeration: None,
            dimensions: None,
            required: false,
            template: false,
            attributes: Vec::new(),
            deprecated: None,
        }
    }

    /// A placeholder-named field.
    pub fn template(name: impl Into<String>, primitive: PrimitiveType) -> Self {
        Self { template: true, ..Self::new(name, primitive) }
    }

    pub fn units(mut self, units: UnitCategory) -> Self {
        self.units = Some(units);
        self
    }

    pub fn enumeration<I, S>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.enumeration = Some(items.into_iter().map(Into::into).collect());
        self
    }

    pub fn dims(mut self, dims: impl IntoIterator<Item = Dim>) -> Self {
        self.dimensions = Some(dims.into_iter().collect());
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn attribute(mut self, attr: AttributeDecl) -> Self {
        self.attributes.push(attr);
        self
    }

    pub fn deprecated(mut self, note: impl Into<String>) -> Self {
        self.deprecated = Some(note.into());
        self
    }

    pub fn attribute_decl(&self, name: &str) -> Option<&AttributeDecl> {
        self.attributes.iter().find(|a| a.name == name)
    }
}

/// A declared child group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildDecl {
    #[serde(rename = "type")]
    pub child_type: String,
    /// Fixed instance name; `None` accepts any name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub required: bool,
}

impl ChildDecl {
    pub fn new(child_type: impl Into<String>) -> Self {
        Self { child_type: child_type.into(), name: None, required: false }
    }

    pub fn named(child_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self { name: Some(name.into()), ..Self::new(child_type) }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn admits(&self, name: &str) -> bool {
        self.name.as_deref().is_none_or(|n| n == name)
    }
}

/// Everything a declared type implies: fields, attributes, child groups
/// and dimension symbols.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeShape {
    pub name: String,
    #[serde(default)]
    pub category: ClassCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deprecated: Option<String>,
    #[serde(default)]
    pub fields: Vec<FieldDecl>,
    #[serde(default)]
    pub attributes: Vec<AttributeDecl>,
    #[serde(default)]
    pub groups: Vec<ChildDecl>,
    #[serde(default)]
    pub symbols: Vec<String>,
}

impl TypeShape {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category: ClassCategory::Base,
            deprecated: None,
            fields: Vec::new(),
            attributes: Vec::new(),
            groups: Vec::new(),
            symbols: Vec::new(),
        }
    }

    pub fn category(mut self, category: ClassCategory) -> Self {
        self.category = category;
        self
    }

    pub fn deprecated(mut self, note: impl Into<String>) -> Self {
        self.deprecated = Some(note.into());
        self
    }

    pub fn field(mut self, decl: FieldDecl) -> Self {
        self.fields.push(decl);
        self
    }

    pub fn attribute(mut self, decl: AttributeDecl) -> Self {
        self.attributes.push(decl);
        self
    }

    pub fn group(mut self, decl: ChildDecl) -> Self {
        self.groups.push(decl);
        self
    }

    pub fn symbol(mut self, name: impl Into<String>) -> Self {
        self.symbols.push(name.into());
        self
    }

    /// Exact name first, then the first template declaration.
    pub fn field_decl(&self, name: &str) -> Option<&FieldDecl> {
        self.fields
            .iter()
            .find(|f| !f.template && f.name == name)
            .or_else(|| self.fields.iter().find(|f| f.template))
    }

    pub fn attribute_decl(&self, name: &str) -> Option<&AttributeDecl> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn child_decls<'a>(&'a self, child_type: &'a str) -> impl Iterator<Item = &'a ChildDecl> + 'a {
        self.groups.iter().filter(move |g| g.child_type == child_type)
    }

    pub fn declares_child_type(&self, child_type: &str) -> bool {
        self.child_decls(child_type).next().is_some()
    }

    pub fn declares_symbol(&self, symbol: &str) -> bool {
        self.symbols.iter().any(|s| s == symbol)
    }
}

/// Instance name used when none is given: the type name without its `NX`
/// prefix (`NXfabrication` → `fabrication`).
pub fn default_instance_name(type_name: &str) -> String {
    match type_name.strip_prefix("NX") {
        Some(rest) if !rest.is_empty() => rest.to_owned(),
        _ => type_name.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_field_beats_template() {
        let shape = TypeShape::new("NXdata")
            .field(FieldDecl::template("DATA", PrimitiveType::AnyNumber))
            .field(FieldDecl::new("title", PrimitiveType::Utf8));
        assert_eq!(shape.field_decl("title").unwrap().primitive, PrimitiveType::Utf8);
        assert_eq!(shape.field_decl("counts").unwrap().name, "DATA");
    }

    #[test]
    fn test_no_template_no_match() {
        let shape = TypeShape::new("NXnote").field(FieldDecl::new("author", PrimitiveType::Utf8));
        assert!(shape.field_decl("writer").is_none());
    }

    #[test]
    fn test_named_child_decl() {
        let decl = ChildDecl::named("NXaberration", "c_1_0");
        assert!(decl.admits("c_1_0"));
        assert!(!decl.admits("c_3_0"));
        assert!(ChildDecl::new("NXaberration").admits("anything"));
    }

    #[test]
    fn test_default_instance_name() {
        assert_eq!(default_instance_name("NXfabrication"), "fabrication");
        assert_eq!(default_instance_name("NX"), "NX");
        assert_eq!(default_instance_name("custom"), "custom");
    }

    #[test]
    fn test_shape_from_json() {
        let shape: TypeShape = serde_json::from_str(
            r#"{
                "name": "NXbeam_stop",
                "fields": [
                    { "name": "status", "type": "NX_CHAR", "enumeration": ["in", "out"] },
                    { "name": "size", "type": "NX_FLOAT", "units": "NX_LENGTH",
                      "dimensions": [{ "fixed": 2 }] }
                ],
                "symbols": []
            }"#,
        )
        .unwrap();
        assert_eq!(shape.category, ClassCategory::Base);
        let size = shape.field_decl("size").unwrap();
        assert_eq!(size.units, Some(UnitCategory::Length));
        assert_eq!(size.dimensions, Some(vec![Dim::Fixed(2)]));
    }
}
