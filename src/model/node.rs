//! Node — one NeXus group: fields, attributes and typed child groups.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use hashbrown::HashMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::{debug, warn};

use super::{
    AttributeTable, CellData, ChildMap, ChildRegistry, FromScalar, Scalar, UnitCategory, ValueCell,
};
use crate::config::{ModelConfig, ValidationMode};
use crate::schema::checker::{self, SymbolTable, FIELD_ATTRIBUTES, GROUP_ATTRIBUTES};
use crate::schema::{default_instance_name, registry, BaseTypeRegistry, TypeShape};
use crate::{Error, Result};

// ============================================================================
// Field
// ============================================================================

/// A dataset: its value plus the attributes attached to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    cell: ValueCell,
    #[serde(default, skip_serializing_if = "AttributeTable::is_empty")]
    attributes: AttributeTable,
}

impl Field {
    pub fn cell(&self) -> &ValueCell {
        &self.cell
    }

    pub fn attributes(&self) -> &AttributeTable {
        &self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&ValueCell> {
        self.attributes.get(name)
    }
}

// ============================================================================
// NodeFactory
// ============================================================================

/// Creates nodes against one registry with one validation policy.
#[derive(Debug, Clone)]
pub struct NodeFactory {
    registry: Arc<BaseTypeRegistry>,
    config: ModelConfig,
}

impl NodeFactory {
    pub fn new(registry: Arc<BaseTypeRegistry>, config: ModelConfig) -> Self {
        Self { registry, config }
    }

    /// The process-wide registry with default (strict) configuration.
    pub fn global() -> Self {
        Self::with_config(ModelConfig::default())
    }

    /// The process-wide registry with `config`.
    pub fn with_config(config: ModelConfig) -> Self {
        Self::new(Arc::clone(registry::global()), config)
    }

    pub fn registry(&self) -> &BaseTypeRegistry {
        &self.registry
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// New node with the conventional default name.
    pub fn create(&self, type_name: &str) -> Result<Node> {
        self.create_named(type_name, &default_instance_name(type_name))
    }

    pub fn create_named(&self, type_name: &str, name: &str) -> Result<Node> {
        let shape = Arc::clone(self.registry.lookup(type_name)?);
        if let Some(note) = shape.deprecated.as_deref() {
            warn!(node_type = type_name, note, "Creating node of deprecated type");
        }
        Ok(Node {
            factory: self.clone(),
            shape,
            name: name.to_owned(),
            fields: HashMap::new(),
            attributes: AttributeTable::new(),
            children: ChildRegistry::new(),
            extensions: Vec::new(),
            inherited: Inherited::default(),
        })
    }

    /// Rebuild a tree from its JSON form, re-validating every member.
    pub fn node_from_json(&self, json: &str) -> Result<Node> {
        let repr: NodeRepr = serde_json::from_str(json)?;
        self.build(repr)
    }

    fn build(&self, repr: NodeRepr) -> Result<Node> {
        let factory = if repr.validation == ValidationMode::Open && self.config.is_strict() {
            let config = ModelConfig { validation: ValidationMode::Open, ..self.config };
            NodeFactory::new(Arc::clone(&self.registry), config)
        } else {
            self.clone()
        };

        let mut node = factory.create_named(&repr.declared_type, &repr.name)?;

        let mut fields: Vec<_> = repr.fields.into_iter().collect();
        fields.sort_unstable_by(|a, b| a.0.cmp(&b.0));
        for (name, field) in fields {
            node.set_field(&name, field.cell)?;
            for (attr, cell) in field.attributes.into_entries() {
                node.set_field_attribute(&name, &attr, cell)?;
            }
        }
        for (name, cell) in repr.attributes.into_entries() {
            node.set_attribute(&name, cell)?;
        }
        for (child_type, children) in repr.children {
            for (name, child) in children {
                let child = factory.build(child)?;
                node.set_child(&child_type, &name, child)?;
            }
        }
        Ok(node)
    }
}

// ============================================================================
// Node
// ============================================================================

/// A group in the tree. Owns its fields, attributes and child subtrees;
/// every mutation is checked against the shape of its declared type.
#[derive(Clone)]
pub struct Node {
    factory: NodeFactory,
    shape: Arc<TypeShape>,
    name: String,
    fields: HashMap<String, Field>,
    attributes: AttributeTable,
    children: ChildRegistry,
    /// Undeclared names let through by open validation:
    /// `field`, `@attr`, `field@attr`, `NXtype:name`.
    extensions: Vec<String>,
    inherited: Inherited,
}

/// An enclosing group whose type declares dimension symbols, with the
/// bindings made by everything in its subtree outside the current child.
struct Scope {
    shape: Arc<TypeShape>,
    bound: SymbolTable,
}

/// Scopes of every ancestor, set by the parent each time it hands out
/// mutable access to this node. Detached nodes and copies carry none.
#[derive(Default)]
struct Inherited(Vec<Scope>);

impl Clone for Inherited {
    fn clone(&self) -> Self {
        Self::default()
    }
}

impl Node {
    /// New node from the process-wide registry, default name.
    pub fn new(type_name: &str) -> Result<Self> {
        NodeFactory::global().create(type_name)
    }

    pub fn named(type_name: &str, name: &str) -> Result<Self> {
        NodeFactory::global().create_named(type_name, name)
    }

    pub fn declared_type(&self) -> &str {
        &self.shape.name
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn shape(&self) -> &TypeShape {
        &self.shape
    }

    pub fn factory(&self) -> &NodeFactory {
        &self.factory
    }

    pub fn config(&self) -> &ModelConfig {
        &self.factory.config
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    // ========================================================================
    // Fields
    // ========================================================================

    /// Validate and store a field value.
    ///
    /// Fails with `UnknownField`, `TypeMismatch`, `UnitCategoryMismatch`,
    /// `EnumerationViolation`, `ShapeMismatch` or `DimensionConflict`; on
    /// failure the node is unchanged. Re-setting an existing field keeps its
    /// attributes and must stay within its original primitive type.
    ///
    /// Dimension symbols are checked against the node's own subtree and, for
    /// a node reached through a parent's `_mut` accessor, against every
    /// enclosing group that declares them.
    pub fn set_field(&mut self, name: &str, cell: ValueCell) -> Result<()> {
        let bound = self.bound_symbols(Some(name), &|_, _| false)?;
        let verdict = checker::check_field(&self.shape, self.config(), name, cell, &bound)?;
        if let Some(dims) = self.shape.field_decl(name).and_then(|d| d.dimensions.as_deref()) {
            for scope in self.ancestor_scopes(Some(name), &|_, _| false)? {
                checker::resolve_dimensions(name, Some(dims), verdict.cell.shape(), &scope.bound)?;
            }
        }
        let cell = match self.fields.get(name) {
            Some(existing) => existing.cell.supersede(verdict.cell).map_err(|e| e.at_field(name))?,
            None => verdict.cell,
        };

        if verdict.extension {
            self.flag(name);
        }
        debug!(node = %self.name, node_type = %self.shape.name, field = name, "Field set");

        match self.fields.get_mut(name) {
            Some(field) => field.cell = cell,
            None => {
                self.fields.insert(name.to_owned(), Field { cell, attributes: AttributeTable::new() });
            }
        }
        Ok(())
    }

    pub fn set_field_scalar(
        &mut self,
        name: &str,
        value: impl Into<Scalar>,
        unit: impl Into<Option<UnitCategory>>,
    ) -> Result<()> {
        self.set_field(name, ValueCell::scalar(value).with_unit(unit))
    }

    pub fn set_field_array(
        &mut self,
        name: &str,
        data: impl Into<CellData>,
        shape: &[usize],
        unit: impl Into<Option<UnitCategory>>,
    ) -> Result<()> {
        let cell = ValueCell::array(data, shape).map_err(|e| e.at_field(name))?;
        self.set_field(name, cell.with_unit(unit))
    }

    /// The field's value; `FieldNotSet` if declared but absent.
    pub fn get_field(&self, name: &str) -> Result<&ValueCell> {
        match self.fields.get(name) {
            Some(field) => Ok(&field.cell),
            None => Err(self.absent(name, self.shape.field_decl(name).is_some())),
        }
    }

    pub fn get_field_scalar<T: FromScalar>(&self, name: &str) -> Result<T> {
        self.get_field(name)?.get::<T>().map_err(|e| e.at_field(name))
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Field)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Fields ordered by name.
    pub fn sorted_fields(&self) -> Vec<(&str, &Field)> {
        let mut fields: Vec<_> = self.fields().collect();
        fields.sort_unstable_by_key(|(k, _)| *k);
        fields
    }

    pub fn remove_field(&mut self, name: &str) -> Option<Field> {
        let removed = self.fields.remove(name)?;
        let prefix = format!("{name}@");
        self.extensions.retain(|e| e != name && !e.starts_with(&prefix));
        debug!(node = %self.name, field = name, "Field removed");
        Some(removed)
    }

    // ========================================================================
    // Attributes
    // ========================================================================

    pub fn set_attribute(&mut self, name: &str, cell: ValueCell) -> Result<()> {
        let verdict = checker::check_group_attribute(&self.shape, self.config(), name, cell)?;
        if verdict.extension {
            self.flag(format!("@{name}"));
        }
        debug!(node = %self.name, attribute = name, "Attribute set");
        self.attributes.insert(name, verdict.cell);
        Ok(())
    }

    pub fn get_attribute(&self, name: &str) -> Result<&ValueCell> {
        self.attributes.get(name).ok_or_else(|| {
            let declared =
                self.shape.attribute_decl(name).is_some() || GROUP_ATTRIBUTES.contains(&name);
            self.absent(name, declared)
        })
    }

    pub fn attributes(&self) -> &AttributeTable {
        &self.attributes
    }

    pub fn remove_attribute(&mut self, name: &str) -> Option<ValueCell> {
        let removed = self.attributes.remove(name)?;
        self.extensions.retain(|e| e.strip_prefix('@') != Some(name));
        Some(removed)
    }

    /// Attach an attribute to an already-set field.
    pub fn set_field_attribute(&mut self, field: &str, name: &str, cell: ValueCell) -> Result<()> {
        let shape = Arc::clone(&self.shape);
        let decl = shape.field_decl(field);
        if !self.fields.contains_key(field) {
            return Err(self.absent(field, decl.is_some()));
        }
        let verdict = checker::check_field_attribute(&shape, decl, self.config(), name, cell)?;
        if verdict.extension {
            self.flag(format!("{field}@{name}"));
        }
        debug!(node = %self.name, field, attribute = name, "Field attribute set");
        if let Some(f) = self.fields.get_mut(field) {
            f.attributes.insert(name, verdict.cell);
        }
        Ok(())
    }

    pub fn get_field_attribute(&self, field: &str, name: &str) -> Result<&ValueCell> {
        let decl = self.shape.field_decl(field);
        let f = self.fields.get(field).ok_or_else(|| self.absent(field, decl.is_some()))?;
        f.attributes.get(name).ok_or_else(|| {
            let declared = decl.is_some_and(|d| d.attribute_decl(name).is_some())
                || FIELD_ATTRIBUTES.contains(&name);
            self.absent(name, declared)
        })
    }

    // ========================================================================
    // Children
    // ========================================================================

    /// Attach `child` under `(child_type, name)`, replacing any child with
    /// the same key. The child is renamed to `name`.
    pub fn set_child(&mut self, child_type: &str, name: &str, mut child: Node) -> Result<()> {
        let extension = checker::check_child(&self.shape, self.config(), child_type, name, &child)?;
        if !self.shape.symbols.is_empty() {
            let mut bound =
                self.bound_symbols(None, &|ty, n| ty == child_type && n == name)?;
            child.collect_symbols(&self.shape, false, None, &|_, _| false, &mut bound)?;
        }
        for mut scope in self.ancestor_scopes(None, &|ty, n| ty == child_type && n == name)? {
            child.collect_symbols(&scope.shape, false, None, &|_, _| false, &mut scope.bound)?;
        }

        child.name = name.to_owned();
        child.inherited = Inherited::default();
        if extension {
            self.flag(format!("{child_type}:{name}"));
        }
        debug!(parent = %self.name, child_type, child = name, "Child attached");
        self.children.insert(child_type, name, child);
        Ok(())
    }

    /// Create a child through this node's factory and attach it. Without a
    /// name the conventional default (`NXfabrication` → `fabrication`) is used.
    pub fn new_child(&mut self, child_type: &str, name: Option<&str>) -> Result<&mut Node> {
        let name = name.map_or_else(|| default_instance_name(child_type), str::to_owned);
        let child = self.factory.create_named(child_type, &name)?;
        self.set_child(child_type, &name, child)?;
        self.child_mut(child_type, &name)
    }

    pub fn get_child(&self, child_type: &str, name: &str) -> Result<&Node> {
        self.children.get(child_type, name)
    }

    /// Mutable access to a child. Writes through it are checked against the
    /// dimension symbols of every enclosing group, not just the child's own.
    pub fn get_child_mut(&mut self, child_type: &str, name: &str) -> Result<&mut Node> {
        self.child_mut(child_type, name)
    }

    /// The only child of `child_type`; `AmbiguousChild` if there are several.
    pub fn get_default_child(&self, child_type: &str) -> Result<&Node> {
        self.children.default_child(child_type)
    }

    pub fn get_default_child_mut(&mut self, child_type: &str) -> Result<&mut Node> {
        let name = self.children.default_child(child_type)?.name.clone();
        self.child_mut(child_type, &name)
    }

    fn child_mut(&mut self, child_type: &str, name: &str) -> Result<&mut Node> {
        let scopes = self.scopes_for_child(child_type, name)?;
        let child = self.children.get_mut(child_type, name)?;
        child.inherited = Inherited(scopes);
        Ok(child)
    }

    /// Every child of `child_type` by name. Possibly empty.
    pub fn get_all_children(&self, child_type: &str) -> BTreeMap<&str, &Node> {
        self.children.all(child_type)
    }

    /// Atomically replace every child of `child_type`. All entries are
    /// checked before anything changes; other child types are untouched.
    pub fn set_all_children(&mut self, child_type: &str, mut children: ChildMap) -> Result<()> {
        let mut bound = if self.shape.symbols.is_empty() {
            None
        } else {
            Some(self.bound_symbols(None, &|ty, _| ty == child_type)?)
        };
        let mut scopes = self.ancestor_scopes(None, &|ty, _| ty == child_type)?;

        let mut extensions = Vec::new();
        for (name, child) in &children {
            if checker::check_child(&self.shape, self.config(), child_type, name, child)? {
                extensions.push(format!("{child_type}:{name}"));
            }
            if let Some(bound) = bound.as_mut() {
                child.collect_symbols(&self.shape, false, None, &|_, _| false, bound)?;
            }
            for scope in &mut scopes {
                child.collect_symbols(&scope.shape, false, None, &|_, _| false, &mut scope.bound)?;
            }
        }

        for (name, child) in children.iter_mut() {
            child.name.clone_from(name);
            child.inherited = Inherited::default();
        }
        let prefix = format!("{child_type}:");
        self.extensions.retain(|e| !e.starts_with(&prefix));
        for entry in extensions {
            self.flag(entry);
        }
        debug!(parent = %self.name, child_type, count = children.len(), "Children replaced");
        self.children.replace_all(child_type, children);
        Ok(())
    }

    /// Detach a child and return its subtree.
    pub fn remove_child(&mut self, child_type: &str, name: &str) -> Result<Node> {
        let mut node = self.children.remove(child_type, name)?;
        node.inherited = Inherited::default();
        let entry = format!("{child_type}:{name}");
        self.extensions.retain(|e| *e != entry);
        debug!(parent = %self.name, child_type, child = name, "Child detached");
        Ok(node)
    }

    pub fn children(&self) -> &ChildRegistry {
        &self.children
    }

    // ========================================================================
    // Schema bookkeeping
    // ========================================================================

    /// Declared-required members that are absent: `field`, `@attribute`,
    /// `NXtype` or `NXtype:name`.
    pub fn missing_required(&self) -> Vec<String> {
        let mut missing = Vec::new();
        for decl in self.shape.fields.iter().filter(|f| f.required && !f.template) {
            if !self.fields.contains_key(&decl.name) {
                missing.push(decl.name.clone());
            }
        }
        for decl in self.shape.attributes.iter().filter(|a| a.required) {
            if !self.attributes.contains(&decl.name) {
                missing.push(format!("@{}", decl.name));
            }
        }
        for decl in self.shape.groups.iter().filter(|g| g.required) {
            match decl.name.as_deref() {
                Some(name) if !self.children.contains(&decl.child_type, name) => {
                    missing.push(format!("{}:{name}", decl.child_type));
                }
                None if self.children.count(&decl.child_type) == 0 => {
                    missing.push(decl.child_type.clone());
                }
                _ => {}
            }
        }
        missing
    }

    /// Symbols resolved by this node's fields and by descendants' fields
    /// over symbols this node's type declares.
    pub(crate) fn bound_symbols(
        &self,
        skip_field: Option<&str>,
        skip_child: &dyn Fn(&str, &str) -> bool,
    ) -> Result<SymbolTable> {
        let mut table = SymbolTable::new();
        self.collect_symbols(&self.shape, true, skip_field, skip_child, &mut table)?;
        Ok(table)
    }

    /// Inherited scopes extended with this node's own subtree, minus the
    /// skipped members.
    fn ancestor_scopes(
        &self,
        skip_field: Option<&str>,
        skip_child: &dyn Fn(&str, &str) -> bool,
    ) -> Result<Vec<Scope>> {
        self.inherited
            .0
            .iter()
            .map(|scope| -> Result<Scope> {
                let mut bound = scope.bound.clone();
                self.collect_symbols(&scope.shape, false, skip_field, skip_child, &mut bound)?;
                Ok(Scope { shape: Arc::clone(&scope.shape), bound })
            })
            .collect()
    }

    /// Scopes handed down to the child at `(child_type, name)`: every
    /// ancestor's, plus this node's when its type declares symbols.
    fn scopes_for_child(&self, child_type: &str, name: &str) -> Result<Vec<Scope>> {
        let skip: &dyn Fn(&str, &str) -> bool = &|ty, n| ty == child_type && n == name;
        let mut scopes = self.ancestor_scopes(None, skip)?;
        if !self.shape.symbols.is_empty() {
            let mut bound = self.bound_symbols(None, skip)?;
            bound.retain(|symbol, _| self.shape.declares_symbol(symbol));
            scopes.push(Scope { shape: Arc::clone(&self.shape), bound });
        }
        Ok(scopes)
    }

    fn collect_symbols(
        &self,
        scope: &TypeShape,
        own: bool,
        skip_field: Option<&str>,
        skip_child: &dyn Fn(&str, &str) -> bool,
        out: &mut SymbolTable,
    ) -> Result<()> {
        for (name, field) in &self.fields {
            if skip_field == Some(name.as_str()) {
                continue;
            }
            let Some(dims) = self.shape.field_decl(name).and_then(|d| d.dimensions.as_deref()) else {
                continue;
            };
            for (symbol, size) in checker::symbol_sizes(dims, field.cell.shape()) {
                if !own && !scope.declares_symbol(symbol) {
                    continue;
                }
                match out.get(symbol) {
                    Some(&bound) if bound != size => {
                        return Err(Error::DimensionConflict {
                            field: name.clone(),
                            symbol: symbol.to_owned(),
                            bound,
                            got: size,
                        });
                    }
                    Some(_) => {}
                    None => {
                        out.insert(symbol.to_owned(), size);
                    }
                }
            }
        }
        for (child_type, name, child) in self.children.iter() {
            if skip_child(child_type, name) {
                continue;
            }
            child.collect_symbols(scope, false, None, &|_, _| false, out)?;
        }
        Ok(())
    }

    /// Read-time absence: `FieldNotSet` for legal names (or anything under
    /// open validation), `UnknownField` otherwise.
    fn absent(&self, name: &str, declared: bool) -> Error {
        if declared || !self.config().is_strict() {
            Error::FieldNotSet { type_name: self.shape.name.clone(), name: name.to_owned() }
        } else {
            Error::UnknownField { type_name: self.shape.name.clone(), name: name.to_owned() }
        }
    }

    fn flag(&mut self, entry: impl Into<String>) {
        let entry = entry.into();
        warn!(node = %self.name, node_type = %self.shape.name, name = %entry, "Undeclared name accepted");
        if !self.extensions.contains(&entry) {
            self.extensions.push(entry);
        }
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.shape.name == other.shape.name
            && self.name == other.name
            && self.fields == other.fields
            && self.attributes == other.attributes
            && self.children == other.children
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("type", &self.shape.name)
            .field("name", &self.name)
            .field("fields", &self.fields)
            .field("attributes", &self.attributes)
            .field("children", &self.children)
            .finish()
    }
}

// ============================================================================
// Serialization
// ============================================================================

/// Borrowed, name-ordered view used for serialization.
#[derive(Serialize)]
struct NodeView<'a> {
    #[serde(rename = "type")]
    declared_type: &'a str,
    name: &'a str,
    #[serde(skip_serializing_if = "is_strict")]
    validation: ValidationMode,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    fields: BTreeMap<&'a str, &'a Field>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    attributes: BTreeMap<&'a str, &'a ValueCell>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    children: BTreeMap<&'a str, BTreeMap<&'a str, &'a Node>>,
}

fn is_strict(mode: &ValidationMode) -> bool {
    *mode == ValidationMode::Strict
}

impl<'a> From<&'a Node> for NodeView<'a> {
    fn from(node: &'a Node) -> Self {
        let mut children: BTreeMap<&str, BTreeMap<&str, &Node>> = BTreeMap::new();
        for (child_type, name, child) in node.children.iter() {
            children.entry(child_type).or_default().insert(name, child);
        }
        Self {
            declared_type: node.declared_type(),
            name: &node.name,
            validation: node.config().validation,
            fields: node.fields().collect(),
            attributes: node.attributes.iter().collect(),
            children,
        }
    }
}

/// Owned form read back from a snapshot, before validation.
#[derive(Deserialize)]
struct NodeRepr {
    #[serde(rename = "type")]
    declared_type: String,
    name: String,
    #[serde(default)]
    validation: ValidationMode,
    #[serde(default)]
    fields: HashMap<String, Field>,
    #[serde(default)]
    attributes: AttributeTable,
    #[serde(default)]
    children: HashMap<String, HashMap<String, NodeRepr>>,
}

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        NodeView::from(self).serialize(serializer)
    }
}

/// Deserializes against the process-wide registry. Use
/// `NodeFactory::node_from_json` for a custom registry.
impl<'de> Deserialize<'de> for Node {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let repr = NodeRepr::deserialize(deserializer)?;
        NodeFactory::global().build(repr).map_err(serde::de::Error::custom)
    }
}
