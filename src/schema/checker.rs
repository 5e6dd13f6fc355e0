//! Schema Constraint Checker.
//!
//! Pure functions of (shape, proposed name, proposed value or child). `Node`
//! runs them before every mutation and only applies the change when they
//! pass, so a rejected write never leaves a partial update behind.

use hashbrown::HashMap;
use smallvec::SmallVec;

use super::{Dim, FieldDecl, TypeShape};
use crate::config::ModelConfig;
use crate::model::{Node, PrimitiveType, UnitCategory, ValueCell};
use crate::visit::{walk, NodeVisitor};
use crate::{Error, Result};

/// Dimension symbol → resolved size.
pub type SymbolTable = HashMap<String, usize>;

/// Attributes any group may carry.
pub const GROUP_ATTRIBUTES: [&str; 2] = ["NX_class", "default"];

/// Attributes any field may carry.
pub const FIELD_ATTRIBUTES: [&str; 7] =
    ["units", "long_name", "signal", "axes", "interpretation", "version", "target"];

/// An accepted field write.
#[derive(Debug)]
pub struct FieldVerdict {
    /// The value as it will be stored, widened to the declared type.
    pub cell: ValueCell,
    /// The name is undeclared and was let through by open validation.
    pub extension: bool,
}

/// An accepted attribute write.
#[derive(Debug)]
pub struct AttributeVerdict {
    pub cell: ValueCell,
    pub extension: bool,
}

/// Check a field write against `shape`.
///
/// `bound` holds symbols already resolved elsewhere in the node's subtree,
/// excluding the field being replaced.
pub fn check_field(
    shape: &TypeShape,
    config: &ModelConfig,
    name: &str,
    cell: ValueCell,
    bound: &SymbolTable,
) -> Result<FieldVerdict> {
    let Some(decl) = shape.field_decl(name) else {
        undeclared(shape, config, name)?;
        return Ok(FieldVerdict { cell, extension: true });
    };

    let cell = cell.coerce_to(decl.primitive).map_err(|e| e.at_field(name))?;

    if config.enforce_units && !UnitCategory::admits(decl.units, cell.unit()) {
        return Err(Error::UnitCategoryMismatch {
            field: name.to_owned(),
            expected: UnitCategory::label(decl.units),
            got: UnitCategory::label(cell.unit()),
        });
    }

    check_enumeration(name, decl.enumeration.as_deref(), &cell)?;
    resolve_dimensions(name, decl.dimensions.as_deref(), cell.shape(), bound)?;

    Ok(FieldVerdict { cell, extension: false })
}

/// Check a group-level attribute write.
pub fn check_group_attribute(
    shape: &TypeShape,
    config: &ModelConfig,
    name: &str,
    cell: ValueCell,
) -> Result<AttributeVerdict> {
    if name == "NX_class" {
        let class = cell.get::<String>().map_err(|e| e.at_field(name))?;
        if class != shape.name {
            return Err(Error::TypeDeclarationMismatch { declared: class, actual: shape.name.clone() });
        }
    }
    let decl = shape.attribute_decl(name).map(|d| (d.primitive, d.enumeration.as_deref()));
    check_attribute(shape, decl, GROUP_ATTRIBUTES.contains(&name), config, name, cell)
}

/// Check an attribute write on one of the node's fields. `field` is the
/// field's declaration, if it has one.
pub fn check_field_attribute(
    shape: &TypeShape,
    field: Option<&FieldDecl>,
    config: &ModelConfig,
    name: &str,
    cell: ValueCell,
) -> Result<AttributeVerdict> {
    let decl = field
        .and_then(|f| f.attribute_decl(name))
        .map(|d| (d.primitive, d.enumeration.as_deref()));
    check_attribute(shape, decl, FIELD_ATTRIBUTES.contains(&name), config, name, cell)
}

fn check_attribute(
    shape: &TypeShape,
    decl: Option<(PrimitiveType, Option<&[String]>)>,
    universal: bool,
    config: &ModelConfig,
    name: &str,
    cell: ValueCell,
) -> Result<AttributeVerdict> {
    match decl {
        Some((primitive, enumeration)) => {
            let cell = cell.coerce_to(primitive).map_err(|e| e.at_field(name))?;
            check_enumeration(name, enumeration, &cell)?;
            Ok(AttributeVerdict { cell, extension: false })
        }
        None if universal => Ok(AttributeVerdict { cell, extension: false }),
        None => {
            undeclared(shape, config, name)?;
            Ok(AttributeVerdict { cell, extension: true })
        }
    }
}

/// Check a child attachment. Returns `true` when the child is an open
/// extension.
pub fn check_child(
    shape: &TypeShape,
    config: &ModelConfig,
    child_type: &str,
    name: &str,
    child: &Node,
) -> Result<bool> {
    if child.declared_type() != child_type {
        return Err(Error::TypeDeclarationMismatch {
            declared: child_type.to_owned(),
            actual: child.declared_type().to_owned(),
        });
    }
    if shape.child_decls(child_type).any(|d| d.admits(name)) {
        return Ok(false);
    }
    undeclared(shape, config, name)?;
    Ok(true)
}

/// Fail under strict validation, pass under open.
fn undeclared(shape: &TypeShape, config: &ModelConfig, name: &str) -> Result<()> {
    if config.is_strict() {
        return Err(Error::UnknownField { type_name: shape.name.clone(), name: name.to_owned() });
    }
    Ok(())
}

/// Every element must be a member of `allowed` (case-sensitive).
pub fn check_enumeration(field: &str, allowed: Option<&[String]>, cell: &ValueCell) -> Result<()> {
    let Some(allowed) = allowed else { return Ok(()) };
    for value in cell.data().iter() {
        let token = value.token();
        if !allowed.iter().any(|a| *a == token) {
            return Err(Error::EnumerationViolation {
                field: field.to_owned(),
                value: token,
                allowed: allowed.to_vec(),
            });
        }
    }
    Ok(())
}

/// Shape as seen against a declaration: a scalar counts as `[1]` when the
/// declaration is rank one.
fn effective_shape(declared_rank: usize, shape: &[usize]) -> SmallVec<[usize; 4]> {
    if shape.is_empty() && declared_rank == 1 {
        smallvec::smallvec![1]
    } else {
        SmallVec::from_slice(shape)
    }
}

/// Match a value's shape against declared dimensions and return the symbol
/// bindings it introduces.
pub fn resolve_dimensions(
    field: &str,
    declared: Option<&[Dim]>,
    shape: &[usize],
    bound: &SymbolTable,
) -> Result<Vec<(String, usize)>> {
    let Some(declared) = declared else { return Ok(Vec::new()) };

    if declared.is_empty() {
        let len: usize = shape.iter().product();
        if len != 1 {
            return Err(Error::ShapeMismatch {
                field: field.to_owned(),
                message: format!("declared scalar, got shape {shape:?}"),
            });
        }
        return Ok(Vec::new());
    }

    let actual = effective_shape(declared.len(), shape);
    if actual.len() != declared.len() {
        return Err(Error::ShapeMismatch {
            field: field.to_owned(),
            message: format!("declared rank {}, got shape {shape:?}", declared.len()),
        });
    }

    let mut bindings: Vec<(String, usize)> = Vec::new();
    for (dim, &size) in declared.iter().zip(actual.iter()) {
        match dim {
            Dim::Any => {}
            Dim::Fixed(expected) if *expected != size => {
                return Err(Error::ShapeMismatch {
                    field: field.to_owned(),
                    message: format!("declared {declared:?}, got shape {shape:?}"),
                });
            }
            Dim::Fixed(_) => {}
            Dim::Symbol(symbol) => {
                let previous = bound
                    .get(symbol.as_str())
                    .copied()
                    .or_else(|| bindings.iter().find(|(s, _)| s == symbol).map(|(_, n)| *n));
                match previous {
                    Some(b) if b != size => {
                        return Err(Error::DimensionConflict {
                            field: field.to_owned(),
                            symbol: symbol.clone(),
                            bound: b,
                            got: size,
                        });
                    }
                    Some(_) => {}
                    None => bindings.push((symbol.clone(), size)),
                }
            }
        }
    }
    Ok(bindings)
}

/// Symbol sizes carried by an already-accepted value.
pub(crate) fn symbol_sizes<'a>(declared: &'a [Dim], shape: &[usize]) -> Vec<(&'a str, usize)> {
    let actual = effective_shape(declared.len(), shape);
    declared
        .iter()
        .zip(actual)
        .filter_map(|(dim, size)| match dim {
            Dim::Symbol(s) => Some((s.as_str(), size)),
            _ => None,
        })
        .collect()
}

// ============================================================================
// Whole-tree validation
// ============================================================================

struct TreeValidator;

impl NodeVisitor for TreeValidator {
    fn enter_group(&mut self, path: &str, node: &Node) -> Result<()> {
        if let Some(name) = node.missing_required().into_iter().next() {
            return Err(Error::MissingRequired { path: path.to_owned(), name });
        }
        node.bound_symbols(None, &|_, _| false).map(|_| ())
    }
}

/// Check what per-mutation validation cannot see: required members. Symbol
/// consistency is re-checked across the whole tree as well.
pub fn validate_tree(root: &Node) -> Result<()> {
    walk(root, &mut TreeValidator)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ValidationMode;
    use crate::schema::registry;

    fn strict() -> ModelConfig {
        ModelConfig::default()
    }

    #[test]
    fn test_field_type_and_unit() {
        let shape = registry::lookup("NXaberration").unwrap();
        let ok = check_field(
            &shape,
            &strict(),
            "magnitude",
            ValueCell::scalar(1.23).with_unit(UnitCategory::Length),
            &SymbolTable::new(),
        )
        .unwrap();
        assert!(!ok.extension);

        let err = check_field(
            &shape,
            &strict(),
            "magnitude",
            ValueCell::scalar(1.23).with_unit(UnitCategory::Angle),
            &SymbolTable::new(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::UnitCategoryMismatch { .. }));

        let relaxed = ModelConfig { enforce_units: false, ..strict() };
        assert!(check_field(&shape, &relaxed, "magnitude", ValueCell::scalar(1.0), &SymbolTable::new()).is_ok());
    }

    #[test]
    fn test_widening_applied() {
        let shape = registry::lookup("NXentry").unwrap();
        let verdict = check_field(
            &shape,
            &strict(),
            "collection_time",
            ValueCell::scalar(30i64).with_unit(UnitCategory::Time),
            &SymbolTable::new(),
        )
        .unwrap();
        assert_eq!(verdict.cell.primitive_type(), PrimitiveType::Float64);
    }

    #[test]
    fn test_unknown_field_strict_vs_open() {
        let shape = registry::lookup("NXnote").unwrap();
        let err = check_field(&shape, &strict(), "mood", ValueCell::scalar("ok"), &SymbolTable::new())
            .unwrap_err();
        assert!(matches!(err, Error::UnknownField { .. }));

        let open = ModelConfig { validation: ValidationMode::Open, ..strict() };
        let verdict = check_field(&shape, &open, "mood", ValueCell::scalar("ok"), &SymbolTable::new()).unwrap();
        assert!(verdict.extension);
    }

    #[test]
    fn test_enumeration_lists_allowed() {
        let allowed = vec!["point".to_owned(), "area".to_owned()];
        let err = check_enumeration("layout", Some(&allowed), &ValueCell::scalar("Area")).unwrap_err();
        match err {
            Error::EnumerationViolation { value, allowed, .. } => {
                assert_eq!(value, "Area");
                assert_eq!(allowed.len(), 2);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(check_enumeration("layout", Some(&allowed), &ValueCell::vector(vec!["point", "area"])).is_ok());
    }

    #[test]
    fn test_dimensions_bind_and_conflict() {
        let dims = [Dim::symbol("n"), Dim::Fixed(3)];
        let bindings = resolve_dimensions("xyz", Some(&dims), &[5, 3], &SymbolTable::new()).unwrap();
        assert_eq!(bindings, vec![("n".to_owned(), 5)]);

        let mut bound = SymbolTable::new();
        bound.insert("n".into(), 5);
        assert!(resolve_dimensions("xyz", Some(&dims), &[5, 3], &bound).unwrap().is_empty());
        assert!(matches!(
            resolve_dimensions("xyz", Some(&dims), &[6, 3], &bound),
            Err(Error::DimensionConflict { bound: 5, got: 6, .. })
        ));
        assert!(matches!(
            resolve_dimensions("xyz", Some(&dims), &[5, 4], &bound),
            Err(Error::ShapeMismatch { .. })
        ));
        assert!(matches!(
            resolve_dimensions("xyz", Some(&dims), &[15], &bound),
            Err(Error::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_repeated_symbol_within_one_field() {
        let dims = [Dim::symbol("n"), Dim::symbol("n")];
        assert!(resolve_dimensions("m", Some(&dims), &[4, 4], &SymbolTable::new()).is_ok());
        assert!(matches!(
            resolve_dimensions("m", Some(&dims), &[4, 5], &SymbolTable::new()),
            Err(Error::DimensionConflict { .. })
        ));
    }

    #[test]
    fn test_scalar_matches_rank_one() {
        let dims = [Dim::symbol("n")];
        let bindings = resolve_dimensions("t", Some(&dims), &[], &SymbolTable::new()).unwrap();
        assert_eq!(bindings, vec![("n".to_owned(), 1)]);
        assert_eq!(symbol_sizes(&dims, &[]), vec![("n", 1)]);
    }

    #[test]
    fn test_nx_class_attribute_must_match() {
        let shape = registry::lookup("NXentry").unwrap();
        assert!(check_group_attribute(&shape, &strict(), "NX_class", ValueCell::scalar("NXentry")).is_ok());
        assert!(matches!(
            check_group_attribute(&shape, &strict(), "NX_class", ValueCell::scalar("NXdata")),
            Err(Error::TypeDeclarationMismatch { .. })
        ));
    }

    #[test]
    fn test_field_attribute_enumeration() {
        let shape = registry::lookup("NXtransformations").unwrap();
        let decl = shape.field_decl("phi");
        assert!(check_field_attribute(&shape, decl, &strict(), "transformation_type", ValueCell::scalar("rotation")).is_ok());
        assert!(matches!(
            check_field_attribute(&shape, decl, &strict(), "transformation_type", ValueCell::scalar("shear")),
            Err(Error::EnumerationViolation { .. })
        ));
        assert!(check_field_attribute(&shape, decl, &strict(), "units", ValueCell::scalar("deg")).is_ok());
        assert!(matches!(
            check_field_attribute(&shape, decl, &strict(), "colour", ValueCell::scalar("red")),
            Err(Error::UnknownField { .. })
        ));
    }
}
