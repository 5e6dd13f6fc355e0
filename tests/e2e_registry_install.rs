//! Installing a process-wide registry. Kept in its own test binary: the
//! registry can only be set once per process.

use nexus_tree::schema::{self, catalog};
use nexus_tree::{BaseTypeRegistry, Error, FieldDecl, Node, PrimitiveType, TypeShape, UnitCategory};

#[test]
fn test_install_once_then_lookup() {
    let registry = catalog::builtin().with(
        TypeShape::new("NXslit")
            .field(FieldDecl::new("x_gap", PrimitiveType::Float64).units(UnitCategory::Length))
            .field(FieldDecl::new("y_gap", PrimitiveType::Float64).units(UnitCategory::Length)),
    );
    schema::install(registry).unwrap();

    let mut slit = Node::new("NXslit").unwrap();
    slit.set_field_scalar("x_gap", 0.2, UnitCategory::Length).unwrap();
    assert!(schema::lookup("NXentry").is_ok());

    assert!(matches!(
        schema::install(BaseTypeRegistry::new()),
        Err(Error::RegistryInitialized)
    ));
    assert!(schema::global().contains("NXslit"));
}
