//! End-to-end tests for the core object model.
//!
//! Each test builds nodes through the public API against the built-in
//! catalog and checks what the generic field/child operations accept.

use nexus_tree::{ChildMap, Document, Error, Node, UnitCategory, ValueCell};
use pretty_assertions::assert_eq;

// ============================================================================
// 1. Scalar field write, read back, rejected write
// ============================================================================

#[test]
fn test_aberration_magnitude_scenario() {
    let mut aberration = Node::new("NXaberration").unwrap();

    aberration
        .set_field_scalar("magnitude", 1.23, UnitCategory::Length)
        .unwrap();
    assert_eq!(aberration.get_field_scalar::<f64>("magnitude").unwrap(), 1.23);

    let err = aberration
        .set_field_scalar("magnitude", "x", UnitCategory::Length)
        .unwrap_err();
    assert!(matches!(err, Error::TypeMismatch { .. }), "got {err}");

    // the rejected write left the old value in place
    assert_eq!(aberration.get_field_scalar::<f64>("magnitude").unwrap(), 1.23);
}

// ============================================================================
// 2. Default child lookup and ambiguity
// ============================================================================

#[test]
fn test_default_child_becomes_ambiguous() {
    let mut detector = Node::new("NXdetector").unwrap();

    let mut child_a = Node::new("NXfabrication").unwrap();
    child_a.set_field_scalar("vendor", "A", None).unwrap();
    detector.set_child("NXfabrication", "fab1", child_a).unwrap();

    let only = detector.get_default_child("NXfabrication").unwrap();
    assert_eq!(only.name(), "fab1");
    assert_eq!(only.get_field_scalar::<String>("vendor").unwrap(), "A");

    let mut child_b = Node::new("NXfabrication").unwrap();
    child_b.set_field_scalar("vendor", "B", None).unwrap();
    detector.set_child("NXfabrication", "fab2", child_b).unwrap();

    assert!(matches!(
        detector.get_default_child("NXfabrication"),
        Err(Error::AmbiguousChild { count: 2, .. })
    ));
    let second = detector.get_child("NXfabrication", "fab2").unwrap();
    assert_eq!(second.get_field_scalar::<String>("vendor").unwrap(), "B");
}

#[test]
fn test_missing_child_is_a_read_error() {
    let detector = Node::new("NXdetector").unwrap();
    let err = detector.get_default_child("NXfabrication").unwrap_err();
    assert!(err.is_read_error());
    let err = detector.get_child("NXfabrication", "fab9").unwrap_err();
    assert!(matches!(err, Error::ChildNotFound { name: Some(ref n), .. } if n == "fab9"));
}

// ============================================================================
// 3. Enumerations
// ============================================================================

#[test]
fn test_ceos_model_enumeration() {
    let mut ceos = Node::new("NXaberration_model_ceos").unwrap();
    ceos.set_field_scalar("model", "ceos", None).unwrap();

    let err = ceos.set_field_scalar("model", "nion", None).unwrap_err();
    assert!(
        matches!(err, Error::EnumerationViolation { ref value, .. } if value == "nion"),
        "got {err}"
    );
    assert_eq!(ceos.get_field_scalar::<String>("model").unwrap(), "ceos");
}

#[test]
fn test_enumeration_is_case_sensitive() {
    let mut ceos = Node::new("NXaberration_model_ceos").unwrap();
    assert!(matches!(
        ceos.set_field_scalar("model", "CEOS", None),
        Err(Error::EnumerationViolation { .. })
    ));
}

#[test]
fn test_enumerated_field_attribute() {
    let mut transformations = Node::new("NXtransformations").unwrap();
    transformations
        .set_field_scalar("phi", 90.0, UnitCategory::Transformation)
        .unwrap();
    transformations
        .set_field_attribute("phi", "transformation_type", ValueCell::scalar("rotation"))
        .unwrap();
    assert!(matches!(
        transformations.set_field_attribute("phi", "transformation_type", ValueCell::scalar("shear")),
        Err(Error::EnumerationViolation { .. })
    ));
}

// ============================================================================
// 4. Dimension symbols
// ============================================================================

#[test]
fn test_sibling_dimensions_agree() {
    let mut group = Node::new("NXdetector_group").unwrap();
    let names = vec!["a", "b", "c", "d", "e"];
    group.set_field("group_names", ValueCell::vector(names)).unwrap();
    group.set_field("group_index", ValueCell::vector(vec![1i64, 2, 3, 4, 5])).unwrap();
    group
        .set_field_array("group_type", vec![1i64; 10], &[2, 5], None)
        .unwrap();
}

#[test]
fn test_sibling_dimensions_conflict() {
    let mut group = Node::new("NXdetector_group").unwrap();
    group.set_field("group_index", ValueCell::vector(vec![1i64, 2, 3, 4, 5])).unwrap();

    let err = group
        .set_field("group_parent", ValueCell::vector(vec![-1i64, 1, 1, 1, 1, 1]))
        .unwrap_err();
    assert!(
        matches!(
            err,
            Error::DimensionConflict { ref symbol, bound: 5, got: 6, .. } if symbol == "i"
        ),
        "got {err}"
    );
    assert!(group.field("group_parent").is_none());
}

#[test]
fn test_rebinding_by_replacing_the_only_field() {
    let mut group = Node::new("NXdetector_group").unwrap();
    group.set_field("group_index", ValueCell::vector(vec![1i64, 2, 3])).unwrap();
    // the only binder of `i` may change size
    group.set_field("group_index", ValueCell::vector(vec![1i64, 2, 3, 4])).unwrap();
    group.set_field("group_parent", ValueCell::vector(vec![0i64; 4])).unwrap();
}

#[test]
fn test_fixed_dimension_and_rank() {
    let mut group = Node::new("NXdetector_group").unwrap();
    assert!(matches!(
        group.set_field_array("group_type", vec![1i64; 15], &[3, 5], None),
        Err(Error::ShapeMismatch { .. })
    ));
    assert!(matches!(
        group.set_field("group_index", ValueCell::array(vec![1i64; 4], &[2, 2]).unwrap()),
        Err(Error::ShapeMismatch { .. })
    ));
}

#[test]
fn test_scalar_counts_as_one_for_rank_one() {
    let mut sample = Node::new("NXsample").unwrap();
    sample
        .set_field_scalar("temperature", 293.0, UnitCategory::Temperature)
        .unwrap();
    let cell = sample.get_field("temperature").unwrap();
    assert!(cell.is_scalar());
    assert_eq!(cell.as_scalar().unwrap().to_string(), "293");
}

// ============================================================================
// 5. Bulk child replacement
// ============================================================================

#[test]
fn test_set_all_then_get_all() {
    let mut instrument = Node::new("NXinstrument").unwrap();
    instrument.new_child("NXfabrication", Some("old")).unwrap();
    instrument.new_child("NXnote", Some("log")).unwrap();

    let mut replacement = ChildMap::new();
    for name in ["fab1", "fab2"] {
        let mut fab = Node::named("NXfabrication", name).unwrap();
        fab.set_field_scalar("identifier", name, None).unwrap();
        replacement.insert(name.to_owned(), fab);
    }
    instrument.set_all_children("NXfabrication", replacement.clone()).unwrap();

    let all = instrument.get_all_children("NXfabrication");
    assert_eq!(all.keys().copied().collect::<Vec<_>>(), vec!["fab1", "fab2"]);
    for (name, node) in &all {
        assert_eq!(*node, &replacement[*name]);
    }
    // other child types untouched
    assert!(instrument.get_child("NXnote", "log").is_ok());
}

#[test]
fn test_set_all_is_atomic() {
    let mut instrument = Node::new("NXinstrument").unwrap();
    instrument.new_child("NXfabrication", Some("keep")).unwrap();

    let mut bad = ChildMap::new();
    bad.insert("fab1".into(), Node::new("NXfabrication").unwrap());
    bad.insert("oops".into(), Node::new("NXnote").unwrap());
    assert!(matches!(
        instrument.set_all_children("NXfabrication", bad),
        Err(Error::TypeDeclarationMismatch { .. })
    ));

    let all = instrument.get_all_children("NXfabrication");
    assert_eq!(all.keys().copied().collect::<Vec<_>>(), vec!["keep"]);
}

#[test]
fn test_set_all_empty_clears_type() {
    let mut instrument = Node::new("NXinstrument").unwrap();
    instrument.new_child("NXfabrication", Some("a")).unwrap();
    instrument.set_all_children("NXfabrication", ChildMap::new()).unwrap();
    assert!(instrument.get_all_children("NXfabrication").is_empty());
}

// ============================================================================
// 6. Documents
// ============================================================================

#[test]
fn test_document_validate_and_resolve() {
    let mut doc = Document::new().unwrap();
    assert!(matches!(doc.validate(), Err(Error::MissingRequired { ref name, .. }) if name == "NXentry"));

    let entry = doc.root_mut().new_child("NXentry", Some("entry")).unwrap();
    let sample = entry.new_child("NXsample", None).unwrap();
    sample.set_field_scalar("depends_on", "transformations/phi", None).unwrap();
    sample
        .new_child("NXtransformations", None)
        .unwrap()
        .set_field_scalar("phi", 45.0, UnitCategory::Transformation)
        .unwrap();
    doc.validate().unwrap();

    let sample = doc.resolve("/entry/sample").unwrap().as_group().unwrap();
    let depends_on = sample.get_field_scalar::<String>("depends_on").unwrap();
    let phi = sample.resolve(&depends_on).unwrap().as_field().unwrap();
    assert_eq!(phi.cell().get::<f64>().unwrap(), 45.0);
}

#[test]
fn test_validate_reports_nested_missing_required() {
    let mut doc = Document::new().unwrap();
    let entry = doc.root_mut().new_child("NXentry", Some("entry")).unwrap();
    let instrument = entry.new_child("NXinstrument", None).unwrap();
    instrument.new_child("NXaberration_model_ceos", Some("corrector")).unwrap();

    let err = doc.validate().unwrap_err();
    assert!(
        matches!(
            err,
            Error::MissingRequired { ref path, ref name }
                if path == "/entry/instrument/corrector" && name == "model"
        ),
        "got {err}"
    );
}

#[test]
fn test_document_rejects_non_root() {
    let entry = Node::new("NXentry").unwrap();
    assert!(matches!(Document::from_root(entry), Err(Error::TypeDeclarationMismatch { .. })));
}
