//! Built-in catalog: a working subset of the NeXus base classes.
//!
//! Deprecated classes (`NXgeometry`) are separate entries with no link to
//! their replacements.

use super::{
    AttributeDecl, BaseTypeRegistry, ChildDecl, ClassCategory, Dim, FieldDecl, TypeShape,
};
use crate::model::{PrimitiveType as P, UnitCategory as U};

/// Fixed instance names of the CEOS aberration coefficients.
pub const CEOS_COEFFICIENTS: [&str; 25] = [
    "c_1_0", "c_1_2_a", "c_1_2_b", "c_2_1_a", "c_2_1_b", "c_2_3_a", "c_2_3_b", "c_3_0",
    "c_3_2_a", "c_3_2_b", "c_3_4_a", "c_3_4_b", "c_4_1_a", "c_4_1_b", "c_4_3_a", "c_4_3_b",
    "c_4_5_a", "c_4_5_b", "c_5_0", "c_5_2_a", "c_5_2_b", "c_5_4_a", "c_5_4_b", "c_5_6_a",
    "c_5_6_b",
];

const SAMPLE_TYPES: [&str; 10] = [
    "sample",
    "sample+can",
    "can",
    "sample+buffer",
    "buffer",
    "calibration sample",
    "normalisation sample",
    "simulated data",
    "none",
    "sample environment",
];

pub fn builtin() -> BaseTypeRegistry {
    let mut registry = BaseTypeRegistry::new();
    for shape in [
        nx_root(),
        nx_entry(),
        nx_instrument(),
        nx_sample(),
        nx_data(),
        nx_detector(),
        nx_detector_group(),
        nx_note(),
        nx_user(),
        nx_fabrication(),
        nx_aberration(),
        nx_aberration_model_ceos(),
        nx_transformations(),
        nx_geometry(),
    ] {
        registry.insert(shape);
    }
    registry
}

fn text(name: &str) -> FieldDecl {
    FieldDecl::new(name, P::Utf8)
}

fn nx_root() -> TypeShape {
    TypeShape::new("NXroot")
        .attribute(AttributeDecl::new("file_name", P::Utf8))
        .attribute(AttributeDecl::new("file_time", P::DateTime))
        .attribute(AttributeDecl::new("file_update_time", P::DateTime))
        .attribute(AttributeDecl::new("NeXus_version", P::Utf8))
        .attribute(AttributeDecl::new("HDF5_Version", P::Utf8))
        .attribute(AttributeDecl::new("creator", P::Utf8))
        .attribute(AttributeDecl::new("creator_version", P::Utf8))
        .group(ChildDecl::new("NXentry").required())
}

fn nx_entry() -> TypeShape {
    TypeShape::new("NXentry")
        .attribute(AttributeDecl::new("IDF_Version", P::Utf8))
        .field(text("title"))
        .field(text("experiment_identifier"))
        .field(text("experiment_description"))
        .field(text("collection_identifier"))
        .field(text("entry_identifier"))
        .field(
            text("definition")
                .attribute(AttributeDecl::new("URL", P::Utf8)),
        )
        .field(FieldDecl::new("start_time", P::DateTime))
        .field(FieldDecl::new("end_time", P::DateTime))
        .field(FieldDecl::new("duration", P::Int64).units(U::Time))
        .field(FieldDecl::new("collection_time", P::Float64).units(U::Time))
        .field(text("program_name").attribute(AttributeDecl::new("configuration", P::Utf8)))
        .field(text("run_cycle"))
        .field(FieldDecl::new("entry_identifier_uuid", P::Utf8))
        .group(ChildDecl::new("NXdata"))
        .group(ChildDecl::new("NXinstrument"))
        .group(ChildDecl::new("NXsample"))
        .group(ChildDecl::new("NXuser"))
        .group(ChildDecl::new("NXnote"))
}

fn nx_instrument() -> TypeShape {
    TypeShape::new("NXinstrument")
        .field(text("name").attribute(AttributeDecl::new("short_name", P::Utf8)))
        .group(ChildDecl::new("NXdetector"))
        .group(ChildDecl::new("NXdetector_group"))
        .group(ChildDecl::new("NXfabrication"))
        .group(ChildDecl::new("NXaberration_model_ceos"))
        .group(ChildDecl::new("NXtransformations"))
        .group(ChildDecl::new("NXnote"))
}

fn nx_sample() -> TypeShape {
    TypeShape::new("NXsample")
        .symbol("n_comp")
        .symbol("n_Temp")
        .field(text("name"))
        .field(text("chemical_formula"))
        .field(
            FieldDecl::new("temperature", P::Float64)
                .units(U::Temperature)
                .dims([Dim::symbol("n_Temp")]),
        )
        .field(
            FieldDecl::new("unit_cell", P::Float64)
                .units(U::Length)
                .dims([Dim::symbol("n_comp"), Dim::Fixed(6)]),
        )
        .field(
            FieldDecl::new("concentration", P::Float64)
                .units(U::MassDensity)
                .dims([Dim::symbol("n_comp")]),
        )
        .field(text("type").enumeration(SAMPLE_TYPES))
        .field(text("depends_on"))
        .group(ChildDecl::new("NXtransformations"))
        .group(ChildDecl::new("NXnote"))
        .group(ChildDecl::new("NXgeometry"))
}

fn nx_data() -> TypeShape {
    TypeShape::new("NXdata")
        .attribute(AttributeDecl::new("signal", P::Utf8))
        .attribute(AttributeDecl::new("auxiliary_signals", P::Utf8))
        .field(text("title"))
        .field(FieldDecl::template("DATA", P::AnyNumber).units(U::Any))
}

fn nx_detector() -> TypeShape {
    TypeShape::new("NXdetector")
        .symbol("np")
        .symbol("i")
        .symbol("j")
        .symbol("tof")
        .field(
            FieldDecl::new("data", P::AnyNumber)
                .units(U::Any)
                .dims([Dim::symbol("np"), Dim::symbol("i"), Dim::symbol("j")]),
        )
        .field(
            FieldDecl::new("distance", P::Float64)
                .units(U::Length)
                .dims([Dim::symbol("np"), Dim::symbol("i"), Dim::symbol("j")]),
        )
        .field(
            FieldDecl::new("polar_angle", P::Float64)
                .units(U::Angle)
                .dims([Dim::symbol("np"), Dim::symbol("i"), Dim::symbol("j")]),
        )
        .field(
            FieldDecl::new("azimuthal_angle", P::Float64)
                .units(U::Angle)
                .dims([Dim::symbol("np"), Dim::symbol("i"), Dim::symbol("j")]),
        )
        .field(
            FieldDecl::new("time_of_flight", P::Float64)
                .units(U::TimeOfFlight)
                .dims([Dim::symbol("tof")]),
        )
        .field(
            FieldDecl::new("x_pixel_offset", P::Float64)
                .units(U::Length)
                .dims([Dim::symbol("i"), Dim::symbol("j")]),
        )
        .field(
            FieldDecl::new("y_pixel_offset", P::Float64)
                .units(U::Length)
                .dims([Dim::symbol("i"), Dim::symbol("j")]),
        )
        .field(FieldDecl::new("x_pixel_size", P::Float64).units(U::Length))
        .field(FieldDecl::new("y_pixel_size", P::Float64).units(U::Length))
        .field(text("description"))
        .field(text("local_name"))
        .field(text("type"))
        .field(text("layout").enumeration(["point", "linear", "area"]))
        .field(text("serial_number"))
        .field(FieldDecl::new("detector_number", P::Int64))
        .field(FieldDecl::new("dead_time", P::Float64).units(U::Time))
        .field(text("depends_on"))
        .group(ChildDecl::new("NXfabrication"))
        .group(ChildDecl::new("NXtransformations"))
        .group(ChildDecl::new("NXnote"))
        .group(ChildDecl::new("NXgeometry"))
}

fn nx_detector_group() -> TypeShape {
    TypeShape::new("NXdetector_group")
        .symbol("i")
        .field(text("group_names").dims([Dim::symbol("i")]))
        .field(FieldDecl::new("group_index", P::Int64).dims([Dim::symbol("i")]))
        .field(FieldDecl::new("group_parent", P::Int64).dims([Dim::symbol("i")]))
        .field(FieldDecl::new("group_type", P::Int64).dims([Dim::Fixed(2), Dim::symbol("i")]))
}

fn nx_note() -> TypeShape {
    TypeShape::new("NXnote")
        .field(text("author"))
        .field(FieldDecl::new("date", P::DateTime))
        .field(text("type"))
        .field(text("file_name"))
        .field(text("description"))
        .field(FieldDecl::new("sequence_index", P::UInt64))
        .field(FieldDecl::new("data", P::Binary).dims([Dim::Any]))
}

fn nx_user() -> TypeShape {
    TypeShape::new("NXuser")
        .field(text("name"))
        .field(text("role"))
        .field(text("affiliation"))
        .field(text("address"))
        .field(text("telephone_number"))
        .field(text("email"))
        .field(text("facility_user_id"))
        .field(text("ORCID"))
}

fn nx_fabrication() -> TypeShape {
    TypeShape::new("NXfabrication")
        .field(text("vendor"))
        .field(text("model").attribute(AttributeDecl::new("version", P::Utf8)))
        .field(text("identifier"))
        .field(text("construction_year"))
        .field(text("capability").dims([Dim::Any]))
}

fn nx_aberration() -> TypeShape {
    TypeShape::new("NXaberration")
        .field(FieldDecl::new("magnitude", P::AnyNumber).units(U::Length))
        .field(FieldDecl::new("uncertainty", P::AnyNumber).units(U::Length))
        .field(text("uncertainty_model"))
        .field(FieldDecl::new("delta_time", P::AnyNumber).units(U::Time))
        .field(FieldDecl::new("angle", P::AnyNumber).units(U::Angle))
        .field(text("name"))
        .field(text("alias"))
}

fn nx_aberration_model_ceos() -> TypeShape {
    CEOS_COEFFICIENTS.into_iter().fold(
        TypeShape::new("NXaberration_model_ceos")
            .category(ClassCategory::Contributed)
            .field(text("model").enumeration(["ceos"]).required()),
        |shape, name| shape.group(ChildDecl::named("NXaberration", name)),
    )
}

fn nx_transformations() -> TypeShape {
    TypeShape::new("NXtransformations").field(
        FieldDecl::template("AXISNAME", P::AnyNumber)
            .units(U::Transformation)
            .attribute(
                AttributeDecl::new("transformation_type", P::Utf8)
                    .enumeration(["translation", "rotation"]),
            )
            .attribute(AttributeDecl::new("vector", P::Float64))
            .attribute(AttributeDecl::new("offset", P::Float64))
            .attribute(AttributeDecl::new("depends_on", P::Utf8)),
    )
}

fn nx_geometry() -> TypeShape {
    TypeShape::new("NXgeometry")
        .deprecated("as of NeXus 2022.06: use NXtransformations and NXoff_geometry")
        .field(text("description"))
        .field(FieldDecl::new("component_index", P::Int64))
        .group(ChildDecl::new("NXnote"))
}
