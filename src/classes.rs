//! Typed views over generic nodes.
//!
//! Generated class accessors are thin: they hold a `&mut Node`, check its
//! declared type once, and forward every call to the generic field API, so
//! all validation stays in one place.

/// Declare a typed wrapper for one base class.
///
/// ```rust
/// nexus_tree::nexus_class! {
///     /// Accessors for `NXuser`.
///     pub struct NxUser => "NXuser" {
///         name / set_name: String,
///         email / set_email: String,
///     }
/// }
///
/// # fn main() -> nexus_tree::Result<()> {
/// let mut node = nexus_tree::Node::new("NXuser")?;
/// let mut user = NxUser::new(&mut node)?;
/// user.set_name("A. Scientist", None)?;
/// assert_eq!(user.name()?, "A. Scientist");
/// # Ok(())
/// # }
/// ```
#[macro_export]
macro_rules! nexus_class {
    (
        $(#[$meta:meta])*
        $vis:vis struct $wrapper:ident => $class:literal {
            $( $field:ident / $setter:ident : $ty:ty ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $wrapper<'a> {
            node: &'a mut $crate::Node,
        }

        impl<'a> $wrapper<'a> {
            pub const NX_CLASS: &'static str = $class;

            /// Wrap `node`; `TypeDeclarationMismatch` if it is not this class.
            pub fn new(node: &'a mut $crate::Node) -> $crate::Result<Self> {
                if node.declared_type() != $class {
                    return Err($crate::Error::TypeDeclarationMismatch {
                        declared: $class.to_owned(),
                        actual: node.declared_type().to_owned(),
                    });
                }
                Ok(Self { node })
            }

            pub fn node(&self) -> &$crate::Node {
                self.node
            }

            pub fn node_mut(&mut self) -> &mut $crate::Node {
                self.node
            }

            $(
                pub fn $field(&self) -> $crate::Result<$ty> {
                    self.node.get_field_scalar::<$ty>(stringify!($field))
                }

                pub fn $setter(
                    &mut self,
                    value: impl Into<$ty>,
                    unit: impl Into<Option<$crate::UnitCategory>>,
                ) -> $crate::Result<()> {
                    let value: $ty = value.into();
                    self.node.set_field_scalar(stringify!($field), value, unit)
                }
            )*
        }
    };
}

nexus_class! {
    /// Accessors for `NXaberration`.
    pub struct NxAberration => "NXaberration" {
        magnitude / set_magnitude: f64,
        uncertainty / set_uncertainty: f64,
        uncertainty_model / set_uncertainty_model: String,
        delta_time / set_delta_time: f64,
        angle / set_angle: f64,
        name / set_name: String,
        alias / set_alias: String,
    }
}

nexus_class! {
    /// Accessors for `NXfabrication`.
    pub struct NxFabrication => "NXfabrication" {
        vendor / set_vendor: String,
        model / set_model: String,
        identifier / set_identifier: String,
        construction_year / set_construction_year: String,
    }
}
