//! NXDL unit categories (`NX_LENGTH`, `NX_ANGLE`, ...).
//!
//! Only the category tag is stored; converting between concrete units
//! is left to the caller.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

/// Unit category of a field, as declared by the `units` attribute of an
/// NXDL field definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum UnitCategory {
    Angle,
    /// Matches any supplied category.
    Any,
    Area,
    Charge,
    Count,
    CrossSection,
    Current,
    Dimensionless,
    Emittance,
    Energy,
    Flux,
    Frequency,
    Length,
    Mass,
    MassDensity,
    MolecularWeight,
    Period,
    PerArea,
    PerLength,
    Power,
    Pressure,
    Pulses,
    ScatteringLengthDensity,
    SolidAngle,
    Temperature,
    Time,
    TimeOfFlight,
    Transformation,
    Unitless,
    Voltage,
    Volume,
    Wavelength,
    Wavenumber,
}

const ALL: [UnitCategory; 33] = [
    UnitCategory::Angle,
    UnitCategory::Any,
    UnitCategory::Area,
    UnitCategory::Charge,
    UnitCategory::Count,
    UnitCategory::CrossSection,
    UnitCategory::Current,
    UnitCategory::Dimensionless,
    UnitCategory::Emittance,
    UnitCategory::Energy,
    UnitCategory::Flux,
    UnitCategory::Frequency,
    UnitCategory::Length,
    UnitCategory::Mass,
    UnitCategory::MassDensity,
    UnitCategory::MolecularWeight,
    UnitCategory::Period,
    UnitCategory::PerArea,
    UnitCategory::PerLength,
    UnitCategory::Power,
    UnitCategory::Pressure,
    UnitCategory::Pulses,
    UnitCategory::ScatteringLengthDensity,
    UnitCategory::SolidAngle,
    UnitCategory::Temperature,
    UnitCategory::Time,
    UnitCategory::TimeOfFlight,
    UnitCategory::Transformation,
    UnitCategory::Unitless,
    UnitCategory::Voltage,
    UnitCategory::Volume,
    UnitCategory::Wavelength,
    UnitCategory::Wavenumber,
];

impl UnitCategory {
    pub fn nxdl_name(self) -> &'static str {
        match self {
            UnitCategory::Angle => "NX_ANGLE",
            UnitCategory::Any => "NX_ANY",
            UnitCategory::Area => "NX_AREA",
            UnitCategory::Charge => "NX_CHARGE",
            UnitCategory::Count => "NX_COUNT",
            UnitCategory::CrossSection => "NX_CROSS_SECTION",
            UnitCategory::Current => "NX_CURRENT",
            UnitCategory::Dimensionless => "NX_DIMENSIONLESS",
            UnitCategory::Emittance => "NX_EMITTANCE",
            UnitCategory::Energy => "NX_ENERGY",
            UnitCategory::Flux => "NX_FLUX",
            UnitCategory::Frequency => "NX_FREQUENCY",
            UnitCategory::Length => "NX_LENGTH",
            UnitCategory::Mass => "NX_MASS",
            UnitCategory::MassDensity => "NX_MASS_DENSITY",
            UnitCategory::MolecularWeight => "NX_MOLECULAR_WEIGHT",
            UnitCategory::Period => "NX_PERIOD",
            UnitCategory::PerArea => "NX_PER_AREA",
            UnitCategory::PerLength => "NX_PER_LENGTH",
            UnitCategory::Power => "NX_POWER",
            UnitCategory::Pressure => "NX_PRESSURE",
            UnitCategory::Pulses => "NX_PULSES",
            UnitCategory::ScatteringLengthDensity => "NX_SCATTERING_LENGTH_DENSITY",
            UnitCategory::SolidAngle => "NX_SOLID_ANGLE",
            UnitCategory::Temperature => "NX_TEMPERATURE",
            UnitCategory::Time => "NX_TIME",
            UnitCategory::TimeOfFlight => "NX_TIME_OF_FLIGHT",
            UnitCategory::Transformation => "NX_TRANSFORMATION",
            UnitCategory::Unitless => "NX_UNITLESS",
            UnitCategory::Voltage => "NX_VOLTAGE",
            UnitCategory::Volume => "NX_VOLUME",
            UnitCategory::Wavelength => "NX_WAVELENGTH",
            UnitCategory::Wavenumber => "NX_WAVENUMBER",
        }
    }

    /// Whether a field declared with `declared` may hold a value tagged
    /// `supplied`.
    ///
    /// - `NX_ANY` admits everything.
    /// - No declared category (or `NX_UNITLESS`) admits an untagged value
    ///   or `NX_UNITLESS`.
    /// - Every other category requires the exact same tag.
    pub fn admits(declared: Option<UnitCategory>, supplied: Option<UnitCategory>) -> bool {
        match declared {
            Some(UnitCategory::Any) => true,
            None | Some(UnitCategory::Unitless) => {
                matches!(supplied, None | Some(UnitCategory::Unitless))
            }
            Some(category) => supplied == Some(category),
        }
    }

    /// Label used in error messages for an optional category.
    pub(crate) fn label(category: Option<UnitCategory>) -> String {
        category.map_or_else(|| "no units".to_owned(), |c| c.nxdl_name().to_owned())
    }
}

impl fmt::Display for UnitCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.nxdl_name())
    }
}

impl FromStr for UnitCategory {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ALL.iter()
            .copied()
            .find(|c| c.nxdl_name() == s)
            .ok_or_else(|| Error::Schema(format!("unknown unit category '{s}'")))
    }
}

impl TryFrom<String> for UnitCategory {
    type Error = Error;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<UnitCategory> for String {
    fn from(c: UnitCategory) -> Self {
        c.nxdl_name().to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nxdl_names_round_trip() {
        for c in ALL {
            assert_eq!(c.nxdl_name().parse::<UnitCategory>().unwrap(), c);
        }
        assert!("NX_FURLONG".parse::<UnitCategory>().is_err());
    }

    #[test]
    fn test_exact_category_required() {
        use UnitCategory::*;
        assert!(UnitCategory::admits(Some(Length), Some(Length)));
        assert!(!UnitCategory::admits(Some(Length), Some(Angle)));
        assert!(!UnitCategory::admits(Some(Length), None));
        assert!(!UnitCategory::admits(Some(Length), Some(Any)));
    }

    #[test]
    fn test_any_and_unitless() {
        use UnitCategory::*;
        assert!(UnitCategory::admits(Some(Any), Some(Energy)));
        assert!(UnitCategory::admits(Some(Any), None));
        assert!(UnitCategory::admits(None, None));
        assert!(UnitCategory::admits(None, Some(Unitless)));
        assert!(!UnitCategory::admits(None, Some(Time)));
        assert!(UnitCategory::admits(Some(Unitless), None));
    }

    #[test]
    fn test_serde_uses_nxdl_names() {
        let json = serde_json::to_string(&UnitCategory::TimeOfFlight).unwrap();
        assert_eq!(json, "\"NX_TIME_OF_FLIGHT\"");
        let back: UnitCategory = serde_json::from_str(&json).unwrap();
        assert_eq!(back, UnitCategory::TimeOfFlight);
    }
}
