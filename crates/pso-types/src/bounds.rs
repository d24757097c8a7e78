//! Search bounds for the four hybrid-vehicle design variables.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::{PsoError, PsoResult};

/// Number of design variables the optimizer works on.
pub const VARIABLE_COUNT: usize = 4;

/// The design variables, in the order the engine expects them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DesignVariable {
    MotorPower,
    BatteryCapacity,
    EngineDisplacement,
    GearCount,
}

impl DesignVariable {
    pub const ALL: [DesignVariable; VARIABLE_COUNT] = [
        DesignVariable::MotorPower,
        DesignVariable::BatteryCapacity,
        DesignVariable::EngineDisplacement,
        DesignVariable::GearCount,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::MotorPower => "Motor power",
            Self::BatteryCapacity => "Battery capacity",
            Self::EngineDisplacement => "Engine displacement",
            Self::GearCount => "Gear count",
        }
    }

    /// Physical unit, empty for dimensionless counts.
    pub fn unit(self) -> &'static str {
        match self {
            Self::MotorPower => "kW",
            Self::BatteryCapacity => "kWh",
            Self::EngineDisplacement => "L",
            Self::GearCount => "",
        }
    }

    pub fn default_range(self) -> Range {
        match self {
            Self::MotorPower => Range::new(40.0, 80.0),
            Self::BatteryCapacity => Range::new(15.0, 35.0),
            Self::EngineDisplacement => Range::new(1.5, 2.2),
            Self::GearCount => Range::new(4.0, 6.0),
        }
    }
}

/// A closed `[min, max]` search interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Range {
    pub min: f64,
    pub max: f64,
}

impl Range {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }
}

/// Validated bounds for all four design variables.
///
/// Construct through [`ParameterBounds::new`], [`ParameterBounds::from_pairs`]
/// or [`make_bounds`]; every constructor enforces `min <= max` and finiteness.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(into = "Vec<[f64; 2]>")]
pub struct ParameterBounds {
    ranges: [Range; VARIABLE_COUNT],
}

impl ParameterBounds {
    pub fn new(ranges: [Range; VARIABLE_COUNT]) -> PsoResult<Self> {
        for (index, range) in ranges.iter().enumerate() {
            validate_range(index, range.min, range.max)?;
        }
        Ok(Self { ranges })
    }

    /// Build bounds from raw `(min, max)` pairs as supplied by a caller.
    pub fn from_pairs(raw: &[Vec<f64>]) -> PsoResult<Self> {
        if raw.len() != VARIABLE_COUNT {
            return Err(PsoError::WrongArity { actual: raw.len() });
        }

        let mut ranges = [Range::new(0.0, 0.0); VARIABLE_COUNT];
        for (index, pair) in raw.iter().enumerate() {
            let [min, max] = pair.as_slice() else {
                return Err(PsoError::Validation {
                    index,
                    min: pair.first().copied().unwrap_or(f64::NAN),
                    max: pair.get(1).copied().unwrap_or(f64::NAN),
                    reason: format!("expected a [min, max] pair, got {} values", pair.len()),
                });
            };
            ranges[index] = Range::new(*min, *max);
        }

        Self::new(ranges)
    }

    pub fn range(&self, variable: DesignVariable) -> Range {
        self.ranges[variable as usize]
    }

    pub fn ranges(&self) -> &[Range; VARIABLE_COUNT] {
        &self.ranges
    }

    pub fn to_pairs(&self) -> Vec<[f64; 2]> {
        self.ranges.iter().map(|r| [r.min, r.max]).collect()
    }

    /// Render as the engine's native 4x2 numeric matrix, e.g. `[40 80;15 35;1.5 2.2;4 6]`.
    pub fn to_matrix_literal(&self) -> String {
        let rows: Vec<String> = self
            .ranges
            .iter()
            .map(|r| format!("{} {}", r.min, r.max))
            .collect();
        format!("[{}]", rows.join(";"))
    }

    pub fn to_json(&self) -> PsoResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

impl Default for ParameterBounds {
    fn default() -> Self {
        Self {
            ranges: DesignVariable::ALL.map(DesignVariable::default_range),
        }
    }
}

impl From<ParameterBounds> for Vec<[f64; 2]> {
    fn from(bounds: ParameterBounds) -> Self {
        bounds.to_pairs()
    }
}

impl<'de> Deserialize<'de> for ParameterBounds {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = Vec::<Vec<f64>>::deserialize(deserializer)?;
        ParameterBounds::from_pairs(&raw).map_err(serde::de::Error::custom)
    }
}

impl fmt::Display for ParameterBounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, variable) in DesignVariable::ALL.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            let range = self.range(*variable);
            write!(f, "  {}: {}-{}", variable.label(), range.min, range.max)?;
            if !variable.unit().is_empty() {
                write!(f, " {}", variable.unit())?;
            }
        }
        Ok(())
    }
}

/// Validate optional caller-supplied bounds.
///
/// `None` means the engine should apply its own defaults and passes through
/// unchanged.
pub fn make_bounds(raw: Option<&[Vec<f64>]>) -> PsoResult<Option<ParameterBounds>> {
    raw.map(ParameterBounds::from_pairs).transpose()
}

fn validate_range(index: usize, min: f64, max: f64) -> PsoResult<()> {
    let reason = if !min.is_finite() || !max.is_finite() {
        "values must be finite"
    } else if min > max {
        "min exceeds max"
    } else {
        return Ok(());
    };

    Err(PsoError::Validation {
        index,
        min,
        max,
        reason: reason.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(values: &[[f64; 2]]) -> Vec<Vec<f64>> {
        values.iter().map(|p| p.to_vec()).collect()
    }

    #[test]
    fn accepts_valid_pairs() {
        let raw = pairs(&[[40.0, 80.0], [15.0, 35.0], [1.5, 2.2], [4.0, 6.0]]);
        let bounds = ParameterBounds::from_pairs(&raw).unwrap();
        assert_eq!(bounds, ParameterBounds::default());
        assert_eq!(bounds.range(DesignVariable::EngineDisplacement).max, 2.2);
    }

    #[test]
    fn accepts_degenerate_interval() {
        let raw = pairs(&[[50.0, 50.0], [15.0, 35.0], [1.5, 2.2], [5.0, 5.0]]);
        assert!(ParameterBounds::from_pairs(&raw).is_ok());
    }

    #[test]
    fn rejects_inverted_pair_with_index() {
        for bad in 0..VARIABLE_COUNT {
            let mut values = [[40.0, 80.0], [15.0, 35.0], [1.5, 2.2], [4.0, 6.0]];
            values[bad].swap(0, 1);
            let err = ParameterBounds::from_pairs(&pairs(&values)).unwrap_err();
            match err {
                PsoError::Validation { index, min, max, .. } => {
                    assert_eq!(index, bad);
                    assert_eq!(min, values[bad][0]);
                    assert_eq!(max, values[bad][1]);
                }
                other => panic!("Expected Validation error, got {other:?}"),
            }
        }
    }

    #[test]
    fn rejects_non_finite_values() {
        let raw = pairs(&[[40.0, 80.0], [f64::NAN, 35.0], [1.5, 2.2], [4.0, 6.0]]);
        assert!(matches!(
            ParameterBounds::from_pairs(&raw),
            Err(PsoError::Validation { index: 1, .. })
        ));

        let raw = pairs(&[[40.0, 80.0], [15.0, 35.0], [1.5, f64::INFINITY], [4.0, 6.0]]);
        assert!(matches!(
            ParameterBounds::from_pairs(&raw),
            Err(PsoError::Validation { index: 2, .. })
        ));
    }

    #[test]
    fn rejects_wrong_arity() {
        let raw = pairs(&[[40.0, 80.0], [15.0, 35.0], [1.5, 2.2]]);
        assert!(matches!(
            ParameterBounds::from_pairs(&raw),
            Err(PsoError::WrongArity { actual: 3 })
        ));

        let raw = vec![vec![40.0, 80.0], vec![15.0], vec![1.5, 2.2], vec![4.0, 6.0]];
        assert!(matches!(
            ParameterBounds::from_pairs(&raw),
            Err(PsoError::Validation { index: 1, .. })
        ));
    }

    #[test]
    fn make_bounds_passes_none_through() {
        assert!(make_bounds(None).unwrap().is_none());
    }

    #[test]
    fn matrix_literal_format() {
        assert_eq!(
            ParameterBounds::default().to_matrix_literal(),
            "[40 80;15 35;1.5 2.2;4 6]"
        );
    }

    #[test]
    fn json_form_is_nested_pairs() {
        let json = ParameterBounds::default().to_json().unwrap();
        assert_eq!(json, "[[40.0,80.0],[15.0,35.0],[1.5,2.2],[4.0,6.0]]");

        let back: ParameterBounds = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ParameterBounds::default());

        let inverted = "[[80,40],[15,35],[1.5,2.2],[4,6]]";
        assert!(serde_json::from_str::<ParameterBounds>(inverted).is_err());
    }
}
