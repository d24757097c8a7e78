use serde::{Deserialize, Serialize};

use crate::bounds::{DesignVariable, VARIABLE_COUNT};

/// Marker that prefixes the structured payload line in runner output.
pub const RESULT_SENTINEL: &str = "RESULT_JSON:";

/// Outcome of one optimization run, as read back from the engine artifacts.
///
/// Every field is optional: a missing artifact leaves its fields unset
/// rather than failing the whole read.
///
/// Non-finite values (the engine can write `NaN` cells) travel as the strings
/// `"NaN"`, `"Infinity"` and `"-Infinity"`, since JSON has no literal for them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResult {
    #[serde(
        rename = "best_normalized_params",
        default,
        skip_serializing_if = "Option::is_none",
        with = "wire::params"
    )]
    pub normalized_params: Option<[f64; VARIABLE_COUNT]>,

    #[serde(
        rename = "best_physical_params",
        default,
        skip_serializing_if = "Option::is_none",
        with = "wire::params"
    )]
    pub physical_params: Option<[f64; VARIABLE_COUNT]>,

    #[serde(default, skip_serializing_if = "Option::is_none", with = "wire::scalar")]
    pub acceleration_time_s: Option<f64>,

    #[serde(
        rename = "fuel_consumption_g_per_100km",
        default,
        skip_serializing_if = "Option::is_none",
        with = "wire::scalar"
    )]
    pub fuel_consumption: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none", with = "wire::scalar")]
    pub final_objective: Option<f64>,
}

impl OptimizationResult {
    /// All five fields are populated.
    pub fn is_complete(&self) -> bool {
        self.normalized_params.is_some()
            && self.physical_params.is_some()
            && self.acceleration_time_s.is_some()
            && self.fuel_consumption.is_some()
            && self.final_objective.is_some()
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn physical(&self, variable: DesignVariable) -> Option<f64> {
        self.physical_params.map(|p| p[variable as usize])
    }

    /// Encode as a single `RESULT_JSON: {...}` line.
    pub fn to_sentinel_line(&self) -> Result<String, serde_json::Error> {
        Ok(format!("{} {}", RESULT_SENTINEL, serde_json::to_string(self)?))
    }
}

mod wire {
    use serde::{Deserialize, Serialize};

    const NAN: &str = "NaN";
    const INFINITY: &str = "Infinity";
    const NEG_INFINITY: &str = "-Infinity";

    #[derive(Serialize, Deserialize)]
    #[serde(untagged)]
    enum WireFloat {
        Number(f64),
        Label(String),
    }

    impl From<f64> for WireFloat {
        fn from(value: f64) -> Self {
            if value.is_finite() {
                Self::Number(value)
            } else if value.is_nan() {
                Self::Label(NAN.to_string())
            } else if value > 0.0 {
                Self::Label(INFINITY.to_string())
            } else {
                Self::Label(NEG_INFINITY.to_string())
            }
        }
    }

    impl WireFloat {
        fn into_f64(self) -> Result<f64, String> {
            match self {
                Self::Number(value) => Ok(value),
                Self::Label(label) => match label.as_str() {
                    NAN => Ok(f64::NAN),
                    INFINITY => Ok(f64::INFINITY),
                    NEG_INFINITY => Ok(f64::NEG_INFINITY),
                    other => Err(format!("expected a number, got \"{other}\"")),
                },
            }
        }
    }

    pub mod scalar {
        use super::WireFloat;
        use serde::{de::Error, Deserialize, Deserializer, Serialize, Serializer};

        pub fn serialize<S: Serializer>(value: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error> {
            value.map(WireFloat::from).serialize(serializer)
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
            Option::<WireFloat>::deserialize(deserializer)?
                .map(WireFloat::into_f64)
                .transpose()
                .map_err(D::Error::custom)
        }
    }

    pub mod params {
        use super::WireFloat;
        use crate::bounds::VARIABLE_COUNT;
        use serde::{de::Error, Deserialize, Deserializer, Serialize, Serializer};

        pub fn serialize<S: Serializer>(
            value: &Option<[f64; VARIABLE_COUNT]>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            value.map(|row| row.map(WireFloat::from)).serialize(serializer)
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<[f64; VARIABLE_COUNT]>, D::Error> {
            let Some(raw) = Option::<[WireFloat; VARIABLE_COUNT]>::deserialize(deserializer)? else {
                return Ok(None);
            };
            let mut row = [0.0; VARIABLE_COUNT];
            for (slot, value) in row.iter_mut().zip(raw) {
                *slot = value.into_f64().map_err(D::Error::custom)?;
            }
            Ok(Some(row))
        }
    }
}
