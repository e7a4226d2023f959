use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{DonorFeatures, LikelihoodModel};

const CITY_PREFIX: &str = "city_";

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("failed to read likelihood model artifact: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid likelihood model artifact: {0}")]
    Format(#[from] serde_json::Error),
    #[error("model declares {features} features but {weights} weights")]
    ShapeMismatch { features: usize, weights: usize },
    #[error("unsupported model feature '{0}'")]
    UnknownFeature(String),
}

/// Ordered feature names a model was trained on.
///
/// Numeric names map to donor history and coordinates; `city_<name>` entries are
/// one-hot locale indicators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureSchema(Vec<String>);

impl FeatureSchema {
    pub fn new(names: Vec<String>) -> Result<Self, ModelError> {
        for name in &names {
            if !is_known_feature(name) {
                return Err(ModelError::UnknownFeature(name.clone()));
            }
        }
        Ok(Self(names))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Encode features in schema order. Unseen cities encode as all zeros.
    pub fn encode(&self, features: &DonorFeatures) -> Vec<f64> {
        self.0
            .iter()
            .map(|name| match name.as_str() {
                "months_since_first_donation" => features.months_since_first_donation,
                "number_of_donation" => features.donation_count,
                "pints_donated" => features.volume_donated,
                "latitude" => features.latitude,
                "longitude" => features.longitude,
                other => match other.strip_prefix(CITY_PREFIX) {
                    Some(city) if city.eq_ignore_ascii_case(features.city.trim()) => 1.0,
                    _ => 0.0,
                },
            })
            .collect()
    }
}

fn is_known_feature(name: &str) -> bool {
    matches!(
        name,
        "months_since_first_donation"
            | "number_of_donation"
            | "pints_donated"
            | "latitude"
            | "longitude"
    ) || name.starts_with(CITY_PREFIX)
}

#[derive(Debug, Deserialize)]
struct ModelArtifact {
    features: Vec<String>,
    weights: Vec<f64>,
    intercept: f64,
}

/// Logistic regression over the donor feature schema.
#[derive(Debug, Clone)]
pub struct LogisticLikelihoodModel {
    schema: FeatureSchema,
    weights: Vec<f64>,
    intercept: f64,
}

impl LogisticLikelihoodModel {
    pub fn new(schema: FeatureSchema, weights: Vec<f64>, intercept: f64) -> Result<Self, ModelError> {
        if schema.len() != weights.len() {
            return Err(ModelError::ShapeMismatch {
                features: schema.len(),
                weights: weights.len(),
            });
        }
        Ok(Self {
            schema,
            weights,
            intercept,
        })
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ModelError> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, ModelError> {
        let artifact: ModelArtifact = serde_json::from_reader(reader)?;
        let schema = FeatureSchema::new(artifact.features)?;
        Self::new(schema, artifact.weights, artifact.intercept)
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }
}

impl LikelihoodModel for LogisticLikelihoodModel {
    fn predict(&self, features: &DonorFeatures) -> f64 {
        let encoded = self.schema.encode(features);
        let logit = encoded
            .iter()
            .zip(&self.weights)
            .fold(self.intercept, |acc, (x, w)| acc + x * w);
        1.0 / (1.0 + (-logit).exp())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn features(city: &str) -> DonorFeatures {
        DonorFeatures {
            months_since_first_donation: 24.0,
            donation_count: 4.0,
            volume_donated: 4.0,
            latitude: 19.07,
            longitude: 72.87,
            city: city.to_string(),
        }
    }

    #[test]
    fn schema_one_hot_encodes_city() {
        let schema = FeatureSchema::new(vec![
            "number_of_donation".to_string(),
            "city_Mumbai".to_string(),
            "city_Pune".to_string(),
        ])
        .expect("schema");
        assert_eq!(schema.encode(&features("mumbai")), vec![4.0, 1.0, 0.0]);
        assert_eq!(schema.encode(&features("Chennai")), vec![4.0, 0.0, 0.0]);
    }

    #[test]
    fn artifact_loads_and_predicts_probability() {
        let json = r#"{"features":["number_of_donation","city_Mumbai"],"weights":[0.5,1.0],"intercept":-3.0}"#;
        let model = LogisticLikelihoodModel::from_reader(Cursor::new(json)).expect("model");
        let p = model.predict(&features("Mumbai"));
        // logit = -3 + 2 + 1 = 0
        assert!((p - 0.5).abs() < 1e-12);
    }

    #[test]
    fn artifact_rejects_shape_mismatch_and_unknown_features() {
        let mismatch = r#"{"features":["latitude"],"weights":[],"intercept":0.0}"#;
        assert!(matches!(
            LogisticLikelihoodModel::from_reader(Cursor::new(mismatch)),
            Err(ModelError::ShapeMismatch { .. })
        ));

        let unknown = r#"{"features":["blood_type"],"weights":[1.0],"intercept":0.0}"#;
        assert!(matches!(
            LogisticLikelihoodModel::from_reader(Cursor::new(unknown)),
            Err(ModelError::UnknownFeature(_))
        ));
    }
}
