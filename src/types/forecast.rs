//! Time-series forecasting types

use super::common::Scope;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Describes how the columns of [`ForecastRequest::data`] are interpreted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForecastSchema {
    pub timestamp_column: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub id_columns: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub freq: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub target_columns: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForecastParameters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prediction_length: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ForecastRequest {
    pub model_id: String,
    pub schema: ForecastSchema,
    /// Column name → values, all columns of equal length
    pub data: BTreeMap<String, Vec<serde_json::Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<ForecastParameters>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub future_data: Option<BTreeMap<String, Vec<serde_json::Value>>>,
    #[serde(flatten)]
    pub scope: Scope,
}

impl ForecastRequest {
    pub fn new(
        model_id: impl Into<String>,
        schema: ForecastSchema,
        data: BTreeMap<String, Vec<serde_json::Value>>,
    ) -> Self {
        Self {
            model_id: model_id.into(),
            schema,
            data,
            ..Default::default()
        }
    }

    pub fn prediction_length(mut self, length: u32) -> Self {
        self.parameters
            .get_or_insert_with(Default::default)
            .prediction_length = Some(length);
        self
    }

    /// Returns the first column whose length differs from the timestamp column.
    pub fn ragged_column(&self) -> Option<&str> {
        let expected = self.data.get(&self.schema.timestamp_column)?.len();
        self.data
            .iter()
            .find(|(_, values)| values.len() != expected)
            .map(|(name, _)| name.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForecastResponse {
    #[serde(default)]
    pub model_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    /// One row-set per series, column name → predicted values
    #[serde(default)]
    pub results: Vec<BTreeMap<String, serde_json::Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_data_points: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_data_points: Option<u64>,
}
