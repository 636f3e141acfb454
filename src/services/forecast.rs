//! Time-series forecasting.

use super::ServiceContext;
use crate::error::InferenceError;
use crate::types::{ForecastRequest, ForecastResponse};
use std::sync::Arc;

const FORECAST_PATH: &str = "/ml/v1/time_series/forecast";

#[derive(Debug, Clone)]
pub struct ForecastService {
    ctx: Arc<ServiceContext>,
}

impl ForecastService {
    pub fn new(ctx: Arc<ServiceContext>) -> Self {
        Self { ctx }
    }

    pub async fn forecast(&self, request: &ForecastRequest) -> Result<ForecastResponse, InferenceError> {
        if !request.data.contains_key(&request.schema.timestamp_column) {
            return Err(InferenceError::InvalidInput(format!(
                "data has no timestamp column '{}'",
                request.schema.timestamp_column
            )));
        }
        if let Some(column) = request.ragged_column() {
            return Err(InferenceError::InvalidInput(format!(
                "column '{column}' length differs from the timestamp column"
            )));
        }
        let mut prepared = request.clone();
        prepared.scope = self.ctx.scope(&request.scope);
        self.ctx.transport.post_json(FORECAST_PATH, &prepared, None).await
    }
}
