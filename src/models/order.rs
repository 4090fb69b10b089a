use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;

use crate::database::order;

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct OrderJson {
    /// Order number, serialized as a string since it can exceed a JS-safe integer.
    #[schema(example = "9278923470")]
    pub number: String,
    #[schema(value_type = String, example = "PROCESSED")]
    pub status: order::OrderStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<f64>, example = 500.0)]
    pub accrual: Option<Decimal>,
    pub uploaded_at: DateTime<Utc>,
}

impl From<order::Model> for OrderJson {
    fn from(value: order::Model) -> Self {
        let accrual = (value.status == order::OrderStatus::Processed).then_some(value.accrual);

        Self {
            number: value.number.to_string(),
            status: value.status,
            accrual,
            uploaded_at: value.uploaded_at,
        }
    }
}
