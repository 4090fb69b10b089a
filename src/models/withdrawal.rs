use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;

use crate::database::withdrawal;

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct WithdrawalJson {
    #[schema(example = "2377225624")]
    pub order: String,
    #[schema(value_type = f64, example = 751.0)]
    pub sum: Decimal,
    pub processed_at: DateTime<Utc>,
}

impl From<withdrawal::Model> for WithdrawalJson {
    fn from(value: withdrawal::Model) -> Self {
        Self {
            order: value.order_number.to_string(),
            sum: value.sum,
            processed_at: value.processed_at,
        }
    }
}
