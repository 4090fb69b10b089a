use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::database::balance;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct BalanceResponse {
    #[schema(value_type = f64, example = 500.5)]
    pub current: Decimal,
    #[schema(value_type = f64, example = 42.0)]
    pub withdrawn: Decimal,
}

impl From<balance::Model> for BalanceResponse {
    fn from(value: balance::Model) -> Self {
        Self {
            current: value.current,
            withdrawn: value.withdrawn,
        }
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct WithdrawRequest {
    #[schema(example = "2377225624")]
    pub order: String,
    #[schema(value_type = f64, example = 751.0)]
    pub sum: Decimal,
}
