//! Latest price entity for SeaORM; one row per (asset, quote asset)

use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "latest_price")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub asset_id: i64,
    #[sea_orm(primary_key, auto_increment = false)]
    pub quote_asset_id: i64,
    pub provider: String,
    pub time: i64,
    pub tx_id: i64,
    pub swap_index: i32,
    pub price: Decimal,
    pub amount1: Decimal,
    pub amount2: Decimal,
    pub operation: i16,
    pub outlier: Option<bool>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
