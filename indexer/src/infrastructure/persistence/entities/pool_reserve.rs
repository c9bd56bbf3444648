//! Pool reserve entity for SeaORM

use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "pool_reserve")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub pool_id: String,
    pub asset1_id: i64,
    pub asset2_id: i64,
    pub provider: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub time: i64,
    pub reserve1: Decimal,
    pub reserve2: Decimal,
    pub tx_id: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
