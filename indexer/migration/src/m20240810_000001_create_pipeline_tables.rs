use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        if !manager.has_table("asset").await? {
            manager
                .create_table(
                    Table::create()
                        .table(Asset::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Asset::Id)
                                .big_integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(Asset::Unit)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Asset::Name).string())
                        .col(ColumnDef::new(Asset::Ticker).string())
                        .col(ColumnDef::new(Asset::Decimals).small_integer())
                        .col(
                            ColumnDef::new(Asset::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null()
                                .default(Expr::current_timestamp()),
                        )
                        .to_owned(),
                )
                .await?;
        }

        if !manager.has_table("tx").await? {
            manager
                .create_table(
                    Table::create()
                        .table(Tx::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Tx::Id)
                                .big_integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Tx::Hash).string().not_null().unique_key())
                        .col(
                            ColumnDef::new(Tx::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null()
                                .default(Expr::current_timestamp()),
                        )
                        .to_owned(),
                )
                .await?;
        }

        if !manager.has_table("price").await? {
            manager
                .create_table(
                    Table::create()
                        .table(Price::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Price::AssetId).big_integer().not_null())
                        .col(
                            ColumnDef::new(Price::QuoteAssetId)
                                .big_integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Price::Provider).string().not_null())
                        .col(ColumnDef::new(Price::Time).big_integer().not_null())
                        .col(ColumnDef::new(Price::TxId).big_integer().not_null())
                        .col(ColumnDef::new(Price::SwapIndex).integer().not_null())
                        .col(
                            ColumnDef::new(Price::Price)
                                .decimal_len(38, 15)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Price::Amount1)
                                .decimal_len(38, 0)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Price::Amount2)
                                .decimal_len(38, 0)
                                .not_null(),
                        )
                        .col(ColumnDef::new(Price::Operation).small_integer().not_null())
                        .col(ColumnDef::new(Price::Outlier).boolean())
                        .primary_key(
                            Index::create()
                                .col(Price::AssetId)
                                .col(Price::QuoteAssetId)
                                .col(Price::Time)
                                .col(Price::TxId)
                                .col(Price::SwapIndex),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_price_asset")
                                .from(Price::Table, Price::AssetId)
                                .to(Asset::Table, Asset::Id),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_price_quote_asset")
                                .from(Price::Table, Price::QuoteAssetId)
                                .to(Asset::Table, Asset::Id),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_price_tx")
                                .from(Price::Table, Price::TxId)
                                .to(Tx::Table, Tx::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("price_pair_time")
                        .table(Price::Table)
                        .col(Price::AssetId)
                        .col(Price::QuoteAssetId)
                        .col(Price::Time)
                        .if_not_exists()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("price_time")
                        .table(Price::Table)
                        .col(Price::Time)
                        .if_not_exists()
                        .to_owned(),
                )
                .await?;
        }

        if !manager.has_table("latest_price").await? {
            manager
                .create_table(
                    Table::create()
                        .table(LatestPrice::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(LatestPrice::AssetId)
                                .big_integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(LatestPrice::QuoteAssetId)
                                .big_integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(LatestPrice::Provider).string().not_null())
                        .col(ColumnDef::new(LatestPrice::Time).big_integer().not_null())
                        .col(ColumnDef::new(LatestPrice::TxId).big_integer().not_null())
                        .col(ColumnDef::new(LatestPrice::SwapIndex).integer().not_null())
                        .col(
                            ColumnDef::new(LatestPrice::Price)
                                .decimal_len(38, 15)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(LatestPrice::Amount1)
                                .decimal_len(38, 0)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(LatestPrice::Amount2)
                                .decimal_len(38, 0)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(LatestPrice::Operation)
                                .small_integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(LatestPrice::Outlier).boolean())
                        .primary_key(
                            Index::create()
                                .col(LatestPrice::AssetId)
                                .col(LatestPrice::QuoteAssetId),
                        )
                        .to_owned(),
                )
                .await?;
        }

        if !manager.has_table("pool_reserve").await? {
            manager
                .create_table(
                    Table::create()
                        .table(PoolReserve::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(PoolReserve::PoolId).string().not_null())
                        .col(
                            ColumnDef::new(PoolReserve::Asset1Id)
                                .big_integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PoolReserve::Asset2Id)
                                .big_integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(PoolReserve::Provider).string().not_null())
                        .col(ColumnDef::new(PoolReserve::Time).big_integer().not_null())
                        .col(
                            ColumnDef::new(PoolReserve::Reserve1)
                                .decimal_len(38, 0)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PoolReserve::Reserve2)
                                .decimal_len(38, 0)
                                .not_null(),
                        )
                        .col(ColumnDef::new(PoolReserve::TxId).big_integer().not_null())
                        .primary_key(
                            Index::create()
                                .col(PoolReserve::PoolId)
                                .col(PoolReserve::Time),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_pool_reserve_asset1")
                                .from(PoolReserve::Table, PoolReserve::Asset1Id)
                                .to(Asset::Table, Asset::Id),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_pool_reserve_asset2")
                                .from(PoolReserve::Table, PoolReserve::Asset2Id)
                                .to(Asset::Table, Asset::Id),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_pool_reserve_tx")
                                .from(PoolReserve::Table, PoolReserve::TxId)
                                .to(Tx::Table, Tx::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("pool_reserve_time")
                        .table(PoolReserve::Table)
                        .col(PoolReserve::Time)
                        .if_not_exists()
                        .to_owned(),
                )
                .await?;
        }

        if !manager.has_table("latest_pool_reserve").await? {
            manager
                .create_table(
                    Table::create()
                        .table(LatestPoolReserve::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(LatestPoolReserve::PoolId)
                                .string()
                                .not_null()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(LatestPoolReserve::Asset1Id)
                                .big_integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(LatestPoolReserve::Asset2Id)
                                .big_integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(LatestPoolReserve::Provider)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(LatestPoolReserve::Time)
                                .big_integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(LatestPoolReserve::Reserve1)
                                .decimal_len(38, 0)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(LatestPoolReserve::Reserve2)
                                .decimal_len(38, 0)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(LatestPoolReserve::TxId)
                                .big_integer()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;
        }

        if !manager.has_table("sync_point").await? {
            manager
                .create_table(
                    Table::create()
                        .table(SyncPoint::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(SyncPoint::Id)
                                .small_integer()
                                .not_null()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(SyncPoint::Slot).big_integer().not_null())
                        .col(ColumnDef::new(SyncPoint::Hash).string().not_null())
                        .col(ColumnDef::new(SyncPoint::Time).big_integer().not_null())
                        .col(
                            ColumnDef::new(SyncPoint::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null()
                                .default(Expr::current_timestamp()),
                        )
                        .to_owned(),
                )
                .await?;
        }

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SyncPoint::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(
                Table::drop()
                    .table(LatestPoolReserve::Table)
                    .if_exists()
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(
                Table::drop()
                    .table(PoolReserve::Table)
                    .if_exists()
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(
                Table::drop()
                    .table(LatestPrice::Table)
                    .if_exists()
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().table(Price::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Tx::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Asset::Table).if_exists().to_owned())
            .await?;

        Ok(())
    }
}

#[derive(Iden)]
enum Asset {
    Table,
    Id,
    Unit,
    Name,
    Ticker,
    Decimals,
    CreatedAt,
}

#[derive(Iden)]
enum Tx {
    Table,
    Id,
    Hash,
    CreatedAt,
}

#[derive(Iden)]
enum Price {
    Table,
    AssetId,
    QuoteAssetId,
    Provider,
    Time,
    TxId,
    SwapIndex,
    Price,
    Amount1,
    Amount2,
    Operation,
    Outlier,
}

#[derive(Iden)]
enum LatestPrice {
    Table,
    AssetId,
    QuoteAssetId,
    Provider,
    Time,
    TxId,
    SwapIndex,
    Price,
    Amount1,
    Amount2,
    Operation,
    Outlier,
}

#[derive(Iden)]
enum PoolReserve {
    Table,
    PoolId,
    Asset1Id,
    Asset2Id,
    Provider,
    Time,
    Reserve1,
    Reserve2,
    TxId,
}

#[derive(Iden)]
enum LatestPoolReserve {
    Table,
    PoolId,
    Asset1Id,
    Asset2Id,
    Provider,
    Time,
    Reserve1,
    Reserve2,
    TxId,
}

#[derive(Iden)]
enum SyncPoint {
    Table,
    Id,
    Slot,
    Hash,
    Time,
    UpdatedAt,
}
