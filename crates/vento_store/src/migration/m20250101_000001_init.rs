use sea_orm_migration::prelude::*;

use crate::db::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(DimSignal::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DimSignal::Id)
                            .integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(DimSignal::Name).string().not_null())
                    .col(ColumnDef::new(DimSignal::Operation).string().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("ux_signal_name_operation")
                    .table(DimSignal::Table)
                    .col(DimSignal::Name)
                    .col(DimSignal::Operation)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(FactData::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(FactData::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(FactData::SignalId).integer().not_null())
                    .col(ColumnDef::new(FactData::Timestamp).timestamp().not_null())
                    .col(ColumnDef::new(FactData::Value).double().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_data_signal")
                            .from(FactData::Table, FactData::SignalId)
                            .to(DimSignal::Table, DimSignal::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("ix_data_signal_timestamp")
                    .table(FactData::Table)
                    .col(FactData::SignalId)
                    .col(FactData::Timestamp)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(FactData::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(DimSignal::Table).if_exists().to_owned())
            .await?;
        Ok(())
    }
}
