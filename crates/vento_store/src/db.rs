use sea_orm::DeriveIden;

#[derive(DeriveIden, Clone, Copy)]
pub enum DimSignal {
    #[sea_orm(iden = "signal")]
    Table,
    Id,
    Name,
    Operation,
}

#[derive(DeriveIden, Clone, Copy)]
pub enum FactData {
    #[sea_orm(iden = "data")]
    Table,
    Id,
    SignalId,
    Timestamp,
    Value,
}
