use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240301_000001_create_employees_table::Migration),
            Box::new(m20240301_000002_create_sessions_table::Migration),
            Box::new(m20240301_000003_create_categories_table::Migration),
            Box::new(m20240301_000004_create_shelves_table::Migration),
            Box::new(m20240301_000005_create_products_table::Migration),
            Box::new(m20240301_000006_create_movements_table::Migration),
        ]
    }
}

mod m20240301_000001_create_employees_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000001_create_employees_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Employees::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Employees::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Employees::Name).string().not_null())
                        .col(ColumnDef::new(Employees::Phone).string().not_null())
                        .col(ColumnDef::new(Employees::PasswordHash).string().not_null())
                        .col(ColumnDef::new(Employees::Role).string().not_null())
                        .col(
                            ColumnDef::new(Employees::Active)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Employees::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Employees::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            // Phone is the login identifier
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("ux_employees_phone")
                        .table(Employees::Table)
                        .col(Employees::Phone)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Employees::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Employees {
        Table,
        Id,
        Name,
        Phone,
        PasswordHash,
        Role,
        Active,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240301_000002_create_sessions_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000002_create_sessions_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Sessions::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Sessions::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Sessions::EmployeeId).uuid().not_null())
                        .col(
                            ColumnDef::new(Sessions::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Sessions::ExpiresAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Sessions::RevokedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_sessions_employee_id")
                                .from(Sessions::Table, Sessions::EmployeeId)
                                .to(Employees::Table, Employees::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_sessions_employee_id")
                        .table(Sessions::Table)
                        .col(Sessions::EmployeeId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Sessions::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Sessions {
        Table,
        Id,
        EmployeeId,
        CreatedAt,
        ExpiresAt,
        RevokedAt,
    }

    #[derive(DeriveIden)]
    enum Employees {
        Table,
        Id,
    }
}

mod m20240301_000003_create_categories_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000003_create_categories_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Categories::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Categories::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Categories::Name).string().not_null())
                        .col(ColumnDef::new(Categories::Description).string().null())
                        .col(
                            ColumnDef::new(Categories::Active)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Categories::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Categories::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Categories::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Categories {
        Table,
        Id,
        Name,
        Description,
        Active,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240301_000004_create_shelves_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000004_create_shelves_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Shelves::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Shelves::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Shelves::Number).string().not_null())
                        .col(ColumnDef::new(Shelves::Description).string().null())
                        .col(
                            ColumnDef::new(Shelves::Active)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Shelves::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Shelves::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            // Partial indexes are not expressible through the index builder;
            // both Postgres and SQLite accept this statement verbatim.
            manager
                .get_connection()
                .execute_unprepared(
                    "CREATE UNIQUE INDEX IF NOT EXISTS ux_shelves_number_active \
                     ON shelves (number) WHERE active",
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Shelves::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Shelves {
        Table,
        Id,
        Number,
        Description,
        Active,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240301_000005_create_products_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000005_create_products_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Products::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Products::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Products::Code).string_len(5).not_null())
                        .col(ColumnDef::new(Products::Name).string().not_null())
                        .col(ColumnDef::new(Products::CategoryId).uuid().null())
                        .col(ColumnDef::new(Products::Brand).string().null())
                        .col(ColumnDef::new(Products::Supplier).string().null())
                        .col(
                            ColumnDef::new(Products::CostPrice)
                                .decimal_len(12, 2)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Products::SalePrice)
                                .decimal_len(12, 2)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Products::ShopQuantity)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Products::WarehouseQuantity)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Products::MinQuantity)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Products::ShelfId).uuid().null())
                        .col(ColumnDef::new(Products::Barcode).string().null())
                        .col(
                            ColumnDef::new(Products::Active)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Products::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Products::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_products_category_id")
                                .from(Products::Table, Products::CategoryId)
                                .to(Categories::Table, Categories::Id)
                                .on_delete(ForeignKeyAction::SetNull)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_products_shelf_id")
                                .from(Products::Table, Products::ShelfId)
                                .to(Shelves::Table, Shelves::Id)
                                .on_delete(ForeignKeyAction::Restrict)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("ux_products_code")
                        .table(Products::Table)
                        .col(Products::Code)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_products_shelf_id")
                        .table(Products::Table)
                        .col(Products::ShelfId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_products_category_id")
                        .table(Products::Table)
                        .col(Products::CategoryId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Products::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Products {
        Table,
        Id,
        Code,
        Name,
        CategoryId,
        Brand,
        Supplier,
        CostPrice,
        SalePrice,
        ShopQuantity,
        WarehouseQuantity,
        MinQuantity,
        ShelfId,
        Barcode,
        Active,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum Categories {
        Table,
        Id,
    }

    #[derive(DeriveIden)]
    enum Shelves {
        Table,
        Id,
    }
}

mod m20240301_000006_create_movements_table {
    use super::m20240301_000001_create_employees_table::Employees;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000006_create_movements_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Movements::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Movements::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Movements::ProductId).uuid().not_null())
                        .col(ColumnDef::new(Movements::EmployeeId).uuid().not_null())
                        .col(ColumnDef::new(Movements::MovementType).string().not_null())
                        .col(ColumnDef::new(Movements::Location).string().not_null())
                        .col(ColumnDef::new(Movements::Quantity).integer().not_null())
                        .col(ColumnDef::new(Movements::Reason).string().null())
                        .col(ColumnDef::new(Movements::Notes).string().null())
                        .col(
                            ColumnDef::new(Movements::UnitPrice)
                                .decimal_len(12, 2)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Movements::UnitCost)
                                .decimal_len(12, 2)
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Movements::TransferId).uuid().null())
                        .col(
                            ColumnDef::new(Movements::OccurredAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_movements_product_id")
                                .from(Movements::Table, Movements::ProductId)
                                .to(Products::Table, Products::Id)
                                .on_delete(ForeignKeyAction::Restrict)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_movements_employee_id")
                                .from(Movements::Table, Movements::EmployeeId)
                                .to(Employees::Table, Employees::Id)
                                .on_delete(ForeignKeyAction::Restrict)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_movements_product_id")
                        .table(Movements::Table)
                        .col(Movements::ProductId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_movements_occurred_at")
                        .table(Movements::Table)
                        .col(Movements::OccurredAt)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_movements_transfer_id")
                        .table(Movements::Table)
                        .col(Movements::TransferId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Movements::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Movements {
        Table,
        Id,
        ProductId,
        EmployeeId,
        MovementType,
        Location,
        Quantity,
        Reason,
        Notes,
        UnitPrice,
        UnitCost,
        TransferId,
        OccurredAt,
    }

    #[derive(DeriveIden)]
    enum Products {
        Table,
        Id,
    }
}
