use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240301_000001_create_users_table::Migration),
            Box::new(m20240301_000002_create_locations_table::Migration),
            Box::new(m20240301_000003_create_gyms_table::Migration),
            Box::new(m20240301_000004_create_pt_users_table::Migration),
            Box::new(m20240301_000005_create_offers_table::Migration),
            Box::new(m20240301_000006_create_ratings_table::Migration),
        ]
    }
}

// Migration implementations

mod m20240301_000001_create_users_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000001_create_users_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Users::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Users::Id)
                                .big_integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(Users::Email)
                                .string_len(255)
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Users::FirstName).string_len(100).not_null())
                        .col(ColumnDef::new(Users::LastName).string_len(100).not_null())
                        .col(ColumnDef::new(Users::Role).string_len(20).not_null())
                        .col(
                            ColumnDef::new(Users::Active)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Users::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Users::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Users::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Users {
        Table,
        Id,
        Email,
        FirstName,
        LastName,
        Role,
        Active,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240301_000002_create_locations_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000002_create_locations_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Locations::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Locations::Id)
                                .big_integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Locations::Latitude).double().not_null())
                        .col(ColumnDef::new(Locations::Longitude).double().not_null())
                        .col(ColumnDef::new(Locations::Address).string_len(500).not_null())
                        .col(ColumnDef::new(Locations::City).string_len(100).null())
                        .col(ColumnDef::new(Locations::State).string_len(100).null())
                        .col(ColumnDef::new(Locations::Country).string_len(100).null())
                        .col(ColumnDef::new(Locations::PostalCode).string_len(20).null())
                        .col(ColumnDef::new(Locations::FormattedAddress).text().null())
                        .col(
                            ColumnDef::new(Locations::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Locations::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            // Serves the bounding-box prefilter
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_locations_lat_lon")
                        .table(Locations::Table)
                        .col(Locations::Latitude)
                        .col(Locations::Longitude)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Locations::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Locations {
        Table,
        Id,
        Latitude,
        Longitude,
        Address,
        City,
        State,
        Country,
        PostalCode,
        FormattedAddress,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240301_000003_create_gyms_table {

    use super::m20240301_000001_create_users_table::Users;
    use super::m20240301_000002_create_locations_table::Locations;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000003_create_gyms_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Gyms::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Gyms::Id)
                                .big_integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Gyms::Name).string_len(255).not_null())
                        .col(ColumnDef::new(Gyms::Description).text().null())
                        .col(ColumnDef::new(Gyms::PhoneNumber).string_len(50).null())
                        .col(ColumnDef::new(Gyms::Email).string_len(255).null())
                        .col(ColumnDef::new(Gyms::Website).string_len(255).null())
                        .col(ColumnDef::new(Gyms::OwnerId).big_integer().not_null())
                        .col(ColumnDef::new(Gyms::LocationId).big_integer().null())
                        .col(
                            ColumnDef::new(Gyms::Active)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Gyms::Verified)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Gyms::AverageRating)
                                .decimal_len(3, 2)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Gyms::RatingCount)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Gyms::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Gyms::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_gyms_owner")
                                .from(Gyms::Table, Gyms::OwnerId)
                                .to(Users::Table, Users::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_gyms_location")
                                .from(Gyms::Table, Gyms::LocationId)
                                .to(Locations::Table, Locations::Id)
                                .on_delete(ForeignKeyAction::SetNull),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_gyms_active_rating")
                        .table(Gyms::Table)
                        .col(Gyms::Active)
                        .col(Gyms::AverageRating)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Gyms::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Gyms {
        Table,
        Id,
        Name,
        Description,
        PhoneNumber,
        Email,
        Website,
        OwnerId,
        LocationId,
        Active,
        Verified,
        AverageRating,
        RatingCount,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240301_000004_create_pt_users_table {

    use super::m20240301_000001_create_users_table::Users;
    use super::m20240301_000002_create_locations_table::Locations;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000004_create_pt_users_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(PtUsers::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(PtUsers::Id)
                                .big_integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(PtUsers::UserId)
                                .big_integer()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(PtUsers::Bio).text().null())
                        .col(ColumnDef::new(PtUsers::Specializations).string_len(500).null())
                        .col(ColumnDef::new(PtUsers::Certifications).text().null())
                        .col(ColumnDef::new(PtUsers::YearsOfExperience).integer().null())
                        .col(ColumnDef::new(PtUsers::HourlyRate).decimal_len(10, 2).null())
                        .col(ColumnDef::new(PtUsers::LocationId).big_integer().null())
                        .col(
                            ColumnDef::new(PtUsers::Active)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(PtUsers::Verified)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(PtUsers::AverageRating)
                                .decimal_len(3, 2)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(PtUsers::RatingCount)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(PtUsers::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PtUsers::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_pt_users_user")
                                .from(PtUsers::Table, PtUsers::UserId)
                                .to(Users::Table, Users::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_pt_users_location")
                                .from(PtUsers::Table, PtUsers::LocationId)
                                .to(Locations::Table, Locations::Id)
                                .on_delete(ForeignKeyAction::SetNull),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_pt_users_active_rating")
                        .table(PtUsers::Table)
                        .col(PtUsers::Active)
                        .col(PtUsers::AverageRating)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(PtUsers::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum PtUsers {
        Table,
        Id,
        UserId,
        Bio,
        Specializations,
        Certifications,
        YearsOfExperience,
        HourlyRate,
        LocationId,
        Active,
        Verified,
        AverageRating,
        RatingCount,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240301_000005_create_offers_table {

    use super::m20240301_000001_create_users_table::Users;
    use super::m20240301_000003_create_gyms_table::Gyms;
    use super::m20240301_000004_create_pt_users_table::PtUsers;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000005_create_offers_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Offers::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Offers::Id)
                                .big_integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Offers::Title).string_len(255).not_null())
                        .col(ColumnDef::new(Offers::Description).text().null())
                        .col(ColumnDef::new(Offers::OfferType).string_len(20).not_null())
                        .col(ColumnDef::new(Offers::Price).decimal_len(10, 2).not_null())
                        .col(
                            ColumnDef::new(Offers::Currency)
                                .string_len(3)
                                .not_null()
                                .default("USD"),
                        )
                        .col(
                            ColumnDef::new(Offers::DurationDescription)
                                .string_len(100)
                                .null(),
                        )
                        .col(ColumnDef::new(Offers::GymId).big_integer().null())
                        .col(ColumnDef::new(Offers::PtUserId).big_integer().null())
                        .col(ColumnDef::new(Offers::CreatedBy).big_integer().not_null())
                        .col(
                            ColumnDef::new(Offers::Status)
                                .string_len(20)
                                .not_null()
                                .default("PENDING"),
                        )
                        .col(
                            ColumnDef::new(Offers::Active)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Offers::AverageRating)
                                .decimal_len(3, 2)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Offers::RatingCount)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Offers::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Offers::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_offers_gym")
                                .from(Offers::Table, Offers::GymId)
                                .to(Gyms::Table, Gyms::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_offers_pt_user")
                                .from(Offers::Table, Offers::PtUserId)
                                .to(PtUsers::Table, PtUsers::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_offers_created_by")
                                .from(Offers::Table, Offers::CreatedBy)
                                .to(Users::Table, Users::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_offers_status_active")
                        .table(Offers::Table)
                        .col(Offers::Status)
                        .col(Offers::Active)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_offers_price")
                        .table(Offers::Table)
                        .col(Offers::Price)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Offers::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Offers {
        Table,
        Id,
        Title,
        Description,
        OfferType,
        Price,
        Currency,
        DurationDescription,
        GymId,
        PtUserId,
        CreatedBy,
        Status,
        Active,
        AverageRating,
        RatingCount,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240301_000006_create_ratings_table {

    use super::m20240301_000001_create_users_table::Users;
    use super::m20240301_000005_create_offers_table::Offers;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000006_create_ratings_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Ratings::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Ratings::Id)
                                .big_integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Ratings::UserId).big_integer().not_null())
                        .col(ColumnDef::new(Ratings::OfferId).big_integer().not_null())
                        .col(ColumnDef::new(Ratings::Rating).integer().not_null())
                        .col(ColumnDef::new(Ratings::Comment).text().null())
                        .col(
                            ColumnDef::new(Ratings::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Ratings::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_ratings_user")
                                .from(Ratings::Table, Ratings::UserId)
                                .to(Users::Table, Users::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_ratings_offer")
                                .from(Ratings::Table, Ratings::OfferId)
                                .to(Offers::Table, Offers::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            // One rating per user and offer
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("uq_ratings_user_offer")
                        .table(Ratings::Table)
                        .col(Ratings::UserId)
                        .col(Ratings::OfferId)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_ratings_offer")
                        .table(Ratings::Table)
                        .col(Ratings::OfferId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Ratings::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Ratings {
        Table,
        Id,
        UserId,
        OfferId,
        Rating,
        Comment,
        CreatedAt,
        UpdatedAt,
    }
}
