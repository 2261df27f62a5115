pub mod booking {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
    #[sea_orm(table_name = "bookings")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: Uuid,
        #[sea_orm(unique)]
        pub booking_code: String,
        pub user_id: Uuid,
        pub total_amount: f64,
        pub status: String,
        pub payment_status: String,
        pub created_at: i64,
        pub updated_at: Option<i64>,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {
        #[sea_orm(has_many = "super::booking_detail::Entity")]
        Details,
    }

    impl Related<super::booking_detail::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::Details.def()
        }
    }

    impl ActiveModelBehavior for ActiveModel {}
}

pub mod booking_detail {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
    #[sea_orm(table_name = "booking_details")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: Uuid,
        pub booking_id: Uuid,
        /// 1-based position of the line within its booking.
        pub line_no: i32,
        pub product_id: Uuid,
        pub product_name: Option<String>,
        pub qty: i32,
        pub price_per_unit: f64,
        pub sub_total: f64,
        pub created_at: i64,
        pub updated_at: Option<i64>,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {
        #[sea_orm(
            belongs_to = "super::booking::Entity",
            from = "Column::BookingId",
            to = "super::booking::Column::Id",
            on_delete = "Cascade"
        )]
        Booking,
    }

    impl Related<super::booking::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::Booking.def()
        }
    }

    impl ActiveModelBehavior for ActiveModel {}
}
