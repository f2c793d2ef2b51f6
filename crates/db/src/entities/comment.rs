//! Comment entity (comments on blog posts).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "comment")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Author
    #[sea_orm(indexed)]
    pub user_id: String,

    /// The post being commented on
    #[sea_orm(indexed)]
    pub blog_id: String,

    #[sea_orm(column_type = "Text")]
    pub comment: String,

    /// Sum of all vote values on this comment (denormalized)
    #[sea_orm(default_value = 0)]
    pub total_votes: i64,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,

    #[sea_orm(
        belongs_to = "super::blog_post::Entity",
        from = "Column::BlogId",
        to = "super::blog_post::Column::Id",
        on_delete = "Cascade"
    )]
    BlogPost,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::blog_post::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BlogPost.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
