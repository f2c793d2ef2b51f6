//! Vote entity (one user's vote on a post or comment).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Kind of record a vote is attached to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    /// A blog post.
    #[sea_orm(string_value = "post")]
    Post,
    /// A comment on a blog post.
    #[sea_orm(string_value = "comment")]
    Comment,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "vote")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// The voter. Never changes after creation.
    #[sea_orm(indexed)]
    pub user_id: String,

    /// The post or comment voted on. Never changes after creation.
    #[sea_orm(indexed)]
    pub target_id: String,

    pub target_kind: TargetKind,

    /// -1, 0 or +1
    pub value: i16,

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
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
