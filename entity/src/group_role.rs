use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Function a group member fills within their team.
#[derive(Debug, Clone, Copy, Eq, PartialEq, EnumIter, Deserialize, Serialize, DeriveActiveEnum)]
#[serde(rename_all = "UPPERCASE")]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "group_role")]
pub enum GroupRole {
    /// Project manager
    #[sea_orm(string_value = "pm")]
    Pm,
    /// Product designer
    #[sea_orm(string_value = "pd")]
    Pd,
    /// Frontend engineer
    #[sea_orm(string_value = "fe")]
    Fe,
    /// Backend engineer
    #[sea_orm(string_value = "be")]
    Be,
    /// AI engineer
    #[sea_orm(string_value = "ai")]
    Ai,
}

impl GroupRole {
    /// Upper-case tag used when presenting the role to collaborators (e.g. "PM").
    pub fn tag(&self) -> &'static str {
        match self {
            GroupRole::Pm => "PM",
            GroupRole::Pd => "PD",
            GroupRole::Fe => "FE",
            GroupRole::Be => "BE",
            GroupRole::Ai => "AI",
        }
    }
}

impl std::fmt::Display for GroupRole {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(fmt, "{}", self.tag())
    }
}
