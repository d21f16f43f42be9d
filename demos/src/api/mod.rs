use serde::{Deserialize, Serialize};
use typed_rpc::{Reflect, Router, RouterError};

mod counter;
mod users;
pub mod v1;

/// Identifies a [`User`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Reflect)]
#[serde(transparent)]
pub struct UserId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Reflect)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Member,
}

#[derive(Debug, Clone, Serialize, Deserialize, Reflect)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub display_name: String,
    pub email: Option<String>,
    pub role: Role,
}

#[derive(Debug, Clone, Deserialize, Reflect)]
pub struct CreateUser {
    pub name: String,
    pub email: Option<String>,
    pub role: Role,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Reflect)]
pub struct Counter {
    pub count: i64,
}

pub fn mount() -> Result<Router, RouterError> {
    Router::new()
        .merge(users::mount()?)?
        .merge(counter::mount()?)
}
