//! The user shape served before roles existed. Exported as `v1_User`.

use serde::Serialize;
use typed_rpc::Reflect;

#[derive(Debug, Clone, Serialize, Reflect)]
pub struct User {
    pub id: u32,
    pub name: String,
}

impl From<super::User> for User {
    fn from(user: super::User) -> Self {
        Self {
            id: user.id.0,
            name: user.display_name,
        }
    }
}
