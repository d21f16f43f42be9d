use typed_rpc::{Atom, Error, ErrorCode, HttpVerb, Router, RouterError};

use super::{v1, CreateUser, User, UserId};

pub fn mount() -> Result<Router, RouterError> {
    let users = Atom::new(Vec::<User>::new());

    Router::new()
        .unary("Users", "Create", {
            let users = users.clone();
            move |req: CreateUser| {
                let users = users.clone();
                async move { create(&users, req) }
            }
        })?
        .unary_with("Users", "Get", HttpVerb::Get, {
            let users = users.clone();
            move |id: UserId| {
                let user = find(&users, id);
                async move { user }
            }
        })?
        .unary_with("Users", "List", HttpVerb::Get, {
            let users = users.clone();
            move |_: ()| {
                let list = users.get();
                async move { Ok(list) }
            }
        })?
        .unary_with("Users", "GetLegacy", HttpVerb::Get, move |id: UserId| {
            let user = find(&users, id).map(v1::User::from);
            async move { user }
        })
}

fn create(users: &Atom<Vec<User>>, req: CreateUser) -> Result<User, Error> {
    if req.name.trim().is_empty() {
        return Err(Error::new(ErrorCode::InvalidArgument, "name is required"));
    }

    let users = users.update(|users| {
        let mut users = users.clone();
        users.push(User {
            id: UserId(users.len() as u32 + 1),
            display_name: req.name,
            email: req.email,
            role: req.role,
        });
        users
    });

    users
        .last()
        .cloned()
        .ok_or_else(|| Error::new(ErrorCode::Internal, "user was not created"))
}

fn find(users: &Atom<Vec<User>>, id: UserId) -> Result<User, Error> {
    users
        .read(|users| users.iter().find(|user| user.id == id).cloned())
        .ok_or_else(|| {
            Error::with_details(ErrorCode::NotFound, "no such user", serde_json::json!({ "id": id }))
        })
}
