//! typed-rpc: typesafe service registries for Rust with generated TypeScript clients.
//!
//! Register methods on a [`Router`], [`build`](Router::build) it, then [`export`] the bindings.
//! Every type crossing the wire implements [`Reflect`], usually through `#[derive(Reflect)]`.
//!
//! ```rust
//! use serde::{Deserialize, Serialize};
//! use typed_rpc::{generate::GenerateConfig, Error, ErrorCode, Reflect, Router};
//!
//! #[derive(Deserialize, Reflect)]
//! pub struct CreateUser {
//!     pub name: String,
//! }
//!
//! #[derive(Serialize, Reflect)]
//! pub struct User {
//!     pub id: u32,
//!     pub name: String,
//! }
//!
//! let router = Router::new()
//!     .unary("Users", "Create", |req: CreateUser| async move {
//!         if req.name.is_empty() {
//!             return Err(Error::new(ErrorCode::InvalidArgument, "name is required"));
//!         }
//!         Ok(User { id: 1, name: req.name })
//!     })
//!     .unwrap()
//!     .build();
//!
//! let bindings = typed_rpc::generate(&router, &GenerateConfig::default()).unwrap();
//! assert!(bindings.get("types.ts").unwrap().contains("export type"));
//! ```
#![warn(
    clippy::all,
    clippy::cargo,
    clippy::unwrap_used,
    clippy::panic,
    clippy::todo,
    clippy::panic_in_result_fn,
    // missing_docs
)]
#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// Lets `#[derive(Reflect)]` refer to `::typed_rpc` from inside this crate.
extern crate self as typed_rpc;

pub mod diagnostics;
pub mod generate;
pub mod schema;

mod atom;
mod error;
mod procedure;
mod router;

pub use atom::{Atom, AtomConfig, OverflowPolicy, Subscription};
pub use error::{Error, ErrorCode};
pub use generate::{export, generate};
pub use procedure::{HttpVerb, MethodDescriptor, MethodKind};
pub use router::{BuiltRouter, Router, RouterError};
pub use schema::Reflect;

/// Implements [`Reflect`](trait@Reflect) for a struct or enum.
///
/// `serde`'s `rename`, `rename_all`, `skip` and `transparent` attributes are honored so the
/// exported types match what `serde_json` produces. `#[reflect(module = "...")]` overrides the
/// module the type is considered to be declared in and `#[reflect(rename = "...")]` its name.
pub use typed_rpc_macros::Reflect;
