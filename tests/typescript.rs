use std::collections::{BTreeMap, HashMap};

use futures::stream;
use serde::Serialize;
use serde_json::Value;
use typed_rpc::{
    generate::{
        EnumStyle, GenerateConfig, NameResolver, OptionalStyle, TypeGraph, TypeScript, Validation,
    },
    schema::TypeRef,
    Reflect, Router,
};

/// Render how `T` is declared, or referenced when it's not a named type.
fn render<T: Reflect + Serialize + Send + 'static>(config: &GenerateConfig, zod: bool) -> String {
    let router = Router::new()
        .live("Test", "Render", |_: ()| Ok(stream::empty::<T>()))
        .unwrap()
        .build();
    let graph = TypeGraph::extract(&router).unwrap();
    let names = NameResolver::new(Some(module_path!()))
        .resolve(&graph)
        .unwrap();
    let ts = TypeScript::new(config, &names);

    let rendered = match T::reflect() {
        TypeRef::Named(named) => {
            let name = names.get(&named.origin).unwrap();
            let def = graph.get(&named.origin).unwrap();
            match zod {
                true => ts.zod_declaration(name, def),
                false => ts.declaration(name, def),
            }
        }
        ty => match zod {
            true => ts.zod(&ty, "test"),
            false => ts.reference(&ty, "test"),
        },
    };
    rendered.unwrap()
}

macro_rules! assert_ts {
    ($t:ty, $e:expr) => {
        assert_ts!($t, GenerateConfig::default(), $e)
    };
    ($t:ty, $config:expr, $e:expr) => {
        assert_eq!(render::<$t>(&$config, false), $e)
    };
}

macro_rules! assert_zod {
    ($t:ty, $e:expr) => {
        assert_zod!($t, GenerateConfig::default(), $e)
    };
    ($t:ty, $config:expr, $e:expr) => {
        assert_eq!(
            render::<$t>(&$config.validation(Validation::Zod), true),
            $e
        )
    };
}

#[derive(Serialize, Reflect)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Member,
}

#[derive(Serialize, Reflect)]
pub enum Shape {
    Circle(f64),
    Rect(f64, f64),
    None,
}

#[derive(Serialize, Reflect)]
pub enum Never {}

#[derive(Serialize, Reflect)]
pub struct Empty {}

#[derive(Serialize, Reflect)]
pub struct Unit;

#[derive(Serialize, Reflect)]
pub struct UserId(u32);

#[derive(Serialize, Reflect)]
pub struct Pair(String, u8);

#[derive(Serialize, Reflect)]
#[serde(transparent)]
pub struct Email {
    pub address: String,
}

/// Matches `src/**/*.rs`.
#[derive(Serialize, Reflect)]
pub struct Glob(String);

/// A type named like a TypeScript utility.
#[derive(Serialize, Reflect)]
pub struct Record {
    pub empty: Empty,
    pub scores: BTreeMap<Role, u32>,
}

#[derive(Serialize, Reflect)]
pub struct Profile {
    pub bio: Option<String>,
}

/// A user of the system.
///
/// Users are created by admins.
#[derive(Serialize, Reflect)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub account_id: UserId,
    #[serde(rename = "e-mail")]
    pub email: Email,
    pub r#type: Role,
    #[serde(skip)]
    pub password_hash: String,
    pub permissions: BTreeMap<Role, bool>,
}

#[test]
fn primitives() {
    assert_ts!(i8, "number");
    assert_ts!(u32, "number");
    assert_ts!(f64, "number");
    assert_ts!(bool, "boolean");
    assert_ts!(char, "string");
    assert_ts!(String, "string");
    assert_ts!((), "null");
    assert_ts!(Value, "any");
}

#[test]
fn containers() {
    assert_ts!(Vec<String>, "string[]");
    assert_ts!(Option<Vec<u8>>, "number[] | null");
    assert_ts!(Vec<Option<u8>>, "(number | null)[]");
    assert_ts!(Vec<Vec<bool>>, "boolean[][]");
    assert_ts!((String, i32), "[string, number]");
    assert_ts!(BTreeMap<String, u8>, "{ [key: string]: number }");
    assert_ts!(HashMap<u32, bool>, "{ [key: number]: boolean }");
    assert_ts!(BTreeMap<Role, u32>, "{ [key in Role]?: number }");
    assert_ts!(Box<Option<Role>>, "Role | null");
}

#[test]
fn structs() {
    assert_ts!(Empty, "export type Empty = { [key: string]: never };");
    assert_ts!(Unit, "export type Unit = null;");
    assert_ts!(UserId, "export type UserId = number;");
    assert_ts!(Pair, "export type Pair = [string, number];");
    assert_ts!(Email, "export type Email = string;");
    assert_ts!(
        Account,
        "/**\n * A user of the system.\n *\n * Users are created by admins.\n */\nexport type Account = { accountId: UserId; \"e-mail\": Email; type: Role; permissions: { [key in Role]?: boolean } };"
    );
}

#[test]
fn doc_comments_cannot_end_early() {
    assert_ts!(
        Glob,
        "/**\n * Matches `src/**\\/*.rs`.\n */\nexport type Glob = string;"
    );
}

#[test]
fn declarations_need_no_global_helpers() {
    // Shadowing `Record` or `Partial` in types.ts must not change other declarations.
    let router = Router::new()
        .unary("Records", "Get", |_: ()| async {
            Ok(Record {
                empty: Empty {},
                scores: BTreeMap::new(),
            })
        })
        .unwrap()
        .build();
    let bindings =
        typed_rpc::generate(&router, &GenerateConfig::default().strip_prefix(module_path!()))
            .unwrap();
    let types = bindings.get("types.ts").unwrap();

    assert!(types.contains("export type Record = { empty: Empty; scores: { [key in Role]?: number } };"));
    assert!(types.contains("export type Empty = { [key: string]: never };"));
    assert!(!types.contains("Record<"));
    assert!(!types.contains("Partial<"));
}

#[test]
fn optional_fields() {
    assert_ts!(Profile, "export type Profile = { bio: string | null };");
    assert_ts!(
        Profile,
        GenerateConfig::default().optional_style(OptionalStyle::Absent),
        "export type Profile = { bio?: string | null };"
    );
    // Without `skip_serializing_if` serde still writes the key as `null`.
    assert_eq!(
        serde_json::to_value(Profile { bio: None }).unwrap(),
        serde_json::json!({ "bio": null })
    );
}

#[test]
fn enums() {
    assert_ts!(Role, "export type Role = \"admin\" | \"member\";");
    assert_ts!(
        Role,
        GenerateConfig::default().enum_style(EnumStyle::Native),
        "export enum Role { Admin = \"admin\", Member = \"member\" }"
    );
    assert_ts!(
        Shape,
        "export type Shape = { Circle: number } | { Rect: [number, number] } | \"None\";"
    );
    // Enums carrying data are always unions.
    assert_ts!(
        Shape,
        GenerateConfig::default().enum_style(EnumStyle::Native),
        "export type Shape = { Circle: number } | { Rect: [number, number] } | \"None\";"
    );
    assert_ts!(Never, "export type Never = never;");
}

#[test]
fn zod_schemas() {
    assert_zod!(u32, "z.number()");
    assert_zod!(Vec<Option<String>>, "z.array(z.string().nullable())");
    assert_zod!(
        Profile,
        "export const ProfileSchema: z.ZodType<Profile> = z.lazy(() => z.object({ bio: z.string().nullable() }));"
    );
    assert_zod!(
        Profile,
        GenerateConfig::default().optional_style(OptionalStyle::Absent),
        "export const ProfileSchema: z.ZodType<Profile> = z.lazy(() => z.object({ bio: z.string().nullish() }));"
    );
    assert_zod!(
        Role,
        "export const RoleSchema: z.ZodType<Role> = z.lazy(() => z.enum([\"admin\", \"member\"]));"
    );
    assert_zod!(
        Role,
        GenerateConfig::default().enum_style(EnumStyle::Native),
        "export const RoleSchema: z.ZodType<Role> = z.lazy(() => z.nativeEnum(Role));"
    );
    assert_zod!(
        Shape,
        "export const ShapeSchema: z.ZodType<Shape> = z.lazy(() => z.union([z.object({ Circle: z.number() }), z.object({ Rect: z.tuple([z.number(), z.number()]) }), z.literal(\"None\")]));"
    );
    assert_zod!(
        UserId,
        "export const UserIdSchema: z.ZodType<UserId> = z.lazy(() => z.number());"
    );
}

#[test]
fn zod_schemas_are_emitted_after_the_types() {
    let router = Router::new()
        .unary("Accounts", "Get", |_: ()| async { Ok(Profile { bio: None }) })
        .unwrap()
        .build();
    let config = GenerateConfig::default()
        .strip_prefix(module_path!())
        .validation(Validation::Zod);
    let bindings = typed_rpc::generate(&router, &config).unwrap();
    let types = bindings.get("types.ts").unwrap();

    let import = types.find("import { z } from \"zod\";").unwrap();
    let declaration = types.find("export type Profile").unwrap();
    let schema = types.find("export const ProfileSchema").unwrap();
    assert!(import < declaration && declaration < schema);

    let client = bindings.get("client.ts").unwrap();
    assert!(client.contains("import * as t from \"./types\";"));
    assert!(client.contains(".then((value) => decodeWith(\"Accounts.Get\", () => t.ProfileSchema.parse(value)))"));
}
