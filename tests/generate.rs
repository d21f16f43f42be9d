use std::collections::BTreeMap;

use futures::stream;
use pretty_assertions::assert_eq;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use typed_rpc::{
    generate::{
        BigIntBehavior, ConfigError, ExtractError, GenerateConfig, GenerateError, RenderError,
        TypeGraph, Validation, CLIENT_FILE, MANIFEST_FILE, MANIFEST_JSON_FILE, TYPES_FILE,
    },
    schema::{Origin, TypeRef},
    BuiltRouter, Reflect, Router,
};

mod pkg {
    pub mod api {
        use serde::{Deserialize, Serialize};
        use typed_rpc::Reflect;

        /// Something to sell.
        #[derive(Debug, Clone, Serialize, Deserialize, Reflect)]
        #[serde(rename_all = "camelCase")]
        #[reflect(module = "pkg/api")]
        pub struct Widget {
            pub widget_id: u32,
            #[serde(rename = "label")]
            pub display_name: String,
            pub tags: Vec<String>,
            pub price: Option<f64>,
            pub kind: Kind,
        }

        #[derive(Debug, Clone, Serialize, Deserialize, Reflect)]
        #[serde(rename_all = "snake_case")]
        #[reflect(module = "pkg/api")]
        pub enum Kind {
            Gadget,
            SpareParts,
        }

        pub mod v1 {
            use serde::{Deserialize, Serialize};
            use typed_rpc::Reflect;

            #[derive(Serialize, Deserialize, Reflect)]
            #[reflect(module = "pkg/api/v1")]
            pub struct User {
                pub id: u32,
            }
        }

        pub mod v2 {
            use serde::{Deserialize, Serialize};
            use typed_rpc::Reflect;

            #[derive(Serialize, Deserialize, Reflect)]
            #[reflect(module = "pkg/api/v2")]
            pub struct User {
                pub id: String,
            }
        }
    }
}

use pkg::api::{v1, v2, Kind, Widget};

fn widgets() -> Router {
    Router::new()
        .unary("Widgets", "Create", |widget: Widget| async move { Ok(widget) })
        .unwrap()
        .unary("Widgets", "Kinds", |_: ()| async {
            Ok(vec![Kind::Gadget, Kind::SpareParts])
        })
        .unwrap()
        .live("Widgets", "Watch", |_: u32| Ok(stream::empty::<Widget>()))
        .unwrap()
}

fn users() -> Router {
    Router::new()
        .unary("UsersV1", "Get", |id: u32| async move { Ok(v1::User { id }) })
        .unwrap()
        .unary("UsersV2", "Get", |id: String| async move { Ok(v2::User { id }) })
        .unwrap()
}

fn config() -> GenerateConfig {
    GenerateConfig::new("./bindings").strip_prefix("pkg::api")
}

fn files(router: &BuiltRouter, config: &GenerateConfig) -> BTreeMap<String, String> {
    typed_rpc::generate(router, config)
        .unwrap()
        .files()
        .map(|(name, contents)| (name.to_string(), contents.to_string()))
        .collect()
}

#[test]
fn generation_is_deterministic() {
    let a = widgets().merge(users()).unwrap().build();
    let b = users().merge(widgets()).unwrap().build();

    let first = files(&a, &config());
    assert_eq!(
        first.keys().map(String::as_str).collect::<Vec<_>>(),
        [CLIENT_FILE, MANIFEST_JSON_FILE, MANIFEST_FILE, TYPES_FILE]
    );
    assert_eq!(first, files(&a, &config()));
    assert_eq!(first, files(&b, &config()));
}

#[test]
fn names_are_qualified_relative_to_the_strip_prefix() {
    let router = widgets().merge(users()).unwrap().build();
    let bindings = typed_rpc::generate(&router, &config()).unwrap();
    let types = bindings.get(TYPES_FILE).unwrap();

    assert!(types.contains("export type Widget = {"), "{types}");
    assert!(types.contains("export type v1_User = { id: number };"), "{types}");
    assert!(types.contains("export type v2_User = { id: string };"), "{types}");
    assert!(types.contains("/**\n * Something to sell.\n */\nexport type Widget"));

    // Without a prefix every type carries its full module path.
    let bindings = typed_rpc::generate(&router, &GenerateConfig::default()).unwrap();
    let types = bindings.get(TYPES_FILE).unwrap();
    assert!(types.contains("export type pkg_api_Widget = {"), "{types}");
    assert!(types.contains("export type pkg_api_v1_User = {"), "{types}");
}

#[test]
fn declarations_are_sorted_by_name() {
    let router = widgets().merge(users()).unwrap().build();
    let bindings = typed_rpc::generate(&router, &config()).unwrap();
    let types = bindings.get(TYPES_FILE).unwrap();

    let names = types
        .lines()
        .filter_map(|line| line.strip_prefix("export type "))
        .map(|line| line.split(' ').next().unwrap_or_default())
        .collect::<Vec<_>>();
    assert_eq!(names, ["Kind", "Widget", "v1_User", "v2_User"]);
}

#[test]
fn colliding_names_are_rejected() {
    #[derive(Serialize, Reflect)]
    #[reflect(module = "pkg/api", rename = "v1_User")]
    pub struct Flattened {
        pub id: u32,
    }

    let router = users()
        .unary("Legacy", "Get", |_: ()| async { Ok(Flattened { id: 1 }) })
        .unwrap()
        .build();

    let err = typed_rpc::generate(&router, &config()).unwrap_err();
    let GenerateError::Collision(err) = err else {
        panic!("expected a collision, got {err}");
    };
    assert_eq!(err.name, "v1_User");
    assert_eq!(err.first, Origin::new("pkg/api", "v1_User"));
    assert_eq!(err.second, Origin::new("pkg/api/v1", "User"));

    let message = err.to_string();
    assert!(message.contains("pkg/api.v1_User"), "{message}");
    assert!(message.contains("pkg/api/v1.User"), "{message}");
}

#[test]
fn recursive_types_are_declared_once() {
    #[derive(Serialize, Reflect)]
    #[reflect(module = "pkg/api")]
    pub struct Node {
        pub children: Vec<Node>,
        pub parent: Option<Box<Node>>,
        pub sibling: Option<Leaf>,
    }

    #[derive(Serialize, Reflect)]
    #[reflect(module = "pkg/api")]
    pub struct Leaf {
        pub node: Box<Node>,
    }

    let router = Router::new()
        .unary("Tree", "Root", |_: ()| async {
            Ok(Node {
                children: vec![],
                parent: None,
                sibling: None,
            })
        })
        .unwrap()
        .build();

    let graph = TypeGraph::extract(&router).unwrap();
    assert_eq!(graph.len(), 2);
    assert!(graph.get(&Origin::new("pkg/api", "Node")).is_some());

    let bindings = typed_rpc::generate(&router, &config()).unwrap();
    let types = bindings.get(TYPES_FILE).unwrap();
    assert_eq!(types.matches("export type Node").count(), 1);
    assert!(types.contains(
        "export type Node = { children: Node[]; parent: Node | null; sibling: Leaf | null };"
    ));
    assert!(types.contains("export type Leaf = { node: Node };"));
}

#[derive(Serialize)]
pub struct Handle;

impl Reflect for Handle {
    fn reflect() -> TypeRef {
        TypeRef::Unsupported("process handle")
    }
}

#[derive(Serialize, Reflect)]
#[reflect(module = "pkg/api")]
pub struct Job {
    pub id: u32,
    pub handles: Vec<Handle>,
}

fn jobs() -> BuiltRouter {
    Router::new()
        .unary("Jobs", "Start", |_: ()| async {
            Ok(Job {
                id: 1,
                handles: vec![],
            })
        })
        .unwrap()
        .build()
}

#[test]
fn unsupported_types_report_their_path() {
    let err = typed_rpc::generate(&jobs(), &config()).unwrap_err();
    let GenerateError::Extraction(err) = err else {
        panic!("expected an extraction error, got {err}");
    };
    assert_eq!(
        err,
        ExtractError::Unsupported {
            path: "Jobs.Start.response.handles[]".into(),
            what: "process handle",
        }
    );
}

fn account_reply() -> Router {
    #[derive(Serialize, Reflect)]
    struct Reply {
        id: u32,
    }

    Router::new()
        .unary("A", "Get", |_: ()| async { Ok(Reply { id: 1 }) })
        .unwrap()
}

fn profile_reply(router: Router) -> Router {
    #[derive(Serialize, Reflect)]
    struct Reply {
        name: String,
        admin: bool,
    }

    router
        .unary("B", "Get", |_: ()| async {
            Ok(Reply {
                name: "root".into(),
                admin: true,
            })
        })
        .unwrap()
}

#[test]
fn distinct_types_sharing_an_origin_are_rejected() {
    let router = profile_reply(account_reply()).build();
    let err = typed_rpc::generate(&router, &config()).unwrap_err();
    let GenerateError::Extraction(err) = err else {
        panic!("expected an extraction error, got {err}");
    };
    assert_eq!(
        err,
        ExtractError::ConflictingDefinitions {
            origin: Origin::new(module_path!(), "Reply"),
            first_path: "A.Get.response".into(),
            second_path: "B.Get.response".into(),
        }
    );
}

#[test]
fn configuration_is_checked_first() {
    let err = typed_rpc::generate(&jobs(), &config().discovery(false)).unwrap_err();
    assert!(
        matches!(err, GenerateError::Config(ConfigError::ClientRequiresDiscovery)),
        "{err}"
    );
}

#[test]
fn field_names_match_the_wire() {
    let widget = Widget {
        widget_id: 1,
        display_name: "Sprocket".into(),
        tags: vec![],
        price: None,
        kind: Kind::SpareParts,
    };
    let Value::Object(wire) = serde_json::to_value(&widget).unwrap() else {
        panic!("widgets serialize as objects");
    };

    let router = widgets().build();
    let bindings = typed_rpc::generate(&router, &config()).unwrap();
    let types = bindings.get(TYPES_FILE).unwrap();

    let declaration = types
        .lines()
        .find(|line| line.starts_with("export type Widget"))
        .unwrap();
    assert_eq!(
        declaration,
        "export type Widget = { widgetId: number; label: string; tags: string[]; price: number | null; kind: Kind };"
    );
    for key in wire.keys() {
        assert!(declaration.contains(&format!(" {key}: ")), "missing '{key}'");
    }

    assert!(types.contains("export type Kind = \"gadget\" | \"spare_parts\";"));
    assert_eq!(wire["kind"], json!("spare_parts"));
}

#[derive(Serialize, Reflect)]
#[reflect(module = "pkg/api")]
pub struct Stats {
    pub total: u64,
}

fn stats() -> BuiltRouter {
    Router::new()
        .unary("Stats", "Get", |_: ()| async { Ok(Stats { total: 1 }) })
        .unwrap()
        .build()
}

#[test]
fn big_integers() {
    for (behavior, expected) in [
        (BigIntBehavior::Number, "number"),
        (BigIntBehavior::String, "string"),
        (BigIntBehavior::BigInt, "bigint"),
    ] {
        let bindings = typed_rpc::generate(&stats(), &config().bigint(behavior)).unwrap();
        assert!(bindings
            .get(TYPES_FILE)
            .unwrap()
            .contains(&format!("export type Stats = {{ total: {expected} }};")));
    }

    let err = typed_rpc::generate(&stats(), &config().bigint(BigIntBehavior::Fail)).unwrap_err();
    let GenerateError::Render(err) = err else {
        panic!("expected a render error, got {err}");
    };
    assert_eq!(
        err,
        RenderError::BigIntForbidden {
            path: "pkg/api.Stats.total".into(),
            ty: "u64".into(),
        }
    );
}

#[test]
fn manifest() {
    let router = widgets().merge(users()).unwrap().build();
    let bindings = typed_rpc::generate(&router, &config()).unwrap();

    let manifest: Value = serde_json::from_str(bindings.get(MANIFEST_JSON_FILE).unwrap()).unwrap();
    assert_eq!(
        manifest["Widgets.Create"],
        json!({
            "service": "Widgets",
            "method": "Create",
            "kind": "unary",
            "verb": "POST",
            "request": "Widget",
            "response": "Widget",
        })
    );
    assert_eq!(manifest["Widgets.Watch"]["kind"], json!("live"));
    assert_eq!(manifest["Widgets.Watch"]["verb"], json!("GET"));
    assert_eq!(manifest["Widgets.Kinds"]["request"], json!("null"));
    assert_eq!(manifest["Widgets.Kinds"]["response"], json!("Kind[]"));
    assert_eq!(manifest["UsersV1.Get"]["response"], json!("v1_User"));
    assert_eq!(
        manifest.as_object().unwrap().len(),
        router.len(),
        "every method is listed"
    );

    let ts = bindings.get(MANIFEST_FILE).unwrap();
    assert!(ts.contains(
        "  \"Widgets.Create\": { service: \"Widgets\", method: \"Create\", kind: \"unary\", verb: \"POST\", request: \"Widget\", response: \"Widget\" },\n"
    ));
    assert!(ts.contains("export type MethodKey = keyof Manifest;"));
}

#[test]
fn discovery_can_be_disabled() {
    let router = widgets().build();
    let bindings =
        typed_rpc::generate(&router, &config().discovery(false).client(false)).unwrap();
    assert_eq!(
        bindings.files().map(|(name, _)| name).collect::<Vec<_>>(),
        [TYPES_FILE]
    );
}

#[test]
fn client() {
    let router = widgets().merge(users()).unwrap().build();
    let bindings = typed_rpc::generate(&router, &config()).unwrap();
    let client = bindings.get(CLIENT_FILE).unwrap();

    assert!(client.contains("import type * as t from \"./types\";"));
    assert!(client.contains("export type ErrorCode = \"canceled\" | \"unknown\" | \"invalid_argument\""));
    assert!(client.contains("export class RpcError extends Error {"));
    assert!(client.contains("    Create(input: t.Widget): Promise<t.Widget>;\n"));
    assert!(client.contains("    Kinds(input?: null): Promise<t.Kind[]>;\n"));
    assert!(client.contains("    Watch(input: number): LiveSubscription<t.Widget>;\n"));
    assert!(client.contains(
        "      Create: (input) => transport.call(\"Widgets.Create\", manifest[\"Widgets.Create\"].verb, input ?? null).then((value) => decodeWith(\"Widgets.Create\", () => value as t.Widget)),\n"
    ));
    assert!(client.contains(
        "            (value) => forward(\"Widgets.Watch\", () => value as t.Widget, onValue, onError),\n"
    ));
    assert!(client.contains("  UsersV1: {\n"));
    assert!(client.contains("  UsersV2: {\n"));
}

#[test]
fn client_reports_malformed_payloads_as_rpc_errors() {
    let router = widgets().build();
    let client = files(&router, &config().validation(Validation::Zod))
        .remove(CLIENT_FILE)
        .unwrap();

    // Responses failing validation reject with an `RpcError` carrying the method key.
    assert!(client.contains("function decodeWith<T>(key: MethodKey, decode: () => T): T {"));
    assert!(client.contains("throw new RpcError(\"internal\", `invalid response from \"${key}\"`"));
    assert!(client.contains("decodeWith(\"Widgets.Create\", () => t.WidgetSchema.parse(value))"));

    // Pushed values failing to parse or validate reach `onError`, never `onValue`.
    assert!(client.contains("    onError(RpcError.from(err));\n    return;\n"));
    assert!(client.contains("forward(\"Widgets.Watch\", () => t.WidgetSchema.parse(value), onValue, onError)"));
    assert!(client.contains("onError(new RpcError(\"internal\", `invalid message from \"${key}\"`"));
    assert!(!client.contains("onValue(JSON.parse("));
    assert!(!client.contains("RpcError.from(JSON.parse("));
}

#[test]
fn header() {
    let router = widgets().build();
    let bindings = typed_rpc::generate(&router, &config().header("// @ts-nocheck")).unwrap();
    for (name, contents) in bindings.files() {
        if name.ends_with(".ts") {
            assert!(
                contents.starts_with("// @ts-nocheck\n// This file was generated by typed-rpc."),
                "{name}"
            );
        }
    }
}

#[test]
fn export_writes_every_file() {
    let dir = tempfile::tempdir().unwrap();
    let output_dir = dir.path().join("web").join("rpc");

    let router = widgets().build();
    let bindings = typed_rpc::export(&router, &GenerateConfig::new(&output_dir).strip_prefix("pkg/api")).unwrap();

    for (name, contents) in bindings.files() {
        assert_eq!(std::fs::read_to_string(output_dir.join(name)).unwrap(), contents);
    }
    assert_eq!(std::fs::read_dir(&output_dir).unwrap().count(), 4);
}

#[test]
fn failed_exports_write_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let output_dir = dir.path().join("bindings");

    let config = GenerateConfig::new(&output_dir).bigint(BigIntBehavior::Fail);
    assert!(typed_rpc::export(&stats(), &config).is_err());
    assert!(!output_dir.exists());
}

#[test]
fn config_files() {
    let config = GenerateConfig::from_json(
        r#"{ "outputDir": "./web/src/rpc", "stripPrefix": "pkg::api", "bigint": "string", "enumStyle": "native" }"#,
    )
    .unwrap();
    assert_eq!(
        config,
        GenerateConfig::new("./web/src/rpc")
            .strip_prefix("pkg::api")
            .bigint(BigIntBehavior::String)
            .enum_style(typed_rpc::generate::EnumStyle::Native)
    );

    assert!(matches!(
        GenerateConfig::from_json(r#"{ "validation": "yup" }"#),
        Err(ConfigError::Parse(_))
    ));
}

#[derive(Deserialize, Reflect)]
#[reflect(module = "pkg/api")]
pub struct Unused {
    pub id: u32,
}

#[test]
fn unreachable_types_are_not_exported() {
    let router = widgets().build();
    let graph = TypeGraph::extract(&router).unwrap();
    assert!(graph.get(&Origin::new("pkg/api", "Unused")).is_none());
    assert!(matches!(Unused::reflect(), TypeRef::Named(_)));
}
