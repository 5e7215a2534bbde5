//! Schema generation tests.
//!
//! These tests build schemas from small class registries and check the
//! generated SDL.

use std::sync::Arc;

use autoql_core::{
    ClassDef, ClassRegistry, MemberDef, MethodDef, ParamDef, RawType, TypeDescriptor, TypeMarker,
};
use autoql_graphql::observability::init_tracing_with_level;
use autoql_graphql::schema::{
    Discovery, FullNamingStrategy, GenericObjectMapper, PrefixedNodeFactory, RelayNamingStrategy,
    ScalarMapper, ScalarType, SchemaType,
};
use autoql_graphql::{DateFormat, SchemaBuilder, SchemaConfig, SchemaError};
use serde_json::{Value, json};

// =============================================================================
// Fixtures
// =============================================================================

struct Api;

fn registry(classes: impl IntoIterator<Item = ClassDef>) -> Arc<ClassRegistry> {
    let mut registry = ClassRegistry::new();
    for class in classes {
        registry.register(class).unwrap();
    }
    Arc::new(registry)
}

fn api(methods: impl IntoIterator<Item = MethodDef>) -> ClassDef {
    methods
        .into_iter()
        .fold(ClassDef::object("app::Api"), ClassDef::method)
}

fn query(name: &str, returns: TypeDescriptor) -> MethodDef {
    MethodDef::query(name, returns).handler(|_, _| Ok(Value::Null))
}

fn person() -> ClassDef {
    ClassDef::object("app::Person")
        .member(MemberDef::new("name", TypeDescriptor::string()))
        .member(MemberDef::new("age", TypeDescriptor::i32()))
}

fn sdl(builder: SchemaBuilder) -> String {
    init_tracing_with_level("warn");
    builder.build().unwrap().sdl()
}

// =============================================================================
// Objects and scalars
// =============================================================================

#[test]
fn test_object_type_from_members() {
    let classes = registry([
        person(),
        api([query("person", TypeDescriptor::named("app::Person"))]),
    ]);
    let sdl = sdl(SchemaBuilder::new(classes).query_source("app::Api", Api));

    assert!(sdl.contains("type Person"));
    assert!(sdl.contains("name: String"));
    assert!(sdl.contains("age: Int"));
    assert!(sdl.contains("person: Person"));
}

#[test]
fn test_hidden_and_renamed_members() {
    let classes = registry([
        ClassDef::object("app::Account")
            .member(MemberDef::new("login", TypeDescriptor::string()).rename("username"))
            .member(MemberDef::new("password", TypeDescriptor::string()).ignore())
            .member(MemberDef::new("COUNT", TypeDescriptor::i32()).static_member())
            .member(MemberDef::new("outer", TypeDescriptor::string()).enclosing()),
        api([query("account", TypeDescriptor::named("app::Account"))]),
    ]);
    let built = SchemaBuilder::new(classes)
        .query_source("app::Api", Api)
        .build()
        .unwrap();

    let Some(SchemaType::Object(account)) = built.output_type("Account") else {
        panic!("Account should be an object type");
    };
    assert_eq!(account.field_names(), vec!["username"]);
}

#[test]
fn test_wide_integers() {
    let classes = registry([api([MethodDef::query("count", TypeDescriptor::i64())
        .param(ParamDef::new("limit", TypeDescriptor::i64()))
        .handler(|_, _| Ok(json!(1)))])]);
    let sdl = sdl(SchemaBuilder::new(classes).query_source("app::Api", Api));

    assert!(sdl.contains("scalar Long"));
    assert!(sdl.contains("count(limit: Int): Long"));
}

#[test]
fn test_required_argument() {
    let classes = registry([api([MethodDef::query("greet", TypeDescriptor::string())
        .param(ParamDef::new("name", TypeDescriptor::string()).required())
        .handler(|_, _| Ok(json!("hi")))])]);
    let sdl = sdl(SchemaBuilder::new(classes).query_source("app::Api", Api));

    assert!(sdl.contains("greet(name: String!): String"));
}

#[test]
fn test_recursive_types() {
    let classes = registry([
        ClassDef::object("app::Category")
            .member(MemberDef::new("name", TypeDescriptor::string()))
            .member(MemberDef::new("parent", TypeDescriptor::named("app::Category")))
            .member(MemberDef::new(
                "children",
                TypeDescriptor::list_of(TypeDescriptor::named("app::Category")),
            )),
        api([query("root", TypeDescriptor::named("app::Category"))]),
    ]);
    let sdl = sdl(SchemaBuilder::new(classes).query_source("app::Api", Api));

    assert!(sdl.contains("parent: Category"));
    assert!(sdl.contains("children: [Category]"));
}

#[test]
fn test_mutually_recursive_types() {
    let classes = registry([
        ClassDef::object("app::Author")
            .member(MemberDef::new("name", TypeDescriptor::string()))
            .member(MemberDef::new(
                "books",
                TypeDescriptor::list_of(TypeDescriptor::named("app::Book")),
            )),
        ClassDef::object("app::Book")
            .member(MemberDef::new("title", TypeDescriptor::string()))
            .member(MemberDef::new("author", TypeDescriptor::named("app::Author"))),
        api([query("author", TypeDescriptor::named("app::Author"))]),
    ]);
    let built = SchemaBuilder::new(classes)
        .query_source("app::Api", Api)
        .build()
        .unwrap();

    let Some(SchemaType::Object(author)) = built.output_type("Author") else {
        panic!("Author should be an object type");
    };
    let Some(SchemaType::Object(book)) = built.output_type("Book") else {
        panic!("Book should be an object type");
    };
    assert_eq!(author.field_names(), vec!["name", "books"]);
    assert_eq!(book.field_names(), vec!["title", "author"]);

    let sdl = built.sdl();
    assert!(sdl.contains("books: [Book]"));
    assert!(sdl.contains("author: Author"));
}

#[test]
fn test_empty_object_gets_placeholder() {
    let classes = registry([
        ClassDef::object("app::Marker"),
        api([query("marker", TypeDescriptor::named("app::Marker"))]),
    ]);
    let sdl = sdl(SchemaBuilder::new(classes).query_source("app::Api", Api));

    assert!(sdl.contains("type Marker"));
    assert!(sdl.contains("_placeholder: String"));
}

#[test]
fn test_no_sources_yields_placeholder_query() {
    let built = SchemaBuilder::new(Arc::new(ClassRegistry::new())).build().unwrap();
    assert!(built.sdl().contains("_placeholder"));
    assert!(built.mutation_type().is_none());
}

// =============================================================================
// Containers and mappers
// =============================================================================

#[test]
fn test_enum_keyed_map() {
    let classes = registry([
        ClassDef::enumeration("app::Color", ["RED", "GREEN", "BLUE"]),
        api([query(
            "palette",
            TypeDescriptor::map_of(TypeDescriptor::named("app::Color"), TypeDescriptor::string()),
        )]),
    ]);
    let built = SchemaBuilder::new(classes)
        .query_source("app::Api", Api)
        .build()
        .unwrap();
    let sdl = built.sdl();

    assert!(sdl.contains("type Map_Color"));
    assert!(sdl.contains("RED: String"));
    assert!(sdl.contains("GREEN: String"));
    assert!(sdl.contains("BLUE: String"));

    let Some(SchemaType::Object(map)) = built.output_type("Map_Color") else {
        panic!("Map_Color should be an object type");
    };
    assert_eq!(map.fields.len(), 3);
}

#[test]
fn test_string_keyed_map_fails_at_root() {
    let classes = registry([api([query(
        "lookup",
        TypeDescriptor::map_of(TypeDescriptor::string(), TypeDescriptor::string()),
    )])]);
    let err = SchemaBuilder::new(classes)
        .query_source("app::Api", Api)
        .build()
        .unwrap_err();
    assert!(err.is_not_mappable());
}

#[test]
fn test_collections_and_optionals() {
    let classes = registry([
        person(),
        api([
            query("people", TypeDescriptor::set_of(TypeDescriptor::named("app::Person"))),
            query("scores", TypeDescriptor::array_of(TypeDescriptor::f64())),
            query("maybe", TypeDescriptor::optional(TypeDescriptor::named("app::Person"))),
        ]),
    ]);
    let sdl = sdl(SchemaBuilder::new(classes).query_source("app::Api", Api));

    assert!(sdl.contains("people: [Person]"));
    assert!(sdl.contains("scores: [Float]"));
    assert!(sdl.contains("maybe: Person"));
}

#[test]
fn test_last_exact_mapper_wins() {
    let classes = registry([
        ClassDef::object("app::Product").member(MemberDef::new("price", RawType::Money.into())),
        api([query("product", TypeDescriptor::named("app::Product"))]),
    ]);
    let sdl = sdl(
        SchemaBuilder::new(classes)
            .query_source("app::Api", Api)
            .type_mapper(RawType::Money, ScalarMapper::both(ScalarType::Float))
            .type_mapper(RawType::Money, ScalarMapper::both(ScalarType::Int)),
    );

    assert!(sdl.contains("price: Int"));
    assert!(!sdl.contains("price: Float"));
    assert!(!sdl.contains("price: String"));
}

#[test]
fn test_value_types_and_date_format() {
    let classes = registry([
        ClassDef::object("app::Invoice")
            .member(MemberDef::new("total", RawType::BigDecimal.into()))
            .member(MemberDef::new("issuedAt", RawType::DateTime.into())),
        api([query("invoice", TypeDescriptor::named("app::Invoice"))]),
    ]);

    let millis = sdl(SchemaBuilder::new(Arc::clone(&classes)).query_source("app::Api", Api));
    assert!(millis.contains("total: String"));
    assert!(millis.contains("issuedAt: Long"));

    let iso = sdl(
        SchemaBuilder::new(classes)
            .query_source("app::Api", Api)
            .config(SchemaConfig {
                date_format: DateFormat::Iso8601,
                ..SchemaConfig::default()
            }),
    );
    assert!(iso.contains("issuedAt: String"));
}

// =============================================================================
// Input types
// =============================================================================

#[test]
fn test_input_object_mirroring() {
    let classes = registry([
        person(),
        ClassDef::object("app::Api").method(
            MethodDef::mutation("save", TypeDescriptor::named("app::Person"))
                .param(ParamDef::new("person", TypeDescriptor::named("app::Person")))
                .handler(|_, args| Ok(args.value(0)?.clone())),
        ),
    ]);
    let built = SchemaBuilder::new(classes)
        .query_source("app::Api", Api)
        .build()
        .unwrap();
    let sdl = built.sdl();

    assert!(sdl.contains("input PersonInput"));
    assert!(sdl.contains("save(person: PersonInput): Person"));
    assert!(sdl.contains("type Mutation"));

    let Some(SchemaType::InputObject(input)) = built.input_type("PersonInput") else {
        panic!("PersonInput should be an input object");
    };
    assert_eq!(input.field_names(), vec!["name", "age"]);
    assert!(matches!(
        input.field("age").map(|field| &field.ty),
        Some(SchemaType::Scalar(ScalarType::Int))
    ));
}

#[test]
fn test_wide_integer_members_narrow_in_inputs() {
    let classes = registry([
        ClassDef::object("app::Counter")
            .member(MemberDef::new("label", TypeDescriptor::string()))
            .member(MemberDef::new("total", TypeDescriptor::i64())),
        ClassDef::object("app::Api").method(
            MethodDef::mutation("record", TypeDescriptor::named("app::Counter"))
                .param(ParamDef::new("counter", TypeDescriptor::named("app::Counter")))
                .handler(|_, args| Ok(args.value(0)?.clone())),
        ),
    ]);
    let built = SchemaBuilder::new(classes)
        .query_source("app::Api", Api)
        .build()
        .unwrap();

    let Some(SchemaType::Object(counter)) = built.output_type("Counter") else {
        panic!("Counter should be an object type");
    };
    assert_eq!(
        counter.field("total").map(|field| field.type_signature()),
        Some("Long".to_string())
    );

    let Some(SchemaType::InputObject(input)) = built.input_type("CounterInput") else {
        panic!("CounterInput should be an input object");
    };
    assert_eq!(input.field_names(), vec!["label", "total"]);
    assert!(matches!(
        input.field("total").map(|field| &field.ty),
        Some(SchemaType::Scalar(ScalarType::Int))
    ));
}

#[test]
fn test_node_input_keeps_id() {
    let classes = registry([
        ClassDef::object("app::User")
            .member(MemberDef::new("id", TypeDescriptor::string()))
            .member(MemberDef::new("name", TypeDescriptor::string()))
            .node("id"),
        ClassDef::object("app::Api").method(
            MethodDef::mutation("save", TypeDescriptor::named("app::User"))
                .param(ParamDef::new("user", TypeDescriptor::named("app::User")))
                .handler(|_, args| Ok(args.value(0)?.clone())),
        ),
    ]);
    let built = SchemaBuilder::new(classes)
        .query_source("app::Api", Api)
        .build()
        .unwrap();

    let Some(SchemaType::Object(user)) = built.output_type("User") else {
        panic!("User should be an object type");
    };
    assert_eq!(user.field_names(), vec!["id", "name"]);

    let Some(SchemaType::InputObject(input)) = built.input_type("UserInput") else {
        panic!("UserInput should be an input object");
    };
    assert_eq!(input.field_names(), vec!["id", "name"]);
    assert!(matches!(
        input.field("id").map(|field| &field.ty),
        Some(SchemaType::Scalar(ScalarType::String))
    ));
}

#[test]
fn test_custom_input_suffix() {
    let classes = registry([
        person(),
        api([MethodDef::query("find", TypeDescriptor::string())
            .param(ParamDef::new("example", TypeDescriptor::named("app::Person")))
            .handler(|_, _| Ok(Value::Null))]),
    ]);
    let sdl = sdl(
        SchemaBuilder::new(classes)
            .query_source("app::Api", Api)
            .config(SchemaConfig {
                input_suffix: "Filter".to_string(),
                ..SchemaConfig::default()
            }),
    );

    assert!(sdl.contains("input PersonFilter"));
}

// =============================================================================
// Naming
// =============================================================================

fn twin_people() -> Arc<ClassRegistry> {
    registry([
        ClassDef::object("app::a::Person").member(MemberDef::new("name", TypeDescriptor::string())),
        ClassDef::object("app::b::Person").member(MemberDef::new("title", TypeDescriptor::string())),
        api([
            query("first", TypeDescriptor::named("app::a::Person")),
            query("second", TypeDescriptor::named("app::b::Person")),
        ]),
    ])
}

#[test]
fn test_name_collision_aborts() {
    let err = SchemaBuilder::new(twin_people())
        .query_source("app::Api", Api)
        .build()
        .unwrap_err();
    assert!(matches!(err, SchemaError::NameCollision { ref name, .. } if name == "Person"));
}

#[test]
fn test_full_naming_disambiguates() {
    let sdl = sdl(
        SchemaBuilder::new(twin_people())
            .query_source("app::Api", Api)
            .naming_strategy(FullNamingStrategy),
    );
    assert!(sdl.contains("type app_a_Person"));
    assert!(sdl.contains("type app_b_Person"));
}

fn connection_classes() -> Arc<ClassRegistry> {
    registry([
        person(),
        ClassDef::object("app::Connection")
            .type_param("T")
            .member(MemberDef::new("items", TypeDescriptor::list_of(TypeDescriptor::var("T"))))
            .member(MemberDef::new("total", TypeDescriptor::i32())),
        api([query(
            "people",
            TypeDescriptor::parameterized(
                RawType::Named("app::Connection".into()),
                [TypeDescriptor::named("app::Person")],
            ),
        )]),
    ])
}

#[test]
fn test_generic_class_with_relay_names() {
    let sdl = sdl(
        SchemaBuilder::new(connection_classes())
            .query_source("app::Api", Api)
            .interface_mapper(GenericObjectMapper::new(["app::Connection"]))
            .naming_strategy(RelayNamingStrategy),
    );

    assert!(sdl.contains("type PersonConnection"));
    assert!(sdl.contains("items: [Person]"));
    assert!(sdl.contains("people: PersonConnection"));
}

#[test]
fn test_generic_class_without_mapper() {
    let err = SchemaBuilder::new(connection_classes())
        .query_source("app::Api", Api)
        .build()
        .unwrap_err();
    assert!(err.is_not_mappable());
}

// =============================================================================
// Nodes and discovery
// =============================================================================

#[test]
fn test_node_interface() {
    let classes = registry([ClassDef::object("app::User")
        .member(MemberDef::new("uid", TypeDescriptor::string()))
        .member(MemberDef::new("name", TypeDescriptor::string()))
        .node("uid")]);
    let sdl = sdl(SchemaBuilder::new(classes).node_factory(PrefixedNodeFactory::new(
        "User",
        TypeDescriptor::named("app::User"),
        |_| Ok(Value::Null),
    )));

    assert!(sdl.contains("interface Node"));
    assert!(sdl.contains("type User implements Node"));
    assert!(sdl.contains("id: ID!"));
    assert!(sdl.contains("node(id: ID!): Node"));
}

#[test]
fn test_discovery() {
    let classes = registry([
        ClassDef::object("app::Product").member(MemberDef::new("price", RawType::Money.into())),
        api([query("product", TypeDescriptor::named("app::Product"))]).marker(TypeMarker::QuerySource),
        ClassDef::object("app::MoneyMapper").marker(TypeMarker::TypeMapper),
        ClassDef::object("other::Ignored").marker(TypeMarker::QuerySource),
    ]);
    let discovery = Discovery::new()
        .query_source("app::Api", || Api)
        .exact_mapper("app::MoneyMapper", RawType::Money, || {
            ScalarMapper::both(ScalarType::Float)
        });

    let sdl = sdl(SchemaBuilder::new(Arc::clone(&classes)).discover(&*classes, "app", &discovery));
    assert!(sdl.contains("product: Product"));
    assert!(sdl.contains("price: Float"));
}

#[test]
fn test_config_from_toml() {
    let config = SchemaConfig::from_toml(
        r#"
        query_type_name = "RootQuery"
        input_suffix = "Args"
        "#,
    )
    .unwrap();
    let classes = registry([api([query("ping", TypeDescriptor::string())])]);
    let sdl = sdl(
        SchemaBuilder::new(classes)
            .query_source("app::Api", Api)
            .config(config),
    );

    assert!(sdl.contains("type RootQuery"));
}
