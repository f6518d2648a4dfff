//! Extension-point tests
//!
//! Custom introspectors, matchers and plugins registered through the options
//! builder, exercised end to end through the sampling pipeline.

use specimen::{
    ArbitraryIntrospector, AssignableType, CombinableArbitrary, FixtureEngine,
    FixtureOptionsBuilder, FixtureResult, IntrospectContext, Introspected, NameContains, Plugin,
    Property, TypeKind, TypeSchema, TypeSpec, Value,
};

fn register_account(builder: &FixtureOptionsBuilder) {
    builder.registry().register(
        TypeSchema::new("Account")
            .with_property(Property::new("email", TypeSpec::Text))
            .with_property(Property::new("display_name", TypeSpec::Text))
            .with_property(Property::new("balance", TypeSpec::Integer)),
    );
}

/// Claims text properties whose name mentions "email"
struct EmailIntrospector;

impl ArbitraryIntrospector for EmailIntrospector {
    fn introspect(&self, _ctx: &IntrospectContext<'_>) -> FixtureResult<Introspected> {
        Ok(Introspected::Arbitrary(CombinableArbitrary::fixed_value(
            Value::Text("user@example.com".to_string()),
        )))
    }
}

#[test]
fn name_matched_introspector_overrides_the_primitive_chain() {
    let mut builder = FixtureOptionsBuilder::new();
    register_account(&builder);
    builder.insert_first_introspector(
        Box::new(NameContains("email".to_string())),
        Box::new(EmailIntrospector),
    );
    let engine = FixtureEngine::new(builder.build());

    let values = engine
        .sample_many(&TypeSpec::Object("Account".to_string()), 11, 50)
        .unwrap();
    for value in values {
        assert_eq!(
            value.get("email").and_then(Value::as_text),
            Some("user@example.com")
        );
        // Only the matched property is claimed; siblings keep the default
        // primitive generators.
        assert!(value.get("display_name").and_then(Value::as_text).is_some());
        assert!(value.get("balance").and_then(Value::as_int).is_some());
    }
}

#[test]
fn declining_introspector_falls_through_to_the_next_entry() {
    struct Abstainer;
    impl ArbitraryIntrospector for Abstainer {
        fn introspect(&self, _ctx: &IntrospectContext<'_>) -> FixtureResult<Introspected> {
            Ok(Introspected::NotIntrospected)
        }
    }

    let mut builder = FixtureOptionsBuilder::new();
    register_account(&builder);
    builder.insert_first_introspector(
        Box::new(AssignableType(TypeKind::Integer)),
        Box::new(Abstainer),
    );
    let engine = FixtureEngine::new(builder.build());

    let value = engine
        .sample(&TypeSpec::Object("Account".to_string()), 13)
        .unwrap();
    assert!(value.get("balance").and_then(Value::as_int).is_some());
}

#[test]
fn plugin_installs_its_collaborators_in_application_order() {
    struct EmailPlugin;
    impl Plugin for EmailPlugin {
        fn accept(&self, builder: &mut FixtureOptionsBuilder) {
            builder.insert_first_introspector(
                Box::new(NameContains("email".to_string())),
                Box::new(EmailIntrospector),
            );
        }
    }

    let mut builder = FixtureOptionsBuilder::new();
    register_account(&builder);
    builder.plugin(&EmailPlugin);
    let engine = FixtureEngine::new(builder.build());

    let value = engine
        .sample(&TypeSpec::Object("Account".to_string()), 17)
        .unwrap();
    assert_eq!(
        value.get("email").and_then(Value::as_text),
        Some("user@example.com")
    );
}

#[test]
fn object_introspector_can_replace_default_assembly() {
    struct SentinelObject;
    impl ArbitraryIntrospector for SentinelObject {
        fn introspect(&self, ctx: &IntrospectContext<'_>) -> FixtureResult<Introspected> {
            // Discard the composed children and answer with a marker value.
            ctx.take_children();
            Ok(Introspected::Arbitrary(CombinableArbitrary::fixed_value(
                Value::Text("sentinel".to_string()),
            )))
        }
    }

    let mut builder = FixtureOptionsBuilder::new();
    register_account(&builder);
    builder.insert_first_introspector(
        Box::new(AssignableType(TypeKind::Object)),
        Box::new(SentinelObject),
    );
    let engine = FixtureEngine::new(builder.build());

    let value = engine
        .sample(&TypeSpec::Object("Account".to_string()), 19)
        .unwrap();
    assert_eq!(value.as_text(), Some("sentinel"));
}
