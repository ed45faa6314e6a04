//! Schema ordering and custom value transforms.

mod common;

use common::*;
use miniorm::*;
use std::sync::Arc;

#[test]
fn update_list_orders_tables_dependency_first() {
    let f = fixture();

    let mut schema = SchemaRegistry::new();
    // Registration order is deliberately scrambled.
    schema.register("Revision");
    schema.register("ArticlePage");
    schema.register("Author");
    schema.register("Page");

    let tables = schema.update_list(&f.unit_of_work).unwrap();

    let position = |name: &str| {
        tables
            .iter()
            .position(|t| t == name)
            .unwrap_or_else(|| panic!("{name} missing from {tables:?}"))
    };
    assert_eq!(tables.len(), 4);
    assert!(position("authors") < position("pages"));
    assert!(position("pages") < position("article_pages"));
    assert!(position("pages") < position("revisions"));
}

#[test]
fn update_list_filters_to_registered_classes() {
    let f = fixture();

    let mut schema = SchemaRegistry::new();
    schema.register("Revision");

    // Page and Author participate in the ordering graph but are not
    // registered, so their tables are not emitted.
    let tables = schema.update_list(&f.unit_of_work).unwrap();
    assert_eq!(tables, vec!["revisions".to_string()]);
}

#[test]
fn cyclic_owning_associations_fail_commit_ordering() {
    struct Chicken {
        hash: EntityHash,
        id: Option<i64>,
        egg: Option<EntityRef>,
    }
    struct Egg {
        hash: EntityHash,
        id: Option<i64>,
        chicken: Option<EntityRef>,
    }

    macro_rules! circular_entity {
        ($ty:ident) => {
            impl Entity for $ty {
                fn class_name(&self) -> &'static str {
                    stringify!($ty)
                }
                fn entity_hash(&self) -> &EntityHash {
                    &self.hash
                }
                fn id(&self) -> Option<i64> {
                    self.id
                }
                fn set_id(&mut self, id: i64) {
                    self.id = Some(id);
                }
                fn as_any(&self) -> &dyn std::any::Any {
                    self
                }
                fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
                    self
                }
            }
        };
    }
    circular_entity!(Chicken);
    circular_entity!(Egg);

    let registry = MetadataRegistry::new()
        .with(
            ClassSpec::new("Chicken", || Chicken {
                hash: EntityHash::generate(),
                id: None,
                egg: None,
            })
            .table("chickens")
            .field(
                FieldSpec::new(
                    "egg",
                    "Egg",
                    reference_accessors(
                        |c: &Chicken| c.egg.clone(),
                        |c: &mut Chicken, e| c.egg = e,
                    ),
                )
                .column(ColumnSpec::new("chicken_egg", ColumnType::Integer).length(10))
                .association(AssociationSpec::one_to_one("Egg")),
            ),
        )
        .with(
            ClassSpec::new("Egg", || Egg {
                hash: EntityHash::generate(),
                id: None,
                chicken: None,
            })
            .table("eggs")
            .field(
                FieldSpec::new(
                    "chicken",
                    "Chicken",
                    reference_accessors(
                        |e: &Egg| e.chicken.clone(),
                        |e: &mut Egg, c| e.chicken = c,
                    ),
                )
                .column(ColumnSpec::new("egg_chicken", ColumnType::Integer).length(10))
                .association(AssociationSpec::many_to_one("Chicken")),
            ),
        );

    let unit_of_work = UnitOfWork::new(
        Box::new(MemoryExecutor::new("farm")),
        Arc::new(registry),
        TransformRegistry::new(),
    );

    let chicken = unit_of_work.identity("Chicken").unwrap();
    let err = unit_of_work.commit_order(&[chicken]).unwrap_err();
    assert!(matches!(err, Error::DependencyCycle(_)));
}

/// Stores booleans as 0/1 integer columns.
struct BoolTransform;

impl Transform for BoolTransform {
    fn to_column(&self, value: Value) -> Value {
        match value {
            Value::Bool(b) => Value::Int(i64::from(b)),
            other => other,
        }
    }

    fn from_column(&self, value: Value) -> Value {
        match value {
            Value::Int(i) => Value::Bool(i != 0),
            other => other,
        }
    }
}

#[test]
fn registered_transform_applies_on_both_mapping_paths() {
    struct Flag {
        hash: EntityHash,
        id: Option<i64>,
        enabled: Option<bool>,
    }

    impl Entity for Flag {
        fn class_name(&self) -> &'static str {
            "Flag"
        }
        fn entity_hash(&self) -> &EntityHash {
            &self.hash
        }
        fn id(&self) -> Option<i64> {
            self.id
        }
        fn set_id(&mut self, id: i64) {
            self.id = Some(id);
        }
        fn as_any(&self) -> &dyn std::any::Any {
            self
        }
        fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
            self
        }
    }

    let registry = MetadataRegistry::new().with(
        ClassSpec::new("Flag", || Flag {
            hash: EntityHash::generate(),
            id: None,
            enabled: None,
        })
        .table("flags")
        .field(
            FieldSpec::new(
                "enabled",
                "bool",
                scalar_accessors(
                    |f: &Flag| Value::from(f.enabled),
                    |f: &mut Flag, v| f.enabled = v.as_bool(),
                ),
            )
            .column(ColumnSpec::new("flag_enabled", ColumnType::Boolean).length(1)),
        ),
    );

    let mut transforms = TransformRegistry::new();
    transforms.register("bool", Arc::new(BoolTransform));

    let executor = Arc::new(MemoryExecutor::new("flagdb"));
    executor.create_table("flags");
    let unit_of_work = UnitOfWork::new(
        Box::new(Arc::clone(&executor)),
        Arc::new(registry),
        transforms,
    );

    let flag = entity_ref(Flag {
        hash: EntityHash::generate(),
        id: None,
        enabled: Some(true),
    });
    unit_of_work.register_new(&flag);
    unit_of_work.commit().unwrap();

    // Stored as an integer column.
    let rows = executor.rows("flags").unwrap();
    assert_eq!(rows[0].get("flag_enabled"), Some(&Value::Int(1)));

    // Loaded back as a boolean.
    let loaded = unit_of_work.find_by_id("Flag", 1).unwrap().unwrap();
    let guard = read_entity(&loaded);
    let flag = guard.as_any().downcast_ref::<Flag>().unwrap();
    assert_eq!(flag.enabled, Some(true));
}
