//! Shared fixtures: a small wiki-flavored entity hierarchy mapped over the
//! in-memory executor.
//!
//! - `Author` 1--1 `Profile` (profile owns the foreign key)
//! - `Page` *--1 `Author`, 1--* `Revision`
//! - `ArticlePage` extends `Page` (joined base table, discriminator)

#![allow(dead_code)]

use miniorm::*;
use std::any::Any;
use std::sync::Arc;

pub struct Author {
    pub hash: EntityHash,
    pub id: Option<i64>,
    pub name: Option<String>,
    pub profile: Option<EntityRef>,
}

impl Author {
    pub fn fresh() -> Self {
        Self {
            hash: EntityHash::generate(),
            id: None,
            name: None,
            profile: None,
        }
    }
}

pub struct Profile {
    pub hash: EntityHash,
    pub id: Option<i64>,
    pub bio: Option<String>,
    pub author: Option<EntityRef>,
}

impl Profile {
    pub fn fresh() -> Self {
        Self {
            hash: EntityHash::generate(),
            id: None,
            bio: None,
            author: None,
        }
    }
}

pub struct Page {
    pub hash: EntityHash,
    pub id: Option<i64>,
    pub title: Option<String>,
    pub author: Option<EntityRef>,
    pub revisions: Vec<EntityRef>,
}

impl Page {
    pub fn fresh() -> Self {
        Self {
            hash: EntityHash::generate(),
            id: None,
            title: None,
            author: None,
            revisions: Vec::new(),
        }
    }
}

pub struct ArticlePage {
    pub base: Page,
    pub section: Option<String>,
}

impl ArticlePage {
    pub fn fresh() -> Self {
        Self {
            base: Page::fresh(),
            section: None,
        }
    }
}

pub struct Revision {
    pub hash: EntityHash,
    pub id: Option<i64>,
    pub note: Option<String>,
    pub page: Option<EntityRef>,
}

impl Revision {
    pub fn fresh() -> Self {
        Self {
            hash: EntityHash::generate(),
            id: None,
            note: None,
            page: None,
        }
    }
}

macro_rules! impl_entity {
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
            fn as_any(&self) -> &dyn Any {
                self
            }
            fn as_any_mut(&mut self) -> &mut dyn Any {
                self
            }
        }
    };
}

impl_entity!(Author);
impl_entity!(Profile);
impl_entity!(Page);
impl_entity!(Revision);

impl Entity for ArticlePage {
    fn class_name(&self) -> &'static str {
        "ArticlePage"
    }
    fn entity_hash(&self) -> &EntityHash {
        &self.base.hash
    }
    fn id(&self) -> Option<i64> {
        self.base.id
    }
    fn set_id(&mut self, id: i64) {
        self.base.id = Some(id);
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Project any entity in the `Page` hierarchy to its shared base state.
pub fn as_page(entity: &dyn Entity) -> &Page {
    if let Some(page) = entity.as_any().downcast_ref::<Page>() {
        page
    } else if let Some(article) = entity.as_any().downcast_ref::<ArticlePage>() {
        &article.base
    } else {
        panic!("entity is not part of the Page hierarchy")
    }
}

pub fn as_page_mut(entity: &mut dyn Entity) -> &mut Page {
    if entity.as_any().downcast_ref::<Page>().is_some() {
        return entity.as_any_mut().downcast_mut::<Page>().unwrap();
    }
    entity
        .as_any_mut()
        .downcast_mut::<ArticlePage>()
        .map(|article| &mut article.base)
        .expect("entity is not part of the Page hierarchy")
}

/// The fixture metadata: all five classes of the hierarchy.
pub fn metadata() -> MetadataRegistry {
    MetadataRegistry::new()
        .with(
            ClassSpec::new("Author", Author::fresh)
                .table("authors")
                .field(
                    FieldSpec::new(
                        "name",
                        "String",
                        scalar_accessors(
                            |a: &Author| Value::from(a.name.clone()),
                            |a: &mut Author, v| a.name = v.as_text().map(str::to_string),
                        ),
                    )
                    .column(ColumnSpec::new("author_name", ColumnType::Binary).length(255)),
                )
                .field(
                    FieldSpec::new(
                        "profile",
                        "Profile",
                        reference_accessors(
                            |a: &Author| a.profile.clone(),
                            |a: &mut Author, r| a.profile = r,
                        ),
                    )
                    .association(AssociationSpec::one_to_one("Profile").mapped_by("author")),
                ),
        )
        .with(
            ClassSpec::new("Profile", Profile::fresh)
                .table("profiles")
                .field(
                    FieldSpec::new(
                        "bio",
                        "String",
                        scalar_accessors(
                            |p: &Profile| Value::from(p.bio.clone()),
                            |p: &mut Profile, v| p.bio = v.as_text().map(str::to_string),
                        ),
                    )
                    .column(ColumnSpec::new("profile_bio", ColumnType::Text).nullable(true)),
                )
                .field(
                    FieldSpec::new(
                        "author",
                        "Author",
                        reference_accessors(
                            |p: &Profile| p.author.clone(),
                            |p: &mut Profile, r| p.author = r,
                        ),
                    )
                    .column(
                        ColumnSpec::new("profile_author", ColumnType::Integer)
                            .length(10)
                            .nullable(true),
                    )
                    .association(AssociationSpec::one_to_one("Author")),
                ),
        )
        .with(
            ClassSpec::new("Page", Page::fresh)
                .table("pages")
                .field(
                    FieldSpec::new(
                        "title",
                        "String",
                        scalar_accessors_with(
                            |e| Value::from(as_page(e).title.clone()),
                            |e, v| as_page_mut(e).title = v.as_text().map(str::to_string),
                        ),
                    )
                    .column(ColumnSpec::new("page_title", ColumnType::Binary).length(255)),
                )
                .field(
                    FieldSpec::new(
                        "author",
                        "Author",
                        reference_accessors_with(
                            |e| as_page(e).author.clone(),
                            |e, r| as_page_mut(e).author = r,
                        ),
                    )
                    .column(
                        ColumnSpec::new("page_author", ColumnType::Integer)
                            .length(10)
                            .nullable(true),
                    )
                    .association(AssociationSpec::many_to_one("Author")),
                )
                .field(
                    FieldSpec::new(
                        "revisions",
                        "Vec<Revision>",
                        collection_accessors_with(
                            |e| as_page(e).revisions.clone(),
                            |e, c| as_page_mut(e).revisions = c,
                        ),
                    )
                    .association(AssociationSpec::one_to_many("Revision", "page")),
                ),
        )
        .with(
            ClassSpec::new("ArticlePage", ArticlePage::fresh)
                .table("article_pages")
                .base_class("Page")
                .field(
                    FieldSpec::new(
                        "section",
                        "String",
                        scalar_accessors(
                            |a: &ArticlePage| Value::from(a.section.clone()),
                            |a: &mut ArticlePage, v| a.section = v.as_text().map(str::to_string),
                        ),
                    )
                    .column(ColumnSpec::new("article_section", ColumnType::Binary).length(255)),
                ),
        )
        .with(
            ClassSpec::new("Revision", Revision::fresh)
                .table("revisions")
                .field(
                    FieldSpec::new(
                        "note",
                        "String",
                        scalar_accessors(
                            |r: &Revision| Value::from(r.note.clone()),
                            |r: &mut Revision, v| r.note = v.as_text().map(str::to_string),
                        ),
                    )
                    .column(ColumnSpec::new("rev_note", ColumnType::Text).nullable(true)),
                )
                .field(
                    FieldSpec::new(
                        "page",
                        "Page",
                        reference_accessors(
                            |r: &Revision| r.page.clone(),
                            |r: &mut Revision, p| r.page = p,
                        ),
                    )
                    .column(ColumnSpec::new("rev_page", ColumnType::Integer).length(10))
                    .association(AssociationSpec::many_to_one("Page")),
                ),
        )
}

pub const TABLES: &[&str] = &["authors", "profiles", "pages", "article_pages", "revisions"];

pub struct Fixture {
    pub executor: Arc<MemoryExecutor>,
    pub unit_of_work: UnitOfWork,
}

impl Fixture {
    pub fn seed(&self, table: &str, pairs: Vec<(&str, Value)>) -> i64 {
        self.executor
            .insert(table, Row::from_pairs(pairs))
            .expect("seeding failed")
    }
}

pub fn fixture() -> Fixture {
    fixture_with_transforms(TransformRegistry::new())
}

pub fn fixture_with_transforms(transforms: TransformRegistry) -> Fixture {
    let executor = Arc::new(MemoryExecutor::new("wiki"));
    for table in TABLES {
        executor.create_table(table);
    }
    let unit_of_work = UnitOfWork::new(
        Box::new(Arc::clone(&executor)),
        Arc::new(metadata()),
        transforms,
    );
    Fixture {
        executor,
        unit_of_work,
    }
}

/// Run a closure against the concrete type behind an entity reference.
pub fn with_entity<T: Entity, R>(entity: &EntityRef, f: impl FnOnce(&T) -> R) -> R {
    let guard = read_entity(entity);
    f(guard
        .as_any()
        .downcast_ref::<T>()
        .expect("unexpected entity type"))
}

pub fn with_entity_mut<T: Entity, R>(entity: &EntityRef, f: impl FnOnce(&mut T) -> R) -> R {
    let mut guard = write_entity(entity);
    f(guard
        .as_any_mut()
        .downcast_mut::<T>()
        .expect("unexpected entity type"))
}
