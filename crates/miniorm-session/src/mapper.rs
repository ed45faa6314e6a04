//! The data mapper: row <-> entity translation for one entity class.
//!
//! A mapper is a cheap view over the unit of work plus one identity; it is
//! constructed on demand via [`UnitOfWork::mapper`](crate::UnitOfWork::mapper).
//! Association targets are resolved by recursively consulting the target
//! class's own mapper, and polymorphic rows re-dispatch to the subclass
//! mapper named by their discriminator column.

use crate::unit_of_work::UnitOfWork;
use miniorm_core::{
    read_entity, write_entity, Association, Entity, EntityRef, Error, FieldValue, Identity,
    Property, Result, Row, Value, DISCRIMINATOR_COLUMN, ID_COLUMN,
};
use miniorm_query::{Expression, SelectOptions, CATALOG_TABLE};
use std::sync::Arc;

/// Translates between rows of one table and entities of one class.
pub struct DataMapper<'a> {
    unit_of_work: &'a UnitOfWork,
    identity: Arc<Identity>,
}

impl<'a> DataMapper<'a> {
    #[must_use]
    pub fn new(unit_of_work: &'a UnitOfWork, identity: Arc<Identity>) -> Self {
        Self {
            unit_of_work,
            identity,
        }
    }

    #[must_use]
    pub fn identity(&self) -> &Arc<Identity> {
        &self.identity
    }

    /// Count rows matching an optional filter.
    pub fn count(&self, filter: Option<&Expression>) -> Result<u64> {
        self.unit_of_work
            .executor()
            .count(self.identity.table_name(), filter)
    }

    /// Fetch at most one entity matching the filter.
    ///
    /// A matching clean entity already in the identity map is returned
    /// as-is; a row carrying a discriminator re-dispatches to the subclass
    /// mapper.
    pub fn find_single(&self, filter: &Expression) -> Result<Option<EntityRef>> {
        let table = self.identity.table_name();
        if self.unit_of_work.is_debug() {
            tracing::debug!(class = self.identity.class_name(), filter = %filter, "find_single");
        }
        let Some(row) = self
            .unit_of_work
            .executor()
            .select_one(table, &[], Some(filter))?
        else {
            return Ok(None);
        };

        let id = row
            .id()
            .ok_or_else(|| Error::value(format!("row from `{table}` carries no id")))?;

        if let Some(cached) = self
            .unit_of_work
            .get_cached(self.identity.class_name(), id)?
        {
            tracing::trace!(
                class = self.identity.class_name(),
                id,
                "identity map hit"
            );
            return Ok(Some(cached));
        }

        if let Some(sub_class) = row.discriminator() {
            let sub_class = sub_class.to_string();
            tracing::trace!(
                class = self.identity.class_name(),
                sub_class,
                id,
                "discriminator dispatch"
            );
            return self.unit_of_work.mapper(&sub_class)?.find_single(filter);
        }

        let entity = self.identity.new_instance();
        self.map_from_row(&entity, &row)?;
        self.load_base_class(&entity)?;
        Ok(Some(entity))
    }

    /// Fetch all entities matching the filter, honoring the select options.
    pub fn find_multiple(
        &self,
        filter: &Expression,
        options: &SelectOptions,
    ) -> Result<Vec<EntityRef>> {
        let table = self.identity.table_name();
        if self.unit_of_work.is_debug() {
            tracing::debug!(class = self.identity.class_name(), filter = %filter, "find_multiple");
        }
        let rows = self
            .unit_of_work
            .executor()
            .select_many(table, &[], Some(filter), options)?;

        let mut entities = Vec::with_capacity(rows.len());
        for row in rows {
            let id = row
                .id()
                .ok_or_else(|| Error::value(format!("row from `{table}` carries no id")))?;

            if let Some(cached) = self
                .unit_of_work
                .get_cached(self.identity.class_name(), id)?
            {
                entities.push(cached);
                continue;
            }

            if let Some(sub_class) = row.discriminator() {
                let mapper = self.unit_of_work.mapper(sub_class)?;
                if let Some(entity) = mapper.find_single(&Expression::eq(ID_COLUMN, id))? {
                    entities.push(entity);
                }
                continue;
            }

            let entity = self.identity.new_instance();
            self.map_from_row(&entity, &row)?;
            self.load_base_class(&entity)?;
            entities.push(entity);
        }

        Ok(entities)
    }

    /// Merge the base-class chain's own columns into an already-mapped
    /// entity, root first.
    ///
    /// Each non-concrete level re-queries its own table on the shared id; a
    /// missing row there is fatal, because subclass rows cannot exist
    /// without their base row.
    pub fn load_base_class(&self, entity: &EntityRef) -> Result<()> {
        if let Some(base) = self.identity.base_class() {
            self.unit_of_work
                .mapper(base.class_name())?
                .load_base_class(entity)?;
        }

        let (concrete_class, id) = {
            let guard = read_entity(entity);
            (guard.class_name(), guard.id())
        };

        if self.identity.class_name() == concrete_class {
            // The concrete level was already mapped from the original row.
            return Ok(());
        }

        let id = id.ok_or_else(|| Error::value("entity has no id during base-class load"))?;
        let table = self.identity.table_name();
        let row = self
            .unit_of_work
            .executor()
            .select_one(table, &[], Some(&Expression::eq(ID_COLUMN, id)))?
            .ok_or_else(|| {
                Error::not_found(table, format!("missing base-class row for id {id}"))
            })?;

        self.map_from_row(entity, &row)
    }

    /// Populate an entity from a row of this mapper's table.
    ///
    /// Sets the id, marks the entity clean, then walks the non-id
    /// properties in reverse declaration order: plain columns copy through
    /// the value transform, associations resolve through the target class's
    /// mapper.
    pub fn map_from_row(&self, entity: &EntityRef, row: &Row) -> Result<()> {
        let table = self.identity.table_name();
        let id = row
            .id()
            .ok_or_else(|| Error::value(format!("row from `{table}` carries no id")))?;

        self.identity
            .identifier()
            .set(&mut *write_entity(entity), FieldValue::Scalar(Value::Int(id)));
        self.unit_of_work.register_clean(entity)?;

        let properties: Vec<&Property> = self.identity.properties().collect();
        for property in properties.into_iter().rev() {
            if property.name() == ID_COLUMN {
                continue;
            }

            // Resolve the value first, then lock the entity only to write:
            // association loading recurses into other mappers and may land
            // back on this entity through the identity map.
            let value = match property.association() {
                None => {
                    let Some(column) = property.column_name() else {
                        continue;
                    };
                    FieldValue::Scalar(row.get(column).cloned().unwrap_or(Value::Null))
                }
                Some(association) => self.association_value(property, association, row, id)?,
            };

            property.set(&mut *write_entity(entity), value);
        }

        Ok(())
    }

    /// Resolve the in-memory value of one association property.
    fn association_value(
        &self,
        property: &Property,
        association: &Association,
        row: &Row,
        id: i64,
    ) -> Result<FieldValue> {
        let target_identity = self.unit_of_work.identity(association.target())?;
        let target_mapper = self.unit_of_work.mapper(association.target())?;

        match association {
            // Owning side: follow the foreign-key column; NULL means no
            // reference.
            Association::OneToOne {
                mapped_by: None, ..
            }
            | Association::ManyToOne { .. } => {
                let column = property.column_name().ok_or_else(|| {
                    Error::invalid_association(
                        self.identity.class_name(),
                        format!(
                            "owning association `{}` has no foreign-key column",
                            property.name()
                        ),
                    )
                })?;
                match row.get(column) {
                    None | Some(Value::Null) => Ok(FieldValue::Reference(None)),
                    Some(foreign_key) => Ok(FieldValue::Reference(target_mapper.find_single(
                        &Expression::condition(
                            ID_COLUMN,
                            miniorm_query::Comparison::Eq,
                            foreign_key.clone(),
                        ),
                    )?)),
                }
            }
            // Inverse side: query the target's mapped-by column against
            // this row's id.
            Association::OneToOne {
                mapped_by: Some(mapped_by),
                ..
            } => {
                let column = mapped_by_column(&target_identity, mapped_by)?;
                Ok(FieldValue::Reference(
                    target_mapper.find_single(&Expression::eq(column, id))?,
                ))
            }
            Association::OneToMany { mapped_by, .. } => {
                let column = mapped_by_column(&target_identity, mapped_by)?;
                Ok(FieldValue::Collection(target_mapper.find_multiple(
                    &Expression::eq(column, id),
                    &SelectOptions::default(),
                )?))
            }
        }
    }

    /// Serialize an entity into a row of this mapper's table.
    ///
    /// Emits the id when present, every non-null column-backed property,
    /// owning associations as the referenced entity's id, and the most
    /// specific matching subclass name as the discriminator when this class
    /// has registered subclasses.
    pub fn map_to_row(&self, entity: &EntityRef) -> Result<Row> {
        let guard = read_entity(entity);
        let mut row = Row::new();

        if let Some(id) = self
            .identity
            .identifier()
            .get(&*guard)
            .as_scalar()
            .filter(|v| !v.is_null())
        {
            row.set(ID_COLUMN, id.clone());
        }

        let properties: Vec<&Property> = self.identity.properties().collect();
        for property in properties.into_iter().rev() {
            if property.name() == ID_COLUMN {
                continue;
            }
            let Some(column) = property.column_name() else {
                continue;
            };

            let value = property.get(&*guard);
            if value.is_null() {
                continue;
            }

            match property.association() {
                Some(association) if association.is_owning() => {
                    if let Some(target) = value.as_reference() {
                        let target_id = if Arc::ptr_eq(target, entity) {
                            guard.id()
                        } else {
                            read_entity(target).id()
                        };
                        row.set(column, Value::from(target_id));
                    }
                }
                Some(_) => {}
                None => {
                    if let Some(scalar) = value.into_scalar() {
                        row.set(column, scalar);
                    }
                }
            }
        }

        if self.identity.has_sub_classes() {
            let concrete = self.unit_of_work.identity(guard.class_name())?;
            for sub_class in self.identity.sub_class_names() {
                if concrete.descends_from(&sub_class) {
                    row.set(DISCRIMINATOR_COLUMN, Value::Text(sub_class));
                }
            }
        }

        Ok(row)
    }

    /// Insert the entity's row, assigning the generated id back.
    pub fn insert(&self, entity: &EntityRef) -> Result<()> {
        let row = self.map_to_row(entity)?;
        let id = self
            .unit_of_work
            .executor()
            .insert(self.identity.table_name(), row)?;
        self.identity
            .identifier()
            .set(&mut *write_entity(entity), FieldValue::Scalar(Value::Int(id)));
        tracing::debug!(class = self.identity.class_name(), id, "inserted entity");
        Ok(())
    }

    /// Update the entity's row, filtered by id.
    pub fn update(&self, entity: &EntityRef) -> Result<()> {
        let id = read_entity(entity)
            .id()
            .ok_or_else(|| Error::value("cannot update an entity with no id"))?;
        let row = self.map_to_row(entity)?;
        tracing::debug!(class = self.identity.class_name(), id, "updating entity");
        self.unit_of_work.executor().update(
            self.identity.table_name(),
            row,
            Some(&Expression::eq(ID_COLUMN, id)),
        )
    }

    /// Delete the entity's row, filtered by id.
    pub fn delete(&self, entity: &EntityRef) -> Result<()> {
        let id = read_entity(entity)
            .id()
            .ok_or_else(|| Error::value("cannot delete an entity with no id"))?;
        tracing::debug!(class = self.identity.class_name(), id, "deleting entity");
        self.unit_of_work.executor().delete(
            self.identity.table_name(),
            Some(&Expression::eq(ID_COLUMN, id)),
        )
    }

    /// Read the next auto-increment value for the mapped table from catalog
    /// metadata. Fails when the table has no catalog entry.
    pub fn generate_id(&self) -> Result<i64> {
        let executor = self.unit_of_work.executor();
        let table = self.identity.table_name();
        let predicate = Expression::eq("table_schema", executor.database_name())
            .and(Expression::eq("table_name", table));

        let row = executor
            .select_one(CATALOG_TABLE, &["auto_increment"], Some(&predicate))?
            .ok_or_else(|| {
                Error::not_found(CATALOG_TABLE, format!("no catalog entry for `{table}`"))
            })?;

        row.get("auto_increment")
            .and_then(Value::as_int)
            .ok_or_else(|| Error::value(format!("catalog entry for `{table}` has no auto_increment")))
    }
}

fn mapped_by_column(target: &Identity, mapped_by: &str) -> Result<String> {
    let property = target
        .property(mapped_by)
        .ok_or_else(|| Error::unknown_property(target.class_name(), mapped_by))?;
    property
        .column_name()
        .map(str::to_string)
        .ok_or_else(|| {
            Error::invalid_association(
                target.class_name(),
                format!("mapped-by property `{mapped_by}` has no column"),
            )
        })
}
