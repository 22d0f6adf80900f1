//! Binding application records to table rows.
//!
//! A record implements [`Entity`] and registers a [`Field`] for each column it cares about.
//! The same bindings feed both directions: row cells are written into the fields on reads,
//! and field values are collected into column values on writes.

pub mod field;
pub mod mapper;

pub use field::{Field, FieldValue};
pub use mapper::{EntityMapper, entity_values, map_row, reconcile};

/// An application record stored in a table and identified by its primary key.
pub trait Entity {
    /// The primary key, 0 or below for records that were never inserted.
    fn id(&self) -> i64;

    fn set_id(&mut self, id: i64);

    /// Register the column bindings of this record with `mapper`.
    ///
    /// ```
    /// use tabula_database::entity::{Entity, EntityMapper};
    ///
    /// #[derive(Default)]
    /// struct Product {
    ///     id: i64,
    ///     name: String,
    ///     price: f64,
    /// }
    ///
    /// impl Entity for Product {
    ///     fn id(&self) -> i64 {
    ///         self.id
    ///     }
    ///
    ///     fn set_id(&mut self, id: i64) {
    ///         self.id = id;
    ///     }
    ///
    ///     fn map<'a>(&'a mut self, mapper: &mut EntityMapper<'a>) {
    ///         mapper
    ///             .bind("Id", &mut self.id)
    ///             .bind("Name", &mut self.name)
    ///             .bind("Price", &mut self.price);
    ///     }
    /// }
    /// ```
    fn map<'a>(&'a mut self, mapper: &mut EntityMapper<'a>);
}

/// An existing collection of records that query results are reconciled into.
pub trait EntityList {
    type Entity: Entity;

    fn entities(&mut self) -> &mut Vec<Self::Entity>;

    /// Create the record for a row whose primary key is not in the collection yet.
    fn new_entity(&mut self) -> Self::Entity;
}

impl<E: Entity + Default> EntityList for Vec<E> {
    type Entity = E;

    fn entities(&mut self) -> &mut Vec<E> {
        self
    }

    fn new_entity(&mut self) -> E {
        E::default()
    }
}

/// A collection that builds new records with a caller supplied factory.
pub struct EntityCollection<E, F> {
    pub entities: Vec<E>,
    factory: F,
}

impl<E, F> EntityCollection<E, F>
where
    E: Entity,
    F: FnMut() -> E,
{
    pub fn new(factory: F) -> Self {
        Self {
            entities: Vec::new(),
            factory,
        }
    }

    pub fn with_entities(entities: Vec<E>, factory: F) -> Self {
        Self { entities, factory }
    }
}

impl<E, F> EntityList for EntityCollection<E, F>
where
    E: Entity,
    F: FnMut() -> E,
{
    type Entity = E;

    fn entities(&mut self) -> &mut Vec<E> {
        &mut self.entities
    }

    fn new_entity(&mut self) -> E {
        (self.factory)()
    }
}
