use log::debug;

use super::{Entity, EntityList, Field};
use crate::database::DatabaseError;
use crate::database::engine::RowSet;
use crate::database::value::Value;

/// Column name to field bindings registered by one [`Entity`] for one mapping pass.
///
/// Column names are matched ignoring case. Binding a column twice keeps the latest field.
#[derive(Default)]
pub struct EntityMapper<'a> {
    bindings: Vec<(String, &'a mut dyn Field)>,
}

impl<'a> EntityMapper<'a> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `column` to `field`.
    pub fn bind(&mut self, column: &str, field: &'a mut dyn Field) -> &mut Self {
        match self
            .bindings
            .iter()
            .position(|(name, _)| name.eq_ignore_ascii_case(column))
        {
            Some(idx) => self.bindings[idx].1 = field,
            None => self.bindings.push((column.to_string(), field)),
        }
        self
    }

    /// Names of the bound columns in binding order.
    #[must_use]
    pub fn columns(&self) -> Vec<&str> {
        self.bindings.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Current value of every bound field, keyed by column.
    #[must_use]
    pub fn values(&self) -> Vec<(String, Value)> {
        self.bindings
            .iter()
            .map(|(name, field)| (name.clone(), field.to_value()))
            .collect()
    }

    /// Write the cells of the current row into the bound fields.
    ///
    /// Cells without a binding are skipped, and bound fields without a cell keep their value.
    ///
    /// # Errors
    /// Will return `Err` if a cell cannot be coerced into its field.
    pub fn apply(&mut self, rows: &RowSet) -> Result<(), DatabaseError> {
        for ordinal in 0..rows.column_count() {
            let (Some(column), Some(value)) = (rows.column_name(ordinal), rows.get(ordinal)) else {
                continue;
            };
            let Some((name, field)) = self
                .bindings
                .iter_mut()
                .find(|(name, _)| name.eq_ignore_ascii_case(column))
            else {
                continue;
            };

            field
                .set_value(value)
                .map_err(|expected| DatabaseError::TypeMismatch {
                    column: name.clone(),
                    expected,
                    found: value.kind(),
                })?;
        }
        Ok(())
    }
}

/// Map the current row of `rows` onto `entity`.
///
/// # Errors
/// Will return `Err` if a cell cannot be coerced into its field.
pub fn map_row<E: Entity + ?Sized>(rows: &RowSet, entity: &mut E) -> Result<(), DatabaseError> {
    let mut mapper = EntityMapper::new();
    entity.map(&mut mapper);
    mapper.apply(rows)
}

/// The bound column values of `entity`, without its primary key column.
pub fn entity_values<E: Entity + ?Sized>(entity: &mut E, id_column: &str) -> Vec<(String, Value)> {
    let mut mapper = EntityMapper::new();
    entity.map(&mut mapper);
    mapper
        .values()
        .into_iter()
        .filter(|(column, _)| !column.eq_ignore_ascii_case(id_column))
        .collect()
}

/// Reconcile every row of `rows` with the records already in `list`.
///
/// A row whose primary key matches a record updates that record in place. Any other row
/// becomes a new record appended to the list. Records are never removed or replaced, so
/// the ones a caller already holds stay the same objects.
///
/// Each row scans the whole list.
///
/// # Errors
/// Will return `Err` if a primary key or any other cell cannot be coerced.
pub fn reconcile<L: EntityList + ?Sized>(
    mut rows: RowSet,
    list: &mut L,
    id_column: &str,
) -> Result<(), DatabaseError> {
    let id_ordinal = rows.column_index(id_column);
    let (mut updated, mut appended) = (0_usize, 0_usize);

    while rows.advance() {
        let id = match id_ordinal {
            Some(ordinal) => Some(rows.get_i64(ordinal)?),
            None => None,
        };

        let existing = id.and_then(|id| list.entities().iter().position(|entity| entity.id() == id));
        let idx = if let Some(idx) = existing {
            updated += 1;
            idx
        } else {
            let entity = list.new_entity();
            let entities = list.entities();
            entities.push(entity);
            appended += 1;
            entities.len() - 1
        };

        map_row(&rows, &mut list.entities()[idx])?;
    }

    debug!("reconciled rows: {updated} updated, {appended} appended");
    Ok(())
}
