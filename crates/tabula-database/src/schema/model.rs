use core::fmt;

use typed_builder::TypedBuilder;

/// The tables declared while a database is being provisioned.
///
/// Table names are unique regardless of case. Declaring a name twice hands back the model
/// declared first.
#[derive(Debug, Default, Clone)]
pub struct Modeling {
    tables: Vec<TableModel>,
}

impl Modeling {
    /// Declare a table, or fetch the already declared table with the same name.
    pub fn declare_table(&mut self, name: &str) -> &mut TableModel {
        let idx = match self
            .tables
            .iter()
            .position(|table| table.name.eq_ignore_ascii_case(name))
        {
            Some(idx) => idx,
            None => {
                self.tables.push(TableModel::new(name));
                self.tables.len() - 1
            }
        };
        &mut self.tables[idx]
    }

    #[must_use]
    pub fn tables(&self) -> &[TableModel] {
        &self.tables
    }

    /// Every statement needed to materialize the declared tables, table by table.
    #[must_use]
    pub fn statements(&self, foreign_key_support: bool) -> Vec<String> {
        self.tables
            .iter()
            .flat_map(|table| table.statements(foreign_key_support))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, TypedBuilder)]
/// A single column of a declared table, rendered as `name type [definition]`.
///
/// * `name`: column name
/// * `data_type`: the engine's native type name, passed through verbatim
/// * `definition`: optional constraint suffix such as `not null`
pub struct ColumnModel {
    #[builder(setter(into))]
    pub name: String,

    #[builder(setter(into))]
    pub data_type: String,

    #[builder(default, setter(strip_option, into))]
    pub definition: Option<String>,
}

impl fmt::Display for ColumnModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.data_type)?;
        if let Some(definition) = &self.definition {
            write!(f, " {definition}")?;
        }
        Ok(())
    }
}

/// Statements emitted after `CREATE TABLE`, kept in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constraint {
    Index(Vec<String>),
    ForeignKey {
        column: String,
        ref_table: String,
        ref_column: String,
    },
}

/// In-memory description of a table to be created.
#[derive(Debug, Clone)]
pub struct TableModel {
    name: String,
    columns: Vec<ColumnModel>,
    primary_key: Option<String>,
    constraints: Vec<Constraint>,
}

impl TableModel {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            columns: Vec::new(),
            primary_key: None,
            constraints: Vec::new(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn columns(&self) -> &[ColumnModel] {
        &self.columns
    }

    #[must_use]
    pub fn primary_key(&self) -> Option<&str> {
        self.primary_key.as_deref()
    }

    #[must_use]
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// Add a column with no definition suffix.
    pub fn add_column(&mut self, name: &str, data_type: &str) -> &mut Self {
        self.add(ColumnModel::builder().name(name).data_type(data_type).build())
    }

    /// Add a column followed by a definition such as `not null default 0`.
    pub fn add_column_with(&mut self, name: &str, data_type: &str, definition: &str) -> &mut Self {
        self.add(
            ColumnModel::builder()
                .name(name)
                .data_type(data_type)
                .definition(definition)
                .build(),
        )
    }

    /// Add an auto incrementing integer primary key column.
    pub fn add_primary_key(&mut self, name: &str) -> &mut Self {
        if self.primary_key.is_none() && !self.contains(name) {
            self.primary_key = Some(name.to_string());
        }
        self.add_column_with(name, "INTEGER", "primary key autoincrement not null")
    }

    /// Add a column model. A column whose name is already declared (ignoring case) is dropped
    /// and the original declaration kept.
    pub fn add(&mut self, column: ColumnModel) -> &mut Self {
        if !self.contains(&column.name) {
            self.columns.push(column);
        }
        self
    }

    /// Index the given columns.
    pub fn add_index(&mut self, columns: &[&str]) -> &mut Self {
        if !columns.is_empty() {
            self.constraints.push(Constraint::Index(
                columns.iter().map(ToString::to_string).collect(),
            ));
        }
        self
    }

    /// Require values of `column` to exist in `ref_table.ref_column`.
    pub fn add_foreign_key(&mut self, column: &str, ref_table: &str, ref_column: &str) -> &mut Self {
        self.constraints.push(Constraint::ForeignKey {
            column: column.to_string(),
            ref_table: ref_table.to_string(),
            ref_column: ref_column.to_string(),
        });
        self
    }

    #[must_use]
    pub fn contains(&self, column: &str) -> bool {
        self.columns
            .iter()
            .any(|model| model.name.eq_ignore_ascii_case(column))
    }

    /// The `CREATE TABLE` statement for this table.
    #[must_use]
    pub fn to_sql(&self) -> String {
        format!(
            "CREATE TABLE {}({})",
            self.name,
            self.columns
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<String>>()
                .join(",")
        )
    }

    /// `CREATE TABLE` followed by index and foreign key statements in declaration order.
    ///
    /// Foreign keys become enforcement triggers and are only emitted with
    /// `foreign_key_support`.
    #[must_use]
    pub fn statements(&self, foreign_key_support: bool) -> Vec<String> {
        let mut statements = vec![self.to_sql()];
        for constraint in &self.constraints {
            match constraint {
                Constraint::Index(columns) => statements.push(format!(
                    "CREATE INDEX IF NOT EXISTS {}_{}_idx ON {}({})",
                    self.name,
                    columns.join("_"),
                    self.name,
                    columns.join(",")
                )),
                Constraint::ForeignKey {
                    column,
                    ref_table,
                    ref_column,
                } if foreign_key_support => {
                    statements.push(self.foreign_key_trigger("insert", "INSERT", column, ref_table, ref_column));
                    statements.push(self.foreign_key_trigger(
                        "update",
                        &format!("UPDATE OF {column}"),
                        column,
                        ref_table,
                        ref_column,
                    ));
                }
                Constraint::ForeignKey { .. } => {}
            }
        }
        statements
    }

    fn foreign_key_trigger(
        &self,
        suffix: &str,
        event: &str,
        column: &str,
        ref_table: &str,
        ref_column: &str,
    ) -> String {
        let table = &self.name;
        format!(
            concat!(
                "CREATE TRIGGER IF NOT EXISTS {table}_{column}_fk_{suffix} ",
                "BEFORE {event} ON {table} FOR EACH ROW ",
                "WHEN NEW.{column} IS NOT NULL AND ",
                "(SELECT {ref_column} FROM {ref_table} WHERE {ref_column} = NEW.{column}) IS NULL ",
                "BEGIN SELECT RAISE(ABORT, 'foreign key constraint failed: {table}.{column}'); END"
            ),
            table = table,
            column = column,
            suffix = suffix,
            event = event,
            ref_table = ref_table,
            ref_column = ref_column,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use insta::assert_snapshot;

    fn orders() -> Modeling {
        let mut modeling = Modeling::default();
        modeling
            .declare_table("Orders")
            .add_primary_key("Id")
            .add_column("Quantity", "Integer")
            .add_column("CustomerId", "Integer")
            .add_index(&["CustomerId"])
            .add_foreign_key("CustomerId", "Customers", "Id");
        modeling
    }

    #[test]
    fn test_create_table() {
        let modeling = orders();
        assert_snapshot!(
            modeling.tables()[0].to_sql(),
            @"CREATE TABLE Orders(Id INTEGER primary key autoincrement not null,Quantity Integer,CustomerId Integer)"
        );
        assert_eq!(modeling.tables()[0].primary_key(), Some("Id"));
    }

    #[test]
    fn test_duplicate_column_is_noop() {
        let mut modeling = Modeling::default();
        let table = modeling
            .declare_table("Customers")
            .add_column("Name", "text")
            .add_column_with("NAME", "blob", "not null");

        assert_eq!(table.columns().len(), 1);
        assert_eq!(table.columns()[0].to_string(), "Name text");
    }

    #[test]
    fn test_redeclare_table_returns_existing() {
        let mut modeling = Modeling::default();
        modeling.declare_table("Customers").add_column("Name", "text");
        modeling.declare_table("customers").add_column("Address", "text");

        assert_eq!(modeling.tables().len(), 1);
        assert_eq!(modeling.tables()[0].columns().len(), 2);
    }

    #[test]
    fn test_statements_in_declaration_order() {
        let statements = orders().statements(true);
        assert_eq!(statements.len(), 4);
        assert!(statements[0].starts_with("CREATE TABLE Orders("));
        assert_snapshot!(
            statements[1],
            @"CREATE INDEX IF NOT EXISTS Orders_CustomerId_idx ON Orders(CustomerId)"
        );
        assert!(statements[2].starts_with("CREATE TRIGGER IF NOT EXISTS Orders_CustomerId_fk_insert BEFORE INSERT ON Orders"));
        assert!(statements[3].contains("BEFORE UPDATE OF CustomerId ON Orders"));
    }

    #[test]
    fn test_foreign_keys_need_support() {
        let statements = orders().statements(false);
        assert_eq!(statements.len(), 2);
        assert!(statements.iter().all(|sql| !sql.contains("TRIGGER")));
    }

    #[test]
    fn test_multi_column_index() {
        let mut modeling = Modeling::default();
        modeling
            .declare_table("Products")
            .add_column("Name", "text")
            .add_column("Price", "INTEGER")
            .add_index(&["Name", "Price"])
            .add_index(&[]);

        assert_eq!(
            modeling.statements(false)[1..],
            ["CREATE INDEX IF NOT EXISTS Products_Name_Price_idx ON Products(Name,Price)".to_string()]
        );
    }
}
