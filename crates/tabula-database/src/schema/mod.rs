pub mod model;

pub use model::{ColumnModel, Modeling, TableModel};
