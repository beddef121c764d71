/// Data layer: core types, loading, and column selection.
///
/// Architecture:
/// ```text
///  .xlsx / .ods / .parquet / .json / .csv
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse bytes → raw cells → Table (kinds inferred)
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  Table    │  immutable, named, typed columns
///   └──────────┘
///        │
///        ▼
///   ┌───────────┐
///   │ selection  │  validated column subsets → new Table
///   └───────────┘
/// ```

pub mod loader;
pub mod model;
pub mod selection;

pub use model::{CellValue, Column, ColumnData, ColumnKind, Table};
pub use selection::ColumnSelection;
