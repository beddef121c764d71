use super::model::Table;
use crate::error::{AnalysisError, Result};

// ---------------------------------------------------------------------------
// Column selection: which columns of the active table the user picked
// ---------------------------------------------------------------------------

/// An ordered set of column names drawn from one table.
///
/// Every name is checked against the table on construction. An empty
/// selection is valid; callers check [`ColumnSelection::is_empty`] before
/// doing any work with it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnSelection {
    names: Vec<String>,
}

impl ColumnSelection {
    pub fn new<I, S>(table: &Table, names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut selected: Vec<String> = Vec::new();
        for name in names {
            let name = name.into();
            if table.column(&name).is_none() {
                return Err(AnalysisError::validation(format!(
                    "Column '{name}' is not in the table"
                )));
            }
            if !selected.contains(&name) {
                selected.push(name);
            }
        }
        Ok(ColumnSelection { names: selected })
    }

    /// Every column of the table, in table order.
    pub fn all(table: &Table) -> Self {
        ColumnSelection {
            names: table.column_names(),
        }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Toggle one name in or out, keeping table order for re-added columns.
    pub fn toggle(&mut self, table: &Table, name: &str) {
        if self.contains(name) {
            self.names.retain(|n| n != name);
        } else if table.column(name).is_some() {
            self.names.push(name.to_string());
            let order = table.column_names();
            self.names
                .sort_by_key(|n| order.iter().position(|o| o == n).unwrap_or(usize::MAX));
        }
    }

    /// Project the selected columns into a new table.
    pub fn apply(&self, table: &Table) -> Result<Table> {
        table.project(&self.names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::Column;

    fn table() -> Table {
        Table::new(vec![
            Column::numeric("a", vec![Some(1.0), Some(2.0)]),
            Column::numeric("b", vec![Some(3.0), Some(4.0)]),
            Column::text("c", vec![Some("x".into()), None]),
        ])
        .unwrap()
    }

    #[test]
    fn unknown_names_are_rejected() {
        let err = ColumnSelection::new(&table(), ["a", "missing"]).unwrap_err();
        assert_eq!(
            err,
            AnalysisError::Validation("Column 'missing' is not in the table".into())
        );
    }

    #[test]
    fn empty_selection_is_inert() {
        let t = table();
        let sel = ColumnSelection::new(&t, Vec::<String>::new()).unwrap();
        assert!(sel.is_empty());
        let projected = sel.apply(&t).unwrap();
        assert_eq!(projected.column_count(), 0);
        assert!(projected.is_empty());
    }

    #[test]
    fn toggle_restores_table_order() {
        let t = table();
        let mut sel = ColumnSelection::all(&t);
        sel.toggle(&t, "a");
        assert_eq!(sel.names(), &["b".to_string(), "c".to_string()]);
        sel.toggle(&t, "a");
        assert_eq!(sel.names(), ColumnSelection::all(&t).names());
    }
}
