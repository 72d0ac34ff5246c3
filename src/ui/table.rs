use std::collections::BTreeMap;
use tabled::{settings::Style, Table, Tabled};

#[derive(Tabled)]
pub struct TableRow {
    #[tabled(rename = "Metric")]
    pub metric: String,
    #[tabled(rename = "Value")]
    pub value: String,
}

#[derive(Tabled)]
struct RenameRow {
    #[tabled(rename = "Class")]
    old: String,
    #[tabled(rename = "Renamed to")]
    new: String,
}

#[derive(Default)]
pub struct TableBuilder {
    rows: Vec<TableRow>,
}

impl TableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_row(&mut self, label: &str, value: impl ToString) {
        self.rows.push(TableRow {
            metric: label.to_string(),
            value: value.to_string(),
        });
    }

    pub fn build(&self) -> String {
        if self.rows.is_empty() {
            return String::new();
        }
        Table::new(&self.rows).with(Style::rounded()).to_string()
    }
}

pub fn stats_table(stats: &[(&str, String)]) -> String {
    let mut builder = TableBuilder::new();
    for (label, value) in stats {
        builder.add_row(label, value);
    }
    builder.build()
}

/// Old → new class names; entries that keep their name are left out
pub fn rename_table(mapped: &BTreeMap<String, String>) -> String {
    let rows: Vec<RenameRow> = mapped
        .iter()
        .filter(|(old, new)| old != new)
        .map(|(old, new)| RenameRow {
            old: old.clone(),
            new: new.clone(),
        })
        .collect();
    if rows.is_empty() {
        return String::new();
    }
    Table::new(&rows).with(Style::rounded()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_table_contains_rows() {
        let table = stats_table(&[("Classes", "12".to_string()), ("Libraries", "2".to_string())]);
        assert!(table.contains("Metric"));
        assert!(table.contains("Classes"));
        assert!(table.contains("12"));
        assert!(TableBuilder::new().build().is_empty());
    }

    #[test]
    fn test_rename_table_skips_unrenamed() {
        let mapped = BTreeMap::from([
            ("a/A".to_string(), "b/B".to_string()),
            ("a/Same".to_string(), "a/Same".to_string()),
        ]);
        let table = rename_table(&mapped);
        assert!(table.contains("b/B"));
        assert!(!table.contains("a/Same"));
        assert!(rename_table(&BTreeMap::new()).is_empty());
    }
}
