//! List output: bordered tables, TSV and id-only listings

use chrono::{DateTime, Utc};
use console::style;
use tabled::builder::Builder;
use tabled::settings::Style;

use crate::cli::helpers::{format_date, format_money, format_opt_date};
use crate::cli::OutputFormat;
use crate::core::identity::EntityId;
use crate::core::shortid::ShortIdIndex;

/// One listed record
#[derive(Debug, Clone)]
pub struct TableRow {
    id: EntityId,
    short_id: String,
    cells: Vec<String>,
}

impl TableRow {
    /// Start a row, giving the record a short id if it has none yet
    pub fn new(id: EntityId, short_ids: &mut ShortIdIndex) -> Self {
        let short_id = short_ids.add(id);
        Self {
            id,
            short_id,
            cells: Vec::new(),
        }
    }

    pub fn cell(mut self, value: impl Into<String>) -> Self {
        self.cells.push(value.into());
        self
    }

    pub fn date(self, value: DateTime<Utc>) -> Self {
        self.cell(format_date(value))
    }

    pub fn opt_date(self, value: Option<DateTime<Utc>>) -> Self {
        self.cell(format_opt_date(value))
    }

    pub fn money(self, value: f64) -> Self {
        self.cell(format_money(value))
    }
}

/// Renders rows under a fixed set of column headers
pub struct TableFormatter {
    headers: &'static [&'static str],
    entity_name: &'static str,
}

impl TableFormatter {
    pub const fn new(headers: &'static [&'static str], entity_name: &'static str) -> Self {
        Self {
            headers,
            entity_name,
        }
    }

    /// Render rows in a list format; JSON and YAML are handled by the caller
    pub fn render(&self, rows: &[TableRow], format: OutputFormat) -> String {
        match format {
            OutputFormat::Id => rows.iter().map(|r| format!("{}\n", r.id)).collect(),
            OutputFormat::ShortId => rows.iter().map(|r| format!("{}\n", r.short_id)).collect(),
            OutputFormat::Tsv => {
                let mut out = String::new();
                out.push_str("SHORT\tID\t");
                out.push_str(&self.headers.join("\t"));
                out.push('\n');
                for row in rows {
                    out.push_str(&format!("{}\t{}\t{}\n", row.short_id, row.id, row.cells.join("\t")));
                }
                out
            }
            _ => {
                let mut builder = Builder::default();
                builder.push_record(std::iter::once("SHORT").chain(self.headers.iter().copied()));
                for row in rows {
                    builder.push_record(
                        std::iter::once(row.short_id.clone()).chain(row.cells.iter().cloned()),
                    );
                }
                let mut table = builder.build();
                table.with(Style::rounded());
                format!("{}\n", table)
            }
        }
    }

    pub fn output(&self, rows: Vec<TableRow>, format: OutputFormat) {
        print!("{}", self.render(&rows, format));
        if matches!(format, OutputFormat::Table | OutputFormat::Auto) {
            let noun = if rows.len() == 1 { "" } else { "s" };
            println!(
                "{}",
                style(format!("{} {}{}", rows.len(), self.entity_name, noun)).dim()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::identity::EntityPrefix;

    const COLUMNS: &[&str] = &["NAME", "VALUE"];

    fn rows(short_ids: &mut ShortIdIndex) -> Vec<TableRow> {
        vec![
            TableRow::new(EntityId::new(EntityPrefix::Mat), short_ids)
                .cell("Drill")
                .money(120.0),
            TableRow::new(EntityId::new(EntityPrefix::Mat), short_ids)
                .cell("Ladder")
                .money(45.5),
        ]
    }

    #[test]
    fn test_tsv_output() {
        let mut short_ids = ShortIdIndex::new();
        let rows = rows(&mut short_ids);
        let out = TableFormatter::new(COLUMNS, "item").render(&rows, OutputFormat::Tsv);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "SHORT\tID\tNAME\tVALUE");
        assert!(lines[1].starts_with("MAT@1\tMAT-"));
        assert!(lines[2].ends_with("Ladder\t45.50"));
    }

    #[test]
    fn test_table_output_has_headers_and_cells() {
        let mut short_ids = ShortIdIndex::new();
        let rows = rows(&mut short_ids);
        let out = TableFormatter::new(COLUMNS, "item").render(&rows, OutputFormat::Table);
        assert!(out.contains("SHORT"));
        assert!(out.contains("NAME"));
        assert!(out.contains("MAT@2"));
        assert!(out.contains("120.00"));
        assert!(out.contains('╭'));
    }

    #[test]
    fn test_id_outputs() {
        let mut short_ids = ShortIdIndex::new();
        let rows = rows(&mut short_ids);
        let formatter = TableFormatter::new(COLUMNS, "item");
        assert_eq!(formatter.render(&rows, OutputFormat::ShortId), "MAT@1\nMAT@2\n");
        let ids = formatter.render(&rows, OutputFormat::Id);
        assert_eq!(ids.lines().count(), 2);
        assert!(ids.lines().all(|l| l.starts_with("MAT-")));
    }
}
