//! reStructuredText rendering of a [`SchemaDump`].
//!
//! Rendering works from the dump value alone. The output sink is always an
//! explicit [`RstWriter`].

mod width;
mod writer;

use std::io::{self, Write};

pub use width::display_width;
pub use writer::{escape_trailing_underscores, Cell, RstWriter};

use crate::comment::FK_MARKER;
use crate::models::dump::{ColumnRecord, IndexRecord, SchemaDump, TableRecord};

/// Section underline characters, outermost first.
const SECTION_RULES: [char; 3] = ['=', '-', '^'];

fn subsection_rule(rule: char) -> char {
    SECTION_RULES
        .iter()
        .position(|r| *r == rule)
        .and_then(|i| SECTION_RULES.get(i + 1))
        .copied()
        .unwrap_or('~')
}

pub fn schema_title(dump: &SchemaDump) -> String {
    format!("Schema: {}", dump.name)
}

/// All-in-one document: the schema title followed by every table.
pub fn render_schema<W: Write>(writer: &mut RstWriter<W>, dump: &SchemaDump) -> io::Result<()> {
    writer.title(&schema_title(dump), SECTION_RULES[0])?;
    for table in &dump.tables {
        render_table(writer, &dump.name, table, SECTION_RULES[1])?;
    }
    Ok(())
}

/// Index document for one-file-per-table output.
pub fn render_index<W: Write>(writer: &mut RstWriter<W>, dump: &SchemaDump) -> io::Result<()> {
    writer.title(&schema_title(dump), SECTION_RULES[0])?;
    let items: Vec<String> = dump.tables.iter().map(|t| t.name.clone()).collect();
    writer.toctree(&items, &[":maxdepth: 1"])
}

/// One table section: header, column list-table and index listing.
pub fn render_table<W: Write>(
    writer: &mut RstWriter<W>,
    schema: &str,
    table: &TableRecord,
    rule: char,
) -> io::Result<()> {
    writer.header(schema, &table.name, &table.comment, rule)?;

    let header: Vec<Cell> = table.fields.iter().map(Cell::from).collect();
    writer.listtable(&header)?;

    for column in &table.columns {
        let row: Vec<Cell> = table
            .fields
            .iter()
            .map(|field| column_cell(column, field))
            .collect();
        writer.listtable_column(&row)?;
    }

    if !table.indexes.is_empty() {
        writer.title("Indexes", subsection_rule(rule))?;
        for index in &table.indexes {
            writer.list_item(&index_item(index))?;
        }
    }
    Ok(())
}

pub fn column_cell(column: &ColumnRecord, field: &str) -> Cell {
    match field {
        "nullable" => Cell::Bool(!column.nullable),
        "fkey" => match &column.fkey {
            Some(fkey) if fkey.contains(FK_MARKER) => Cell::Markup(foreign_key_links(fkey)),
            Some(fkey) => Cell::Text(fkey.clone()),
            None => Cell::Empty,
        },
        _ => column.get(field).map(Cell::from).unwrap_or(Cell::Empty),
    }
}

/// Anchor id docutils assigns to a table section.
pub fn table_anchor(table: &str) -> String {
    table.replace('_', "-")
}

/// Rewrite `FK: orders.id, users.id` into internal hyperlinks.
pub fn foreign_key_links(fkey: &str) -> String {
    let references = fkey
        .split_once(FK_MARKER)
        .map(|(_, rest)| rest)
        .unwrap_or(fkey);

    references
        .split(',')
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(|reference| match reference.split_once('.') {
            Some((table, _)) => format!("`{} <#{}>`_", reference, table_anchor(table)),
            None => escape_trailing_underscores(reference).into_owned(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn index_item(index: &IndexRecord) -> String {
    let kind = if index.unique { "UNIQUE KEY" } else { "KEY" };
    format!("{}: {} ({})", kind, index.name, index.column_names.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_foreign_key_links() {
        assert_eq!(
            foreign_key_links("FK: accounts.id"),
            "`accounts.id <#accounts>`_"
        );
        assert_eq!(
            foreign_key_links("FK: user_groups.id, teams.code"),
            "`user_groups.id <#user-groups>`_, `teams.code <#teams>`_"
        );
        assert_eq!(foreign_key_links("FK: legacy_"), "legacy\\_");
    }

    #[test]
    fn test_column_cell_negates_nullable() {
        let nullable = ColumnRecord::new("note", "text", true, false, None);
        let required = ColumnRecord::new("id", "int", false, true, None);

        assert_eq!(column_cell(&nullable, "nullable"), Cell::Bool(false));
        assert_eq!(column_cell(&required, "nullable"), Cell::Bool(true));
        assert_eq!(column_cell(&required, "pkey"), Cell::Bool(true));
    }

    #[test]
    fn test_column_cell_missing_fields_are_empty() {
        let mut column = ColumnRecord::new("weight", "float", true, false, None);
        column.merge_field("unit", json!("kg"));

        assert_eq!(column_cell(&column, "default"), Cell::Empty);
        assert_eq!(column_cell(&column, "description"), Cell::Empty);
        assert_eq!(column_cell(&column, "fkey"), Cell::Empty);
        assert_eq!(column_cell(&column, "max"), Cell::Empty);
        assert_eq!(column_cell(&column, "unit"), Cell::Text("kg".to_string()));
    }

    #[test]
    fn test_render_table_with_indexes() {
        let mut table = TableRecord::new("items_", "");
        table.columns.push(ColumnRecord::new(
            "id",
            "int(11)",
            false,
            true,
            Some("0".to_string()),
        ));
        table.indexes.push(IndexRecord {
            name: "idx_id".to_string(),
            unique: false,
            column_names: vec!["id".to_string(), "kind".to_string()],
        });

        let mut writer = RstWriter::new(Vec::new());
        render_table(&mut writer, "shop", &table, '=').unwrap();
        let text = String::from_utf8(writer.into_inner()).unwrap();

        assert_eq!(
            text,
            concat!(
                "\n.. _shop.items_:\n\nitems\\_\n=======\n\n",
                ".. list-table::\n   :header-rows: 1\n\n",
                "   * - name\n     - type\n     - nullable\n     - pkey\n     - default\n",
                "   * - id\n     - int(11)\n     - True\n     - True\n     - 0\n",
                "\nIndexes\n-------\n\n",
                "* KEY: idx_id (id, kind)\n",
            )
        );
    }

    #[test]
    fn test_render_index() {
        let dump = SchemaDump {
            name: "shop".to_string(),
            tables: vec![TableRecord::new("orders", ""), TableRecord::new("users", "")],
        };

        let mut writer = RstWriter::new(Vec::new());
        render_index(&mut writer, &dump).unwrap();
        let text = String::from_utf8(writer.into_inner()).unwrap();

        assert_eq!(
            text,
            "\nSchema: shop\n============\n\n.. toctree::\n   :maxdepth: 1\n\n   orders\n   users\n"
        );
    }

    #[test]
    fn test_subsection_rule() {
        assert_eq!(subsection_rule('='), '-');
        assert_eq!(subsection_rule('-'), '^');
        assert_eq!(subsection_rule('^'), '~');
    }
}
