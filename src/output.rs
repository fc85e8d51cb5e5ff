//! Writing rendered documents to files or streams.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use log::info;

use crate::errors::DbError;
use crate::models::dump::SchemaDump;
use crate::render::{render_index, render_schema, render_table, RstWriter};

/// Render the all-in-one document into `sink`.
pub fn write_document<W: Write>(dump: &SchemaDump, sink: W) -> Result<(), DbError> {
    let mut writer = RstWriter::new(sink);
    render_schema(&mut writer, dump)?;
    writer.flush()?;
    Ok(())
}

/// Write `index.rst` plus one `{table}.rst` per table into `dir`.
///
/// Each file is flushed and closed before the next one is created.
pub fn write_split(dump: &SchemaDump, dir: &Path) -> Result<(), DbError> {
    fs::create_dir_all(dir)?;

    let index_path = dir.join("index.rst");
    let mut index = RstWriter::new(BufWriter::new(File::create(&index_path)?));
    render_index(&mut index, dump)?;
    index.flush()?;
    drop(index);
    info!("wrote {}", index_path.display());

    for table in &dump.tables {
        let path = dir.join(format!("{}.rst", table.name));
        let mut writer = RstWriter::new(BufWriter::new(File::create(&path)?));
        render_table(&mut writer, &dump.name, table, '=')?;
        writer.flush()?;
        info!("wrote {}", path.display());
    }
    Ok(())
}
