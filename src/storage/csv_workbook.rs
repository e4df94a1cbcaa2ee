//! A workbook persisted as a directory of CSV files, one per sheet.
//!
//! `inbox.csv` holds only the input block and is anchored at `B10`; the other
//! sheets are anchored at `A1` and keep their header row. Cell styling and
//! document properties travel in `styles.csv` and `properties.csv`. A sheet
//! whose file is read-only on disk is loaded as a protected sheet.

use csv::{ReaderBuilder, WriterBuilder};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::storage::layout::inbox;
use crate::storage::{CellStyle, Grid, Properties, Sheet, StorageError, Workbook};
use crate::types::{Cell, ColumnNumber, RowNumber};

const STYLES_FILE: &str = "styles.csv";
const PROPERTIES_FILE: &str = "properties.csv";

#[derive(Debug, Serialize, Deserialize)]
struct StyleRecord {
    sheet: Sheet,
    row: RowNumber,
    column: ColumnNumber,
    background: Option<String>,
    font_color: Option<String>,
    note: String,
    strike_through: bool
}

#[derive(Debug, Serialize, Deserialize)]
struct PropertyRecord {
    key: String,
    value: String
}

/// Loads every sheet file found in `directory`; missing files are empty sheets.
pub fn load(directory: &Path) -> Result<Workbook, StorageError> {
    let workbook = Workbook::new();
    let mut read_only = Vec::new();

    for sheet in Sheet::ALL {
        let path = directory.join(file_name(sheet));

        if !path.exists() {
            debug!("No file for sheet [{sheet}] at {}", path.display());
            continue;
        }

        let rows = read_rows(&path)?;
        let (row, column) = origin(sheet);
        workbook.write_region(sheet, row, column, &rows)?;

        if fs::metadata(&path)?.permissions().readonly() {
            debug!("Sheet [{sheet}] is read-only on disk");
            read_only.push(sheet);
        }
    }

    let styles_path = directory.join(STYLES_FILE);

    if styles_path.exists() {
        let mut reader = ReaderBuilder::new().from_path(&styles_path)?;

        for record in reader.deserialize::<StyleRecord>() {
            let record = record?;
            let style = CellStyle {
                background: record.background,
                font_color: record.font_color,
                note: record.note,
                strike_through: record.strike_through
            };
            workbook.write_styles(record.sheet, record.row, record.column, &[vec![style]])?;
        }
    }

    let properties_path = directory.join(PROPERTIES_FILE);

    if properties_path.exists() {
        let mut reader = ReaderBuilder::new().from_path(&properties_path)?;

        for record in reader.deserialize::<PropertyRecord>() {
            let record = record?;
            workbook.set(&record.key, &record.value)?;
        }
    }

    // Protection goes on last so saved styles still load onto read-only sheets.
    for sheet in read_only {
        workbook.protect(sheet);
    }

    Ok(workbook)
}

/// Writes every sheet back to `directory`, replacing the files it finds there.
pub fn save(workbook: &Workbook, directory: &Path) -> Result<(), StorageError> {
    fs::create_dir_all(directory)?;

    for sheet in Sheet::ALL {
        let (first_row, first_column) = origin(sheet);
        let (last_row, last_column) = match sheet {
            Sheet::Inbox => (inbox::FIRST_ROW + inbox::HEIGHT - 1, inbox::FIRST_COLUMN + inbox::WIDTH - 1),
            _ => (workbook.last_row(sheet), workbook.last_column(sheet))
        };

        let path = directory.join(file_name(sheet));

        if workbook.is_protected(sheet) || (last_row < first_row && !path.exists()) {
            continue;
        }

        let mut writer = WriterBuilder::new().flexible(true).from_path(&path)?;

        for row in first_row..=last_row {
            let record: Vec<String> = (first_column..=last_column)
                .map(|column| workbook.cell(sheet, row, column).to_string())
                .collect();
            writer.write_record(&record)?;
        }

        writer.flush()?;
    }

    let mut writer = WriterBuilder::new().from_path(directory.join(STYLES_FILE))?;

    for (sheet, row, column, style) in workbook.styled_cells() {
        writer.serialize(StyleRecord {
            sheet,
            row,
            column,
            background: style.background,
            font_color: style.font_color,
            note: style.note,
            strike_through: style.strike_through
        })?;
    }

    writer.flush()?;

    let mut writer = WriterBuilder::new().from_path(directory.join(PROPERTIES_FILE))?;

    for (key, value) in workbook.properties() {
        writer.serialize(PropertyRecord { key, value })?;
    }

    writer.flush()?;

    Ok(())
}

fn file_name(sheet: Sheet) -> String {
    format!("{sheet}.csv")
}

fn origin(sheet: Sheet) -> (RowNumber, ColumnNumber) {
    match sheet {
        Sheet::Inbox => (inbox::FIRST_ROW, inbox::FIRST_COLUMN),
        _ => (1, 1)
    }
}

fn read_rows(path: &Path) -> Result<Vec<Vec<Cell>>, StorageError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;

    let mut rows = Vec::new();

    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(Cell::parse).collect());
    }

    Ok(rows)
}
