use dashmap::{DashMap, DashSet};

use crate::storage::{CellStyle, Grid, Properties, Region, Sheet, StorageError};
use crate::types::{Cell, ColumnNumber, RowNumber};

type CellAddress = (Sheet, RowNumber, ColumnNumber);

/// In-memory workbook holding every sheet of a run.
///
/// Only non-empty values are stored, so reading outside the written area
/// yields empty cells the way a spreadsheet does.
pub struct Workbook {
    cells: DashMap<CellAddress, Cell>,
    formulas: DashMap<CellAddress, String>,
    styles: DashMap<CellAddress, CellStyle>,
    filters: DashSet<Sheet>,
    protected: DashSet<Sheet>,
    properties: DashMap<String, String>
}

impl Workbook {
    pub fn new() -> Self {
        Self {
            cells: DashMap::new(),
            formulas: DashMap::new(),
            styles: DashMap::new(),
            filters: DashSet::new(),
            protected: DashSet::new(),
            properties: DashMap::new()
        }
    }

    pub fn cell(&self, sheet: Sheet, row: RowNumber, column: ColumnNumber) -> Cell {
        self.cells.get(&(sheet, row, column))
            .map(|cell| cell.value().clone())
            .unwrap_or_default()
    }

    pub fn style(&self, sheet: Sheet, row: RowNumber, column: ColumnNumber) -> CellStyle {
        self.styles.get(&(sheet, row, column))
            .map(|style| style.value().clone())
            .unwrap_or_default()
    }

    /// Stores a formula together with the value it currently evaluates to.
    #[cfg(test)]
    pub fn set_formula(&self, sheet: Sheet, row: RowNumber, column: ColumnNumber, formula: &str, value: Cell) {
        self.store(sheet, row, column, value);
        self.formulas.insert((sheet, row, column), formula.to_string());
    }

    /// Makes every subsequent edit of `sheet` fail with [`StorageError::Protected`].
    pub fn protect(&self, sheet: Sheet) {
        self.protected.insert(sheet);
    }

    pub fn is_protected(&self, sheet: Sheet) -> bool {
        self.protected.contains(&sheet)
    }

    #[cfg(test)]
    pub fn set_filter(&self, sheet: Sheet) {
        self.filters.insert(sheet);
    }

    #[cfg(test)]
    pub fn has_filter(&self, sheet: Sheet) -> bool {
        self.filters.contains(&sheet)
    }

    /// Rightmost column holding any value on the sheet, 0 when the sheet is empty.
    pub fn last_column(&self, sheet: Sheet) -> ColumnNumber {
        self.cells.iter()
            .filter(|item| item.key().0 == sheet)
            .map(|item| item.key().2)
            .max()
            .unwrap_or(0)
    }

    /// Every styled cell, ordered by sheet then position.
    pub fn styled_cells(&self) -> Vec<(Sheet, RowNumber, ColumnNumber, CellStyle)> {
        let mut styled: Vec<_> = self.styles.iter()
            .map(|item| {
                let (sheet, row, column) = *item.key();
                (sheet, row, column, item.value().clone())
            })
            .collect();

        styled.sort_by_key(|(sheet, row, column, _)| (*sheet, *row, *column));
        styled
    }

    /// Every property, ordered by key.
    pub fn properties(&self) -> Vec<(String, String)> {
        let mut properties: Vec<_> = self.properties.iter()
            .map(|item| (item.key().clone(), item.value().clone()))
            .collect();

        properties.sort();
        properties
    }

    fn store(&self, sheet: Sheet, row: RowNumber, column: ColumnNumber, value: Cell) {
        let address = (sheet, row, column);
        self.formulas.remove(&address);

        if value == Cell::Empty {
            self.cells.remove(&address);
        } else {
            self.cells.insert(address, value);
        }
    }

    fn check_writable(&self, sheet: Sheet, row: RowNumber, column: ColumnNumber) -> Result<(), StorageError> {
        check_address(sheet, row, column)?;

        if self.is_protected(sheet) {
            return Err(StorageError::Protected(sheet));
        }

        Ok(())
    }
}

impl Default for Workbook {
    fn default() -> Self {
        Self::new()
    }
}

impl Grid for Workbook {
    fn last_row(&self, sheet: Sheet) -> RowNumber {
        self.cells.iter()
            .filter(|item| item.key().0 == sheet)
            .map(|item| item.key().1)
            .max()
            .unwrap_or(0)
    }

    fn read_region(&self, sheet: Sheet, region: Region) -> Result<Vec<Vec<Cell>>, StorageError> {
        check_address(sheet, region.row, region.column)?;

        Ok(collect_region(region, |row, column| self.cell(sheet, row, column)))
    }

    fn read_formulas(&self, sheet: Sheet, region: Region) -> Result<Vec<Vec<String>>, StorageError> {
        check_address(sheet, region.row, region.column)?;

        Ok(collect_region(region, |row, column| {
            self.formulas.get(&(sheet, row, column))
                .map(|formula| formula.value().clone())
                .unwrap_or_default()
        }))
    }

    fn write_region(&self, sheet: Sheet, row: RowNumber, column: ColumnNumber, values: &[Vec<Cell>]) -> Result<(), StorageError> {
        self.check_writable(sheet, row, column)?;

        for (row_offset, cells) in values.iter().enumerate() {
            for (column_offset, value) in cells.iter().enumerate() {
                self.store(sheet, row + row_offset, column + column_offset, value.clone());
            }
        }

        Ok(())
    }

    fn clear_region(&self, sheet: Sheet, region: Region) -> Result<(), StorageError> {
        self.check_writable(sheet, region.row, region.column)?;

        for row in region.row..region.row + region.height {
            for column in region.column..region.column + region.width {
                self.store(sheet, row, column, Cell::Empty);
            }
        }

        Ok(())
    }

    fn read_styles(&self, sheet: Sheet, region: Region) -> Result<Vec<Vec<CellStyle>>, StorageError> {
        check_address(sheet, region.row, region.column)?;

        Ok(collect_region(region, |row, column| self.style(sheet, row, column)))
    }

    fn write_styles(&self, sheet: Sheet, row: RowNumber, column: ColumnNumber, styles: &[Vec<CellStyle>]) -> Result<(), StorageError> {
        self.check_writable(sheet, row, column)?;

        for (row_offset, line) in styles.iter().enumerate() {
            for (column_offset, style) in line.iter().enumerate() {
                let address = (sheet, row + row_offset, column + column_offset);

                if *style == CellStyle::default() {
                    self.styles.remove(&address);
                } else {
                    self.styles.insert(address, style.clone());
                }
            }
        }

        Ok(())
    }

    fn set_strike_through(&self, sheet: Sheet, region: Region) -> Result<(), StorageError> {
        self.check_writable(sheet, region.row, region.column)?;

        for row in region.row..region.row + region.height {
            for column in region.column..region.column + region.width {
                self.styles.entry((sheet, row, column)).or_default().strike_through = true;
            }
        }

        Ok(())
    }

    fn remove_filter(&self, sheet: Sheet) -> Result<(), StorageError> {
        self.filters.remove(&sheet);
        Ok(())
    }
}

impl Properties for Workbook {
    fn get(&self, key: &str) -> Option<String> {
        self.properties.get(key).map(|value| value.value().clone())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.properties.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

fn check_address(sheet: Sheet, row: RowNumber, column: ColumnNumber) -> Result<(), StorageError> {
    if row == 0 || column == 0 {
        return Err(StorageError::InvalidRegion { sheet, row, column });
    }

    Ok(())
}

fn collect_region<T>(region: Region, mut read: impl FnMut(RowNumber, ColumnNumber) -> T) -> Vec<Vec<T>> {
    (region.row..region.row + region.height)
        .map(|row| (region.column..region.column + region.width).map(|column| read(row, column)).collect())
        .collect()
}
