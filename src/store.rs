use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{File, create_dir_all};
use std::io::{Read, Write};
use std::path::PathBuf;
use std::sync::{Mutex, RwLock};

/// A single scalar cell as it appears in a sheet row.
///
/// Numbers and text are kept apart because the formula-injection sanitizer
/// only applies to text and because downstream consumers expect numeric
/// columns to stay numeric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Number(f64),
    Text(String),
}

impl CellValue {
    pub fn text(value: impl AsRef<str>) -> Self {
        CellValue::Text(value.as_ref().to_string())
    }

    /// Render the cell the way it would read back out of a sheet: integral
    /// numbers without a trailing `.0`, everything else via `Display`.
    pub fn to_cell_string(&self) -> String {
        match self {
            CellValue::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    format!("{}", n)
                }
            }
            CellValue::Text(s) => s.clone(),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

/// One data row keyed by the sheet's header names.
#[derive(Debug, Clone, Default)]
pub struct SheetRow {
    cells: HashMap<String, String>,
}

impl SheetRow {
    pub fn new(headers: &[String], cells: &[CellValue]) -> Self {
        let mut map = HashMap::new();
        for (i, header) in headers.iter().enumerate() {
            if header.is_empty() {
                continue;
            }
            let value = cells.get(i).map(CellValue::to_cell_string).unwrap_or_default();
            map.insert(header.clone(), value);
        }
        SheetRow { cells: map }
    }

    /// Value under the given header, or `""` when the column is absent.
    pub fn get(&self, header: &str) -> &str {
        self.cells.get(header).map(String::as_str).unwrap_or("")
    }
}

/// The tabular reference-data store both applications read from and append to.
///
/// A "book" holds named sheets; each sheet is a grid of rows. Header rows are
/// addressed with a 1-based index because several of the source sheets keep
/// their headers on row 2 or row 4. Implementations must be safe to share
/// across request handlers.
pub trait SheetStore: Send + Sync {
    /// All rows below `header_row`, keyed by the header names on that row.
    fn read_rows(&self, sheet: &str, header_row: usize) -> Result<Vec<SheetRow>, String>;

    /// A single cell by 1-based row/column ("A1" is `(1, 1)`).
    fn read_cell(&self, sheet: &str, row: usize, col: usize) -> Result<Option<String>, String>;

    /// Append one row of values at the bottom of the sheet, creating the
    /// sheet if it does not exist yet.
    fn append_row(&self, sheet: &str, values: &[CellValue]) -> Result<(), String>;

    /// Overwrite the sheet's first row with the given header names.
    fn set_header_row(&self, sheet: &str, headers: &[String]) -> Result<(), String>;
}

type Grid = Vec<Vec<CellValue>>;

fn rows_below_header(grid: &Grid, header_row: usize) -> Vec<SheetRow> {
    let headers: Vec<String> = match grid.get(header_row.saturating_sub(1)) {
        Some(row) => row.iter().map(CellValue::to_cell_string).collect(),
        None => return Vec::new(),
    };

    grid.iter()
        .skip(header_row)
        .map(|cells| SheetRow::new(&headers, cells))
        .collect()
}

/// File-backed sheet store: one JSON file per sheet under the book directory.
///
/// Each file holds the raw grid (`Vec<Vec<CellValue>>`). Writes re-read the
/// file under a process-wide lock so concurrent appends do not clobber each
/// other; cross-process coordination is out of scope.
pub struct FileStore {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let dir = dir.into();
        if !dir.exists() {
            create_dir_all(&dir)?;
        }
        Ok(FileStore {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    fn sheet_path(&self, sheet: &str) -> PathBuf {
        self.dir.join(format!("{}.json", sheet))
    }

    fn load_grid(&self, sheet: &str) -> std::io::Result<Grid> {
        let mut file = File::open(self.sheet_path(sheet))?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;
        serde_json::from_str(&contents)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    fn save_grid(&self, sheet: &str, grid: &Grid) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(grid)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        let mut file = File::create(self.sheet_path(sheet))?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }

    fn load_grid_or_empty(&self, sheet: &str) -> std::io::Result<Grid> {
        if self.sheet_path(sheet).exists() {
            self.load_grid(sheet)
        } else {
            Ok(Vec::new())
        }
    }
}

impl SheetStore for FileStore {
    fn read_rows(&self, sheet: &str, header_row: usize) -> Result<Vec<SheetRow>, String> {
        let grid = self
            .load_grid(sheet)
            .map_err(|e| format!("failed to read sheet '{}': {}", sheet, e))?;
        Ok(rows_below_header(&grid, header_row))
    }

    fn read_cell(&self, sheet: &str, row: usize, col: usize) -> Result<Option<String>, String> {
        let grid = self
            .load_grid(sheet)
            .map_err(|e| format!("failed to read sheet '{}': {}", sheet, e))?;
        Ok(grid
            .get(row.saturating_sub(1))
            .and_then(|r| r.get(col.saturating_sub(1)))
            .map(CellValue::to_cell_string))
    }

    fn append_row(&self, sheet: &str, values: &[CellValue]) -> Result<(), String> {
        let _guard = self.write_lock.lock().unwrap();
        let mut grid = self
            .load_grid_or_empty(sheet)
            .map_err(|e| format!("failed to read sheet '{}': {}", sheet, e))?;
        grid.push(values.to_vec());
        self.save_grid(sheet, &grid)
            .map_err(|e| format!("failed to write sheet '{}': {}", sheet, e))
    }

    fn set_header_row(&self, sheet: &str, headers: &[String]) -> Result<(), String> {
        let _guard = self.write_lock.lock().unwrap();
        let mut grid = self
            .load_grid_or_empty(sheet)
            .map_err(|e| format!("failed to read sheet '{}': {}", sheet, e))?;
        let header_cells: Vec<CellValue> = headers.iter().map(|h| CellValue::text(h)).collect();
        if grid.is_empty() {
            grid.push(header_cells);
        } else {
            grid[0] = header_cells;
        }
        self.save_grid(sheet, &grid)
            .map_err(|e| format!("failed to write sheet '{}': {}", sheet, e))
    }
}

/// In-memory sheet store used by the test binaries and as a stand-in book.
#[derive(Default)]
pub struct MemoryStore {
    sheets: RwLock<HashMap<String, Grid>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    /// Replace a whole sheet with the given grid.
    pub fn insert_sheet(&self, sheet: &str, grid: Grid) {
        let mut sheets = self.sheets.write().unwrap();
        sheets.insert(sheet.to_string(), grid);
    }

    /// Snapshot of a sheet's grid, for assertions.
    pub fn sheet(&self, sheet: &str) -> Option<Grid> {
        let sheets = self.sheets.read().unwrap();
        sheets.get(sheet).cloned()
    }
}

impl SheetStore for MemoryStore {
    fn read_rows(&self, sheet: &str, header_row: usize) -> Result<Vec<SheetRow>, String> {
        let sheets = self.sheets.read().unwrap();
        let grid = sheets
            .get(sheet)
            .ok_or_else(|| format!("sheet '{}' not found", sheet))?;
        Ok(rows_below_header(grid, header_row))
    }

    fn read_cell(&self, sheet: &str, row: usize, col: usize) -> Result<Option<String>, String> {
        let sheets = self.sheets.read().unwrap();
        let grid = sheets
            .get(sheet)
            .ok_or_else(|| format!("sheet '{}' not found", sheet))?;
        Ok(grid
            .get(row.saturating_sub(1))
            .and_then(|r| r.get(col.saturating_sub(1)))
            .map(CellValue::to_cell_string))
    }

    fn append_row(&self, sheet: &str, values: &[CellValue]) -> Result<(), String> {
        let mut sheets = self.sheets.write().unwrap();
        sheets
            .entry(sheet.to_string())
            .or_default()
            .push(values.to_vec());
        Ok(())
    }

    fn set_header_row(&self, sheet: &str, headers: &[String]) -> Result<(), String> {
        let mut sheets = self.sheets.write().unwrap();
        let grid = sheets.entry(sheet.to_string()).or_default();
        let header_cells: Vec<CellValue> = headers.iter().map(|h| CellValue::text(h)).collect();
        if grid.is_empty() {
            grid.push(header_cells);
        } else {
            grid[0] = header_cells;
        }
        Ok(())
    }
}
