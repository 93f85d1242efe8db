use serde::{Deserialize, Serialize};

use crate::bom::MAX_INPUT_WEIGHT_GRAMS;
use crate::dates::serial_lot_code;
use crate::store::CellValue;

/// Marker cell appended to the fixed header fields of an export batch.
pub const EXPORT_MARKER: &str = "수출";

/// Fixed line names offered by the defect check form.
pub const LINE_OPTIONS: [&str; 6] = ["1라인", "2라인", "3라인", "4라인", "수작업", "배합실"];

/// One material line of a submitted production record.
///
/// `calculated_weight` is in kilograms (the scaler's output convention);
/// it is converted to grams when the record is flattened.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductionMaterial {
    pub code: String,
    #[serde(default)]
    pub name: String,
    pub calculated_weight: f64,
    pub serial_lot: String,
    pub stock_quantity: String,
}

/// A submitted production (mixing) record. `input_weight` is in grams.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductionData {
    pub product_code: String,
    pub product_name: String,
    pub input_weight: f64,
    pub product_expiry: String,
    pub product_lot: String,
    pub author: String,
    pub machine: String,
    #[serde(default)]
    pub is_export: bool,
    #[serde(default)]
    pub sample_type: String,
    pub materials: Vec<ProductionMaterial>,
}

/// Per-category defect counts for the packaging film.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackagingDefect {
    pub sealing_defect: u32,
    pub weight_defect: u32,
    pub print_defect: u32,
    pub self_defect: u32,
}

/// Per-category defect counts for the outer box.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoxDefect {
    pub contamination: u32,
    pub damage: u32,
    pub print_defect: u32,
    pub other: u32,
}

/// Free-text note attached to a defect record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecialNote {
    pub content: String,
    pub improvement: String,
    pub completion_status: String,
}

/// A submitted defect check record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefectCheckData {
    pub worker: String,
    pub line: String,
    pub product_code: String,
    pub product_name: String,
    pub packaging_code: String,
    pub packaging_name: String,
    pub packaging_lot: String,
    pub packaging_defect: PackagingDefect,
    pub box_code: String,
    pub box_name: String,
    pub box_defect: BoxDefect,
    pub special_note: SpecialNote,
}

/// One user-correctable validation failure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        ValidationError {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Validate a production record before it is flattened.
///
/// Every rule runs and every failure is collected, so the caller can
/// surface all of them at once instead of fixing fields one at a time.
/// An empty result means the record may be persisted.
pub fn validate_production_data(data: &ProductionData) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if data.product_code.is_empty() {
        errors.push(ValidationError::new("productCode", "Product code is required."));
    } else if data.product_code.chars().count() > 100 {
        errors.push(ValidationError::new(
            "productCode",
            "Product code may not exceed 100 characters.",
        ));
    }

    if !(data.input_weight >= 0.001) || data.input_weight > MAX_INPUT_WEIGHT_GRAMS {
        errors.push(ValidationError::new(
            "inputWeight",
            "Enter a production weight between 0.001 and 10,000,000 grams.",
        ));
    }

    if data.author.is_empty() {
        errors.push(ValidationError::new("author", "Author is required."));
    } else if data.author.chars().count() > 50 {
        errors.push(ValidationError::new(
            "author",
            "Author may not exceed 50 characters.",
        ));
    }

    if data.machine.is_empty() {
        errors.push(ValidationError::new("machine", "Machine is required."));
    }

    for (index, material) in data.materials.iter().enumerate() {
        if material.serial_lot.is_empty() {
            errors.push(ValidationError::new(
                format!("materials.{}.serialLot", index),
                format!("Serial/lot number is required for material {}.", index + 1),
            ));
        } else if material.serial_lot.chars().count() > 100 {
            errors.push(ValidationError::new(
                format!("materials.{}.serialLot", index),
                format!("Serial/lot number for material {} is too long.", index + 1),
            ));
        }
        if material.stock_quantity.is_empty() {
            errors.push(ValidationError::new(
                format!("materials.{}.stockQuantity", index),
                format!("Stock quantity is required for material {}.", index + 1),
            ));
        }
    }

    errors
}

/// Flatten a validated production record into the ordered cells of one
/// output-log row.
///
/// Fixed fields first: timestamp, author, machine, product code/name, input
/// weight (grams, as given), total material weight (grams), raw expiry,
/// product lot, synthetic serial-lot code and sample type, with the export
/// marker appended for export batches. Then four cells per material: code,
/// name, weight converted kg→g, serial lot. Every cell passes through the
/// formula-injection sanitizer.
pub fn flatten_production_data(data: &ProductionData, timestamp: &str) -> Vec<CellValue> {
    let material_total_grams: f64 = data
        .materials
        .iter()
        .map(|m| m.calculated_weight * 1000.0)
        .sum();

    let mut cells: Vec<CellValue> = vec![
        CellValue::text(timestamp),
        CellValue::text(&data.author),
        CellValue::text(&data.machine),
        CellValue::text(&data.product_code),
        CellValue::text(&data.product_name),
        CellValue::Number(data.input_weight),
        CellValue::Number(material_total_grams),
        CellValue::text(&data.product_expiry),
        CellValue::text(&data.product_lot),
        CellValue::text(serial_lot_code(&data.product_expiry, &data.product_lot)),
        CellValue::text(&data.sample_type),
    ];

    if data.is_export {
        cells.push(CellValue::text(EXPORT_MARKER));
    }

    for material in &data.materials {
        cells.push(CellValue::text(&material.code));
        cells.push(CellValue::text(&material.name));
        cells.push(CellValue::Number(material.calculated_weight * 1000.0));
        cells.push(CellValue::text(&material.serial_lot));
    }

    sanitize_row(cells)
}

/// Flatten a defect check record into its fixed 21-column row: timestamp,
/// worker, line, product code/name, packaging code/name/lot, the four
/// packaging defect counts, box code/name, the four box defect counts and
/// the three note fields, in that order.
pub fn flatten_defect_data(data: &DefectCheckData, timestamp: &str) -> Vec<CellValue> {
    let cells: Vec<CellValue> = vec![
        CellValue::text(timestamp),
        CellValue::text(&data.worker),
        CellValue::text(&data.line),
        CellValue::text(&data.product_code),
        CellValue::text(&data.product_name),
        CellValue::text(&data.packaging_code),
        CellValue::text(&data.packaging_name),
        CellValue::text(&data.packaging_lot),
        CellValue::Number(data.packaging_defect.sealing_defect as f64),
        CellValue::Number(data.packaging_defect.weight_defect as f64),
        CellValue::Number(data.packaging_defect.print_defect as f64),
        CellValue::Number(data.packaging_defect.self_defect as f64),
        CellValue::text(&data.box_code),
        CellValue::text(&data.box_name),
        CellValue::Number(data.box_defect.contamination as f64),
        CellValue::Number(data.box_defect.damage as f64),
        CellValue::Number(data.box_defect.print_defect as f64),
        CellValue::Number(data.box_defect.other as f64),
        CellValue::text(&data.special_note.content),
        CellValue::text(&data.special_note.improvement),
        CellValue::text(&data.special_note.completion_status),
    ];

    sanitize_row(cells)
}

/// Neutralize spreadsheet formula injection for one cell.
///
/// A text cell starting with `=`, `+`, `-`, `@`, tab, CR or LF gets a
/// literal apostrophe prefixed so the sheet stores it as text. Numbers and
/// blank strings pass through unchanged.
pub fn sanitize_cell(cell: CellValue) -> CellValue {
    match cell {
        CellValue::Number(n) => CellValue::Number(n),
        CellValue::Text(s) => {
            if s.trim().is_empty() {
                return CellValue::Text(s);
            }
            let dangerous: &[char] = &['=', '+', '-', '@', '\t', '\r', '\n'];
            if s.starts_with(dangerous) {
                CellValue::Text(format!("'{}", s))
            } else {
                CellValue::Text(s)
            }
        }
    }
}

/// Sanitize every cell of a row.
pub fn sanitize_row(cells: Vec<CellValue>) -> Vec<CellValue> {
    cells.into_iter().map(sanitize_cell).collect()
}
