use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Upper bound for a requested production weight, in grams (10 metric tons).
pub const MAX_INPUT_WEIGHT_GRAMS: f64 = 10_000_000.0;

/// One raw row of the BOM sheet: a producing item, the batch size its
/// recipe is defined against, and one consumed material with its quantity.
///
/// Quantities are in kilograms, as stored in the sheet.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawBomRow {
    pub product_code: String,
    pub product_name: String,
    pub base_quantity: f64,
    pub material_code: String,
    pub material_name: String,
    pub material_quantity: f64,
}

/// A raw material consumed by a product. `quantity` is in kilograms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub code: String,
    #[serde(default)]
    pub name: String,
    pub quantity: f64,
}

/// A producible item with its reference batch size and material list.
///
/// `base_quantity` is the batch size (kg) the material quantities are
/// defined relative to. Materials are unique by code and keep the order
/// they were first seen in.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub product_code: String,
    pub product_name: String,
    pub base_quantity: f64,
    pub materials: Vec<Material>,
}

/// Group raw BOM rows into products.
///
/// Rows with any empty field are skipped, where "empty" means an empty
/// string or a zero quantity. A consumed quantity of exactly 0 therefore
/// drops the row too; the upstream sheets never carry one on purpose, and
/// the behavior is kept as-is so the emitted product set matches what the
/// existing logs were built from.
///
/// The first row seen for a (code, name) pair fixes the product's
/// `base_quantity`; later rows with a different base quantity are treated
/// as re-affirmations, not conflicts. Within a product, the first row for
/// a material code wins and later duplicates are dropped.
pub fn aggregate_bom(rows: &[RawBomRow]) -> Vec<Product> {
    let mut products: Vec<Product> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for row in rows {
        if row.product_code.is_empty()
            || row.product_name.is_empty()
            || row.base_quantity == 0.0
            || row.material_code.is_empty()
            || row.material_name.is_empty()
            || row.material_quantity == 0.0
        {
            continue;
        }

        let key = format!("{}_{}", row.product_code, row.product_name);
        let slot = *index.entry(key).or_insert_with(|| {
            products.push(Product {
                product_code: row.product_code.clone(),
                product_name: row.product_name.clone(),
                base_quantity: row.base_quantity,
                materials: Vec::new(),
            });
            products.len() - 1
        });

        let product = &mut products[slot];
        if !product.materials.iter().any(|m| m.code == row.material_code) {
            product.materials.push(Material {
                code: row.material_code.clone(),
                name: row.material_name.clone(),
                quantity: row.material_quantity,
            });
        }
    }

    products
}

/// Scale a product's material quantities to a requested output weight.
///
/// `input_weight_grams` is in grams; the product's `base_quantity` and the
/// material quantities are in kilograms, so the base is converted to grams
/// for a like-unit ratio. Output quantities stay in kilograms and are not
/// rounded here; rounding is a presentation concern.
///
/// The base quantity is used as a divisor without a zero check, matching
/// the system this replaces. A zero base quantity cannot reach this point
/// through [`aggregate_bom`], which drops such rows.
pub fn scale_materials(product: &Product, input_weight_grams: f64) -> Vec<Material> {
    let base_quantity_grams = product.base_quantity * 1000.0;
    let ratio = input_weight_grams / base_quantity_grams;

    product
        .materials
        .iter()
        .map(|material| Material {
            code: material.code.clone(),
            name: material.name.clone(),
            quantity: material.quantity * ratio,
        })
        .collect()
}

/// Validate a requested production weight (grams).
///
/// Returns human-readable error messages; an empty list means the weight
/// is acceptable. All checks run, so a caller surfaces every problem at
/// once.
pub fn validate_input_weight(weight: f64) -> Vec<String> {
    let mut errors = Vec::new();

    if !(weight > 0.0) {
        errors.push("Weight must be greater than zero.".to_string());
    }

    if weight > MAX_INPUT_WEIGHT_GRAMS {
        errors.push("Weight may not exceed 10,000,000 g (10 metric tons).".to_string());
    }

    errors
}

/// Parse a possibly comma-formatted sheet cell as a number.
///
/// Strips thousands separators and whitespace; anything unparseable
/// becomes 0, the same default the sheets round-trip through.
pub fn parse_sheet_number(raw: &str) -> f64 {
    let cleaned = raw.replace(',', "");
    cleaned.trim().parse::<f64>().unwrap_or(0.0)
}
