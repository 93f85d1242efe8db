use chrono::{TimeZone, Utc};
use factorylog::dates::{
    expiry_code, korean_timestamp_at, korean_timestamp_padded_at, serial_lot_code,
};
use factorylog::record::{
    BoxDefect, DefectCheckData, PackagingDefect, ProductionData, ProductionMaterial, SpecialNote,
    flatten_defect_data, flatten_production_data, sanitize_cell, validate_production_data,
};
use factorylog::store::CellValue;

fn sample_material() -> ProductionMaterial {
    ProductionMaterial {
        code: "500002".to_string(),
        name: "Sugar".to_string(),
        calculated_weight: 25.0,
        serial_lot: "L2025-01".to_string(),
        stock_quantity: "300".to_string(),
    }
}

fn sample_production() -> ProductionData {
    ProductionData {
        product_code: "310021".to_string(),
        product_name: "Tteok sauce".to_string(),
        input_weight: 50_000.0,
        product_expiry: "2025-08-09".to_string(),
        product_lot: "AA".to_string(),
        author: "Kim".to_string(),
        machine: "1호기".to_string(),
        is_export: false,
        sample_type: "A".to_string(),
        materials: vec![sample_material()],
    }
}

fn sample_defect() -> DefectCheckData {
    DefectCheckData {
        worker: "Park".to_string(),
        line: "1라인".to_string(),
        product_code: "310021".to_string(),
        product_name: "Tteok sauce".to_string(),
        packaging_code: "610001".to_string(),
        packaging_name: "Pouch film".to_string(),
        packaging_lot: "P-77".to_string(),
        packaging_defect: PackagingDefect {
            sealing_defect: 3,
            weight_defect: 0,
            print_defect: 1,
            self_defect: 0,
        },
        box_code: "710001".to_string(),
        box_name: "Carton".to_string(),
        box_defect: BoxDefect {
            contamination: 0,
            damage: 2,
            print_defect: 0,
            other: 1,
        },
        special_note: SpecialNote {
            content: "Seal wrinkling on lane 2".to_string(),
            improvement: "Adjusted heater".to_string(),
            completion_status: "done".to_string(),
        },
    }
}

fn text(value: &str) -> CellValue {
    CellValue::text(value)
}

fn test_korean_timestamps() {
    println!("\n====== Testing Korean timestamp formats ======");

    // 03:05:07 UTC is 12:05:07 KST, the noon 오후 edge
    let noon = Utc.with_ymd_and_hms(2025, 8, 9, 3, 5, 7).unwrap();
    assert_eq!(korean_timestamp_at(noon), "2025. 8. 9 오후 12:05:07");
    println!("✓ Hour 12 renders as 오후 12");

    // 15:30:09 UTC rolls into the next KST day at midnight
    let midnight = Utc.with_ymd_and_hms(2025, 8, 8, 15, 30, 9).unwrap();
    assert_eq!(korean_timestamp_at(midnight), "2025. 8. 9 오전 12:30:09");
    println!("✓ Hour 0 renders as 오전 12 on the rolled-over day");

    let afternoon = Utc.with_ymd_and_hms(2025, 8, 9, 5, 4, 9).unwrap();
    assert_eq!(korean_timestamp_at(afternoon), "2025. 8. 9 오후 2:04:09");
    println!("✓ Afternoon hours drop 12 and stay unpadded");

    assert_eq!(
        korean_timestamp_padded_at(afternoon),
        "2025. 08. 09. 14:04:09"
    );
    println!("✓ Padded 24-hour defect form matches");
}

fn test_expiry_and_lot_codes() {
    println!("\n====== Testing expiry and serial-lot codes ======");

    assert_eq!(expiry_code("2025-08-09"), "25.08.09");
    assert_eq!(serial_lot_code("2025-08-09", "AA"), "25.08.09_AA");
    println!("✓ Century dropped, dashes to periods, lot appended");
}

fn test_validate_accepts_minimal_record() {
    println!("\n====== Testing validation of a well-formed record ======");

    let errors = validate_production_data(&sample_production());
    assert!(errors.is_empty(), "unexpected errors: {:?}", errors);
    println!("✓ Minimal well-formed record passes with zero errors");
}

fn test_validate_collects_failures() {
    println!("\n====== Testing validation failures ======");

    let mut data = sample_production();
    data.input_weight = 0.0;
    let errors = validate_production_data(&data);
    assert!(errors.iter().any(|e| e.field == "inputWeight"));
    println!("✓ Zero weight rejected");

    let mut data = sample_production();
    data.input_weight = 10_000_001.0;
    assert!(
        validate_production_data(&data)
            .iter()
            .any(|e| e.field == "inputWeight")
    );
    println!("✓ Overweight rejected");

    let mut data = sample_production();
    data.author = String::new();
    data.machine = String::new();
    data.materials[0].serial_lot = String::new();
    data.materials[0].stock_quantity = String::new();
    let errors = validate_production_data(&data);
    assert!(errors.iter().any(|e| e.field == "author"));
    assert!(errors.iter().any(|e| e.field == "machine"));
    assert!(errors.iter().any(|e| e.field == "materials.0.serialLot"));
    assert!(errors.iter().any(|e| e.field == "materials.0.stockQuantity"));
    assert_eq!(errors.len(), 4);
    println!("✓ All failures collected in one pass, not fail-fast");

    let mut data = sample_production();
    data.product_code = "x".repeat(101);
    assert!(
        validate_production_data(&data)
            .iter()
            .any(|e| e.field == "productCode")
    );
    println!("✓ Over-long product code rejected");
}

fn test_flatten_production_layout() {
    println!("\n====== Testing production record flattening ======");

    let timestamp = "2025. 8. 9 오후 2:04:09";
    let row = flatten_production_data(&sample_production(), timestamp);

    assert_eq!(row.len(), 11 + 4);
    assert_eq!(row[0], text(timestamp));
    assert_eq!(row[1], text("Kim"));
    assert_eq!(row[2], text("1호기"));
    assert_eq!(row[3], text("310021"));
    assert_eq!(row[4], text("Tteok sauce"));
    assert_eq!(row[5], CellValue::Number(50_000.0));
    assert_eq!(row[6], CellValue::Number(25_000.0));
    assert_eq!(row[7], text("2025-08-09"));
    assert_eq!(row[8], text("AA"));
    assert_eq!(row[9], text("25.08.09_AA"));
    assert_eq!(row[10], text("A"));
    println!("✓ Fixed header fields in order with derived lot code and total");

    assert_eq!(row[11], text("500002"));
    assert_eq!(row[12], text("Sugar"));
    assert_eq!(row[13], CellValue::Number(25_000.0));
    assert_eq!(row[14], text("L2025-01"));
    println!("✓ Material cells appended as code/name/grams/lot");
}

fn test_flatten_export_marker() {
    println!("\n====== Testing export marker ======");

    let mut data = sample_production();
    data.is_export = true;
    let row = flatten_production_data(&data, "ts");

    assert_eq!(row.len(), 12 + 4);
    assert_eq!(row[11], text("수출"));
    assert_eq!(row[12], text("500002"));
    println!("✓ Export marker inserted after the sample field");
}

fn test_flatten_roundtrip() {
    println!("\n====== Testing header-field roundtrip ======");

    let data = sample_production();
    let row = flatten_production_data(&data, "ts");

    // Re-reading the fixed columns recovers the submitted fields
    assert_eq!(row[1].to_cell_string(), data.author);
    assert_eq!(row[2].to_cell_string(), data.machine);
    assert_eq!(row[3].to_cell_string(), data.product_code);
    assert_eq!(row[7].to_cell_string(), data.product_expiry);
    assert_eq!(row[8].to_cell_string(), data.product_lot);
    assert_eq!(row[10].to_cell_string(), data.sample_type);
    println!("✓ Author, machine, code, expiry, lot and sample recovered");
}

fn test_flatten_defect_layout() {
    println!("\n====== Testing defect record flattening ======");

    let timestamp = "2025. 08. 09. 14:04:09";
    let row = flatten_defect_data(&sample_defect(), timestamp);

    assert_eq!(row.len(), 21);
    assert_eq!(row[0], text(timestamp));
    assert_eq!(row[1], text("Park"));
    assert_eq!(row[2], text("1라인"));
    assert_eq!(row[7], text("P-77"));
    assert_eq!(row[8], CellValue::Number(3.0));
    assert_eq!(row[11], CellValue::Number(0.0));
    assert_eq!(row[12], text("710001"));
    assert_eq!(row[15], CellValue::Number(2.0));
    assert_eq!(row[18], text("Seal wrinkling on lane 2"));
    assert_eq!(row[20], text("done"));
    println!("✓ 21 cells in the fixed defect column order");
}

fn test_sanitization() {
    println!("\n====== Testing formula-injection sanitization ======");

    assert_eq!(sanitize_cell(text("=1+1")), text("'=1+1"));
    assert_eq!(sanitize_cell(text("+82-10")), text("'+82-10"));
    assert_eq!(sanitize_cell(text("-5")), text("'-5"));
    assert_eq!(sanitize_cell(text("@import")), text("'@import"));
    assert_eq!(sanitize_cell(text("\tx")), text("'\tx"));
    println!("✓ Dangerous leading characters get an apostrophe");

    assert_eq!(sanitize_cell(text("hello")), text("hello"));
    assert_eq!(sanitize_cell(text("")), text(""));
    assert_eq!(sanitize_cell(text("  ")), text("  "));
    assert_eq!(sanitize_cell(CellValue::Number(42.0)), CellValue::Number(42.0));
    println!("✓ Plain text, blanks and numbers pass through");

    let mut data = sample_production();
    data.author = "=HYPERLINK(\"x\")".to_string();
    let row = flatten_production_data(&data, "ts");
    assert_eq!(row[1], text("'=HYPERLINK(\"x\")"));
    println!("✓ Flattening sanitizes submitted fields");
}

fn main() {
    test_korean_timestamps();
    test_expiry_and_lot_codes();
    test_validate_accepts_minimal_record();
    test_validate_collects_failures();
    test_flatten_production_layout();
    test_flatten_export_marker();
    test_flatten_roundtrip();
    test_flatten_defect_layout();
    test_sanitization();

    println!("\nAll record tests passed");
}
