use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::bom::{Material, Product, RawBomRow, aggregate_bom, parse_sheet_number};
use crate::store::{CellValue, SheetStore};

// Sheet names inside the BOM book.
pub const BOM_SHEET: &str = "BOM";
pub const PRODUCT_SHEET: &str = "시트2";
pub const PASSWORD_SHEET: &str = "비밀번호";

// Sheet names inside the storage book.
pub const PEOPLE_SHEET: &str = "B시트";
pub const BASE_CODE_SHEET: &str = "기초코드";
pub const SERIAL_LOT_SHEET: &str = "시리얼로트";
pub const PACKAGING_SHEET: &str = "포장지";
pub const OUTPUT_SHEET: &str = "시트1";

/// Department whose members may author production and defect records.
pub const PRODUCTION_TEAM: &str = "생산팀";

lazy_static! {
    // Packaging film: 6-digit consumable codes starting with 6.
    static ref PACKAGING_CODE: Regex = Regex::new(r"^6\d{5}$").unwrap();
    // Outer box: 6-digit consumable codes starting with 7.
    static ref BOX_CODE: Regex = Regex::new(r"^7\d{5}$").unwrap();
    static ref SHEET_INFO_DATE: Regex = Regex::new(r"(\d{4}/\d{2}/\d{2})").unwrap();
}

/// A packaging film or outer box consumed by a product.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PackagingItem {
    pub code: String,
    pub name: String,
}

/// One serial-lot inventory row.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SerialLot {
    pub code: String,
    pub product_name: String,
    pub lot_number: String,
    pub stock_quantity: String,
}

/// A product as the defect check form lists it, with its specification
/// category joined in from the base-code sheet.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogProduct {
    pub product_code: String,
    pub product_name: String,
    pub category: String,
}

/// One selectable raw material, keyed by code with a combined display name.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialOption {
    pub code: String,
    pub full_name: String,
}

/// The serial-lot sheet's info cell plus the update date embedded in it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetInfo {
    pub company_info: String,
    pub last_update_date: String,
}

/// Typed reads and appends over the two reference-data books.
///
/// Constructed once at startup and shared through the app state; every
/// call re-reads the underlying store, which is acceptable at this
/// request volume and keeps the data fresh without a cache.
pub struct RefData {
    bom_book: Arc<dyn SheetStore>,
    storage_book: Arc<dyn SheetStore>,
    fallback_password: String,
}

impl RefData {
    pub fn new(
        bom_book: Arc<dyn SheetStore>,
        storage_book: Arc<dyn SheetStore>,
        fallback_password: impl Into<String>,
    ) -> Self {
        RefData {
            bom_book,
            storage_book,
            fallback_password: fallback_password.into(),
        }
    }

    /// Raw BOM rows with quantities parsed out of their sheet cells.
    pub fn bom_rows(&self) -> Result<Vec<RawBomRow>, String> {
        let rows = self.bom_book.read_rows(BOM_SHEET, 1)?;
        Ok(rows
            .iter()
            .map(|row| RawBomRow {
                product_code: row.get("생산품목코드").to_string(),
                product_name: row.get("생산품목명").to_string(),
                base_quantity: parse_sheet_number(row.get("생산수량")),
                material_code: row.get("소모품목코드").to_string(),
                material_name: row.get("소모품목명").to_string(),
                material_quantity: parse_sheet_number(row.get("소모수량")),
            })
            .collect())
    }

    /// Producible items grouped out of the BOM sheet.
    pub fn products(&self) -> Result<Vec<Product>, String> {
        Ok(aggregate_bom(&self.bom_rows()?))
    }

    /// Every distinct raw material on the BOM sheet, for the manual
    /// material picker. First name seen for a code wins.
    pub fn materials_catalog(&self) -> Result<Vec<MaterialOption>, String> {
        let rows = self.bom_book.read_rows(BOM_SHEET, 1)?;
        let mut options: Vec<MaterialOption> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        for row in &rows {
            let code = row.get("소모품목코드");
            let name = row.get("소모품목명");
            if code.is_empty() || name.is_empty() || !seen.insert(code.to_string()) {
                continue;
            }
            options.push(MaterialOption {
                code: code.to_string(),
                full_name: format!("{}_{}", code, name),
            });
        }

        Ok(options)
    }

    /// Products for the defect check form: the product sheet deduplicated
    /// by code, joined with the base-code sheet's 규격정보 column.
    pub fn catalog_products(&self) -> Result<Vec<CatalogProduct>, String> {
        // Header on row 2 of the base-code sheet.
        let mut categories: HashMap<String, String> = HashMap::new();
        match self.storage_book.read_rows(BASE_CODE_SHEET, 2) {
            Ok(rows) => {
                for row in &rows {
                    let code = row.get("품목코드");
                    let category = row.get("규격정보");
                    if !code.is_empty() && !category.is_empty() {
                        categories.entry(code.to_string()).or_insert_with(|| category.to_string());
                    }
                }
            }
            Err(e) => log::warn!("base-code sheet unavailable, categories omitted: {}", e),
        }

        let rows = self.bom_book.read_rows(PRODUCT_SHEET, 1)?;
        let mut products: Vec<CatalogProduct> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        for row in &rows {
            let code = row.get("생산품목코드");
            let name = row.get("생산품목명");
            if code.is_empty() || name.is_empty() || !seen.insert(code.to_string()) {
                continue;
            }
            products.push(CatalogProduct {
                product_code: code.to_string(),
                product_name: name.to_string(),
                category: categories.get(code).cloned().unwrap_or_default(),
            });
        }

        Ok(products)
    }

    /// The packaging film and outer box consumed by a product: the first
    /// consumable whose code matches the packaging pattern and the first
    /// matching the box pattern, scanning the product sheet in order.
    pub fn packaging_for_product(
        &self,
        product_code: &str,
    ) -> Result<(Option<PackagingItem>, Option<PackagingItem>), String> {
        let rows = self.bom_book.read_rows(PRODUCT_SHEET, 1)?;
        let mut packaging: Option<PackagingItem> = None;
        let mut boxed: Option<PackagingItem> = None;

        for row in &rows {
            if row.get("생산품목코드") != product_code {
                continue;
            }
            let code = row.get("소모품목코드");
            if code.is_empty() {
                continue;
            }
            if packaging.is_none() && PACKAGING_CODE.is_match(code) {
                packaging = Some(PackagingItem {
                    code: code.to_string(),
                    name: row.get("소모품목명").to_string(),
                });
            }
            if boxed.is_none() && BOX_CODE.is_match(code) {
                boxed = Some(PackagingItem {
                    code: code.to_string(),
                    name: row.get("소모품목명").to_string(),
                });
            }
        }

        Ok((packaging, boxed))
    }

    /// The full serial-lot inventory: rows with a code, a lot number and a
    /// stock quantity. Header sits on row 2 of the sheet.
    pub fn serial_lots(&self) -> Result<Vec<SerialLot>, String> {
        let rows = self.storage_book.read_rows(SERIAL_LOT_SHEET, 2)?;
        Ok(rows
            .iter()
            .map(Self::serial_lot_from_row)
            .filter(|lot| {
                !lot.code.is_empty() && !lot.lot_number.is_empty() && !lot.stock_quantity.is_empty()
            })
            .collect())
    }

    /// Serial lots for one item code (trimmed comparison, the sheet mixes
    /// numeric and text cells). Only the lot number is required here.
    pub fn serial_lots_for_item(&self, item_code: &str) -> Result<Vec<SerialLot>, String> {
        let wanted = item_code.trim();
        let rows = self.storage_book.read_rows(SERIAL_LOT_SHEET, 2)?;
        Ok(rows
            .iter()
            .map(Self::serial_lot_from_row)
            .filter(|lot| lot.code == wanted && !lot.lot_number.is_empty())
            .collect())
    }

    fn serial_lot_from_row(row: &crate::store::SheetRow) -> SerialLot {
        SerialLot {
            code: row.get("품목코드").trim().to_string(),
            product_name: row.get("품목명").to_string(),
            lot_number: row.get("시리얼/로트No.").to_string(),
            stock_quantity: row.get("재고수량").to_string(),
        }
    }

    /// Names on the people sheet belonging to the production team, in
    /// sheet order without duplicates. Header sits on row 4.
    pub fn production_team(&self) -> Result<Vec<String>, String> {
        let rows = self.storage_book.read_rows(PEOPLE_SHEET, 4)?;
        let mut names: Vec<String> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        for row in &rows {
            let name = row.get("이름");
            let department = row.get("부서");
            if !name.is_empty() && department == PRODUCTION_TEAM && seen.insert(name.to_string()) {
                names.push(name.to_string());
            }
        }

        Ok(names)
    }

    /// The stored password from the password sheet's A1 cell. Falls back
    /// to the configured default when the sheet is missing or empty so a
    /// broken reference book cannot lock everyone out.
    pub fn stored_password(&self) -> String {
        match self.bom_book.read_cell(PASSWORD_SHEET, 1, 1) {
            Ok(Some(password)) if !password.is_empty() => password,
            Ok(_) => {
                log::warn!("password sheet is empty, using fallback password");
                self.fallback_password.clone()
            }
            Err(e) => {
                log::warn!("failed to read password sheet, using fallback: {}", e);
                self.fallback_password.clone()
            }
        }
    }

    /// The serial-lot sheet's A1 company-info cell, with the embedded
    /// `YYYY/MM/DD` update date extracted when present.
    pub fn serial_lot_sheet_info(&self) -> Result<SheetInfo, String> {
        let company_info = self
            .storage_book
            .read_cell(SERIAL_LOT_SHEET, 1, 1)?
            .unwrap_or_default();
        let last_update_date = SHEET_INFO_DATE
            .captures(&company_info)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .unwrap_or_default();

        Ok(SheetInfo {
            company_info,
            last_update_date,
        })
    }

    /// The packaging sheet's A1 info cell.
    pub fn packaging_sheet_info(&self) -> Result<String, String> {
        Ok(self
            .storage_book
            .read_cell(PACKAGING_SHEET, 1, 1)?
            .unwrap_or_default())
    }

    /// Append one flattened production row to the output log.
    ///
    /// The header row is regenerated first: the eleven base columns plus
    /// as many 코드N/원재료명N/중량N/시리얼로트N groups as the row needs. A
    /// failed header write is logged and tolerated; the append still runs.
    pub fn append_production_row(&self, row: &[CellValue]) -> Result<(), String> {
        let mut headers: Vec<String> = [
            "타임스탬프",
            "작성자",
            "호기",
            "제품코드",
            "제품명",
            "생산중량",
            "원재료합계",
            "소비기한",
            "제품로트",
            "시리얼로트",
            "샘플",
        ]
        .iter()
        .map(|h| h.to_string())
        .collect();

        let mut material_index = 1;
        while headers.len() < row.len() {
            headers.push(format!("코드{}", material_index));
            headers.push(format!("원재료명{}", material_index));
            headers.push(format!("중량{}", material_index));
            headers.push(format!("시리얼로트{}", material_index));
            material_index += 1;
        }

        if let Err(e) = self.storage_book.set_header_row(OUTPUT_SHEET, &headers) {
            log::warn!("failed to set output headers, appending anyway: {}", e);
        }

        self.storage_book.append_row(OUTPUT_SHEET, row)
    }

    /// Append one flattened defect row to the output log. The defect log's
    /// header list is fixed; it is kept verbatim from the sheet this
    /// replaces, including the two loss columns the form does not fill.
    pub fn append_defect_row(&self, row: &[CellValue]) -> Result<(), String> {
        let headers: Vec<String> = [
            "타임스탬프",
            "작업자",
            "라인",
            "생산품코드",
            "생산품명",
            "포장지코드",
            "포장지명",
            "포장지로트",
            "실링불량",
            "중량불량",
            "날인불량(포장지)",
            "자체불량",
            "박스코드",
            "박스명",
            "박스오염",
            "파손",
            "날인불량(박스)",
            "기타",
            "생산시_가공로스",
            "배합_청소로스",
            "내용",
            "개선조치사항",
            "완료여부",
        ]
        .iter()
        .map(|h| h.to_string())
        .collect();

        if let Err(e) = self.storage_book.set_header_row(OUTPUT_SHEET, &headers) {
            log::warn!("failed to set output headers, appending anyway: {}", e);
        }

        self.storage_book.append_row(OUTPUT_SHEET, row)
    }
}

/// Built-in sample catalog served when the BOM book is unreachable, so the
/// form keeps working while the store is down.
pub fn sample_products() -> Vec<Product> {
    vec![
        Product {
            product_code: "310013".to_string(),
            product_name: "미스터 떡볶이소스 순한맛_분체품".to_string(),
            base_quantity: 115.0,
            materials: vec![
                material("500002", "정백당", 65.0),
                material("500004", "쇠고기다시다", 30.0),
                material("500007", "조미고추맛분말5.0", 4.0),
                material("500008", "L-글루탐산나트륨", 16.0),
            ],
        },
        Product {
            product_code: "310014".to_string(),
            product_name: "미스터 떡볶이소스 매운맛_분체품".to_string(),
            base_quantity: 100.0,
            materials: vec![
                material("500002", "정백당", 50.0),
                material("500004", "쇠고기다시다", 25.0),
                material("500007", "조미고추맛분말5.0", 5.0),
                material("500008", "L-글루탐산나트륨", 15.0),
                material("500009", "기타원료", 5.0),
            ],
        },
        Product {
            product_code: "310015".to_string(),
            product_name: "치킨소스 오리지널_액상품".to_string(),
            base_quantity: 200.0,
            materials: vec![
                material("500010", "치킨베이스", 120.0),
                material("500011", "식용유", 40.0),
                material("500012", "향신료", 30.0),
                material("500013", "보존료", 10.0),
            ],
        },
    ]
}

fn material(code: &str, name: &str, quantity: f64) -> Material {
    Material {
        code: code.to_string(),
        name: name.to_string(),
        quantity,
    }
}
