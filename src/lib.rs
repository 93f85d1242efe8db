/*!
# Factory Log

Two small factory data-entry web applications sharing one backend library:
a production (mixing) log and a defect check log.

## Overview

Both applications read their reference data — products, bill-of-materials
rows, packaging, workers, serial-lot inventory and a stored password — from
sheet-backed storage, walk the operator through a short form, and append the
finished record as one row to an output log sheet.

## Architecture

The applications follow a client-server architecture:

### Frontend Layer
- **Technologies**: HTML, CSS, vanilla JS served as static pages
- **Key Components**:
  - Product selector fed by the products endpoint
  - Weight entry with server-side proportional calculation
  - Per-material serial-lot pickers backed by the inventory sheet
  - Password prompt that opens the session

### Backend Layer
- **Technologies**: Rust, axum
- **Core Components**:
  - Sheet Store - file-backed tabular storage with named header rows
  - BOM Aggregator - groups raw recipe rows into products
  - Quantity Scaler - scales material quantities to a requested weight
  - Record Composer - validates, flattens and sanitizes submitted records
  - Auth Gate - password check, attempt throttling, signed sessions

### Data Persistence Layer
- One JSON file per sheet inside a book directory
- Records appended as ordered rows matching the sheet column schema

## Key Features

- BOM-driven proportional material calculation (kg/g aware)
- Collect-all validation with per-field error reporting
- Spreadsheet formula-injection sanitization on every written cell
- Korean-locale timestamps matching the downstream sheet consumers
- Password login with per-IP lockout and expiring signed session cookies

## Modules

- **store**: sheet store trait, file-backed and in-memory backends
- **bom**: BOM row aggregation and quantity scaling
- **dates**: Korean timestamp and expiry/lot code formatting
- **record**: record validation, flattening and cell sanitization
- **refdata**: typed readers and writers over the two reference books
- **auth**: password gate, rate limiting, session tokens
- **config**: environment-driven runtime configuration
- **app**: axum routers and handlers for both applications (web feature)

## REST API Endpoints

- `/api/products` - product list (BOM-aggregated or catalog form)
- `/api/calculate` - scale a product's materials to an input weight
- `/api/save` - validate and append a submitted record
- `/api/auth-password` - password login issuing the session cookie
- plus per-app lookups: materials, authors/workers, serial lots,
  packaging and sheet info
*/

pub mod auth;
pub mod bom;
pub mod config;
pub mod dates;
pub mod record;
pub mod refdata;
pub mod store;

#[cfg(feature = "web")]
pub mod app;

/// Re-export everything from these modules to make it easier to use
pub use auth::*;
pub use bom::*;
pub use dates::*;
pub use record::*;
pub use refdata::*;
pub use store::*;
