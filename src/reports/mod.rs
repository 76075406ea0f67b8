//! Report artifact generation.
//!
//! Both writers are pure consumers of the final [`Report`](crate::models::Report)
//! snapshot:
//!
//! - [`json`]: the machine-readable artifact, `reports/scraping_report.json`
//! - [`html`]: a tabular human-readable rendering of the same data,
//!   `reports/scraping_report.html`

pub mod html;
pub mod json;
