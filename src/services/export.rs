//! PDF report export through the Typst CLI.
//!
//! The document is described by a [`ReportData`] value that already carries
//! display-formatted strings; it is serialized to JSON, written next to an
//! embedded Typst template and compiled by invoking `typst`. Rendering
//! charts is not this module's job: the browser rasterizes them and the
//! "complete" variant receives the PNGs, which are only validated and
//! embedded here.
//!
//! Both variants are all-or-nothing. Any failure (missing Typst binary,
//! unusable chart capture, compile error) aborts the export before a file
//! is produced.

use std::path::Path;
use std::process::Command;

use serde::Serialize;
use uuid::Uuid;

use crate::date_utils;
use crate::error::{AppError, AppResult};
use crate::filters;
use crate::models::{KpiSet, ProductTotal, PurchaseWithItems, TeamTotal};
use crate::state::ViewSettings;

/// Everything the report template needs, preformatted for display.
#[derive(Debug, Clone, Serialize)]
pub struct ReportData {
    pub title: String,
    pub subtitle: Option<String>,
    pub generated_on: String,
    pub total_spend: String,
    pub purchase_count: usize,
    pub item_count: usize,
    pub teams: Vec<ReportRow>,
    pub products: Vec<ReportRow>,
    pub purchases: Vec<PurchaseRow>,
    pub has_charts: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportRow {
    pub name: String,
    pub value: String,
    pub percent: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PurchaseRow {
    pub date: String,
    pub team: String,
    pub location: String,
    pub total: String,
}

/// Client-rasterized chart snapshots for the "complete" variant.
pub struct ChartImages {
    pub team_chart_png: Vec<u8>,
    pub product_chart_png: Vec<u8>,
}

impl ReportData {
    #[allow(clippy::too_many_arguments)]
    pub fn build(
        title: &str,
        period: Option<String>,
        kpis: &KpiSet,
        teams: &[TeamTotal],
        products: &[ProductTotal],
        purchases: &[PurchaseWithItems],
        settings: &ViewSettings,
        has_charts: bool,
    ) -> Self {
        let money = |cents: i64| filters::format_money(cents, &settings.currency, &settings.locale);
        let percent = |cents: i64| {
            filters::format_percent(
                filters::percent_of(cents, kpis.total_spend_cents),
                &settings.locale,
            )
        };

        Self {
            title: title.to_string(),
            subtitle: period,
            generated_on: date_utils::display_date(&date_utils::today(), &settings.locale),
            total_spend: money(kpis.total_spend_cents),
            purchase_count: kpis.purchase_count,
            item_count: kpis.item_count,
            teams: teams
                .iter()
                .map(|t| ReportRow {
                    name: t.team_name.clone(),
                    value: money(t.total_cents),
                    percent: percent(t.total_cents),
                })
                .collect(),
            products: products
                .iter()
                .map(|p| ReportRow {
                    name: p.product_name.clone(),
                    value: money(p.total_cents),
                    percent: percent(p.total_cents),
                })
                .collect(),
            purchases: purchases
                .iter()
                .map(|p| PurchaseRow {
                    date: date_utils::display_date(&p.purchase.purchase_date, &settings.locale),
                    team: p.team_name.clone(),
                    location: p.purchase.location_name.clone(),
                    total: money(p.total_cents()),
                })
                .collect(),
            has_charts,
        }
    }
}

/// Output filename with the current date embedded.
pub fn export_filename() -> String {
    format!("purchase-report-{}.pdf", date_utils::today())
}

/// Embedded Typst template for the cost report.
///
/// Each major section (team detail, product detail, purchase list) starts on
/// its own page, matching the fixed layout of the exported report.
const REPORT_TEMPLATE: &str = r##"// Cost report template
// Data is loaded from JSON file

#let data = json("DATA_JSON_PATH")

#set page(
  paper: "a4",
  margin: (top: 2cm, bottom: 2cm, left: 1.5cm, right: 1.5cm),
  footer: context [
    #set text(size: 8pt, fill: gray)
    #grid(
      columns: (1fr, auto),
      [Report generated on #data.generated_on],
      [Page #counter(page).display() of #counter(page).final().first()],
    )
  ],
)

#set text(font: "Helvetica", size: 10pt)

#let section-table(headers, rows) = table(
  columns: headers.len() * (1fr,),
  stroke: (x, y) => if y == 0 { (bottom: 1pt + black) } else { (bottom: 0.5pt + gray) },
  inset: 7pt,
  fill: (x, y) => if y == 0 { rgb("#2563eb") } else if calc.even(y) { luma(240) } else { none },
  ..headers.map(h => text(fill: white, weight: "bold")[#h]),
  ..rows.flatten(),
)

// Title
#align(center)[
  #text(size: 20pt, weight: "bold")[#data.title]
  #if data.subtitle != none [
    #v(0.2em)
    #text(size: 12pt)[#data.subtitle]
  ]
]

#v(1em)

// Summary
#text(size: 14pt, weight: "bold")[Summary]
#v(0.5em)
#grid(
  columns: (auto, auto),
  inset: 4pt,
  [Total spend:], [*#data.total_spend*],
  [Purchases:], [#str(data.purchase_count)],
  [Items:], [#str(data.item_count)],
)

#v(1em)

// Team breakdown
#text(size: 14pt, weight: "bold")[Spending by Team]
#v(0.5em)
#if data.has_charts [
  #align(center)[#image("team_chart.png", width: 75%)]
  #v(0.5em)
]
#section-table(
  ("Team", "Value", "Share"),
  data.teams.map(row => (row.name, row.value, row.percent)),
)

#pagebreak()

// Product breakdown
#text(size: 14pt, weight: "bold")[Top 10 Products]
#v(0.5em)
#if data.has_charts [
  #align(center)[#image("product_chart.png", width: 75%)]
  #v(0.5em)
]
#section-table(
  ("Product", "Value", "Share"),
  data.products.map(row => (row.name, row.value, row.percent)),
)

#if data.purchases.len() > 0 [
  #pagebreak()

  // Purchase list
  #text(size: 14pt, weight: "bold")[Purchase List]
  #v(0.5em)
  #section-table(
    ("Date", "Team", "Location", "Total"),
    data.purchases.map(row => (row.date, row.team, row.location, row.total)),
  )
]
"##;

/// Compile the report to PDF bytes.
///
/// `charts` must be present for the "complete" variant; the images have
/// already been validated by [`validate_chart_png`] at the route boundary.
pub fn generate_pdf(data: &ReportData, charts: Option<&ChartImages>) -> AppResult<Vec<u8>> {
    if Command::new("typst").arg("--version").output().is_err() {
        return Err(AppError::Export(
            "Typst is not installed on the server; the report cannot be rendered.".into(),
        ));
    }

    let work_dir = std::env::temp_dir().join(format!("quartermaster-{}", Uuid::new_v4()));
    std::fs::create_dir_all(&work_dir)?;

    let result = compile_in(&work_dir, data, charts);

    // Best-effort cleanup either way.
    let _ = std::fs::remove_dir_all(&work_dir);

    result
}

fn compile_in(
    work_dir: &Path,
    data: &ReportData,
    charts: Option<&ChartImages>,
) -> AppResult<Vec<u8>> {
    let json_data = serde_json::to_string(data)
        .map_err(|e| AppError::Export(format!("Failed to serialize report data: {}", e)))?;
    std::fs::write(work_dir.join("data.json"), json_data)?;

    if let Some(charts) = charts {
        std::fs::write(work_dir.join("team_chart.png"), &charts.team_chart_png)?;
        std::fs::write(work_dir.join("product_chart.png"), &charts.product_chart_png)?;
    }

    let template_path = work_dir.join("report.typ");
    std::fs::write(
        &template_path,
        REPORT_TEMPLATE.replace("DATA_JSON_PATH", "data.json"),
    )?;

    let output_path = work_dir.join("report.pdf");
    let output = Command::new("typst")
        .arg("compile")
        .arg("--root")
        .arg(work_dir)
        .arg(&template_path)
        .arg(&output_path)
        .output()?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        tracing::error!(stderr = %stderr, "Typst compilation failed");
        return Err(AppError::Export(
            "Failed to render the report PDF.".into(),
        ));
    }

    Ok(std::fs::read(output_path)?)
}

/// Width and height from a PNG's IHDR chunk, if `bytes` is a PNG at all.
pub fn png_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    const SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

    if bytes.len() < 24 || bytes[..8] != SIGNATURE || &bytes[12..16] != b"IHDR" {
        return None;
    }

    let width = u32::from_be_bytes(bytes[16..20].try_into().ok()?);
    let height = u32::from_be_bytes(bytes[20..24].try_into().ok()?);
    Some((width, height))
}

/// Reject a chart capture that is missing, not a PNG, or has zero area.
///
/// A zero-sized capture happens when the chart tab was never laid out; the
/// whole export must fail rather than emit a document with a blank chart.
pub fn validate_chart_png(bytes: &[u8], label: &str) -> AppResult<()> {
    if bytes.is_empty() {
        return Err(AppError::Export(format!(
            "The {} chart was not captured. Open the Charts tab, wait for it to render, and try again.",
            label
        )));
    }

    match png_dimensions(bytes) {
        Some((w, h)) if w > 0 && h > 0 => Ok(()),
        _ => Err(AppError::Export(format!(
            "The {} chart capture is empty or unreadable. Open the Charts tab, wait for it to render, and try again.",
            label
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::reporting;
    use crate::state::ViewSettings;

    fn settings() -> ViewSettings {
        ViewSettings {
            currency: "BRL".into(),
            locale: "pt-BR".into(),
            is_authenticated: false,
        }
    }

    fn png_with_dimensions(width: u32, height: u32) -> Vec<u8> {
        let mut bytes = vec![0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];
        bytes.extend_from_slice(&13u32.to_be_bytes());
        bytes.extend_from_slice(b"IHDR");
        bytes.extend_from_slice(&width.to_be_bytes());
        bytes.extend_from_slice(&height.to_be_bytes());
        bytes.extend_from_slice(&[8, 6, 0, 0, 0]);
        bytes
    }

    #[test]
    fn test_empty_report_still_has_all_sections() {
        let kpis = reporting::kpis(&[]);
        let data = ReportData::build(
            "Event Cost Report",
            None,
            &kpis,
            &[],
            &[],
            &[],
            &settings(),
            false,
        );

        assert_eq!(data.total_spend, "R$0,00");
        assert_eq!(data.purchase_count, 0);
        assert!(data.teams.is_empty());
        assert!(data.products.is_empty());
        assert!(!data.has_charts);

        // The document model serializes; the template always emits the
        // summary and both table sections even with empty bodies.
        let json = serde_json::to_string(&data).unwrap();
        assert!(json.contains("\"teams\":[]"));
        assert!(REPORT_TEMPLATE.contains("Summary"));
        assert!(REPORT_TEMPLATE.contains("Spending by Team"));
        assert!(REPORT_TEMPLATE.contains("Top 10 Products"));
    }

    #[test]
    fn test_report_rows_are_preformatted() {
        let purchases = vec![];
        let kpis = crate::models::KpiSet {
            total_spend_cents: 2300,
            purchase_count: 3,
            item_count: 3,
        };
        let teams = vec![crate::models::TeamTotal {
            team_id: 1,
            team_name: "Kitchen".into(),
            total_cents: 2000,
        }];
        let data = ReportData::build(
            "Event Cost Report",
            Some("01/05/2026 to 15/05/2026".into()),
            &kpis,
            &teams,
            &[],
            &purchases,
            &settings(),
            true,
        );

        assert_eq!(data.teams[0].value, "R$20,00");
        assert_eq!(data.teams[0].percent, "86,96%");
        assert_eq!(data.subtitle.as_deref(), Some("01/05/2026 to 15/05/2026"));
    }

    #[test]
    fn test_png_dimensions_parses_ihdr() {
        assert_eq!(png_dimensions(&png_with_dimensions(640, 400)), Some((640, 400)));
    }

    #[test]
    fn test_png_dimensions_rejects_garbage() {
        assert_eq!(png_dimensions(b"not a png"), None);
        assert_eq!(png_dimensions(&[]), None);
    }

    #[test]
    fn test_validate_chart_png_accepts_real_dimensions() {
        assert!(validate_chart_png(&png_with_dimensions(640, 400), "team").is_ok());
    }

    #[test]
    fn test_validate_chart_png_rejects_zero_size() {
        let err = validate_chart_png(&png_with_dimensions(0, 400), "team").unwrap_err();
        assert!(err.to_string().contains("team"));
    }

    #[test]
    fn test_validate_chart_png_rejects_missing() {
        assert!(validate_chart_png(&[], "product").is_err());
    }

    #[test]
    fn test_export_filename_embeds_date() {
        let name = export_filename();
        assert!(name.starts_with("purchase-report-"));
        assert!(name.ends_with(".pdf"));
    }
}
