//! Self-contained HTML rendering of a [`ScanReport`].
//!
//! Record data is attacker-controlled, so the template is registered under an
//! `.html` name and every value goes through tera's autoescape.

use anyhow::{Context as _, Result};
use dnsguard::probe::aggregate::deductions;
use dnsguard::{PostureFinding, ScanReport};
use tera::{Context as TeraContext, Tera};

const TEMPLATE_NAME: &str = "report.html";
const TEMPLATE: &str = include_str!("report.html.tera");

/// Render the full report page.
pub fn render(report: &ScanReport) -> Result<String> {
    let mut tera = Tera::default();
    tera.add_raw_template(TEMPLATE_NAME, TEMPLATE)
        .context("parsing the report template")?;

    let issues: Vec<&PostureFinding> = report.issues().collect();
    let mut context = TeraContext::new();
    context.insert("report", report);
    context.insert("issues", &issues);
    context.insert("deductions", &deductions(&report.findings));
    context.insert("raw_json", &serde_json::to_string_pretty(report)?);

    tera.render(TEMPLATE_NAME, &context)
        .context("rendering the HTML report")
}
