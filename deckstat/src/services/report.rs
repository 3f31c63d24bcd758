//! Per-investigator affinity reports
//!
//! Built from a frozen `AffinityTable` entry plus card lookups, then handed
//! to a `ReportSink`. The default sink writes a text and an HTML page per
//! investigator and table.

use crate::services::affinity::AffinityTable;
use crate::services::card_resolver::CardResolver;
use async_trait::async_trait;
use deckstat_common::{DeckClass, Error, Result};
use serde::Serialize;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

const CARD_IMAGE_BASE_URL: &str = "https://arkhamdb.com/bundles/cards/";

/// One card row of a report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportLine {
    pub code: String,
    pub name: String,
    pub count: u64,
    /// Share of the top count, rounded to one decimal
    pub percent: f64,
}

/// Ranked card usage of one investigator in one table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvestigatorReport {
    pub class: DeckClass,
    pub investigator_code: String,
    pub investigator_name: String,
    pub display_text: String,
    pub image_code: String,
    /// Highest usage count, i.e. decks observed for this investigator
    pub decks_observed: u64,
    pub lines: Vec<ReportLine>,
}

impl InvestigatorReport {
    /// Rank and filter an investigator's card usage
    ///
    /// **Algorithm:**
    /// 1. Sort cards by count descending, ties by code
    /// 2. Top count = decks observed
    /// 3. Base: keep counts `> top * relevance`
    /// 4. Experience: keep cards with `xp > 0` and counts `> top * relevance / 2`
    ///
    /// An investigator missing from the table yields an empty report.
    pub async fn build(
        class: DeckClass,
        investigator_code: &str,
        table: &AffinityTable,
        resolver: &CardResolver,
        relevance: f64,
    ) -> Result<Self> {
        let investigator = resolver.get_card(investigator_code).await?;

        let mut ranked: Vec<(&String, u64)> = table
            .investigator(investigator_code)
            .map(|usage| usage.iter().map(|(code, count)| (code, *count)).collect())
            .unwrap_or_default();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

        let top = ranked.first().map(|(_, count)| *count).unwrap_or(0);
        let threshold = match class {
            DeckClass::Base => top as f64 * relevance,
            DeckClass::Experience => top as f64 * relevance / 2.0,
        };

        let mut lines = Vec::new();
        for (code, count) in ranked {
            if count as f64 <= threshold {
                continue;
            }
            let card = resolver.get_card(code).await?;
            if class == DeckClass::Experience && card.xp_or_zero() <= 0 {
                continue;
            }
            lines.push(ReportLine {
                code: code.clone(),
                name: card.name.clone(),
                count,
                percent: (count as f64 * 1000.0 / top as f64).round() / 10.0,
            });
        }

        Ok(Self {
            class,
            investigator_code: investigator_code.to_string(),
            investigator_name: investigator.name.clone(),
            display_text: investigator.display_text.clone(),
            image_code: investigator.image_code.clone(),
            decks_observed: top,
            lines,
        })
    }

    /// Plain text summary
    pub fn to_text(&self) -> String {
        let suffix = match self.class {
            DeckClass::Base => "",
            DeckClass::Experience => " (XP cards)",
        };
        let mut out = format!(
            "\n==== Investigator {}{} ====\n\n",
            self.investigator_name, suffix
        );
        for line in &self.lines {
            let _ = writeln!(
                out,
                "{} ({}) [{}, {:.1}%]",
                line.name, line.code, line.count, line.percent
            );
        }
        out
    }

    /// Standalone HTML page with card images
    pub fn to_html(&self) -> String {
        let name = escape_html(&self.investigator_name);
        let description = match self.class {
            DeckClass::Base => "card affinity",
            DeckClass::Experience => "XP card affinity",
        };

        let mut out = String::new();
        let _ = writeln!(out, "<!doctype html>");
        let _ = writeln!(out, "<html>");
        let _ = writeln!(out, "<head>");
        let _ = writeln!(out, "<title>{}</title>", name);
        let _ = writeln!(
            out,
            "<meta name=\"description\" content=\"Investigator {} {}\">",
            name, description
        );
        let _ = writeln!(out, "<meta name=\"keywords\" content=\"arkham horror card game\">");
        let _ = writeln!(out, "</head>");
        let _ = writeln!(out, "<body>");
        let _ = writeln!(out, "{}<br />", escape_html(&self.display_text));
        let _ = writeln!(
            out,
            "<img src=\"{}{}.png\" /><br />",
            CARD_IMAGE_BASE_URL,
            escape_html(&self.image_code)
        );
        let _ = writeln!(out, "Stats based on {} decks<br />", self.decks_observed);
        for line in &self.lines {
            let _ = writeln!(
                out,
                "<img src=\"{}{}.png\" title=\"{}\" />",
                CARD_IMAGE_BASE_URL,
                escape_html(&line.code),
                escape_html(&line.name)
            );
        }
        let _ = writeln!(out, "</body>");
        let _ = writeln!(out, "</html>");
        out
    }

    /// `inv_aff_<Name>_<code>[_xp]`
    pub fn file_stem(&self) -> String {
        let name: String = self
            .investigator_name
            .chars()
            .filter_map(|c| {
                if c.is_whitespace() {
                    Some('_')
                } else if c.is_alphanumeric() || c == '-' || c == '_' {
                    Some(c)
                } else {
                    None
                }
            })
            .collect();
        let suffix = match self.class {
            DeckClass::Base => "",
            DeckClass::Experience => "_xp",
        };
        format!("inv_aff_{}_{}{}", name, self.investigator_code, suffix)
    }
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Consumer of finished reports
#[async_trait]
pub trait ReportSink: Send + Sync {
    async fn write(&self, report: &InvestigatorReport) -> Result<()>;
}

/// Writes `text/<stem>.txt` and `html/<stem>.html`
pub struct FileReportSink {
    text_dir: PathBuf,
    html_dir: PathBuf,
}

impl FileReportSink {
    pub async fn create(output_dir: &Path) -> Result<Self> {
        let text_dir = output_dir.join("text");
        let html_dir = output_dir.join("html");
        for dir in [&text_dir, &html_dir] {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| Error::storage(dir, e))?;
        }
        Ok(Self { text_dir, html_dir })
    }
}

#[async_trait]
impl ReportSink for FileReportSink {
    async fn write(&self, report: &InvestigatorReport) -> Result<()> {
        let stem = report.file_stem();

        let text_path = self.text_dir.join(format!("{}.txt", stem));
        tokio::fs::write(&text_path, report.to_text())
            .await
            .map_err(|e| Error::storage(&text_path, e))?;

        let html_path = self.html_dir.join(format!("{}.html", stem));
        tokio::fs::write(&html_path, report.to_html())
            .await
            .map_err(|e| Error::storage(&html_path, e))?;

        tracing::debug!(investigator = %report.investigator_code, "Report written");
        Ok(())
    }
}

/// Sink used when report files are disabled
pub struct DiscardReportSink;

#[async_trait]
impl ReportSink for DiscardReportSink {
    async fn write(&self, report: &InvestigatorReport) -> Result<()> {
        tracing::trace!(investigator = %report.investigator_code, "Report discarded");
        Ok(())
    }
}
