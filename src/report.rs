// HTML gallery and JSON summary for a finished run
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Serialize;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::RenderConfig;
use crate::pipeline::RunReport;
use crate::types::Result;

#[derive(Debug, Serialize)]
pub struct RunSummary<'a> {
    pub input: &'a Path,
    pub document: &'a str,
    pub generated_at: String,
    pub render: &'a RenderConfig,
    pub page_count: usize,
    pub failed: usize,
    pub pages: Vec<PageSummary>,
}

#[derive(Debug, Serialize)]
pub struct PageSummary {
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    pub clusters: usize,
    pub cells: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub fn summarize<'a>(report: &'a RunReport, render: &'a RenderConfig) -> RunSummary<'a> {
    let pages: Vec<PageSummary> = report
        .pages
        .iter()
        .map(|outcome| match &outcome.result {
            Ok(page) => PageSummary {
                index: outcome.index,
                output: Some(page.path.clone()),
                width: Some(page.width),
                height: Some(page.height),
                clusters: page.clusters,
                cells: page.cells,
                error: None,
            },
            Err(e) => PageSummary {
                index: outcome.index,
                output: None,
                width: None,
                height: None,
                clusters: 0,
                cells: 0,
                error: Some(e.to_string()),
            },
        })
        .collect();

    RunSummary {
        input: &report.input,
        document: &report.document,
        generated_at: chrono::Local::now().to_rfc3339(),
        render,
        page_count: pages.len(),
        failed: pages.iter().filter(|p| p.error.is_some()).count(),
        pages,
    }
}

pub fn write_summary(report: &RunReport, render: &RenderConfig, path: &Path) -> Result<()> {
    let content = serde_json::to_string_pretty(&summarize(report, render))?;
    fs::write(path, content)?;
    Ok(())
}

/// Table of page images, `ncols` per row, images embedded as base64 PNG
pub fn gallery_html(report: &RunReport, ncols: usize) -> String {
    let ncols = ncols.max(1);
    let mut html = String::new();
    let _ = write!(
        html,
        "<!DOCTYPE html>\n<html><head><meta charset='utf-8'><title>{}</title></head><body>\n",
        escape(&report.document)
    );
    let _ = writeln!(
        html,
        "<p>{} &middot; generated {}</p>",
        escape(&report.input.display().to_string()),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );

    html.push_str("<table>");
    for (i, outcome) in report.pages.iter().enumerate() {
        if i == 0 {
            html.push_str("<tr>");
        } else if i % ncols == 0 {
            html.push_str("</tr><tr>");
        }

        html.push_str("<td>");
        let _ = write!(html, "<strong>Page {}</strong><br />", outcome.index + 1);
        match &outcome.result {
            Ok(page) => {
                let _ = write!(html, "<img src='data:image/png;base64,{}' />", STANDARD.encode(&page.png));
            }
            Err(e) => {
                let _ = write!(html, "<em>{}</em>", escape(&e.to_string()));
            }
        }
        html.push_str("</td>");
    }
    if !report.pages.is_empty() {
        html.push_str("</tr>");
    }
    html.push_str("</table>\n</body></html>\n");
    html
}

pub fn write_gallery(report: &RunReport, ncols: usize, path: &Path) -> Result<()> {
    fs::write(path, gallery_html(report, ncols))?;
    Ok(())
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{PageOutcome, RenderedPage};
    use crate::types::BoxpeekError;

    fn report(n: usize) -> RunReport {
        let pages = (0..n)
            .map(|index| PageOutcome {
                index,
                result: if index == 1 {
                    Err(BoxpeekError::tool("pdftoppm", "<boom>"))
                } else {
                    Ok(RenderedPage {
                        path: PathBuf::from(format!("out/page-{:04}.png", index)),
                        width: 10,
                        height: 20,
                        clusters: 2,
                        cells: 0,
                        png: vec![1, 2, 3],
                    })
                },
            })
            .collect();
        RunReport { input: PathBuf::from("doc.pdf"), document: "doc".into(), pages }
    }

    #[test]
    fn test_gallery_rows() {
        let html = gallery_html(&report(4), 3);
        assert_eq!(html.matches("<tr>").count(), 2);
        assert_eq!(html.matches("<td>").count(), 4);
        assert!(html.contains("<strong>Page 1</strong>"));
        assert!(html.contains("data:image/png;base64,AQID"));
        assert!(html.contains("&lt;boom&gt;"));
    }

    #[test]
    fn test_empty_gallery() {
        let html = gallery_html(&report(0), 3);
        assert!(html.contains("<table></table>"));
    }

    #[test]
    fn test_summary_counts_failures() {
        let render = RenderConfig::default();
        let r = report(3);
        let summary = summarize(&r, &render);
        assert_eq!(summary.page_count, 3);
        assert_eq!(summary.failed, 1);
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["pages"][0]["clusters"], 2);
        assert!(json["pages"][1]["error"].as_str().unwrap().contains("pdftoppm"));
        assert!(json["pages"][1].get("output").is_none());
    }
}
