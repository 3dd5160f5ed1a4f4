//! Per-page orchestration: convert once, then rasterize, render and write
//! every page independently.
//!
//! A failing page never stops the others; each page's result is collected in
//! the returned [`RunReport`].

use serde::Serialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::config::RenderConfig;
use crate::conversion::DocumentSource;
use crate::overlay::{self, BaseImage};
use crate::pdf_info;
use crate::rasterizer::PageRasterizer;
use crate::types::{BoxpeekError, DocumentPage, Result};

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub output_dir: PathBuf,
    pub render: RenderConfig,
    /// Pages rendered at the same time
    pub jobs: usize,
}

/// A page that made it to disk
#[derive(Debug, Clone, Serialize)]
pub struct RenderedPage {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub clusters: usize,
    pub cells: usize,
    #[serde(skip)]
    pub png: Vec<u8>,
}

#[derive(Debug)]
pub struct PageOutcome {
    /// 0-based page index
    pub index: usize,
    pub result: Result<RenderedPage>,
}

#[derive(Debug)]
pub struct RunReport {
    pub input: PathBuf,
    pub document: String,
    pub pages: Vec<PageOutcome>,
}

impl RunReport {
    pub fn failures(&self) -> impl Iterator<Item = &PageOutcome> {
        self.pages.iter().filter(|p| p.result.is_err())
    }

    pub fn succeeded(&self) -> usize {
        self.pages.iter().filter(|p| p.result.is_ok()).count()
    }
}

/// Output file name for a page, e.g. `page-0003.png`
pub fn page_file_name(index: usize) -> String {
    format!("page-{:04}.png", index)
}

/// Render every page of `pdf_path` into `options.output_dir`
pub async fn run(
    pdf_path: &Path,
    source: Arc<dyn DocumentSource>,
    rasterizer: Arc<dyn PageRasterizer>,
    options: &PipelineOptions,
) -> Result<RunReport> {
    if !pdf_path.is_file() {
        return Err(BoxpeekError::MissingInputFile(pdf_path.to_path_buf()));
    }

    let pdf = pdf_path.to_path_buf();
    let document = {
        let pdf = pdf.clone();
        tokio::task::spawn_blocking(move || source.convert(&pdf))
            .await
            .map_err(|e| BoxpeekError::Task(e.to_string()))??
    };
    log::info!("{}: {} pages converted", document.name, document.pages.len());

    fs::create_dir_all(&options.output_dir)?;

    if options.render.show_background_image {
        warn_missing_pages(&pdf, &document.pages);
    }

    let semaphore = Arc::new(Semaphore::new(options.jobs.max(1)));
    let mut tasks = JoinSet::new();
    for page in document.pages.iter().cloned() {
        let permit = semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| BoxpeekError::Task(e.to_string()))?;
        let pdf = pdf.clone();
        let rasterizer = rasterizer.clone();
        let options = options.clone();

        tasks.spawn_blocking(move || {
            let _permit = permit;
            let index = page.page.index;
            let result = render_one(&pdf, page, rasterizer.as_ref(), &options);
            match &result {
                Ok(rendered) => log::info!("page {} -> {}", index, rendered.path.display()),
                Err(e) => log::error!("page {} failed: {}", index, e),
            }
            (index, result)
        });
    }

    let mut outcomes = Vec::with_capacity(document.pages.len());
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, result)) => outcomes.push(PageOutcome { index, result }),
            Err(e) => log::error!("page worker died: {}", e),
        }
    }

    // Workers that panicked never reported back
    let reported: BTreeSet<usize> = outcomes.iter().map(|o| o.index).collect();
    for page in &document.pages {
        if !reported.contains(&page.page.index) {
            outcomes.push(PageOutcome {
                index: page.page.index,
                result: Err(BoxpeekError::Task(format!("worker for page {} panicked", page.page.index))),
            });
        }
    }
    outcomes.sort_by_key(|o| o.index);

    Ok(RunReport { input: pdf, document: document.name, pages: outcomes })
}

/// Rasterize (when enabled), render and write one page
pub fn render_one(
    pdf_path: &Path,
    mut page: DocumentPage,
    rasterizer: &dyn PageRasterizer,
    options: &PipelineOptions,
) -> Result<RenderedPage> {
    if page.page.scale.is_none() {
        page.page.scale = Some(rasterizer.scale());
    }
    // Bad geometry fails before any subprocess is spawned
    page.page.validate()?;

    let base = if options.render.show_background_image {
        BaseImage::Raster(rasterizer.rasterize(pdf_path, page.page.index)?)
    } else {
        BaseImage::Blank
    };

    let image = overlay::render_page(&page, base, &options.render)?;
    let png = overlay::to_png_bytes(&image)?;
    let path = options.output_dir.join(page_file_name(page.page.index));
    fs::write(&path, &png)?;

    Ok(RenderedPage {
        path,
        width: image.width(),
        height: image.height(),
        clusters: page.clusters.len(),
        cells: page.cells.len(),
        png,
    })
}

fn warn_missing_pages(pdf: &Path, pages: &[DocumentPage]) {
    match pdf_info::page_count(pdf) {
        Ok(count) => {
            let missing = pdf_info::out_of_range(pages.iter().map(|p| p.page.index), count);
            if !missing.is_empty() {
                log::warn!("{} has {} pages; converted pages {:?} are out of range", pdf.display(), count, missing);
            }
        }
        Err(e) => log::warn!("could not inspect {}: {}", pdf.display(), e),
    }
}
