// boxpeek CLI - convert a PDF, then write one annotated PNG per page
use anyhow::{bail, Context, Result};
use clap::builder::BoolishValueParser;
use clap::{ArgAction, Parser};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use boxpeek::config::{self, ConverterConfig, FileConfig, RenderConfig};
use boxpeek::conversion::{CommandSource, DocumentSource, ResultsDirSource};
use boxpeek::pipeline::{self, PipelineOptions};
use boxpeek::rasterizer::PdftoppmRasterizer;
use boxpeek::report;

#[derive(Parser, Debug)]
#[command(author, version, about = "Overlay detected layout boxes on rasterized PDF pages")]
struct Args {
    /// PDF to visualize
    #[arg(env = "INPUT_FILE")]
    input_file: PathBuf,

    /// Draw on the rendered PDF page instead of a blank canvas
    #[arg(long, env = "SHOW_PDF_IMAGE", action = ArgAction::Set, value_parser = BoolishValueParser::new())]
    show_pdf_image: Option<bool>,

    /// Draw cluster boxes (paragraphs, tables, figures, ...)
    #[arg(long, env = "SHOW_CLUSTER_BOXES", action = ArgAction::Set, value_parser = BoolishValueParser::new())]
    show_cluster_boxes: Option<bool>,

    /// Draw raw PDF text cells
    #[arg(long, env = "SHOW_TEXT_CELLS_BOXES", action = ArgAction::Set, value_parser = BoolishValueParser::new())]
    show_text_cells_boxes: Option<bool>,

    /// Directory with downloaded conversion results (json*.zip or .json files)
    #[arg(long)]
    results: Option<PathBuf>,

    /// Converter program to run instead of reading --results
    #[arg(long)]
    converter: Option<String>,

    /// Converter argument; {input} and {output} are substituted
    #[arg(long = "converter-arg", allow_hyphen_values = true)]
    converter_args: Vec<String>,

    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Rasterization resolution
    #[arg(long)]
    dpi: Option<u32>,

    /// Pages rendered in parallel
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Pages per row in report.html
    #[arg(long)]
    ncols: Option<usize>,

    #[arg(long)]
    line_width: Option<u32>,

    /// Fill boxes with a translucent per-label color
    #[arg(long)]
    fill: bool,

    /// Outline the page edge
    #[arg(long)]
    page_frame: bool,

    /// TOML config file (default: ./boxpeek.toml, then the user config dir)
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(short, long)]
    verbose: bool,
}

/// Where the converted document comes from
#[derive(Debug, Clone, PartialEq)]
enum SourceChoice {
    Command(ConverterConfig),
    Results(PathBuf),
}

impl SourceChoice {
    fn into_source(self) -> Arc<dyn DocumentSource> {
        match self {
            SourceChoice::Command(converter) => Arc::new(CommandSource::from_config(&converter)),
            SourceChoice::Results(dir) => Arc::new(ResultsDirSource::new(dir)),
        }
    }
}

impl Args {
    fn render_config(&self, file: &FileConfig) -> RenderConfig {
        let mut render = file.render.clone().unwrap_or_default();
        if let Some(v) = self.show_pdf_image {
            render.show_background_image = v;
        }
        if let Some(v) = self.show_cluster_boxes {
            render.show_cluster_boxes = v;
        }
        if let Some(v) = self.show_text_cells_boxes {
            render.show_text_cell_boxes = v;
        }
        if let Some(v) = self.line_width {
            render.line_width = v;
        }
        render.fill_boxes |= self.fill;
        render.page_frame |= self.page_frame;
        render
    }

    // --converter, then --results or the file's results dir, then the file's converter
    fn source_choice(&self, file: &FileConfig) -> Result<SourceChoice> {
        if let Some(program) = &self.converter {
            let converter = ConverterConfig { program: program.clone(), args: self.converter_args.clone() };
            return Ok(SourceChoice::Command(converter));
        }
        if let Some(dir) = self.results.as_ref().or(file.results.as_ref()) {
            return Ok(SourceChoice::Results(dir.clone()));
        }
        if let Some(converter) = &file.converter {
            return Ok(SourceChoice::Command(converter.clone()));
        }
        bail!("no conversion results: pass --results <dir> or --converter <program>")
    }

    fn document_source(&self, file: &FileConfig) -> Result<Arc<dyn DocumentSource>> {
        Ok(self.source_choice(file)?.into_source())
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    let file = match &args.config {
        Some(path) => FileConfig::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => FileConfig::discover()?,
    };

    let render = args.render_config(&file);
    let source = args.document_source(&file)?;
    let dpi = args.dpi.or(file.dpi).unwrap_or(config::DEFAULT_DPI);
    let rasterizer = Arc::new(PdftoppmRasterizer::new(dpi));
    let options = PipelineOptions {
        output_dir: args
            .output
            .clone()
            .or_else(|| file.output.clone())
            .unwrap_or_else(|| PathBuf::from(config::DEFAULT_OUTPUT_DIR)),
        render,
        jobs: args.jobs.or(file.jobs).unwrap_or_else(config::default_jobs),
    };
    log::debug!("options: {:?}", options);

    let run = pipeline::run(&args.input_file, source, rasterizer, &options)
        .await
        .with_context(|| format!("visualizing {}", args.input_file.display()))?;

    let ncols = args.ncols.or(file.ncols).unwrap_or(config::DEFAULT_NCOLS);
    let gallery = options.output_dir.join(config::REPORT_FILE);
    report::write_gallery(&run, ncols, &gallery)?;
    report::write_summary(&run, &options.render, &options.output_dir.join(config::SUMMARY_FILE))?;

    let failed: Vec<_> = run.failures().collect();
    println!(
        "{}: {} of {} pages rendered, report at {}",
        run.document,
        run.succeeded(),
        run.pages.len(),
        gallery.display()
    );
    for outcome in &failed {
        if let Err(e) = &outcome.result {
            eprintln!("  page {}: {}", outcome.index, e);
        }
    }

    Ok(if failed.is_empty() { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(extra: &[&str]) -> Args {
        let mut argv = vec!["boxpeek", "doc.pdf"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    fn file_config() -> FileConfig {
        FileConfig {
            render: Some(RenderConfig { show_cluster_boxes: false, line_width: 5, ..RenderConfig::default() }),
            results: Some(PathBuf::from("from-file")),
            converter: Some(ConverterConfig { program: "docling".into(), args: vec!["{input}".into()] }),
            ..FileConfig::default()
        }
    }

    #[test]
    fn test_defaults_without_flags_or_file() {
        let render = parse(&[]).render_config(&FileConfig::default());
        assert_eq!(render, RenderConfig::default());
        assert!(!render.show_text_cell_boxes);
    }

    #[test]
    fn test_flags_override_file() {
        let args = parse(&["--show-cluster-boxes", "true", "--show-pdf-image", "false", "--line-width", "1"]);
        let render = args.render_config(&file_config());
        assert!(render.show_cluster_boxes);
        assert!(!render.show_background_image);
        assert_eq!(render.line_width, 1);

        let untouched = parse(&[]).render_config(&file_config());
        assert!(!untouched.show_cluster_boxes);
        assert_eq!(untouched.line_width, 5);
    }

    #[test]
    fn test_bool_flags_accept_notebook_spellings() {
        let args = parse(&["--show-pdf-image", "True", "--show-cluster-boxes", "no", "--show-text-cells-boxes", "1"]);
        assert_eq!(args.show_pdf_image, Some(true));
        assert_eq!(args.show_cluster_boxes, Some(false));
        assert_eq!(args.show_text_cells_boxes, Some(true));
        assert!(Args::try_parse_from(["boxpeek", "doc.pdf", "--show-pdf-image", "maybe"]).is_err());
    }

    #[test]
    fn test_converter_flag_wins() {
        let args = parse(&["--converter", "mytool", "--converter-arg", "-i", "--results", "dir"]);
        assert_eq!(
            args.source_choice(&file_config()).unwrap(),
            SourceChoice::Command(ConverterConfig { program: "mytool".into(), args: vec!["-i".into()] })
        );
    }

    #[test]
    fn test_results_flag_beats_file() {
        let choice = parse(&["--results", "dir"]).source_choice(&file_config()).unwrap();
        assert_eq!(choice, SourceChoice::Results(PathBuf::from("dir")));
    }

    #[test]
    fn test_file_results_then_file_converter() {
        let file = file_config();
        assert_eq!(parse(&[]).source_choice(&file).unwrap(), SourceChoice::Results(PathBuf::from("from-file")));

        let file = FileConfig { results: None, ..file_config() };
        assert_eq!(parse(&[]).source_choice(&file).unwrap(), SourceChoice::Command(file.converter.clone().unwrap()));
    }

    #[test]
    fn test_no_source_is_an_error() {
        let err = parse(&[]).source_choice(&FileConfig::default()).unwrap_err();
        assert!(err.to_string().contains("no conversion results"));
    }
}
