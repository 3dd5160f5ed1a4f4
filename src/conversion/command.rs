// Runs an external converter as a subprocess and reads what it wrote
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

use super::{DocumentSource, ResultsDirSource};
use crate::config::ConverterConfig;
use crate::types::{BoxpeekError, Document, Result};

const INPUT_PLACEHOLDER: &str = "{input}";
const OUTPUT_PLACEHOLDER: &str = "{output}";

/// Converter command line. `{input}` is replaced with the PDF path and
/// `{output}` with a scratch directory the converter must write its
/// results into.
#[derive(Debug, Clone)]
pub struct CommandSource {
    program: String,
    args: Vec<String>,
}

impl CommandSource {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        let args = if args.is_empty() {
            vec![INPUT_PLACEHOLDER.to_string(), OUTPUT_PLACEHOLDER.to_string()]
        } else {
            args
        };
        Self { program: program.into(), args }
    }

    pub fn from_config(config: &ConverterConfig) -> Self {
        Self::new(config.program.clone(), config.args.clone())
    }

    fn expand_args(&self, input: &Path, output: &Path) -> Vec<String> {
        let input = input.to_string_lossy();
        let output = output.to_string_lossy();
        self.args
            .iter()
            .map(|arg| arg.replace(INPUT_PLACEHOLDER, &input).replace(OUTPUT_PLACEHOLDER, &output))
            .collect()
    }
}

impl DocumentSource for CommandSource {
    fn convert(&self, pdf_path: &Path) -> Result<Document> {
        // Removed on drop, whichever way we leave this function
        let scratch = TempDir::new()?;
        let args = self.expand_args(pdf_path, scratch.path());

        log::info!("running converter: {} {}", self.program, args.join(" "));
        let output = Command::new(&self.program)
            .args(&args)
            .output()
            .map_err(|e| BoxpeekError::tool(&self.program, format!("could not start: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(BoxpeekError::tool(
                &self.program,
                format!("converting {} exited with {}: {}", pdf_path.display(), output.status, stderr.trim()),
            ));
        }

        ResultsDirSource::new(scratch.path()).convert(pdf_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_args() {
        let source = CommandSource::new("convert-pdf", Vec::new());
        let args = source.expand_args(Path::new("in.pdf"), Path::new("/tmp/out"));
        assert_eq!(args, vec!["in.pdf", "/tmp/out"]);
    }

    #[test]
    fn test_placeholders_inside_args() {
        let source = CommandSource::new("tool", vec!["--src={input}".into(), "-o".into(), "{output}/res".into()]);
        let args = source.expand_args(Path::new("a.pdf"), Path::new("/x"));
        assert_eq!(args, vec!["--src=a.pdf", "-o", "/x/res"]);
    }

    #[test]
    fn test_missing_program_is_tool_failure() {
        let source = CommandSource::new("boxpeek-no-such-converter", Vec::new());
        let err = source.convert(Path::new("a.pdf"));
        assert!(matches!(err, Err(BoxpeekError::ExternalToolFailure { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn test_converter_output_is_loaded() {
        let doc = r#"{"page-dimensions":[{"page":1,"width":10,"height":10}],"main-text":[]}"#;
        let script = format!("printf '%s' '{}' > \"$1/report.json\"", doc);
        let source = CommandSource::new("sh", vec!["-c".into(), script, "sh".into(), "{output}".into()]);
        let document = source.convert(Path::new("report.pdf")).unwrap();
        assert_eq!(document.pages.len(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_nonzero_exit_reports_stderr() {
        let source = CommandSource::new("sh", vec!["-c".into(), "echo boom >&2; exit 3".into()]);
        match source.convert(Path::new("a.pdf")) {
            Err(BoxpeekError::ExternalToolFailure { message, .. }) => assert!(message.contains("boom")),
            other => panic!("unexpected: {:?}", other.map(|d| d.name)),
        }
    }
}
