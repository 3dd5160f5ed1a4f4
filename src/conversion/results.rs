// Reads conversion results already downloaded to disk.
//
// A results directory holds `json*.zip` archives (each with `<name>.json` and
// optionally `<name>.cells`) and/or the same files unpacked.
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use zip::ZipArchive;

use super::deepsearch::parse_document;
use super::DocumentSource;
use crate::config::SUMMARY_FILE;
use crate::types::{BoxpeekError, Document, Result};

static ARCHIVE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^json.*\.zip$").expect("archive name pattern is valid"));

#[derive(Debug, Clone, PartialEq, Eq)]
enum Origin {
    /// Member `<stem>.json` inside an archive
    Archive(PathBuf),
    /// Loose `<stem>.json` file in this directory
    Loose(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Candidate {
    stem: String,
    origin: Origin,
}

pub struct ResultsDirSource {
    dir: PathBuf,
}

impl ResultsDirSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn candidates(&self) -> Result<Vec<Candidate>> {
        let mut found = Vec::new();
        collect(&self.dir, &mut found)?;
        found.sort_by(|a, b| a.stem.cmp(&b.stem));
        log::debug!("{} converted documents under {}", found.len(), self.dir.display());
        Ok(found)
    }

    fn load(&self, candidate: &Candidate) -> Result<Document> {
        let stem = &candidate.stem;
        let (json, cells) = match &candidate.origin {
            Origin::Loose(dir) => {
                let json = fs::read_to_string(dir.join(format!("{}.json", stem)))?;
                let cells = fs::read_to_string(dir.join(format!("{}.cells", stem))).ok();
                (json, cells)
            }
            Origin::Archive(path) => {
                let mut archive = ZipArchive::new(BufReader::new(File::open(path)?))?;
                let json = read_member(&mut archive, &format!("{}.json", stem))?
                    .ok_or_else(|| BoxpeekError::Format(format!("{} vanished from {}", stem, path.display())))?;
                let cells = read_member(&mut archive, &format!("{}.cells", stem))
                    .unwrap_or_else(|e| {
                        log::warn!("{}: cannot read cells: {}", stem, e);
                        None
                    });
                (json, cells)
            }
        };

        let doc: Value = serde_json::from_str(&json)?;
        let cells: Option<Value> = cells.and_then(|text| match serde_json::from_str(&text) {
            Ok(value) => Some(value),
            Err(e) => {
                log::warn!("{}: ignoring malformed cells document: {}", stem, e);
                None
            }
        });
        if cells.is_none() {
            log::debug!("{}: no text cells available", stem);
        }

        parse_document(stem, &doc, cells.as_ref())
    }
}

impl DocumentSource for ResultsDirSource {
    fn convert(&self, pdf_path: &Path) -> Result<Document> {
        let wanted = pdf_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        let candidates = self.candidates()?;
        let chosen = match candidates.iter().find(|c| c.stem == wanted) {
            Some(candidate) => candidate,
            None if candidates.len() == 1 => {
                log::info!("using the only converted document {} for {}", candidates[0].stem, wanted);
                &candidates[0]
            }
            None => {
                return Err(BoxpeekError::DocumentNotFound { name: wanted, dir: self.dir.clone() });
            }
        };

        log::info!("loading converted document {} ({:?})", chosen.stem, chosen.origin);
        self.load(chosen)
    }
}

// Recursive scan, matching the layout the conversion download produces
fn collect(dir: &Path, found: &mut Vec<Candidate>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect(&path, found)?;
            continue;
        }

        let Some(file_name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            continue;
        };

        if ARCHIVE_NAME.is_match(&file_name) {
            match archive_stems(&path) {
                Ok(stems) => found.extend(stems.into_iter().map(|stem| Candidate {
                    stem,
                    origin: Origin::Archive(path.clone()),
                })),
                Err(e) => log::warn!("skipping unreadable archive {}: {}", path.display(), e),
            }
        } else if file_name == SUMMARY_FILE {
            // Our own run summary, when the output dir sits under the results dir
            continue;
        } else if let Some(stem) = file_name.strip_suffix(".json") {
            found.push(Candidate { stem: stem.to_string(), origin: Origin::Loose(dir.to_path_buf()) });
        }
    }
    Ok(())
}

fn archive_stems(path: &Path) -> Result<Vec<String>> {
    let archive = ZipArchive::new(BufReader::new(File::open(path)?))?;
    Ok(archive
        .file_names()
        .filter_map(|name| name.strip_suffix(".json"))
        .map(str::to_string)
        .collect())
}

fn read_member<R: Read + std::io::Seek>(archive: &mut ZipArchive<R>, name: &str) -> Result<Option<String>> {
    let mut member = match archive.by_name(name) {
        Ok(member) => member,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let mut text = String::new();
    member.read_to_string(&mut text)?;
    Ok(Some(text))
}
