//! # Derived Artifacts
//!
//! Turns repository content into things a user can look at: schematic and
//! PCB plots, diffs between two revisions, mdbook documentation, module
//! metadata and merged benches.
//!
//! All the heavy lifting is done by external tools (`plotkicadsch`,
//! `svgcleaner`, `mdbook` and the python based `plotpcb` and merge tool).
//! They are treated as black boxes: the pipeline
//!
//! 1. creates a scoped temporary directory, removed on every exit path,
//! 2. extracts the needed files at the requested revision into it,
//! 3. runs the tool with a deadline shared by every step of the operation,
//! 4. and on failure returns [`Error::Tool`] carrying a hint for the user
//!    plus the combined tool output for diagnostics.
//!
//! Persisting or serving the results is up to the caller.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use glob::Pattern;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tempfile::TempDir;
use walkdir::WalkDir;

use crate::content::RepoContent;
use crate::error::{Error, Result};
use crate::manifest::BOOK_FILE;
use crate::path::{sanitize_relative, to_git_path};
use crate::process::{self, Deadline, Output};

/// Default budget for one pipeline operation.
pub const TOOL_TIMEOUT: Duration = Duration::from_secs(60);

const SYMBOL_CACHE_PATTERN: &str = "*-cache.lib";
const SCHEMATIC_PATTERN: &str = "*.sch";
const PCB_EXT: &str = ".kicad_pcb";

/// External programs used by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Toolchain {
    /// Python interpreter running `plotpcb` and the merge tool.
    pub python: String,
    /// Python module of the merge tool, run as `python -m <merge>`.
    pub merge: String,
    /// Path of the `plotpcb` script.
    pub plotpcb: String,
    pub plotkicadsch: String,
    pub svgcleaner: String,
    pub mdbook: String,
    /// Budget shared by all steps of one operation.
    pub timeout_secs: u64,
}

impl Default for Toolchain {
    fn default() -> Self {
        Self {
            python: "python3".to_string(),
            merge: "edea".to_string(),
            plotpcb: "plotpcb".to_string(),
            plotkicadsch: "plotkicadsch".to_string(),
            svgcleaner: "svgcleaner".to_string(),
            mdbook: "mdbook".to_string(),
            timeout_secs: TOOL_TIMEOUT.as_secs(),
        }
    }
}

impl Toolchain {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// PCB and schematic plots of a module at two revisions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiffPlots {
    pub pcb_a: Value,
    pub pcb_b: Value,
    pub sch_a: BTreeMap<String, String>,
    pub sch_b: BTreeMap<String, String>,
}

/// Result of a successful mdbook run.
#[derive(Debug, Clone)]
pub struct Book {
    /// Directory holding the rendered HTML.
    pub dest: PathBuf,
    /// Combined mdbook output.
    pub log: String,
}

/// Result of a successful bench merge.
#[derive(Debug, Clone)]
pub struct MergedBench {
    /// Produced files, relative to the bench directory.
    pub files: Vec<(PathBuf, Vec<u8>)>,
    /// Combined merge tool output.
    pub log: String,
}

/// Runs the external tools of the artifact pipeline.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    tools: Toolchain,
}

impl Pipeline {
    pub fn new(tools: Toolchain) -> Self {
        Self { tools }
    }

    pub fn tools(&self) -> &Toolchain {
        &self.tools
    }

    fn deadline(&self) -> Deadline {
        Deadline::after(self.tools.timeout())
    }

    /// Plot every schematic in `dir` at `revision` to SVG.
    ///
    /// Needs the `*-cache.lib` symbol cache next to the `.sch` files.
    /// Returns SVG content keyed by file name.
    pub fn export_schematics(
        &self,
        content: &RepoContent,
        dir: &str,
        revision: &str,
    ) -> Result<BTreeMap<String, String>> {
        self.schematics(content, dir, revision, self.deadline())
    }

    fn schematics(
        &self,
        content: &RepoContent,
        dir: &str,
        revision: &str,
        deadline: Deadline,
    ) -> Result<BTreeMap<String, String>> {
        let dir = to_git_path(&sanitize_relative(dir));
        let symbol_cache = Pattern::new(SYMBOL_CACHE_PATTERN)?;
        let schematic = Pattern::new(SCHEMATIC_PATTERN)?;

        let tmp = scratch_dir("edea_sch")?;
        let mut lib_file = None;
        let mut sheets = Vec::new();

        for entry in content.tree_at(revision)? {
            let Some(name) = name_in_dir(&entry.path, &dir) else {
                continue;
            };

            if symbol_cache.matches(name) {
                let target = tmp.path().join(name);
                fs::write(&target, content.read(&entry)?)?;
                lib_file = Some(target);
            } else if schematic.matches(name) {
                let target = tmp.path().join(name);
                fs::write(&target, content.read(&entry)?)?;
                sheets.push(target);
            }
        }

        let lib_file = lib_file.ok_or_else(|| Error::NoFile {
            name: format!("{}/{}", dir, SYMBOL_CACHE_PATTERN),
            revision: revision.to_string(),
        })?;

        let mut svgs = BTreeMap::new();
        for sheet in sheets {
            let sheet_name = file_name(&sheet);

            let mut plot = Command::new(&self.tools.plotkicadsch);
            plot.arg("-l")
                .arg(&lib_file)
                .arg("-f")
                .arg(&sheet)
                .current_dir(tmp.path());
            run_tool(
                &self.tools.plotkicadsch,
                &mut plot,
                deadline,
                &format!("could not plot {}", sheet_name),
            )?;

            let svg = sheet.with_extension("svg");
            let mut clean = Command::new(&self.tools.svgcleaner);
            clean.arg(&svg).arg(&svg).current_dir(tmp.path());
            match process::run(&mut clean, deadline) {
                Ok(output) if output.success() => {}
                Ok(output) => warn!("could not run svgcleaner: {}", output.combined()),
                Err(e) => warn!("could not run svgcleaner: {}", e),
            }

            let plotted = fs::read_to_string(&svg).map_err(|e| Error::Tool {
                tool: self.tools.plotkicadsch.clone(),
                hint: format!("could not read svg {}", file_name(&svg)),
                message: e.to_string(),
                log: String::new(),
            })?;
            svgs.insert(file_name(&svg), plotted);
        }

        Ok(svgs)
    }

    /// Plot the first PCB in `dir` at `revision`.
    ///
    /// Returns the JSON document printed by `plotpcb`.
    pub fn plot_pcb(&self, content: &RepoContent, dir: &str, revision: &str) -> Result<Value> {
        self.pcb(content, dir, revision, self.deadline())
    }

    fn pcb(
        &self,
        content: &RepoContent,
        dir: &str,
        revision: &str,
        deadline: Deadline,
    ) -> Result<Value> {
        let board = content.file_by_ext_at(dir, PCB_EXT, revision)?;

        let tmp = scratch_dir("edea_pcb")?;
        let board_path = tmp.path().join(&board.name);
        fs::write(&board_path, &board.content)?;

        let mut plot = Command::new(&self.tools.python);
        plot.arg(&self.tools.plotpcb)
            .arg(&board_path)
            .current_dir(tmp.path());
        let output = run_tool(
            &self.tools.plotpcb,
            &mut plot,
            deadline,
            "Something went wrong during the pcb plotting, below is the log which should provide more information",
        )?;

        serde_json::from_slice(&output.stdout).map_err(|e| Error::Tool {
            tool: self.tools.plotpcb.clone(),
            hint: "The pcb plotter returned output that is not valid JSON".to_string(),
            message: e.to_string(),
            log: output.combined(),
        })
    }

    /// PCB and schematic plots of `dir` at revisions `a` and `b`.
    pub fn plot_diff(
        &self,
        content: &RepoContent,
        dir: &str,
        a: &str,
        b: &str,
    ) -> Result<DiffPlots> {
        debug!("diffing {} and {}", a, b);
        let deadline = self.deadline();
        Ok(DiffPlots {
            pcb_a: self.pcb(content, dir, a, deadline)?,
            pcb_b: self.pcb(content, dir, b, deadline)?,
            sch_a: self.schematics(content, dir, a, deadline)?,
            sch_b: self.schematics(content, dir, b, deadline)?,
        })
    }

    /// Build the mdbook in `doc_dir` at `revision` into `dest`.
    pub fn build_docs(
        &self,
        content: &RepoContent,
        doc_dir: &str,
        revision: &str,
        dest: &Path,
    ) -> Result<Book> {
        let deadline = self.deadline();
        let tmp = scratch_dir("edea_book")?;
        content.export_dir(doc_dir, revision, tmp.path())?;

        let book_toml = tmp.path().join(BOOK_FILE);
        let book_name = if doc_dir.is_empty() {
            BOOK_FILE.to_string()
        } else {
            format!("{}/{}", doc_dir, BOOK_FILE)
        };
        if !book_toml.is_file() {
            return Err(Error::NoFile {
                name: book_name,
                revision: revision.to_string(),
            });
        }
        let raw = fs::read_to_string(&book_toml)?;
        if raw.trim().is_empty() {
            return Err(Error::EmptyBook { path: book_name });
        }
        raw.parse::<toml::Table>()?;

        let dest = std::path::absolute(dest)?;
        fs::create_dir_all(&dest)?;
        debug!("book destination {}", dest.display());

        let mut build = Command::new(&self.tools.mdbook);
        build.arg("build").arg(tmp.path()).arg("-d").arg(&dest);
        let output = run_tool(
            &self.tools.mdbook,
            &mut build,
            deadline,
            "Something went wrong during building the book, please see the log",
        )?;

        Ok(Book {
            dest,
            log: output.combined(),
        })
    }

    /// Extract metadata of the module checked out at `module_dir`.
    pub fn extract_metadata(&self, module_dir: &Path) -> Result<serde_json::Map<String, Value>> {
        let mut extract = Command::new(&self.tools.python);
        extract
            .args(["-m", &self.tools.merge, "--extract-meta"])
            .arg(module_dir);
        let output = run_tool(
            &self.tools.merge,
            &mut extract,
            self.deadline(),
            "Something went wrong during the metadata extraction, below is the log which should provide more information",
        )
        .inspect_err(|_| warn!("metadata extraction failed for {}", module_dir.display()))?;

        serde_json::from_slice(&output.stdout).map_err(|e| Error::Tool {
            tool: self.tools.merge.clone(),
            hint: "The metadata extraction returned output that is not a JSON object".to_string(),
            message: e.to_string(),
            log: output.combined(),
        })
    }

    /// Merge the modules checked out at `module_dirs` into one bench project.
    pub fn merge_modules(&self, bench_name: &str, module_dirs: &[PathBuf]) -> Result<MergedBench> {
        let tmp = scratch_dir("edea_merge")?;
        let project_dir = tmp.path().join(bench_dir_name(bench_name));
        debug!("merging {} modules into {}", module_dirs.len(), project_dir.display());

        let mut merge = Command::new(&self.tools.python);
        merge
            .args(["-m", &self.tools.merge, "--output"])
            .arg(&project_dir)
            .args(module_dirs);
        let output = run_tool(
            &self.tools.merge,
            &mut merge,
            self.deadline(),
            "Something went wrong during the merge process, below is the log which should provide more information",
        )?;

        let mut files = Vec::new();
        if project_dir.is_dir() {
            for entry in WalkDir::new(&project_dir).sort_by_file_name() {
                let entry = entry.map_err(std::io::Error::from)?;
                if !entry.file_type().is_file() {
                    continue;
                }
                let relative = entry
                    .path()
                    .strip_prefix(&project_dir)
                    .unwrap_or(entry.path())
                    .to_path_buf();
                files.push((relative, fs::read(entry.path())?));
            }
        }

        Ok(MergedBench {
            files,
            log: output.combined(),
        })
    }
}

fn scratch_dir(prefix: &str) -> Result<TempDir> {
    let dir = tempfile::Builder::new().prefix(prefix).tempdir()?;
    debug!("created temp directory {}", dir.path().display());
    Ok(dir)
}

/// File name of `path` if it lies directly inside `dir`.
fn name_in_dir<'a>(path: &'a str, dir: &str) -> Option<&'a str> {
    let name = if dir.is_empty() {
        path
    } else {
        path.strip_prefix(dir)?.strip_prefix('/')?
    };
    (!name.contains('/')).then_some(name)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn bench_dir_name(bench_name: &str) -> String {
    let name = to_git_path(&sanitize_relative(bench_name)).replace('/', "_");
    if name.is_empty() {
        "bench".to_string()
    } else {
        name
    }
}

/// Run one tool, turning a failed start or a non-zero exit into
/// [`Error::Tool`]. Timeouts are passed through unchanged.
fn run_tool(tool: &str, cmd: &mut Command, deadline: Deadline, hint: &str) -> Result<Output> {
    let output = match process::run(cmd, deadline) {
        Ok(output) => output,
        Err(Error::Spawn { program, source }) => {
            return Err(Error::Tool {
                tool: tool.to_string(),
                hint: hint.to_string(),
                message: format!("could not start {}: {}", program, source),
                log: String::new(),
            })
        }
        Err(e) => return Err(e),
    };

    let log = output.combined();
    if !output.success() {
        debug!("{} failed: {}", tool, log);
        return Err(Error::Tool {
            tool: tool.to_string(),
            hint: hint.to_string(),
            message: format!("{} exited with {}", tool, output.status),
            log,
        });
    }

    debug!("{} output: {}", tool, log);
    Ok(output)
}
