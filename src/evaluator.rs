//! Running programs on an external fixpoint engine.
//!
//! [`Evaluator`] is the seam the executor and provenance extractor use.
//! [`SouffleEvaluator`] drives the Souffle binary in a fresh scratch
//! directory per call; the fact-file codec here is shared with it.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tempfile::TempDir;

use crate::analysis::FxMap;
use crate::error::{SymlogError, SymlogResult};
use crate::program::{Fact, Literal, Program};
use crate::symbol::{BaseType, SymbolicConstant};
use crate::term::{Constant, Term};
use crate::trace::{debug, debug_span, warn};

/// Environment variable naming the Souffle binary.
pub const SOUFFLE_ENV: &str = "SYMLOG_SOUFFLE";
/// Environment variable naming the directory scratch state is created in.
pub const SCRATCH_ENV: &str = "SYMLOG_SCRATCH_DIR";

/// A fixpoint engine able to run a [`Program`].
pub trait Evaluator: Send + Sync {
    /// All tuples of the program's output relations.
    ///
    /// Values in the reserved encoding come back as symbolic constants of
    /// `program.symbols()`.
    fn evaluate(&self, program: &Program) -> SymlogResult<BTreeSet<Literal>>;

    /// Raw JSON proof tree for `target`, or `None` if the engine cannot
    /// explain it.
    fn explain(&self, _program: &Program, _target: &Literal) -> SymlogResult<Option<String>> {
        Ok(None)
    }
}

/// Configuration for [`SouffleEvaluator`].
#[derive(Debug, Clone)]
pub struct SouffleConfig {
    /// Path to the binary. Searched on `PATH` when unset.
    pub souffle_path: Option<PathBuf>,
    /// Parent directory for per-call scratch directories.
    pub scratch_root: Option<PathBuf>,
    /// Worker threads passed as `--jobs`. `None` means `auto`.
    pub jobs: Option<usize>,
    /// Proof depth limit for explanations.
    pub explain_depth: u64,
}

impl Default for SouffleConfig {
    fn default() -> Self {
        Self {
            souffle_path: None,
            scratch_root: None,
            jobs: None,
            explain_depth: 1_000_000_000,
        }
    }
}

impl SouffleConfig {
    /// Defaults overridden by `SYMLOG_SOUFFLE` and `SYMLOG_SCRATCH_DIR`.
    pub fn from_env() -> Self {
        Self {
            souffle_path: std::env::var_os(SOUFFLE_ENV).map(PathBuf::from),
            scratch_root: std::env::var_os(SCRATCH_ENV).map(PathBuf::from),
            ..Self::default()
        }
    }

    pub fn with_souffle_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.souffle_path = Some(path.into());
        self
    }

    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = Some(jobs);
        self
    }

    fn jobs_arg(&self) -> String {
        match self.jobs {
            Some(n) => format!("--jobs={}", n),
            None => "--jobs=auto".to_string(),
        }
    }
}

/// Evaluator backed by the Souffle command-line interpreter.
#[derive(Debug, Clone)]
pub struct SouffleEvaluator {
    config: SouffleConfig,
    binary: PathBuf,
}

impl SouffleEvaluator {
    /// Locate Souffle using the environment.
    pub fn new() -> SymlogResult<Self> {
        Self::with_config(SouffleConfig::from_env())
    }

    pub fn with_config(config: SouffleConfig) -> SymlogResult<Self> {
        let binary = config
            .souffle_path
            .clone()
            .or_else(|| std::env::var_os(SOUFFLE_ENV).map(PathBuf::from))
            .or_else(|| which::which("souffle").ok())
            .ok_or_else(|| SymlogError::EvaluatorUnavailable {
                message: format!("souffle not found on PATH and {} is unset", SOUFFLE_ENV),
            })?;
        Ok(Self { config, binary })
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    pub fn config(&self) -> &SouffleConfig {
        &self.config
    }

    fn scratch(&self) -> SymlogResult<TempDir> {
        let builder = {
            let mut b = tempfile::Builder::new();
            b.prefix("symlog-");
            b
        };
        let dir = match &self.config.scratch_root {
            Some(root) => builder.tempdir_in(root)?,
            None => builder.tempdir()?,
        };
        Ok(dir)
    }

    /// Write the program text and its input fact files under `dir`.
    fn stage(&self, program: &Program, dir: &Path) -> SymlogResult<Staged> {
        let facts_dir = dir.join("in");
        let output_dir = dir.join("out");
        fs::create_dir_all(&facts_dir)?;
        fs::create_dir_all(&output_dir)?;

        let inputs = program.inputs();
        let mut by_relation: BTreeMap<&str, Vec<&Fact>> =
            inputs.iter().map(|name| (name.as_str(), Vec::new())).collect();
        for fact in program.facts() {
            if let Some(rows) = by_relation.get_mut(fact.name()) {
                rows.push(fact);
            }
        }
        for (relation, facts) in &by_relation {
            let path = facts_dir.join(format!("{}.facts", relation));
            fs::write(path, encode_fact_file(facts.iter().copied())?)?;
        }

        let source = dir.join("program.dl");
        fs::write(
            &source,
            program.render_souffle(|f| !inputs.contains(f.name())),
        )?;
        Ok(Staged {
            source,
            facts_dir,
            output_dir,
        })
    }

    fn spawn_error(&self, err: std::io::Error) -> SymlogError {
        SymlogError::EvaluatorUnavailable {
            message: format!("failed to launch {}: {}", self.binary.display(), err),
        }
    }
}

struct Staged {
    source: PathBuf,
    facts_dir: PathBuf,
    output_dir: PathBuf,
}

impl Evaluator for SouffleEvaluator {
    fn evaluate(&self, program: &Program) -> SymlogResult<BTreeSet<Literal>> {
        let _span = debug_span!("souffle_evaluate", rules = program.rules().len()).entered();
        let scratch = self.scratch()?;
        let staged = self.stage(program, scratch.path())?;

        let output = Command::new(&self.binary)
            .arg(&staged.source)
            .arg("-F")
            .arg(&staged.facts_dir)
            .arg("-D")
            .arg(&staged.output_dir)
            .arg("-w")
            .arg(self.config.jobs_arg())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| self.spawn_error(e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SymlogError::evaluator(format!(
                "{} exited with {} on a program of {} rules and {} facts: {}",
                self.binary.display(),
                output.status,
                program.rules().len(),
                program.facts().len(),
                stderr.trim()
            )));
        }

        let decoder = SymbolDecoder::new(program.symbols());
        let mut tuples = BTreeSet::new();
        for relation in program.outputs() {
            let path = staged.output_dir.join(format!("{}.csv", relation));
            if !path.exists() {
                continue;
            }
            let types = program
                .declaration(relation)
                .ok_or_else(|| SymlogError::Undeclared {
                    relation: relation.clone(),
                })?;
            let contents = fs::read_to_string(&path)?;
            tuples.extend(decode_fact_file(&contents, relation, types, &decoder)?);
        }
        debug!(tuples = tuples.len(), "souffle evaluation finished");
        Ok(tuples)
    }

    fn explain(&self, program: &Program, target: &Literal) -> SymlogResult<Option<String>> {
        let scratch = self.scratch()?;
        let staged = self.stage(program, scratch.path())?;

        let child = Command::new(&self.binary)
            .arg("-t")
            .arg("explain")
            .arg(&staged.source)
            .arg("-F")
            .arg(&staged.facts_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn();
        let mut child = match child {
            Ok(child) => child,
            Err(_err) => {
                warn!(error = %_err, "explanation session could not start");
                return Ok(None);
            }
        };

        let commands = format!(
            "setdepth {}\nformat json\nexplain {}\n",
            self.config.explain_depth,
            target.encoded()
        );
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(commands.as_bytes())?;
        }
        let output = child.wait_with_output()?;
        if !output.status.success() {
            debug!(
                status = %output.status,
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "explanation session failed"
            );
            return Ok(None);
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let (Some(start), Some(end)) = (stdout.find('{'), stdout.rfind('}')) else {
            return Ok(None);
        };
        Ok(Some(stdout[start..=end].to_string()))
    }
}

/// Maps reserved encodings back to the symbolic constants they stand for.
pub struct SymbolDecoder {
    encoded: FxMap<Constant, SymbolicConstant>,
}

impl SymbolDecoder {
    pub fn new(symbols: &[SymbolicConstant]) -> Self {
        let encoded = symbols
            .iter()
            .map(|s| {
                let key = match s.kind() {
                    BaseType::Symbol => Constant::String(s.encoded_string()),
                    BaseType::Number => Constant::Number(s.encoded_number()),
                };
                (key, s.clone())
            })
            .collect();
        Self { encoded }
    }

    pub fn decode(&self, constant: Constant) -> Term {
        match self.encoded.get(&constant) {
            Some(sym) => Term::Symbolic(sym.clone()),
            None => Term::Constant(constant),
        }
    }
}

/// Tab-separated rows, one per fact, with symbols in their encoded form.
pub fn encode_fact_file<'a>(facts: impl IntoIterator<Item = &'a Fact>) -> SymlogResult<String> {
    let mut out = String::new();
    for fact in facts {
        for (i, arg) in fact.head.args.iter().enumerate() {
            let raw = arg
                .value()
                .map(|v| v.encode().raw())
                .ok_or_else(|| SymlogError::invalid_fact(fact, "arguments must be constants"))?;
            if raw.contains(['\t', '\n', '\r']) {
                return Err(SymlogError::invalid_fact(
                    fact,
                    "values in fact files cannot contain tabs or newlines",
                ));
            }
            if i > 0 {
                out.push('\t');
            }
            out.push_str(&raw);
        }
        out.push('\n');
    }
    Ok(out)
}

/// Parse a tab-separated relation file using the relation's column types.
pub fn decode_fact_file(
    contents: &str,
    relation: &str,
    types: &[BaseType],
    decoder: &SymbolDecoder,
) -> SymlogResult<Vec<Literal>> {
    let mut tuples = Vec::new();
    for (line_no, line) in contents.lines().enumerate() {
        if line.is_empty() && !types.is_empty() {
            continue;
        }
        let fields: Vec<&str> = if types.is_empty() {
            Vec::new()
        } else {
            line.split('\t').collect()
        };
        if fields.len() != types.len() {
            return Err(SymlogError::malformed(
                relation,
                format!(
                    "line {} has {} columns, expected {}",
                    line_no + 1,
                    fields.len(),
                    types.len()
                ),
            ));
        }
        let mut args = Vec::with_capacity(fields.len());
        for (field, ty) in fields.iter().zip(types) {
            let constant = match ty {
                BaseType::Symbol => Constant::String(field.to_string()),
                BaseType::Number => Constant::Number(field.trim().parse().map_err(|_| {
                    SymlogError::malformed(
                        relation,
                        format!("line {}: `{}` is not a number", line_no + 1, field),
                    )
                })?),
            };
            args.push(decoder.decode(constant));
        }
        tuples.push(Literal::new(relation, args));
    }
    Ok(tuples)
}

/// Load user facts from every `*.facts` file in `dir`.
///
/// The relation name is the file stem. Fields that parse as integers become
/// numbers, everything else a string.
pub fn load_fact_dir(dir: &Path) -> SymlogResult<Vec<Fact>> {
    let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext == "facts"))
        .collect();
    paths.sort();

    let mut facts = Vec::new();
    for path in paths {
        let Some(relation) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let relation = relation.to_string();
        for line in fs::read_to_string(&path)?.lines() {
            if line.is_empty() {
                continue;
            }
            let args = line.split('\t').map(|field| match field.parse::<i64>() {
                Ok(n) => Term::number(n),
                Err(_) => Term::string(field),
            });
            facts.push(Fact::new(Literal::new(&relation, args)));
        }
    }
    Ok(facts)
}

#[cfg(test)]
#[path = "tests/evaluator.rs"]
mod tests;
