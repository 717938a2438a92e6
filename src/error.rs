#![allow(unused_assignments)]

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

use crate::render::ApplyReport;

#[derive(Debug, Error, Diagnostic)]
pub enum StampError {
    #[error("Partial manifest not found at {path}")]
    #[diagnostic(help("Ensure the partial directory contains a stamp.toml file"))]
    ConfigNotFound { path: PathBuf },

    #[error("Failed to parse {path}")]
    #[diagnostic(help("Check the TOML syntax of the file"))]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid variable definition for '{name}': {reason}")]
    ConfigInvalidVariable { name: String, reason: String },

    #[error("Invalid manifest: {reason}")]
    ConfigInvalid { reason: String },

    #[error("Invalid validation pattern for variable '{name}': {pattern}")]
    #[diagnostic(help("Validation patterns use regular expression syntax"))]
    PatternCompile {
        name: String,
        pattern: String,
        #[source]
        source: regex_lite::Error,
    },

    #[error("Missing required variable '{name}'{}", description.as_deref().map(|d| format!(" ({d})")).unwrap_or_default())]
    #[diagnostic(help("Provide a value with -d {name}=VALUE"))]
    MissingRequiredVariable {
        name: String,
        description: Option<String>,
    },

    #[error("Invalid value '{value}' for variable '{name}': {reason}")]
    InvalidVariableValue {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Cyclic variable reference: {}", cycle.join(" -> "))]
    #[diagnostic(help("Break the cycle by removing one of the {{{{NAME}}}} references in these defaults"))]
    CyclicVariableReference { cycle: Vec<String> },

    #[error("Destination for '{path}' escapes the target directory")]
    #[diagnostic(help("Template paths and path variables must not contain '..' or absolute components"))]
    PathTraversal { path: String },

    #[error("No merge strategy for {path}")]
    #[diagnostic(help(
        "Only .json, .yaml/.yml and ignore files can be merged; pick another --conflict policy"
    ))]
    UnsupportedMergeFormat { path: String },

    #[error("Failed to parse {format} content of {path}: {message}")]
    MergeParse {
        path: String,
        format: String,
        message: String,
    },

    #[error("Conflict for '{path}' was never resolved")]
    UnresolvedConflict { path: String },

    #[error("No free backup name for {path}")]
    #[diagnostic(help("Remove old .bak files next to the destination"))]
    BackupUnavailable { path: PathBuf },

    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to walk {path}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("Hook '{hook}' failed with exit code {exit_code}")]
    #[diagnostic(help("Hook output:\n{output}"))]
    HookFailed {
        hook: String,
        exit_code: i32,
        output: String,
    },

    #[error("Prompt failed: {message}")]
    PromptFailed { message: String },

    #[error("Applying stopped at {path}")]
    ApplyAborted {
        path: String,
        report: Box<ApplyReport>,
        #[source]
        source: Box<StampError>,
    },
}

pub type Result<T> = std::result::Result<T, StampError>;
