#![allow(unused_assignments)]

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum TemplError {
    #[error("Invalid template origin '{origin}': {reason}")]
    #[diagnostic(help(
        "Use a local directory path or a git URL such as https://github.com/owner/repo.git"
    ))]
    InvalidOrigin { origin: String, reason: String },

    #[error("Fetching templates from {origin} failed: {reason}")]
    #[diagnostic(help("Check the origin and your network connection, then run the command again"))]
    FetchFailed { origin: String, reason: String },

    #[error("git executable not found")]
    #[diagnostic(help("Install git and make sure it is on your PATH"))]
    GitNotFound,

    #[error("Template not found: {name}")]
    #[diagnostic(help("Run `templ -l` to see the available templates"))]
    TemplateNotFound { name: String },

    #[error("Variables file not found: {name}")]
    #[diagnostic(help(
        "Give a path relative to the current directory, or the name of a file in the template store"
    ))]
    VariablesFileNotFound { name: String },

    #[error("'{name}' matches more than one file: {}", candidates.join(", "))]
    #[diagnostic(help("Use a longer path such as one of the candidates to pick a single file"))]
    AmbiguousTemplate {
        name: String,
        candidates: Vec<String>,
    },

    #[error("Failed to list templates under {path}")]
    ListFailed {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}")]
    #[diagnostic(help("Check the TOML syntax of the file"))]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to write source metadata: {context}")]
    MetadataWrite { context: String },

    #[error("Invalid variables file {path}: {reason}")]
    #[diagnostic(help("Variables files are YAML mappings of `name: value` pairs"))]
    VariablesParse { path: PathBuf, reason: String },

    #[error("Invalid variable assignment '{input}'")]
    #[diagnostic(help("Pass variables as NAME=VALUE"))]
    InvalidAssignment { input: String },

    #[error("Template rendering failed for {name}")]
    #[diagnostic(help("Check the template syntax"))]
    RenderError {
        name: String,
        #[source]
        source: tera::Error,
    },

    #[error("Unable to determine the template store directory")]
    #[diagnostic(help("Set TEMPL_DIR to the directory templates should be stored in"))]
    StoreDirUnavailable,
}

pub type Result<T> = std::result::Result<T, TemplError>;
