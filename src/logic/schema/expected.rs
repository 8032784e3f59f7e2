//! Expected Schema - the correction model's column list
//!
//! Loaded once at startup from model-adjacent metadata, immutable afterwards.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::columns::canonical_column;
use crate::logic::error::{DiagnosticError, DiagnosticResult};

const ARTIFACT: &str = "expected schema";

/// Accepted on-disk shapes
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SchemaDocument {
    List(Vec<String>),
    Object {
        #[serde(alias = "columns")]
        feature_names: Vec<String>,
    },
}

impl SchemaDocument {
    fn into_columns(self) -> Vec<String> {
        match self {
            SchemaDocument::List(columns) => columns,
            SchemaDocument::Object { feature_names } => feature_names,
        }
    }
}

/// Ordered column names the correction model was fit against
#[derive(Debug, Clone, PartialEq)]
pub struct ExpectedSchema {
    columns: Vec<String>,
    source: Option<PathBuf>,
}

impl ExpectedSchema {
    /// Build from raw column names. Names are canonicalized.
    pub fn new<I, S>(columns: I) -> DiagnosticResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let columns: Vec<String> = columns
            .into_iter()
            .map(|c| canonical_column(c.as_ref()))
            .collect();

        if columns.is_empty() {
            return Err(DiagnosticError::model_unavailable(ARTIFACT, "schema has no columns"));
        }
        if let Some(blank) = columns.iter().position(|c| c.is_empty()) {
            return Err(DiagnosticError::model_unavailable(
                ARTIFACT,
                format!("column {} is blank", blank),
            ));
        }

        Ok(Self { columns, source: None })
    }

    pub fn from_json_str(json: &str) -> DiagnosticResult<Self> {
        let document: SchemaDocument = serde_json::from_str(json)
            .map_err(|e| DiagnosticError::model_unavailable(ARTIFACT, format!("parse error: {}", e)))?;
        Self::new(document.into_columns())
    }

    /// Load from a JSON file: a bare array, or an object with
    /// `feature_names` / `columns`
    pub fn load(path: impl AsRef<Path>) -> DiagnosticResult<Self> {
        let path = path.as_ref();
        log::info!("Loading expected schema from: {}", path.display());

        let json = std::fs::read_to_string(path).map_err(|e| {
            DiagnosticError::model_unavailable(format!("{} ({})", ARTIFACT, path.display()), e)
        })?;

        let mut schema = Self::from_json_str(&json)?;
        schema.source = Some(path.to_path_buf());

        log::info!("Expected schema loaded: {} columns", schema.len());
        Ok(schema)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }
}
