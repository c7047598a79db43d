//! Mesh export for printing: binary STL and 3MF.

pub mod stl;
pub mod threemf;

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use bracket_kernel::TriangleMesh;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::params::BracketParams;

/// Errors returned by exporters.
#[derive(Error, Debug)]
pub enum ExportError {
    /// An I/O error occurred while writing.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Packaging the 3MF archive failed.
    #[error("3MF error: {0}")]
    ThreeMf(#[from] zip::result::ZipError),
    /// Serializing embedded metadata failed.
    #[error("metadata error: {0}")]
    Json(#[from] serde_json::Error),
    /// The mesh has no triangles.
    #[error("empty geometry")]
    EmptyGeometry,
    /// The output format is not recognized.
    #[error("unknown export format `{0}` (expected stl or 3mf)")]
    UnknownFormat(String),
}

/// Result type for export operations.
pub type Result<T> = std::result::Result<T, ExportError>;

/// Output file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// 3MF package.
    #[default]
    #[serde(rename = "3mf")]
    ThreeMf,
    /// Binary STL.
    Stl,
}

impl Format {
    /// File extension without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            Format::ThreeMf => "3mf",
            Format::Stl => "stl",
        }
    }

    /// Format implied by a path's extension.
    pub fn from_path(path: &Path) -> Option<Format> {
        path.extension()?.to_str()?.parse().ok()
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for Format {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "3mf" => Ok(Format::ThreeMf),
            "stl" => Ok(Format::Stl),
            _ => Err(ExportError::UnknownFormat(s.to_string())),
        }
    }
}

/// Default file name, e.g. `bracket-200x25x16.3mf`.
pub fn file_name(params: &BracketParams, format: Format) -> String {
    format!(
        "bracket-{}x{}x{}.{}",
        params.width,
        params.depth,
        params.height,
        format.extension()
    )
}

/// Encode `mesh` in `format`. The parameters are embedded in 3MF metadata.
pub fn to_bytes(mesh: &TriangleMesh, format: Format, params: &BracketParams) -> Result<Vec<u8>> {
    match format {
        Format::Stl => stl::to_stl_bytes(mesh),
        Format::ThreeMf => {
            let name = file_name(params, format);
            let name = name.trim_end_matches(".3mf");
            threemf::ThreeMfModel::from_mesh(name, mesh)
                .with_params(params)
                .to_bytes()
        }
    }
}

/// Encode `mesh` and write it to `path`.
pub fn write(
    mesh: &TriangleMesh,
    format: Format,
    params: &BracketParams,
    path: impl AsRef<Path>,
) -> Result<()> {
    let bytes = to_bytes(mesh, format, params)?;
    std::fs::write(path.as_ref(), &bytes)?;
    info!(
        path = %path.as_ref().display(),
        bytes = bytes.len(),
        %format,
        "exported"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_name_shortest_decimal() {
        let p = BracketParams::default();
        assert_eq!(file_name(&p, Format::ThreeMf), "bracket-200x25x16.3mf");
        let p = BracketParams {
            width: 142.5,
            ..p
        };
        assert_eq!(file_name(&p, Format::Stl), "bracket-142.5x25x16.stl");
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("STL".parse::<Format>().unwrap(), Format::Stl);
        assert_eq!(
            Format::from_path(Path::new("out/part.3mf")),
            Some(Format::ThreeMf)
        );
        assert_eq!(Format::from_path(Path::new("part.obj")), None);
        assert!(matches!(
            "obj".parse::<Format>(),
            Err(ExportError::UnknownFormat(_))
        ));
    }
}
