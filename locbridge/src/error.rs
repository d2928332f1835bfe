//! All error types for the locbridge crate.
//!
//! Every failure is fatal for the hook run: loaders, mergers and writers return
//! these and callers propagate them unchanged.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("XML parse error: {0}")]
    XmlParse(#[from] quick_xml::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to read `{}`: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: Box<Error>,
    },

    #[error("failed to write `{}`: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("translations directory `{}` does not exist", .0.display())]
    MissingTranslations(PathBuf),

    #[error("invalid locale code `{0}`")]
    InvalidLocale(String),

    #[error("invalid resource: {0}")]
    InvalidResource(String),

    #[error("project file parse error at line {line}: {message}")]
    PbxParse { line: usize, message: String },

    #[error("invalid Xcode project: {0}")]
    InvalidProject(String),
}

impl Error {
    /// Wraps an error with the path of the file that was being read.
    pub fn reading(path: impl Into<PathBuf>, source: impl Into<Error>) -> Self {
        Error::Read {
            path: path.into(),
            source: Box::new(source.into()),
        }
    }

    /// Wraps an I/O error with the path of the file that was being written.
    pub fn writing(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Write {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_json_error() {
        let json_error = serde_json::from_str::<serde_json::Value>("{ invalid json }").unwrap_err();
        let error = Error::Json(json_error);
        assert!(error.to_string().contains("JSON parse error"));
    }

    #[test]
    fn test_read_error_names_the_file() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "File not found");
        let error = Error::reading("translations/app/en.json", io_error);
        let display = error.to_string();
        assert!(display.contains("translations/app/en.json"));
        assert!(display.contains("File not found"));
    }

    #[test]
    fn test_write_error_names_the_file() {
        let io_error = io::Error::new(io::ErrorKind::PermissionDenied, "denied");
        let error = Error::writing("res/values/strings.xml", io_error);
        assert_eq!(
            error.to_string(),
            "failed to write `res/values/strings.xml`: denied"
        );
    }

    #[test]
    fn test_invalid_locale_error() {
        let error = Error::InvalidLocale("../etc".to_string());
        assert_eq!(error.to_string(), "invalid locale code `../etc`");
    }

    #[test]
    fn test_pbx_parse_error() {
        let error = Error::PbxParse {
            line: 12,
            message: "unexpected `}`".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "project file parse error at line 12: unexpected `}`"
        );
    }

    #[test]
    fn test_error_debug() {
        let error = Error::InvalidResource("test".to_string());
        let debug = format!("{:?}", error);
        assert!(debug.contains("InvalidResource"));
        assert!(debug.contains("test"));
    }
}
