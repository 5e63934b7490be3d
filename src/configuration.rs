use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ContextError, ErrorKind};
use crate::surface::PageSize;

/// Settings of the document generation that are not part of the invoice itself.
/// Every field can be left out of the configuration file.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct RendererConfiguration {
    /// The logo drawn at the top-right corner. A missing file only skips the logo.
    pub logo_path: PathBuf,
    /// Page width in millimeters.
    pub page_width: f32,
    /// Page height in millimeters.
    pub page_height: f32,
    /// The directory the finished PDF documents are written to.
    pub output_directory: PathBuf,
}

impl Default for RendererConfiguration {
    fn default() -> Self {
        RendererConfiguration {
            logo_path: PathBuf::from("public/logo.jpg"),
            page_width: PageSize::A4_PORTRAIT.width,
            page_height: PageSize::A4_PORTRAIT.height,
            output_directory: PathBuf::from("."),
        }
    }
}

impl RendererConfiguration {
    pub fn from_path(configuration_file_path: &Path) -> Result<Self, ContextError> {
        let configuration_file_contents = std::fs::read_to_string(configuration_file_path)
            .map_err(|error| {
                ContextError::with_error(
                    ErrorKind::Io,
                    format!(
                        "Failed to read the configuration file {:?}",
                        configuration_file_path
                    ),
                    &error,
                )
            })?;
        let configuration: RendererConfiguration =
            serde_json::from_str(&configuration_file_contents).map_err(|error| {
                ContextError::with_error(
                    ErrorKind::Parse,
                    format!(
                        "Failed to parse the configuration file {:?}",
                        configuration_file_path
                    ),
                    &error,
                )
            })?;

        Ok(configuration)
    }

    pub fn page_size(&self) -> PageSize {
        PageSize {
            width: self.page_width,
            height: self.page_height,
        }
    }
}
