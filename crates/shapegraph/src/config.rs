//! Configuration types for page processing.
//!
//! This module provides configuration structures that tune the tolerances and
//! optional stages of the pipeline. All types implement [`serde::Deserialize`]
//! so they can be loaded from TOML.
//!
//! # Overview
//!
//! - [`PipelineConfig`] - Top-level configuration combining all sections.
//! - [`ToleranceConfig`] - Numeric tolerances for geometric comparisons.
//! - [`TextConfig`] - Settings for associating free text with shapes.
//! - [`ConnectionsConfig`] - Settings for author-drawn connections.
//!
//! # Example
//!
//! ```
//! # use shapegraph::config::PipelineConfig;
//! let config = PipelineConfig::from_toml_str(
//!     r#"
//!     [text]
//!     search_radius = 2.0
//!
//!     [connections]
//!     use_real = false
//!     "#,
//! )
//! .unwrap();
//! assert_eq!(config.text().search_radius(), 2.0);
//! assert!(!config.connections().use_real());
//! assert_eq!(config.tolerances().flatten(), 0.01);
//! ```

use serde::Deserialize;

use crate::PipelineError;

/// Top-level pipeline configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PipelineConfig {
    /// Tolerance section.
    #[serde(default)]
    tolerances: ToleranceConfig,

    /// Text association section.
    #[serde(default)]
    text: TextConfig,

    /// Author-drawn connection section.
    #[serde(default)]
    connections: ConnectionsConfig,
}

impl PipelineConfig {
    /// Creates a new [`PipelineConfig`] from its sections.
    ///
    /// # Arguments
    ///
    /// * `tolerances` - Geometric tolerances.
    /// * `text` - Text association settings.
    /// * `connections` - Author-drawn connection settings.
    pub fn new(tolerances: ToleranceConfig, text: TextConfig, connections: ConnectionsConfig) -> Self {
        Self {
            tolerances,
            text,
            connections,
        }
    }

    /// Parses a configuration document.
    ///
    /// Missing sections and keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Config`] if the document is not valid TOML,
    /// holds values of the wrong type, or holds an out-of-range value: the
    /// flattening tolerance must be positive, and the other tolerances and
    /// the search radius must not be negative.
    pub fn from_toml_str(source: &str) -> Result<Self, PipelineError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), PipelineError> {
        let flatten = self.tolerances.flatten;
        if !flatten.is_finite() || flatten <= 0.0 {
            return Err(PipelineError::Config(format!(
                "tolerances.flatten must be positive, got {flatten}"
            )));
        }
        for (key, value) in [
            ("tolerances.alignment", self.tolerances.alignment),
            ("tolerances.connection_point", self.tolerances.connection_point),
            ("text.search_radius", self.text.search_radius),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(PipelineError::Config(format!(
                    "{key} must not be negative, got {value}"
                )));
            }
        }
        Ok(())
    }

    /// Returns the tolerance configuration.
    pub fn tolerances(&self) -> &ToleranceConfig {
        &self.tolerances
    }

    /// Returns the text association configuration.
    pub fn text(&self) -> &TextConfig {
        &self.text
    }

    /// Returns the author-drawn connection configuration.
    pub fn connections(&self) -> &ConnectionsConfig {
        &self.connections
    }
}

/// Numeric tolerances, in page units.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ToleranceConfig {
    /// Maximum left-edge and width difference for text to move to an ancestor.
    alignment: f64,

    /// Maximum distance between a curve and its flattened form.
    flatten: f64,

    /// Slack when testing whether a connection point lies in a shape.
    connection_point: f64,
}

impl Default for ToleranceConfig {
    fn default() -> Self {
        Self {
            alignment: 1e-4,
            flatten: 0.01,
            connection_point: 1e-5,
        }
    }
}

impl ToleranceConfig {
    /// Creates a new [`ToleranceConfig`].
    ///
    /// # Arguments
    ///
    /// * `alignment` - Text reassignment tolerance.
    /// * `flatten` - Path flattening tolerance.
    /// * `connection_point` - Connection point containment slack.
    pub fn new(alignment: f64, flatten: f64, connection_point: f64) -> Self {
        Self {
            alignment,
            flatten,
            connection_point,
        }
    }

    /// Returns the text reassignment tolerance.
    pub fn alignment(&self) -> f64 {
        self.alignment
    }

    /// Returns the path flattening tolerance.
    pub fn flatten(&self) -> f64 {
        self.flatten
    }

    /// Returns the connection point containment slack.
    pub fn connection_point(&self) -> f64 {
        self.connection_point
    }
}

/// Free text association settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TextConfig {
    /// How far from a textbox to look for a shape to label.
    search_radius: f64,
}

impl Default for TextConfig {
    fn default() -> Self {
        Self { search_radius: 0.5 }
    }
}

impl TextConfig {
    /// Creates a new [`TextConfig`] with the given search radius.
    pub fn new(search_radius: f64) -> Self {
        Self { search_radius }
    }

    /// Returns the text search radius.
    pub fn search_radius(&self) -> f64 {
        self.search_radius
    }
}

/// Author-drawn connection settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConnectionsConfig {
    /// Whether author-drawn connections become edges.
    use_real: bool,
}

impl Default for ConnectionsConfig {
    fn default() -> Self {
        Self { use_real: true }
    }
}

impl ConnectionsConfig {
    /// Creates a new [`ConnectionsConfig`].
    pub fn new(use_real: bool) -> Self {
        Self { use_real }
    }

    /// Returns whether author-drawn connections are ingested.
    pub fn use_real(&self) -> bool {
        self.use_real
    }
}
