use crate::crs::{CoordinateSystem, EPSG};
use crate::layer::{LayerId, LayerManager};

/// Everything a single batch needs to know about the user's choices.
///
/// Built fresh for every invocation; nothing is carried over between batches.
///
/// ```rust
/// use proj_batch::{LayerId, ReprojectionConfig};
///
/// let config = ReprojectionConfig::builder()
///     .source_code("4326")
///     .target_code("2154")
///     .layers([LayerId(0), LayerId(1)])
///     .build();
/// assert_eq!(config.authority, "EPSG");
/// assert!(!config.is_noop());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReprojectionConfig {
    /// Registry the codes belong to, e.g. `EPSG` or `IGNF`.
    pub authority: String,
    pub source_code: Option<String>,
    pub target_code: Option<String>,
    /// Selected layers, in selection order.
    pub layers: Vec<LayerId>,
    /// Name under which the edit appears in the undo history.
    pub edit_name: String,
}

impl Default for ReprojectionConfig {
    fn default() -> Self {
        ReprojectionConfig {
            authority: EPSG.to_string(),
            source_code: None,
            target_code: None,
            layers: Vec::new(),
            edit_name: "Coordinate transformation".to_string(),
        }
    }
}

impl ReprojectionConfig {
    pub fn builder() -> ReprojectionConfigBuilder {
        ReprojectionConfigBuilder::default()
    }

    /// Source and target codes are identical: the batch has nothing to do.
    pub fn is_noop(&self) -> bool {
        matches!((&self.source_code, &self.target_code), (Some(s), Some(t)) if s == t)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReprojectionConfigBuilder {
    config: ReprojectionConfig,
}

impl ReprojectionConfigBuilder {
    pub fn authority(mut self, authority: impl Into<String>) -> Self {
        self.config.authority = authority.into();
        self
    }

    pub fn source_code(mut self, code: impl Into<String>) -> Self {
        self.config.source_code = Some(code.into());
        self
    }

    pub fn target_code(mut self, code: impl Into<String>) -> Self {
        self.config.target_code = Some(code.into());
        self
    }

    pub fn layer(mut self, layer: LayerId) -> Self {
        self.config.layers.push(layer);
        self
    }

    pub fn layers(mut self, layers: impl IntoIterator<Item = LayerId>) -> Self {
        self.config.layers.extend(layers);
        self
    }

    pub fn edit_name(mut self, name: impl Into<String>) -> Self {
        self.config.edit_name = name.into();
        self
    }

    pub fn build(self) -> ReprojectionConfig {
        self.config
    }
}

/// Pre-fill for the source code, taken from the first selected layer.
///
/// Uses the layer CRS EPSG code. An unspecified CRS yields `"0"`, unless the
/// layer carries an SRID tag, which then wins. `None` when nothing is
/// selected, the layer has no CRS, or its CRS has no EPSG code.
pub fn suggest_source_code(layers: &LayerManager, selection: &[LayerId]) -> Option<String> {
    let layer = layers.layer(*selection.first()?)?;
    match layer.crs.as_ref()? {
        CoordinateSystem::Unspecified => Some(
            layer
                .srid_style
                .map_or_else(|| "0".to_string(), |style| style.srid.to_string()),
        ),
        cs @ CoordinateSystem::Defined(_) => cs.epsg_code().ok().map(|code| code.to_string()),
    }
}
