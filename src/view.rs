use geo_types::Rect;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ViewError {
    #[error("The view transform is not invertible")]
    NoninvertibleTransform,
    #[error("Cannot zoom to extent: {0}")]
    Other(String),
}

/// Display surface refreshed after layers change.
pub trait Viewport {
    /// Fit the view to `extent`, the union of all layer envelopes (`None` when
    /// every layer is empty).
    fn zoom_to_full_extent(&mut self, extent: Option<Rect<f64>>) -> Result<(), ViewError>;
}

/// A viewport with nothing to refresh.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullViewport;

impl Viewport for NullViewport {
    fn zoom_to_full_extent(&mut self, _extent: Option<Rect<f64>>) -> Result<(), ViewError> {
        Ok(())
    }
}
