//! Common types shared across the mapsnap crates.
//!
//! This crate provides the value types passed between the rendering layers:
//! - [`LatLon`] - geographic coordinate in degrees
//! - [`FrameSize`] - fixed raster dimensions of a rendered frame
//! - [`RenderRequest`] - a viewport to render, with optional overlays

/// A geographic coordinate in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl LatLon {
    /// Create a new coordinate.
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Check that latitude is within [-90, 90] and longitude within [-180, 180].
    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lon)
    }
}

/// Dimensions of a rendered raster, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    /// Create a new frame size.
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Number of pixels in the frame.
    pub const fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Length in bytes of a tightly packed buffer with the given pixel size.
    pub const fn byte_len(&self, bytes_per_pixel: usize) -> usize {
        self.pixel_count() * bytes_per_pixel
    }

    /// Length in bytes of one tightly packed row.
    pub const fn row_len(&self, bytes_per_pixel: usize) -> usize {
        self.width as usize * bytes_per_pixel
    }

    /// True if either dimension is zero.
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl std::fmt::Display for FrameSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// A viewport to render.
///
/// Both overlays are optional and independent: a request may carry a point of
/// interest marker, a live-location marker, both, or neither.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderRequest {
    /// Center of the viewport.
    pub center: LatLon,
    /// Map zoom level.
    pub zoom: f64,
    /// Point of interest marker, echoed back in the rendered frame.
    pub poi: Option<LatLon>,
    /// Live-location marker.
    pub my_location: Option<LatLon>,
}

impl RenderRequest {
    /// Create a request without overlays.
    pub const fn new(center: LatLon, zoom: f64) -> Self {
        Self {
            center,
            zoom,
            poi: None,
            my_location: None,
        }
    }

    /// Attach a point of interest marker.
    #[must_use]
    pub const fn with_poi(mut self, poi: LatLon) -> Self {
        self.poi = Some(poi);
        self
    }

    /// Attach a live-location marker.
    #[must_use]
    pub const fn with_my_location(mut self, location: LatLon) -> Self {
        self.my_location = Some(location);
        self
    }

    /// Build a request from the flat argument list used by host bindings,
    /// where each overlay is a presence flag followed by its coordinates.
    #[allow(clippy::too_many_arguments)]
    pub fn from_flat(
        lat: f64,
        lon: f64,
        zoom: f64,
        has_poi: bool,
        poi_lat: f64,
        poi_lon: f64,
        has_location: bool,
        my_lat: f64,
        my_lon: f64,
    ) -> Self {
        Self {
            center: LatLon::new(lat, lon),
            zoom,
            poi: has_poi.then(|| LatLon::new(poi_lat, poi_lon)),
            my_location: has_location.then(|| LatLon::new(my_lat, my_lon)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lat_lon_validity() {
        assert!(LatLon::new(55.75, 37.61).is_valid());
        assert!(LatLon::new(-90.0, 180.0).is_valid());
        assert!(!LatLon::new(90.5, 0.0).is_valid());
        assert!(!LatLon::new(0.0, -180.1).is_valid());
        assert!(!LatLon::new(f64::NAN, 0.0).is_valid());
    }

    #[test]
    fn test_frame_size() {
        let size = FrameSize::new(320, 240);
        assert_eq!(size.pixel_count(), 76_800);
        assert_eq!(size.byte_len(4), 307_200);
        assert_eq!(size.row_len(4), 1280);
        assert!(!size.is_empty());
        assert!(FrameSize::new(0, 10).is_empty());
        assert_eq!(size.to_string(), "320x240");
    }

    #[test]
    fn test_request_overlays() {
        let request = RenderRequest::new(LatLon::new(1.0, 2.0), 14.0)
            .with_poi(LatLon::new(1.5, 2.5));
        assert_eq!(request.poi, Some(LatLon::new(1.5, 2.5)));
        assert_eq!(request.my_location, None);
    }

    #[test]
    fn test_request_from_flat() {
        let request = RenderRequest::from_flat(10.0, 20.0, 12.0, false, 1.0, 2.0, true, 3.0, 4.0);
        assert_eq!(request.center, LatLon::new(10.0, 20.0));
        assert_eq!(request.zoom, 12.0);
        assert_eq!(request.poi, None);
        assert_eq!(request.my_location, Some(LatLon::new(3.0, 4.0)));
    }
}
