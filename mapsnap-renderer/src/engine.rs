//! The map drawing engine as seen by the renderer.

use mapsnap_common::RenderRequest;

/// A map engine that draws into whatever graphics context is current.
///
/// The renderer only calls these methods while holding its lock, and calls
/// [`render_map`](Self::render_map) only while its context is current on the
/// calling thread. Implementations need not be reentrant.
pub trait MapEngine: Send {
    /// Draw the viewport described by `request` into the current surface.
    ///
    /// Returns false if nothing usable was drawn.
    fn render_map(&mut self, request: &RenderRequest) -> bool;

    /// Drop cached map data so the next render reloads it from disk.
    fn invalidate_map_data(&mut self);

    /// Drop cached bookmark data so the next render reloads it from disk.
    fn invalidate_bookmark_data(&mut self);
}

impl<E: MapEngine + ?Sized> MapEngine for Box<E> {
    fn render_map(&mut self, request: &RenderRequest) -> bool {
        (**self).render_map(request)
    }

    fn invalidate_map_data(&mut self) {
        (**self).invalidate_map_data();
    }

    fn invalidate_bookmark_data(&mut self) {
        (**self).invalidate_bookmark_data();
    }
}
