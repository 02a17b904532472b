//! End-to-end render tests against the scripted fake platform.

use mapsnap_common::{FrameSize, LatLon, RenderRequest};
use mapsnap_context::fake::{FakeCall, FakePlatform};
use mapsnap_renderer::{DataKind, InvalidationSink, MapEngine, RendererConfig, SurfaceRenderer};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

const RED: [u8; 4] = [255, 0, 0, 255];
const GREEN: [u8; 4] = [0, 255, 0, 255];
const BLUE: [u8; 4] = [0, 0, 255, 255];
const WHITE: [u8; 4] = [255, 255, 255, 255];

/// Engine that checks it owns the context whenever it draws.
struct ExclusiveEngine {
    platform: FakePlatform,
    inside: Arc<AtomicBool>,
    violations: Arc<AtomicUsize>,
}

impl MapEngine for ExclusiveEngine {
    fn render_map(&mut self, request: &RenderRequest) -> bool {
        if self.inside.swap(true, Ordering::SeqCst) {
            self.violations.fetch_add(1, Ordering::SeqCst);
        }
        if self.platform.current_thread() != Some(thread::current().id()) {
            self.violations.fetch_add(1, Ordering::SeqCst);
        }
        thread::yield_now();
        self.inside.store(false, Ordering::SeqCst);
        request.center.is_valid()
    }

    fn invalidate_map_data(&mut self) {
        if self.inside.load(Ordering::SeqCst) {
            self.violations.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn invalidate_bookmark_data(&mut self) {
        if self.inside.load(Ordering::SeqCst) {
            self.violations.fetch_add(1, Ordering::SeqCst);
        }
    }
}

fn config(width: u32, height: u32) -> RendererConfig {
    RendererConfig::builder().frame_size(width, height).build().unwrap()
}

#[test]
fn test_concurrent_renders_never_share_context() {
    let platform = FakePlatform::default();
    let violations = Arc::new(AtomicUsize::new(0));
    let engine = ExclusiveEngine {
        platform: platform.clone(),
        inside: Arc::new(AtomicBool::new(false)),
        violations: Arc::clone(&violations),
    };
    let renderer = Arc::new(SurfaceRenderer::create(&config(16, 16), platform.clone(), |_| Ok(engine)).unwrap());
    platform.clear_calls();

    let workers: Vec<_> = (0..6)
        .map(|i| {
            let renderer = Arc::clone(&renderer);
            thread::spawn(move || {
                for j in 0..10 {
                    let request = RenderRequest::new(LatLon::new(10.0 + f64::from(i), f64::from(j)), 12.0);
                    let frame = renderer.render_viewport(request).unwrap();
                    assert!(frame.is_rendered());
                    if j % 3 == 0 {
                        renderer.data_changed(DataKind::MapData);
                    }
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    assert_eq!(violations.load(Ordering::SeqCst), 0);
    assert!(!platform.overlap_detected());

    // Every bind is followed by a release on the same thread before the next bind.
    let bindings: Vec<_> = platform
        .calls()
        .into_iter()
        .filter(|c| matches!(c, FakeCall::MakeCurrent(_) | FakeCall::ReleaseCurrent(_)))
        .collect();
    assert_eq!(bindings.len(), 2 * 60);
    for pair in bindings.chunks_exact(2) {
        match pair {
            [FakeCall::MakeCurrent(bound), FakeCall::ReleaseCurrent(released)] => assert_eq!(bound, released),
            other => panic!("interleaved bind/release: {other:?}"),
        }
    }

    let stats = renderer.stats();
    assert_eq!(stats.renders, 60);
    assert_eq!(stats.bitmaps(), 60);
    assert_eq!(stats.map_invalidations, 24);
}

#[test]
fn test_quadrants_flip_and_swap() {
    let size = FrameSize::new(8, 4);
    let platform = FakePlatform::default();
    // GL coordinates: y = 0 is the bottom row.
    platform.paint(size, |x, y| match (x < 4, y < 2) {
        (true, true) => RED,
        (false, true) => GREEN,
        (true, false) => BLUE,
        (false, false) => WHITE,
    });
    let renderer = SurfaceRenderer::create(&config(8, 4), platform, |_| {
        Ok(ExclusiveEngine {
            platform: FakePlatform::default(),
            inside: Arc::new(AtomicBool::new(false)),
            violations: Arc::new(AtomicUsize::new(0)),
        })
    })
    .unwrap();

    let request = RenderRequest::new(LatLon::new(0.0, 0.0), 3.0);
    let bitmap = renderer.render_viewport(request).unwrap().bitmap.unwrap();

    // Top-left of the bitmap is the framebuffer's last row (GL y = h - 1),
    // stored BGRA so blue lands in byte 0.
    assert_eq!(bitmap.pixel(0, 0), [255, 0, 0, 255]);
    assert_eq!(bitmap.rgba_at(0, 0), BLUE);
    assert_eq!(bitmap.rgba_at(7, 0), WHITE);
    // GL row 0 ends up at the bottom.
    assert_eq!(bitmap.pixel(0, 3), [0, 0, 255, 255]);
    assert_eq!(bitmap.rgba_at(0, 3), RED);
    assert_eq!(bitmap.pixel(7, 3), GREEN);
}

#[test]
fn test_invalid_center_echoes_poi() {
    let platform = FakePlatform::default();
    let engine = ExclusiveEngine {
        platform: platform.clone(),
        inside: Arc::new(AtomicBool::new(false)),
        violations: Arc::new(AtomicUsize::new(0)),
    };
    let renderer = SurfaceRenderer::create(&config(4, 4), platform.clone(), |_| Ok(engine)).unwrap();

    let poi = LatLon::new(48.85, 2.35);
    let request = RenderRequest::from_flat(123.0, 0.0, 10.0, true, poi.lat, poi.lon, false, 0.0, 0.0);
    let frame = renderer.render_viewport(request).unwrap();

    assert!(frame.bitmap.is_none());
    assert_eq!(frame.poi, Some(poi));
    assert_eq!(platform.current_thread(), None);
}

/// One caller's work: each entry is a latitude to render, and whether to
/// signal a map data change afterwards.
fn request_stream() -> impl Strategy<Value = Vec<(f64, bool)>> {
    proptest::collection::vec((-120.0f64..120.0, any::<bool>()), 1..8)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_binds_and_releases_strictly_pair(
        streams in proptest::collection::vec(request_stream(), 1..6),
    ) {
        let platform = FakePlatform::default();
        let violations = Arc::new(AtomicUsize::new(0));
        let engine = ExclusiveEngine {
            platform: platform.clone(),
            inside: Arc::new(AtomicBool::new(false)),
            violations: Arc::clone(&violations),
        };
        let renderer = Arc::new(SurfaceRenderer::create(&config(8, 8), platform.clone(), |_| Ok(engine)).unwrap());
        platform.clear_calls();

        let total: usize = streams.iter().map(Vec::len).sum();
        let invalidations = streams.iter().flatten().filter(|(_, invalidate)| *invalidate).count();
        let workers: Vec<_> = streams
            .into_iter()
            .map(|stream| {
                let renderer = Arc::clone(&renderer);
                thread::spawn(move || {
                    for (lat, invalidate) in stream {
                        let request = RenderRequest::new(LatLon::new(lat, 0.0), 10.0);
                        let frame = renderer.render_viewport(request).unwrap();
                        assert_eq!(frame.is_rendered(), (-90.0..=90.0).contains(&lat));
                        if invalidate {
                            renderer.data_changed(DataKind::MapData);
                        }
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        prop_assert_eq!(violations.load(Ordering::SeqCst), 0);
        prop_assert!(!platform.overlap_detected());
        prop_assert_eq!(platform.current_thread(), None);

        let bindings: Vec<_> = platform
            .calls()
            .into_iter()
            .filter(|c| matches!(c, FakeCall::MakeCurrent(_) | FakeCall::ReleaseCurrent(_)))
            .collect();
        prop_assert_eq!(bindings.len(), 2 * total);
        for pair in bindings.chunks_exact(2) {
            match pair {
                [FakeCall::MakeCurrent(bound), FakeCall::ReleaseCurrent(released)] => {
                    prop_assert_eq!(bound, released);
                }
                other => {
                    prop_assert!(false, "interleaved bind/release: {:?}", other);
                }
            }
        }

        let stats = renderer.stats();
        prop_assert_eq!(stats.renders, total as u64);
        prop_assert_eq!(stats.map_invalidations, invalidations as u64);
    }
}
