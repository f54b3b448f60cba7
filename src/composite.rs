use crate::catalog::Catalog;
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::PathBuf;

/// Minimum alpha (out of 255) for a pixel to count as part of an overlay.
pub const ALPHA_THRESHOLD: u8 = 20;

/// Source of raw image bytes for overlay assets. The disk implementation
/// reads from a static-asset root; tests feed in-memory images.
pub trait AssetSource {
    fn load(&self, path: &str) -> Result<Vec<u8>>;
}

/// Assets laid out on disk under a root directory, addressed by the same
/// root-relative paths the catalog derives.
pub struct DiskAssets {
    root: PathBuf,
}

impl DiskAssets {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl AssetSource for DiskAssets {
    fn load(&self, path: &str) -> Result<Vec<u8>> {
        let full = self.root.join(path);
        std::fs::read(&full).with_context(|| format!("read asset {}", full.display()))
    }
}

/// Decoded opacity map of one overlay image: just the alpha channel, one
/// sample per pixel.
pub struct AlphaMap {
    width: u32,
    height: u32,
    alpha: Vec<u8>,
}

impl AlphaMap {
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let image = image::load_from_memory(bytes).context("decode overlay image")?;
        let rgba = image.to_rgba8();
        let (width, height) = rgba.dimensions();
        let alpha = rgba.pixels().map(|px| px.0[3]).collect();
        Ok(Self {
            width,
            height,
            alpha,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn alpha_at(&self, x: u32, y: u32) -> u8 {
        if x >= self.width || y >= self.height {
            return 0;
        }
        self.alpha[(y * self.width + x) as usize]
    }
}

/// Pointer position relative to the composite element, together with the
/// element's current box size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalPoint {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Map an element-relative point into image pixel coordinates under
/// contain-fit scaling: aspect preserved, centered, letterboxed. Returns
/// `None` when the point falls outside the drawn image.
pub fn map_contain(point: &LocalPoint, image_w: u32, image_h: u32) -> Option<(u32, u32)> {
    if image_w == 0 || image_h == 0 || point.width <= 0.0 || point.height <= 0.0 {
        return None;
    }

    let scale = (point.width / image_w as f32).min(point.height / image_h as f32);
    let draw_w = image_w as f32 * scale;
    let draw_h = image_h as f32 * scale;
    let off_x = (point.width - draw_w) / 2.0;
    let off_y = (point.height - draw_h) / 2.0;

    let in_x = point.x - off_x;
    let in_y = point.y - off_y;
    if in_x < 0.0 || in_y < 0.0 || in_x > draw_w || in_y > draw_h {
        return None;
    }

    let px = ((in_x / scale).floor() as i64).clamp(0, i64::from(image_w) - 1) as u32;
    let py = ((in_y / scale).floor() as i64).clamp(0, i64::from(image_h) - 1) as u32;
    Some((px, py))
}

/// Opacity maps of one composite, in catalog z-order.
pub struct CompositeMap {
    overlays: Vec<(String, AlphaMap)>,
}

impl CompositeMap {
    /// Resolve a pointer position to the first overlay that is opaque at the
    /// mapped pixel. Out-of-bounds points skip to the next overlay.
    pub fn hit(&self, point: &LocalPoint) -> Option<&str> {
        for (key, map) in &self.overlays {
            let Some((px, py)) = map_contain(point, map.width(), map.height()) else {
                continue;
            };
            if map.alpha_at(px, py) > ALPHA_THRESHOLD {
                return Some(key);
            }
        }
        None
    }

    pub fn overlay_count(&self) -> usize {
        self.overlays.len()
    }
}

/// Lazily built, page-lifetime cache of composite opacity maps. Assets are
/// static, so entries are never invalidated.
#[derive(Default)]
pub struct CompositeHitCache {
    maps: HashMap<String, CompositeMap>,
}

impl CompositeHitCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode the overlays of one composite. A failed load or decode
    /// excludes only that overlay; the rest stay hit-testable.
    pub fn build(&mut self, catalog: &Catalog, composite_id: &str, assets: &dyn AssetSource) {
        let Some(meta) = catalog.item(composite_id) else {
            tracing::warn!(composite_id, "composite missing from catalog, no hit map");
            return;
        };

        let mut overlays = Vec::new();
        for overlay in meta.behavior.overlays() {
            let path = catalog.asset_path(&overlay.asset);
            let map = assets
                .load(&path)
                .and_then(|bytes| AlphaMap::decode(&bytes));
            match map {
                Ok(map) => overlays.push((overlay.key.clone(), map)),
                Err(err) => {
                    tracing::warn!(
                        composite_id,
                        overlay = %overlay.key,
                        error = %err,
                        "overlay excluded from hit map"
                    );
                }
            }
        }

        self.maps
            .insert(composite_id.to_string(), CompositeMap { overlays });
    }

    /// Build hit maps for every composite in the catalog.
    pub fn build_all(&mut self, catalog: &Catalog, assets: &dyn AssetSource) {
        let ids: Vec<String> = catalog
            .items
            .iter()
            .filter(|item| item.behavior.is_composite())
            .map(|item| item.id.clone())
            .collect();
        for id in ids {
            self.build(catalog, &id, assets);
        }
    }

    pub fn is_ready(&self, composite_id: &str) -> bool {
        self.maps
            .get(composite_id)
            .map(|map| map.overlay_count() > 0)
            .unwrap_or(false)
    }

    /// Resolve a point against a composite's maps. `None` while the cache
    /// is not built yet, so early interactions silently miss.
    pub fn resolve(&self, composite_id: &str, point: &LocalPoint) -> Option<&str> {
        self.maps.get(composite_id)?.hit(point)
    }
}

#[cfg(test)]
mod tests {
    use super::{map_contain, AlphaMap, CompositeMap, LocalPoint};

    fn square(width: f32, height: f32, x: f32, y: f32) -> LocalPoint {
        LocalPoint {
            x,
            y,
            width,
            height,
        }
    }

    #[test]
    fn contain_mapping_centers_and_letterboxes() {
        // 10x10 image in a 200x100 box: drawn 100x100, offset 50 on x.
        assert_eq!(map_contain(&square(200.0, 100.0, 49.0, 50.0), 10, 10), None);
        assert_eq!(
            map_contain(&square(200.0, 100.0, 50.0, 0.0), 10, 10),
            Some((0, 0))
        );
        assert_eq!(
            map_contain(&square(200.0, 100.0, 149.9, 99.9), 10, 10),
            Some((9, 9))
        );
        assert_eq!(map_contain(&square(200.0, 100.0, 151.0, 50.0), 10, 10), None);
    }

    #[test]
    fn contain_mapping_rejects_degenerate_boxes() {
        assert_eq!(map_contain(&square(0.0, 100.0, 0.0, 0.0), 10, 10), None);
        assert_eq!(map_contain(&square(100.0, 100.0, 0.0, 0.0), 0, 10), None);
    }

    #[test]
    fn alpha_lookup_is_zero_outside_bounds() {
        let map = AlphaMap {
            width: 2,
            height: 1,
            alpha: vec![0, 200],
        };
        assert_eq!(map.alpha_at(1, 0), 200);
        assert_eq!(map.alpha_at(2, 0), 0);
        assert_eq!(map.alpha_at(0, 1), 0);
    }

    #[test]
    fn hit_walks_overlays_in_order() {
        let top = AlphaMap {
            width: 2,
            height: 1,
            alpha: vec![255, 0],
        };
        let bottom = AlphaMap {
            width: 2,
            height: 1,
            alpha: vec![255, 255],
        };
        let map = CompositeMap {
            overlays: vec![("top".into(), top), ("bottom".into(), bottom)],
        };

        // Both opaque at pixel 0: the first overlay wins.
        let left = square(2.0, 1.0, 0.5, 0.5);
        assert_eq!(map.hit(&left), Some("top"));

        // Only the bottom layer is opaque at pixel 1.
        let right = square(2.0, 1.0, 1.5, 0.5);
        assert_eq!(map.hit(&right), Some("bottom"));
    }

    #[test]
    fn transparent_pixels_miss() {
        let only = AlphaMap {
            width: 1,
            height: 1,
            alpha: vec![super::ALPHA_THRESHOLD],
        };
        let map = CompositeMap {
            overlays: vec![("only".into(), only)],
        };
        // Exactly at the threshold does not count as a hit.
        assert_eq!(map.hit(&square(1.0, 1.0, 0.5, 0.5)), None);
    }
}
