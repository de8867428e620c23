// THEORY:
// The `region_extractor` is the engine of the spatial grouping stage. It turns the
// continuous ChangeMap into a short, ordered list of `Region`s.
//
// Algorithm steps:
// 1.  **Binarization**: every ChangeMap value above the significance threshold
//     (30 of 255 by default) becomes "on".
// 2.  **Cleanup**: a morphological close merges fragments of the same change, then
//     an open removes speckle. Both use the 5x5 elliptical element.
// 3.  **Region Growing**: the cleaned mask is scanned top-to-bottom, left-to-right.
//     Every unvisited "on" pixel seeds a breadth-first flood over its 8 neighbors.
//     The scan order fixes discovery order, so identical inputs always produce the
//     same numbering.
// 4.  **Noise Floor**: components smaller than a fixed share of the image (0.1%)
//     are dropped. This is a filter, not a severity decision.
// 5.  **Data Aggregation**: survivors get their bounding box, exact pixel count,
//     mean ChangeMap intensity over the box, and a 1-based identity.
//
// The extractor is stateless: one ChangeMap in, one `Extraction` out.

use crate::core_modules::differencer::ChangeMap;
use crate::core_modules::morphology::{self, OFF, ON, StructuringElement};
use crate::core_modules::region::{BoundingBox, Point, Region};
use crate::error::{Error, Result};
use image::{GrayImage, Luma};
use std::collections::VecDeque;
use tracing::debug;

/// ChangeMap values strictly above this are significant.
pub const DEFAULT_CHANGE_THRESHOLD: u8 = 30;
/// Components below this share of the image are noise.
pub const DEFAULT_MIN_REGION_FRACTION: f64 = 0.001;

const NEIGHBORS_8: [(i64, i64); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// Output of the extractor: the cleaned mask it worked on and the regions it kept.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub mask: GrayImage,
    pub regions: Vec<Region>,
}

/// A raw connected component, before filtering and numbering.
#[derive(Debug, Clone)]
pub struct Component {
    pub bounding_box: BoundingBox,
    pub pixels: Vec<Point>,
}

/// Marks every ChangeMap value strictly above `threshold` as "on".
pub fn binarize(change_map: &ChangeMap, threshold: u8) -> GrayImage {
    GrayImage::from_fn(change_map.width(), change_map.height(), |x, y| {
        if change_map.get_pixel(x, y)[0] > threshold {
            Luma([ON])
        } else {
            Luma([OFF])
        }
    })
}

/// Close then open with the 5x5 ellipse.
pub fn clean(mask: &GrayImage) -> GrayImage {
    let element = StructuringElement::ellipse_5x5();
    morphology::open(&morphology::close(mask, &element), &element)
}

/// Finds all 8-connected components, ordered by their first pixel in raster scan.
pub fn find_components(mask: &GrayImage) -> Vec<Component> {
    let (width, height) = mask.dimensions();
    let mut visited = vec![false; width as usize * height as usize];
    let mut components = Vec::new();

    for y in 0..height {
        for x in 0..width {
            let index = (y * width + x) as usize;
            if visited[index] || mask.get_pixel(x, y)[0] == OFF {
                continue;
            }
            components.push(grow_component(mask, &mut visited, Point { x, y }));
        }
    }

    components
}

/// Breadth-first flood from `seed` over "on" pixels.
fn grow_component(mask: &GrayImage, visited: &mut [bool], seed: Point) -> Component {
    let (width, height) = mask.dimensions();
    let mut pixels = Vec::new();
    let mut queue = VecDeque::from([seed]);
    visited[(seed.y * width + seed.x) as usize] = true;

    let mut min = seed;
    let mut max = seed;

    while let Some(current) = queue.pop_front() {
        pixels.push(current);
        min.x = min.x.min(current.x);
        min.y = min.y.min(current.y);
        max.x = max.x.max(current.x);
        max.y = max.y.max(current.y);

        for (dx, dy) in NEIGHBORS_8 {
            let nx = current.x as i64 + dx;
            let ny = current.y as i64 + dy;
            if nx < 0 || ny < 0 || nx >= width as i64 || ny >= height as i64 {
                continue;
            }
            let index = (ny * width as i64 + nx) as usize;
            if !visited[index] && mask.get_pixel(nx as u32, ny as u32)[0] != OFF {
                visited[index] = true;
                queue.push_back(Point { x: nx as u32, y: ny as u32 });
            }
        }
    }

    Component {
        bounding_box: BoundingBox::from_corners(min, max),
        pixels,
    }
}

/// Mean ChangeMap value inside `bbox`.
pub fn mean_intensity(change_map: &ChangeMap, bbox: &BoundingBox) -> f64 {
    let mut sum = 0u64;
    for y in bbox.y..bbox.bottom() {
        for x in bbox.x..bbox.right() {
            sum += change_map.get_pixel(x, y)[0] as u64;
        }
    }
    sum as f64 / bbox.area() as f64
}

/// Smallest pixel area a component may have and still count as a region.
pub fn noise_floor(width: u32, height: u32, min_region_fraction: f64) -> f64 {
    width as f64 * height as f64 * min_region_fraction
}

/// Whether a component of `area` pixels is kept. A component exactly at the floor
/// is kept: only areas strictly below it count as noise, unlike a `> floor` test.
pub fn clears_noise_floor(area: usize, floor: f64) -> bool {
    area as f64 >= floor
}

/// Runs binarization, cleanup, component search and noise filtering.
pub fn extract_regions(
    change_map: &ChangeMap,
    threshold: u8,
    min_region_fraction: f64,
) -> Result<Extraction> {
    let (width, height) = change_map.dimensions();
    if width == 0 || height == 0 {
        return Err(Error::Dimension { width, height });
    }

    let mask = clean(&binarize(change_map, threshold));
    let components = find_components(&mask);
    let floor = noise_floor(width, height, min_region_fraction);
    let found = components.len();

    let regions: Vec<Region> = components
        .into_iter()
        .filter(|component| clears_noise_floor(component.pixels.len(), floor))
        .enumerate()
        .map(|(position, component)| Region {
            index: position + 1,
            mean_intensity: mean_intensity(change_map, &component.bounding_box),
            bounding_box: component.bounding_box,
            area_pixels: component.pixels.len() as u64,
            pixels: component.pixels,
        })
        .collect();

    debug!(components = found, kept = regions.len(), floor, "regions extracted");

    for region in &regions {
        verify_region(region, width, height)?;
    }

    Ok(Extraction { mask, regions })
}

/// Checks the geometric contract every region must satisfy.
pub fn verify_region(region: &Region, width: u32, height: u32) -> Result<()> {
    let bbox = region.bounding_box;
    if !bbox.fits_within(width, height) {
        return Err(Error::InternalInvariant(format!(
            "region {} bounding box {:?} exceeds {}x{} image",
            region.label(),
            bbox,
            width,
            height
        )));
    }
    if region.area_pixels > bbox.area() {
        return Err(Error::InternalInvariant(format!(
            "region {} covers {} pixels but its bounding box holds {}",
            region.label(),
            region.area_pixels,
            bbox.area()
        )));
    }
    Ok(())
}
