//! Star-convex polygons reconstructed from radial distances.
//!
//! Vertex `k` of a polygon with origin `(x, y)` sits at
//! `(x + d_k cos θ_k, y + d_k sin θ_k)` with `θ_k = 2πk / R`, so vertices are
//! in increasing angular order and the signed shoelace area is non-negative.
//!
//! Every such polygon is the fan of triangles `(origin, v_k, v_k+1)`. The
//! triangles have disjoint interiors because each spans one ray sector of
//! less than π, so the overlap of two polygons is the sum of the overlaps of
//! their triangles, each a convex clip. Zero rays that pinch the boundary
//! at the origin only produce empty triangles.

use crate::geometry::bbox::Box2D;
use crate::util::math::{cross, dist2_to_segment, lerp, ray_sin_cos, sub};
use crate::util::{StarPolyError, StarPolyResult};

/// Squared distance under which a point counts as lying on a boundary.
const BOUNDARY_EPS2: f64 = 1e-14;

/// Precomputed unit directions for `R` uniformly spaced rays.
#[derive(Clone, Debug)]
pub struct RayTable {
    dirs: Vec<[f64; 2]>,
}

impl RayTable {
    /// Builds the table; fewer than three rays cannot enclose any area.
    pub fn new(n_rays: usize) -> StarPolyResult<Self> {
        if n_rays < 3 {
            return Err(StarPolyError::TooFewRays { n_rays });
        }
        let mut dirs = Vec::new();
        dirs.try_reserve_exact(n_rays)
            .map_err(|_| StarPolyError::CapacityExceeded { requested: n_rays })?;
        dirs.extend((0..n_rays).map(|k| {
            let (sin, cos) = ray_sin_cos(k, n_rays);
            [cos, sin]
        }));
        Ok(Self { dirs })
    }

    /// Number of rays.
    pub fn n_rays(&self) -> usize {
        self.dirs.len()
    }

    /// Unit direction `(cos θ_k, sin θ_k)` of ray `k`.
    pub fn dir(&self, k: usize) -> Option<[f64; 2]> {
        self.dirs.get(k).copied()
    }
}

/// Closed star-convex polygon around an origin point.
#[derive(Clone, Debug, PartialEq)]
pub struct StarPolygon {
    origin: [f64; 2],
    vertices: Vec<[f64; 2]>,
    area: f64,
}

impl StarPolygon {
    /// Builds the polygon whose vertex `k` lies `dists[k]` along ray `k`.
    pub fn from_rays(origin: [f64; 2], dists: &[f32], table: &RayTable) -> StarPolyResult<Self> {
        if dists.len() != table.n_rays() {
            return Err(StarPolyError::InvalidInput(
                "ray distance count does not match the ray table",
            ));
        }
        if dists.iter().any(|d| !d.is_finite() || *d < 0.0) {
            return Err(StarPolyError::InvalidInput(
                "ray distances must be finite and non-negative",
            ));
        }
        let vertices = dists
            .iter()
            .zip(&table.dirs)
            .map(|(&d, dir)| {
                let d = d as f64;
                [origin[0] + d * dir[0], origin[1] + d * dir[1]]
            })
            .collect();
        Ok(Self::from_parts(origin, vertices))
    }

    pub(crate) fn from_parts(origin: [f64; 2], vertices: Vec<[f64; 2]>) -> Self {
        let area = shoelace(&vertices).max(0.0);
        Self {
            origin,
            vertices,
            area,
        }
    }

    /// The point every ray starts from.
    pub fn origin(&self) -> [f64; 2] {
        self.origin
    }

    /// Vertices in angular order; the last one connects back to the first.
    pub fn vertices(&self) -> &[[f64; 2]] {
        &self.vertices
    }

    /// Enclosed area.
    pub fn area(&self) -> f64 {
        self.area
    }

    /// Integer bounding box (floor of minima, ceil of maxima).
    pub fn bbox(&self) -> Option<Box2D> {
        Box2D::enclosing(&self.vertices)
    }

    /// Returns `true` if `p` lies inside the polygon or on its boundary.
    ///
    /// A zero-area polygon contains exactly the points of its collapsed boundary.
    pub fn contains(&self, p: [f64; 2]) -> bool {
        if self
            .edges()
            .any(|(a, b)| dist2_to_segment(p, a, b) <= BOUNDARY_EPS2)
        {
            return true;
        }
        // Even-odd crossing test along +x.
        let mut inside = false;
        for (a, b) in self.edges() {
            if (a[1] > p[1]) != (b[1] > p[1]) {
                let x = a[0] + (p[1] - a[1]) * (b[0] - a[0]) / (b[1] - a[1]);
                if p[0] < x {
                    inside = !inside;
                }
            }
        }
        inside
    }

    fn edges(&self) -> impl Iterator<Item = ([f64; 2], [f64; 2])> + '_ {
        let n = self.vertices.len();
        (0..n).map(move |i| (self.vertices[i], self.vertices[(i + 1) % n]))
    }

    /// Fan triangles with positive area.
    fn fan(&self) -> impl Iterator<Item = Triangle> + '_ {
        self.edges()
            .map(move |(a, b)| Triangle::new(self.origin, a, b))
            .filter(|t| t.area > 0.0)
    }

    /// Exact area of the overlap of two polygons.
    pub fn intersection_area(&self, other: &StarPolygon) -> f64 {
        if self.area <= 0.0 || other.area <= 0.0 {
            return 0.0;
        }
        let mut clip = ConvexClip::default();
        let mut sum = 0.0;
        for mine in self.fan() {
            for theirs in other.fan() {
                if mine.bounds_overlap(&theirs) {
                    sum += clip.overlap(&mine, &theirs);
                }
            }
        }
        sum.clamp(0.0, self.area.min(other.area))
    }

    /// Intersection over union; zero when the union has no area.
    pub fn iou(&self, other: &StarPolygon) -> f64 {
        let inter = self.intersection_area(other);
        let union = self.area + other.area - inter;
        if union <= 0.0 {
            0.0
        } else {
            inter / union
        }
    }
}

fn shoelace(vertices: &[[f64; 2]]) -> f64 {
    let n = vertices.len();
    let mut sum = 0.0;
    for i in 0..n {
        sum += cross(vertices[i], vertices[(i + 1) % n]);
    }
    0.5 * sum
}

/// Counter-clockwise triangle with its bounds.
#[derive(Clone, Copy)]
struct Triangle {
    pts: [[f64; 2]; 3],
    min: [f64; 2],
    max: [f64; 2],
    area: f64,
}

impl Triangle {
    fn new(a: [f64; 2], b: [f64; 2], c: [f64; 2]) -> Self {
        Self {
            pts: [a, b, c],
            min: [a[0].min(b[0]).min(c[0]), a[1].min(b[1]).min(c[1])],
            max: [a[0].max(b[0]).max(c[0]), a[1].max(b[1]).max(c[1])],
            area: 0.5 * cross(sub(b, a), sub(c, a)),
        }
    }

    fn bounds_overlap(&self, other: &Triangle) -> bool {
        self.min[0] < other.max[0]
            && other.min[0] < self.max[0]
            && self.min[1] < other.max[1]
            && other.min[1] < self.max[1]
    }
}

/// Sutherland-Hodgman clipping of one triangle by another, with reusable buffers.
#[derive(Default)]
struct ConvexClip {
    poly: Vec<[f64; 2]>,
    next: Vec<[f64; 2]>,
}

impl ConvexClip {
    /// Area of `subject` clipped to the closed half-planes of `clip`'s edges.
    fn overlap(&mut self, subject: &Triangle, clip: &Triangle) -> f64 {
        self.poly.clear();
        self.poly.extend_from_slice(&subject.pts);
        for i in 0..3 {
            let a = clip.pts[i];
            let edge = sub(clip.pts[(i + 1) % 3], a);
            self.next.clear();
            let n = self.poly.len();
            for j in 0..n {
                let p = self.poly[j];
                let q = self.poly[(j + 1) % n];
                let sp = cross(edge, sub(p, a));
                let sq = cross(edge, sub(q, a));
                if sp >= 0.0 {
                    self.next.push(p);
                }
                if (sp > 0.0 && sq < 0.0) || (sp < 0.0 && sq > 0.0) {
                    self.next.push(lerp(p, q, sp / (sp - sq)));
                }
            }
            if self.next.len() < 3 {
                return 0.0;
            }
            std::mem::swap(&mut self.poly, &mut self.next);
        }
        shoelace(&self.poly).max(0.0)
    }
}
