//! Triangle meshes: the boundary representation handed to exporters.
//!
//! Converting a polygon soup to a mesh welds coincident vertices, splits
//! edges at T-junctions left behind by BSP clipping and triangulates. After
//! that a closed solid shares every edge between exactly two triangles.

use std::collections::{HashMap, HashSet};

use crate::bbox::BoundingBox;
use crate::bsp::Polygon;
use crate::math::{Point3, Vec3};

/// Upper bound on T-junction repair passes. One pass normally suffices.
const MAX_REPAIR_PASSES: usize = 4;

/// An indexed triangle mesh.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TriangleMesh {
    /// Vertex positions.
    pub positions: Vec<Point3>,
    /// Triangles as counter-clockwise (outward) index triples.
    pub triangles: Vec<[u32; 3]>,
}

impl TriangleMesh {
    /// Number of triangles.
    pub fn num_triangles(&self) -> usize {
        self.triangles.len()
    }

    /// Number of vertices.
    pub fn num_vertices(&self) -> usize {
        self.positions.len()
    }

    /// True if the mesh has no triangles.
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Signed volume (divergence theorem). Positive for outward winding.
    pub fn volume(&self) -> f64 {
        self.triangles
            .iter()
            .map(|t| {
                let [a, b, c] = t.map(|i| self.positions[i as usize].coords);
                a.dot(&b.cross(&c))
            })
            .sum::<f64>()
            / 6.0
    }

    /// Bounding box of the vertices referenced by triangles.
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        BoundingBox::from_points(
            self.triangles
                .iter()
                .flatten()
                .map(|&i| &self.positions[i as usize]),
        )
    }

    /// Number of edges not shared by exactly two oppositely oriented
    /// triangles. Zero for a watertight, consistently oriented surface.
    pub fn boundary_edges(&self) -> usize {
        let mut uses: HashMap<(u32, u32), (u32, u32)> = HashMap::new();
        for t in &self.triangles {
            for (a, b) in [(t[0], t[1]), (t[1], t[2]), (t[2], t[0])] {
                let entry = uses.entry((a.min(b), a.max(b))).or_default();
                if a < b {
                    entry.0 += 1;
                } else {
                    entry.1 += 1;
                }
            }
        }
        uses.values().filter(|&&u| u != (1, 1)).count()
    }

    /// Flat `[x0, y0, z0, x1, ...]` positions in single precision.
    pub fn flat_vertices(&self) -> Vec<f32> {
        self.positions
            .iter()
            .flat_map(|p| [p.x as f32, p.y as f32, p.z as f32])
            .collect()
    }

    /// Flat `[i0, i1, i2, ...]` triangle indices.
    pub fn flat_indices(&self) -> Vec<u32> {
        self.triangles.iter().flatten().copied().collect()
    }

    /// Build a mesh from convex polygons, merging vertices closer than
    /// `tolerance`.
    pub(crate) fn from_polygons(polygons: &[Polygon], tolerance: f64) -> Self {
        let mut welder = Welder::new(tolerance);
        let mut faces: Vec<Vec<u32>> = polygons
            .iter()
            .filter_map(|poly| {
                let mut face: Vec<u32> = poly.vertices.iter().map(|v| welder.insert(*v)).collect();
                face.dedup();
                while face.len() > 1 && face.first() == face.last() {
                    face.pop();
                }
                (face.len() >= 3).then_some(face)
            })
            .collect();
        let mut positions = welder.positions;

        // Slivers collapsed by welding carry no area and would pair edges
        // with themselves.
        faces.retain(|f| face_area(f, &positions) > tolerance * tolerance);

        let split = repair_t_junctions(&mut faces, &positions, tolerance);

        let mut triangles = Vec::new();
        for (face, was_split) in faces.iter().zip(split) {
            let n = face.len();
            if n == 3 {
                triangles.push([face[0], face[1], face[2]]);
            } else if !was_split {
                for i in 1..n - 1 {
                    triangles.push([face[0], face[i], face[i + 1]]);
                }
            } else {
                // Inserted vertices are collinear with their neighbours, so
                // fan from the centroid to avoid zero-area triangles.
                let centroid = face
                    .iter()
                    .fold(Vec3::zeros(), |acc, &i| acc + positions[i as usize].coords)
                    / n as f64;
                let c = positions.len() as u32;
                positions.push(Point3::from(centroid));
                for i in 0..n {
                    triangles.push([face[i], face[(i + 1) % n], c]);
                }
            }
        }

        Self {
            positions,
            triangles,
        }
    }
}

/// Spatial hash that merges points within a tolerance.
struct Welder {
    tolerance: f64,
    grid: HashMap<[i64; 3], Vec<u32>>,
    positions: Vec<Point3>,
}

impl Welder {
    fn new(tolerance: f64) -> Self {
        Self {
            tolerance,
            grid: HashMap::new(),
            positions: Vec::new(),
        }
    }

    fn cell(&self, p: &Point3) -> [i64; 3] {
        [
            (p.x / self.tolerance).floor() as i64,
            (p.y / self.tolerance).floor() as i64,
            (p.z / self.tolerance).floor() as i64,
        ]
    }

    fn insert(&mut self, p: Point3) -> u32 {
        let [cx, cy, cz] = self.cell(&p);
        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    if let Some(ids) = self.grid.get(&[cx + dx, cy + dy, cz + dz]) {
                        for &id in ids {
                            if (self.positions[id as usize] - p).norm() <= self.tolerance {
                                return id;
                            }
                        }
                    }
                }
            }
        }
        let id = self.positions.len() as u32;
        self.positions.push(p);
        self.grid.entry([cx, cy, cz]).or_default().push(id);
        id
    }
}

fn face_area(face: &[u32], positions: &[Point3]) -> f64 {
    let origin = positions[face[0] as usize];
    let mut normal = Vec3::zeros();
    for i in 1..face.len() - 1 {
        let a = positions[face[i] as usize] - origin;
        let b = positions[face[i + 1] as usize] - origin;
        normal += a.cross(&b);
    }
    normal.norm() / 2.0
}

/// Insert vertices that lie on unmatched edges into those edges.
///
/// Returns, per face, whether any vertex was inserted.
fn repair_t_junctions(faces: &mut [Vec<u32>], positions: &[Point3], tolerance: f64) -> Vec<bool> {
    let mut split = vec![false; faces.len()];
    for _ in 0..MAX_REPAIR_PASSES {
        let directed: HashSet<(u32, u32)> = faces.iter().flat_map(|f| face_edges(f)).collect();
        let open: HashSet<(u32, u32)> = directed
            .iter()
            .filter(|&&(a, b)| !directed.contains(&(b, a)))
            .copied()
            .collect();
        if open.is_empty() {
            break;
        }
        // A T-junction vertex is always an endpoint of some other open edge.
        let mut candidates: Vec<u32> = open.iter().flat_map(|&(a, b)| [a, b]).collect();
        candidates.sort_unstable();
        candidates.dedup();

        let mut changed = false;
        for (face, flag) in faces.iter_mut().zip(split.iter_mut()) {
            let n = face.len();
            let mut out = Vec::with_capacity(n);
            let mut face_changed = false;
            for i in 0..n {
                let (a, b) = (face[i], face[(i + 1) % n]);
                out.push(a);
                if !open.contains(&(a, b)) {
                    continue;
                }
                let mut on_edge = vertices_on_segment(a, b, &candidates, positions, tolerance);
                if !on_edge.is_empty() {
                    on_edge.sort_by(|x, y| x.0.total_cmp(&y.0));
                    out.extend(on_edge.into_iter().map(|(_, k)| k));
                    face_changed = true;
                }
            }
            if face_changed {
                *face = out;
                *flag = true;
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }
    split
}

fn face_edges(face: &[u32]) -> impl Iterator<Item = (u32, u32)> + '_ {
    (0..face.len()).map(move |i| (face[i], face[(i + 1) % face.len()]))
}

/// Candidates strictly inside segment `a–b`, with their parameter along it.
fn vertices_on_segment(
    a: u32,
    b: u32,
    candidates: &[u32],
    positions: &[Point3],
    tolerance: f64,
) -> Vec<(f64, u32)> {
    let pa = positions[a as usize];
    let pb = positions[b as usize];
    let ab = pb - pa;
    let len = ab.norm();
    if len <= tolerance {
        return Vec::new();
    }
    let lo = pa.inf(&pb) - Vec3::repeat(tolerance);
    let hi = pa.sup(&pb) + Vec3::repeat(tolerance);
    candidates
        .iter()
        .filter(|&&k| k != a && k != b)
        .filter_map(|&k| {
            let p = positions[k as usize];
            if (0..3).any(|i| p[i] < lo[i] || p[i] > hi[i]) {
                return None;
            }
            let along = (p - pa).dot(&ab) / len;
            if along <= tolerance || along >= len - tolerance {
                return None;
            }
            let off_line = ((p - pa) - ab * (along / len)).norm();
            (off_line <= tolerance).then_some((along / len, k))
        })
        .collect()
}
