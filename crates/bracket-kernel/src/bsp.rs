//! BSP-tree boolean operations on convex polygon soups.
//!
//! Each solid is a closed set of convex, outward-wound polygons. A boolean
//! builds a BSP tree per operand, clips each operand's polygons against the
//! other tree and merges what survives. Coplanar polygons are routed by
//! orientation, so touching solids fuse and flush cuts open cleanly.
//!
//! All tree walks use explicit stacks; polygon counts in a bracket reach the
//! thousands and tree depth follows polygon count in the worst case.

use crate::math::{Point3, Vec3};

/// Distance under which a vertex counts as lying on a splitting plane.
pub(crate) const PLANE_EPSILON: f64 = 1e-5;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Plane {
    pub(crate) normal: Vec3,
    pub(crate) w: f64,
}

impl Plane {
    /// Plane of a polygon by Newell's method; `None` for degenerate loops.
    fn from_vertices(vertices: &[Point3]) -> Option<Plane> {
        let mut normal = Vec3::zeros();
        let mut centroid = Vec3::zeros();
        for (i, a) in vertices.iter().enumerate() {
            let b = &vertices[(i + 1) % vertices.len()];
            normal.x += (a.y - b.y) * (a.z + b.z);
            normal.y += (a.z - b.z) * (a.x + b.x);
            normal.z += (a.x - b.x) * (a.y + b.y);
            centroid += a.coords;
        }
        let len = normal.norm();
        if len < 1e-12 {
            return None;
        }
        let normal = normal / len;
        let centroid = centroid / vertices.len() as f64;
        Some(Plane {
            w: normal.dot(&centroid),
            normal,
        })
    }

    fn flip(&mut self) {
        self.normal = -self.normal;
        self.w = -self.w;
    }

    fn classify(&self, p: &Point3) -> Side {
        let t = self.normal.dot(&p.coords) - self.w;
        if t < -PLANE_EPSILON {
            Side::Back
        } else if t > PLANE_EPSILON {
            Side::Front
        } else {
            Side::Coplanar
        }
    }

    /// Split `polygon` by this plane.
    fn split(&self, polygon: Polygon) -> Split {
        let sides: Vec<Side> = polygon
            .vertices
            .iter()
            .map(|v| self.classify(v))
            .collect();
        let has_front = sides.contains(&Side::Front);
        let has_back = sides.contains(&Side::Back);

        match (has_front, has_back) {
            (false, false) => {
                if self.normal.dot(&polygon.plane.normal) > 0.0 {
                    Split::CoplanarFront(polygon)
                } else {
                    Split::CoplanarBack(polygon)
                }
            }
            (true, false) => Split::Front(polygon),
            (false, true) => Split::Back(polygon),
            (true, true) => {
                let n = polygon.vertices.len();
                let mut front = Vec::with_capacity(n + 1);
                let mut back = Vec::with_capacity(n + 1);
                for i in 0..n {
                    let j = (i + 1) % n;
                    let (si, sj) = (sides[i], sides[j]);
                    let vi = polygon.vertices[i];
                    let vj = polygon.vertices[j];
                    if si != Side::Back {
                        front.push(vi);
                    }
                    if si != Side::Front {
                        back.push(vi);
                    }
                    let crosses = matches!(
                        (si, sj),
                        (Side::Front, Side::Back) | (Side::Back, Side::Front)
                    );
                    if crosses {
                        let t = (self.w - self.normal.dot(&vi.coords))
                            / self.normal.dot(&(vj - vi));
                        let v = vi + (vj - vi) * t;
                        front.push(v);
                        back.push(v);
                    }
                }
                Split::Spanning {
                    front: Polygon::with_plane(front, polygon.plane.clone()),
                    back: Polygon::with_plane(back, polygon.plane),
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Coplanar,
    Front,
    Back,
}

enum Split {
    CoplanarFront(Polygon),
    CoplanarBack(Polygon),
    Front(Polygon),
    Back(Polygon),
    Spanning {
        front: Option<Polygon>,
        back: Option<Polygon>,
    },
}

/// A convex planar polygon, counter-clockwise when seen from outside.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Polygon {
    pub(crate) vertices: Vec<Point3>,
    pub(crate) plane: Plane,
}

impl Polygon {
    /// Build a polygon, computing its plane. `None` if degenerate.
    pub(crate) fn new(vertices: Vec<Point3>) -> Option<Polygon> {
        if vertices.len() < 3 {
            return None;
        }
        let plane = Plane::from_vertices(&vertices)?;
        Some(Polygon { vertices, plane })
    }

    fn with_plane(vertices: Vec<Point3>, plane: Plane) -> Option<Polygon> {
        (vertices.len() >= 3).then_some(Polygon { vertices, plane })
    }

    pub(crate) fn flip(&mut self) {
        self.vertices.reverse();
        self.plane.flip();
    }
}

/// A node of a BSP tree. The root of an empty tree has no plane.
#[derive(Debug, Default)]
pub(crate) struct Node {
    plane: Option<Plane>,
    front: Option<Box<Node>>,
    back: Option<Box<Node>>,
    polygons: Vec<Polygon>,
}

impl Node {
    pub(crate) fn new(polygons: Vec<Polygon>) -> Node {
        let mut node = Node::default();
        node.build(polygons);
        node
    }

    /// Convert solid space to empty space and vice versa.
    pub(crate) fn invert(&mut self) {
        let mut stack: Vec<&mut Node> = vec![self];
        while let Some(node) = stack.pop() {
            let Node {
                plane,
                front,
                back,
                polygons,
            } = node;
            for p in polygons.iter_mut() {
                p.flip();
            }
            if let Some(plane) = plane {
                plane.flip();
            }
            std::mem::swap(front, back);
            if let Some(f) = front {
                stack.push(f.as_mut());
            }
            if let Some(b) = back {
                stack.push(b.as_mut());
            }
        }
    }

    /// Remove the parts of `polygons` that lie inside this tree's solid.
    fn clip_polygons(&self, polygons: Vec<Polygon>) -> Vec<Polygon> {
        if self.plane.is_none() {
            return polygons;
        }
        let mut kept = Vec::new();
        let mut stack: Vec<(&Node, Vec<Polygon>)> = vec![(self, polygons)];
        while let Some((node, polygons)) = stack.pop() {
            let Some(plane) = &node.plane else {
                kept.extend(polygons);
                continue;
            };
            let mut front = Vec::new();
            let mut back = Vec::new();
            for polygon in polygons {
                match plane.split(polygon) {
                    Split::CoplanarFront(p) | Split::Front(p) => front.push(p),
                    Split::CoplanarBack(p) | Split::Back(p) => back.push(p),
                    Split::Spanning { front: f, back: b } => {
                        front.extend(f);
                        back.extend(b);
                    }
                }
            }
            match &node.front {
                Some(child) if !front.is_empty() => stack.push((child, front)),
                Some(_) => {}
                None => kept.extend(front),
            }
            // Polygons behind a leaf plane are inside the solid.
            if let Some(child) = &node.back {
                if !back.is_empty() {
                    stack.push((child, back));
                }
            }
        }
        kept
    }

    /// Remove every polygon in this tree that lies inside `bsp`.
    pub(crate) fn clip_to(&mut self, bsp: &Node) {
        let mut stack: Vec<&mut Node> = vec![self];
        while let Some(node) = stack.pop() {
            let polygons = std::mem::take(&mut node.polygons);
            node.polygons = bsp.clip_polygons(polygons);
            if let Some(f) = node.front.as_mut() {
                stack.push(f.as_mut());
            }
            if let Some(b) = node.back.as_mut() {
                stack.push(b.as_mut());
            }
        }
    }

    pub(crate) fn all_polygons(&self) -> Vec<Polygon> {
        let mut out = Vec::new();
        let mut stack: Vec<&Node> = vec![self];
        while let Some(node) = stack.pop() {
            out.extend(node.polygons.iter().cloned());
            if let Some(b) = &node.back {
                stack.push(b);
            }
            if let Some(f) = &node.front {
                stack.push(f);
            }
        }
        out
    }

    /// Insert polygons into the tree, splitting them where needed.
    pub(crate) fn build(&mut self, polygons: Vec<Polygon>) {
        let mut stack: Vec<(&mut Node, Vec<Polygon>)> = vec![(self, polygons)];
        while let Some((node, polygons)) = stack.pop() {
            if polygons.is_empty() {
                continue;
            }
            let Node {
                plane,
                front,
                back,
                polygons: coplanar,
            } = node;
            let plane = plane
                .get_or_insert_with(|| polygons[0].plane.clone())
                .clone();
            let mut to_front = Vec::new();
            let mut to_back = Vec::new();
            for polygon in polygons {
                match plane.split(polygon) {
                    Split::CoplanarFront(p) | Split::CoplanarBack(p) => coplanar.push(p),
                    Split::Front(p) => to_front.push(p),
                    Split::Back(p) => to_back.push(p),
                    Split::Spanning { front: f, back: b } => {
                        to_front.extend(f);
                        to_back.extend(b);
                    }
                }
            }
            if !to_front.is_empty() {
                stack.push((front.get_or_insert_with(Box::default).as_mut(), to_front));
            }
            if !to_back.is_empty() {
                stack.push((back.get_or_insert_with(Box::default).as_mut(), to_back));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(z: f64) -> Polygon {
        Polygon::new(vec![
            Point3::new(0.0, 0.0, z),
            Point3::new(1.0, 0.0, z),
            Point3::new(1.0, 1.0, z),
            Point3::new(0.0, 1.0, z),
        ])
        .unwrap()
    }

    #[test]
    fn test_newell_plane() {
        let p = square(2.0);
        assert!((p.plane.normal - Vec3::z()).norm() < 1e-12);
        assert!((p.plane.w - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_degenerate_polygon_rejected() {
        let collinear = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
        ];
        assert!(Polygon::new(collinear).is_none());
    }

    #[test]
    fn test_split_spanning() {
        let plane = Plane {
            normal: Vec3::x(),
            w: 0.5,
        };
        match plane.split(square(0.0)) {
            Split::Spanning {
                front: Some(f),
                back: Some(b),
            } => {
                assert_eq!(f.vertices.len(), 4);
                assert_eq!(b.vertices.len(), 4);
                assert!(f.vertices.iter().all(|v| v.x >= 0.5 - 1e-12));
                assert!(b.vertices.iter().all(|v| v.x <= 0.5 + 1e-12));
            }
            _ => panic!("expected a spanning split"),
        }
    }

    #[test]
    fn test_coplanar_routing_by_orientation() {
        let plane = Plane {
            normal: Vec3::z(),
            w: 0.0,
        };
        assert!(matches!(plane.split(square(0.0)), Split::CoplanarFront(_)));
        let mut flipped = square(0.0);
        flipped.flip();
        assert!(matches!(plane.split(flipped), Split::CoplanarBack(_)));
    }

    #[test]
    fn test_invert_twice_is_identity() {
        let mut node = Node::new(vec![square(0.0), square(1.0)]);
        let before = node.all_polygons();
        node.invert();
        node.invert();
        assert_eq!(before, node.all_polygons());
    }
}
