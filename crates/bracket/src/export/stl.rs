//! Binary STL encoding.

use bracket_kernel::TriangleMesh;

use super::{ExportError, Result};

const HEADER: &[u8] = b"bracket binary STL";

/// Encode `mesh` as binary STL: an 80-byte header, the triangle count and
/// one 50-byte little-endian record per triangle.
pub fn to_stl_bytes(mesh: &TriangleMesh) -> Result<Vec<u8>> {
    if mesh.is_empty() {
        return Err(ExportError::EmptyGeometry);
    }
    let vertices = mesh.flat_vertices();
    let indices = mesh.flat_indices();
    let num_triangles = indices.len() / 3;
    let mut data = Vec::with_capacity(84 + num_triangles * 50);

    let mut header = [b' '; 80];
    header[..HEADER.len()].copy_from_slice(HEADER);
    data.extend_from_slice(&header);
    data.extend_from_slice(&(num_triangles as u32).to_le_bytes());

    for tri in indices.chunks_exact(3) {
        let [v0, v1, v2] = [tri[0], tri[1], tri[2]].map(|i| {
            let i = i as usize * 3;
            [vertices[i], vertices[i + 1], vertices[i + 2]]
        });

        let e1 = [v1[0] - v0[0], v1[1] - v0[1], v1[2] - v0[2]];
        let e2 = [v2[0] - v0[0], v2[1] - v0[1], v2[2] - v0[2]];
        let n = [
            e1[1] * e2[2] - e1[2] * e2[1],
            e1[2] * e2[0] - e1[0] * e2[2],
            e1[0] * e2[1] - e1[1] * e2[0],
        ];
        let len = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt();
        let normal = if len > 1e-10 {
            n.map(|c| c / len)
        } else {
            [0.0, 0.0, 1.0]
        };

        for v in [normal, v0, v1, v2] {
            for c in v {
                data.extend_from_slice(&c.to_le_bytes());
            }
        }
        // Attribute byte count
        data.extend_from_slice(&0u16.to_le_bytes());
    }

    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bracket_kernel::{Engine, EngineConfig};

    #[test]
    fn test_stl_layout() {
        let engine = Engine::init(EngineConfig::default()).unwrap();
        let mesh = engine.mesh(&engine.cube(1.0, 2.0, 3.0).unwrap());
        let bytes = to_stl_bytes(&mesh).unwrap();
        assert_eq!(&bytes[..HEADER.len()], HEADER);
        let count = u32::from_le_bytes([bytes[80], bytes[81], bytes[82], bytes[83]]);
        assert_eq!(count, 12);
        assert_eq!(bytes.len(), 84 + 12 * 50);
    }

    #[test]
    fn test_empty_mesh_rejected() {
        assert!(matches!(
            to_stl_bytes(&TriangleMesh::default()),
            Err(ExportError::EmptyGeometry)
        ));
    }
}
