/// This crate contains functions and structures for creating and saving 3D meshes from depth images.
pub mod depth;
pub mod error;
pub mod material;
pub mod projection;

pub use depth::{load_depth_image, DepthMatrix, RawDepthImage};
pub use error::{Error, Result};
pub use material::{MaterialLink, MaterialSpec};
pub use projection::{CameraModel, VertexGrid, VertexId};

use obj_exporter::{Geometry, ObjSet, Object, Primitive, Shape, TVertex, Vertex};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// A grid mesh built from a depth image.
///
/// `vertices` and `uv_vertices` always have the same length, one entry per pixel, and every
/// triangle corner uses the same index for its position and its texture coordinate. The two
/// lists are ordered differently (see [`VertexGrid::project`] and [`create_mesh_from_depth`]),
/// so this pairing is what the renderer sees, not a pixel-exact one.
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    pub uv_vertices: Vec<TVertex>,
    pub triangles: Vec<Primitive>,
}

/// Parameters for creating a mesh from a depth image.
pub struct Params {
    pub depth_params: depth::Params,
    /// Vertical field of view in degrees.
    pub fov_degrees: f64,
    pub material_name: String,
}

impl Default for Params {
    fn default() -> Self {
        Params {
            depth_params: depth::Params::default(),
            fov_degrees: 45.0,
            material_name: "colored".to_string(),
        }
    }
}

/// Where the converted mesh goes. A material file is only written when `texture_path` is set.
#[derive(Debug, Clone)]
pub struct Outputs {
    pub obj_path: PathBuf,
    pub mtl_path: PathBuf,
    pub texture_path: Option<String>,
}

impl Default for Outputs {
    fn default() -> Self {
        Outputs {
            obj_path: PathBuf::from("model.obj"),
            mtl_path: PathBuf::from("model.mtl"),
            texture_path: None,
        }
    }
}

/// Counts describing a written mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshStats {
    pub vertices: usize,
    pub uv_vertices: usize,
    pub triangles: usize,
    pub skipped_quads: usize,
}

pub fn create_mesh_from_depth(depth: &DepthMatrix, params: &Params) -> Mesh {
    let (width, height) = (depth.width(), depth.height());
    let camera = CameraModel::new(width, height, params.fov_degrees);
    log::debug!(
        "Projecting {}x{} depth matrix, image plane at {:.3} px",
        width,
        height,
        camera.distance()
    );

    let (grid, vertices) = VertexGrid::project(depth, &camera);

    let uv_vertices: Vec<TVertex> = (0..width)
        .flat_map(|u| (0..height).map(move |v| projection::tex_coord(u, v, width, height)))
        .collect();

    let triangles: Vec<Primitive> = (0..width.saturating_sub(1))
        .flat_map(|u| (0..height.saturating_sub(1)).map(move |v| (u, v)))
        .filter_map(|(u, v)| grid.quad(u, v))
        .flat_map(|[v1, v2, v3, v4]| {
            [
                triangle_from_ids(v1, v2, v3),
                triangle_from_ids(v3, v2, v4),
            ]
        })
        .collect();

    debug_assert_eq!(vertices.len(), uv_vertices.len());

    Mesh {
        vertices,
        uv_vertices,
        triangles,
    }
}

fn triangle_from_ids(v0: VertexId, v1: VertexId, v2: VertexId) -> Primitive {
    let (v0, v1, v2) = (v0.index(), v1.index(), v2.index());
    Primitive::Triangle((v0, Some(v0), None), (v1, Some(v1), None), (v2, Some(v2), None))
}

/// Loads a depth image, creates a mesh from it and saves it, along with its material when
/// a texture is given.
///
/// # Arguments
///
/// * `depth_path` - The depth image to convert.
/// * `outputs` - Where to write the mesh and the material.
/// * `params` - Parameters for loading the depth and creating the mesh.
///
/// # Returns
///
/// Counts of what was written. Nothing is written if the depth image can't be loaded.
pub fn create_and_save_mesh_from_depth_image<P: AsRef<Path>>(
    depth_path: P,
    outputs: &Outputs,
    params: &Params,
) -> Result<MeshStats> {
    let depth = load_depth_image(depth_path, &params.depth_params)?;
    save_depth_as_mesh(&depth, outputs, params)
}

/// Same as [`create_and_save_mesh_from_depth_image`], starting from already decoded samples.
pub fn create_and_save_mesh_from_raw(
    raw: &RawDepthImage,
    outputs: &Outputs,
    params: &Params,
) -> Result<MeshStats> {
    let depth = DepthMatrix::from_raw(raw, &params.depth_params)?;
    save_depth_as_mesh(&depth, outputs, params)
}

fn save_depth_as_mesh(depth: &DepthMatrix, outputs: &Outputs, params: &Params) -> Result<MeshStats> {
    let invalid = depth.invalid_count();
    if invalid == depth.width() * depth.height() {
        log::warn!("Depth image has no valid pixels, the mesh will have no faces");
    }

    let mesh = create_mesh_from_depth(depth, params);
    let quads = depth.width().saturating_sub(1) * depth.height().saturating_sub(1);
    let stats = MeshStats {
        vertices: mesh.vertices.len(),
        uv_vertices: mesh.uv_vertices.len(),
        triangles: mesh.triangles.len(),
        skipped_quads: quads - mesh.triangles.len() / 2,
    };

    let link = match &outputs.texture_path {
        Some(texture_path) => {
            let material = MaterialSpec::new(params.material_name.clone(), texture_path.clone());
            material.save(&outputs.mtl_path)?;
            Some(MaterialLink {
                library: outputs.mtl_path.to_string_lossy().into_owned(),
                name: material.name,
            })
        }
        None => None,
    };

    save_mesh_to_file(mesh, &outputs.obj_path, link.as_ref())?;

    log::info!(
        "Wrote {} vertices and {} faces to {:?} ({} quads skipped)",
        stats.vertices,
        stats.triangles,
        outputs.obj_path,
        stats.skipped_quads
    );
    Ok(stats)
}

/// Writes a mesh as OBJ text, preceded by the material references if a material is linked.
pub fn write_mesh<W: Write>(
    mesh: Mesh,
    name: &str,
    material: Option<&MaterialLink>,
    writer: &mut W,
) -> Result<()> {
    if let Some(link) = material {
        writeln!(writer, "mtllib {}", link.library)?;
        writeln!(writer, "usemtl {}", link.name)?;
    }

    let shapes = mesh.triangles.into_iter().map(|triangle| Shape {
        primitive: triangle,
        groups: vec![],
        smoothing_groups: vec![],
    });

    let geometry = Geometry {
        material_name: None,
        shapes: shapes.collect(),
    };

    let obj = Object {
        name: name.to_string(),
        vertices: mesh.vertices,
        tex_vertices: mesh.uv_vertices,
        normals: vec![],
        geometry: vec![geometry],
    };

    let obj_set = ObjSet {
        material_library: None,
        objects: vec![obj],
    };

    obj_exporter::export(&obj_set, writer)?;
    Ok(())
}

/// Saves a mesh to an OBJ file, creating its directory if needed.
///
/// # Arguments
///
/// * `mesh` - The mesh to save.
/// * `file_path` - The file path to save the mesh to.
/// * `material` - The material to reference from the mesh, if any.
pub fn save_mesh_to_file<P: AsRef<Path>>(
    mesh: Mesh,
    file_path: P,
    material: Option<&MaterialLink>,
) -> Result<()> {
    let file_path = file_path.as_ref();
    material::ensure_parent_dir(file_path)?;

    let name = file_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("default");

    let mut writer = BufWriter::new(File::create(file_path)?);
    write_mesh(mesh, name, material, &mut writer)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meters(fov_degrees: f64) -> Params {
        Params {
            depth_params: depth::Params {
                scale_to_meter: 1.0,
                ..Default::default()
            },
            fov_degrees,
            ..Default::default()
        }
    }

    fn corners(triangle: &Primitive) -> [usize; 3] {
        match triangle {
            Primitive::Triangle(a, b, c) => [a.0, b.0, c.0],
            _ => panic!("expected a triangle"),
        }
    }

    #[test]
    fn full_grid_face_count() {
        let depth = DepthMatrix::from_rows(4, 3, vec![2.0; 12]);
        let mesh = create_mesh_from_depth(&depth, &meters(45.0));

        assert_eq!(mesh.vertices.len(), 12);
        assert_eq!(mesh.uv_vertices.len(), 12);
        assert_eq!(mesh.triangles.len(), 2 * 3 * 2);
    }

    #[test]
    fn two_by_two_all_valid() {
        let depth = DepthMatrix::from_rows(2, 2, vec![1.0; 4]);
        let mesh = create_mesh_from_depth(&depth, &meters(90.0));

        assert_eq!(mesh.triangles.len(), 2);
        // ids: (0,1)=1 (0,0)=2 (1,1)=3 (1,0)=4, as 0-based indices
        assert_eq!(corners(&mesh.triangles[0]), [1, 3, 0]);
        assert_eq!(corners(&mesh.triangles[1]), [0, 3, 2]);
    }

    #[test]
    fn invalid_corner_drops_quad() {
        let depth = DepthMatrix::from_rows(2, 2, vec![0.0, 1.0, 1.0, 1.0]);
        let mesh = create_mesh_from_depth(&depth, &meters(90.0));

        assert_eq!(mesh.vertices.len(), 4);
        assert_eq!(mesh.uv_vertices.len(), 4);
        assert!(mesh.triangles.is_empty());
    }

    #[test]
    fn faces_never_touch_invalid_pixels() {
        let values: Vec<f64> = (0..30).map(|i| if i % 7 == 3 { 0.0 } else { 1.0 }).collect();
        let depth = DepthMatrix::from_rows(6, 5, values);
        let mesh = create_mesh_from_depth(&depth, &meters(45.0));

        let invalid: Vec<usize> = (0..6)
            .flat_map(|u| (0..5).map(move |v| (u, v)))
            .filter(|&(u, v)| depth.get(u, v) == 0.0)
            .map(|(u, v)| u * 5 + (4 - v))
            .collect();
        assert!(!invalid.is_empty());

        for triangle in &mesh.triangles {
            for index in corners(triangle) {
                assert!(!invalid.contains(&index));
            }
        }
    }

    #[test]
    fn thin_images_have_no_faces() {
        let depth = DepthMatrix::from_rows(5, 1, vec![1.0; 5]);
        let mesh = create_mesh_from_depth(&depth, &meters(45.0));
        assert_eq!(mesh.vertices.len(), 5);
        assert!(mesh.triangles.is_empty());

        let depth = DepthMatrix::from_rows(0, 0, vec![]);
        let mesh = create_mesh_from_depth(&depth, &meters(45.0));
        assert!(mesh.vertices.is_empty());
    }

    #[test]
    fn uv_order_is_column_major() {
        let depth = DepthMatrix::from_rows(2, 2, vec![1.0; 4]);
        let mesh = create_mesh_from_depth(&depth, &meters(45.0));
        let uvs: Vec<(f64, f64)> = mesh.uv_vertices.iter().map(|t| (t.u, t.v)).collect();

        assert_eq!(uvs, vec![(0.0, 0.0), (0.0, 0.5), (0.5, 0.0), (0.5, 0.5)]);
    }

    #[test]
    fn material_lines_come_first() {
        let depth = DepthMatrix::from_rows(2, 2, vec![1.0; 4]);
        let mesh = create_mesh_from_depth(&depth, &meters(90.0));
        let link = MaterialLink {
            library: "out/model.mtl".to_string(),
            name: "colored".to_string(),
        };

        let mut out = Vec::new();
        write_mesh(mesh, "model", Some(&link), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "mtllib out/model.mtl");
        assert_eq!(lines[1], "usemtl colored");
        assert_eq!(lines.iter().filter(|l| l.starts_with("v ")).count(), 4);
        assert_eq!(lines.iter().filter(|l| l.starts_with("vt ")).count(), 4);
        assert_eq!(lines.iter().filter(|l| l.starts_with("f ")).count(), 2);
    }

    #[test]
    fn no_material_lines_without_link() {
        let depth = DepthMatrix::from_rows(2, 2, vec![1.0; 4]);
        let mesh = create_mesh_from_depth(&depth, &meters(90.0));

        let mut out = Vec::new();
        write_mesh(mesh, "model", None, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(!text.contains("mtllib"));
        assert!(!text.contains("usemtl"));
    }
}
