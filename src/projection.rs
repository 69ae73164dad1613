//! Pinhole back-projection of depth samples into camera space.

use std::num::NonZeroUsize;

use obj_exporter::{TVertex, Vertex};

use crate::depth::DepthMatrix;

/// Pinhole camera centered on the image, defined by its vertical field of view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraModel {
    width: usize,
    height: usize,
    distance: f64,
}

impl CameraModel {
    pub fn new(width: usize, height: usize, fov_degrees: f64) -> CameraModel {
        let fov = fov_degrees.to_radians();
        let distance = (height as f64 / 2.0) / (fov / 2.0).tan();

        CameraModel {
            width,
            height,
            distance,
        }
    }

    /// Distance from the camera to the image plane, in pixels.
    pub fn distance(&self) -> f64 {
        self.distance
    }

    /// Moves along the ray through pixel `(u, v)` until the point lies `depth` in front of
    /// the camera.
    pub fn back_project(&self, u: usize, v: usize, depth: f64) -> Vertex {
        let x0 = u as f64 - self.width as f64 / 2.0;
        let y0 = v as f64 - self.height as f64 / 2.0;
        let z0 = -self.distance;

        let norm = 1.0 / (x0 * x0 + y0 * y0 + z0 * z0).sqrt();
        let t = depth / (z0 * norm);

        Vertex {
            x: -t * x0 * norm,
            y: t * y0 * norm,
            z: -t * z0 * norm,
        }
    }
}

/// Normalized texture coordinate of pixel `(u, v)`.
pub fn tex_coord(u: usize, v: usize, width: usize, height: usize) -> TVertex {
    TVertex {
        u: u as f64 / width as f64,
        v: v as f64 / height as f64,
        w: 0.0,
    }
}

/// 1-based ordinal of a vertex in the emitted position list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VertexId(NonZeroUsize);

impl VertexId {
    pub fn new(ordinal: usize) -> Option<VertexId> {
        NonZeroUsize::new(ordinal).map(VertexId)
    }

    pub fn ordinal(self) -> usize {
        self.0.get()
    }

    /// 0-based index, as expected by the OBJ writer.
    pub fn index(self) -> usize {
        self.0.get() - 1
    }
}

/// Vertex ids per pixel, `None` where the pixel has no depth.
#[derive(Debug, Clone, PartialEq)]
pub struct VertexGrid {
    width: usize,
    height: usize,
    ids: Vec<Option<VertexId>>,
}

impl VertexGrid {
    /// Projects every pixel and numbers the results.
    ///
    /// Columns are scanned left to right and, within a column, rows from the bottom of the
    /// image to the top. The id counter advances for every pixel, so an invalid pixel still
    /// consumes an ordinal and still produces a position.
    pub fn project(depth: &DepthMatrix, camera: &CameraModel) -> (VertexGrid, Vec<Vertex>) {
        let (width, height) = (depth.width(), depth.height());
        let mut ids = vec![None; width * height];
        let mut vertices = Vec::with_capacity(width * height);

        for u in 0..width {
            for v in (0..height).rev() {
                let d = depth.get(u, v);
                vertices.push(camera.back_project(u, v, d));

                if d != 0.0 {
                    ids[u * height + v] = VertexId::new(vertices.len());
                }
            }
        }

        (VertexGrid { width, height, ids }, vertices)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn get(&self, u: usize, v: usize) -> Option<VertexId> {
        self.ids[u * self.height + v]
    }

    /// Corners of the quad whose top-left pixel is `(u, v)`, if all four are valid.
    pub fn quad(&self, u: usize, v: usize) -> Option<[VertexId; 4]> {
        Some([
            self.get(u, v)?,
            self.get(u + 1, v)?,
            self.get(u, v + 1)?,
            self.get(u + 1, v + 1)?,
        ])
    }
}
