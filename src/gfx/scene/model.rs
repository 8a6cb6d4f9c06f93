//! CPU-side model decoding
//!
//! `.obj` files go through tobj, `.glb`/`.gltf` through the gltf crate. Scene
//! node transforms are baked into the vertices, so a decoded model is a flat
//! list of meshes in model space.

use std::path::Path;

use cgmath::{InnerSpace, Matrix, Matrix3, Matrix4, SquareMatrix, Vector3, Vector4};

use crate::error::{Result, SolarisError};

use super::vertex::Vertex3D;

/// RGBA8 image owned by a material
#[derive(Debug, Clone)]
pub struct ImageData {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

/// Unlit material: base color times an optional base color texture
#[derive(Debug, Clone)]
pub struct MaterialData {
    pub base_color: [f32; 4],
    pub texture: Option<ImageData>,
}

impl Default for MaterialData {
    fn default() -> Self {
        Self {
            base_color: [0.8, 0.8, 0.8, 1.0],
            texture: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MeshData {
    pub vertices: Vec<Vertex3D>,
    pub indices: Vec<u32>,
    pub material: MaterialData,
}

#[derive(Debug, Clone, Default)]
pub struct ModelData {
    pub meshes: Vec<MeshData>,
}

impl ModelData {
    /// Decodes a model file, choosing the parser from its extension
    pub fn load(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        std::fs::metadata(path).map_err(|e| SolarisError::io(path, e))?;

        let model = match extension.as_str() {
            "obj" => load_obj(path)?,
            "glb" | "gltf" => load_gltf(path)?,
            _ => {
                return Err(SolarisError::UnsupportedModel {
                    path: path.to_path_buf(),
                    extension: format!(".{}", extension),
                })
            }
        };

        if model.meshes.is_empty() {
            return Err(decode_error(path, "model contains no triangle meshes"));
        }

        log::debug!(
            "decoded {}: {} meshes, {} vertices",
            path.display(),
            model.meshes.len(),
            model.vertex_count()
        );
        Ok(model)
    }

    pub fn vertex_count(&self) -> usize {
        self.meshes.iter().map(|mesh| mesh.vertices.len()).sum()
    }
}

fn decode_error(path: &Path, reason: impl ToString) -> SolarisError {
    SolarisError::ModelDecode {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

fn load_obj(path: &Path) -> Result<ModelData> {
    let (models, materials) = tobj::load_obj(
        path,
        &tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        },
    )
    .map_err(|e| decode_error(path, e))?;

    let materials = materials.unwrap_or_else(|err| {
        log::debug!("no MTL for {}: {}", path.display(), err);
        Vec::new()
    });

    let meshes = models
        .into_iter()
        .map(|model| {
            let mesh = model.mesh;
            let normals = if !mesh.normals.is_empty() && mesh.normals.len() == mesh.positions.len()
            {
                mesh.normals
            } else {
                calculate_face_normals(&mesh.positions, &mesh.indices)
            };

            let vertices = (0..mesh.positions.len() / 3)
                .map(|i| Vertex3D {
                    position: [
                        mesh.positions[i * 3],
                        mesh.positions[i * 3 + 1],
                        mesh.positions[i * 3 + 2],
                    ],
                    normal: [normals[i * 3], normals[i * 3 + 1], normals[i * 3 + 2]],
                    // OBJ texture space starts at the bottom-left
                    uv: if mesh.texcoords.len() >= (i + 1) * 2 {
                        [mesh.texcoords[i * 2], 1.0 - mesh.texcoords[i * 2 + 1]]
                    } else {
                        [0.0, 0.0]
                    },
                })
                .collect();

            let material = mesh
                .material_id
                .and_then(|id| materials.get(id))
                .map(|mtl| {
                    let diffuse = mtl.diffuse.unwrap_or([0.8, 0.8, 0.8]);
                    MaterialData {
                        base_color: [
                            diffuse[0],
                            diffuse[1],
                            diffuse[2],
                            mtl.dissolve.unwrap_or(1.0),
                        ],
                        texture: None,
                    }
                })
                .unwrap_or_default();

            MeshData {
                vertices,
                indices: mesh.indices,
                material,
            }
        })
        .collect();

    Ok(ModelData { meshes })
}

fn load_gltf(path: &Path) -> Result<ModelData> {
    let (document, buffers, images) = gltf::import(path).map_err(|e| decode_error(path, e))?;

    let scene = document
        .default_scene()
        .or_else(|| document.scenes().next())
        .ok_or_else(|| decode_error(path, "glTF file has no scene"))?;

    let mut meshes = Vec::new();
    for node in scene.nodes() {
        collect_node(&node, Matrix4::identity(), &buffers, &images, &mut meshes);
    }

    Ok(ModelData { meshes })
}

fn collect_node(
    node: &gltf::Node,
    parent: Matrix4<f32>,
    buffers: &[gltf::buffer::Data],
    images: &[gltf::image::Data],
    meshes: &mut Vec<MeshData>,
) {
    let transform = parent * Matrix4::from(node.transform().matrix());

    if let Some(mesh) = node.mesh() {
        for primitive in mesh.primitives() {
            if primitive.mode() != gltf::mesh::Mode::Triangles {
                log::warn!("skipping non-triangle primitive in mesh {:?}", mesh.name());
                continue;
            }
            if let Some(data) = read_primitive(&primitive, transform, buffers, images) {
                meshes.push(data);
            }
        }
    }

    for child in node.children() {
        collect_node(&child, transform, buffers, images, meshes);
    }
}

fn read_primitive(
    primitive: &gltf::Primitive,
    transform: Matrix4<f32>,
    buffers: &[gltf::buffer::Data],
    images: &[gltf::image::Data],
) -> Option<MeshData> {
    let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|data| data.0.as_slice()));

    let positions: Vec<[f32; 3]> = reader.read_positions()?.collect();
    let indices: Vec<u32> = match reader.read_indices() {
        Some(indices) => indices.into_u32().collect(),
        None => (0..positions.len() as u32).collect(),
    };
    let normals: Vec<[f32; 3]> = match reader.read_normals() {
        Some(normals) => normals.collect(),
        None => {
            let flat: Vec<f32> = positions.iter().flatten().copied().collect();
            calculate_face_normals(&flat, &indices)
                .chunks(3)
                .map(|n| [n[0], n[1], n[2]])
                .collect()
        }
    };
    let uvs: Vec<[f32; 2]> = reader
        .read_tex_coords(0)
        .map(|coords| coords.into_f32().collect())
        .unwrap_or_default();

    let normal_matrix = normal_matrix(transform);
    let vertices = positions
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let position = transform * Vector4::new(p[0], p[1], p[2], 1.0);
            let normal = normals
                .get(i)
                .map(|n| normal_matrix * Vector3::new(n[0], n[1], n[2]))
                .filter(|n| n.magnitude2() > f32::EPSILON)
                .map(|n| n.normalize())
                .unwrap_or_else(Vector3::unit_y);
            Vertex3D {
                position: [position.x, position.y, position.z],
                normal: normal.into(),
                uv: uvs.get(i).copied().unwrap_or([0.0, 0.0]),
            }
        })
        .collect();

    let pbr = primitive.material().pbr_metallic_roughness();
    let texture = pbr
        .base_color_texture()
        .and_then(|info| images.get(info.texture().source().index()))
        .and_then(to_rgba);

    Some(MeshData {
        vertices,
        indices,
        material: MaterialData {
            base_color: pbr.base_color_factor(),
            texture,
        },
    })
}

fn normal_matrix(transform: Matrix4<f32>) -> Matrix3<f32> {
    let linear = Matrix3::from_cols(
        transform.x.truncate(),
        transform.y.truncate(),
        transform.z.truncate(),
    );
    linear
        .invert()
        .map(|inverse| inverse.transpose())
        .unwrap_or(linear)
}

fn to_rgba(image: &gltf::image::Data) -> Option<ImageData> {
    let rgba = match image.format {
        gltf::image::Format::R8G8B8A8 => image.pixels.clone(),
        gltf::image::Format::R8G8B8 => image
            .pixels
            .chunks(3)
            .flat_map(|px| [px[0], px[1], px[2], 255])
            .collect(),
        gltf::image::Format::R8 => image.pixels.iter().flat_map(|&v| [v, v, v, 255]).collect(),
        other => {
            log::warn!("unsupported base color image format {:?}, using flat color", other);
            return None;
        }
    };

    Some(ImageData {
        width: image.width,
        height: image.height,
        rgba,
    })
}

/// Averaged per-vertex normals from triangle faces
pub fn calculate_face_normals(positions: &[f32], indices: &[u32]) -> Vec<f32> {
    let vertex_count = positions.len() / 3;
    let mut normals = vec![0.0; positions.len()];

    let vertex = |i: usize| Vector3::new(positions[i * 3], positions[i * 3 + 1], positions[i * 3 + 2]);

    for triangle in indices.chunks_exact(3) {
        let [i0, i1, i2] = [
            triangle[0] as usize,
            triangle[1] as usize,
            triangle[2] as usize,
        ];
        if i0.max(i1).max(i2) >= vertex_count {
            continue;
        }

        let face_normal = (vertex(i1) - vertex(i0)).cross(vertex(i2) - vertex(i0));
        for &index in &[i0, i1, i2] {
            normals[index * 3] += face_normal.x;
            normals[index * 3 + 1] += face_normal.y;
            normals[index * 3 + 2] += face_normal.z;
        }
    }

    for normal in normals.chunks_exact_mut(3) {
        let n = Vector3::new(normal[0], normal[1], normal[2]);
        let n = if n.magnitude2() > f32::EPSILON {
            n.normalize()
        } else {
            Vector3::unit_y()
        };
        normal.copy_from_slice(&[n.x, n.y, n.z]);
    }

    normals
}
