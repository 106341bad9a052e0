//! OBJ file loader for 3D models
//!
//! Produces flat, non-indexed attribute arrays per geometry. A new geometry
//! starts whenever the material, object or group changes after faces have been
//! emitted, so every geometry draws with exactly one material.

use std::path::Path;
use thiserror::Error;

/// OBJ loading errors
#[derive(Error, Debug)]
pub enum ObjError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Malformed number or missing value
    #[error("Parse error: {0}")]
    ParseError(String),
    /// Structurally invalid data such as an out-of-range index
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

/// Material name used by faces that appear before any `usemtl`
pub const DEFAULT_MATERIAL_NAME: &str = "default";

/// Flat vertex attribute arrays of one geometry
///
/// Positions, normals and colors use 3 components per vertex, texture
/// coordinates 2. Attributes the file never provides stay empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeometryData {
    /// Vertex positions
    pub position: Vec<f32>,
    /// Texture coordinates
    pub texcoord: Vec<f32>,
    /// Vertex normals
    pub normal: Vec<f32>,
    /// Per-vertex RGB colors
    pub color: Vec<f32>,
}

impl GeometryData {
    /// Number of vertices described by the position attribute
    pub fn vertex_count(&self) -> usize {
        self.position.len() / 3
    }

    /// Iterate over positions as `[x, y, z]`
    pub fn positions(&self) -> impl Iterator<Item = [f32; 3]> + '_ {
        self.position.chunks_exact(3).map(|p| [p[0], p[1], p[2]])
    }
}

/// One drawable group of triangles sharing a material
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    /// Object name from the last `o` statement
    pub object: Option<String>,
    /// Group names from the last `g` statement
    pub groups: Vec<String>,
    /// Material name from the last `usemtl` statement
    pub material: String,
    /// Triangle list attributes
    pub data: GeometryData,
}

/// Parsed OBJ file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjData {
    /// Geometries in file order
    pub geometries: Vec<Geometry>,
    /// `mtllib` arguments in file order
    pub material_libs: Vec<String>,
}

/// Wavefront OBJ loader
pub struct ObjLoader;

impl ObjLoader {
    /// Load and parse an OBJ file
    pub fn load_obj<P: AsRef<Path>>(path: P) -> Result<ObjData, ObjError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let obj = Self::parse(&text)?;

        log::debug!(
            "Parsed {}: {} geometries, {} material libraries",
            path.display(),
            obj.geometries.len(),
            obj.material_libs.len()
        );
        Ok(obj)
    }

    /// Parse OBJ text
    pub fn parse(text: &str) -> Result<ObjData, ObjError> {
        let mut parser = ObjParser::default();

        for (index, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let (keyword, args) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
            parser.line = index + 1;
            parser.handle(keyword, args.trim())?;
        }

        Ok(parser.finish())
    }
}

#[derive(Default)]
struct ObjParser {
    line: usize,
    positions: Vec<[f32; 3]>,
    texcoords: Vec<[f32; 2]>,
    normals: Vec<[f32; 3]>,
    colors: Vec<Option<[f32; 3]>>,
    has_colors: bool,

    material: Option<String>,
    object: Option<String>,
    groups: Vec<String>,
    material_libs: Vec<String>,

    geometries: Vec<Geometry>,
    current: Option<usize>,
}

impl ObjParser {
    fn handle(&mut self, keyword: &str, args: &str) -> Result<(), ObjError> {
        match keyword {
            "v" => {
                let values = self.parse_floats(args)?;
                if values.len() < 3 {
                    return Err(self.missing("vertex position needs 3 components"));
                }
                self.positions.push([values[0], values[1], values[2]]);
                if values.len() >= 6 {
                    self.colors.push(Some([values[3], values[4], values[5]]));
                    self.has_colors = true;
                } else {
                    self.colors.push(None);
                }
            }
            "vn" => {
                let values = self.parse_floats(args)?;
                if values.len() < 3 {
                    return Err(self.missing("normal needs 3 components"));
                }
                self.normals.push([values[0], values[1], values[2]]);
            }
            "vt" => {
                let values = self.parse_floats(args)?;
                if values.len() < 2 {
                    return Err(self.missing("texture coordinate needs 2 components"));
                }
                self.texcoords.push([values[0], values[1]]);
            }
            "f" => self.add_face(args)?,
            "usemtl" => {
                self.material = Some(args.to_string());
                self.start_new_geometry();
            }
            "mtllib" => self.material_libs.push(args.to_string()),
            "o" => {
                self.object = Some(args.to_string());
                self.start_new_geometry();
            }
            "g" => {
                self.groups = args.split_whitespace().map(str::to_string).collect();
                self.start_new_geometry();
            }
            // Smoothing groups and lines do not affect triangle output
            "s" | "l" => {}
            other => log::debug!("Line {}: unhandled OBJ keyword '{}'", self.line, other),
        }
        Ok(())
    }

    fn add_face(&mut self, args: &str) -> Result<(), ObjError> {
        let corners: Vec<&str> = args.split_whitespace().collect();
        if corners.len() < 3 {
            return Err(self.missing("face needs at least 3 vertices"));
        }

        let geometry = self.ensure_geometry();

        // Fan triangulation around the first corner
        for i in 1..corners.len() - 1 {
            for corner in [corners[0], corners[i], corners[i + 1]] {
                self.add_vertex(geometry, corner)?;
            }
        }
        Ok(())
    }

    fn add_vertex(&mut self, geometry: usize, corner: &str) -> Result<(), ObjError> {
        let mut refs = corner.split('/');
        let position_ref = refs.next().unwrap_or_default();
        let texcoord_ref = refs.next().unwrap_or_default();
        let normal_ref = refs.next().unwrap_or_default();

        let position_index = self.resolve_index(position_ref, self.positions.len(), "position")?;
        let texcoord_index = if texcoord_ref.is_empty() {
            None
        } else {
            Some(self.resolve_index(texcoord_ref, self.texcoords.len(), "texcoord")?)
        };
        let normal_index = if normal_ref.is_empty() {
            None
        } else {
            Some(self.resolve_index(normal_ref, self.normals.len(), "normal")?)
        };

        let color = self.has_colors.then(|| self.colors[position_index].unwrap_or([1.0, 1.0, 1.0]));
        let position = self.positions[position_index];
        let texcoord = texcoord_index.map(|i| self.texcoords[i]);
        let normal = normal_index.map(|i| self.normals[i]);

        let data = &mut self.geometries[geometry].data;
        let preceding = data.vertex_count();
        data.position.extend_from_slice(&position);
        append_attribute(&mut data.texcoord, texcoord.as_ref().map(|t| t.as_slice()), 2, preceding);
        append_attribute(&mut data.normal, normal.as_ref().map(|n| n.as_slice()), 3, preceding);
        if let Some(color) = color {
            data.color.extend_from_slice(&color);
        }
        Ok(())
    }

    /// Convert a 1-based (or negative, end-relative) OBJ index to 0-based
    fn resolve_index(&self, token: &str, len: usize, kind: &str) -> Result<usize, ObjError> {
        let raw: i64 = token.parse().map_err(|_| {
            ObjError::ParseError(format!("Line {}: invalid {} index '{}'", self.line, kind, token))
        })?;

        let resolved = match raw {
            r if r > 0 => usize::try_from(r - 1).ok(),
            r if r < 0 => usize::try_from(r.unsigned_abs()).ok().and_then(|back| len.checked_sub(back)),
            _ => None,
        };

        resolved.filter(|i| *i < len).ok_or_else(|| {
            ObjError::InvalidFormat(format!(
                "Line {}: {} index {} out of range ({} defined)",
                self.line, kind, raw, len
            ))
        })
    }

    fn start_new_geometry(&mut self) {
        if let Some(index) = self.current {
            if !self.geometries[index].data.position.is_empty() {
                self.current = None;
            }
        }
    }

    fn ensure_geometry(&mut self) -> usize {
        if let Some(index) = self.current {
            return index;
        }

        self.geometries.push(Geometry {
            object: self.object.clone(),
            groups: self.groups.clone(),
            material: self
                .material
                .clone()
                .unwrap_or_else(|| DEFAULT_MATERIAL_NAME.to_string()),
            data: GeometryData::default(),
        });
        let index = self.geometries.len() - 1;
        self.current = Some(index);
        index
    }

    fn parse_floats(&self, args: &str) -> Result<Vec<f32>, ObjError> {
        args.split_whitespace()
            .map(|token| {
                token.parse::<f32>().map_err(|_| {
                    ObjError::ParseError(format!("Line {}: invalid number '{}'", self.line, token))
                })
            })
            .collect()
    }

    fn missing(&self, what: &str) -> ObjError {
        ObjError::ParseError(format!("Line {}: {}", self.line, what))
    }

    fn finish(self) -> ObjData {
        ObjData {
            geometries: self
                .geometries
                .into_iter()
                .filter(|g| !g.data.position.is_empty())
                .collect(),
            material_libs: self.material_libs,
        }
    }
}

/// Append one vertex's attribute, keeping the array aligned with positions
///
/// Once any vertex of a geometry carries the attribute, vertices without it
/// read as zeros, including the `preceding` ones written before it appeared.
fn append_attribute(values: &mut Vec<f32>, value: Option<&[f32]>, components: usize, preceding: usize) {
    match value {
        Some(value) => {
            if values.is_empty() && preceding > 0 {
                values.resize(preceding * components, 0.0);
            }
            values.extend_from_slice(value);
        }
        None if !values.is_empty() => values.resize(values.len() + components, 0.0),
        None => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_MATERIAL_QUADS: &str = r#"
# two quads with different materials
mtllib scene.mtl
o Board
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
vt 0 0
vt 1 0
vt 1 1
vt 0 1
vn 0 0 1
usemtl wood
f 1/1/1 2/2/1 3/3/1 4/4/1
usemtl metal
f -4/-4/-1 -3/-3/-1 -2/-2/-1
"#;

    #[test]
    fn test_splits_geometries_by_material() {
        let obj = ObjLoader::parse(TWO_MATERIAL_QUADS).unwrap();

        assert_eq!(obj.material_libs, vec!["scene.mtl".to_string()]);
        assert_eq!(obj.geometries.len(), 2);

        let wood = &obj.geometries[0];
        assert_eq!(wood.material, "wood");
        assert_eq!(wood.object.as_deref(), Some("Board"));
        // Quad fan-triangulates into 2 triangles
        assert_eq!(wood.data.vertex_count(), 6);
        assert_eq!(wood.data.texcoord.len(), 12);
        assert_eq!(wood.data.normal.len(), 18);
        assert!(wood.data.color.is_empty());

        let metal = &obj.geometries[1];
        assert_eq!(metal.material, "metal");
        assert_eq!(metal.data.vertex_count(), 3);
        assert_eq!(&metal.data.position[..3], &[0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_fan_triangulation_order() {
        let obj = ObjLoader::parse("v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf 1 2 3 4\n").unwrap();
        let positions: Vec<[f32; 3]> = obj.geometries[0].data.positions().collect();

        assert_eq!(
            positions,
            vec![
                [0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0],
                [0.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0],
            ]
        );
    }

    #[test]
    fn test_faces_without_usemtl_use_default_material() {
        let obj = ObjLoader::parse("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n").unwrap();
        assert_eq!(obj.geometries[0].material, DEFAULT_MATERIAL_NAME);
    }

    #[test]
    fn test_vertex_colors() {
        let obj = ObjLoader::parse("v 0 0 0 1 0 0\nv 1 0 0 0 1 0\nv 0 1 0 0 0 1\nf 1 2 3\n").unwrap();
        let data = &obj.geometries[0].data;

        assert_eq!(data.color.len(), data.position.len());
        assert_eq!(&data.color[..3], &[1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_group_change_without_faces_reuses_geometry() {
        let obj = ObjLoader::parse("v 0 0 0\nv 1 0 0\nv 0 1 0\ng a\nusemtl red\nf 1 2 3\n").unwrap();

        assert_eq!(obj.geometries.len(), 1);
        assert_eq!(obj.geometries[0].groups, vec!["a".to_string()]);
        assert_eq!(obj.geometries[0].material, "red");
    }

    #[test]
    fn test_mixed_faces_keep_attributes_aligned() {
        let text = "v 0 0 0\nv 1 0 0\nv 0 1 0\nvt 0.5 0.5\nvt 1 0\nvt 0 1\nvn 0 0 1\n\
                    f 1 2 3\nf 1/1/1 2/2/1 3/3/1\nf 1 2 3\n";
        let obj = ObjLoader::parse(text).unwrap();
        let data = &obj.geometries[0].data;

        assert_eq!(data.vertex_count(), 9);
        assert_eq!(data.texcoord.len(), 9 * 2);
        assert_eq!(data.normal.len(), 9 * 3);

        // Corners without vt/vn read as zeros, before and after the textured face
        assert_eq!(&data.texcoord[..6], &[0.0; 6]);
        assert_eq!(&data.texcoord[6..8], &[0.5, 0.5]);
        assert_eq!(&data.texcoord[12..], &[0.0; 6]);
        assert_eq!(&data.normal[..9], &[0.0; 9]);
        assert_eq!(&data.normal[9..12], &[0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_out_of_range_index() {
        let result = ObjLoader::parse("v 0 0 0\nf 1 2 3\n");
        assert!(matches!(result, Err(ObjError::InvalidFormat(_))));

        let result = ObjLoader::parse("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 0 1 2\n");
        assert!(matches!(result, Err(ObjError::InvalidFormat(_))));
    }

    #[test]
    fn test_invalid_number_reports_line() {
        let err = ObjLoader::parse("v 0 0 0\nv 1 abc 0\n").unwrap_err();
        assert!(err.to_string().contains("Line 2"));
    }

    #[test]
    fn test_load_obj_from_file() {
        use std::io::Write;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(TWO_MATERIAL_QUADS.as_bytes()).unwrap();

        let obj = ObjLoader::load_obj(file.path()).unwrap();
        assert_eq!(obj.geometries.len(), 2);
    }
}
