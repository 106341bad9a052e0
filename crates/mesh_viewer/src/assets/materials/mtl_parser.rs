//! MTL (Material Template Library) file parser
//!
//! Parses Wavefront .mtl text into open [`Material`] property maps. Texture
//! statements become `*Map` properties holding the referenced filename.

use super::{keys, Material, MaterialLibrary, MaterialValue};
use crate::foundation::math::Vec3;
use thiserror::Error;

/// MTL parse errors
#[derive(Error, Debug, PartialEq)]
pub enum MtlError {
    /// A statement was missing a value or held an invalid number
    #[error("Line {line}: {message}")]
    Parse {
        /// 1-based line number
        line: usize,
        /// What went wrong
        message: String,
    },
}

/// MTL file parser
pub struct MtlParser;

impl MtlParser {
    /// Parse MTL file contents into a map of material name -> properties
    ///
    /// Statements before the first `newmtl` and unknown statements are
    /// skipped. A later `newmtl` with an existing name replaces the earlier
    /// definition.
    pub fn parse(contents: &str) -> Result<MaterialLibrary, MtlError> {
        let mut materials = MaterialLibrary::new();
        let mut current: Option<(String, Material)> = None;

        for (line_num, line) in contents.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let mut tokens = line.split_whitespace();
            let Some(command) = tokens.next() else {
                continue;
            };

            if command == "newmtl" {
                if let Some((name, material)) = current.take() {
                    materials.insert(name, material);
                }
                let name: Vec<&str> = tokens.collect();
                if name.is_empty() {
                    return Err(Self::error(line_num, "newmtl missing material name"));
                }
                current = Some((name.join(" "), Material::new()));
                continue;
            }

            let Some((_, material)) = current.as_mut() else {
                log::debug!("Line {}: '{}' outside of any material", line_num + 1, command);
                continue;
            };

            let (key, value) = match command {
                "Ns" => (keys::SHININESS, MaterialValue::Scalar(Self::parse_f32(&mut tokens, line_num, command)?)),
                "Ka" => (keys::AMBIENT, MaterialValue::Color(Self::parse_vec3(&mut tokens, line_num, command)?)),
                "Kd" => (keys::DIFFUSE, MaterialValue::Color(Self::parse_vec3(&mut tokens, line_num, command)?)),
                "Ks" => (keys::SPECULAR, MaterialValue::Color(Self::parse_vec3(&mut tokens, line_num, command)?)),
                "Ke" => (keys::EMISSIVE, MaterialValue::Color(Self::parse_vec3(&mut tokens, line_num, command)?)),
                "Ni" => (
                    keys::OPTICAL_DENSITY,
                    MaterialValue::Scalar(Self::parse_f32(&mut tokens, line_num, command)?),
                ),
                "d" => (keys::OPACITY, MaterialValue::Scalar(Self::parse_f32(&mut tokens, line_num, command)?)),
                // Transparency is inverted dissolve
                "Tr" => (
                    keys::OPACITY,
                    MaterialValue::Scalar(1.0 - Self::parse_f32(&mut tokens, line_num, command)?),
                ),
                "illum" => (keys::ILLUM, MaterialValue::Scalar(Self::parse_f32(&mut tokens, line_num, command)?)),
                "map_Kd" => (keys::DIFFUSE_MAP, Self::parse_texture_path(&mut tokens, line_num, command)?),
                "map_Ks" | "map_Ns" => (keys::SPECULAR_MAP, Self::parse_texture_path(&mut tokens, line_num, command)?),
                "map_Ka" => (keys::AMBIENT_MAP, Self::parse_texture_path(&mut tokens, line_num, command)?),
                "map_d" => (keys::OPACITY_MAP, Self::parse_texture_path(&mut tokens, line_num, command)?),
                "map_Bump" | "map_bump" | "bump" => {
                    (keys::NORMAL_MAP, Self::parse_texture_path(&mut tokens, line_num, command)?)
                }
                other => {
                    log::debug!("Line {}: unhandled MTL keyword '{}'", line_num + 1, other);
                    continue;
                }
            };

            material.set(key, value);
        }

        if let Some((name, material)) = current {
            materials.insert(name, material);
        }

        Ok(materials)
    }

    fn error(line_num: usize, message: impl Into<String>) -> MtlError {
        MtlError::Parse {
            line: line_num + 1,
            message: message.into(),
        }
    }

    fn parse_vec3<'a, I>(tokens: &mut I, line_num: usize, command: &str) -> Result<Vec3, MtlError>
    where
        I: Iterator<Item = &'a str>,
    {
        let r = Self::parse_f32(tokens, line_num, command)?;
        let g = Self::parse_f32(tokens, line_num, command)?;
        let b = Self::parse_f32(tokens, line_num, command)?;
        Ok(Vec3::new(r, g, b))
    }

    fn parse_f32<'a, I>(tokens: &mut I, line_num: usize, command: &str) -> Result<f32, MtlError>
    where
        I: Iterator<Item = &'a str>,
    {
        let token = tokens
            .next()
            .ok_or_else(|| Self::error(line_num, format!("{} missing value", command)))?;
        token
            .parse()
            .map_err(|_| Self::error(line_num, format!("{} invalid number '{}'", command, token)))
    }

    /// Texture statements may carry options (`-bm 0.5 file.png`); the
    /// filename is then the last token. Without options the whole remainder
    /// is the filename, which keeps paths containing spaces intact.
    fn parse_texture_path<'a, I>(tokens: &mut I, line_num: usize, command: &str) -> Result<MaterialValue, MtlError>
    where
        I: Iterator<Item = &'a str>,
    {
        let parts: Vec<&str> = tokens.collect();
        let path = match parts.first() {
            None => return Err(Self::error(line_num, format!("{} missing texture path", command))),
            Some(first) if first.starts_with('-') => parts.last().copied().unwrap_or_default().to_string(),
            Some(_) => parts.join(" "),
        };
        Ok(MaterialValue::Map(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_material() {
        let mtl_content = r#"
# Simple material
newmtl TestMaterial
Ka 1.0 1.0 1.0
Kd 0.8 0.2 0.2
Ks 0.5 0.5 0.5
Ns 250.0
d 1.0
illum 2
"#;

        let materials = MtlParser::parse(mtl_content).unwrap();
        assert_eq!(materials.len(), 1);

        let mat = materials.get("TestMaterial").unwrap();
        assert_eq!(mat.color(keys::DIFFUSE), Some(Vec3::new(0.8, 0.2, 0.2)));
        assert_eq!(mat.color(keys::AMBIENT), Some(Vec3::new(1.0, 1.0, 1.0)));
        assert_eq!(mat.scalar(keys::SHININESS), Some(250.0));
        assert_eq!(mat.scalar(keys::OPACITY), Some(1.0));
        assert_eq!(mat.scalar(keys::ILLUM), Some(2.0));
    }

    #[test]
    fn test_parse_material_with_textures() {
        let mtl_content = r#"
newmtl TexturedMaterial
map_Kd textures/diffuse.png
map_Ns specular.png
bump -bm 0.5 textures/normal.png
map_Ka my texture.png
"#;

        let materials = MtlParser::parse(mtl_content).unwrap();
        let mat = materials.get("TexturedMaterial").unwrap();

        assert_eq!(mat.get(keys::DIFFUSE_MAP), Some(&MaterialValue::Map("textures/diffuse.png".to_string())));
        assert_eq!(mat.get(keys::SPECULAR_MAP), Some(&MaterialValue::Map("specular.png".to_string())));
        assert_eq!(mat.get(keys::NORMAL_MAP), Some(&MaterialValue::Map("textures/normal.png".to_string())));
        assert_eq!(mat.get(keys::AMBIENT_MAP), Some(&MaterialValue::Map("my texture.png".to_string())));
    }

    #[test]
    fn test_parse_multiple_materials() {
        let mtl_content = r#"
newmtl Material1
Kd 1.0 0.0 0.0

newmtl Material2
Kd 0.0 1.0 0.0
Ke 0.1 0.1 0.1
"#;

        let materials = MtlParser::parse(mtl_content).unwrap();
        assert_eq!(materials.len(), 2);
        assert_eq!(materials["Material1"].len(), 1);
        assert_eq!(materials["Material2"].color(keys::EMISSIVE), Some(Vec3::new(0.1, 0.1, 0.1)));
    }

    #[test]
    fn test_parse_transparency() {
        let materials = MtlParser::parse("newmtl Glass\nTr 0.25\n").unwrap();
        assert_eq!(materials["Glass"].scalar(keys::OPACITY), Some(0.75));
    }

    #[test]
    fn test_missing_value_reports_line() {
        let err = MtlParser::parse("newmtl Broken\nKd 1.0 0.5\n").unwrap_err();
        assert_eq!(
            err,
            MtlError::Parse {
                line: 2,
                message: "Kd missing value".to_string()
            }
        );
    }

    #[test]
    fn test_statements_before_newmtl_are_ignored() {
        let materials = MtlParser::parse("Kd 1 1 1\nnewmtl A\nfoo bar\n").unwrap();
        assert_eq!(materials.len(), 1);
        assert!(materials["A"].is_empty());
    }
}
