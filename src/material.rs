use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::Result;

/// A textured material written to an MTL file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterialSpec {
    pub name: String,
    pub texture_path: String,
}

impl MaterialSpec {
    pub fn new(name: impl Into<String>, texture_path: impl Into<String>) -> MaterialSpec {
        MaterialSpec {
            name: name.into(),
            texture_path: texture_path.into(),
        }
    }

    /// White ambient and diffuse, no specular, fully opaque, with the texture mapped to both
    /// ambient and diffuse.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        writeln!(writer, "newmtl {}", self.name)?;
        writeln!(writer, "Ns 10.0000")?;
        writeln!(writer, "d 1.0000")?;
        writeln!(writer, "Tr 0.0000")?;
        writeln!(writer, "illum 2")?;
        writeln!(writer, "Ka 1.000 1.000 1.000")?;
        writeln!(writer, "Kd 1.000 1.000 1.000")?;
        writeln!(writer, "Ks 0.000 0.000 0.000")?;
        writeln!(writer, "map_Ka {}", self.texture_path)?;
        writeln!(writer, "map_Kd {}", self.texture_path)?;
        Ok(())
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        ensure_parent_dir(path)?;

        let mut writer = BufWriter::new(File::create(path)?);
        self.write_to(&mut writer)?;
        writer.flush()?;

        log::info!("Wrote material '{}' to {:?}", self.name, path);
        Ok(())
    }
}

/// The `mtllib`/`usemtl` pair referencing a material from an OBJ file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterialLink {
    pub library: String,
    pub name: String,
}

/// Creates the parent directory of `path` if it has one and it doesn't exist yet.
pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            log::debug!("Creating directory {:?}", parent);
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
