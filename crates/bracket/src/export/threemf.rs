//! 3MF package generation.

use std::fmt::Write as _;
use std::io::{Cursor, Write};

use bracket_kernel::TriangleMesh;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use super::{ExportError, Result};
use crate::params::BracketParams;

/// A single-object 3MF model.
pub struct ThreeMfModel {
    /// Object name.
    pub name: String,
    /// Mesh vertices (x, y, z triplets), millimeters.
    pub vertices: Vec<f32>,
    /// Triangle indices.
    pub indices: Vec<u32>,
    /// Parameters the object was generated from, stored as metadata.
    pub params: Option<BracketParams>,
}

impl ThreeMfModel {
    /// Create a model from a triangle mesh.
    pub fn from_mesh(name: impl Into<String>, mesh: &TriangleMesh) -> Self {
        Self {
            name: name.into(),
            vertices: mesh.flat_vertices(),
            indices: mesh.flat_indices(),
            params: None,
        }
    }

    /// Attach the generating parameters.
    pub fn with_params(mut self, params: &BracketParams) -> Self {
        self.params = Some(params.clone());
        self
    }

    /// Generate the 3MF archive as bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        if self.indices.is_empty() {
            return Err(ExportError::EmptyGeometry);
        }
        let mut entries = vec![
            ("[Content_Types].xml", content_types_xml()),
            ("_rels/.rels", rels_xml()),
            ("3D/3dmodel.model", self.model_xml()),
            ("Metadata/model_settings.config", self.model_settings_xml()),
        ];
        if let Some(params) = &self.params {
            let json = serde_json::to_string_pretty(params)?;
            entries.push(("Metadata/bracket_params.json", json));
        }

        let mut buffer = Cursor::new(Vec::new());
        let mut zip = ZipWriter::new(&mut buffer);
        let options = SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated)
            .compression_level(Some(6));
        for (path, contents) in &entries {
            zip.start_file(*path, options)?;
            zip.write_all(contents.as_bytes())?;
        }
        zip.finish()?;

        Ok(buffer.into_inner())
    }

    fn model_xml(&self) -> String {
        let mut vertices_xml = String::new();
        for v in self.vertices.chunks_exact(3) {
            let _ = writeln!(
                vertices_xml,
                "                    <vertex x=\"{:.6}\" y=\"{:.6}\" z=\"{:.6}\"/>",
                v[0], v[1], v[2]
            );
        }

        let mut triangles_xml = String::new();
        for t in self.indices.chunks_exact(3) {
            let _ = writeln!(
                triangles_xml,
                "                    <triangle v1=\"{}\" v2=\"{}\" v3=\"{}\"/>",
                t[0], t[1], t[2]
            );
        }

        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<model unit="millimeter" xml:lang="en-US" xmlns="http://schemas.microsoft.com/3dmanufacturing/core/2015/02" xmlns:p="http://schemas.microsoft.com/3dmanufacturing/production/2015/06">
    <metadata name="Application">bracket</metadata>
    <metadata name="Title">{name}</metadata>
    <resources>
        <object id="1" name="{name}" type="model">
            <mesh>
                <vertices>
{vertices_xml}                </vertices>
                <triangles>
{triangles_xml}                </triangles>
            </mesh>
        </object>
    </resources>
    <build p:UUID="{build_uuid}">
        <item objectid="1" transform="1 0 0 0 1 0 0 0 1 0 0 0" p:UUID="{item_uuid}"/>
    </build>
</model>"#,
            name = xml_escape(&self.name),
            build_uuid = uuid::Uuid::new_v4(),
            item_uuid = uuid::Uuid::new_v4(),
        )
    }

    fn model_settings_xml(&self) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<config>
    <object id="1">
        <metadata key="name" value="{name}"/>
        <part id="1" subtype="normal_part">
            <metadata key="name" value="{name}"/>
        </part>
    </object>
</config>"#,
            name = xml_escape(&self.name)
        )
    }
}

fn content_types_xml() -> String {
    r#"<?xml version="1.0" encoding="UTF-8"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
    <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
    <Default Extension="model" ContentType="application/vnd.ms-package.3dmanufacturing-3dmodel+xml"/>
    <Default Extension="json" ContentType="application/json"/>
    <Default Extension="config" ContentType="text/xml"/>
</Types>"#
        .to_string()
}

fn rels_xml() -> String {
    r#"<?xml version="1.0" encoding="UTF-8"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
    <Relationship Target="/3D/3dmodel.model" Id="rel-1" Type="http://schemas.microsoft.com/3dmanufacturing/2013/01/3dmodel"/>
</Relationships>"#
        .to_string()
}

fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
