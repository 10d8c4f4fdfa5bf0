//! CPU-side uniform blocks laid out with WGSL uniform address-space rules.

use crate::coords::Vec2;
use crate::device::{RendererError, UniformStage};
use crate::paint::Color;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum UniformType {
    Float,
    Int,
    UInt,
    Vec2,
    Vec3,
    Vec4,
    Mat4,
}

impl UniformType {
    pub fn size(self) -> u32 {
        match self {
            UniformType::Float | UniformType::Int | UniformType::UInt => 4,
            UniformType::Vec2 => 8,
            UniformType::Vec3 => 12,
            UniformType::Vec4 => 16,
            UniformType::Mat4 => 64,
        }
    }

    pub fn align(self) -> u32 {
        match self {
            UniformType::Float | UniformType::Int | UniformType::UInt => 4,
            UniformType::Vec2 => 8,
            UniformType::Vec3 | UniformType::Vec4 | UniformType::Mat4 => 16,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UniformDesc {
    pub name: String,
    pub ty: UniformType,
    pub stage: UniformStage,
}

impl UniformDesc {
    pub fn new(name: impl Into<String>, ty: UniformType, stage: UniformStage) -> Self {
        Self {
            name: name.into(),
            ty,
            stage,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Int(i32),
    UInt(u32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
    /// Column-major.
    Mat4([[f32; 4]; 4]),
}

impl UniformValue {
    pub fn ty(&self) -> UniformType {
        match self {
            UniformValue::Float(_) => UniformType::Float,
            UniformValue::Int(_) => UniformType::Int,
            UniformValue::UInt(_) => UniformType::UInt,
            UniformValue::Vec2(_) => UniformType::Vec2,
            UniformValue::Vec3(_) => UniformType::Vec3,
            UniformValue::Vec4(_) => UniformType::Vec4,
            UniformValue::Mat4(_) => UniformType::Mat4,
        }
    }

    fn bytes(&self) -> &[u8] {
        match self {
            UniformValue::Float(v) => bytemuck::bytes_of(v),
            UniformValue::Int(v) => bytemuck::bytes_of(v),
            UniformValue::UInt(v) => bytemuck::bytes_of(v),
            UniformValue::Vec2(v) => bytemuck::bytes_of(v),
            UniformValue::Vec3(v) => bytemuck::bytes_of(v),
            UniformValue::Vec4(v) => bytemuck::bytes_of(v),
            UniformValue::Mat4(v) => bytemuck::bytes_of(v),
        }
    }
}

impl From<f32> for UniformValue {
    fn from(v: f32) -> Self {
        UniformValue::Float(v)
    }
}

impl From<i32> for UniformValue {
    fn from(v: i32) -> Self {
        UniformValue::Int(v)
    }
}

impl From<u32> for UniformValue {
    fn from(v: u32) -> Self {
        UniformValue::UInt(v)
    }
}

impl From<Vec2> for UniformValue {
    fn from(v: Vec2) -> Self {
        UniformValue::Vec2(v.to_array())
    }
}

impl From<[f32; 3]> for UniformValue {
    fn from(v: [f32; 3]) -> Self {
        UniformValue::Vec3(v)
    }
}

impl From<[f32; 4]> for UniformValue {
    fn from(v: [f32; 4]) -> Self {
        UniformValue::Vec4(v)
    }
}

impl From<Color> for UniformValue {
    fn from(c: Color) -> Self {
        UniformValue::Vec4(c.to_f32_array())
    }
}

#[derive(Debug, Clone)]
struct UniformField {
    name: String,
    ty: UniformType,
    offset: u32,
}

/// Packed bytes of a shader's uniform block plus a dirty flag for upload.
#[derive(Debug, Clone)]
pub struct UniformBlock {
    fields: Vec<UniformField>,
    data: Vec<u8>,
    stage: Option<UniformStage>,
    dirty: bool,
}

fn align_up(v: u32, align: u32) -> u32 {
    v.div_ceil(align) * align
}

impl UniformBlock {
    pub fn new(descs: &[UniformDesc]) -> Result<Self, RendererError> {
        let mut fields: Vec<UniformField> = Vec::with_capacity(descs.len());
        let mut cursor = 0;
        let mut stage: Option<UniformStage> = None;

        for desc in descs {
            if desc.name.is_empty() || fields.iter().any(|f| f.name == desc.name) {
                return Err(RendererError::InvalidDescriptor(format!(
                    "uniform name `{}` is empty or declared twice",
                    desc.name
                )));
            }
            let offset = align_up(cursor, desc.ty.align());
            cursor = offset + desc.ty.size();
            stage = Some(stage.map_or(desc.stage, |s| s.union(desc.stage)));
            fields.push(UniformField {
                name: desc.name.clone(),
                ty: desc.ty,
                offset,
            });
        }

        let size = if fields.is_empty() { 0 } else { align_up(cursor, 16) };
        Ok(Self {
            fields,
            data: vec![0; size as usize],
            stage,
            dirty: size > 0,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    /// Union of the stages of every field; `None` for an empty block.
    pub fn stage(&self) -> Option<UniformStage> {
        self.stage
    }

    pub fn offset_of(&self, name: &str) -> Option<u32> {
        self.fields.iter().find(|f| f.name == name).map(|f| f.offset)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// Writes `value` into the named field.
    ///
    /// Returns `Ok(false)` for an unknown name so the caller can report it
    /// with its own context.
    pub fn set(&mut self, name: &str, value: UniformValue) -> Result<bool, RendererError> {
        let Some(field) = self.fields.iter().find(|f| f.name == name) else {
            return Ok(false);
        };
        if field.ty != value.ty() {
            return Err(RendererError::UniformTypeMismatch {
                name: name.to_string(),
                expected: field.ty,
                found: value.ty(),
            });
        }
        let start = field.offset as usize;
        let bytes = value.bytes();
        self.data[start..start + bytes.len()].copy_from_slice(bytes);
        self.dirty = true;
        Ok(true)
    }

    /// Bytes to upload when anything changed since the last call.
    pub fn take_dirty(&mut self) -> Option<&[u8]> {
        if std::mem::take(&mut self.dirty) {
            Some(&self.data)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(fields: &[(&str, UniformType)]) -> UniformBlock {
        let descs: Vec<_> = fields
            .iter()
            .map(|(n, t)| UniformDesc::new(*n, *t, UniformStage::Fragment))
            .collect();
        UniformBlock::new(&descs).unwrap()
    }

    #[test]
    fn layout_follows_wgsl_alignment() {
        let b = block(&[
            ("time", UniformType::Float),
            ("offset", UniformType::Vec2),
            ("tint", UniformType::Vec3),
            ("strength", UniformType::Float),
            ("transform", UniformType::Mat4),
        ]);
        assert_eq!(b.offset_of("time"), Some(0));
        assert_eq!(b.offset_of("offset"), Some(8));
        assert_eq!(b.offset_of("tint"), Some(16));
        assert_eq!(b.offset_of("strength"), Some(28));
        assert_eq!(b.offset_of("transform"), Some(32));
        assert_eq!(b.size(), 96);
    }

    #[test]
    fn size_rounds_up_to_sixteen() {
        let b = block(&[("resolution", UniformType::Vec2), ("time", UniformType::Float)]);
        assert_eq!(b.size(), 16);
    }

    #[test]
    fn empty_block_has_no_stage() {
        let b = UniformBlock::new(&[]).unwrap();
        assert!(b.is_empty());
        assert_eq!(b.size(), 0);
        assert_eq!(b.stage(), None);
    }

    #[test]
    fn stages_are_combined() {
        let b = UniformBlock::new(&[
            UniformDesc::new("a", UniformType::Float, UniformStage::Vertex),
            UniformDesc::new("b", UniformType::Float, UniformStage::Fragment),
        ])
        .unwrap();
        assert_eq!(b.stage(), Some(UniformStage::Both));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let descs = [
            UniformDesc::new("a", UniformType::Float, UniformStage::Vertex),
            UniformDesc::new("a", UniformType::Vec2, UniformStage::Vertex),
        ];
        assert!(UniformBlock::new(&descs).is_err());
    }

    #[test]
    fn set_writes_bytes_and_marks_dirty() {
        let mut b = block(&[("time", UniformType::Float), ("offset", UniformType::Vec2)]);
        assert!(b.take_dirty().is_some());
        assert!(b.take_dirty().is_none());

        assert!(b.set("offset", Vec2::new(1.0, 2.0).into()).unwrap());
        let bytes = b.take_dirty().unwrap();
        assert_eq!(&bytes[8..12], &1.0f32.to_le_bytes());
        assert_eq!(&bytes[12..16], &2.0f32.to_le_bytes());
    }

    #[test]
    fn set_checks_type_and_name() {
        let mut b = block(&[("time", UniformType::Float)]);
        assert!(!b.set("missing", 1.0f32.into()).unwrap());
        match b.set("time", UniformValue::Int(3)) {
            Err(RendererError::UniformTypeMismatch { expected, found, .. }) => {
                assert_eq!(expected, UniformType::Float);
                assert_eq!(found, UniformType::Int);
            }
            other => panic!("expected type mismatch, got {other:?}"),
        }
    }
}
