//! Post-processing shader compilation and uniform reflection
//!
//! A post shader is a WGSL fragment entry point `fs_main` written against the
//! prelude in `post_prelude.wgsl`, which provides `VertexOutput`, the vertex
//! stage and the sampled texture at `@group(0)`. User uniforms live in a
//! single buffer at `@group(1) @binding(0)`.
//!
//! Uniform locations are the byte offset of the member divided by four, so
//! every location addresses one 32-bit slot of the block.

use naga::{
    valid::{Capabilities, ValidationFlags, Validator},
    AddressSpace, ResourceBinding, ShaderStage, TypeInner,
};

use crate::error::{Result, SolarisError};

pub const POST_PRELUDE: &str = include_str!("post_prelude.wgsl");
pub const SPRITE_FRAG: &str = include_str!("sprite.wgsl");

pub const UNIFORM_GROUP: u32 = 1;

/// One named member of the uniform block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformMember {
    pub name: String,
    pub offset: u32,
    pub size: u32,
}

/// Reflected layout of the `@group(1) @binding(0)` uniform block
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UniformLayout {
    pub members: Vec<UniformMember>,
    pub size: u32,
}

impl UniformLayout {
    /// Location of `name`, or -1 when the block has no such member
    ///
    /// `pass` is reserved in WGSL, so a member `name_` also answers to `name`.
    pub fn location(&self, name: &str) -> i32 {
        let suffixed = format!("{}_", name);
        self.members
            .iter()
            .find(|member| member.name == name)
            .or_else(|| self.members.iter().find(|member| member.name == suffixed))
            .map(|member| (member.offset / 4) as i32)
            .unwrap_or(-1)
    }

    /// Size of the GPU buffer backing this layout
    pub fn buffer_size(&self) -> u64 {
        (self.size.max(16) as u64).div_ceil(16) * 16
    }
}

/// CPU copy of a shader's uniform block
#[derive(Debug, Clone, PartialEq)]
pub struct UniformBlock {
    data: Vec<u8>,
}

impl UniformBlock {
    pub fn new(layout: &UniformLayout) -> Self {
        Self {
            data: vec![0; layout.buffer_size() as usize],
        }
    }

    /// Writes `value` at `location`; negative or out-of-range locations are ignored
    pub fn set_i32(&mut self, location: i32, value: i32) -> bool {
        if location < 0 {
            return false;
        }
        let start = location as usize * 4;
        match self.data.get_mut(start..start + 4) {
            Some(slot) => {
                slot.copy_from_slice(&value.to_le_bytes());
                true
            }
            None => false,
        }
    }

    pub fn get_i32(&self, location: i32) -> Option<i32> {
        if location < 0 {
            return None;
        }
        let start = location as usize * 4;
        self.data
            .get(start..start + 4)
            .map(|bytes| i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

/// Validated WGSL of a post shader plus its uniform layout
#[derive(Debug, Clone)]
pub struct PostShaderSource {
    pub wgsl: String,
    pub layout: UniformLayout,
}

impl PostShaderSource {
    /// Prepends the prelude to `fragment`, validates it and reflects its uniforms
    pub fn compile(fragment: &str) -> Result<Self> {
        let wgsl = format!("{}\n{}", POST_PRELUDE, fragment);

        let module = naga::front::wgsl::parse_str(&wgsl)
            .map_err(|err| SolarisError::ShaderCompile(err.emit_to_string(&wgsl)))?;

        Validator::new(ValidationFlags::all(), Capabilities::all())
            .validate(&module)
            .map_err(|err| SolarisError::ShaderCompile(err.to_string()))?;

        let has_fragment = module
            .entry_points
            .iter()
            .any(|entry| entry.name == "fs_main" && entry.stage == ShaderStage::Fragment);
        if !has_fragment {
            return Err(SolarisError::ShaderCompile(
                "missing @fragment entry point fs_main".to_string(),
            ));
        }

        let layout = reflect_uniforms(&module)?;
        log::debug!(
            "post shader compiled, uniform block {} bytes: {:?}",
            layout.size,
            layout
                .members
                .iter()
                .map(|m| m.name.as_str())
                .collect::<Vec<_>>()
        );

        Ok(Self { wgsl, layout })
    }
}

fn reflect_uniforms(module: &naga::Module) -> Result<UniformLayout> {
    let mut layout = UniformLayout::default();

    for (_, global) in module.global_variables.iter() {
        let Some(ResourceBinding { group, binding }) = global.binding else {
            continue;
        };

        match (group, binding) {
            (0, 0) | (0, 1) => {}
            (UNIFORM_GROUP, 0) if global.space == AddressSpace::Uniform => {
                let ty = &module.types[global.ty];
                layout = match &ty.inner {
                    TypeInner::Struct { members, span } => UniformLayout {
                        members: members
                            .iter()
                            .map(|member| UniformMember {
                                name: member.name.clone().unwrap_or_default(),
                                offset: member.offset,
                                size: module.types[member.ty].inner.size(module.to_ctx()),
                            })
                            .collect(),
                        size: *span,
                    },
                    inner => {
                        let size = inner.size(module.to_ctx());
                        UniformLayout {
                            members: vec![UniformMember {
                                name: global.name.clone().unwrap_or_default(),
                                offset: 0,
                                size,
                            }],
                            size,
                        }
                    }
                };
            }
            _ => {
                return Err(SolarisError::ShaderCompile(format!(
                    "unsupported binding @group({}) @binding({}); post shaders may only add a uniform block at @group({}) @binding(0)",
                    group, binding, UNIFORM_GROUP
                )))
            }
        }
    }

    Ok(layout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::BLUR_FRAG;

    #[test]
    fn test_blur_shader_exposes_pass() {
        let shader = PostShaderSource::compile(BLUR_FRAG).unwrap();
        assert_eq!(shader.layout.location("pass"), 0);
        assert_eq!(shader.layout.location("strength"), -1);
        assert_eq!(shader.layout.buffer_size(), 16);
    }

    #[test]
    fn test_default_sprite_fragment_has_no_uniforms() {
        let shader = PostShaderSource::compile(SPRITE_FRAG).unwrap();
        assert!(shader.layout.members.is_empty());
        assert_eq!(shader.layout.location("pass"), -1);
    }

    #[test]
    fn test_member_offsets_become_locations() {
        let fragment = r#"
            struct Params {
                strength: f32,
                radius: i32,
                tint: vec4<f32>,
            }
            @group(1) @binding(0) var<uniform> params: Params;

            @fragment
            fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
                return textureSample(t_texture, s_texture, in.uv) * params.tint * params.strength;
            }
        "#;
        let layout = PostShaderSource::compile(fragment).unwrap().layout;

        assert_eq!(layout.location("strength"), 0);
        assert_eq!(layout.location("radius"), 1);
        assert_eq!(layout.location("tint"), 4);
        assert_eq!(layout.buffer_size(), 32);
    }

    #[test]
    fn test_syntax_error_is_reported() {
        let result = PostShaderSource::compile("@fragment fn fs_main( {");
        assert!(matches!(result, Err(SolarisError::ShaderCompile(_))));
    }

    #[test]
    fn test_missing_entry_point_is_rejected() {
        let result = PostShaderSource::compile("fn helper() -> f32 { return 1.0; }");
        assert!(matches!(result, Err(SolarisError::ShaderCompile(message)) if message.contains("fs_main")));
    }

    #[test]
    fn test_foreign_binding_is_rejected() {
        let fragment = r#"
            @group(2) @binding(0) var<uniform> extra: vec4<f32>;

            @fragment
            fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
                return extra;
            }
        "#;
        assert!(PostShaderSource::compile(fragment).is_err());
    }

    #[test]
    fn test_block_writes_by_location() {
        let layout = PostShaderSource::compile(BLUR_FRAG).unwrap().layout;
        let mut block = UniformBlock::new(&layout);

        assert!(block.set_i32(0, 1));
        assert_eq!(block.get_i32(0), Some(1));
        assert_eq!(&block.as_bytes()[..4], &1i32.to_le_bytes());

        assert!(!block.set_i32(-1, 7));
        assert!(!block.set_i32(4, 7));
        assert_eq!(block.as_bytes().len(), 16);
    }
}
