use super::{RendererError, ShaderStage};

pub const VERTEX_ENTRY: &str = "vs_main";
pub const FRAGMENT_ENTRY: &str = "fs_main";

/// Parses and validates WGSL, and checks the stage's entry point exists.
pub fn validate_wgsl(stage: ShaderStage, source: &str) -> Result<(), RendererError> {
    let compile_error = |message: String| RendererError::ShaderCompilation { stage, message };

    let module = naga::front::wgsl::parse_str(source)
        .map_err(|e| compile_error(e.emit_to_string(source)))?;

    naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    )
    .validate(&module)
    .map_err(|e| compile_error(format!("{e}")))?;

    let (entry, naga_stage) = match stage {
        ShaderStage::Vertex => (VERTEX_ENTRY, naga::ShaderStage::Vertex),
        ShaderStage::Fragment => (FRAGMENT_ENTRY, naga::ShaderStage::Fragment),
    };
    let found = module
        .entry_points
        .iter()
        .any(|ep| ep.name == entry && ep.stage == naga_stage);
    if !found {
        return Err(compile_error(format!("missing {stage} entry point `{entry}`")));
    }

    Ok(())
}
