use std::fmt;
use std::path::Path;

use super::handle::{GpuHandle, ResourceId};

/// Pipeline stage a WGSL entry point belongs to.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
    Compute,
}

impl ShaderStage {
    /// Entry point name every program uses for this stage.
    pub const fn entry_point(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vs_main",
            ShaderStage::Fragment => "fs_main",
            ShaderStage::Compute => "cs_main",
        }
    }

    fn from_naga(stage: naga::ShaderStage) -> Option<Self> {
        match stage {
            naga::ShaderStage::Vertex => Some(ShaderStage::Vertex),
            naga::ShaderStage::Fragment => Some(ShaderStage::Fragment),
            naga::ShaderStage::Compute => Some(ShaderStage::Compute),
            _ => None,
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::Fragment => "fragment",
            ShaderStage::Compute => "compute",
        };
        f.write_str(name)
    }
}

/// A compiled WGSL module.
///
/// Compilation never panics: invalid source is logged with the full
/// diagnostic and yields an unusable handle.
#[derive(Default)]
pub struct Shader {
    id: ResourceId,
    label: String,
    stages: Vec<ShaderStage>,
    module: Option<wgpu::ShaderModule>,
}

impl Shader {
    pub fn compile(device: &wgpu::Device, label: &str, source: &str) -> Self {
        let stages = match validate_wgsl(source) {
            Ok(stages) => stages,
            Err(diagnostic) => {
                log::error!("failed to compile shader '{label}':\n{diagnostic}");
                return Self {
                    label: label.to_string(),
                    ..Self::default()
                };
            }
        };

        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });

        Self {
            id: ResourceId::next(),
            label: label.to_string(),
            stages,
            module: Some(module),
        }
    }

    /// Reads and compiles a WGSL file. A missing file compiles as empty source.
    pub fn from_file(device: &wgpu::Device, path: &Path) -> Self {
        let label = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let source = Self::read_source(path);
        Self::compile(device, &label, &source)
    }

    /// Best-effort read of shader text; failures are logged and yield "".
    pub fn read_source(path: &Path) -> String {
        match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                log::error!("failed to read shader source {}: {e}", path.display());
                String::new()
            }
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn stages(&self) -> &[ShaderStage] {
        &self.stages
    }

    pub fn module(&self) -> Option<&wgpu::ShaderModule> {
        self.module.as_ref()
    }
}

impl GpuHandle for Shader {
    fn id(&self) -> ResourceId {
        self.id
    }

    fn release(&mut self) {
        self.module = None;
        self.stages.clear();
        self.id = ResourceId::NULL;
    }
}

/// Parses and validates WGSL, returning the stages it provides entry points for.
///
/// Source without any recognised entry point is rejected; this is also how an
/// empty (unreadable) shader file surfaces as a compile failure.
pub fn validate_wgsl(source: &str) -> Result<Vec<ShaderStage>, String> {
    let module = naga::front::wgsl::parse_str(source).map_err(|e| e.emit_to_string(source))?;

    let mut validator = naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    );
    validator
        .validate(&module)
        .map_err(|e| format!("validation error: {}", e.as_inner()))?;

    let mut stages = Vec::new();
    for ep in &module.entry_points {
        let Some(stage) = ShaderStage::from_naga(ep.stage) else { continue };
        if ep.name == stage.entry_point() && !stages.contains(&stage) {
            stages.push(stage);
        }
    }

    if stages.is_empty() {
        return Err("no vs_main, fs_main or cs_main entry point".to_string());
    }

    Ok(stages)
}

/// Which stages a program must provide.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ProgramKind {
    Graphics,
    Compute,
}

impl ProgramKind {
    pub const fn required_stages(self) -> &'static [ShaderStage] {
        match self {
            ProgramKind::Graphics => &[ShaderStage::Vertex, ShaderStage::Fragment],
            ProgramKind::Compute => &[ShaderStage::Compute],
        }
    }
}

/// A linked set of shaders ready to build pipelines from.
#[derive(Default)]
pub struct ShaderProgram {
    id: ResourceId,
    label: String,
    shaders: Vec<Shader>,
}

impl ShaderProgram {
    /// Links `shaders` into a program of `kind`.
    ///
    /// Fails (logged, unusable result) when a shader did not compile or a
    /// required stage has no entry point.
    pub fn link(label: &str, kind: ProgramKind, shaders: Vec<Shader>) -> Self {
        if let Some(bad) = shaders.iter().find(|s| !s.is_usable()) {
            log::error!(
                "failed to link program '{label}': shader '{}' did not compile",
                bad.label()
            );
            return Self::unlinked(label);
        }

        let available: Vec<ShaderStage> = shaders
            .iter()
            .flat_map(|s| s.stages().iter().copied())
            .collect();
        let missing = missing_stages(kind, &available);
        if !missing.is_empty() {
            let names: Vec<String> = missing.iter().map(|s| s.to_string()).collect();
            log::error!(
                "failed to link program '{label}': missing {} stage",
                names.join(" and ")
            );
            return Self::unlinked(label);
        }

        Self {
            id: ResourceId::next(),
            label: label.to_string(),
            shaders,
        }
    }

    /// Compiles a single WGSL file holding every stage of the program.
    pub fn from_file(device: &wgpu::Device, kind: ProgramKind, path: &Path) -> Self {
        let shader = Shader::from_file(device, path);
        let label = shader.label().to_string();
        Self::link(&label, kind, vec![shader])
    }

    fn unlinked(label: &str) -> Self {
        Self {
            label: label.to_string(),
            ..Self::default()
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Module and entry point providing `stage`, if the program is usable.
    pub fn stage(&self, stage: ShaderStage) -> Option<(&wgpu::ShaderModule, &'static str)> {
        if !self.is_usable() {
            return None;
        }
        self.shaders
            .iter()
            .find(|s| s.stages().contains(&stage))
            .and_then(|s| s.module())
            .map(|m| (m, stage.entry_point()))
    }
}

impl GpuHandle for ShaderProgram {
    fn id(&self) -> ResourceId {
        self.id
    }

    fn release(&mut self) {
        for shader in &mut self.shaders {
            shader.release();
        }
        self.shaders.clear();
        self.id = ResourceId::NULL;
    }
}

pub(crate) fn missing_stages(kind: ProgramKind, available: &[ShaderStage]) -> Vec<ShaderStage> {
    kind.required_stages()
        .iter()
        .copied()
        .filter(|s| !available.contains(s))
        .collect()
}
