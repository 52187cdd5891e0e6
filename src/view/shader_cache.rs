use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use naga::valid::{Capabilities, ModuleInfo, ValidationFlags, Validator};
use naga_oil::compose::{ComposableModuleDescriptor, Composer, NagaModuleDescriptor};
use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;
use smol_str::SmolStr;

const SDF_SOURCE: &str = include_str!("../shader/sdf.wgsl");
const SDF_PATH: &str = "shader/sdf.wgsl";

static GLOBAL: Lazy<Arc<ShaderCache>> = Lazy::new(|| Arc::new(ShaderCache::new()));

#[derive(Debug, thiserror::Error)]
pub enum ShaderError {
    #[error("failed to compose shader `{key}`: {message}")]
    Compose { key: SmolStr, message: String },
    #[error("shader `{key}` failed validation: {message}")]
    Validation { key: SmolStr, message: String },
}

/// Composed and validated shader IR, shared between the software and GPU backends.
#[derive(Debug)]
pub struct ShaderProgram {
    pub key: SmolStr,
    pub module: naga::Module,
    pub info: ModuleInfo,
}

impl ShaderProgram {
    pub fn has_entry_point(&self, name: &str) -> bool {
        self.module.entry_points.iter().any(|ep| ep.name == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinShader {
    Blur,
    ColorMatrix,
    Lens,
    Highlight,
}

impl BuiltinShader {
    pub const ALL: [BuiltinShader; 4] = [
        BuiltinShader::Blur,
        BuiltinShader::ColorMatrix,
        BuiltinShader::Lens,
        BuiltinShader::Highlight,
    ];

    pub fn key(self) -> &'static str {
        match self {
            BuiltinShader::Blur => "rfglass.blur",
            BuiltinShader::ColorMatrix => "rfglass.color_matrix",
            BuiltinShader::Lens => "rfglass.lens",
            BuiltinShader::Highlight => "rfglass.highlight",
        }
    }

    pub fn source(self) -> &'static str {
        match self {
            BuiltinShader::Blur => include_str!("../shader/blur.wgsl"),
            BuiltinShader::ColorMatrix => include_str!("../shader/color_matrix.wgsl"),
            BuiltinShader::Lens => include_str!("../shader/lens.wgsl"),
            BuiltinShader::Highlight => include_str!("../shader/highlight.wgsl"),
        }
    }
}

/// Append-only map from shader key to compiled program. Entries live as long as the
/// cache; failed compilations are not stored.
pub struct ShaderCache {
    programs: Mutex<FxHashMap<SmolStr, Arc<ShaderProgram>>>,
    compilations: AtomicU64,
}

impl Default for ShaderCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ShaderCache {
    pub fn new() -> Self {
        Self {
            programs: Mutex::new(FxHashMap::default()),
            compilations: AtomicU64::new(0),
        }
    }

    /// The process-wide cache.
    pub fn global() -> Arc<ShaderCache> {
        GLOBAL.clone()
    }

    pub fn get(&self, key: &str) -> Option<Arc<ShaderProgram>> {
        self.programs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    pub fn get_or_compile(
        &self,
        key: impl Into<SmolStr>,
        source: &str,
    ) -> Result<Arc<ShaderProgram>, ShaderError> {
        let key = key.into();
        let mut programs = self.programs.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(program) = programs.get(&key) {
            return Ok(program.clone());
        }

        self.compilations.fetch_add(1, Ordering::Relaxed);
        let program = Arc::new(compile(&key, source)?);
        tracing::debug!(key = %key, "compiled shader");
        programs.insert(key, program.clone());
        Ok(program)
    }

    pub fn builtin(&self, shader: BuiltinShader) -> Result<Arc<ShaderProgram>, ShaderError> {
        self.get_or_compile(shader.key(), shader.source())
    }

    /// Looks up a builtin, logging and swallowing failures so callers can degrade to a no-op.
    pub fn builtin_or_warn(&self, shader: BuiltinShader) -> Option<Arc<ShaderProgram>> {
        match self.builtin(shader) {
            Ok(program) => Some(program),
            Err(err) => {
                tracing::warn!(error = %err, "shader unavailable, effect skipped");
                None
            }
        }
    }

    pub fn compilations(&self) -> u64 {
        self.compilations.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.programs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn compile(key: &SmolStr, source: &str) -> Result<ShaderProgram, ShaderError> {
    let mut composer = Composer::default();
    composer
        .add_composable_module(ComposableModuleDescriptor {
            source: SDF_SOURCE,
            file_path: SDF_PATH,
            ..Default::default()
        })
        .map(|_| ())
        .map_err(|err| ShaderError::Compose {
            key: key.clone(),
            message: err.emit_to_string(&composer),
        })?;

    let file_path = format!("{key}.wgsl");
    let module = composer
        .make_naga_module(NagaModuleDescriptor {
            source,
            file_path: &file_path,
            ..Default::default()
        })
        .map_err(|err| ShaderError::Compose {
            key: key.clone(),
            message: err.emit_to_string(&composer),
        })?;

    let info = Validator::new(ValidationFlags::all(), Capabilities::default())
        .validate(&module)
        .map_err(|err| ShaderError::Validation {
            key: key.clone(),
            message: err.into_inner().to_string(),
        })?;

    Ok(ShaderProgram {
        key: key.clone(),
        module,
        info,
    })
}
