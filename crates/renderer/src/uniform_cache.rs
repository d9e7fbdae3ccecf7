//! Memoized lookup of shader-visible uniforms.
//!
//! Resolving a name means reflecting the shader module, so results are cached per
//! `(program, name)` for the lifetime of the cache. Misses are cached too.

use crate::error::RenderError;
use std::collections::HashMap;

/// The shader programs the renderer builds pipelines from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Program {
    /// Lit colour pass (also draws lines).
    Scene,
    /// Depth-only shadow cascade pass.
    Depth,
    /// Shadow-map preview quad.
    Preview,
}

impl Program {
    pub const ALL: [Program; 3] = [Program::Scene, Program::Depth, Program::Preview];

    pub fn name(self) -> &'static str {
        match self {
            Program::Scene => "scene",
            Program::Depth => "depth",
            Program::Preview => "preview",
        }
    }

    /// WGSL source.
    pub fn source(self) -> &'static str {
        match self {
            Program::Scene => include_str!("shaders/scene.wgsl"),
            Program::Depth => include_str!("shaders/depth.wgsl"),
            Program::Preview => include_str!("shaders/preview.wgsl"),
        }
    }
}

/// Where a resource variable lives in the pipeline layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UniformLocation {
    pub group: u32,
    pub binding: u32,
}

/// Resolves a variable name to its location. Expected to be comparatively expensive.
pub trait UniformResolver {
    fn resolve(&self, program: Program, name: &str) -> Option<UniformLocation>;
}

/// Parsed shader modules, resolved by naga reflection.
pub struct ShaderLibrary {
    modules: HashMap<Program, naga::Module>,
}

impl ShaderLibrary {
    /// Parse every program's WGSL source.
    pub fn load() -> Result<Self, RenderError> {
        let mut modules = HashMap::new();
        for program in Program::ALL {
            let module = naga::front::wgsl::parse_str(program.source()).map_err(|e| RenderError::ShaderParse {
                program: program.name(),
                message: e.emit_to_string(program.source()),
            })?;
            modules.insert(program, module);
        }
        Ok(Self { modules })
    }
}

impl UniformResolver for ShaderLibrary {
    fn resolve(&self, program: Program, name: &str) -> Option<UniformLocation> {
        let module = self.modules.get(&program)?;
        module
            .global_variables
            .iter()
            .find(|(_, var)| var.name.as_deref() == Some(name))
            .and_then(|(_, var)| var.binding.as_ref())
            .map(|b| UniformLocation {
                group: b.group,
                binding: b.binding,
            })
    }
}

/// Per-program memo of name lookups.
pub struct UniformCache<R> {
    resolver: R,
    locations: HashMap<Program, HashMap<String, Option<UniformLocation>>>,
}

impl<R: UniformResolver> UniformCache<R> {
    pub fn new(resolver: R) -> Self {
        Self {
            resolver,
            locations: HashMap::new(),
        }
    }

    /// Location of `name` in `program`. The resolver runs at most once per pair.
    pub fn locate(&mut self, program: Program, name: &str) -> Option<UniformLocation> {
        let per_program = self.locations.entry(program).or_default();
        if let Some(found) = per_program.get(name) {
            return *found;
        }
        let found = self.resolver.resolve(program, name);
        if found.is_none() {
            log::warn!("{} shader has no variable {:?}", program.name(), name);
        }
        per_program.insert(name.to_string(), found);
        found
    }

    /// Like [`UniformCache::locate`] but a miss is an error.
    pub fn require(&mut self, program: Program, name: &'static str) -> Result<UniformLocation, RenderError> {
        self.locate(program, name).ok_or(RenderError::MissingBinding {
            program: program.name(),
            name,
        })
    }

    /// Number of memoized pairs.
    pub fn len(&self) -> usize {
        self.locations.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct CountingResolver {
        calls: Cell<usize>,
    }

    impl UniformResolver for CountingResolver {
        fn resolve(&self, _program: Program, name: &str) -> Option<UniformLocation> {
            self.calls.set(self.calls.get() + 1);
            (name != "missing").then_some(UniformLocation { group: 0, binding: name.len() as u32 })
        }
    }

    #[test]
    fn resolver_runs_once_per_pair() {
        let mut cache = UniformCache::new(CountingResolver { calls: Cell::new(0) });
        let first = cache.locate(Program::Scene, "camera");
        let second = cache.locate(Program::Scene, "camera");
        assert_eq!(first, second);
        assert_eq!(cache.resolver.calls.get(), 1);

        // Same name in another program is a separate pair.
        cache.locate(Program::Depth, "camera");
        assert_eq!(cache.resolver.calls.get(), 2);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn misses_are_memoized() {
        let mut cache = UniformCache::new(CountingResolver { calls: Cell::new(0) });
        assert_eq!(cache.locate(Program::Preview, "missing"), None);
        assert_eq!(cache.locate(Program::Preview, "missing"), None);
        assert_eq!(cache.resolver.calls.get(), 1);
        assert!(matches!(
            cache.require(Program::Preview, "missing"),
            Err(RenderError::MissingBinding { name: "missing", .. })
        ));
    }

    #[test]
    fn shader_library_reflects_bindings() {
        let library = ShaderLibrary::load().unwrap();
        let mut cache = UniformCache::new(library);
        for (program, names) in [
            (Program::Scene, &["camera", "lighting", "shadow_maps", "shadow_sampler", "model"][..]),
            (Program::Depth, &["light", "model"][..]),
            (Program::Preview, &["preview", "shadow_map"][..]),
        ] {
            for name in names {
                assert!(cache.locate(program, name).is_some(), "{}: {name}", program.name());
            }
        }
        assert_eq!(cache.locate(Program::Scene, "camera"), Some(UniformLocation { group: 0, binding: 0 }));
        assert_eq!(cache.locate(Program::Scene, "no_such_thing"), None);
    }
}
