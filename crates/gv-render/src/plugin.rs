//! Plugin registry: renderer/device resolution by format string.
//!
//! A format request of the form `name[:renderer[:library]]` is matched
//! case-insensitively against installed plugins. Candidates sort by
//! quality; the latest install wins ties. The registry is populated at
//! startup and read-only afterwards.

use crate::render::Renderer;
use bitflags::bitflags;

bitflags! {
    /// Capabilities a plugin declares to the driver.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Capabilities: u32 {
        /// Geometric callbacks want raw graph coordinates; the plugin
        /// applies its own transform.
        const RAW_COORDS = 1 << 0;
        /// Output bytes should be wrapped in a gzip stream.
        const COMPRESSED = 1 << 1;
        /// The device consumes anchor shape descriptors.
        const ANCHORS = 1 << 2;
    }
}

/// One installed device/renderer pair.
pub struct PluginSpec {
    pub name: &'static str,
    pub renderer: &'static str,
    pub library: &'static str,
    pub quality: i32,
    pub caps: Capabilities,
    pub make: fn() -> Box<dyn Renderer>,
}

impl std::fmt::Debug for PluginSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.name, self.renderer, self.library)
    }
}

#[derive(Debug, Default)]
pub struct PluginRegistry {
    entries: Vec<PluginSpec>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in registry. The image-map device family is the only
    /// one shipped in-core.
    pub fn builtin() -> PluginRegistry {
        use crate::imagemap::{MapFlavor, make_map_renderer};
        let mut reg = PluginRegistry::new();
        for (name, flavor) in [
            ("cmap", MapFlavor::Cmap),
            ("cmapx", MapFlavor::Cmapx),
            ("imap", MapFlavor::Imap),
            ("ismap", MapFlavor::Ismap),
        ] {
            reg.install(PluginSpec {
                name,
                renderer: "map",
                library: "core",
                quality: 0,
                caps: Capabilities::ANCHORS,
                make: make_map_renderer(flavor),
            });
        }
        reg
    }

    pub fn install(&mut self, spec: PluginSpec) {
        self.entries.push(spec);
    }

    /// Every installed plugin, as `name:renderer:library` strings, for
    /// discovery queries.
    pub fn list(&self) -> Vec<String> {
        self.entries.iter().map(|e| format!("{e:?}")).collect()
    }

    /// Resolve `name[:renderer[:library]]`. Among equally named
    /// matches the highest quality wins, and within equal quality the
    /// one installed last.
    pub fn resolve(&self, format: &str) -> Option<&PluginSpec> {
        let mut parts = format.split(':');
        let name = parts.next()?.trim();
        let renderer = parts.next().map(str::trim);
        let library = parts.next().map(str::trim);
        let eq = |a: &str, b: &str| a.eq_ignore_ascii_case(b);
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, e)| eq(e.name, name))
            .filter(|(_, e)| renderer.is_none_or(|r| eq(e.renderer, r)))
            .filter(|(_, e)| library.is_none_or(|l| eq(e.library, l)))
            .max_by_key(|(i, e)| (e.quality, *i))
            .map(|(_, e)| e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::Renderer;

    struct Probe;
    impl Renderer for Probe {}

    fn spec(name: &'static str, renderer: &'static str, quality: i32) -> PluginSpec {
        PluginSpec {
            name,
            renderer,
            library: "test",
            quality,
            caps: Capabilities::empty(),
            make: || Box::new(Probe),
        }
    }

    #[test]
    fn builtin_devices_resolve() {
        let reg = PluginRegistry::builtin();
        for f in ["cmap", "cmapx", "imap", "ismap", "CMAPX"] {
            assert!(reg.resolve(f).is_some(), "{f} missing");
        }
        assert!(reg.resolve("png").is_none());
        assert_eq!(reg.list().len(), 4);
    }

    #[test]
    fn resolution_matches_renderer_and_library() {
        let mut reg = PluginRegistry::new();
        reg.install(spec("svg", "cairo", 5));
        reg.install(spec("svg", "native", 10));
        assert_eq!(reg.resolve("svg").unwrap().renderer, "native");
        assert_eq!(reg.resolve("svg:cairo").unwrap().renderer, "cairo");
        assert_eq!(reg.resolve("SVG:NATIVE:test").unwrap().quality, 10);
        assert!(reg.resolve("svg:zint").is_none());
    }

    #[test]
    fn last_install_wins_ties() {
        let mut reg = PluginRegistry::new();
        reg.install(spec("x", "first", 1));
        reg.install(spec("x", "second", 1));
        assert_eq!(reg.resolve("x").unwrap().renderer, "second");
    }
}
