/// Builds a `wgpu::ShaderModule` lazily from concatenated WGSL source
/// fragments, applying textual `@TOKEN@` substitution before compilation.
/// Mirrors the teacher's pattern of loading `.wgsl` text with `include_str!`
/// and handing it straight to `create_shader_module` on first use, except
/// here the source is assembled from several fragments and specialized per
/// call site (per direction, per `MAX_DISPARITY`) rather than fixed at
/// compile time.
pub struct DeviceProgram;

impl DeviceProgram {
    /// Concatenates `fragments` in order, replaces every occurrence of each
    /// `(@TOKEN@, value)` pair in `substitutions`, and compiles the result.
    /// Build errors are fatal: wgpu surfaces shader compilation failures
    /// through its validation/device-lost callbacks rather than a
    /// `Result`, so callers are expected to have validated their
    /// substitutions ahead of time; this function panics only if the
    /// resulting source still contains an unresolved `@...@` token, which
    /// indicates a programming error rather than a runtime condition.
    pub fn build(
        device: &wgpu::Device,
        label: &str,
        fragments: &[&str],
        substitutions: &[(&str, String)],
    ) -> wgpu::ShaderModule {
        let mut source = fragments.concat();
        for (token, value) in substitutions {
            source = source.replace(token, value);
        }

        debug_assert!(
            !source.contains('@') || !Self::has_unresolved_token(&source),
            "unresolved @TOKEN@ in shader source for {label}"
        );

        device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        })
    }

    fn has_unresolved_token(source: &str) -> bool {
        let mut chars = source.char_indices();
        while let Some((start, c)) = chars.next() {
            if c == '@' {
                if let Some(end) = source[start + 1..].find('@') {
                    let candidate = &source[start + 1..start + 1 + end];
                    if candidate.chars().all(|c| c.is_ascii_uppercase() || c == '_') && !candidate.is_empty() {
                        return true;
                    }
                }
            }
        }
        false
    }
}

/// `#define TOKEN value` substitution helper: produces the replacement text
/// for a single `@TOKEN@` occurrence.
pub fn define(name: &str, value: impl std::fmt::Display) -> String {
    format!("const {name}: i32 = {value};\n")
}

pub fn define_u32(name: &str, value: u32) -> String {
    format!("const {name}: u32 = {value}u;\n")
}

pub fn define_bool(name: &str, value: bool) -> String {
    format!("const {name}: bool = {value};\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_unresolved_token_detects_placeholder() {
        assert!(DeviceProgram::has_unresolved_token("const X: i32 = @MAX_DISPARITY@;"));
        assert!(!DeviceProgram::has_unresolved_token("const X: i32 = 64;"));
    }

    #[test]
    fn test_define_helpers_format_wgsl_consts() {
        assert_eq!(define("P1", 10), "const P1: i32 = 10;\n");
        assert_eq!(define_u32("MAX_DISPARITY", 128), "const MAX_DISPARITY: u32 = 128u;\n");
    }
}
