use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::intern::{Interner, Name};

/// Index of a source file within a [`SourceManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceId(pub u32);

/// Half-open byte range into a source buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextRange {
    pub start: u32,
    pub end: u32,
}

impl TextRange {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, offset: u32) -> bool {
        offset >= self.start && offset < self.end
    }

    pub fn len(&self) -> u32 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Dotted module path, e.g. `std.array`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ModulePath {
    segments: Vec<Name>,
}

impl ModulePath {
    pub fn new(segments: Vec<Name>) -> Self {
        Self { segments }
    }

    pub fn from_strs(interner: &mut Interner, segments: &[&str]) -> Self {
        Self {
            segments: segments.iter().map(|s| interner.intern(s)).collect(),
        }
    }

    pub fn segments(&self) -> &[Name] {
        &self.segments
    }

    pub fn first(&self) -> Option<Name> {
        self.segments.first().copied()
    }

    pub fn appended(&self, segment: Name) -> ModulePath {
        let mut segments = self.segments.clone();
        segments.push(segment);
        ModulePath { segments }
    }

    pub fn display(&self, interner: &Interner) -> String {
        let mut out = String::new();
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                out.push('.');
            }
            out.push_str(interner.resolve(*segment));
        }
        out
    }
}

/// A source file as handed over by the driver: path on disk, dotted module
/// path, and the raw byte buffer. Lexing and parsing happen outside this
/// crate; the buffer is kept only for diagnostic rendering.
#[derive(Debug)]
pub struct SourceFile {
    pub id: SourceId,
    pub path: PathBuf,
    pub module_path: ModulePath,
    pub buffer: String,
}

/// Resolved diagnostic position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    pub file: SourceId,
    pub range: TextRange,
}

#[derive(Debug, Default)]
pub struct SourceManager {
    files: Vec<SourceFile>,
}

impl SourceManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, path: PathBuf, module_path: ModulePath, buffer: String) -> SourceId {
        let id = SourceId(self.files.len() as u32);
        self.files.push(SourceFile {
            id,
            path,
            module_path,
            buffer,
        });
        id
    }

    pub fn get(&self, id: SourceId) -> &SourceFile {
        &self.files[id.0 as usize]
    }

    pub fn files(&self) -> &[SourceFile] {
        &self.files
    }

    /// 1-based line number, line start offset, and the line's text for a
    /// byte offset. Used by the report renderer.
    pub fn line_at(&self, id: SourceId, offset: u32) -> (usize, usize, &str) {
        let source = &self.get(id).buffer;
        let offset = (offset as usize).min(source.len());

        let mut line_num = 1;
        let mut line_start = 0;

        for (i, c) in source.char_indices() {
            if i >= offset {
                break;
            }
            if c == '\n' {
                line_num += 1;
                line_start = i + 1;
            }
        }

        let line_end = source[line_start..]
            .find('\n')
            .map(|off| line_start + off)
            .unwrap_or(source.len());

        (line_num, line_start, &source[line_start..line_end])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn module_path_displays_dotted() {
        let mut interner = Interner::new();
        let path = ModulePath::from_strs(&mut interner, &["std", "array"]);
        assert_eq!(path.display(&interner), "std.array");
    }

    #[test]
    fn appended_leaves_original_untouched() {
        let mut interner = Interner::new();
        let base = ModulePath::from_strs(&mut interner, &["std"]);
        let sub = base.appended(interner.intern("set"));
        assert_eq!(base.segments().len(), 1);
        assert_eq!(sub.display(&interner), "std.set");
    }

    #[test]
    fn line_at_finds_line_and_start() {
        let mut sources = SourceManager::new();
        let mut interner = Interner::new();
        let id = sources.add(
            PathBuf::from("main.tn"),
            ModulePath::from_strs(&mut interner, &["main"]),
            "func main() {\n    var x = 0;\n}\n".to_string(),
        );

        let (line, start, text) = sources.line_at(id, 18);
        assert_eq!(line, 2);
        assert_eq!(start, 14);
        assert_eq!(text, "    var x = 0;");
    }

    #[test]
    fn text_range_contains_is_half_open() {
        let range = TextRange::new(4, 8);
        assert!(range.contains(4));
        assert!(range.contains(7));
        assert!(!range.contains(8));
    }
}
