//! Semantic-analysis core of the Tarn compiler frontend.
//!
//! The crate takes a compilation unit of parsed, unresolved SIR modules
//! and runs the multi-pass analyzer over it: preamble injection, symbol
//! collection, use resolution, alias resolution, decl interface analysis,
//! meta expansion, body analysis with generic specialization and const
//! evaluation, and resource/move analysis. Lexing, parsing, module
//! discovery on disk, and code generation live in sibling crates and are
//! represented here by their interfaces only.

pub mod ast;
pub mod completion;
pub mod config;
pub mod index;
pub mod intern;
pub mod loader;
pub mod report;
pub mod sema;
pub mod sir;
pub mod source;

pub use completion::{collect_items, CompletionContext, CompletionItem};
pub use config::Config;
pub use index::SymbolUseIndex;
pub use intern::{Interner, Name};
pub use loader::{ModuleLoader, NoLoader};
pub use report::{Report, Severity};
pub use sema::{analyze, Analysis};
pub use sir::Unit;
pub use source::{ModulePath, SourceId, SourceLocation, SourceManager, TextRange};
