//! Emission passes for the Parlang translator.
//!
//! Turns an analyzed [`SemaContext`] back into host-language source, running
//! passes 7–9 of the pipeline per file:
//!
//! 1. **Self-accessor expansion** ([`self_expand`]) — `SELF.` marker forms in
//!    method bodies become qualified calls on the defining type
//! 2. **Paste-up** ([`pasteup`]) — lowered object literals, dispatchers and
//!    registration lines are spliced into the retained line stream at each
//!    definition's origin
//! 3. **Macro expansion** ([`expander`]) — field accessors, array accessors
//!    and allocation expressions across the pasted-up lines become inline
//!    typed-view accesses and allocator calls
//!
//! The [`scan`] module carries the literal-aware tokenizer the expander is
//! built on.

use crate::ast::FileAst;
use crate::error::CompileError;
use crate::file::SourceFile;
use crate::sema::SemaContext;

pub mod expander;
pub mod pasteup;
pub mod scan;
pub mod self_expand;

/// One translated output file
#[derive(Debug, Clone)]
pub struct Translation {
    /// The input file this output was produced from
    pub file: SourceFile,
    /// The transformed source text
    pub text: String,
}

/// Renders every file of the translation
///
/// # Errors
/// Returns the first [`CompileError`] the expander produces (an allocation
/// expression naming an unknown type, or a broken internal invariant).
pub fn render(context: &SemaContext<'_>, files: &[FileAst<'_>]) -> Result<Vec<Translation>, CompileError> {
    let mut outputs = Vec::with_capacity(files.len());
    for (file_index, file) in files.iter().enumerate() {
        let lines = pasteup::paste_up(context, file_index, file)?;
        let mut text = String::new();
        for line in &lines {
            text.push_str(&expander::expand_line(context, &file.file, line.line, &line.text)?);
            text.push('\n');
        }
        outputs.push(Translation { file: file.file.clone(), text });
    }
    Ok(outputs)
}
