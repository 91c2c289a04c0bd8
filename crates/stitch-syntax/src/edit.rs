//! Text edits against an immutable tree.
//!
//! Trees are never changed in place. A rewrite is a list of [`Edit`]s, each
//! addressing a byte range of the original source, which
//! [`Root::commit_edits`] validates and splices into a new string. The
//! original tree stays valid and untouched.

use tracing::debug;

use crate::error::SyntaxError;
use crate::node::Node;
use crate::parser::Root;

/// A replacement of one byte range of the original source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    /// Byte offset where the replaced range starts.
    pub start_pos: usize,
    /// Byte offset just past the replaced range.
    pub end_pos: usize,
    /// Text written in place of the range.
    pub inserted_text: String,
}

impl Edit {
    /// Creates an edit replacing `start_pos..end_pos`.
    #[must_use]
    pub fn new(start_pos: usize, end_pos: usize, inserted_text: impl Into<String>) -> Self {
        Self {
            start_pos,
            end_pos,
            inserted_text: inserted_text.into(),
        }
    }

    /// Creates an edit inserting text at `pos` without removing anything.
    #[must_use]
    pub fn insert(pos: usize, inserted_text: impl Into<String>) -> Self {
        Self::new(pos, pos, inserted_text)
    }
}

impl Node<'_> {
    /// Builds an edit replacing this node's text.
    #[must_use]
    pub fn replace(&self, text: impl Into<String>) -> Edit {
        let range = self.byte_range();
        Edit::new(range.start, range.end, text)
    }

    /// Applies edits to the source of this node's tree.
    ///
    /// # Errors
    ///
    /// See [`Root::commit_edits`].
    pub fn commit_edits(
        &self,
        edits: impl IntoIterator<Item = Edit>,
    ) -> Result<String, SyntaxError> {
        self.get_root().commit_edits(edits)
    }
}

impl Root {
    /// Applies edits to the original source and returns the new text.
    ///
    /// Edits are ordered by start offset, then by end offset. A zero-width
    /// insertion therefore lands before a replacement starting at the same
    /// offset, whatever order they were given in. Insertions sharing an
    /// offset keep their given order. The whole set is validated before
    /// anything is spliced, so a rejected set produces no output at all.
    ///
    /// # Errors
    ///
    /// Returns [`SyntaxError::EditOutOfBounds`] for an edit that ends before
    /// it starts, runs past the source, or cuts a UTF-8 sequence, and
    /// [`SyntaxError::OverlappingEdits`] when two edits share any byte.
    pub fn commit_edits(
        &self,
        edits: impl IntoIterator<Item = Edit>,
    ) -> Result<String, SyntaxError> {
        let source = self.source();
        let plan = CommitPlan::new(source, edits.into_iter().collect())?;

        debug!(
            target: "stitch_syntax::edit",
            filename = self.filename(),
            edits = plan.edits.len(),
            "committing edits"
        );
        Ok(plan.splice(source))
    }
}

/// A validated, ordered edit list for one commit.
struct CommitPlan {
    edits: Vec<Edit>,
}

impl CommitPlan {
    fn new(source: &str, mut edits: Vec<Edit>) -> Result<Self, SyntaxError> {
        let len = source.len();
        for edit in &edits {
            let in_bounds = edit.start_pos <= edit.end_pos
                && edit.end_pos <= len
                && source.is_char_boundary(edit.start_pos)
                && source.is_char_boundary(edit.end_pos);
            if !in_bounds {
                return Err(SyntaxError::EditOutOfBounds {
                    start: edit.start_pos,
                    end: edit.end_pos,
                    len,
                });
            }
        }

        edits.sort_by_key(|edit| (edit.start_pos, edit.end_pos));

        for pair in edits.windows(2) {
            let [first, second] = pair else {
                continue;
            };
            if first.end_pos > second.start_pos {
                return Err(SyntaxError::OverlappingEdits {
                    first_start: first.start_pos,
                    first_end: first.end_pos,
                    second_start: second.start_pos,
                    second_end: second.end_pos,
                });
            }
        }

        Ok(Self { edits })
    }

    fn splice(&self, source: &str) -> String {
        let inserted: usize = self.edits.iter().map(|e| e.inserted_text.len()).sum();
        let mut output = String::with_capacity(source.len().saturating_add(inserted));
        let mut cursor = 0;

        for edit in &self.edits {
            output.push_str(source.get(cursor..edit.start_pos).unwrap_or_default());
            output.push_str(&edit.inserted_text);
            cursor = edit.end_pos;
        }
        output.push_str(source.get(cursor..).unwrap_or_default());
        output
    }
}
