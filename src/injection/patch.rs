//! Leaf patching: rewrite leaf texts of an injected tree from decoded text to
//! the host view (`prefix + raw host text + suffix` per shred).
//!
//! Every decoded buffer offset has a position in the view. A leaf covering
//! decoded `[start, end)` receives the view text between the positions of its
//! two ends, so a leaf crossing shred boundaries spills over the framing and
//! raw host text of every shred it touches. Prefix and suffix bytes are
//! copied literally and never attributed to host offsets.
//!
//! When a leaf ends on a decoded offset with no host position (inside an
//! escape expansion), its end is resolved forward. If that leaves the leaf
//! with its decoded text plus a raw tail and the next leaf is whitespace, the
//! tail is handed to the whitespace leaf instead.

use crate::error::{InjectionError, InjectionResult};
use crate::injection::Shred;
use crate::syntax::SyntaxTree;

/// View layout of one shred.
struct ShredView<'a> {
    shred: &'a Shred,
    /// View offset where the shred's prefix starts
    start: usize,
    /// Raw host text of the fragment
    raw: &'a str,
}

/// Maps decoded offsets to view offsets for non-decreasing queries.
struct ViewCursor<'a> {
    shreds: Vec<ShredView<'a>>,
    active: usize,
    decoded_len: usize,
    view_len: usize,
}

impl ViewCursor<'_> {
    /// View offset of `decoded`, and whether it has an exact host position.
    fn position(&mut self, decoded: usize) -> (usize, bool) {
        if decoded == 0 {
            return (0, true);
        }
        if decoded >= self.decoded_len {
            return (self.view_len, true);
        }
        while self.active + 1 < self.shreds.len()
            && self.shreds[self.active].shred.range().end < decoded
        {
            self.active += 1;
        }
        let Some(view) = self.shreds.get(self.active) else {
            return (self.view_len, true);
        };

        let shred = view.shred;
        let body = shred.body_range();
        let prefix_len = shred.prefix().len();
        if decoded < body.start {
            (view.start + (decoded - shred.range().start), true)
        } else if decoded <= body.end {
            let relative = decoded - body.start;
            let offsets = shred.offsets();
            let host = offsets.resolve_forward(relative);
            let in_raw = host.saturating_sub(offsets.relevant().start);
            (
                view.start + prefix_len + in_raw.min(view.raw.len()),
                offsets.host(relative).is_some(),
            )
        } else {
            (
                view.start + prefix_len + view.raw.len() + (decoded - body.end),
                true,
            )
        }
    }
}

/// Build the host view text of `shreds` from the current host document text.
pub(crate) fn host_view(host_text: &str, shreds: &[Shred]) -> InjectionResult<String> {
    let mut view = String::new();
    for shred in shreds {
        let raw = raw_text(host_text, shred)?;
        view.push_str(shred.prefix());
        view.push_str(raw);
        view.push_str(shred.suffix());
    }
    Ok(view)
}

fn raw_text<'a>(host_text: &'a str, shred: &Shred) -> InjectionResult<&'a str> {
    let range = shred.host_range();
    host_text
        .get(range.clone())
        .ok_or_else(|| InjectionError::invalid_range(&range, "shred outside host document"))
}

/// Patch `tree` (parsed from `decoded`) so its leaves spell the host view.
///
/// Returns the view text. Fails when the tree does not partition `decoded`
/// or when the patched leaves do not add up to the view.
pub(crate) fn patch_leaves(
    tree: &mut SyntaxTree,
    decoded: &str,
    host_text: &str,
    shreds: &[Shred],
) -> InjectionResult<String> {
    let parsed = tree.text();
    if parsed != decoded {
        return Err(InjectionError::malformed_tree(format!(
            "leaf texts ({} bytes) do not partition the decoded buffer ({} bytes)",
            parsed.len(),
            decoded.len()
        )));
    }

    let view = host_view(host_text, shreds)?;
    let mut views = Vec::with_capacity(shreds.len());
    let mut start = 0;
    for shred in shreds {
        let raw = raw_text(host_text, shred)?;
        views.push(ShredView { shred, start, raw });
        start += shred.prefix().len() + raw.len() + shred.suffix().len();
    }
    let mut cursor = ViewCursor {
        shreds: views,
        active: 0,
        decoded_len: decoded.len(),
        view_len: view.len(),
    };

    let leaves = tree.leaves();
    let mut decoded_start = 0;
    let mut view_start = 0;
    let mut tail: Option<String> = None;
    let mut patched = 0usize;

    for (index, &leaf) in leaves.iter().enumerate() {
        let leaf_decoded = tree.original_text(leaf).unwrap_or_default().to_string();
        let decoded_end = decoded_start + leaf_decoded.len();
        let (view_end, end_mapped) = cursor.position(decoded_end);
        let view_end = view_end.max(view_start);

        let mut text = view
            .get(view_start..view_end)
            .ok_or_else(|| {
                InjectionError::malformed_tree(format!(
                    "leaf {leaf} maps to {view_start}..{view_end}, not a text boundary of the host view"
                ))
            })?
            .to_string();

        if let Some(carried) = tail.take() {
            text.insert_str(0, &carried);
        }

        let next_is_whitespace = leaves
            .get(index + 1)
            .is_some_and(|next| tree.is_whitespace(*next));
        if !end_mapped
            && next_is_whitespace
            && text.len() > leaf_decoded.len()
            && text.starts_with(&leaf_decoded)
        {
            tail = Some(text.split_off(leaf_decoded.len()));
        }

        if text != leaf_decoded {
            patched += 1;
        }
        tree.set_leaf_text(leaf, text);
        decoded_start = decoded_end;
        view_start = view_end;
    }

    if let Some(carried) = tail {
        return Err(InjectionError::malformed_tree(format!(
            "unassigned host text {carried:?} after the last leaf"
        )));
    }

    let patched_text = tree.text();
    if patched_text != view {
        return Err(InjectionError::malformed_tree(format!(
            "patched leaves {patched_text:?} do not spell the host view {view:?}"
        )));
    }
    if tree.decoded_text() != decoded {
        return Err(InjectionError::malformed_tree(
            "patched leaves lost their decoded text",
        ));
    }

    log::trace!(
        target: "utsushi::patch",
        "Patched {} of {} leaves over {} shreds",
        patched,
        leaves.len(),
        shreds.len()
    );
    Ok(view)
}
