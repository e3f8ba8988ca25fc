//! Bidirectional change merging.
//!
//! The engine only computes trustworthy coordinates for content that exists
//! in the revision document. A single forward pass (A base, B revision)
//! therefore locates insertions correctly but cannot place deletions, which
//! have no position in B. Running the reverse pass (B base, A revision) turns
//! every deletion into an insertion *relative to A*, and insertions are what
//! the engine locates well.
//!
//! The merged list is built from the two passes:
//!
//! ```text
//! forward  F: [ Ins(x) Del(y) Style(z) ]   keep everything except Deleted
//! reverse  R: [ Ins(y') Del(x') ]          keep only Inserted, relabel Deleted
//! merged   M: [ Ins(x) Style(z) Del(y') ]
//! ```
//!
//! There is no cross-sorting between the groups; each keeps its source order.
//! An engine without the directional bias could skip the reverse pass and
//! use the forward list as is.

use crate::output::{ChangeKind, ChangeRecord};
use tracing::debug;

/// Merge forward and reverse change lists into one list.
///
/// Forward records are carried over untouched. Reverse insertions are
/// relabelled `Deleted` and renumbered to follow the highest forward id, so
/// ids stay unique within the merged list.
pub fn merge_changes(forward: Vec<ChangeRecord>, reverse: Vec<ChangeRecord>) -> Vec<ChangeRecord> {
    let forward_total = forward.len();
    let reverse_total = reverse.len();
    let next_id = forward.iter().map(|c| c.id + 1).max().unwrap_or(0);

    let mut merged: Vec<ChangeRecord> = forward
        .into_iter()
        .filter(|c| c.kind != ChangeKind::Deleted)
        .collect();
    let kept_forward = merged.len();

    merged.extend(
        reverse
            .into_iter()
            .filter(|c| c.kind == ChangeKind::Inserted)
            .enumerate()
            .map(|(i, mut c)| {
                c.kind = ChangeKind::Deleted;
                c.id = next_id + i;
                c
            }),
    );

    debug!(
        "Merged changes: {}/{} forward + {}/{} reverse → {}",
        kept_forward,
        forward_total,
        merged.len() - kept_forward,
        reverse_total,
        merged.len()
    );
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::Rect;

    fn rec(id: usize, kind: ChangeKind, text: &str) -> ChangeRecord {
        ChangeRecord::new(id, kind, text)
    }

    fn at(y: f32) -> Rect {
        Rect {
            x: 0.0,
            y,
            width: 10.0,
            height: 5.0,
        }
    }

    #[test]
    fn forward_deletions_are_replaced_by_reverse_insertions() {
        let forward = vec![
            rec(0, ChangeKind::Inserted, "new").with_position(1, at(10.0)),
            rec(1, ChangeKind::Deleted, "old"),
            rec(2, ChangeKind::StyleChanged, "bold"),
        ];
        let reverse = vec![
            rec(0, ChangeKind::Inserted, "old").with_position(2, at(40.0)),
            rec(1, ChangeKind::Deleted, "new"),
            rec(2, ChangeKind::StyleChanged, "bold"),
        ];

        let merged = merge_changes(forward, reverse);
        let kinds: Vec<_> = merged.iter().map(|c| (c.kind, c.text.as_str())).collect();
        assert_eq!(
            kinds,
            [
                (ChangeKind::Inserted, "new"),
                (ChangeKind::StyleChanged, "bold"),
                (ChangeKind::Deleted, "old"),
            ]
        );
        // reverse coordinates are kept for the deletion
        assert_eq!(merged[2].page, Some(2));
        assert_eq!(merged[2].bounds.map(|b| b.y), Some(40.0));
        // forward ids untouched, reverse ids continue after them
        let ids: Vec<_> = merged.iter().map(|c| c.id).collect();
        assert_eq!(ids, [0, 2, 3]);
    }

    #[test]
    fn every_deleted_record_comes_from_a_reverse_insertion() {
        let forward = vec![
            rec(0, ChangeKind::Deleted, "f-del-1"),
            rec(1, ChangeKind::Moved, "f-move"),
            rec(2, ChangeKind::Deleted, "f-del-2"),
            rec(3, ChangeKind::Resized, "f-resize"),
        ];
        let reverse = vec![
            rec(0, ChangeKind::Inserted, "r-ins-1"),
            rec(1, ChangeKind::Moved, "r-move"),
            rec(2, ChangeKind::Inserted, "r-ins-2"),
            rec(3, ChangeKind::Deleted, "r-del"),
        ];
        let merged = merge_changes(forward, reverse);

        let deleted: Vec<_> = merged
            .iter()
            .filter(|c| c.kind == ChangeKind::Deleted)
            .map(|c| c.text.as_str())
            .collect();
        assert_eq!(deleted, ["r-ins-1", "r-ins-2"]);
        assert!(merged.iter().all(|c| !c.text.starts_with("f-del")));
        assert!(merged.iter().all(|c| !c.text.starts_with("r-") || c.kind == ChangeKind::Deleted));
        assert_eq!(merged.len(), 4);
    }

    #[test]
    fn empty_sides_degenerate() {
        let only_forward = merge_changes(vec![rec(0, ChangeKind::Inserted, "bar")], vec![]);
        assert_eq!(only_forward.len(), 1);
        assert_eq!(only_forward[0].kind, ChangeKind::Inserted);

        let only_reverse = merge_changes(vec![], vec![rec(7, ChangeKind::Inserted, "gone")]);
        assert_eq!(only_reverse.len(), 1);
        assert_eq!(only_reverse[0].kind, ChangeKind::Deleted);
        assert_eq!(only_reverse[0].id, 0);

        assert!(merge_changes(vec![], vec![]).is_empty());
    }

    #[test]
    fn order_is_stable_within_each_group() {
        let forward: Vec<_> = (0..5)
            .map(|i| rec(i, ChangeKind::Inserted, &format!("f{i}")))
            .collect();
        let reverse: Vec<_> = (0..3)
            .map(|i| rec(i, ChangeKind::Inserted, &format!("r{i}")))
            .collect();
        let texts: Vec<_> = merge_changes(forward, reverse)
            .into_iter()
            .map(|c| c.text)
            .collect();
        assert_eq!(texts, ["f0", "f1", "f2", "f3", "f4", "r0", "r1", "r2"]);
    }
}
