//! Reply-tree assembly from a flat comment set.
//!
//! The store hands back every comment of a page of posts in one collection.
//! [`build_comment_forest`] turns that collection into per-post trees in
//! linear time using an index-addressed arena, without recursion, so thread
//! depth is bounded only by memory.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use super::{CommentId, CommentRecord, PostId};

/// A comment together with its ordered replies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentNode {
    #[serde(flatten)]
    pub record: CommentRecord,
    pub replies: Vec<CommentNode>,
}

impl CommentNode {
    pub fn id(&self) -> CommentId {
        self.record.comment.id
    }

    /// Number of comments in this subtree, including this one.
    pub fn subtree_len(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            count += 1;
            stack.extend(node.replies.iter());
        }
        count
    }
}

// Deep reply chains would otherwise recurse once per level when dropped.
impl Drop for CommentNode {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.replies);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.replies);
        }
    }
}

/// Top-level comments keyed by post, in creation order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CommentForest {
    roots: BTreeMap<PostId, Vec<CommentNode>>,
}

impl CommentForest {
    /// Roots for `post_id`; empty when the post has no comments.
    pub fn roots(&self, post_id: PostId) -> &[CommentNode] {
        self.roots.get(&post_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Remove and return the roots for `post_id`.
    pub fn take_roots(&mut self, post_id: PostId) -> Vec<CommentNode> {
        self.roots.remove(&post_id).unwrap_or_default()
    }

    /// Number of posts with at least one comment.
    pub fn post_count(&self) -> usize {
        self.roots.len()
    }

    /// Total number of comments across every tree.
    pub fn comment_count(&self) -> usize {
        self.roots
            .values()
            .flatten()
            .map(CommentNode::subtree_len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }
}

/// Assemble per-post reply trees from flat comment records.
///
/// Records are ordered by `(created_at, id)` first; the sort is stable and
/// cheap on input that is already in that order. Siblings keep that order.
///
/// Anomalies degrade instead of failing:
/// - a parent missing from the input, or belonging to another post, makes the
///   comment a root of its own post;
/// - a self-parent or parent cycle promotes the earliest comment of the cycle
///   to a root.
///
/// Every input record appears exactly once in the output.
///
/// # Examples
/// ```
/// use chrono::Utc;
/// use karma_backend::domain::{
///     build_comment_forest, Comment, CommentId, CommentRecord, PostId, UserId,
/// };
///
/// let post = PostId::new(1);
/// let comment = |id: i64, parent: Option<i64>| {
///     CommentRecord::unliked(Comment {
///         id: CommentId::new(id),
///         post_id: post,
///         author_id: UserId::random(),
///         parent_id: parent.map(CommentId::new),
///         content: "hi".into(),
///         created_at: Utc::now(),
///     })
/// };
///
/// let forest = build_comment_forest(vec![comment(1, None), comment(2, Some(1))]);
/// assert_eq!(forest.roots(post).len(), 1);
/// assert_eq!(forest.roots(post)[0].replies[0].id(), CommentId::new(2));
/// ```
pub fn build_comment_forest(mut records: Vec<CommentRecord>) -> CommentForest {
    records.sort_by(|a, b| {
        a.comment
            .created_at
            .cmp(&b.comment.created_at)
            .then_with(|| a.comment.id.cmp(&b.comment.id))
    });

    let slot_by_id: HashMap<CommentId, usize> = records
        .iter()
        .enumerate()
        .map(|(slot, record)| (record.comment.id, slot))
        .collect();

    let mut parent_slot: Vec<Option<usize>> = records
        .iter()
        .enumerate()
        .map(|(slot, record)| {
            let parent = slot_by_id.get(&record.comment.parent_id?).copied()?;
            let same_post = records[parent].comment.post_id == record.comment.post_id;
            (same_post && parent != slot).then_some(parent)
        })
        .collect();

    let mut children: Vec<Vec<usize>> = vec![Vec::new(); records.len()];
    for (slot, parent) in parent_slot.iter().enumerate() {
        if let Some(parent) = parent {
            children[*parent].push(slot);
        }
    }

    break_cycles(&mut parent_slot, &mut children);

    let mut roots: BTreeMap<PostId, Vec<usize>> = BTreeMap::new();
    for (slot, parent) in parent_slot.iter().enumerate() {
        if parent.is_none() {
            roots
                .entry(records[slot].comment.post_id)
                .or_default()
                .push(slot);
        }
    }

    materialise(records, &children, roots)
}

/// Detach the earliest unreachable slot of each cycle and make it a root.
///
/// Slots that no root reaches can only sit on, or hang below, a parent cycle.
fn break_cycles(parent_slot: &mut [Option<usize>], children: &mut [Vec<usize>]) {
    let mut reached = vec![false; parent_slot.len()];
    let mut stack: Vec<usize> = parent_slot
        .iter()
        .enumerate()
        .filter_map(|(slot, parent)| parent.is_none().then_some(slot))
        .collect();
    mark_reached(&mut stack, children, &mut reached);

    for slot in 0..parent_slot.len() {
        if reached[slot] {
            continue;
        }
        if let Some(parent) = parent_slot[slot].take() {
            children[parent].retain(|child| *child != slot);
        }
        stack.push(slot);
        mark_reached(&mut stack, children, &mut reached);
    }
}

fn mark_reached(stack: &mut Vec<usize>, children: &[Vec<usize>], reached: &mut [bool]) {
    while let Some(slot) = stack.pop() {
        if reached[slot] {
            continue;
        }
        reached[slot] = true;
        stack.extend(children[slot].iter().copied());
    }
}

/// Move records into owned nodes, children before parents.
fn materialise(
    records: Vec<CommentRecord>,
    children: &[Vec<usize>],
    roots: BTreeMap<PostId, Vec<usize>>,
) -> CommentForest {
    let mut pre_order = Vec::with_capacity(records.len());
    let mut stack: Vec<usize> = roots.values().flatten().copied().collect();
    while let Some(slot) = stack.pop() {
        pre_order.push(slot);
        stack.extend(children[slot].iter().copied());
    }

    let mut pending: Vec<Option<CommentRecord>> = records.into_iter().map(Some).collect();
    let mut built: Vec<Option<CommentNode>> = Vec::new();
    built.resize_with(pending.len(), || None);

    for slot in pre_order.into_iter().rev() {
        let Some(record) = pending[slot].take() else {
            continue;
        };
        let replies = children[slot]
            .iter()
            .filter_map(|child| built[*child].take())
            .collect();
        built[slot] = Some(CommentNode { record, replies });
    }

    let roots = roots
        .into_iter()
        .map(|(post_id, slots)| {
            let nodes = slots
                .into_iter()
                .filter_map(|slot| built[slot].take())
                .collect();
            (post_id, nodes)
        })
        .collect();
    CommentForest { roots }
}
