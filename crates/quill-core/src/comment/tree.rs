//! Reply tree construction
//!
//! Comments are held in an arena (a `Vec`) and addressed by index; parent
//! links are resolved through an id-to-index map. The whole set is checked
//! before any node is built, so a corrupt thread fails as a unit instead of
//! rendering partially.

use super::model::{BlogComment, CommentStatus};
use crate::config::ThreadConfig;
use crate::error::{QuillError, Result};
use crate::types::CommentId;
use serde::Serialize;
use std::collections::HashMap;

/// Who a thread is rendered for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadView {
    /// Readers; rejected comments are hidden
    Public,
    /// Moderators; every comment is shown
    Moderator,
}

/// Options for [`build_tree`]
#[derive(Debug, Clone)]
pub struct TreeOptions {
    /// Deepest reply level; roots are level 0
    pub max_depth: usize,
    pub include_pending: bool,
    pub include_rejected: bool,
}

impl TreeOptions {
    pub fn new(max_depth: usize) -> Self {
        Self {
            max_depth,
            include_pending: true,
            include_rejected: false,
        }
    }

    /// Options for `view` under the given thread configuration
    pub fn for_view(config: &ThreadConfig, view: ThreadView) -> Self {
        match view {
            ThreadView::Public => Self {
                max_depth: config.max_depth,
                include_pending: config.show_pending,
                include_rejected: false,
            },
            ThreadView::Moderator => Self {
                max_depth: config.max_depth,
                include_pending: true,
                include_rejected: true,
            },
        }
    }

    fn shows(&self, status: CommentStatus) -> bool {
        match status {
            CommentStatus::Approved => true,
            CommentStatus::Pending => self.include_pending,
            CommentStatus::Rejected => self.include_rejected,
        }
    }
}

impl Default for TreeOptions {
    fn default() -> Self {
        Self::for_view(&ThreadConfig::default(), ThreadView::Public)
    }
}

/// A comment with its ordered replies
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentNode {
    #[serde(flatten)]
    pub comment: BlogComment,
    pub depth: usize,
    pub replies: Vec<CommentNode>,
}

impl CommentNode {
    /// Number of comments in this subtree, this one included
    pub fn size(&self) -> usize {
        1 + self.replies.iter().map(CommentNode::size).sum::<usize>()
    }
}

/// Build the ordered reply forest for the comments of one post.
///
/// Fails with [`QuillError::DataIntegrity`] if the set mixes posts, repeats
/// an id, references a parent outside the set, or contains a reply cycle.
/// Hidden comments are dropped and their visible replies move up to the
/// nearest visible ancestor. Replies deeper than `max_depth` are attached to
/// the deepest allowed ancestor. Siblings are ordered by `created_at`, ties
/// broken by id.
pub fn build_tree(comments: &[BlogComment], options: &TreeOptions) -> Result<Vec<CommentNode>> {
    let Some(first) = comments.first() else {
        return Ok(Vec::new());
    };
    let post_id = first.post_id;

    let mut index: HashMap<CommentId, usize> = HashMap::with_capacity(comments.len());
    for (i, comment) in comments.iter().enumerate() {
        if comment.post_id != post_id {
            return Err(QuillError::DataIntegrity(format!(
                "comment {} belongs to post {}, expected {}",
                comment.id, comment.post_id, post_id
            )));
        }
        if index.insert(comment.id, i).is_some() {
            return Err(QuillError::DataIntegrity(format!(
                "comment {} appears more than once",
                comment.id
            )));
        }
    }

    let parents = comments
        .iter()
        .map(|comment| match comment.parent_id {
            None => Ok(None),
            Some(parent_id) => index.get(&parent_id).copied().map(Some).ok_or_else(|| {
                QuillError::DataIntegrity(format!(
                    "parent {} of comment {} is not a comment on post {}",
                    parent_id, comment.id, post_id
                ))
            }),
        })
        .collect::<Result<Vec<Option<usize>>>>()?;

    detect_cycles(comments, &parents)?;

    let visible: Vec<bool> = comments.iter().map(|c| options.shows(c.status)).collect();
    let attach = attachment_points(&parents, &visible, options.max_depth);

    let mut roots = Vec::new();
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); comments.len()];
    for (i, target) in attach.iter().enumerate() {
        if !visible[i] {
            continue;
        }
        match target {
            Some(parent) => children[*parent].push(i),
            None => roots.push(i),
        }
    }

    let order = |a: &usize, b: &usize| {
        let (a, b) = (&comments[*a], &comments[*b]);
        a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id))
    };
    roots.sort_by(order);
    for list in &mut children {
        list.sort_by(order);
    }

    Ok(roots
        .into_iter()
        .map(|i| assemble(i, 0, comments, &children))
        .collect())
}

/// Walk every parent chain; revisiting a node on the current path is a cycle
fn detect_cycles(comments: &[BlogComment], parents: &[Option<usize>]) -> Result<()> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Unseen,
        OnPath,
        Done,
    }

    let mut marks = vec![Mark::Unseen; comments.len()];
    let mut path = Vec::new();

    for start in 0..comments.len() {
        let mut current = Some(start);
        while let Some(i) = current {
            match marks[i] {
                Mark::Done => break,
                Mark::OnPath => {
                    return Err(QuillError::DataIntegrity(format!(
                        "reply cycle through comment {}",
                        comments[i].id
                    )));
                }
                Mark::Unseen => {
                    marks[i] = Mark::OnPath;
                    path.push(i);
                    current = parents[i];
                }
            }
        }
        for i in path.drain(..) {
            marks[i] = Mark::Done;
        }
    }

    Ok(())
}

/// For each visible node, the node it hangs under, or `None` for a root.
/// Parent chains are known to be acyclic.
fn attachment_points(
    parents: &[Option<usize>],
    visible: &[bool],
    max_depth: usize,
) -> Vec<Option<usize>> {
    let visible_parent = |mut i: usize| -> Option<usize> {
        while let Some(p) = parents[i] {
            if visible[p] {
                return Some(p);
            }
            i = p;
        }
        None
    };

    // (attached to, own depth)
    let mut resolved: Vec<Option<(Option<usize>, usize)>> = vec![None; parents.len()];
    let mut pending = Vec::new();

    for start in 0..parents.len() {
        if !visible[start] || resolved[start].is_some() {
            continue;
        }

        let mut current = start;
        loop {
            pending.push(current);
            match visible_parent(current) {
                Some(p) if resolved[p].is_none() => current = p,
                _ => break,
            }
        }

        while let Some(i) = pending.pop() {
            let entry = match visible_parent(i) {
                None => (None, 0),
                Some(p) => match resolved[p] {
                    Some((_, depth)) if depth < max_depth => (Some(p), depth + 1),
                    Some((grand, depth)) => (grand, depth),
                    None => (None, 0),
                },
            };
            resolved[i] = Some(entry);
        }
    }

    resolved
        .into_iter()
        .map(|entry| match entry {
            Some((parent, _)) => parent,
            None => None,
        })
        .collect()
}

fn assemble(
    i: usize,
    depth: usize,
    comments: &[BlogComment],
    children: &[Vec<usize>],
) -> CommentNode {
    CommentNode {
        comment: comments[i].clone(),
        depth,
        replies: children[i]
            .iter()
            .map(|&child| assemble(child, depth + 1, comments, children))
            .collect(),
    }
}
