//! Thread reconstruction
//!
//! Turns a flat comment list into a tree rooted at the post. Comments are
//! first stored in an arena and indexed by id; parent links are resolved in a
//! second pass so children may appear before their parents in the input.

use crate::quote::render_quoted;
use contextforge_common::config::ThreadConfig;
use contextforge_common::metrics::{record_skipped, record_thread};
use contextforge_common::models::{Comment, CommentNode, CommentRecord, Post};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// Resolved parent of an arena slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Parent {
    Post,
    Comment(usize),
    /// No parent, a dangling parent id, or a broken cycle
    Orphan,
}

/// Result of building one thread
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadOutcome {
    pub post: Post,
    /// Comments dropped for a missing or duplicate id
    pub dropped_comments: usize,
    /// Comments re-attached to the root because their parent was unknown or cyclic
    pub orphaned_comments: usize,
}

/// Arena of validated comments with resolved parent and child links
struct Arena {
    comments: Vec<Comment>,
    parents: Vec<Parent>,
    children: Vec<Vec<usize>>,
    roots: Vec<usize>,
    orphaned: usize,
}

impl Arena {
    fn new(post: &Post, comments: Vec<Comment>) -> Self {
        let index: HashMap<&str, usize> = comments
            .iter()
            .enumerate()
            .map(|(i, c)| (c.id.as_str(), i))
            .collect();

        let mut orphaned = 0;
        let mut parents: Vec<Parent> = comments
            .iter()
            .map(|comment| match comment.parent_id.as_deref() {
                None => Parent::Orphan,
                Some(parent_id) if post.is_referenced_by(parent_id) => Parent::Post,
                Some(parent_id) => {
                    let resolved = index.get(parent_id).or_else(|| {
                        parent_id
                            .strip_prefix("t1_")
                            .and_then(|bare| index.get(bare))
                    });
                    match resolved {
                        Some(&i) => Parent::Comment(i),
                        None => {
                            debug!(comment_id = %comment.id, parent_id, "Dangling parent");
                            orphaned += 1;
                            Parent::Orphan
                        }
                    }
                }
            })
            .collect();

        orphaned += break_cycles(&comments, &mut parents);

        let mut children = vec![Vec::new(); comments.len()];
        let mut roots = Vec::new();
        for (i, parent) in parents.iter().enumerate() {
            match parent {
                Parent::Comment(p) => children[*p].push(i),
                Parent::Post | Parent::Orphan => roots.push(i),
            }
        }

        for siblings in &mut children {
            siblings.sort_by(|&a, &b| compare_comments(&comments, a, b));
        }
        roots.sort_by(|&a, &b| compare_comments(&comments, a, b));

        Self {
            comments,
            parents,
            children,
            roots,
            orphaned,
        }
    }

    /// Text a comment replies to, if it has a resolved parent
    fn reference<'a>(&'a self, post: &'a Post, i: usize) -> Option<&'a str> {
        match self.parents[i] {
            Parent::Post => Some(post.selftext.as_str()),
            Parent::Comment(p) => Some(self.comments[p].body.as_str()),
            Parent::Orphan => None,
        }
    }

    fn leaf(&self, post: &Post, i: usize, children: Vec<CommentNode>) -> CommentNode {
        let comment = &self.comments[i];
        let (rendered_body, quoted) = render_quoted(self.reference(post, i), &comment.body);

        CommentNode {
            comment: comment.clone(),
            rendered_body,
            quoted,
            children,
        }
    }

    /// Build the subtrees under `roots`, in the order given.
    ///
    /// Nodes are assembled bottom-up from a reversed pre-order, so depth costs
    /// heap rather than stack.
    fn trees(&self, post: &Post, roots: &[usize]) -> Vec<CommentNode> {
        let mut order = Vec::new();
        let mut stack: Vec<usize> = roots.to_vec();
        while let Some(i) = stack.pop() {
            order.push(i);
            stack.extend(self.children[i].iter().copied());
        }

        let mut built: Vec<Option<CommentNode>> = Vec::new();
        built.resize_with(self.comments.len(), || None);
        for &i in order.iter().rev() {
            let children = self.children[i]
                .iter()
                .filter_map(|&child| built[child].take())
                .collect();
            built[i] = Some(self.leaf(post, i, children));
        }

        roots.iter().filter_map(|&root| built[root].take()).collect()
    }
}

/// Traversal state of an arena slot during cycle breaking
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    Unvisited,
    OnPath,
    Done,
}

/// Orphan one member of every parent cycle.
///
/// The member with the lowest input position becomes the new root of what
/// used to be the cycle. Each slot is walked once.
fn break_cycles(comments: &[Comment], parents: &mut [Parent]) -> usize {
    let mut state = vec![Visit::Unvisited; parents.len()];
    let mut path = Vec::new();
    let mut broken = 0;

    for start in 0..parents.len() {
        path.clear();
        let mut current = start;
        let cycle_entry = loop {
            match state[current] {
                Visit::Done => break None,
                Visit::OnPath => break Some(current),
                Visit::Unvisited => {}
            }
            state[current] = Visit::OnPath;
            path.push(current);
            match parents[current] {
                Parent::Comment(next) => current = next,
                Parent::Post | Parent::Orphan => break None,
            }
        };

        if let Some(entry) = cycle_entry {
            let cycle = path
                .iter()
                .position(|&slot| slot == entry)
                .map(|pos| &path[pos..])
                .unwrap_or_default();
            if let Some(&first) = cycle.iter().min() {
                warn!(comment_id = %comments[first].id, cycle_len = cycle.len(), "Parent cycle detected, re-rooting comment");
                parents[first] = Parent::Orphan;
                broken += 1;
            }
        }

        for &slot in &path {
            state[slot] = Visit::Done;
        }
    }
    broken
}

/// Higher score first, then earlier creation (unknown last), then input order
fn compare_comments(comments: &[Comment], a: usize, b: usize) -> Ordering {
    let (ca, cb) = (&comments[a], &comments[b]);
    cb.score
        .cmp(&ca.score)
        .then_with(|| match (ca.created_at, cb.created_at) {
            (Some(ta), Some(tb)) => ta.cmp(&tb),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| a.cmp(&b))
}

/// Builds quoted comment trees for posts
#[derive(Debug, Clone, Copy)]
pub struct ThreadBuilder {
    top_k: usize,
}

impl Default for ThreadBuilder {
    fn default() -> Self {
        Self::from_config(&ThreadConfig::default())
    }
}

impl ThreadBuilder {
    /// Keep the `top_k` best root-level branches per post
    pub fn new(top_k: usize) -> Self {
        Self { top_k }
    }

    pub fn from_config(config: &ThreadConfig) -> Self {
        Self::new(config.top_k)
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Validate raw comment records and build the thread.
    ///
    /// Records without an id are dropped and counted rather than failing the build.
    pub fn build(&self, post: Post, records: Vec<CommentRecord>) -> ThreadOutcome {
        let mut invalid = 0;
        let comments: Vec<Comment> = records
            .into_iter()
            .filter_map(|record| match Comment::try_from(record) {
                Ok(comment) => Some(comment),
                Err(e) => {
                    warn!(post_id = %post.id, error = %e, "Dropping comment record");
                    invalid += 1;
                    None
                }
            })
            .collect();

        let mut outcome = self.build_comments(post, comments);
        outcome.dropped_comments += invalid;
        record_skipped("comment", invalid);
        outcome
    }

    /// Build the thread from validated comments.
    ///
    /// A repeated id keeps its first occurrence; later ones are dropped and counted.
    pub fn build_comments(&self, mut post: Post, comments: Vec<Comment>) -> ThreadOutcome {
        let total = comments.len();
        let mut seen = HashSet::new();
        let unique: Vec<Comment> = comments
            .into_iter()
            .filter(|c| seen.insert(c.id.clone()))
            .collect();
        let duplicates = total - unique.len();
        if duplicates > 0 {
            warn!(post_id = %post.id, duplicates, "Dropping comments with duplicate ids");
        }
        record_skipped("comment", duplicates);

        let arena = Arena::new(&post, unique);
        let kept = &arena.roots[..self.top_k.min(arena.roots.len())];
        let top_comments = arena.trees(&post, kept);

        debug!(
            post_id = %post.id,
            comments = arena.comments.len(),
            roots = arena.roots.len(),
            branches = top_comments.len(),
            retained = top_comments.iter().map(CommentNode::subtree_len).sum::<usize>(),
            orphaned = arena.orphaned,
            "Thread built"
        );
        record_thread(arena.orphaned);

        post.top_comments = top_comments;
        ThreadOutcome {
            post,
            dropped_comments: duplicates,
            orphaned_comments: arena.orphaned,
        }
    }
}

/// Build one thread keeping the `top_k` best root-level branches
pub fn build_thread(post: Post, comments: Vec<CommentRecord>, top_k: usize) -> Post {
    ThreadBuilder::new(top_k).build(post, comments).post
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;
    use rand::seq::SliceRandom;
    use rand::SeedableRng;

    const POST: &str = "post1";

    fn post() -> Post {
        Post {
            id: POST.into(),
            title: "Best 1440p monitors".into(),
            subreddit: "monitors".into(),
            selftext: "Hello".into(),
            ..Default::default()
        }
    }

    fn record(id: &str, parent: &str, score: i64, body: &str) -> CommentRecord {
        CommentRecord {
            id: Some(id.into()),
            parent_id: Some(parent.into()),
            author: Some("someone".into()),
            body: Some(body.into()),
            score: Some(score),
            created_at: None,
        }
    }

    fn ids(nodes: &[CommentNode]) -> Vec<&str> {
        nodes.iter().map(|n| n.comment.id.as_str()).collect()
    }

    fn all_ids(post: &Post) -> Vec<String> {
        let mut out = Vec::new();
        for root in &post.top_comments {
            root.walk(&mut |n| out.push(n.comment.id.clone()));
        }
        out
    }

    #[test]
    fn test_top_k_keeps_whole_subtree() {
        let records = vec![
            record("1", POST, 5, "first"),
            record("2", "1", 9, "reply"),
            record("3", POST, 2, "second"),
        ];

        let outcome = ThreadBuilder::new(1).build(post(), records);
        let top = &outcome.post.top_comments;

        assert_eq!(ids(top), vec!["1"]);
        assert_eq!(ids(&top[0].children), vec!["2"]);
        assert_eq!(outcome.dropped_comments, 0);
    }

    #[test]
    fn test_post_reference_quoted() {
        let outcome = ThreadBuilder::new(5).build(post(), vec![record("1", POST, 1, "World")]);
        let node = &outcome.post.top_comments[0];
        assert_eq!(node.rendered_body, "> Hello\n\nWorld");
        assert!(node.quoted);
        assert_eq!(node.comment.body, "World");
    }

    #[test]
    fn test_reply_quotes_parent_body() {
        let records = vec![
            record("1", POST, 5, "Get an IPS panel\nwith 165Hz"),
            record("2", "1", 3, "Agreed"),
        ];
        let outcome = ThreadBuilder::new(5).build(post(), records);
        let reply = &outcome.post.top_comments[0].children[0];
        // Quotes the parent's raw body, not its rendered body
        assert_eq!(reply.rendered_body, "> Get an IPS panel\n> with 165Hz\n\nAgreed");
    }

    #[test]
    fn test_forward_references() {
        let records = vec![
            record("3", "2", 1, "grandchild"),
            record("2", "1", 1, "child"),
            record("1", POST, 1, "root"),
        ];
        let outcome = ThreadBuilder::new(5).build(post(), records);
        let top = &outcome.post.top_comments;
        assert_eq!(ids(top), vec!["1"]);
        assert_eq!(ids(&top[0].children), vec!["2"]);
        assert_eq!(ids(&top[0].children[0].children), vec!["3"]);
        assert_eq!(outcome.orphaned_comments, 0);
    }

    #[test]
    fn test_fullname_prefixes_resolve() {
        let records = vec![
            record("a", &format!("t3_{}", POST), 2, "root"),
            record("b", "t1_a", 1, "child"),
        ];
        let outcome = ThreadBuilder::new(5).build(post(), records);
        let top = &outcome.post.top_comments;
        assert_eq!(ids(top), vec!["a"]);
        assert!(top[0].quoted);
        assert_eq!(ids(&top[0].children), vec!["b"]);
    }

    #[test]
    fn test_dangling_parent_becomes_unquoted_root() {
        let records = vec![
            record("1", POST, 1, "root"),
            record("2", "missing", 10, "lost reply"),
        ];
        let outcome = ThreadBuilder::new(5).build(post(), records);
        let top = &outcome.post.top_comments;
        assert_eq!(ids(top), vec!["2", "1"]);
        assert!(!top[0].quoted);
        assert_eq!(top[0].rendered_body, "lost reply");
        assert_eq!(outcome.orphaned_comments, 1);
    }

    #[test]
    fn test_cycle_is_broken() {
        let records = vec![
            record("a", "b", 1, "A"),
            record("b", "a", 2, "B"),
            record("self", "self", 3, "S"),
        ];
        let outcome = ThreadBuilder::new(5).build(post(), records);
        let top = &outcome.post.top_comments;

        assert_eq!(outcome.orphaned_comments, 2);
        assert_eq!(ids(top), vec!["self", "a"]);
        assert!(!top[0].quoted);
        assert!(!top[1].quoted);
        assert_eq!(ids(&top[1].children), vec!["b"]);
        // b still quotes a
        assert_eq!(top[1].children[0].rendered_body, "> A\n\nB");
    }

    #[test]
    fn test_cycle_behind_entry_chain() {
        // x hangs off the a -> b -> c -> a cycle and must stay attached
        let records = vec![
            record("x", "b", 1, "X"),
            record("c", "a", 1, "C"),
            record("b", "c", 1, "B"),
            record("a", "b", 1, "A"),
        ];
        let outcome = ThreadBuilder::new(5).build(post(), records);

        assert_eq!(outcome.orphaned_comments, 1);
        let top = &outcome.post.top_comments;
        assert_eq!(ids(top), vec!["c"]);
        assert_eq!(top[0].subtree_len(), 4);
    }

    #[test]
    fn test_deep_reply_chain_on_small_stack() {
        let depth = 20_000;
        let records: Vec<CommentRecord> = (0..depth)
            .map(|i| {
                let parent = if i == 0 { POST.to_string() } else { format!("c{}", i - 1) };
                record(&format!("c{}", i), &parent, 1, "reply")
            })
            .collect();

        // Same stack size as a tokio blocking-pool thread
        let outcome = std::thread::Builder::new()
            .stack_size(2 * 1024 * 1024)
            .spawn(move || {
                let outcome = ThreadBuilder::new(5).build(post(), records);
                let placed = outcome.post.top_comments[0].subtree_len();
                let mut deepest = "";
                outcome.post.top_comments[0].walk(&mut |n| deepest = n.comment.id.as_str());
                (placed, deepest.to_string(), outcome.orphaned_comments)
            })
            .unwrap()
            .join()
            .unwrap();

        assert_eq!(outcome, (depth, format!("c{}", depth - 1), 0));
    }

    #[test]
    fn test_missing_parent_id_is_unquoted_root() {
        let mut r = record("1", POST, 1, "no parent");
        r.parent_id = None;
        let outcome = ThreadBuilder::new(5).build(post(), vec![r]);
        assert_eq!(outcome.post.top_comments[0].rendered_body, "no parent");
        assert_eq!(outcome.orphaned_comments, 0);
    }

    #[test]
    fn test_malformed_and_duplicate_comments_dropped() {
        let mut no_id = record("x", POST, 100, "no id");
        no_id.id = None;
        let records = vec![
            record("1", POST, 1, "original"),
            no_id,
            record("1", POST, 50, "duplicate"),
            record("2", POST, 2, "other"),
        ];
        let outcome = ThreadBuilder::new(5).build(post(), records);
        assert_eq!(outcome.dropped_comments, 2);
        assert_eq!(ids(&outcome.post.top_comments), vec!["2", "1"]);
        assert_eq!(outcome.post.top_comments[1].comment.body, "original");
    }

    #[test]
    fn test_children_sorted_by_score_then_time() {
        let at = |secs| Some(Utc.timestamp_opt(secs, 0).unwrap());
        let mut late = record("late", "1", 5, "late");
        late.created_at = at(2_000);
        let mut early = record("early", "1", 5, "early");
        early.created_at = at(1_000);
        let mut unknown = record("unknown", "1", 5, "unknown");
        unknown.created_at = None;
        let records = vec![
            record("1", POST, 1, "root"),
            unknown,
            late,
            record("low", "1", -3, "low"),
            early,
            record("high", "1", 20, "high"),
        ];

        let outcome = ThreadBuilder::new(5).build(post(), records);
        let children = &outcome.post.top_comments[0].children;
        assert_eq!(ids(children), vec!["high", "early", "late", "unknown", "low"]);
    }

    #[test]
    fn test_upstream_quote_not_doubled() {
        let records = vec![record("1", POST, 1, "> Hello\n\nWorld")];
        let outcome = ThreadBuilder::new(5).build(post(), records);
        let node = &outcome.post.top_comments[0];
        assert_eq!(node.rendered_body, "> Hello\n\nWorld");
        assert!(!node.quoted);
    }

    #[test]
    fn test_link_post_without_selftext() {
        let mut link_post = post();
        link_post.selftext = String::new();
        let outcome = ThreadBuilder::new(5).build(link_post, vec![record("1", POST, 1, "nice")]);
        assert_eq!(outcome.post.top_comments[0].rendered_body, "nice");
    }

    #[test]
    fn test_build_thread_shorthand() {
        let threaded = build_thread(post(), vec![record("1", POST, 1, "World")], 3);
        assert_eq!(threaded.flattened_comment_bodies(), vec!["> Hello\n\nWorld"]);
    }

    #[test]
    fn test_zero_top_k() {
        let outcome = ThreadBuilder::new(0).build(post(), vec![record("1", POST, 1, "a")]);
        assert!(outcome.post.top_comments.is_empty());
    }

    #[test]
    fn test_no_comments() {
        let outcome = ThreadBuilder::default().build(post(), Vec::new());
        assert!(outcome.post.top_comments.is_empty());
        assert_eq!(outcome.dropped_comments, 0);
    }

    #[test]
    fn test_idempotent() {
        let records = vec![
            record("1", POST, 5, "first"),
            record("2", "1", 9, "reply"),
            record("3", POST, 2, "second"),
            record("4", "3", 1, "another"),
        ];
        let builder = ThreadBuilder::new(5);
        let first = builder.build(post(), records.clone());
        let second = builder.build(post(), records);
        assert_eq!(first, second);
    }

    #[test]
    fn test_shuffled_input_builds_same_tree() {
        let at = |secs| Some(Utc.timestamp_opt(secs, 0).unwrap());
        let mut records: Vec<CommentRecord> = (0..40)
            .map(|i| {
                let parent = if i < 5 { POST.to_string() } else { (i / 3).to_string() };
                let mut r = record(&i.to_string(), &parent, (i * 7 % 11) as i64, &format!("body {}", i));
                r.created_at = at(i as i64);
                r
            })
            .collect();

        let builder = ThreadBuilder::new(3);
        let expected = builder.build(post(), records.clone());

        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        for _ in 0..10 {
            records.shuffle(&mut rng);
            assert_eq!(builder.build(post(), records.clone()), expected);
        }
    }

    proptest! {
        #[test]
        fn prop_every_comment_placed_once(parents in proptest::collection::vec(0usize..25, 1..20)) {
            // Parent index >= len points at the post or a missing id
            let n = parents.len();
            let records: Vec<CommentRecord> = parents
                .iter()
                .enumerate()
                .map(|(i, &p)| {
                    let parent = if p < n {
                        p.to_string()
                    } else if p % 2 == 0 {
                        POST.to_string()
                    } else {
                        "missing".to_string()
                    };
                    record(&i.to_string(), &parent, 0, "text")
                })
                .collect();

            let outcome = ThreadBuilder::new(n).build(post(), records);

            let mut placed = all_ids(&outcome.post);
            prop_assert_eq!(placed.len(), n);
            placed.sort();
            placed.dedup();
            prop_assert_eq!(placed.len(), n);
        }
    }
}
