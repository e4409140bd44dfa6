use tmu_types::{Interaction, Post};

/// Optimistic flip of one interaction awaiting the server's answer.
///
/// Holds the flag/counter pair as it was before the flip so a failure
/// restores both together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingToggle {
    pub post_id: String,
    pub kind: Interaction,
    pub(crate) mount: u64,
    flag_before: bool,
    counter_before: Option<u32>,
}

impl PendingToggle {
    /// Flag value shown while the request is in flight
    pub fn optimistic(&self) -> bool {
        !self.flag_before
    }
}

/// Flip `kind` on `post` and remember how to undo it.
pub(crate) fn apply(post: &mut Post, kind: Interaction, mount: u64) -> PendingToggle {
    let pending = PendingToggle {
        post_id: post.id.clone(),
        kind,
        mount,
        flag_before: post.flag(kind),
        counter_before: post.counter(kind),
    };
    post.set_flag(kind, !pending.flag_before);
    pending
}

/// Adopt the server's flag. Returns whether it disagreed with the optimistic one.
pub(crate) fn reconcile(post: &mut Post, pending: &PendingToggle, server_flag: bool) -> bool {
    post.set_flag(pending.kind, server_flag)
}

/// Put the flag and its counter back to their pre-toggle values.
pub(crate) fn rollback(post: &mut Post, pending: &PendingToggle) {
    let kind = pending.kind;
    match kind {
        Interaction::Like => post.viewer.is_liked = pending.flag_before,
        Interaction::Repost => post.viewer.is_reposted = pending.flag_before,
        Interaction::Bookmark => post.viewer.is_bookmarked = pending.flag_before,
    }
    if let Some(before) = pending.counter_before {
        match kind {
            Interaction::Like => post.counters.likes = before,
            Interaction::Repost => post.counters.reposts = before,
            Interaction::Bookmark => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::sample_post;
    use proptest::prelude::*;

    #[test]
    fn test_like_moves_counter_with_flag() {
        let mut post = sample_post("p1");
        post.counters.likes = 5;

        let pending = apply(&mut post, Interaction::Like, 1);
        assert!(pending.optimistic());
        assert!(post.viewer.is_liked);
        assert_eq!(post.counters.likes, 6);

        assert!(!reconcile(&mut post, &pending, true));
        assert_eq!(post.counters.likes, 6);
    }

    #[test]
    fn test_server_disagreement_wins() {
        let mut post = sample_post("p1");
        post.counters.reposts = 2;

        let pending = apply(&mut post, Interaction::Repost, 1);
        assert_eq!(post.counters.reposts, 3);

        assert!(reconcile(&mut post, &pending, false));
        assert!(!post.viewer.is_reposted);
        assert_eq!(post.counters.reposts, 2);
    }

    #[test]
    fn test_rollback_restores_pair() {
        let mut post = sample_post("p1");
        post.viewer.is_liked = true;
        post.counters.likes = 1;

        let pending = apply(&mut post, Interaction::Like, 1);
        assert_eq!(post.counters.likes, 0);

        rollback(&mut post, &pending);
        assert!(post.viewer.is_liked);
        assert_eq!(post.counters.likes, 1);
    }

    #[test]
    fn test_bookmark_is_flag_only() {
        let mut post = sample_post("p1");
        let before = post.counters;

        apply(&mut post, Interaction::Bookmark, 1);
        assert!(post.viewer.is_bookmarked);
        apply(&mut post, Interaction::Bookmark, 1);
        assert!(!post.viewer.is_bookmarked);
        assert_eq!(post.counters, before);
    }

    fn interaction() -> impl Strategy<Value = Interaction> {
        prop_oneof![
            Just(Interaction::Like),
            Just(Interaction::Repost),
            Just(Interaction::Bookmark),
        ]
    }

    proptest! {
        #[test]
        fn prop_even_like_toggles_restore_state(likes in 0u32..1000, pairs in 0usize..20) {
            let mut post = sample_post("p1");
            post.counters.likes = likes;

            for _ in 0..pairs * 2 {
                let pending = apply(&mut post, Interaction::Like, 1);
                reconcile(&mut post, &pending, pending.optimistic());
            }

            prop_assert!(!post.viewer.is_liked);
            prop_assert_eq!(post.counters.likes, likes);
        }

        #[test]
        fn prop_counter_tracks_flag(
            likes in 0u32..5,
            steps in proptest::collection::vec((interaction(), proptest::option::of(any::<bool>())), 0..40),
        ) {
            let mut post = sample_post("p1");
            post.counters.likes = likes;
            let mut expected = likes;

            for (kind, outcome) in steps {
                let pending = apply(&mut post, kind, 1);
                match outcome {
                    Some(server) => { reconcile(&mut post, &pending, server); }
                    None => rollback(&mut post, &pending),
                }
                if kind == Interaction::Like {
                    expected = if post.viewer.is_liked { likes + 1 } else { likes };
                }
            }

            prop_assert_eq!(post.counters.likes, expected);
        }
    }
}
