//! Topic derivation for change notifications.
//!
//! Topics have exactly three dot-separated, case-sensitive tokens:
//! `<namespace>.<change kind>.<user id>`. Publish topics are always concrete;
//! subscribe topics may put `*` in either of the last two positions.

use users_sdk::{SubscriptionFilter, UserChange};

use crate::domain::DomainError;

pub const NAMESPACE: &str = "users";
pub const WILDCARD: &str = "*";
/// Matches one or more trailing tokens. Never produced here, but understood
/// by `matches` to mirror broker semantics.
pub const TAIL_WILDCARD: &str = ">";

/// # Errors
/// `InvalidUserId` when the filter names the nil id. A wildcard request must
/// leave the id out instead.
pub fn for_subscribe(filter: &SubscriptionFilter) -> Result<String, DomainError> {
    let kind = filter.kind.map_or(WILDCARD, |kind| kind.as_str());
    let user_id = match filter.user_id {
        Some(id) if id.is_nil() => return Err(DomainError::InvalidUserId),
        Some(id) => id.to_string(),
        None => WILDCARD.to_owned(),
    };
    Ok(format!("{NAMESPACE}.{kind}.{user_id}"))
}

/// Concrete topic for a change. The caller must have checked the change is
/// publishable.
#[must_use]
pub fn for_publish(change: &UserChange) -> String {
    format!("{NAMESPACE}.{}.{}", change.kind, change.user_id)
}

/// Token-wise match of a concrete `topic` against a subscription `pattern`.
#[must_use]
pub fn matches(pattern: &str, topic: &str) -> bool {
    let mut pattern_tokens = pattern.split('.');
    let mut topic_tokens = topic.split('.');

    loop {
        match (pattern_tokens.next(), topic_tokens.next()) {
            (Some(TAIL_WILDCARD), Some(_)) => return true,
            (Some(p), Some(t)) if p == WILDCARD || p == t => {}
            (None, None) => return true,
            _ => return false,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use users_sdk::ChangeKind;
    use uuid::Uuid;

    #[test]
    fn empty_filter_subscribes_to_everything() {
        let topic = for_subscribe(&SubscriptionFilter::default()).unwrap();
        assert_eq!(topic, "users.*.*");
    }

    #[test]
    fn each_segment_is_wildcarded_independently() {
        let id = Uuid::new_v4();
        let by_user = for_subscribe(&SubscriptionFilter {
            user_id: Some(id),
            kind: None,
        })
        .unwrap();
        assert_eq!(by_user, format!("users.*.{id}"));

        let by_kind = for_subscribe(&SubscriptionFilter {
            user_id: None,
            kind: Some(ChangeKind::Deleted),
        })
        .unwrap();
        assert_eq!(by_kind, "users.DELETED.*");
    }

    #[test]
    fn explicit_nil_user_id_is_rejected() {
        for kind in [None, Some(ChangeKind::Created)] {
            let err = for_subscribe(&SubscriptionFilter {
                user_id: Some(Uuid::nil()),
                kind,
            })
            .unwrap_err();
            assert!(err.is_invalid_user_id());
        }
    }

    #[test]
    fn publish_topics_are_concrete() {
        let id = Uuid::new_v4();
        let topic = for_publish(&UserChange::new(id, ChangeKind::Updated));
        assert_eq!(topic, format!("users.UPDATED.{id}"));
        assert!(!topic.contains(WILDCARD));
    }

    #[test]
    fn every_publish_topic_matches_the_full_wildcard() {
        let all = for_subscribe(&SubscriptionFilter::default()).unwrap();
        for kind in ChangeKind::ALL {
            let topic = for_publish(&UserChange::new(Uuid::new_v4(), kind));
            assert!(matches(&all, &topic), "{all} should match {topic}");
        }
    }

    #[test]
    fn filtered_subscriptions_only_match_their_changes() {
        let id = Uuid::new_v4();
        let other = Uuid::new_v4();
        let pattern = for_subscribe(&SubscriptionFilter {
            user_id: Some(id),
            kind: Some(ChangeKind::Created),
        })
        .unwrap();

        assert!(matches(
            &pattern,
            &for_publish(&UserChange::new(id, ChangeKind::Created))
        ));
        assert!(!matches(
            &pattern,
            &for_publish(&UserChange::new(id, ChangeKind::Deleted))
        ));
        assert!(!matches(
            &pattern,
            &for_publish(&UserChange::new(other, ChangeKind::Created))
        ));
    }

    #[test]
    fn matching_is_token_wise() {
        assert!(matches("users.*.*", "users.CREATED.abc"));
        assert!(!matches("users.*.*", "users.CREATED"));
        assert!(!matches("users.*.*", "users.CREATED.abc.def"));
        assert!(!matches("users.*", "users.CREATED.abc"));
        assert!(!matches("users.created.*", "users.CREATED.abc"));
        assert!(matches("users.>", "users.CREATED.abc"));
        assert!(!matches("users.>", "users"));
    }
}
