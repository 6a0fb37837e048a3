#![allow(clippy::unwrap_used, clippy::expect_used)]

//! `OrmUsersRepository` against an in-memory `SQLite` database.

mod support;

use support::{at, inmem_repo, seed, user};
use time::OffsetDateTime;
use users::domain::{DomainError, UsersRepository};
use users::{Paging, UpdateUserFields, UserFilter};
use users_sdk::TimeFilter;
use uuid::Uuid;

const ALL: Paging = Paging {
    offset: 0,
    limit: 100,
};

#[tokio::test]
async fn add_then_list_returns_stored_row() {
    let repo = inmem_repo().await;
    let alice = user("alice", "UK", 0);
    repo.add(&alice).await.unwrap();

    let (users, total) = repo.list(&UserFilter::default(), ALL).await.unwrap();
    assert_eq!(total, 1);
    assert_eq!(users, vec![alice]);
}

#[tokio::test]
async fn duplicate_id_is_rejected() {
    let repo = inmem_repo().await;
    let alice = user("alice", "UK", 0);
    repo.add(&alice).await.unwrap();

    let err = repo.add(&alice).await.unwrap_err();
    assert!(matches!(err, DomainError::DuplicateUserId));
}

#[tokio::test]
async fn list_pages_in_insertion_order_with_total() {
    let repo = inmem_repo().await;
    let users: Vec<_> = (0..5).map(|n| user(&format!("u{n}"), "UK", n * 10)).collect();
    // Insert out of order; creation time decides the order.
    seed(&repo, &[users[3].clone(), users[0].clone(), users[4].clone()]).await;
    seed(&repo, &[users[1].clone(), users[2].clone()]).await;

    let (page, total) = repo
        .list(
            &UserFilter::default(),
            Paging {
                offset: 1,
                limit: 2,
            },
        )
        .await
        .unwrap();

    assert_eq!(total, 5);
    let nicknames: Vec<_> = page.iter().map(|u| u.nickname.as_str()).collect();
    assert_eq!(nicknames, vec!["u1", "u2"]);
}

#[tokio::test]
async fn list_filters_combine() {
    let repo = inmem_repo().await;
    seed(
        &repo,
        &[
            user("a", "UK", 0),
            user("b", "SE", 10),
            user("c", "SE", 20),
            user("d", "NO", 30),
        ],
    )
    .await;

    let by_country = UserFilter {
        countries: vec!["SE".to_owned(), "NO".to_owned()],
        ..UserFilter::default()
    };
    let (_, total) = repo.list(&by_country, ALL).await.unwrap();
    assert_eq!(total, 3);

    let narrowed = UserFilter {
        nickname: Some("c".to_owned()),
        ..by_country
    };
    let (users, total) = repo.list(&narrowed, ALL).await.unwrap();
    assert_eq!(total, 1);
    assert_eq!(users[0].nickname, "c");
}

#[tokio::test]
async fn time_window_bounds_are_exclusive() {
    let repo = inmem_repo().await;
    seed(
        &repo,
        &[user("a", "UK", 0), user("b", "UK", 10), user("c", "UK", 20)],
    )
    .await;

    let filter = UserFilter {
        created: Some(TimeFilter {
            after: Some(at(0)),
            before: Some(at(20)),
        }),
        ..UserFilter::default()
    };
    let (users, total) = repo.list(&filter, ALL).await.unwrap();
    assert_eq!(total, 1);
    assert_eq!(users[0].nickname, "b");
}

#[tokio::test]
async fn sub_second_rows_sit_after_whole_second_bound() {
    let repo = inmem_repo().await;
    let mut later = user("later", "UK", 0);
    later.created_at = at(0) + time::Duration::milliseconds(300);
    seed(&repo, &[later.clone()]).await;

    let after = UserFilter {
        created: Some(TimeFilter {
            after: Some(at(0)),
            before: None,
        }),
        ..UserFilter::default()
    };
    let (users, total) = repo.list(&after, ALL).await.unwrap();
    assert_eq!(total, 1);
    assert_eq!(users[0].created_at, later.created_at);

    let before = UserFilter {
        created: Some(TimeFilter {
            after: None,
            before: Some(at(0)),
        }),
        ..UserFilter::default()
    };
    let (_, total) = repo.list(&before, ALL).await.unwrap();
    assert_eq!(total, 0);
}

#[tokio::test]
async fn list_orders_whole_second_before_fraction() {
    let repo = inmem_repo().await;
    let first = user("first", "UK", 0);
    let mut second = user("second", "UK", 0);
    second.created_at = at(0) + time::Duration::milliseconds(300);
    let mut third = user("third", "UK", 0);
    third.created_at = at(1) + time::Duration::nanoseconds(5);
    seed(&repo, &[third, second, first]).await;

    let (users, _) = repo.list(&UserFilter::default(), ALL).await.unwrap();
    let nicknames: Vec<_> = users.iter().map(|u| u.nickname.as_str()).collect();
    assert_eq!(nicknames, vec!["first", "second", "third"]);
}

#[tokio::test]
async fn far_future_bound_matches_everything() {
    let repo = inmem_repo().await;
    seed(&repo, &[user("a", "UK", 0), user("b", "UK", 10)]).await;

    let filter = UserFilter {
        created: Some(TimeFilter {
            after: None,
            before: Some(time::macros::datetime!(3000-01-01 0:00 UTC)),
        }),
        ..UserFilter::default()
    };
    let (_, total) = repo.list(&filter, ALL).await.unwrap();
    assert_eq!(total, 2);
}

#[tokio::test]
async fn update_targets_first_match_and_clears_empty_fields() {
    let repo = inmem_repo().await;
    let first = user("first", "SE", 0);
    let second = user("second", "SE", 10);
    seed(&repo, &[second.clone(), first.clone()]).await;

    let fields = UpdateUserFields {
        nickname: Some(String::new()),
        country: Some("FI".to_owned()),
        ..UpdateUserFields::default()
    };
    let filter = UserFilter {
        countries: vec!["SE".to_owned()],
        ..UserFilter::default()
    };

    let before = OffsetDateTime::now_utc();
    let updated = repo.update_partial(&filter, &fields).await.unwrap();

    assert_eq!(updated.id, first.id);
    assert_eq!(updated.nickname, "");
    assert_eq!(updated.country, "FI");
    assert_eq!(updated.first_name, first.first_name);
    assert_eq!(updated.created_at, first.created_at);
    assert!(updated.updated_at.unwrap() >= before - time::Duration::seconds(1));

    let (untouched, _) = repo
        .list(&UserFilter::by_id(second.id), ALL)
        .await
        .unwrap();
    assert_eq!(untouched[0], second);
}

#[tokio::test]
async fn update_without_match_is_not_found() {
    let repo = inmem_repo().await;
    seed(&repo, &[user("a", "UK", 0)]).await;

    let err = repo
        .update_partial(
            &UserFilter::by_id(Uuid::new_v4()),
            &UpdateUserFields {
                email: Some("x@example.com".to_owned()),
                ..UpdateUserFields::default()
            },
        )
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn updated_window_skips_never_updated_rows() {
    let repo = inmem_repo().await;
    let a = user("a", "UK", 0);
    let b = user("b", "UK", 10);
    seed(&repo, &[a.clone(), b]).await;

    repo.update_partial(
        &UserFilter::by_id(a.id),
        &UpdateUserFields {
            last_name: Some("Byron".to_owned()),
            ..UpdateUserFields::default()
        },
    )
    .await
    .unwrap();

    let filter = UserFilter {
        updated: Some(TimeFilter {
            after: Some(at(0)),
            before: None,
        }),
        ..UserFilter::default()
    };
    let (users, total) = repo.list(&filter, ALL).await.unwrap();
    assert_eq!(total, 1);
    assert_eq!(users[0].id, a.id);
}

#[tokio::test]
async fn delete_is_idempotent() {
    let repo = inmem_repo().await;
    let a = user("a", "UK", 0);
    seed(&repo, &[a.clone()]).await;

    repo.delete(a.id).await.unwrap();
    repo.delete(a.id).await.unwrap();
    repo.delete(Uuid::new_v4()).await.unwrap();

    let (_, total) = repo.list(&UserFilter::default(), ALL).await.unwrap();
    assert_eq!(total, 0);
}
