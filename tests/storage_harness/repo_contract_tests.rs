//! Macro-generated conformance suite for `Repository<TestItem>` backends.
//!
//! `repo_contract_tests!` generates one test module validating a backend
//! against the whole repository contract: insert/round-trip, filter
//! semantics for every comparison kind, cursor terminal operations, id-based
//! access, and the end-to-end reference scenario. Running the same suite
//! against every backend is what keeps their semantics aligned.
//!
//! # Usage
//!
//! ```rust,ignore
//! #[macro_use]
//! mod storage_harness;
//!
//! use storage_harness::*;
//!
//! repo_contract_tests!((MemoryRepo::<TestItem>::with_id_field("id"), ()));
//! ```
//!
//! The argument is an expression producing `(repository, guard)`. It is
//! re-evaluated per test for isolation; the guard keeps any backing resource
//! (a temp dir, a container handle) alive for the test's duration and may be
//! `()`.

/// Generate a full `Repository<TestItem>` conformance test suite.
#[macro_export]
macro_rules! repo_contract_tests {
    ($factory:expr) => {
        mod repo_contract {
            use super::*;
            use repokit::prelude::*;

            async fn seeded() -> (impl Repository<TestItem>, impl Sized) {
                let (repo, guard) = $factory;
                for person in people() {
                    repo.insert(&person).await.unwrap();
                }
                (repo, guard)
            }

            // ==================================================================
            // Round-trip
            // ==================================================================

            #[tokio::test]
            async fn test_insert_round_trips_all_fields() {
                let (repo, _guard) = $factory;
                let original = item("p1", "Jack", 30, 1.5, true);
                repo.insert(&original).await.unwrap();

                let back = repo.get(json!("p1")).await.unwrap();
                assert_eq!(back, original);
            }

            // ==================================================================
            // Filter semantics
            // ==================================================================

            #[tokio::test]
            async fn test_filter_idempotence() {
                let (repo, _guard) = seeded().await;
                let cursor = repo.filter_by(filter!(age: greater_than(31)));
                let first_run = cursor.all().await.unwrap();
                let second_run = cursor.all().await.unwrap();
                assert_eq!(first_run, second_run);
            }

            #[tokio::test]
            async fn test_conjunction_semantics() {
                let (repo, _guard) = seeded().await;
                // Both constraints must hold, not either.
                let matches = repo
                    .filter_by(filter!(active: true, age: greater_than(31)))
                    .all()
                    .await
                    .unwrap();
                assert_eq!(matches.len(), 1);
                assert_eq!(matches[0].name, "James");
            }

            #[tokio::test]
            async fn test_empty_filter_matches_everything() {
                let (repo, _guard) = seeded().await;
                assert_eq!(repo.filter_by(filter!()).count().await.unwrap(), 3);
                assert_eq!(repo.list().await.unwrap().len(), 3);
            }

            #[tokio::test]
            async fn test_greater_than() {
                let (repo, _guard) = seeded().await;
                let matches = repo
                    .filter_by(filter!(age: greater_than(31)))
                    .all()
                    .await
                    .unwrap();
                let mut ids: Vec<&str> = matches.iter().map(|p| p.id.as_str()).collect();
                ids.sort();
                assert_eq!(ids, vec!["p2", "p3"]);
            }

            #[tokio::test]
            async fn test_between_is_inclusive() {
                let (repo, _guard) = seeded().await;
                let matches = repo
                    .filter_by(filter!(age: between(30, 33)))
                    .all()
                    .await
                    .unwrap();
                assert_eq!(matches.len(), 2);
                assert!(matches.iter().all(|p| p.age >= 30 && p.age <= 33));
            }

            #[tokio::test]
            async fn test_membership() {
                let (repo, _guard) = seeded().await;
                let matches = repo
                    .filter_by(filter!(age: in_(vec![30, 36]).unwrap()))
                    .all()
                    .await
                    .unwrap();
                assert_eq!(matches.len(), 2);
                assert!(matches.iter().all(|p| p.age == 30 || p.age == 36));
            }

            #[tokio::test]
            async fn test_not_equal() {
                let (repo, _guard) = seeded().await;
                let matches = repo
                    .filter_by(filter!(name: not_equal("Jack")))
                    .all()
                    .await
                    .unwrap();
                assert_eq!(matches.len(), 2);
                assert!(matches.iter().all(|p| p.name != "Jack"));
            }

            #[tokio::test]
            async fn test_boolean_and_float_fields() {
                let (repo, _guard) = seeded().await;
                assert_eq!(
                    repo.filter_by(filter!(active: true)).count().await.unwrap(),
                    2
                );
                let low = repo
                    .filter_by(filter!(score: less_than(2.0)))
                    .all()
                    .await
                    .unwrap();
                assert_eq!(low.len(), 1);
                assert_eq!(low[0].name, "Jack");
            }

            // ==================================================================
            // Cursor terminal operations
            // ==================================================================

            #[tokio::test]
            async fn test_first_on_single_match() {
                let (repo, _guard) = seeded().await;
                let jack = repo.filter_by(filter!(name: "Jack")).first().await.unwrap();
                assert_eq!(jack.id, "p1");
                let jack_again = repo.filter_by(filter!(name: "Jack")).last().await.unwrap();
                assert_eq!(jack_again.id, "p1");
            }

            #[tokio::test]
            async fn test_first_without_match_is_item_not_found() {
                let (repo, _guard) = seeded().await;
                let err = repo
                    .filter_by(filter!(name: "Nobody"))
                    .first()
                    .await
                    .unwrap_err();
                assert!(matches!(err, RepoError::ItemNotFound));
                let err = repo
                    .filter_by(filter!(name: "Nobody"))
                    .last()
                    .await
                    .unwrap_err();
                assert!(matches!(err, RepoError::ItemNotFound));
            }

            #[tokio::test]
            async fn test_empty_match_reads_and_writes_are_noops() {
                let (repo, _guard) = seeded().await;
                let cursor = repo.filter_by(filter!(name: "Nobody"));
                assert!(cursor.all().await.unwrap().is_empty());
                assert!(cursor.limit(5).await.unwrap().is_empty());
                assert_eq!(cursor.count().await.unwrap(), 0);
                cursor.update(&values!(age: 99)).await.unwrap();
                cursor.delete().await.unwrap();
                assert_eq!(repo.filter_by(filter!()).count().await.unwrap(), 3);
            }

            #[tokio::test]
            async fn test_limit() {
                let (repo, _guard) = seeded().await;
                let cursor = repo.filter_by(filter!());
                assert!(cursor.limit(0).await.unwrap().is_empty());
                assert_eq!(cursor.limit(2).await.unwrap().len(), 2);
                assert_eq!(cursor.limit(10).await.unwrap().len(), 3);
            }

            #[tokio::test]
            async fn test_count_matches_all_len() {
                let (repo, _guard) = seeded().await;
                let cursor = repo.filter_by(filter!(active: true));
                assert_eq!(
                    cursor.count().await.unwrap(),
                    cursor.all().await.unwrap().len()
                );
            }

            #[tokio::test]
            async fn test_update_then_read() {
                let (repo, _guard) = seeded().await;
                repo.filter_by(filter!(name: "Jack"))
                    .update(&values!(age: 31))
                    .await
                    .unwrap();
                assert_eq!(repo.get(json!("p1")).await.unwrap().age, 31);
                // Untouched items stay untouched.
                assert_eq!(repo.get(json!("p2")).await.unwrap().age, 33);
            }

            #[tokio::test]
            async fn test_update_does_not_shrink_match_set() {
                let (repo, _guard) = seeded().await;
                // The update changes a field the expression does not
                // reference, so the same filter keeps matching.
                let cursor = repo.filter_by(filter!(active: true));
                let before = cursor.count().await.unwrap();
                cursor.update(&values!(score: 9.0)).await.unwrap();
                assert_eq!(cursor.count().await.unwrap(), before);
            }

            #[tokio::test]
            async fn test_delete_completeness() {
                let (repo, _guard) = seeded().await;
                repo.filter_by(filter!(age: greater_than(31)))
                    .delete()
                    .await
                    .unwrap();
                assert_eq!(
                    repo.filter_by(filter!(age: greater_than(31)))
                        .count()
                        .await
                        .unwrap(),
                    0
                );
                assert_eq!(repo.filter_by(filter!()).count().await.unwrap(), 1);
            }

            #[tokio::test]
            async fn test_replace_single_match() {
                let (repo, _guard) = seeded().await;
                repo.filter_by(filter!(id: "p1"))
                    .replace(&item("p1", "Jacques", 31, 1.5, true))
                    .await
                    .unwrap();
                let jacques = repo.get(json!("p1")).await.unwrap();
                assert_eq!(jacques.name, "Jacques");
                assert_eq!(repo.filter_by(filter!()).count().await.unwrap(), 3);
            }

            // ==================================================================
            // Insert edge cases
            // ==================================================================

            #[tokio::test]
            async fn test_insert_duplicate_id_rejected() {
                let (repo, _guard) = seeded().await;
                let err = repo
                    .insert(&item("p1", "Impostor", 99, 0.0, false))
                    .await
                    .unwrap_err();
                assert!(matches!(err, RepoError::DuplicateKey { .. }));
                // The original item is untouched.
                assert_eq!(repo.get(json!("p1")).await.unwrap().name, "Jack");
            }

            #[tokio::test]
            async fn test_upsert_inserts_then_updates() {
                let (repo, _guard) = $factory;
                repo.upsert(&item("p1", "Jack", 30, 1.5, true)).await.unwrap();
                repo.upsert(&item("p1", "Jack", 31, 1.5, true)).await.unwrap();
                assert_eq!(repo.filter_by(filter!()).count().await.unwrap(), 1);
                assert_eq!(repo.get(json!("p1")).await.unwrap().age, 31);
            }

            // ==================================================================
            // Id-based access
            // ==================================================================

            #[tokio::test]
            async fn test_get_missing_id_is_key_not_found() {
                let (repo, _guard) = seeded().await;
                let err = repo.get(json!("p9")).await.unwrap_err();
                assert!(matches!(err, RepoError::KeyNotFound { .. }));
            }

            #[tokio::test]
            async fn test_set_by_id() {
                let (repo, _guard) = seeded().await;
                repo.set(json!("p2"), &values!(score: 7.5)).await.unwrap();
                assert!((repo.get(json!("p2")).await.unwrap().score - 7.5).abs() < f64::EPSILON);

                let err = repo
                    .set(json!("p9"), &values!(score: 7.5))
                    .await
                    .unwrap_err();
                assert!(matches!(err, RepoError::KeyNotFound { .. }));
            }

            #[tokio::test]
            async fn test_remove_by_id() {
                let (repo, _guard) = seeded().await;
                repo.remove(json!("p3")).await.unwrap();
                assert_eq!(repo.filter_by(filter!()).count().await.unwrap(), 2);

                let err = repo.remove(json!("p3")).await.unwrap_err();
                assert!(matches!(err, RepoError::KeyNotFound { .. }));
            }

            // ==================================================================
            // Reference scenario
            // ==================================================================

            /// The end-to-end walkthrough every backend must agree on:
            /// comparison query, count, filtered update, id read, membership
            /// delete.
            #[tokio::test]
            async fn test_reference_scenario() {
                let (repo, _guard) = seeded().await;

                let seniors = repo
                    .filter_by(filter!(age: greater_than(31)))
                    .all()
                    .await
                    .unwrap();
                let mut ids: Vec<&str> = seniors.iter().map(|p| p.id.as_str()).collect();
                ids.sort();
                assert_eq!(ids, vec!["p2", "p3"]);
                assert_eq!(
                    repo.filter_by(filter!(age: greater_than(31)))
                        .count()
                        .await
                        .unwrap(),
                    2
                );

                repo.filter_by(filter!(name: "Jack"))
                    .update(&values!(age: 31))
                    .await
                    .unwrap();
                assert_eq!(repo.get(json!("p1")).await.unwrap().age, 31);

                repo.filter_by(filter!(age: in_(vec![31, 33]).unwrap()))
                    .delete()
                    .await
                    .unwrap();
                let remaining = repo.list().await.unwrap();
                assert_eq!(remaining.len(), 1);
                assert_eq!(remaining[0].id, "p3");
            }
        }
    };
}
