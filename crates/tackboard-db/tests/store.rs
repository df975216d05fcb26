//! Store-level behavior tests against an in-memory database: ordering
//! density, cascade completeness, membership gates, and the audit trail.

use tackboard_db::{Database, StoreError};
use tackboard_types::history::HistoryDetails;
use tackboard_types::models::{CardStatus, NotificationBody};
use uuid::Uuid;

fn db_with_users(names: &[&str]) -> (Database, Vec<Uuid>) {
    let db = Database::open_in_memory().expect("open in-memory db");
    let ids = names
        .iter()
        .map(|name| {
            let id = Uuid::new_v4();
            db.upsert_user(id, name).expect("provision user");
            id
        })
        .collect();
    (db, ids)
}

/// History actions for a project, oldest first.
fn actions(db: &Database, project: Uuid, requester: Uuid) -> Vec<&'static str> {
    let mut actions: Vec<_> = db
        .project_history(project, requester)
        .expect("history")
        .iter()
        .map(|entry| entry.details.action())
        .collect();
    actions.reverse();
    actions
}

fn card_titles_and_positions(db: &Database, project: Uuid, requester: Uuid) -> Vec<(String, i64)> {
    db.list_cards(project, requester)
        .expect("list cards")
        .into_iter()
        .map(|card| (card.title, card.position))
        .collect()
}

// -- Projects & membership --

#[test]
fn create_project_seeds_owner_membership_and_order() {
    let (db, users) = db_with_users(&["mina"]);
    let project = db.create_project(users[0], "Sprint 1", "", None).unwrap();

    assert_eq!(project.members, vec![users[0]]);
    let listed = db.list_projects(users[0]).unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, project.id);
    assert_eq!(actions(&db, project.id, users[0]), vec!["create"]);
}

#[test]
fn empty_project_name_is_rejected() {
    let (db, users) = db_with_users(&["mina"]);
    let err = db.create_project(users[0], "   ", "", None).unwrap_err();
    assert!(matches!(err, StoreError::Validation(_)));
}

#[test]
fn invite_then_accept_completes_membership() {
    let (db, users) = db_with_users(&["mina", "bob"]);
    let (u1, u2) = (users[0], users[1]);
    let project = db.create_project(u1, "Sprint 1", "", None).unwrap();

    db.invite_member(project.id, u1, "bob").unwrap();
    db.respond_invitation(project.id, u2, true).unwrap();

    let fetched = db.get_project(project.id, u2).unwrap();
    assert!(fetched.members.contains(&u1));
    assert!(fetched.members.contains(&u2));
    assert_eq!(fetched.members.len(), 2);

    // Chronological audit trail of the whole exchange.
    assert_eq!(
        actions(&db, project.id, u1),
        vec!["create", "invite", "join"]
    );

    // Joining put the project at the end of bob's personal order.
    let bobs_projects = db.list_projects(u2).unwrap();
    assert_eq!(bobs_projects.len(), 1);
    assert_eq!(bobs_projects[0].id, project.id);
}

#[test]
fn duplicate_invites_and_member_invites_conflict() {
    let (db, users) = db_with_users(&["mina", "bob"]);
    let (u1, u2) = (users[0], users[1]);
    let project = db.create_project(u1, "Sprint 1", "", None).unwrap();

    assert!(matches!(
        db.invite_member(project.id, u1, "nobody").unwrap_err(),
        StoreError::NotFound(_)
    ));

    db.invite_member(project.id, u1, "bob").unwrap();
    assert!(matches!(
        db.invite_member(project.id, u1, "bob").unwrap_err(),
        StoreError::Conflict(_)
    ));

    db.respond_invitation(project.id, u2, true).unwrap();
    assert!(matches!(
        db.invite_member(project.id, u1, "bob").unwrap_err(),
        StoreError::Conflict(_)
    ));
}

#[test]
fn repeated_accept_is_a_no_op() {
    let (db, users) = db_with_users(&["mina", "bob"]);
    let (u1, u2) = (users[0], users[1]);
    let project = db.create_project(u1, "Sprint 1", "", None).unwrap();

    db.invite_member(project.id, u1, "bob").unwrap();
    db.respond_invitation(project.id, u2, true).unwrap();
    db.respond_invitation(project.id, u2, true).unwrap();

    let fetched = db.get_project(project.id, u2).unwrap();
    assert_eq!(fetched.members.len(), 2);

    let joins = actions(&db, project.id, u1)
        .iter()
        .filter(|a| **a == "join")
        .count();
    assert_eq!(joins, 1);
}

#[test]
fn declining_consumes_the_invitation_without_membership() {
    let (db, users) = db_with_users(&["mina", "bob"]);
    let (u1, u2) = (users[0], users[1]);
    let project = db.create_project(u1, "Sprint 1", "", None).unwrap();

    db.invite_member(project.id, u1, "bob").unwrap();
    db.respond_invitation(project.id, u2, false).unwrap();

    assert!(db.invitations_for(u2).unwrap().is_empty());
    assert!(!db.is_project_member(project.id, u2).unwrap());
}

#[test]
fn leave_keeps_the_project_alive() {
    let (db, users) = db_with_users(&["mina", "bob"]);
    let (u1, u2) = (users[0], users[1]);
    let project = db.create_project(u1, "Sprint 1", "", None).unwrap();
    db.invite_member(project.id, u1, "bob").unwrap();
    db.respond_invitation(project.id, u2, true).unwrap();

    let outcome = db.delete_or_leave_project(project.id, u2).unwrap();
    assert_eq!(outcome, tackboard_db::projects::DeleteOutcome::Left);

    assert!(db.list_projects(u2).unwrap().is_empty());
    assert_eq!(db.list_projects(u1).unwrap().len(), 1);
    assert!(actions(&db, project.id, u1).contains(&"leave"));
}

#[test]
fn deleting_a_project_cascades_everything_it_owns() {
    let (db, users) = db_with_users(&["mina", "bob", "eve"]);
    let (u1, u2) = (users[0], users[1]);
    let project = db.create_project(u1, "Sprint 1", "", None).unwrap();
    db.invite_member(project.id, u1, "bob").unwrap();
    db.respond_invitation(project.id, u2, true).unwrap();

    let card = db
        .create_card(project.id, u1, "task", "", CardStatus::Todo)
        .unwrap();
    db.add_comment(project.id, Some(card.id), u2, "looks good", None)
        .unwrap();
    db.post_chat_message(project.id, u1, "mina", "hello").unwrap();
    db.invite_member(project.id, u1, "eve").unwrap();

    let outcome = db.delete_or_leave_project(project.id, u1).unwrap();
    assert_eq!(outcome, tackboard_db::projects::DeleteOutcome::Deleted);

    // Every member's view order lost the project, and nothing owned by the
    // project survives.
    assert!(db.list_projects(u1).unwrap().is_empty());
    assert!(db.list_projects(u2).unwrap().is_empty());
    assert!(db.list_all_cards(u1).unwrap().is_empty());
    assert!(db.list_all_cards(u2).unwrap().is_empty());
    assert!(db.invitations_for(users[2]).unwrap().is_empty());
    assert!(matches!(
        db.get_project(project.id, u1).unwrap_err(),
        StoreError::NotFound(_)
    ));
    assert!(matches!(
        db.project_history(project.id, u1).unwrap_err(),
        StoreError::NotFound(_)
    ));
}

#[test]
fn non_member_delete_is_a_permission_error() {
    let (db, users) = db_with_users(&["mina", "eve"]);
    let project = db.create_project(users[0], "Sprint 1", "", None).unwrap();

    assert!(matches!(
        db.delete_or_leave_project(project.id, users[1]).unwrap_err(),
        StoreError::Permission(_)
    ));
    assert_eq!(db.list_projects(users[0]).unwrap().len(), 1);
}

#[test]
fn project_reorder_is_scoped_to_one_user() {
    let (db, users) = db_with_users(&["mina", "bob"]);
    let (u1, u2) = (users[0], users[1]);
    let p1 = db.create_project(u1, "One", "", None).unwrap();
    let p2 = db.create_project(u1, "Two", "", None).unwrap();
    for p in [p1.id, p2.id] {
        db.invite_member(p, u1, "bob").unwrap();
        db.respond_invitation(p, u2, true).unwrap();
    }

    db.reorder_projects(u1, &[p2.id, p1.id]).unwrap();

    let mina: Vec<Uuid> = db.list_projects(u1).unwrap().iter().map(|p| p.id).collect();
    let bob: Vec<Uuid> = db.list_projects(u2).unwrap().iter().map(|p| p.id).collect();
    assert_eq!(mina, vec![p2.id, p1.id]);
    assert_eq!(bob, vec![p1.id, p2.id]);
}

#[test]
fn project_reorder_rejects_foreign_ids() {
    let (db, users) = db_with_users(&["mina"]);
    let p1 = db.create_project(users[0], "One", "", None).unwrap();

    assert!(matches!(
        db.reorder_projects(users[0], &[p1.id, Uuid::new_v4()])
            .unwrap_err(),
        StoreError::NotFound(_)
    ));
}

#[test]
fn edit_project_records_only_real_changes() {
    let (db, users) = db_with_users(&["mina"]);
    let deadline = "2026-09-01".parse().unwrap();
    let project = db
        .create_project(users[0], "Sprint 1", "first pass", Some(deadline))
        .unwrap();

    let changes = db
        .edit_project(project.id, users[0], Some("Sprint 2"), None, Some(None))
        .unwrap();
    assert_eq!(changes.name.as_ref().unwrap().to, "Sprint 2");
    assert_eq!(changes.deadline.as_ref().unwrap().from, Some(deadline));
    assert_eq!(changes.deadline.as_ref().unwrap().to, None);
    assert!(changes.description.is_none());

    // Same values again: nothing to write, nothing to record.
    let unchanged = db
        .edit_project(project.id, users[0], Some("Sprint 2"), None, Some(None))
        .unwrap();
    assert!(unchanged.is_empty());

    let project_updates = actions(&db, project.id, users[0])
        .iter()
        .filter(|a| **a == "project_update")
        .count();
    assert_eq!(project_updates, 1);
}

// -- Cards & ordering --

#[test]
fn card_orders_are_dense_after_reorder() {
    let (db, users) = db_with_users(&["mina"]);
    let u1 = users[0];
    let project = db.create_project(u1, "Board", "", None).unwrap();

    let a = db.create_card(project.id, u1, "A", "", CardStatus::Todo).unwrap();
    let b = db.create_card(project.id, u1, "B", "", CardStatus::Todo).unwrap();
    let c = db.create_card(project.id, u1, "C", "", CardStatus::Todo).unwrap();

    assert_eq!(
        card_titles_and_positions(&db, project.id, u1),
        vec![("A".into(), 0), ("B".into(), 1), ("C".into(), 2)]
    );

    db.reorder_cards(project.id, u1, &[c.id, a.id, b.id]).unwrap();

    assert_eq!(
        card_titles_and_positions(&db, project.id, u1),
        vec![("C".into(), 0), ("A".into(), 1), ("B".into(), 2)]
    );
}

#[test]
fn reorder_rejects_foreign_ids_before_any_write() {
    let (db, users) = db_with_users(&["mina"]);
    let u1 = users[0];
    let project = db.create_project(u1, "Board", "", None).unwrap();
    let a = db.create_card(project.id, u1, "A", "", CardStatus::Todo).unwrap();
    let b = db.create_card(project.id, u1, "B", "", CardStatus::Todo).unwrap();

    let err = db
        .reorder_cards(project.id, u1, &[b.id, Uuid::new_v4(), a.id])
        .unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)));

    // Nothing moved.
    assert_eq!(
        card_titles_and_positions(&db, project.id, u1),
        vec![("A".into(), 0), ("B".into(), 1)]
    );
}

#[test]
fn reorder_requires_membership() {
    let (db, users) = db_with_users(&["mina", "eve"]);
    let project = db.create_project(users[0], "Board", "", None).unwrap();
    let a = db
        .create_card(project.id, users[0], "A", "", CardStatus::Todo)
        .unwrap();

    assert!(matches!(
        db.reorder_cards(project.id, users[1], &[a.id]).unwrap_err(),
        StoreError::Permission(_)
    ));
}

#[test]
fn move_requires_membership_in_both_projects() {
    let (db, users) = db_with_users(&["mina", "bob"]);
    let (u1, u2) = (users[0], users[1]);
    let p1 = db.create_project(u1, "Shared", "", None).unwrap();
    db.invite_member(p1.id, u1, "bob").unwrap();
    db.respond_invitation(p1.id, u2, true).unwrap();
    let p2 = db.create_project(u1, "Private", "", None).unwrap();

    let x = db.create_card(p1.id, u2, "X", "", CardStatus::Todo).unwrap();

    // Bob can see p1 but not p2; the move must fail symmetrically.
    let err = db
        .move_card(x.id, u2, p1.id, p2.id, &[x.id])
        .unwrap_err();
    assert!(matches!(err, StoreError::Permission(_)));

    // Card untouched, and neither project picked up a move entry.
    let p1_cards = db.list_cards(p1.id, u1).unwrap();
    assert_eq!(p1_cards.len(), 1);
    assert_eq!(p1_cards[0].project_id, p1.id);
    assert!(db.list_cards(p2.id, u1).unwrap().is_empty());
    assert!(!actions(&db, p1.id, u1).contains(&"card_move_out"));
    assert!(!actions(&db, p2.id, u1).contains(&"card_move_in"));
}

#[test]
fn move_renumbers_destination_and_tolerates_source_gaps() {
    let (db, users) = db_with_users(&["mina"]);
    let u1 = users[0];
    let p1 = db.create_project(u1, "From", "", None).unwrap();
    let p2 = db.create_project(u1, "To", "", None).unwrap();

    let a = db.create_card(p1.id, u1, "a", "", CardStatus::Todo).unwrap();
    let b = db.create_card(p1.id, u1, "b", "", CardStatus::Todo).unwrap();
    let c = db.create_card(p1.id, u1, "c", "", CardStatus::Todo).unwrap();
    let d = db.create_card(p2.id, u1, "d", "", CardStatus::Todo).unwrap();

    db.move_card(b.id, u1, p1.id, p2.id, &[d.id, b.id]).unwrap();

    // Destination is dense and exactly in the requested order.
    assert_eq!(
        card_titles_and_positions(&db, p2.id, u1),
        vec![("d".into(), 0), ("b".into(), 1)]
    );

    // The card lives in exactly one project.
    let p1_ids: Vec<Uuid> = db.list_cards(p1.id, u1).unwrap().iter().map(|c| c.id).collect();
    assert_eq!(p1_ids, vec![a.id, c.id]);

    // Source keeps its gap (positions 0 and 2) until the next reorder.
    assert_eq!(
        card_titles_and_positions(&db, p1.id, u1),
        vec![("a".into(), 0), ("c".into(), 2)]
    );

    // Appending still lands past the gap, and a reorder heals density.
    let e = db.create_card(p1.id, u1, "e", "", CardStatus::Todo).unwrap();
    assert_eq!(e.position, 3);
    db.reorder_cards(p1.id, u1, &[a.id, c.id, e.id]).unwrap();
    assert_eq!(
        card_titles_and_positions(&db, p1.id, u1),
        vec![("a".into(), 0), ("c".into(), 1), ("e".into(), 2)]
    );

    // Audit entries landed on both sides.
    assert!(actions(&db, p1.id, u1).contains(&"card_move_out"));
    assert!(actions(&db, p2.id, u1).contains(&"card_move_in"));
}

#[test]
fn move_order_must_include_the_moved_card() {
    let (db, users) = db_with_users(&["mina"]);
    let u1 = users[0];
    let p1 = db.create_project(u1, "From", "", None).unwrap();
    let p2 = db.create_project(u1, "To", "", None).unwrap();
    let a = db.create_card(p1.id, u1, "a", "", CardStatus::Todo).unwrap();
    let d = db.create_card(p2.id, u1, "d", "", CardStatus::Todo).unwrap();

    let err = db.move_card(a.id, u1, p1.id, p2.id, &[d.id]).unwrap_err();
    assert!(matches!(err, StoreError::Validation(_)));

    // Failed move left the card where it was.
    assert_eq!(db.list_cards(p1.id, u1).unwrap().len(), 1);
}

#[test]
fn update_card_audits_status_separately() {
    let (db, users) = db_with_users(&["mina"]);
    let u1 = users[0];
    let project = db.create_project(u1, "Board", "", None).unwrap();
    let card = db
        .create_card(project.id, u1, "draft", "", CardStatus::Todo)
        .unwrap();

    let changes = db
        .update_card(
            project.id,
            card.id,
            u1,
            Some("final"),
            None,
            Some(CardStatus::Done),
        )
        .unwrap();
    assert!(changes.title.is_some());
    assert!(changes.status.is_some());

    // One API call, two audit entries: the general diff plus the dedicated
    // status entry.
    let trail = actions(&db, project.id, u1);
    assert!(trail.contains(&"card_update"));
    assert!(trail.contains(&"card_status_update"));

    // A no-op edit writes nothing.
    let before = db.project_history(project.id, u1).unwrap().len();
    let unchanged = db
        .update_card(project.id, card.id, u1, Some("final"), None, None)
        .unwrap();
    assert!(unchanged.is_empty());
    assert_eq!(db.project_history(project.id, u1).unwrap().len(), before);
}

#[test]
fn status_update_diffs_before_writing() {
    let (db, users) = db_with_users(&["mina"]);
    let u1 = users[0];
    let project = db.create_project(u1, "Board", "", None).unwrap();
    let card = db
        .create_card(project.id, u1, "task", "", CardStatus::Todo)
        .unwrap();

    let change = db
        .update_card_status(project.id, card.id, u1, CardStatus::InProgress)
        .unwrap()
        .expect("status changed");
    assert_eq!(change.from, "todo");
    assert_eq!(change.to, "in_progress");

    assert!(db
        .update_card_status(project.id, card.id, u1, CardStatus::InProgress)
        .unwrap()
        .is_none());
}

#[test]
fn due_dates_diff_and_audit() {
    let (db, users) = db_with_users(&["mina"]);
    let u1 = users[0];
    let project = db.create_project(u1, "Board", "", None).unwrap();
    let card = db
        .create_card(project.id, u1, "task", "", CardStatus::Todo)
        .unwrap();

    let first = "2026-08-20".parse().unwrap();
    assert!(db.set_due_date(project.id, card.id, u1, first).unwrap());
    assert!(!db.set_due_date(project.id, card.id, u1, first).unwrap());

    let second = "2026-09-01".parse().unwrap();
    let old = db
        .update_due_date(project.id, card.id, u1, second)
        .unwrap()
        .expect("date changed");
    assert_eq!(old, Some(first));

    let entries = db.project_history(project.id, u1).unwrap();
    match &entries[0].details {
        HistoryDetails::CardDueDateUpdate {
            old_due_date,
            new_due_date,
            ..
        } => {
            assert_eq!(*old_due_date, Some(first));
            assert_eq!(*new_due_date, second);
        }
        other => panic!("unexpected newest entry: {:?}", other),
    }

    assert_eq!(
        db.get_card(project.id, card.id, u1).unwrap().due_date,
        Some(second)
    );
}

#[test]
fn delete_card_snapshots_the_title() {
    let (db, users) = db_with_users(&["mina"]);
    let u1 = users[0];
    let project = db.create_project(u1, "Board", "", None).unwrap();
    let card = db
        .create_card(project.id, u1, "doomed", "", CardStatus::Todo)
        .unwrap();

    db.delete_card(project.id, card.id, u1).unwrap();

    assert!(db.list_cards(project.id, u1).unwrap().is_empty());
    let entries = db.project_history(project.id, u1).unwrap();
    match &entries[0].details {
        HistoryDetails::CardDelete { title } => assert_eq!(title, "doomed"),
        other => panic!("unexpected newest entry: {:?}", other),
    }
}

#[test]
fn history_count_never_decreases_outside_project_deletion() {
    let (db, users) = db_with_users(&["mina"]);
    let u1 = users[0];
    let project = db.create_project(u1, "Board", "", None).unwrap();

    let mut last = 0;
    let card = db
        .create_card(project.id, u1, "t", "", CardStatus::Todo)
        .unwrap();
    for step in 0..3 {
        match step {
            0 => {
                db.update_card_status(project.id, card.id, u1, CardStatus::Done)
                    .unwrap();
            }
            1 => {
                db.add_comment(project.id, None, u1, "note", None).unwrap();
            }
            _ => {
                db.delete_card(project.id, card.id, u1).unwrap();
            }
        }
        let count = db.project_history(project.id, u1).unwrap().len();
        assert!(count >= last);
        last = count;
    }
}

#[test]
fn history_requires_membership() {
    let (db, users) = db_with_users(&["mina", "eve"]);
    let project = db.create_project(users[0], "Board", "", None).unwrap();

    assert!(matches!(
        db.project_history(project.id, users[1]).unwrap_err(),
        StoreError::Permission(_)
    ));
}

// -- Comments --

#[test]
fn comment_edit_is_author_only_and_audited() {
    let (db, users) = db_with_users(&["mina", "bob"]);
    let (u1, u2) = (users[0], users[1]);
    let project = db.create_project(u1, "Board", "", None).unwrap();
    db.invite_member(project.id, u1, "bob").unwrap();
    db.respond_invitation(project.id, u2, true).unwrap();

    let comment = db.add_comment(project.id, None, u1, "old", None).unwrap();
    db.edit_comment(comment.id, u1, "new", None).unwrap();

    let entries = db.project_history(project.id, u1).unwrap();
    match &entries[0].details {
        HistoryDetails::CommentUpdate {
            old_content,
            new_content,
            ..
        } => {
            assert_eq!(old_content, "old");
            assert_eq!(new_content, "new");
        }
        other => panic!("unexpected newest entry: {:?}", other),
    }

    // Membership is not enough: editing is for the author alone.
    assert!(matches!(
        db.edit_comment(comment.id, u2, "hijacked", None).unwrap_err(),
        StoreError::Permission(_)
    ));
    assert!(matches!(
        db.delete_comment(comment.id, u2).unwrap_err(),
        StoreError::Permission(_)
    ));

    let contents: Vec<String> = db
        .list_comments(project.id, u1, None)
        .unwrap()
        .into_iter()
        .map(|c| c.content)
        .collect();
    assert_eq!(contents, vec!["new".to_string()]);
}

#[test]
fn comment_attachment_changes_surface_the_replaced_blob() {
    let (db, users) = db_with_users(&["mina"]);
    let u1 = users[0];
    let project = db.create_project(u1, "Board", "", None).unwrap();
    let comment = db
        .add_comment(project.id, None, u1, "with file", Some("blob-1"))
        .unwrap();

    // Keeping the attachment reports nothing to clean up.
    let kept = db.edit_comment(comment.id, u1, "still here", None).unwrap();
    assert_eq!(kept.removed_attachment, None);

    // Replacing it hands back the old reference.
    let replaced = db
        .edit_comment(comment.id, u1, "swapped", Some(Some("blob-2")))
        .unwrap();
    assert_eq!(replaced.removed_attachment.as_deref(), Some("blob-1"));

    // Removing it entirely does too, and deletion surfaces the final one.
    let removed = db
        .edit_comment(comment.id, u1, "bare", Some(None))
        .unwrap();
    assert_eq!(removed.removed_attachment.as_deref(), Some("blob-2"));

    let deleted = db.delete_comment(comment.id, u1).unwrap();
    assert_eq!(deleted.attachment, None);
}

#[test]
fn card_comments_require_the_card_to_exist() {
    let (db, users) = db_with_users(&["mina"]);
    let u1 = users[0];
    let project = db.create_project(u1, "Board", "", None).unwrap();

    assert!(matches!(
        db.add_comment(project.id, Some(Uuid::new_v4()), u1, "lost", None)
            .unwrap_err(),
        StoreError::NotFound(_)
    ));
}

// -- Chat --

#[test]
fn chat_is_member_only_and_replays_oldest_first() {
    let (db, users) = db_with_users(&["mina", "eve"]);
    let u1 = users[0];
    let project = db.create_project(u1, "Board", "", None).unwrap();

    assert!(matches!(
        db.post_chat_message(project.id, users[1], "eve", "hi")
            .unwrap_err(),
        StoreError::Permission(_)
    ));

    for text in ["one", "two", "three"] {
        db.post_chat_message(project.id, u1, "mina", text).unwrap();
    }

    let replay = db.recent_chat_messages(project.id, 2).unwrap();
    let texts: Vec<&str> = replay.iter().map(|m| m.message.as_str()).collect();
    assert_eq!(texts, vec!["two", "three"]);
    assert_eq!(replay[0].nickname, "mina");
}

// -- Notifications --

#[test]
fn invites_persist_a_notification_for_the_invitee() {
    let (db, users) = db_with_users(&["mina", "bob"]);
    let (u1, u2) = (users[0], users[1]);
    let project = db.create_project(u1, "Sprint 1", "", None).unwrap();

    db.invite_member(project.id, u1, "bob").unwrap();

    let pending = db.list_notifications(u2, true).unwrap();
    assert_eq!(pending.len(), 1);
    match &pending[0].body {
        NotificationBody::ProjectInvite {
            project_id,
            project_name,
            inviter_nickname,
            ..
        } => {
            assert_eq!(*project_id, project.id);
            assert_eq!(project_name, "Sprint 1");
            assert_eq!(inviter_nickname, "mina");
        }
    }

    assert_eq!(db.mark_notifications_read(u2).unwrap(), 1);
    assert!(db.list_notifications(u2, true).unwrap().is_empty());
    assert_eq!(db.list_notifications(u2, false).unwrap().len(), 1);
}

// -- Search --

#[test]
fn search_is_scoped_to_the_requesters_projects() {
    let (db, users) = db_with_users(&["mina", "eve"]);
    let (u1, u2) = (users[0], users[1]);
    let project = db.create_project(u1, "Alpha plans", "", None).unwrap();
    db.create_card(project.id, u1, "alpha task", "", CardStatus::Todo)
        .unwrap();

    let mine = db.search(u1, "alpha").unwrap();
    assert_eq!(mine.projects.len(), 1);
    assert_eq!(mine.cards.len(), 1);

    let theirs = db.search(u2, "alpha").unwrap();
    assert!(theirs.projects.is_empty());
    assert!(theirs.cards.is_empty());
}

// -- History nickname resolution --

#[test]
fn history_nicknames_follow_renames() {
    let (db, users) = db_with_users(&["mina"]);
    let u1 = users[0];
    let project = db.create_project(u1, "Board", "", None).unwrap();

    db.upsert_user(u1, "mina-renamed").unwrap();

    let entries = db.project_history(project.id, u1).unwrap();
    assert_eq!(entries[0].user, "mina-renamed");

    // Comments took their snapshot at write time and keep it.
    db.add_comment(project.id, None, u1, "note", None).unwrap();
    db.upsert_user(u1, "mina-again").unwrap();
    let comments = db.list_comments(project.id, u1, None).unwrap();
    assert_eq!(comments[0].author_name, "mina-renamed");
}
