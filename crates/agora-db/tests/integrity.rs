use std::sync::Arc;
use std::thread;

use agora_db::{Database, DbError};
use agora_types::api::{NewChatRoom, NewGroup, NewMessage, NewParticipant};
use rust_decimal::Decimal;

fn count(db: &Database, sql: &str) -> i64 {
    db.with_conn(|conn| Ok(conn.query_row(sql, [], |r| r.get(0))?))
        .unwrap()
}

#[test]
fn book_club_membership_defaults() {
    let db = Database::open_in_memory().unwrap();
    let owner = db.create_user("owner").unwrap();
    let user_a = db.create_user("userA").unwrap();
    let g1 = db.create_group(NewGroup::new("Book Club", owner.id)).unwrap();

    let p = db.add_participant(NewParticipant::new(g1.id, user_a.id)).unwrap();
    assert!(p.is_approved());
    assert!(!p.is_denied());
    assert!(!p.is_admin);
    assert!(!p.muted);
    assert_eq!(g1.subscription_amount, Decimal::ZERO);
}

#[test]
fn duplicate_participant_is_uniqueness_violation() {
    let db = Database::open_in_memory().unwrap();
    let owner = db.create_user("owner").unwrap();
    let user_a = db.create_user("userA").unwrap();
    let g1 = db.create_group(NewGroup::new("Book Club", owner.id)).unwrap();

    db.add_participant(NewParticipant::new(g1.id, user_a.id)).unwrap();
    let err = db
        .add_participant(NewParticipant::new(g1.id, user_a.id))
        .unwrap_err();
    assert!(matches!(err, DbError::UniquenessViolation { entity: "participant", .. }));
    assert_eq!(
        count(&db, "SELECT COUNT(*) FROM (SELECT 1 FROM participants GROUP BY group_id, user_id HAVING COUNT(*) > 1)"),
        0
    );
}

#[test]
fn concurrent_enrolment_admits_exactly_one() {
    let db = Arc::new(Database::open_in_memory().unwrap());
    let owner = db.create_user("owner").unwrap();
    let user = db.create_user("racer").unwrap();
    let group = db.create_group(NewGroup::new("Race", owner.id)).unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let db = Arc::clone(&db);
            thread::spawn(move || db.join_group(group.id, user.id))
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|e| matches!(e, DbError::UniquenessViolation { .. })));
}

#[test]
fn deleting_group_cascades_to_rooms_messages_and_participants() {
    let db = Database::open_in_memory().unwrap();
    let owner = db.create_user("owner").unwrap();
    let member = db.create_user("member").unwrap();
    let g1 = db.create_group(NewGroup::new("Book Club", owner.id)).unwrap();
    db.join_group(g1.id, member.id).unwrap();

    let r1 = db.create_chat_room(NewChatRoom::for_group("R1", g1.id)).unwrap();
    let msg = db.send_message(NewMessage::text(r1.id, member.id, "hi")).unwrap();
    db.mark_read(msg.id, owner.id).unwrap();
    let dm = db.create_chat_room(NewChatRoom::direct("dm")).unwrap();
    let kept = db.send_message(NewMessage::text(dm.id, member.id, "still here")).unwrap();

    db.delete_group(g1.id).unwrap();

    assert!(db.get_group(g1.id).unwrap().is_none());
    assert!(db.get_chat_room(r1.id).unwrap().is_none());
    assert!(db.get_message(msg.id).unwrap().is_none());
    assert!(db.participants_for_group(g1.id).unwrap().is_empty());
    assert_eq!(count(&db, "SELECT COUNT(*) FROM message_reads"), 0);

    // unrelated rows and both users survive
    assert!(db.get_message(kept.id).unwrap().is_some());
    assert!(db.get_user(owner.id).unwrap().is_some());
    assert!(db.get_user(member.id).unwrap().is_some());

    // every remaining room points at nothing or at a live group
    assert_eq!(
        count(
            &db,
            "SELECT COUNT(*) FROM chat_rooms r
             WHERE r.associated_group_id IS NOT NULL
               AND NOT EXISTS (SELECT 1 FROM chat_groups g WHERE g.id = r.associated_group_id)"
        ),
        0
    );
}

#[test]
fn deleting_user_cascades_to_groups_memberships_and_messages() {
    let db = Database::open_in_memory().unwrap();
    let alice = db.create_user("alice").unwrap();
    let bob = db.create_user("bob").unwrap();

    let alices = db.create_group(NewGroup::new("Alice's", alice.id)).unwrap();
    let bobs = db.create_group(NewGroup::new("Bob's", bob.id)).unwrap();
    db.join_group(bobs.id, alice.id).unwrap();

    let room = db.create_chat_room(NewChatRoom::for_group("general", bobs.id)).unwrap();
    let from_alice = db.send_message(NewMessage::text(room.id, alice.id, "a")).unwrap();
    let from_bob = db.send_message(NewMessage::text(room.id, bob.id, "b")).unwrap();
    db.mark_read(from_bob.id, alice.id).unwrap();

    db.delete_user(alice.id).unwrap();

    assert!(db.get_group(alices.id).unwrap().is_none());
    assert!(db.get_participant(bobs.id, alice.id).unwrap().is_none());
    assert!(db.get_message(from_alice.id).unwrap().is_none());
    assert!(db.read_receipts(from_bob.id).unwrap().is_empty());

    assert!(db.get_group(bobs.id).unwrap().is_some());
    assert!(db.get_message(from_bob.id).unwrap().is_some());
    assert_eq!(db.participants_for_group(bobs.id).unwrap().len(), 1);
}

#[test]
fn deleting_room_removes_only_its_messages() {
    let db = Database::open_in_memory().unwrap();
    let user = db.create_user("user").unwrap();
    let a = db.create_chat_room(NewChatRoom::direct("a")).unwrap();
    let b = db.create_chat_room(NewChatRoom::direct("b")).unwrap();
    db.send_message(NewMessage::text(a.id, user.id, "in a")).unwrap();
    db.send_message(NewMessage::text(b.id, user.id, "in b")).unwrap();

    db.delete_chat_room(a.id).unwrap();
    assert!(db.messages_for_room(a.id, None).unwrap().is_empty());
    assert_eq!(db.messages_for_room(b.id, None).unwrap().len(), 1);
}

#[test]
fn evolution_keeps_existing_rows() {
    let db = Database::connect_in_memory().unwrap();
    assert_eq!(db.migrate_to("0001_initial").unwrap(), 1);

    let owner = db.create_user("owner").unwrap();
    let group = db.create_group(NewGroup::new("Before", owner.id)).unwrap();
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO chat_rooms (id, name, created_at, updated_at, is_group)
             VALUES ('00000000-0000-0000-0000-0000000000aa', 'legacy', '2024-01-01 00:00:00.000', '2024-01-01 00:00:00.000', 1)",
            [],
        )?;
        conn.execute(
            "INSERT INTO messages (id, chat_room_id, sender_id, content)
             VALUES ('00000000-0000-0000-0000-0000000000bb', '00000000-0000-0000-0000-0000000000aa', ?1, 'old')",
            [owner.id.to_string()],
        )?;
        Ok(())
    })
    .unwrap();

    assert!(db.apply_migration("0002_add_associated_group_id").unwrap());
    assert!(db.pending_migrations().unwrap().is_empty());

    let legacy_id = "00000000-0000-0000-0000-0000000000aa".parse().unwrap();
    let legacy = db.get_chat_room(legacy_id).unwrap().unwrap();
    assert_eq!(legacy.name, "legacy");
    assert!(legacy.is_group);
    assert!(legacy.associated_group_id.is_none());

    let history = db.messages_for_room(legacy_id, None).unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].content, "old");
    assert_eq!(db.get_group(group.id).unwrap().unwrap().name, "Before");

    // the new column is live
    let linked = db.set_associated_group(legacy_id, Some(group.id)).unwrap();
    assert_eq!(linked.associated_group_id, Some(group.id));
}

#[test]
fn evolution_before_baseline_fails() {
    let db = Database::connect_in_memory().unwrap();
    let err = db.apply_migration("0002_add_associated_group_id").unwrap_err();
    assert!(matches!(err, DbError::DependencyOrder { requires: "0001_initial", .. }));
    assert!(db.applied_migrations().unwrap().is_empty());

    assert!(db.apply_migration("0001_initial").unwrap());
    assert!(db.apply_migration("0002_add_associated_group_id").unwrap());
    assert!(!db.apply_migration("0002_add_associated_group_id").unwrap());
}

#[test]
fn creation_stamps_cannot_be_rewritten() {
    let db = Database::open_in_memory().unwrap();
    let owner = db.create_user("owner").unwrap();
    let group = db.create_group(NewGroup::new("Stamped", owner.id)).unwrap();

    let result = db.with_conn(|conn| {
        Ok(conn.execute(
            "UPDATE chat_groups SET created_at = '2000-01-01 00:00:00' WHERE id = ?1",
            [group.id.to_string()],
        )?)
    });
    assert!(result.is_err());
    assert_eq!(
        db.get_group(group.id).unwrap().unwrap().created_at,
        group.created_at
    );
}

#[test]
fn file_database_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("chat.db");

    let group_id = {
        let db = Database::open(&path).unwrap();
        let owner = db.create_user("owner").unwrap();
        db.create_group(NewGroup::new("Persistent", owner.id)).unwrap().id
    };

    let db = Database::open(&path).unwrap();
    let details = db.group_details(group_id).unwrap();
    assert_eq!(details.group.name, "Persistent");
    assert_eq!(details.participants.len(), 1);
}
