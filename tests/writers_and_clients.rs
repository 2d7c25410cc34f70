use celldb::security::Authorizations;
use celldb::{CelldbConfig, CelldbInstance, Mutation, ScanRange, TimeMode};

fn open_with_buffer(writer_buffer_mutations: usize) -> CelldbInstance {
    let config = CelldbConfig {
        writer_buffer_mutations,
        default_time_mode: TimeMode::Logical,
        ..CelldbConfig::default()
    };
    CelldbInstance::open(config).expect("open")
}

fn put(row: &str, value: &str) -> Mutation {
    let mut m = Mutation::new(row);
    m.put("cf", "q", "", value);
    m
}

fn count(db: &CelldbInstance, table: &str) -> usize {
    let client = db.client("reader");
    let scanner = client
        .create_scanner_with_auths(table, Authorizations::empty())
        .expect("scanner");
    scanner.iter().filter(|item| item.is_ok()).count()
}

#[test]
fn writer_buffers_until_flush() {
    let db = open_with_buffer(100);
    let client = db.client("writer");
    client.table_ops().create("t").expect("create");

    let mut writer = client.create_batch_writer("t").expect("writer");
    writer.add_mutation(put("a", "1")).expect("add");
    writer.add_mutation(put("b", "2")).expect("add");
    assert_eq!(count(&db, "t"), 0);
    writer.flush().expect("flush");
    assert_eq!(count(&db, "t"), 2);
    writer.close().expect("close");
}

#[test]
fn writer_flushes_implicitly_at_the_buffer_limit() {
    let db = open_with_buffer(2);
    let client = db.client("writer");
    client.table_ops().create("t").expect("create");

    let mut writer = client.create_batch_writer("t").expect("writer");
    writer.add_mutation(put("a", "1")).expect("add");
    assert_eq!(count(&db, "t"), 0);
    writer.add_mutation(put("b", "2")).expect("add");
    assert_eq!(count(&db, "t"), 2);
    writer.close().expect("close");
}

#[test]
fn close_is_idempotent_and_later_writes_fail() {
    let db = open_with_buffer(100);
    let client = db.client("writer");
    client.table_ops().create("t").expect("create");

    let mut writer = client.create_batch_writer("t").expect("writer");
    writer.add_mutation(put("a", "1")).expect("add");
    writer.close().expect("close");
    writer.close().expect("second close");
    assert_eq!(
        writer.add_mutation(put("b", "2")).unwrap_err().code_str(),
        "writer_closed"
    );
    assert_eq!(writer.flush().unwrap_err().code_str(), "writer_closed");
    assert_eq!(count(&db, "t"), 1);
}

#[test]
fn dropping_an_open_writer_flushes_its_buffer() {
    let db = open_with_buffer(100);
    let client = db.client("writer");
    client.table_ops().create("t").expect("create");

    {
        let mut writer = client.create_batch_writer("t").expect("writer");
        writer.add_mutation(put("a", "1")).expect("add");
    }
    assert_eq!(count(&db, "t"), 1);
}

#[test]
fn multi_table_writer_shares_one_lifecycle() {
    let db = open_with_buffer(100);
    let client = db.client("writer");
    client.table_ops().create("t1").expect("create");
    client.table_ops().create("t2").expect("create");

    let mut multi = client.create_multi_table_batch_writer();
    multi
        .writer("t1")
        .expect("t1 writer")
        .add_mutation(put("a", "1"))
        .expect("add");
    multi
        .writer("t2")
        .expect("t2 writer")
        .add_mutation(put("b", "2"))
        .expect("add");
    assert_eq!(
        multi.writer("missing").unwrap_err().code_str(),
        "table_not_found"
    );
    multi.flush().expect("flush");
    assert_eq!(count(&db, "t1"), 1);
    assert_eq!(count(&db, "t2"), 1);
    multi.close().expect("close");
    assert_eq!(multi.writer("t1").unwrap_err().code_str(), "writer_closed");
}

#[test]
fn batch_scanner_concatenates_ranges_in_order() {
    let db = open_with_buffer(100);
    let client = db.client("writer");
    client.table_ops().create("t").expect("create");
    let mut writer = client.create_batch_writer("t").expect("writer");
    for row in ["a", "b", "c", "d", "e"] {
        writer.add_mutation(put(row, row)).expect("add");
    }
    writer.close().expect("close");

    let scanner = client
        .create_batch_scanner(
            "t",
            vec![ScanRange::rows(Some(b"d"), None), ScanRange::row("a")],
        )
        .expect("batch scanner");
    let seen: Vec<Vec<u8>> = scanner
        .iter()
        .map(|cell| cell.expect("scan").key.row)
        .collect();
    assert_eq!(seen, vec![b"d".to_vec(), b"e".to_vec(), b"a".to_vec()]);
}

#[test]
fn batch_deleter_skips_cells_it_cannot_see() {
    let db = open_with_buffer(100);
    let client = db.client("writer");
    client.table_ops().create("t").expect("create");

    let mut writer = client.create_batch_writer("t").expect("writer");
    let mut open = Mutation::new("row");
    open.put("cf", "open", "", "v");
    open.put("cf", "secret", "S", "v");
    writer.add_mutation(open).expect("add");
    writer.close().expect("close");

    // The deleting principal has no authorizations, so only the unlabeled
    // cell is deleted.
    let mut deleter = client
        .create_batch_deleter("t", vec![ScanRange::all()])
        .expect("deleter");
    deleter.delete().expect("delete");

    let scanner = client
        .create_scanner_with_auths("t", Authorizations::from(["S"]))
        .expect("scanner");
    let survivors: Vec<Vec<u8>> = scanner
        .iter()
        .map(|cell| cell.expect("scan").key.qualifier)
        .collect();
    assert_eq!(survivors, vec![b"secret".to_vec()]);
}

#[test]
fn clients_create_their_user_on_first_contact() {
    let db = open_with_buffer(100);
    let client = db.client("fresh-principal");
    assert_eq!(client.whoami(), "fresh-principal");
    let users = client.security_ops().list_users();
    assert!(users.contains(&"fresh-principal".to_string()));
    assert!(users.contains(&celldb::ROOT_USER.to_string()));
}

#[test]
fn security_ops_manage_users_tokens_and_grants() {
    use celldb::security::{SystemPermission, TablePermission};

    let db = open_with_buffer(100);
    let sec = db.client("admin").security_ops();
    sec.create_user("carol", b"hunter2".to_vec()).expect("create");
    assert_eq!(
        sec.create_user("carol", b"x".to_vec()).unwrap_err().code_str(),
        "user_already_exists"
    );
    assert!(sec.authenticate_user("carol", b"hunter2").expect("auth"));
    assert!(!sec.authenticate_user("carol", b"wrong").expect("auth"));
    sec.change_user_token("carol", b"rotated".to_vec()).expect("token");
    assert!(sec.authenticate_user("carol", b"rotated").expect("auth"));

    sec.grant_system_permission("carol", SystemPermission::CreateTable)
        .expect("grant");
    assert!(sec
        .has_system_permission("carol", SystemPermission::CreateTable)
        .expect("check"));
    sec.revoke_system_permission("carol", SystemPermission::CreateTable)
        .expect("revoke");
    assert!(!sec
        .has_system_permission("carol", SystemPermission::CreateTable)
        .expect("check"));

    sec.grant_table_permission("carol", "t", TablePermission::Read)
        .expect("grant");
    assert!(sec
        .has_table_permission("carol", "t", TablePermission::Read)
        .expect("check"));

    sec.drop_user("carol").expect("drop");
    assert_eq!(
        sec.get_user_authorizations("carol").unwrap_err().code_str(),
        "user_not_found"
    );
}
