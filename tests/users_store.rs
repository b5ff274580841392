// tests/users_store.rs
use std::sync::Arc;

use topic_pulse::users::UserDirectory;

#[test]
fn concurrent_duplicate_registrations_leave_one_row() {
    let dir = tempfile::tempdir().unwrap();
    let users = Arc::new(UserDirectory::open(dir.path().join("users.csv")).unwrap());

    let handles: Vec<_> = (0..16)
        .map(|i| {
            let users = users.clone();
            std::thread::spawn(move || {
                users
                    .create(&format!("user-{i}"), "same@example.com", "password1")
                    .unwrap()
                    .is_some()
            })
        })
        .collect();
    let created = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|ok| *ok)
        .count();

    assert_eq!(created, 1);
    let text = std::fs::read_to_string(users.path()).unwrap();
    assert_eq!(text.lines().filter(|l| l.contains("same@example.com")).count(), 1);
}

#[test]
fn existing_file_is_reused() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("users.csv");

    UserDirectory::open(&path)
        .unwrap()
        .create("Grace", "grace@example.com", "cobol!!")
        .unwrap();

    let reopened = UserDirectory::open(&path).unwrap();
    assert!(reopened.exists("grace@example.com").unwrap());
    let profile = reopened
        .authenticate("grace@example.com", "cobol!!")
        .unwrap()
        .expect("credentials match");
    assert_eq!(profile.name, "Grace");
}
