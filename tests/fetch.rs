mod common;

use std::net::TcpListener;

use common::{stub_server, Route};
use jsphere_data::data::fetch::{ensure_all, ensure_local, CsvFile, FetchError};

#[test]
fn downloads_exact_bytes_into_new_directories() {
    let body: Vec<u8> = (0..=255u8).cycle().take(4096).collect();
    let base = stub_server(vec![Route::ok("/api_calls.csv.gz", body.clone())], 1);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested/data/api_calls.csv.gz");

    let fetched = ensure_local(&path, &format!("{base}/api_calls.csv.gz")).unwrap();
    assert!(fetched);
    assert_eq!(std::fs::read(&path).unwrap(), body);
    assert!(!path.with_file_name("api_calls.csv.gz.part").exists());

    // Second call is a no-op; the server would refuse a second request.
    assert!(!ensure_local(&path, &format!("{base}/api_calls.csv.gz")).unwrap());
}

#[test]
fn http_errors_leave_nothing_behind() {
    let base = stub_server(vec![], 1);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("gone.csv");

    let err = ensure_local(&path, &format!("{base}/gone.csv")).unwrap_err();
    assert!(matches!(err, FetchError::Http { status: 404, .. }), "{err}");
    assert!(!path.exists());
}

#[test]
fn truncated_body_removes_partial_file() {
    let base = stub_server(vec![Route::truncated("/big.csv", "size\n1\n", 4096)], 1);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("big.csv");

    let err = ensure_local(&path, &format!("{base}/big.csv")).unwrap_err();
    assert!(matches!(err, FetchError::Transport { .. }), "{err}");
    assert!(!path.exists());
    assert!(!dir.path().join("big.csv.part").exists());
}

#[test]
fn refused_connections_are_transport_errors() {
    // Bind then drop to get a port nobody listens on.
    let port = TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap().port();
    let dir = tempfile::tempdir().unwrap();

    let err = ensure_local(&dir.path().join("x.csv"), &format!("http://127.0.0.1:{port}/x.csv"))
        .unwrap_err();
    assert!(matches!(err, FetchError::Transport { .. }), "{err}");
}

#[test]
fn batch_fetches_only_missing_files() {
    let base = stub_server(
        vec![Route::ok("/a.csv", "a,b\n1,2\n"), Route::ok("/b.csv", "c\n3\n")],
        2,
    );
    let dir = tempfile::tempdir().unwrap();
    let cached = dir.path().join("cached.csv");
    std::fs::write(&cached, "already here").unwrap();

    let files = vec![
        CsvFile::new(dir.path().join("a.csv"), format!("{base}/a.csv")),
        CsvFile::new(dir.path().join("sub/b.csv"), format!("{base}/b.csv")),
        CsvFile::new(cached.clone(), format!("{base}/never-requested.csv")),
    ];
    assert_eq!(ensure_all(&files, Some(3)).unwrap(), 2);
    assert_eq!(std::fs::read_to_string(dir.path().join("sub/b.csv")).unwrap(), "c\n3\n");
    assert_eq!(std::fs::read_to_string(&cached).unwrap(), "already here");
}

#[test]
fn batch_surfaces_a_failure() {
    let base = stub_server(vec![Route::ok("/ok.csv", "x\n1\n")], 2);
    let dir = tempfile::tempdir().unwrap();
    let files = vec![
        CsvFile::new(dir.path().join("ok.csv"), format!("{base}/ok.csv")),
        CsvFile::new(dir.path().join("bad.csv"), format!("{base}/bad.csv")),
    ];
    let err = ensure_all(&files, None).unwrap_err();
    assert!(matches!(err, FetchError::Http { status: 404, .. }));
}
