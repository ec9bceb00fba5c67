mod common;

use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use seriesguard::config::{EmailConfig, SeriesGroup};
use seriesguard::io::{
    read_table, write_table, ArtifactSink, CsvArtifactSink, CsvFileSource, DataSource,
    HttpSource, LocatorSource, LoggingNotifier, Notifier,
};
use seriesguard::{AnomalyVerdict, ArtifactTable, Error};

#[test]
fn test_csv_source_reads_file_locator() {
    let dir = common::TempTestDir::new("io_source").unwrap();
    let path = dir.write_file("energy.csv", "Day,Home\n2016-01-01,3\n2016-01-02,4\n");

    let source = CsvFileSource::new();
    let locator = format!("file://{}", path.display());
    let table = source.fetch(&SeriesGroup::new("energy", locator)).unwrap();

    assert_eq!(table.headers, vec!["Day", "Home"]);
    assert_eq!(table.rows, vec![vec!["2016-01-01", "3"], vec!["2016-01-02", "4"]]);
}

#[test]
fn test_missing_file_is_a_fetch_error() {
    let dir = common::TempTestDir::new("io_missing").unwrap();
    let source = CsvFileSource::with_base_dir(dir.path());
    match source.fetch(&SeriesGroup::new("energy", "energy.csv")) {
        Err(Error::Fetch { group, .. }) => assert_eq!(group, "energy"),
        other => panic!("expected a fetch error, got {:?}", other),
    }
}

#[test]
fn test_table_with_quoted_cells() {
    let dir = common::TempTestDir::new("io_quoted").unwrap();
    let table = ArtifactTable {
        headers: vec!["Day".to_string(), "Note".to_string()],
        rows: vec![vec!["2016-01-01".to_string(), "late, again".to_string()]],
    };
    let path = dir.path().join("notes.csv");
    write_table(&table, &path).unwrap();

    let read = read_table(File::open(&path).unwrap()).unwrap();
    assert_eq!(read.headers, table.headers);
    assert_eq!(read.rows, table.rows);
}

#[test]
fn test_sink_creates_output_directory() {
    let dir = common::TempTestDir::new("io_sink").unwrap();
    let sink = CsvArtifactSink::new(dir.path().join("nested").join("out"));
    let table = ArtifactTable {
        headers: vec!["Day".to_string(), "Home".to_string()],
        rows: vec![vec!["2016-01-01".to_string(), "1".to_string()]],
    };

    sink.write_tables("energy", &table, &table).unwrap();
    sink.write_verdicts(&[]).unwrap();

    assert!(sink.output_dir().join("energy-forecast.csv").exists());
    assert!(sink.output_dir().join("energy-error.csv").exists());
    assert!(sink.output_dir().join("verdicts.json").exists());
}

#[test]
fn test_logging_notifier_accepts_any_batch() {
    let email = EmailConfig {
        host: "smtp.example.com".to_string(),
        recipients: vec!["ops@example.com".to_string()],
        subject: "Daily anomalies".to_string(),
        ..EmailConfig::default()
    };
    let notifier = LoggingNotifier::from_email(&email);
    let verdicts = vec![AnomalyVerdict {
        day: "2016-01-10".to_string(),
        group: "energy".to_string(),
        columns: vec!["Home".to_string()],
    }];

    assert!(notifier.notify(&verdicts).is_ok());
    assert!(notifier.notify(&[]).is_ok());
}

fn local_http() -> HttpSource {
    HttpSource::direct(Duration::from_secs(5)).unwrap()
}

/// Answers a single HTTP request on a loopback port and returns its base URL
fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        // リクエストヘッダーを読み飛ばす
        let mut reader = BufReader::new(stream.try_clone().unwrap());
        let mut line = String::new();
        while reader.read_line(&mut line).unwrap() > 0 && line != "\r\n" {
            line.clear();
        }
        write!(
            stream,
            "HTTP/1.1 {}\r\nContent-Type: text/csv\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        )
        .unwrap();
        stream.flush().unwrap();
    });
    (url, handle)
}

#[test]
fn test_http_source_downloads_csv() {
    let (url, server) = serve_once("200 OK", "Day,Home\n2016-01-01,3\n2016-01-02,4\n");
    let source = local_http();
    let table = source
        .fetch(&SeriesGroup::new("energy", format!("{}/energy.csv", url)))
        .unwrap();
    server.join().unwrap();

    assert_eq!(table.headers, vec!["Day", "Home"]);
    assert_eq!(table.rows.len(), 2);
}

#[test]
fn test_http_status_failure_is_a_fetch_error() {
    let (url, server) = serve_once("404 Not Found", "");
    let source = local_http();
    let result = source.fetch(&SeriesGroup::new("energy", format!("{}/energy.csv", url)));
    server.join().unwrap();

    match result {
        Err(Error::Fetch { group, reason }) => {
            assert_eq!(group, "energy");
            assert!(reason.contains("404"), "{}", reason);
        }
        other => panic!("expected a fetch error, got {:?}", other),
    }
}

#[test]
fn test_unreachable_host_is_a_fetch_error() {
    // 空きポートを確保してから閉じる
    let port = TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap().port();
    let source = local_http();
    let group = SeriesGroup::new("energy", format!("http://127.0.0.1:{}/energy.csv", port));
    assert!(matches!(source.fetch(&group), Err(Error::Fetch { .. })));
}

#[test]
fn test_locator_source_routes_by_scheme() {
    let dir = common::TempTestDir::new("io_routing").unwrap();
    dir.write_file("rooms.csv", "Day,Kitchen\n2016-01-01,21\n");
    let (url, server) = serve_once("200 OK", "Day,Home\n2016-01-01,3\n");

    let source = LocatorSource::new(
        CsvFileSource::with_base_dir(dir.path()),
        local_http(),
    );
    let local = source.fetch(&SeriesGroup::new("rooms", "rooms.csv")).unwrap();
    let remote = source
        .fetch(&SeriesGroup::new("energy", format!("{}/energy.csv", url)))
        .unwrap();
    server.join().unwrap();

    assert_eq!(local.headers, vec!["Day", "Kitchen"]);
    assert_eq!(remote.headers, vec!["Day", "Home"]);
}
