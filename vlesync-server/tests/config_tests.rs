use pretty_assertions::assert_eq;
use std::io::Write;
use std::path::PathBuf;
use vlesync_server::ServiceConfig;
use vlesync_sync::{BasicCredentials, DirectoryConfig};

#[test]
fn defaults_without_file() {
    let config = ServiceConfig::load(None).unwrap();
    assert_eq!(config, ServiceConfig::default());
    assert_eq!(config.database, PathBuf::from("vlesync.db"));
    assert_eq!(config.site_course_id, 1);
    assert!(config.inbound_auth.is_none());
    assert!(!config.gateway.is_complete());
}

#[test]
fn empty_object_is_valid() {
    let config = ServiceConfig::from_json("{}").unwrap();
    assert_eq!(config, ServiceConfig::default());
}

#[test]
fn parses_full_configuration() {
    let config = ServiceConfig::from_json(
        r#"{
            "database": "/var/lib/vlesync/directory.db",
            "site_course_id": 7,
            "student_role": "learner",
            "tutor_role": "teacher",
            "gateway": {
                "base_url": "https://vle.example.com",
                "paths": { "create_course": "/api/courses" },
                "basic_auth": { "username": "lms", "password": "pw" },
                "timeout_ms": 2500
            },
            "inbound_auth": { "username": "vle", "password": "s3cret" }
        }"#,
    )
    .unwrap();

    assert_eq!(config.database, PathBuf::from("/var/lib/vlesync/directory.db"));
    assert!(config.gateway.is_complete());
    assert_eq!(config.gateway.timeout().as_millis(), 2500);
    assert_eq!(config.inbound_auth, Some(BasicCredentials::new("vle", "s3cret")));
    assert_eq!(
        config.directory(),
        DirectoryConfig {
            site_course_id: 7,
            student_role: "learner".into(),
            tutor_role: "teacher".into(),
        }
    );
}

#[test]
fn loads_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, r#"{{"tutor_role": "editingteacher"}}"#).unwrap();

    let config = ServiceConfig::load(Some(file.path())).unwrap();
    assert_eq!(config.tutor_role, "editingteacher");
    assert_eq!(config.student_role, "student");
}

#[test]
fn missing_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("absent.json");
    let err = ServiceConfig::load(Some(missing.as_path())).unwrap_err();
    assert!(err.to_string().contains("Failed to read config"));
}

#[test]
fn malformed_json_is_an_error() {
    assert!(ServiceConfig::from_json("{ not json").is_err());
}
