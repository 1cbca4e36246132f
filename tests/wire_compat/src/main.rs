fn main() {
    println!("Run `cargo test -p wire-compat` to execute wire compatibility tests.");
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use fileshelf_client::{Identity, ProgressEvent};
    use fileshelf_protocol::{
        AuthStatusResponse, DownloadMetadata, EventName, GetUploadsResponse, UploadAck, UploadInit,
    };

    /// Returns the path to the fixtures directory.
    fn fixtures_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures")
    }

    /// Loads a fixture JSON file and returns it as a `serde_json::Value`.
    fn load_fixture(name: &str) -> serde_json::Value {
        let path = fixtures_dir().join(name);
        let data = fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("failed to read fixture {}: {e}", path.display()));
        serde_json::from_str(&data)
            .unwrap_or_else(|e| panic!("failed to parse fixture {}: {e}", path.display()))
    }

    /// Normalizes numbers so that `100` and `100.0` compare equal.
    ///
    /// The server writes whole percentages without a fraction; `f64`
    /// fields serialize back with one.
    fn normalize_value(v: &serde_json::Value) -> serde_json::Value {
        match v {
            serde_json::Value::Number(n) => match n.as_f64() {
                Some(f) => serde_json::json!(f),
                None => v.clone(),
            },
            serde_json::Value::Object(map) => serde_json::Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), normalize_value(v)))
                    .collect(),
            ),
            serde_json::Value::Array(arr) => {
                serde_json::Value::Array(arr.iter().map(normalize_value).collect())
            }
            _ => v.clone(),
        }
    }

    /// Deserializes a fixture, re-serializes it and compares the JSON
    /// values (order-independent, number-normalized).
    fn roundtrip_test<T>(name: &str) -> T
    where
        T: serde::de::DeserializeOwned + serde::Serialize,
    {
        let fixture = load_fixture(name);
        let parsed: T = serde_json::from_value(fixture.clone())
            .unwrap_or_else(|e| panic!("failed to deserialize {name}: {e}"));
        let reserialized = serde_json::to_value(&parsed)
            .unwrap_or_else(|e| panic!("failed to re-serialize {name}: {e}"));

        assert_eq!(
            normalize_value(&fixture),
            normalize_value(&reserialized),
            "roundtrip mismatch for {name}:\n  server: {fixture}\n  client: {reserialized}"
        );
        parsed
    }

    // --- WebSocket transfer messages ---

    #[test]
    fn fixture_upload_init() {
        let init = roundtrip_test::<UploadInit>("upload_init.json");
        assert_eq!(init.total_chunks, 3);
        assert_eq!(init.user_id, 7);
    }

    #[test]
    fn fixture_upload_ack() {
        let ack = roundtrip_test::<UploadAck>("upload_ack.json");
        assert!((ack.upload_percentage - 33.33).abs() < 1e-9);
    }

    #[test]
    fn fixture_upload_ack_whole_percentage() {
        let ack = roundtrip_test::<UploadAck>("upload_ack_final.json");
        assert_eq!(ack.upload_percentage, 100.0);
    }

    #[test]
    fn fixture_download_metadata() {
        let meta = roundtrip_test::<DownloadMetadata>("download_metadata.json");
        assert_eq!(meta.file_name, "report.pdf");
    }

    // --- REST payloads ---

    #[test]
    fn fixture_get_uploads_response() {
        let resp = roundtrip_test::<GetUploadsResponse>("get_uploads_response.json");
        assert_eq!(resp.count, 2);
        assert_eq!(resp.files[1].id, 42);
        assert_eq!(resp.files[1].owner_username, "ana");
    }

    #[test]
    fn fixture_auth_status_response() {
        let resp = roundtrip_test::<AuthStatusResponse>("auth_status_response.json");
        assert!(resp.is_authenticated);
    }

    // --- Client-side persisted and published shapes ---

    #[test]
    fn fixture_credentials() {
        let identity = roundtrip_test::<Identity>("credentials.json");
        assert_eq!(identity.user_id, 7);
    }

    #[test]
    fn fixture_progress_event() {
        let event = roundtrip_test::<ProgressEvent>("progress_event.json");
        let payload = event.to_payload();
        assert_eq!(
            serde_json::Value::Object(payload),
            load_fixture("progress_event.json")
        );
    }

    #[test]
    fn event_names() {
        for (name, wire) in [
            (EventName::UserLogin, "user-login"),
            (EventName::UserLogout, "user-logout"),
            (EventName::UploadProgress, "upload-progress"),
        ] {
            assert_eq!(serde_json::to_value(name).unwrap(), wire);
            assert_eq!(name.as_str(), wire);
        }
    }

    #[test]
    fn every_fixture_is_covered() {
        let covered = [
            "auth_status_response.json",
            "credentials.json",
            "download_metadata.json",
            "get_uploads_response.json",
            "progress_event.json",
            "upload_ack.json",
            "upload_ack_final.json",
            "upload_init.json",
        ];
        let mut found: Vec<String> = fs::read_dir(fixtures_dir())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|n| n.ends_with(".json"))
            .collect();
        found.sort();
        assert_eq!(found, covered);
    }
}
