use courier_sim::auth::{PasswordAuthenticator, UserDirectory};
use courier_sim::config::AppConfig;
use courier_sim::lifecycle::DeliverySystem;
use courier_sim::model::{Delivery, DeliveryState, UserCreate};
use courier_sim::persistence::{self, DataFiles};
use courier_sim::settings::AppSettings;
use serde_json::json;
use uuid::Uuid;

fn sample_deliveries() -> Vec<Delivery> {
    let sender = Uuid::new_v4();
    let plain = Delivery::standard(sender, "Via Farini 12, Modena", 3.5).unwrap();
    let mut insured = Delivery::insured(sender, "Largo Garibaldi 2, Modena", 0.8, 1200).unwrap();
    insured.set_state(DeliveryState::Failed).unwrap();
    insured.set_state(DeliveryState::RefundRequired).unwrap();
    vec![plain, insured]
}

#[test]
fn test_deliveries_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("deliveries.json");
    let deliveries = sample_deliveries();

    persistence::save_deliveries(&path, &deliveries).unwrap();
    let store = persistence::load_deliveries(&path);

    assert_eq!(store.len(), 2);
    for original in &deliveries {
        let loaded = store.get(original.code()).expect("delivery was saved");
        assert_eq!(loaded.sender(), original.sender());
        assert_eq!(loaded.date(), original.date());
        assert_eq!(loaded.destination(), original.destination());
        assert_eq!(loaded.weight(), original.weight());
        assert_eq!(loaded.kind(), original.kind());
        assert_eq!(loaded.state(), original.state());
    }
    // Insertion order survives.
    let codes: Vec<_> = store.iter().map(Delivery::code).collect();
    assert_eq!(codes, deliveries.iter().map(Delivery::code).collect::<Vec<_>>());
}

#[test]
fn test_delivery_file_format() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("deliveries.json");
    let deliveries = sample_deliveries();
    persistence::save_deliveries(&path, &deliveries).unwrap();

    let root: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(root["version"], json!(1));
    assert_eq!(root["deliveries"][0]["type"], json!("standard"));
    assert_eq!(root["deliveries"][0]["state"], json!("IN_PREPARATION"));
    assert_eq!(root["deliveries"][1]["type"], json!("insured"));
    assert_eq!(root["deliveries"][1]["insuredValue"], json!(1200));
    assert_eq!(root["deliveries"][1]["state"], json!("REFUND_REQUIRED"));
}

#[test]
fn test_version_mismatch_gives_empty_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("deliveries.json");
    persistence::save_deliveries(&path, &sample_deliveries()).unwrap();

    let mut root: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    root["version"] = json!(2);
    std::fs::write(&path, root.to_string()).unwrap();

    assert!(persistence::load_deliveries(&path).is_empty());
}

#[test]
fn test_corrupt_json_gives_empty_data() {
    let dir = tempfile::tempdir().unwrap();
    let files = DataFiles::in_dir(dir.path());
    std::fs::write(&files.deliveries, "{\"version\": 1, \"deliveries\": [").unwrap();
    std::fs::write(&files.users, "users?").unwrap();

    assert!(persistence::load_deliveries(&files.deliveries).is_empty());
    assert!(persistence::load_users(&files.users).is_empty());
}

/// A bad record costs only itself.
#[test]
fn test_invalid_records_are_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("deliveries.json");
    let good = Delivery::standard(Uuid::new_v4(), "Via del Taglio 9", 1.0).unwrap();
    let good_record = serde_json::to_value(&good).unwrap();

    let mut negative_weight = good_record.clone();
    negative_weight["code"] = json!(Uuid::new_v4());
    negative_weight["weight"] = json!(-2.0);

    let mut refund_on_standard = good_record.clone();
    refund_on_standard["code"] = json!(Uuid::new_v4());
    refund_on_standard["state"] = json!("REFUND_PAID");

    let root = json!({
        "version": 1,
        "deliveries": [
            good_record.clone(),
            negative_weight,
            { "type": "parcel", "code": Uuid::new_v4() },
            refund_on_standard,
            good_record,
        ]
    });
    std::fs::write(&path, root.to_string()).unwrap();

    let store = persistence::load_deliveries(&path);
    assert_eq!(store.len(), 1);
    assert!(store.get(good.code()).is_some());
}

/// Every weight a delivery accepts must survive a save and load.
#[test]
fn test_accepted_weights_survive_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("deliveries.json");
    let sender = Uuid::new_v4();

    assert!(Delivery::standard(sender, "Via Canaletto 3", f64::INFINITY).is_err());
    let deliveries = vec![
        Delivery::standard(sender, "Via Canaletto 3", 12_345.5).unwrap(),
        Delivery::insured(sender, "Via Canaletto 3", 0.0, 5).unwrap(),
    ];

    persistence::save_deliveries(&path, &deliveries).unwrap();
    let store = persistence::load_deliveries(&path);

    assert_eq!(store.len(), deliveries.len());
    for original in &deliveries {
        assert_eq!(store.get(original.code()).unwrap().weight(), original.weight());
    }
}

/// A record whose weight was written as `null` is skipped, not zeroed.
#[test]
fn test_null_weight_record_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("deliveries.json");
    let good = Delivery::standard(Uuid::new_v4(), "Via Canaletto 3", 2.0).unwrap();
    let mut null_weight = serde_json::to_value(&good).unwrap();
    null_weight["code"] = json!(Uuid::new_v4());
    null_weight["weight"] = serde_json::Value::Null;

    let root = json!({ "version": 1, "deliveries": [null_weight, good.clone()] });
    std::fs::write(&path, root.to_string()).unwrap();

    let store = persistence::load_deliveries(&path);
    assert_eq!(store.len(), 1);
    assert!(store.get(good.code()).is_some());
}

#[test]
fn test_users_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("users.json");
    let auth = PasswordAuthenticator::new();
    let mut users = UserDirectory::new();
    let alice = users
        .register(
            UserCreate {
                username: "Alice".to_string(),
                password: "s3cret".to_string(),
                address: "Via Sauro 4, Modena".to_string(),
            },
            &auth,
        )
        .unwrap();

    persistence::save_users(&path, &users).unwrap();
    let loaded = persistence::load_users(&path);

    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded.get(alice.id), Some(&alice));
    assert!(loaded.authenticate("alice", "s3cret", &auth).is_ok());
}

#[tokio::test]
async fn test_system_load_and_save() {
    let dir = tempfile::tempdir().unwrap();
    let config = AppConfig {
        data_dir: dir.path().join("data"),
        ..AppConfig::default()
    };
    let files = DataFiles::in_dir(&config.data_dir);

    let settings = AppSettings {
        delivery_enabled: false,
        ..AppSettings::default()
    };
    persistence::save_settings(&files.settings, &settings).unwrap();
    persistence::save_deliveries(&files.deliveries, &sample_deliveries()).unwrap();

    let mut system = DeliverySystem::load(&config);
    assert_eq!(system.settings(), &settings);
    assert_eq!(system.snapshot().await.unwrap().len(), 2);

    system
        .register_user(UserCreate {
            username: "bob".to_string(),
            password: "pw".to_string(),
            address: "Via Ganaceto 30, Modena".to_string(),
        })
        .unwrap();
    system.login("bob", "pw").await.unwrap();
    // Deliveries are disabled, so logging in leaves the worker stopped.
    assert!(!system.worker().is_running());

    system.save(&files).await.unwrap();
    system.shutdown().await.unwrap();

    let reloaded = DeliverySystem::load(&config);
    assert_eq!(reloaded.snapshot().await.unwrap().len(), 2);
    assert!(reloaded.users().by_name("BOB").is_some());
    reloaded.shutdown().await.unwrap();
}
