use courier_sim::config::AppConfig;
use courier_sim::lifecycle::{setup_tracing, DeliverySystem};
use courier_sim::model::{DeliveryCreate, UserCreate};
use courier_sim::persistence::DataFiles;
use courier_sim::settings::AppSettings;
use std::time::Duration;
use tracing::{info, warn, Instrument};

const CONFIG_FILE: &str = "courier-sim.toml";

#[tokio::main]
async fn main() -> Result<(), String> {
    setup_tracing();

    let config = AppConfig::load(CONFIG_FILE).map_err(|e| e.to_string())?;
    info!(data_dir = %config.data_dir.display(), "Starting courier simulation");

    let mut system = DeliverySystem::load(&config);

    if system.users().by_name("demo").is_none() {
        system
            .register_user(UserCreate {
                username: "demo".to_string(),
                password: "demo".to_string(),
                address: "Via Vivarelli 10, Modena".to_string(),
            })
            .map_err(|e| e.to_string())?;
    }

    let user = system
        .login("demo", "demo")
        .await
        .map_err(|e| e.to_string())?;

    let span = tracing::info_span!("delivery_creation");
    async {
        for (destination, weight, insured_value) in [
            ("Piazza Grande 1, Modena", 1.2, None),
            ("Via Emilia Est 45, Modena", 4.8, Some(250)),
            ("Corso Canalgrande 7, Modena", 0.4, None),
        ] {
            let params = DeliveryCreate {
                sender: user.id,
                destination: destination.to_string(),
                weight,
                insured_value,
            };
            match system.client().create(params).await {
                Ok(d) => info!(code = %d.code(), destination, "Delivery created"),
                Err(e) => warn!(error = %e, "Delivery rejected"),
            }
        }
    }
    .instrument(span)
    .await;

    // Fast pace so the demo shows a few transitions.
    let fast = AppSettings {
        delivery_intensity: 120.0,
        ..system.settings().clone()
    };
    system
        .apply_settings(fast)
        .await
        .map_err(|e| e.to_string())?;
    tokio::time::sleep(Duration::from_secs(5)).await;
    system.logout().await.map_err(|e| e.to_string())?;

    let view = system.client().sender_view(user.id);
    for d in view.current().await.map_err(|e| e.to_string())? {
        info!(code = %d.code(), state = %d.state(), insured = d.is_insured(), "Final state");
    }
    info!(stats = ?system.worker_stats(), "Worker summary");

    if let Err(e) = system.save(&DataFiles::in_dir(&config.data_dir)).await {
        warn!(error = %e, "Saving failed");
    }

    system.shutdown().await.map_err(|e| e.to_string())?;
    Ok(())
}
