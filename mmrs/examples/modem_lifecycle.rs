/// Example walking a modem from disabled to an active data connection.
///
/// Unlocks the SIM with the PIN in `SIM_PIN` if needed, enables the modem,
/// waits for network registration and connects to the APN in `APN`.
use mmrs::{IpType, ModemFilter, ModemManager, ModemManagerConfig, ModemState};
use std::time::Duration;

#[tokio::main]
async fn main() -> mmrs::Result<()> {
    env_logger::init();

    let config = ModemManagerConfig::new().with_reset_timeout(Duration::from_secs(90));
    let mm = ModemManager::with_config(config).await?;

    let modem = match mm.any_modem() {
        Some(modem) => modem,
        None => {
            println!("Waiting for a modem...");
            mm.await_modem(ModemFilter::Any).await?
        }
    };
    println!("Using modem {}", modem.imei().await?);

    modem
        .observe_state(|old, new| println!("State: {old} -> {new}"))
        .await?;

    if modem.is_locked().await? {
        let Some(sim) = modem.active_sim().await? else {
            println!("Modem is locked but has no SIM");
            return Ok(());
        };
        let pin = std::env::var("SIM_PIN").unwrap_or_else(|_| "0000".to_string());
        sim.send_pin(&pin).await?;
    }

    if modem.state().await? == ModemState::Disabled {
        modem.enable(true).await?;
    }

    while !modem.is_registered().await? {
        tokio::time::sleep(Duration::from_secs(1)).await;
    }
    println!(
        "Registered on {} ({}) using {}",
        modem.operator_name().await?,
        modem.operator_plmn().await?,
        modem.technology().await?
    );

    let apn = std::env::var("APN").unwrap_or_else(|_| "internet".to_string());
    let bearer = modem.connect(&apn, IpType::Ipv4AndIpv6).await?;
    println!("Connected on {}", bearer.interface().await?);
    if let Some(ip) = bearer.ipv4_config().await? {
        println!("  IPv4 {}/{} via {:?}", ip.address, ip.prefix, ip.gateway);
    }

    bearer
        .observe_traffic_stats(1000, |stats| {
            println!("  rx {} B, tx {} B", stats.rx_bytes, stats.tx_bytes)
        })
        .await?;
    tokio::time::sleep(Duration::from_secs(10)).await;

    bearer.disconnect().await?;
    Ok(())
}
