use mmrs::ModemManager;

#[tokio::main]
async fn main() -> mmrs::Result<()> {
    env_logger::init();

    let mm = ModemManager::new().await?;
    println!("ModemManager {}", mm.version().await?);

    if !mm.modems_available() {
        println!("No modems found");
        return Ok(());
    }

    for modem in mm.available_modems() {
        println!(
            "{:40} {} {} IMEI {} [{}]",
            modem.path(),
            modem.manufacturer().await?,
            modem.model().await?,
            modem.imei().await?,
            modem.state().await?
        );
        if let Some(sim) = modem.active_sim().await? {
            println!("  SIM {} ({})", sim.iccid().await?, sim.operator_name().await?);
        }
    }

    Ok(())
}
