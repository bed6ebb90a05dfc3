/// Example printing signal quality, serving cell location and visible cells.
use mmrs::{CellInfo, ModemManager};
use std::time::Duration;

#[tokio::main]
async fn main() -> mmrs::Result<()> {
    env_logger::init();

    let mm = ModemManager::new().await?;
    let Some(modem) = mm.any_modem() else {
        println!("No modems found");
        return Ok(());
    };

    let signal = modem.signal().await?;
    println!("Signal: {signal}");

    match modem.location().await? {
        Some(location) => println!("Serving cell: {location}"),
        None => println!("Serving cell location unavailable"),
    }

    for cell in modem.cell_info().await? {
        let kind = if cell.serving() { "serving" } else { "neighbour" };
        match &cell {
            CellInfo::Lte(lte) => println!(
                "{kind} LTE cell, EARFCN {:?}, PCI {:?}",
                lte.earfcn().ok(),
                lte.pci().ok()
            ),
            CellInfo::Nr5g(nr) => println!(
                "{kind} NR cell, NR-ARFCN {:?}, PCI {:?}",
                nr.nrarfcn().ok(),
                nr.pci().ok()
            ),
        }
    }

    println!("Network time: {}", modem.network_time().await?);

    modem
        .observe_signal(Duration::from_secs(2), |signal| {
            println!("RSRP {:?} dBm", signal.rsrp().ok())
        })
        .await?;
    tokio::time::sleep(Duration::from_secs(20)).await;

    Ok(())
}
