//! Shield Simulator - Main Entry Point
//!
//! Runs the shield loop on a workstation. A ticker thread stands in for the
//! timer interrupt; in SPI mode a second thread plays the SPI master.

use frame_protocol::ShieldLink;
use shield::{
    init_logging, open_serial, ByteSink, ByteSource, EcuEmulator, FixedSensors, HexSink, NullSink, Sensors,
    SerialSink, SerialSource, Shield, ShieldConfig,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;
use tracing::{error, info, warn};

/// Pause between frames clocked out by the simulated SPI master
const SPI_MASTER_PERIOD: Duration = Duration::from_millis(20);

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::args().nth(1);
    let config = ShieldConfig::load(Some(path.as_deref().unwrap_or("shield-sim")))?;
    init_logging(&config.log_level);

    info!("=== Shield Simulator v{} ===", env!("CARGO_PKG_VERSION"));
    let running = Arc::new(AtomicBool::new(true));

    let source: Box<dyn ByteSource> = match &config.ecu_device {
        Some(device) => Box::new(SerialSource::new(open_serial(device, config.ecu_baud)?)),
        None => {
            info!("No ECU device configured, using the built-in emulator");
            let (mut tx, rx) = mpsc::channel::<u8>();
            let running = Arc::clone(&running);
            thread::spawn(move || {
                if let Err(e) = EcuEmulator::default().run(&mut tx, &running) {
                    warn!("ECU emulator stopped: {}", e);
                }
            });
            Box::new(rx)
        }
    };

    let output: Box<dyn ByteSink + Send> = match &config.host_device {
        Some(device) => Box::new(SerialSink::new(open_serial(device, config.host_baud)?)),
        None => Box::new(HexSink::new(std::io::stdout())),
    };

    let sensors = FixedSensors {
        pins: config.gpio_pins,
        air_temp: config.air_temp,
    };

    let mut shield: Shield<_, _, Box<dyn ByteSink + Send>> = match config.link {
        ShieldLink::Uart => Shield::new(&config, source, sensors, output),
        ShieldLink::Spi => {
            let shield = Shield::new(&config, source, sensors, Box::new(NullSink) as Box<dyn ByteSink + Send>);
            spawn_spi_master(&shield, output, Arc::clone(&running));
            shield
        }
    };

    let timer = shield.timer();
    let period = config.tick_period();
    {
        let running = Arc::clone(&running);
        thread::spawn(move || {
            while running.load(Ordering::Relaxed) {
                thread::sleep(period);
                timer.on_tick();
            }
        });
    }

    let result = shield.run();
    running.store(false, Ordering::Relaxed);
    if let Err(e) = &result {
        error!("Shield stopped: {}", e);
    }
    result?;
    Ok(())
}

/// Clock whole frames out of the SPI transfer handle and forward them
fn spawn_spi_master<S, E, K>(shield: &Shield<S, E, K>, mut output: Box<dyn ByteSink + Send>, running: Arc<AtomicBool>)
where
    S: ByteSource,
    E: Sensors,
    K: ByteSink,
{
    let spi = shield.spi_transfer();
    thread::spawn(move || {
        while running.load(Ordering::Relaxed) {
            thread::sleep(SPI_MASTER_PERIOD);
            for byte in spi.clock_frame() {
                if let Err(e) = output.write_byte(byte) {
                    warn!("SPI master output failed: {}", e);
                    return;
                }
            }
        }
    });
}
