mod board;

use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Result};
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::delay::FreeRtos;
use esp_idf_svc::hal::i2c::{I2cConfig, I2cDriver};
use esp_idf_svc::hal::peripherals::Peripherals;
use esp_idf_svc::hal::prelude::*;
use esp_idf_svc::http::client::{Configuration as HttpConfiguration, EspHttpConnection};
use esp_idf_svc::log::EspLogger;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::sntp::{EspSntp, SyncStatus};
use esp_idf_svc::wifi::{AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi};
use log::{error, info};
use m5_uploader::prelude::*;

use board::{Axp192, TouchConsole};

fn main() -> Result<()> {
    esp_idf_svc::sys::link_patches();
    EspLogger::initialize_default();

    let peripherals = Peripherals::take()?;
    let sys_loop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;
    let config = StationConfig::from_json(include_str!("../station.json"))?;

    // AXP192, MPU6886 and the touch controller
    let internal = I2cDriver::new(
        peripherals.i2c0,
        peripherals.pins.gpio21,
        peripherals.pins.gpio22,
        &I2cConfig::new().baudrate(400.kHz().into()),
    )?;
    let internal_bus = shared_bus::BusManagerSimple::new(internal);
    Axp192::new(internal_bus.acquire_i2c()).enable_port_a()?;

    // VCNL4040 and SHT4x on Port A
    let port_a = I2cDriver::new(
        peripherals.i2c1,
        peripherals.pins.gpio32,
        peripherals.pins.gpio33,
        &I2cConfig::new().baudrate(100.kHz().into()),
    )?;
    let port_a_bus = shared_bus::BusManagerSimple::new(port_a);

    let mut wifi = BlockingWifi::wrap(
        EspWifi::new(peripherals.modem, sys_loop.clone(), Some(nvs))?,
        sys_loop,
    )?;
    connect_wifi(&mut wifi)?;
    let sntp = EspSntp::new_default()?;
    wait_for_time(&sntp);

    info!("Initializing sensors");
    let mut vcnl = Vcnl4040::new(port_a_bus.acquire_i2c());
    let mut sht = Sht4x::new(port_a_bus.acquire_i2c(), FreeRtos);
    let mut imu = Mpu6886::new(internal_bus.acquire_i2c());
    if let Err(e) = init_sensors(&mut vcnl, &mut sht).and_then(|()| imu.init()) {
        error!("{}", e);
        loop {
            FreeRtos::delay_ms(1);
        }
    }

    let transport = ConnectionTransport::new(
        |timeout| {
            EspHttpConnection::new(&HttpConfiguration {
                timeout: Some(timeout),
                crt_bundle_attach: Some(esp_idf_svc::sys::esp_crt_bundle_attach),
                ..Default::default()
            })
        },
        config.http_timeout(),
    );
    let console = TouchConsole::new(internal_bus.acquire_i2c());

    Station::new(
        config,
        Sensors::new(vcnl, sht, imu),
        SystemClock,
        transport,
        console,
        FreeRtos,
    )
    .run()
}

fn connect_wifi(wifi: &mut BlockingWifi<EspWifi<'static>>) -> Result<()> {
    let ssid = env!("WIFI_SSID");
    wifi.set_configuration(&Configuration::Client(ClientConfiguration {
        ssid: ssid.try_into().map_err(|_| anyhow!("SSID {} is too long", ssid))?,
        password: env!("WIFI_PASSWORD")
            .try_into()
            .map_err(|_| anyhow!("WiFi password is too long"))?,
        auth_method: AuthMethod::WPA2Personal,
        ..Default::default()
    }))?;

    wifi.start()?;
    wifi.connect()?;
    info!("Connecting to WiFi...");
    wifi.wait_netif_up()?;
    info!("Connected to WiFi network: {}", ssid);
    Ok(())
}

fn wait_for_time(sntp: &EspSntp) {
    info!("Starting NTP time sync...");
    while sntp.get_sync_status() != SyncStatus::Completed {
        thread::sleep(Duration::from_millis(500));
    }
    info!("Time synchronised");
}
