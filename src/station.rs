use embedded_hal::blocking::delay::DelayMs;
use log::{info, warn};

use crate::clock::Clock;
use crate::config::StationConfig;
use crate::console::{show_home, Button, Buttons, Screen, RETURN_PROMPT};
use crate::error::Result;
use crate::http::HttpTransport;
use crate::record::encode;
use crate::snapshot::SnapshotSource;
use crate::storage::{Archive, NoArchive};
use crate::upload::{upload_details, upload_file};
use crate::viewer::{fetch_latest, LatestView};

/// Result of one acquire, encode and upload pass
#[derive(Default, Copy, Clone, Debug, PartialEq, Eq)]
pub struct TickReport {
    /// The header upload got a 200
    pub uploaded: bool,
    /// Outcome of the archived file upload, `None` when no archive is configured
    pub file_uploaded: Option<bool>,
}

/// The board's main loop: upload ticks, interrupted by the latest data view
/// whenever button A is pressed. Only one of the two ever runs at a time.
pub struct Station<S, C, T, U, D, A = NoArchive> {
    config: StationConfig,
    sensors: S,
    clock: C,
    transport: T,
    console: U,
    delay: D,
    archive: Option<A>,
}

impl<S, C, T, U, D> Station<S, C, T, U, D>
where
    S: SnapshotSource,
    C: Clock,
    T: HttpTransport,
    U: Screen + Buttons,
    D: DelayMs<u32>,
{
    pub fn new(config: StationConfig, sensors: S, clock: C, transport: T, console: U, delay: D) -> Self {
        Self {
            config,
            sensors,
            clock,
            transport,
            console,
            delay,
            archive: None,
        }
    }
}

impl<S, C, T, U, D, A> Station<S, C, T, U, D, A>
where
    S: SnapshotSource,
    C: Clock,
    T: HttpTransport,
    U: Screen + Buttons,
    D: DelayMs<u32>,
    A: Archive,
{
    /// Also archive every record and upload it as a file, which needs
    /// `file_upload_url` in the config
    pub fn with_archive<NewArchive: Archive>(self, archive: NewArchive) -> Station<S, C, T, U, D, NewArchive> {
        if self.config.file_upload_url.is_none() {
            warn!("Archive given without a file upload URL, files will only be written locally");
        }
        Station {
            config: self.config,
            sensors: self.sensors,
            clock: self.clock,
            transport: self.transport,
            console: self.console,
            delay: self.delay,
            archive: Some(archive),
        }
    }

    pub fn config(&self) -> &StationConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn console(&self) -> &U {
        &self.console
    }

    /// Draws the main screen, call once before the first step
    pub fn start(&mut self) {
        show_home(&mut self.console);
    }

    /// Never returns, exactly like the board's loop
    pub fn run(mut self) -> ! {
        self.start();
        loop {
            self.step().ok();
        }
    }

    /// One pass of the main loop: the latest data view if A was pressed,
    /// then a tick and the fixed delay
    pub fn step(&mut self) -> Result<TickReport> {
        self.console.update();
        if self.console.was_pressed(Button::A) {
            self.show_latest();
            self.console.print_line("");
            self.console.print_line(RETURN_PROMPT);
            self.wait_for_return();
        }

        let report = self.tick();
        if let Err(e) = &report {
            warn!("Skipping tick: {}", e);
        }
        self.delay.delay_ms(self.config.tick_delay_ms);
        report
    }

    /// Samples, encodes and uploads a single snapshot
    pub fn tick(&mut self) -> Result<TickReport> {
        let snapshot = self.sensors.snapshot()?;
        let capture_secs = self.clock.epoch_seconds();
        let details = encode(&snapshot, &self.config.user_id, capture_secs);

        let uploaded = upload_details(&mut self.transport, &self.config.upload_url, &details);
        let file_uploaded = self.archive_and_upload(&details);

        Ok(TickReport {
            uploaded,
            file_uploaded,
        })
    }

    /// Fetches and draws the latest uploaded record
    pub fn show_latest(&mut self) -> LatestView {
        self.console.clear();
        self.console.print_line("Fetching Latest Data...");

        let offset = self.config.display_offset();
        let view = fetch_latest(&mut self.transport, &self.config.latest_url, &offset);
        view.render(&mut self.console);
        view
    }

    fn wait_for_return(&mut self) {
        loop {
            self.console.update();
            if self.console.was_pressed(Button::B) {
                show_home(&mut self.console);
                return;
            }
            self.delay.delay_ms(self.config.button_poll_ms);
        }
    }

    fn archive_and_upload(&mut self, details: &str) -> Option<bool> {
        let archive = self.archive.as_mut()?;

        let (path, contents) = match write_and_reread(archive, details.as_bytes()) {
            Ok(stored) => stored,
            Err(e) => {
                warn!("Archiving failed: {}", e);
                return Some(false);
            }
        };
        info!("Archived record as {}", path);

        let url = self.config.file_upload_url.as_deref()?;
        Some(upload_file(&mut self.transport, url, &path, &contents, details))
    }
}

fn write_and_reread<A: Archive>(archive: &mut A, data: &[u8]) -> Result<(String, Vec<u8>)> {
    let path = archive.write_file(data)?;
    let contents = archive.read_file(&path)?;
    Ok((path, contents))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::error::StationError;
    use crate::http::Method;
    use crate::snapshot::DeviceSnapshot;
    use crate::upload::test::ScriptedTransport;
    use crate::viewer::test::{RecordingScreen, LATEST_BODY};
    use embedded_hal_mock::delay::MockNoop;
    use serde_json::Value;
    use std::collections::{BTreeMap, VecDeque};

    struct FixedSensors(Option<DeviceSnapshot>);

    impl SnapshotSource for FixedSensors {
        fn snapshot(&mut self) -> Result<DeviceSnapshot> {
            self.0.ok_or(StationError::ReadI2CError)
        }
    }

    struct FixedClock(u64);

    impl Clock for FixedClock {
        fn epoch_seconds(&mut self) -> u64 {
            self.0
        }
    }

    /// Replays one optional press per `update`
    #[derive(Default)]
    struct ScriptedConsole {
        presses: VecDeque<Option<Button>>,
        current: Option<Button>,
        updates: usize,
        screen: RecordingScreen,
        history: Vec<String>,
    }

    impl ScriptedConsole {
        fn pressing(presses: impl IntoIterator<Item = Option<Button>>) -> Self {
            Self {
                presses: presses.into_iter().collect(),
                ..Default::default()
            }
        }
    }

    impl Screen for ScriptedConsole {
        fn clear(&mut self) {
            self.screen.clear();
        }

        fn print_line(&mut self, line: &str) {
            self.history.push(line.to_string());
            self.screen.print_line(line);
        }
    }

    impl Buttons for ScriptedConsole {
        fn update(&mut self) {
            self.updates += 1;
            self.current = self.presses.pop_front().flatten();
        }

        fn was_pressed(&self, button: Button) -> bool {
            self.current == Some(button)
        }
    }

    #[derive(Default)]
    struct MemoryArchive {
        files: BTreeMap<String, Vec<u8>>,
        fail_writes: bool,
    }

    impl Archive for &mut MemoryArchive {
        fn write_file(&mut self, data: &[u8]) -> Result<String> {
            if self.fail_writes {
                return Err(StationError::StorageOpen {
                    path: "/file_1.txt".to_string(),
                });
            }
            let path = format!("/file_{}.txt", self.files.len() + 1);
            self.files.insert(path.clone(), data.to_vec());
            Ok(path)
        }

        fn read_file(&mut self, path: &str) -> Result<Vec<u8>> {
            self.files
                .get(path)
                .cloned()
                .ok_or_else(|| StationError::StorageRead {
                    path: path.to_string(),
                })
        }
    }

    fn snapshot() -> DeviceSnapshot {
        DeviceSnapshot {
            proximity: 10,
            ambient_light: 200,
            white_light: 50,
            relative_humidity: 45.5,
            temperature_c: 22.0,
            accel_x: 0.1,
            accel_y: 0.2,
            accel_z: 9.8,
        }
    }

    fn config() -> StationConfig {
        StationConfig::new("http://upload", "http://latest").with_user_id("test")
    }

    fn station(
        config: StationConfig,
        sensors: FixedSensors,
        transport: ScriptedTransport,
        console: ScriptedConsole,
    ) -> Station<FixedSensors, FixedClock, ScriptedTransport, ScriptedConsole, MockNoop> {
        Station::new(config, sensors, FixedClock(1_700_000_000), transport, console, MockNoop::new())
    }

    #[test]
    fn tick_uploads_record_header() {
        let mut station = station(
            config(),
            FixedSensors(Some(snapshot())),
            ScriptedTransport::answering([Some(200)]),
            ScriptedConsole::default(),
        );

        let report = station.step().unwrap();
        assert_eq!(
            report,
            TickReport {
                uploaded: true,
                file_uploaded: None
            }
        );

        let sent = &station.transport().sent;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].url, "http://upload");
        assert_eq!(sent[0].method, Method::Get);
        let (name, value) = &sent[0].headers[0];
        assert_eq!(name, "M5-Details");
        let record: Value = serde_json::from_str(value).unwrap();
        assert_eq!(record["otherDetails"]["captureTime"], 1_700_000_000_000u64);
        assert_eq!(record["otherDetails"]["userId"], "test");
        assert_eq!(record["vcnlDetails"]["prox"], 10);
    }

    #[test]
    fn failed_upload_is_not_retried() {
        let mut station = station(
            config(),
            FixedSensors(Some(snapshot())),
            ScriptedTransport::answering([Some(500)]),
            ScriptedConsole::default(),
        );

        assert!(!station.step().unwrap().uploaded);
        assert!(!station.step().unwrap().uploaded);
        assert_eq!(station.transport().sent.len(), 2);
    }

    #[test]
    fn sensor_failure_skips_the_upload() {
        let mut station = station(
            config(),
            FixedSensors(None),
            ScriptedTransport::answering([Some(200)]),
            ScriptedConsole::default(),
        );

        assert!(matches!(station.step(), Err(StationError::ReadI2CError)));
        assert!(station.transport().sent.is_empty());
    }

    struct FlakySensors(VecDeque<Option<DeviceSnapshot>>);

    impl SnapshotSource for FlakySensors {
        fn snapshot(&mut self) -> Result<DeviceSnapshot> {
            self.0.pop_front().flatten().ok_or(StationError::ReadI2CError)
        }
    }

    #[test]
    fn loop_carries_on_after_a_failed_step() {
        let sensors = FlakySensors(VecDeque::from([None, Some(snapshot())]));
        let mut station = Station::new(
            config(),
            sensors,
            FixedClock(1_700_000_000),
            ScriptedTransport::answering([Some(200)]),
            ScriptedConsole::default(),
            MockNoop::new(),
        );

        // Same as one pass of `run`
        assert!(station.step().ok().is_none());
        assert!(station.step().ok().is_some_and(|report| report.uploaded));
        assert_eq!(station.console().updates, 2);
        assert_eq!(station.transport().sent.len(), 1);
    }

    #[test]
    fn button_a_opens_latest_view_until_b() {
        let transport = ScriptedTransport::answering([Some(200)]).with_body(200, LATEST_BODY);
        let console = ScriptedConsole::pressing([Some(Button::A), None, Some(Button::A), Some(Button::B)]);
        let mut station = station(config(), FixedSensors(Some(snapshot())), transport, console);
        station.start();

        let report = station.step().unwrap();
        assert!(report.uploaded);

        let console = station.console();
        assert_eq!(console.updates, 4);
        assert_eq!(
            console.history,
            vec![
                "M5Core2 Sensor Uploader",
                "Press A for Latest Data",
                "Fetching Latest Data...",
                "Latest Sensor Data:",
                "",
                "Temp: 22.46 C",
                "Hum: 45.50 %",
                "Captured:",
                "03:13:20PM",
                "Uploaded:",
                "04:13:45PM",
                "",
                "Press B to return",
                "M5Core2 Sensor Uploader",
                "Press A for Latest Data",
            ]
        );
        assert_eq!(
            console.screen.lines,
            vec!["M5Core2 Sensor Uploader", "Press A for Latest Data"]
        );
        assert_eq!(station.transport().body_requests, vec!["http://latest"]);
        // The tick still ran once the view was closed
        assert_eq!(station.transport().sent.len(), 1);
    }

    #[test]
    fn latest_view_shows_http_error() {
        let transport = ScriptedTransport::answering([Some(200)]).with_body(404, "");
        let console = ScriptedConsole::pressing([Some(Button::A), Some(Button::B)]);
        let mut station = station(config(), FixedSensors(Some(snapshot())), transport, console);

        station.step().unwrap();
        let history = &station.console().history;
        assert_eq!(
            history[..4],
            ["Fetching Latest Data...", "HTTP error: 404", "", "Press B to return"]
        );
    }

    #[test]
    fn archived_record_is_posted_as_file() {
        let mut archive = MemoryArchive::default();
        let mut station = station(
            config().with_file_upload_url("http://files"),
            FixedSensors(Some(snapshot())),
            ScriptedTransport::answering([Some(200)]),
            ScriptedConsole::default(),
        )
        .with_archive(&mut archive);

        let report = station.step().unwrap();
        assert_eq!(
            report,
            TickReport {
                uploaded: true,
                file_uploaded: Some(true)
            }
        );

        let sent = &station.transport().sent;
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[1].url, "http://files");
        assert_eq!(sent[1].method, Method::Post);
        assert_eq!(sent[1].headers[1].1, "attachment; filename=file_1.txt");
        assert_eq!(sent[1].body.as_deref(), Some(sent[0].headers[0].1.as_bytes()));
        drop(station);

        assert_eq!(archive.files.len(), 1);
    }

    #[test]
    fn archived_upload_retries_ten_times() {
        let mut archive = MemoryArchive::default();
        let mut script = vec![Some(200)];
        script.extend(std::iter::repeat(Some(502)).take(10));
        let mut station = station(
            config().with_file_upload_url("http://files"),
            FixedSensors(Some(snapshot())),
            ScriptedTransport::answering(script),
            ScriptedConsole::default(),
        )
        .with_archive(&mut archive);

        assert_eq!(station.step().unwrap().file_uploaded, Some(false));
        assert_eq!(station.transport().sent.len(), 11);
    }

    #[test]
    fn archive_failure_is_reported_without_posting() {
        let mut archive = MemoryArchive {
            fail_writes: true,
            ..Default::default()
        };
        let mut station = station(
            config().with_file_upload_url("http://files"),
            FixedSensors(Some(snapshot())),
            ScriptedTransport::answering([Some(200)]),
            ScriptedConsole::default(),
        )
        .with_archive(&mut archive);

        assert_eq!(station.step().unwrap().file_uploaded, Some(false));
        assert_eq!(station.transport().sent.len(), 1);
    }

    #[test]
    fn archive_without_url_only_writes_locally() {
        let mut archive = MemoryArchive::default();
        let mut station = station(
            config(),
            FixedSensors(Some(snapshot())),
            ScriptedTransport::answering([Some(200)]),
            ScriptedConsole::default(),
        )
        .with_archive(&mut archive);

        assert_eq!(station.step().unwrap().file_uploaded, None);
        assert_eq!(station.transport().sent.len(), 1);
        drop(station);
        assert_eq!(archive.files.len(), 1);
    }
}
