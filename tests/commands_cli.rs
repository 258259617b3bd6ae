use clap::Parser;
use clap::error::ErrorKind;
use pretty_assertions::assert_eq;
use rstest::rstest;
use time::OffsetDateTime;

#[derive(Debug, Default)]
struct FakeTerminalClient;

impl uwatch::TerminalClient for FakeTerminalClient {
    fn stdout_is_terminal(&self) -> bool {
        false
    }

    fn stderr_is_terminal(&self) -> bool {
        false
    }
}

const CONNECTED_DEVICE_LINES: [&str; 5] = [
    "Connected device:",
    "  adapter: fake0",
    "  device_id: C0:FF:EE:00:00:02",
    "  name: Uwatch2",
    "  rssi: -52",
];

async fn run_command(
    command: uwatch::Command,
    settings: uwatch::Settings,
    fake_args: uwatch::FakeArgs,
) -> anyhow::Result<String> {
    let mut output = Vec::new();
    uwatch::run_with_clients(
        command,
        &settings,
        &mut output,
        &FakeTerminalClient,
        uwatch::fake_hardware_client(fake_args),
    )
    .await?;
    Ok(String::from_utf8(output)?)
}

async fn run_with_argv<const N: usize>(argv: [&str; N]) -> anyhow::Result<String> {
    let args = uwatch::Args::try_parse_from(argv)?;
    let settings = args.settings(uwatch::OutputFormat::Pretty);
    let (command, maybe_fake_args) = args.into_command_and_fake_args();
    let fake_args = maybe_fake_args.ok_or_else(|| anyhow::anyhow!("tests only run with --fake"))?;
    run_command(command, settings, fake_args).await
}

fn pretty() -> uwatch::Settings {
    uwatch::Settings::builder().build()
}

fn json() -> uwatch::Settings {
    uwatch::Settings::builder()
        .output_format(uwatch::OutputFormat::Json)
        .build()
}

#[tokio::test]
async fn info_command_prints_device_report() -> anyhow::Result<()> {
    let stdout = run_with_argv(["uwatch", "--fake", "--fake-battery", "64", "info"]).await?;

    let mut expected = CONNECTED_DEVICE_LINES.to_vec();
    expected.extend([
        "Device:",
        "  manufacturer: Umidigi",
        "  model: Uwatch2",
        "  hardware: UW2-HW1.0",
        "  firmware: UW2-FW1.2.7",
        "  battery: 64%",
        "  state: initialized",
        "  capabilities: activity_tracking, realtime_data, heart_rate, find_device, \
         set_time, factory_reset, reboot, vibration",
    ]);
    assert_eq!(expected, stdout.lines().collect::<Vec<_>>());

    Ok(())
}

#[tokio::test]
async fn info_command_uses_device_info_fixture() -> anyhow::Result<()> {
    let fake_args = uwatch::FakeArgs::builder()
        .device_info("HW-9|FW-3")?
        .build();

    let stdout = run_command(uwatch::Command::Info, json(), fake_args).await?;
    let report: serde_json::Value = serde_json::from_str(stdout.trim_end())?;

    assert_eq!("HW-9", report["device_info"]["hardware_version"]);
    assert_eq!("FW-3", report["device_info"]["firmware_version"]);
    assert_eq!("initialized", report["state"]);

    Ok(())
}

#[tokio::test]
async fn listen_command_streams_events_until_sample_limit() -> anyhow::Result<()> {
    let stdout = run_with_argv(["uwatch", "--fake", "listen", "--max-samples", "1"]).await?;
    let lines = stdout.lines().collect::<Vec<_>>();

    assert_eq!(CONNECTED_DEVICE_LINES.as_slice(), &lines[..5]);
    assert_eq!(
        vec![
            "State: initializing",
            "Device info: hardware=UW2-HW1.0 firmware=UW2-FW1.2.7",
            "State: initialized",
            "Battery: 87%",
        ],
        lines[5..9].to_vec()
    );
    assert!(
        lines[9].starts_with("Sample: steps=1000 distance=800m calories=65 at="),
        "unexpected sample line: {}",
        lines[9]
    );
    assert_eq!(
        vec![
            "State: disconnected",
            "Stopped: reached sample limit (1) - 1 sample(s) from 1 notification(s)",
        ],
        lines[10..].to_vec()
    );

    Ok(())
}

#[tokio::test]
async fn listen_command_stops_when_notifications_end() -> anyhow::Result<()> {
    let fake_args = uwatch::FakeArgs::builder()
        .notifications("fee3:0102,fee1:0a0000140000030000")?
        .build();

    let stdout = run_command(
        uwatch::Command::Listen(uwatch::ListenArgs::new(None)),
        pretty(),
        fake_args,
    )
    .await?;

    let samples = stdout
        .lines()
        .filter(|line| line.starts_with("Sample:"))
        .collect::<Vec<_>>();
    assert_eq!(1, samples.len());
    assert!(samples[0].starts_with("Sample: steps=10 distance=20m calories=3 at="));
    assert_eq!(
        Some("Stopped: notification stream closed - 1 sample(s) from 2 notification(s)"),
        stdout.lines().last()
    );

    Ok(())
}

#[tokio::test]
async fn listen_command_appends_samples_to_file() -> anyhow::Result<()> {
    let path = std::env::temp_dir().join(format!(
        "uwatch-listen-{}-{}.jsonl",
        std::process::id(),
        OffsetDateTime::now_utc().unix_timestamp_nanos()
    ));
    let settings = uwatch::Settings::builder()
        .output_format(uwatch::OutputFormat::Json)
        .samples_path(path.clone())
        .build();

    run_command(
        uwatch::Command::Listen(uwatch::ListenArgs::new(None)),
        settings,
        uwatch::FakeArgs::builder().build(),
    )
    .await?;

    let stored = std::fs::read_to_string(&path)?;
    std::fs::remove_file(&path)?;
    let steps = stored
        .lines()
        .map(|line| {
            let record: serde_json::Value = serde_json::from_str(line)?;
            Ok(record["steps"].clone())
        })
        .collect::<anyhow::Result<Vec<_>>>()?;
    assert_eq!(vec![serde_json::json!(1000), serde_json::json!(500)], steps);

    Ok(())
}

#[tokio::test]
async fn find_command_writes_find_frame_after_bootstrap() -> anyhow::Result<()> {
    let log = uwatch::FakeTransportLog::new();
    let fake_args = uwatch::FakeArgs::builder()
        .transport_log(log.clone())
        .build();

    let stdout = run_command(uwatch::Command::Find, pretty(), fake_args).await?;

    assert_eq!("find: sent\n", stdout);
    let writes = log.writes_to(uwatch::ChannelId::ControlPoint);
    assert_eq!(2, writes.len());
    assert_eq!(
        Some(&vec![0xFE, 0xEA, 0x10, 0x05, 0x61]),
        writes.last()
    );
    assert_eq!(Some(&uwatch::TransportOp::Close), log.ops().last());

    Ok(())
}

#[tokio::test]
async fn sync_time_command_writes_requested_timestamp() -> anyhow::Result<()> {
    let log = uwatch::FakeTransportLog::new();
    let fake_args = uwatch::FakeArgs::builder()
        .transport_log(log.clone())
        .build();

    let stdout = run_command(
        uwatch::Command::SyncTime(uwatch::SyncTimeArgs::new(Some(1_700_000_000))),
        json(),
        fake_args,
    )
    .await?;

    assert_eq!(
        "{\"action\":\"sync_time\",\"unix_timestamp\":1700000000,\"outcome\":\"sent\"}\n",
        stdout
    );
    let expected = uwatch::TimeSyncHandler::frame_for(OffsetDateTime::from_unix_timestamp(
        1_700_000_000,
    )?)?;
    assert_eq!(
        Some(&expected.as_bytes().to_vec()),
        log.writes_to(uwatch::ChannelId::ControlPoint).last()
    );

    Ok(())
}

#[rstest]
#[case(uwatch::ControlAction::FactoryReset, "factory-reset: sent")]
#[case(uwatch::ControlAction::Reboot, "reboot: sent")]
#[case(uwatch::ControlAction::StopVibration, "stop-vibration: sent")]
#[case(uwatch::ControlAction::SendWeather, "send-weather: unsupported")]
#[case(uwatch::ControlAction::EnableHeartRate, "enable-heart-rate: unsupported")]
#[tokio::test]
async fn command_reports_routing_outcome(
    #[case] action: uwatch::ControlAction,
    #[case] expected: &str,
) -> anyhow::Result<()> {
    let log = uwatch::FakeTransportLog::new();
    let fake_args = uwatch::FakeArgs::builder()
        .transport_log(log.clone())
        .build();

    let stdout = run_command(
        uwatch::Command::Control(uwatch::ControlArgs::new(action)),
        pretty(),
        fake_args,
    )
    .await?;

    assert_eq!(format!("{expected}\n"), stdout);
    let expected_writes = if expected.ends_with("sent") { 2 } else { 1 };
    assert_eq!(
        expected_writes,
        log.writes_to(uwatch::ChannelId::ControlPoint).len()
    );

    Ok(())
}

#[tokio::test]
async fn read_command_prints_battery_payload() -> anyhow::Result<()> {
    let stdout = run_with_argv(["uwatch", "--fake", "--fake-battery", "64", "read", "battery_level"])
        .await?;

    assert_eq!("battery_level: 40\n", stdout);

    Ok(())
}

#[tokio::test]
async fn rejected_subscription_fails_the_command() -> anyhow::Result<()> {
    let fake_args = uwatch::FakeArgs::builder()
        .reject_channel(uwatch::ChannelId::UnknownSecondary)
        .build();

    let error = run_command(uwatch::Command::Info, pretty(), fake_args)
        .await
        .expect_err("bootstrap should fail");

    assert!(
        format!("{error:#}").contains("transport rejected `subscribe` on channel `unknown_secondary`"),
        "unexpected error: {error:#}"
    );

    Ok(())
}

#[tokio::test]
async fn unknown_device_name_fails_to_connect() -> anyhow::Result<()> {
    let error = run_with_argv(["uwatch", "--fake", "--name", "Uwatch3", "info"])
        .await
        .expect_err("fake watch should not match");

    assert_eq!(
        "failed to connect to `Uwatch3`: no device named `Uwatch3` was found in the fake fixture",
        format!("{error:#}")
    );

    Ok(())
}

#[rstest]
#[case(&["uwatch", "--fake-device-info", "a|b", "info"], ErrorKind::MissingRequiredArgument)]
#[case(&["uwatch", "--fake", "--fake-device-info", "ab", "info"], ErrorKind::ValueValidation)]
#[case(&["uwatch", "read", "not_a_channel"], ErrorKind::ValueValidation)]
#[case(&["uwatch", "command", "self-destruct"], ErrorKind::InvalidValue)]
fn invalid_arguments_are_rejected(#[case] argv: &[&str], #[case] expected: ErrorKind) {
    let error = uwatch::Args::try_parse_from(argv).expect_err("arguments should be rejected");
    assert_eq!(expected, error.kind());
}
