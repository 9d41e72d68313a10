use std::sync::Arc;

use clap::{Arg, ArgMatches, Command};
use rudp::config::{Config, EnvSettings};
use rudp::stats::NetStats;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

/// Serves the admin shell: a TCP line protocol whose slash-prefixed
/// commands read and mutate the engine tunables and network counters.
pub async fn serve(port: u16, config: Arc<Config>, stats: Arc<NetStats>) -> std::io::Result<()> {
    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    log::info!("admin shell listening on port {port}");

    loop {
        let (stream, peer) = listener.accept().await?;
        log::info!("admin connection from {peer}");

        let config = Arc::clone(&config);
        let stats = Arc::clone(&stats);
        tokio::spawn(async move {
            if let Err(err) = handle_client(stream, config, stats).await {
                log::warn!("admin connection {peer} ended: {err}");
            }
        });
    }
}

async fn handle_client(
    stream: TcpStream,
    config: Arc<Config>,
    stats: Arc<NetStats>,
) -> std::io::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines.next_line().await? {
        let reply = execute_line(&config, &stats, &line);
        if reply.is_empty() {
            continue;
        }
        writer.write_all(reply.as_bytes()).await?;
        writer.write_all(b"\n").await?;
    }

    Ok(())
}

fn command_tree() -> Command<'static> {
    Command::new("admin")
        .no_binary_name(true)
        .subcommand_required(true)
        .subcommand(
            Command::new("env")
                .about("Show or mutate the engine tunables")
                .subcommand_required(true)
                .subcommand(Command::new("show"))
                .subcommand(
                    Command::new("set")
                        .arg(
                            Arg::new("enable-duplicate-filtering")
                                .long("enable-duplicate-filtering")
                                .help("Enable duplicate packet/message filtering"),
                        )
                        .arg(
                            Arg::new("disable-duplicate-filtering")
                                .long("disable-duplicate-filtering")
                                .help("Disable duplicate packet/message filtering"),
                        )
                        .arg(
                            Arg::new("packet-drop-rate")
                                .long("packet-drop-rate")
                                .takes_value(true)
                                .help("Set the network drop rate value"),
                        )
                        .arg(
                            Arg::new("packet-receive-timeout")
                                .long("packet-receive-timeout")
                                .takes_value(true)
                                .help("Set packet receive timeout (ms)"),
                        )
                        .arg(
                            Arg::new("packet-ttl")
                                .long("packet-ttl")
                                .takes_value(true)
                                .help("Set packet TTL (ms)"),
                        )
                        .arg(
                            Arg::new("message-assembler-intervals")
                                .long("message-assembler-intervals")
                                .takes_value(true)
                                .help("Set message assembler intervals (ms)"),
                        )
                        .arg(
                            Arg::new("response-ttl")
                                .long("response-ttl")
                                .takes_value(true)
                                .help("Set response TTL (ms)"),
                        )
                        .arg(
                            Arg::new("response-intervals")
                                .long("response-intervals")
                                .takes_value(true)
                                .help("Set response intervals (ms)"),
                        ),
                ),
        )
        .subcommand(
            Command::new("net")
                .about("Network counters")
                .subcommand_required(true)
                .subcommand(Command::new("show"))
                .subcommand(Command::new("reset")),
        )
}

/// Executes one admin line and renders the reply. Invalid commands and
/// invalid values report themselves without mutating anything.
pub(crate) fn execute_line(config: &Config, stats: &NetStats, line: &str) -> String {
    let line = line.trim();
    if line.is_empty() {
        return String::new();
    }

    let line = match line.strip_prefix('/') {
        Some(rest) => rest,
        None => {
            log::warn!("attempted to execute malformed admin line");
            return "commands start with '/'".to_string();
        }
    };

    let matches = match command_tree().try_get_matches_from(line.split_whitespace()) {
        Ok(m) => m,
        Err(err) => return err.to_string(),
    };

    match matches.subcommand() {
        Some(("env", env_matches)) => match env_matches.subcommand() {
            Some(("show", _)) => render_settings(&config.snapshot()),
            Some(("set", set_matches)) => apply_env_set(config, set_matches),
            _ => String::new(),
        },
        Some(("net", net_matches)) => match net_matches.subcommand() {
            Some(("show", _)) => stats.snapshot().to_string(),
            Some(("reset", _)) => {
                stats.reset();
                "network counters reset".to_string()
            }
            _ => String::new(),
        },
        _ => String::new(),
    }
}

fn render_settings(settings: &EnvSettings) -> String {
    format!(
        "EnableDuplicateFiltering: {}\n\
         PacketDropRate: {}\n\
         PacketReceiveTimeout: {} ms\n\
         PacketTTL: {} ms\n\
         MessageAssemblerIntervals: {} ms\n\
         ResponseTTL: {} ms\n\
         ResponseIntervals: {} ms",
        settings.enable_duplicate_filtering,
        settings.packet_drop_rate,
        settings.packet_timeout_receive,
        settings.packet_ttl,
        settings.message_assembler_interval,
        settings.response_ttl,
        settings.response_interval,
    )
}

fn apply_env_set(config: &Config, matches: &ArgMatches) -> String {
    let mut replies: Vec<String> = Vec::new();

    if matches.is_present("enable-duplicate-filtering") {
        config.set_duplicate_filtering(true);
        replies.push("duplicate filtering enabled".to_string());
    }
    if matches.is_present("disable-duplicate-filtering") {
        config.set_duplicate_filtering(false);
        replies.push("duplicate filtering disabled".to_string());
    }

    if let Some(raw) = matches.value_of("packet-drop-rate") {
        match raw.parse::<f32>() {
            Ok(rate) => match config.set_drop_rate(rate) {
                Ok(()) => replies.push(format!("packet drop rate set to {rate}")),
                Err(err) => replies.push(err.to_string()),
            },
            Err(_) => replies.push(format!("invalid packet drop rate: {raw}")),
        }
    }

    let mut set_millis = |flag: &str, apply: &dyn Fn(u64)| {
        if let Some(raw) = matches.value_of(flag) {
            match raw.parse::<u64>() {
                Ok(ms) => {
                    apply(ms);
                    replies.push(format!("{flag} set to {ms} ms"));
                }
                Err(_) => replies.push(format!("invalid value for {flag}: {raw}")),
            }
        }
    };

    set_millis("packet-receive-timeout", &|ms| {
        config.set_packet_receive_timeout(ms)
    });
    set_millis("packet-ttl", &|ms| config.set_packet_ttl(ms));
    set_millis("message-assembler-intervals", &|ms| {
        config.set_assembler_interval(ms)
    });
    set_millis("response-ttl", &|ms| config.set_response_ttl(ms));
    set_millis("response-intervals", &|ms| config.set_response_interval(ms));

    if replies.is_empty() {
        return "nothing to set".to_string();
    }
    replies.join("\n")
}

#[cfg(test)]
mod test {
    use super::*;

    fn fixtures() -> (Config, NetStats) {
        (Config::default(), NetStats::new())
    }

    #[test]
    fn test_env_show_renders_current_values() {
        let (config, stats) = fixtures();
        let reply = execute_line(&config, &stats, "/env show");

        assert!(reply.contains("PacketDropRate: 0.1"));
        assert!(reply.contains("PacketTTL: 2000 ms"));
        assert!(reply.contains("EnableDuplicateFiltering: true"));
    }

    #[test]
    fn test_env_set_mutates_config() {
        let (config, stats) = fixtures();

        let reply = execute_line(
            &config,
            &stats,
            "/env set --packet-drop-rate 0.25 --packet-ttl 900 --disable-duplicate-filtering",
        );

        assert!(reply.contains("packet drop rate set to 0.25"));
        assert!((config.drop_rate() - 0.25).abs() < f32::EPSILON);
        assert_eq!(
            config.packet_ttl(),
            std::time::Duration::from_millis(900)
        );
        assert!(!config.duplicate_filtering());
    }

    #[test]
    fn test_env_set_rejects_out_of_range_drop_rate() {
        let (config, stats) = fixtures();

        let reply = execute_line(&config, &stats, "/env set --packet-drop-rate 1.5");
        assert!(reply.contains("within [0, 1)"));
        assert!((config.drop_rate() - 0.10).abs() < f32::EPSILON);
    }

    #[test]
    fn test_env_set_rejects_garbage_values() {
        let (config, stats) = fixtures();

        let reply = execute_line(&config, &stats, "/env set --packet-ttl never");
        assert!(reply.contains("invalid value for packet-ttl"));
        assert_eq!(config.packet_ttl(), std::time::Duration::from_millis(2000));
    }

    #[test]
    fn test_lines_must_be_slash_prefixed() {
        let (config, stats) = fixtures();
        assert_eq!(
            execute_line(&config, &stats, "env show"),
            "commands start with '/'"
        );
        assert_eq!(execute_line(&config, &stats, "   "), "");
    }

    #[test]
    fn test_unknown_command_reports_usage() {
        let (config, stats) = fixtures();
        let reply = execute_line(&config, &stats, "/nuke everything");
        assert!(!reply.is_empty());
    }

    #[test]
    fn test_net_show_and_reset() {
        let (config, stats) = fixtures();
        stats.mark_packet_in();
        stats.mark_packet_out();

        let reply = execute_line(&config, &stats, "/net show");
        assert!(reply.contains("in=1"));
        assert!(reply.contains("out=1"));

        let reply = execute_line(&config, &stats, "/net reset");
        assert_eq!(reply, "network counters reset");
        assert_eq!(stats.snapshot().packets_in, 0);
    }
}
