//! Composition root: parses CLI arguments, then dispatches to capture
//! ingest or script replay.

use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use clap::Parser;

use packet_replay::capture;
use packet_replay::cli::{Args, Command};
use packet_replay::conversation::store::{ConversationKind, ConversationStore};
use packet_replay::conversation::Protocol;
use packet_replay::error::Result;
use packet_replay::packet;
use packet_replay::replay::{tcp as replay_tcp, udp as replay_udp, MismatchReport};
use packet_replay::script::{self, ScriptConversation};
use packet_replay::target_server::TargetServerRegistry;
use packet_replay::validator::{default_validator, ReplayContext};

fn main() {
    let args = Args::parse();
    init_tracing(args.verbose);

    match run(&args) {
        Ok(had_mismatch) => {
            if had_mismatch {
                std::process::exit(2);
            }
        }
        Err(e) => {
            tracing::error!("{e}");
            std::process::exit(1);
        }
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "packet_replay=info",
        1 => "packet_replay=debug",
        _ => "packet_replay=trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_level.into()),
        )
        .init();
}

fn run(args: &Args) -> Result<bool> {
    match &args.command {
        Command::Capture { file, out_dir } => run_capture(args, file, out_dir.as_deref()),
        Command::Replay { scripts } => run_replay(args, scripts),
    }
}

fn build_registry(specs: &[String]) -> Result<TargetServerRegistry> {
    let mut registry = TargetServerRegistry::new();
    for spec in specs {
        registry.add(spec)?;
    }
    Ok(registry)
}

fn run_capture(args: &Args, file: &Path, out_dir: Option<&Path>) -> Result<bool> {
    let mut store = ConversationStore::new();
    store.rules = build_registry(&args.target_server)?;

    let frames = capture::read_frames(file)?;
    let mut dropped = 0usize;
    for frame in &frames {
        match packet::dissect(frame.link_type, &frame.data) {
            Some(pkt) => store.ingest(&pkt)?,
            None => dropped += 1,
        }
    }

    tracing::info!(
        "ingested {} frame(s) into {} conversation(s), dropped {dropped}",
        frames.len(),
        store.len()
    );

    match out_dir {
        Some(out_dir) => write_scripts(&store, out_dir)?,
        None => print_summary(&store),
    }

    Ok(false)
}

fn write_scripts(store: &ConversationStore, out_dir: &Path) -> Result<()> {
    fs::create_dir_all(out_dir)?;
    for (index, (_key, conv)) in store.conversations().enumerate() {
        let base = conv.base();
        let protocol = match conv {
            ConversationKind::Tcp(_) => Protocol::Tcp,
            ConversationKind::Udp(_) => Protocol::Udp,
        };
        let script_conv = ScriptConversation {
            protocol,
            test_addr: base.test_sock_addr.ip(),
            test_port: base.test_sock_addr.port(),
            actions: base.action_queue.iter().cloned().collect(),
        };
        let text = script::write(&script_conv);
        let path = out_dir.join(format!("conversation-{index}.txt"));
        fs::write(&path, text)?;
    }
    println!(
        "wrote {} conversation script(s) to {}",
        store.len(),
        out_dir.display()
    );
    Ok(())
}

fn print_summary(store: &ConversationStore) {
    for (key, conv) in store.conversations() {
        println!(
            "{key}: {} action(s) -> {}",
            conv.base().action_queue.len(),
            conv.base().test_sock_addr
        );
    }
}

fn run_replay(args: &Args, scripts: &[PathBuf]) -> Result<bool> {
    let registry = build_registry(&args.target_server)?;
    let context = ReplayContext::new();
    let mut had_mismatch = false;

    for path in scripts {
        let (action_count, mismatches) = replay_script(path, &registry, &context)?;
        for m in &mismatches {
            had_mismatch = true;
            tracing::warn!(
                "{}: action {} mismatch: {}",
                path.display(),
                m.action_index,
                m.detail
            );
        }
        println!(
            "{}: {action_count} action(s) replayed, {} mismatch(es)",
            path.display(),
            mismatches.len()
        );
    }

    Ok(had_mismatch)
}

fn replay_script(
    path: &Path,
    registry: &TargetServerRegistry,
    context: &ReplayContext,
) -> Result<(usize, Vec<MismatchReport>)> {
    let text = fs::read(path)?;
    let conv = script::read(&text)?;
    let action_count = conv.actions.len();

    let rewrite = registry.lookup(&conv.test_addr.to_string(), conv.test_port);
    let test_addr = rewrite.and_then(|r| r.test_addr).unwrap_or(conv.test_addr);
    let test_port = rewrite.and_then(|r| r.test_port).unwrap_or(conv.test_port);
    let sock_addr = SocketAddr::new(test_addr, test_port);

    tracing::info!("replaying {} against {sock_addr}", path.display());

    let mut base = packet_replay::conversation::ConversationBase::for_replay(sock_addr);
    base.action_queue.extend(conv.actions);

    let mismatches = match conv.protocol {
        Protocol::Tcp => replay_tcp::replay(&mut base)?,
        Protocol::Udp => replay_udp::replay(&mut base, default_validator(), context)?,
    };

    Ok((action_count, mismatches))
}
