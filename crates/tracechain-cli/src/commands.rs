use std::sync::Arc;

use anyhow::{bail, Context};
use colored::Colorize;
use serde::Serialize;
use tracechain_ledger::{Ledger, VerificationReport};
use tracechain_server::{ServerConfig, TracechainServer};
use tracechain_store::JournalStore;
use tracechain_types::{BatchId, Block, NewEvent, Payload};

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(&cli)?;
    let format = cli.format;
    match cli.command {
        Command::Init => cmd_init(&config, format),
        Command::Record(args) => cmd_record(&config, format, args),
        Command::Actor(ActorArgs {
            action: ActorAction::Add { name },
        }) => cmd_actor_add(&config, format, &name),
        Command::Verify => cmd_verify(&config, format),
        Command::History(args) => cmd_history(&config, format, &args.batch),
        Command::Audit(args) => cmd_audit(&config, format, &args.batch),
        Command::Blocks(args) => cmd_blocks(&config, format, args),
        Command::Show(args) => cmd_show(&config, format, args.index),
        Command::Proof(args) => cmd_proof(&config, format, args),
        Command::Serve(args) => cmd_serve(config, args),
    }
}

/// Config file (if any) with `--data-dir` applied on top.
fn load_config(cli: &Cli) -> anyhow::Result<ServerConfig> {
    let mut config = match &cli.config {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::default(),
    };
    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.clone();
    }
    Ok(config)
}

fn open_ledger(config: &ServerConfig) -> anyhow::Result<Ledger<JournalStore>> {
    let store = JournalStore::open_dir(&config.data_dir, config.journal_options())
        .with_context(|| format!("opening ledger in {}", config.data_dir.display()))?;
    Ok(Ledger::new(Arc::new(store), config.ledger.clone()))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn batch_id(raw: &str) -> anyhow::Result<BatchId> {
    Ok(BatchId::new(raw)?)
}

fn cmd_init(config: &ServerConfig, format: OutputFormat) -> anyhow::Result<()> {
    let ledger = open_ledger(config)?;
    let blocks = ledger.block_count()?;
    let journal = ledger.store().path().display().to_string();
    if format == OutputFormat::Json {
        return print_json(&serde_json::json!({ "journal": journal, "blocks": blocks }));
    }
    println!("{} Initialized Tracechain ledger in {}", "✓".green().bold(), journal.bold());
    println!("  Blocks: {}", blocks.to_string().cyan());
    println!("  Signer: {}", config.ledger.signer.yellow());
    Ok(())
}

fn cmd_record(config: &ServerConfig, format: OutputFormat, args: RecordArgs) -> anyhow::Result<()> {
    let batch = batch_id(&args.batch)?;
    let payload: Payload = match &args.payload {
        Some(raw) => serde_json::from_str(raw).context("--payload must be a JSON object")?,
        None => Payload::new(),
    };
    let actor_id = args.actor.unwrap_or_default();
    let events = args
        .event_types
        .into_iter()
        .map(|event_type| NewEvent {
            batch_id: batch.clone(),
            event_type,
            payload: payload.clone(),
            actor_id,
        })
        .collect();

    let outcome = open_ledger(config)?.record(events)?;
    if format == OutputFormat::Json {
        return print_json(&outcome);
    }
    println!(
        "{} Block {} {} committed {} event(s)",
        "✓".green().bold(),
        format!("#{}", outcome.block.index).yellow().bold(),
        outcome.block.short_hash().dimmed(),
        outcome.events.len()
    );
    for event in &outcome.events {
        println!("  {} {} {}", event.id.to_string().cyan(), event.event_type, event.batch_id);
    }
    Ok(())
}

fn cmd_actor_add(config: &ServerConfig, format: OutputFormat, name: &str) -> anyhow::Result<()> {
    if name.trim().is_empty() {
        bail!("actor name must not be empty");
    }
    let actor = open_ledger(config)?.register_actor(name)?;
    if format == OutputFormat::Json {
        return print_json(&actor);
    }
    println!("{} Registered {} as {}", "✓".green().bold(), actor.name.bold(), actor.id.to_string().cyan());
    Ok(())
}

fn cmd_verify(config: &ServerConfig, format: OutputFormat) -> anyhow::Result<()> {
    let report = open_ledger(config)?.verify()?;
    if format == OutputFormat::Json {
        print_json(&report)?;
    } else {
        print_report(&report);
    }
    if !report.ok {
        bail!("chain verification found {} issue(s)", report.issues.len());
    }
    Ok(())
}

fn print_report(report: &VerificationReport) {
    if report.ok {
        println!(
            "{} Chain intact: {} block(s) verified",
            "✓".green().bold(),
            report.blocks_checked
        );
        return;
    }
    println!(
        "{} {} issue(s) in {} block(s)",
        "✗".red().bold(),
        report.issues.len(),
        report.blocks_checked
    );
    for issue in &report.issues {
        println!("  {}", issue.to_string().red());
    }
}

fn cmd_history(config: &ServerConfig, format: OutputFormat, batch: &str) -> anyhow::Result<()> {
    let batch = batch_id(batch)?;
    let timeline = open_ledger(config)?.history(&batch)?;
    if format == OutputFormat::Json {
        return print_json(&timeline);
    }
    if timeline.is_empty() {
        println!("No events for batch {}.", batch.to_string().yellow());
        return Ok(());
    }
    println!("History of {}", batch.to_string().yellow().bold());
    for entry in &timeline {
        print!(
            "  {}  {:<16} by {}",
            entry.occurred_at.to_string().dimmed(),
            entry.event_type.to_string().cyan(),
            entry.actor_name.bold()
        );
        if entry.payload.is_empty() {
            println!();
        } else {
            println!("  {}", serde_json::Value::Object(entry.payload.clone()));
        }
    }
    Ok(())
}

fn cmd_audit(config: &ServerConfig, format: OutputFormat, batch: &str) -> anyhow::Result<()> {
    let batch = batch_id(batch)?;
    let trail = open_ledger(config)?.audit(&batch)?;
    if format == OutputFormat::Json {
        return print_json(&trail);
    }
    println!("Audit trail of {}", batch.to_string().yellow().bold());
    for entry in &trail {
        let committed = match &entry.block {
            Some(block) => {
                let short = block.hash.get(..8).unwrap_or(&block.hash);
                format!("block #{} {short}", block.index).green().to_string()
            }
            None => "pending".yellow().to_string(),
        };
        println!(
            "  {}  {}  {:<16} {}",
            entry.event.id.short_id().cyan(),
            entry.event.timestamp.to_string().dimmed(),
            entry.event.event_type.to_string(),
            committed
        );
    }
    Ok(())
}

fn cmd_blocks(config: &ServerConfig, format: OutputFormat, args: BlocksArgs) -> anyhow::Result<()> {
    let page = open_ledger(config)?.blocks_page(args.page, args.limit)?;
    if format == OutputFormat::Json {
        return print_json(&page);
    }
    for block in &page.blocks {
        println!(
            "{}  {}  {}  {} event(s)",
            format!("#{}", block.index).yellow().bold(),
            block.short_hash().dimmed(),
            block.timestamp,
            block.event_ids.len()
        );
    }
    let p = page.pagination;
    println!(
        "Page {} of {} ({} block(s){})",
        p.page,
        p.total_pages.max(1),
        p.total_count,
        if p.has_more { ", more available" } else { "" }
    );
    Ok(())
}

fn cmd_show(config: &ServerConfig, format: OutputFormat, index: u64) -> anyhow::Result<()> {
    let Some(block) = open_ledger(config)?.block_at(index)? else {
        bail!("no block with index {index}");
    };
    if format == OutputFormat::Json {
        return print_json(&block);
    }
    print_block(&block);
    Ok(())
}

fn print_block(block: &Block) {
    println!("Block {}", format!("#{}", block.index).yellow().bold());
    println!("  Id:          {}", block.id);
    println!("  Timestamp:   {}", block.timestamp);
    println!("  Prev hash:   {}", block.prev_hash.dimmed());
    println!("  Merkle root: {}", block.merkle_root);
    println!("  Hash:        {}", block.hash.bold());
    println!("  Signer:      {}", block.signer);
    println!("  Events:");
    for id in &block.event_ids {
        println!("    {}", id.to_string().cyan());
    }
}

fn cmd_proof(config: &ServerConfig, format: OutputFormat, args: ProofArgs) -> anyhow::Result<()> {
    let proof = open_ledger(config)?.prove_event(&args.event)?;
    if format == OutputFormat::Json {
        return print_json(&proof);
    }
    let status = if proof.verified {
        "✓ verified".green().bold()
    } else {
        "✗ does not match block".red().bold()
    };
    println!("Event {} in block #{}: {}", proof.event_id.to_string().cyan(), proof.block.index, status);
    println!("  Leaf {}: {}", proof.leaf_index, proof.leaf_input.dimmed());
    for (sibling, side) in &proof.proof.path {
        println!("  {:<5} {}", format!("{side:?}").to_lowercase(), sibling);
    }
    println!("  Root: {}", proof.merkle_root.bold());
    Ok(())
}

fn cmd_serve(mut config: ServerConfig, args: ServeArgs) -> anyhow::Result<()> {
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    let server = TracechainServer::open(config)?;
    let runtime = tokio::runtime::Runtime::new().context("starting async runtime")?;
    runtime.block_on(server.serve())?;
    Ok(())
}
