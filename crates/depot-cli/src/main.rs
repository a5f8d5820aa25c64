use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use depot_config::{DepotConfig, LoadedConfig};
use depot_db::{PgOrderStore, PgStockStore, SchemaCaps};
use depot_engine::{DepotEngine, ProductionBatch};
use depot_schemas::{AmmoKind, OrderStatus, RequiredSet, ResourceCategory, ResourceKey};
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "depot")]
#[command(about = "Depot stock + order admission CLI", long_about = None)]
struct Cli {
    /// Layered config YAML paths in merge order (base -> site -> overrides).
    /// Optional; defaults apply when omitted.
    #[arg(long = "config", global = true)]
    config_paths: Vec<String>,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Database commands
    Db {
        #[command(subcommand)]
        cmd: DbCmd,
    },

    /// Compute layered config hash + print canonical JSON
    ConfigHash,

    /// Order ledger commands
    Order {
        #[command(subcommand)]
        cmd: OrderCmd,
    },

    /// Stock ledger commands
    Stock {
        #[command(subcommand)]
        cmd: StockCmd,
    },

    /// Run one FIFO admission scan over the pending queue
    Scan,

    /// Audit trail utilities
    Audit {
        #[command(subcommand)]
        cmd: AuditCmd,
    },
}

#[derive(Subcommand)]
enum DbCmd {
    Status,

    /// Apply SQL migrations. Guardrail: refuses when any order holds a live
    /// reservation unless --yes is provided.
    Migrate {
        /// Acknowledge you are migrating a depot with live reservations.
        #[arg(long, default_value_t = false)]
        yes: bool,
    },

    /// Upsert the seed stock rows from the config into the ledger.
    Seed,
}

#[derive(Subcommand)]
enum OrderCmd {
    /// Create a new pending order.
    Create {
        /// Requirements as KIND=QTY (e.g. 9mm=30). Repeatable.
        #[arg(long = "require")]
        require: Vec<String>,
    },

    /// Update an order's requirements and/or status.
    Update {
        #[arg(long)]
        id: String,

        /// New requirements as KIND=QTY. Repeatable; omit to keep current.
        #[arg(long = "require")]
        require: Vec<String>,

        /// New status (pending | ready | delivered | cancelled).
        #[arg(long)]
        status: String,
    },

    /// Delete an order, releasing its reservation if it holds one.
    Delete {
        #[arg(long)]
        id: String,
    },

    Show {
        #[arg(long)]
        id: String,
    },

    List,
}

#[derive(Subcommand)]
enum StockCmd {
    /// Print all stock rows as JSON.
    Show,

    /// Apply a signed manual adjustment to one resource.
    Adjust {
        /// Resource as CATEGORY/NAME (e.g. material/Brass, ammo/9mm).
        #[arg(long)]
        resource: String,

        /// Signed delta in units (positive = credit, negative = debit).
        #[arg(long)]
        delta: i64,
    },

    /// Strictly-guarded withdrawal; never drives stock negative.
    Withdraw {
        #[arg(long)]
        resource: String,

        /// Units to withdraw (> 0).
        #[arg(long)]
        qty: i64,
    },

    /// Run a production batch: consume materials, credit finished ammo.
    Produce {
        /// Consumed resources as CATEGORY/NAME=QTY. Repeatable.
        #[arg(long = "consume")]
        consume: Vec<String>,

        /// Finished kind produced (e.g. 9mm).
        #[arg(long)]
        output: String,

        /// Units of output produced (> 0).
        #[arg(long)]
        units: i64,
    },
}

#[derive(Subcommand)]
enum AuditCmd {
    /// Append one event to a JSONL audit log.
    Emit {
        /// Audit log path.
        #[arg(long)]
        path: String,

        /// Topic (orders | stock | scan).
        #[arg(long)]
        topic: String,

        /// Event type (e.g. ADJUSTMENT, PROMOTION).
        #[arg(long = "type")]
        event_type: String,

        /// Payload JSON string.
        #[arg(long)]
        payload: String,

        /// Disable the hash chain.
        #[arg(long = "no-hash-chain", default_value_t = false)]
        no_hash_chain: bool,
    },

    /// Verify a JSONL audit log's hash chain.
    Verify {
        #[arg(long)]
        path: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env.local if present (dev convenience). Silent if missing.
    let _ = dotenvy::from_filename(".env.local");
    init_tracing();

    let cli = Cli::parse();
    let cfg = load_config(&cli.config_paths)?;

    match cli.cmd {
        Commands::Db { cmd } => {
            let pool = depot_db::connect_from_env().await?;
            match cmd {
                DbCmd::Status => {
                    let s = depot_db::status(&pool).await?;
                    println!("db_ok={} has_orders_table={}", s.ok, s.has_orders_table);
                }
                DbCmd::Migrate { yes } => {
                    let n = depot_db::count_reserved_orders(&pool).await?;
                    if n > 0 && !yes {
                        anyhow::bail!(
                            "REFUSING MIGRATE: detected {} order(s) holding live reservations. Re-run with: `depot db migrate --yes`",
                            n
                        );
                    }

                    depot_db::migrate(&pool).await?;
                    println!("migrations_applied=true");
                }
                DbCmd::Seed => {
                    let typed = typed_config(&cfg)?;
                    let caps = caps_from(&typed)?;
                    depot_db::seed_stock(&pool, &caps, &typed.seed.stock).await?;
                    println!("seeded_rows={}", typed.seed.stock.len());
                }
            }
        }

        Commands::ConfigHash => {
            let loaded = cfg.context("config-hash requires at least one --config path")?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
        }

        Commands::Order { cmd } => {
            let typed = typed_config(&cfg)?;
            let engine = engine_from_env(&cfg).await?;
            match cmd {
                OrderCmd::Create { require } => {
                    let required = parse_required(&require)?;
                    let record = engine.create_order(required).await?;
                    record_audit(
                        &typed,
                        "orders",
                        "CREATED",
                        serde_json::json!({ "id": record.id, "seq": record.seq }),
                    );
                    println!("order_created=true id={} seq={}", record.id, record.seq);
                    println!("{}", serde_json::to_string_pretty(&record)?);
                }
                OrderCmd::Update {
                    id,
                    require,
                    status,
                } => {
                    let id = parse_order_id(&id)?;
                    let new_required = if require.is_empty() {
                        None
                    } else {
                        Some(parse_required(&require)?)
                    };
                    let status = OrderStatus::parse(&status)
                        .with_context(|| format!("invalid status: {status}"))?;
                    let record = engine.update_order(id, new_required, status).await?;
                    record_audit(
                        &typed,
                        "orders",
                        "TRANSITION",
                        serde_json::json!({ "id": record.id, "status": record.status }),
                    );
                    println!("order_updated=true id={} status={}", record.id, record.status);
                    println!("{}", serde_json::to_string_pretty(&record)?);
                }
                OrderCmd::Delete { id } => {
                    let id = parse_order_id(&id)?;
                    engine.delete_order(id).await?;
                    record_audit(&typed, "orders", "DELETED", serde_json::json!({ "id": id }));
                    println!("order_deleted=true id={id}");
                }
                OrderCmd::Show { id } => {
                    let id = parse_order_id(&id)?;
                    let record = engine.get_order(id).await?;
                    println!("{}", serde_json::to_string_pretty(&record)?);
                }
                OrderCmd::List => {
                    let orders = engine.list_orders().await?;
                    println!("{}", serde_json::to_string_pretty(&orders)?);
                }
            }
        }

        Commands::Stock { cmd } => {
            let typed = typed_config(&cfg)?;
            let engine = engine_from_env(&cfg).await?;
            match cmd {
                StockCmd::Show => {
                    let rows = engine.stock_rows().await?;
                    println!("{}", serde_json::to_string_pretty(&rows)?);
                }
                StockCmd::Adjust { resource, delta } => {
                    let key = parse_resource(&resource)?;
                    engine.adjust_stock(&key, delta).await?;
                    record_audit(
                        &typed,
                        "stock",
                        "ADJUSTMENT",
                        serde_json::json!({ "resource": key.to_string(), "delta_units": delta }),
                    );
                    println!("stock_adjusted=true resource={key} delta_units={delta}");
                }
                StockCmd::Withdraw { resource, qty } => {
                    let key = parse_resource(&resource)?;
                    let remaining = engine.withdraw(&key, qty).await?;
                    record_audit(
                        &typed,
                        "stock",
                        "WITHDRAWAL",
                        serde_json::json!({
                            "resource": key.to_string(),
                            "qty": qty,
                            "remaining": remaining
                        }),
                    );
                    println!("withdrawn=true resource={key} qty={qty} remaining={remaining}");
                }
                StockCmd::Produce {
                    consume,
                    output,
                    units,
                } => {
                    let output = AmmoKind::parse(&output)
                        .with_context(|| format!("invalid ammo kind: {output}"))?;
                    let consumes = consume
                        .iter()
                        .map(|s| parse_consume(s))
                        .collect::<Result<Vec<_>>>()?;
                    engine
                        .produce(ProductionBatch {
                            consumes,
                            output,
                            output_units: units,
                        })
                        .await?;
                    record_audit(
                        &typed,
                        "stock",
                        "PRODUCTION",
                        serde_json::json!({ "output": output.as_str(), "units": units }),
                    );
                    println!("produced=true output={} units={units}", output.as_str());
                }
            }
        }

        Commands::Scan => {
            let typed = typed_config(&cfg)?;
            let engine = engine_from_env(&cfg).await?;
            let report = engine.run_admission_scan().await?;
            record_audit(
                &typed,
                "scan",
                "SWEEP",
                serde_json::json!({
                    "promoted": report.promoted,
                    "halted_at": report.halted_at,
                    "write_failures": report.write_failures
                }),
            );
            println!(
                "scan_done=true promoted={} write_failures={}",
                report.promoted.len(),
                report.write_failures
            );
            for id in &report.promoted {
                println!("promoted_order={id}");
            }
            if let Some(id) = report.halted_at {
                println!("halted_at={id}");
            }
        }

        Commands::Audit { cmd } => match cmd {
            AuditCmd::Emit {
                path,
                topic,
                event_type,
                payload,
                no_hash_chain,
            } => {
                let payload: Value =
                    serde_json::from_str(payload.trim()).context("--payload must be valid JSON")?;
                let depot_id = typed_config(&cfg)?.depot.depot_id;

                let mut writer = resume_audit_writer(&path, !no_hash_chain)?;
                let ev = writer.append(&depot_id, &topic, &event_type, payload)?;

                println!("audit_written=true path={path}");
                println!("event_id={}", ev.event_id);
                if let Some(h) = ev.hash_self {
                    println!("hash_self={h}");
                }
            }
            AuditCmd::Verify { path } => match depot_audit::verify_hash_chain(&path)? {
                depot_audit::VerifyResult::Valid { lines } => {
                    println!("chain_valid=true lines={lines}");
                }
                depot_audit::VerifyResult::Broken { line, reason } => {
                    anyhow::bail!("chain_valid=false line={line} reason={reason}");
                }
            },
        },
    }

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}

fn load_config(paths: &[String]) -> Result<Option<LoadedConfig>> {
    if paths.is_empty() {
        return Ok(None);
    }
    let refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
    Ok(Some(depot_config::load_layered_yaml(&refs)?))
}

fn typed_config(cfg: &Option<LoadedConfig>) -> Result<DepotConfig> {
    match cfg {
        Some(loaded) => DepotConfig::from_loaded(loaded),
        None => Ok(DepotConfig::default()),
    }
}

fn caps_from(typed: &DepotConfig) -> Result<SchemaCaps> {
    SchemaCaps::new(&typed.db.stock_quantity_column, &typed.db.stock_price_column)
}

async fn engine_from_env(cfg: &Option<LoadedConfig>) -> Result<DepotEngine> {
    let typed = typed_config(cfg)?;
    let caps = caps_from(&typed)?;
    let pool = depot_db::connect_from_env().await?;
    Ok(DepotEngine::new(
        Arc::new(PgStockStore::new(pool.clone(), caps)),
        Arc::new(PgOrderStore::new(pool)),
    ))
}

/// Append one event to the configured audit log, if any. Best-effort: the
/// mutation already succeeded, so a failed audit append is reported to
/// stderr and never fails the command.
fn record_audit(typed: &DepotConfig, topic: &str, event_type: &str, payload: Value) {
    let Some(path) = typed.audit.log_path.as_deref() else {
        return;
    };
    let result = resume_audit_writer(path, true)
        .and_then(|mut w| w.append(&typed.depot.depot_id, topic, event_type, payload));
    if let Err(err) = result {
        eprintln!("audit append failed: {err:#}");
    }
}

/// Open an audit writer, restoring chain state from the log's last line so
/// events appended across separate invocations stay on one chain.
fn resume_audit_writer(path: &str, hash_chain: bool) -> Result<depot_audit::AuditWriter> {
    let mut writer = depot_audit::AuditWriter::new(path, hash_chain)?;

    if let Ok(content) = std::fs::read_to_string(path) {
        let events: Vec<depot_audit::AuditEvent> = content
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(serde_json::from_str)
            .collect::<std::result::Result<_, _>>()
            .context("existing audit log has unparseable lines")?;
        if let Some(last) = events.last() {
            writer.set_last_hash(last.hash_self.clone());
            writer.set_seq(events.len() as u64);
        }
    }

    Ok(writer)
}

fn parse_order_id(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s).context("invalid order id uuid")
}

/// `KIND=QTY`, e.g. `9mm=30`.
fn parse_required(specs: &[String]) -> Result<RequiredSet> {
    let mut required = RequiredSet::new();
    for spec in specs {
        let (kind, qty) = spec
            .split_once('=')
            .with_context(|| format!("expected KIND=QTY, got {spec:?}"))?;
        let kind =
            AmmoKind::parse(kind.trim()).with_context(|| format!("invalid ammo kind: {kind}"))?;
        let qty: i64 = qty.trim().parse().with_context(|| format!("invalid qty in {spec:?}"))?;
        required.set(kind, qty);
    }
    Ok(required)
}

/// `CATEGORY/NAME`, e.g. `material/Brass` or `ammo/9mm`.
fn parse_resource(s: &str) -> Result<ResourceKey> {
    let (category, name) = s
        .split_once('/')
        .with_context(|| format!("expected CATEGORY/NAME, got {s:?}"))?;
    let category = ResourceCategory::parse(category.trim())
        .with_context(|| format!("invalid category: {category}"))?;
    let name = name.trim();
    if name.is_empty() {
        anyhow::bail!("empty resource name in {s:?}");
    }
    Ok(ResourceKey {
        category,
        name: name.to_string(),
    })
}

/// `CATEGORY/NAME=QTY`, e.g. `material/Brass=60`.
fn parse_consume(s: &str) -> Result<(ResourceKey, i64)> {
    let (resource, qty) = s
        .split_once('=')
        .with_context(|| format!("expected CATEGORY/NAME=QTY, got {s:?}"))?;
    let key = parse_resource(resource)?;
    let qty: i64 = qty.trim().parse().with_context(|| format!("invalid qty in {s:?}"))?;
    Ok((key, qty))
}
