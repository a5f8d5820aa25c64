//! Layered YAML configuration for the depot.
//!
//! Config is loaded as ordered YAML layers (base first, overrides later),
//! deep-merged into one JSON document, canonicalized, and hashed. The hash
//! is the identity the CLI and daemon report, so two deployments can prove
//! they run the same effective config.
//!
//! Secrets never live in config files: any leaf string that looks like a
//! credential aborts the load. Database credentials come from the
//! environment (`DEPOT_DATABASE_URL`).

use anyhow::{bail, Context, Result};
use depot_schemas::StockRow;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs;

/// Known secret-like prefixes. If any leaf string value in the effective
/// config starts with one of these, the load aborts with
/// CONFIG_SECRET_DETECTED.
const SECRET_PREFIXES: &[&str] = &[
    "sk-",        // Stripe / OpenAI style
    "sk_live",    // Stripe live
    "sk_test",    // Stripe test
    "AKIA",       // AWS access key ID
    "-----BEGIN", // PEM private keys
    "ghp_",       // GitHub PAT
    "gho_",       // GitHub OAuth
    "glpat-",     // GitLab PAT
    "xoxb-",      // Slack bot token
    "xoxp-",      // Slack user token
];

// ---------------------------------------------------------------------------
// Loading + hashing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config_hash: String,
    pub canonical_json: String,
    pub config_json: Value,
}

pub fn load_layered_yaml(paths: &[&str]) -> Result<LoadedConfig> {
    let mut docs: Vec<String> = Vec::new();
    for p in paths {
        let raw =
            fs::read_to_string(p).with_context(|| format!("failed to read yaml path: {p}"))?;
        docs.push(raw);
    }

    let doc_refs: Vec<&str> = docs.iter().map(|s| s.as_str()).collect();
    load_layered_yaml_from_strings(&doc_refs)
}

pub fn load_layered_yaml_from_strings(yaml_docs: &[&str]) -> Result<LoadedConfig> {
    // Merge YAML docs in order: earlier docs are base, later docs override.
    let mut merged = serde_json::json!({});
    for raw in yaml_docs {
        let v_yaml: serde_yaml::Value = serde_yaml::from_str(raw).context("invalid yaml")?;
        let v_json = serde_json::to_value(v_yaml).context("yaml->json conversion failed")?;
        merged = deep_merge(merged, v_json);
    }

    enforce_no_secret_literals(&merged)?;

    let canonical_json = canonicalize_json(&merged)?;
    let config_hash = sha256_hex(canonical_json.as_bytes());
    Ok(LoadedConfig {
        config_hash,
        canonical_json,
        config_json: merged,
    })
}

fn deep_merge(a: Value, b: Value) -> Value {
    match (a, b) {
        (Value::Object(mut a_map), Value::Object(b_map)) => {
            for (k, b_val) in b_map {
                let a_val = a_map.remove(&k).unwrap_or(Value::Null);
                a_map.insert(k, deep_merge(a_val, b_val));
            }
            Value::Object(a_map)
        }
        (_, b_other) => b_other,
    }
}

fn canonicalize_json(v: &Value) -> Result<String> {
    // serde_json's default Map is ordered, so serializing the merged value
    // compactly yields a stable byte string for hashing.
    let s = serde_json::to_string(v).context("canonical json serialize failed")?;
    Ok(s)
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

// ---------------------------------------------------------------------------
// Secret literal guard
// ---------------------------------------------------------------------------

fn enforce_no_secret_literals(v: &Value) -> Result<()> {
    let mut leaves = Vec::new();
    collect_leaf_pointers(v, "", &mut leaves);

    for ptr in leaves {
        if let Some(s) = v.pointer(&ptr).and_then(|val| val.as_str()) {
            if looks_like_secret(s) {
                bail!("CONFIG_SECRET_DETECTED leaf={} value=REDACTED", ptr);
            }
        }
    }
    Ok(())
}

fn looks_like_secret(s: &str) -> bool {
    let t = s.trim();
    if t.len() < 8 {
        return false;
    }
    SECRET_PREFIXES.iter().any(|p| t.starts_with(p))
}

fn collect_leaf_pointers(v: &Value, prefix: &str, out: &mut Vec<String>) {
    match v {
        Value::Object(map) => {
            for (k, vv) in map.iter() {
                let next = format!("{}/{}", prefix, escape_pointer_token(k));
                collect_leaf_pointers(vv, &next, out);
            }
        }
        Value::Array(arr) => {
            for (i, vv) in arr.iter().enumerate() {
                let next = format!("{}/{}", prefix, i);
                collect_leaf_pointers(vv, &next, out);
            }
        }
        _ => {
            let p = if prefix.is_empty() {
                "/".to_string()
            } else {
                prefix.to_string()
            };
            out.push(p);
        }
    }
}

fn escape_pointer_token(s: &str) -> String {
    s.replace('~', "~0").replace('/', "~1")
}

// ---------------------------------------------------------------------------
// Typed view
// ---------------------------------------------------------------------------

/// The typed sections the depot binaries actually read. Unknown keys are
/// tolerated (layers may carry sections for other tooling).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DepotConfig {
    #[serde(default)]
    pub depot: DepotSection,
    #[serde(default)]
    pub daemon: DaemonSection,
    #[serde(default)]
    pub db: DbSection,
    #[serde(default)]
    pub seed: SeedSection,
    #[serde(default)]
    pub audit: AuditSection,
}

impl DepotConfig {
    pub fn from_loaded(loaded: &LoadedConfig) -> Result<Self> {
        serde_json::from_value(loaded.config_json.clone()).context("typed config extraction failed")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepotSection {
    #[serde(default = "default_depot_id")]
    pub depot_id: String,
}

impl Default for DepotSection {
    fn default() -> Self {
        Self {
            depot_id: default_depot_id(),
        }
    }
}

fn default_depot_id() -> String {
    "MAIN".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonSection {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

impl Default for DaemonSection {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

fn default_bind_addr() -> String {
    "127.0.0.1:8788".to_string()
}

/// Column names of the stock table. Legacy schemas named the quantity and
/// price columns differently; the persistence layer builds its SQL from
/// these.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DbSection {
    #[serde(default = "default_quantity_column")]
    pub stock_quantity_column: String,
    #[serde(default = "default_price_column")]
    pub stock_price_column: String,
}

impl Default for DbSection {
    fn default() -> Self {
        Self {
            stock_quantity_column: default_quantity_column(),
            stock_price_column: default_price_column(),
        }
    }
}

fn default_quantity_column() -> String {
    "quantity".to_string()
}

fn default_price_column() -> String {
    "unit_price_micros".to_string()
}

/// Initial stock rows `db seed` writes into an empty ledger.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeedSection {
    #[serde(default)]
    pub stock: Vec<StockRow>,
}

/// Audit trail settings. When `log_path` is set, mutating CLI commands
/// append their outcome to that JSONL log.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditSection {
    #[serde(default)]
    pub log_path: Option<String>,
}
