use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use std::collections::{HashMap, HashSet};

use couchbench::Record;

#[derive(Parser, Debug)]
#[command(term_width = 0)]
pub struct Args {
    /// Adapter property as key=value (e.g. couchdb.host=10.0.0.5, batchsize=500)
    #[arg(short = 'p', long = "property", value_parser = parse_key_value)]
    pub properties: Vec<(String, String)>,

    /// Table name passed through to the client (not used for routing)
    #[arg(long, default_value = "usertable")]
    pub table: String,

    /// Number of runtime worker threads
    #[arg(long, default_value = "1")]
    pub worker_threads: u32,

    /// Stack size for runtime threads in bytes
    #[arg(long)]
    pub thread_stack_size: Option<usize>,

    /// Upper bound on the blocking pool used for store requests
    #[arg(long)]
    pub max_blocking_threads: Option<usize>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Read one record
    Read {
        #[arg(long)]
        key: String,
        /// Field to return (repeatable). Without any, only _id and _rev are returned
        #[arg(long = "field")]
        fields: Vec<String>,
    },
    /// Scan records in id order
    Scan {
        #[arg(long)]
        start_key: String,
        #[arg(long, default_value = "10")]
        count: usize,
        /// Field to return (repeatable). Without any, whole documents are returned
        #[arg(long = "field")]
        fields: Vec<String>,
    },
    /// Insert a record
    Insert {
        #[arg(long)]
        key: String,
        /// Field value as name=value (repeatable)
        #[arg(long = "value", value_parser = parse_key_value)]
        values: Vec<(String, String)>,
    },
    /// Overwrite fields of an existing record
    Update {
        #[arg(long)]
        key: String,
        /// Field value as name=value (repeatable)
        #[arg(long = "value", value_parser = parse_key_value)]
        values: Vec<(String, String)>,
    },
    /// Delete a record
    Delete {
        #[arg(long)]
        key: String,
    },
}

impl Args {
    pub fn property_map(&self) -> HashMap<String, String> {
        self.properties.iter().cloned().collect()
    }
}

pub fn projection(fields: &[String]) -> Option<HashSet<String>> {
    if fields.is_empty() {
        None
    } else {
        Some(fields.iter().cloned().collect())
    }
}

pub fn record(values: &[(String, String)]) -> Record {
    values
        .iter()
        .map(|(k, v)| (k.clone(), v.clone().into_bytes()))
        .collect()
}

fn parse_key_value(s: &str) -> Result<(String, String)> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| anyhow!("expected key=value, got '{}'", s))?;
    if key.is_empty() {
        return Err(anyhow!("empty key in '{}'", s));
    }
    Ok((key.to_string(), value.to_string()))
}
