//! Command execution.

use crate::Commands;
use colored::Colorize;
use exmdb_client::ExmdbClient;
use exmdb_protocol::requests::{LoadHierarchyTableRequest, QueryTableRequest};
use exmdb_protocol::tags::{self, private_fid, public_fid};
use exmdb_protocol::{util, PropvalList, TaggedPropval};
use serde::Serialize;

/// Code page sent with property calls.
const CPID_UTF8: u32 = 65001;

/// Per-invocation settings shared by all commands.
pub struct Session<'a> {
    pub homedir: &'a str,
    pub private: bool,
    pub json: bool,
}

/// Executes a command and returns the formatted output.
pub fn execute(
    client: &mut ExmdbClient,
    session: &Session<'_>,
    cmd: Commands,
) -> Result<String, Box<dyn std::error::Error>> {
    let homedir = session.homedir;
    match cmd {
        Commands::Ping => {
            client.ping_store(homedir)?;
            Ok("PONG".green().to_string())
        }

        Commands::AllocateCn => {
            let cn = client.allocate_cn(homedir)?;
            if session.json {
                return format_json(&cn);
            }
            Ok(format!("{} {:#x}", "Change number".bold(), cn))
        }

        Commands::StoreTags => {
            let proptags = client.get_store_all_proptags(homedir)?;
            if session.json {
                return format_json(&proptags);
            }
            if proptags.is_empty() {
                return Ok("No properties set".yellow().to_string());
            }
            Ok(proptags
                .iter()
                .map(|&tag| format_tag(tag))
                .collect::<Vec<_>>()
                .join("\n"))
        }

        Commands::StoreProps { tags } => {
            let proptags = parse_tags(&tags)?;
            let propvals = client.get_store_properties(homedir, CPID_UTF8, &proptags)?;
            if session.json {
                return format_json(&propvals);
            }
            Ok(format_propvals(&propvals))
        }

        Commands::FolderProps { folder, tags } => {
            let folder_id = parse_folder(&folder)?;
            let proptags = parse_tags(&tags)?;
            let propvals =
                client.get_folder_properties(homedir, CPID_UTF8, folder_id, &proptags)?;
            if session.json {
                return format_json(&propvals);
            }
            Ok(format_propvals(&propvals))
        }

        Commands::Hierarchy { folder } => {
            let parent = match folder {
                Some(folder) => parse_folder(&folder)?,
                None if session.private => util::make_eid_ex(1, private_fid::IPMSUBTREE),
                None => util::make_eid_ex(1, public_fid::IPMSUBTREE),
            };
            let rows = list_subfolders(client, homedir, parent)?;
            if session.json {
                return format_json(&rows);
            }
            if rows.is_empty() {
                return Ok("No subfolders".yellow().to_string());
            }
            Ok(rows
                .iter()
                .map(|row| format_row(row))
                .collect::<Vec<_>>()
                .join("\n"))
        }

        Commands::DeleteFolder { folder, hard } => {
            let folder_id = parse_folder(&folder)?;
            let deleted = client.delete_folder(homedir, CPID_UTF8, folder_id, hard)?;
            if session.json {
                return format_json(&deleted);
            }
            if deleted {
                Ok(format!("{} folder {:#x}", "Deleted".green(), folder_id))
            } else {
                Ok(format!("{} folder {:#x}", "Could not delete".yellow(), folder_id))
            }
        }
    }
}

/// Loads, reads and unloads the hierarchy table of `parent`.
fn list_subfolders(
    client: &mut ExmdbClient,
    homedir: &str,
    parent: u64,
) -> Result<Vec<PropvalList>, Box<dyn std::error::Error>> {
    let (table_id, row_count) =
        client.load_hierarchy_table(&LoadHierarchyTableRequest::new(homedir, parent, "", 0))?;
    tracing::debug!("Loaded hierarchy table {} with {} rows", table_id, row_count);

    let proptags = [tags::FOLDERID, tags::DISPLAYNAME, tags::CONTENTCOUNT];
    let rows = client.query_table(&QueryTableRequest {
        homedir,
        username: "",
        cpid: CPID_UTF8,
        table_id,
        proptags: &proptags,
        start_pos: 0,
        row_needed: row_count,
    });
    client.unload_table(homedir, table_id)?;
    Ok(rows?)
}

fn parse_tags(args: &[String]) -> Result<Vec<u32>, String> {
    args.iter()
        .map(|arg| tags::parse(arg).ok_or_else(|| format!("unknown property tag '{}'", arg)))
        .collect()
}

/// Folder ids are given as plain numbers and sent as replica 1 entry ids.
fn parse_folder(arg: &str) -> Result<u64, String> {
    let value = match arg.strip_prefix("0x").or_else(|| arg.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => arg.parse(),
    }
    .map_err(|_| format!("invalid folder id '{}'", arg))?;
    Ok(util::make_eid_ex(1, value))
}

fn format_tag(tag: u32) -> String {
    match tags::name(tag) {
        Some(name) => format!("{:#010x} {}", tag, name.cyan()),
        None => format!("{:#010x}", tag),
    }
}

fn format_propvals(propvals: &[TaggedPropval<'_>]) -> String {
    if propvals.is_empty() {
        return "No properties returned".yellow().to_string();
    }
    propvals
        .iter()
        .map(|propval| format!("{} = {}", format_tag(propval.tag), propval.print_value()))
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_row(row: &[TaggedPropval<'_>]) -> String {
    let find = |tag: u32| row.iter().find(|propval| propval.tag == tag);
    let id = find(tags::FOLDERID)
        .and_then(TaggedPropval::as_u64)
        .map(|eid| format!("{:#x}", util::eid_value(eid)))
        .unwrap_or_else(|| "?".to_string());
    let name = find(tags::DISPLAYNAME)
        .and_then(TaggedPropval::as_str)
        .unwrap_or("");
    let count = find(tags::CONTENTCOUNT)
        .and_then(TaggedPropval::as_u64)
        .unwrap_or(0);
    format!("{:>8}  {} ({})", id.dimmed(), name.bold(), count)
}

fn format_json<T: Serialize + ?Sized>(value: &T) -> Result<String, Box<dyn std::error::Error>> {
    Ok(serde_json::to_string_pretty(value)?)
}
