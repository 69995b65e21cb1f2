//! Command implementations for flowlock.
//!
//! This module provides the dispatcher that routes CLI commands to their
//! implementations. Every command works on the file-backed cache named by
//! the resolved configuration.

use crate::cli::{Cli, Command, LockAction, LockClearArgs, LockCommand};
use flowlock::cache::{CacheEntryInfo, FileCache};
use flowlock::config::Config;
use flowlock::error::{FlowLockError, Result};
use flowlock::process::{self, FlowType, ProcessKey};
use std::path::Path;
use tracing::info;

/// Resolved configuration and the cache it points at.
struct Context {
    config: Config,
    cache: FileCache,
}

impl Context {
    /// Resolve the config file and cache directory against `cwd`.
    ///
    /// An explicit `cache_dir` wins over the configured one.
    fn resolve(config_path: Option<&Path>, cache_dir: Option<&Path>, cwd: &Path) -> Result<Self> {
        let config = Config::resolve(config_path, cwd)?;
        let dir = match cache_dir {
            Some(dir) if dir.is_absolute() => dir.to_path_buf(),
            Some(dir) => cwd.join(dir),
            None => config.cache_dir_in(cwd),
        };
        Ok(Self {
            config,
            cache: FileCache::new(dir),
        })
    }

    /// Cache key of the lock guarding `flow`/`key`.
    ///
    /// `string_key` keeps an all-digit key as a string (`"007"` stays
    /// `007` instead of becoming `7`).
    fn lock_key(&self, flow: &str, key: &str, string_key: bool) -> String {
        let key = if string_key {
            ProcessKey::from(key)
        } else {
            ProcessKey::parse(key)
        };
        process::lock_key(self.config.lock.key_prefix(), &FlowType::new(flow), &key)
    }
}

/// Dispatch a command to its implementation.
///
/// This is the main entry point for command execution. Each command
/// is routed to its handler function.
pub fn dispatch(cli: Cli) -> Result<()> {
    let cwd = std::env::current_dir().map_err(|e| {
        FlowLockError::UserError(format!("cannot determine current directory: {}", e))
    })?;
    let ctx = Context::resolve(cli.config.as_deref(), cli.cache_dir.as_deref(), &cwd)?;
    run(cli.command, &ctx)
}

fn run(command: Command, ctx: &Context) -> Result<()> {
    match command {
        Command::Lock(lock_cmd) => dispatch_lock(lock_cmd, ctx),
        Command::Config => cmd_config(ctx),
    }
}

/// Dispatch lock subcommands.
fn dispatch_lock(lock_cmd: LockCommand, ctx: &Context) -> Result<()> {
    match lock_cmd.action {
        LockAction::List => cmd_lock_list(ctx),
        LockAction::Clear(args) => cmd_lock_clear(args, ctx).map(|_| ()),
        LockAction::Purge => cmd_lock_purge(ctx).map(|_| ()),
    }
}

// ============================================================================
// Command Implementations
// ============================================================================

fn cmd_config(ctx: &Context) -> Result<()> {
    print!("{}", ctx.config.to_yaml()?);
    Ok(())
}

fn cmd_lock_list(ctx: &Context) -> Result<()> {
    let entries = ctx.cache.list_entries()?;

    if entries.is_empty() {
        println!("No active locks in {}.", ctx.cache.dir().display());
        return Ok(());
    }

    println!("Active locks ({}):", entries.len());
    println!();

    for entry in &entries {
        print_entry(entry, "  ");
        println!();
    }

    // Summary
    let expired_count = entries.iter().filter(|e| e.is_expired).count();
    if expired_count > 0 {
        println!(
            "Note: {} lock(s) have expired. Use `flowlock lock purge` to remove them.",
            expired_count
        );
    }

    Ok(())
}

fn cmd_lock_clear(args: LockClearArgs, ctx: &Context) -> Result<CacheEntryInfo> {
    // Require --force flag
    if !args.force {
        return Err(FlowLockError::UserError(format!(
            "refusing to clear lock without --force flag.\n\n\
             Clearing a lock lets a second worker run the same process concurrently\n\
             if the lock holder is still active. Only clear locks if you are certain\n\
             the lock holder has crashed.\n\n\
             To clear the lock, run:\n  flowlock lock clear {} {}{} --force",
            args.flow,
            args.key,
            if args.string_key { " --string-key" } else { "" }
        )));
    }

    let key = ctx.lock_key(&args.flow, &args.key, args.string_key);
    let cleared = ctx.cache.clear(&key)?;

    info!(
        key = %cleared.metadata.key,
        owner = %cleared.metadata.owner,
        expired = cleared.is_expired,
        "cleared cache lock"
    );

    println!("Cleared lock: {}", cleared.metadata.key);
    println!();
    println!("Lock details:");
    print_entry(&cleared, "");

    Ok(cleared)
}

fn cmd_lock_purge(ctx: &Context) -> Result<Vec<CacheEntryInfo>> {
    let purged = ctx.cache.purge_expired()?;

    if purged.is_empty() {
        println!("No expired locks.");
    } else {
        println!("Purged {} expired lock(s):", purged.len());
        for entry in &purged {
            println!("  {}", entry);
        }
    }

    Ok(purged)
}

fn print_entry(entry: &CacheEntryInfo, indent: &str) {
    let meta = &entry.metadata;
    println!("{}{}:", indent, meta.key);
    println!("{}  Owner:      {}", indent, meta.owner);
    if let Some(pid) = meta.pid {
        println!("{}  PID:        {}", indent, pid);
    }
    println!("{}  Created:    {}", indent, meta.created_at.format("%Y-%m-%d %H:%M:%S UTC"));
    println!("{}  Age:        {}", indent, meta.age_string());
    println!("{}  Expires:    {}", indent, meta.expires_at.format("%Y-%m-%d %H:%M:%S UTC"));
    if entry.is_expired {
        println!("{}  Status:     EXPIRED", indent);
    }
    println!("{}  Path:       {}", indent, entry.path.display());
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowlock::cache::Cache;
    use flowlock::exit_codes;
    use std::path::PathBuf;
    use std::time::Duration;
    use tempfile::TempDir;

    fn context_in(temp_dir: &TempDir) -> Context {
        Context::resolve(None, None, temp_dir.path()).unwrap()
    }

    fn clear_args(flow: &str, key: &str, force: bool) -> LockClearArgs {
        LockClearArgs {
            flow: flow.to_string(),
            key: key.to_string(),
            string_key: false,
            force,
        }
    }

    #[test]
    fn context_uses_default_cache_dir() {
        let temp_dir = TempDir::new().unwrap();
        let ctx = context_in(&temp_dir);
        assert_eq!(ctx.cache.dir(), temp_dir.path().join(".flowlock/cache"));
    }

    #[test]
    fn context_reads_config_file_and_cache_override() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(
            temp_dir.path().join("flowlock.yaml"),
            "lock:\n  kind: cache_lock\n  key_prefix: wf\ncache_dir: shared/locks\n",
        )
        .unwrap();

        let ctx = context_in(&temp_dir);
        assert_eq!(ctx.cache.dir(), temp_dir.path().join("shared/locks"));
        assert_eq!(ctx.lock_key("helpdesk", "42", false), "wf-helpdesk/42");

        let ctx =
            Context::resolve(None, Some(Path::new("other")), temp_dir.path()).unwrap();
        assert_eq!(ctx.cache.dir(), temp_dir.path().join("other"));
    }

    #[test]
    fn context_fails_for_missing_explicit_config() {
        let temp_dir = TempDir::new().unwrap();
        let missing = PathBuf::from("/nonexistent/flowlock.yaml");
        let err = Context::resolve(Some(&missing), None, temp_dir.path()).err().unwrap();
        assert_eq!(err.exit_code(), exit_codes::USER_ERROR);
    }

    #[test]
    fn lock_list_succeeds_on_empty_cache() {
        let temp_dir = TempDir::new().unwrap();
        assert!(cmd_lock_list(&context_in(&temp_dir)).is_ok());
    }

    #[test]
    fn lock_clear_requires_force() {
        let temp_dir = TempDir::new().unwrap();
        let ctx = context_in(&temp_dir);
        ctx.cache
            .add("lock-helpdesk/42", "worker", Duration::from_secs(120))
            .unwrap();

        let err = cmd_lock_clear(clear_args("helpdesk", "42", false), &ctx).unwrap_err();
        assert_eq!(err.exit_code(), exit_codes::USER_ERROR);
        assert!(err.to_string().contains("--force"));
        assert_eq!(ctx.cache.list_entries().unwrap().len(), 1);
    }

    #[test]
    fn lock_clear_with_force_removes_entry() {
        let temp_dir = TempDir::new().unwrap();
        let ctx = context_in(&temp_dir);
        ctx.cache
            .add("lock-helpdesk/42", "worker", Duration::from_secs(120))
            .unwrap();

        let cleared = cmd_lock_clear(clear_args("helpdesk", "42", true), &ctx).unwrap();
        assert_eq!(cleared.metadata.key, "lock-helpdesk/42");
        assert!(!cleared.is_expired);
        assert!(ctx.cache.list_entries().unwrap().is_empty());
    }

    #[test]
    fn lock_clear_missing_entry_is_user_error() {
        let temp_dir = TempDir::new().unwrap();
        let ctx = context_in(&temp_dir);
        let err = cmd_lock_clear(clear_args("helpdesk", "7", true), &ctx).unwrap_err();
        assert_eq!(err.exit_code(), exit_codes::USER_ERROR);
    }

    #[test]
    fn lock_purge_removes_only_expired_entries() {
        let temp_dir = TempDir::new().unwrap();
        let ctx = context_in(&temp_dir);
        ctx.cache
            .add("lock-helpdesk/1", "crashed", Duration::ZERO)
            .unwrap();
        ctx.cache
            .add("lock-helpdesk/2", "alive", Duration::from_secs(120))
            .unwrap();

        let purged = cmd_lock_purge(&ctx).unwrap();
        assert_eq!(purged.len(), 1);
        assert_eq!(purged[0].metadata.key, "lock-helpdesk/1");

        let remaining = ctx.cache.list_entries().unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].metadata.key, "lock-helpdesk/2");
    }

    #[test]
    fn config_command_prints_yaml() {
        let temp_dir = TempDir::new().unwrap();
        assert!(run(Command::Config, &context_in(&temp_dir)).is_ok());
    }

    #[test]
    fn lock_clear_keeps_leading_zeros_with_string_key() {
        let temp_dir = TempDir::new().unwrap();
        let ctx = context_in(&temp_dir);
        assert_eq!(ctx.lock_key("helpdesk", "007", false), "lock-helpdesk/7");
        assert_eq!(ctx.lock_key("helpdesk", "007", true), "lock-helpdesk/007");

        ctx.cache
            .add("lock-helpdesk/007", "worker", Duration::from_secs(120))
            .unwrap();

        let err = cmd_lock_clear(clear_args("helpdesk", "007", true), &ctx).unwrap_err();
        assert_eq!(err.exit_code(), exit_codes::USER_ERROR);

        let mut args = clear_args("helpdesk", "007", true);
        args.string_key = true;
        let cleared = cmd_lock_clear(args, &ctx).unwrap();
        assert_eq!(cleared.metadata.key, "lock-helpdesk/007");
        assert!(ctx.cache.list_entries().unwrap().is_empty());
    }
}
