//! Command Handler
//!
//! Maps each [`CommandKind`] to its handler, validates arguments and calls
//! the storage engine.
//!
//! ## Supported Commands
//!
//! - `PING` - replies `PONG`
//! - `SET key value [ttl-seconds]` - a TTL that is not an integer is ignored
//! - `GET key` - value or nil
//! - `DEL key [key ...]` - number of keys removed
//! - `EXPIRE key seconds` - always replies 1
//! - `KEYS pattern` - every live key; the pattern is not applied
//! - `ZADD key score member [score member ...]` - number of pairs applied
//! - `ZRANGE key start stop [WITHSCORES]` - members in ascending score order
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     CommandHandler                          │
//! │                                                             │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐      │
//! │  │  Command    │───>│  dispatch() │───>│  cmd_*()    │      │
//! │  └─────────────┘    └─────────────┘    └─────────────┘      │
//! │                                               │             │
//! │                                               ▼             │
//! │                                      StorageEngine          │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! The handler owns the engine outright; it is meant to live inside the
//! dispatcher's event loop and nowhere else.

use crate::commands::command::{Command, CommandError, CommandKind};
use crate::protocol::RespValue;
use crate::storage::{deadline_after, CleanupReport, StorageEngine, StorageStats};
use bytes::Bytes;
use std::time::Instant;

type CommandResult = Result<RespValue, CommandError>;

/// Executes commands against the storage engine it owns.
#[derive(Debug, Default)]
pub struct CommandHandler {
    storage: StorageEngine,
}

impl CommandHandler {
    pub fn new(storage: StorageEngine) -> Self {
        Self { storage }
    }

    /// Decodes a request frame and executes it.
    pub fn execute_frame(&mut self, frame: RespValue) -> RespValue {
        match Command::from_frame(frame) {
            Ok(command) => self.execute(command),
            Err(err) => err.into(),
        }
    }

    /// Executes a command and returns the reply.
    pub fn execute(&mut self, command: Command) -> RespValue {
        self.dispatch(command.kind, &command.args)
            .unwrap_or_else(RespValue::from)
    }

    fn dispatch(&mut self, kind: CommandKind, args: &[Bytes]) -> CommandResult {
        match kind {
            CommandKind::Ping => self.cmd_ping(args),
            CommandKind::Set => self.cmd_set(args),
            CommandKind::Get => self.cmd_get(args),
            CommandKind::Del => self.cmd_del(args),
            CommandKind::Expire => self.cmd_expire(args),
            CommandKind::Keys => self.cmd_keys(args),
            CommandKind::ZAdd => self.cmd_zadd(args),
            CommandKind::ZRange => self.cmd_zrange(args),
        }
    }

    /// Runs one active-expiration cycle.
    pub fn cleanup(&mut self) -> CleanupReport {
        self.storage.cleanup()
    }

    pub fn stats(&self) -> StorageStats {
        self.storage.stats()
    }

    // ========================================================================
    // Helper functions
    // ========================================================================

    fn require(kind: CommandKind, args: &[Bytes], min: usize) -> Result<(), CommandError> {
        if args.len() < min {
            Err(CommandError::WrongArity(kind.name()))
        } else {
            Ok(())
        }
    }

    fn parse_integer(arg: &[u8]) -> Option<i64> {
        std::str::from_utf8(arg).ok()?.parse().ok()
    }

    // ========================================================================
    // Commands
    // ========================================================================

    /// PING
    fn cmd_ping(&mut self, _args: &[Bytes]) -> CommandResult {
        Ok(RespValue::simple_string(self.storage.ping()))
    }

    /// SET key value [ttl-seconds]
    fn cmd_set(&mut self, args: &[Bytes]) -> CommandResult {
        Self::require(CommandKind::Set, args, 2)?;

        let expires_at = args
            .get(2)
            .and_then(|ttl| Self::parse_integer(ttl))
            .map(|secs| deadline_after(Instant::now(), secs));

        self.storage.set(args[0].clone(), args[1].clone(), expires_at);
        Ok(RespValue::ok())
    }

    /// GET key
    fn cmd_get(&mut self, args: &[Bytes]) -> CommandResult {
        Self::require(CommandKind::Get, args, 1)?;

        Ok(match self.storage.get(&args[0]) {
            Some(value) => RespValue::bulk_string(value),
            None => RespValue::nil(),
        })
    }

    /// DEL key [key ...]
    fn cmd_del(&mut self, args: &[Bytes]) -> CommandResult {
        Self::require(CommandKind::Del, args, 1)?;

        let deleted = self.storage.del(args);
        Ok(RespValue::integer(deleted as i64))
    }

    /// EXPIRE key seconds
    fn cmd_expire(&mut self, args: &[Bytes]) -> CommandResult {
        Self::require(CommandKind::Expire, args, 2)?;

        let seconds = Self::parse_integer(&args[1]).ok_or(CommandError::NotInteger)?;
        Ok(RespValue::integer(self.storage.expire(&args[0], seconds)))
    }

    /// KEYS [pattern]
    fn cmd_keys(&mut self, args: &[Bytes]) -> CommandResult {
        let pattern = args.first().map(|p| &p[..]).unwrap_or(&b"*"[..]);
        Ok(RespValue::bulk_array(self.storage.keys(pattern)))
    }

    /// ZADD key score member [score member ...]
    fn cmd_zadd(&mut self, args: &[Bytes]) -> CommandResult {
        if args.len() < 3 || args.len() % 2 == 0 {
            return Err(CommandError::WrongArity(CommandKind::ZAdd.name()));
        }

        let pairs = args[1..]
            .chunks_exact(2)
            .map(|pair| {
                Self::parse_integer(&pair[0])
                    .map(|score| (score, pair[1].clone()))
                    .ok_or(CommandError::Syntax)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let applied = self.storage.zadd(args[0].clone(), pairs);
        Ok(RespValue::integer(applied as i64))
    }

    /// ZRANGE key start stop [WITHSCORES]
    fn cmd_zrange(&mut self, args: &[Bytes]) -> CommandResult {
        Self::require(CommandKind::ZRange, args, 3)?;

        let start = Self::parse_integer(&args[1]).ok_or(CommandError::NotInteger)?;
        let stop = Self::parse_integer(&args[2]).ok_or(CommandError::NotInteger)?;
        // The flag is honoured wherever it appears, key included.
        let with_scores = args
            .iter()
            .any(|arg| arg.eq_ignore_ascii_case(b"withscores"));

        let items = self.storage.zrange(&args[0], start, stop, with_scores);
        Ok(RespValue::bulk_array(items))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_handler() -> CommandHandler {
        CommandHandler::new(StorageEngine::new())
    }

    fn make_command(args: &[&str]) -> RespValue {
        RespValue::Array(
            args.iter()
                .map(|s| RespValue::bulk_string(Bytes::from(s.to_string())))
                .collect(),
        )
    }

    fn run(handler: &mut CommandHandler, args: &[&str]) -> RespValue {
        handler.execute_frame(make_command(args))
    }

    #[test]
    fn test_ping() {
        let mut handler = create_handler();

        assert_eq!(run(&mut handler, &["PING"]), RespValue::pong());
        assert_eq!(run(&mut handler, &["ping"]), RespValue::pong());
    }

    #[test]
    fn test_set_get() {
        let mut handler = create_handler();

        assert_eq!(run(&mut handler, &["SET", "key", "value"]), RespValue::ok());
        assert_eq!(
            run(&mut handler, &["GET", "key"]),
            RespValue::bulk_string("value")
        );
    }

    #[test]
    fn test_get_nonexistent() {
        let mut handler = create_handler();
        assert_eq!(run(&mut handler, &["GET", "nonexistent"]), RespValue::nil());
    }

    #[test]
    fn test_set_with_ttl() {
        let mut handler = create_handler();

        run(&mut handler, &["SET", "key", "value", "100"]);
        assert_eq!(handler.stats().tracked, 1);
        assert_eq!(
            run(&mut handler, &["GET", "key"]),
            RespValue::bulk_string("value")
        );
    }

    #[test]
    fn test_set_with_past_ttl() {
        let mut handler = create_handler();

        run(&mut handler, &["SET", "key", "value", "-1"]);
        assert_eq!(run(&mut handler, &["GET", "key"]), RespValue::nil());
    }

    #[test]
    fn test_set_ignores_invalid_ttl() {
        let mut handler = create_handler();

        assert_eq!(
            run(&mut handler, &["SET", "key", "value", "soon"]),
            RespValue::ok()
        );
        assert_eq!(handler.stats().tracked, 0);
        assert_eq!(
            run(&mut handler, &["GET", "key"]),
            RespValue::bulk_string("value")
        );
    }

    #[test]
    fn test_del() {
        let mut handler = create_handler();

        run(&mut handler, &["SET", "key1", "value1"]);
        run(&mut handler, &["SET", "key2", "value2"]);

        let response = run(&mut handler, &["DEL", "key1", "key2", "key3"]);
        assert_eq!(response, RespValue::integer(2));
    }

    #[test]
    fn test_expire() {
        let mut handler = create_handler();

        run(&mut handler, &["SET", "key", "value"]);
        assert_eq!(run(&mut handler, &["EXPIRE", "key", "100"]), RespValue::integer(1));
        assert_eq!(run(&mut handler, &["EXPIRE", "missing", "100"]), RespValue::integer(1));
        assert_eq!(
            run(&mut handler, &["EXPIRE", "key", "later"]),
            RespValue::error("ERR value is not an integer or out of range")
        );
    }

    #[test]
    fn test_keys() {
        let mut handler = create_handler();

        run(&mut handler, &["SET", "a", "1"]);
        run(&mut handler, &["ZADD", "z", "1", "m"]);

        let mut keys = run(&mut handler, &["KEYS", "*"]).into_array().unwrap();
        keys.sort_by(|x, y| x.as_bytes().cmp(&y.as_bytes()));
        assert_eq!(keys, vec![RespValue::bulk_string("a"), RespValue::bulk_string("z")]);

        assert_eq!(
            run(&mut handler, &["KEYS"]).as_array().map(|a| a.len()),
            Some(2)
        );
    }

    #[test]
    fn test_zadd_zrange() {
        let mut handler = create_handler();

        let response = run(&mut handler, &["ZADD", "z", "3", "three", "1", "one", "2", "two"]);
        assert_eq!(response, RespValue::integer(3));

        assert_eq!(
            run(&mut handler, &["ZRANGE", "z", "1", "-1"]),
            RespValue::bulk_array(["one", "two", "three"])
        );
        assert_eq!(
            run(&mut handler, &["ZRANGE", "z", "1", "-1", "WITHSCORES"]),
            RespValue::bulk_array(["one", "1", "two", "2", "three", "3"])
        );
        assert_eq!(
            run(&mut handler, &["zrange", "z", "1", "-1", "withscores"]),
            RespValue::bulk_array(["one", "1", "two", "2", "three", "3"])
        );
    }

    #[test]
    fn test_zadd_errors() {
        let mut handler = create_handler();
        let arity = RespValue::error("ERR wrong number of arguments for 'zadd' command");

        assert_eq!(run(&mut handler, &["ZADD", "z"]), arity);
        assert_eq!(run(&mut handler, &["ZADD", "z", "1"]), arity);
        assert_eq!(run(&mut handler, &["ZADD", "z", "1", "a", "2"]), arity);
        assert_eq!(
            run(&mut handler, &["ZADD", "z", "one", "a"]),
            RespValue::error("ERR syntax error")
        );
        assert_eq!(
            run(&mut handler, &["ZADD", "z", "1", "a", "x", "b"]),
            RespValue::error("ERR syntax error")
        );
        // A rejected ZADD leaves nothing behind.
        assert_eq!(handler.stats().keys, 0);
    }

    #[test]
    fn test_zrange_withscores_anywhere() {
        let mut handler = create_handler();
        run(&mut handler, &["ZADD", "withscores", "2", "b", "1", "a"]);
        run(&mut handler, &["ZADD", "z", "1", "a"]);

        assert_eq!(
            run(&mut handler, &["ZRANGE", "withscores", "1", "-1"]),
            RespValue::bulk_array(["a", "1", "b", "2"])
        );
        assert_eq!(
            run(&mut handler, &["ZRANGE", "z", "1", "-1", "extra", "WithScores"]),
            RespValue::bulk_array(["a", "1"])
        );
        assert_eq!(
            run(&mut handler, &["ZRANGE", "z", "1", "-1", "extra"]),
            RespValue::bulk_array(["a"])
        );
    }

    #[test]
    fn test_zrange_errors() {
        let mut handler = create_handler();

        assert_eq!(
            run(&mut handler, &["ZRANGE", "z", "1"]),
            RespValue::error("ERR wrong number of arguments for 'zrange' command")
        );
        assert_eq!(
            run(&mut handler, &["ZRANGE", "z", "a", "-1"]),
            RespValue::error("ERR value is not an integer or out of range")
        );
        assert_eq!(
            run(&mut handler, &["ZRANGE", "z", "1", "b"]),
            RespValue::error("ERR value is not an integer or out of range")
        );
        assert_eq!(
            run(&mut handler, &["ZRANGE", "missing", "1", "-1"]),
            RespValue::array(vec![])
        );
    }

    #[test]
    fn test_wrong_arity() {
        let mut handler = create_handler();

        assert_eq!(
            run(&mut handler, &["SET", "key"]),
            RespValue::error("ERR wrong number of arguments for 'set' command")
        );
        assert_eq!(
            run(&mut handler, &["GET"]),
            RespValue::error("ERR wrong number of arguments for 'get' command")
        );
        assert_eq!(
            run(&mut handler, &["DEL"]),
            RespValue::error("ERR wrong number of arguments for 'del' command")
        );
        assert_eq!(
            run(&mut handler, &["EXPIRE", "key"]),
            RespValue::error("ERR wrong number of arguments for 'expire' command")
        );
    }

    #[test]
    fn test_unknown_command() {
        let mut handler = create_handler();

        let response = run(&mut handler, &["FOO", "bar"]);
        assert_eq!(response, RespValue::error("unknown command 'FOO'"));
    }

    #[test]
    fn test_malformed_frames() {
        let mut handler = create_handler();

        assert_eq!(
            handler.execute_frame(RespValue::array(vec![])),
            RespValue::error("ERR empty command")
        );
        assert_eq!(
            handler.execute_frame(RespValue::integer(1)),
            RespValue::error("ERR invalid command format")
        );
    }

    #[test]
    fn test_cleanup_reclaims_expired() {
        let mut handler = create_handler();

        run(&mut handler, &["SET", "a", "1", "-1"]);
        run(&mut handler, &["SET", "b", "2", "100"]);

        let report = handler.cleanup();
        assert_eq!(report.reclaimed, 1);
        assert_eq!(handler.stats().keys, 1);
    }
}
