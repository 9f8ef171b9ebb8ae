//! Command Dispatch
//!
//! This module routes parsed requests to keyspace operations and turns
//! the results into reply frames. It is a pure routing and validation
//! layer: command names are uppercased for lookup, argument counts are
//! checked against each command's arity, and keyspace errors become
//! error replies. The dispatcher holds no state of its own beyond the
//! shared keyspace handle.
//!
//! ```text
//! Request ──> dispatch ──> arity check ──> Keyspace ──> Reply
//! ```
//!
//! Every failure here is a reply frame; nothing escapes as a panic or
//! tears down the connection.

use std::sync::Arc;

use crate::protocol::{Reply, Request};
use crate::storage::{Keyspace, StoreError};

/// Routes commands to the keyspace and formats replies.
#[derive(Clone)]
pub struct CommandHandler {
    store: Arc<Keyspace>,
}

impl CommandHandler {
    /// Creates a handler over the shared keyspace.
    pub fn new(store: Arc<Keyspace>) -> Self {
        Self { store }
    }

    /// Executes one request and returns the reply to send.
    pub fn execute(&self, request: Request) -> Reply {
        let name = request.name.to_uppercase();
        self.dispatch(&name, &request.args)
    }

    fn dispatch(&self, cmd: &str, args: &[String]) -> Reply {
        match cmd {
            // String commands
            "SET" => self.cmd_set(args),
            "GET" => self.cmd_get(args),
            "INCR" => self.cmd_incr_by(args, 1, "incr"),
            "DECR" => self.cmd_incr_by(args, -1, "decr"),

            // List commands
            "LPUSH" => self.cmd_push(args, true, "lpush"),
            "RPUSH" => self.cmd_push(args, false, "rpush"),
            "LPOP" => self.cmd_pop(args, true, "lpop"),
            "RPOP" => self.cmd_pop(args, false, "rpop"),
            "LLEN" => self.cmd_llen(args),
            "LRANGE" => self.cmd_lrange(args),

            // Set commands
            "SADD" => self.cmd_sadd(args),
            "SREM" => self.cmd_srem(args),
            "SMEMBERS" => self.cmd_smembers(args),
            "SCARD" => self.cmd_scard(args),
            "SISMEMBER" => self.cmd_sismember(args),

            // Hash commands
            "HSET" => self.cmd_hset(args),
            "HGET" => self.cmd_hget(args),
            "HDEL" => self.cmd_hdel(args),
            "HKEYS" => self.cmd_hkeys(args),
            "HVALS" => self.cmd_hvals(args),
            "HGETALL" => self.cmd_hgetall(args),

            // Key and server commands
            "DEL" => self.cmd_del(args),
            "EXISTS" => self.cmd_exists(args),
            "EXPIRE" => self.cmd_expire(args),
            "TTL" => self.cmd_ttl(args),
            "KEYS" => self.cmd_keys(args),
            "FLUSHALL" => self.cmd_flushall(args),
            "PING" => self.cmd_ping(args),

            // Unknown command
            _ => Reply::error(format!("ERR unknown command '{}'", cmd)),
        }
    }

    // ========================================================================
    // String Commands
    // ========================================================================

    /// SET key value
    fn cmd_set(&self, args: &[String]) -> Reply {
        if args.len() != 2 {
            return wrong_arity("set");
        }
        self.store.set(args[0].clone(), args[1].clone());
        Reply::ok()
    }

    /// GET key
    fn cmd_get(&self, args: &[String]) -> Reply {
        if args.len() != 1 {
            return wrong_arity("get");
        }
        match self.store.get(&args[0]) {
            Ok(Some(value)) => Reply::simple(value),
            Ok(None) => Reply::null(),
            Err(e) => store_error(e),
        }
    }

    /// INCR key / DECR key
    fn cmd_incr_by(&self, args: &[String], delta: i64, name: &str) -> Reply {
        if args.len() != 1 {
            return wrong_arity(name);
        }
        match self.store.incr_by(&args[0], delta) {
            Ok(n) => Reply::integer(n),
            Err(e) => store_error(e),
        }
    }

    // ========================================================================
    // List Commands
    // ========================================================================

    /// LPUSH key element [element ...] / RPUSH key element [element ...]
    fn cmd_push(&self, args: &[String], front: bool, name: &str) -> Reply {
        if args.len() < 2 {
            return wrong_arity(name);
        }
        let result = if front {
            self.store.lpush(&args[0], &args[1..])
        } else {
            self.store.rpush(&args[0], &args[1..])
        };
        match result {
            Ok(len) => Reply::integer(len as i64),
            Err(e) => store_error(e),
        }
    }

    /// LPOP key / RPOP key
    fn cmd_pop(&self, args: &[String], front: bool, name: &str) -> Reply {
        if args.len() != 1 {
            return wrong_arity(name);
        }
        let result = if front {
            self.store.lpop(&args[0])
        } else {
            self.store.rpop(&args[0])
        };
        match result {
            Ok(Some(element)) => Reply::simple(element),
            Ok(None) => Reply::null(),
            Err(e) => store_error(e),
        }
    }

    /// LLEN key
    fn cmd_llen(&self, args: &[String]) -> Reply {
        if args.len() != 1 {
            return wrong_arity("llen");
        }
        match self.store.llen(&args[0]) {
            Ok(len) => Reply::integer(len as i64),
            Err(e) => store_error(e),
        }
    }

    /// LRANGE key start stop
    fn cmd_lrange(&self, args: &[String]) -> Reply {
        if args.len() != 3 {
            return wrong_arity("lrange");
        }
        let (start, stop) = match (parse_int(&args[1]), parse_int(&args[2])) {
            (Some(start), Some(stop)) => (start, stop),
            _ => return not_an_integer(),
        };
        match self.store.lrange(&args[0], start, stop) {
            Ok(items) => Reply::array(items),
            Err(e) => store_error(e),
        }
    }

    // ========================================================================
    // Set Commands
    // ========================================================================

    /// SADD key member [member ...]
    fn cmd_sadd(&self, args: &[String]) -> Reply {
        if args.len() < 2 {
            return wrong_arity("sadd");
        }
        match self.store.sadd(&args[0], &args[1..]) {
            Ok(added) => Reply::integer(added as i64),
            Err(e) => store_error(e),
        }
    }

    /// SREM key member [member ...]
    fn cmd_srem(&self, args: &[String]) -> Reply {
        if args.len() < 2 {
            return wrong_arity("srem");
        }
        match self.store.srem(&args[0], &args[1..]) {
            Ok(removed) => Reply::integer(removed as i64),
            Err(e) => store_error(e),
        }
    }

    /// SMEMBERS key
    fn cmd_smembers(&self, args: &[String]) -> Reply {
        if args.len() != 1 {
            return wrong_arity("smembers");
        }
        match self.store.smembers(&args[0]) {
            Ok(members) => Reply::array(members),
            Err(e) => store_error(e),
        }
    }

    /// SCARD key
    fn cmd_scard(&self, args: &[String]) -> Reply {
        if args.len() != 1 {
            return wrong_arity("scard");
        }
        match self.store.scard(&args[0]) {
            Ok(card) => Reply::integer(card as i64),
            Err(e) => store_error(e),
        }
    }

    /// SISMEMBER key member
    fn cmd_sismember(&self, args: &[String]) -> Reply {
        if args.len() != 2 {
            return wrong_arity("sismember");
        }
        match self.store.sismember(&args[0], &args[1]) {
            Ok(found) => Reply::integer(found as i64),
            Err(e) => store_error(e),
        }
    }

    // ========================================================================
    // Hash Commands
    // ========================================================================

    /// HSET key field value [field value ...]
    fn cmd_hset(&self, args: &[String]) -> Reply {
        if args.len() < 3 {
            return wrong_arity("hset");
        }
        if (args.len() - 1) % 2 != 0 {
            return Reply::error("ERR syntax error");
        }
        let pairs: Vec<(String, String)> = args[1..]
            .chunks(2)
            .map(|pair| (pair[0].clone(), pair[1].clone()))
            .collect();
        match self.store.hset(&args[0], &pairs) {
            Ok(created) => Reply::integer(created as i64),
            Err(e) => store_error(e),
        }
    }

    /// HGET key field
    fn cmd_hget(&self, args: &[String]) -> Reply {
        if args.len() != 2 {
            return wrong_arity("hget");
        }
        match self.store.hget(&args[0], &args[1]) {
            Ok(Some(value)) => Reply::simple(value),
            Ok(None) => Reply::null(),
            Err(e) => store_error(e),
        }
    }

    /// HDEL key field [field ...]
    fn cmd_hdel(&self, args: &[String]) -> Reply {
        if args.len() < 2 {
            return wrong_arity("hdel");
        }
        match self.store.hdel(&args[0], &args[1..]) {
            Ok(removed) => Reply::integer(removed as i64),
            Err(e) => store_error(e),
        }
    }

    /// HKEYS key
    fn cmd_hkeys(&self, args: &[String]) -> Reply {
        if args.len() != 1 {
            return wrong_arity("hkeys");
        }
        match self.store.hkeys(&args[0]) {
            Ok(fields) => Reply::array(fields),
            Err(e) => store_error(e),
        }
    }

    /// HVALS key
    fn cmd_hvals(&self, args: &[String]) -> Reply {
        if args.len() != 1 {
            return wrong_arity("hvals");
        }
        match self.store.hvals(&args[0]) {
            Ok(values) => Reply::array(values),
            Err(e) => store_error(e),
        }
    }

    /// HGETALL key
    fn cmd_hgetall(&self, args: &[String]) -> Reply {
        if args.len() != 1 {
            return wrong_arity("hgetall");
        }
        match self.store.hgetall(&args[0]) {
            Ok(items) => Reply::array(items),
            Err(e) => store_error(e),
        }
    }

    // ========================================================================
    // Key and Server Commands
    // ========================================================================

    /// DEL key [key ...]
    fn cmd_del(&self, args: &[String]) -> Reply {
        if args.is_empty() {
            return wrong_arity("del");
        }
        Reply::integer(self.store.delete_many(args) as i64)
    }

    /// EXISTS key [key ...]
    fn cmd_exists(&self, args: &[String]) -> Reply {
        if args.is_empty() {
            return wrong_arity("exists");
        }
        Reply::integer(self.store.exists_many(args) as i64)
    }

    /// EXPIRE key seconds
    fn cmd_expire(&self, args: &[String]) -> Reply {
        if args.len() != 2 {
            return wrong_arity("expire");
        }
        let seconds = match parse_int(&args[1]) {
            Some(seconds) => seconds,
            None => return not_an_integer(),
        };
        Reply::integer(self.store.expire(&args[0], seconds) as i64)
    }

    /// TTL key
    fn cmd_ttl(&self, args: &[String]) -> Reply {
        if args.len() != 1 {
            return wrong_arity("ttl");
        }
        Reply::integer(self.store.ttl(&args[0]))
    }

    /// KEYS pattern
    fn cmd_keys(&self, args: &[String]) -> Reply {
        if args.len() != 1 {
            return wrong_arity("keys");
        }
        Reply::array(self.store.keys_matching(&args[0]))
    }

    /// FLUSHALL
    fn cmd_flushall(&self, args: &[String]) -> Reply {
        if !args.is_empty() {
            return wrong_arity("flushall");
        }
        self.store.flush_all();
        Reply::ok()
    }

    /// PING [message]
    fn cmd_ping(&self, args: &[String]) -> Reply {
        match args {
            [] => Reply::pong(),
            [message] => Reply::simple(message.clone()),
            _ => wrong_arity("ping"),
        }
    }
}

/// The arity-violation reply for a command.
fn wrong_arity(cmd: &str) -> Reply {
    Reply::error(format!(
        "ERR wrong number of arguments for '{}' command",
        cmd
    ))
}

/// The numeric-argument reply used by LRANGE and EXPIRE.
fn not_an_integer() -> Reply {
    Reply::error("ERR value is not an integer or out of range")
}

/// Maps a keyspace error to its reply frame.
fn store_error(err: StoreError) -> Reply {
    Reply::error(format!("ERR {}", err))
}

fn parse_int(arg: &str) -> Option<i64> {
    arg.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handler() -> CommandHandler {
        CommandHandler::new(Arc::new(Keyspace::new()))
    }

    fn run(h: &CommandHandler, name: &str, args: &[&str]) -> Reply {
        h.execute(Request::new(
            name,
            args.iter().map(|a| a.to_string()).collect(),
        ))
    }

    #[test]
    fn test_ping() {
        let h = handler();
        assert_eq!(run(&h, "PING", &[]), Reply::pong());
        assert_eq!(run(&h, "PING", &["hey"]), Reply::simple("hey"));
    }

    #[test]
    fn test_case_insensitive_names() {
        let h = handler();
        assert_eq!(run(&h, "set", &["k", "v"]), Reply::ok());
        assert_eq!(run(&h, "GeT", &["k"]), Reply::simple("v"));
    }

    #[test]
    fn test_unknown_command() {
        let h = handler();
        assert_eq!(
            run(&h, "frobnicate", &[]),
            Reply::error("ERR unknown command 'FROBNICATE'")
        );
    }

    #[test]
    fn test_wrong_arity() {
        let h = handler();
        assert_eq!(
            run(&h, "GET", &[]),
            Reply::error("ERR wrong number of arguments for 'get' command")
        );
        assert_eq!(
            run(&h, "SET", &["only-key"]),
            Reply::error("ERR wrong number of arguments for 'set' command")
        );
    }

    #[test]
    fn test_set_get_incr_scenario() {
        let h = handler();
        assert_eq!(run(&h, "SET", &["name", "FlintKV"]), Reply::ok());
        assert_eq!(run(&h, "GET", &["name"]), Reply::simple("FlintKV"));
        assert_eq!(run(&h, "SET", &["counter", "10"]), Reply::ok());
        assert_eq!(run(&h, "INCR", &["counter"]), Reply::integer(11));
        assert_eq!(run(&h, "DECR", &["counter"]), Reply::integer(10));
    }

    #[test]
    fn test_get_absent_is_null() {
        let h = handler();
        assert_eq!(run(&h, "GET", &["nope"]), Reply::null());
    }

    #[test]
    fn test_incr_errors() {
        let h = handler();
        run(&h, "SET", &["text", "abc"]);
        assert_eq!(
            run(&h, "INCR", &["text"]),
            Reply::error("ERR value is not an integer or out of range")
        );
    }

    #[test]
    fn test_wrong_type_reply() {
        let h = handler();
        run(&h, "LPUSH", &["mylist", "a"]);
        let reply = run(&h, "GET", &["mylist"]);
        match reply {
            Reply::Error(msg) => assert!(msg.starts_with("ERR WRONGTYPE")),
            other => panic!("expected error, got {:?}", other),
        }
    }

    #[test]
    fn test_list_scenario() {
        let h = handler();
        assert_eq!(run(&h, "LPUSH", &["mylist", "a", "b", "c"]), Reply::integer(3));
        assert_eq!(
            run(&h, "LRANGE", &["mylist", "0", "-1"]),
            Reply::array(vec!["c".into(), "b".into(), "a".into()])
        );
        assert_eq!(run(&h, "RPOP", &["mylist"]), Reply::simple("a"));
        assert_eq!(run(&h, "LLEN", &["mylist"]), Reply::integer(2));
    }

    #[test]
    fn test_pop_to_empty_removes_key() {
        let h = handler();
        run(&h, "LPUSH", &["l", "a"]);
        assert_eq!(run(&h, "LPOP", &["l"]), Reply::simple("a"));
        assert_eq!(run(&h, "EXISTS", &["l"]), Reply::integer(0));
        assert_eq!(run(&h, "LPOP", &["l"]), Reply::null());
    }

    #[test]
    fn test_lrange_rejects_bad_index() {
        let h = handler();
        run(&h, "RPUSH", &["l", "a"]);
        assert_eq!(
            run(&h, "LRANGE", &["l", "zero", "-1"]),
            Reply::error("ERR value is not an integer or out of range")
        );
    }

    #[test]
    fn test_lrange_absent_is_empty_array() {
        let h = handler();
        assert_eq!(run(&h, "LRANGE", &["nope", "0", "-1"]), Reply::array(vec![]));
    }

    #[test]
    fn test_set_scenario() {
        let h = handler();
        assert_eq!(
            run(&h, "SADD", &["fruits", "apple", "banana", "cherry"]),
            Reply::integer(3)
        );
        assert_eq!(run(&h, "SISMEMBER", &["fruits", "apple"]), Reply::integer(1));
        assert_eq!(run(&h, "SISMEMBER", &["fruits", "grape"]), Reply::integer(0));
        assert_eq!(run(&h, "SREM", &["fruits", "banana"]), Reply::integer(1));
        assert_eq!(run(&h, "SCARD", &["fruits"]), Reply::integer(2));
    }

    #[test]
    fn test_sadd_idempotence() {
        let h = handler();
        assert_eq!(run(&h, "SADD", &["s", "x"]), Reply::integer(1));
        assert_eq!(run(&h, "SADD", &["s", "x"]), Reply::integer(0));
        assert_eq!(run(&h, "SCARD", &["s"]), Reply::integer(1));
    }

    #[test]
    fn test_hash_scenario() {
        let h = handler();
        assert_eq!(
            run(
                &h,
                "HSET",
                &["user", "name", "John", "age", "30", "city", "NYC"]
            ),
            Reply::integer(3)
        );
        assert_eq!(run(&h, "HGET", &["user", "name"]), Reply::simple("John"));
        assert_eq!(run(&h, "HGET", &["user", "missing"]), Reply::null());
        match run(&h, "HGETALL", &["user"]) {
            Reply::Array(items) => assert_eq!(items.len(), 6),
            other => panic!("expected array, got {:?}", other),
        }
        match run(&h, "HKEYS", &["user"]) {
            Reply::Array(fields) => assert_eq!(fields.len(), 3),
            other => panic!("expected array, got {:?}", other),
        }
    }

    #[test]
    fn test_hset_update_counts_zero() {
        let h = handler();
        assert_eq!(run(&h, "HSET", &["u", "f", "v"]), Reply::integer(1));
        assert_eq!(run(&h, "HSET", &["u", "f", "v"]), Reply::integer(0));
        assert_eq!(run(&h, "HGET", &["u", "f"]), Reply::simple("v"));
    }

    #[test]
    fn test_hset_odd_pairs_is_syntax_error() {
        let h = handler();
        assert_eq!(
            run(&h, "HSET", &["user", "name", "John", "age"]),
            Reply::error("ERR syntax error")
        );
    }

    #[test]
    fn test_hdel_empties_hash() {
        let h = handler();
        run(&h, "HSET", &["u", "f", "v"]);
        assert_eq!(run(&h, "HDEL", &["u", "f"]), Reply::integer(1));
        assert_eq!(run(&h, "EXISTS", &["u"]), Reply::integer(0));
    }

    #[test]
    fn test_del_counts_and_is_idempotent() {
        let h = handler();
        run(&h, "SET", &["a", "1"]);
        run(&h, "SET", &["b", "2"]);
        assert_eq!(run(&h, "DEL", &["a", "b", "missing"]), Reply::integer(2));
        assert_eq!(run(&h, "DEL", &["a"]), Reply::integer(0));
    }

    #[test]
    fn test_exists_duplicates() {
        let h = handler();
        run(&h, "SET", &["a", "1"]);
        assert_eq!(run(&h, "EXISTS", &["a", "a", "nope"]), Reply::integer(2));
    }

    #[test]
    fn test_expire_and_ttl() {
        let h = handler();
        run(&h, "SET", &["tmp", "x"]);
        assert_eq!(run(&h, "EXPIRE", &["tmp", "10"]), Reply::integer(1));
        match run(&h, "TTL", &["tmp"]) {
            Reply::Integer(ttl) => assert!(ttl >= 1 && ttl <= 10),
            other => panic!("expected integer, got {:?}", other),
        }
        assert_eq!(run(&h, "EXPIRE", &["missing", "10"]), Reply::integer(0));
        assert_eq!(run(&h, "TTL", &["missing"]), Reply::integer(-2));

        run(&h, "SET", &["forever", "x"]);
        assert_eq!(run(&h, "TTL", &["forever"]), Reply::integer(-1));
    }

    #[test]
    fn test_expire_zero_deletes_now() {
        let h = handler();
        run(&h, "SET", &["tmp", "x"]);
        assert_eq!(run(&h, "EXPIRE", &["tmp", "0"]), Reply::integer(1));
        assert_eq!(run(&h, "EXISTS", &["tmp"]), Reply::integer(0));
    }

    #[test]
    fn test_expire_rejects_bad_seconds() {
        let h = handler();
        run(&h, "SET", &["tmp", "x"]);
        assert_eq!(
            run(&h, "EXPIRE", &["tmp", "soon"]),
            Reply::error("ERR value is not an integer or out of range")
        );
    }

    #[test]
    fn test_keys_and_flushall() {
        let h = handler();
        run(&h, "SET", &["ab", "1"]);
        run(&h, "SET", &["axb", "1"]);
        run(&h, "SET", &["other", "1"]);

        match run(&h, "KEYS", &["a*b"]) {
            Reply::Array(mut keys) => {
                keys.sort();
                assert_eq!(keys, vec!["ab".to_string(), "axb".to_string()]);
            }
            other => panic!("expected array, got {:?}", other),
        }

        assert_eq!(run(&h, "FLUSHALL", &[]), Reply::ok());
        assert_eq!(run(&h, "KEYS", &["*"]), Reply::array(vec![]));
    }
}
