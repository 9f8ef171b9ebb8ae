//! Demonstration Client
//!
//! A minimal client for exercising the server by hand and for the
//! scripted `--demo` walkthrough. It speaks the client side of the wire
//! contract: send one command line with a trailing `\r\n`, then read one
//! reply (a single line for `+`/`:`/`-`/`$-1`, or a `*N` header followed
//! by `N` simple-string lines).

use anyhow::{bail, Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::time::{sleep, Duration};

use crate::protocol::Reply;
use crate::server::Server;

/// A blocking-style client over one TCP connection.
pub struct DemoClient {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl DemoClient {
    /// Connects to a running server.
    pub async fn connect(addr: &str) -> Result<Self> {
        let stream = TcpStream::connect(addr)
            .await
            .with_context(|| format!("failed to connect to {}", addr))?;
        let (read_half, write_half) = stream.into_split();
        Ok(Self {
            reader: BufReader::new(read_half),
            writer: write_half,
        })
    }

    /// Sends one command line and returns its reply, rendered for humans.
    pub async fn execute(&mut self, command: &str) -> Result<String> {
        self.writer.write_all(command.as_bytes()).await?;
        self.writer.write_all(b"\r\n").await?;
        self.writer.flush().await?;

        let reply = self.read_reply().await?;
        Ok(reply.to_string())
    }

    /// Reads exactly one reply frame.
    async fn read_reply(&mut self) -> Result<Reply> {
        let header = self.read_line().await?;
        let (prefix, rest) = split_prefix(&header)?;

        Ok(match prefix {
            '+' => Reply::simple(rest),
            '-' => Reply::error(rest),
            ':' => Reply::integer(rest.parse().context("bad integer reply")?),
            '$' => {
                if rest != "-1" {
                    bail!("unexpected bulk reply header: {}", header);
                }
                Reply::null()
            }
            '*' => {
                let count: usize = rest.parse().context("bad array reply header")?;
                let mut items = Vec::with_capacity(count);
                for _ in 0..count {
                    let line = self.read_line().await?;
                    let (item_prefix, item) = split_prefix(&line)?;
                    if item_prefix != '+' {
                        bail!("unexpected array element: {}", line);
                    }
                    items.push(item.to_string());
                }
                Reply::array(items)
            }
            other => bail!("unknown reply prefix '{}'", other),
        })
    }

    /// Reads one CRLF-terminated line, without the terminator.
    async fn read_line(&mut self) -> Result<String> {
        let mut line = String::new();
        let n = self.reader.read_line(&mut line).await?;
        if n == 0 {
            bail!("server closed the connection");
        }
        while line.ends_with('\n') || line.ends_with('\r') {
            line.pop();
        }
        Ok(line)
    }
}

fn split_prefix(line: &str) -> Result<(char, &str)> {
    let mut chars = line.chars();
    let prefix = chars.next().context("empty reply line")?;
    Ok((prefix, chars.as_str()))
}

/// Runs the scripted demonstration: starts a server on `addr`, walks
/// through every command family, then shuts the server down.
pub async fn run_demo(addr: &str) -> Result<()> {
    println!("=== FlintKV Demo ===");

    let server = Server::bind(addr).await?;
    let addr = server.local_addr()?.to_string();
    let handle = server.shutdown_handle();
    let server_task = tokio::spawn(server.run());

    let mut client = DemoClient::connect(&addr).await?;

    println!("\n1. Basic String Operations:");
    step(&mut client, "PING").await?;
    step(&mut client, "SET name FlintKV").await?;
    step(&mut client, "GET name").await?;
    step(&mut client, "SET counter 10").await?;
    step(&mut client, "INCR counter").await?;
    step(&mut client, "DECR counter").await?;
    step(&mut client, "GET counter").await?;

    println!("\n2. List Operations:");
    step(&mut client, "LPUSH mylist a b c").await?;
    step(&mut client, "RPUSH mylist x y z").await?;
    step(&mut client, "LLEN mylist").await?;
    step(&mut client, "LRANGE mylist 0 -1").await?;
    step(&mut client, "LPOP mylist").await?;
    step(&mut client, "RPOP mylist").await?;

    println!("\n3. Set Operations:");
    step(&mut client, "SADD myset apple banana cherry").await?;
    step(&mut client, "SCARD myset").await?;
    step(&mut client, "SISMEMBER myset apple").await?;
    step(&mut client, "SISMEMBER myset grape").await?;
    step(&mut client, "SMEMBERS myset").await?;
    step(&mut client, "SREM myset banana").await?;

    println!("\n4. Hash Operations:");
    step(&mut client, "HSET user name John age 30").await?;
    step(&mut client, "HGET user name").await?;
    step(&mut client, "HGET user age").await?;
    step(&mut client, "HKEYS user").await?;
    step(&mut client, "HVALS user").await?;
    step(&mut client, "HGETALL user").await?;

    println!("\n5. Expiration:");
    step(&mut client, "SET temp_key temporary_value").await?;
    step(&mut client, "EXPIRE temp_key 1").await?;
    step(&mut client, "TTL temp_key").await?;
    println!("   ... waiting 1.5 seconds ...");
    sleep(Duration::from_millis(1500)).await;
    step(&mut client, "GET temp_key").await?;
    step(&mut client, "TTL temp_key").await?;

    println!("\n6. General Operations:");
    step(&mut client, "KEYS *").await?;
    step(&mut client, "EXISTS name counter").await?;
    step(&mut client, "FLUSHALL").await?;
    step(&mut client, "KEYS *").await?;

    handle.shutdown();
    server_task.await??;
    println!("\nDemo completed.");
    Ok(())
}

async fn step(client: &mut DemoClient, command: &str) -> Result<()> {
    let reply = client.execute(command).await?;
    println!("{} -> {}", command, reply);
    Ok(())
}
